//! Dispatch CLI - offline delivery planning over JSON fleet snapshots.
//!
//! The `plan_deliveries` binary loads a snapshot and a delivery batch from
//! disk, runs the planner and prints the result as JSON on stdout.

pub mod config;
pub mod input;

pub use config::Config;
pub use input::{load_requests, load_snapshot, parse_condition};
