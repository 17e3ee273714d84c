//! Error types for delivery planning.
//!
//! Only malformed input is an error. Outcomes such as "no eligible drone" or
//! "no route" are returned as empty values by the planning operations.

use thiserror::Error;

/// Errors raised while validating planner input.
#[derive(Debug, Error)]
pub enum PlanError {
    /// Region ring is not closed or has too few vertices
    #[error("Invalid region '{name}': {reason}")]
    InvalidRegion { name: String, reason: String },

    /// Heading is not one of the 16 compass directions
    #[error("Invalid angle {0}: must be a multiple of 22.5 degrees")]
    InvalidAngle(f64),

    /// Malformed capability query
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Drone grouping refers to a service point that does not exist
    #[error("Unknown service point: {0}")]
    UnknownServicePoint(u32),

    /// Snapshot could not be decoded
    #[error("Snapshot decode error: {0}")]
    Snapshot(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PlanError>;
