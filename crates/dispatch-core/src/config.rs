//! Planner tuning shared by the search and the scheduler.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Distance in degrees covered by one directional move.
pub const STEP_SIZE: f64 = 0.00015;

/// Number of compass directions a drone may move in.
pub const DIRECTION_COUNT: usize = 16;

/// Angle between neighbouring compass directions.
pub const DIRECTION_STEP_DEG: f64 = 360.0 / DIRECTION_COUNT as f64;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Length of one move in degrees
    pub step_size: f64,
    /// Nodes the path search may expand before giving up
    pub max_expanded_nodes: usize,
    /// Optional wall-clock bound for a single path search
    #[serde(default)]
    pub search_timeout_ms: Option<u64>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            step_size: STEP_SIZE,
            max_expanded_nodes: 250_000,
            search_timeout_ms: None,
        }
    }
}

impl PlannerConfig {
    pub fn search_timeout(&self) -> Option<Duration> {
        self.search_timeout_ms.map(Duration::from_millis)
    }
}
