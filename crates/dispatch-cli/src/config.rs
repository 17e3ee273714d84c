//! CLI configuration from environment.

use std::env;

use dispatch_core::PlannerConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub max_expanded_nodes: usize,
    pub search_timeout_ms: Option<u64>,
    /// Emit logs as JSON lines instead of plain text
    pub log_json: bool,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset or unparsable values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = PlannerConfig::default();
        Self {
            max_expanded_nodes: lookup("DISPATCH_MAX_EXPANDED_NODES")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_expanded_nodes),
            search_timeout_ms: lookup("DISPATCH_SEARCH_TIMEOUT_MS").and_then(|s| s.parse().ok()),
            log_json: lookup("DISPATCH_LOG_FORMAT")
                .map(|s| s.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
        }
    }

    pub fn planner(&self) -> PlannerConfig {
        PlannerConfig {
            max_expanded_nodes: self.max_expanded_nodes,
            search_timeout_ms: self.search_timeout_ms,
            ..PlannerConfig::default()
        }
    }
}
