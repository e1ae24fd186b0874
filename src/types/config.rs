//! Configuration structures.
//!
//! Configuration is loaded from JSON documents; every field has a default so
//! partial documents are accepted.

use serde::{Deserialize, Serialize};

use super::errors::Result;

/// Global engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Test delivery behaviour.
    #[serde(default)]
    pub delivery: DeliveryConfig,
}

impl Config {
    /// Parse a configuration document.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Tracing log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable JSON log formatting.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

/// Delivery configuration, shared by the session manager and test sessions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DeliveryConfig {
    /// Create every item session when the test session begins instead of
    /// on first visit.
    pub initialize_all_items: bool,

    /// Evaluate branch rules even in nonlinear test parts.
    pub force_branching: bool,

    /// Evaluate preconditions even in nonlinear test parts.
    pub force_preconditions: bool,

    /// Moving back follows the visited path instead of the route order.
    pub path_tracking: bool,

    /// Allow jumps in linear test parts.
    pub always_allow_jumps: bool,

    /// Enforce minimum times in linear navigation.
    pub consider_min_time: bool,

    /// Run template processing when an item session begins.
    pub auto_template_processing: bool,

    /// Seed for selection and shuffling. `None` draws from the thread RNG.
    pub shuffle_seed: Option<u64>,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            initialize_all_items: false,
            force_branching: false,
            force_preconditions: false,
            path_tracking: false,
            always_allow_jumps: false,
            consider_min_time: true,
            auto_template_processing: true,
            shuffle_seed: None,
        }
    }
}
