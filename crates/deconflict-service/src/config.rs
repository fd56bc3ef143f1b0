//! Service configuration from environment.

use deconflict_core::SafetyRules;
use std::env;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub rules: SafetyRules,
    /// Forward lifecycle events to `tracing` instead of dropping them.
    pub trace_events: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unparseable values fall back to
    /// their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let parse = |key: &str| lookup(key).and_then(|s| s.trim().parse::<f64>().ok());

        Self {
            rules: SafetyRules {
                safety_distance_m: parse("DECONFLICT_SAFETY_DISTANCE_M").unwrap_or(10.0),
                time_step_s: parse("DECONFLICT_TIME_STEP_S").unwrap_or(0.5),
                vertical_weight: parse("DECONFLICT_VERTICAL_WEIGHT").unwrap_or(1.5),
                lookahead_s: parse("DECONFLICT_LOOKAHEAD_S"),
            },
            trace_events: lookup("DECONFLICT_TRACE_EVENTS")
                .map(|s| {
                    matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
                })
                .unwrap_or(false),
        }
    }
}
