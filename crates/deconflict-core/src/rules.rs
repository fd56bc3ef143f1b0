//! Separation rules and sampling thresholds for conflict detection.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejected separation rules.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RulesError {
    #[error("safety distance must be positive, got {0}")]
    NonPositiveSafetyDistance(f64),
    #[error("time step must be positive, got {0}")]
    NonPositiveTimeStep(f64),
    #[error("vertical weight must be finite and non-negative, got {0}")]
    InvalidVerticalWeight(f64),
    #[error("look-ahead window must be positive, got {0}")]
    NonPositiveLookahead(f64),
}

/// Configuration for the conflict detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyRules {
    /// Minimum weighted separation in meters; anything strictly closer is a conflict
    pub safety_distance_m: f64,
    /// Nominal (coarsest) sampling step in seconds
    pub time_step_s: f64,
    /// Multiplier applied to altitude separation in the distance metric
    pub vertical_weight: f64,
    /// Look-ahead window for prediction filtering (seconds)
    #[serde(default)]
    pub lookahead_s: Option<f64>,
}

impl Default for SafetyRules {
    fn default() -> Self {
        Self {
            safety_distance_m: 10.0,
            time_step_s: 1.0,
            vertical_weight: 1.5,
            lookahead_s: None,
        }
    }
}

impl SafetyRules {
    pub fn new(safety_distance_m: f64, time_step_s: f64) -> Result<Self, RulesError> {
        let rules = Self {
            safety_distance_m,
            time_step_s,
            ..Self::default()
        };
        rules.validate()?;
        Ok(rules)
    }

    pub fn with_vertical_weight(mut self, vertical_weight: f64) -> Self {
        self.vertical_weight = vertical_weight;
        self
    }

    pub fn with_lookahead(mut self, lookahead_s: f64) -> Self {
        self.lookahead_s = Some(lookahead_s);
        self
    }

    /// Check every threshold. NaN fails every comparison and is rejected.
    pub fn validate(&self) -> Result<(), RulesError> {
        if !(self.safety_distance_m > 0.0) || !self.safety_distance_m.is_finite() {
            return Err(RulesError::NonPositiveSafetyDistance(self.safety_distance_m));
        }
        if !(self.time_step_s > 0.0) || !self.time_step_s.is_finite() {
            return Err(RulesError::NonPositiveTimeStep(self.time_step_s));
        }
        if !(self.vertical_weight >= 0.0) || !self.vertical_weight.is_finite() {
            return Err(RulesError::InvalidVerticalWeight(self.vertical_weight));
        }
        if let Some(lookahead) = self.lookahead_s {
            if !(lookahead > 0.0) {
                return Err(RulesError::NonPositiveLookahead(lookahead));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let rules = SafetyRules::default();
        assert!(rules.validate().is_ok());
        assert_eq!(rules.vertical_weight, 1.5);
        assert_eq!(rules.lookahead_s, None);
    }

    #[test]
    fn test_rejects_bad_thresholds() {
        assert_eq!(
            SafetyRules::new(0.0, 1.0),
            Err(RulesError::NonPositiveSafetyDistance(0.0))
        );
        assert_eq!(
            SafetyRules::new(10.0, -0.5),
            Err(RulesError::NonPositiveTimeStep(-0.5))
        );
        assert!(SafetyRules::new(f64::NAN, 1.0).is_err());

        let rules = SafetyRules::default().with_vertical_weight(-1.0);
        assert_eq!(rules.validate(), Err(RulesError::InvalidVerticalWeight(-1.0)));

        let rules = SafetyRules::default().with_lookahead(0.0);
        assert_eq!(rules.validate(), Err(RulesError::NonPositiveLookahead(0.0)));
    }

    #[test]
    fn test_zero_vertical_weight_allowed() {
        let rules = SafetyRules::default().with_vertical_weight(0.0);
        assert!(rules.validate().is_ok());
    }
}
