//! Engine configuration
//!
//! Tunable knobs for the annotation pipeline. Every empirically-tuned
//! constant the pipeline relies on (PMI scaling, decay half-life,
//! confidence threshold) lives here as an overridable default rather than
//! a buried magic number.
//!
//! Reconfiguration is per-key: an out-of-range value rejects only that
//! key, the previous value is retained, and the outcome reports which
//! keys were rejected and why.

use serde::{Deserialize, Serialize};

/// Main engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Minimum adjusted confidence for a highlight to be shown (0-100)
    pub min_confidence: f64,

    /// Cap on returned highlights per call (`None` = unbounded)
    pub max_highlights: Option<usize>,

    /// Positive-reinforcement learning rate (0.01-1.0)
    pub learning_rate: f64,

    /// Probability of forcing a highlight through regardless of learned
    /// quality (0-1)
    pub exploration_rate: f64,

    /// Context window scanned on each side of a phrase occurrence, in
    /// characters
    pub context_window_chars: usize,

    /// Half-life for quality-score decay toward neutral, in days
    pub decay_half_life_days: f64,

    /// Divisor applied to positive PMI when boosting multi-word phrases
    pub pmi_scale: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_confidence: 50.0,
            max_highlights: None,
            learning_rate: 0.1,
            exploration_rate: 0.15,
            context_window_chars: 100,
            decay_half_life_days: 30.0,
            pmi_scale: 5.0,
        }
    }
}

/// Partial configuration update; unset fields keep their current value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigPatch {
    pub min_confidence: Option<f64>,
    pub max_highlights: Option<Option<usize>>,
    pub learning_rate: Option<f64>,
    pub exploration_rate: Option<f64>,
    pub context_window_chars: Option<usize>,
    pub decay_half_life_days: Option<f64>,
    pub pmi_scale: Option<f64>,
}

impl ConfigPatch {
    pub fn is_empty(&self) -> bool {
        *self == ConfigPatch::default()
    }
}

/// A configuration key that failed validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedKey {
    pub key: &'static str,
    pub reason: String,
}

/// Result of applying a [`ConfigPatch`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOutcome {
    /// Keys whose values were accepted and applied
    pub applied: Vec<&'static str>,

    /// Keys rejected with the previous value retained
    pub rejected: Vec<RejectedKey>,
}

impl ConfigOutcome {
    pub fn all_applied(&self) -> bool {
        self.rejected.is_empty()
    }
}

impl EngineConfig {
    /// Apply a partial update, validating each key independently
    pub fn apply(&mut self, patch: &ConfigPatch) -> ConfigOutcome {
        let mut outcome = ConfigOutcome::default();

        if let Some(v) = patch.min_confidence {
            if (0.0..=100.0).contains(&v) {
                self.min_confidence = v;
                outcome.applied.push("min_confidence");
            } else {
                outcome.rejected.push(RejectedKey {
                    key: "min_confidence",
                    reason: format!("must be within 0-100, got {}", v),
                });
            }
        }

        if let Some(v) = patch.max_highlights {
            // Any count (or None for unbounded) is valid
            self.max_highlights = v;
            outcome.applied.push("max_highlights");
        }

        if let Some(v) = patch.learning_rate {
            if (0.01..=1.0).contains(&v) {
                self.learning_rate = v;
                outcome.applied.push("learning_rate");
            } else {
                outcome.rejected.push(RejectedKey {
                    key: "learning_rate",
                    reason: format!("must be within 0.01-1.0, got {}", v),
                });
            }
        }

        if let Some(v) = patch.exploration_rate {
            if (0.0..=1.0).contains(&v) {
                self.exploration_rate = v;
                outcome.applied.push("exploration_rate");
            } else {
                outcome.rejected.push(RejectedKey {
                    key: "exploration_rate",
                    reason: format!("must be within 0-1, got {}", v),
                });
            }
        }

        if let Some(v) = patch.context_window_chars {
            self.context_window_chars = v;
            outcome.applied.push("context_window_chars");
        }

        if let Some(v) = patch.decay_half_life_days {
            if v > 0.0 && v.is_finite() {
                self.decay_half_life_days = v;
                outcome.applied.push("decay_half_life_days");
            } else {
                outcome.rejected.push(RejectedKey {
                    key: "decay_half_life_days",
                    reason: format!("must be a positive number of days, got {}", v),
                });
            }
        }

        if let Some(v) = patch.pmi_scale {
            if v > 0.0 && v.is_finite() {
                self.pmi_scale = v;
                outcome.applied.push("pmi_scale");
            } else {
                outcome.rejected.push(RejectedKey {
                    key: "pmi_scale",
                    reason: format!("must be positive, got {}", v),
                });
            }
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.min_confidence, 50.0);
        assert_eq!(config.max_highlights, None);
        assert_eq!(config.learning_rate, 0.1);
        assert_eq!(config.exploration_rate, 0.15);
        assert_eq!(config.context_window_chars, 100);
    }

    #[test]
    fn test_empty_patch_changes_nothing() {
        let mut config = EngineConfig::default();
        let before = config.clone();

        let outcome = config.apply(&ConfigPatch::default());

        assert_eq!(config, before);
        assert!(outcome.applied.is_empty());
        assert!(outcome.rejected.is_empty());
    }

    #[test]
    fn test_out_of_range_key_rejected_others_applied() {
        let mut config = EngineConfig::default();
        let patch = ConfigPatch {
            exploration_rate: Some(1.5),
            min_confidence: Some(70.0),
            ..Default::default()
        };

        let outcome = config.apply(&patch);

        // exploration_rate keeps its previous value
        assert_eq!(config.exploration_rate, 0.15);
        assert_eq!(config.min_confidence, 70.0);
        assert_eq!(outcome.applied, vec!["min_confidence"]);
        assert_eq!(outcome.rejected.len(), 1);
        assert_eq!(outcome.rejected[0].key, "exploration_rate");
    }

    #[test]
    fn test_learning_rate_bounds() {
        let mut config = EngineConfig::default();

        let low = ConfigPatch {
            learning_rate: Some(0.005),
            ..Default::default()
        };
        assert!(!config.apply(&low).all_applied());
        assert_eq!(config.learning_rate, 0.1);

        let ok = ConfigPatch {
            learning_rate: Some(0.5),
            ..Default::default()
        };
        assert!(config.apply(&ok).all_applied());
        assert_eq!(config.learning_rate, 0.5);
    }

    #[test]
    fn test_max_highlights_can_be_cleared() {
        let mut config = EngineConfig::default();

        let set = ConfigPatch {
            max_highlights: Some(Some(5)),
            ..Default::default()
        };
        config.apply(&set);
        assert_eq!(config.max_highlights, Some(5));

        let clear = ConfigPatch {
            max_highlights: Some(None),
            ..Default::default()
        };
        config.apply(&clear);
        assert_eq!(config.max_highlights, None);
    }

    #[test]
    fn test_serialization_roundtrip() {
        let config = EngineConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }
}
