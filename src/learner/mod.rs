//! Behavior learning from implicit user feedback
//!
//! Tracks one [`InteractionRecord`] per (phrase, category) pairing and
//! converts shown/clicked/ignored signals into a quality score that
//! scales highlight confidence. Clicking reinforces asymptotically toward
//! 1.0; ignoring pushes down at half strength; elapsed time decays every
//! score back toward the neutral 0.5 so stale preferences fade.
//!
//! An epsilon-greedy exploration branch occasionally forces a highlight
//! through regardless of learned quality, so the engine keeps gathering
//! signal on pairings it would otherwise stop showing.

pub mod exploration;

use crate::config::EngineConfig;
use crate::types::interaction_key;
use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use exploration::{default_source, seeded_source, RandomSource};

/// Feedback state for one (phrase, category) pairing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub phrase: String,
    pub category_id: String,
    pub shown_count: u64,
    pub clicked_count: u64,
    pub last_shown_at: Option<DateTime<Utc>>,
    pub last_clicked_at: Option<DateTime<Utc>>,
    pub quality_score: f64,
}

impl InteractionRecord {
    fn new(phrase: &str, category_id: &str) -> Self {
        Self {
            phrase: phrase.to_lowercase(),
            category_id: category_id.to_string(),
            shown_count: 0,
            clicked_count: 0,
            last_shown_at: None,
            last_clicked_at: None,
            quality_score: 0.5,
        }
    }

    /// Decay quality toward neutral 0.5 based on time since last shown
    fn decay(&mut self, half_life_days: f64, now: DateTime<Utc>) {
        let Some(last) = self.last_shown_at else {
            return;
        };
        let elapsed_days = (now - last).num_seconds() as f64 / 86_400.0;
        if elapsed_days <= 0.0 {
            return;
        }
        let retention = 0.5_f64.powf(elapsed_days / half_life_days);
        self.quality_score = 0.5 + (self.quality_score - 0.5) * retention;
    }
}

/// Outcome of a show/suppress decision
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub show: bool,
    pub adjusted_confidence: f64,
    pub explored: bool,
}

/// Snapshot of all interaction records for persistence
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LearnerSnapshot {
    pub records: Vec<InteractionRecord>,
}

/// Aggregate diagnostics over all records
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LearnerStats {
    pub record_count: usize,
    pub total_shown: u64,
    pub total_clicked: u64,
    pub mean_quality: f64,
}

/// Converts feedback events into confidence adjustments
pub struct BehaviorLearningEngine {
    records: FxHashMap<String, InteractionRecord>,
    random: Box<dyn RandomSource>,
}

impl BehaviorLearningEngine {
    pub fn new(random: Box<dyn RandomSource>) -> Self {
        Self {
            records: FxHashMap::default(),
            random,
        }
    }

    fn record_mut(&mut self, phrase: &str, category_id: &str) -> &mut InteractionRecord {
        self.records
            .entry(interaction_key(phrase, category_id))
            .or_insert_with(|| InteractionRecord::new(phrase, category_id))
    }

    /// Look up a record without creating one
    pub fn record(&self, phrase: &str, category_id: &str) -> Option<&InteractionRecord> {
        self.records.get(&interaction_key(phrase, category_id))
    }

    /// A highlight for this pairing was shown to the user
    pub fn record_shown(
        &mut self,
        phrase: &str,
        category_id: &str,
        config: &EngineConfig,
        now: DateTime<Utc>,
    ) {
        let half_life = config.decay_half_life_days;
        let record = self.record_mut(phrase, category_id);
        record.decay(half_life, now);
        record.shown_count += 1;
        record.last_shown_at = Some(now);
    }

    /// The user clicked a highlight: strong positive signal
    pub fn record_clicked(
        &mut self,
        phrase: &str,
        category_id: &str,
        config: &EngineConfig,
        now: DateTime<Utc>,
    ) {
        let rate = config.learning_rate;
        let half_life = config.decay_half_life_days;
        let record = self.record_mut(phrase, category_id);
        record.decay(half_life, now);

        record.clicked_count += 1;
        // A click implies the highlight was shown; keep the invariant
        // clicked <= shown even if the shown event never arrived
        if record.clicked_count > record.shown_count {
            record.shown_count = record.clicked_count;
        }
        record.quality_score += rate * (1.0 - record.quality_score);
        record.quality_score = record.quality_score.clamp(0.0, 1.0);
        record.last_clicked_at = Some(now);

        debug!(
            "Clicked '{}'/{}: quality now {:.3}",
            phrase, category_id, record.quality_score
        );
    }

    /// The user dismissed a highlight: weak negative signal
    pub fn record_ignored(
        &mut self,
        phrase: &str,
        category_id: &str,
        config: &EngineConfig,
        now: DateTime<Utc>,
    ) {
        let rate = config.learning_rate;
        let half_life = config.decay_half_life_days;
        let record = self.record_mut(phrase, category_id);
        record.decay(half_life, now);

        // Ignoring is a weaker signal than clicking: half the rate
        record.quality_score -= rate * record.quality_score * 0.5;
        record.quality_score = record.quality_score.clamp(0.0, 1.0);
    }

    /// Decide whether a highlight should be shown
    ///
    /// With probability `exploration_rate` the highlight is forced
    /// through at its base confidence; otherwise confidence is scaled by
    /// the learned quality and compared against `min_confidence`.
    pub fn should_show(
        &mut self,
        phrase: &str,
        category_id: &str,
        base_confidence: f64,
        config: &EngineConfig,
        now: DateTime<Utc>,
    ) -> Decision {
        if self.random.next_f64() < config.exploration_rate {
            return Decision {
                show: true,
                adjusted_confidence: base_confidence.clamp(0.0, 100.0),
                explored: true,
            };
        }

        let quality = match self.records.get_mut(&interaction_key(phrase, category_id)) {
            Some(record) => {
                record.decay(config.decay_half_life_days, now);
                record.quality_score
            }
            // Unseen pairings sit at neutral quality; the record itself
            // is created lazily on the first shown event
            None => 0.5,
        };

        let adjusted = (base_confidence * (0.5 + quality)).clamp(0.0, 100.0);
        Decision {
            show: adjusted >= config.min_confidence,
            adjusted_confidence: adjusted,
            explored: false,
        }
    }

    /// Aggregate diagnostics
    pub fn stats(&self) -> LearnerStats {
        let record_count = self.records.len();
        let total_shown = self.records.values().map(|r| r.shown_count).sum();
        let total_clicked = self.records.values().map(|r| r.clicked_count).sum();
        let mean_quality = if record_count == 0 {
            0.5
        } else {
            self.records.values().map(|r| r.quality_score).sum::<f64>() / record_count as f64
        };

        LearnerStats {
            record_count,
            total_shown,
            total_clicked,
            mean_quality,
        }
    }

    /// Export all records, deterministically ordered
    pub fn snapshot(&self) -> LearnerSnapshot {
        let mut records: Vec<InteractionRecord> = self.records.values().cloned().collect();
        records.sort_by(|a, b| {
            a.phrase
                .cmp(&b.phrase)
                .then_with(|| a.category_id.cmp(&b.category_id))
        });
        LearnerSnapshot { records }
    }

    /// Replace all records from a snapshot
    pub fn restore(&mut self, snapshot: LearnerSnapshot) {
        self.records = snapshot
            .records
            .into_iter()
            .map(|r| (interaction_key(&r.phrase, &r.category_id), r))
            .collect();
    }

    /// Drop all records
    pub fn clear(&mut self) {
        self.records.clear();
    }
}
