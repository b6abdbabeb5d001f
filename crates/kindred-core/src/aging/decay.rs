//! Three-phase decay curve with access and importance floors.

use chrono::{DateTime, Utc};
use kindred_types::config::AgingConfig;
use kindred_types::memory::{DecaySignals, MemoryState};

const HOURS_PER_DAY: f64 = 24.0;
const HOURS_PER_WEEK: f64 = 168.0;

/// Pure decay computation parameterized by [`AgingConfig`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecayPolicy {
    short_rate: f64,
    medium_rate: f64,
    long_rate: f64,
    archive_threshold: f32,
    delete_threshold: f32,
    access_bonus_per_consolidation: f32,
    max_access_bonus: f32,
    importance_weight: f32,
}

impl Default for DecayPolicy {
    fn default() -> Self {
        Self::new(&AgingConfig::default())
    }
}

impl DecayPolicy {
    pub fn new(config: &AgingConfig) -> Self {
        Self {
            short_rate: config.short_rate,
            medium_rate: config.medium_rate,
            long_rate: config.long_rate,
            archive_threshold: config.archive_threshold,
            delete_threshold: config.delete_threshold,
            access_bonus_per_consolidation: config.access_bonus_per_consolidation,
            max_access_bonus: config.max_access_bonus,
            importance_weight: config.importance_weight,
        }
    }

    pub fn archive_threshold(&self) -> f32 {
        self.archive_threshold
    }

    pub fn delete_threshold(&self) -> f32 {
        self.delete_threshold
    }

    /// Age-only decay, continuous across the day and week boundaries.
    ///
    /// Negative or NaN ages count as zero; infinite age decays to zero.
    pub fn base_decay(&self, age_hours: f64) -> f64 {
        let age = if age_hours.is_nan() || age_hours < 0.0 {
            0.0
        } else {
            age_hours
        };
        if age.is_infinite() {
            return 0.0;
        }

        if age < HOURS_PER_DAY {
            return self.short_rate.powf(age);
        }

        let at_day = self.short_rate.powf(HOURS_PER_DAY);
        if age < HOURS_PER_WEEK {
            return at_day * self.medium_rate.powf((age - HOURS_PER_DAY) / HOURS_PER_DAY);
        }

        let at_week = at_day * self.medium_rate.powf((HOURS_PER_WEEK - HOURS_PER_DAY) / HOURS_PER_DAY);
        at_week * self.long_rate.powf((age - HOURS_PER_WEEK) / HOURS_PER_WEEK)
    }

    /// Bonus from repeated access, capped.
    pub fn access_bonus(&self, consolidation_count: u32) -> f32 {
        (consolidation_count as f32 * self.access_bonus_per_consolidation)
            .min(self.max_access_bonus)
            .max(0.0)
    }

    /// Bonus from importance.
    pub fn importance_bonus(&self, importance_score: f32) -> f32 {
        let importance = if importance_score.is_nan() {
            0.0
        } else {
            importance_score.clamp(0.0, 1.0)
        };
        importance * self.importance_weight
    }

    /// Final decay factor in `[0, 1]`.
    ///
    /// Age is measured from creation. Access only raises the bonus, so a
    /// recalled memory still keeps aging.
    pub fn decay_factor(&self, signals: &DecaySignals, now: DateTime<Utc>) -> f32 {
        let age_hours = (now - signals.created_at).num_milliseconds() as f64 / 3_600_000.0;
        let base = self.base_decay(age_hours) as f32;
        let total = base
            + self.access_bonus(signals.consolidation_count)
            + self.importance_bonus(signals.importance_score);

        if total.is_nan() {
            return 0.0;
        }
        total.clamp(0.0, 1.0)
    }

    /// Lifecycle state implied by a decay factor.
    pub fn state_for(&self, decay: f32) -> MemoryState {
        if decay < self.delete_threshold {
            MemoryState::Deleted
        } else if decay < self.archive_threshold {
            MemoryState::Archived
        } else if decay > 0.8 {
            MemoryState::Fresh
        } else {
            MemoryState::Consolidated
        }
    }
}
