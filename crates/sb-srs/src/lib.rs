//! SRS (Spaced Repetition System) library for Study Buddy
//!
//! This crate provides the core spaced repetition algorithm used to schedule topic
//! reviews. Everything here is pure: no I/O and no state beyond the interval
//! configuration a [`ReviewScheduler`] is built with.

use chrono::{DateTime, Datelike, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod due;
mod retention;

pub use due::select_due_topics;
pub use retention::{DEFAULT_STRENGTH, estimate_retention};

/// Default review intervals, in days.
pub const DEFAULT_INTERVALS: [f64; 7] = [1.0, 3.0, 7.0, 14.0, 30.0, 60.0, 120.0];

/// Default growth factor applied once the interval table is exhausted.
pub const DEFAULT_GROWTH_FACTOR: f64 = 2.5;

/// Lower bound (inclusive) of the high performance band.
const HIGH_PERFORMANCE: f64 = 0.8;

/// Lower bound (inclusive) of the medium performance band.
const MEDIUM_PERFORMANCE: f64 = 0.6;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Last year a review date may fall in, keeping timestamps four-digit ISO-8601.
pub const MAX_REVIEW_YEAR: i32 = 9999;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SrsError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Invalid scheduler configuration: {0}")]
    InvalidConfig(String),
    #[error("Review interval of {days} days goes past the supported date range")]
    IntervalOverflow { days: f64 },
}

/// Performance band a normalized score falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceBand {
    /// `performance >= 0.8`: the interval is stretched.
    High,
    /// `0.6 <= performance < 0.8`: the interval is used as is.
    Medium,
    /// `performance < 0.6`: the interval is shortened and the schedule steps back one level.
    Low,
}

impl PerformanceBand {
    /// Classify a normalized performance score.
    ///
    /// # Arguments
    ///
    /// * `performance` - Score in `[0, 1]`, where 1 is perfect
    ///
    /// # Errors
    ///
    /// Returns [`SrsError::InvalidArgument`] when the score is outside `[0, 1]` or NaN.
    pub fn classify(performance: f64) -> Result<Self, SrsError> {
        validate_performance(performance)?;
        let band = if performance >= HIGH_PERFORMANCE {
            Self::High
        } else if performance >= MEDIUM_PERFORMANCE {
            Self::Medium
        } else {
            Self::Low
        };
        Ok(band)
    }

    /// Multiplier applied to the base interval.
    pub const fn multiplier(self) -> f64 {
        match self {
            Self::High => 1.2,
            Self::Medium => 1.0,
            Self::Low => 0.7,
        }
    }

    /// Repetition number used for the interval lookup.
    ///
    /// Low performance steps back one level, floored at zero. The persisted counter
    /// is not affected by this.
    pub const fn effective_repetition(self, repetition_number: u32) -> u32 {
        match self {
            Self::Low => repetition_number.saturating_sub(1),
            Self::High | Self::Medium => repetition_number,
        }
    }
}

/// Check that a normalized performance score lies in `[0, 1]`.
pub fn validate_performance(performance: f64) -> Result<(), SrsError> {
    // `contains` is false for NaN
    if !(0.0..=1.0).contains(&performance) {
        return Err(SrsError::InvalidArgument(format!(
            "performance must be within [0, 1], got {performance}"
        )));
    }
    Ok(())
}

/// Interval table and growth factor driving the scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Base intervals in days, indexed by repetition number.
    pub intervals: Vec<f64>,
    /// Geometric growth applied per repetition past the end of `intervals`.
    pub growth_factor: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            intervals: DEFAULT_INTERVALS.to_vec(),
            growth_factor: DEFAULT_GROWTH_FACTOR,
        }
    }
}

impl SchedulerConfig {
    /// Validate the configuration.
    ///
    /// A non-empty, positive, non-decreasing table and a growth factor of at least 1
    /// are what keep the next review non-decreasing in performance at a fixed
    /// repetition number.
    pub fn validate(&self) -> Result<(), SrsError> {
        if self.intervals.is_empty() {
            return Err(SrsError::InvalidConfig(
                "interval table cannot be empty".to_string(),
            ));
        }

        if let Some(bad) = self
            .intervals
            .iter()
            .find(|days| !days.is_finite() || **days <= 0.0)
        {
            return Err(SrsError::InvalidConfig(format!(
                "intervals must be finite and positive, got {bad}"
            )));
        }

        if self.intervals.windows(2).any(|pair| pair[1] < pair[0]) {
            return Err(SrsError::InvalidConfig(
                "intervals must be non-decreasing".to_string(),
            ));
        }

        if !self.growth_factor.is_finite() || self.growth_factor < 1.0 {
            return Err(SrsError::InvalidConfig(format!(
                "growth factor must be finite and at least 1, got {}",
                self.growth_factor
            )));
        }

        Ok(())
    }
}

/// Computes review timing from a fixed interval table and a performance multiplier.
#[derive(Debug, Clone)]
pub struct ReviewScheduler {
    config: SchedulerConfig,
}

impl Default for ReviewScheduler {
    fn default() -> Self {
        Self {
            config: SchedulerConfig::default(),
        }
    }
}

impl ReviewScheduler {
    /// Creates a scheduler from a validated configuration.
    pub fn new(config: SchedulerConfig) -> Result<Self, SrsError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The configuration this scheduler was built with.
    pub const fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Get the base interval in days for an effective repetition number.
    ///
    /// Within the table the entry is used directly. Past the end the last entry grows
    /// geometrically: `table[last] * growth ^ (repetition - last)`.
    pub fn base_interval(&self, effective_repetition: u32) -> f64 {
        let intervals = &self.config.intervals;
        // Non-empty, checked by `SchedulerConfig::validate`.
        let last_index = intervals.len() - 1;

        match intervals.get(effective_repetition as usize) {
            Some(days) => *days,
            None => {
                let extra = f64::from(effective_repetition) - last_index as f64;
                intervals[last_index] * self.config.growth_factor.powf(extra)
            }
        }
    }

    /// Get the adjusted interval in days, which may be fractional.
    pub fn interval_days(&self, repetition_number: u32, performance: f64) -> Result<f64, SrsError> {
        let band = PerformanceBand::classify(performance)?;
        let base = self.base_interval(band.effective_repetition(repetition_number));
        Ok(base * band.multiplier())
    }

    /// Compute the next review date.
    ///
    /// # Arguments
    ///
    /// * `last_review` - When the topic was last reviewed
    /// * `repetition_number` - Completed review cycles so far (0 = first review)
    /// * `performance` - Score in `[0, 1]`, where 1 is perfect
    ///
    /// # Returns
    ///
    /// `last_review` shifted by the adjusted interval, at millisecond precision.
    ///
    /// # Errors
    ///
    /// [`SrsError::InvalidArgument`] for an out of range performance and
    /// [`SrsError::IntervalOverflow`] when the review would land after
    /// [`MAX_REVIEW_YEAR`].
    pub fn compute_next_review(
        &self,
        last_review: DateTime<Utc>,
        repetition_number: u32,
        performance: f64,
    ) -> Result<DateTime<Utc>, SrsError> {
        let days = self.interval_days(repetition_number, performance)?;
        let offset = days_to_duration(days)?;
        last_review
            .checked_add_signed(offset)
            .filter(|next| next.year() <= MAX_REVIEW_YEAR)
            .ok_or(SrsError::IntervalOverflow { days })
    }
}

fn days_to_duration(days: f64) -> Result<Duration, SrsError> {
    let millis = (days * MILLIS_PER_DAY).round();
    if !millis.is_finite() || millis >= i64::MAX as f64 {
        return Err(SrsError::IntervalOverflow { days });
    }
    Duration::try_milliseconds(millis as i64).ok_or(SrsError::IntervalOverflow { days })
}
