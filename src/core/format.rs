// Data structures for samples, signal configuration and published frames

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

use crate::core::constants::*;
use crate::core::error::{Result, StreamError};
use crate::core::window::SampleWindow;

/// One observation of a signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub threshold: f64,
}

impl Sample {
    pub fn new(timestamp: DateTime<Utc>, value: f64, threshold: f64) -> Self {
        Self {
            timestamp,
            value,
            threshold,
        }
    }

    pub fn exceeds_threshold(&self) -> bool {
        self.value >= self.threshold
    }
}

/// How a signal's values are produced on each tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Distribution {
    /// Uniform in `[low, high)`.
    Uniform { low: f64, high: f64 },
    /// Values pushed by a producer through a feed.
    External,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalConfig {
    pub id: String,
    pub label: String,
    pub unit: String,
    /// Decimal places used when formatting values for display.
    #[serde(default)]
    pub decimals: usize,
    pub threshold: f64,
    pub distribution: Distribution,
}

impl SignalConfig {
    pub fn uniform(id: &str, label: &str, unit: &str, low: f64, high: f64, threshold: f64) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            unit: unit.to_string(),
            decimals: 2,
            threshold,
            distribution: Distribution::Uniform { low, high },
        }
    }

    pub fn external(id: &str, label: &str, unit: &str, threshold: f64) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            unit: unit.to_string(),
            decimals: 2,
            threshold,
            distribution: Distribution::External,
        }
    }

    pub fn with_decimals(mut self, decimals: usize) -> Self {
        self.decimals = decimals;
        self
    }

    pub fn vibration() -> Self {
        let (low, high, threshold) = VIBRATION_RANGE;
        Self::uniform(VIBRATION, "Vibration", "mm/s", low, high, threshold).with_decimals(2)
    }

    pub fn temperature() -> Self {
        let (low, high, threshold) = TEMPERATURE_RANGE;
        Self::uniform(TEMPERATURE, "Temperature", "°F", low, high, threshold).with_decimals(1)
    }

    pub fn fan_speed() -> Self {
        let (low, high, threshold) = FAN_SPEED_RANGE;
        Self::uniform(FAN_SPEED, "Fan Speed", "RPM", low, high, threshold).with_decimals(0)
    }

    /// The three live charts of the monitoring dashboard.
    pub fn presets() -> Vec<Self> {
        vec![Self::vibration(), Self::temperature(), Self::fan_speed()]
    }

    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(StreamError::InvalidConfig("signal id is empty".to_string()));
        }
        if !self.threshold.is_finite() {
            return Err(StreamError::InvalidConfig(format!(
                "{}: threshold must be finite",
                self.id
            )));
        }
        if let Distribution::Uniform { low, high } = self.distribution {
            if !low.is_finite() || !high.is_finite() {
                return Err(StreamError::InvalidConfig(format!(
                    "{}: range bounds must be finite",
                    self.id
                )));
            }
            if low >= high {
                return Err(StreamError::InvalidConfig(format!(
                    "{}: empty range [{}, {})",
                    self.id, low, high
                )));
            }
            // The sampler draws from `high - low`, which must itself be finite.
            if !(high - low).is_finite() {
                return Err(StreamError::InvalidConfig(format!(
                    "{}: range [{}, {}) is too wide",
                    self.id, low, high
                )));
            }
        }
        Ok(())
    }
}

/// Validates every signal and rejects duplicate ids.
pub fn validate_signals(signals: &[SignalConfig]) -> Result<()> {
    let mut seen = HashSet::new();
    for signal in signals {
        signal.validate()?;
        if !seen.insert(signal.id.as_str()) {
            return Err(StreamError::DuplicateSignal(signal.id.clone()));
        }
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct StreamOptions {
    pub capacity: usize,
    pub tick_period: Duration,
    pub backfill_spacing: Duration,
    /// Fixed RNG seed for reproducible streams.
    pub seed: Option<u64>,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            capacity: WINDOW_CAPACITY,
            tick_period: TICK_PERIOD,
            backfill_spacing: BACKFILL_SPACING,
            seed: None,
        }
    }
}

impl StreamOptions {
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(StreamError::InvalidConfig(
                "window capacity must be at least 1".to_string(),
            ));
        }
        if self.tick_period.is_zero() {
            return Err(StreamError::InvalidConfig(
                "tick period must be non-zero".to_string(),
            ));
        }
        if std::time::Instant::now().checked_add(self.tick_period).is_none() {
            return Err(StreamError::InvalidConfig(format!(
                "tick period {:?} is out of range",
                self.tick_period
            )));
        }
        self.backfill_step()?;
        Ok(())
    }

    /// Spacing between backfilled samples, checked so the oldest backfilled
    /// timestamp is representable.
    pub fn backfill_step(&self) -> Result<TimeDelta> {
        let out_of_range = || {
            StreamError::InvalidConfig(format!(
                "backfill spacing {:?} over {} samples is out of range",
                self.backfill_spacing, self.capacity
            ))
        };

        let step = TimeDelta::from_std(self.backfill_spacing).map_err(|_| out_of_range())?;
        let steps = i32::try_from(self.capacity.saturating_sub(1)).map_err(|_| out_of_range())?;
        let span = step.checked_mul(steps).ok_or_else(out_of_range)?;
        if Utc::now().checked_sub_signed(span).is_none() {
            return Err(out_of_range());
        }
        Ok(step)
    }
}

/// One signal's window as published to renderers.
#[derive(Debug, Clone, Serialize)]
pub struct SignalWindow {
    pub id: String,
    pub label: String,
    pub unit: String,
    pub decimals: usize,
    pub threshold: f64,
    pub samples: SampleWindow,
}

impl SignalWindow {
    pub fn new(config: &SignalConfig, capacity: usize) -> Self {
        Self {
            id: config.id.clone(),
            label: config.label.clone(),
            unit: config.unit.clone(),
            decimals: config.decimals,
            threshold: config.threshold,
            samples: SampleWindow::new(capacity),
        }
    }

    /// Latest value with the signal's display precision, e.g. `"3.27 mm/s"`.
    pub fn format_latest(&self) -> Option<String> {
        self.samples
            .latest()
            .map(|s| format!("{:.*} {}", self.decimals, s.value, self.unit))
    }
}

/// Every signal's window after one tick.
#[derive(Debug, Clone, Serialize)]
pub struct StreamFrame {
    /// 0 after backfill, +1 per applied tick.
    pub seq: u64,
    pub at: DateTime<Utc>,
    pub windows: Vec<SignalWindow>,
}

impl StreamFrame {
    pub fn window(&self, signal_id: &str) -> Option<&SignalWindow> {
        self.windows.iter().find(|w| w.id == signal_id)
    }
}
