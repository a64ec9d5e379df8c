// Stream constants and built-in signal presets

use std::time::Duration;

/// Samples kept per signal window.
pub const WINDOW_CAPACITY: usize = 20;

/// Period of the live tick.
pub const TICK_PERIOD: Duration = Duration::from_millis(2000);

/// Spacing between backfilled samples at start.
pub const BACKFILL_SPACING: Duration = Duration::from_millis(1000);

// Signal ids
pub const VIBRATION: &str = "vibration";
pub const TEMPERATURE: &str = "temperature";
pub const FAN_SPEED: &str = "fan_speed";

// Preset distributions: (low, high, threshold)
pub const VIBRATION_RANGE: (f64, f64, f64) = (2.5, 4.0, 4.0); // mm/s
pub const TEMPERATURE_RANGE: (f64, f64, f64) = (68.0, 74.0, 75.0); // °F
pub const FAN_SPEED_RANGE: (f64, f64, f64) = (1200.0, 1600.0, 1800.0); // RPM
