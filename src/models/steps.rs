//! Conversions between step goals and walking distance.

use crate::constants::{METERS_PER_STEP, MIN_STEPS};

pub fn steps_to_meters(steps: u32) -> f64 {
    steps as f64 * METERS_PER_STEP
}

pub fn meters_to_steps(meters: f64) -> u32 {
    (meters / METERS_PER_STEP).round().max(0.0) as u32
}

pub fn validate_steps(steps: u32) -> Result<(), String> {
    if steps < MIN_STEPS {
        return Err(format!("at least {} steps required, got {}", MIN_STEPS, steps));
    }
    Ok(())
}

/// `"42 min"` below an hour, `"1 h 5 min"` above.
pub fn format_duration(seconds: f64) -> String {
    let mins = (seconds / 60.0).round().max(0.0) as u64;
    if mins < 60 {
        return format!("{} min", mins);
    }
    format!("{} h {} min", mins / 60, mins % 60)
}
