//! Threshold policies and built-in cutoff constants

use serde::{Deserialize, Serialize};

/// Built-in defaults for task classification and scoring
pub mod task_thresholds {
    /// Normalized-units margin a raised point must clear to count as "above".
    pub const RAISE_MARGIN: f64 = 0.03;

    /// Hold-to-pass cap (ms).
    pub const HOLD_CAP_MS: f64 = 2000.0;
    /// Fraction of elapsed time removed per not-met tick.
    pub const HOLD_DECAY_FACTOR: f64 = 0.75;

    /// One-leg stance: below this many seconds is a fail.
    pub const ONE_LEG_WARN_SECS: f64 = 3.0;
    /// One-leg stance: at or above this many seconds is a pass.
    pub const ONE_LEG_PASS_SECS: f64 = 5.0;
}

/// How a completed measurement maps to a [`ResultStatus`](super::ResultStatus)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ThresholdPolicy {
    /// Measurement is 0 or 1; 1 passes, anything else fails. No warn tier.
    Boolean,
    /// Two cutoffs with `warn_min < pass_min`, lower edge of each band inclusive.
    Duration { warn_min: f64, pass_min: f64 },
}

impl ThresholdPolicy {
    /// Units string recorded alongside a measurement under this policy.
    pub fn units(&self) -> &'static str {
        match self {
            ThresholdPolicy::Boolean => "-",
            ThresholdPolicy::Duration { .. } => "s",
        }
    }
}
