//! Threshold Evaluator
//!
//! Pure mapping from a completed measurement to a [`ResultStatus`]. Band
//! lower edges are inclusive: a measurement exactly at `pass_min` passes.

use crate::types::{ResultStatus, ThresholdPolicy};

/// Map a measurement to a status under `policy`.
///
/// - `Boolean`: `1.0` passes, anything else fails
/// - `Duration`: `< warn_min` fails, `< pass_min` warns, otherwise passes
///
/// Callers evaluate the unrounded measurement; display rounding happens later.
pub fn evaluate(policy: &ThresholdPolicy, measurement: f64) -> ResultStatus {
    match *policy {
        ThresholdPolicy::Boolean => {
            if measurement == 1.0 {
                ResultStatus::Pass
            } else {
                ResultStatus::Fail
            }
        }
        ThresholdPolicy::Duration { warn_min, pass_min } => {
            if measurement < warn_min {
                ResultStatus::Fail
            } else if measurement < pass_min {
                ResultStatus::Warn
            } else {
                ResultStatus::Pass
            }
        }
    }
}

/// Round seconds to one decimal place for recording.
pub fn round_tenths(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE_LEG: ThresholdPolicy = ThresholdPolicy::Duration {
        warn_min: 3.0,
        pass_min: 5.0,
    };

    #[test]
    fn test_duration_band_edges() {
        assert_eq!(evaluate(&ONE_LEG, 0.0), ResultStatus::Fail);
        assert_eq!(evaluate(&ONE_LEG, 2.999), ResultStatus::Fail);
        assert_eq!(evaluate(&ONE_LEG, 3.0), ResultStatus::Warn);
        assert_eq!(evaluate(&ONE_LEG, 4.999), ResultStatus::Warn);
        assert_eq!(evaluate(&ONE_LEG, 5.0), ResultStatus::Pass);
        assert_eq!(evaluate(&ONE_LEG, 42.0), ResultStatus::Pass);
    }

    #[test]
    fn test_duration_is_monotone() {
        let mut prev = ResultStatus::Fail;
        for i in 0..=100 {
            let status = evaluate(&ONE_LEG, i as f64 * 0.1);
            assert!(status >= prev);
            prev = status;
        }
    }

    #[test]
    fn test_boolean() {
        assert_eq!(evaluate(&ThresholdPolicy::Boolean, 1.0), ResultStatus::Pass);
        assert_eq!(evaluate(&ThresholdPolicy::Boolean, 0.0), ResultStatus::Fail);
        assert_eq!(evaluate(&ThresholdPolicy::Boolean, 0.5), ResultStatus::Fail);
    }

    #[test]
    fn test_round_tenths() {
        assert_eq!(round_tenths(4.96), 5.0);
        assert_eq!(round_tenths(4.94), 4.9);
        assert_eq!(round_tenths(0.0), 0.0);
    }
}
