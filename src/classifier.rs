//! Task Classifier
//!
//! Maps a landmark frame to a ternary judgment for a task. A missing frame or
//! a missing referenced landmark is `Indeterminate`, which is distinct from
//! `NotMet`: callers must never score a fail on an indeterminate tick.

use serde::Serialize;

use crate::kinematics::frame_vertical_offset;
use crate::types::{LandmarkFrame, RaiseRule, TaskSpec};

/// Per-tick classifier outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Judgment {
    Met,
    NotMet,
    /// Insufficient data this tick.
    Indeterminate,
}

impl Judgment {
    pub fn from_met(met: bool) -> Self {
        if met {
            Judgment::Met
        } else {
            Judgment::NotMet
        }
    }
}

impl std::fmt::Display for Judgment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Judgment::Met => write!(f, "met"),
            Judgment::NotMet => write!(f, "not met"),
            Judgment::Indeterminate => write!(f, "indeterminate"),
        }
    }
}

/// Apply a raise rule: met when `raised.y < reference.y - margin`.
pub fn classify_rule(rule: RaiseRule, margin: f64, frame: Option<&LandmarkFrame>) -> Judgment {
    let Some(frame) = frame else {
        return Judgment::Indeterminate;
    };
    match frame_vertical_offset(frame, rule.raised, rule.reference) {
        Some(offset) => Judgment::from_met(offset < -margin),
        None => Judgment::Indeterminate,
    }
}

/// Classify a frame for a resolved task.
pub fn classify(spec: &TaskSpec, frame: Option<&LandmarkFrame>) -> Judgment {
    classify_rule(spec.rule, spec.margin, frame)
}
