//! Task enumeration and per-task bindings
//!
//! Each [`Task`] resolves once, at configuration time, into a [`TaskSpec`]
//! holding its classifier rule, threshold policy and hold variant as data.
//! Nothing downstream branches on task names.

use serde::{Deserialize, Serialize};

use super::landmark::landmark_index as idx;
use super::{ResultStatus, ThresholdPolicy};
use crate::config::EngineConfig;

/// Fixed set of assessable movement tasks
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Task {
    /// Raise the right wrist above the right shoulder
    ArmRaiseRight,
    /// Raise the left wrist above the left shoulder
    ArmRaiseLeft,
    /// Stand on the left leg with the right foot lifted
    OneLegLeft,
    /// Stand on the right leg with the left foot lifted
    OneLegRight,
}

impl Task {
    pub const ALL: [Task; 4] = [
        Task::ArmRaiseRight,
        Task::ArmRaiseLeft,
        Task::OneLegLeft,
        Task::OneLegRight,
    ];

    /// Wire identifier (`arm_raise_right`, ...).
    pub fn code(&self) -> &'static str {
        match self {
            Task::ArmRaiseRight => "arm_raise_right",
            Task::ArmRaiseLeft => "arm_raise_left",
            Task::OneLegLeft => "one_leg_left",
            Task::OneLegRight => "one_leg_right",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Task::ArmRaiseRight => "Raise Right Arm",
            Task::ArmRaiseLeft => "Raise Left Arm",
            Task::OneLegLeft => "One-Leg Stance (left support)",
            Task::OneLegRight => "One-Leg Stance (right support)",
        }
    }

    /// Prompt shown while the condition is not yet met.
    pub fn instruction(&self) -> &'static str {
        match self {
            Task::ArmRaiseRight => "Lift your right hand above the right shoulder",
            Task::ArmRaiseLeft => "Lift your left hand above the left shoulder",
            Task::OneLegLeft => "Stand on the left leg and lift the right foot",
            Task::OneLegRight => "Stand on the right leg and lift the left foot",
        }
    }

    /// One-line outcome of a single classification.
    pub fn outcome_text(&self, met: bool) -> &'static str {
        match (self, met) {
            (Task::ArmRaiseRight, true) => "Right arm raised",
            (Task::ArmRaiseRight, false) => "Right arm not raised",
            (Task::ArmRaiseLeft, true) => "Left arm raised",
            (Task::ArmRaiseLeft, false) => "Left arm not raised",
            (Task::OneLegLeft, true) => "Right foot lifted",
            (Task::OneLegLeft, false) => "Right foot not lifted",
            (Task::OneLegRight, true) => "Left foot lifted",
            (Task::OneLegRight, false) => "Left foot not lifted",
        }
    }

    /// Comparison rule for this task.
    pub fn rule(&self) -> RaiseRule {
        match self {
            Task::ArmRaiseRight => RaiseRule {
                raised: idx::RIGHT_WRIST,
                reference: idx::RIGHT_SHOULDER,
            },
            Task::ArmRaiseLeft => RaiseRule {
                raised: idx::LEFT_WRIST,
                reference: idx::LEFT_SHOULDER,
            },
            Task::OneLegLeft => RaiseRule {
                raised: idx::RIGHT_ANKLE,
                reference: idx::LEFT_ANKLE,
            },
            Task::OneLegRight => RaiseRule {
                raised: idx::LEFT_ANKLE,
                reference: idx::RIGHT_ANKLE,
            },
        }
    }

    /// Resolve the full binding for this task from the engine configuration.
    pub fn spec(&self, config: &EngineConfig) -> TaskSpec {
        let (threshold, hold) = match self {
            Task::ArmRaiseRight | Task::ArmRaiseLeft => (
                ThresholdPolicy::Boolean,
                HoldKind::Capped {
                    cap_ms: config.hold.cap_ms,
                },
            ),
            Task::OneLegLeft | Task::OneLegRight => (
                ThresholdPolicy::Duration {
                    warn_min: config.thresholds.one_leg.warn_secs,
                    pass_min: config.thresholds.one_leg.pass_secs,
                },
                HoldKind::OpenEnded,
            ),
        };
        TaskSpec {
            task: *self,
            rule: self.rule(),
            margin: config.classifier.margin,
            threshold,
            hold,
        }
    }
}

impl std::fmt::Display for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl std::str::FromStr for Task {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Task::ALL
            .into_iter()
            .find(|t| t.code() == s)
            .ok_or_else(|| format!("unknown task '{s}'"))
    }
}

/// Met when `raised` sits higher on screen than `reference` by more than the margin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RaiseRule {
    pub raised: usize,
    pub reference: usize,
}

/// Hold Timer variant bound to a task
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HoldKind {
    /// Hold-to-pass: completes once the condition has held for `cap_ms`.
    Capped { cap_ms: f64 },
    /// Duration-scored: runs until the condition drops, then scores the elapsed time.
    OpenEnded,
}

/// Everything the engine needs to run one task, resolved once.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TaskSpec {
    pub task: Task,
    pub rule: RaiseRule,
    pub margin: f64,
    pub threshold: ThresholdPolicy,
    pub hold: HoldKind,
}

impl TaskSpec {
    pub fn units(&self) -> &'static str {
        self.threshold.units()
    }

    /// Operator-facing note attached to a result with the given status.
    pub fn note_for(&self, status: ResultStatus) -> Option<String> {
        let note = match (self.threshold, status) {
            (_, ResultStatus::Pass) => return None,
            (ThresholdPolicy::Boolean, _) => "Wrist not above shoulder",
            (ThresholdPolicy::Duration { .. }, ResultStatus::Warn) => "Borderline balance time",
            (ThresholdPolicy::Duration { .. }, ResultStatus::Fail) => {
                "Raised foot not held up long enough"
            }
        };
        Some(note.to_string())
    }
}
