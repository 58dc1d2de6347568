//! Published engine state
//!
//! Readers (HTTP handlers, renderers, tests) only ever see whole snapshots
//! taken between ticks, never a half-applied update.

use serde::Serialize;
use std::sync::Arc;

use crate::classifier::Judgment;
use crate::hold::HoldPhase;
use crate::kinematics::FrameMetrics;
use crate::types::{Task, TaskResult};

/// Point-in-time view of the engine.
#[derive(Debug, Clone, Serialize)]
pub struct EngineSnapshot {
    /// Active task, `None` when nothing is selected.
    pub task: Option<Task>,
    pub task_name: Option<&'static str>,
    pub phase: HoldPhase,
    /// Operator-facing status line.
    pub status: String,
    /// Judgment of the most recent tick.
    pub judgment: Option<Judgment>,
    /// `accumulated_ms / cap` for capped holds, 0 otherwise.
    pub hold_ratio: f64,
    pub accumulated_ms: f64,
    pub metrics: FrameMetrics,
    /// Center-of-mass extent `(dx, dy)` over the current duration session.
    pub sway: Option<(f64, f64)>,
    /// Ticks processed since startup.
    pub ticks: u64,
    /// Ledger contents, newest last.
    pub results: Arc<Vec<TaskResult>>,
}

impl EngineSnapshot {
    pub fn latest_result(&self) -> Option<&TaskResult> {
        self.results.last()
    }
}

impl Default for EngineSnapshot {
    fn default() -> Self {
        Self {
            task: None,
            task_name: None,
            phase: HoldPhase::Idle,
            status: super::NO_TASK_STATUS.to_string(),
            judgment: None,
            hold_ratio: 0.0,
            accumulated_ms: 0.0,
            metrics: FrameMetrics::default(),
            sway: None,
            ticks: 0,
            results: Arc::new(Vec::new()),
        }
    }
}
