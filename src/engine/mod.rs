//! Task-evaluation engine
//!
//! Owns the active task, its hold timer and the result ledger. One tick:
//!
//! ```text
//! frame ─► FrameMetrics ─► classify ─► HoldTimer::tick ─► evaluate ─► ledger
//!                                                                    │
//!                                         EngineSnapshot (watch) ◄───┘
//! ```
//!
//! The engine is a plain single-owner value. Scheduling is injected: callers
//! pass each tick's frame and measured `dt`, so tests can drive it with a
//! synthetic clock and the pipeline drives it from a timer or frame stream.

mod command;
mod snapshot;

pub use command::{CommandEnvelope, CommandOutcome, CommandReply, EngineCommand, EngineHandle};
pub use snapshot::EngineSnapshot;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info};

use crate::classifier::{classify, Judgment};
use crate::config::EngineConfig;
use crate::evaluator::{evaluate, round_tenths};
use crate::hold::{DecayPolicy, HoldEvent, HoldPhase, HoldTimer};
use crate::kinematics::{FrameMetrics, SwayTracker};
use crate::storage::ResultLedger;
use crate::types::{
    HoldKind, LandmarkFrame, ResultStatus, Task, TaskResult, TaskSpec, ThresholdPolicy,
};

pub(crate) const NO_TASK_STATUS: &str = "Select a task";
const NO_POSE_STATUS: &str = "No pose detected";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("no task is active")]
    NoActiveTask,
    #[error("task {0} is not a pass/fail task")]
    NotCheckable(Task),
    #[error("task {0} completes on its own and cannot be finished manually")]
    NotFinishable(Task),
    #[error("engine loop is not running")]
    Stopped,
}

pub struct Engine {
    config: EngineConfig,
    decay: DecayPolicy,
    ledger: ResultLedger,
    active: Option<TaskSpec>,
    hold: HoldTimer,
    status: String,
    judgment: Option<Judgment>,
    metrics: FrameMetrics,
    sway: SwayTracker,
    ticks: u64,
    results: Arc<Vec<TaskResult>>,
    snapshot_tx: watch::Sender<EngineSnapshot>,
}

impl Engine {
    pub fn new(config: &EngineConfig, ledger: ResultLedger) -> Self {
        let decay = DecayPolicy::from_config(&config.hold);
        let results = Arc::new(ledger.all().to_vec());
        let (snapshot_tx, _) = watch::channel(EngineSnapshot::default());
        let engine = Self {
            config: config.clone(),
            decay,
            ledger,
            active: None,
            hold: HoldTimer::new(HoldKind::OpenEnded, decay),
            status: NO_TASK_STATUS.to_string(),
            judgment: None,
            metrics: FrameMetrics::default(),
            sway: SwayTracker::new(),
            ticks: 0,
            results,
            snapshot_tx,
        };
        engine.publish();
        engine
    }

    pub fn subscribe(&self) -> watch::Receiver<EngineSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn active_task(&self) -> Option<Task> {
        self.active.map(|spec| spec.task)
    }

    pub fn ledger(&self) -> &ResultLedger {
        &self.ledger
    }

    pub fn hold(&self) -> &HoldTimer {
        &self.hold
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    /// Current state as a snapshot (also what was last published).
    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            task: self.active_task(),
            task_name: self.active.map(|s| s.task.display_name()),
            phase: self.hold.phase(),
            status: self.status.clone(),
            judgment: self.judgment,
            hold_ratio: self.hold.ratio(),
            accumulated_ms: self.hold.accumulated_ms(),
            metrics: self.metrics,
            sway: self.sway.extent(),
            ticks: self.ticks,
            results: Arc::clone(&self.results),
        }
    }

    // ========================================================================
    // Task control
    // ========================================================================

    /// Switch the active task. Hold state is always discarded; `None` deselects.
    pub fn select_task(&mut self, task: Option<Task>) {
        self.active = task.map(|t| t.spec(&self.config));
        self.judgment = None;
        self.sway.reset();
        match self.active {
            Some(spec) => {
                self.hold = HoldTimer::new(spec.hold, self.decay);
                self.hold.start();
                self.status = spec.task.instruction().to_string();
                info!(task = %spec.task, hold = ?spec.hold, "Task selected");
            }
            None => {
                self.hold.reset();
                self.status = NO_TASK_STATUS.to_string();
                info!("Task deselected");
            }
        }
        self.publish();
    }

    /// Fresh session of the active task.
    pub fn restart(&mut self) -> Result<(), EngineError> {
        let spec = self.active.ok_or(EngineError::NoActiveTask)?;
        self.hold.start();
        self.sway.reset();
        self.judgment = None;
        self.status = spec.task.instruction().to_string();
        info!(task = %spec.task, "Task restarted");
        self.publish();
        Ok(())
    }

    /// Finalize an open-ended session with the time held so far.
    ///
    /// Returns `Ok(None)` if the session had already terminated.
    pub fn finish(&mut self) -> Result<Option<TaskResult>, EngineError> {
        let spec = self.active.ok_or(EngineError::NoActiveTask)?;
        if spec.hold != HoldKind::OpenEnded {
            return Err(EngineError::NotFinishable(spec.task));
        }
        let recorded = self.hold.finish().map(|event| self.record(spec, event));
        self.publish();
        Ok(recorded)
    }

    /// Classify `frame` once for the active pass/fail task and record the outcome.
    ///
    /// Indeterminate frames record nothing. Hold progress is untouched.
    pub fn check(&mut self, frame: Option<&LandmarkFrame>) -> Result<Option<TaskResult>, EngineError> {
        let spec = self.active.ok_or(EngineError::NoActiveTask)?;
        if spec.threshold != ThresholdPolicy::Boolean {
            return Err(EngineError::NotCheckable(spec.task));
        }

        let judgment = classify(&spec, frame);
        self.judgment = Some(judgment);
        let met = match judgment {
            Judgment::Indeterminate => {
                self.status = NO_POSE_STATUS.to_string();
                self.publish();
                return Ok(None);
            }
            Judgment::Met => true,
            Judgment::NotMet => false,
        };

        let measurement = if met { 1.0 } else { 0.0 };
        let status = evaluate(&spec.threshold, measurement);
        let result = TaskResult::new(
            spec.task,
            measurement,
            spec.units(),
            status,
            spec.note_for(status),
        );
        self.status = spec.task.outcome_text(met).to_string();
        self.append(result.clone());
        self.publish();
        Ok(Some(result))
    }

    pub fn clear_results(&mut self) {
        self.ledger.clear();
        self.results = Arc::new(Vec::new());
        self.publish();
    }

    /// Apply a command received from outside the tick loop.
    ///
    /// `latest_frame` is the frame an instant check classifies.
    pub fn apply(&mut self, command: EngineCommand, latest_frame: Option<&LandmarkFrame>) -> CommandReply {
        debug!(%command, "Applying engine command");
        match command {
            EngineCommand::SelectTask(task) => {
                self.select_task(task);
                Ok(CommandOutcome::Ack)
            }
            EngineCommand::Restart => self.restart().map(|()| CommandOutcome::Ack),
            EngineCommand::Finish => self.finish().map(CommandOutcome::Recorded),
            EngineCommand::Check => self.check(latest_frame).map(CommandOutcome::Recorded),
            EngineCommand::ClearResults => {
                self.clear_results();
                Ok(CommandOutcome::Ack)
            }
        }
    }

    // ========================================================================
    // Tick
    // ========================================================================

    /// Advance one tick with the latest frame and the measured time since the
    /// previous tick. Returns the result recorded on this tick, if any.
    pub fn tick(&mut self, frame: Option<&LandmarkFrame>, dt: Duration) -> Option<TaskResult> {
        self.ticks += 1;
        self.metrics = frame.map(FrameMetrics::from_frame).unwrap_or_default();

        let Some(spec) = self.active else {
            self.judgment = None;
            self.publish();
            return None;
        };

        if self.hold.phase() != HoldPhase::Accumulating {
            self.publish();
            return None;
        }

        let judgment = classify(&spec, frame);
        self.judgment = Some(judgment);

        if judgment == Judgment::Met && spec.hold == HoldKind::OpenEnded {
            if let Some(com) = self.metrics.center_of_mass {
                self.sway.record(com);
            }
        }

        let recorded = match self.hold.tick(judgment, dt) {
            Some(event) => Some(self.record(spec, event)),
            None => {
                self.status = self.progress_status(spec, judgment);
                None
            }
        };
        self.publish();
        recorded
    }

    fn progress_status(&self, spec: TaskSpec, judgment: Judgment) -> String {
        match (judgment, spec.hold) {
            (Judgment::Indeterminate, _) => NO_POSE_STATUS.to_string(),
            (Judgment::Met, HoldKind::Capped { .. }) => {
                format!("Hold it... {:.0}%", self.hold.ratio() * 100.0)
            }
            (Judgment::Met, HoldKind::OpenEnded) => {
                format!("Holding {:.1}s", self.hold.accumulated_ms() / 1000.0)
            }
            (Judgment::NotMet, _) => spec.task.instruction().to_string(),
        }
    }

    /// Turn a hold termination into a ledger entry.
    fn record(&mut self, spec: TaskSpec, event: HoldEvent) -> TaskResult {
        let (measurement, value) = match spec.threshold {
            ThresholdPolicy::Boolean => (1.0, 1.0),
            ThresholdPolicy::Duration { .. } => {
                let secs = event.held_ms() / 1000.0;
                (secs, round_tenths(secs))
            }
        };
        let status = evaluate(&spec.threshold, measurement);
        let result = TaskResult::new(spec.task, value, spec.units(), status, spec.note_for(status));

        self.status = match (spec.threshold, status) {
            (ThresholdPolicy::Boolean, ResultStatus::Pass) => {
                format!("Passed! {}", spec.task.outcome_text(true))
            }
            (ThresholdPolicy::Boolean, _) => spec.task.outcome_text(false).to_string(),
            (ThresholdPolicy::Duration { .. }, status) => {
                format!("Held {value:.1}s ({status})")
            }
        };
        info!(
            task = %spec.task,
            held_ms = event.held_ms(),
            value,
            status = status.as_str(),
            "Hold finalized"
        );
        self.append(result.clone());
        result
    }

    fn append(&mut self, result: TaskResult) {
        self.ledger.append(result);
        self.results = Arc::new(self.ledger.all().to_vec());
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.snapshot());
    }
}
