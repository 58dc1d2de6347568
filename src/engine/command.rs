//! Commands from outside the tick loop
//!
//! HTTP handlers and the CLI never touch the engine directly. They send an
//! [`EngineCommand`] through an [`EngineHandle`] and the loop applies it
//! between ticks, so the ledger has exactly one writer.

use tokio::sync::{mpsc, oneshot, watch};

use super::{EngineError, EngineSnapshot};
use crate::types::{Task, TaskResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineCommand {
    /// Switch (or clear) the active task; resets hold state.
    SelectTask(Option<Task>),
    /// Start a fresh session of the active task.
    Restart,
    /// Finalize an open-ended session now.
    Finish,
    /// Classify the latest frame once and record the outcome.
    Check,
    /// Empty the ledger.
    ClearResults,
}

impl std::fmt::Display for EngineCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineCommand::SelectTask(Some(task)) => write!(f, "select_task({task})"),
            EngineCommand::SelectTask(None) => write!(f, "select_task(none)"),
            EngineCommand::Restart => write!(f, "restart"),
            EngineCommand::Finish => write!(f, "finish"),
            EngineCommand::Check => write!(f, "check"),
            EngineCommand::ClearResults => write!(f, "clear_results"),
        }
    }
}

/// Outcome of an applied command.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    Ack,
    /// `None` when the command ran but recorded nothing.
    Recorded(Option<TaskResult>),
}

pub type CommandReply = Result<CommandOutcome, EngineError>;

/// A command plus the channel its outcome is returned on.
#[derive(Debug)]
pub struct CommandEnvelope {
    pub command: EngineCommand,
    pub reply: oneshot::Sender<CommandReply>,
}

/// Cloneable client side of a running engine.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    commands: mpsc::Sender<CommandEnvelope>,
    snapshots: watch::Receiver<EngineSnapshot>,
}

impl EngineHandle {
    pub fn new(
        commands: mpsc::Sender<CommandEnvelope>,
        snapshots: watch::Receiver<EngineSnapshot>,
    ) -> Self {
        Self {
            commands,
            snapshots,
        }
    }

    /// Most recently published snapshot.
    pub fn snapshot(&self) -> EngineSnapshot {
        self.snapshots.borrow().clone()
    }

    /// True once the loop has stopped accepting commands.
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    /// Independent receiver for change notifications.
    pub fn subscribe(&self) -> watch::Receiver<EngineSnapshot> {
        self.snapshots.clone()
    }

    /// Send a command and wait for the loop to apply it.
    pub async fn send(&self, command: EngineCommand) -> CommandReply {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(CommandEnvelope { command, reply })
            .await
            .map_err(|_| EngineError::Stopped)?;
        rx.await.map_err(|_| EngineError::Stopped)?
    }

    pub async fn select_task(&self, task: Option<Task>) -> Result<(), EngineError> {
        self.send(EngineCommand::SelectTask(task)).await.map(|_| ())
    }

    pub async fn restart(&self) -> Result<(), EngineError> {
        self.send(EngineCommand::Restart).await.map(|_| ())
    }

    pub async fn finish(&self) -> Result<Option<TaskResult>, EngineError> {
        self.send(EngineCommand::Finish).await.map(recorded)
    }

    pub async fn check(&self) -> Result<Option<TaskResult>, EngineError> {
        self.send(EngineCommand::Check).await.map(recorded)
    }

    pub async fn clear_results(&self) -> Result<(), EngineError> {
        self.send(EngineCommand::ClearResults).await.map(|_| ())
    }
}

fn recorded(outcome: CommandOutcome) -> Option<TaskResult> {
    match outcome {
        CommandOutcome::Recorded(result) => result,
        CommandOutcome::Ack => None,
    }
}
