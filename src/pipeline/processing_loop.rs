//! Tick loop shared across all input modes.
//!
//! Owns the [`Engine`] and multiplexes four event streams:
//!
//! - cancellation (stops the loop; the engine pauses where it is)
//! - commands from [`EngineHandle`]s, applied between ticks
//! - the tick timer (`TickMode::Interval`)
//! - frames from the source task (`TickMode::PerFrame` ticks on each one)
//!
//! The source runs on its own task and forwards events over a channel, so a
//! timer tick never interrupts a half-read frame.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::clock::{LatestFrame, TickClock};
use super::source::{FrameEvent, FrameSource};
use crate::config::defaults::COMMAND_CHANNEL_CAPACITY;
use crate::config::{EngineConfig, TickMode};
use crate::engine::{CommandEnvelope, Engine, EngineHandle};
use crate::types::LandmarkFrame;

/// Frames buffered between the source task and the loop.
const FRAME_CHANNEL_CAPACITY: usize = 256;

/// Counters reported when the loop stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub frames_received: u64,
    pub ticks: u64,
    pub results_recorded: u64,
    pub commands_applied: u64,
}

/// Owns the engine and runs it until cancellation.
///
/// Built with [`new()`](ProcessingLoop::new), optionally configured with
/// [`exit_on_eof()`](ProcessingLoop::exit_on_eof), then consumed by
/// [`run()`](ProcessingLoop::run).
pub struct ProcessingLoop {
    engine: Engine,
    commands: mpsc::Receiver<CommandEnvelope>,
    cancel_token: CancellationToken,
    tick_mode: TickMode,
    tick_interval: Duration,
    stale_after: Duration,
    exit_on_eof: bool,
}

impl ProcessingLoop {
    /// Wrap `engine`, returning the loop and a handle for issuing commands.
    pub fn new(
        engine: Engine,
        config: &EngineConfig,
        cancel_token: CancellationToken,
    ) -> (Self, EngineHandle) {
        let (tx, rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let handle = EngineHandle::new(tx, engine.subscribe());
        let this = Self {
            engine,
            commands: rx,
            cancel_token,
            tick_mode: config.engine.tick_mode,
            tick_interval: Duration::from_millis(config.engine.tick_interval_ms),
            stale_after: Duration::from_millis(config.engine.stale_frame_ms),
            exit_on_eof: false,
        };
        (this, handle)
    }

    /// Stop once the source reports `Eof` instead of idling until cancellation.
    #[must_use]
    pub fn exit_on_eof(mut self, exit: bool) -> Self {
        self.exit_on_eof = exit;
        self
    }

    /// Run until cancellation (or source end with `exit_on_eof`).
    ///
    /// Returns the engine, so callers can inspect final state, plus counters.
    pub async fn run<S: FrameSource>(mut self, source: S) -> (Engine, LoopStats) {
        let mut stats = LoopStats::default();
        let source_name = source.source_name().to_string();
        let mut frames = spawn_source(source, self.cancel_token.child_token());

        let mut interval = tokio::time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let interval_mode = self.tick_mode == TickMode::Interval;

        let mut clock = TickClock::new();
        let mut latest = LatestFrame::new(self.stale_after);
        let mut commands_open = true;

        info!(
            source = %source_name,
            tick_mode = ?self.tick_mode,
            tick_interval_ms = self.tick_interval.as_millis() as u64,
            "Processing loop started"
        );

        loop {
            tokio::select! {
                biased;

                _ = self.cancel_token.cancelled() => {
                    info!("Shutdown signal received");
                    break;
                }

                msg = self.commands.recv(), if commands_open => {
                    let Some(CommandEnvelope { command, reply }) = msg else {
                        debug!("All engine handles dropped");
                        commands_open = false;
                        continue;
                    };
                    let outcome = self.engine.apply(command, latest.current(Instant::now()));
                    if let Err(ref e) = outcome {
                        debug!(%command, error = %e, "Command rejected");
                    }
                    stats.commands_applied += 1;
                    // requester may have gone away; nothing to do then
                    let _ = reply.send(outcome);
                }

                now = interval.tick(), if interval_mode => {
                    let dt = clock.lap(now);
                    self.tick(latest.current(now), dt, &mut stats);
                }

                event = frames.recv(), if !latest.is_ended() => {
                    let now = Instant::now();
                    match event {
                        Some(FrameEvent::Frame { frame, t_ms }) => {
                            stats.frames_received += 1;
                            debug!(t_ms, present = frame.is_some(), "Frame received");
                            latest.update(frame, now);
                            if !interval_mode {
                                let dt = clock.lap_within(now, self.stale_after);
                                self.tick(latest.current(now), dt, &mut stats);
                            }
                        }
                        Some(FrameEvent::Eof) | None => {
                            info!(frames = stats.frames_received, "Frame source ended");
                            latest.mark_ended();
                            if self.exit_on_eof {
                                break;
                            }
                        }
                    }
                }
            }
        }

        info!(
            frames = stats.frames_received,
            ticks = stats.ticks,
            results = stats.results_recorded,
            commands = stats.commands_applied,
            ledger_size = self.engine.ledger().len(),
            "Processing loop stopped"
        );
        (self.engine, stats)
    }

    fn tick(
        &mut self,
        frame: Option<&LandmarkFrame>,
        dt: Duration,
        stats: &mut LoopStats,
    ) {
        stats.ticks += 1;
        if let Some(result) = self.engine.tick(frame, dt) {
            stats.results_recorded += 1;
            debug!(id = %result.id, status = result.status.as_str(), "Tick recorded a result");
        }
    }
}

/// Drive `source` on its own task, forwarding events until `Eof`, an error,
/// or cancellation.
fn spawn_source<S: FrameSource>(
    mut source: S,
    cancel: CancellationToken,
) -> mpsc::Receiver<FrameEvent> {
    let (tx, rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);
    tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                _ = cancel.cancelled() => break,
                result = source.next_frame() => match result {
                    Ok(event) => event,
                    Err(e) => {
                        warn!(source = source.source_name(), error = %e, "Frame source error");
                        FrameEvent::Eof
                    }
                },
            };
            let is_eof = event == FrameEvent::Eof;
            if tx.send(event).await.is_err() || is_eof {
                break;
            }
        }
    });
    rx
}
