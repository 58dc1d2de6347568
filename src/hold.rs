//! Hold Timer state machine
//!
//! Converts a stream of per-tick judgments into held time with asymmetric
//! rise and decay:
//!
//! ```text
//!   Idle ──start──► Accumulating ──cap reached / condition dropped──► Completed
//!     ▲                  │                                               │
//!     └──────── reset ───┴──────────────────── reset ────────────────────┘
//! ```
//!
//! - `Met`: `acc ← min(cap, acc + dt)`
//! - `NotMet`: `acc ← max(0, acc − dt × factor)` (or zero under `InstantReset`)
//! - `Indeterminate`: nothing changes, `dt` is not consumed
//!
//! `dt` is always the measured wall-clock delta between ticks.

use serde::Serialize;
use std::time::Duration;

use crate::classifier::Judgment;
use crate::config::{DecayMode, HoldConfig};
use crate::types::HoldKind;

/// What a not-met tick does to accumulated progress.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecayPolicy {
    /// Remove `dt × factor`; brief detector dropouts cost little progress.
    Proportional { factor: f64 },
    /// Zero progress on the first not-met tick.
    InstantReset,
}

impl DecayPolicy {
    pub fn from_config(cfg: &HoldConfig) -> Self {
        match cfg.decay {
            DecayMode::Proportional => DecayPolicy::Proportional {
                factor: cfg.decay_factor,
            },
            DecayMode::InstantReset => DecayPolicy::InstantReset,
        }
    }

    fn apply(&self, accumulated_ms: f64, dt_ms: f64) -> f64 {
        match self {
            DecayPolicy::Proportional { factor } => (accumulated_ms - dt_ms * factor).max(0.0),
            DecayPolicy::InstantReset => 0.0,
        }
    }
}

impl Default for DecayPolicy {
    fn default() -> Self {
        DecayPolicy::Proportional {
            factor: crate::types::task_thresholds::HOLD_DECAY_FACTOR,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HoldPhase {
    /// No active measurement.
    Idle,
    /// Judgments are being sampled.
    Accumulating,
    /// Terminated; further ticks are ignored until reset.
    Completed,
}

impl std::fmt::Display for HoldPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HoldPhase::Idle => write!(f, "Idle"),
            HoldPhase::Accumulating => write!(f, "Accumulating"),
            HoldPhase::Completed => write!(f, "Completed"),
        }
    }
}

/// One-shot termination edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HoldEvent {
    /// Capped variant reached its cap.
    CapReached { held_ms: f64 },
    /// Open-ended variant stopped (condition dropped or manual finish).
    Finalized { held_ms: f64 },
}

impl HoldEvent {
    pub fn held_ms(&self) -> f64 {
        match self {
            HoldEvent::CapReached { held_ms } | HoldEvent::Finalized { held_ms } => *held_ms,
        }
    }
}

/// Accumulate/decay timer for one task session.
///
/// Invariant: `0 ≤ accumulated_ms ≤ cap` for the capped variant, and
/// `accumulated_ms ≥ 0` always.
#[derive(Debug, Clone)]
pub struct HoldTimer {
    kind: HoldKind,
    decay: DecayPolicy,
    phase: HoldPhase,
    accumulated_ms: f64,
    /// Open-ended sessions only finalize on a met→not-met transition.
    seen_met: bool,
}

impl HoldTimer {
    pub fn new(kind: HoldKind, decay: DecayPolicy) -> Self {
        Self {
            kind,
            decay,
            phase: HoldPhase::Idle,
            accumulated_ms: 0.0,
            seen_met: false,
        }
    }

    pub fn phase(&self) -> HoldPhase {
        self.phase
    }

    pub fn kind(&self) -> HoldKind {
        self.kind
    }

    pub fn accumulated_ms(&self) -> f64 {
        self.accumulated_ms
    }

    pub fn cap_ms(&self) -> Option<f64> {
        match self.kind {
            HoldKind::Capped { cap_ms } => Some(cap_ms),
            HoldKind::OpenEnded => None,
        }
    }

    /// `accumulated / cap` for progress rendering; 0 without a positive cap.
    pub fn ratio(&self) -> f64 {
        match self.cap_ms() {
            Some(cap) if cap > 0.0 => (self.accumulated_ms / cap).clamp(0.0, 1.0),
            _ => 0.0,
        }
    }

    /// Begin a fresh accumulation cycle.
    pub fn start(&mut self) {
        self.accumulated_ms = 0.0;
        self.seen_met = false;
        self.phase = HoldPhase::Accumulating;
    }

    /// Back to `Idle` with no progress.
    pub fn reset(&mut self) {
        self.accumulated_ms = 0.0;
        self.seen_met = false;
        self.phase = HoldPhase::Idle;
    }

    /// Advance by one tick. Returns the termination edge at most once per cycle.
    pub fn tick(&mut self, judgment: Judgment, dt: Duration) -> Option<HoldEvent> {
        if self.phase != HoldPhase::Accumulating {
            return None;
        }
        let dt_ms = dt.as_secs_f64() * 1000.0;

        match (judgment, self.kind) {
            (Judgment::Indeterminate, _) => None,

            (Judgment::Met, HoldKind::Capped { cap_ms }) => {
                self.accumulated_ms = (self.accumulated_ms + dt_ms).min(cap_ms);
                if self.accumulated_ms >= cap_ms {
                    self.phase = HoldPhase::Completed;
                    Some(HoldEvent::CapReached {
                        held_ms: self.accumulated_ms,
                    })
                } else {
                    None
                }
            }
            (Judgment::Met, HoldKind::OpenEnded) => {
                self.accumulated_ms += dt_ms;
                self.seen_met = true;
                None
            }

            (Judgment::NotMet, HoldKind::OpenEnded) if self.seen_met => self.finish(),
            (Judgment::NotMet, _) => {
                self.accumulated_ms = self.decay.apply(self.accumulated_ms, dt_ms);
                None
            }
        }
    }

    /// Manually finalize an open-ended session with the time held so far.
    ///
    /// No-op for the capped variant or outside `Accumulating`.
    pub fn finish(&mut self) -> Option<HoldEvent> {
        if self.phase != HoldPhase::Accumulating || self.kind != HoldKind::OpenEnded {
            return None;
        }
        self.phase = HoldPhase::Completed;
        Some(HoldEvent::Finalized {
            held_ms: self.accumulated_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TICK: Duration = Duration::from_millis(100);

    fn capped() -> HoldTimer {
        let mut t = HoldTimer::new(HoldKind::Capped { cap_ms: 2000.0 }, DecayPolicy::default());
        t.start();
        t
    }

    fn open_ended() -> HoldTimer {
        let mut t = HoldTimer::new(HoldKind::OpenEnded, DecayPolicy::default());
        t.start();
        t
    }

    #[test]
    fn test_idle_ignores_ticks() {
        let mut t = HoldTimer::new(HoldKind::Capped { cap_ms: 2000.0 }, DecayPolicy::default());
        assert_eq!(t.tick(Judgment::Met, TICK), None);
        assert_eq!(t.accumulated_ms(), 0.0);
        assert_eq!(t.phase(), HoldPhase::Idle);
    }

    #[test]
    fn test_completion_fires_once_at_cap() {
        let mut t = capped();
        let mut fired_at = Vec::new();
        for i in 1..=30 {
            if t.tick(Judgment::Met, TICK).is_some() {
                fired_at.push(i);
            }
            assert!(t.accumulated_ms() <= 2000.0);
        }
        assert_eq!(fired_at, vec![20]);
        assert_eq!(t.phase(), HoldPhase::Completed);
        assert_eq!(t.accumulated_ms(), 2000.0);
        assert_eq!(t.ratio(), 1.0);
    }

    #[test]
    fn test_completion_refires_after_restart() {
        let mut t = capped();
        for _ in 0..20 {
            t.tick(Judgment::Met, TICK);
        }
        t.start();
        assert_eq!(t.accumulated_ms(), 0.0);
        let fired = (0..20).filter_map(|_| t.tick(Judgment::Met, TICK)).count();
        assert_eq!(fired, 1);
    }

    #[test]
    fn test_proportional_decay() {
        let mut t = capped();
        for _ in 0..10 {
            t.tick(Judgment::Met, TICK);
        }
        assert!((t.accumulated_ms() - 1000.0).abs() < 1e-9);
        t.tick(Judgment::NotMet, TICK);
        assert!((t.accumulated_ms() - 925.0).abs() < 1e-9);
        for _ in 0..20 {
            t.tick(Judgment::NotMet, TICK);
        }
        assert_eq!(t.accumulated_ms(), 0.0);
    }

    #[test]
    fn test_instant_reset_decay() {
        let mut t = HoldTimer::new(HoldKind::Capped { cap_ms: 2000.0 }, DecayPolicy::InstantReset);
        t.start();
        for _ in 0..15 {
            t.tick(Judgment::Met, TICK);
        }
        t.tick(Judgment::NotMet, TICK);
        assert_eq!(t.accumulated_ms(), 0.0);
        assert_eq!(t.phase(), HoldPhase::Accumulating);
    }

    #[test]
    fn test_indeterminate_pauses() {
        let mut t = capped();
        for _ in 0..5 {
            t.tick(Judgment::Met, TICK);
        }
        let before = t.accumulated_ms();
        for _ in 0..50 {
            assert_eq!(t.tick(Judgment::Indeterminate, Duration::from_secs(1)), None);
        }
        assert_eq!(t.accumulated_ms(), before);
        assert_eq!(t.phase(), HoldPhase::Accumulating);
    }

    #[test]
    fn test_uses_actual_dt() {
        let mut t = capped();
        t.tick(Judgment::Met, Duration::from_millis(16));
        t.tick(Judgment::Met, Duration::from_millis(250));
        assert!((t.accumulated_ms() - 266.0).abs() < 1e-9);
        t.tick(Judgment::NotMet, Duration::from_millis(40));
        assert!((t.accumulated_ms() - 236.0).abs() < 1e-9);
    }

    #[test]
    fn test_runs_are_monotone_and_bounded() {
        // deterministic interleaving of runs of varying lengths
        let pattern = [(Judgment::Met, 7), (Judgment::NotMet, 3), (Judgment::Met, 9),
                       (Judgment::Indeterminate, 4), (Judgment::NotMet, 12), (Judgment::Met, 25)];
        let mut t = HoldTimer::new(HoldKind::Capped { cap_ms: 5000.0 }, DecayPolicy::default());
        t.start();
        let mut expected: f64 = 0.0;
        for (judgment, run) in pattern {
            for _ in 0..run {
                let before = t.accumulated_ms();
                t.tick(judgment, TICK);
                let after = t.accumulated_ms();
                match judgment {
                    Judgment::Met => {
                        assert!(after >= before);
                        expected = (expected + 100.0).min(5000.0);
                    }
                    Judgment::NotMet => {
                        assert!(after <= before);
                        expected = (expected - 75.0).max(0.0);
                    }
                    Judgment::Indeterminate => assert_eq!(after, before),
                }
                assert!((0.0..=5000.0).contains(&after));
            }
        }
        assert!((t.accumulated_ms() - expected).abs() < 1e-6);
    }

    #[test]
    fn test_open_ended_finalizes_on_drop() {
        let mut t = open_ended();
        for _ in 0..40 {
            assert_eq!(t.tick(Judgment::Met, TICK), None);
        }
        let event = t.tick(Judgment::NotMet, TICK).unwrap();
        assert!((event.held_ms() - 4000.0).abs() < 1e-9);
        assert!(matches!(event, HoldEvent::Finalized { .. }));
        assert_eq!(t.phase(), HoldPhase::Completed);
        assert_eq!(t.tick(Judgment::NotMet, TICK), None);
        assert_eq!(t.ratio(), 0.0);
    }

    #[test]
    fn test_open_ended_waits_for_first_met() {
        let mut t = open_ended();
        for _ in 0..10 {
            assert_eq!(t.tick(Judgment::NotMet, TICK), None);
        }
        assert_eq!(t.phase(), HoldPhase::Accumulating);
        assert_eq!(t.accumulated_ms(), 0.0);
        t.tick(Judgment::Met, TICK);
        assert!(t.tick(Judgment::NotMet, TICK).is_some());
    }

    #[test]
    fn test_manual_finish() {
        let mut t = open_ended();
        for _ in 0..12 {
            t.tick(Judgment::Met, TICK);
        }
        let event = t.finish().unwrap();
        assert!((event.held_ms() - 1200.0).abs() < 1e-9);
        assert_eq!(t.finish(), None);

        let mut c = capped();
        assert_eq!(c.finish(), None);
    }

    #[test]
    fn test_reset_returns_to_idle() {
        let mut t = capped();
        for _ in 0..5 {
            t.tick(Judgment::Met, TICK);
        }
        t.reset();
        assert_eq!(t.phase(), HoldPhase::Idle);
        assert_eq!(t.accumulated_ms(), 0.0);
    }

    #[test]
    fn test_decay_policy_from_config() {
        let mut cfg = HoldConfig::default();
        assert_eq!(
            DecayPolicy::from_config(&cfg),
            DecayPolicy::Proportional { factor: 0.75 }
        );
        cfg.decay = DecayMode::InstantReset;
        assert_eq!(DecayPolicy::from_config(&cfg), DecayPolicy::InstantReset);
    }
}
