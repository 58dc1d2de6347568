//! Pose Landmark Simulation
//!
//! Generates JSON-line landmark frames for exercising motion-gauge without a
//! camera. Each scenario rests, performs the movement, then rests again, with
//! Gaussian jitter on every landmark and occasional detection dropouts.
//!
//! # Usage
//! ```bash
//! ./simulation --scenario arm-raise-right | ./motion-gauge --stdin --task arm_raise_right
//! ./simulation --scenario one-leg-left --frames 300 --speed 0 > session.jsonl
//! ```

use std::io::{self, Write};
use std::time::Duration;

use clap::Parser;
use rand::prelude::*;
use rand_distr::{Distribution, Normal};

use motion_gauge::config::defaults::SIMULATION_FRAME_INTERVAL_MS;
use motion_gauge::pipeline::FrameRecord;
use motion_gauge::types::landmark_index as idx;
use motion_gauge::types::{Landmark, LandmarkFrame};

// ============================================================================
// Body Model (normalized screen space, y grows downward)
// ============================================================================

const SHOULDER_Y: f64 = 0.35;
const HIP_Y: f64 = 0.55;
const ANKLE_Y: f64 = 0.92;
/// Wrist height with the arm hanging.
const WRIST_REST_Y: f64 = 0.55;
/// Wrist height with the arm raised overhead.
const WRIST_RAISED_Y: f64 = 0.18;
/// Lift of the free foot during a one-leg stance.
const FOOT_LIFT: f64 = 0.12;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "motion-gauge-simulation")]
#[command(about = "Synthetic pose landmark frames for motion-gauge testing")]
#[command(version)]
struct Args {
    /// Movement to perform
    #[arg(short = 'S', long, value_enum, default_value = "arm-raise-right")]
    scenario: Scenario,

    /// Number of frames to emit
    #[arg(short, long, default_value = "300")]
    frames: u64,

    /// Frame spacing in milliseconds
    #[arg(short, long, default_value_t = SIMULATION_FRAME_INTERVAL_MS)]
    interval: u64,

    /// Time compression factor (1 = real-time, 0 = emit as fast as possible)
    #[arg(short, long, default_value = "1")]
    speed: f64,

    /// Landmark jitter standard deviation
    #[arg(long, default_value = "0.004")]
    jitter: f64,

    /// Probability a frame has no detection
    #[arg(long, default_value = "0.02")]
    dropout: f64,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum Scenario {
    ArmRaiseRight,
    ArmRaiseLeft,
    OneLegLeft,
    OneLegRight,
    /// Standing still for the whole run
    Idle,
}

impl Scenario {
    fn name(&self) -> &'static str {
        match self {
            Scenario::ArmRaiseRight => "Right arm raise",
            Scenario::ArmRaiseLeft => "Left arm raise",
            Scenario::OneLegLeft => "One-leg stance on the left leg",
            Scenario::OneLegRight => "One-leg stance on the right leg",
            Scenario::Idle => "Standing idle",
        }
    }
}

// ============================================================================
// Simulator
// ============================================================================

struct Simulator {
    scenario: Scenario,
    frames: u64,
    interval_ms: u64,
    dropout: f64,
    jitter: Normal<f64>,
    rng: StdRng,
}

impl Simulator {
    fn new(args: &Args) -> anyhow::Result<Self> {
        let rng = match args.seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        let jitter = Normal::new(0.0, args.jitter.max(0.0))?;
        Ok(Self {
            scenario: args.scenario,
            frames: args.frames,
            interval_ms: args.interval,
            dropout: args.dropout.clamp(0.0, 1.0),
            jitter,
            rng,
        })
    }

    /// Movement amount in `[0, 1]`: rest for the first and last fifth, ramp
    /// over a short window, full movement in between.
    fn movement(&self, frame: u64) -> f64 {
        if self.scenario == Scenario::Idle || self.frames == 0 {
            return 0.0;
        }
        let p = frame as f64 / self.frames as f64;
        let ramp = 0.05;
        if p < 0.2 || p >= 0.8 {
            0.0
        } else if p < 0.2 + ramp {
            (p - 0.2) / ramp
        } else if p >= 0.8 - ramp {
            (0.8 - p) / ramp
        } else {
            1.0
        }
    }

    fn point(&mut self, x: f64, y: f64) -> Landmark {
        let jx = self.jitter.sample(&mut self.rng);
        let jy = self.jitter.sample(&mut self.rng);
        let mut lm = Landmark::new((x + jx).clamp(0.0, 1.0), (y + jy).clamp(0.0, 1.0));
        lm.visibility = Some(self.rng.gen_range(0.85..1.0));
        lm
    }

    fn frame(&mut self, n: u64) -> Option<LandmarkFrame> {
        if self.rng.gen_bool(self.dropout) {
            return None;
        }
        let m = self.movement(n);
        let lerp = |from: f64, to: f64| from + (to - from) * m;

        let (right_wrist_y, left_wrist_y) = match self.scenario {
            Scenario::ArmRaiseRight => (lerp(WRIST_REST_Y, WRIST_RAISED_Y), WRIST_REST_Y),
            Scenario::ArmRaiseLeft => (WRIST_REST_Y, lerp(WRIST_REST_Y, WRIST_RAISED_Y)),
            _ => (WRIST_REST_Y, WRIST_REST_Y),
        };
        let (left_ankle_y, right_ankle_y) = match self.scenario {
            Scenario::OneLegLeft => (ANKLE_Y, ANKLE_Y - FOOT_LIFT * m),
            Scenario::OneLegRight => (ANKLE_Y - FOOT_LIFT * m, ANKLE_Y),
            _ => (ANKLE_Y, ANKLE_Y),
        };

        // Subject faces the camera, so their right side is on screen left.
        let frame = LandmarkFrame::empty()
            .with(idx::NOSE, self.point(0.50, 0.20))
            .with(idx::RIGHT_SHOULDER, self.point(0.42, SHOULDER_Y))
            .with(idx::LEFT_SHOULDER, self.point(0.58, SHOULDER_Y))
            .with(idx::RIGHT_ELBOW, self.point(0.40, (SHOULDER_Y + right_wrist_y) / 2.0))
            .with(idx::LEFT_ELBOW, self.point(0.60, (SHOULDER_Y + left_wrist_y) / 2.0))
            .with(idx::RIGHT_WRIST, self.point(0.39, right_wrist_y))
            .with(idx::LEFT_WRIST, self.point(0.61, left_wrist_y))
            .with(idx::RIGHT_HIP, self.point(0.45, HIP_Y))
            .with(idx::LEFT_HIP, self.point(0.55, HIP_Y))
            .with(idx::RIGHT_ANKLE, self.point(0.45, right_ankle_y))
            .with(idx::LEFT_ANKLE, self.point(0.55, left_ankle_y));
        Some(frame)
    }

    fn record(&mut self, n: u64) -> FrameRecord {
        FrameRecord {
            t_ms: n * self.interval_ms,
            landmarks: self.frame(n),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut sim = Simulator::new(&args)?;

    eprintln!(
        "Simulating: {} ({} frames, {} ms apart, speed {}x)",
        args.scenario.name(),
        args.frames,
        args.interval,
        args.speed
    );

    let delay = if args.speed > 0.0 {
        Some(Duration::from_secs_f64(args.interval as f64 / 1000.0 / args.speed))
    } else {
        None
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for n in 0..args.frames {
        let record = sim.record(n);
        serde_json::to_writer(&mut out, &record)?;
        writeln!(out)?;
        if let Some(delay) = delay {
            // downstream reads line by line
            out.flush()?;
            std::thread::sleep(delay);
        }
    }
    out.flush()?;
    Ok(())
}
