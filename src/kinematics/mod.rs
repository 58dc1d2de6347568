//! Metric Extractor
//!
//! Pure functions from landmarks to derived scalars. The primitives take
//! landmarks directly; the frame-level wrappers take a [`LandmarkFrame`] plus
//! the anatomical indices they need and return `None` (indeterminate) when any
//! of those landmarks is missing. Nothing here panics.

use serde::Serialize;

use crate::types::{landmark_index as idx, Landmark, LandmarkFrame};

/// Vertical offset `a.y - b.y`.
///
/// Screen space grows downward, so a negative result means `a` is higher on
/// screen than `b`.
pub fn vertical_offset(a: &Landmark, b: &Landmark) -> f64 {
    a.y - b.y
}

/// Componentwise mean of the supplied points (x, y).
///
/// Returns `None` for an empty slice.
pub fn centroid(points: &[Landmark]) -> Option<(f64, f64)> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    let (sx, sy) = points
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
    Some((sx / n, sy / n))
}

/// Angle at vertex `b` between rays `b→a` and `b→c`, in degrees `[0, 180]`.
///
/// The cosine is clamped to `[-1, 1]` before `acos` so floating-point
/// overshoot never produces NaN.
///
/// ## Edge case
/// If either ray has zero length the angle is undefined; this returns `0.0`
/// rather than failing.
pub fn joint_angle_degrees(a: &Landmark, b: &Landmark, c: &Landmark) -> f64 {
    let (bax, bay) = (a.x - b.x, a.y - b.y);
    let (bcx, bcy) = (c.x - b.x, c.y - b.y);

    let mag_ba = bax.hypot(bay);
    let mag_bc = bcx.hypot(bcy);
    if mag_ba <= f64::EPSILON || mag_bc <= f64::EPSILON {
        return 0.0;
    }

    let cos = ((bax * bcx + bay * bcy) / (mag_ba * mag_bc)).clamp(-1.0, 1.0);
    cos.acos().to_degrees()
}

// ============================================================================
// Frame-level extractors
// ============================================================================

/// [`vertical_offset`] between two frame slots, or `None` if either is missing.
pub fn frame_vertical_offset(frame: &LandmarkFrame, a: usize, b: usize) -> Option<f64> {
    let [pa, pb] = frame.require([a, b])?;
    Some(vertical_offset(&pa, &pb))
}

/// [`centroid`] over frame slots, or `None` if any slot is missing.
pub fn frame_centroid(frame: &LandmarkFrame, indices: &[usize]) -> Option<(f64, f64)> {
    let points = indices
        .iter()
        .map(|&i| frame.get(i).copied())
        .collect::<Option<Vec<_>>>()?;
    centroid(&points)
}

/// [`joint_angle_degrees`] at slot `b`, or `None` if any slot is missing.
pub fn frame_joint_angle(frame: &LandmarkFrame, a: usize, b: usize, c: usize) -> Option<f64> {
    let [pa, pb, pc] = frame.require([a, b, c])?;
    Some(joint_angle_degrees(&pa, &pb, &pc))
}

/// Shoulders + hips: coarse center-of-mass proxy.
pub const TRUNK: [usize; 4] = [
    idx::LEFT_SHOULDER,
    idx::RIGHT_SHOULDER,
    idx::LEFT_HIP,
    idx::RIGHT_HIP,
];

/// Derived per-frame metrics published for rendering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FrameMetrics {
    /// Trunk centroid (shoulders + hips).
    pub center_of_mass: Option<(f64, f64)>,
    /// Shoulder-elbow-wrist angle, left side.
    pub left_elbow_deg: Option<f64>,
    /// Shoulder-elbow-wrist angle, right side.
    pub right_elbow_deg: Option<f64>,
}

impl FrameMetrics {
    pub fn from_frame(frame: &LandmarkFrame) -> Self {
        Self {
            center_of_mass: frame_centroid(frame, &TRUNK),
            left_elbow_deg: frame_joint_angle(
                frame,
                idx::LEFT_SHOULDER,
                idx::LEFT_ELBOW,
                idx::LEFT_WRIST,
            ),
            right_elbow_deg: frame_joint_angle(
                frame,
                idx::RIGHT_SHOULDER,
                idx::RIGHT_ELBOW,
                idx::RIGHT_WRIST,
            ),
        }
    }
}

/// Horizontal and vertical extent of a center-of-mass trace.
///
/// Used as a coarse sway figure during duration tasks. `None` until at least
/// one sample exists.
#[derive(Debug, Clone, Default)]
pub struct SwayTracker {
    bounds: Option<(f64, f64, f64, f64)>,
}

impl SwayTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, (x, y): (f64, f64)) {
        self.bounds = Some(match self.bounds {
            None => (x, x, y, y),
            Some((min_x, max_x, min_y, max_y)) => {
                (min_x.min(x), max_x.max(x), min_y.min(y), max_y.max(y))
            }
        });
    }

    /// `(x_range, y_range)` in normalized units.
    pub fn extent(&self) -> Option<(f64, f64)> {
        self.bounds
            .map(|(min_x, max_x, min_y, max_y)| (max_x - min_x, max_y - min_y))
    }

    pub fn reset(&mut self) {
        self.bounds = None;
    }
}
