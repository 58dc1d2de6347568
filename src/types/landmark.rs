//! Landmark and LandmarkFrame: one sample of the pose source

use serde::{Deserialize, Serialize};

/// Anatomical landmark indices (33-point body topology)
pub mod landmark_index {
    pub const NOSE: usize = 0;
    pub const LEFT_SHOULDER: usize = 11;
    pub const RIGHT_SHOULDER: usize = 12;
    pub const LEFT_ELBOW: usize = 13;
    pub const RIGHT_ELBOW: usize = 14;
    pub const LEFT_WRIST: usize = 15;
    pub const RIGHT_WRIST: usize = 16;
    pub const LEFT_HIP: usize = 23;
    pub const RIGHT_HIP: usize = 24;
    pub const LEFT_ANKLE: usize = 27;
    pub const RIGHT_ANKLE: usize = 28;

    /// Number of slots in a full frame.
    pub const COUNT: usize = 33;
}

/// A single normalized body keypoint estimate.
///
/// `x` and `y` are in `[0, 1]` screen space. `y` grows downward, so a smaller
/// `y` means physically higher.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<f64>,
}

impl Landmark {
    pub const fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            z: None,
            visibility: None,
        }
    }
}

/// Full set of landmarks for one detection tick.
///
/// Individual slots may be missing even when the frame itself is present
/// (partial detection). On the wire this is a JSON array whose entries may be
/// `null`; a short array leaves the trailing slots empty.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Option<Landmark>>", into = "Vec<Option<Landmark>>")]
pub struct LandmarkFrame {
    slots: Vec<Option<Landmark>>,
}

impl LandmarkFrame {
    /// Empty frame with every slot missing.
    pub fn empty() -> Self {
        Self {
            slots: vec![None; landmark_index::COUNT],
        }
    }

    /// Builder-style slot assignment. Out-of-range indices grow the frame.
    #[must_use]
    pub fn with(mut self, index: usize, landmark: Landmark) -> Self {
        self.set(index, Some(landmark));
        self
    }

    pub fn set(&mut self, index: usize, landmark: Option<Landmark>) {
        if index >= self.slots.len() {
            self.slots.resize(index + 1, None);
        }
        self.slots[index] = landmark;
    }

    pub fn get(&self, index: usize) -> Option<&Landmark> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Collect several landmarks; `None` if any of them is missing.
    pub fn require<const N: usize>(&self, indices: [usize; N]) -> Option<[Landmark; N]> {
        let mut out = [Landmark::new(0.0, 0.0); N];
        for (slot, idx) in out.iter_mut().zip(indices) {
            *slot = *self.get(idx)?;
        }
        Some(out)
    }

    /// Number of slots that carry a landmark.
    pub fn detected_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }
}

impl From<Vec<Option<Landmark>>> for LandmarkFrame {
    fn from(mut slots: Vec<Option<Landmark>>) -> Self {
        if slots.len() < landmark_index::COUNT {
            slots.resize(landmark_index::COUNT, None);
        }
        Self { slots }
    }
}

impl From<LandmarkFrame> for Vec<Option<Landmark>> {
    fn from(frame: LandmarkFrame) -> Self {
        frame.slots
    }
}

#[cfg(test)]
mod tests {
    use super::landmark_index::*;
    use super::*;

    #[test]
    fn test_short_array_pads_missing_slots() {
        let frame: LandmarkFrame =
            serde_json::from_str(r#"[{"x":0.5,"y":0.5}, null]"#).unwrap();
        assert!(frame.get(NOSE).is_some());
        assert!(frame.get(1).is_none());
        assert!(frame.get(RIGHT_ANKLE).is_none());
        assert_eq!(frame.detected_count(), 1);
    }

    #[test]
    fn test_optional_fields_parse() {
        let lm: Landmark =
            serde_json::from_str(r#"{"x":0.1,"y":0.2,"z":-0.3,"visibility":0.9}"#).unwrap();
        assert_eq!(lm.z, Some(-0.3));
        assert_eq!(lm.visibility, Some(0.9));

        let json = serde_json::to_string(&Landmark::new(0.1, 0.2)).unwrap();
        assert!(!json.contains("visibility"));
    }

    #[test]
    fn test_require_fails_on_any_missing() {
        let frame = LandmarkFrame::empty()
            .with(RIGHT_WRIST, Landmark::new(0.5, 0.2))
            .with(RIGHT_SHOULDER, Landmark::new(0.5, 0.3));
        assert!(frame.require([RIGHT_WRIST, RIGHT_SHOULDER]).is_some());
        assert!(frame.require([RIGHT_WRIST, LEFT_SHOULDER]).is_none());
    }
}
