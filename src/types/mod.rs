//! Shared data structures for pose-based task evaluation
//!
//! - LandmarkFrame: one sample of the pose source
//! - Task / TaskSpec: the fixed task set and its resolved bindings
//! - ThresholdPolicy: measurement-to-status cutoffs
//! - TaskResult: a finalized outcome held by the ledger

mod landmark;
mod result;
mod task;
pub mod thresholds;

pub use landmark::*;
pub use result::*;
pub use task::*;
pub use thresholds::*;
