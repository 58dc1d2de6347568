//! motion-gauge: real-time movement task evaluation
//!
//! Evaluates a stream of 2-D body landmarks against per-task pass/fail
//! criteria and records the outcomes.
//!
//! ## Architecture
//!
//! - **Metric Extractor** (`kinematics`): offsets, centroids, joint angles
//! - **Task Classifier** (`classifier`): per-tick met / not met / indeterminate
//! - **Hold Timer** (`hold`): accumulate-with-decay state machine
//! - **Threshold Evaluator** (`evaluator`): measurement to pass / warn / fail
//! - **Result Ledger** (`storage`): capped, persisted outcome list with export
//! - **Engine** (`engine`): tick handler, task switching, published snapshots
//! - **Pipeline** (`pipeline`): frame sources and the tick loop
//! - **API** (`api`): HTTP surface for renderers

pub mod api;
pub mod classifier;
pub mod config;
pub mod engine;
pub mod evaluator;
pub mod hold;
pub mod kinematics;
pub mod pipeline;
pub mod storage;
pub mod types;

// Re-export engine configuration
pub use config::EngineConfig;

// Re-export commonly used types
pub use types::{
    Landmark, LandmarkFrame, ResultStatus, Task, TaskResult, TaskSpec, ThresholdPolicy,
};

pub use classifier::Judgment;
pub use engine::{Engine, EngineError, EngineHandle, EngineSnapshot};
pub use hold::{DecayPolicy, HoldPhase, HoldTimer};
pub use storage::{BlobStore, ResultLedger, StorageError};
