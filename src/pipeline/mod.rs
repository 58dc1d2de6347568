//! Processing Pipeline Module
//!
//! ```text
//! FrameSource ──(task)──► frame channel ─┐
//!                                        ├─► ProcessingLoop ─► Engine::tick ─► watch<EngineSnapshot>
//! EngineHandle ──► command channel ──────┘
//! tick timer (Interval mode) ────────────┘
//! ```

pub mod clock;
pub mod processing_loop;
pub mod source;

pub use clock::{LatestFrame, TickClock};
pub use processing_loop::{LoopStats, ProcessingLoop};
pub use source::{
    parse_records, ChannelSource, FrameEvent, FrameRecord, FrameSource, LineSource, ReplaySource,
    StdinSource,
};
