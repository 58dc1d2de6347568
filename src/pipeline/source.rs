//! Frame source abstraction for pose ingestion.
//!
//! Provides a unified trait for reading landmark frames from different
//! sources: JSON lines on stdin (or any async reader), a pre-loaded replay,
//! and an in-process channel for embedding a live detector.
//!
//! Wire format, one JSON object per line:
//!
//! ```text
//! {"t_ms": 1234, "landmarks": [{"x":0.5,"y":0.3}, null, ...]}
//! {"t_ms": 1267, "landmarks": null}
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Stdin};
use tokio::sync::mpsc;

use crate::types::LandmarkFrame;

/// One line of the frame stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    /// Source timestamp (ms, monotonic within a stream).
    pub t_ms: u64,
    /// `None` when the detector found no person in this frame.
    #[serde(default)]
    pub landmarks: Option<LandmarkFrame>,
}

/// Events produced by a frame source.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameEvent {
    /// A detection tick: possibly empty, possibly partial.
    Frame {
        frame: Option<LandmarkFrame>,
        t_ms: u64,
    },
    /// Source has stopped delivering frames for good.
    Eof,
}

impl From<FrameRecord> for FrameEvent {
    fn from(record: FrameRecord) -> Self {
        FrameEvent::Frame {
            frame: record.landmarks,
            t_ms: record.t_ms,
        }
    }
}

/// Trait abstracting where landmark frames come from.
///
/// The processing loop drives a source from its own task and only ever sees
/// the resulting [`FrameEvent`]s, so implementations may block on I/O freely.
#[async_trait]
pub trait FrameSource: Send + 'static {
    /// Read the next frame. `Eof` when no more data is available.
    async fn next_frame(&mut self) -> Result<FrameEvent>;

    /// Human-readable name for logging.
    fn source_name(&self) -> &str;
}

// ============================================================================
// JSON lines (stdin or any buffered reader)
// ============================================================================

/// Reads JSON frame records, one per line. Malformed lines are skipped.
pub struct LineSource<R> {
    reader: R,
    line_buffer: String,
    name: &'static str,
    skipped: u64,
}

/// `python pose_detector.py | motion-gauge --stdin`
pub type StdinSource = LineSource<BufReader<Stdin>>;

impl StdinSource {
    pub fn stdin() -> Self {
        LineSource::new(BufReader::new(tokio::io::stdin()), "stdin")
    }
}

impl<R> LineSource<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    pub fn new(reader: R, name: &'static str) -> Self {
        Self {
            reader,
            line_buffer: String::with_capacity(4096),
            name,
            skipped: 0,
        }
    }

    /// Lines that failed to parse so far.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }
}

#[async_trait]
impl<R> FrameSource for LineSource<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    async fn next_frame(&mut self) -> Result<FrameEvent> {
        loop {
            self.line_buffer.clear();
            let bytes = self.reader.read_line(&mut self.line_buffer).await?;
            if bytes == 0 {
                return Ok(FrameEvent::Eof);
            }
            let line = self.line_buffer.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<FrameRecord>(line) {
                Ok(record) => return Ok(record.into()),
                Err(e) => {
                    self.skipped += 1;
                    tracing::warn!(source = self.name, error = %e, "Skipping malformed frame line");
                }
            }
        }
    }

    fn source_name(&self) -> &str {
        self.name
    }
}

// ============================================================================
// Replay (pre-loaded records)
// ============================================================================

/// Replays pre-loaded frame records.
///
/// With `speed > 0` the gaps between consecutive `t_ms` values are slept
/// (divided by `speed`); with `speed == 0` records are delivered back to back.
pub struct ReplaySource {
    records: std::vec::IntoIter<FrameRecord>,
    speed: f64,
    last_t_ms: Option<u64>,
}

impl ReplaySource {
    pub fn new(records: Vec<FrameRecord>, speed: f64) -> Self {
        Self {
            records: records.into_iter(),
            speed,
            last_t_ms: None,
        }
    }

    /// Load a JSON-lines file. Malformed lines are skipped with a warning.
    pub fn from_file(path: &Path, speed: f64) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read replay file {}", path.display()))?;
        Ok(Self::new(parse_records(&contents), speed))
    }
}

/// Parse JSON-lines text into frame records, skipping blank and malformed lines.
pub fn parse_records(contents: &str) -> Vec<FrameRecord> {
    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(n, line)| match serde_json::from_str::<FrameRecord>(line) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(line = n + 1, error = %e, "Skipping malformed replay line");
                None
            }
        })
        .collect()
}

#[async_trait]
impl FrameSource for ReplaySource {
    async fn next_frame(&mut self) -> Result<FrameEvent> {
        let Some(record) = self.records.next() else {
            return Ok(FrameEvent::Eof);
        };
        if self.speed > 0.0 {
            if let Some(prev) = self.last_t_ms {
                let gap_ms = record.t_ms.saturating_sub(prev) as f64 / self.speed;
                if gap_ms > 0.0 {
                    tokio::time::sleep(std::time::Duration::from_secs_f64(gap_ms / 1000.0)).await;
                }
            }
        }
        self.last_t_ms = Some(record.t_ms);
        Ok(record.into())
    }

    fn source_name(&self) -> &str {
        "replay"
    }
}

// ============================================================================
// Channel (in-process producer)
// ============================================================================

/// Frames pushed by another task. `Eof` once every sender is dropped.
pub struct ChannelSource {
    rx: mpsc::Receiver<FrameRecord>,
}

impl ChannelSource {
    pub fn new(rx: mpsc::Receiver<FrameRecord>) -> Self {
        Self { rx }
    }

    pub fn channel(capacity: usize) -> (mpsc::Sender<FrameRecord>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self::new(rx))
    }
}

#[async_trait]
impl FrameSource for ChannelSource {
    async fn next_frame(&mut self) -> Result<FrameEvent> {
        Ok(match self.rx.recv().await {
            Some(record) => record.into(),
            None => FrameEvent::Eof,
        })
    }

    fn source_name(&self) -> &str {
        "channel"
    }
}
