//! Event sink trait for the human-readable event trail
//!
//! Defines the interface the monitor uses to persist detection results.

use async_trait::async_trait;
use chrono::{DateTime, Local};
use serde::Serialize;

pub const TRAIL_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

#[derive(Debug)]
pub enum SinkError {
    Io(std::io::Error),
    Closed,
}

impl From<std::io::Error> for SinkError {
    fn from(err: std::io::Error) -> Self {
        SinkError::Io(err)
    }
}

impl std::fmt::Display for SinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkError::Io(e) => write!(f, "IO error: {}", e),
            SinkError::Closed => write!(f, "Event sink is closed"),
        }
    }
}

impl std::error::Error for SinkError {}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SinkStats {
    pub line_count: u64,
    pub size_bytes: u64,
}

/// `[2024-01-31 12:00:00.123] message`
pub fn format_line(timestamp: DateTime<Local>, message: &str) -> String {
    format!("[{}] {}", timestamp.format(TRAIL_TIME_FORMAT), message)
}

/// Backend trait for the event trail.
///
/// `record` never fails from the caller's point of view: a backend that cannot
/// persist a line reports it through its own logging and keeps going.
#[async_trait]
pub trait EventSink: Send {
    /// Append one trail line
    async fn record(&mut self, timestamp: DateTime<Local>, message: &str);

    /// Truncate the trail
    fn clear(&mut self) -> Result<(), SinkError>;

    fn stats(&self) -> Result<SinkStats, SinkError>;

    /// Flush and release the underlying storage
    async fn close(&mut self) -> Result<(), SinkError>;

    /// Get backend type for logging
    fn backend_type(&self) -> &'static str;
}
