//! Detector Core - Toggle Pattern Detection Engine
//!
//! This module turns a stream of timestamped pin samples into classified
//! rapid toggle sequences, each tagged with the process memory state at the
//! instant of detection.
//!
//! # Architecture
//!
//! ```text
//! (timestamp, bit) → TransitionDetector → ToggleEvent
//!     ↓
//! WindowClassifier (N toggles within W ms, full reset on detection)
//!     ↓
//! PatternAnalyzer (frequency, inter-toggle intervals, span)
//!     ↓
//! MemoryCorrelator (fresh memory sample at detection time, via MemorySampler)
//!     ↓
//! RapidSequenceEvent → EventSink
//! ```

pub mod analyzer;
pub mod correlator;
pub mod sampler;
pub mod transition;
pub mod window;

pub use analyzer::{PatternAnalyzer, PatternStats};
pub use correlator::{MemoryCorrelator, MemorySample, RapidSequenceEvent, BYTES_PER_MB};
pub use sampler::{MemoryError, MemoryReading, MemorySampler};
pub use transition::{ToggleEvent, TransitionDetector};
pub use window::{ClassifierState, RapidCandidate, ToggleWindow, WindowClassifier};
