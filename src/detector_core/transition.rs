//! Edge detection on raw pin samples

use serde::Serialize;
use std::time::Duration;

/// A single observed state change of the monitored pin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ToggleEvent {
    /// Monotonic offset from the monitor epoch
    pub timestamp: Duration,
    /// Zero-based index of this toggle since the last reset
    pub sequence_index: u64,
    /// Pin state after the transition
    pub state: bool,
}

/// Converts raw `(timestamp, bit)` samples into discrete toggle events.
///
/// The first sample after construction or `reset()` only primes the detector.
/// Samples the source could not deliver are reported through `skip()` and
/// leave the detector state untouched.
#[derive(Debug, Default)]
pub struct TransitionDetector {
    last_state: Option<bool>,
    last_timestamp: Option<Duration>,
    next_index: u64,
    samples_observed: u64,
    samples_skipped: u64,
}

impl TransitionDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one sample. Returns `Some(event)` only when the state changed.
    pub fn observe(&mut self, timestamp: Duration, current: bool) -> Option<ToggleEvent> {
        if let Some(last) = self.last_timestamp {
            if timestamp <= last {
                // Out-of-order or duplicate instant: treat as a skipped sample
                log::debug!(
                    "Dropping sample at {:?} (previous sample at {:?})",
                    timestamp,
                    last
                );
                self.samples_skipped += 1;
                return None;
            }
        }

        self.samples_observed += 1;
        self.last_timestamp = Some(timestamp);

        match self.last_state {
            None => {
                self.last_state = Some(current);
                None
            }
            Some(previous) if previous == current => None,
            Some(_) => {
                self.last_state = Some(current);
                let event = ToggleEvent {
                    timestamp,
                    sequence_index: self.next_index,
                    state: current,
                };
                self.next_index += 1;
                Some(event)
            }
        }
    }

    /// Record that the source failed to deliver a sample this tick
    pub fn skip(&mut self) {
        self.samples_skipped += 1;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn last_state(&self) -> Option<bool> {
        self.last_state
    }

    pub fn toggle_count(&self) -> u64 {
        self.next_index
    }

    pub fn samples_observed(&self) -> u64 {
        self.samples_observed
    }

    pub fn samples_skipped(&self) -> u64 {
        self.samples_skipped
    }
}
