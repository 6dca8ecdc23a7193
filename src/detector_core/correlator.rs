//! Memory correlation for rapid sequences and memory spike tracking

use super::window::RapidCandidate;
use super::analyzer::PatternStats;
use super::sampler::MemorySampler;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::VecDeque;

pub const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Point-in-time process memory metrics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemorySample {
    pub timestamp: DateTime<Local>,
    pub resident_bytes: u64,
    pub virtual_bytes: u64,
    pub usage_percent: f64,
}

impl MemorySample {
    /// Zeroed sample used when the OS query fails
    pub fn unavailable(timestamp: DateTime<Local>) -> Self {
        Self {
            timestamp,
            resident_bytes: 0,
            virtual_bytes: 0,
            usage_percent: 0.0,
        }
    }

    pub fn is_unavailable(&self) -> bool {
        self.resident_bytes == 0 && self.virtual_bytes == 0
    }

    pub fn resident_mb(&self) -> f64 {
        self.resident_bytes as f64 / BYTES_PER_MB
    }

    pub fn virtual_mb(&self) -> f64 {
        self.virtual_bytes as f64 / BYTES_PER_MB
    }
}

/// Final output record: a rapid sequence plus the memory state at detection
#[derive(Debug, Clone, Serialize)]
pub struct RapidSequenceEvent {
    pub sequence_number: u64,
    pub detection_time: DateTime<Local>,
    pub toggle_count: usize,
    pub window_duration_ms: f64,
    pub stats: PatternStats,
    pub memory_at_detection: MemorySample,
}

impl RapidSequenceEvent {
    /// One-line trail message
    pub fn describe(&self) -> String {
        let intervals = self
            .stats
            .intervals_ms
            .iter()
            .map(|i| format!("{:.2}", i))
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "RAPID SEQUENCE #{}: {} toggles in {:.2}ms ({:.1} Hz, avg interval {:.2}ms, intervals [{}]) | memory: RSS={:.1}MB VMS={:.1}MB ({:.2}%)",
            self.sequence_number,
            self.toggle_count,
            self.window_duration_ms,
            self.stats.frequency_hz,
            self.stats.avg_interval_ms,
            intervals,
            self.memory_at_detection.resident_mb(),
            self.memory_at_detection.virtual_mb(),
            self.memory_at_detection.usage_percent,
        )
    }
}

/// Tags rapid sequences with fresh memory samples and keeps a bounded history
/// of background samples for spike detection.
///
/// Cadence is decided by the caller: every call samples immediately.
pub struct MemoryCorrelator {
    sampler: Box<dyn MemorySampler>,
    history: VecDeque<MemorySample>,
    history_cap: usize,
    failures: u64,
}

impl MemoryCorrelator {
    pub fn new(sampler: Box<dyn MemorySampler>, history_cap: usize) -> Self {
        Self {
            sampler,
            history: VecDeque::new(),
            history_cap: history_cap.max(2),
            failures: 0,
        }
    }

    /// Take a sample now. Never fails: a sampler error yields a zeroed sample.
    pub fn sample_now(&mut self) -> MemorySample {
        let timestamp = Local::now();
        match self.sampler.current_process_memory() {
            Ok(reading) => MemorySample {
                timestamp,
                resident_bytes: reading.resident_bytes,
                virtual_bytes: reading.virtual_bytes,
                usage_percent: reading.usage_percent,
            },
            Err(e) => {
                self.failures += 1;
                log::warn!("⚠️  Memory sample unavailable: {}", e);
                MemorySample::unavailable(timestamp)
            }
        }
    }

    /// Take a sample and retain it in the history.
    ///
    /// Failed samples are not retained, so they never feed spike detection.
    pub fn poll(&mut self) -> Option<MemorySample> {
        let sample = self.sample_now();
        if sample.is_unavailable() {
            return None;
        }

        self.retain(sample.clone());
        Some(sample)
    }

    /// Append a sample to the history, evicting the oldest beyond the cap
    pub fn retain(&mut self, sample: MemorySample) {
        self.history.push_back(sample);
        while self.history.len() > self.history_cap {
            self.history.pop_front();
        }
    }

    /// Resident-memory growth between the two most recent retained samples, in MB
    pub fn latest_delta_mb(&self) -> Option<f64> {
        let len = self.history.len();
        if len < 2 {
            return None;
        }

        let previous = &self.history[len - 2];
        let current = &self.history[len - 1];
        Some((current.resident_bytes as f64 - previous.resident_bytes as f64) / BYTES_PER_MB)
    }

    /// True if resident memory grew by more than `threshold_mb` between the
    /// last two retained samples
    pub fn check_spike(&self, threshold_mb: f64) -> bool {
        self.latest_delta_mb()
            .map_or(false, |delta| delta > threshold_mb)
    }

    /// Attach a fresh (uncached) memory sample to a classified window
    pub fn correlate(&mut self, candidate: RapidCandidate) -> RapidSequenceEvent {
        let memory_at_detection = self.sample_now();
        RapidSequenceEvent {
            sequence_number: candidate.sequence_number,
            detection_time: memory_at_detection.timestamp,
            toggle_count: candidate.toggle_count,
            window_duration_ms: candidate.window_duration_ms,
            stats: candidate.stats,
            memory_at_detection,
        }
    }

    pub fn history(&self) -> impl Iterator<Item = &MemorySample> {
        self.history.iter()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn latest(&self) -> Option<&MemorySample> {
        self.history.back()
    }

    /// Largest resident size seen in the retained history
    pub fn peak_resident_bytes(&self) -> u64 {
        self.history.iter().map(|s| s.resident_bytes).max().unwrap_or(0)
    }

    pub fn failures(&self) -> u64 {
        self.failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector_core::window::WindowClassifier;
    use crate::detector_core::transition::ToggleEvent;
    use crate::detector_core::sampler::{MemoryError, MemoryReading};
    use std::time::Duration;

    const MB: u64 = 1024 * 1024;

    /// Replays a fixed list of readings, then fails
    struct ScriptedSampler {
        readings: VecDeque<Result<MemoryReading, MemoryError>>,
    }

    impl ScriptedSampler {
        fn resident_mb(values: &[u64]) -> Box<Self> {
            Box::new(Self {
                readings: values
                    .iter()
                    .map(|&mb| {
                        Ok(MemoryReading {
                            resident_bytes: mb * MB,
                            virtual_bytes: 4 * mb * MB,
                            usage_percent: 1.5,
                        })
                    })
                    .collect(),
            })
        }
    }

    impl MemorySampler for ScriptedSampler {
        fn current_process_memory(&mut self) -> Result<MemoryReading, MemoryError> {
            self.readings
                .pop_front()
                .unwrap_or_else(|| Err(MemoryError::ProcessNotFound))
        }
    }

    #[test]
    fn test_spike_detected_above_threshold() {
        let mut correlator = MemoryCorrelator::new(ScriptedSampler::resident_mb(&[100, 160]), 10);
        correlator.poll();
        correlator.poll();

        assert!(correlator.check_spike(50.0));
        assert_eq!(correlator.latest_delta_mb(), Some(60.0));
    }

    #[test]
    fn test_no_spike_below_threshold() {
        let mut correlator = MemoryCorrelator::new(ScriptedSampler::resident_mb(&[100, 130]), 10);
        correlator.poll();
        correlator.poll();

        assert!(!correlator.check_spike(50.0));
    }

    #[test]
    fn test_spike_requires_two_samples() {
        let mut correlator = MemoryCorrelator::new(ScriptedSampler::resident_mb(&[500]), 10);
        correlator.poll();

        assert!(!correlator.check_spike(0.0));
        assert_eq!(correlator.latest_delta_mb(), None);
    }

    #[test]
    fn test_shrinking_memory_is_not_a_spike() {
        let mut correlator = MemoryCorrelator::new(ScriptedSampler::resident_mb(&[300, 100]), 10);
        correlator.poll();
        correlator.poll();

        assert!(!correlator.check_spike(50.0));
    }

    #[test]
    fn test_failed_sample_is_zeroed_and_not_retained() {
        let mut correlator = MemoryCorrelator::new(ScriptedSampler::resident_mb(&[100]), 10);
        correlator.poll();

        let sample = correlator.sample_now();
        assert!(sample.is_unavailable());
        assert!(correlator.poll().is_none());
        assert_eq!(correlator.history_len(), 1);
        assert_eq!(correlator.failures(), 2);
    }

    #[test]
    fn test_history_is_capped() {
        let mut correlator =
            MemoryCorrelator::new(ScriptedSampler::resident_mb(&[1, 2, 3, 4, 5]), 3);
        for _ in 0..5 {
            correlator.poll();
        }

        assert_eq!(correlator.history_len(), 3);
        assert_eq!(correlator.history().next().unwrap().resident_bytes, 3 * MB);
        assert_eq!(correlator.peak_resident_bytes(), 5 * MB);
    }

    #[test]
    fn test_correlate_takes_fresh_sample() {
        let mut correlator =
            MemoryCorrelator::new(ScriptedSampler::resident_mb(&[100, 200]), 10);
        correlator.poll();

        let mut classifier = WindowClassifier::with_defaults();
        let candidate = (0..6u64)
            .filter_map(|i| {
                classifier.on_toggle(ToggleEvent {
                    timestamp: Duration::from_millis(i * 10),
                    sequence_index: i,
                    state: i % 2 == 1,
                })
            })
            .next()
            .expect("rapid candidate");

        let event = correlator.correlate(candidate);

        assert_eq!(event.sequence_number, 1);
        assert_eq!(event.toggle_count, 6);
        assert_eq!(event.memory_at_detection.resident_bytes, 200 * MB);
        // Correlation samples do not enter the background history
        assert_eq!(correlator.history_len(), 1);
        assert!(event.describe().contains("RAPID SEQUENCE #1: 6 toggles in 50.00ms"));
    }
}
