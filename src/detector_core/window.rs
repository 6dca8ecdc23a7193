//! Trailing toggle window and rapid-sequence classification

use super::analyzer::{PatternAnalyzer, PatternStats};
use super::transition::ToggleEvent;
use serde::Serialize;
use std::collections::VecDeque;
use std::time::Duration;

/// The most recent toggles, oldest first. Never holds more than `capacity` events.
#[derive(Debug, Clone)]
pub struct ToggleWindow {
    events: VecDeque<ToggleEvent>,
    capacity: usize,
}

impl ToggleWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an event, evicting the oldest one when the window overflows.
    /// Returns the evicted event, if any.
    pub fn push(&mut self, event: ToggleEvent) -> Option<ToggleEvent> {
        debug_assert!(
            self.events
                .back()
                .map_or(true, |last| last.timestamp < event.timestamp),
            "toggle timestamps must be strictly increasing"
        );

        let evicted = if self.events.len() >= self.capacity {
            self.events.pop_front()
        } else {
            None
        };
        self.events.push_back(event);
        evicted
    }

    pub fn evict_oldest(&mut self) -> Option<ToggleEvent> {
        self.events.pop_front()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.events.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Time between the oldest and newest event (zero for fewer than two)
    pub fn span(&self) -> Duration {
        match (self.events.front(), self.events.back()) {
            (Some(first), Some(last)) => last.timestamp.saturating_sub(first.timestamp),
            _ => Duration::ZERO,
        }
    }

    pub fn timestamps(&self) -> Vec<Duration> {
        self.events.iter().map(|e| e.timestamp).collect()
    }

    pub fn events(&self) -> impl Iterator<Item = &ToggleEvent> {
        self.events.iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ClassifierState {
    Accumulating,
    RapidDetected,
}

impl ClassifierState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassifierState::Accumulating => "ACCUMULATING",
            ClassifierState::RapidDetected => "RAPID_DETECTED",
        }
    }
}

/// A window that satisfied the rapid-toggle policy, not yet tagged with memory state
#[derive(Debug, Clone, Serialize)]
pub struct RapidCandidate {
    pub sequence_number: u64,
    pub toggle_count: usize,
    pub window_duration_ms: f64,
    pub events: Vec<ToggleEvent>,
    pub stats: PatternStats,
}

/// Classifies toggles as rapid sequences: N toggles within W milliseconds.
///
/// Policy:
/// - a full window whose span exceeds W drops its oldest event and keeps
///   accumulating (strict trailing window of the last N toggles)
/// - a detection empties the window; the next toggle starts a fresh count
pub struct WindowClassifier {
    window: ToggleWindow,
    analyzer: PatternAnalyzer,
    state: ClassifierState,
    detections: u64,
}

impl WindowClassifier {
    pub fn new(window_size: usize, window_ms: u64) -> Self {
        Self {
            window: ToggleWindow::new(window_size),
            analyzer: PatternAnalyzer::new(window_size, window_ms),
            state: ClassifierState::Accumulating,
            detections: 0,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(6, 60)
    }

    /// Process one toggle, in observation order
    pub fn on_toggle(&mut self, event: ToggleEvent) -> Option<RapidCandidate> {
        if self.state == ClassifierState::RapidDetected {
            self.state = ClassifierState::Accumulating;
        }

        self.window.push(event);

        if !self.window.is_full() {
            return None;
        }

        if self.window.span() > self.analyzer.window() {
            self.window.evict_oldest();
            return None;
        }

        let timestamps = self.window.timestamps();
        let stats = self.analyzer.analyze(&timestamps);
        let events: Vec<ToggleEvent> = self.window.events().copied().collect();

        self.detections += 1;
        self.state = ClassifierState::RapidDetected;
        self.window.clear();

        log::debug!(
            "Rapid sequence #{} classified: {} toggles in {:.3}ms",
            self.detections,
            stats.toggle_count,
            stats.span_ms
        );

        Some(RapidCandidate {
            sequence_number: self.detections,
            toggle_count: stats.toggle_count,
            window_duration_ms: stats.span_ms,
            events,
            stats,
        })
    }

    pub fn state(&self) -> ClassifierState {
        self.state
    }

    pub fn detections(&self) -> u64 {
        self.detections
    }

    pub fn pending(&self) -> usize {
        self.window.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toggle(ms: u64, index: u64) -> ToggleEvent {
        ToggleEvent {
            timestamp: Duration::from_millis(ms),
            sequence_index: index,
            state: index % 2 == 0,
        }
    }

    fn feed(classifier: &mut WindowClassifier, times: &[u64]) -> Vec<RapidCandidate> {
        times
            .iter()
            .enumerate()
            .filter_map(|(i, &t)| classifier.on_toggle(toggle(t, i as u64)))
            .collect()
    }

    #[test]
    fn test_window_evicts_beyond_capacity() {
        let mut window = ToggleWindow::new(3);

        assert!(window.push(toggle(0, 0)).is_none());
        assert!(window.push(toggle(1, 1)).is_none());
        assert!(window.push(toggle(2, 2)).is_none());
        let evicted = window.push(toggle(3, 3)).expect("oldest evicted");

        assert_eq!(evicted.sequence_index, 0);
        assert_eq!(window.len(), 3);
        assert_eq!(window.span(), Duration::from_millis(2));
    }

    #[test]
    fn test_large_window_constructs_and_stays_bounded() {
        let mut classifier = WindowClassifier::new(1024, 60_000);

        for i in 0..1500u64 {
            assert!(classifier.on_toggle(toggle(i * 100, i)).is_none());
        }
        assert_eq!(classifier.pending(), 1023);
    }

    #[test]
    fn test_rapid_sequence_detected() {
        let mut classifier = WindowClassifier::with_defaults();
        let detected = feed(&mut classifier, &[0, 10, 20, 30, 40, 50]);

        assert_eq!(detected.len(), 1);
        let candidate = &detected[0];
        assert_eq!(candidate.sequence_number, 1);
        assert_eq!(candidate.toggle_count, 6);
        assert_eq!(candidate.window_duration_ms, 50.0);
        assert!(candidate.stats.is_rapid);
        assert_eq!(candidate.events.len(), 6);
        assert_eq!(classifier.state(), ClassifierState::RapidDetected);
    }

    #[test]
    fn test_slow_sequence_not_detected() {
        let mut classifier = WindowClassifier::with_defaults();
        let detected = feed(&mut classifier, &[0, 20, 40, 60, 80, 100]);

        assert!(detected.is_empty());
        assert_eq!(classifier.state(), ClassifierState::Accumulating);
        assert_eq!(classifier.pending(), 5);
    }

    #[test]
    fn test_boundary_span_is_inclusive() {
        let mut classifier = WindowClassifier::with_defaults();
        let detected = feed(&mut classifier, &[0, 12, 24, 36, 48, 60]);

        assert_eq!(detected.len(), 1);
        assert_eq!(detected[0].window_duration_ms, 60.0);
    }

    #[test]
    fn test_trailing_window_slides_into_detection() {
        let mut classifier = WindowClassifier::with_defaults();
        // First toggle is far away; the last six fit inside 60ms
        let detected = feed(&mut classifier, &[0, 500, 510, 520, 530, 540, 550]);

        assert_eq!(detected.len(), 1);
        assert_eq!(detected[0].events[0].timestamp, Duration::from_millis(500));
    }

    #[test]
    fn test_full_reset_after_detection() {
        let mut classifier = WindowClassifier::with_defaults();
        feed(&mut classifier, &[0, 10, 20, 30, 40, 50]);

        assert_eq!(classifier.pending(), 0);

        // Five more toggles are not enough for a second detection
        for (i, t) in [60u64, 70, 80, 90, 100].iter().enumerate() {
            assert!(classifier.on_toggle(toggle(*t, 6 + i as u64)).is_none());
            assert_eq!(classifier.state(), ClassifierState::Accumulating);
        }

        let second = classifier
            .on_toggle(toggle(110, 11))
            .expect("sixth toggle after reset completes a new window");
        assert_eq!(second.sequence_number, 2);
        assert_eq!(second.events[0].timestamp, Duration::from_millis(60));
    }
}
