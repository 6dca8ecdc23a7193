//! Frequency and inter-toggle interval statistics for a toggle window

use serde::Serialize;
use std::time::Duration;

/// Statistics derived from one window of toggle timestamps.
///
/// Always recomputed from the window that produced it; never stored on its own.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternStats {
    pub toggle_count: usize,
    pub frequency_hz: f64,
    pub intervals_ms: Vec<f64>,
    pub avg_interval_ms: f64,
    pub span_ms: f64,
    pub is_rapid: bool,
}

pub struct PatternAnalyzer {
    window_size: usize,
    window: Duration,
}

impl PatternAnalyzer {
    pub fn new(window_size: usize, window_ms: u64) -> Self {
        Self {
            window_size,
            window: Duration::from_millis(window_ms),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(6, 60)
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Analyze an ordered sequence of toggle timestamps
    ///
    /// # Rules
    /// - `intervals_ms[i]` is the gap between timestamps `i` and `i + 1`
    /// - `frequency_hz = (count - 1) / span_secs`, 0 for a zero span or < 2 samples
    /// - `is_rapid` requires `span <= window` (inclusive) AND `count >= window_size`
    ///
    /// The input is only borrowed, so repeated calls on the same slice yield
    /// identical results.
    pub fn analyze(&self, timestamps: &[Duration]) -> PatternStats {
        let count = timestamps.len();

        let intervals_ms: Vec<f64> = timestamps
            .windows(2)
            .map(|pair| nanos_to_ms(pair[1].saturating_sub(pair[0])))
            .collect();

        let avg_interval_ms = if intervals_ms.is_empty() {
            0.0
        } else {
            intervals_ms.iter().sum::<f64>() / intervals_ms.len() as f64
        };

        let span = match (timestamps.first(), timestamps.last()) {
            (Some(first), Some(last)) if count >= 2 => last.saturating_sub(*first),
            _ => Duration::ZERO,
        };

        let frequency_hz = if count < 2 || span.is_zero() {
            0.0
        } else {
            (count - 1) as f64 / span.as_secs_f64()
        };

        let is_rapid = count >= 2 && count >= self.window_size && span <= self.window;

        PatternStats {
            toggle_count: count,
            frequency_hz,
            intervals_ms,
            avg_interval_ms,
            span_ms: nanos_to_ms(span),
            is_rapid,
        }
    }
}

impl Default for PatternAnalyzer {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn nanos_to_ms(d: Duration) -> f64 {
    d.as_nanos() as f64 / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms_series(values: &[u64]) -> Vec<Duration> {
        values.iter().map(|&v| Duration::from_millis(v)).collect()
    }

    #[test]
    fn test_evenly_spaced_at_boundary_is_rapid() {
        // N timestamps spaced W/(N-1) apart land exactly on the window edge
        for (n, w) in [(6usize, 60u64), (3, 100), (8, 60), (2, 1)] {
            let analyzer = PatternAnalyzer::new(n, w);
            let step_ns = w * 1_000_000 / (n as u64 - 1);
            let timestamps: Vec<Duration> = (0..n as u64)
                .map(|i| Duration::from_nanos(1_000_000_000 + i * step_ns))
                .collect();

            let stats = analyzer.analyze(&timestamps);
            assert!(stats.is_rapid, "n={} w={} span={}", n, w, stats.span_ms);
        }
    }

    #[test]
    fn test_reference_window() {
        let analyzer = PatternAnalyzer::with_defaults();
        let stats = analyzer.analyze(&ms_series(&[0, 10, 20, 30, 40, 50]));

        assert_eq!(stats.toggle_count, 6);
        assert_eq!(stats.span_ms, 50.0);
        assert_eq!(stats.intervals_ms, vec![10.0; 5]);
        assert_eq!(stats.avg_interval_ms, 10.0);
        assert!((stats.frequency_hz - 100.0).abs() < 1e-9);
        assert!(stats.is_rapid);
    }

    #[test]
    fn test_slow_window_is_not_rapid() {
        let analyzer = PatternAnalyzer::with_defaults();
        let stats = analyzer.analyze(&ms_series(&[0, 20, 40, 60, 80, 100]));

        assert_eq!(stats.span_ms, 100.0);
        assert!(!stats.is_rapid);
    }

    #[test]
    fn test_too_few_toggles_is_not_rapid() {
        let analyzer = PatternAnalyzer::with_defaults();
        let stats = analyzer.analyze(&ms_series(&[0, 1, 2]));

        assert!(!stats.is_rapid);
    }

    #[test]
    fn test_frequency_matches_count_over_span() {
        let analyzer = PatternAnalyzer::with_defaults();
        let series = [
            ms_series(&[0, 7]),
            ms_series(&[3, 9, 31, 32]),
            ms_series(&[100, 250, 251, 900, 1000]),
        ];

        for timestamps in series {
            let stats = analyzer.analyze(&timestamps);
            let span = *timestamps.last().unwrap() - timestamps[0];
            let expected = (timestamps.len() - 1) as f64 / span.as_secs_f64();
            assert_eq!(stats.frequency_hz, expected);
        }
    }

    #[test]
    fn test_single_sample_has_zero_frequency() {
        let analyzer = PatternAnalyzer::with_defaults();
        let stats = analyzer.analyze(&ms_series(&[42]));

        assert_eq!(stats.frequency_hz, 0.0);
        assert_eq!(stats.avg_interval_ms, 0.0);
        assert_eq!(stats.span_ms, 0.0);
        assert!(stats.intervals_ms.is_empty());
    }

    #[test]
    fn test_zero_span_has_zero_frequency() {
        let analyzer = PatternAnalyzer::new(2, 60);
        let stats = analyzer.analyze(&ms_series(&[5, 5]));

        assert_eq!(stats.frequency_hz, 0.0);
    }

    #[test]
    fn test_empty_input() {
        let stats = PatternAnalyzer::with_defaults().analyze(&[]);

        assert_eq!(stats.toggle_count, 0);
        assert!(!stats.is_rapid);
    }

    #[test]
    fn test_analyze_is_idempotent() {
        let analyzer = PatternAnalyzer::with_defaults();
        let timestamps = ms_series(&[1, 4, 9, 16, 25, 36]);

        let first = analyzer.analyze(&timestamps);
        let second = analyzer.analyze(&timestamps);

        assert_eq!(first, second);
        assert_eq!(first.frequency_hz.to_bits(), second.frequency_hz.to_bits());
        assert_eq!(timestamps, ms_series(&[1, 4, 9, 16, 25, 36]));
    }
}
