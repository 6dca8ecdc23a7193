//! Monitoring loop: polls the pin and memory, drives detection, writes the trail

use super::config::MonitorConfig;
use super::event_sink::{EventSink, SinkStats};
use super::gpio_source::HardwareSource;
use super::signal_source::{PinDirection, SignalSource};
use super::sim_source::SimulatedSource;
use crate::detector_core::{MemoryCorrelator, MemorySampler, TransitionDetector, WindowClassifier};
use chrono::Local;
use serde::Serialize;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;

/// Read errors are logged on the first occurrence and then every Nth
const READ_ERROR_LOG_EVERY: u64 = 100;

/// Pick the signal source once at startup.
///
/// Hardware is tried unless simulation is forced; any failure falls back to
/// the simulated source and the decision is logged once here.
pub fn select_source(config: &MonitorConfig) -> Box<dyn SignalSource> {
    if config.force_simulation {
        log::info!("🎲 Simulation mode forced by configuration");
    } else {
        let mut hardware = HardwareSource::new(&config.gpio_root, config.pin);
        match hardware
            .open()
            .and_then(|_| hardware.set_direction(config.pin, PinDirection::Input))
        {
            Ok(()) => return Box::new(hardware),
            Err(e) => {
                log::warn!(
                    "⚠️  Hardware signal source unavailable ({}), falling back to simulation mode",
                    e
                );
                let _ = hardware.close();
            }
        }
    }

    let mut simulated = SimulatedSource::new(
        config.sim_toggle_probability,
        config.sim_burst_probability,
        config.rapid_toggle_count as u32,
        config.sim_seed,
    );
    if let Err(e) = simulated
        .open()
        .and_then(|_| simulated.set_direction(config.pin, PinDirection::Input))
    {
        log::warn!("⚠️  Simulated source failed to open: {}", e);
    }
    Box::new(simulated)
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MonitorStats {
    pub samples_read: u64,
    pub read_errors: u64,
    /// Samples that reached the transition detector
    pub samples_observed: u64,
    /// Read errors plus samples dropped for a non-increasing timestamp
    pub samples_skipped: u64,
    pub toggles: u64,
    pub rapid_sequences: u64,
    pub memory_samples: u64,
    pub memory_spikes: u64,
}

/// Aggregate statistics reported when the loop stops
#[derive(Debug, Clone, Serialize)]
pub struct MonitorSummary {
    pub backend: String,
    pub runtime_secs: f64,
    #[serde(flatten)]
    pub stats: MonitorStats,
    pub peak_resident_mb: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trail: Option<SinkStats>,
}

impl MonitorSummary {
    pub fn describe(&self) -> String {
        format!(
            "{} backend, {:.1}s, {} samples ({} read errors, {} skipped), {} toggles, {} rapid sequences, {} memory samples, {} memory spikes, peak RSS {:.1}MB",
            self.backend,
            self.runtime_secs,
            self.stats.samples_read,
            self.stats.read_errors,
            self.stats.samples_skipped,
            self.stats.toggles,
            self.stats.rapid_sequences,
            self.stats.memory_samples,
            self.stats.memory_spikes,
            self.peak_resident_mb,
        )
    }
}

/// Single-threaded polling monitor.
///
/// Owns every piece of mutable state (toggle window, memory history, counters);
/// nothing is shared with other tasks.
pub struct ToggleMonitor {
    config: MonitorConfig,
    source: Box<dyn SignalSource>,
    sink: Box<dyn EventSink>,
    detector: TransitionDetector,
    classifier: WindowClassifier,
    correlator: MemoryCorrelator,
    epoch: Instant,
    last_memory_sample: Option<Instant>,
    last_status: Instant,
    stats: MonitorStats,
}

impl ToggleMonitor {
    pub fn new(
        config: MonitorConfig,
        source: Box<dyn SignalSource>,
        sampler: Box<dyn MemorySampler>,
        sink: Box<dyn EventSink>,
    ) -> Self {
        let now = Instant::now();
        Self {
            classifier: WindowClassifier::new(config.rapid_toggle_count, config.rapid_window_ms),
            correlator: MemoryCorrelator::new(sampler, config.memory_history_cap),
            detector: TransitionDetector::new(),
            config,
            source,
            sink,
            epoch: now,
            last_memory_sample: None,
            last_status: now,
            stats: MonitorStats::default(),
        }
    }

    /// Instant that toggle timestamps are measured from
    pub fn epoch(&self) -> Instant {
        self.epoch
    }

    pub fn stats(&self) -> &MonitorStats {
        &self.stats
    }

    pub fn classifier(&self) -> &WindowClassifier {
        &self.classifier
    }

    pub fn correlator(&self) -> &MemoryCorrelator {
        &self.correlator
    }

    /// Write the startup banner to the trail
    pub async fn record_start(&mut self) {
        let message = format!(
            "Monitoring started on pin {} ({} backend): rapid = {} toggles within {}ms, memory spike > {}MB, poll every {}ms",
            self.config.pin,
            self.source.backend_type(),
            self.config.rapid_toggle_count,
            self.config.rapid_window_ms,
            self.config.memory_spike_threshold_mb,
            self.config.poll_interval_ms,
        );
        self.sink.record(Local::now(), &message).await;
    }

    /// One polling iteration at `now`
    pub async fn tick(&mut self, now: Instant) {
        let timestamp = now.saturating_duration_since(self.epoch);

        match self.source.read_state(self.config.pin) {
            Ok(bit) => {
                self.stats.samples_read += 1;
                if let Some(toggle) = self.detector.observe(timestamp, bit) {
                    self.stats.toggles += 1;
                    log::debug!(
                        "Toggle #{} at {:?} (state {})",
                        toggle.sequence_index,
                        toggle.timestamp,
                        u8::from(toggle.state)
                    );

                    if let Some(candidate) = self.classifier.on_toggle(toggle) {
                        let event = self.correlator.correlate(candidate);
                        self.stats.rapid_sequences += 1;
                        log::info!(
                            "🎯 Rapid sequence #{}: {} toggles in {:.2}ms",
                            event.sequence_number,
                            event.toggle_count,
                            event.window_duration_ms
                        );
                        self.sink.record(event.detection_time, &event.describe()).await;
                    }
                }
            }
            Err(e) => {
                // Skipped sample: the detector keeps its last recorded state
                self.detector.skip();
                self.stats.read_errors += 1;
                if self.stats.read_errors == 1 || self.stats.read_errors % READ_ERROR_LOG_EVERY == 0 {
                    log::warn!(
                        "⚠️  Pin read failed ({} total): {}",
                        self.stats.read_errors,
                        e
                    );
                }
            }
        }

        self.poll_memory(now).await;
        self.report_status(now).await;
    }

    /// Rate-limited background memory sample plus spike check
    async fn poll_memory(&mut self, now: Instant) {
        let interval = Duration::from_millis(self.config.memory_sample_interval_ms);
        let due = self
            .last_memory_sample
            .map_or(true, |last| now.saturating_duration_since(last) >= interval);
        if !due {
            return;
        }
        self.last_memory_sample = Some(now);

        let Some(sample) = self.correlator.poll() else {
            return;
        };
        self.stats.memory_samples += 1;
        log::debug!(
            "Current memory: RSS={:.1}MB VMS={:.1}MB ({:.2}%)",
            sample.resident_mb(),
            sample.virtual_mb(),
            sample.usage_percent
        );

        let threshold = self.config.memory_spike_threshold_mb;
        if self.correlator.check_spike(threshold) {
            self.stats.memory_spikes += 1;
            let delta = self.correlator.latest_delta_mb().unwrap_or_default();
            let message = format!(
                "MEMORY SPIKE: RSS grew {:.1}MB ({:.1}MB -> {:.1}MB, threshold {}MB)",
                delta,
                sample.resident_mb() - delta,
                sample.resident_mb(),
                threshold
            );
            log::warn!("📈 {}", message);
            self.sink.record(sample.timestamp, &message).await;
        }
    }

    async fn report_status(&mut self, now: Instant) {
        if self.config.status_interval_secs == 0 {
            return;
        }
        let interval = Duration::from_secs(self.config.status_interval_secs);
        if now.saturating_duration_since(self.last_status) < interval {
            return;
        }
        self.last_status = now;

        let rss = self
            .correlator
            .latest()
            .map(|s| format!("{:.1}MB", s.resident_mb()))
            .unwrap_or_else(|| "n/a".to_string());
        let message = format!(
            "Status: {} samples, {} toggles, {} rapid sequences, {} memory spikes, RSS {}, classifier {}",
            self.stats.samples_read,
            self.stats.toggles,
            self.stats.rapid_sequences,
            self.stats.memory_spikes,
            rss,
            self.classifier.state().as_str(),
        );
        self.sink.record(Local::now(), &message).await;
    }

    pub fn summary(&self) -> MonitorSummary {
        let mut stats = self.stats.clone();
        stats.samples_observed = self.detector.samples_observed();
        stats.samples_skipped = self.detector.samples_skipped();

        MonitorSummary {
            backend: self.source.backend_type().to_string(),
            runtime_secs: self.epoch.elapsed().as_secs_f64(),
            stats,
            peak_resident_mb: self.correlator.peak_resident_bytes() as f64
                / crate::detector_core::BYTES_PER_MB,
            trail: None,
        }
    }

    /// Poll at the configured interval until `shutdown` resolves.
    ///
    /// Shutdown is only observed between ticks, so an iteration in progress
    /// always completes. Afterwards the final statistics are recorded once,
    /// the signal source is closed and the sink is closed.
    pub async fn run_until<F>(mut self, shutdown: F) -> MonitorSummary
    where
        F: Future<Output = ()>,
    {
        self.epoch = tokio::time::Instant::now().into_std();
        self.last_status = self.epoch;

        let mut ticker = tokio::time::interval(Duration::from_millis(self.config.poll_interval_ms));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        self.record_start().await;
        log::info!(
            "✅ Monitor running ({} backend, poll {}ms)",
            self.source.backend_type(),
            self.config.poll_interval_ms
        );

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    log::info!("⚠️  Stop requested, shutting down...");
                    break;
                }
                _ = ticker.tick() => {
                    // A late tick still reports its scheduled deadline; stamp the actual read time
                    let now = tokio::time::Instant::now().into_std();
                    self.tick(now).await;
                }
            }
        }

        self.finish().await
    }

    async fn finish(mut self) -> MonitorSummary {
        let mut summary = self.summary();
        log::info!("📊 {}", summary.describe());

        let message = match serde_json::to_string(&summary) {
            Ok(json) => format!("Monitoring stopped. Final statistics: {}", json),
            Err(e) => {
                log::warn!("Failed to serialize final statistics: {}", e);
                format!("Monitoring stopped. Final statistics: {}", summary.describe())
            }
        };
        self.sink.record(Local::now(), &message).await;

        if let Err(e) = self.source.close() {
            log::warn!("⚠️  Failed to release signal source: {}", e);
        }
        if let Err(e) = self.sink.close().await {
            log::warn!("⚠️  Failed to close event sink: {}", e);
        }

        summary.trail = self.sink.stats().ok();
        log::info!("✅ Monitor stopped");
        summary
    }
}
