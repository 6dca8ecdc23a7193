//! Toggle Monitor Binary - rapid toggle detection with memory correlation
//!
//! Polls one digital input pin, classifies bursts of rapid toggles and tags
//! each burst with the process memory state at detection time.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release --bin togglewatch -- [--simulate] [--pin N] [--log-file PATH]
//! ```
//!
//! ## Environment Variables
//!
//! - DIO_PIN - Monitored pin (default: 0)
//! - RAPID_TOGGLE_COUNT - Toggles per rapid sequence (default: 6)
//! - RAPID_WINDOW_MS - Rapid sequence window in ms (default: 60)
//! - MEMORY_SPIKE_THRESHOLD_MB - Memory spike threshold (default: 50)
//! - POLL_INTERVAL_MS - Pin poll interval (default: 5)
//! - EVENT_LOG_PATH - Event trail file (default: event_log.txt)
//! - FORCE_SIMULATION - Skip hardware detection (default: false)
//! - RUST_LOG - Logging level (optional, default: info)

use std::process::ExitCode;
use togglewatch::monitor_core::{
    select_source, MonitorConfig, SysinfoSampler, TextTrailSink, ToggleMonitor,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    dotenv::dotenv().ok();

    let mut config = match MonitorConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("❌ {}", e);
            return ExitCode::from(2);
        }
    };
    if let Err(e) = config.apply_args(std::env::args().skip(1)) {
        log::error!("❌ {}", e);
        return ExitCode::from(2);
    }
    if let Err(e) = config.validate() {
        log::error!("❌ {}", e);
        return ExitCode::from(2);
    }

    log::info!("🚀 Starting toggle monitor");
    log::info!("   Pin: {}", config.pin);
    log::info!(
        "   Rapid sequence: {} toggles within {}ms",
        config.rapid_toggle_count,
        config.rapid_window_ms
    );
    log::info!("   Memory spike threshold: {}MB", config.memory_spike_threshold_mb);
    log::info!("   Poll interval: {}ms", config.poll_interval_ms);
    log::info!("   Event trail: {}", config.event_log_path.display());

    let sampler = match SysinfoSampler::new() {
        Ok(sampler) => sampler,
        Err(e) => {
            log::error!("❌ Memory sampler initialization failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let source = select_source(&config);
    log::info!("📊 Signal backend: {}", source.backend_type());

    let sink = TextTrailSink::open_or_console(&config.event_log_path);

    let monitor = ToggleMonitor::new(config, source, Box::new(sampler), Box::new(sink));

    log::info!("🔄 Press CTRL+C to stop monitoring");

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("❌ Failed to listen for CTRL+C: {}", e);
            // Keep monitoring; the process can still be terminated externally
            std::future::pending::<()>().await;
        }
    };

    let summary = monitor.run_until(shutdown).await;
    if let Some(trail) = summary.trail {
        log::info!(
            "📝 Event trail: {} lines, {} bytes",
            trail.line_count,
            trail.size_bytes
        );
    }

    ExitCode::SUCCESS
}
