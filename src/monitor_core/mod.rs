//! Monitor Core - I/O plumbing around the detector
//!
//! Signal sources, memory sampling, the event trail, configuration and the
//! polling loop that wires them to `detector_core`.
//!
//! # Architecture
//!
//! ```text
//! HardwareSource (sysfs GPIO) ─┐
//!                              ├─ select_source() → ToggleMonitor::tick (every poll_interval_ms)
//! SimulatedSource (rand) ──────┘         │
//!                                        ├─ detector_core (edges, windows, stats)
//! SysinfoSampler → MemoryCorrelator ─────┤
//!                                        ↓
//!                                  TextTrailSink → event_log.txt + stdout
//! ```

pub mod config;
pub mod event_sink;
pub mod gpio_source;
pub mod memory_sampler;
pub mod monitor;
pub mod signal_source;
pub mod sim_source;
pub mod text_sink;

pub use config::{ConfigError, MonitorConfig};
pub use event_sink::{EventSink, SinkError, SinkStats};
pub use gpio_source::HardwareSource;
pub use memory_sampler::SysinfoSampler;
pub use monitor::{select_source, MonitorStats, MonitorSummary, ToggleMonitor};
pub use signal_source::{PinDirection, SignalError, SignalSource};
pub use sim_source::SimulatedSource;
pub use text_sink::TextTrailSink;
