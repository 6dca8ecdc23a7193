
pub mod detector_core;
pub mod monitor_core;
