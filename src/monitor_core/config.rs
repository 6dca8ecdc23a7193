//! Monitor configuration from environment variables and CLI flags

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Upper bound for `rapid_toggle_count`. The classifier window is allocated up front.
pub const MAX_RAPID_TOGGLE_COUNT: usize = 1024;

/// Upper bound for `memory_history_cap` (one day of samples at 1 Hz).
pub const MAX_MEMORY_HISTORY_CAP: usize = 86_400;

#[derive(Debug)]
pub enum ConfigError {
    InvalidValue(String),
    MissingArgument(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue(msg) => write!(f, "Invalid configuration value: {}", msg),
            ConfigError::MissingArgument(flag) => write!(f, "Missing value for argument: {}", flag),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Configuration for the toggle monitor
///
/// Loaded from environment variables with the defaults below.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    /// Monitored digital input pin
    pub pin: u32,

    /// Toggles that make up a rapid sequence
    pub rapid_toggle_count: usize,

    /// Maximum span of a rapid sequence in milliseconds (inclusive)
    pub rapid_window_ms: u64,

    /// Resident-memory growth between background samples that counts as a spike
    pub memory_spike_threshold_mb: f64,

    /// Signal poll interval in milliseconds
    pub poll_interval_ms: u64,

    /// Minimum gap between background memory samples
    pub memory_sample_interval_ms: u64,

    /// Background memory samples kept for spike detection
    pub memory_history_cap: usize,

    pub event_log_path: PathBuf,

    /// Root of the sysfs GPIO tree
    pub gpio_root: PathBuf,

    /// Skip hardware detection and use the simulated source
    pub force_simulation: bool,

    pub sim_toggle_probability: f64,
    pub sim_burst_probability: f64,
    pub sim_seed: Option<u64>,

    /// Status line interval in seconds (0 disables)
    pub status_interval_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            pin: 0,
            rapid_toggle_count: 6,
            rapid_window_ms: 60,
            memory_spike_threshold_mb: 50.0,
            poll_interval_ms: 5,
            memory_sample_interval_ms: 1_000,
            memory_history_cap: 3_600,
            event_log_path: PathBuf::from("event_log.txt"),
            gpio_root: PathBuf::from("/sys/class/gpio"),
            force_simulation: false,
            sim_toggle_probability: 0.05,
            sim_burst_probability: 0.002,
            sim_seed: None,
            status_interval_secs: 30,
        }
    }
}

/// Parse an optional environment variable; present-but-unparsable is an error
fn env_parse<T: FromStr>(name: &str) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(raw) if raw.trim().is_empty() => Ok(None),
        Ok(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
            ConfigError::InvalidValue(format!("{}={:?} could not be parsed", name, raw))
        }),
        Err(_) => Ok(None),
    }
}

impl MonitorConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `DIO_PIN` (default: 0)
    /// - `RAPID_TOGGLE_COUNT` (default: 6)
    /// - `RAPID_WINDOW_MS` (default: 60)
    /// - `MEMORY_SPIKE_THRESHOLD_MB` (default: 50)
    /// - `POLL_INTERVAL_MS` (default: 5)
    /// - `MEMORY_SAMPLE_INTERVAL_MS` (default: 1000)
    /// - `MEMORY_HISTORY_CAP` (default: 3600)
    /// - `EVENT_LOG_PATH` (default: event_log.txt)
    /// - `GPIO_SYSFS_ROOT` (default: /sys/class/gpio)
    /// - `FORCE_SIMULATION` (default: false)
    /// - `SIM_TOGGLE_PROBABILITY` (default: 0.05)
    /// - `SIM_BURST_PROBABILITY` (default: 0.002)
    /// - `SIM_SEED` (default: unset)
    /// - `STATUS_INTERVAL_SECS` (default: 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        Ok(Self {
            pin: env_parse("DIO_PIN")?.unwrap_or(defaults.pin),
            rapid_toggle_count: env_parse("RAPID_TOGGLE_COUNT")?
                .unwrap_or(defaults.rapid_toggle_count),
            rapid_window_ms: env_parse("RAPID_WINDOW_MS")?.unwrap_or(defaults.rapid_window_ms),
            memory_spike_threshold_mb: env_parse("MEMORY_SPIKE_THRESHOLD_MB")?
                .unwrap_or(defaults.memory_spike_threshold_mb),
            poll_interval_ms: env_parse("POLL_INTERVAL_MS")?.unwrap_or(defaults.poll_interval_ms),
            memory_sample_interval_ms: env_parse("MEMORY_SAMPLE_INTERVAL_MS")?
                .unwrap_or(defaults.memory_sample_interval_ms),
            memory_history_cap: env_parse("MEMORY_HISTORY_CAP")?
                .unwrap_or(defaults.memory_history_cap),
            event_log_path: env_parse("EVENT_LOG_PATH")?.unwrap_or(defaults.event_log_path),
            gpio_root: env_parse("GPIO_SYSFS_ROOT")?.unwrap_or(defaults.gpio_root),
            force_simulation: env_parse::<String>("FORCE_SIMULATION")?
                .map(|s| parse_flag(&s))
                .transpose()?
                .unwrap_or(defaults.force_simulation),
            sim_toggle_probability: env_parse("SIM_TOGGLE_PROBABILITY")?
                .unwrap_or(defaults.sim_toggle_probability),
            sim_burst_probability: env_parse("SIM_BURST_PROBABILITY")?
                .unwrap_or(defaults.sim_burst_probability),
            sim_seed: env_parse("SIM_SEED")?,
            status_interval_secs: env_parse("STATUS_INTERVAL_SECS")?
                .unwrap_or(defaults.status_interval_secs),
        })
    }

    /// Apply command-line overrides: `--simulate`, `--pin <N>`, `--log-file <PATH>`
    pub fn apply_args<I>(&mut self, args: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--simulate" => self.force_simulation = true,
                "--pin" => {
                    let value = args
                        .next()
                        .ok_or_else(|| ConfigError::MissingArgument("--pin".to_string()))?;
                    self.pin = value.parse().map_err(|_| {
                        ConfigError::InvalidValue(format!("--pin {:?} is not a pin number", value))
                    })?;
                }
                "--log-file" => {
                    let value = args
                        .next()
                        .ok_or_else(|| ConfigError::MissingArgument("--log-file".to_string()))?;
                    self.event_log_path = PathBuf::from(value);
                }
                other => log::warn!("Ignoring unknown argument '{}'", other),
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rapid_toggle_count < 2 {
            return Err(ConfigError::InvalidValue(format!(
                "rapid_toggle_count must be at least 2, got {}",
                self.rapid_toggle_count
            )));
        }

        if self.rapid_toggle_count > MAX_RAPID_TOGGLE_COUNT {
            return Err(ConfigError::InvalidValue(format!(
                "rapid_toggle_count must be at most {}, got {}",
                MAX_RAPID_TOGGLE_COUNT, self.rapid_toggle_count
            )));
        }

        if self.rapid_window_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "rapid_window_ms must be greater than 0".to_string(),
            ));
        }

        if self.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "poll_interval_ms must be greater than 0".to_string(),
            ));
        }

        if !(self.memory_spike_threshold_mb.is_finite() && self.memory_spike_threshold_mb > 0.0) {
            return Err(ConfigError::InvalidValue(format!(
                "memory_spike_threshold_mb must be positive, got {}",
                self.memory_spike_threshold_mb
            )));
        }

        if self.memory_history_cap < 2 {
            return Err(ConfigError::InvalidValue(format!(
                "memory_history_cap must be at least 2, got {}",
                self.memory_history_cap
            )));
        }

        if self.memory_history_cap > MAX_MEMORY_HISTORY_CAP {
            return Err(ConfigError::InvalidValue(format!(
                "memory_history_cap must be at most {}, got {}",
                MAX_MEMORY_HISTORY_CAP, self.memory_history_cap
            )));
        }

        for (name, p) in [
            ("sim_toggle_probability", self.sim_toggle_probability),
            ("sim_burst_probability", self.sim_burst_probability),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(ConfigError::InvalidValue(format!(
                    "{} must be within [0, 1], got {}",
                    name, p
                )));
            }
        }

        Ok(())
    }
}

fn parse_flag(raw: &str) -> Result<bool, ConfigError> {
    match raw.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue(format!(
            "expected a boolean flag, got {:?}",
            raw
        ))),
    }
}
