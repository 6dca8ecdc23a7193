//! Memory sampler seam used by the correlator

/// Raw memory figures for the current process
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemoryReading {
    pub resident_bytes: u64,
    pub virtual_bytes: u64,
    pub usage_percent: f64,
}

#[derive(Debug)]
pub enum MemoryError {
    PidUnavailable(String),
    ProcessNotFound,
}

impl std::fmt::Display for MemoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MemoryError::PidUnavailable(e) => write!(f, "Cannot determine current pid: {}", e),
            MemoryError::ProcessNotFound => write!(f, "Current process not found in process table"),
        }
    }
}

impl std::error::Error for MemoryError {}

/// Source of point-in-time process memory metrics
pub trait MemorySampler: Send {
    fn current_process_memory(&mut self) -> Result<MemoryReading, MemoryError>;
}
