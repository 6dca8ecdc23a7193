//! Process memory sampling backed by `sysinfo`

use crate::detector_core::{MemoryError, MemoryReading, MemorySampler};
use sysinfo::{Pid, ProcessesToUpdate, System};

/// Samples the monitor's own process through `sysinfo`
pub struct SysinfoSampler {
    system: System,
    pid: Pid,
}

impl std::fmt::Debug for SysinfoSampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SysinfoSampler")
            .field("pid", &self.pid)
            .finish_non_exhaustive()
    }
}

impl SysinfoSampler {
    /// Resolve the current pid and take an initial reading.
    ///
    /// Fails if the process cannot see itself; the monitor treats that as fatal.
    pub fn new() -> Result<Self, MemoryError> {
        let pid = sysinfo::get_current_pid()
            .map_err(|e| MemoryError::PidUnavailable(e.to_string()))?;

        let mut sampler = Self {
            system: System::new(),
            pid,
        };
        sampler.current_process_memory()?;
        Ok(sampler)
    }
}

impl MemorySampler for SysinfoSampler {
    fn current_process_memory(&mut self) -> Result<MemoryReading, MemoryError> {
        self.system.refresh_memory();
        self.system
            .refresh_processes(ProcessesToUpdate::Some(&[self.pid]), true);

        let process = self
            .system
            .process(self.pid)
            .ok_or(MemoryError::ProcessNotFound)?;

        let resident_bytes = process.memory();
        let total = self.system.total_memory();
        let usage_percent = if total > 0 {
            resident_bytes as f64 / total as f64 * 100.0
        } else {
            0.0
        };

        Ok(MemoryReading {
            resident_bytes,
            virtual_bytes: process.virtual_memory(),
            usage_percent,
        })
    }
}
