//! Hardware signal source on the Linux sysfs GPIO interface
//!
//! Layout under the sysfs root (default `/sys/class/gpio`):
//!
//! ```text
//! export            write "<pin>" to expose gpio<pin>/
//! unexport          write "<pin>" to release it
//! gpio<pin>/direction   "in" | "out"
//! gpio<pin>/value       "0" | "1"
//! ```

use super::signal_source::{PinDirection, SignalError, SignalSource};
use std::fs;
use std::path::{Path, PathBuf};

pub struct HardwareSource {
    root: PathBuf,
    pin: u32,
    opened: bool,
    exported_by_us: bool,
}

impl HardwareSource {
    pub fn new(root: impl AsRef<Path>, pin: u32) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            pin,
            opened: false,
            exported_by_us: false,
        }
    }

    fn pin_dir(&self, pin: u32) -> PathBuf {
        self.root.join(format!("gpio{}", pin))
    }

    fn ensure_pin(&self, pin: u32) -> Result<(), SignalError> {
        if !self.opened {
            return Err(SignalError::NotOpen);
        }
        if pin != self.pin {
            return Err(SignalError::Unavailable(format!(
                "pin {} is not managed by this source (configured pin {})",
                pin, self.pin
            )));
        }
        Ok(())
    }
}

impl SignalSource for HardwareSource {
    fn open(&mut self) -> Result<(), SignalError> {
        if self.opened {
            return Ok(());
        }

        if !self.root.is_dir() {
            return Err(SignalError::Unavailable(format!(
                "GPIO sysfs root {} not found",
                self.root.display()
            )));
        }

        let pin_dir = self.pin_dir(self.pin);
        if !pin_dir.exists() {
            fs::write(self.root.join("export"), self.pin.to_string())?;
            if !pin_dir.exists() {
                return Err(SignalError::Unavailable(format!(
                    "gpio{} did not appear after export",
                    self.pin
                )));
            }
            self.exported_by_us = true;
        }

        self.opened = true;
        log::info!("🔌 Opened GPIO pin {} at {}", self.pin, pin_dir.display());
        Ok(())
    }

    fn set_direction(&mut self, pin: u32, direction: PinDirection) -> Result<(), SignalError> {
        self.ensure_pin(pin)?;
        fs::write(self.pin_dir(pin).join("direction"), direction.as_str())?;
        Ok(())
    }

    fn read_state(&mut self, pin: u32) -> Result<bool, SignalError> {
        self.ensure_pin(pin)?;
        let raw = fs::read_to_string(self.pin_dir(pin).join("value"))?;
        match raw.trim() {
            "0" => Ok(false),
            "1" => Ok(true),
            other => Err(SignalError::InvalidState(other.to_string())),
        }
    }

    fn close(&mut self) -> Result<(), SignalError> {
        if !self.opened {
            return Ok(());
        }
        self.opened = false;

        if self.exported_by_us {
            self.exported_by_us = false;
            fs::write(self.root.join("unexport"), self.pin.to_string())?;
        }

        log::info!("🔌 Released GPIO pin {}", self.pin);
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "GPIO"
    }
}

impl Drop for HardwareSource {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
