//! Simulated signal source for running without hardware

use super::signal_source::{PinDirection, SignalError, SignalSource};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Pseudo-random pin with the same interface as the hardware source.
///
/// Each read flips the pin with `toggle_probability`. With `burst_probability`
/// a read instead starts a burst: the pin flips on each of the next
/// `burst_length` reads, which at normal poll rates forms a rapid sequence.
pub struct SimulatedSource {
    rng: StdRng,
    state: bool,
    toggle_probability: f64,
    burst_probability: f64,
    burst_length: u32,
    burst_remaining: u32,
    opened: bool,
}

impl SimulatedSource {
    pub fn new(
        toggle_probability: f64,
        burst_probability: f64,
        burst_length: u32,
        seed: Option<u64>,
    ) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            rng,
            state: false,
            toggle_probability: toggle_probability.clamp(0.0, 1.0),
            burst_probability: burst_probability.clamp(0.0, 1.0),
            burst_length,
            burst_remaining: 0,
            opened: false,
        }
    }

    fn next_state(&mut self) -> bool {
        if self.burst_remaining > 0 {
            self.burst_remaining -= 1;
            self.state = !self.state;
        } else if self.burst_length > 0 && self.rng.gen_bool(self.burst_probability) {
            log::debug!("Simulated burst of {} toggles", self.burst_length);
            self.burst_remaining = self.burst_length - 1;
            self.state = !self.state;
        } else if self.rng.gen_bool(self.toggle_probability) {
            self.state = !self.state;
        }
        self.state
    }
}

impl SignalSource for SimulatedSource {
    fn open(&mut self) -> Result<(), SignalError> {
        self.opened = true;
        log::info!(
            "🎲 Simulation mode (toggle p={}, burst p={}, burst length {})",
            self.toggle_probability,
            self.burst_probability,
            self.burst_length
        );
        Ok(())
    }

    fn set_direction(&mut self, _pin: u32, _direction: PinDirection) -> Result<(), SignalError> {
        if !self.opened {
            return Err(SignalError::NotOpen);
        }
        Ok(())
    }

    fn read_state(&mut self, _pin: u32) -> Result<bool, SignalError> {
        if !self.opened {
            return Err(SignalError::NotOpen);
        }
        Ok(self.next_state())
    }

    fn close(&mut self) -> Result<(), SignalError> {
        self.opened = false;
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "SIMULATED"
    }

    fn is_simulated(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_many(source: &mut SimulatedSource, n: usize) -> Vec<bool> {
        (0..n).map(|_| source.read_state(0).unwrap()).collect()
    }

    #[test]
    fn test_requires_open() {
        let mut source = SimulatedSource::new(0.5, 0.0, 0, Some(1));
        assert!(matches!(source.read_state(0), Err(SignalError::NotOpen)));
    }

    #[test]
    fn test_zero_probability_never_toggles() {
        let mut source = SimulatedSource::new(0.0, 0.0, 6, Some(7));
        source.open().unwrap();

        assert!(read_many(&mut source, 1000).iter().all(|s| !s));
    }

    #[test]
    fn test_certain_toggle_alternates() {
        let mut source = SimulatedSource::new(1.0, 0.0, 0, Some(7));
        source.open().unwrap();

        let states = read_many(&mut source, 4);
        assert_eq!(states, vec![true, false, true, false]);
    }

    #[test]
    fn test_burst_flips_every_read() {
        let mut source = SimulatedSource::new(0.0, 1.0, 6, Some(3));
        source.open().unwrap();

        let states = read_many(&mut source, 6);
        for pair in states.windows(2) {
            assert_ne!(pair[0], pair[1]);
        }
    }

    #[test]
    fn test_seed_is_deterministic() {
        let mut a = SimulatedSource::new(0.3, 0.01, 6, Some(42));
        let mut b = SimulatedSource::new(0.3, 0.01, 6, Some(42));
        a.open().unwrap();
        b.open().unwrap();

        assert_eq!(read_many(&mut a, 500), read_many(&mut b, 500));
    }
}
