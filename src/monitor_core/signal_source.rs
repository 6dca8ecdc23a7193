//! Signal source interface shared by the hardware and simulated backends

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinDirection {
    Input,
    Output,
}

impl PinDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            PinDirection::Input => "in",
            PinDirection::Output => "out",
        }
    }
}

#[derive(Debug)]
pub enum SignalError {
    Io(std::io::Error),
    NotOpen,
    Unavailable(String),
    InvalidState(String),
}

impl From<std::io::Error> for SignalError {
    fn from(err: std::io::Error) -> Self {
        SignalError::Io(err)
    }
}

impl std::fmt::Display for SignalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignalError::Io(e) => write!(f, "IO error: {}", e),
            SignalError::NotOpen => write!(f, "Signal source is not open"),
            SignalError::Unavailable(msg) => write!(f, "Signal source unavailable: {}", msg),
            SignalError::InvalidState(raw) => write!(f, "Invalid pin state: {:?}", raw),
        }
    }
}

impl std::error::Error for SignalError {}

/// Digital input capable of reporting one pin's state.
///
/// Lifecycle: `open` → `set_direction` → `read_state`* → `close`.
/// `close` must be safe to call more than once.
pub trait SignalSource: Send {
    fn open(&mut self) -> Result<(), SignalError>;

    fn set_direction(&mut self, pin: u32, direction: PinDirection) -> Result<(), SignalError>;

    /// Current state of `pin` (`true` = high)
    fn read_state(&mut self, pin: u32) -> Result<bool, SignalError>;

    fn close(&mut self) -> Result<(), SignalError>;

    /// Backend name for logging
    fn backend_type(&self) -> &'static str;

    fn is_simulated(&self) -> bool {
        false
    }
}
