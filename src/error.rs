/// Errors returned by the capture core.
///
/// Everything on the operator path returns one of these; nothing on the
/// frame path unwinds.
use core::fmt;

/// Hardware step that failed inside a radio operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwOp {
    SetChannel,
    SetPromiscuous,
    RegisterCallback,
    UnregisterCallback,
}

impl HwOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            HwOp::SetChannel => "set_channel",
            HwOp::SetPromiscuous => "set_promiscuous",
            HwOp::RegisterCallback => "register_callback",
            HwOp::UnregisterCallback => "unregister_callback",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Requested channel outside 1..=13. No state was changed.
    InvalidChannel,
    /// `start` while a capture is already listening.
    AlreadyRunning,
    /// `stop` while no capture is listening.
    NotRunning,
    /// The radio driver rejected a call.
    HardwareFailure(HwOp),
    /// Target address or frame type text could not be parsed.
    InvalidTarget,
    /// Command line was not a recognised NDJSON command.
    InvalidCommand,
}

impl Error {
    /// Stable code used in `error` messages on the wire.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidChannel => "invalid_channel",
            Error::AlreadyRunning => "already_running",
            Error::NotRunning => "not_running",
            Error::HardwareFailure(_) => "hardware_failure",
            Error::InvalidTarget => "invalid_target",
            Error::InvalidCommand => "invalid_command",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidChannel => write!(f, "channel must be between 1 and 13"),
            Error::AlreadyRunning => write!(f, "capture is already running"),
            Error::NotRunning => write!(f, "capture is not running"),
            Error::HardwareFailure(op) => write!(f, "radio driver failed during {}", op.as_str()),
            Error::InvalidTarget => write!(f, "invalid target address or frame type"),
            Error::InvalidCommand => write!(f, "invalid command"),
        }
    }
}

pub type Result<T> = core::result::Result<T, Error>;
