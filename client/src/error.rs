//! Error types for the aspserial host tool

use std::fmt;
use std::io;

use aspserial_shared::{Command, LineConfig, LineEcho};

/// Failure of the USB control pipe itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// No programmer with the expected ids is attached
    NotFound { vid: u16, pid: u16 },
    /// The device was found but could not be opened or claimed
    Open(String),
    /// A control transfer failed or timed out
    Transfer { command: Command, reason: String },
    /// The device answered with fewer bytes than the request needs
    ShortResponse {
        command: Command,
        expected: usize,
        received: usize,
    },
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::NotFound { vid, pid } => {
                write!(f, "device not found (VID={:#06x}, PID={:#06x})", vid, pid)
            }
            TransportError::Open(msg) => write!(f, "cannot open device: {}", msg),
            TransportError::Transfer { command, reason } => {
                write!(f, "{:?} transfer failed: {}", command, reason)
            }
            TransportError::ShortResponse {
                command,
                expected,
                received,
            } => write!(
                f,
                "{:?} answered {} bytes, expected {}",
                command, received, expected
            ),
        }
    }
}

impl std::error::Error for TransportError {}

#[derive(Debug)]
pub enum ClientError {
    Transport(TransportError),
    /// The echo does not match what was requested
    ConfigRejected {
        requested: LineConfig,
        echoed: LineEcho,
    },
    /// Reading the input source or writing the output sink failed
    Io(io::Error),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Transport(e) => write!(f, "USB transmission problem: {}", e),
            ClientError::ConfigRejected { requested, echoed } => write!(
                f,
                "serial line configuration rejected: requested baud={:#04x} bits={} parity={}, \
                 device applied baud={:#04x} bits={} parity={}",
                requested.baud.selector(),
                requested.data_bits.selector(),
                requested.parity.selector(),
                echoed.baud,
                echoed.bits,
                echoed.parity
            ),
            ClientError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<TransportError> for ClientError {
    fn from(e: TransportError) -> Self {
        ClientError::Transport(e)
    }
}

impl From<io::Error> for ClientError {
    fn from(e: io::Error) -> Self {
        ClientError::Io(e)
    }
}
