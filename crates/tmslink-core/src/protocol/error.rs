//! Protocol errors

use thiserror::Error;

/// Error condition signalled by a response frame.
///
/// Produced by [`classify_error`](super::codec::classify_error); at most one
/// applies to any given frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseError {
    /// The stimulator did not recognize the command code
    UnrecognizedCommand,
    /// The command was recognized but its data was rejected
    InvalidData,
    /// The command conflicts with the current device settings
    SettingsConflict,
    /// The trailing checksum byte does not match the frame contents
    ChecksumMismatch {
        /// Checksum recomputed over the frame
        expected: u8,
        /// Checksum byte carried by the frame
        actual: u8,
    },
}

/// Errors that can occur during communication with the stimulator
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The stimulator did not recognize the command code
    #[error("Stimulator received an unrecognized command")]
    UnrecognizedCommand,

    #[error("Stimulator rejected the data for command {code:#04x}")]
    /// The stimulator rejected the command's data
    InvalidData {
        /// Command code
        code: u8,
    },

    #[error("Command {code:#04x} conflicts with the current stimulator settings")]
    /// The command conflicts with the current device settings
    SettingsConflict {
        /// Command code
        code: u8,
    },

    #[error("Checksum mismatch in response {frame:02X?}: expected {expected:#04x}, got {actual:#04x}")]
    /// A reply arrived with a corrupt checksum
    ChecksumMismatch {
        /// Checksum recomputed over the frame
        expected: u8,
        /// Checksum byte carried by the frame
        actual: u8,
        /// The complete reply frame
        frame: Vec<u8>,
    },

    #[error("No reply to command {code:#04x} within {timeout_ms}ms")]
    /// No reply to a command arrived in time
    NoReply {
        /// Command code
        code: u8,
        /// How long the request waited
        timeout_ms: u64,
    },

    #[error("Response to command {0:#04x} carries no status byte")]
    /// A reply expected to carry status had none
    MissingStatus(u8),

    #[error("Malformed response payload: {0}")]
    /// Reply data could not be decoded
    MalformedPayload(String),

    #[error("Value {value} out of range for {what} (allowed {min}..={max})")]
    /// A command argument is outside the range the unit accepts
    ValueOutOfRange {
        /// Name of the argument
        what: &'static str,
        /// Value given
        value: u32,
        /// Lowest accepted value
        min: u32,
        /// Highest accepted value
        max: u32,
    },

    #[error("Communication loop has stopped")]
    /// The comm loop has stopped, or the session was closed
    TransportClosed,

    #[error("Serial port error: {0}")]
    /// The serial port could not be opened or configured
    SerialError(String),

    #[error("No serial ports available, make sure the serial adapter is plugged in")]
    /// No serial ports exist on this machine
    NoPortsAvailable,

    #[error("Port '{port}' not found (available: {available:?})")]
    /// The requested port is not among the available ones
    PortNotFound {
        /// Requested port name
        port: String,
        /// Ports that do exist
        available: Vec<String>,
    },

    #[error("Invalid configuration: {0}")]
    /// Invalid or unreadable link settings
    Config(String),

    #[error("I/O error: {0}")]
    /// Transport I/O failure
    IoError(#[from] std::io::Error),
}

impl ProtocolError {
    /// Build the error for a classified response to `code`.
    pub fn from_response(err: ResponseError, code: u8, frame: &[u8]) -> Self {
        match err {
            ResponseError::UnrecognizedCommand => ProtocolError::UnrecognizedCommand,
            ResponseError::InvalidData => ProtocolError::InvalidData { code },
            ResponseError::SettingsConflict => ProtocolError::SettingsConflict { code },
            ResponseError::ChecksumMismatch { expected, actual } => {
                ProtocolError::ChecksumMismatch {
                    expected,
                    actual,
                    frame: frame.to_vec(),
                }
            }
        }
    }

    /// True when the device understood the command but refused it.
    ///
    /// Callers configuring optional settings treat these as expected outcomes.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            ProtocolError::InvalidData { .. } | ProtocolError::SettingsConflict { .. }
        )
    }
}
