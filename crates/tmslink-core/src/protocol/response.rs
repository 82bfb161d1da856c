//! Parsed responses and the status bitfield

use serde::{Deserialize, Serialize};
use std::fmt;

use super::codec::classify_error;
use super::commands::NO_STATUS_CODES;
use super::error::ResponseError;

/// A reply frame received from the stimulator.
///
/// Owns the raw frame only; every field is read from it on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    raw: Vec<u8>,
    error: Option<ResponseError>,
}

impl Response {
    /// Wrap a complete frame as produced by the frame extractor
    pub fn from_frame(raw: Vec<u8>) -> Self {
        let error = classify_error(&raw);
        Self { raw, error }
    }

    /// Echoed command code (`?` for unrecognized-command frames)
    pub fn code(&self) -> u8 {
        self.raw.first().copied().unwrap_or_default()
    }

    /// Raw status byte, absent for error frames and status-less replies
    pub fn status_byte(&self) -> Option<u8> {
        if self.error.is_some() || NO_STATUS_CODES.contains(&self.code()) {
            return None;
        }
        self.raw.get(1).copied()
    }

    /// Decoded status, see [`Response::status_byte`]
    pub fn status(&self) -> Option<StatusFlags> {
        self.status_byte().map(StatusFlags::from)
    }

    /// Payload between the status byte and the checksum
    pub fn data(&self) -> &[u8] {
        if self.raw.len() < 3 {
            return &[];
        }
        &self.raw[2..self.raw.len() - 1]
    }

    /// Error classification of the frame
    pub fn error(&self) -> Option<ResponseError> {
        self.error
    }

    /// Whether this frame answers a command with the given code.
    ///
    /// Unrecognized-command frames do not echo the code, so they answer
    /// whatever command is outstanding.
    pub fn answers(&self, code: u8) -> bool {
        self.code() == code || self.error == Some(ResponseError::UnrecognizedCommand)
    }

    /// The complete frame as received
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }
}

/// Instrument status bits reported in every successful reply
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct StatusFlags(u8);

impl StatusFlags {
    /// Bit index: standby
    pub const STANDBY: u8 = 0;
    /// Bit index: armed
    pub const ARMED: u8 = 1;
    /// Bit index: ready to fire
    pub const READY: u8 = 2;
    /// Bit index: coil connected
    pub const COIL_PRESENT: u8 = 3;
    /// Bit index: coil needs replacing
    pub const REPLACE_COIL: u8 = 4;
    /// Bit index: error present
    pub const ERROR: u8 = 5;
    /// Bit index: error is fatal
    pub const FATAL_ERROR: u8 = 6;
    /// Bit index: under remote control
    pub const REMOTE_CONTROL: u8 = 7;

    /// Wrap a raw status byte
    pub const fn new(bits: u8) -> Self {
        Self(bits)
    }

    /// Raw status byte
    pub const fn bits(&self) -> u8 {
        self.0
    }

    fn bit(&self, bit: u8) -> bool {
        self.0 & (1 << bit) != 0
    }

    /// Disarmed and idle
    pub fn standby(&self) -> bool {
        self.bit(Self::STANDBY)
    }

    /// Armed and still charging. Cleared once ready, see [`StatusFlags::ready`]
    pub fn armed(&self) -> bool {
        self.bit(Self::ARMED)
    }

    /// Charged to the set power and able to fire
    pub fn ready(&self) -> bool {
        self.bit(Self::READY)
    }

    /// A coil is connected
    pub fn coil_present(&self) -> bool {
        self.bit(Self::COIL_PRESENT)
    }

    /// The unit asks for the coil to be replaced
    pub fn replace_coil(&self) -> bool {
        self.bit(Self::REPLACE_COIL)
    }

    /// An error code is pending on the unit
    pub fn error(&self) -> bool {
        self.bit(Self::ERROR)
    }

    /// The pending error is fatal
    pub fn fatal_error(&self) -> bool {
        self.bit(Self::FATAL_ERROR)
    }

    /// The unit accepts commands from this link
    pub fn remote_control(&self) -> bool {
        self.bit(Self::REMOTE_CONTROL)
    }

    /// Named fields in display order
    pub fn fields(&self) -> [(&'static str, bool); 8] {
        [
            ("Standby", self.standby()),
            ("Armed", self.armed()),
            ("Ready", self.ready()),
            ("Coil Present", self.coil_present()),
            ("Replace Coil", self.replace_coil()),
            ("Error", self.error()),
            ("Fatal Error", self.fatal_error()),
            ("Remote Control", self.remote_control()),
        ]
    }
}

impl From<u8> for StatusFlags {
    fn from(bits: u8) -> Self {
        Self(bits)
    }
}

impl fmt::Debug for StatusFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StatusFlags({:08b})", self.0)
    }
}
