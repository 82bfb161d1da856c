//! Protocol commands
//!
//! Defines the command registry of the Magstim serial protocol together with
//! the sentinel bytes and mode bits shared by every model.

use serde::{Deserialize, Serialize};

/// Data byte sent when a command carries no payload
pub const PAD_BYTE: u8 = 0x40;

/// First byte of a reply to a command the stimulator does not know
pub const UNRECOGNIZED_COMMAND: u8 = b'?';

/// Second byte of a reply whose command data was rejected
pub const INVALID_DATA: u8 = b'?';

/// Second byte of a reply whose command conflicts with the device settings
pub const SETTINGS_CONFLICT: u8 = b'S';

/// Software version query (reply has no status byte)
pub const GET_VERSION: u8 = 0x4E;

/// Undocumented system type query (reply has no status byte)
pub const GET_SYSTEM_TYPE: u8 = 0x4B;

/// Reply codes that carry no status byte after the echoed code
pub const NO_STATUS_CODES: [u8; 2] = [GET_VERSION, GET_SYSTEM_TYPE];

/// Bit that is always set in a base mode data byte
const MODE_BASE_BIT: u8 = 6;

/// Protocol commands for stimulator communication
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Command {
    /// Set power level of the primary coil ('@')
    SetPowerA,

    /// Set power level of the second BiStim pulse ('A')
    SetPowerB,

    /// Set BiStim paired-pulse interval ('C')
    SetPulseInterval,

    /// Set base mode: stopped, armed or trigger ('E')
    SetBaseMode,

    /// Read power A, power B and pulse interval ('J')
    GetParameters,

    /// Take remote control; doubles as the keepalive ('Q')
    EnableRemoteControl,

    /// Release remote control ('R')
    DisableRemoteControl,

    /// Pulse interval in 0.1 ms units ('Y')
    EnableHiResTime,

    /// Pulse interval in 1 ms units ('Z')
    DisableHiResTime,
}

impl Command {
    /// Every registered command
    pub const ALL: [Command; 9] = [
        Command::SetPowerA,
        Command::SetPowerB,
        Command::SetPulseInterval,
        Command::SetBaseMode,
        Command::GetParameters,
        Command::EnableRemoteControl,
        Command::DisableRemoteControl,
        Command::EnableHiResTime,
        Command::DisableHiResTime,
    ];

    /// Get the command byte
    pub fn code(&self) -> u8 {
        match self {
            Command::SetPowerA => 0x40,
            Command::SetPowerB => 0x41,
            Command::SetPulseInterval => 0x43,
            Command::SetBaseMode => 0x45,
            Command::GetParameters => 0x4A,
            Command::EnableRemoteControl => 0x51,
            Command::DisableRemoteControl => 0x52,
            Command::EnableHiResTime => 0x59,
            Command::DisableHiResTime => 0x5A,
        }
    }

    /// Look up a command by its byte
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|cmd| cmd.code() == code)
    }

    /// Length of a successful reply, checksum included
    pub fn response_len(&self) -> usize {
        match self {
            Command::GetParameters => 12,
            _ => 3,
        }
    }

    /// Width of the ASCII-digit data segment, if the command takes a number
    pub fn data_width(&self) -> Option<usize> {
        match self {
            Command::SetPowerA | Command::SetPowerB | Command::SetPulseInterval => Some(3),
            _ => None,
        }
    }
}

/// Expected successful-reply length for a raw reply code
pub fn expected_response_len(code: u8) -> Option<usize> {
    Command::from_code(code).map(|cmd| cmd.response_len())
}

/// Operating mode selected through [`Command::SetBaseMode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BaseMode {
    /// Disarmed
    Stopped,
    /// Armed and charging
    Armed,
    /// Discharge now
    Trigger,
}

impl BaseMode {
    fn bit(&self) -> u8 {
        match self {
            BaseMode::Stopped => 0,
            BaseMode::Armed => 1,
            BaseMode::Trigger => 3,
        }
    }

    /// Data byte for [`Command::SetBaseMode`]
    pub fn data_byte(&self) -> u8 {
        (1 << MODE_BASE_BIT) | (1 << self.bit())
    }
}
