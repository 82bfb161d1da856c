//! Serial Protocol Communication
//!
//! Implements the Magstim remote-control protocol: checksummed command
//! frames, length-inferred reply frames, a background comm loop with
//! keepalive, and request/reply correlation on top of it.

pub mod codec;
mod comm_loop;
pub mod commands;
mod config;
mod error;
pub mod extractor;
mod response;
pub mod serial;
mod session;
pub mod stream;
pub mod traffic;

pub use commands::{BaseMode, Command};
pub use config::LinkConfig;
pub use error::{ProtocolError, ResponseError};
pub use extractor::FrameExtractor;
pub use response::{Response, StatusFlags};
pub use serial::{list_ports, open_port, validate_port, PortInfo};
pub use session::Session;
pub use stream::{SerialChannel, Transport};
pub use traffic::{Direction, TrafficEntry, TrafficLog};

/// Default baud rate of the stimulator serial port
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Default time a request waits for its reply, in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;

/// Default serial write timeout in milliseconds
pub const DEFAULT_WRITE_TIMEOUT_MS: u64 = 500;

/// Default comm loop period in milliseconds
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Default idle time before a keepalive, in milliseconds.
/// The stimulator drops remote control when the link stays silent.
pub const DEFAULT_KEEPALIVE_INTERVAL_MS: u64 = 500;

/// Default number of frames kept in the traffic history
pub const DEFAULT_HISTORY_LEN: usize = 16;
