//! # TMSLink Core Library
//!
//! Remote control of Magstim TMS stimulators over a serial link.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - Command framing and checksum validation
//! - Reply frame extraction from a fragmented byte stream
//! - A background comm loop that keeps remote control alive
//! - Request/reply correlation with a typed error taxonomy
//! - A model-independent stimulator API
//!
//! ## Example
//!
//! ```rust,ignore
//! use tmslink_core::{Stimulator, StimulatorConfig, LinkConfig};
//!
//! let config = StimulatorConfig {
//!     link: LinkConfig::for_port("/dev/ttyUSB0"),
//!     ..Default::default()
//! };
//! let mut stim = Stimulator::connect(&config)?;
//! stim.set_power(40)?;
//! stim.arm()?;
//! while !stim.is_ready()? {}
//! stim.fire()?;
//! ```

pub mod protocol;
pub mod stimulator;

pub use protocol::{
    Command, LinkConfig, ProtocolError, Response, ResponseError, Session, StatusFlags,
};
pub use stimulator::{Settings, Stimulator, StimulatorConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
