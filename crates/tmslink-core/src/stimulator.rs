//! Stimulator control
//!
//! Model-independent operations available on Magstim 200, BiStim and Rapid
//! units, built on a [`Session`].

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::protocol::codec::{ascii_digits, parse_fixed_width_fields};
use crate::protocol::{
    validate_port, BaseMode, Command, LinkConfig, ProtocolError, Session, StatusFlags, Transport,
};

/// Highest power level, in percent of maximum output
pub const MAX_POWER: u32 = 100;

/// Highest BiStim paired-pulse interval
pub const MAX_PULSE_INTERVAL: u32 = 999;

/// BiStim paired-pulse interval used when simultaneous discharge is off
const PAIRED_PULSE_INTERVAL: u32 = 10;

/// Width of each field in the parameters payload
const PARAMETER_DIGITS: usize = 3;

/// Connection settings for a stimulator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StimulatorConfig {
    /// Serial link settings
    #[serde(flatten)]
    pub link: LinkConfig,
    /// On a BiStim, discharge both units together instead of paired pulses.
    /// No effect on other models.
    pub simultaneous_discharge: bool,
}

impl Default for StimulatorConfig {
    fn default() -> Self {
        Self {
            link: LinkConfig::default(),
            simultaneous_discharge: true,
        }
    }
}

/// Power and timing parameters reported by the stimulator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Primary coil power level (0-100)
    pub power_a: u32,
    /// BiStim second pulse power level (0-100)
    pub power_b: u32,
    /// BiStim paired-pulse interval
    pub pulse_interval: u32,
}

/// A stimulator under remote control
pub struct Stimulator {
    session: Session,
}

impl Stimulator {
    /// Open the configured serial port and take remote control of the unit
    pub fn connect(config: &StimulatorConfig) -> Result<Self, ProtocolError> {
        validate_port(&config.link.port_name)?;
        let session = Session::open(&config.link)?;
        Self::initialize(session, config.simultaneous_discharge)
    }

    /// Take remote control of a unit reachable over `transport`
    pub fn with_transport<T: Transport + 'static>(
        transport: T,
        config: &StimulatorConfig,
    ) -> Result<Self, ProtocolError> {
        let session = Session::start(transport, &config.link)?;
        Self::initialize(session, config.simultaneous_discharge)
    }

    fn initialize(session: Session, simultaneous_discharge: bool) -> Result<Self, ProtocolError> {
        let mut stim = Self { session };
        let status = stim.enable_remote_control()?;
        info!("Remote control established, status {:?}", status);

        // Only a BiStim accepts these; other models reject the data
        let bistim = if simultaneous_discharge {
            stim.set_pulse_interval(0)
        } else {
            stim.set_pulse_interval(PAIRED_PULSE_INTERVAL)
                .and_then(|_| stim.set_power_b(0))
        };
        match bistim {
            Ok(_) => debug!("BiStim pulse mode configured"),
            Err(e) if e.is_rejection() => debug!("Skipping BiStim pulse mode: {}", e),
            Err(e) => return Err(e),
        }
        Ok(stim)
    }

    /// Request remote control of the unit.
    ///
    /// Replies already queued are discarded first: keepalives use the same
    /// command and their echoes must not be mistaken for this reply.
    pub fn enable_remote_control(&mut self) -> Result<StatusFlags, ProtocolError> {
        self.session.drain_inbound();
        self.session.communicate(Command::EnableRemoteControl, None)
    }

    /// Hand control back to the front panel
    pub fn disable_remote_control(&mut self) -> Result<StatusFlags, ProtocolError> {
        self.session.communicate(Command::DisableRemoteControl, None)
    }

    /// Read power levels and pulse interval
    pub fn settings(&mut self) -> Result<Settings, ProtocolError> {
        let response = self.session.request(Command::GetParameters, None)?;
        match parse_fixed_width_fields(response.data(), PARAMETER_DIGITS)?.as_slice() {
            &[power_a, power_b, pulse_interval] => Ok(Settings {
                power_a,
                power_b,
                pulse_interval,
            }),
            fields => Err(ProtocolError::MalformedPayload(format!(
                "expected 3 parameter fields, got {}",
                fields.len()
            ))),
        }
    }

    /// Current power level of the primary coil
    pub fn power(&mut self) -> Result<u32, ProtocolError> {
        Ok(self.settings()?.power_a)
    }

    /// Set the power level of the primary coil.
    ///
    /// The unit needs time to charge or discharge to the new level; poll
    /// [`Stimulator::is_ready`] after arming before firing.
    pub fn set_power(&mut self, level: u32) -> Result<StatusFlags, ProtocolError> {
        check_range("power level", level, MAX_POWER)?;
        self.set_numeric(Command::SetPowerA, level)
    }

    /// Arm the stimulator. It disarms itself after about a minute without firing.
    pub fn arm(&mut self) -> Result<StatusFlags, ProtocolError> {
        self.set_mode(BaseMode::Armed)
    }

    /// Return to standby, discharging the unit
    pub fn disarm(&mut self) -> Result<StatusFlags, ProtocolError> {
        self.set_mode(BaseMode::Stopped)
    }

    /// Fire over the serial link.
    ///
    /// Serial triggering has a latency of several milliseconds that varies
    /// from pulse to pulse; use a TTL trigger where timing matters.
    pub fn fire(&mut self) -> Result<StatusFlags, ProtocolError> {
        self.set_mode(BaseMode::Trigger)
    }

    /// Whether the unit is armed, including armed and ready
    pub fn is_armed(&mut self) -> Result<bool, ProtocolError> {
        // The armed bit clears once the unit reports ready
        let status = self.enable_remote_control()?;
        Ok(status.armed() || status.ready())
    }

    /// Whether the unit is ready to fire
    pub fn is_ready(&mut self) -> Result<bool, ProtocolError> {
        Ok(self.enable_remote_control()?.ready())
    }

    /// Most recent status seen on the link, without sending anything
    pub fn status(&mut self) -> Option<StatusFlags> {
        self.session.drain_inbound();
        self.session.status()
    }

    /// Underlying session
    pub fn session(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Release remote control and stop the comm loop
    pub fn disconnect(mut self) -> Result<(), ProtocolError> {
        let released = self.disable_remote_control();
        let closed = self.session.close();
        released?;
        closed
    }

    fn set_pulse_interval(&mut self, interval: u32) -> Result<StatusFlags, ProtocolError> {
        check_range("pulse interval", interval, MAX_PULSE_INTERVAL)?;
        self.set_numeric(Command::SetPulseInterval, interval)
    }

    fn set_power_b(&mut self, level: u32) -> Result<StatusFlags, ProtocolError> {
        check_range("power level", level, MAX_POWER)?;
        self.set_numeric(Command::SetPowerB, level)
    }

    fn set_numeric(&mut self, command: Command, value: u32) -> Result<StatusFlags, ProtocolError> {
        let width = command.data_width().unwrap_or(PARAMETER_DIGITS);
        let data = ascii_digits(value, width)?;
        self.session.communicate(command, Some(&data))
    }

    fn set_mode(&mut self, mode: BaseMode) -> Result<StatusFlags, ProtocolError> {
        self.session.communicate(Command::SetBaseMode, Some(&[mode.data_byte()]))
    }
}

fn check_range(what: &'static str, value: u32, max: u32) -> Result<(), ProtocolError> {
    if value > max {
        return Err(ProtocolError::ValueOutOfRange {
            what,
            value,
            min: 0,
            max,
        });
    }
    Ok(())
}
