//! Simulated stimulator used as a transport in integration tests

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex};

use tmslink_core::protocol::codec::{checksum, encode_command};
use tmslink_core::protocol::Transport;
use tmslink_core::LinkConfig;

/// Commands whose frames carry three data digits
const NUMERIC_CODES: [u8; 3] = [b'@', b'A', b'C'];

pub struct DeviceState {
    /// Bytes waiting for the host
    pub to_host: VecDeque<u8>,
    /// Complete frames written by the host
    pub received: Vec<Vec<u8>>,
    partial: Vec<u8>,
    pub status: u8,
    pub power_a: u32,
    pub power_b: u32,
    pub pulse_interval: u32,
    /// Reply with this sentinel in the second byte instead of executing
    pub reject: HashMap<u8, u8>,
    /// Reply `?` to these codes
    pub unrecognized: HashSet<u8>,
    /// Never reply to these codes
    pub silent: HashSet<u8>,
    /// Bytes sent ahead of the next reply
    pub unsolicited: Vec<u8>,
    /// Flip the checksum of the next reply
    pub corrupt_next: bool,
    pub fail_on_send: bool,
    /// Fail the next poll for pending bytes, as an unplugged adapter does
    pub fail_on_read: bool,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            to_host: VecDeque::new(),
            received: Vec::new(),
            partial: Vec::new(),
            // standby + coil present
            status: 0x09,
            power_a: 30,
            power_b: 0,
            pulse_interval: 0,
            reject: HashMap::new(),
            unrecognized: HashSet::new(),
            silent: HashSet::new(),
            unsolicited: Vec::new(),
            corrupt_next: false,
            fail_on_send: false,
            fail_on_read: false,
        }
    }
}

impl DeviceState {
    fn handle(&mut self, frame: &[u8]) {
        let code = frame[0];
        let data = &frame[1..frame.len() - 1];
        self.received.push(frame.to_vec());

        if self.silent.contains(&code) {
            return;
        }
        let reply = if self.unrecognized.contains(&code) {
            vec![b'?']
        } else if let Some(&sentinel) = self.reject.get(&code) {
            encode_command(code, Some(&[sentinel]))
        } else {
            self.execute(code, data)
        };

        let mut reply = reply;
        if self.corrupt_next {
            self.corrupt_next = false;
            if let Some(last) = reply.last_mut() {
                *last ^= 0xFF;
            }
        }

        let unsolicited = std::mem::take(&mut self.unsolicited);
        self.to_host.extend(unsolicited);
        self.to_host.extend(reply);
    }

    fn execute(&mut self, code: u8, data: &[u8]) -> Vec<u8> {
        let digits = || -> u32 {
            std::str::from_utf8(data)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_default()
        };
        match code {
            b'Q' => {
                self.status |= 0x80;
                // Charging completes between polls
                if self.status & 0x02 != 0 {
                    self.status = (self.status & !0x02) | 0x04;
                }
            }
            b'R' => self.status &= !0x80,
            b'@' => self.power_a = digits(),
            b'A' => self.power_b = digits(),
            b'C' => self.pulse_interval = digits(),
            b'E' => match data.first() {
                Some(b'A') => self.status = (self.status & !0x07) | 0x01,
                Some(b'B') => self.status = (self.status & !0x07) | 0x02,
                _ => {}
            },
            b'J' => {
                let payload = format!(
                    "{:03}{:03}{:03}",
                    self.power_a, self.power_b, self.pulse_interval
                );
                let mut body = vec![self.status];
                body.extend_from_slice(payload.as_bytes());
                return encode_command(code, Some(&body));
            }
            _ => return vec![b'?'],
        }
        encode_command(code, Some(&[self.status]))
    }
}

/// Cloneable handle: one clone goes to the session, the test keeps another
#[derive(Clone, Default)]
pub struct SimulatedStimulator(pub Arc<Mutex<DeviceState>>);

impl SimulatedStimulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut DeviceState) -> R) -> R {
        f(&mut self.0.lock().unwrap())
    }

    pub fn received(&self) -> Vec<Vec<u8>> {
        self.with(|d| d.received.clone())
    }

    /// Frames received other than keepalives
    pub fn commands(&self) -> Vec<Vec<u8>> {
        self.received()
            .into_iter()
            .filter(|f| f.as_slice() != b"Q@n")
            .collect()
    }
}

impl Read for SimulatedStimulator {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.0.lock().unwrap();
        let n = buf.len().min(state.to_host.len());
        for (dst, src) in buf.iter_mut().zip(state.to_host.drain(..n)) {
            *dst = src;
        }
        Ok(n)
    }
}

impl Write for SimulatedStimulator {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.0.lock().unwrap();
        if state.fail_on_send {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "Serial write failed"));
        }
        state.partial.extend_from_slice(buf);
        loop {
            let Some(&code) = state.partial.first() else {
                break;
            };
            let len = if NUMERIC_CODES.contains(&code) { 5 } else { 3 };
            if state.partial.len() < len {
                break;
            }
            let frame: Vec<u8> = state.partial.drain(..len).collect();
            assert_eq!(
                checksum(&frame[..len - 1]),
                frame[len - 1],
                "host sent a bad checksum"
            );
            state.handle(&frame);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Transport for SimulatedStimulator {
    fn bytes_to_read(&mut self) -> io::Result<u32> {
        let state = self.0.lock().unwrap();
        if state.fail_on_read {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "Serial read failed"));
        }
        Ok(state.to_host.len() as u32)
    }

    fn name(&self) -> String {
        "simulated".to_string()
    }
}

/// Fast link settings for tests
pub fn test_config() -> LinkConfig {
    LinkConfig {
        port_name: "simulated".to_string(),
        poll_interval_ms: 2,
        keepalive_interval_ms: 40,
        reply_timeout_ms: 500,
        ..LinkConfig::default()
    }
}

/// Test settings without spontaneous keepalives
pub fn quiet_config() -> LinkConfig {
    LinkConfig {
        keepalive_interval_ms: 60_000,
        ..test_config()
    }
}
