//! Background I/O loop
//!
//! Owns the transport for the lifetime of a session. Each iteration it reads
//! whatever bytes are waiting, forwards complete frames to the session, writes
//! at most one queued command and, when the link has been idle for too long,
//! re-sends "enable remote control" so the stimulator keeps accepting commands.

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use std::io::{ErrorKind, Read, Write};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, trace};

use super::codec::encode_command;
use super::extractor::FrameExtractor;
use super::stream::Transport;
use super::{Command, LinkConfig, ProtocolError};

/// Whether the loop should keep running after an iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Continue,
    /// The session hung up on one of the channels
    Stop,
}

pub(crate) struct CommLoop<T: Transport> {
    transport: T,
    extractor: FrameExtractor,
    outbound: Receiver<Vec<u8>>,
    inbound: Sender<Vec<u8>>,
    keepalive: Vec<u8>,
    poll_interval: Duration,
    keepalive_interval: Duration,
    last_activity: Instant,
}

impl<T: Transport + 'static> CommLoop<T> {
    pub(crate) fn new(
        transport: T,
        config: &LinkConfig,
        outbound: Receiver<Vec<u8>>,
        inbound: Sender<Vec<u8>>,
    ) -> Self {
        Self {
            transport,
            extractor: FrameExtractor::new(),
            outbound,
            inbound,
            keepalive: encode_command(Command::EnableRemoteControl.code(), None),
            poll_interval: config.poll_interval(),
            keepalive_interval: config.keepalive_interval(),
            last_activity: Instant::now(),
        }
    }

    /// Run the loop on a dedicated thread
    pub(crate) fn spawn(self) -> Result<JoinHandle<Result<(), ProtocolError>>, ProtocolError> {
        let handle = thread::Builder::new()
            .name("tmslink-comm".to_string())
            .spawn(move || self.run())?;
        Ok(handle)
    }

    /// Iterate until the session hangs up or the transport fails
    pub(crate) fn run(mut self) -> Result<(), ProtocolError> {
        let name = self.transport.name();
        debug!("Comm loop started on {}", name);
        loop {
            match self.step() {
                Ok(Flow::Continue) => thread::sleep(self.poll_interval),
                Ok(Flow::Stop) => {
                    debug!("Comm loop on {} finished", name);
                    return Ok(());
                }
                Err(e) => {
                    error!("Comm loop on {} stopped: {}", name, e);
                    return Err(e);
                }
            }
        }
    }

    /// One read / write / keepalive pass
    pub(crate) fn step(&mut self) -> Result<Flow, ProtocolError> {
        if self.pump_inbound()? == Flow::Stop {
            return Ok(Flow::Stop);
        }

        let now = Instant::now();
        match self.outbound.try_recv() {
            Ok(frame) => {
                self.write_frame(&frame)?;
                self.last_activity = now;
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => return Ok(Flow::Stop),
        }

        if now.duration_since(self.last_activity) > self.keepalive_interval {
            let keepalive = self.keepalive.clone();
            trace!("Link idle, sending keepalive");
            self.write_frame(&keepalive)?;
            self.last_activity = now;
        }

        Ok(Flow::Continue)
    }

    /// Read everything waiting on the transport and forward complete frames
    fn pump_inbound(&mut self) -> Result<Flow, ProtocolError> {
        let available = self.transport.bytes_to_read()? as usize;
        if available == 0 {
            return Ok(Flow::Continue);
        }

        let mut chunk = vec![0u8; available];
        let n = match self.transport.read(&mut chunk) {
            Ok(0) => return Err(ProtocolError::TransportClosed),
            Ok(n) => n,
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => 0,
            Err(e) => return Err(e.into()),
        };
        self.extractor.push(&chunk[..n]);

        while let Some(frame) = self.extractor.next_frame() {
            trace!("<- {:02X?}", frame);
            if self.inbound.send(frame).is_err() {
                return Ok(Flow::Stop);
            }
        }
        Ok(Flow::Continue)
    }

    fn write_frame(&mut self, frame: &[u8]) -> Result<(), ProtocolError> {
        trace!("-> {:02X?}", frame);
        self.transport.write_all(frame)?;
        Ok(())
    }
}
