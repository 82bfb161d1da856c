//! Session management
//!
//! Turns the asynchronous frame streams of the comm loop into synchronous
//! request/reply calls and tracks the most recent device status.

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, error, trace};

use super::{
    codec::encode_command,
    comm_loop::CommLoop,
    serial::open_port,
    stream::{SerialChannel, Transport},
    traffic::{Direction, TrafficLog},
    Command, LinkConfig, ProtocolError, Response, StatusFlags,
};

/// A live link to one stimulator.
///
/// Dropping the session stops the comm loop and releases the transport.
pub struct Session {
    /// Commands for the comm loop; `None` once closed
    outbound: Option<Sender<Vec<u8>>>,
    /// Frames extracted by the comm loop, in arrival order
    inbound: Receiver<Vec<u8>>,
    worker: Option<JoinHandle<Result<(), ProtocolError>>>,
    /// Status from the latest successful reply
    status: Option<StatusFlags>,
    traffic: TrafficLog,
    reply_timeout: Duration,
}

impl Session {
    /// Open the configured serial port and start the comm loop on it
    pub fn open(config: &LinkConfig) -> Result<Self, ProtocolError> {
        let port = open_port(config)?;
        Self::start(SerialChannel::new(port), config)
    }

    /// Start the comm loop on an already open transport
    pub fn start<T: Transport + 'static>(
        transport: T,
        config: &LinkConfig,
    ) -> Result<Self, ProtocolError> {
        config.validate()?;
        let (outbound_tx, outbound_rx) = unbounded();
        let (inbound_tx, inbound_rx) = unbounded();

        debug!("Starting session on {}", transport.name());
        let worker = CommLoop::new(transport, config, outbound_rx, inbound_tx).spawn()?;

        Ok(Self {
            outbound: Some(outbound_tx),
            inbound: inbound_rx,
            worker: Some(worker),
            status: None,
            traffic: TrafficLog::new(config.history_len),
            reply_timeout: config.reply_timeout(),
        })
    }

    /// Queue a command for transmission. Does not wait for the reply.
    pub fn send(&mut self, command: Command, data: Option<&[u8]>) -> Result<(), ProtocolError> {
        let frame = encode_command(command.code(), data);
        trace!("Queueing {:?}: {:02X?}", command, frame);
        self.traffic.record(Direction::Sent, &frame);

        let sent = match &self.outbound {
            Some(outbound) => outbound.send(frame).is_ok(),
            None => false,
        };
        if !sent {
            return Err(self.loop_failure());
        }
        Ok(())
    }

    /// Take every frame received so far, oldest first
    pub fn drain_inbound(&mut self) -> Vec<Response> {
        let frames: Vec<Vec<u8>> = self.inbound.try_iter().collect();
        frames.into_iter().map(|frame| self.accept(frame)).collect()
    }

    /// Wait for the reply to the command with the given code.
    ///
    /// Replies to other commands (typically keepalive echoes) are consumed
    /// and skipped. Frames behind the match stay queued.
    ///
    /// A timeout too large to form a deadline (e.g. [`Duration::MAX`]) waits
    /// without one.
    pub fn wait_for_reply(
        &mut self,
        code: u8,
        timeout: Duration,
    ) -> Result<Response, ProtocolError> {
        let deadline = Instant::now().checked_add(timeout);
        loop {
            let received = match deadline {
                Some(deadline) => self.inbound.recv_deadline(deadline),
                None => self.inbound.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };
            match received {
                Ok(frame) => {
                    let response = self.accept(frame);
                    if response.answers(code) {
                        return Ok(response);
                    }
                    trace!(
                        "Skipping reply {:02X?} while waiting for {:#04x}",
                        response.raw(),
                        code
                    );
                }
                Err(RecvTimeoutError::Timeout) => {
                    return Err(ProtocolError::NoReply {
                        code,
                        timeout_ms: timeout.as_millis() as u64,
                    })
                }
                Err(RecvTimeoutError::Disconnected) => return Err(self.loop_failure()),
            }
        }
    }

    /// Send a command and return its reply, failing on any error condition
    pub fn request(
        &mut self,
        command: Command,
        data: Option<&[u8]>,
    ) -> Result<Response, ProtocolError> {
        self.send(command, data)?;
        let result = self
            .wait_for_reply(command.code(), self.reply_timeout)
            .and_then(|response| match response.error() {
                Some(err) => Err(ProtocolError::from_response(
                    err,
                    command.code(),
                    response.raw(),
                )),
                None => Ok(response),
            });

        if let Err(e) = &result {
            error!("{:?} failed: {}\n{}", command, e, self.traffic.report(self.status));
        }
        result
    }

    /// Send a command and return the status carried by its reply
    pub fn communicate(
        &mut self,
        command: Command,
        data: Option<&[u8]>,
    ) -> Result<StatusFlags, ProtocolError> {
        let response = self.request(command, data)?;
        response
            .status()
            .ok_or(ProtocolError::MissingStatus(response.code()))
    }

    /// Status from the most recent successful reply
    pub fn status(&self) -> Option<StatusFlags> {
        self.status
    }

    /// Recent frames sent and received
    pub fn traffic(&self) -> &TrafficLog {
        &self.traffic
    }

    /// Whether the comm loop is still running
    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|worker| !worker.is_finished())
    }

    /// Stop the comm loop and report how it ended
    pub fn close(mut self) -> Result<(), ProtocolError> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<(), ProtocolError> {
        self.outbound = None;
        self.status = None;
        match self.worker.take() {
            Some(worker) => worker.join().unwrap_or(Err(ProtocolError::TransportClosed)),
            None => Ok(()),
        }
    }

    fn accept(&mut self, frame: Vec<u8>) -> Response {
        self.traffic.record(Direction::Received, &frame);
        let response = Response::from_frame(frame);
        if let Some(status) = response.status() {
            self.status = Some(status);
        }
        response
    }

    /// The comm loop hung up: collect the error it stopped with
    fn loop_failure(&mut self) -> ProtocolError {
        match self.worker.take().map(|worker| worker.join()) {
            Some(Ok(Err(e))) => e,
            _ => ProtocolError::TransportClosed,
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}
