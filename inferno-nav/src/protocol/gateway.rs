//! Protocol gateway: the single console session.
//!
//! Each loop iteration flushes the outbound queue, then waits a bounded time
//! for console input and dispatches whatever arrived. The loop ends on a
//! quit command, when the shared running flag is cleared, or on a socket
//! fault.
//!
//! Tokens split across two reads are reassembled: trailing text without
//! whitespace is held back until more input arrives or the next read times
//! out.

use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::dispatcher::{CommandDispatcher, SessionFlow};
use super::message::OutboundQueue;
use crate::config::NetworkConfig;
use crate::error::{Error, Result};

/// Gateway state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GatewayState {
    Running,
    Stopped,
}

pub struct ProtocolGateway {
    stream: TcpStream,
    outbound: OutboundQueue,
    dispatcher: CommandDispatcher,
    running: Arc<AtomicBool>,
    state: GatewayState,
    buffer: Vec<u8>,
    /// Incomplete trailing token from the previous read
    carry: String,
}

impl ProtocolGateway {
    /// Put an accepted socket into blocking mode with the bounded read wait.
    /// Borrows the stream so the caller still owns it if this fails.
    pub fn configure(stream: &TcpStream, config: &NetworkConfig) -> Result<()> {
        stream.set_nonblocking(false)?;
        stream.set_read_timeout(Some(config.poll_interval()))?;
        stream.set_nodelay(true)?;
        Ok(())
    }

    /// Wrap a stream already prepared by [`Self::configure`].
    pub fn new(
        stream: TcpStream,
        outbound: OutboundQueue,
        dispatcher: CommandDispatcher,
        running: Arc<AtomicBool>,
        config: &NetworkConfig,
    ) -> Self {
        Self {
            stream,
            outbound,
            dispatcher,
            running,
            state: GatewayState::Running,
            buffer: vec![0; config.recv_buffer_size.max(1)],
            carry: String::new(),
        }
    }

    pub fn state(&self) -> GatewayState {
        self.state
    }

    /// Run until quit, interrupt or session fault.
    pub fn run(&mut self) -> Result<()> {
        log::info!("Session started with {:?}", self.stream.peer_addr().ok());

        while self.state == GatewayState::Running {
            if !self.running.load(Ordering::Relaxed) {
                log::info!("Running flag cleared, ending session");
                self.state = GatewayState::Stopped;
                break;
            }

            if let Err(e) = self.step() {
                self.state = GatewayState::Stopped;
                if matches!(e, Error::Disconnected) {
                    log::info!("Client disconnected");
                } else {
                    log::error!("Session fault: {}", e);
                }
                return Err(e);
            }
        }

        // Deliver whatever the final commands produced
        if let Err(e) = self.flush() {
            log::debug!("Final flush failed: {}", e);
        }
        log::info!("Session ended");
        Ok(())
    }

    /// One loop iteration.
    fn step(&mut self) -> Result<()> {
        self.flush()?;

        let input = match self.read()? {
            Some(chunk) => self.reassemble(&chunk),
            None => std::mem::take(&mut self.carry),
        };
        if input.trim().is_empty() {
            return Ok(());
        }

        log::debug!("Received: {:?}", input);
        if self.dispatcher.dispatch(&input) == SessionFlow::Quit {
            self.state = GatewayState::Stopped;
        }
        Ok(())
    }

    /// Send every queued message, one line each.
    fn flush(&mut self) -> Result<()> {
        let messages = self.outbound.drain();
        if messages.is_empty() {
            return Ok(());
        }
        for message in &messages {
            log::debug!("Sending: {}", message);
            writeln!(self.stream, "{}", message)?;
        }
        self.stream.flush()?;
        Ok(())
    }

    /// Bounded wait for input. `None` on timeout.
    fn read(&mut self) -> Result<Option<String>> {
        match self.stream.read(&mut self.buffer) {
            Ok(0) => Err(Error::Disconnected),
            Ok(n) => Ok(Some(String::from_utf8_lossy(&self.buffer[..n]).into_owned())),
            Err(e)
                if matches!(
                    e.kind(),
                    ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
                ) =>
            {
                Ok(None)
            }
            Err(e) if e.kind() == ErrorKind::ConnectionReset => Err(Error::Disconnected),
            Err(e) => Err(Error::Io(e)),
        }
    }

    /// Complete text ready for dispatch; keeps a trailing partial token.
    fn reassemble(&mut self, chunk: &str) -> String {
        self.carry.push_str(chunk);
        if self.carry.ends_with(char::is_whitespace) {
            return std::mem::take(&mut self.carry);
        }
        match self.carry.rfind(char::is_whitespace) {
            Some(idx) => {
                let partial = self.carry.split_off(idx);
                std::mem::replace(&mut self.carry, partial.trim_start().to_string())
            }
            None => String::new(),
        }
    }

    /// Release the socket.
    pub fn close(self) {
        if let Err(e) = self.stream.shutdown(Shutdown::Both) {
            log::debug!("Socket shutdown: {}", e);
        }
    }
}
