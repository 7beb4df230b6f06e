//! Serial channel management
//!
//! Owns the connection to the sender and handles its lifecycle: bounded
//! retry on open, per-cycle polling, and indefinite recovery after the
//! device disappears.

use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::thread;

use super::{ChannelError, Transport, POLL_REQUEST};
use crate::config::SerialConfig;
use crate::shutdown::Shutdown;

/// Something that can produce a fresh transport to the sender
pub trait Connector: Send {
    /// Make a single connection attempt
    fn connect(&mut self, settings: &SerialConfig) -> Result<Box<dyn Transport>, ChannelError>;
}

/// Channel state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelState {
    /// No connection handle
    Closed,
    /// Open attempts in progress
    Opening,
    /// Connected and ready to poll
    Open,
}

/// Fault tolerant connection to the sender
pub struct SerialChannel {
    /// Port settings and retry policy
    settings: SerialConfig,
    /// Produces transports on open
    connector: Box<dyn Connector>,
    /// Connection handle, only present while open
    port: Option<Box<dyn Transport>>,
    /// Current state
    state: ChannelState,
}

impl SerialChannel {
    /// Create a channel (not yet opened)
    pub fn new(settings: SerialConfig, connector: Box<dyn Connector>) -> Self {
        Self {
            settings,
            connector,
            port: None,
            state: ChannelState::Closed,
        }
    }

    /// Get current channel state
    pub fn state(&self) -> ChannelState {
        self.state
    }

    /// Check whether a connection handle is held
    pub fn is_open(&self) -> bool {
        self.port.is_some()
    }

    /// Open the device, trying up to `open_retries + 1` times.
    ///
    /// Retryable failures sleep `retry_backoff` between attempts; a fatal
    /// failure or an exhausted budget is returned to the caller. A shutdown
    /// request is checked before every attempt.
    pub fn open(&mut self, shutdown: &Shutdown) -> Result<(), ChannelError> {
        if self.port.is_some() {
            return Ok(());
        }

        self.state = ChannelState::Opening;
        let attempts = self.settings.open_retries.saturating_add(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            if shutdown.is_requested() {
                self.state = ChannelState::Closed;
                return Err(ChannelError::Interrupted);
            }

            match self.connector.connect(&self.settings) {
                Ok(port) => {
                    tracing::info!(
                        device = %self.settings.device_path,
                        attempt,
                        "serial channel open"
                    );
                    self.port = Some(port);
                    self.state = ChannelState::Open;
                    return Ok(());
                }
                Err(e) if !e.is_retryable() => {
                    self.state = ChannelState::Closed;
                    return Err(e);
                }
                Err(e) => {
                    tracing::debug!(attempt, attempts, "open attempt failed: {}", e);
                    last_error = Some(e);
                    if attempt < attempts {
                        thread::sleep(self.settings.retry_backoff);
                    }
                }
            }
        }

        self.state = ChannelState::Closed;
        Err(ChannelError::OpenFailed {
            device: self.settings.device_path.clone(),
            attempts,
            reason: last_error.map(|e| e.to_string()).unwrap_or_default(),
        })
    }

    /// Release the connection handle. Safe to call when already closed.
    pub fn close(&mut self) {
        if self.port.take().is_some() {
            tracing::info!(device = %self.settings.device_path, "serial channel closed");
        }
        self.state = ChannelState::Closed;
    }

    /// Run one poll cycle: send the poll byte, then drain every byte that is
    /// already waiting, stopping at the first `\n`.
    ///
    /// Returns `Ok(None)` when no complete line arrived this cycle. Any I/O
    /// failure closes the channel.
    pub fn poll_line(&mut self) -> Result<Option<String>, ChannelError> {
        let port = self.port.as_mut().ok_or(ChannelError::NotConnected)?;

        match exchange(port.as_mut()) {
            Ok(line) => Ok(line),
            Err(e) => {
                self.close();
                Err(ChannelError::Disconnected(e))
            }
        }
    }

    /// Block until the device can be opened again.
    ///
    /// Every failure, including an exhausted retry budget, is swallowed and
    /// retried after `retry_backoff`. Only a shutdown request ends the wait
    /// without a connection.
    pub fn wait_for_device(&mut self, shutdown: &Shutdown) -> Result<(), ChannelError> {
        loop {
            if shutdown.is_requested() {
                return Err(ChannelError::Interrupted);
            }

            match self.open(shutdown) {
                Ok(()) => return Ok(()),
                Err(ChannelError::Interrupted) => return Err(ChannelError::Interrupted),
                Err(e) => {
                    tracing::warn!("device still unavailable: {}", e);
                    thread::sleep(self.settings.retry_backoff);
                }
            }
        }
    }
}

impl Drop for SerialChannel {
    fn drop(&mut self) {
        self.close();
    }
}

fn exchange(port: &mut dyn Transport) -> std::io::Result<Option<String>> {
    port.write_all(&[POLL_REQUEST])?;

    // fresh buffer every cycle
    let mut line = Vec::new();
    let mut byte = [0u8; 1];
    while port.bytes_to_read()? > 0 {
        port.read_exact(&mut byte)?;
        if byte[0] == b'\n' {
            return Ok(Some(String::from_utf8_lossy(&line).into_owned()));
        }
        line.push(byte[0]);
    }

    Ok(None)
}
