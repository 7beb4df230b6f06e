//! Line stream
//!
//! Pull-based, endless sequence of protocol lines with built-in recovery.

use std::thread;
use std::time::Duration;

use super::{ChannelError, SerialChannel};
use crate::shutdown::Shutdown;

/// What the stream produced on a pull
#[derive(Debug)]
pub enum LineEvent {
    /// A complete line, terminator stripped
    Line(String),
    /// The device failed mid-poll; recovery starts on the next pull
    Lost(ChannelError),
    /// The device is back and polling resumes
    Recovered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamState {
    Polling,
    Recovering,
}

/// Endless line iterator over a [`SerialChannel`].
///
/// Ends only once shutdown has been requested.
pub struct Lines<'a> {
    channel: &'a mut SerialChannel,
    shutdown: &'a Shutdown,
    poll_delay: Duration,
    state: StreamState,
    /// Sleep before the next poll cycle
    pending_delay: bool,
}

impl SerialChannel {
    /// Stream lines, polling every `poll_delay`
    pub fn lines<'a>(&'a mut self, poll_delay: Duration, shutdown: &'a Shutdown) -> Lines<'a> {
        Lines {
            channel: self,
            shutdown,
            poll_delay,
            state: StreamState::Polling,
            pending_delay: false,
        }
    }
}

impl Iterator for Lines<'_> {
    type Item = LineEvent;

    fn next(&mut self) -> Option<LineEvent> {
        loop {
            if self.shutdown.is_requested() {
                return None;
            }

            match self.state {
                StreamState::Polling => {
                    if self.pending_delay {
                        self.pending_delay = false;
                        thread::sleep(self.poll_delay);
                        continue;
                    }

                    match self.channel.poll_line() {
                        Ok(Some(line)) => {
                            self.pending_delay = true;
                            return Some(LineEvent::Line(line));
                        }
                        Ok(None) => self.pending_delay = true,
                        Err(e) => {
                            self.channel.close();
                            self.state = StreamState::Recovering;
                            return Some(LineEvent::Lost(e));
                        }
                    }
                }
                StreamState::Recovering => {
                    return match self.channel.wait_for_device(self.shutdown) {
                        Ok(()) => {
                            self.state = StreamState::Polling;
                            Some(LineEvent::Recovered)
                        }
                        Err(_) => None,
                    };
                }
            }
        }
    }
}
