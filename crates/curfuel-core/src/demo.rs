//! Demo Mode - Simulated level sender for running without hardware
//!
//! Answers poll bytes the way the sender firmware does, with a tank that
//! slowly drains, gets refilled when nearly empty, and can be "unplugged"
//! periodically to exercise device recovery.

use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::time::Instant;

use crate::config::SerialConfig;
use crate::protocol::{ChannelError, Connector, Transport, DEFAULT_FUEL_TOKEN, POLL_REQUEST};

/// Raw value of a freshly filled tank
const FULL_RAW: f64 = 940.0;

/// Below this the simulated owner refills
const REFILL_RAW: f64 = 90.0;

/// Simulated sender
pub struct DemoSender {
    rng: StdRng,
    started: Instant,
    /// Current raw level before noise
    level: f64,
    /// Bytes waiting to be read
    rx: VecDeque<u8>,
    /// Polls answered before the simulated unplug, `None` never unplugs
    polls_left: Option<u32>,
}

impl DemoSender {
    /// Create a sender starting at `level`
    pub fn new(rng: StdRng, level: f64, polls_before_dropout: Option<u32>) -> Self {
        Self {
            rng,
            started: Instant::now(),
            level,
            rx: VecDeque::new(),
            polls_left: polls_before_dropout,
        }
    }

    /// Current raw level
    pub fn level(&self) -> f64 {
        self.level
    }

    fn sample(&mut self) -> f64 {
        // engine running most of the time, occasionally idle
        if self.rng.gen_bool(0.7) {
            self.level -= self.rng.gen_range(0.0..1.2);
        }
        if self.level < REFILL_RAW {
            self.level = FULL_RAW;
        }

        // sloshing
        let noise = self.rng.gen_range(-1.5..1.5);
        (self.level + noise).clamp(0.0, 1023.0)
    }

    fn respond(&mut self, query: u8) {
        let ticks = self.started.elapsed().as_millis();
        let line = if query == POLL_REQUEST {
            let value = self.sample();
            format!("{}:{}:{:.6}\n", ticks, DEFAULT_FUEL_TOKEN, value)
        } else {
            format!("{}:unknown_command:{}\n", ticks, query as char)
        };
        self.rx.extend(line.into_bytes());
    }
}

impl Read for DemoSender {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut n = 0;
        while n < buf.len() {
            match self.rx.pop_front() {
                Some(b) => {
                    buf[n] = b;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }
}

impl Write for DemoSender {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Some(left) = self.polls_left.as_mut() {
            if *left == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::BrokenPipe,
                    "demo sender unplugged",
                ));
            }
            *left -= 1;
        }

        for &query in buf {
            self.respond(query);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Transport for DemoSender {
    fn bytes_to_read(&mut self) -> io::Result<u32> {
        Ok(self.rx.len() as u32)
    }
}

/// Connector handing out [`DemoSender`]s
pub struct DemoConnector {
    rng: StdRng,
    /// Polls per connection before an unplug
    dropout_every: Option<u32>,
    /// Refused connects after each unplug
    outage_attempts: u32,
    refusals_left: u32,
}

impl DemoConnector {
    /// Connector with a random seed and no unplugs
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Reproducible connector
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            rng,
            dropout_every: None,
            outage_attempts: 0,
            refusals_left: 0,
        }
    }

    /// Unplug after `polls` polls, then refuse `outage_attempts` connects
    pub fn with_dropouts(mut self, polls: u32, outage_attempts: u32) -> Self {
        self.dropout_every = Some(polls);
        self.outage_attempts = outage_attempts;
        self
    }
}

impl Default for DemoConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl Connector for DemoConnector {
    fn connect(&mut self, settings: &SerialConfig) -> Result<Box<dyn Transport>, ChannelError> {
        if self.refusals_left > 0 {
            self.refusals_left -= 1;
            return Err(ChannelError::Unavailable(format!(
                "{}: demo sender unplugged",
                settings.device_path
            )));
        }

        self.refusals_left = self.outage_attempts;
        let level = self.rng.gen_range(REFILL_RAW..FULL_RAW);
        let rng = StdRng::seed_from_u64(self.rng.gen());
        Ok(Box::new(DemoSender::new(rng, level, self.dropout_every)))
    }
}
