//! Scripted sender doubles shared by the integration tests

#![allow(dead_code)]

use curfuel_core::config::{DaemonConfig, SerialConfig};
use curfuel_core::eventlog::LogRecord;
use curfuel_core::protocol::{ChannelError, Connector, Transport};
use curfuel_core::shutdown::Shutdown;
use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::path::Path;

/// What the sender does in response to one poll byte
#[derive(Debug, Clone)]
pub enum Cycle {
    /// Queue these bytes for reading
    Reply(&'static str),
    /// Say nothing
    Silent,
    /// The write fails as if the cable was pulled
    Fail,
}

/// What the connector does on one connect attempt
#[derive(Debug, Clone)]
pub enum Attempt {
    Refuse,
    Connect(Vec<Cycle>),
}

/// Transport replaying a list of cycles. Once the script runs out it raises
/// the shutdown flag so the pipeline winds down.
pub struct ScriptedPort {
    cycles: VecDeque<Cycle>,
    rx: VecDeque<u8>,
    shutdown: Shutdown,
}

impl Read for ScriptedPort {
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

impl Write for ScriptedPort {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.cycles.pop_front() {
            Some(Cycle::Reply(bytes)) => self.rx.extend(bytes.as_bytes()),
            Some(Cycle::Silent) => {}
            Some(Cycle::Fail) => {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged"))
            }
            None => self.shutdown.request(),
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Transport for ScriptedPort {
    fn bytes_to_read(&mut self) -> io::Result<u32> {
        Ok(self.rx.len() as u32)
    }
}

/// Connector replaying a list of attempts. Running out of attempts raises
/// the shutdown flag.
pub struct ScriptedConnector {
    attempts: VecDeque<Attempt>,
    shutdown: Shutdown,
}

impl ScriptedConnector {
    pub fn new(attempts: Vec<Attempt>, shutdown: &Shutdown) -> Box<Self> {
        Box::new(Self {
            attempts: attempts.into(),
            shutdown: shutdown.clone(),
        })
    }
}

impl Connector for ScriptedConnector {
    fn connect(&mut self, _settings: &SerialConfig) -> Result<Box<dyn Transport>, ChannelError> {
        match self.attempts.pop_front() {
            Some(Attempt::Connect(cycles)) => Ok(Box::new(ScriptedPort {
                cycles: cycles.into(),
                rx: VecDeque::new(),
                shutdown: self.shutdown.clone(),
            })),
            Some(Attempt::Refuse) => Err(ChannelError::Unavailable("no such device".into())),
            None => {
                self.shutdown.request();
                Err(ChannelError::Unavailable("script exhausted".into()))
            }
        }
    }
}

/// Daemon configuration for the reference tank, logging to `output`, with
/// no sleeps anywhere
pub fn test_config(output: &Path) -> DaemonConfig {
    let content = format!(
        "[serial]\n\
         device = /dev/ttyACM0\n\
         retries = 0\n\
         retry_timeout = 0\n\
         [output]\n\
         file = {}\n\
         [calibration]\n\
         minimum = 0\n\
         maximum = 1023\n\
         [sensor]\n\
         reversed = false\n\
         [tank]\n\
         orientation = horizontal\n\
         depth = 0.68\n\
         length = 1.63\n\
         width = 1.08\n\
         [polling]\n\
         interval = 0\n\
         calibration_interval = 0\n",
        output.display()
    );
    DaemonConfig::parse(&content).expect("test config parses")
}

/// Every record in the log file, empty if the file was never created
pub fn read_records(path: &Path) -> Vec<LogRecord> {
    match std::fs::read_to_string(path) {
        Ok(content) => content
            .lines()
            .map(|line| LogRecord::parse(line).expect("well formed record"))
            .collect(),
        Err(_) => Vec::new(),
    }
}

/// The record codes in order, as characters
pub fn codes(records: &[LogRecord]) -> String {
    records.iter().map(|r| r.code.as_char()).collect()
}
