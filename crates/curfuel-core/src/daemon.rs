//! Daemon lifecycle
//!
//! `Idle → Running → ShuttingDown → Stopped`. The serial channel is closed on
//! the way to `Stopped`, whatever happened while running.

use serde::Serialize;
use std::path::Path;
use thiserror::Error;

use crate::config::{ConfigError, DaemonConfig};
use crate::pipeline::{CalibrationBounds, PipelineStats, ReadingPipeline};
use crate::protocol::{ChannelError, Connector, SerialChannel, SerialConnector};
use crate::shutdown::Shutdown;

/// Errors that stop the daemon
#[derive(Error, Debug)]
pub enum DaemonError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Serial channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Cannot {action} while {state:?}")]
    InvalidState {
        state: DaemonState,
        action: &'static str,
    },
}

/// What the daemon does once running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Mode {
    /// Convert readings and write them to the event log
    Run,
    /// Report live min/max for the operator, log nothing
    Calibrate,
}

/// Lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DaemonState {
    /// Configured, channel not opened yet
    Idle,
    /// Channel open, pipeline polling
    Running,
    /// Interrupt received, closing the channel
    ShuttingDown,
    /// Channel closed, nothing left to do
    Stopped,
}

/// Result of a completed run
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RunOutcome {
    /// Run mode counters
    Logged(PipelineStats),
    /// Final calibration bounds
    Calibrated(CalibrationBounds),
}

/// Owns the configuration, the channel and the pipeline
pub struct DaemonController {
    config: DaemonConfig,
    channel: SerialChannel,
    pipeline: ReadingPipeline,
    shutdown: Shutdown,
    state: DaemonState,
}

impl DaemonController {
    /// Create a controller around an arbitrary connector
    pub fn new(config: DaemonConfig, connector: Box<dyn Connector>, shutdown: Shutdown) -> Self {
        let channel = SerialChannel::new(config.serial.clone(), connector);
        let pipeline = ReadingPipeline::from_config(&config);
        Self {
            config,
            channel,
            pipeline,
            shutdown,
            state: DaemonState::Idle,
        }
    }

    /// Load the configuration file and target the real serial device
    pub fn load(path: impl AsRef<Path>, shutdown: Shutdown) -> Result<Self, DaemonError> {
        let config = DaemonConfig::from_file(path)?;
        Ok(Self::new(config, Box::new(SerialConnector::new()), shutdown))
    }

    /// Current lifecycle state
    pub fn state(&self) -> DaemonState {
        self.state
    }

    /// Loaded configuration
    pub fn config(&self) -> &DaemonConfig {
        &self.config
    }

    /// Channel state, for diagnostics
    pub fn channel(&self) -> &SerialChannel {
        &self.channel
    }

    /// Open the channel within its retry budget and enter `Running`
    pub fn start(&mut self) -> Result<(), DaemonError> {
        if self.state != DaemonState::Idle {
            return Err(DaemonError::InvalidState {
                state: self.state,
                action: "start",
            });
        }

        tracing::info!(
            device = %self.config.serial.device_path,
            output = %self.config.output_file.display(),
            "starting"
        );
        self.channel.open(&self.shutdown)?;
        self.state = DaemonState::Running;
        Ok(())
    }

    /// Poll until shutdown is requested
    pub fn run<F>(&mut self, mode: Mode, report: F) -> Result<RunOutcome, DaemonError>
    where
        F: FnMut(&CalibrationBounds),
    {
        if self.state != DaemonState::Running {
            return Err(DaemonError::InvalidState {
                state: self.state,
                action: "run",
            });
        }

        let polling = &self.config.polling;
        let outcome = match mode {
            Mode::Run => RunOutcome::Logged(self.pipeline.run(
                &mut self.channel,
                polling.run_interval,
                &self.shutdown,
            )),
            Mode::Calibrate => RunOutcome::Calibrated(self.pipeline.calibrate(
                &mut self.channel,
                polling.calibration_interval,
                &self.shutdown,
                report,
            )),
        };
        Ok(outcome)
    }

    /// Close the channel and stop. Safe to call more than once.
    pub fn shutdown(&mut self) {
        if self.state == DaemonState::Stopped {
            return;
        }
        self.state = DaemonState::ShuttingDown;
        self.channel.close();
        self.state = DaemonState::Stopped;
        tracing::info!("stopped");
    }

    /// Start, run until interrupted, and always shut down
    pub fn execute<F>(&mut self, mode: Mode, report: F) -> Result<RunOutcome, DaemonError>
    where
        F: FnMut(&CalibrationBounds),
    {
        let result = self.start().and_then(|()| self.run(mode, report));
        self.shutdown();
        result
    }
}
