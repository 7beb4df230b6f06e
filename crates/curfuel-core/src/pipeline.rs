//! Reading Pipeline
//!
//! Consumes the channel's line stream and turns decoded readings into
//! either live calibration bounds or event log records.

use serde::Serialize;
use std::fmt;
use std::time::Duration;

use crate::config::{CalibrationConfig, DaemonConfig};
use crate::eventlog::{EventLogger, LogError, RecordCode};
use crate::protocol::{LineCodec, LineEvent, Reading, SerialChannel};
use crate::shutdown::Shutdown;
use crate::tank::{self, TankConfig};
use crate::unit_conversion::cubic_meters_to_gallons;

/// Payload of the error record written when the device goes away
pub const LOST_DEVICE: &str = "lost device";

/// Payload of the warning record written once the device is back
pub const DEVICE_RECOVERED: &str = "device recovered";

/// Read-only settings the run loop works from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunContext {
    /// Tank dimensions
    pub tank: TankConfig,
    /// Sensor bounds and polarity
    pub calibration: CalibrationConfig,
    /// Skip readings equal to the previous accepted one
    pub suppress_repeats: bool,
}

impl RunContext {
    /// Extract the run settings from the daemon configuration
    pub fn from_config(config: &DaemonConfig) -> Self {
        Self {
            tank: config.tank,
            calibration: config.calibration,
            suppress_repeats: config.polling.suppress_repeats,
        }
    }

    /// Place a raw value against the calibrated range and, when inside it,
    /// compute the tank content
    pub fn assess(&self, raw_value: f64) -> Assessment {
        let cal = &self.calibration;
        if raw_value < cal.min_value {
            return Assessment::BelowRange;
        }
        if raw_value > cal.max_value {
            return Assessment::AboveRange;
        }

        let mut ratio = (raw_value - cal.min_value) / cal.span();
        if cal.reversed {
            ratio = 1.0 - ratio;
        }

        let liquid_depth_m = ratio * self.tank.depth;
        let volume_m3 = tank::liquid_volume(&self.tank, liquid_depth_m);
        Assessment::InRange(VolumeResult {
            liquid_depth_m,
            volume_m3,
            volume_gallons: cubic_meters_to_gallons(volume_m3),
        })
    }
}

/// Tank content derived from one reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VolumeResult {
    /// Height of liquid at the bottom of the tank
    pub liquid_depth_m: f64,
    /// Liquid volume
    pub volume_m3: f64,
    /// Liquid volume in US gallons
    pub volume_gallons: f64,
}

/// Where a raw value falls
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Assessment {
    /// Under the calibrated minimum
    BelowRange,
    /// Over the calibrated maximum
    AboveRange,
    /// Within range, converted
    InRange(VolumeResult),
}

/// Running extrema shown to the operator while calibrating
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationBounds {
    /// Lowest raw value seen
    pub min: f64,
    /// Highest raw value seen
    pub max: f64,
    /// Readings observed
    pub samples: u64,
}

impl CalibrationBounds {
    /// Fold one raw value in
    pub fn observe(&mut self, value: f64) {
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.samples += 1;
    }
}

impl Default for CalibrationBounds {
    fn default() -> Self {
        Self {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            samples: 0,
        }
    }
}

impl fmt::Display for CalibrationBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Min: {:.2}  Max: {:.2}", self.min, self.max)
    }
}

/// Counters for one run of the pipeline
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    /// Complete lines received
    pub lines: u64,
    /// Lines that failed to decode
    pub decode_errors: u64,
    /// Readings skipped as repeats
    pub suppressed: u64,
    /// Reading records written
    pub readings_logged: u64,
    /// Out of range warnings written
    pub out_of_range: u64,
    /// Device losses
    pub outages: u64,
}

/// Turns decoded readings into event log records
pub struct ReadingPipeline {
    context: RunContext,
    codec: LineCodec,
    logger: EventLogger,
    /// Last reading handed to `handle_value`
    last_value: Option<f64>,
    stats: PipelineStats,
}

impl ReadingPipeline {
    /// Create a pipeline
    pub fn new(context: RunContext, codec: LineCodec, logger: EventLogger) -> Self {
        Self {
            context,
            codec,
            logger,
            last_value: None,
            stats: PipelineStats::default(),
        }
    }

    /// Build a pipeline straight from the daemon configuration
    pub fn from_config(config: &DaemonConfig) -> Self {
        Self::new(
            RunContext::from_config(config),
            LineCodec::new(config.fuel_token.clone()),
            EventLogger::new(config.output_file.clone()),
        )
    }

    /// Counters so far
    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    /// Log one reading: a warning when out of range, otherwise a reading
    /// record carrying the converted volume
    pub fn handle_value(&mut self, reading: &Reading) -> Result<Assessment, LogError> {
        let assessment = self.context.assess(reading.raw_value);
        let raw_int = reading.raw_value.trunc() as i64;

        match assessment {
            Assessment::BelowRange => {
                self.stats.out_of_range += 1;
                self.logger.append(
                    RecordCode::Warning,
                    format!("below threshold (raw={raw_int})"),
                )?;
            }
            Assessment::AboveRange => {
                self.stats.out_of_range += 1;
                self.logger.append(
                    RecordCode::Warning,
                    format!("above threshold (raw={raw_int})"),
                )?;
            }
            Assessment::InRange(volume) => {
                tracing::debug!(
                    raw = reading.raw_value,
                    depth_m = volume.liquid_depth_m,
                    litres = volume.volume_m3 * 1000.0,
                    gallons = volume.volume_gallons,
                    "reading"
                );
                self.stats.readings_logged += 1;
                self.logger.append(
                    RecordCode::Reading,
                    format!(
                        "{}:{:.6}:{:.6}",
                        reading.tick_id, reading.raw_value, volume.volume_gallons
                    ),
                )?;
            }
        }

        Ok(assessment)
    }

    /// Run-mode handling of one decoded reading. Returns `None` when the
    /// reading repeats the previous one and repeats are suppressed.
    pub fn accept(&mut self, reading: &Reading) -> Result<Option<Assessment>, LogError> {
        if self.context.suppress_repeats && self.last_value == Some(reading.raw_value) {
            self.stats.suppressed += 1;
            return Ok(None);
        }

        self.last_value = Some(reading.raw_value);
        self.handle_value(reading).map(Some)
    }

    /// Poll the channel and log until shutdown is requested
    pub fn run(
        &mut self,
        channel: &mut SerialChannel,
        poll_delay: Duration,
        shutdown: &Shutdown,
    ) -> PipelineStats {
        for event in channel.lines(poll_delay, shutdown) {
            match event {
                LineEvent::Line(line) => {
                    self.stats.lines += 1;
                    match self.codec.decode(&line) {
                        Ok(reading) => {
                            if let Err(e) = self.accept(&reading) {
                                tracing::error!("failed to record reading: {}", e);
                            }
                        }
                        Err(e) => {
                            self.stats.decode_errors += 1;
                            tracing::warn!(line = %line, "skipping line: {}", e);
                        }
                    }
                }
                LineEvent::Lost(e) => {
                    self.stats.outages += 1;
                    tracing::error!("{}: {}", LOST_DEVICE, e);
                    self.record(RecordCode::Error, LOST_DEVICE);
                }
                LineEvent::Recovered => {
                    tracing::warn!("{}", DEVICE_RECOVERED);
                    self.record(RecordCode::Warning, DEVICE_RECOVERED);
                }
            }
        }

        self.stats
    }

    /// Track min/max of every reading until shutdown is requested, calling
    /// `report` after each one. Nothing is written to the event log.
    pub fn calibrate<F>(
        &self,
        channel: &mut SerialChannel,
        poll_delay: Duration,
        shutdown: &Shutdown,
        mut report: F,
    ) -> CalibrationBounds
    where
        F: FnMut(&CalibrationBounds),
    {
        let mut bounds = CalibrationBounds::default();

        for event in channel.lines(poll_delay, shutdown) {
            match event {
                LineEvent::Line(line) => match self.codec.decode(&line) {
                    Ok(reading) => {
                        bounds.observe(reading.raw_value);
                        report(&bounds);
                    }
                    Err(e) => tracing::debug!(line = %line, "skipping line: {}", e),
                },
                LineEvent::Lost(e) => tracing::error!("{}: {}", LOST_DEVICE, e),
                LineEvent::Recovered => tracing::warn!("{}", DEVICE_RECOVERED),
            }
        }

        bounds
    }

    fn record(&self, code: RecordCode, payload: &str) {
        if let Err(e) = self.logger.append(code, payload) {
            tracing::error!("failed to write event log: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tank::Orientation;

    fn context(reversed: bool) -> RunContext {
        RunContext {
            tank: TankConfig::new(Orientation::Horizontal, 0.68, 1.63, 1.08).unwrap(),
            calibration: CalibrationConfig::new(0.0, 1023.0, reversed).unwrap(),
            suppress_repeats: true,
        }
    }

    #[test]
    fn test_assess_range_edges() {
        let ctx = context(false);
        assert_eq!(ctx.assess(-0.5), Assessment::BelowRange);
        assert_eq!(ctx.assess(1023.5), Assessment::AboveRange);

        let Assessment::InRange(empty) = ctx.assess(0.0) else {
            panic!("0 is in range");
        };
        assert_eq!(empty.volume_m3, 0.0);

        let Assessment::InRange(full) = ctx.assess(1023.0) else {
            panic!("1023 is in range");
        };
        assert!((full.volume_m3 - tank::full_volume(&ctx.tank)).abs() < 1e-9);
    }

    #[test]
    fn test_reversed_polarity() {
        let Assessment::InRange(v) = context(true).assess(0.0) else {
            panic!("in range");
        };
        assert!((v.liquid_depth_m - 0.68).abs() < 1e-12);
    }

    #[test]
    fn test_bounds_display() {
        let mut bounds = CalibrationBounds::default();
        bounds.observe(300.25);
        bounds.observe(120.0);
        bounds.observe(845.5);
        assert_eq!(bounds.samples, 3);
        assert_eq!(bounds.to_string(), "Min: 120.00  Max: 845.50");
    }
}
