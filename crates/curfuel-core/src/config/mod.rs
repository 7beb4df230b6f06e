//! Daemon Configuration
//!
//! Loads the INI configuration file into typed, validated settings. All
//! settings are read once at startup and are read-only afterwards.
//!
//! Required keys:
//!
//! | section       | key         |
//! |---------------|-------------|
//! | `serial`      | `device`    |
//! | `output`      | `file`      |
//! | `calibration` | `minimum`, `maximum` |
//! | `sensor`      | `reversed`  |
//! | `tank`        | `orientation`, `depth`, `length`, `width` |

mod error;
mod parser;

pub use error::ConfigError;
pub use parser::IniDocument;

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::protocol::{DEFAULT_BAUD_RATE, DEFAULT_FUEL_TOKEN, DEFAULT_TIMEOUT_MS};
use crate::tank::{Orientation, TankConfig};

/// Open attempts after the first one
pub const DEFAULT_OPEN_RETRIES: u32 = 10;

/// Pause between open attempts
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Pause between poll cycles in run mode
pub const DEFAULT_RUN_INTERVAL: Duration = Duration::from_secs(1);

/// Pause between poll cycles in calibration mode
pub const DEFAULT_CALIBRATION_INTERVAL: Duration = Duration::from_millis(500);

/// Serial port settings and open policy
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SerialConfig {
    /// Device node or port name
    pub device_path: String,
    /// Line speed
    pub baud_rate: u32,
    /// Open attempts after the first one
    pub open_retries: u32,
    /// Pause between open attempts
    pub retry_backoff: Duration,
    /// Read/write timeout on the port
    pub read_timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            device_path: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
            open_retries: DEFAULT_OPEN_RETRIES,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
            read_timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

/// Raw sensor bounds and polarity
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CalibrationConfig {
    /// Raw value of an empty tank (full when reversed)
    pub min_value: f64,
    /// Raw value of a full tank (empty when reversed)
    pub max_value: f64,
    /// Sender reads high when the tank is empty
    pub reversed: bool,
}

impl CalibrationConfig {
    /// Build validated bounds, `max_value` must exceed `min_value`
    pub fn new(min_value: f64, max_value: f64, reversed: bool) -> Result<Self, ConfigError> {
        if !min_value.is_finite() || !max_value.is_finite() || max_value <= min_value {
            return Err(ConfigError::invalid(
                "calibration.maximum",
                format!("maximum ({max_value}) must be greater than minimum ({min_value})"),
            ));
        }
        Ok(Self {
            min_value,
            max_value,
            reversed,
        })
    }

    /// Width of the calibrated range
    pub fn span(&self) -> f64 {
        self.max_value - self.min_value
    }
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        // full ADC range of the sender's 10-bit converter
        Self {
            min_value: 0.0,
            max_value: 1023.0,
            reversed: false,
        }
    }
}

/// Poll cadence and repeat handling
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PollingConfig {
    /// Pause between poll cycles in run mode
    pub run_interval: Duration,
    /// Pause between poll cycles in calibration mode
    pub calibration_interval: Duration,
    /// Skip readings equal to the previous one in run mode
    pub suppress_repeats: bool,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            run_interval: DEFAULT_RUN_INTERVAL,
            calibration_interval: DEFAULT_CALIBRATION_INTERVAL,
            suppress_repeats: true,
        }
    }
}

/// Everything the daemon needs, loaded from one INI file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DaemonConfig {
    /// Serial port
    pub serial: SerialConfig,
    /// Event log destination
    pub output_file: PathBuf,
    /// Sensor bounds
    pub calibration: CalibrationConfig,
    /// Tank dimensions
    pub tank: TankConfig,
    /// Command token of fuel level lines
    pub fuel_token: String,
    /// Poll cadence
    pub polling: PollingConfig,
}

impl DaemonConfig {
    /// Load the configuration from an INI file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let doc = IniDocument::from_path(path.as_ref())?;
        Self::from_document(&doc)
    }

    /// Load the configuration from INI text
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Self::from_document(&IniDocument::parse(content)?)
    }

    /// Build the configuration from a parsed document
    pub fn from_document(doc: &IniDocument) -> Result<Self, ConfigError> {
        let defaults = SerialConfig::default();
        let serial = SerialConfig {
            device_path: doc.require("serial", "device")?.to_string(),
            baud_rate: optional(doc, "serial", "baud_rate", parse_int)?
                .unwrap_or(defaults.baud_rate),
            open_retries: optional(doc, "serial", "retries", parse_int)?
                .unwrap_or(defaults.open_retries),
            retry_backoff: optional(doc, "serial", "retry_timeout", parse_seconds)?
                .unwrap_or(defaults.retry_backoff),
            read_timeout: optional(doc, "serial", "read_timeout", parse_seconds)?
                .unwrap_or(defaults.read_timeout),
        };
        if serial.device_path.is_empty() {
            return Err(ConfigError::invalid("serial.device", "must not be empty"));
        }

        let output_file = PathBuf::from(doc.require("output", "file")?);

        let reversed = doc.require("sensor", "reversed")?.eq_ignore_ascii_case("true");
        let calibration = CalibrationConfig::new(
            required(doc, "calibration", "minimum", parse_float)?,
            required(doc, "calibration", "maximum", parse_float)?,
            reversed,
        )?;

        let orientation = Orientation::from_config_value(doc.require("tank", "orientation")?);
        let tank = TankConfig::new(
            orientation,
            required(doc, "tank", "depth", parse_float)?,
            required(doc, "tank", "length", parse_float)?,
            required(doc, "tank", "width", parse_float)?,
        )
        .map_err(|e| ConfigError::invalid("tank", e.to_string()))?;

        let fuel_token = doc
            .get("sensor", "token")
            .unwrap_or(DEFAULT_FUEL_TOKEN)
            .to_string();

        let polling_defaults = PollingConfig::default();
        let polling = PollingConfig {
            run_interval: optional(doc, "polling", "interval", parse_seconds)?
                .unwrap_or(polling_defaults.run_interval),
            calibration_interval: optional(doc, "polling", "calibration_interval", parse_seconds)?
                .unwrap_or(polling_defaults.calibration_interval),
            suppress_repeats: optional(doc, "polling", "suppress_repeats", parse_bool)?
                .unwrap_or(polling_defaults.suppress_repeats),
        };

        Ok(Self {
            serial,
            output_file,
            calibration,
            tank,
            fuel_token,
            polling,
        })
    }
}

type FieldParser<T> = fn(&str, &str) -> Result<T, ConfigError>;

fn required<T>(
    doc: &IniDocument,
    section: &str,
    key: &str,
    parse: FieldParser<T>,
) -> Result<T, ConfigError> {
    parse(&format!("{section}.{key}"), doc.require(section, key)?)
}

fn optional<T>(
    doc: &IniDocument,
    section: &str,
    key: &str,
    parse: FieldParser<T>,
) -> Result<Option<T>, ConfigError> {
    doc.get(section, key)
        .map(|value| parse(&format!("{section}.{key}"), value))
        .transpose()
}

fn parse_float(field: &str, value: &str) -> Result<f64, ConfigError> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| ConfigError::invalid(field, format!("'{value}' is not a number")))
}

fn parse_int<T: std::str::FromStr>(field: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| ConfigError::invalid(field, format!("'{value}' is not a whole number")))
}

fn parse_seconds(field: &str, value: &str) -> Result<Duration, ConfigError> {
    let secs = parse_float(field, value)?;
    Duration::try_from_secs_f64(secs)
        .map_err(|_| ConfigError::invalid(field, format!("'{value}' is not a valid duration")))
}

fn parse_bool(field: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(ConfigError::invalid(field, format!("'{value}' is not a boolean"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const MINIMAL: &str = "\
[serial]
device = /dev/ttyACM0

[output]
file = /var/log/curfuel.log

[calibration]
minimum = 12
maximum = 980

[sensor]
reversed = True

[tank]
orientation = horizontal
depth = 0.68
length = 1.63
width = 1.08
";

    #[test]
    fn test_resolved_config_as_json() {
        let config = DaemonConfig::parse(MINIMAL).unwrap();
        let json = serde_json::to_value(&config).unwrap();

        assert_eq!(json["serial"]["device_path"], "/dev/ttyACM0");
        assert_eq!(json["serial"]["baud_rate"], 9600);
        assert_eq!(json["output_file"], "/var/log/curfuel.log");
        assert_eq!(json["calibration"]["reversed"], true);
        assert_eq!(json["tank"]["orientation"], "horizontal");
        assert_eq!(json["fuel_token"], "raw_fuel_level");
        assert_eq!(json["polling"]["run_interval"]["secs"], 1);
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = DaemonConfig::parse(MINIMAL).unwrap();

        assert_eq!(
            config.serial,
            SerialConfig {
                device_path: "/dev/ttyACM0".into(),
                ..SerialConfig::default()
            }
        );
        assert_eq!(config.output_file, PathBuf::from("/var/log/curfuel.log"));
        assert_eq!(
            config.calibration,
            CalibrationConfig {
                min_value: 12.0,
                max_value: 980.0,
                reversed: true,
            }
        );
        assert_eq!(config.tank.orientation, Orientation::Horizontal);
        assert_eq!(config.fuel_token, DEFAULT_FUEL_TOKEN);
        assert_eq!(config.polling, PollingConfig::default());
    }

    #[test]
    fn test_optional_overrides() {
        let content = format!(
            "{MINIMAL}\n[polling]\ninterval = 2.5\nsuppress_repeats = no\n"
        )
        .replace(
            "device = /dev/ttyACM0",
            "device = /dev/ttyUSB1\nbaud_rate = 19200\nretries = 3\nretry_timeout = 0.25",
        );
        let config = DaemonConfig::parse(&content).unwrap();

        assert_eq!(config.serial.baud_rate, 19200);
        assert_eq!(config.serial.open_retries, 3);
        assert_eq!(config.serial.retry_backoff, Duration::from_millis(250));
        assert_eq!(config.polling.run_interval, Duration::from_millis(2500));
        assert!(!config.polling.suppress_repeats);
    }

    #[test]
    fn test_reversed_is_only_true_for_true() {
        let config = DaemonConfig::parse(&MINIMAL.replace("reversed = True", "reversed = 1"))
            .unwrap();
        assert!(!config.calibration.reversed);
    }

    #[test]
    fn test_other_orientation_is_vertical() {
        let config =
            DaemonConfig::parse(&MINIMAL.replace("horizontal", "upright")).unwrap();
        assert_eq!(config.tank.orientation, Orientation::Vertical);
    }

    #[test]
    fn test_missing_field() {
        let err = DaemonConfig::parse(&MINIMAL.replace("width = 1.08", "")).unwrap_err();
        assert_eq!(
            err,
            ConfigError::MissingFieldError {
                section: "tank".into(),
                field: "width".into()
            }
        );
    }

    #[test]
    fn test_bad_number() {
        let err = DaemonConfig::parse(&MINIMAL.replace("depth = 0.68", "depth = deep"))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValueError { ref field, .. } if field == "tank.depth"
        ));
    }

    #[test]
    fn test_inverted_calibration_rejected() {
        let err = DaemonConfig::parse(&MINIMAL.replace("maximum = 980", "maximum = 5"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValueError { .. }));
    }

    #[test]
    fn test_narrow_horizontal_tank_rejected() {
        let err = DaemonConfig::parse(&MINIMAL.replace("width = 1.08", "width = 0.5"))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValueError { ref field, .. } if field == "tank"
        ));
    }
}
