//! Line codec
//!
//! Turns a raw `<tick>:<command>:<value>` line into a [`Reading`].

use serde::Serialize;

use super::{DecodeError, DEFAULT_FUEL_TOKEN, FIELD_SEPARATOR};

/// One decoded sample from the sender
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    /// Opaque sequence token supplied by the sender (its uptime in ms)
    pub tick_id: String,
    /// Averaged ADC value
    pub raw_value: f64,
}

impl Reading {
    /// Create a reading
    pub fn new(tick_id: impl Into<String>, raw_value: f64) -> Self {
        Self {
            tick_id: tick_id.into(),
            raw_value,
        }
    }
}

/// Decoder for fuel level lines
#[derive(Debug, Clone)]
pub struct LineCodec {
    fuel_token: String,
}

impl LineCodec {
    /// Codec accepting `fuel_token` as the sample command
    pub fn new(fuel_token: impl Into<String>) -> Self {
        Self {
            fuel_token: fuel_token.into(),
        }
    }

    /// Decode one line (without its `\n` terminator).
    ///
    /// `nan` and `inf` parse as floats but are rejected: the sender only
    /// reports finite ADC averages.
    pub fn decode(&self, line: &str) -> Result<Reading, DecodeError> {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let tokens: Vec<&str> = line.split(FIELD_SEPARATOR).collect();

        let [tick_id, command, value] = tokens.as_slice() else {
            return Err(DecodeError::MalformedLine {
                fields: tokens.len(),
            });
        };

        if *command != self.fuel_token {
            return Err(DecodeError::UnknownCommand(command.to_string()));
        }

        let raw_value = value
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| DecodeError::InvalidValue(value.to_string()))?;

        Ok(Reading::new(*tick_id, raw_value))
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new(DEFAULT_FUEL_TOKEN)
    }
}
