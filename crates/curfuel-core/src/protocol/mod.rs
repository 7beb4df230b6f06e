//! Sender Protocol Communication
//!
//! Implements the level sender's ASCII line protocol over a serial port.
//!
//! The daemon writes a single poll byte and the sender answers with a line
//! of the form `<tick>:<command>:<value>\n`.

mod channel;
pub mod codec;
mod error;
mod lines;
pub mod serial;
pub mod stream;

pub use channel::{ChannelState, Connector, SerialChannel};
pub use codec::{LineCodec, Reading};
pub use error::{ChannelError, DecodeError};
pub use lines::{LineEvent, Lines};
pub use serial::{list_ports, PortInfo, SerialConnector};
pub use stream::{SerialTransport, Transport};

/// Default baud rate of the sender firmware
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Default read timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Byte that asks the sender for a fresh sample
pub const POLL_REQUEST: u8 = b'f';

/// Command token of a fuel level sample
pub const DEFAULT_FUEL_TOKEN: &str = "raw_fuel_level";

/// Field separator inside a protocol line
pub const FIELD_SEPARATOR: char = ':';
