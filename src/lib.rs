extern crate serialport;

pub mod error;
pub mod ports;
pub mod protocol;
pub mod session;

use std::time::Duration;

pub use error::{DecodeError, Error, Result, SelectionError};
pub use protocol::{ChannelConfig, Command, DeviceType};
pub use session::{Outcome, Session, SessionOptions, Summary};

/// The transmitter firmware talks at a fixed 9600 baud.
pub const BAUD_RATE: u32 = 9600;

/// How long to wait for a reply before giving up on it.
pub const READ_TIMEOUT: Duration = Duration::from_secs(2);

/// Size of a channel configuration record on the wire.
pub const RECORD_LEN: usize = 12;

/// Number of channels the firmware knows about (valid indexes are 0..10).
pub const CHANNEL_COUNT: usize = 10;

/// Opens the transmitter at `path`. The returned port is exclusively owned by
/// the caller, dropping it closes the connection.
pub fn open_device(path: &str) -> Result<Box<dyn serialport::SerialPort>> {
    let port = serialport::new(path, BAUD_RATE)
        .data_bits(serialport::DataBits::Eight)
        .parity(serialport::Parity::None)
        .stop_bits(serialport::StopBits::One)
        .flow_control(serialport::FlowControl::None)
        .timeout(READ_TIMEOUT)
        .open()?;
    log::info!("opened {path} at {BAUD_RATE} baud");
    Ok(port)
}
