use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::DecodeError;
use crate::{CHANNEL_COUNT, RECORD_LEN};

/// The kind of input device a channel is wired to. The firmware stores this
/// as a single ASCII letter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceType {
    Joystick,
    AnalogInput,
    ThreeStateSwitch,
    DigitalInput,
    /// Any other ASCII letter. Older or newer firmware may know more kinds
    /// than we do, so this is not treated as a decode failure.
    Other(char),
}

impl DeviceType {
    pub fn from_byte(byte: u8) -> Result<DeviceType, DecodeError> {
        if !byte.is_ascii() {
            return Err(DecodeError::NonAsciiDeviceType(byte));
        }
        Ok(match byte {
            b'J' => DeviceType::Joystick,
            b'A' => DeviceType::AnalogInput,
            b'S' => DeviceType::ThreeStateSwitch,
            b'D' => DeviceType::DigitalInput,
            other => DeviceType::Other(other as char),
        })
    }

    pub fn as_char(&self) -> char {
        match self {
            DeviceType::Joystick => 'J',
            DeviceType::AnalogInput => 'A',
            DeviceType::ThreeStateSwitch => 'S',
            DeviceType::DigitalInput => 'D',
            DeviceType::Other(c) => *c,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            DeviceType::Joystick => "joystick",
            DeviceType::AnalogInput => "analog input",
            DeviceType::ThreeStateSwitch => "three-state switch",
            DeviceType::DigitalInput => "digital input",
            DeviceType::Other(_) => "unknown",
        }
    }
}

impl std::fmt::Display for DeviceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// One channel's configuration, as sent by the transmitter in reply to a
/// `C<n>` command. The wire layout is packed and little-endian:
///
/// | offset | size | field          |
/// |--------|------|----------------|
/// | 0      | 1    | version        |
/// | 1      | 1    | device_type    |
/// | 2      | 1    | device_id      |
/// | 3      | 1    | reverse        |
/// | 4      | 1    | trim           |
/// | 5      | 2    | analog_min     |
/// | 7      | 2    | analog_max     |
/// | 9      | 1    | min_endpoint   |
/// | 10     | 1    | max_endpoint   |
/// | 11     | 1    | center_point   |
///
/// This layout is what the firmware has been observed to send; it has not
/// been checked against every firmware revision.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelConfig {
    pub version: u8,
    pub device_type: DeviceType,
    pub device_id: u8,
    /// Nominally 0 or 1. Kept as the raw byte so that anything else the
    /// device sends is still visible.
    pub reverse: u8,
    pub trim: u8,
    pub analog_min: i16,
    pub analog_max: i16,
    pub min_endpoint: u8,
    pub max_endpoint: u8,
    pub center_point: u8,
}

impl ChannelConfig {
    pub fn decode(data: &[u8]) -> Result<ChannelConfig, DecodeError> {
        if data.len() != RECORD_LEN {
            return Err(DecodeError::WrongLength {
                expected: RECORD_LEN,
                actual: data.len(),
            });
        }

        let mut cursor = Cursor::new(data);
        let version = cursor.read_u8()?;
        let device_type = DeviceType::from_byte(cursor.read_u8()?)?;
        Ok(ChannelConfig {
            version,
            device_type,
            device_id: cursor.read_u8()?,
            reverse: cursor.read_u8()?,
            trim: cursor.read_u8()?,
            analog_min: cursor.read_i16::<LittleEndian>()?,
            analog_max: cursor.read_i16::<LittleEndian>()?,
            min_endpoint: cursor.read_u8()?,
            max_endpoint: cursor.read_u8()?,
            center_point: cursor.read_u8()?,
        })
    }

    pub fn encode(&self) -> [u8; RECORD_LEN] {
        let mut out = Vec::with_capacity(RECORD_LEN);
        // Writes into a Vec cannot fail.
        let _ = self.write_to(&mut out);
        let mut record = [0u8; RECORD_LEN];
        record.copy_from_slice(&out);
        record
    }

    fn write_to(&self, out: &mut Vec<u8>) -> std::io::Result<()> {
        out.write_u8(self.version)?;
        // Other(c) is only ever constructed from an ASCII byte.
        out.write_u8(self.device_type.as_char() as u8)?;
        out.write_u8(self.device_id)?;
        out.write_u8(self.reverse)?;
        out.write_u8(self.trim)?;
        out.write_i16::<LittleEndian>(self.analog_min)?;
        out.write_i16::<LittleEndian>(self.analog_max)?;
        out.write_u8(self.min_endpoint)?;
        out.write_u8(self.max_endpoint)?;
        out.write_u8(self.center_point)
    }

    pub fn is_reversed(&self) -> bool {
        self.reverse != 0
    }
}

impl std::fmt::Display for ChannelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Version: {}, Device Type: {}, Device ID: {}, Reverse: {}, Trim: {}",
            self.version, self.device_type, self.device_id, self.reverse, self.trim
        )?;
        write!(
            f,
            "Analog Min: {}, Analog Max: {}, Min Endpoint: {}, Max Endpoint: {}, Center Point: {}",
            self.analog_min,
            self.analog_max,
            self.min_endpoint,
            self.max_endpoint,
            self.center_point
        )
    }
}

/// A line of operator input, classified by what the transmitter is going to
/// do with it. Classification never alters what is sent: the trimmed text is
/// always passed through as-is.
#[derive(Clone, Debug, PartialEq)]
pub enum Command<'a> {
    Exit,
    /// `C<n>`: request the configuration record for channel n. The firmware
    /// parses the index leniently, `channel` is None when we couldn't.
    ChannelConfig {
        channel: Option<i64>,
        text: &'a str,
    },
    /// `X`: request the current value of every channel (one byte each).
    ChannelValues,
    Other(&'a str),
}

impl<'a> Command<'a> {
    pub fn parse(line: &'a str) -> Command<'a> {
        let text = line.trim();
        match text {
            text if text.eq_ignore_ascii_case("exit") => Command::Exit,
            "X" => Command::ChannelValues,
            text if text.starts_with('C') => Command::ChannelConfig {
                channel: text[1..].parse().ok(),
                text,
            },
            text => Command::Other(text),
        }
    }

    /// Bytes to write to the device, or None if this command is handled
    /// locally.
    pub fn to_wire(&self) -> Option<Vec<u8>> {
        let text = match self {
            Command::Exit => return None,
            Command::ChannelConfig { text, .. } => *text,
            Command::ChannelValues => "X",
            Command::Other(text) => *text,
        };
        let mut out = Vec::with_capacity(text.len() + 1);
        out.extend_from_slice(text.as_bytes());
        out.push(b'\n');
        Some(out)
    }

    /// Explains why the device is not expected to reply with a configuration
    /// record, if that can be predicted.
    pub fn reply_warning(&self) -> Option<String> {
        match self {
            Command::ChannelConfig {
                channel: Some(channel),
                ..
            } if !(0..CHANNEL_COUNT as i64).contains(channel) => Some(format!(
                "channel {channel} is outside 0..{CHANNEL_COUNT}, the device will reply with an error message instead of a record"
            )),
            Command::ChannelConfig { channel: None, text } => Some(format!(
                "could not parse a channel number from {text:?}, the device will probably fall back to channel 0"
            )),
            Command::ChannelValues => Some(format!(
                "X returns {CHANNEL_COUNT} channel value bytes, not a configuration record"
            )),
            _ => None,
        }
    }
}
