use thiserror::Error;

/// Errors produced while picking a port. All of these are fatal: the caller
/// is expected to report them and stop before any connection is opened.
#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("selection must be a port number, got {0:?}")]
    NotANumber(String),

    #[error("port {index} does not exist ({available} ports available)")]
    OutOfRange { index: i64, available: usize },

    #[error("no selection was entered")]
    NoInput,

    #[error("failed to read selection: {0}")]
    Io(#[from] std::io::Error),
}

/// Reasons a reply could not be turned into a `ChannelConfig`.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("expected {expected} bytes, got {actual}")]
    WrongLength { expected: usize, actual: usize },

    #[error("device type byte 0x{0:02x} is not ASCII")]
    NonAsciiDeviceType(u8),

    #[error("record truncated: {0}")]
    Truncated(#[from] std::io::Error),
}

// io::Error is not PartialEq, so compare on variant and payload where possible.
impl PartialEq for DecodeError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                DecodeError::WrongLength { expected, actual },
                DecodeError::WrongLength {
                    expected: other_expected,
                    actual: other_actual,
                },
            ) => expected == other_expected && actual == other_actual,
            (DecodeError::NonAsciiDeviceType(a), DecodeError::NonAsciiDeviceType(b)) => a == b,
            (DecodeError::Truncated(a), DecodeError::Truncated(b)) => a.kind() == b.kind(),
            _ => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
