//! Register layer error types

use thiserror::Error;

use crate::register::{RegisterClass, RegisterFormat};

/// Result type for register operations
pub type Result<T> = std::result::Result<T, RegisterError>;

/// Failures reported by a [`RegisterClient`](crate::transport::RegisterClient)
#[derive(Debug, Error)]
pub enum TransportError {
    /// IO errors (socket closed, timeout raised by the transport)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The device answered with an exception response
    #[error("Device exception {code:#04x}: {message}")]
    Exception { code: u8, message: String },

    /// No session is open
    #[error("Not connected")]
    NotConnected,
}

/// One register class whose cache fill failed during a poll
#[derive(Debug)]
pub struct ClassFailure {
    pub class: RegisterClass,
    pub error: RegisterError,
}

fn summarize(failures: &[ClassFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{} registers: {}", f.class, f.error))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Register layer errors
#[derive(Debug, Error)]
pub enum RegisterError {
    #[error("Register code {0} is not available")]
    UnknownRegister(u32),

    #[error("Device '{0}' is not known")]
    DeviceNotFound(String),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Format {0} has no byte encoding for this value")]
    UnsupportedEncoding(RegisterFormat),

    #[error("Write to register {address} echoed {actual:02X?}, expected {expected:02X?}")]
    WriteVerificationMismatch {
        address: u16,
        expected: Vec<u8>,
        actual: Vec<u8>,
    },

    #[error("Unknown register format: {0}")]
    UnknownFormat(String),

    #[error("Invalid catalog: {0}")]
    InvalidCatalog(String),

    #[error("Catalog file {path}: {reason}")]
    CatalogFile { path: String, reason: String },

    #[error("No cached data for {class} registers; poll the device first")]
    CacheNotFilled { class: RegisterClass },

    #[error("Register {address} is outside the cached window [{start}, {start}+{length})")]
    OutOfWindow {
        address: u16,
        start: u16,
        length: u32,
    },

    #[error("Short read: expected {expected} bytes, device returned {actual}")]
    ShortRead { expected: usize, actual: usize },

    #[error("Read no data. Are registers configured for this device?")]
    NoRegisters,

    #[error("Poll failed for every register class: {}", summarize(.failures))]
    PollFailed { failures: Vec<ClassFailure> },
}

impl RegisterError {
    /// Create an invalid catalog error
    pub fn invalid_catalog(msg: impl Into<String>) -> Self {
        Self::InvalidCatalog(msg.into())
    }

    /// True when the failure came from the device round trip
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::ShortRead { .. })
    }
}
