//! Common error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("USB error: {0}")]
    Usb(String),

    /// The USB subsystem could not list attached devices
    #[error("Failed to list USB devices: {0}")]
    Enumeration(String),

    /// A selected device could not be opened
    #[error("Failed to open device {device}: {reason}")]
    Open { device: String, reason: String },

    /// A device rejected or failed the reset request
    #[error("Reset failed for device {device}: {reason}")]
    Reset { device: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether a run may carry on past this error when continue-on-error is set
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Reset { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
