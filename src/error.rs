use std::time::Duration;

/// Every failure the transport, the framing layer and the session can raise.
///
/// Transport and framing errors reach the caller of [`crate::Scope`]
/// unmodified; nothing is swallowed or replaced by a default value.
#[derive(Debug, thiserror::Error)]
pub enum ScopeError {
    #[error("Could not open {address}: {reason}")]
    ConnectionFailed { address: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Timeout after {timeout:?} without progress ({received} bytes buffered)")]
    Timeout { timeout: Duration, received: usize },

    #[error("Protocol format error: {0}")]
    ProtocolFormat(String),

    #[error("Invalid value '{value}' for {name}, expected {expected}")]
    InvalidArgument {
        name: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("Transport is closed")]
    NotConnected,

    #[cfg(feature = "gpib")]
    #[error("VISA error: {0}")]
    Visa(#[from] visa_rs::Error),
}

impl ScopeError {
    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        Self::ProtocolFormat(message.into())
    }

    pub(crate) fn invalid(name: &'static str, value: impl ToString, expected: &'static str) -> Self {
        Self::InvalidArgument {
            name,
            value: value.to_string(),
            expected,
        }
    }

    /// Whether retrying the failed step could succeed without reconnecting.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::ProtocolFormat(_))
    }
}

impl From<serialport::Error> for ScopeError {
    fn from(err: serialport::Error) -> Self {
        Self::Io(err.into())
    }
}
