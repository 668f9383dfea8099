//! Domain-specific error types for the capture transport.
//!
//! Every variant except the codec ones is fatal for the daemon: the
//! transport performs no internal retries, so an error that reaches the
//! top level ends the process through a [`crate::FatalHandler`].

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// The canonical error type for the capture transport.
#[derive(Debug, Error)]
pub enum GatorError {
    // ── Handshake Errors ─────────────────────────────────────────
    /// The peer closed the connection before sending the magic token.
    #[error("socket disconnected before handshake completed")]
    HandshakeDisconnected,

    // ── Connection Errors ────────────────────────────────────────
    /// The TCP/IO layer reported an error.
    #[error("connection error: {0}")]
    Connection(#[from] std::io::Error),

    /// A send stalled past the watchdog deadline.
    #[error("watchdog expired after {0:?}")]
    WatchdogExpired(Duration),

    // ── Persistence Errors ───────────────────────────────────────
    /// The capture data file could not be created.
    #[error("failed to open binary file {path}: {source}")]
    DataFileOpen {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A write to the capture data file failed or came up short.
    #[error("failed writing binary file {path}: {source}")]
    DataFileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Frame Errors ─────────────────────────────────────────────
    /// The payload does not fit the 32-bit length prefix.
    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// A decoded frame header announced more bytes than allowed.
    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// Catch-all for errors that do not fit another variant.
    #[error("{0}")]
    Other(String),
}

// ── Convenient From implementations ──────────────────────────────

impl From<String> for GatorError {
    fn from(s: String) -> Self {
        GatorError::Other(s)
    }
}

impl From<&str> for GatorError {
    fn from(s: &str) -> Self {
        GatorError::Other(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let e = GatorError::HandshakeDisconnected;
        assert!(e.to_string().contains("disconnected"));

        let e = GatorError::PayloadTooLarge {
            size: 1000,
            max: 500,
        };
        assert!(e.to_string().contains("1000"));
        assert!(e.to_string().contains("500"));

        let e = GatorError::DataFileWrite {
            path: PathBuf::from("/tmp/capture/0000000000"),
            source: std::io::Error::new(std::io::ErrorKind::WriteZero, "short write"),
        };
        assert!(e.to_string().contains("0000000000"));
    }

    #[test]
    fn from_string() {
        let e: GatorError = "something broke".into();
        assert!(matches!(e, GatorError::Other(_)));
    }

    #[test]
    fn from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broke");
        let e: GatorError = io_err.into();
        assert!(matches!(e, GatorError::Connection(_)));
    }
}
