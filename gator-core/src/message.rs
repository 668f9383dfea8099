//! Message kinds carried in the frame tag byte.
//!
//! Only [`MessageKind::RawCapture`] is special to the transport: it is
//! pre-framed by its producer and mirrored to the data file. Every other
//! tag is framed by the sender and goes to the peer only.

use std::fmt;

/// Tag byte of the XML response kind.
pub const TAG_XML: u8 = 0x01;
/// Tag byte of raw capture data.
pub const TAG_RAW_CAPTURE: u8 = 0x03;
/// Tag byte of an acknowledgement.
pub const TAG_ACK: u8 = 0x04;
/// Tag byte of a negative acknowledgement.
pub const TAG_NAK: u8 = 0x05;
/// Tag byte of an error report.
pub const TAG_ERROR: u8 = 0xFF;

// ── MessageKind ──────────────────────────────────────────────────

/// The kind of a payload handed to [`crate::Sender::send`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Self-framed capture data, passed through verbatim.
    RawCapture,
    /// Any other payload, framed with this tag byte.
    Other(u8),
}

impl MessageKind {
    pub const fn xml() -> Self {
        MessageKind::Other(TAG_XML)
    }

    pub const fn ack() -> Self {
        MessageKind::Other(TAG_ACK)
    }

    pub const fn nak() -> Self {
        MessageKind::Other(TAG_NAK)
    }

    pub const fn error() -> Self {
        MessageKind::Other(TAG_ERROR)
    }

    /// The tag byte written on the wire for this kind.
    pub const fn tag(self) -> u8 {
        match self {
            MessageKind::RawCapture => TAG_RAW_CAPTURE,
            MessageKind::Other(tag) => tag,
        }
    }

    pub const fn is_raw_capture(self) -> bool {
        matches!(self, MessageKind::RawCapture)
    }
}

impl From<u8> for MessageKind {
    fn from(tag: u8) -> Self {
        match tag {
            TAG_RAW_CAPTURE => MessageKind::RawCapture,
            other => MessageKind::Other(other),
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tag() {
            TAG_XML => write!(f, "Xml"),
            TAG_RAW_CAPTURE => write!(f, "RawCapture"),
            TAG_ACK => write!(f, "Ack"),
            TAG_NAK => write!(f, "Nak"),
            TAG_ERROR => write!(f, "Error"),
            tag => write!(f, "Other({tag:#04x})"),
        }
    }
}
