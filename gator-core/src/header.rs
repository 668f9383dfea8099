use crate::GatorError;
use crate::MessageKind;

/// Size of the on-wire frame header: 1 tag byte + 4 length bytes.
pub const HEADER_LENGTH: usize = 5;

/// Largest payload the 32-bit length prefix can describe.
pub const MAX_PAYLOAD_LENGTH: usize = u32::MAX as usize;

pub type FrameHeaderBytes = [u8; HEADER_LENGTH];

/// `[kind: u8][length: u32 LE]`, independent of host byte order.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    kind: MessageKind,
    payload_length: u32,
}

impl FrameHeader {
    pub fn new(kind: MessageKind, payload_length: u32) -> Self {
        Self {
            kind,
            payload_length,
        }
    }

    /// Header for `payload`, failing if it overflows the length prefix.
    pub fn for_payload(kind: MessageKind, payload: &[u8]) -> Result<Self, GatorError> {
        let payload_length = u32::try_from(payload.len()).map_err(|_| GatorError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_PAYLOAD_LENGTH,
        })?;
        Ok(Self::new(kind, payload_length))
    }

    pub fn to_bytes(&self) -> FrameHeaderBytes {
        let mut header: FrameHeaderBytes = [0; HEADER_LENGTH];
        header[0] = self.kind.tag();
        header[1..5].copy_from_slice(&self.payload_length.to_le_bytes());
        header
    }

    pub fn from_bytes(bytes: FrameHeaderBytes) -> Self {
        let [tag, l0, l1, l2, l3] = bytes;
        Self {
            kind: MessageKind::from(tag),
            payload_length: u32::from_le_bytes([l0, l1, l2, l3]),
        }
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    pub fn payload_length(&self) -> u32 {
        self.payload_length
    }
}

impl std::fmt::Debug for FrameHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameHeader")
            .field("kind", &self.kind)
            .field("payload_length", &self.payload_length)
            .finish()
    }
}
