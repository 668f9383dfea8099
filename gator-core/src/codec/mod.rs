use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::{FrameHeader, GatorError, HEADER_LENGTH, MessageKind};

/// Default ceiling on a decoded payload (64 MiB).
pub const MAX_FRAME_SIZE: usize = 64 * 1024 * 1024;

/// One decoded frame as seen by a collector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub kind: MessageKind,
    pub payload: Bytes,
}

impl Frame {
    pub fn new(kind: MessageKind, payload: impl Into<Bytes>) -> Self {
        Self {
            kind,
            payload: payload.into(),
        }
    }
}

/// Length-prefixed codec for the collector side of the wire, and for
/// producers that pre-frame raw capture blocks before handing them to
/// [`crate::Sender`].
pub struct FrameCodec {
    max_frame_size: usize,
}

impl FrameCodec {
    pub fn new() -> Self {
        Self::with_max_frame_size(MAX_FRAME_SIZE)
    }

    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl tokio_util::codec::Decoder for FrameCodec {
    type Item = Frame;
    type Error = GatorError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < HEADER_LENGTH {
            return Ok(None);
        }

        let mut raw = [0u8; HEADER_LENGTH];
        raw.copy_from_slice(&src[..HEADER_LENGTH]);
        let header = FrameHeader::from_bytes(raw);
        let length = header.payload_length() as usize;

        if length > self.max_frame_size {
            return Err(GatorError::FrameTooLarge {
                size: length,
                max: self.max_frame_size,
            });
        }
        if src.len() < HEADER_LENGTH + length {
            src.reserve(HEADER_LENGTH + length - src.len());
            return Ok(None);
        }

        src.advance(HEADER_LENGTH);
        let payload = src.split_to(length).freeze();
        Ok(Some(Frame {
            kind: header.kind(),
            payload,
        }))
    }
}

impl tokio_util::codec::Encoder<Frame> for FrameCodec {
    type Error = GatorError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if item.payload.len() > self.max_frame_size {
            return Err(GatorError::FrameTooLarge {
                size: item.payload.len(),
                max: self.max_frame_size,
            });
        }
        let header = FrameHeader::for_payload(item.kind, &item.payload)?;
        dst.reserve(HEADER_LENGTH + item.payload.len());
        dst.put_slice(&header.to_bytes());
        dst.put_slice(&item.payload);
        Ok(())
    }
}
