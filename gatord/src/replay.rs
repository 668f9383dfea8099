//! Capture replay source.
//!
//! Reads a stream of pre-framed raw capture blocks (the same layout the
//! data file holds) and yields each block whole, header included, ready
//! to hand to the sender as raw capture.

use std::io::{self, Read};

use gator_core::{FrameHeader, HEADER_LENGTH};

/// Iterator over the blocks of a capture stream.
pub struct CaptureReader<R: Read> {
    inner: R,
    done: bool,
}

impl<R: Read> CaptureReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, done: false }
    }

    fn next_block(&mut self) -> io::Result<Option<Vec<u8>>> {
        let mut header = [0u8; HEADER_LENGTH];
        let mut filled = 0;
        while filled < HEADER_LENGTH {
            match self.inner.read(&mut header[filled..]) {
                Ok(0) if filled == 0 => return Ok(None),
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "capture stream ended inside a block header",
                    ));
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }

        let length = FrameHeader::from_bytes(header).payload_length() as usize;
        let mut block = Vec::with_capacity(HEADER_LENGTH + length);
        block.extend_from_slice(&header);
        block.resize(HEADER_LENGTH + length, 0);
        self.inner.read_exact(&mut block[HEADER_LENGTH..])?;
        Ok(Some(block))
    }
}

impl<R: Read> Iterator for CaptureReader<R> {
    type Item = io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_block() {
            Ok(Some(block)) => Some(Ok(block)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
