use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{Shutdown, TcpStream};

/// Longest line the handshake reader will return in one piece. Longer
/// lines arrive as several fragments.
pub const MAX_LINE_LENGTH: usize = 64;

/// Blocking peer primitives the transport needs from a socket.
pub trait Connection: Send {
    /// Read one line, without its terminator. `Ok(None)` means the peer
    /// closed the stream.
    fn receive_line(&mut self) -> io::Result<Option<String>>;

    /// Write every byte of `bytes` or fail.
    fn send_all(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Close the connection. Calling it again is a no-op.
    fn close(&mut self) -> io::Result<()>;
}

/// Lets a stream be half-closed before it is dropped.
pub trait Shutdownable {
    fn shutdown_stream(&self) -> io::Result<()>;
}

impl Shutdownable for TcpStream {
    fn shutdown_stream(&self) -> io::Result<()> {
        match self.shutdown(Shutdown::Both) {
            // The peer may already be gone.
            Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            other => other,
        }
    }
}

/// A collector connection over any blocking byte stream.
#[derive(Debug)]
pub struct PeerStream<S: Read + Write> {
    inner: Option<BufReader<S>>,
}

impl<S: Read + Write> PeerStream<S> {
    pub fn new(stream: S) -> Self {
        Self {
            inner: Some(BufReader::new(stream)),
        }
    }

    pub fn is_open(&self) -> bool {
        self.inner.is_some()
    }

    fn reader(&mut self) -> io::Result<&mut BufReader<S>> {
        self.inner
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "connection closed"))
    }
}

impl<S> Connection for PeerStream<S>
where
    S: Read + Write + Shutdownable + Send,
{
    fn receive_line(&mut self) -> io::Result<Option<String>> {
        let reader = self.reader()?;
        let mut line = Vec::with_capacity(MAX_LINE_LENGTH);
        let n = reader
            .by_ref()
            .take(MAX_LINE_LENGTH as u64)
            .read_until(b'\n', &mut line)?;
        if n == 0 {
            return Ok(None);
        }
        while matches!(line.last(), Some(b'\n' | b'\r' | b'\0')) {
            line.pop();
        }
        Ok(Some(String::from_utf8_lossy(&line).into_owned()))
    }

    fn send_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        let stream = self.reader()?.get_mut();
        stream.write_all(bytes)?;
        stream.flush()
    }

    fn close(&mut self) -> io::Result<()> {
        match self.inner.take() {
            Some(reader) => reader.get_ref().shutdown_stream(),
            None => Ok(()),
        }
    }
}
