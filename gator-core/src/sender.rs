//! The transport facade shared by every producer thread.
//!
//! ```text
//! producer ─┐
//! producer ─┼─> Sender::send ──[one lock]──> header + chunks ──> collector
//! producer ─┘                            └─> raw capture ──────> data file
//! ```
//!
//! One mutex covers the entire body of [`Sender::send`], so a message's
//! header, its chunks and its file write are never interleaved with
//! another message's bytes, and the single watchdog is only ever armed
//! by one send at a time.

use std::net::TcpStream;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::flow::{DEFAULT_DEADLINE, DEFAULT_MAX_RATE_BPS, FlowControl};
use crate::network::{Connection, PeerStream};
use crate::storage::DataFile;
use crate::watchdog::{DeadlineTimer, Watchdog};
use crate::{FatalHandler, FrameHeader, GatorError, MessageKind, SessionFlag, handshake};

/// A sender talking to a collector over TCP.
pub type TcpSender = Sender<PeerStream<TcpStream>>;

/// Tuning for the flow controller and watchdog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SenderConfig {
    /// Longest a single chunk may take before the watchdog fires.
    pub deadline: Duration,
    /// Throughput ceiling in bits per second; sets the chunk size.
    pub max_rate_bps: u64,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            deadline: DEFAULT_DEADLINE,
            max_rate_bps: DEFAULT_MAX_RATE_BPS,
        }
    }
}

/// Running totals since construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SenderStats {
    /// Messages that reached the collector.
    pub frames_sent: u64,
    /// Bytes put on the wire, headers included.
    pub bytes_sent: u64,
    /// Raw capture payloads persisted.
    pub payloads_written: u64,
    /// Bytes persisted to data files.
    pub bytes_written: u64,
}

struct Sinks<C> {
    connection: Option<C>,
    data_file: Option<DataFile>,
    next_file_sequence: u32,
    stats: SenderStats,
}

/// Ships typed payloads to a collector, a data file, or both.
pub struct Sender<C: Connection, T: DeadlineTimer = Watchdog> {
    sinks: Mutex<Sinks<C>>,
    flow: FlowControl,
    watchdog: T,
}

impl<C: Connection> Sender<C, Watchdog> {
    /// Build a sender with a real watchdog that reports expiry to `fatal`.
    ///
    /// When `connection` is present this blocks until the collector has
    /// completed the handshake.
    pub fn new(
        connection: Option<C>,
        config: SenderConfig,
        session: &SessionFlag,
        fatal: Arc<dyn FatalHandler>,
    ) -> Result<Self, GatorError> {
        let watchdog = Watchdog::spawn(fatal)?;
        Self::with_timer(connection, config, session, watchdog)
    }
}

impl TcpSender {
    /// A sender with no collector, persisting to a data file only.
    pub fn file_only(config: SenderConfig, fatal: Arc<dyn FatalHandler>) -> Result<Self, GatorError> {
        Self::new(None, config, &SessionFlag::new(), fatal)
    }
}

impl<C: Connection, T: DeadlineTimer> Sender<C, T> {
    /// Build a sender around an arbitrary deadline timer.
    pub fn with_timer(
        mut connection: Option<C>,
        config: SenderConfig,
        session: &SessionFlag,
        watchdog: T,
    ) -> Result<Self, GatorError> {
        if let Some(conn) = connection.as_mut() {
            handshake::negotiate(conn, session)?;
        }
        Ok(Self {
            sinks: Mutex::new(Sinks {
                connection,
                data_file: None,
                next_file_sequence: 0,
                stats: SenderStats::default(),
            }),
            flow: FlowControl::new(config.deadline, config.max_rate_bps),
            watchdog,
        })
    }

    fn lock(&self) -> MutexGuard<'_, Sinks<C>> {
        self.sinks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn flow_control(&self) -> &FlowControl {
        &self.flow
    }

    pub fn has_connection(&self) -> bool {
        self.lock().connection.is_some()
    }

    pub fn has_data_file(&self) -> bool {
        self.lock().data_file.is_some()
    }

    pub fn stats(&self) -> SenderStats {
        self.lock().stats
    }

    /// Open the next data file under `dir`. `None` is a no-op.
    ///
    /// Any file already open is closed first. Returns the new file's path.
    pub fn create_data_file(&self, dir: Option<&Path>) -> Result<Option<PathBuf>, GatorError> {
        let Some(dir) = dir else {
            return Ok(None);
        };

        let mut sinks = self.lock();
        if let Some(previous) = sinks.data_file.take() {
            previous.close()?;
        }
        let file = DataFile::create(dir, sinks.next_file_sequence)?;
        sinks.next_file_sequence += 1;
        let path = file.path().to_path_buf();
        sinks.data_file = Some(file);
        Ok(Some(path))
    }

    /// Entry point for producers holding a raw buffer and a declared length.
    ///
    /// A negative `length`, a missing buffer with a positive `length`, or a
    /// `length` past the end of the buffer is ignored without error. A
    /// missing buffer with zero length sends an empty payload.
    pub fn write_data(
        &self,
        data: Option<&[u8]>,
        length: i64,
        kind: MessageKind,
    ) -> Result<(), GatorError> {
        let Ok(length) = usize::try_from(length) else {
            return Ok(());
        };
        let payload = match data {
            Some(data) => match data.get(..length) {
                Some(payload) => payload,
                None => {
                    warn!("ignoring {kind} payload: length {length} exceeds buffer of {}", data.len());
                    return Ok(());
                }
            },
            None if length == 0 => &[],
            None => return Ok(()),
        };
        self.send(payload, kind)
    }

    /// Send one message.
    ///
    /// To the collector (if any): raw capture payloads verbatim, anything
    /// else behind a `[tag][length LE]` header. To the data file (if open):
    /// raw capture payloads only.
    pub fn send(&self, payload: &[u8], kind: MessageKind) -> Result<(), GatorError> {
        let header = if kind.is_raw_capture() {
            None
        } else {
            Some(FrameHeader::for_payload(kind, payload)?.to_bytes())
        };

        let mut guard = self.lock();
        let sinks = &mut *guard;

        if let Some(conn) = sinks.connection.as_mut() {
            debug!("sending data with length {}", payload.len());
            self.flow
                .transmit(conn, &self.watchdog, header.as_ref().map(|h| &h[..]), payload)?;
            sinks.stats.frames_sent += 1;
            sinks.stats.bytes_sent +=
                (payload.len() + header.map_or(0, |h| h.len())) as u64;
        }

        if kind.is_raw_capture() {
            if let Some(file) = sinks.data_file.as_mut() {
                debug!("writing data with length {}", payload.len());
                file.write_payload(payload)?;
                sinks.stats.payloads_written += 1;
                sinks.stats.bytes_written += payload.len() as u64;
            }
        }

        Ok(())
    }

    /// Close the connection and the data file. Safe to call repeatedly,
    /// and on a sender that never had either.
    pub fn close(&self) -> Result<(), GatorError> {
        let mut sinks = self.lock();
        let connection = sinks.connection.take();
        let data_file = sinks.data_file.take();
        if connection.is_none() && data_file.is_none() {
            return Ok(());
        }

        let stats = sinks.stats;
        drop(sinks);
        info!(
            frames = stats.frames_sent,
            bytes_sent = stats.bytes_sent,
            bytes_written = stats.bytes_written,
            "closing sender"
        );

        let closed = match connection {
            Some(mut conn) => conn.close().map_err(GatorError::from),
            None => Ok(()),
        };
        if let Some(file) = data_file {
            file.close()?;
        }
        closed
    }
}

impl<C: Connection, T: DeadlineTimer> Drop for Sender<C, T> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("error while closing sender: {e}");
        }
    }
}
