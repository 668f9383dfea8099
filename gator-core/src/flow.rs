//! Chunked transmission under the watchdog.
//!
//! The throughput ceiling and the watchdog deadline together fix the
//! chunk size: `chunk = rate_bps * deadline / 8`. Each chunk must leave
//! within one deadline, so a peer slower than the ceiling trips the
//! watchdog instead of wedging the sender forever.

use std::time::Duration;

use tracing::debug;

use crate::network::Connection;
use crate::watchdog::{ArmedDeadline, DeadlineTimer};
use crate::GatorError;

/// Default watchdog deadline per chunk.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(8);

/// Default throughput ceiling in bits per second (100 kbit/s).
pub const DEFAULT_MAX_RATE_BPS: u64 = 100 * 1000;

/// Splits payloads into deadline-sized chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowControl {
    deadline: Duration,
    chunk_size: usize,
}

impl FlowControl {
    pub fn new(deadline: Duration, max_rate_bps: u64) -> Self {
        let bytes = u128::from(max_rate_bps) * deadline.as_millis() / 8_000;
        let chunk_size = usize::try_from(bytes).unwrap_or(usize::MAX).max(1);
        Self {
            deadline,
            chunk_size,
        }
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Send `header` (if any) and `payload` to `conn`.
    ///
    /// The timer is armed before the first write, re-armed before every
    /// chunk after the first, and disarmed when this returns, on success
    /// or error alike.
    pub fn transmit<C, T>(
        &self,
        conn: &mut C,
        timer: &T,
        header: Option<&[u8]>,
        payload: &[u8],
    ) -> Result<usize, GatorError>
    where
        C: Connection + ?Sized,
        T: DeadlineTimer + ?Sized,
    {
        let _armed = ArmedDeadline::arm(timer, self.deadline);

        if let Some(header) = header {
            conn.send_all(header)?;
        }

        let mut chunks = 0;
        for chunk in payload.chunks(self.chunk_size) {
            if chunks > 0 {
                timer.arm(self.deadline);
                debug!("resetting the watchdog");
            }
            conn.send_all(chunk)?;
            chunks += 1;
        }
        Ok(chunks)
    }
}

impl Default for FlowControl {
    fn default() -> Self {
        Self::new(DEFAULT_DEADLINE, DEFAULT_MAX_RATE_BPS)
    }
}
