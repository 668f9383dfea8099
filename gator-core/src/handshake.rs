//! One-time greeting exchange with a newly attached collector.
//!
//! The collector may send legacy chatter before the magic token; those
//! lines are read and dropped. There is no timeout: the daemon has
//! nothing to do until a collector identifies itself.

use tracing::{debug, error, info};

use crate::network::Connection;
use crate::{GatorError, SessionFlag};

/// Line the collector sends to start a session.
pub const MAGIC_TOKEN: &str = "STREAMLINE";

/// Protocol version announced in the greeting reply.
pub const PROTOCOL_VERSION: u32 = 231;

/// The reply sent once [`MAGIC_TOKEN`] has been seen.
pub fn greeting() -> String {
    format!("GATOR {PROTOCOL_VERSION}\n")
}

/// Wait for the magic token, reply with the greeting and mark the
/// session as awaiting commands.
///
/// Returns how many lines were discarded before the token. A disconnect
/// or read error before the token is fatal.
pub fn negotiate<C>(conn: &mut C, session: &SessionFlag) -> Result<usize, GatorError>
where
    C: Connection + ?Sized,
{
    let mut discarded = 0;
    loop {
        match conn.receive_line() {
            Ok(Some(line)) if line == MAGIC_TOKEN => break,
            Ok(Some(line)) => {
                debug!("ignoring pre-handshake line {line:?}");
                discarded += 1;
            }
            Ok(None) => {
                error!("socket disconnected");
                return Err(GatorError::HandshakeDisconnected);
            }
            Err(e) => {
                error!("socket disconnected: {e}");
                return Err(GatorError::Connection(e));
            }
        }
    }

    // Must precede anything else on the wire.
    conn.send_all(greeting().as_bytes())?;
    session.set_waiting_on_command(true);
    info!("completed magic sequence");
    Ok(discarded)
}
