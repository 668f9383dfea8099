//! # gator-core
//!
//! Data transport for the capture daemon: moves typed byte payloads
//! from many producer threads to a collector socket and/or a local data
//! file.
//!
//! This crate contains:
//! - **Handshake**: the `STREAMLINE` / `GATOR <version>` greeting
//! - **Framing**: `FrameHeader` (`[tag u8][length u32 LE]`) and `FrameCodec`
//!   for the collector side via `tokio_util`
//! - **Flow control**: `FlowControl`, chunked sends paced by a `Watchdog`
//! - **Sender**: the `Sender` facade serialising all producers
//! - **Storage**: `DataFile`, sequentially named capture files
//! - **Error**: `GatorError` and `FatalHandler` escalation

pub mod codec;
pub mod error;
pub mod fatal;
pub mod flow;
pub mod handshake;
pub mod header;
pub mod message;
pub mod network;
pub mod sender;
pub mod session;
pub mod storage;
pub mod watchdog;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use codec::{Frame, FrameCodec, MAX_FRAME_SIZE};
pub use error::GatorError;
pub use fatal::{ExitProcess, FatalHandler, escalate};
pub use flow::{DEFAULT_DEADLINE, DEFAULT_MAX_RATE_BPS, FlowControl};
pub use handshake::{MAGIC_TOKEN, PROTOCOL_VERSION};
pub use header::{FrameHeader, HEADER_LENGTH, MAX_PAYLOAD_LENGTH};
pub use message::MessageKind;
pub use network::{Connection, PeerStream};
pub use sender::{Sender, SenderConfig, SenderStats, TcpSender};
pub use session::SessionFlag;
pub use storage::{DataFile, data_file_name};
pub use watchdog::{DeadlineTimer, Watchdog};
