//! # gatord: capture daemon
//!
//! Streams recorded capture data to a connected collector (Streamline
//! style handshake, framed messages, watchdog-guarded chunked sends) and
//! optionally mirrors raw capture to a local data file.
//!
//! ## Modes
//!
//! - **Collector**: listen for a collector and replay the capture stream
//!   to it (default).
//! - **Local**: write the capture stream to the data directory only
//!   (`--local`).

pub mod config;
pub mod replay;
pub mod service;
