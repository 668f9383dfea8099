pub mod connection;

pub use connection::{Connection, MAX_LINE_LENGTH, PeerStream, Shutdownable};
