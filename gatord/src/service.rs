//! Capture daemon core logic.
//!
//! Accepts one collector at a time, hands the socket to a blocking
//! session that owns the [`Sender`], and replays the configured capture
//! stream through it. Any error a session returns is fatal and goes to
//! the daemon's [`FatalHandler`].

use std::fs::File;
use std::io::{self, Read};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::net::TcpListener;
use tracing::{error, info, warn};

use gator_core::{
    Connection, FatalHandler, GatorError, MessageKind, PeerStream, Sender, SenderStats,
    SessionFlag,
};

use crate::config::GatordConfig;
use crate::replay::CaptureReader;

// ── Session ──────────────────────────────────────────────────────

/// Run one capture session to completion on the calling thread.
///
/// Handshakes with `connection` (if any), setting `session` once the
/// collector is ready, opens the data file (if configured) and ships
/// every block of `input` as raw capture.
pub fn run_session<C, R>(
    connection: Option<C>,
    input: R,
    config: &GatordConfig,
    session: &SessionFlag,
    fatal: Arc<dyn FatalHandler>,
) -> Result<SenderStats, GatorError>
where
    C: Connection,
    R: Read,
{
    let sender = Sender::new(connection, config.to_sender_config(), session, fatal)?;
    sender.create_data_file(config.output_dir().as_deref())?;

    for block in CaptureReader::new(input) {
        let block = block.map_err(|e| GatorError::Other(format!("capture input: {e}")))?;
        sender.send(&block, MessageKind::RawCapture)?;
    }

    let stats = sender.stats();
    sender.close()?;
    Ok(stats)
}

/// Open the configured capture stream.
pub fn open_input(config: &GatordConfig) -> io::Result<Box<dyn Read + Send>> {
    match config.capture.input.as_str() {
        "-" => Ok(Box::new(io::stdin())),
        path => Ok(Box::new(File::open(path)?)),
    }
}

// ── GatordService ────────────────────────────────────────────────

/// The top-level daemon service.
pub struct GatordService {
    config: GatordConfig,
    running: Arc<AtomicBool>,
    session: SessionFlag,
    fatal: Arc<dyn FatalHandler>,
}

impl GatordService {
    pub fn new(config: GatordConfig, fatal: Arc<dyn FatalHandler>) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
            session: SessionFlag::new(),
            fatal,
        }
    }

    /// Obtain a handle that can be used to stop the service from
    /// another task.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// The session flag every collector session of this service sets.
    pub fn session(&self) -> &SessionFlag {
        &self.session
    }

    /// Signal the service to stop.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Whether the service is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Bind the configured address and serve collectors until stopped.
    pub async fn run(&self) -> Result<(), Box<dyn std::error::Error>> {
        let addr: SocketAddr = self.config.listen_address().parse()?;
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener).await
    }

    /// Serve collectors on an already bound listener.
    ///
    /// 1. Waits for a collector to connect.
    /// 2. Runs a blocking session for it (handshake, replay).
    /// 3. Escalates a failed session to the fatal handler.
    /// 4. Returns once `running` becomes `false`.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), Box<dyn std::error::Error>> {
        self.running.store(true, Ordering::SeqCst);
        info!("gatord listening on {}", listener.local_addr()?);

        while self.running.load(Ordering::SeqCst) {
            let accept = tokio::select! {
                result = listener.accept() => result,
                _ = Self::wait_for_stop(&self.running) => break,
            };

            let (stream, peer) = match accept {
                Ok(pair) => pair,
                Err(e) => {
                    warn!("accept error: {e}");
                    continue;
                }
            };
            info!("collector connected from {peer}");

            let stream = stream.into_std()?;
            stream.set_nonblocking(false)?;
            let input = open_input(&self.config)?;
            let config = self.config.clone();
            let flag = self.session.clone();
            let fatal = Arc::clone(&self.fatal);

            let session = tokio::task::spawn_blocking(move || {
                run_session(Some(PeerStream::new(stream)), input, &config, &flag, fatal)
            });

            let outcome = tokio::select! {
                outcome = session => outcome,
                _ = Self::wait_for_stop(&self.running) => {
                    warn!("stopping with a session to {peer} still running");
                    break;
                }
            };

            match outcome {
                Ok(Ok(stats)) => info!(
                    frames = stats.frames_sent,
                    bytes = stats.bytes_sent,
                    "session with {peer} ended"
                ),
                Ok(Err(e)) => self.fatal.on_fatal(&e),
                Err(e) => error!("session task failed: {e}"),
            }
        }

        self.running.store(false, Ordering::SeqCst);
        info!("gatord stopped");
        Ok(())
    }

    /// Record locally without a collector.
    pub async fn run_local(&self) -> Result<SenderStats, Box<dyn std::error::Error>> {
        if self.config.output_dir().is_none() {
            return Err("local capture needs capture.output_dir".into());
        }
        self.running.store(true, Ordering::SeqCst);

        let input = open_input(&self.config)?;
        let config = self.config.clone();
        let flag = self.session.clone();
        let fatal = Arc::clone(&self.fatal);
        let stats = tokio::task::spawn_blocking(move || {
            run_session(None::<PeerStream<TcpStream>>, input, &config, &flag, fatal)
        })
        .await??;

        self.running.store(false, Ordering::SeqCst);
        info!(bytes = stats.bytes_written, "local capture finished");
        Ok(stats)
    }

    // ── Internal ─────────────────────────────────────────────────

    /// Async helper: resolves when `running` becomes false.
    async fn wait_for_stop(running: &Arc<AtomicBool>) {
        loop {
            if !running.load(Ordering::SeqCst) {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
