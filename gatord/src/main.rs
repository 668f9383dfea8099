//! gatord entry point.
//!
//! ```text
//! gatord                          Serve collectors, capture from stdin
//! gatord --config <path>          Load a custom config TOML
//! gatord --input <file>           Replay a recorded capture stream
//! gatord --output <dir>           Also write raw capture to <dir>/0000000000
//! gatord --local --output <dir>   Record locally, no collector
//! gatord --gen-config             Write default config to stdout
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use gator_core::{ExitProcess, FatalHandler};
use gatord::config::GatordConfig;
use gatord::service::GatordService;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "gatord", about = "Capture daemon streaming samples to a collector")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "gatord.toml")]
    config: PathBuf,

    /// Override the collector port.
    #[arg(short, long)]
    port: Option<u16>,

    /// Capture stream to ship ("-" for stdin).
    #[arg(short, long)]
    input: Option<String>,

    /// Directory for the local data file.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Record to the output directory without a collector.
    #[arg(long)]
    local: bool,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // --gen-config: dump defaults and exit.
    if cli.gen_config {
        let text = toml::to_string_pretty(&GatordConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    // Load config, then apply CLI overrides.
    let mut config = GatordConfig::load(&cli.config);
    if let Some(port) = cli.port {
        config.network.port = port;
    }
    if let Some(input) = cli.input {
        config.capture.input = input;
    }
    if let Some(output) = cli.output {
        config.capture.output_dir = output.display().to_string();
    }

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("gatord v{}", env!("CARGO_PKG_VERSION"));
    info!("protocol version: {}", gator_core::PROTOCOL_VERSION);
    info!("capture input: {}", config.capture.input);
    info!("watchdog deadline: {}s", config.transport.deadline_secs);
    info!("rate ceiling: {} kbit/s", config.transport.max_rate_kbps);

    let fatal: Arc<dyn FatalHandler> = Arc::new(ExitProcess::default());
    let service = GatordService::new(config, fatal);

    if cli.local {
        service.run_local().await?;
        return Ok(());
    }

    let stop = service.stop_handle();

    // Ctrl-C handler.
    let stop_clone = stop.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Ctrl-C received, shutting down");
        stop_clone.store(false, std::sync::atomic::Ordering::SeqCst);
    });

    service.run().await?;

    // A session blocked in a send cannot be joined; leave without waiting.
    std::process::exit(0);
}
