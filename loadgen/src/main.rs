//! Connection Load Generator
//!
//! Opens a configurable number of TCP, TLS or WebSocket connections to one
//! target address, optionally throttled to a fixed connection rate, holds them
//! open for a while, then tears them all down and reports per-connection
//! timing and outcome.
// This is the main entry point. It is responsible for:
// - Initializing logging and resolving the configuration.
// - Building the transport and running one batch through the `LoadGenerator`.
// - Exiting non-zero when the configuration cannot be resolved.

// Use jemalloc as the global allocator for better performance
#[cfg(not(target_os = "windows"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod attempt;
mod config;
mod dial_tcp;
mod dial_tls;
mod dial_ws;
mod governor;
mod registry;
mod report;
mod scheduler;
mod transport;

use config::{ConfigManager, ConfigOverrides};
use registry::hold_then_teardown;
use report::ProgressReporter;
use scheduler::{DialPhase, DialScheduler};
use shared::{parse_duration, LoadConfig, ScheduleMode, TransportKind};
use transport::{Connector, Dialer};

/// Command-line arguments for the load generator
#[derive(Parser, Debug)]
#[command(name = "loadgen")]
#[command(about = "Opens bursts of TCP/TLS/WebSocket connections, holds them, then tears them down", long_about = None)]
struct CliArgs {
    /// The address to connect to, e.g. www.myhost.com:443
    #[arg(long, value_name = "HOST:PORT")]
    address: Option<String>,

    /// Transport to dial with: tcp, tls, ws or tls-ws [default: tls]
    #[arg(long, value_name = "KIND")]
    transport: Option<TransportKind>,

    /// Number of connections to open [default: 100]
    #[arg(long = "connections", value_name = "N")]
    connections: Option<u32>,

    /// Connection rate in connections per second, 0 means no rate limit [default: 0]
    #[arg(long, value_name = "PER_SECOND")]
    rate: Option<u32>,

    /// How long to keep connections open before tearing them down, e.g. 30s or 5m [default: 5m]
    #[arg(long, alias = "wait", value_name = "DURATION", value_parser = parse_duration)]
    hold: Option<Duration>,

    /// Scheduling mode: sequential or concurrent [default: sequential]
    #[arg(long, value_name = "MODE")]
    mode: Option<ScheduleMode>,

    /// Result channel capacity in concurrent mode [default: 1000]
    #[arg(long = "channel-buffer-size", value_name = "N")]
    channel_buffer_size: Option<usize>,

    /// Optional TOML file with load settings; command-line flags take precedence
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Also write JSON logs to a daily rolling file in this directory
    #[arg(long = "log-dir", value_name = "DIR")]
    log_dir: Option<PathBuf>,
}

impl CliArgs {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            address: self.address.clone(),
            transport: self.transport,
            max_connections: self.connections,
            rate: self.rate,
            hold: self.hold,
            mode: self.mode,
            channel_buffer_size: self.channel_buffer_size,
        }
    }
}

/// Outcome of one complete batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub attempts: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Registry size when teardown began
    pub registered: usize,
    pub closed: usize,
    pub close_errors: usize,
}

/// Runs one batch: dial phase, hold, teardown.
pub struct LoadGenerator {
    config: LoadConfig,
}

impl LoadGenerator {
    /// Create a generator for an already validated configuration
    pub fn new(config: LoadConfig) -> Self {
        Self { config }
    }

    /// Dial the configured target with the configured transport
    pub async fn run<W: Write>(&self, out: W) -> Result<RunSummary> {
        let connector = Connector::new(&self.config.address, self.config.transport)
            .context("Failed to prepare transport")?;

        if self.config.transport.uses_tls() {
            warn!("TLS certificate verification is disabled for this run");
        }
        info!(
            address = %self.config.address,
            transport = %connector.kind(),
            "Transport ready"
        );

        Ok(self.run_with(connector, out).await)
    }

    /// Run the batch through any dialer
    pub async fn run_with<D: Dialer, W: Write>(&self, dialer: D, out: W) -> RunSummary {
        let mut reporter = ProgressReporter::new(out, self.config.max_connections);
        let scheduler = DialScheduler::from_config(dialer, &self.config);

        let phase = scheduler.run(&mut reporter).await;
        let (succeeded, failed) = (phase.succeeded(), phase.failed());
        let DialPhase {
            attempts, registry, ..
        } = phase;
        let registered = registry.len();

        let teardown = hold_then_teardown(registry, self.config.hold, &mut reporter).await;
        debug_assert_eq!(teardown.attempted, registered);
        reporter.done();

        RunSummary {
            attempts: attempts.len(),
            succeeded,
            failed,
            registered,
            closed: teardown.closed,
            close_errors: teardown.errors.len(),
        }
    }
}

/// Set up `tracing`: compact text on stderr, plus JSON to a daily file when a
/// log directory is given. The returned guard must live until exit.
fn init_logging(log_dir: Option<&Path>) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    // Configure logging with proper RUST_LOG environment variable handling
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        // Default directives are only used if RUST_LOG is not set
        tracing_subscriber::EnvFilter::new("loadgen=info,shared=info")
    });

    let stderr_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(std::io::stderr);

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let file_appender = tracing_appender::rolling::daily(dir, "loadgen.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(non_blocking);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();
    let _guard = init_logging(cli_args.log_dir.as_deref());

    info!("Connection load generator starting up");
    if let Some(path) = &cli_args.config {
        info!("Configuration file: {}", path.display());
    }

    let config = match resolve_config(&cli_args).await {
        Ok(config) => config,
        Err(e) => {
            error!("FATAL ERROR: Invalid configuration");
            error!("Error: {}", e);

            // Print the full error chain to show all context
            let mut current_error = e.source();
            while let Some(err) = current_error {
                error!("  Caused by: {}", err);
                current_error = err.source();
            }
            error!("Run with --help to see the available options.");
            std::process::exit(1);
        }
    };

    info!(
        address = %config.address,
        transport = %config.transport,
        connections = config.max_connections,
        rate = config.rate,
        hold = %shared::format_duration(config.hold),
        mode = %config.mode,
        "Configuration loaded"
    );

    let generator = LoadGenerator::new(config);
    let summary = generator.run(std::io::stdout()).await?;

    info!(
        attempts = summary.attempts,
        succeeded = summary.succeeded,
        failed = summary.failed,
        closed = summary.closed,
        close_errors = summary.close_errors,
        "Run complete"
    );
    Ok(())
}

async fn resolve_config(cli_args: &CliArgs) -> Result<LoadConfig> {
    let mut manager = ConfigManager::new(cli_args.config.clone())?;
    let config = manager.load_config(&cli_args.overrides()).await?;
    Ok(config.clone())
}

#[cfg(test)]
mod tests;
