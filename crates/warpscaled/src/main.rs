//! warpscaled — the WarpScale daemon.
//!
//! Assembles the scale subsystems into one process:
//! - Metrics store (redb)
//! - Monitor registry with HTTP gauge monitors from config
//! - Scale monitor service (leader-gated sampling)
//! - Scale manager
//! - REST API
//!
//! # Usage
//!
//! ```text
//! warpscaled run --config warpscale.toml --port 8470 --data-dir /var/lib/warpscale --primary
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::{error, info, warn};

use warpscale_autoscale::ScaleManager;
use warpscale_core::{MonitorProvider, PrimaryHostState, ScaleConfig, parse_duration};
use warpscale_metrics::ScaleMonitorService;
use warpscale_state::MetricsStore;
use warpscale_trigger::HttpGaugeMonitor;

#[derive(Parser)]
#[command(name = "warpscaled", about = "WarpScale daemon")]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the sampler and the decision API.
    Run {
        /// Path to warpscale.toml.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Port to listen on.
        #[arg(long, default_value = "8470")]
        port: u16,

        /// Data directory for the metrics store.
        #[arg(long, default_value = "/var/lib/warpscale")]
        data_dir: PathBuf,

        /// Sampling interval ("10s", "500ms"); overrides the config file.
        #[arg(long)]
        interval: Option<String>,

        /// Act as the primary host and take samples.
        #[arg(long)]
        primary: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match cli.command {
        Command::Run {
            config,
            port,
            data_dir,
            interval,
            primary,
        } => run(config, port, data_dir, interval, primary).await,
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,warpscale=debug,warpscaled=debug"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(
    config_path: Option<PathBuf>,
    port: u16,
    data_dir: PathBuf,
    interval: Option<String>,
    primary: bool,
) -> anyhow::Result<()> {
    info!("WarpScale daemon starting");

    let config = match &config_path {
        Some(path) => ScaleConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => ScaleConfig::default(),
    };

    let interval = match interval {
        Some(raw) => parse_interval(&raw)?,
        None => config.sampling_interval()?,
    };

    std::fs::create_dir_all(&data_dir)?;
    let db_path = data_dir.join("metrics.redb");

    // ── Initialize subsystems ──────────────────────────────────

    let store = MetricsStore::open(&db_path)?.with_max_samples(config.max_samples_per_monitor());
    info!(path = ?db_path, max_samples = store.max_samples(), "metrics store opened");

    let registry = Arc::new(MonitorProvider::new());
    for monitor in &config.monitors {
        let gauge = HttpGaugeMonitor::from_config(monitor)?;
        registry.register(Arc::new(gauge))?;
        info!(monitor = %monitor.id, address = %monitor.address, path = %monitor.path, "monitor registered");
    }

    let leadership = Arc::new(PrimaryHostState::new(primary || config.is_primary()));

    let manager = Arc::new(
        ScaleManager::new(registry.clone(), Arc::new(store.clone()))
            .with_vote_failure_policy(config.vote_failure_policy()),
    );

    let service = Arc::new(
        ScaleMonitorService::new(registry.clone(), Arc::new(store.clone()), leadership.clone())
            .with_interval(interval),
    );
    service.start()?;

    // ── Start API server ───────────────────────────────────────

    let router = warpscale_api::build_router(warpscale_api::ApiState {
        manager,
        registry,
        store,
        leadership,
        service: service.clone(),
    });
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    info!(%addr, "API server starting");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let server = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.wait_for(|stop| *stop).await;
            })
            .await
    });

    // Run until Ctrl-C or until sampling dies on an unrecoverable error.
    let sampling = service.wait();
    tokio::pin!(sampling);

    let outcome = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                warn!(error = %e, "failed to listen for shutdown signal");
            }
            info!("shutdown signal received");
            service.stop();
            (&mut sampling).await
        }
        result = &mut sampling => result,
    };

    if let Err(e) = &outcome {
        error!(error = %e, "metrics sampling terminated");
    }

    let _ = shutdown_tx.send(true);
    server.await??;
    service.dispose();

    info!("WarpScale daemon stopped");
    outcome.map_err(Into::into)
}

fn parse_interval(raw: &str) -> anyhow::Result<Duration> {
    parse_duration(raw)
        .filter(|d| !d.is_zero())
        .with_context(|| format!("invalid --interval {raw:?}"))
}
