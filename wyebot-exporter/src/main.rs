//! Prometheus exporter for the Wyebot sensor fleet.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::watch;
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

use wyebot_api::{HttpTransport, WyebotClient};
use wyebot_exporter::config::LogFormat;
use wyebot_exporter::{CycleRunner, ExporterConfig, HttpServer, MetricRegistry, Scheduler};

/// Prometheus exporter for the Wyebot sensor fleet.
#[derive(Parser, Debug)]
#[command(name = "wyebot-exporter")]
#[command(about = "Poll the Wyebot API and export its data as Prometheus metrics")]
#[command(version)]
struct Args {
    /// Path to configuration file (JSON5 format).
    #[arg(short, long)]
    config: Option<String>,

    /// HTTP listen address (overrides config).
    #[arg(long)]
    listen: Option<String>,

    /// Wyebot API key (overrides config).
    #[arg(long, env = "WYEBOT_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Log level (trace, debug, info, warn, error). Overrides config.
    #[arg(long)]
    log_level: Option<String>,

    /// Run a single collection cycle, print the exposition and exit.
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = if let Some(config_path) = &args.config {
        ExporterConfig::load_from_file(config_path)?
    } else {
        ExporterConfig::default()
    };

    if let Some(listen) = args.listen {
        config.prometheus.listen = listen;
    }
    if let Some(api_key) = args.api_key {
        config.api.api_key = api_key;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    config.validate()?;

    // Initialize logging
    let log_level = config.logging.level.parse().unwrap_or(Level::INFO);
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("wyebot_exporter={}", log_level).parse()?)
        .add_directive(format!("wyebot_api={}", log_level).parse()?);

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .json()
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }

    info!(config = ?config, "Starting Wyebot exporter");
    if config.api.api_key.is_empty() {
        warn!("No API key configured, requests will likely be rejected");
    }

    let registry = Arc::new(MetricRegistry::new(
        &config.prometheus,
        config.collection.max_series,
        &config.filters,
    ));

    let transport = HttpTransport::new(
        &config.api.base_url,
        &config.api.api_key,
        config.api.timeout(),
    )?;
    let runner = CycleRunner::new(
        WyebotClient::new(transport),
        registry.clone(),
        config.collection.test_results_lookback(),
    );
    let scheduler = Scheduler::new(runner, config.collection.interval());

    if args.once {
        let outcome = scheduler.run_once().await;
        print!("{}", registry.render());
        if !outcome.is_completed() {
            anyhow::bail!("collection cycle aborted");
        }
        return Ok(());
    }

    // Create shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let listen_addr = config
        .prometheus
        .listen
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid listen address: {}", e))?;

    // Bind before polling so a taken port fails startup
    let http_server = HttpServer::new(registry.clone(), listen_addr, config.prometheus.path.clone())
        .bind()
        .await?;

    let http_shutdown = shutdown_rx.clone();
    let http_task = tokio::spawn(async move {
        if let Err(e) = http_server.serve(http_shutdown).await {
            error!("HTTP server error: {}", e);
        }
    });

    let scheduler_shutdown = shutdown_rx.clone();
    let scheduler_task = tokio::spawn(async move {
        scheduler.run(scheduler_shutdown).await;
    });

    // Wait for shutdown signal
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate() => {
            info!("Received SIGTERM, shutting down...");
        }
    }

    shutdown_tx.send(true)?;

    // An in-flight cycle is bounded by the request timeout
    let grace = config.api.timeout() + Duration::from_secs(5);
    if tokio::time::timeout(grace, async {
        let _ = scheduler_task.await;
        let _ = http_task.await;
    })
    .await
    .is_err()
    {
        warn!("Tasks did not stop within {:?}", grace);
    }

    let stats = registry.stats();
    info!(
        samples_received = stats.samples_received,
        samples_accepted = stats.samples_accepted,
        samples_filtered = stats.samples_filtered,
        series_count = registry.series_count(),
        "Final statistics"
    );

    info!("Exporter stopped");
    Ok(())
}

#[cfg(unix)]
async fn terminate() {
    match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            warn!(error = %e, "Cannot listen for SIGTERM");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}
