//! Kafka Broker CLI
//!
//! A minimal Kafka-compatible broker serving ApiVersions,
//! DescribeTopicPartitions, Produce and Fetch from on-disk KRaft logs.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use kafka_broker_core::config::{BrokerConfig, LoggingConfig, DEFAULT_PROPERTIES_PATH};
use kafka_broker_core::handlers::Dispatcher;
use kafka_broker_core::metadata::LogScanResolver;
use kafka_broker_core::network::BrokerListener;

/// Minimal Kafka-compatible broker.
#[derive(Parser)]
#[command(name = "kafka-broker")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Kafka server.properties used to locate the metadata log.
    #[arg(default_value = DEFAULT_PROPERTIES_PATH)]
    properties: PathBuf,

    /// Path to YAML configuration file; defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override listen address.
    #[arg(long)]
    listen: Option<String>,

    /// Increase logging verbosity (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => BrokerConfig::from_file(path)?,
        None => BrokerConfig::default(),
    };

    if let Some(listen) = args.listen {
        config.listen.address = listen;
        config.validate()?;
    }

    let log_config = match args.verbose {
        0 => config.logging.clone(),
        1 => LoggingConfig {
            level: "debug".to_string(),
            ..config.logging.clone()
        },
        _ => LoggingConfig {
            level: "trace".to_string(),
            ..config.logging.clone()
        },
    };

    setup_tracing(&log_config);

    let metadata_log = config.discover_metadata_log(&args.properties);
    let log_root = config.log_root(&metadata_log);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        listen = %config.listen.address,
        metadata_log = %metadata_log.display(),
        log_root = %log_root.display(),
        "starting kafka broker"
    );
    if !metadata_log.exists() {
        warn!(
            metadata_log = %metadata_log.display(),
            "metadata log not found; topics will resolve to defaults"
        );
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async move { run_broker(config, metadata_log, log_root).await })
}

fn setup_tracing(config: &LoggingConfig) {
    let level = match config.level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json {
        subscriber.with(fmt::layer().json()).init();
    } else {
        subscriber.with(fmt::layer()).init();
    }
}

async fn run_broker(
    config: BrokerConfig,
    metadata_log: PathBuf,
    log_root: PathBuf,
) -> anyhow::Result<()> {
    let resolver = Arc::new(LogScanResolver::new(metadata_log, log_root));
    let dispatcher = Arc::new(Dispatcher::new(resolver));

    let listener = BrokerListener::bind(&config.listen, dispatcher).await?;
    let shutdown_handle = listener.shutdown_handle();

    tokio::spawn(async move {
        shutdown_signal().await;
        info!("shutdown signal received, stopping broker");
        let _ = shutdown_handle.send(());
    });

    listener.run().await?;

    info!("broker shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl+c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
