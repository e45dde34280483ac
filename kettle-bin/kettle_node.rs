use std::{path::Path, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use dotenvy::dotenv;
use kettle_p2p::{KettleP2pConfig, KettleP2pNode, Transport};
use kettle_store::{KettleStoreConfig, StoreEngine};
use kettle_types::{MessageSigner, Secp256k1Signer};
use tokio::{sync::watch, try_join};
use tracing::{error, info, instrument};
use tracing_appender::{
    non_blocking,
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan, time::UtcTime},
    prelude::*,
    EnvFilter, Registry,
};

/// The name of the environment variable holding the kettle's hex-encoded
/// secp256k1 private key
const KETTLE_PRIVATE_KEY: &str = "KETTLE_PRIVATE_KEY";
/// The directory where the logs are stored.
const LOGS: &str = "./logs";
/// The log file name.
const LOG_FILE: &str = "kettle-node.log";

/// Command line arguments for the kettle node
#[derive(Parser)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config_path: String,
}

/// Configuration for the kettle node.
///
/// This struct holds the configuration settings for the store engine and
/// the P2P replication layer, loaded from one shared configuration file.
#[derive(Debug)]
struct Config {
    /// Configuration for the confidential store engine.
    store: KettleStoreConfig,

    /// Configuration for the P2P component.
    p2p: KettleP2pConfig,
}

impl Config {
    fn load(path: &str) -> Self {
        Self {
            store: KettleStoreConfig::from_file_path(path),
            p2p: KettleP2pConfig::from_file_path(path),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _log_guard = setup_logging(LOGS).context("Failed to setup logging")?;
    dotenv().ok();

    let args = Args::parse();
    let config = Config::load(&args.config_path);

    info!("Starting kettle node");

    let (shutdown_sender, shutdown_receiver) = watch::channel(false);
    let (outbound_sender, outbound_receiver) = flume::unbounded();
    let (inbound_sender, inbound_receiver) = flume::unbounded();

    let signer = load_signer()?;
    info!(
        target = "kettle-node",
        event = "kettle_identity",
        address = %signer.address(),
        "Loaded kettle signing identity"
    );

    let engine = Arc::new(StoreEngine::new(config.store, Arc::new(signer)));
    engine.start(outbound_sender, inbound_receiver).await;

    info!(
        target = "kettle-node",
        event = "p2p_service_spawn",
        listen_addrs = ?config.p2p.listen_addrs,
        "Spawning p2p service"
    );
    let node = KettleP2pNode::start(&config.p2p)?;
    let transport_shutdown_receiver = shutdown_receiver.clone();
    let transport_handle = tokio::spawn(async move {
        node.run(outbound_receiver, inbound_sender, transport_shutdown_receiver)
            .await
            .map_err(anyhow::Error::from)
    });

    let signal_engine = Arc::clone(&engine);
    let signal_handle = tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for the shutdown signal")?;
        info!(
            target = "kettle-node",
            event = "shutdown_signal",
            "Shutdown signal received, stopping services"
        );
        shutdown_sender.send(true).ok();
        signal_engine.stop().await;
        Ok::<(), anyhow::Error>(())
    });

    let (transport_result, signal_result) = try_join!(transport_handle, signal_handle)?;
    handle_tasks_results(transport_result, signal_result)?;

    info!(
        target = "kettle-node",
        event = "kettle_node_shutdown",
        "Kettle node shut down successfully"
    );
    Ok(())
}

/// Loads the kettle's replication signing identity from the environment
fn load_signer() -> Result<Secp256k1Signer> {
    let hex_key = std::env::var(KETTLE_PRIVATE_KEY).context(format!(
        "Variable {KETTLE_PRIVATE_KEY} not set in the .env file"
    ))?;
    let key_bytes = hex::decode(hex_key.trim_start_matches("0x"))
        .context("Kettle private key is not valid hex")?;
    Secp256k1Signer::from_slice(&key_bytes)
        .context("Kettle private key is not a valid secp256k1 scalar")
}

/// Configure logging with JSON formatting, file output, and console output
fn setup_logging<P: AsRef<Path>>(log_dir: P) -> Result<WorkerGuard> {
    // Set up file appender with rotation
    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, LOG_FILE);

    // Create a non-blocking writer
    let (non_blocking_appender, guard) = non_blocking(file_appender);

    // Create JSON formatter for file output
    let file_layer = fmt::layer()
        .json()
        .with_timer(UtcTime::rfc_3339())
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_appender);

    // Create console formatter for development
    let console_layer = fmt::layer()
        .pretty()
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_file(true)
        .with_span_events(FmtSpan::ENTER);

    // Create filter from environment variable or default to info
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,kettle_node=debug"));

    // Combine layers with filter
    Registry::default()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(guard)
}

/// Handles the results of the transport and shutdown-signal tasks.
///
/// If either task returns an error, it is logged and propagated so the
/// process exits with a failure status.
#[instrument(level = "info", skip(transport_result, signal_result))]
fn handle_tasks_results(transport_result: Result<()>, signal_result: Result<()>) -> Result<()> {
    let result_handler = |result: Result<()>, message: &str| {
        if let Err(e) = result {
            error!(
                target = "kettle-node",
                event = "kettle_node_shutdown",
                error = ?e,
                "{message}"
            );
            return Err(e);
        }
        Ok(())
    };
    result_handler(transport_result, "P2P transport terminated abruptly")?;
    result_handler(signal_result, "Shutdown handler terminated abruptly")?;
    Ok(())
}
