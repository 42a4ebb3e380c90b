//! Serve command - run the gate service.

use anyhow::{Context, Result};
use changegate_client::HttpTransport;
use changegate_core::registry::CorrelationRegistry;
use changegate_executor::api::{ApiServer, AppState};
use changegate_executor::config::GateConfig;
use changegate_executor::issuer::Issuer;
use changegate_executor::orchestrator::Orchestrator;
use changegate_executor::timeout::TimeoutProcessor;
use std::sync::Arc;

/// Run the serve command.
pub async fn run(config_path: Option<&str>, host: Option<String>, port: Option<u16>) -> Result<()> {
    let mut config = match config_path {
        Some(path) => GateConfig::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path))?,
        None => {
            let mut config = GateConfig::default();
            config.apply_env_overrides(|key| std::env::var(key).ok())?;
            config
        }
    };
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    config.validate().context("Invalid configuration")?;

    let store = config.open_store().context("Failed to open registry store")?;
    let registry = Arc::new(
        CorrelationRegistry::open(store)
            .context("Failed to load registry")?
            .with_tombstone_ttl(config.wait.tombstone_ttl()),
    );

    let transport = Arc::new(HttpTransport::new().context("Failed to build HTTP transport")?);
    let issuer = Issuer::new(transport, Arc::new(config.endpoints()), Arc::clone(&registry))
        .with_public_base_url(&config.public_base_url)
        .with_tool_id(&config.tool_id)
        .with_default_timeout(config.wait.default_timeout());

    let tracker = issuer.tracker().clone();
    let orchestrator =
        Arc::new(Orchestrator::new(Arc::clone(&registry)).with_issuer(Arc::new(issuer)));
    let state = Arc::new(AppState::new(Arc::clone(&orchestrator), tracker));

    let processor = Arc::new(
        TimeoutProcessor::new(Arc::clone(&orchestrator))
            .with_check_interval(config.wait.check_interval())
            .with_retention(config.wait.tombstone_ttl()),
    );

    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        store = ?config.store.kind,
        pending = registry.pending_count(),
        "Starting changegate"
    );

    let host = &config.server.host;
    let port = config.server.port;
    println!("Starting changegate...");
    println!();
    println!("Server: http://{}:{}", host, port);
    println!("Callbacks: {}/api/v1/callbacks/<token>", config.public_base_url);
    println!();
    println!("Endpoints:");
    println!("  POST http://{}:{}/api/v1/callbacks/<token>  - Deliver a decision", host, port);
    println!("  GET  http://{}:{}/api/v1/waits              - List pending waits", host, port);
    println!("  GET  http://{}:{}/api/v1/health             - Health check", host, port);
    println!();
    println!("Press Ctrl+C to stop.");
    println!();

    let processor_handle = {
        let processor = Arc::clone(&processor);
        tokio::spawn(async move { processor.run().await })
    };

    let mut server = ApiServer::new(config.server_config(), state);
    let mut server_handle = tokio::spawn(async move { server.run().await });

    tokio::select! {
        result = &mut server_handle => {
            processor.stop();
            let _ = processor_handle.await;
            result
                .context("Server task failed")?
                .context("Server stopped")?;
            return Ok(());
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl+C")?;
        }
    }

    tracing::info!("Shutdown signal received");
    println!();
    println!("Shutting down...");

    processor.stop();
    let _ = processor_handle.await;
    server_handle.abort();

    Ok(())
}
