//! # haluxd: halux daemon
//!
//! Composition root that wires all adapters together and starts the server.
//!
//! ## Responsibilities
//! - Load configuration (config file, env vars) and initialise tracing
//! - Seed the device catalog and bind the stock operation handlers
//! - Connect the selected bus gateway (MQTT broker or in-process loopback)
//! - Drive the dispatcher from the inbound channel
//! - Build the axum router, bind to a TCP port and serve
//! - Handle graceful shutdown (Ctrl-C)
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer, no domain logic belongs here.

mod config;

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use halux_adapter_http_axum::router;
use halux_adapter_http_axum::state::AppState;
use halux_adapter_mqtt::MqttGateway;
use halux_app::catalog::InMemoryDeviceCatalog;
use halux_app::dispatcher::Dispatcher;
use halux_app::handlers;
use halux_app::loopback::LoopbackGateway;
use halux_app::message_log::MessageLog;
use halux_app::ports::{InboundMessage, PublisherGateway};
use halux_app::registry::OperationRegistry;

use crate::config::{Config, GatewayKind};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    init_tracing(&config.logging.filter);

    // Core
    let catalog: Arc<InMemoryDeviceCatalog> = Arc::new(config.devices.iter().cloned().collect());
    let registry = Arc::new(OperationRegistry::new());
    handlers::register_defaults(&registry, Arc::clone(&catalog));
    let log = Arc::new(match config.dispatcher.retention {
        Some(retention) => MessageLog::with_retention(retention),
        None => MessageLog::new(),
    });
    tracing::info!(
        devices = catalog.len(),
        bindings = registry.len(),
        "core initialised"
    );

    // Gateway
    match config.gateway {
        GatewayKind::Mqtt => {
            let (inbound_tx, inbound_rx) = mpsc::channel(config.mqtt.channel_capacity);
            let (gateway, event_loop) = MqttGateway::new(&config.mqtt, inbound_tx);
            let gateway = Arc::new(gateway);
            let connection = event_loop.start();
            tracing::info!(
                broker = %format!("{}:{}", config.mqtt.broker_host, config.mqtt.broker_port),
                client_id = %config.mqtt.client_id,
                "MQTT gateway started"
            );

            serve(&config, registry, log, Arc::clone(&gateway), inbound_rx).await?;

            if let Err(err) = gateway.disconnect().await {
                tracing::warn!(%err, "failed to disconnect from broker");
            }
            connection.abort();
        }
        GatewayKind::Loopback => {
            let (gateway, inbound_rx) = LoopbackGateway::new(config.mqtt.channel_capacity);
            tracing::info!("loopback gateway started");
            serve(&config, registry, log, gateway, inbound_rx).await?;
        }
    }

    tracing::info!("haluxd stopped");
    Ok(())
}

fn init_tracing(filter: &str) {
    let env_filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Subscribe the configured filters, run the dispatcher and serve HTTP until
/// shutdown.
async fn serve<G>(
    config: &Config,
    registry: Arc<OperationRegistry>,
    log: Arc<MessageLog>,
    gateway: G,
    inbound: mpsc::Receiver<InboundMessage>,
) -> Result<(), Box<dyn std::error::Error>>
where
    G: PublisherGateway + Send + Sync + 'static,
{
    for filter in &config.mqtt.topic_filters {
        gateway.subscribe(filter, config.mqtt.qos).await?;
    }

    let dispatcher = Arc::new(
        Dispatcher::new(registry, log, gateway)
            .with_publish_timeout(config.dispatcher.publish_timeout()),
    );
    let worker = tokio::spawn({
        let dispatcher = Arc::clone(&dispatcher);
        async move { dispatcher.run(inbound).await }
    });

    let app = router::build(AppState::from_arc(dispatcher));
    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "haluxd listening on http://{bind_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    worker.abort();
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown signal received"),
        Err(err) => {
            tracing::error!(%err, "failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}
