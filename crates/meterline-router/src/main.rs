//! Meterline router binary

use std::sync::Arc;

use meterline_common::log::{self, JetStreamSink};
use meterline_common::{shutdown::shutdown_signal, telemetry};
use meterline_router::{EventRouter, RouterConfig};
use tokio::net::UdpSocket;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_tracing();

    let config = RouterConfig::load();
    info!("Starting Meterline router v{}", meterline_common::VERSION);
    info!("Loaded configuration: {:?}", config);

    // Both failures below are fatal
    let socket = UdpSocket::bind(config.bind_addr()).await?;

    let context = log::connect(&config.nats_url).await?;
    let metrics =
        JetStreamSink::create(context.clone(), &config.metrics_topic, config.stream_max_age).await?;
    let actions =
        JetStreamSink::create(context, &config.actions_topic, config.stream_max_age).await?;

    let router = EventRouter::new(Arc::new(metrics), Arc::new(actions));
    router
        .serve(&socket, config.max_datagram_bytes, shutdown_signal())
        .await;

    Ok(())
}
