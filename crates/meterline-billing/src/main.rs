//! Meterline billing binary

use std::sync::Arc;

use meterline_billing::pricing::{CachedTariffSource, PriceServiceClient, TariffSource};
use meterline_billing::store::ClickHouseStore;
use meterline_billing::{
    http, run_consumer, BillingAggregator, BillingConfig, ConsumerExit, NotificationPool,
};
use meterline_common::log::{self, JetStreamSink};
use meterline_common::{shutdown::shutdown_signal, telemetry};
use tokio::sync::watch;
use tracing::{error, info};

async fn stopped(mut rx: watch::Receiver<bool>) {
    while !*rx.borrow() {
        if rx.changed().await.is_err() {
            break;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_tracing();

    let config = BillingConfig::load();
    info!("Starting Meterline billing v{}", meterline_common::VERSION);
    info!("Loaded configuration: {:?}", config);

    let store = ClickHouseStore::new(config.store.clone(), config.request_timeout)?;
    store.ping().await?;
    info!(url = %config.store.url, "Usage store reachable");

    let price_service: Arc<dyn TariffSource> = Arc::new(PriceServiceClient::new(
        &config.price_service_url,
        config.request_timeout,
    )?);
    let tariffs: Arc<dyn TariffSource> = if config.tariff_cache_ttl.is_zero() {
        price_service
    } else {
        Arc::new(CachedTariffSource::new(
            price_service,
            config.tariff_cache_ttl,
            config.tariff_cache_max_entries,
        ))
    };

    let context = log::connect(&config.nats_url).await?;
    let notify =
        JetStreamSink::create(context.clone(), &config.notify_topic, config.stream_max_age).await?;
    let actions = log::subscribe(
        &context,
        &config.actions_topic,
        &config.consumer_group,
        config.stream_max_age,
    )
    .await?;

    let aggregator = Arc::new(BillingAggregator::new(
        Arc::new(store),
        tariffs,
        Arc::new(notify),
        config.default_tariff_id,
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let shutdown_tx = Arc::new(shutdown_tx);
    {
        let shutdown_tx = shutdown_tx.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            let _ = shutdown_tx.send(true);
        });
    }

    // HTTP server
    let listener = tokio::net::TcpListener::bind(config.listen_addr()).await?;
    info!("Billing API listening on {}", config.listen_addr());
    let server = {
        let app = http::router(aggregator.clone());
        let shutdown = stopped(shutdown_rx.clone());
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown)
                .await
            {
                error!("HTTP server error: {}", e);
            }
        })
    };

    // Actions consumer
    let pool = NotificationPool::start(
        aggregator,
        config.notify_workers,
        config.notify_queue_capacity,
    );
    let exit = run_consumer(actions, &pool, stopped(shutdown_rx)).await;
    if let ConsumerExit::StreamEnded(_) = exit {
        // Take the HTTP server down with the consumer
        let _ = shutdown_tx.send(true);
    }
    pool.shutdown().await;

    if let Err(e) = server.await {
        error!("HTTP server task failed: {}", e);
    }

    if let ConsumerExit::StreamEnded(stats) = exit {
        anyhow::bail!(
            "actions consumer ended after {} records; stop actions are no longer handled",
            stats.read
        );
    }

    info!("Billing service stopped");
    Ok(())
}
