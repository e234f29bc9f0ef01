//! Meterline agent binary

use meterline_agent::{AgentConfig, HttpMemoryScraper, PodIdentity, UdpTransport, UsageSampler};
use meterline_common::{shutdown::shutdown_signal, telemetry};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_tracing();

    let config = AgentConfig::load();
    info!(
        pod = %config.pod_name,
        tenant = %config.tenant,
        router = %config.router_addr,
        "Starting Meterline agent v{}",
        meterline_common::VERSION
    );

    let transport = UdpTransport::connect(&config.router_addr).await?;
    let scraper = HttpMemoryScraper::new(
        &config.metrics_url,
        &config.memory_metric_key,
        config.scrape_timeout,
    )?;

    let sampler = UsageSampler::new(
        PodIdentity {
            pod: config.pod_name.clone(),
            tenant: config.tenant.clone(),
        },
        config.scrape_interval,
        scraper,
        transport,
    );

    sampler.run(shutdown_signal()).await;

    Ok(())
}
