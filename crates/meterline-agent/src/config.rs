//! Agent configuration

use std::time::Duration;

use meterline_common::env;
use serde::{Deserialize, Serialize};

/// Usage sampler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Router datagram address (host:port)
    pub router_addr: String,
    /// Owning tenant
    pub tenant: String,
    /// Function instance name
    pub pod_name: String,
    /// Text metrics document to scrape
    pub metrics_url: String,
    /// Metric name prefix carrying heap bytes
    pub memory_metric_key: String,
    /// Sampling interval
    pub scrape_interval: Duration,
    /// Upper bound on a single scrape
    pub scrape_timeout: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            router_addr: format!("localhost:{}", meterline_common::DEFAULT_ROUTER_PORT),
            tenant: String::new(),
            pod_name: String::new(),
            metrics_url: "http://localhost:9091/metrics".to_string(),
            memory_metric_key: "revision_go_heap_alloc".to_string(),
            scrape_interval: Duration::from_secs(1),
            scrape_timeout: Duration::from_millis(2000),
        }
    }
}

impl AgentConfig {
    /// Load configuration from `.env` and the environment
    pub fn load() -> Self {
        env::load_dotenv();

        let mut cfg = Self::default();

        if let Some(addr) = env::var("METER_URL") {
            cfg.router_addr = addr;
        }
        cfg.tenant = env::var_or("TENANT", "");
        cfg.pod_name = env::var("POD_NAME")
            .or_else(hostname)
            .unwrap_or_default();

        if let Some(url) = env::var("KNATIVE_METRICS_URL") {
            cfg.metrics_url = url;
        }
        if let Some(key) = env::var("MEMORY_METRIC_KEY") {
            cfg.memory_metric_key = key;
        }
        if let Some(secs) = env::parse::<u64>("SCRAPE_INTERVAL_SEC").filter(|s| *s > 0) {
            cfg.scrape_interval = Duration::from_secs(secs);
        }
        if let Some(ms) = env::parse::<u64>("SCRAPE_TIMEOUT_MS").filter(|ms| *ms > 0) {
            cfg.scrape_timeout = Duration::from_millis(ms);
        }

        cfg
    }
}

fn hostname() -> Option<String> {
    env::var("HOSTNAME").or_else(|| {
        std::fs::read_to_string("/etc/hostname")
            .ok()
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AgentConfig::default();
        assert_eq!(cfg.router_addr, "localhost:5461");
        assert_eq!(cfg.scrape_interval, Duration::from_secs(1));
        assert_eq!(cfg.memory_metric_key, "revision_go_heap_alloc");
    }
}
