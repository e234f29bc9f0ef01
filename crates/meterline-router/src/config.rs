//! Router configuration

use std::time::Duration;

use meterline_common::env;
use serde::{Deserialize, Serialize};

/// Event router configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Datagram bind host
    pub bind_host: String,
    /// Datagram bind port
    pub udp_port: u16,
    /// NATS server URLs (comma-separated)
    pub nats_url: String,
    /// Topic receiving metric payloads
    pub metrics_topic: String,
    /// Topic receiving action payloads
    pub actions_topic: String,
    /// Receive buffer size; longer datagrams are truncated and fail to decode
    pub max_datagram_bytes: usize,
    /// Retention of the topics this router creates; zero keeps records forever
    pub stream_max_age: Duration,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            udp_port: meterline_common::DEFAULT_ROUTER_PORT,
            nats_url: "nats://localhost:4222".to_string(),
            metrics_topic: meterline_common::DEFAULT_METRICS_TOPIC.to_string(),
            actions_topic: meterline_common::DEFAULT_ACTIONS_TOPIC.to_string(),
            max_datagram_bytes: 65536,
            stream_max_age: Duration::from_secs(meterline_common::DEFAULT_STREAM_MAX_AGE_SECS),
        }
    }
}

impl RouterConfig {
    /// Load configuration from `.env` and the environment
    pub fn load() -> Self {
        env::load_dotenv();

        let mut cfg = Self::default();

        if let Some(host) = env::var("UDP_BIND_HOST") {
            cfg.bind_host = host;
        }
        if let Some(port) = env::parse::<u16>("UDP_PORT") {
            cfg.udp_port = port;
        }
        if let Some(url) = env::var("NATS_URL") {
            cfg.nats_url = url;
        }
        if let Some(topic) = env::var("FUNCTION_METRICS_TOPIC") {
            cfg.metrics_topic = topic;
        }
        if let Some(topic) = env::var("FUNCTION_ACTIONS_TOPIC") {
            cfg.actions_topic = topic;
        }
        if let Some(size) = env::parse::<usize>("MAX_DATAGRAM_BYTES").filter(|s| *s > 0) {
            cfg.max_datagram_bytes = size;
        }
        if let Some(secs) = env::parse::<u64>("STREAM_MAX_AGE_SECS") {
            cfg.stream_max_age = Duration::from_secs(secs);
        }

        cfg
    }

    pub fn bind_addr(&self) -> String {
        if self.bind_host.contains(':') {
            format!("[{}]:{}", self.bind_host, self.udp_port)
        } else {
            format!("{}:{}", self.bind_host, self.udp_port)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_addr() {
        let mut cfg = RouterConfig::default();
        assert_eq!(cfg.bind_addr(), "0.0.0.0:5461");
        assert_eq!(cfg.stream_max_age, Duration::from_secs(7 * 24 * 3600));

        cfg.bind_host = "::".into();
        assert_eq!(cfg.bind_addr(), "[::]:5461");
    }
}
