//! Billing service configuration

use std::time::Duration;

use meterline_common::env;
use serde::{Deserialize, Serialize};

/// Usage store (ClickHouse HTTP interface) settings
#[derive(Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub url: String,
    pub user: String,
    pub password: String,
    pub database: String,
    /// Table holding raw metric rows
    pub table: String,
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("url", &self.url)
            .field("user", &self.user)
            .field("password", &"***")
            .field("database", &self.database)
            .field("table", &self.table)
            .finish()
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8123".to_string(),
            user: "default".to_string(),
            password: String::new(),
            database: "metrics".to_string(),
            table: "function_metrics_local".to_string(),
        }
    }
}

/// Billing service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingConfig {
    /// HTTP listen port
    pub port: u16,
    /// NATS server URLs (comma-separated)
    pub nats_url: String,
    /// Topic carrying lifecycle actions
    pub actions_topic: String,
    /// Durable consumer group on the actions topic
    pub consumer_group: String,
    /// Topic receiving billing notifications
    pub notify_topic: String,
    /// Retention of the topics this service creates; zero keeps records forever
    pub stream_max_age: Duration,
    /// Price service base URL, e.g. `http://price:8085/v1`
    pub price_service_url: String,
    pub default_tariff_id: i64,
    /// Timeout for outbound HTTP calls
    pub request_timeout: Duration,
    pub store: StoreConfig,
    /// Concurrent stop-notification workers
    pub notify_workers: usize,
    /// Pending stop actions before the consumer waits
    pub notify_queue_capacity: usize,
    /// Tariff cache lifetime; zero disables caching
    pub tariff_cache_ttl: Duration,
    pub tariff_cache_max_entries: usize,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            nats_url: "nats://localhost:4222".to_string(),
            actions_topic: meterline_common::DEFAULT_ACTIONS_TOPIC.to_string(),
            consumer_group: "invoicer-actions".to_string(),
            notify_topic: meterline_common::DEFAULT_NOTIFY_TOPIC.to_string(),
            stream_max_age: Duration::from_secs(meterline_common::DEFAULT_STREAM_MAX_AGE_SECS),
            price_service_url: "http://localhost:8085/v1".to_string(),
            default_tariff_id: 1,
            request_timeout: Duration::from_secs(10),
            store: StoreConfig::default(),
            notify_workers: 8,
            notify_queue_capacity: 1024,
            tariff_cache_ttl: Duration::ZERO,
            tariff_cache_max_entries: 64,
        }
    }
}

impl BillingConfig {
    /// Load configuration from `.env` and the environment
    pub fn load() -> Self {
        env::load_dotenv();

        let mut cfg = Self::default();

        if let Some(port) = env::parse::<u16>("PORT") {
            cfg.port = port;
        }
        if let Some(url) = env::var("NATS_URL") {
            cfg.nats_url = url;
        }
        if let Some(topic) = env::var("FUNCTION_ACTIONS_TOPIC") {
            cfg.actions_topic = topic;
        }
        if let Some(group) = env::var("ACTIONS_CONSUMER_GROUP") {
            cfg.consumer_group = group;
        }
        if let Some(topic) = env::var("NOTIFY_TOPIC") {
            cfg.notify_topic = topic;
        }
        if let Some(secs) = env::parse::<u64>("STREAM_MAX_AGE_SECS") {
            cfg.stream_max_age = Duration::from_secs(secs);
        }
        if let Some(url) = env::var("PRICE_SERVICE_URL") {
            cfg.price_service_url = url;
        }
        if let Some(id) = env::parse::<i64>("DEFAULT_TARIFF_ID") {
            cfg.default_tariff_id = id;
        }
        if let Some(ms) = env::parse::<u64>("REQUEST_TIMEOUT_MS").filter(|ms| *ms > 0) {
            cfg.request_timeout = Duration::from_millis(ms);
        }

        if let Some(url) = env::var("CLICKHOUSE_URL") {
            cfg.store.url = url;
        }
        if let Some(user) = env::var("CLICKHOUSE_USER") {
            cfg.store.user = user;
        }
        if let Some(password) = env::var("CLICKHOUSE_PASSWORD") {
            cfg.store.password = password;
        }
        if let Some(db) = env::var("CLICKHOUSE_DB") {
            cfg.store.database = db;
        }
        if let Some(table) = env::var("CLICKHOUSE_TABLE") {
            cfg.store.table = table;
        }

        if let Some(n) = env::parse::<usize>("NOTIFY_WORKERS").filter(|n| *n > 0) {
            cfg.notify_workers = n;
        }
        if let Some(n) = env::parse::<usize>("NOTIFY_QUEUE_CAPACITY").filter(|n| *n > 0) {
            cfg.notify_queue_capacity = n;
        }
        if let Some(secs) = env::parse::<u64>("TARIFF_CACHE_TTL_SECS") {
            cfg.tariff_cache_ttl = Duration::from_secs(secs);
        }
        if let Some(n) = env::parse::<usize>("TARIFF_CACHE_MAX_ENTRIES").filter(|n| *n > 0) {
            cfg.tariff_cache_max_entries = n;
        }

        cfg
    }

    pub fn listen_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}
