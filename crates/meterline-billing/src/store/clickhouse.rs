//! ClickHouse usage store over the HTTP interface

use std::time::Duration;

use async_trait::async_trait;
use meterline_common::{MeterlineError, Result};
use reqwest::Client;
use tracing::{debug, instrument};

use super::UsageStore;
use crate::config::StoreConfig;
use crate::model::PodUsage;

/// Aggregates metric rows per pod. Tenant and table are bound as server-side
/// query parameters.
const USAGE_QUERY: &str = "SELECT pod, \
    toInt64(min(timestamp)) AS start_time, \
    toInt64(max(timestamp)) AS end_time, \
    sum(mem_mb) AS total_memory_mb_sec \
    FROM {table:Identifier} \
    WHERE tenant = {tenant:String} \
    GROUP BY pod \
    FORMAT JSONEachRow";

fn store_err(e: impl std::fmt::Display) -> MeterlineError {
    MeterlineError::Store(e.to_string())
}

pub struct ClickHouseStore {
    http: Client,
    config: StoreConfig,
}

impl ClickHouseStore {
    pub fn new(config: StoreConfig, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MeterlineError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Verify the server answers; used once at startup
    pub async fn ping(&self) -> Result<()> {
        let url = format!("{}/ping", self.config.url.trim_end_matches('/'));
        let response = self.http.get(&url).send().await.map_err(store_err)?;
        if !response.status().is_success() {
            return Err(store_err(format!("ping returned {}", response.status())));
        }
        Ok(())
    }
}

#[async_trait]
impl UsageStore for ClickHouseStore {
    #[instrument(skip(self))]
    async fn usage_by_pod(&self, tenant: &str) -> Result<Vec<PodUsage>> {
        let response = self
            .http
            .post(&self.config.url)
            .query(&[
                ("database", self.config.database.as_str()),
                ("param_table", self.config.table.as_str()),
                ("param_tenant", tenant),
                ("output_format_json_quote_64bit_integers", "0"),
            ])
            .header("X-ClickHouse-User", &self.config.user)
            .header("X-ClickHouse-Key", &self.config.password)
            .body(USAGE_QUERY)
            .send()
            .await
            .map_err(store_err)?;

        let status = response.status();
        let body = response.text().await.map_err(store_err)?;
        if !status.is_success() {
            return Err(store_err(format!("query returned {}: {}", status, body.trim())));
        }

        let rows = parse_rows(&body)?;
        debug!(rows = rows.len(), "Usage query complete");
        Ok(rows)
    }
}

/// Decode a `JSONEachRow` body
pub fn parse_rows(body: &str) -> Result<Vec<PodUsage>> {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| serde_json::from_str(line).map_err(store_err))
        .collect()
}
