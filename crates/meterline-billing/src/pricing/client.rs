//! Price service HTTP client

use std::time::Duration;

use async_trait::async_trait;
use meterline_common::{MeterlineError, Result};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::instrument;

use super::TariffSource;
use crate::model::Tariff;

#[derive(Deserialize)]
struct TariffResponse {
    tariff: Tariff,
}

/// Fetches tariffs from `GET {base}/tariff/{id}`
pub struct PriceServiceClient {
    http: Client,
    base_url: String,
}

impl PriceServiceClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MeterlineError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl TariffSource for PriceServiceClient {
    #[instrument(skip(self))]
    async fn tariff(&self, id: i64) -> Result<Tariff> {
        let url = format!("{}/tariff/{}", self.base_url, id);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| MeterlineError::Pricing(format!("request failed: {}", e)))?;

        if response.status() != StatusCode::OK {
            return Err(MeterlineError::Pricing(format!(
                "price service returned status {}",
                response.status().as_u16()
            )));
        }

        let body: TariffResponse = response
            .json()
            .await
            .map_err(|e| MeterlineError::Pricing(format!("invalid tariff response: {}", e)))?;

        Ok(body.tariff)
    }
}
