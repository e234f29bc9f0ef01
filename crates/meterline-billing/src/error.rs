//! Billing query errors

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use meterline_common::MeterlineError;
use thiserror::Error;

/// Outcome of a failed billing query
#[derive(Debug, Error)]
pub enum BillingError {
    /// Tenant has no usage rows; not a failure of the pipeline
    #[error("no billing data found for tenant {0}")]
    NotFound(String),

    #[error("failed to get billing data: {0}")]
    Store(MeterlineError),

    #[error("failed to get tariff: {0}")]
    Pricing(MeterlineError),
}

impl BillingError {
    pub fn status(&self) -> StatusCode {
        match self {
            BillingError::NotFound(_) => StatusCode::NOT_FOUND,
            BillingError::Store(_) | BillingError::Pricing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message returned to HTTP callers; collaborator details stay in the logs
    fn public_message(&self) -> &'static str {
        match self {
            BillingError::NotFound(_) => "no billing data found for tenant",
            BillingError::Store(_) => "failed to get billing data",
            BillingError::Pricing(_) => "failed to get tariff",
        }
    }
}

impl IntoResponse for BillingError {
    fn into_response(self) -> Response {
        (
            self.status(),
            Json(serde_json::json!({ "error": self.public_message() })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            BillingError::NotFound("acme".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            BillingError::Store(MeterlineError::Store("timeout".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            BillingError::Pricing(MeterlineError::Pricing("503".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
