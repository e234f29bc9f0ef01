//! HTTP surface
//!
//! - `GET /health`
//! - `GET /billing/:tenant_id` cumulative billing breakdown

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use tower_http::trace::TraceLayer;

use crate::aggregator::BillingAggregator;

pub fn router(aggregator: Arc<BillingAggregator>) -> Router {
    Router::new()
        .route(
            "/health",
            get(|| async {
                Json(serde_json::json!({
                    "status": "ok",
                    "service": "meterline-billing",
                    "version": meterline_common::VERSION,
                }))
            }),
        )
        .route("/billing/:tenant_id", get(get_billing))
        .layer(TraceLayer::new_for_http())
        .with_state(aggregator)
}

async fn get_billing(
    State(aggregator): State<Arc<BillingAggregator>>,
    Path(tenant_id): Path<String>,
) -> Response {
    if tenant_id.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "tenant_id is required" })),
        )
            .into_response();
    }

    match aggregator.billing(&tenant_id).await {
        Ok(entries) => Json(entries).into_response(),
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BillingEntry, PodUsage, Tariff};
    use crate::pricing::StaticTariffs;
    use crate::store::MemoryUsageStore;
    use axum::body::Body;
    use axum::http::Request;
    use meterline_common::log::MemorySink;
    use tower::ServiceExt;

    fn app(store: Arc<MemoryUsageStore>, tariffs: Arc<StaticTariffs>) -> Router {
        let notify = Arc::new(MemorySink::new("notify"));
        router(Arc::new(BillingAggregator::new(store, tariffs, notify, 1)))
    }

    fn tariffs() -> Arc<StaticTariffs> {
        Arc::new(StaticTariffs::new(Some(Tariff {
            id: 1,
            name: "standard".into(),
            exec_price: 0.5,
            mem_price: 0.25,
            cpu_price: 0.0,
            cold_start_price_per_second: 0.0,
        })))
    }

    async fn fetch(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = fetch(app(Arc::new(MemoryUsageStore::new()), tariffs()), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_billing_ok() {
        let store = Arc::new(MemoryUsageStore::new());
        store.set_usage(
            "acme",
            vec![
                PodUsage {
                    pod: "pod-a".into(),
                    start_time: 100,
                    end_time: 160,
                    total_memory_mb_sec: 30.0,
                },
                PodUsage {
                    pod: "pod-b".into(),
                    start_time: 200,
                    end_time: 230,
                    total_memory_mb_sec: 10.0,
                },
            ],
        );

        let (status, body) = fetch(app(store, tariffs()), "/billing/acme").await;
        assert_eq!(status, StatusCode::OK);

        let entries: Vec<BillingEntry> = serde_json::from_value(body).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].total_cost, 55.0);
        assert_eq!(entries[1].tenant_id, "acme");
    }

    #[tokio::test]
    async fn test_billing_unknown_tenant_is_404() {
        let (status, body) =
            fetch(app(Arc::new(MemoryUsageStore::new()), tariffs()), "/billing/nobody").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "no billing data found for tenant");
    }

    #[tokio::test]
    async fn test_billing_failures_are_500() {
        let store = Arc::new(MemoryUsageStore::new());
        store.set_usage(
            "acme",
            vec![PodUsage {
                pod: "pod-a".into(),
                start_time: 0,
                end_time: 1,
                total_memory_mb_sec: 1.0,
            }],
        );
        let tariffs = tariffs();

        tariffs.set(None);
        let (status, body) = fetch(app(store.clone(), tariffs.clone()), "/billing/acme").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "failed to get tariff");

        store.set_failing(true);
        let (status, body) = fetch(app(store, tariffs), "/billing/acme").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "failed to get billing data");
    }

    #[tokio::test]
    async fn test_blank_tenant_is_400() {
        let (status, _) =
            fetch(app(Arc::new(MemoryUsageStore::new()), tariffs()), "/billing/%20").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
