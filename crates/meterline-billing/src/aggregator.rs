//! Billing aggregator
//!
//! Turns per-pod usage into money, two ways:
//!
//! - on demand, a running-total billing breakdown for a tenant
//! - on each stop action, a notification for the stopped pod
//!
//! Both read usage and the default tariff fresh on every call. The arithmetic
//! lives in [`cumulative_entries`] and [`stop_notification`], which do no I/O.

use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use meterline_common::log::EventSink;
use meterline_common::{unix_now, Action};
use tracing::{error, info, instrument, warn};

use crate::error::BillingError;
use crate::model::{BillingEntry, Notification, PodUsage, Tariff};
use crate::pricing::TariffSource;
use crate::store::UsageStore;

/// Running totals over `rows` in store order.
///
/// Entry *i* carries the sums of duration, memory, and both costs over rows
/// `0..=i`. Every entry is labelled with the first row's pod.
pub fn cumulative_entries(
    tenant: &str,
    rows: &[PodUsage],
    tariff: &Tariff,
    calculated_at: DateTime<Utc>,
) -> Vec<BillingEntry> {
    let mut duration_sec = 0i64;
    let mut memory_mb = 0.0;
    let mut exec_cost = 0.0;
    let mut memory_cost = 0.0;

    let pod_name = rows.first().map(|row| row.pod.clone()).unwrap_or_default();

    let mut entries = Vec::with_capacity(rows.len());
    for row in rows {
        let duration = row.duration_secs();
        duration_sec += duration;
        memory_mb += row.total_memory_mb_sec;
        exec_cost += duration as f64 * tariff.exec_price;
        memory_cost += row.total_memory_mb_sec * tariff.mem_price;

        entries.push(BillingEntry {
            tenant_id: tenant.to_string(),
            pod_name: pod_name.clone(),
            duration_sec,
            memory_mb,
            exec_cost,
            memory_cost,
            total_cost: exec_cost + memory_cost,
            tariff_name: tariff.name.clone(),
            calculated_at,
        });
    }

    entries
}

/// Notification for a stopped pod. A pod with no usage row bills zero.
pub fn stop_notification(
    action: &Action,
    rows: &[PodUsage],
    tariff: &Tariff,
    timestamp: i64,
) -> Notification {
    let (memory_mb, total_cost) = rows
        .iter()
        .find(|row| row.pod == action.pod)
        .map(|row| {
            let exec_cost = row.duration_secs() as f64 * tariff.exec_price;
            let memory_cost = row.total_memory_mb_sec * tariff.mem_price;
            (row.total_memory_mb_sec, exec_cost + memory_cost)
        })
        .unwrap_or((0.0, 0.0));

    Notification {
        tenant_id: action.tenant.clone(),
        email: action.tenant.clone(),
        memory_mb,
        total_cost,
        pod_name: action.pod.clone(),
        timestamp,
    }
}

/// What handling a stop action led to
#[derive(Debug, Clone, PartialEq)]
pub enum NotifyOutcome {
    Published(Notification),
    /// Tenant had no usage rows
    NoUsage,
    StoreFailed,
    TariffUnavailable,
    PublishFailed,
}

/// Billing aggregator service
pub struct BillingAggregator {
    store: Arc<dyn UsageStore>,
    tariffs: Arc<dyn TariffSource>,
    notifications: Arc<dyn EventSink>,
    tariff_id: i64,
}

impl BillingAggregator {
    pub fn new(
        store: Arc<dyn UsageStore>,
        tariffs: Arc<dyn TariffSource>,
        notifications: Arc<dyn EventSink>,
        tariff_id: i64,
    ) -> Self {
        Self {
            store,
            tariffs,
            notifications,
            tariff_id,
        }
    }

    /// Cumulative billing breakdown for `tenant`
    #[instrument(skip(self))]
    pub async fn billing(&self, tenant: &str) -> Result<Vec<BillingEntry>, BillingError> {
        let rows = self.store.usage_by_pod(tenant).await.map_err(|e| {
            error!("Failed to get billing data: {}", e);
            BillingError::Store(e)
        })?;

        if rows.is_empty() {
            return Err(BillingError::NotFound(tenant.to_string()));
        }

        let tariff = self.tariffs.tariff(self.tariff_id).await.map_err(|e| {
            error!(tariff_id = self.tariff_id, "Failed to get tariff: {}", e);
            BillingError::Pricing(e)
        })?;

        Ok(cumulative_entries(tenant, &rows, &tariff, Utc::now()))
    }

    /// Price the stopped pod and publish a notification.
    ///
    /// Every failure is logged and ends handling of this action; nothing is
    /// retried.
    #[instrument(skip(self, action), fields(pod = %action.pod, tenant = %action.tenant))]
    pub async fn notify_stop(&self, action: &Action) -> NotifyOutcome {
        let rows = match self.store.usage_by_pod(&action.tenant).await {
            Ok(rows) => rows,
            Err(e) => {
                error!("Failed to get billing data: {}", e);
                return NotifyOutcome::StoreFailed;
            }
        };

        if rows.is_empty() {
            warn!("No usage rows for tenant, skipping notification");
            return NotifyOutcome::NoUsage;
        }

        let tariff = match self.tariffs.tariff(self.tariff_id).await {
            Ok(tariff) => tariff,
            Err(e) => {
                error!(tariff_id = self.tariff_id, "Failed to get tariff: {}", e);
                return NotifyOutcome::TariffUnavailable;
            }
        };

        let notification = stop_notification(action, &rows, &tariff, unix_now());

        let payload = match serde_json::to_vec(&notification) {
            Ok(payload) => Bytes::from(payload),
            Err(e) => {
                error!("Failed to encode notification: {}", e);
                return NotifyOutcome::PublishFailed;
            }
        };

        if let Err(e) = self.notifications.publish(payload).await {
            error!(topic = self.notifications.topic(), "Failed to publish notification: {}", e);
            return NotifyOutcome::PublishFailed;
        }

        info!(
            total_cost = notification.total_cost,
            memory_mb = notification.memory_mb,
            "Notification published"
        );
        NotifyOutcome::Published(notification)
    }
}
