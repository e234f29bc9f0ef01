//! Billing records
//!
//! - Tariff: pricing schedule owned by the price service (read-only here)
//! - PodUsage: per-pod aggregate derived from raw metric rows
//! - BillingEntry: one running-total line of a billing query response
//! - Notification: record published for the notifier on a stop action

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Pricing schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tariff {
    #[serde(alias = "ID")]
    pub id: i64,
    #[serde(alias = "Name")]
    pub name: String,
    /// Price per second of execution
    #[serde(alias = "ExecPrice")]
    pub exec_price: f64,
    /// Price per MB-second of memory
    #[serde(alias = "MemPrice")]
    pub mem_price: f64,
    #[serde(alias = "CpuPrice")]
    pub cpu_price: f64,
    #[serde(default, alias = "ColdStartPricePerSecond")]
    pub cold_start_price_per_second: f64,
}

/// Usage aggregated over all metric rows of one pod.
///
/// Matches the store query shape `pod, min(timestamp), max(timestamp),
/// sum(mem_mb)` grouped by pod.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PodUsage {
    pub pod: String,
    /// Earliest sample (Unix seconds)
    pub start_time: i64,
    /// Latest sample (Unix seconds)
    pub end_time: i64,
    /// Sum of sampled MB across the pod's rows
    pub total_memory_mb_sec: f64,
}

impl PodUsage {
    /// Observed lifetime in whole seconds
    pub fn duration_secs(&self) -> i64 {
        (self.end_time - self.start_time).max(0)
    }
}

/// Cumulative billing line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillingEntry {
    pub tenant_id: String,
    /// Pod of the first usage row, repeated on every line
    pub pod_name: String,
    pub duration_sec: i64,
    pub memory_mb: f64,
    pub exec_cost: f64,
    pub memory_cost: f64,
    pub total_cost: f64,
    pub tariff_name: String,
    pub calculated_at: DateTime<Utc>,
}

/// Billing notification for the notifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub tenant_id: String,
    pub email: String,
    pub memory_mb: f64,
    pub total_cost: f64,
    pub pod_name: String,
    /// Unix seconds
    pub timestamp: i64,
}
