//! Usage store
//!
//! Read side of the metrics topic: the store ingests raw metric rows
//! independently of this service, and answers per-pod aggregates for a
//! tenant.

pub mod clickhouse;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use meterline_common::{MeterlineError, Result};
use parking_lot::RwLock;

use crate::model::PodUsage;

pub use clickhouse::ClickHouseStore;

/// Per-pod usage lookup
#[async_trait]
pub trait UsageStore: Send + Sync {
    /// One row per pod of `tenant`, in store order. Empty when the tenant has
    /// no rows.
    async fn usage_by_pod(&self, tenant: &str) -> Result<Vec<PodUsage>>;
}

/// In-process store keyed by tenant
#[derive(Debug, Default)]
pub struct MemoryUsageStore {
    rows: RwLock<HashMap<String, Vec<PodUsage>>>,
    failing: AtomicBool,
}

impl MemoryUsageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the rows returned for `tenant`
    pub fn set_usage(&self, tenant: &str, rows: Vec<PodUsage>) {
        self.rows.write().insert(tenant.to_string(), rows);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl UsageStore for MemoryUsageStore {
    async fn usage_by_pod(&self, tenant: &str) -> Result<Vec<PodUsage>> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(MeterlineError::Store("usage store unavailable".into()));
        }
        Ok(self.rows.read().get(tenant).cloned().unwrap_or_default())
    }
}
