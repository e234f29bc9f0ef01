//! Tariff lookup

pub mod cache;
pub mod client;

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use meterline_common::{MeterlineError, Result};
use parking_lot::RwLock;

use crate::model::Tariff;

pub use cache::CachedTariffSource;
pub use client::PriceServiceClient;

/// Source of tariffs by id
#[async_trait]
pub trait TariffSource: Send + Sync {
    async fn tariff(&self, id: i64) -> Result<Tariff>;
}

/// Serves one tariff held in memory; `None` makes every lookup fail
#[derive(Debug)]
pub struct StaticTariffs {
    tariff: RwLock<Option<Tariff>>,
    lookups: AtomicUsize,
}

impl StaticTariffs {
    pub fn new(tariff: Option<Tariff>) -> Self {
        Self {
            tariff: RwLock::new(tariff),
            lookups: AtomicUsize::new(0),
        }
    }

    pub fn set(&self, tariff: Option<Tariff>) {
        *self.tariff.write() = tariff;
    }

    /// Lookups served so far
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TariffSource for StaticTariffs {
    async fn tariff(&self, id: i64) -> Result<Tariff> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.tariff
            .read()
            .clone()
            .ok_or_else(|| MeterlineError::Pricing(format!("tariff {} unavailable", id)))
    }
}
