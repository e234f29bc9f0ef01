//! Tariff cache
//!
//! Wraps another [`TariffSource`] and keeps fetched tariffs for a fixed
//! lifetime. A zero lifetime passes every lookup straight through.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use meterline_common::Result;
use tokio::time::Instant;
use tracing::debug;

use super::TariffSource;
use crate::model::Tariff;

struct CachedTariff {
    tariff: Tariff,
    expires_at: Instant,
}

/// TTL cache in front of a tariff source
pub struct CachedTariffSource {
    inner: Arc<dyn TariffSource>,
    entries: DashMap<i64, CachedTariff>,
    ttl: Duration,
    max_entries: usize,
}

impl CachedTariffSource {
    pub fn new(inner: Arc<dyn TariffSource>, ttl: Duration, max_entries: usize) -> Self {
        Self {
            inner,
            entries: DashMap::new(),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    fn get(&self, id: i64) -> Option<Tariff> {
        self.entries.get(&id).and_then(|entry| {
            if Instant::now() < entry.expires_at {
                Some(entry.tariff.clone())
            } else {
                None
            }
        })
    }

    fn set(&self, id: i64, tariff: &Tariff) {
        if self.entries.len() >= self.max_entries {
            let now = Instant::now();
            self.entries.retain(|_, v| now < v.expires_at);

            // Still full: drop any one entry
            if self.entries.len() >= self.max_entries {
                // Release the shard guard before removing
                let victim = self.entries.iter().next().map(|e| *e.key());
                if let Some(key) = victim {
                    self.entries.remove(&key);
                }
            }
        }

        self.entries.insert(
            id,
            CachedTariff {
                tariff: tariff.clone(),
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl TariffSource for CachedTariffSource {
    async fn tariff(&self, id: i64) -> Result<Tariff> {
        if !self.is_enabled() {
            return self.inner.tariff(id).await;
        }

        if let Some(tariff) = self.get(id) {
            debug!(id, "Tariff cache hit");
            return Ok(tariff);
        }

        // Failures are not cached
        let tariff = self.inner.tariff(id).await?;
        self.set(id, &tariff);
        Ok(tariff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::StaticTariffs;

    fn tariff() -> Tariff {
        Tariff {
            id: 1,
            name: "standard".into(),
            exec_price: 0.5,
            mem_price: 0.25,
            cpu_price: 0.0,
            cold_start_price_per_second: 0.0,
        }
    }

    #[tokio::test]
    async fn test_zero_ttl_always_fetches() {
        let inner = Arc::new(StaticTariffs::new(Some(tariff())));
        let cache = CachedTariffSource::new(inner.clone(), Duration::ZERO, 8);

        cache.tariff(1).await.unwrap();
        cache.tariff(1).await.unwrap();

        assert_eq!(inner.lookups(), 2);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_serves_cached_until_expiry() {
        let inner = Arc::new(StaticTariffs::new(Some(tariff())));
        let cache = CachedTariffSource::new(inner.clone(), Duration::from_secs(60), 8);

        cache.tariff(1).await.unwrap();
        cache.tariff(1).await.unwrap();
        assert_eq!(inner.lookups(), 1);

        tokio::time::advance(Duration::from_secs(61)).await;
        cache.tariff(1).await.unwrap();
        assert_eq!(inner.lookups(), 2);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let inner = Arc::new(StaticTariffs::new(None));
        let cache = CachedTariffSource::new(inner.clone(), Duration::from_secs(60), 8);

        assert!(cache.tariff(1).await.is_err());
        inner.set(Some(tariff()));
        assert_eq!(cache.tariff(1).await.unwrap().name, "standard");
    }

    #[tokio::test]
    async fn test_eviction_respects_capacity() {
        let inner = Arc::new(StaticTariffs::new(Some(tariff())));
        let cache = CachedTariffSource::new(inner, Duration::from_secs(60), 2);

        for id in 1..=5 {
            cache.tariff(id).await.unwrap();
        }

        assert!(cache.len() <= 2);
    }
}
