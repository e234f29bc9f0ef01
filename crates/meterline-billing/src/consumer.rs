//! Actions consumer
//!
//! Reads the actions topic in order and hands each stop action to a bounded
//! pool of notification workers. When every worker is busy and the queue is
//! full, reading pauses until a slot frees up.

use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use meterline_common::{Action, MeterlineError, Result};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::aggregator::BillingAggregator;

/// Fixed set of workers draining a bounded queue of stop actions
pub struct NotificationPool {
    tx: mpsc::Sender<Action>,
    workers: Vec<JoinHandle<()>>,
}

impl NotificationPool {
    pub fn start(aggregator: Arc<BillingAggregator>, workers: usize, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel::<Action>(capacity.max(1));
        let rx = Arc::new(Mutex::new(rx));

        let workers = (0..workers.max(1))
            .map(|worker| {
                let rx = rx.clone();
                let aggregator = aggregator.clone();
                tokio::spawn(async move {
                    loop {
                        let next = rx.lock().await.recv().await;
                        match next {
                            Some(action) => {
                                aggregator.notify_stop(&action).await;
                            }
                            None => break,
                        }
                    }
                    debug!(worker, "Notification worker stopped");
                })
            })
            .collect();

        Self { tx, workers }
    }

    /// Queue a stop action, waiting while the queue is full
    pub async fn submit(&self, action: Action) -> Result<()> {
        self.tx
            .send(action)
            .await
            .map_err(|_| MeterlineError::Internal("notification pool closed".into()))
    }

    /// Stop accepting work and wait for queued actions to finish
    pub async fn shutdown(self) {
        drop(self.tx);
        for worker in self.workers {
            if let Err(e) = worker.await {
                error!("Notification worker panicked: {}", e);
            }
        }
    }
}

/// Counts from one run of [`consume_actions`]
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConsumeStats {
    pub read: u64,
    pub malformed: u64,
    pub dispatched: u64,
}

/// Consume action records until the stream ends.
///
/// Undecodable records and read errors are logged and skipped. Only stop
/// actions reach the pool; other kinds are read and ignored.
pub async fn consume_actions<S>(mut records: S, pool: &NotificationPool) -> ConsumeStats
where
    S: Stream<Item = Result<Bytes>> + Unpin,
{
    let mut stats = ConsumeStats::default();

    while let Some(record) = records.next().await {
        let payload = match record {
            Ok(payload) => payload,
            Err(e) => {
                error!("Failed to read action record: {}", e);
                continue;
            }
        };
        stats.read += 1;

        let action: Action = match serde_json::from_slice(&payload) {
            Ok(action) => action,
            Err(e) => {
                warn!(bytes = payload.len(), "Failed to decode action: {}", e);
                stats.malformed += 1;
                continue;
            }
        };

        info!(pod = %action.pod, tenant = %action.tenant, kind = ?action.action, "Processing action");

        if !action.is_stop() {
            continue;
        }

        if let Err(e) = pool.submit(action).await {
            error!("Failed to dispatch stop action: {}", e);
            break;
        }
        stats.dispatched += 1;
    }

    info!(
        read = stats.read,
        malformed = stats.malformed,
        dispatched = stats.dispatched,
        "Actions stream ended"
    );
    stats
}

/// Why [`run_consumer`] returned
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsumerExit {
    /// Shutdown was requested
    Stopped,
    /// The actions stream ended or the pool closed on its own
    StreamEnded(ConsumeStats),
}

/// Consume actions until `shutdown` resolves or the stream ends.
///
/// An ended stream means no further stop action will be handled; the caller
/// treats it as fatal.
pub async fn run_consumer<S, F>(records: S, pool: &NotificationPool, shutdown: F) -> ConsumerExit
where
    S: Stream<Item = Result<Bytes>> + Unpin,
    F: Future<Output = ()>,
{
    tokio::select! {
        stats = consume_actions(records, pool) => {
            error!(
                read = stats.read,
                dispatched = stats.dispatched,
                "Actions consumer stopped unexpectedly"
            );
            ConsumerExit::StreamEnded(stats)
        }
        _ = shutdown => {
            info!("Stopping actions consumer");
            ConsumerExit::Stopped
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Notification, PodUsage, Tariff};
    use crate::pricing::StaticTariffs;
    use crate::store::{MemoryUsageStore, UsageStore};
    use async_trait::async_trait;
    use meterline_common::log::MemorySink;
    use std::time::Duration;
    use tokio::sync::{Notify, Semaphore};

    /// Store whose lookups wait until the gate opens
    struct GatedStore {
        gate: Semaphore,
        entered: Notify,
        inner: MemoryUsageStore,
    }

    #[async_trait]
    impl UsageStore for GatedStore {
        async fn usage_by_pod(&self, tenant: &str) -> Result<Vec<PodUsage>> {
            self.entered.notify_one();
            let _permit = self
                .gate
                .acquire()
                .await
                .map_err(|e| MeterlineError::Internal(e.to_string()))?;
            self.inner.usage_by_pod(tenant).await
        }
    }

    fn tariffs() -> Arc<StaticTariffs> {
        Arc::new(StaticTariffs::new(Some(Tariff {
            id: 1,
            name: "standard".into(),
            exec_price: 1.0,
            mem_price: 1.0,
            cpu_price: 0.0,
            cold_start_price_per_second: 0.0,
        })))
    }

    fn aggregator(notify: Arc<MemorySink>) -> Arc<BillingAggregator> {
        let store = Arc::new(MemoryUsageStore::new());
        store.set_usage(
            "acme",
            vec![PodUsage {
                pod: "pod-a".into(),
                start_time: 100,
                end_time: 110,
                total_memory_mb_sec: 4.0,
            }],
        );
        Arc::new(BillingAggregator::new(store, tariffs(), notify, 1))
    }

    fn record(value: &serde_json::Value) -> Result<Bytes> {
        Ok(Bytes::from(serde_json::to_vec(value).unwrap()))
    }

    #[tokio::test]
    async fn test_stop_actions_are_notified() {
        let notify = Arc::new(MemorySink::new("notify"));
        let pool = NotificationPool::start(aggregator(notify.clone()), 2, 4);

        let records = futures::stream::iter(vec![
            record(&serde_json::json!({"pod":"pod-a","action":"stop","timestamp":1,"tenant":"acme"})),
            record(&serde_json::json!({"pod":"pod-a","action":"restart","timestamp":2,"tenant":"acme"})),
            Ok(Bytes::from_static(b"{not json")),
            Err(MeterlineError::Log("broken read".into())),
            record(&serde_json::json!({"pod":"pod-a","action":"stop","timestamp":3,"tenant":"acme"})),
        ]);

        let stats = consume_actions(records, &pool).await;
        pool.shutdown().await;

        assert_eq!(
            stats,
            ConsumeStats {
                read: 4,
                malformed: 1,
                dispatched: 2,
            }
        );

        // Duplicate stops each produce a notification
        assert_eq!(notify.len(), 2);
        let first: Notification = serde_json::from_slice(&notify.records()[0]).unwrap();
        assert_eq!(first.total_cost, 14.0);
    }

    #[tokio::test]
    async fn test_shutdown_drains_queue() {
        let notify = Arc::new(MemorySink::new("notify"));
        let pool = NotificationPool::start(aggregator(notify.clone()), 1, 16);

        for _ in 0..10 {
            pool.submit(Action::stop("pod-a", "acme")).await.unwrap();
        }
        pool.shutdown().await;

        assert_eq!(notify.len(), 10);
    }

    #[tokio::test]
    async fn test_full_queue_holds_back_submit() {
        let store = Arc::new(GatedStore {
            gate: Semaphore::new(0),
            entered: Notify::new(),
            inner: MemoryUsageStore::new(),
        });
        store.inner.set_usage(
            "acme",
            vec![PodUsage {
                pod: "pod-a".into(),
                start_time: 0,
                end_time: 1,
                total_memory_mb_sec: 1.0,
            }],
        );
        let notify = Arc::new(MemorySink::new("notify"));
        let aggregator = Arc::new(BillingAggregator::new(
            store.clone(),
            tariffs(),
            notify.clone(),
            1,
        ));
        let pool = NotificationPool::start(aggregator, 1, 1);

        // The only worker picks up the first action and blocks in the store
        pool.submit(Action::stop("pod-a", "acme")).await.unwrap();
        store.entered.notified().await;

        // The second fills the single queue slot
        pool.submit(Action::stop("pod-a", "acme")).await.unwrap();

        // The third has to wait for room
        let third = tokio::time::timeout(
            Duration::from_millis(100),
            pool.submit(Action::stop("pod-a", "acme")),
        )
        .await;
        assert!(third.is_err(), "submit completed while the queue was full");
        assert!(notify.is_empty());

        store.gate.add_permits(16);
        tokio::time::timeout(
            Duration::from_secs(5),
            pool.submit(Action::stop("pod-a", "acme")),
        )
        .await
        .expect("submit still blocked after the gate opened")
        .unwrap();

        pool.shutdown().await;
        assert_eq!(notify.len(), 3);
    }

    #[tokio::test]
    async fn test_ended_stream_is_reported() {
        let notify = Arc::new(MemorySink::new("notify"));
        let pool = NotificationPool::start(aggregator(notify.clone()), 1, 4);

        let records = futures::stream::iter(vec![record(
            &serde_json::json!({"pod":"pod-a","action":"stop","timestamp":1,"tenant":"acme"}),
        )]);
        let exit = run_consumer(records, &pool, std::future::pending::<()>()).await;
        pool.shutdown().await;

        assert_eq!(
            exit,
            ConsumerExit::StreamEnded(ConsumeStats {
                read: 1,
                malformed: 0,
                dispatched: 1,
            })
        );
        assert_eq!(notify.len(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_stops_open_stream() {
        let notify = Arc::new(MemorySink::new("notify"));
        let pool = NotificationPool::start(aggregator(notify), 1, 4);

        let exit = run_consumer(futures::stream::pending::<Result<Bytes>>(), &pool, async {}).await;
        pool.shutdown().await;

        assert_eq!(exit, ConsumerExit::Stopped);
    }
}
