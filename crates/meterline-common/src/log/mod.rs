//! Durable log plumbing
//!
//! Provides the append-only sink seam used by the router and the billing
//! aggregator, plus a JetStream-backed implementation:
//! - EventSink: publish one opaque record to a named topic
//! - JetStreamSink: one JetStream stream per topic, created on connect
//! - subscribe: durable pull consumer yielding raw record bytes
//! - MemorySink: in-process sink for tests and local runs

pub mod jetstream;
pub mod memory;

use async_trait::async_trait;
use bytes::Bytes;

use crate::Result;

pub use jetstream::{connect, subscribe, JetStreamSink, RecordStream};
pub use memory::MemorySink;

/// Append-only sink for one durable topic
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Topic this sink appends to
    fn topic(&self) -> &str;

    /// Append a single record. The bytes are written as-is.
    async fn publish(&self, payload: Bytes) -> Result<()>;
}
