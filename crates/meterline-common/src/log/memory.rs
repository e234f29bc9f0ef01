//! In-memory sink
//!
//! Records every published payload; can be switched into a failing mode to
//! exercise error paths.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;

use super::EventSink;
use crate::{MeterlineError, Result};

#[derive(Debug)]
pub struct MemorySink {
    topic: String,
    records: Mutex<Vec<Bytes>>,
    failing: AtomicBool,
}

impl MemorySink {
    pub fn new(topic: &str) -> Self {
        Self {
            topic: topic.to_string(),
            records: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
        }
    }

    /// Make subsequent publishes fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Snapshot of everything published so far
    pub fn records(&self) -> Vec<Bytes> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

#[async_trait]
impl EventSink for MemorySink {
    fn topic(&self) -> &str {
        &self.topic
    }

    async fn publish(&self, payload: Bytes) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(MeterlineError::Log(format!("{} unavailable", self.topic)));
        }
        self.records.lock().push(payload);
        Ok(())
    }
}
