//! Event router
//!
//! Reads one datagram at a time, decodes the envelope, and appends the
//! payload verbatim to the sink matching the envelope kind. Every failure
//! is logged and the datagram dropped; nothing is retried, reordered, or
//! deduplicated. No state is kept between datagrams.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use meterline_common::log::EventSink;
use meterline_common::{Envelope, EnvelopeError, EnvelopeKind};
use tokio::net::UdpSocket;
use tracing::{debug, error, info, warn};

/// Result of routing a single datagram
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Payload appended to the sink for this kind
    Forwarded(EnvelopeKind),
    /// Not a decodable envelope
    Malformed,
    /// Decoded, but the type is not one we route
    UnknownKind(String),
    /// The sink rejected the write
    SinkFailed(EnvelopeKind),
}

/// Router counters
#[derive(Debug, Default)]
pub struct RouterStats {
    pub received: AtomicU64,
    pub forwarded: AtomicU64,
    pub malformed: AtomicU64,
    pub unknown: AtomicU64,
    pub sink_failures: AtomicU64,
}

impl RouterStats {
    fn record(&self, outcome: &RouteOutcome) {
        self.received.fetch_add(1, Ordering::Relaxed);
        let counter = match outcome {
            RouteOutcome::Forwarded(_) => &self.forwarded,
            RouteOutcome::Malformed => &self.malformed,
            RouteOutcome::UnknownKind(_) => &self.unknown,
            RouteOutcome::SinkFailed(_) => &self.sink_failures,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Datagrams dropped for any reason
    pub fn dropped(&self) -> u64 {
        self.malformed.load(Ordering::Relaxed)
            + self.unknown.load(Ordering::Relaxed)
            + self.sink_failures.load(Ordering::Relaxed)
    }
}

/// Demultiplexes envelopes onto the metrics and actions topics
pub struct EventRouter {
    metrics: Arc<dyn EventSink>,
    actions: Arc<dyn EventSink>,
    stats: RouterStats,
}

impl EventRouter {
    pub fn new(metrics: Arc<dyn EventSink>, actions: Arc<dyn EventSink>) -> Self {
        Self {
            metrics,
            actions,
            stats: RouterStats::default(),
        }
    }

    pub fn stats(&self) -> &RouterStats {
        &self.stats
    }

    fn sink_for(&self, kind: EnvelopeKind) -> &dyn EventSink {
        match kind {
            EnvelopeKind::Metric => self.metrics.as_ref(),
            EnvelopeKind::Action => self.actions.as_ref(),
        }
    }

    /// Route a single datagram
    pub async fn route(&self, datagram: &[u8]) -> RouteOutcome {
        let outcome = match Envelope::decode(datagram) {
            Ok(envelope) => {
                let kind = envelope.kind();
                let sink = self.sink_for(kind);
                let payload = envelope.into_payload();
                let bytes = payload.len();

                match sink.publish(payload).await {
                    Ok(()) => {
                        debug!(%kind, topic = sink.topic(), bytes, "Routed envelope");
                        RouteOutcome::Forwarded(kind)
                    }
                    Err(e) => {
                        error!(%kind, topic = sink.topic(), "Failed to write to sink: {}", e);
                        RouteOutcome::SinkFailed(kind)
                    }
                }
            }
            Err(EnvelopeError::UnknownKind(kind)) => {
                warn!(kind = %kind, "Unknown envelope type, dropping");
                RouteOutcome::UnknownKind(kind)
            }
            Err(e) => {
                warn!(bytes = datagram.len(), "Failed to decode envelope: {}", e);
                RouteOutcome::Malformed
            }
        };

        self.stats.record(&outcome);
        outcome
    }

    /// Serve datagrams from `socket` serially until `shutdown` resolves
    pub async fn serve<F>(&self, socket: &UdpSocket, max_datagram_bytes: usize, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut buf = vec![0u8; max_datagram_bytes];
        tokio::pin!(shutdown);

        if let Ok(addr) = socket.local_addr() {
            info!(%addr, "Router listening");
        }

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                received = socket.recv_from(&mut buf) => match received {
                    Ok((n, peer)) => {
                        debug!(%peer, bytes = n, "Datagram received");
                        self.route(&buf[..n]).await;
                    }
                    Err(e) => error!("Failed to read datagram: {}", e),
                },
            }
        }

        info!(
            received = self.stats.received.load(Ordering::Relaxed),
            forwarded = self.stats.forwarded.load(Ordering::Relaxed),
            dropped = self.stats.dropped(),
            "Router stopped"
        );
    }
}
