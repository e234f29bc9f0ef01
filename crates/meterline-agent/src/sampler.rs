//! Usage sampler
//!
//! Runs beside one function instance. Every interval it probes memory and
//! emits a metric envelope; on the shutdown signal it emits a single `stop`
//! action envelope instead and returns. Transport failures are logged and
//! never stop the loop.

use std::future::Future;
use std::time::Duration;

use meterline_common::{Action, Envelope, Metric};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::scrape::MemoryProbe;
use crate::transport::EnvelopeTransport;

/// Identity of the sampled function instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodIdentity {
    pub pod: String,
    pub tenant: String,
}

/// Periodic usage sampler for one function instance
pub struct UsageSampler<P, T> {
    identity: PodIdentity,
    interval: Duration,
    probe: P,
    transport: T,
}

impl<P: MemoryProbe, T: EnvelopeTransport> UsageSampler<P, T> {
    pub fn new(identity: PodIdentity, interval: Duration, probe: P, transport: T) -> Self {
        Self {
            identity,
            interval,
            probe,
            transport,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Take one sample and send it. Returns the emitted metric.
    pub async fn tick(&self) -> Metric {
        let mem_mb = self.probe.memory_mb().await;
        let metric = Metric::new(&self.identity.pod, &self.identity.tenant, mem_mb);

        match Envelope::metric(&metric) {
            Ok(envelope) => {
                if let Err(e) = self.transport.send(&envelope).await {
                    error!(pod = %metric.pod, "Failed to send metric envelope: {}", e);
                }
            }
            Err(e) => error!(pod = %metric.pod, "Failed to encode metric: {}", e),
        }

        debug!(pod = %metric.pod, mem_mb = metric.mem_mb, "Sampled usage");
        metric
    }

    /// Emit the terminal stop action.
    ///
    /// Returns the action once it has been handed to the transport. Nothing
    /// is sent when the transport is already unusable.
    pub async fn on_shutdown(&self) -> Option<Action> {
        if !self.transport.is_usable() {
            warn!(pod = %self.identity.pod, "Transport unusable, stop action not sent");
            return None;
        }

        let action = Action::stop(&self.identity.pod, &self.identity.tenant);

        let envelope = match Envelope::action(&action) {
            Ok(envelope) => envelope,
            Err(e) => {
                error!(pod = %action.pod, "Failed to encode stop action: {}", e);
                return None;
            }
        };

        match self.transport.send(&envelope).await {
            Ok(()) => {
                info!(pod = %action.pod, tenant = %action.tenant, "Stop action emitted");
                Some(action)
            }
            Err(e) => {
                error!(pod = %action.pod, "Failed to send stop action: {}", e);
                None
            }
        }
    }

    /// Sample until `shutdown` resolves, then emit the stop action.
    ///
    /// The first sample is taken one interval after start. A slow probe
    /// delays the next tick instead of causing a burst of catch-up ticks.
    pub async fn run<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tokio::pin!(shutdown);

        info!(
            pod = %self.identity.pod,
            tenant = %self.identity.tenant,
            interval_ms = self.interval.as_millis() as u64,
            "Usage sampler started"
        );

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    self.on_shutdown().await;
                    break;
                }
                _ = ticker.tick() => {
                    self.tick().await;
                }
            }
        }

        info!(pod = %self.identity.pod, "Usage sampler stopped");
    }
}
