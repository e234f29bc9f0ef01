//! # Meterline Common
//!
//! Shared wire types, errors, and durable log plumbing for the Meterline
//! metering & billing pipeline.
//!
//! ## Wire types
//!
//! - [`Envelope`]: typed container (`metric` | `action`) sent by the agent
//! - [`Metric`]: one memory/CPU sample for a function instance
//! - [`Action`]: lifecycle event; `stop` ends the billable lifetime
//!
//! ## Durable logs
//!
//! - [`log::EventSink`]: append-only topic sink
//! - [`log::JetStreamSink`]: NATS JetStream implementation

pub mod env;
pub mod error;
pub mod log;
pub mod shutdown;
pub mod telemetry;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{MeterlineError, Result};
pub use types::{
    envelope::{Envelope, EnvelopeError, EnvelopeKind},
    usage::{unix_now, Action, ActionKind, Metric},
};

/// Meterline version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default topic for metric records
pub const DEFAULT_METRICS_TOPIC: &str = "function_metrics";

/// Default topic for action records
pub const DEFAULT_ACTIONS_TOPIC: &str = "function_actions";

/// Default topic for billing notifications
pub const DEFAULT_NOTIFY_TOPIC: &str = "notify";

/// Default retention of every durable topic (seven days)
pub const DEFAULT_STREAM_MAX_AGE_SECS: u64 = 7 * 24 * 60 * 60;

/// Default router address the agents send to
pub const DEFAULT_ROUTER_PORT: u16 = 5461;
