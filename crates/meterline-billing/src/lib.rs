//! # Meterline Billing
//!
//! Consumes the actions topic and publishes a billing notification for every
//! stopped pod, and answers on-demand billing queries over HTTP.
//!
//! ## Collaborators
//!
//! - **Usage store**: per-pod aggregates of the metrics topic (ClickHouse)
//! - **Price service**: tariffs by id
//! - **Notify topic**: where notifications are published

pub mod aggregator;
pub mod config;
pub mod consumer;
pub mod error;
pub mod http;
pub mod model;
pub mod pricing;
pub mod store;

pub use aggregator::{cumulative_entries, stop_notification, BillingAggregator, NotifyOutcome};
pub use config::BillingConfig;
pub use consumer::{consume_actions, run_consumer, ConsumeStats, ConsumerExit, NotificationPool};
pub use error::BillingError;
pub use model::{BillingEntry, Notification, PodUsage, Tariff};
