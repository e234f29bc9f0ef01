//! # Meterline Router
//!
//! Receives envelopes from every agent over UDP and relays each payload,
//! unchanged, onto the `metrics` or `actions` durable topic.
//!
//! The router holds no cross-datagram state, so several instances may share
//! one receive address without coordination.

pub mod config;
pub mod router;

pub use config::RouterConfig;
pub use router::{EventRouter, RouteOutcome, RouterStats};
