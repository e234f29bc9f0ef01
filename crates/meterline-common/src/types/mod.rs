//! Wire types shared by the agent, router, and billing aggregator

pub mod envelope;
pub mod usage;
