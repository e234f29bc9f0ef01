//! # Meterline Agent
//!
//! In-process usage sampler for one function instance. Sends a `metric`
//! envelope per interval and a single `stop` action on termination, over a
//! best-effort datagram transport to the router.

pub mod config;
pub mod sampler;
pub mod scrape;
pub mod transport;

pub use config::AgentConfig;
pub use sampler::{PodIdentity, UsageSampler};
pub use scrape::{parse_memory_mb, HttpMemoryScraper, MemoryProbe};
pub use transport::{EnvelopeTransport, UdpTransport};
