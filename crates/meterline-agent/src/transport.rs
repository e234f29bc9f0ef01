//! Datagram transport to the router
//!
//! One envelope per datagram, no acknowledgement, no retry.

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use meterline_common::{Envelope, MeterlineError, Result};
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

/// Fire-and-forget envelope transport
#[async_trait]
pub trait EnvelopeTransport: Send + Sync {
    /// Send one envelope
    async fn send(&self, envelope: &Envelope) -> Result<()>;

    /// Whether sends can still be attempted
    fn is_usable(&self) -> bool {
        true
    }
}

/// UDP transport bound to a single router address
pub struct UdpTransport {
    socket: UdpSocket,
    peer: SocketAddr,
    open: AtomicBool,
}

impl UdpTransport {
    /// Resolve the router address and connect an ephemeral socket to it
    pub async fn connect(addr: &str) -> Result<Self> {
        let peer = tokio::net::lookup_host(addr)
            .await?
            .next()
            .ok_or_else(|| MeterlineError::Config(format!("Router address {} did not resolve", addr)))?;

        let local: SocketAddr = if peer.is_ipv4() {
            "0.0.0.0:0".parse().map_err(|_| MeterlineError::Internal("bad bind address".into()))?
        } else {
            "[::]:0".parse().map_err(|_| MeterlineError::Internal("bad bind address".into()))?
        };

        let socket = UdpSocket::bind(local).await?;
        socket.connect(peer).await?;
        info!(%peer, "UDP transport connected");

        Ok(Self {
            socket,
            peer,
            open: AtomicBool::new(true),
        })
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Mark the transport closed; later sends fail immediately
    pub fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }

    /// Close the transport if `error` means the socket can no longer send.
    ///
    /// A refused or interrupted datagram is transient; the next interval
    /// tries again.
    fn record_send_error(&self, error: &io::Error) {
        if is_fatal(error.kind()) {
            warn!(peer = %self.peer, "Transport unusable after send error: {}", error);
            self.close();
        }
    }
}

fn is_fatal(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::NotConnected
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::AddrNotAvailable
            | io::ErrorKind::PermissionDenied
            | io::ErrorKind::InvalidInput
    )
}

#[async_trait]
impl EnvelopeTransport for UdpTransport {
    async fn send(&self, envelope: &Envelope) -> Result<()> {
        if !self.is_usable() {
            return Err(MeterlineError::Transport("transport closed".into()));
        }

        let datagram = envelope.encode()?;
        let sent = self.socket.send(&datagram).await.map_err(|e| {
            self.record_send_error(&e);
            MeterlineError::from(e)
        })?;
        debug!(kind = %envelope.kind(), bytes = sent, "Envelope sent");
        Ok(())
    }

    fn is_usable(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}
