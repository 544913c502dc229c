//! Outbound network reachability check
//!
//! A failed probe is the offline signal, not an error. There is no retry here;
//! the dialogue loop probes again at the start of every turn.

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;

use crate::config::ProbeConfig;

/// Whether remote services are reachable for the current turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityState {
    Online,
    Offline,
}

impl ConnectivityState {
    /// Lowercase name for logs
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
        }
    }
}

impl std::fmt::Display for ConnectivityState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Online => "ONLINE",
            Self::Offline => "OFFLINE",
        })
    }
}

/// Answers "is outbound network reachable?"
#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self) -> ConnectivityState;
}

/// Probes connectivity with a single bounded TCP connect
#[derive(Debug, Clone)]
pub struct TcpProbe {
    target: SocketAddr,
    timeout: Duration,
}

impl TcpProbe {
    /// Create a probe against `target` bounded by `timeout`
    #[must_use]
    pub const fn new(target: SocketAddr, timeout: Duration) -> Self {
        Self { target, timeout }
    }

    #[must_use]
    pub const fn from_config(config: &ProbeConfig) -> Self {
        Self::new(config.target, config.timeout)
    }
}

#[async_trait]
impl Probe for TcpProbe {
    async fn probe(&self) -> ConnectivityState {
        match tokio::time::timeout(self.timeout, TcpStream::connect(self.target)).await {
            Ok(Ok(_stream)) => ConnectivityState::Online,
            Ok(Err(e)) => {
                tracing::debug!(addr = %self.target, error = %e, "probe connect failed");
                ConnectivityState::Offline
            }
            Err(_) => {
                tracing::debug!(addr = %self.target, timeout = ?self.timeout, "probe timed out");
                ConnectivityState::Offline
            }
        }
    }
}

/// Probe pinned to one state, used by `--offline-only` and in tests
#[derive(Debug, Clone, Copy)]
pub struct FixedProbe(pub ConnectivityState);

#[async_trait]
impl Probe for FixedProbe {
    async fn probe(&self) -> ConnectivityState {
        self.0
    }
}
