//! Shared agent session state
//!
//! One session exists per daemon. It holds the SoC endpoint, the last
//! installed settings and the last received topology behind a single async
//! mutex, so every read sees a consistent triple and the outbound client can
//! hold the lock across a full request/response exchange.

use std::net::{Ipv6Addr, SocketAddrV6};
use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};

use crate::error::{AgentError, Result};
use crate::settings::Settings;
use crate::topology::TopologyEntry;

/// Session state guarded by the session mutex
#[derive(Debug)]
pub(crate) struct SessionInner {
    pub(crate) endpoint: SocketAddrV6,
    pub(crate) settings: Settings,
    pub(crate) topology: Vec<TopologyEntry>,
}

/// Deep copy of the full session state, taken under one lock acquisition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub endpoint: SocketAddrV6,
    pub settings: Settings,
    pub topology: Vec<TopologyEntry>,
}

/// Cloneable handle to the shared session state
#[derive(Debug, Clone)]
pub struct Session {
    inner: Arc<Mutex<SessionInner>>,
}

impl Session {
    /// Create a session pointing at the loopback SoC endpoint with default
    /// settings and no topology
    pub fn new(soc_port: u16) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SessionInner {
                endpoint: SocketAddrV6::new(Ipv6Addr::LOCALHOST, soc_port, 0, 0),
                settings: Settings::default(),
                topology: Vec::new(),
            })),
        }
    }

    /// Point the session at a new SoC address, installing the given
    /// settings or the compiled-in defaults
    ///
    /// The address is validated before the lock is taken; a bad address
    /// leaves both endpoint and settings untouched.
    pub async fn set_endpoint(&self, addr: &str, settings: Option<Settings>) -> Result<()> {
        let ip: Ipv6Addr = addr
            .parse()
            .map_err(|_| AgentError::InvalidAddress(addr.to_string()))?;
        let mut inner = self.inner.lock().await;
        inner.endpoint.set_ip(ip);
        inner.settings = settings.unwrap_or_default();
        Ok(())
    }

    /// Retarget the session at a connected peer and install its settings
    pub async fn set_peer_endpoint(&self, ip: Ipv6Addr, settings: Settings) {
        let mut inner = self.inner.lock().await;
        inner.endpoint.set_ip(ip);
        inner.settings = settings;
    }

    pub async fn endpoint(&self) -> SocketAddrV6 {
        self.inner.lock().await.endpoint
    }

    /// Copy the whole session state as one consistent unit
    ///
    /// Endpoint, settings and topology come from a single lock acquisition,
    /// so a concurrent update can never tear the triple.
    pub async fn snapshot(&self) -> SessionSnapshot {
        let inner = self.inner.lock().await;
        SessionSnapshot {
            endpoint: inner.endpoint,
            settings: inner.settings.clone(),
            topology: inner.topology.clone(),
        }
    }

    pub async fn settings(&self) -> Settings {
        self.inner.lock().await.settings.clone()
    }

    pub async fn set_settings(&self, settings: Settings) {
        self.inner.lock().await.settings = settings;
    }

    /// Replace the stored topology
    ///
    /// An empty topology is never stored; clearing is a separate operation.
    pub async fn set_topology(&self, entries: Vec<TopologyEntry>) -> Result<()> {
        if entries.is_empty() {
            return Err(AgentError::InvalidPayload(
                "refusing to store empty topology".to_string(),
            ));
        }
        self.inner.lock().await.topology = entries;
        Ok(())
    }

    pub async fn topology(&self) -> Vec<TopologyEntry> {
        self.inner.lock().await.topology.clone()
    }

    /// Drop the stored topology; idempotent
    pub async fn clear_topology(&self) {
        self.inner.lock().await.topology.clear();
    }

    /// Take the session lock for a multi-step exchange
    pub(crate) async fn exclusive(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().await
    }
}
