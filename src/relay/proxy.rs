//! Latency-injecting proxy relay.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;
use url::Url;

use crate::backend::{Backend, Handler};
use crate::error::RelayResult;
use crate::net::server::ServerCore;

/// A delay relay in front of a single backend.
///
/// Each request pauses for the configured latency twice, once per
/// direction of the simulated hop, and is then dispatched to the
/// backend's handler in-process. A chain of `N` proxies therefore adds
/// `2 × latency × N` to every round trip.
///
/// The backend can be a [`TestServer`](crate::backend::TestServer),
/// another `Proxy`, or a [`Switcher`](crate::relay::Switcher); anything
/// implementing [`Backend`] nests.
pub struct Proxy {
    latency: Duration,
    backend: Arc<dyn Backend>,
    core: ServerCore,
}

impl Proxy {
    /// Create a proxy without binding or serving anything yet.
    pub fn new_unstarted(latency: Duration, backend: Arc<dyn Backend>) -> Self {
        let handler = relay_handler(latency, Arc::clone(&backend));
        Self {
            latency,
            backend,
            core: ServerCore::new(handler),
        }
    }

    /// Create a proxy and start serving plain HTTP immediately.
    pub async fn new(latency: Duration, backend: Arc<dyn Backend>) -> RelayResult<Self> {
        let proxy = Self::new_unstarted(latency, backend);
        proxy.core.start().await?;
        Ok(proxy)
    }

    /// Pin the loopback port the proxy will serve on.
    ///
    /// Valid on an unstarted proxy only; the port is reserved right away.
    pub async fn set_port(&self, port: u16) -> RelayResult<()> {
        self.core.set_port(port).await
    }

    /// The pause applied per direction of the simulated hop.
    pub fn latency(&self) -> Duration {
        self.latency
    }

    /// The backend this proxy fronts.
    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }
}

impl std::fmt::Debug for Proxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Proxy")
            .field("latency", &self.latency)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Backend for Proxy {
    async fn start(&self) -> RelayResult<()> {
        self.core.start().await
    }

    async fn start_tls(&self) -> RelayResult<()> {
        self.core.start_tls().await
    }

    async fn close(&self) -> RelayResult<()> {
        self.core.close().await
    }

    fn close_client_connections(&self) {
        self.core.close_client_connections();
    }

    fn base_url(&self) -> Option<Url> {
        self.core.base_url()
    }

    fn handler(&self) -> Handler {
        self.core.handler()
    }
}

/// The proxy's own handler: one pause per direction, then in-process
/// dispatch to the backend.
fn relay_handler(latency: Duration, backend: Arc<dyn Backend>) -> Handler {
    Handler::new(move |request| {
        let backend = Arc::clone(&backend);
        async move {
            tracing::debug!(
                method = %request.method(),
                path = %request.uri().path(),
                latency_ms = latency.as_millis() as u64,
                "Relaying request"
            );
            sleep(latency).await;
            sleep(latency).await;
            backend.handler().call(request).await
        }
    })
}
