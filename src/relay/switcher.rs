//! Round-robin switching relay.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tokio::time::sleep;
use url::Url;

use crate::backend::{Backend, Handler};
use crate::error::{RelayError, RelayResult};
use crate::net::server::ServerCore;
use crate::relay::rotation::RoundRobin;

/// A delay relay that rotates requests across several backends.
///
/// Works like [`Proxy`](crate::relay::Proxy), pausing twice per request,
/// but each request is dispatched to the next backend in declaration
/// order, wrapping around at the end of the list. The rotation cursor is
/// owned by the switcher, so two switchers over the same backends rotate
/// independently.
///
/// Construction fails with [`RelayError::NoBackends`] when the backend
/// list is empty.
pub struct Switcher {
    latency: Duration,
    backends: Arc<Vec<Arc<dyn Backend>>>,
    core: ServerCore,
}

impl Switcher {
    /// Create a switcher without binding or serving anything yet.
    pub fn new_unstarted(
        latency: Duration,
        backends: Vec<Arc<dyn Backend>>,
    ) -> RelayResult<Self> {
        if backends.is_empty() {
            return Err(RelayError::NoBackends);
        }

        let backends = Arc::new(backends);
        let handler = relay_handler(latency, Arc::clone(&backends));
        Ok(Self {
            latency,
            backends,
            core: ServerCore::new(handler),
        })
    }

    /// Create a switcher and start serving plain HTTP immediately.
    pub async fn new(
        latency: Duration,
        backends: Vec<Arc<dyn Backend>>,
    ) -> RelayResult<Self> {
        let switcher = Self::new_unstarted(latency, backends)?;
        switcher.core.start().await?;
        Ok(switcher)
    }

    /// Pin the loopback port the switcher will serve on.
    ///
    /// Valid on an unstarted switcher only; the port is reserved right
    /// away.
    pub async fn set_port(&self, port: u16) -> RelayResult<()> {
        self.core.set_port(port).await
    }

    /// The pause applied per direction of the simulated hop.
    pub fn latency(&self) -> Duration {
        self.latency
    }

    /// The backends requests rotate across, in rotation order.
    pub fn backends(&self) -> &[Arc<dyn Backend>] {
        &self.backends
    }
}

impl std::fmt::Debug for Switcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Switcher")
            .field("latency", &self.latency)
            .field("backends", &self.backends.len())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Backend for Switcher {
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

/// The switcher's own handler: one pause per direction, then in-process
/// dispatch to the backend the rotation lands on.
///
/// The selector lives inside the handler, so rotation state follows the
/// handler wherever it is nested.
fn relay_handler(latency: Duration, backends: Arc<Vec<Arc<dyn Backend>>>) -> Handler {
    let rotation = Arc::new(RoundRobin::new());
    Handler::new(move |request| {
        let backends = Arc::clone(&backends);
        let rotation = Arc::clone(&rotation);
        async move {
            tracing::debug!(
                method = %request.method(),
                path = %request.uri().path(),
                latency_ms = latency.as_millis() as u64,
                "Relaying request"
            );
            sleep(latency).await;
            sleep(latency).await;

            let Some(backend) = rotation.next_backend(&backends) else {
                // Construction rejects empty backend lists.
                tracing::warn!("No backend available");
                return StatusCode::SERVICE_UNAVAILABLE.into_response();
            };
            backend.handler().call(request).await
        }
    })
}
