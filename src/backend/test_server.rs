//! Terminal test server.

use async_trait::async_trait;
use url::Url;

use crate::backend::handler::Handler;
use crate::backend::traits::Backend;
use crate::error::RelayResult;
use crate::net::server::ServerCore;

/// A terminal HTTP server for end-to-end tests.
///
/// Serves its [`Handler`] on a system-chosen loopback port. Put one at the
/// end of a relay chain and point test clients at the outermost relay's
/// [`base_url`](Backend::base_url).
///
/// ```no_run
/// use relay_harness::{Backend, TestServer};
/// use axum::{routing::get, Router};
///
/// # async fn run() -> Result<(), relay_harness::RelayError> {
/// let router = Router::new().route("/", get(|| async { "Hello client!" }));
/// let server = TestServer::new(router).await?;
/// let url = server.base_url();
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct TestServer {
    core: ServerCore,
}

impl TestServer {
    /// Create a server without binding or serving anything yet.
    pub fn new_unstarted(handler: impl Into<Handler>) -> Self {
        Self {
            core: ServerCore::new(handler.into()),
        }
    }

    /// Create a server and start serving plain HTTP immediately.
    pub async fn new(handler: impl Into<Handler>) -> RelayResult<Self> {
        let server = Self::new_unstarted(handler);
        server.core.start().await?;
        Ok(server)
    }
}

#[async_trait]
impl Backend for TestServer {
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
