//! The capability shared by every server a relay can sit in front of.

use async_trait::async_trait;
use url::Url;

use crate::backend::handler::Handler;
use crate::error::RelayResult;

/// A test server that can sit behind a relay.
///
/// `TestServer`, `Proxy`, and `Switcher` all implement this trait, which is
/// what lets relays nest: a proxy can front a terminal server, another
/// proxy, or a switcher without knowing which it has.
///
/// Implementations serve plain HTTP or HTTPS on a loopback port and expose
/// their request [`Handler`] so an enclosing relay can dispatch to it
/// in-process.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Begin serving plain HTTP on the bound or a system-chosen port.
    async fn start(&self) -> RelayResult<()>;

    /// Begin serving HTTPS using a freshly generated self-signed certificate.
    async fn start_tls(&self) -> RelayResult<()>;

    /// Stop accepting connections, wait for in-flight requests to finish,
    /// and release the port.
    async fn close(&self) -> RelayResult<()>;

    /// Abort every connection a client currently holds open.
    ///
    /// The server keeps running and accepting new connections.
    fn close_client_connections(&self);

    /// Root URL of the running server, `None` before `start`.
    fn base_url(&self) -> Option<Url>;

    /// The server's request handler.
    ///
    /// Stays callable after `close`, which is what keeps a relay chain
    /// working when a downstream server has already shut its listener.
    fn handler(&self) -> Handler;
}
