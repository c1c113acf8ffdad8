//! Serving core shared by every test server in the crate.
//!
//! # Data Flow
//! ```text
//! start / start_tls
//!     → bind loopback listener (or adopt the one pinned by set_port)
//!     → spawn accept loop
//!         → per connection: optional TLS handshake
//!         → hyper HTTP/1.1 connection driving the server's Handler
//!
//! close
//!     → flip the stop signal
//!     → accept loop exits, listener drops (port released)
//!     → in-flight connections drain gracefully
//! ```
//!
//! # Design Decisions
//! - One state machine (Unstarted → Serving → Closed) guards the lifecycle
//! - A watch channel fans the stop signal out to the accept loop and to
//!   every connection task
//! - Connection tasks are tracked so `close_client_connections` can abort
//!   them without touching the accept loop

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex as StdMutex};

use axum::body::Body;
use axum::http::Request;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{watch, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tokio_rustls::TlsAcceptor;
use url::Url;

use crate::backend::handler::Handler;
use crate::error::{RelayError, RelayResult};
use crate::net::{listener, tls};

/// Lifecycle phase of a server.
#[derive(Debug)]
enum ServerState {
    /// Not serving yet. Holds the listener pinned by `set_port`, if any.
    Unstarted {
        pinned: Option<(TcpListener, SocketAddr)>,
    },
    /// Accept loop running.
    Serving {
        stop: watch::Sender<bool>,
        accept_task: JoinHandle<()>,
    },
    /// Shut down for good.
    Closed,
}

/// Lifecycle machinery behind `TestServer`, `Proxy`, and `Switcher`.
///
/// Owns the handler, the bound listener, and the tasks serving accepted
/// connections. The wrapping types only add their construction rules and
/// their relaying handlers.
#[derive(Debug)]
pub(crate) struct ServerCore {
    handler: Handler,
    state: AsyncMutex<ServerState>,
    /// Published on start; readable from sync contexts.
    base_url: StdMutex<Option<Url>>,
    connections: Arc<ConnectionRegistry>,
}

impl ServerCore {
    pub(crate) fn new(handler: Handler) -> Self {
        Self {
            handler,
            state: AsyncMutex::new(ServerState::Unstarted { pinned: None }),
            base_url: StdMutex::new(None),
            connections: Arc::new(ConnectionRegistry::default()),
        }
    }

    /// The handler this server dispatches requests to.
    pub(crate) fn handler(&self) -> Handler {
        self.handler.clone()
    }

    /// Root URL of the running server, `None` before start.
    pub(crate) fn base_url(&self) -> Option<Url> {
        self.base_url.lock().expect("base URL lock poisoned").clone()
    }

    /// Bind the given loopback port ahead of `start`.
    ///
    /// Only valid while the server is unstarted. The port is reserved
    /// immediately; `start` adopts the pinned listener instead of asking
    /// the system for one.
    pub(crate) async fn set_port(&self, port: u16) -> RelayResult<()> {
        let mut state = self.state.lock().await;
        match &mut *state {
            ServerState::Unstarted { pinned } => {
                let bound = listener::bind_loopback(port).await?;
                tracing::debug!(address = %bound.1, "Port pinned");
                *pinned = Some(bound);
                Ok(())
            }
            ServerState::Serving { .. } => Err(RelayError::AlreadyStarted),
            ServerState::Closed => Err(RelayError::AlreadyClosed),
        }
    }

    /// Begin serving plain HTTP.
    pub(crate) async fn start(&self) -> RelayResult<()> {
        self.serve(None).await
    }

    /// Begin serving HTTPS behind a freshly generated self-signed
    /// certificate.
    pub(crate) async fn start_tls(&self) -> RelayResult<()> {
        let acceptor = tls::self_signed_acceptor()?;
        self.serve(Some(acceptor)).await
    }

    async fn serve(&self, tls: Option<TlsAcceptor>) -> RelayResult<()> {
        let mut state = self.state.lock().await;

        let pinned = match &mut *state {
            ServerState::Unstarted { pinned } => pinned.take(),
            ServerState::Serving { .. } => return Err(RelayError::AlreadyStarted),
            ServerState::Closed => return Err(RelayError::AlreadyClosed),
        };
        let (listener, addr) = match pinned {
            Some(bound) => bound,
            None => listener::bind_loopback(0).await?,
        };

        let scheme = if tls.is_some() { "https" } else { "http" };
        let url = Url::parse(&format!("{scheme}://{addr}")).unwrap();

        let (stop, stop_rx) = watch::channel(false);
        let accept_task = tokio::spawn(accept_loop(
            listener,
            self.handler.clone(),
            tls,
            stop_rx,
            Arc::clone(&self.connections),
        ));

        *self.base_url.lock().expect("base URL lock poisoned") = Some(url);
        *state = ServerState::Serving { stop, accept_task };

        tracing::info!(address = %addr, scheme, "Server started");
        Ok(())
    }

    /// Stop accepting, wait for in-flight requests, release the port.
    ///
    /// Closing a server that never started is a no-op; closing twice is an
    /// error.
    pub(crate) async fn close(&self) -> RelayResult<()> {
        let mut state = self.state.lock().await;

        match std::mem::replace(&mut *state, ServerState::Closed) {
            ServerState::Unstarted { .. } => {
                tracing::debug!("Server closed before it ever started");
                Ok(())
            }
            ServerState::Serving { stop, accept_task } => {
                let _ = stop.send(true);
                if let Err(err) = accept_task.await {
                    tracing::warn!(error = %err, "Accept loop ended abnormally");
                }
                tracing::info!("Server closed");
                Ok(())
            }
            ServerState::Closed => Err(RelayError::AlreadyClosed),
        }
    }

    /// Abort every connection currently held open by a client.
    ///
    /// The accept loop keeps running, so new connections still succeed.
    pub(crate) fn close_client_connections(&self) {
        let aborted = self.connections.abort_all();
        tracing::debug!(connections = aborted, "Client connections aborted");
    }
}

/// Tasks serving accepted connections, tracked for abort and drain.
#[derive(Debug, Default)]
struct ConnectionRegistry {
    tasks: StdMutex<Vec<JoinHandle<()>>>,
}

impl ConnectionRegistry {
    fn track(&self, task: JoinHandle<()>) {
        let mut tasks = self
            .tasks
            .lock()
            .expect("connection registry lock poisoned");
        tasks.retain(|task| !task.is_finished());
        tasks.push(task);
    }

    fn abort_all(&self) -> usize {
        let mut tasks = self
            .tasks
            .lock()
            .expect("connection registry lock poisoned");
        let count = tasks.len();
        for task in tasks.drain(..) {
            task.abort();
        }
        count
    }

    async fn drain(&self) {
        let tasks = std::mem::take(
            &mut *self
                .tasks
                .lock()
                .expect("connection registry lock poisoned"),
        );
        for task in tasks {
            if let Err(err) = task.await {
                if !err.is_cancelled() {
                    tracing::debug!(error = %err, "Connection task failed");
                }
            }
        }
    }
}

async fn accept_loop(
    listener: TcpListener,
    handler: Handler,
    tls: Option<TlsAcceptor>,
    mut stop: watch::Receiver<bool>,
    connections: Arc<ConnectionRegistry>,
) {
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    tracing::debug!(peer_addr = %peer, "Connection accepted");
                    let task = tokio::spawn(serve_connection(
                        stream,
                        peer,
                        handler.clone(),
                        tls.clone(),
                        stop.clone(),
                    ));
                    connections.track(task);
                }
                Err(err) => {
                    tracing::warn!(error = %err, "Accept failed");
                }
            },
            _ = stop.changed() => break,
        }
    }

    // Release the port before waiting out in-flight requests.
    drop(listener);
    connections.drain().await;
}

async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    handler: Handler,
    tls: Option<TlsAcceptor>,
    mut stop: watch::Receiver<bool>,
) {
    match tls {
        Some(acceptor) => {
            let handshake = tokio::select! {
                handshake = acceptor.accept(stream) => handshake,
                _ = stop.changed() => return,
            };
            match handshake {
                Ok(stream) => drive_http1(stream, peer, handler, stop).await,
                Err(err) => {
                    tracing::debug!(peer_addr = %peer, error = %err, "TLS handshake failed");
                }
            }
        }
        None => drive_http1(stream, peer, handler, stop).await,
    }
}

async fn drive_http1<S>(
    stream: S,
    peer: SocketAddr,
    handler: Handler,
    mut stop: watch::Receiver<bool>,
) where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send + 'static,
{
    let service = service_fn(move |request: Request<Incoming>| {
        let handler = handler.clone();
        async move { Ok::<_, Infallible>(handler.call(request.map(Body::new)).await) }
    });

    let conn = http1::Builder::new().serve_connection(TokioIo::new(stream), service);
    tokio::pin!(conn);

    tokio::select! {
        result = conn.as_mut() => {
            if let Err(err) = result {
                tracing::debug!(peer_addr = %peer, error = %err, "Connection ended with error");
            }
        }
        _ = stop.changed() => {
            // Finish the in-flight exchange, then close.
            conn.as_mut().graceful_shutdown();
            if let Err(err) = conn.as_mut().await {
                tracing::debug!(peer_addr = %peer, error = %err, "Connection ended during drain");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Response;

    fn noop_handler() -> Handler {
        Handler::new(|_request| async { Response::new(Body::empty()) })
    }

    #[tokio::test]
    async fn start_publishes_a_base_url() {
        let core = ServerCore::new(noop_handler());
        assert!(core.base_url().is_none());

        core.start().await.unwrap();
        let url = core.base_url().unwrap();
        assert_eq!(url.scheme(), "http");

        core.close().await.unwrap();
    }

    #[tokio::test]
    async fn start_twice_is_rejected() {
        let core = ServerCore::new(noop_handler());
        core.start().await.unwrap();

        assert!(matches!(
            core.start().await,
            Err(RelayError::AlreadyStarted)
        ));
        core.close().await.unwrap();
    }

    #[tokio::test]
    async fn close_twice_is_rejected() {
        let core = ServerCore::new(noop_handler());
        core.start().await.unwrap();
        core.close().await.unwrap();

        assert!(matches!(core.close().await, Err(RelayError::AlreadyClosed)));
    }

    #[tokio::test]
    async fn closing_an_unstarted_server_is_a_no_op() {
        let core = ServerCore::new(noop_handler());
        core.close().await.unwrap();

        assert!(matches!(core.start().await, Err(RelayError::AlreadyClosed)));
    }
}
