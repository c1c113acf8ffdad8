//! Latency-injecting relay servers for end-to-end HTTP testing.
//!
//! A relay is a real HTTP server on a loopback port that pauses each
//! request before handing it to a backend, simulating a proxy hop or a
//! slow connection. Two relays are provided:
//!
//! - [`Proxy`] fronts a single backend.
//! - [`Switcher`] rotates requests across several backends, round-robin.
//!
//! Backends are anything implementing [`Backend`]: a terminal
//! [`TestServer`] serving its own [`Handler`], or another relay, so
//! relays nest into chains. Each hop pauses twice per request, once per
//! direction, so a chain of `N` relays with latency `L` adds `2 × L × N`
//! to every round trip.
//!
//! Dispatch between a relay and its backend happens in-process by
//! calling the backend's handler; only the client-facing edge of the
//! server a request arrives at involves a socket. That keeps chains
//! working even when a downstream server has already closed its
//! listener.
//!
//! Servers pick an ephemeral loopback port on start and publish it via
//! [`Backend::base_url`]; relays can pin a specific port with `set_port`
//! before starting.
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use axum::{routing::get, Router};
//! use relay_harness::{Backend, Proxy, Switcher, TestServer};
//!
//! # async fn run() -> Result<(), relay_harness::RelayError> {
//! let hello = Router::new().route("/", get(|| async { "Hello client!" }));
//! let server = Arc::new(TestServer::new(hello).await?);
//!
//! // A slow connection: each request through the proxy takes >= 100 ms.
//! let proxy = Proxy::new(Duration::from_millis(50), server.clone()).await?;
//!
//! // Requests alternate between the server and the proxy in front of it.
//! let backends: Vec<Arc<dyn Backend>> = vec![server.clone(), Arc::new(proxy)];
//! let switcher = Switcher::new(Duration::from_millis(10), backends).await?;
//!
//! let url = switcher.base_url().expect("switcher is running");
//! // Point any HTTP client at `url`.
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod error;
pub(crate) mod net;
pub mod relay;

pub use backend::{Backend, Handler, TestServer};
pub use error::{RelayError, RelayResult};
pub use relay::{Proxy, Switcher};
