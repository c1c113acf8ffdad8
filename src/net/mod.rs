//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! start / start_tls
//!     → listener.rs (loopback bind, IPv4 → IPv6 fallback)
//!     → tls.rs (optional self-signed acceptor)
//!     → server.rs (accept loop, connection tasks, Handler dispatch)
//!
//! Server States:
//!     Unstarted → Serving → Closed
//! ```
//!
//! # Design Decisions
//! - Servers bind loopback only; these are test fixtures, never exposed
//! - Closing drains in-flight requests before releasing the port
//! - Aborting client connections is separate from closing the server

pub(crate) mod listener;
pub(crate) mod server;
pub(crate) mod tls;
