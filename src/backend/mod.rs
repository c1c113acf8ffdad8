//! Backend subsystem.
//!
//! # Data Flow
//! ```text
//! Construction:
//!     closure or axum::Router
//!     → handler.rs (boxed async Handler)
//!     → test_server.rs (terminal server around the handler)
//!
//! Nesting:
//!     any Backend (TestServer, Proxy, Switcher)
//!     → traits.rs (lifecycle + handler extraction contract)
//!     → enclosing relay dispatches via Backend::handler
//! ```
//!
//! # Design Decisions
//! - Handlers are extracted, not proxied: a relay calls its backend's
//!   handler in-process instead of re-sending the request over TCP
//! - Handlers outlive their server's listener, so chains keep working
//!   after a downstream close
//! - The trait is object-safe; relays hold `Arc<dyn Backend>`

pub mod handler;
pub mod test_server;
pub mod traits;

pub use handler::Handler;
pub use test_server::TestServer;
pub use traits::Backend;
