//! Relay subsystem.
//!
//! # Data Flow
//! ```text
//! Client request
//!     → relay's own server (net::server accept loop)
//!     → relay handler: pause latency, twice
//!     → proxy.rs (single backend) or switcher.rs (rotation.rs picks one)
//!     → backend's Handler invoked in-process
//!     → response returns to the client through the relay's server
//! ```
//!
//! # Design Decisions
//! - Relays dispatch in-process; the hop is simulated, never re-sent
//!   over TCP
//! - Two pauses per request model the two directions of a real hop
//! - Rotation state is per-switcher, never shared across instances

pub mod proxy;
pub mod rotation;
pub mod switcher;

pub use proxy::Proxy;
pub use rotation::RoundRobin;
pub use switcher::Switcher;
