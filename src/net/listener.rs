//! Loopback listener binding.
//!
//! # Responsibilities
//! - Bind test servers to the local loopback interface only
//! - Fall back from IPv4 to IPv6 loopback when the former is unavailable
//! - Surface bind failures instead of panicking

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use tokio::net::TcpListener;

use crate::error::{RelayError, RelayResult};

/// Bind a loopback listener on the given port.
///
/// Port 0 asks the system for an ephemeral port. Tries `127.0.0.1` first
/// and falls back to `[::1]`, matching hosts where IPv4 loopback is
/// disabled. When both families fail, the IPv4 error is reported.
pub(crate) async fn bind_loopback(port: u16) -> RelayResult<(TcpListener, SocketAddr)> {
    let v4 = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
    let v4_err = match TcpListener::bind(v4).await {
        Ok(listener) => return bound(listener, port),
        Err(err) => err,
    };

    let v6 = SocketAddr::from((Ipv6Addr::LOCALHOST, port));
    match TcpListener::bind(v6).await {
        Ok(listener) => {
            tracing::debug!(port, "IPv4 loopback unavailable, using IPv6");
            bound(listener, port)
        }
        Err(_) => Err(RelayError::Bind {
            port,
            source: v4_err,
        }),
    }
}

fn bound(listener: TcpListener, port: u16) -> RelayResult<(TcpListener, SocketAddr)> {
    let addr = listener
        .local_addr()
        .map_err(|source| RelayError::Bind { port, source })?;

    tracing::debug!(address = %addr, "Listener bound");
    Ok((listener, addr))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn binds_an_ephemeral_port() {
        let (_listener, addr) = bind_loopback(0).await.unwrap();
        assert!(addr.ip().is_loopback());
        assert_ne!(addr.port(), 0);
    }

    #[tokio::test]
    async fn reports_a_port_conflict() {
        let (_v4, addr) = bind_loopback(0).await.unwrap();
        // Hold the same port on the other family so the fallback cannot win.
        let v6 = SocketAddr::from((Ipv6Addr::LOCALHOST, addr.port()));
        let Ok(_v6) = TcpListener::bind(v6).await else {
            // Another process owns the v6 side; nothing to assert here.
            return;
        };

        match bind_loopback(addr.port()).await {
            Err(RelayError::Bind { port, .. }) => assert_eq!(port, addr.port()),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("bind succeeded on an occupied port"),
        }
    }
}
