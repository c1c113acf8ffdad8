//! Crate-wide error definitions.

use thiserror::Error;

/// Errors that can occur while constructing or driving a relay server.
#[derive(Debug, Error)]
pub enum RelayError {
    /// A switcher was built with an empty backend list.
    #[error("switcher requires at least one backend")]
    NoBackends,

    /// `start` or `start_tls` was called on a server that is already running.
    #[error("server is already running")]
    AlreadyStarted,

    /// The server was closed and cannot be started or closed again.
    #[error("server is already closed")]
    AlreadyClosed,

    /// Binding a loopback listener failed on both address families.
    #[error("failed to bind loopback port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    /// Generating the self-signed certificate for `start_tls` failed.
    #[error("certificate generation failed: {0}")]
    CertificateGeneration(#[from] rcgen::Error),

    /// Assembling the rustls server configuration failed.
    #[error("TLS configuration failed: {0}")]
    TlsConfig(#[from] tokio_rustls::rustls::Error),
}

/// Result type for relay operations.
pub type RelayResult<T> = Result<T, RelayError>;
