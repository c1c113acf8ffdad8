//! Self-signed TLS for HTTPS test servers.

use std::sync::{Arc, Once};

use tokio_rustls::rustls::pki_types::{PrivateKeyDer, PrivatePkcs8KeyDer};
use tokio_rustls::rustls::{self, ServerConfig};
use tokio_rustls::TlsAcceptor;

use crate::error::RelayResult;

static CRYPTO_PROVIDER: Once = Once::new();

/// Install the process-level rustls crypto provider exactly once.
///
/// Test binaries may link more than one provider, in which case rustls
/// refuses to pick one on its own.
fn install_crypto_provider() {
    CRYPTO_PROVIDER.call_once(|| {
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
    });
}

/// Build a TLS acceptor around a freshly generated self-signed certificate.
///
/// The certificate names the loopback hosts test clients connect with.
/// Clients are expected to disable verification; there is no chain of
/// trust back to a real authority.
pub(crate) fn self_signed_acceptor() -> RelayResult<TlsAcceptor> {
    install_crypto_provider();

    let certified = rcgen::generate_simple_self_signed(vec![
        "localhost".to_string(),
        "127.0.0.1".to_string(),
        "::1".to_string(),
    ])?;
    let cert = certified.cert.der().clone();
    let key = PrivatePkcs8KeyDer::from(certified.key_pair.serialize_der());

    let mut config = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(vec![cert], PrivateKeyDer::Pkcs8(key))?;
    config.alpn_protocols = vec![b"http/1.1".to_vec()];

    Ok(TlsAcceptor::from(Arc::new(config)))
}
