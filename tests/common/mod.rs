//! Shared fixtures for the integration suites.

use std::time::Duration;

use axum::body::Body;
use axum::http::Response;
use relay_harness::Handler;

/// Handler that answers every request with a fixed body.
pub fn text_handler(body: &'static str) -> Handler {
    Handler::new(move |_request| async move { Response::new(Body::from(body)) })
}

/// Client with a timeout so a wedged server fails the test instead of
/// hanging it.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .expect("client builds")
}

/// Client that accepts the self-signed certificate served by `start_tls`.
#[allow(dead_code)]
pub fn insecure_client() -> reqwest::Client {
    reqwest::Client::builder()
        .danger_accept_invalid_certs(true)
        .timeout(Duration::from_secs(10))
        .build()
        .expect("client builds")
}
