//! Server lifecycle coverage: start, close, drain, and abort.

mod common;

use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::Response;
use axum::routing::get;
use axum::Router;
use relay_harness::{Backend, Handler, RelayError, TestServer};
use tokio::sync::mpsc;
use tokio::time::sleep;

use common::{client, insecure_client, text_handler};

#[tokio::test]
async fn base_url_appears_on_start() {
    let server = TestServer::new_unstarted(text_handler("up"));
    assert!(server.base_url().is_none());

    server.start().await.unwrap();
    let url = server.base_url().unwrap();
    assert_eq!(url.scheme(), "http");

    server.close().await.unwrap();
    // The last known address stays readable after close.
    assert!(server.base_url().is_some());
}

#[tokio::test]
async fn start_tls_serves_https() {
    let server = TestServer::new_unstarted(text_handler("secure"));
    server.start_tls().await.unwrap();

    let url = server.base_url().unwrap();
    assert_eq!(url.scheme(), "https");
    let body = insecure_client()
        .get(url)
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "secure");

    server.close().await.unwrap();
}

#[tokio::test]
async fn a_closed_server_refuses_connections() {
    let server = TestServer::new(text_handler("gone")).await.unwrap();
    let url = server.base_url().unwrap();
    assert!(client().get(url.clone()).send().await.is_ok());

    server.close().await.unwrap();
    assert!(client().get(url).send().await.is_err());
}

#[tokio::test]
async fn double_close_is_reported() {
    let server = TestServer::new(text_handler("once")).await.unwrap();
    server.close().await.unwrap();

    assert!(matches!(
        server.close().await,
        Err(RelayError::AlreadyClosed)
    ));
}

#[tokio::test]
async fn restarting_a_closed_server_is_rejected() {
    let server = TestServer::new(text_handler("done")).await.unwrap();
    server.close().await.unwrap();

    assert!(matches!(
        server.start().await,
        Err(RelayError::AlreadyClosed)
    ));
}

#[tokio::test]
async fn close_waits_for_requests_in_flight() {
    let (entered_tx, mut entered_rx) = mpsc::unbounded_channel();
    let handler = Handler::new(move |_request| {
        let entered = entered_tx.clone();
        async move {
            let _ = entered.send(());
            sleep(Duration::from_millis(300)).await;
            Response::new(Body::from("drained"))
        }
    });
    let server = TestServer::new(handler).await.unwrap();

    let url = server.base_url().unwrap();
    let request = tokio::spawn(async move {
        client()
            .get(url)
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap()
    });

    // Close only once the handler is known to be running.
    entered_rx.recv().await.unwrap();
    let closing = Instant::now();
    server.close().await.unwrap();
    let waited = closing.elapsed();

    assert_eq!(request.await.unwrap(), "drained");
    assert!(
        waited >= Duration::from_millis(200),
        "close returned after {waited:?}, before the request finished"
    );
}

#[tokio::test]
async fn aborting_client_connections_leaves_the_server_accepting() {
    let (entered_tx, mut entered_rx) = mpsc::unbounded_channel();
    let router = Router::new()
        .route("/", get(|| async { "fast" }))
        .route(
            "/slow",
            get(move || {
                let entered = entered_tx.clone();
                async move {
                    let _ = entered.send(());
                    sleep(Duration::from_secs(30)).await;
                    "slow"
                }
            }),
        );
    let server = TestServer::new(router).await.unwrap();
    let url = server.base_url().unwrap();

    let slow_url = url.join("slow").unwrap();
    let slow = tokio::spawn(async move { client().get(slow_url).send().await });
    entered_rx.recv().await.unwrap();

    server.close_client_connections();

    let aborted = Instant::now();
    let result = slow.await.unwrap();
    assert!(result.is_err(), "aborted request should not complete");
    assert!(
        aborted.elapsed() < Duration::from_secs(5),
        "aborted request was not cut short"
    );

    // The listener is untouched; fresh connections still succeed.
    let body = client()
        .get(url)
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "fast");
}
