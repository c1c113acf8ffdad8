//! Chains two relays in front of a test server, then rotates a switcher
//! across two more, printing the observed round-trip times.
//!
//! Run with `cargo run --example latency_chain`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::routing::get;
use axum::Router;
use relay_harness::{Backend, Proxy, Switcher, TestServer};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "relay_harness=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let router = Router::new().route("/", get(|| async { "Hello client!" }));
    let origin = Arc::new(TestServer::new(router).await?);

    // Two relays in series, each pausing 100ms per direction.
    let near = Arc::new(Proxy::new(Duration::from_millis(100), origin.clone()).await?);
    let far = Proxy::new(Duration::from_millis(100), near).await?;

    let url = far.base_url().ok_or("relay has no address")?;
    let started = Instant::now();
    let body = reqwest::get(url).await?.text().await?;
    println!("two hops answered {body:?} in {:?}", started.elapsed());

    // A switcher rotating between two backends, pausing 10ms per direction.
    let good_day = Arc::new(
        TestServer::new(Router::new().route("/", get(|| async { "Good day client!" }))).await?,
    );
    let paloma = Arc::new(
        TestServer::new(Router::new().route("/", get(|| async { "Paloma client!" }))).await?,
    );
    let backends: Vec<Arc<dyn Backend>> = vec![good_day, paloma];
    let switcher = Switcher::new(Duration::from_millis(10), backends).await?;

    let url = switcher.base_url().ok_or("switcher has no address")?;
    for _ in 0..4 {
        let started = Instant::now();
        let body = reqwest::get(url.clone()).await?.text().await?;
        println!("switcher answered {body:?} in {:?}", started.elapsed());
    }

    switcher.close().await?;
    far.close().await?;
    origin.close().await?;
    Ok(())
}
