//! Request handler abstraction.
//!
//! # Responsibilities
//! - Wrap an async request function behind a cheap, cloneable handle
//! - Adapt an `axum::Router` into the same shape
//! - Stay extractable from a backend even after that backend has closed

use std::future::Future;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response};
use futures_util::future::BoxFuture;
use tower::ServiceExt;

/// A cloneable async HTTP handler.
///
/// Every server in this crate, terminal or relaying, is driven by a
/// `Handler`. Relays dispatch to their backend by calling the backend's
/// handler directly rather than forwarding over a socket, so a handler
/// must stay callable independently of its server's lifecycle.
pub struct Handler {
    func: Arc<dyn Fn(Request<Body>) -> BoxFuture<'static, Response<Body>> + Send + Sync>,
}

impl Handler {
    /// Create a handler from an async request function.
    pub fn new<F, Fut>(func: F) -> Self
    where
        F: Fn(Request<Body>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response<Body>> + Send + 'static,
    {
        Self {
            func: Arc::new(move |request| Box::pin(func(request))),
        }
    }

    /// Invoke the handler for a single request.
    pub async fn call(&self, request: Request<Body>) -> Response<Body> {
        (self.func)(request).await
    }
}

impl Clone for Handler {
    fn clone(&self) -> Self {
        Self {
            func: Arc::clone(&self.func),
        }
    }
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handler").finish_non_exhaustive()
    }
}

impl From<axum::Router> for Handler {
    fn from(router: axum::Router) -> Self {
        Self::new(move |request| {
            let router = router.clone();
            async move {
                match router.oneshot(request).await {
                    Ok(response) => response,
                    // Router's service error is Infallible.
                    Err(err) => match err {},
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;
    use axum::Router;

    async fn read_body(response: Response<Body>) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn handler_from_closure() {
        let handler = Handler::new(|_request| async { Response::new(Body::from("pong")) });

        let response = handler.call(Request::new(Body::empty())).await;
        assert_eq!(read_body(response).await, "pong");
    }

    #[tokio::test]
    async fn handler_from_router() {
        let router = Router::new().route("/greet", get(|| async { "hello" }));
        let handler = Handler::from(router);

        let request = Request::builder()
            .uri("/greet")
            .body(Body::empty())
            .unwrap();
        let response = handler.call(request).await;
        assert_eq!(response.status(), axum::http::StatusCode::OK);
        assert_eq!(read_body(response).await, "hello");
    }

    #[tokio::test]
    async fn clones_share_the_same_function() {
        let handler = Handler::new(|request| async move {
            let path = request.uri().path().to_string();
            Response::new(Body::from(path))
        });
        let clone = handler.clone();

        let request = Request::builder()
            .uri("/original")
            .body(Body::empty())
            .unwrap();
        let response = clone.call(request).await;
        assert_eq!(read_body(response).await, "/original");
    }
}
