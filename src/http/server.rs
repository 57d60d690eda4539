//! HTTP server setup and launch.
//!
//! # Responsibilities
//! - Build the Axum router from the routing table
//! - Wire up the interceptor chain (logging, metrics, tracing)
//! - Bind the listener and serve connections on a detached task
//! - Report bind and serve failures to the shared error sink

use axum::Router;
use tower::ServiceBuilder;

use crate::config::HttpServerConfig;
use crate::http::routes::HttpRoutes;
use crate::lifecycle::{ErrorSink, ServerHandle, ServerKind};
use crate::net::bind_listener;
use crate::net::connection::serve_connections;
use crate::observability::{http_trace_layer, LogLayer, MetricsLayer};

/// Launch an HTTP server for `routes`.
///
/// Returns `None` when the listener cannot be bound; the bind error has
/// then been written to `errors` and nothing is serving. Otherwise serving
/// continues on a detached task and the returned handle is used to stop it.
pub async fn serve_http(
    errors: &ErrorSink,
    routes: HttpRoutes,
    config: &HttpServerConfig,
) -> Option<ServerHandle> {
    let router = build_router(routes);

    let address = config.bind_address();
    let (listener, local_addr) = match bind_listener(ServerKind::Http, &address).await {
        Ok(bound) => bound,
        Err(e) => {
            errors.report(e);
            return None;
        }
    };

    tracing::info!(address = %local_addr, "Starting HTTP server");

    let handle = ServerHandle::spawn(ServerKind::Http, local_addr, errors.clone(), |stop| {
        serve_connections(ServerKind::Http, listener, router, stop)
    });

    Some(handle)
}

/// Routing table wrapped in the fixed interceptor chain.
fn build_router(routes: HttpRoutes) -> Router {
    routes.into_router().layer(
        ServiceBuilder::new()
            .layer(LogLayer::server())
            .layer(MetricsLayer::new(ServerKind::Http))
            .layer(http_trace_layer()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::routing::get;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_router_keeps_routes_behind_interceptors() {
        let routes = HttpRoutes::new().route("/healthz", get(|| async { "ok" })).unwrap();
        let router = build_router(routes);

        let response = router
            .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
