//! Axum front-end around the transport-agnostic dispatcher.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::response::Response;
use axum::Router;
use tower::limit::GlobalConcurrencyLimitLayer;

use crate::reply::Reply;
use crate::route;
use crate::state::AppState;

/// Bodies above this size are refused up front.
const MAX_BODY: usize = 16 * 1024 * 1024;

fn into_response(reply: Reply) -> Response {
    let mut builder = Response::builder().status(reply.status);
    if let Some(ct) = reply.content_type {
        builder = builder.header(http::header::CONTENT_TYPE, ct);
    }
    builder
        .body(Body::from(reply.body))
        .expect("response build")
}

async fn handle(State(state): State<Arc<AppState>>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let uri = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| parts.uri.path().to_string());

    let bytes = match axum::body::to_bytes(body, MAX_BODY).await {
        Ok(bytes) => bytes,
        Err(_) => {
            return into_response(crate::reply::format_error(
                gridgate_core::GridError::bad_request("Unreadable body"),
            ));
        }
    };

    let reply = route::dispatch(state, &parts.method, &uri, parts.headers, bytes).await;
    into_response(reply)
}

/// The whole HTTP surface: one fallback route feeding the dispatcher,
/// bounded by a global concurrency limit.
pub fn app(state: Arc<AppState>) -> Router {
    let limit = state.config.max_concurrency;
    Router::new()
        .fallback(handle)
        .layer(GlobalConcurrencyLimitLayer::new(limit))
        .with_state(state)
}

/// Binds and serves until the future is dropped or the listener fails.
pub async fn serve(state: Arc<AppState>) -> std::io::Result<()> {
    let bind = state.config.bind.clone();
    let listener = tokio::net::TcpListener::bind(&bind).await?;
    tracing::info!(%bind, ns = state.ns_name(), "gridgate listening");
    axum::serve(listener, app(state)).await
}
