//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, timeout, request ID)
//! - Bind server to listener
//! - Dispatch content requests to the site router
//! - Observability (metrics, correlation IDs)

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::State,
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::TimeoutConfig;
use crate::http::handlers;
use crate::http::request::{request_span, RequestUuid};
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::reload::{Reloader, Site};
use crate::routing::RequestContext;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub site: Arc<Site>,
    pub reloader: Arc<Reloader>,
    pub secret: Arc<str>,
}

/// HTTP server for the site.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(state: AppState, timeouts: &TimeoutConfig) -> Self {
        let router = Self::build_router(state, Duration::from_secs(timeouts.request_secs));
        Self { router }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(state: AppState, request_timeout: Duration) -> Router {
        Router::new()
            .route("/errors", get(handlers::errors))
            .route("/reload", get(handlers::reload).post(handlers::reload))
            .route("/git-reload", get(handlers::git_reload).post(handlers::git_reload))
            .fallback(content_handler)
            .with_state(state)
            .layer(TimeoutLayer::new(request_timeout))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http().make_span_with(request_span))
            .layer(SetRequestIdLayer::x_request_id(RequestUuid))
    }

    /// The complete service, for driving it without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(Shutdown::wait(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Everything that is not an operational endpoint goes through the content
/// tree. Routing and template execution are synchronous.
async fn content_handler(State(state): State<AppState>, method: Method, uri: Uri) -> Response {
    let start = Instant::now();
    let request = RequestContext::from_uri(method.clone(), &uri);

    let site = state.site.clone();
    let response = match tokio::task::spawn_blocking(move || site.route(&request)).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(error = %e, path = %uri.path(), "Routing task panicked");
            (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
        }
    };

    tracing::debug!(status = %response.status(), "Content request served");
    metrics::record_request(method.as_str(), response.status().as_u16(), start);
    response
}
