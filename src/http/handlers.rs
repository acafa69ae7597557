//! Operational endpoints.
//!
//! # Responsibilities
//! - `/errors`: the error records of the active snapshot as JSON
//! - `/reload`, `/git-reload`: rate-limited reloads behind the shared secret
//!
//! # Design Decisions
//! - Limiter calls block for the whole reload and run on the blocking pool
//! - Plain-text bodies; operators call these endpoints from scripts and hooks

use std::time::Instant;

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::http::auth::secret_matches;
use crate::http::server::AppState;
use crate::reload::{Outcome, ReloadResult};
use crate::routing::static_files::not_found;

#[derive(Debug, Default, Deserialize)]
pub struct SecretQuery {
    pub secret: Option<String>,
}

pub async fn errors(State(state): State<AppState>) -> Response {
    match serde_json::to_string_pretty(&state.site.errors()) {
        Ok(body) => ([(header::CONTENT_TYPE, "application/json")], body).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize error records");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn reload(State(state): State<AppState>, Query(query): Query<SecretQuery>) -> Response {
    if !secret_matches(&state.secret, query.secret.as_deref()) {
        return unauthorized();
    }

    let start = Instant::now();
    let reloader = state.reloader.clone();
    match tokio::task::spawn_blocking(move || reloader.trigger_reload()).await {
        Ok(outcome) => outcome_response("reload", outcome, start),
        Err(e) => {
            tracing::error!(error = %e, "Reload task panicked");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn git_reload(State(state): State<AppState>, Query(query): Query<SecretQuery>) -> Response {
    if !state.reloader.has_sync() {
        return not_found();
    }
    if !secret_matches(&state.secret, query.secret.as_deref()) {
        return unauthorized();
    }

    let start = Instant::now();
    let reloader = state.reloader.clone();
    match tokio::task::spawn_blocking(move || reloader.trigger_sync()).await {
        Ok(Some(outcome)) => outcome_response("git reload", outcome, start),
        Ok(None) => not_found(),
        Err(e) => {
            tracing::error!(error = %e, "Git reload task panicked");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn unauthorized() -> Response {
    tracing::warn!("Reload request with wrong secret");
    (StatusCode::UNAUTHORIZED, "unauthorized").into_response()
}

fn outcome_response(action: &str, outcome: Outcome<ReloadResult>, start: Instant) -> Response {
    match outcome {
        Outcome::Executed(Ok(())) => (
            StatusCode::OK,
            format!("{} took {} milliseconds", action, start.elapsed().as_millis()),
        )
            .into_response(),
        Outcome::Executed(Err(e)) => {
            (StatusCode::INTERNAL_SERVER_ERROR, format!("{} failed: {}", action, e)).into_response()
        }
        Outcome::Scheduled(None | Some(Ok(()))) => {
            (StatusCode::OK, format!("{} scheduled", action)).into_response()
        }
        Outcome::Scheduled(Some(Err(e))) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("{} scheduled, last execution returned error: {}", action, e),
        )
            .into_response(),
    }
}
