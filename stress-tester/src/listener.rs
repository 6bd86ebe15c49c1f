//! Alert callback endpoint
//!
//! The media server posts alert payloads to `/callback*`. Every request that
//! reaches a callback path is acknowledged with 200, including empty and
//! malformed bodies, so a bad payload never crashes the listener or makes the
//! sender retry. The first qualifying alert triggers the shutdown sequence.

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{Method, StatusCode, Uri},
    routing::post,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::coordinator::{RunCoordinator, ShutdownReason};
use crate::error::HarnessError;
use shared::{Alert, AlertRules, Component, component_debug, component_info, logging};

/// Path prefix the alert callback is served on
pub const CALLBACK_PATH: &str = "/callback";

/// State shared with the request handlers
#[derive(Clone)]
pub struct ListenerState {
    coordinator: Arc<RunCoordinator>,
    rules: Arc<AlertRules>,
}

impl ListenerState {
    pub fn new(coordinator: Arc<RunCoordinator>, rules: AlertRules) -> Self {
        Self {
            coordinator,
            rules: Arc::new(rules),
        }
    }
}

/// What a callback request amounted to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlertDisposition {
    Empty,
    Malformed,
    Ignored,
    /// Qualifying alert while shutdown is already under way
    Duplicate,
    Shutdown { code: String },
}

/// Build the Axum router for the alert endpoint
pub fn build_router(state: ListenerState) -> Router {
    Router::new()
        .route(CALLBACK_PATH, post(callback_handler))
        .route("/callback/*rest", post(callback_handler))
        .fallback(fallback_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn callback_handler(State(state): State<ListenerState>, uri: Uri, body: Bytes) -> StatusCode {
    handle_alert(&state, uri.path(), &body);
    StatusCode::OK
}

/// Prefix matches such as `/callbackFoo` are callbacks too
async fn fallback_handler(State(state): State<ListenerState>, method: Method, uri: Uri, body: Bytes) -> StatusCode {
    if method == Method::POST && uri.path().starts_with(CALLBACK_PATH) {
        handle_alert(&state, uri.path(), &body);
        return StatusCode::OK;
    }
    StatusCode::NOT_FOUND
}

/// Inspect one callback body; a qualifying alert starts shutdown in the background
///
/// The shutdown runs on its own task so the 200 goes out without waiting for
/// the worker sweep.
pub fn handle_alert(state: &ListenerState, path: &str, body: &[u8]) -> AlertDisposition {
    if body.is_empty() {
        component_info!(Component::Listener, "Received callback: {} (no payload)", path);
        return AlertDisposition::Empty;
    }

    match std::str::from_utf8(body) {
        Ok(payload) => {
            component_debug!(Component::Listener, "Received callback payload: {}", payload);
        }
        Err(e) => {
            logging::log_error(Component::Listener, "Decoding payload", &e);
            return AlertDisposition::Malformed;
        }
    }

    let alert = match Alert::from_slice(body) {
        Ok(alert) => alert,
        Err(e) => {
            logging::log_error(Component::Listener, "Parsing alert JSON", &HarnessError::PayloadParse(e));
            return AlertDisposition::Malformed;
        }
    };

    let Some(code) = state.rules.qualifying_code(&alert) else {
        return AlertDisposition::Ignored;
    };
    let code = code.to_string();

    if state.coordinator.state().is_stop_requested() {
        component_debug!(Component::Listener, "{} alert received during shutdown, ignoring", code);
        return AlertDisposition::Duplicate;
    }

    component_info!(Component::Listener, "{} alert received.", code);

    let coordinator = state.coordinator.clone();
    let reason = ShutdownReason::Alert { code: code.clone() };
    tokio::spawn(async move {
        coordinator.shutdown(reason).await;
    });

    AlertDisposition::Shutdown { code }
}
