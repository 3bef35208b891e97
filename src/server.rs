//! HTTP adapter — health check and the messaging webhook.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::{Error, SessionError};
use crate::session::RegistrationService;

/// Shared state for the webhook routes.
#[derive(Clone)]
pub struct ServerState {
    pub service: Arc<RegistrationService>,
}

/// Inbound webhook body. Messaging platforms disagree on field names, so
/// both spellings are accepted and ids may be strings or numbers.
#[derive(Debug, Default, Deserialize)]
struct WebhookPayload {
    sender: Option<Value>,
    from: Option<Value>,
    text: Option<Value>,
    message: Option<Value>,
}

impl WebhookPayload {
    fn sender(&self) -> Option<String> {
        self.sender
            .as_ref()
            .and_then(as_text)
            .or_else(|| self.from.as_ref().and_then(as_text))
    }

    fn text(&self) -> Option<String> {
        self.text
            .as_ref()
            .and_then(as_text)
            .or_else(|| self.message.as_ref().and_then(as_text))
    }
}

fn as_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

#[derive(Debug, Serialize)]
struct WebhookResponse {
    user: String,
    responses: Vec<String>,
    finished: bool,
}

fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "error": message })),
    )
        .into_response()
}

/// GET /health
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "online" }))
}

/// POST /webhook
///
/// Runs one dialogue turn for the sender and returns every message the
/// assistant produced.
async fn webhook(
    State(state): State<ServerState>,
    payload: Result<Json<WebhookPayload>, JsonRejection>,
) -> Response {
    let payload = match payload {
        Ok(Json(payload)) => payload,
        Err(rejection) => {
            tracing::warn!(error = %rejection, "Rejected webhook payload");
            return bad_request("Invalid JSON payload");
        }
    };

    let (Some(sender), Some(text)) = (payload.sender(), payload.text()) else {
        return bad_request("Invalid payload: sender and text are required");
    };

    tracing::info!(sender = %sender, "Webhook message received");

    match state.service.process_turn(&sender, &text).await {
        Ok(reply) => Json(WebhookResponse {
            user: sender,
            responses: reply.responses,
            finished: reply.finished,
        })
        .into_response(),
        Err(Error::Session(SessionError::InvalidKey(_))) => bad_request("Invalid sender"),
        Err(e) => {
            tracing::error!(error = %e, "Webhook turn failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "Internal error" })),
            )
                .into_response()
        }
    }
}

/// Build the HTTP routes.
pub fn routes(state: ServerState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/webhook", post(webhook))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
