use crate::dispatch::{DispatchError, IntentDispatcher};
use crate::response::WebhookResponse;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::post,
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

/// Shared webhook state
#[derive(Clone)]
pub struct WebhookAppState {
    pub dispatcher: Arc<IntentDispatcher>,
    pub body_size_limit_bytes: usize,
}

/// Error response
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Create router with the intent webhook endpoint
///
/// axum's default 2 MB body cap is lifted; the configured limit is enforced in
/// the handler so oversized bodies get a JSON 413.
pub fn create_webhook_router(state: WebhookAppState) -> Router {
    Router::new()
        .route("/api/intent/webhook", post(handle_webhook))
        .layer(DefaultBodyLimit::disable())
        .with_state(Arc::new(state))
}

/// POST /api/intent/webhook - Dispatch one assistant intent
///
/// Returns 200 with `{speech, messages}` once dispatch completes, including
/// unknown actions and missing parameters (those add an `error` field).
async fn handle_webhook(
    State(state): State<Arc<WebhookAppState>>,
    body: Bytes,
) -> Result<Json<WebhookResponse>, WebhookError> {
    if body.len() > state.body_size_limit_bytes {
        return Err(WebhookError::PayloadTooLarge);
    }

    let result = state.dispatcher.handle(&body).await?;

    info!(
        changes = result.changes.len(),
        rejected = result.error.is_some(),
        "Webhook handled"
    );

    Ok(Json(WebhookResponse::from(&result)))
}

/// Webhook error types
enum WebhookError {
    InvalidIntent(String),
    ServiceFailed(String),
    PayloadTooLarge,
}

impl From<DispatchError> for WebhookError {
    fn from(e: DispatchError) -> Self {
        match e {
            DispatchError::InvalidIntent(_) => WebhookError::InvalidIntent(e.to_string()),
            DispatchError::ServiceInvocation(_) => {
                error!(error = %e, "Webhook dispatch failed");
                WebhookError::ServiceFailed(e.to_string())
            }
            // Recoverable errors are turned into results by the dispatcher
            DispatchError::UnknownAction(_) | DispatchError::MissingParameter { .. } => {
                WebhookError::InvalidIntent(e.to_string())
            }
        }
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            WebhookError::InvalidIntent(msg) => (StatusCode::BAD_REQUEST, msg),
            WebhookError::ServiceFailed(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            WebhookError::PayloadTooLarge => {
                (StatusCode::PAYLOAD_TOO_LARGE, "payload too large".to_string())
            }
        };
        let body = Json(ErrorResponse {
            error: error_message,
        });
        (status, body).into_response()
    }
}
