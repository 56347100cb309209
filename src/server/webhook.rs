//! Webhook endpoint handler.
//!
//! Validates the delivery, acknowledges it with 200 and hands it to the
//! [`EventRouter`](crate::dispatch::EventRouter) on a tracked background task.
//! Processing outcomes never reach the caller.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::AppState;
use crate::types::DeliveryId;
use crate::webhooks::verify_signature;

/// Header name for GitHub event type.
const HEADER_EVENT: &str = "x-github-event";
/// Header name for GitHub delivery ID.
const HEADER_DELIVERY: &str = "x-github-delivery";
/// Header name for GitHub signature.
const HEADER_SIGNATURE: &str = "x-hub-signature-256";

/// Body of every accepted delivery.
pub const ACK_BODY: &str = "Event received. Have a nice day.";

/// Reasons a delivery is rejected before any work happens.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("missing required header: {0}")]
    MissingHeader(&'static str),

    #[error("invalid signature")]
    InvalidSignature,
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = match &self {
            WebhookError::MissingHeader(_) => StatusCode::BAD_REQUEST,
            WebhookError::InvalidSignature => StatusCode::UNAUTHORIZED,
        };
        (status, self.to_string()).into_response()
    }
}

/// Webhook handler.
///
/// # Response
///
/// - 200 OK: delivery accepted; processing continues in the background
/// - 400 Bad Request: a required header is missing
/// - 401 Unauthorized: the signature does not match the current secret
///
/// Every response is counted by status code.
pub async fn webhook_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let response = accept(&app_state, &headers, body).into_response();
    app_state
        .router()
        .metrics()
        .record_response(response.status().as_u16());
    response
}

fn accept(
    app_state: &AppState,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, &'static str), WebhookError> {
    let event_type = get_header(headers, HEADER_EVENT)?;
    let delivery_id = DeliveryId::new(get_header(headers, HEADER_DELIVERY)?);
    let signature_header = get_header(headers, HEADER_SIGNATURE)?;

    debug!(delivery_id = %delivery_id, event_type = %event_type, "Received webhook");

    // The secret is looked up per request so that rotation needs no restart.
    if !verify_signature(&body, &signature_header, &app_state.webhook_secret()) {
        warn!(delivery_id = %delivery_id, "Invalid webhook signature");
        return Err(WebhookError::InvalidSignature);
    }

    let router = app_state.router().clone();
    router.metrics().record_webhook(&event_type);
    info!(delivery_id = %delivery_id, event_type = %event_type, "Webhook accepted");

    let tasks = router.in_flight().clone();
    tasks.spawn(async move {
        if let Err(e) = router.dispatch(&event_type, &delivery_id, &body) {
            warn!(
                delivery_id = %delivery_id,
                event_type = %event_type,
                error = %e,
                "Failed to dispatch webhook"
            );
        }
    });

    Ok((StatusCode::OK, ACK_BODY))
}

/// Extracts a required header value as a string.
fn get_header(headers: &HeaderMap, name: &'static str) -> Result<String, WebhookError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .ok_or(WebhookError::MissingHeader(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn get_header_present_and_missing() {
        let mut headers = HeaderMap::new();
        headers.insert(HEADER_EVENT, HeaderValue::from_static("push"));

        assert_eq!(get_header(&headers, HEADER_EVENT).unwrap(), "push");
        assert!(matches!(
            get_header(&headers, HEADER_DELIVERY),
            Err(WebhookError::MissingHeader("x-github-delivery"))
        ));
    }

    #[test]
    fn errors_map_to_status_codes() {
        assert_eq!(
            WebhookError::MissingHeader(HEADER_SIGNATURE)
                .into_response()
                .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            WebhookError::InvalidSignature.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
    }
}
