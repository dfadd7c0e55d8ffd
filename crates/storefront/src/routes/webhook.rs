//! Payment provider webhook handler.

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use chrono::Utc;
use serde_json::json;
use tracing::{instrument, warn};

use crate::error::{AppError, Result};
use crate::payments::webhook;
use crate::services::{ConfirmationOutcome, apply_event};
use crate::state::AppState;

/// Header carrying the delivery signature.
const SIGNATURE_HEADER: &str = "stripe-signature";

/// `POST /api/webhook` - apply a signed payment event.
///
/// The signature is verified against the raw body before any parsing;
/// unauthenticated deliveries get a 400 and touch nothing. The handler is
/// idempotent: replayed events acknowledge with 200 without mutating state.
#[instrument(skip(state, headers, body))]
pub async fn receive(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<(StatusCode, Json<serde_json::Value>)> {
    let header = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("missing signature header".to_owned()))?;

    let event = webhook::verify_and_parse(
        &state.config().stripe.webhook_secret,
        header,
        &body,
        Utc::now().timestamp(),
    )
    .map_err(|e| {
        warn!(error = %e, "Webhook delivery rejected");
        AppError::BadRequest("invalid signature".to_owned())
    })?;

    let outcome = apply_event(state.store(), &event).await?;

    match outcome {
        ConfirmationOutcome::Applied
        | ConfirmationOutcome::AlreadyProcessed
        | ConfirmationOutcome::Ignored => {
            Ok((StatusCode::OK, Json(json!({ "received": true }))))
        }
        ConfirmationOutcome::MissingOrderRef => Err(AppError::BadRequest(
            "event carries no order reference".to_owned(),
        )),
        ConfirmationOutcome::OrderNotFound => {
            Err(AppError::NotFound("order not found".to_owned()))
        }
    }
}
