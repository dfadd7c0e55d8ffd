//! Order history and receipt lookup handlers.

use std::time::Duration;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::instrument;

use crate::db::{AccountStore, OrderStore, RepositoryError};
use crate::error::Result;
use crate::middleware::RequireIdentity;
use crate::models::Order;
use crate::state::AppState;

/// How many times to poll for the order after the payment redirect.
const RECEIPT_LOOKUP_ATTEMPTS: u32 = 5;
/// Fixed delay between receipt lookup attempts.
const RECEIPT_LOOKUP_BACKOFF: Duration = Duration::from_millis(400);

/// `GET /api/orders` - the authenticated account's orders, newest first.
///
/// An identity that has never checked out has no account yet; that is an
/// empty history, not an error.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    RequireIdentity(subject): RequireIdentity,
) -> Result<Json<Vec<Order>>> {
    let Some(account) = state.store().find_account_by_subject(&subject).await? else {
        return Ok(Json(Vec::new()));
    };

    let orders = state.store().orders_for_account(account.id).await?;
    Ok(Json(orders))
}

/// `GET /api/orders/session/{session_id}` - receipt lookup after redirect.
///
/// The buyer lands here racing the provider's webhook: the session reference
/// is only attached to the order once checkout records it, and the paid
/// transition may still be in flight. Poll briefly, then hand back a
/// 202 placeholder the client can retry against.
#[instrument(skip(state))]
pub async fn by_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Response> {
    if let Some(order) = find_receipt(state.store(), &session_id).await? {
        return Ok(Json(order).into_response());
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "status": "processing",
            "payment_status": "pending",
        })),
    )
        .into_response())
}

/// Poll the store for the order tied to a payment session.
///
/// `None` after the final attempt means the confirmation has not landed yet,
/// not that the session is unknown.
async fn find_receipt<S: OrderStore>(
    store: &S,
    session_id: &str,
) -> std::result::Result<Option<Order>, RepositoryError> {
    for attempt in 0..RECEIPT_LOOKUP_ATTEMPTS {
        if let Some(order) = store.get_order_by_payment_session(session_id).await? {
            return Ok(Some(order));
        }
        if attempt + 1 < RECEIPT_LOOKUP_ATTEMPTS {
            tokio::time::sleep(RECEIPT_LOOKUP_BACKOFF).await;
        }
    }
    Ok(None)
}
