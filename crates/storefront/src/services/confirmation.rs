//! Payment confirmation handling.
//!
//! Applies a verified webhook event to the order it references. The paid
//! transition is conditional in the store, so redelivered events settle as
//! [`ConfirmationOutcome::AlreadyProcessed`] without side effects; stock is
//! decremented exactly once, on the delivery that wins the transition.

use tracing::{info, instrument, warn};

use crate::db::{OrderStore, PaidTransition, ProductStore, RepositoryError};
use crate::payments::webhook::WebhookEvent;

/// What applying an event amounted to.
#[derive(Debug, PartialEq, Eq)]
pub enum ConfirmationOutcome {
    /// Order moved to processing/paid; stock was decremented.
    Applied,
    /// Order had already settled; nothing changed.
    AlreadyProcessed,
    /// Event type is not one we act on.
    Ignored,
    /// Completed session carried no order reference.
    MissingOrderRef,
    /// Event referenced no known order.
    OrderNotFound,
}

/// Apply a verified webhook event.
///
/// # Errors
///
/// Returns [`RepositoryError`] when a store operation fails. A failed stock
/// decrement (oversell) is logged and does not fail the confirmation; the
/// payment has already happened and the order must reflect it.
#[instrument(skip(store, event), fields(kind = %event.kind))]
pub async fn apply_event<S>(
    store: &S,
    event: &WebhookEvent,
) -> Result<ConfirmationOutcome, RepositoryError>
where
    S: OrderStore + ProductStore,
{
    if event.kind != WebhookEvent::CHECKOUT_COMPLETED {
        return Ok(ConfirmationOutcome::Ignored);
    }

    let Some(order_id) = event.data.object.metadata.order_id() else {
        warn!(session_ref = %event.data.object.id, "Completed session carries no order reference");
        return Ok(ConfirmationOutcome::MissingOrderRef);
    };

    match store
        .mark_paid_if_pending(order_id, &event.data.object.id)
        .await?
    {
        PaidTransition::Applied(order) => {
            for item in &order.items {
                let quantity = u32::try_from(item.quantity).unwrap_or(0);
                if !store.decrement_stock(item.product_id, quantity).await? {
                    // Oversold between checkout and confirmation; needs a
                    // restock or refund, but the order stays paid.
                    warn!(
                        order_id = %order.id,
                        product_id = %item.product_id,
                        quantity = item.quantity,
                        "Stock decrement failed on paid order"
                    );
                }
            }
            info!(order_id = %order.id, "Order confirmed paid");
            Ok(ConfirmationOutcome::Applied)
        }
        PaidTransition::AlreadySettled => {
            info!(%order_id, "Duplicate confirmation ignored");
            Ok(ConfirmationOutcome::AlreadyProcessed)
        }
        PaidTransition::NotFound => {
            warn!(%order_id, "Confirmation for unknown order");
            Ok(ConfirmationOutcome::OrderNotFound)
        }
    }
}
