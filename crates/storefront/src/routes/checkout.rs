//! Checkout handler.

use axum::{Json, extract::State};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use copperleaf_core::{Cart, CartLine, Email, ProductId};

use crate::error::{AppError, Result};
use crate::middleware::Identity;
use crate::models::{ShippingAddress, session_keys};
use crate::services::{CheckoutRequest, CheckoutService, ContactInfo};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CheckoutItem {
    product_id: ProductId,
    quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct ShippingInfo {
    name: String,
    email: String,
    street: String,
    city: String,
    state: String,
    zip: String,
    country: String,
    phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutBody {
    items: Vec<CheckoutItem>,
    shipping: ShippingInfo,
}

#[derive(Serialize)]
pub struct CheckoutResponse {
    session_id: String,
    redirect_url: String,
}

/// `POST /api/checkout` - create a pending order and hosted payment session.
///
/// The submitted items carry product ids and quantities only; prices, names
/// and stock are resolved server-side. On success the session cart is
/// cleared and the client is handed the payment redirect URL.
#[instrument(skip(state, session, body))]
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    Identity(subject): Identity,
    Json(body): Json<CheckoutBody>,
) -> Result<Json<CheckoutResponse>> {
    let email = Email::parse(&body.shipping.email)
        .map_err(|e| AppError::BadRequest(format!("invalid email: {e}")))?;

    let mut cart = Cart::new();
    for item in body.items {
        // Reject explicitly: `add_item` would clamp a zero to one.
        if item.quantity == 0 {
            return Err(AppError::BadRequest(format!(
                "invalid quantity for product {}",
                item.product_id
            )));
        }
        cart.add_item(CartLine {
            product_id: item.product_id,
            name: String::new(),
            price: Decimal::ZERO,
            image: None,
            quantity: item.quantity,
        });
    }

    let service = CheckoutService::new(
        state.store().clone(),
        state.payments().clone(),
        state.config().stripe.currency,
    );
    let outcome = service
        .checkout(CheckoutRequest {
            subject,
            contact: ContactInfo {
                email,
                name: body.shipping.name,
                phone: body.shipping.phone,
            },
            shipping_address: ShippingAddress {
                street: body.shipping.street,
                city: body.shipping.city,
                state: body.shipping.state,
                zip: body.shipping.zip,
                country: body.shipping.country,
            },
            cart,
        })
        .await?;

    // The cart is spent; a failed payment session above leaves it intact
    // so the shopper can retry.
    if let Err(e) = session.remove::<Cart>(session_keys::CART).await {
        tracing::warn!(error = %e, "Failed to clear session cart after checkout");
    }

    Ok(Json(CheckoutResponse {
        session_id: outcome.session.id,
        redirect_url: outcome.session.url,
    }))
}
