//! Session-backed cart handlers.
//!
//! The cart lives in the server-side session as a snapshot of lines; nothing
//! here touches orders. Prices and names stored on lines are display
//! snapshots taken at add time and are re-derived from the catalog at
//! checkout.

use axum::{
    Json,
    extract::State,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use copperleaf_core::{Cart, CartLine, ProductId};

use crate::db::ProductStore;
use crate::error::{AppError, Result};
use crate::models::session_keys;
use crate::state::AppState;

#[derive(Serialize)]
pub struct CartResponse {
    cart: Cart,
    item_count: u32,
    total: Decimal,
}

impl From<Cart> for CartResponse {
    fn from(cart: Cart) -> Self {
        Self {
            item_count: cart.item_count(),
            total: cart.calculate_total(),
            cart,
        }
    }
}

async fn load_cart(session: &Session) -> Result<Cart> {
    Ok(session
        .get::<Cart>(session_keys::CART)
        .await
        .map_err(|e| AppError::Internal(format!("session load failed: {e}")))?
        .unwrap_or_default())
}

async fn save_cart(session: &Session, cart: &Cart) -> Result<()> {
    session
        .insert(session_keys::CART, cart)
        .await
        .map_err(|e| AppError::Internal(format!("session save failed: {e}")))
}

/// `GET /api/cart` - current cart snapshot.
#[instrument(skip(session))]
pub async fn show(session: Session) -> Result<Json<CartResponse>> {
    let cart = load_cart(&session).await?;
    Ok(Json(cart.into()))
}

#[derive(Debug, Deserialize)]
pub struct AddRequest {
    product_id: ProductId,
    quantity: Option<u32>,
}

/// `POST /api/cart/add` - add a product to the cart.
#[instrument(skip(state, session))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<AddRequest>,
) -> Result<Json<CartResponse>> {
    let product = state
        .store()
        .get_product(body.product_id)
        .await?
        .ok_or_else(|| AppError::NotFound("product not found".to_owned()))?;

    let mut cart = load_cart(&session).await?;
    cart.add_item(CartLine {
        product_id: product.id,
        name: product.name,
        price: product.price,
        image: product.images.first().cloned(),
        quantity: body.quantity.unwrap_or(1),
    });
    save_cart(&session, &cart).await?;

    Ok(Json(cart.into()))
}

#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    product_id: ProductId,
    quantity: u32,
}

/// `POST /api/cart/update` - set a line's quantity; zero removes the line.
#[instrument(skip(session))]
pub async fn update(
    session: Session,
    Json(body): Json<UpdateRequest>,
) -> Result<Json<CartResponse>> {
    let mut cart = load_cart(&session).await?;
    cart.update_quantity(body.product_id, body.quantity);
    save_cart(&session, &cart).await?;

    Ok(Json(cart.into()))
}

#[derive(Debug, Deserialize)]
pub struct RemoveRequest {
    product_id: ProductId,
}

/// `POST /api/cart/remove` - drop a line; no-op when absent.
#[instrument(skip(session))]
pub async fn remove(
    session: Session,
    Json(body): Json<RemoveRequest>,
) -> Result<Json<CartResponse>> {
    let mut cart = load_cart(&session).await?;
    cart.remove_item(body.product_id);
    save_cart(&session, &cart).await?;

    Ok(Json(cart.into()))
}

/// `POST /api/cart/clear` - empty the cart.
#[instrument(skip(session))]
pub async fn clear(session: Session) -> Result<Json<CartResponse>> {
    let cart = Cart::new();
    save_cart(&session, &cart).await?;

    Ok(Json(cart.into()))
}
