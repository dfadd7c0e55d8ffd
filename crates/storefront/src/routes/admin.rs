//! Admin catalog and order handlers.
//!
//! These routes are mounted under `/api/admin`, which the fronting proxy
//! restricts to staff; the service itself performs no role checks.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use copperleaf_core::ProductId;

use crate::db::{AccountStore, OrderStore, ProductStore};
use crate::error::{AppError, Result};
use crate::models::{Account, AccountStats, NewProduct, Order, OrderStats, Product};
use crate::state::AppState;

/// `POST /api/admin/products` - create a product.
pub async fn create_product(
    State(state): State<AppState>,
    Json(body): Json<NewProduct>,
) -> Result<(StatusCode, Json<Product>)> {
    let product = state.store().create_product(body).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// `PUT /api/admin/products/{id}` - replace a product.
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    Json(body): Json<NewProduct>,
) -> Result<Json<Product>> {
    let product = state
        .store()
        .update_product(id, body)
        .await?
        .ok_or_else(|| AppError::NotFound("product not found".to_owned()))?;
    Ok(Json(product))
}

/// `DELETE /api/admin/products/{id}` - delete a product.
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<StatusCode> {
    if state.store().delete_product(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("product not found".to_owned()))
    }
}

/// `GET /api/admin/orders` - every order, newest first.
pub async fn list_orders(State(state): State<AppState>) -> Result<Json<Vec<Order>>> {
    let orders = state.store().all_orders().await?;
    Ok(Json(orders))
}

/// `GET /api/admin/orders/stats` - revenue and volume aggregates.
pub async fn order_stats(State(state): State<AppState>) -> Result<Json<OrderStats>> {
    let stats = state.store().order_stats().await?;
    Ok(Json(stats))
}

/// `GET /api/admin/accounts` - every account, newest first.
///
/// Each row carries its denormalized `order_count`, so the dashboard gets
/// per-customer order volume without a join.
pub async fn list_accounts(State(state): State<AppState>) -> Result<Json<Vec<Account>>> {
    let accounts = state.store().list_accounts().await?;
    Ok(Json(accounts))
}

/// `GET /api/admin/accounts/stats` - account totals and active buyers.
pub async fn account_stats(State(state): State<AppState>) -> Result<Json<AccountStats>> {
    let stats = state.store().account_stats().await?;
    Ok(Json(stats))
}
