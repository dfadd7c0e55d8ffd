//! HTTP route handlers for the storefront API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Liveness check
//! GET  /health/ready                    - Readiness check (DB ping)
//!
//! # Products
//! GET  /api/products                    - Paginated product listing
//! GET  /api/products/{id}               - Product detail with reviews
//! POST /api/products/{id}/reviews       - Append a review
//!
//! # Cart (session-backed)
//! GET  /api/cart                        - Current cart snapshot
//! POST /api/cart/add                    - Add a product
//! POST /api/cart/update                 - Set a line's quantity
//! POST /api/cart/remove                 - Remove a line
//! POST /api/cart/clear                  - Empty the cart
//!
//! # Checkout and payment
//! POST /api/checkout                    - Create order + hosted payment session
//! POST /api/webhook                     - Payment provider event delivery
//!
//! # Orders
//! GET  /api/orders                      - Order history (requires identity)
//! GET  /api/orders/session/{session_id} - Receipt lookup after redirect
//!
//! # Admin (behind the proxy's admin ACL)
//! POST   /api/admin/products            - Create product
//! PUT    /api/admin/products/{id}       - Update product
//! DELETE /api/admin/products/{id}       - Delete product
//! GET    /api/admin/orders              - All orders
//! GET    /api/admin/orders/stats        - Revenue / volume aggregates
//! GET    /api/admin/accounts            - All accounts with order counts
//! GET    /api/admin/accounts/stats      - Account totals / active buyers
//! ```

pub mod admin;
pub mod cart;
pub mod checkout;
pub mod orders;
pub mod products;
pub mod webhook;

use axum::{
    Router,
    routing::{delete, get, post, put},
};

use crate::state::AppState;

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{id}", get(products::show))
        .route("/{id}/reviews", post(products::create_review))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index))
        .route("/session/{session_id}", get(orders::by_session))
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/products", post(admin::create_product))
        .route("/products/{id}", put(admin::update_product))
        .route("/products/{id}", delete(admin::delete_product))
        .route("/orders", get(admin::list_orders))
        .route("/orders/stats", get(admin::order_stats))
        .route("/accounts", get(admin::list_accounts))
        .route("/accounts/stats", get(admin::account_stats))
}

/// Create all API routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new().nest(
        "/api",
        Router::new()
            .nest("/products", product_routes())
            .nest("/cart", cart_routes())
            .nest("/orders", order_routes())
            .nest("/admin", admin_routes())
            .route("/checkout", post(checkout::create))
            .route("/webhook", post(webhook::receive)),
    )
}
