//! Database operations for the storefront `PostgreSQL` database.
//!
//! # Tables (schema `storefront`)
//!
//! - `product` / `product_review` - The catalog and its reviews
//! - `account` - Customers (external subjects and synthesized guests)
//! - `orders` / `order_item` - Purchases and their lines
//! - `tower_sessions.session` - Session storage (cart snapshots)
//!
//! # Store traits
//!
//! Request handlers and services talk to the database through the
//! [`ProductStore`], [`AccountStore`], and [`OrderStore`] traits. [`PgStore`]
//! is the `PostgreSQL` implementation; tests drive the checkout and
//! confirmation services against an in-memory fake with the same conditional
//! semantics.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p copperleaf-cli -- migrate
//! ```

use std::time::Duration;

use chrono::{DateTime, Utc};
use copperleaf_core::{AccountId, OrderId, ProductId};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use crate::models::{
    Account, AccountStats, NewAccount, NewOrder, NewProduct, NewReview, Order, OrderStats,
    Product, Review,
};

pub mod accounts;
#[cfg(test)]
pub mod memory;
pub mod orders;
pub mod products;

/// Errors from repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The underlying query failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A uniqueness constraint was violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The referenced row does not exist.
    #[error("not found")]
    NotFound,

    /// A stored value could not be interpreted.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// `PostgreSQL`-backed implementation of the store traits.
///
/// Cheap to clone; wraps the shared connection pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Query parameters for the paginated product listing.
#[derive(Debug, Clone)]
pub struct ProductQuery {
    pub page: u32,
    pub limit: u32,
    pub category: Option<String>,
    pub sort: ProductSort,
}

impl Default for ProductQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 12,
            category: None,
            sort: ProductSort::Newest,
        }
    }
}

/// Sort orders for the product listing. Everything sorts descending, the
/// way the original storefront presented it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProductSort {
    #[default]
    Newest,
    Price,
    Rating,
}

impl std::str::FromStr for ProductSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "createdAt" | "newest" => Ok(Self::Newest),
            "price" => Ok(Self::Price),
            "rating" => Ok(Self::Rating),
            _ => Err(format!("invalid sort key: {s}")),
        }
    }
}

/// One page of products plus the total row count for pagination.
#[derive(Debug, Clone)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub total: i64,
}

/// Result of the conditional paid transition on an order.
#[derive(Debug)]
pub enum PaidTransition {
    /// The order was `pending` and is now `processing/paid`.
    Applied(Order),
    /// The order exists but its payment was already settled; nothing changed.
    AlreadySettled,
    /// No such order.
    NotFound,
}

/// Read and write access to the product catalog.
#[allow(async_fn_in_trait)]
pub trait ProductStore {
    /// List products for the shop page.
    async fn list_products(&self, query: &ProductQuery) -> Result<ProductPage, RepositoryError>;

    /// Fetch one product.
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Fetch several products at once (checkout price verification).
    /// Unknown ids are simply absent from the result.
    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError>;

    /// Create a product (admin).
    async fn create_product(&self, input: NewProduct) -> Result<Product, RepositoryError>;

    /// Replace a product's fields (admin). `None` when the product is missing.
    async fn update_product(
        &self,
        id: ProductId,
        input: NewProduct,
    ) -> Result<Option<Product>, RepositoryError>;

    /// Delete a product (admin). `false` when the product was missing.
    async fn delete_product(&self, id: ProductId) -> Result<bool, RepositoryError>;

    /// Append a review and refresh the product's denormalized rating.
    /// `None` when the product is missing.
    async fn add_review(
        &self,
        id: ProductId,
        reviewer: &str,
        review: &NewReview,
    ) -> Result<Option<Review>, RepositoryError>;

    /// Reviews for a product, oldest first.
    async fn reviews_for(&self, id: ProductId) -> Result<Vec<Review>, RepositoryError>;

    /// Atomically take `quantity` units of stock.
    ///
    /// Returns `false` (and changes nothing) when fewer than `quantity`
    /// units remain - the conditional form of the decrement is what makes
    /// racing confirmations safe.
    async fn decrement_stock(
        &self,
        id: ProductId,
        quantity: u32,
    ) -> Result<bool, RepositoryError>;
}

/// Access to customer accounts.
#[allow(async_fn_in_trait)]
pub trait AccountStore {
    /// Look up an account by its identity-provider subject.
    async fn find_account_by_subject(
        &self,
        subject: &str,
    ) -> Result<Option<Account>, RepositoryError>;

    /// Create an account.
    async fn create_account(&self, input: NewAccount) -> Result<Account, RepositoryError>;

    /// Every account, newest first (admin).
    async fn list_accounts(&self) -> Result<Vec<Account>, RepositoryError>;

    /// Aggregate account figures for the admin dashboard.
    async fn account_stats(&self) -> Result<AccountStats, RepositoryError>;
}

/// Access to orders.
#[allow(async_fn_in_trait)]
pub trait OrderStore {
    /// Persist a new `pending/pending` order with its items and bump the
    /// owning account's order count, all in one transaction.
    async fn create_order(&self, input: NewOrder) -> Result<Order, RepositoryError>;

    /// Record the hosted payment session reference on an order.
    async fn set_payment_session(
        &self,
        id: OrderId,
        session_ref: &str,
    ) -> Result<(), RepositoryError>;

    /// Fetch one order with its items.
    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// Fetch the order created for a payment session, if visible yet.
    async fn get_order_by_payment_session(
        &self,
        session_ref: &str,
    ) -> Result<Option<Order>, RepositoryError>;

    /// All orders for an account, newest first. Empty when the account has
    /// none.
    async fn orders_for_account(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<Order>, RepositoryError>;

    /// Every order, newest first (admin).
    async fn all_orders(&self) -> Result<Vec<Order>, RepositoryError>;

    /// Conditionally transition an order from `pending` payment to
    /// `processing/paid`, recording the session reference.
    ///
    /// The condition is keyed on `payment_status = 'pending'`, so a replayed
    /// confirmation observes [`PaidTransition::AlreadySettled`] and mutates
    /// nothing - the idempotence guarantee for the webhook.
    async fn mark_paid_if_pending(
        &self,
        id: OrderId,
        session_ref: &str,
    ) -> Result<PaidTransition, RepositoryError>;

    /// Cancel orders still `pending/pending` created before `cutoff`.
    /// Returns how many were cancelled.
    async fn cancel_stale_pending(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, RepositoryError>;

    /// Aggregate figures for the admin dashboard.
    async fn order_stats(&self) -> Result<OrderStats, RepositoryError>;
}
