//! Order models.
//!
//! Orders are append-mostly: created `pending/pending` by checkout, moved to
//! `processing/paid` by the payment confirmation handler, and never deleted.
//! Item names and prices are captured at purchase time so a paid order stays
//! immutable even when the catalog changes underneath it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use copperleaf_core::{AccountId, OrderId, OrderItemId, OrderStatus, PaymentStatus, ProductId};

/// A durable record of a placed purchase.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub account_id: AccountId,
    pub items: Vec<OrderItem>,
    /// Sum of the items' extended prices, computed server-side at creation.
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub shipping_address: ShippingAddress,
    /// Reference to the hosted payment session, once one exists.
    pub payment_session_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One purchased line within an order.
#[derive(Debug, Clone, Serialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub product_id: ProductId,
    /// Product name at purchase time.
    pub name: String,
    /// Display image at purchase time, if the product had one.
    pub image: Option<String>,
    pub quantity: i32,
    pub price_at_purchase: Decimal,
}

/// A shipping destination as submitted at checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub country: String,
}

/// Input for persisting a new order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub account_id: AccountId,
    pub items: Vec<NewOrderItem>,
    pub total_amount: Decimal,
    pub shipping_address: ShippingAddress,
}

/// One line of a [`NewOrder`].
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub name: String,
    pub image: Option<String>,
    pub quantity: i32,
    pub price_at_purchase: Decimal,
}

/// Aggregate order figures for the admin dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct OrderStats {
    /// Sum of `total_amount` over non-cancelled orders.
    pub total_revenue: Decimal,
    pub order_count: i64,
    pub pending_count: i64,
}
