//! Domain models for storefront.

pub mod account;
pub mod order;
pub mod product;

pub use account::{Account, AccountStats, NewAccount};
pub use order::{NewOrder, NewOrderItem, Order, OrderItem, OrderStats, ShippingAddress};
pub use product::{NewProduct, NewReview, Product, Review};

/// Session storage keys.
pub mod session_keys {
    /// The serialized cart snapshot.
    pub const CART: &str = "cart";
}
