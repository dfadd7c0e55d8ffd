//! The shopping cart working set.
//!
//! A [`Cart`] is the buyer's client-held list of intended purchases. It is a
//! cache, not a source of truth: prices and names are display snapshots
//! captured when the line was added, and checkout re-derives everything from
//! the authoritative product store.
//!
//! The cart serializes to a JSON snapshot (a plain list of [`CartLine`]s)
//! that is persisted between requests and must round-trip exactly.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::ProductId;

/// One product-and-quantity entry in a cart.
///
/// `price`, `name`, and `image` are denormalized display fields captured at
/// add-time. Adding the same product again accumulates `quantity` and never
/// refreshes the price snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub name: String,
    pub price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub quantity: u32,
}

impl CartLine {
    /// The line's extended price (`price * quantity`).
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// A buyer's cart: at most one line per distinct product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// The cart's lines, in add order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Whether the cart holds no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    /// Add a product to the cart.
    ///
    /// If a line for the product already exists its quantity is increased by
    /// `quantity`; the existing price snapshot is kept. Otherwise a new line
    /// is appended. A zero `quantity` is treated as 1.
    pub fn add_item(&mut self, line: CartLine) {
        let quantity = line.quantity.max(1);
        match self.line_mut(line.product_id) {
            Some(existing) => {
                existing.quantity = existing.quantity.saturating_add(quantity);
            }
            None => self.lines.push(CartLine { quantity, ..line }),
        }
    }

    /// Remove the line for `product_id`. No-op when absent.
    pub fn remove_item(&mut self, product_id: ProductId) {
        self.lines.retain(|l| l.product_id != product_id);
    }

    /// Set the quantity for `product_id`.
    ///
    /// A quantity below 1 removes the line (the cart never holds zero-unit
    /// lines). Setting a quantity for an absent product is a no-op.
    pub fn update_quantity(&mut self, product_id: ProductId, quantity: u32) {
        if quantity < 1 {
            self.remove_item(product_id);
            return;
        }
        if let Some(line) = self.line_mut(product_id) {
            line.quantity = quantity;
        }
    }

    /// Sum of `price * quantity` over all lines. Zero for an empty cart.
    #[must_use]
    pub fn calculate_total(&self) -> Decimal {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Empty the cart.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Serialize the cart to its JSON snapshot.
    ///
    /// # Errors
    ///
    /// Returns a `serde_json::Error` if serialization fails.
    pub fn to_snapshot(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.lines)
    }

    /// Restore a cart from a JSON snapshot.
    ///
    /// # Errors
    ///
    /// Returns a `serde_json::Error` when the snapshot is malformed.
    pub fn from_snapshot(snapshot: &str) -> Result<Self, serde_json::Error> {
        let lines = serde_json::from_str(snapshot)?;
        Ok(Self { lines })
    }

    fn line_mut(&mut self, product_id: ProductId) -> Option<&mut CartLine> {
        self.lines.iter_mut().find(|l| l.product_id == product_id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn line(id: i32, price: &str, quantity: u32) -> CartLine {
        CartLine {
            product_id: ProductId::new(id),
            name: format!("product-{id}"),
            price: price.parse().unwrap(),
            image: None,
            quantity,
        }
    }

    #[test]
    fn test_add_accumulates_instead_of_duplicating() {
        let mut cart = Cart::new();
        cart.add_item(line(1, "10.00", 2));
        cart.add_item(line(1, "12.00", 1)); // different price snapshot, ignored

        assert_eq!(cart.lines().len(), 1);
        let only = &cart.lines()[0];
        assert_eq!(only.quantity, 3);
        // original snapshot preserved
        assert_eq!(only.price, "10.00".parse().unwrap());
    }

    #[test]
    fn test_add_zero_quantity_defaults_to_one() {
        let mut cart = Cart::new();
        cart.add_item(line(1, "5.00", 0));
        assert_eq!(cart.lines()[0].quantity, 1);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut cart = Cart::new();
        cart.add_item(line(1, "10.00", 1));
        cart.remove_item(ProductId::new(99));
        assert_eq!(cart.lines().len(), 1);
    }

    #[test]
    fn test_update_quantity_below_one_removes() {
        let mut cart = Cart::new();
        cart.add_item(line(1, "10.00", 2));
        cart.update_quantity(ProductId::new(1), 0);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_update_quantity_sets_value() {
        let mut cart = Cart::new();
        cart.add_item(line(1, "10.00", 2));
        cart.update_quantity(ProductId::new(1), 5);
        assert_eq!(cart.lines()[0].quantity, 5);
        // absent product is a no-op
        cart.update_quantity(ProductId::new(2), 3);
        assert_eq!(cart.lines().len(), 1);
    }

    #[test]
    fn test_total_tracks_mutations() {
        let mut cart = Cart::new();
        assert_eq!(cart.calculate_total(), Decimal::ZERO);

        cart.add_item(line(1, "10.00", 2));
        cart.add_item(line(2, "3.50", 1));
        assert_eq!(cart.calculate_total(), "23.50".parse().unwrap());

        cart.update_quantity(ProductId::new(2), 4);
        assert_eq!(cart.calculate_total(), "34.00".parse().unwrap());

        cart.remove_item(ProductId::new(1));
        assert_eq!(cart.calculate_total(), "14.00".parse().unwrap());
    }

    #[test]
    fn test_clear_then_total_is_zero() {
        let mut cart = Cart::new();
        cart.add_item(line(1, "10.00", 2));
        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.calculate_total(), Decimal::ZERO);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut cart = Cart::new();
        cart.add_item(CartLine {
            product_id: ProductId::new(7),
            name: "Ceramic Mug".to_owned(),
            price: "14.25".parse().unwrap(),
            image: Some("https://img.example/mug.jpg".to_owned()),
            quantity: 3,
        });
        cart.add_item(line(8, "99.99", 1));

        let snapshot = cart.to_snapshot().unwrap();
        let restored = Cart::from_snapshot(&snapshot).unwrap();
        assert_eq!(restored, cart);
        assert_eq!(restored.lines()[0].quantity, 3);
        assert_eq!(restored.calculate_total(), cart.calculate_total());
    }

    #[test]
    fn test_empty_snapshot_round_trip() {
        let cart = Cart::new();
        let snapshot = cart.to_snapshot().unwrap();
        assert_eq!(snapshot, "[]");
        assert!(Cart::from_snapshot(&snapshot).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_snapshot_is_an_error() {
        assert!(Cart::from_snapshot("not json").is_err());
    }
}
