//! Product catalog models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use copperleaf_core::{ProductId, ReviewId};

/// A catalog product. The server-owned, authoritative record: `price` and
/// `stock` here are what checkout verifies against, never client-submitted
/// values.
#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub category: String,
    pub price: Decimal,
    /// Sellable units. Never negative; decremented only on confirmed payment.
    pub stock: i32,
    /// Ordered image URLs; the first is the display image.
    pub images: Vec<String>,
    /// Denormalized average review rating.
    pub rating: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// The product's display image, if it has one.
    #[must_use]
    pub fn display_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }
}

/// Input for creating or replacing a product.
///
/// This is the single adapter for the legacy product shape: callers may
/// submit either an `images` list or a lone `image_url`, and `normalized`
/// folds the latter into the former exactly once at the boundary.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    pub price: Decimal,
    #[serde(default)]
    pub stock: i32,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl NewProduct {
    /// Fold the legacy single `image_url` field into `images`.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        if self.images.is_empty()
            && let Some(url) = self.image_url.take()
        {
            self.images.push(url);
        }
        self
    }
}

/// A customer review attached to a product.
#[derive(Debug, Clone, Serialize)]
pub struct Review {
    pub id: ReviewId,
    pub product_id: ProductId,
    pub reviewer: String,
    /// 1 through 5 inclusive.
    pub rating: i32,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

/// Input for appending a review.
#[derive(Debug, Clone, Deserialize)]
pub struct NewReview {
    pub rating: i32,
    #[serde(default)]
    pub comment: String,
}

impl NewReview {
    /// Whether the rating is within the accepted 1..=5 range.
    #[must_use]
    pub const fn rating_in_range(&self) -> bool {
        self.rating >= 1 && self.rating <= 5
    }
}
