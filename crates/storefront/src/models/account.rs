//! Account models.
//!
//! An account maps an external identity-provider subject to an internal
//! record. Accounts are created lazily at first checkout; when no
//! authenticated subject is present, a guest account keyed by the submitted
//! contact email stands in (`guest:{email}`).

use chrono::{DateTime, Utc};
use serde::Serialize;

use copperleaf_core::{AccountId, Email};

use super::order::ShippingAddress;

/// Prefix for synthesized guest subjects.
pub const GUEST_SUBJECT_PREFIX: &str = "guest:";

/// An internal customer account.
#[derive(Debug, Clone, Serialize)]
pub struct Account {
    pub id: AccountId,
    /// External identity-provider subject, or `guest:{email}`.
    pub subject: String,
    pub email: Email,
    pub name: String,
    pub phone: Option<String>,
    /// Last known shipping address, captured at account creation.
    pub address: Option<ShippingAddress>,
    /// Denormalized count of orders placed by this account.
    pub order_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Whether this account was synthesized for a guest checkout.
    #[must_use]
    pub fn is_guest(&self) -> bool {
        self.subject.starts_with(GUEST_SUBJECT_PREFIX)
    }
}

/// Input for creating an account.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub subject: String,
    pub email: Email,
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<ShippingAddress>,
}

impl NewAccount {
    /// Build the synthesized guest account for a contact email.
    #[must_use]
    pub fn guest(
        email: Email,
        name: String,
        phone: Option<String>,
        address: Option<ShippingAddress>,
    ) -> Self {
        Self {
            subject: format!("{GUEST_SUBJECT_PREFIX}{email}"),
            email,
            name,
            phone,
            address,
        }
    }
}

/// Aggregate account figures for the admin dashboard.
#[derive(Debug, Serialize)]
pub struct AccountStats {
    pub account_count: i64,
    /// Accounts that have placed at least one order.
    pub active_count: i64,
}
