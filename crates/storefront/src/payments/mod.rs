//! Hosted payment session integration.
//!
//! The storefront never touches card data: checkout creates a hosted payment
//! session at the provider and redirects the buyer there, and the provider
//! reports the outcome through a signed webhook ([`webhook`]).

pub mod stripe;
pub mod webhook;

pub use stripe::StripeClient;

use rust_decimal::Decimal;
use thiserror::Error;

use copperleaf_core::{CurrencyCode, OrderId, PriceError};

/// Errors from the payment provider integration.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider rejected the request.
    #[error("provider error ({status}): {message}")]
    Provider { status: u16, message: String },

    /// An amount could not be expressed in minor units.
    #[error("invalid amount: {0}")]
    Amount(#[from] PriceError),

    /// Response was missing a required field.
    #[error("malformed provider response: {0}")]
    Response(String),
}

/// One display line of a payment session.
#[derive(Debug, Clone)]
pub struct SessionLineItem {
    pub name: String,
    /// Unit price in major units; converted to minor units at the wire.
    pub unit_price: Decimal,
    pub quantity: u32,
    pub image: Option<String>,
}

/// Request to open a hosted payment session for an order.
#[derive(Debug, Clone)]
pub struct SessionRequest {
    pub order_id: OrderId,
    pub currency: CurrencyCode,
    pub line_items: Vec<SessionLineItem>,
    pub customer_email: String,
}

/// A created hosted payment session.
#[derive(Debug, Clone)]
pub struct CheckoutSession {
    /// Provider-side session identifier, later echoed in webhook events.
    pub id: String,
    /// URL the buyer is redirected to.
    pub url: String,
}

/// Seam for creating hosted payment sessions.
///
/// The production implementation is [`StripeClient`]; tests substitute a
/// fake that records requests and returns canned sessions.
#[allow(async_fn_in_trait)]
pub trait PaymentGateway {
    async fn create_session(
        &self,
        request: &SessionRequest,
    ) -> Result<CheckoutSession, PaymentError>;
}
