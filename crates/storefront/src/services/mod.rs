//! Business logic services.

pub mod checkout;
pub mod confirmation;
pub mod reconcile;

pub use checkout::{CheckoutError, CheckoutRequest, CheckoutService, ContactInfo};
pub use confirmation::{ConfirmationOutcome, apply_event};
