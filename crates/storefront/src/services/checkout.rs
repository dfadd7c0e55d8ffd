//! Checkout orchestration.
//!
//! Turns a cart into a pending order and a hosted payment session. The
//! catalog is the price authority: cart lines name products and quantities,
//! and everything money-related is re-read from the store here. A cart
//! assembled against stale prices simply checks out at current ones.
//!
//! Stock is verified but NOT decremented at this point; the decrement
//! happens when payment is confirmed. An abandoned session therefore never
//! strands inventory, at the cost of a rare oversell surfacing at
//! confirmation time.

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{info, instrument};

use copperleaf_core::{Cart, Email, Price, PriceError, ProductId};

use crate::db::{AccountStore, OrderStore, ProductStore, RepositoryError};
use crate::models::{Account, NewAccount, NewOrder, NewOrderItem, Order, ShippingAddress};
use crate::payments::{
    CheckoutSession, PaymentError, PaymentGateway, SessionLineItem, SessionRequest,
};

/// Errors from checkout orchestration.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Cart has no lines.
    #[error("cart is empty")]
    EmptyCart,

    /// A cart line has a zero quantity.
    #[error("invalid quantity for product {0}")]
    InvalidQuantity(ProductId),

    /// A cart line references a product that no longer exists.
    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    /// Requested more units than are sellable.
    #[error("insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: i32,
    },

    /// Order total cannot be expressed in minor units.
    #[error("invalid order amount: {0}")]
    Amount(#[from] PriceError),

    /// Store operation failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Payment session creation failed.
    #[error(transparent)]
    Payment(#[from] PaymentError),
}

/// Buyer contact details submitted with checkout.
#[derive(Debug, Clone)]
pub struct ContactInfo {
    pub email: Email,
    pub name: String,
    pub phone: Option<String>,
}

/// A checkout submission.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    /// Verified identity-provider subject, when the shopper is signed in.
    pub subject: Option<String>,
    pub contact: ContactInfo,
    pub shipping_address: ShippingAddress,
    pub cart: Cart,
}

/// What checkout hands back to the client.
#[derive(Debug)]
pub struct CheckoutOutcome {
    pub order: Order,
    pub session: CheckoutSession,
}

/// Checkout orchestrator, generic over the store and payment gateway seams.
pub struct CheckoutService<S, G> {
    store: S,
    gateway: G,
    currency: copperleaf_core::CurrencyCode,
}

impl<S, G> CheckoutService<S, G>
where
    S: ProductStore + AccountStore + OrderStore,
    G: PaymentGateway,
{
    pub const fn new(store: S, gateway: G, currency: copperleaf_core::CurrencyCode) -> Self {
        Self {
            store,
            gateway,
            currency,
        }
    }

    /// Run the full checkout flow.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError`] when the cart is empty or malformed, a
    /// product is missing or short on stock, or a downstream call fails.
    #[instrument(skip(self, request), fields(lines = request.cart.lines().len()))]
    pub async fn checkout(&self, request: CheckoutRequest) -> Result<CheckoutOutcome, CheckoutError> {
        let lines = request.cart.lines();
        if lines.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        for line in lines {
            if line.quantity == 0 {
                return Err(CheckoutError::InvalidQuantity(line.product_id));
            }
        }

        let account = self.resolve_account(&request).await?;

        // Re-read every product; cart prices are display hints only.
        let ids: Vec<ProductId> = lines.iter().map(|l| l.product_id).collect();
        let products = self.store.get_products(&ids).await?;

        let mut items = Vec::with_capacity(lines.len());
        let mut session_lines = Vec::with_capacity(lines.len());
        let mut total = Decimal::ZERO;

        for line in lines {
            let product = products
                .iter()
                .find(|p| p.id == line.product_id)
                .ok_or(CheckoutError::ProductNotFound(line.product_id))?;

            let requested = i32::try_from(line.quantity)
                .map_err(|_| CheckoutError::InvalidQuantity(line.product_id))?;
            if product.stock < requested {
                return Err(CheckoutError::InsufficientStock {
                    product_id: product.id,
                    requested: line.quantity,
                    available: product.stock,
                });
            }

            total += product.price * Decimal::from(line.quantity);
            items.push(NewOrderItem {
                product_id: product.id,
                name: product.name.clone(),
                image: product.display_image().map(str::to_owned),
                quantity: requested,
                price_at_purchase: product.price,
            });
            session_lines.push(SessionLineItem {
                name: product.name.clone(),
                unit_price: product.price,
                quantity: line.quantity,
                image: product.display_image().map(str::to_owned),
            });
        }

        // Fail before persisting anything if the total cannot hit the wire.
        Price::new(total, self.currency).minor_units()?;

        let order = self
            .store
            .create_order(NewOrder {
                account_id: account.id,
                items,
                total_amount: total,
                shipping_address: request.shipping_address,
            })
            .await?;

        let session = self
            .gateway
            .create_session(&SessionRequest {
                order_id: order.id,
                currency: self.currency,
                line_items: session_lines,
                customer_email: request.contact.email.to_string(),
            })
            .await?;

        self.store.set_payment_session(order.id, &session.id).await?;

        info!(
            order_id = %order.id,
            account_id = %account.id,
            total = %total,
            "Checkout created pending order"
        );

        Ok(CheckoutOutcome { order, session })
    }

    /// Find or lazily create the account placing this order.
    async fn resolve_account(&self, request: &CheckoutRequest) -> Result<Account, CheckoutError> {
        let new_account = match &request.subject {
            Some(subject) => NewAccount {
                subject: subject.clone(),
                email: request.contact.email.clone(),
                name: request.contact.name.clone(),
                phone: request.contact.phone.clone(),
                address: Some(request.shipping_address.clone()),
            },
            None => NewAccount::guest(
                request.contact.email.clone(),
                request.contact.name.clone(),
                request.contact.phone.clone(),
                Some(request.shipping_address.clone()),
            ),
        };

        if let Some(account) = self
            .store
            .find_account_by_subject(&new_account.subject)
            .await?
        {
            return Ok(account);
        }

        match self.store.create_account(new_account.clone()).await {
            Ok(account) => Ok(account),
            // Lost a creation race; the winner's row is what we want.
            Err(RepositoryError::Conflict(_)) => self
                .store
                .find_account_by_subject(&new_account.subject)
                .await?
                .ok_or(CheckoutError::Repository(RepositoryError::NotFound)),
            Err(e) => Err(e.into()),
        }
    }
}
