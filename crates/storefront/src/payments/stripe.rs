//! Stripe Checkout Sessions client.
//!
//! Talks to `POST /v1/checkout/sessions` with form-encoded nested keys, the
//! only request this integration needs. Amounts cross the wire in minor
//! units; everything inside the service stays decimal.

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

use copperleaf_core::Price;

use super::{CheckoutSession, PaymentError, PaymentGateway, SessionRequest};

/// Stripe API base URL.
const STRIPE_API_BASE: &str = "https://api.stripe.com";

/// Client for the hosted checkout session API.
#[derive(Clone)]
pub struct StripeClient {
    client: Client,
    secret_key: SecretString,
    /// Public origin the buyer returns to after the hosted flow.
    base_url: Url,
}

impl std::fmt::Debug for StripeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeClient")
            .field("secret_key", &"[REDACTED]")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct SessionResponse {
    id: String,
    url: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

impl StripeClient {
    /// Create a new client.
    #[must_use]
    pub fn new(secret_key: SecretString, base_url: Url) -> Self {
        Self {
            client: Client::new(),
            secret_key,
            base_url,
        }
    }

    fn return_url(&self, path: &str) -> String {
        let mut url = self.base_url.clone();
        url.set_path(path);
        url.to_string()
    }

    /// Build the form-encoded body for a session creation request.
    ///
    /// Stripe expects nested keys like `line_items[0][price_data][currency]`.
    fn session_form(&self, request: &SessionRequest) -> Result<Vec<(String, String)>, PaymentError> {
        let mut form: Vec<(String, String)> = vec![
            ("mode".to_owned(), "payment".to_owned()),
            (
                "success_url".to_owned(),
                format!(
                    "{}?session_id={{CHECKOUT_SESSION_ID}}",
                    self.return_url("/checkout/success")
                ),
            ),
            ("cancel_url".to_owned(), self.return_url("/cart")),
            ("customer_email".to_owned(), request.customer_email.clone()),
            (
                "metadata[order_id]".to_owned(),
                request.order_id.to_string(),
            ),
        ];

        for (i, item) in request.line_items.iter().enumerate() {
            let unit_amount = Price::new(item.unit_price, request.currency).minor_units()?;
            form.push((
                format!("line_items[{i}][price_data][currency]"),
                request.currency.code().to_owned(),
            ));
            form.push((
                format!("line_items[{i}][price_data][unit_amount]"),
                unit_amount.to_string(),
            ));
            form.push((
                format!("line_items[{i}][price_data][product_data][name]"),
                item.name.clone(),
            ));
            if let Some(image) = &item.image {
                form.push((
                    format!("line_items[{i}][price_data][product_data][images][0]"),
                    image.clone(),
                ));
            }
            form.push((
                format!("line_items[{i}][quantity]"),
                item.quantity.to_string(),
            ));
        }

        Ok(form)
    }
}

impl PaymentGateway for StripeClient {
    #[instrument(skip(self, request), fields(order_id = %request.order_id))]
    async fn create_session(
        &self,
        request: &SessionRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        let form = self.session_form(request)?;

        let response = self
            .client
            .post(format!("{STRIPE_API_BASE}/v1/checkout/sessions"))
            .basic_auth(self.secret_key.expose_secret(), None::<&str>)
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|b| b.error.message)
                .unwrap_or_else(|| "unknown error".to_owned());
            return Err(PaymentError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        let session: SessionResponse = response.json().await?;
        let url = session
            .url
            .ok_or_else(|| PaymentError::Response("session has no redirect URL".to_owned()))?;

        debug!(session_id = %session.id, "Hosted payment session created");

        Ok(CheckoutSession {
            id: session.id,
            url,
        })
    }
}
