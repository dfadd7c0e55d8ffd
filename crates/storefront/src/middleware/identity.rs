//! Caller identity extractors.
//!
//! The storefront sits behind an authenticating reverse proxy that
//! verifies the shopper's credentials and forwards the identity-provider
//! subject in a request header. The service trusts that header and never
//! handles credentials itself. Requests without the header are anonymous
//! shoppers: they can browse and carry a cart, and check out as guests.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};

/// Header carrying the verified identity-provider subject.
pub const SUBJECT_HEADER: &str = "x-auth-subject";

/// The authenticated subject for this request, if any.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(Identity(subject): Identity) -> impl IntoResponse {
///     match subject {
///         Some(subject) => format!("hello, {subject}"),
///         None => "hello, guest".to_owned(),
///     }
/// }
/// ```
pub struct Identity(pub Option<String>);

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let subject = parts
            .headers
            .get(SUBJECT_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_owned);

        Ok(Self(subject))
    }
}

/// Extractor that rejects anonymous requests with 401.
pub struct RequireIdentity(pub String);

/// Rejection for [`RequireIdentity`].
pub struct IdentityRejection;

impl IntoResponse for IdentityRejection {
    fn into_response(self) -> Response {
        StatusCode::UNAUTHORIZED.into_response()
    }
}

impl<S> FromRequestParts<S> for RequireIdentity
where
    S: Send + Sync,
{
    type Rejection = IdentityRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Identity::from_request_parts(parts, state).await {
            Ok(Identity(Some(subject))) => Ok(Self(subject)),
            _ => Err(IdentityRejection),
        }
    }
}
