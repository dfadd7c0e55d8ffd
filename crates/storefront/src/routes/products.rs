//! Product browsing and review handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use copperleaf_core::ProductId;

use crate::db::{ProductQuery, ProductStore};
use crate::error::{AppError, Result};
use crate::middleware::Identity;
use crate::models::{NewReview, Product, Review};
use crate::state::AppState;

/// Hard ceiling on page size.
const MAX_PAGE_LIMIT: u32 = 100;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    page: Option<u32>,
    limit: Option<u32>,
    category: Option<String>,
    sort: Option<String>,
}

#[derive(Serialize)]
pub struct Pagination {
    total: i64,
    page: u32,
    limit: u32,
    pages: i64,
}

#[derive(Serialize)]
pub struct ProductListResponse {
    products: Vec<Product>,
    pagination: Pagination,
}

/// `GET /api/products` - paginated product listing.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ProductListResponse>> {
    let defaults = ProductQuery::default();
    let query = ProductQuery {
        page: params.page.unwrap_or(defaults.page).max(1),
        limit: params
            .limit
            .unwrap_or(defaults.limit)
            .clamp(1, MAX_PAGE_LIMIT),
        category: params.category.filter(|c| !c.is_empty()),
        // Unknown sort keys fall back to newest-first.
        sort: params
            .sort
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.sort),
    };

    let page = state.store().list_products(&query).await?;
    // `i64::div_ceil` is feature-gated on this toolchain; this is its exact
    // stdlib definition inlined.
    let limit = i64::from(query.limit);
    let (d, r) = (page.total / limit, page.total % limit);
    let pages = if (r > 0 && limit > 0) || (r < 0 && limit < 0) {
        d + 1
    } else {
        d
    };

    Ok(Json(ProductListResponse {
        products: page.products,
        pagination: Pagination {
            total: page.total,
            page: query.page,
            limit: query.limit,
            pages,
        },
    }))
}

#[derive(Serialize)]
pub struct ProductDetailResponse {
    #[serde(flatten)]
    product: Product,
    reviews: Vec<Review>,
}

/// `GET /api/products/{id}` - product detail with reviews.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<ProductDetailResponse>> {
    let product = state
        .store()
        .get_product(id)
        .await?
        .ok_or_else(|| AppError::NotFound("product not found".to_owned()))?;
    let reviews = state.store().reviews_for(id).await?;

    Ok(Json(ProductDetailResponse { product, reviews }))
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    /// Display name for anonymous reviewers.
    name: Option<String>,
    rating: i32,
    #[serde(default)]
    comment: String,
}

/// `POST /api/products/{id}/reviews` - append a review.
#[instrument(skip(state, body))]
pub async fn create_review(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    Identity(subject): Identity,
    Json(body): Json<ReviewRequest>,
) -> Result<(StatusCode, Json<Review>)> {
    let review = NewReview {
        rating: body.rating,
        comment: body.comment,
    };
    if !review.rating_in_range() {
        return Err(AppError::BadRequest(
            "rating must be between 1 and 5".to_owned(),
        ));
    }

    let reviewer = subject
        .or(body.name)
        .unwrap_or_else(|| "anonymous".to_owned());

    let created = state
        .store()
        .add_review(id, &reviewer, &review)
        .await?
        .ok_or_else(|| AppError::NotFound("product not found".to_owned()))?;

    Ok((StatusCode::CREATED, Json(created)))
}
