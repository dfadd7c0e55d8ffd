//! Product repository over `PostgreSQL`.
//!
//! Queries use the runtime API with `FromRow` row structs; rows are mapped
//! into domain models at the repository boundary.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;

use copperleaf_core::{ProductId, ReviewId};

use super::{PgStore, ProductPage, ProductQuery, ProductSort, ProductStore, RepositoryError};
use crate::models::{NewProduct, NewReview, Product, Review};

#[derive(FromRow)]
struct ProductRow {
    id: i32,
    name: String,
    description: String,
    category: String,
    price: Decimal,
    stock: i32,
    images: Vec<String>,
    rating: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(r: ProductRow) -> Self {
        Self {
            id: ProductId::new(r.id),
            name: r.name,
            description: r.description,
            category: r.category,
            price: r.price,
            stock: r.stock,
            images: r.images,
            rating: r.rating,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(FromRow)]
struct ReviewRow {
    id: i32,
    product_id: i32,
    reviewer: String,
    rating: i32,
    comment: String,
    created_at: DateTime<Utc>,
}

impl From<ReviewRow> for Review {
    fn from(r: ReviewRow) -> Self {
        Self {
            id: ReviewId::new(r.id),
            product_id: ProductId::new(r.product_id),
            reviewer: r.reviewer,
            rating: r.rating,
            comment: r.comment,
            created_at: r.created_at,
        }
    }
}

const PRODUCT_COLUMNS: &str =
    "id, name, description, category, price, stock, images, rating, created_at, updated_at";

const fn sort_column(sort: ProductSort) -> &'static str {
    match sort {
        ProductSort::Newest => "created_at",
        ProductSort::Price => "price",
        ProductSort::Rating => "rating",
    }
}

impl ProductStore for PgStore {
    async fn list_products(&self, query: &ProductQuery) -> Result<ProductPage, RepositoryError> {
        let offset = i64::from(query.page.saturating_sub(1)) * i64::from(query.limit);
        let limit = i64::from(query.limit);
        // Sort keys come from a closed enum, never from the request string.
        let order_by = sort_column(query.sort);

        let (total, rows): (i64, Vec<ProductRow>) = if let Some(category) = &query.category {
            let total: (i64,) =
                sqlx::query_as("SELECT COUNT(*) FROM storefront.product WHERE category = $1")
                    .bind(category)
                    .fetch_one(&self.pool)
                    .await?;
            let rows = sqlx::query_as(&format!(
                "SELECT {PRODUCT_COLUMNS} FROM storefront.product \
                 WHERE category = $1 ORDER BY {order_by} DESC LIMIT $2 OFFSET $3"
            ))
            .bind(category)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
            (total.0, rows)
        } else {
            let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM storefront.product")
                .fetch_one(&self.pool)
                .await?;
            let rows = sqlx::query_as(&format!(
                "SELECT {PRODUCT_COLUMNS} FROM storefront.product \
                 ORDER BY {order_by} DESC LIMIT $1 OFFSET $2"
            ))
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
            (total.0, rows)
        };

        Ok(ProductPage {
            products: rows.into_iter().map(Product::from).collect(),
            total,
        })
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM storefront.product WHERE id = $1"
        ))
        .bind(id.as_i32())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Product::from))
    }

    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        let raw_ids: Vec<i32> = ids.iter().map(ProductId::as_i32).collect();
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM storefront.product WHERE id = ANY($1)"
        ))
        .bind(&raw_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn create_product(&self, input: NewProduct) -> Result<Product, RepositoryError> {
        let input = input.normalized();
        let row: ProductRow = sqlx::query_as(&format!(
            "INSERT INTO storefront.product (name, description, category, price, stock, images) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(&input.name)
        .bind(&input.description)
        .bind(&input.category)
        .bind(input.price)
        .bind(input.stock)
        .bind(&input.images)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn update_product(
        &self,
        id: ProductId,
        input: NewProduct,
    ) -> Result<Option<Product>, RepositoryError> {
        let input = input.normalized();
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            "UPDATE storefront.product \
             SET name = $2, description = $3, category = $4, price = $5, stock = $6, \
                 images = $7, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id.as_i32())
        .bind(&input.name)
        .bind(&input.description)
        .bind(&input.category)
        .bind(input.price)
        .bind(input.stock)
        .bind(&input.images)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Product::from))
    }

    async fn delete_product(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM storefront.product WHERE id = $1")
            .bind(id.as_i32())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn add_review(
        &self,
        id: ProductId,
        reviewer: &str,
        review: &NewReview,
    ) -> Result<Option<Review>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<(i32,)> =
            sqlx::query_as("SELECT id FROM storefront.product WHERE id = $1 FOR UPDATE")
                .bind(id.as_i32())
                .fetch_optional(&mut *tx)
                .await?;

        if exists.is_none() {
            return Ok(None);
        }

        let row: ReviewRow = sqlx::query_as(
            "INSERT INTO storefront.product_review (product_id, reviewer, rating, comment) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, product_id, reviewer, rating, comment, created_at",
        )
        .bind(id.as_i32())
        .bind(reviewer)
        .bind(review.rating)
        .bind(&review.comment)
        .fetch_one(&mut *tx)
        .await?;

        // Refresh the denormalized average rating.
        sqlx::query(
            "UPDATE storefront.product SET rating = ( \
                 SELECT COALESCE(AVG(rating), 0) FROM storefront.product_review \
                 WHERE product_id = $1 \
             ), updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id.as_i32())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(row.into()))
    }

    async fn reviews_for(&self, id: ProductId) -> Result<Vec<Review>, RepositoryError> {
        let rows: Vec<ReviewRow> = sqlx::query_as(
            "SELECT id, product_id, reviewer, rating, comment, created_at \
             FROM storefront.product_review \
             WHERE product_id = $1 \
             ORDER BY created_at ASC",
        )
        .bind(id.as_i32())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Review::from).collect())
    }

    async fn decrement_stock(
        &self,
        id: ProductId,
        quantity: u32,
    ) -> Result<bool, RepositoryError> {
        let quantity = i32::try_from(quantity).map_err(|_| {
            RepositoryError::DataCorruption(format!("quantity out of range: {quantity}"))
        })?;

        // Conditional decrement: under concurrent confirmations only one
        // caller can take the last units.
        let result = sqlx::query(
            "UPDATE storefront.product \
             SET stock = stock - $2, updated_at = NOW() \
             WHERE id = $1 AND stock >= $2",
        )
        .bind(id.as_i32())
        .bind(quantity)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
