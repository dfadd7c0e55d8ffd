//! In-memory store for tests.
//!
//! Implements the same store traits as [`PgStore`](super::PgStore) with the
//! same conditional semantics (idempotent paid transition, guarded stock
//! decrement), so service-layer tests exercise the real state machine
//! without a database.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use copperleaf_core::{
    AccountId, OrderId, OrderItemId, OrderStatus, PaymentStatus, ProductId, ReviewId,
};

use super::{
    AccountStore, OrderStore, PaidTransition, ProductPage, ProductQuery, ProductSort,
    ProductStore, RepositoryError,
};
use crate::models::{
    Account, AccountStats, NewAccount, NewOrder, NewProduct, NewReview, Order, OrderItem,
    OrderStats, Product, Review,
};

#[derive(Default)]
struct Inner {
    products: Vec<Product>,
    reviews: Vec<Review>,
    accounts: Vec<Account>,
    orders: Vec<Order>,
    next_id: i32,
}

impl Inner {
    fn next(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }
}

/// Shared-state in-memory store; cheap to clone.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a product directly, bypassing the creation path.
    pub fn insert_product(&self, product: Product) {
        self.lock().products.push(product);
    }

    /// Override an order's creation time, for staleness tests.
    pub fn backdate_order(&self, id: OrderId, created_at: DateTime<Utc>) {
        let mut inner = self.lock();
        if let Some(order) = inner.orders.iter_mut().find(|o| o.id == id) {
            order.created_at = created_at;
        }
    }

    pub fn stock_of(&self, id: ProductId) -> Option<i32> {
        self.lock()
            .products
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.stock)
    }

    #[allow(clippy::unwrap_used)]
    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap()
    }
}

fn sort_key(product: &Product, sort: ProductSort) -> Decimal {
    match sort {
        ProductSort::Newest => Decimal::from(product.created_at.timestamp()),
        ProductSort::Price => product.price,
        ProductSort::Rating => product.rating,
    }
}

impl ProductStore for MemoryStore {
    async fn list_products(&self, query: &ProductQuery) -> Result<ProductPage, RepositoryError> {
        let inner = self.lock();
        let mut matching: Vec<Product> = inner
            .products
            .iter()
            .filter(|p| {
                query
                    .category
                    .as_ref()
                    .is_none_or(|category| &p.category == category)
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| sort_key(b, query.sort).cmp(&sort_key(a, query.sort)));

        let total = matching.len() as i64;
        let offset = (query.page.saturating_sub(1) as usize) * query.limit as usize;
        let products = matching
            .into_iter()
            .skip(offset)
            .take(query.limit as usize)
            .collect();

        Ok(ProductPage { products, total })
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.lock().products.iter().find(|p| p.id == id).cloned())
    }

    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        Ok(self
            .lock()
            .products
            .iter()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect())
    }

    async fn create_product(&self, input: NewProduct) -> Result<Product, RepositoryError> {
        let input = input.normalized();
        let mut inner = self.lock();
        let now = Utc::now();
        let product = Product {
            id: ProductId::new(inner.next()),
            name: input.name,
            description: input.description,
            category: input.category,
            price: input.price,
            stock: input.stock,
            images: input.images,
            rating: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        };
        inner.products.push(product.clone());
        Ok(product)
    }

    async fn update_product(
        &self,
        id: ProductId,
        input: NewProduct,
    ) -> Result<Option<Product>, RepositoryError> {
        let input = input.normalized();
        let mut inner = self.lock();
        let Some(product) = inner.products.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        product.name = input.name;
        product.description = input.description;
        product.category = input.category;
        product.price = input.price;
        product.stock = input.stock;
        product.images = input.images;
        product.updated_at = Utc::now();
        Ok(Some(product.clone()))
    }

    async fn delete_product(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let mut inner = self.lock();
        let before = inner.products.len();
        inner.products.retain(|p| p.id != id);
        Ok(inner.products.len() < before)
    }

    async fn add_review(
        &self,
        id: ProductId,
        reviewer: &str,
        review: &NewReview,
    ) -> Result<Option<Review>, RepositoryError> {
        let mut inner = self.lock();
        if !inner.products.iter().any(|p| p.id == id) {
            return Ok(None);
        }
        let stored = Review {
            id: ReviewId::new(inner.next()),
            product_id: id,
            reviewer: reviewer.to_owned(),
            rating: review.rating,
            comment: review.comment.clone(),
            created_at: Utc::now(),
        };
        inner.reviews.push(stored.clone());

        let (sum, count) = inner
            .reviews
            .iter()
            .filter(|r| r.product_id == id)
            .fold((0i64, 0i64), |(s, c), r| (s + i64::from(r.rating), c + 1));
        if let Some(product) = inner.products.iter_mut().find(|p| p.id == id) {
            product.rating = Decimal::from(sum) / Decimal::from(count);
        }

        Ok(Some(stored))
    }

    async fn reviews_for(&self, id: ProductId) -> Result<Vec<Review>, RepositoryError> {
        Ok(self
            .lock()
            .reviews
            .iter()
            .filter(|r| r.product_id == id)
            .cloned()
            .collect())
    }

    async fn decrement_stock(
        &self,
        id: ProductId,
        quantity: u32,
    ) -> Result<bool, RepositoryError> {
        let quantity = i32::try_from(quantity).map_err(|_| {
            RepositoryError::DataCorruption(format!("quantity out of range: {quantity}"))
        })?;
        let mut inner = self.lock();
        let Some(product) = inner.products.iter_mut().find(|p| p.id == id) else {
            return Ok(false);
        };
        if product.stock < quantity {
            return Ok(false);
        }
        product.stock -= quantity;
        Ok(true)
    }
}

impl AccountStore for MemoryStore {
    async fn find_account_by_subject(
        &self,
        subject: &str,
    ) -> Result<Option<Account>, RepositoryError> {
        Ok(self
            .lock()
            .accounts
            .iter()
            .find(|a| a.subject == subject)
            .cloned())
    }

    async fn create_account(&self, input: NewAccount) -> Result<Account, RepositoryError> {
        let mut inner = self.lock();
        if inner.accounts.iter().any(|a| a.subject == input.subject) {
            return Err(RepositoryError::Conflict("subject already exists".to_owned()));
        }
        let now = Utc::now();
        let account = Account {
            id: AccountId::new(inner.next()),
            subject: input.subject,
            email: input.email,
            name: input.name,
            phone: input.phone,
            address: input.address,
            order_count: 0,
            created_at: now,
            updated_at: now,
        };
        inner.accounts.push(account.clone());
        Ok(account)
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, RepositoryError> {
        let mut accounts = self.lock().accounts.clone();
        accounts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(accounts)
    }

    async fn account_stats(&self) -> Result<AccountStats, RepositoryError> {
        let inner = self.lock();
        let account_count = inner.accounts.len() as i64;
        let active_count = inner
            .accounts
            .iter()
            .filter(|a| a.order_count > 0)
            .count() as i64;
        Ok(AccountStats {
            account_count,
            active_count,
        })
    }
}

impl OrderStore for MemoryStore {
    async fn create_order(&self, input: NewOrder) -> Result<Order, RepositoryError> {
        let mut inner = self.lock();
        let now = Utc::now();
        let order_id = OrderId::new(inner.next());
        let items = input
            .items
            .iter()
            .map(|item| OrderItem {
                id: OrderItemId::new(inner.next()),
                product_id: item.product_id,
                name: item.name.clone(),
                image: item.image.clone(),
                quantity: item.quantity,
                price_at_purchase: item.price_at_purchase,
            })
            .collect::<Vec<_>>();
        let order = Order {
            id: order_id,
            account_id: input.account_id,
            items,
            total_amount: input.total_amount,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            shipping_address: input.shipping_address,
            payment_session_ref: None,
            created_at: now,
            updated_at: now,
        };
        inner.orders.push(order.clone());
        if let Some(account) = inner
            .accounts
            .iter_mut()
            .find(|a| a.id == input.account_id)
        {
            account.order_count += 1;
        }
        Ok(order)
    }

    async fn set_payment_session(
        &self,
        id: OrderId,
        session_ref: &str,
    ) -> Result<(), RepositoryError> {
        let mut inner = self.lock();
        let order = inner
            .orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or(RepositoryError::NotFound)?;
        order.payment_session_ref = Some(session_ref.to_owned());
        order.updated_at = Utc::now();
        Ok(())
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self.lock().orders.iter().find(|o| o.id == id).cloned())
    }

    async fn get_order_by_payment_session(
        &self,
        session_ref: &str,
    ) -> Result<Option<Order>, RepositoryError> {
        Ok(self
            .lock()
            .orders
            .iter()
            .find(|o| o.payment_session_ref.as_deref() == Some(session_ref))
            .cloned())
    }

    async fn orders_for_account(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<Order>, RepositoryError> {
        let mut orders: Vec<Order> = self
            .lock()
            .orders
            .iter()
            .filter(|o| o.account_id == account_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn all_orders(&self) -> Result<Vec<Order>, RepositoryError> {
        let mut orders = self.lock().orders.clone();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn mark_paid_if_pending(
        &self,
        id: OrderId,
        session_ref: &str,
    ) -> Result<PaidTransition, RepositoryError> {
        let mut inner = self.lock();
        let Some(order) = inner.orders.iter_mut().find(|o| o.id == id) else {
            return Ok(PaidTransition::NotFound);
        };
        if order.payment_status != PaymentStatus::Pending {
            return Ok(PaidTransition::AlreadySettled);
        }
        order.status = OrderStatus::Processing;
        order.payment_status = PaymentStatus::Paid;
        order.payment_session_ref = Some(session_ref.to_owned());
        order.updated_at = Utc::now();
        Ok(PaidTransition::Applied(order.clone()))
    }

    async fn cancel_stale_pending(&self, cutoff: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let mut inner = self.lock();
        let mut cancelled = 0u64;
        for order in &mut inner.orders {
            if order.payment_status == PaymentStatus::Pending
                && order.status == OrderStatus::Pending
                && order.created_at < cutoff
            {
                order.status = OrderStatus::Cancelled;
                order.payment_status = PaymentStatus::Failed;
                order.updated_at = Utc::now();
                cancelled += 1;
            }
        }
        Ok(cancelled)
    }

    async fn order_stats(&self) -> Result<OrderStats, RepositoryError> {
        let inner = self.lock();
        let total_revenue = inner
            .orders
            .iter()
            .filter(|o| o.status != OrderStatus::Cancelled)
            .map(|o| o.total_amount)
            .sum();
        let order_count = inner.orders.len() as i64;
        let pending_count = inner
            .orders
            .iter()
            .filter(|o| o.status == OrderStatus::Pending)
            .count() as i64;
        Ok(OrderStats {
            total_revenue,
            order_count,
            pending_count,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use copperleaf_core::Email;
    use rust_decimal::Decimal;

    use super::*;
    use crate::models::ShippingAddress;

    fn address() -> ShippingAddress {
        ShippingAddress {
            street: "1 Main St".to_owned(),
            city: "Springfield".to_owned(),
            state: "IL".to_owned(),
            zip: "62701".to_owned(),
            country: "US".to_owned(),
        }
    }

    async fn account(store: &MemoryStore, subject: &str) -> Account {
        store
            .create_account(NewAccount {
                subject: subject.to_owned(),
                email: Email::parse("shopper@example.com").unwrap(),
                name: "Shopper".to_owned(),
                phone: None,
                address: Some(address()),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_created_account_keeps_its_address() {
        let store = MemoryStore::new();
        let created = account(&store, "sub-1").await;
        assert_eq!(created.address.as_ref().unwrap().city, "Springfield");

        let found = store.find_account_by_subject("sub-1").await.unwrap().unwrap();
        assert_eq!(found.address.unwrap().street, "1 Main St");
    }

    #[tokio::test]
    async fn test_list_accounts_newest_first() {
        let store = MemoryStore::new();
        account(&store, "older").await;
        let newer = {
            let mut a = account(&store, "newer").await;
            a.created_at += chrono::Duration::seconds(1);
            store.lock().accounts.last_mut().unwrap().created_at = a.created_at;
            a
        };

        let listed = store.list_accounts().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, newer.id);
        assert_eq!(listed[1].subject, "older");
    }

    #[tokio::test]
    async fn test_account_stats_counts_buyers_separately() {
        let store = MemoryStore::new();
        let buyer = account(&store, "buyer").await;
        account(&store, "browser").await;

        store
            .create_order(NewOrder {
                account_id: buyer.id,
                items: Vec::new(),
                total_amount: Decimal::ZERO,
                shipping_address: address(),
            })
            .await
            .unwrap();

        let stats = store.account_stats().await.unwrap();
        assert_eq!(stats.account_count, 2);
        assert_eq!(stats.active_count, 1);
    }
}
