//! Account repository over `PostgreSQL`.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use copperleaf_core::{AccountId, Email};

use super::{AccountStore, PgStore, RepositoryError};
use crate::models::{Account, AccountStats, NewAccount, ShippingAddress};

#[derive(FromRow)]
struct AccountRow {
    id: i32,
    subject: String,
    email: String,
    name: String,
    phone: Option<String>,
    street: Option<String>,
    city: Option<String>,
    state: Option<String>,
    zip: Option<String>,
    country: Option<String>,
    order_count: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for Account {
    type Error = RepositoryError;

    fn try_from(r: AccountRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&r.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        // The address columns are written together or not at all.
        let address = match (r.street, r.city, r.state, r.zip, r.country) {
            (Some(street), Some(city), Some(state), Some(zip), Some(country)) => {
                Some(ShippingAddress {
                    street,
                    city,
                    state,
                    zip,
                    country,
                })
            }
            _ => None,
        };

        Ok(Self {
            id: AccountId::new(r.id),
            subject: r.subject,
            email,
            name: r.name,
            phone: r.phone,
            address,
            order_count: r.order_count,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

const ACCOUNT_COLUMNS: &str = "id, subject, email, name, phone, street, city, state, zip, \
                               country, order_count, created_at, updated_at";

impl AccountStore for PgStore {
    async fn find_account_by_subject(
        &self,
        subject: &str,
    ) -> Result<Option<Account>, RepositoryError> {
        let row: Option<AccountRow> = sqlx::query_as(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM storefront.account WHERE subject = $1"
        ))
        .bind(subject)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Account::try_from).transpose()
    }

    async fn create_account(&self, input: NewAccount) -> Result<Account, RepositoryError> {
        let address = input.address.as_ref();
        let row: AccountRow = sqlx::query_as(&format!(
            "INSERT INTO storefront.account \
                 (subject, email, name, phone, street, city, state, zip, country) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(&input.subject)
        .bind(input.email.as_str())
        .bind(&input.name)
        .bind(&input.phone)
        .bind(address.map(|a| a.street.as_str()))
        .bind(address.map(|a| a.city.as_str()))
        .bind(address.map(|a| a.state.as_str()))
        .bind(address.map(|a| a.zip.as_str()))
        .bind(address.map(|a| a.country.as_str()))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict("subject already exists".to_owned());
            }
            RepositoryError::Database(e)
        })?;

        row.try_into()
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, RepositoryError> {
        let rows: Vec<AccountRow> = sqlx::query_as(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM storefront.account ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Account::try_from).collect()
    }

    async fn account_stats(&self) -> Result<AccountStats, RepositoryError> {
        let row: (i64, i64) = sqlx::query_as(
            "SELECT \
                 COUNT(*), \
                 COUNT(*) FILTER (WHERE order_count > 0) \
             FROM storefront.account",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(AccountStats {
            account_count: row.0,
            active_count: row.1,
        })
    }
}
