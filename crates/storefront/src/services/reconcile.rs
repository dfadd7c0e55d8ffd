//! Stale pending-order reconciliation.
//!
//! A buyer who abandons the hosted payment page leaves a pending/pending
//! order behind forever; no webhook will ever arrive for it. A background
//! sweep cancels orders that stayed unpaid past a TTL so the admin order
//! list reflects reality. Cancellation releases nothing: stock is only
//! decremented on confirmed payment.

use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info};

use crate::db::{OrderStore, RepositoryError};

/// Cancel pending orders older than `ttl`.
///
/// Returns how many orders were cancelled.
///
/// # Errors
///
/// Returns [`RepositoryError`] when the store update fails.
pub async fn sweep_stale_orders<S>(store: &S, ttl: Duration) -> Result<u64, RepositoryError>
where
    S: OrderStore,
{
    let cutoff = Utc::now()
        - chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::hours(1));
    let cancelled = store.cancel_stale_pending(cutoff).await?;

    if cancelled > 0 {
        info!(cancelled, "Cancelled stale pending orders");
    } else {
        debug!("No stale pending orders");
    }

    Ok(cancelled)
}

/// Run the sweep forever at a fixed interval.
///
/// Spawned as a background task at startup; sweep failures are logged and
/// the loop keeps going.
pub async fn run<S>(store: S, interval: Duration, ttl: Duration)
where
    S: OrderStore,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        if let Err(e) = sweep_stale_orders(&store, ttl).await {
            error!(error = %e, "Stale-order sweep failed");
        }
    }
}
