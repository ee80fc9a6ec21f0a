//! # Transactions
//!
//! `BEGIN` / `COMMIT` / `ROLLBACK` around a unit of work, joining an outer
//! transaction when one is already running.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  db.tx(unit)                                                            │
//! │       │                                                                 │
//! │       ├── flag set? ──yes──► run unit inline (join outer transaction)   │
//! │       │                                                                 │
//! │       no                                                                │
//! │       ▼                                                                 │
//! │  set flag, BEGIN TRANSACTION                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  unit().await ──Ok──► COMMIT ──► clear flag ──► Ok(value)               │
//! │       │                                                                 │
//! │       Err                                                               │
//! │       ▼                                                                 │
//! │  ROLLBACK (best effort) ──► clear flag ──► Err(original error)          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Limitation
//! The flag is one boolean per connection. Two *concurrent* top-level
//! `tx()` calls on the same `Database` do not queue: the second one sees the
//! flag and joins the first one's transaction. Compose work that must be
//! isolated inside a single `tx()`.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{trace, warn};

use crate::connection::Database;
use crate::error::DbResult;

/// Clears the in-transaction flag however the unit of work ends.
struct FlagGuard(Arc<AtomicBool>);

impl Drop for FlagGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Database {
    /// Runs `unit` inside a transaction.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let db2 = db.clone();
    /// let sale = db
    ///     .tx(move || async move {
    ///         let sale = db2.sales().create(&new_sale).await?; // joins
    ///         db2.sale_items().create(&line).await?;          // joins
    ///         Ok(sale)
    ///     })
    ///     .await?;
    /// ```
    pub async fn tx<F, Fut, T>(&self, unit: F) -> DbResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = DbResult<T>>,
    {
        let flag = self.transaction_flag();
        if flag
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            trace!("joining active transaction");
            return unit().await;
        }
        let _guard = FlagGuard(Arc::clone(flag));

        self.run("BEGIN TRANSACTION", &[]).await?;
        trace!("transaction started");

        match unit().await {
            Ok(value) => match self.run("COMMIT", &[]).await {
                Ok(_) => {
                    trace!("transaction committed");
                    Ok(value)
                }
                Err(err) => {
                    self.rollback().await;
                    Err(err)
                }
            },
            Err(err) => {
                self.rollback().await;
                Err(err)
            }
        }
    }

    async fn rollback(&self) {
        match self.run("ROLLBACK", &[]).await {
            Ok(_) => trace!("transaction rolled back"),
            Err(err) => warn!(error = %err, "ROLLBACK failed; returning the original error"),
        }
    }
}

/// Combinator form of [`Database::tx`].
pub async fn with_transaction<F, Fut, T>(db: &Database, unit: F) -> DbResult<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = DbResult<T>>,
{
    db.tx(unit).await
}
