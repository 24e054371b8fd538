/*!
 * Transaction Helper Utilities
 *
 * Scoped transactions: the connection is acquired for the closure's duration
 * and released on every exit path, committing on `Ok` and rolling back on `Err`.
 */

use sea_orm::{DatabaseConnection, DatabaseTransaction, DbErr, TransactionError, TransactionTrait};
use std::future::Future;
use std::pin::Pin;

/// Type alias for boxed future used in transactions
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Execute a function within a database transaction
///
/// Unlike `TransactionTrait::transaction`, the caller's error type comes back
/// unchanged; connection-level failures are converted through `From<DbErr>`.
///
/// # Example
///
/// ```rust,ignore
/// use crate::db::transaction::with_transaction;
///
/// let inserted = with_transaction(&db, |txn| {
///     Box::pin(async move {
///         inventory_forecast::Entity::delete_many().exec(txn).await?;
///         inventory_forecast::Entity::insert_many(rows).exec(txn).await?;
///         Ok::<_, ServiceError>(rows_len)
///     })
/// }).await?;
/// ```
pub async fn with_transaction<F, T, E>(db: &DatabaseConnection, f: F) -> Result<T, E>
where
    F: for<'a> FnOnce(&'a DatabaseTransaction) -> BoxFuture<'a, Result<T, E>> + Send,
    T: Send,
    E: std::error::Error + From<DbErr> + Send,
{
    db.transaction::<_, T, E>(f).await.map_err(|e| match e {
        TransactionError::Connection(db_err) => E::from(db_err),
        TransactionError::Transaction(err) => err,
    })
}
