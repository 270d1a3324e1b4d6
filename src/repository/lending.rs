//! Atomic write sets for the borrow/return lifecycle.
//!
//! A lending operation touches a transaction row and a stock copy row. The
//! engine describes the whole change as a list of [`LendingWrite`]s and hands
//! it to [`LendingStore::commit`], which applies every write or none.
//! Conditional writes carry the status they expect to find; a mismatch aborts
//! the commit with `Conflict`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Pool, Postgres};
use uuid::Uuid;

use super::{
    map_constraint,
    stocks::set_stock_status_in,
    transactions::{
        delete_transaction_in, insert_transaction_in, return_transaction_in,
        set_transaction_status_in, update_transaction_in,
    },
};
use crate::{
    error::{AppError, AppResult},
    models::{
        stock::StockStatus,
        transaction::{BookTransaction, TransactionStatus},
    },
};

/// One row-level change of a lending write set
#[derive(Debug, Clone, PartialEq)]
pub enum LendingWrite {
    InsertTransaction(BookTransaction),
    /// Overwrite the transaction if its status is still `expected`
    UpdateTransaction {
        expected: TransactionStatus,
        transaction: BookTransaction,
    },
    SetTransactionStatus {
        id: Uuid,
        expected: TransactionStatus,
        status: TransactionStatus,
    },
    /// Borrowed/Overdue -> Returned
    ReturnTransaction { id: Uuid, return_at: DateTime<Utc> },
    DeleteTransaction { id: Uuid, expected: TransactionStatus },
    /// Compare-and-swap when `expected` is set, plain write otherwise
    SetStockStatus {
        code: String,
        expected: Option<StockStatus>,
        status: StockStatus,
    },
}

impl LendingWrite {
    /// Available -> Borrowed, failing if someone else took the copy
    pub fn acquire_stock(code: impl Into<String>) -> Self {
        LendingWrite::SetStockStatus {
            code: code.into(),
            expected: Some(StockStatus::Available),
            status: StockStatus::Borrowed,
        }
    }

    /// Put a copy back on the shelf
    pub fn release_stock(code: impl Into<String>) -> Self {
        LendingWrite::SetStockStatus {
            code: code.into(),
            expected: None,
            status: StockStatus::Available,
        }
    }

    /// Mark a copy lent regardless of its current status
    pub fn force_stock_borrowed(code: impl Into<String>) -> Self {
        LendingWrite::SetStockStatus {
            code: code.into(),
            expected: None,
            status: StockStatus::Borrowed,
        }
    }
}

pub(crate) fn stock_unavailable(code: &str) -> AppError {
    AppError::Conflict(format!("book stock {} is not available", code))
}

pub(crate) fn transaction_changed(id: Uuid) -> AppError {
    AppError::Conflict(format!("book transaction {} was modified concurrently", id))
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LendingStore: Send + Sync {
    /// Apply all writes in order, atomically
    async fn commit(&self, writes: Vec<LendingWrite>) -> AppResult<()>;
}

#[derive(Clone)]
pub struct PgLendingStore {
    pool: Pool<Postgres>,
}

impl PgLendingStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

async fn apply(conn: &mut PgConnection, write: &LendingWrite) -> AppResult<()> {
    match write {
        LendingWrite::InsertTransaction(transaction) => {
            insert_transaction_in(conn, transaction)
                .await
                .map_err(|e| match map_constraint(e, "active transaction for this book stock") {
                    AppError::Conflict(_) => stock_unavailable(&transaction.stock_code),
                    other => other,
                })?;
        }
        LendingWrite::UpdateTransaction { expected, transaction } => {
            update_transaction_in(conn, transaction, Some(*expected))
                .await
                .map_err(|e| map_constraint(e, "active transaction for this book stock"))?
                .ok_or_else(|| transaction_changed(transaction.id))?;
        }
        LendingWrite::SetTransactionStatus { id, expected, status } => {
            set_transaction_status_in(conn, *id, Some(*expected), *status)
                .await?
                .ok_or_else(|| transaction_changed(*id))?;
        }
        LendingWrite::ReturnTransaction { id, return_at } => {
            return_transaction_in(conn, *id, *return_at)
                .await?
                .ok_or_else(|| AppError::Conflict("book is already returned".to_string()))?;
        }
        LendingWrite::DeleteTransaction { id, expected } => {
            if !delete_transaction_in(conn, *id, Some(*expected)).await? {
                return Err(transaction_changed(*id));
            }
        }
        LendingWrite::SetStockStatus { code, expected, status } => {
            let updated = set_stock_status_in(conn, code, *expected, *status)
                .await
                .map_err(|e| AppError::StockStatusUpdate(e.to_string()))?;
            if updated.is_none() {
                return Err(match expected {
                    Some(_) => stock_unavailable(code),
                    None => AppError::NotFound("book stock not found".to_string()),
                });
            }
        }
    }
    Ok(())
}

#[async_trait]
impl LendingStore for PgLendingStore {
    async fn commit(&self, writes: Vec<LendingWrite>) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        for write in &writes {
            // Dropping `tx` on error rolls everything back
            apply(&mut *tx, write).await?;
        }

        tx.commit().await?;
        tracing::debug!("Committed {} lending writes", writes.len());
        Ok(())
    }
}
