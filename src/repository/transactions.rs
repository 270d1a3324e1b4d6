//! Book transactions repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Pool, Postgres};
use uuid::Uuid;

use super::{fetch_page, map_constraint};
use crate::{
    error::{AppError, AppResult},
    models::{
        transaction::{BookTransaction, TransactionStatus},
        PageRequest,
    },
};

/// Transaction rows.
///
/// The single-row writes (`create` through `delete`) touch only this table and
/// leave stock copies alone. Lifecycle changes go through
/// [`LendingStore`](super::LendingStore) so the copy moves in the same commit.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TransactionRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> AppResult<BookTransaction>;
    async fn find_by_customer_id(&self, customer_id: Uuid) -> AppResult<Vec<BookTransaction>>;
    async fn find_by_book_id(&self, book_id: Uuid) -> AppResult<Vec<BookTransaction>>;
    async fn find_by_stock_code(&self, code: &str) -> AppResult<Vec<BookTransaction>>;
    /// The Borrowed/Overdue transaction holding this copy, if any
    async fn find_active_by_stock_code(&self, code: &str) -> AppResult<Option<BookTransaction>>;
    async fn find_all(&self, request: &PageRequest) -> AppResult<(Vec<BookTransaction>, i64)>;
    /// Active transactions whose due date is before `now`
    async fn find_overdue(&self, now: DateTime<Utc>) -> AppResult<Vec<BookTransaction>>;
    async fn create(&self, transaction: &BookTransaction) -> AppResult<BookTransaction>;
    async fn update(&self, transaction: &BookTransaction) -> AppResult<BookTransaction>;
    async fn update_status(&self, id: Uuid, status: TransactionStatus) -> AppResult<BookTransaction>;
    async fn return_book(&self, id: Uuid, return_at: DateTime<Utc>) -> AppResult<BookTransaction>;
    /// Borrowed -> Overdue; false when the row was no longer Borrowed
    async fn mark_overdue(&self, id: Uuid) -> AppResult<bool>;
    async fn delete(&self, id: Uuid) -> AppResult<()>;
}

#[derive(Clone)]
pub struct PgTransactionRepository {
    pool: Pool<Postgres>,
}

impl PgTransactionRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

const LIST_FROM: &str = r#"FROM book_transactions
    LEFT JOIN books ON books.id = book_transactions.book_id
    LEFT JOIN book_stocks ON book_stocks.code = book_transactions.stock_code
    LEFT JOIN customers ON customers.id = book_transactions.customer_id"#;

fn not_found() -> AppError {
    AppError::NotFound("book transaction not found".to_string())
}

pub(crate) async fn insert_transaction_in(
    conn: &mut PgConnection,
    transaction: &BookTransaction,
) -> Result<BookTransaction, sqlx::Error> {
    sqlx::query_as::<_, BookTransaction>(
        r#"
        INSERT INTO book_transactions
            (id, book_id, stock_code, customer_id, due_date, status, borrowed_at, return_at, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING *
        "#,
    )
    .bind(transaction.id)
    .bind(transaction.book_id)
    .bind(&transaction.stock_code)
    .bind(transaction.customer_id)
    .bind(transaction.due_date)
    .bind(transaction.status)
    .bind(transaction.borrowed_at)
    .bind(transaction.return_at)
    .bind(transaction.created_at)
    .bind(transaction.updated_at)
    .fetch_one(conn)
    .await
}

/// Overwrite the mutable columns; with `expected`, only if the status still matches
pub(crate) async fn update_transaction_in(
    conn: &mut PgConnection,
    transaction: &BookTransaction,
    expected: Option<TransactionStatus>,
) -> Result<Option<BookTransaction>, sqlx::Error> {
    sqlx::query_as::<_, BookTransaction>(
        r#"
        UPDATE book_transactions SET
            book_id = $2, stock_code = $3, customer_id = $4, due_date = $5,
            status = $6, return_at = $7, updated_at = $8
        WHERE id = $1 AND ($9::text IS NULL OR status = $9)
        RETURNING *
        "#,
    )
    .bind(transaction.id)
    .bind(transaction.book_id)
    .bind(&transaction.stock_code)
    .bind(transaction.customer_id)
    .bind(transaction.due_date)
    .bind(transaction.status)
    .bind(transaction.return_at)
    .bind(Utc::now())
    .bind(expected)
    .fetch_optional(conn)
    .await
}

pub(crate) async fn set_transaction_status_in(
    conn: &mut PgConnection,
    id: Uuid,
    expected: Option<TransactionStatus>,
    status: TransactionStatus,
) -> Result<Option<BookTransaction>, sqlx::Error> {
    sqlx::query_as::<_, BookTransaction>(
        r#"
        UPDATE book_transactions SET status = $2, updated_at = $3
        WHERE id = $1 AND ($4::text IS NULL OR status = $4)
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(status)
    .bind(Utc::now())
    .bind(expected)
    .fetch_optional(conn)
    .await
}

/// Mark an active transaction Returned; `None` if it is missing or already returned
pub(crate) async fn return_transaction_in(
    conn: &mut PgConnection,
    id: Uuid,
    return_at: DateTime<Utc>,
) -> Result<Option<BookTransaction>, sqlx::Error> {
    sqlx::query_as::<_, BookTransaction>(
        r#"
        UPDATE book_transactions SET status = $2, return_at = $3, updated_at = $4
        WHERE id = $1 AND status IN ($5, $6)
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(TransactionStatus::Returned)
    .bind(return_at)
    .bind(Utc::now())
    .bind(TransactionStatus::Borrowed)
    .bind(TransactionStatus::Overdue)
    .fetch_optional(conn)
    .await
}

pub(crate) async fn delete_transaction_in(
    conn: &mut PgConnection,
    id: Uuid,
    expected: Option<TransactionStatus>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "DELETE FROM book_transactions WHERE id = $1 AND ($2::text IS NULL OR status = $2)",
    )
    .bind(id)
    .bind(expected)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

#[async_trait]
impl TransactionRepository for PgTransactionRepository {
    async fn find_by_id(&self, id: Uuid) -> AppResult<BookTransaction> {
        sqlx::query_as::<_, BookTransaction>("SELECT * FROM book_transactions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(not_found)
    }

    async fn find_by_customer_id(&self, customer_id: Uuid) -> AppResult<Vec<BookTransaction>> {
        let rows = sqlx::query_as::<_, BookTransaction>(
            "SELECT * FROM book_transactions WHERE customer_id = $1 ORDER BY borrowed_at DESC",
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn find_by_book_id(&self, book_id: Uuid) -> AppResult<Vec<BookTransaction>> {
        let rows = sqlx::query_as::<_, BookTransaction>(
            "SELECT * FROM book_transactions WHERE book_id = $1 ORDER BY borrowed_at DESC",
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn find_by_stock_code(&self, code: &str) -> AppResult<Vec<BookTransaction>> {
        let rows = sqlx::query_as::<_, BookTransaction>(
            "SELECT * FROM book_transactions WHERE stock_code = $1 ORDER BY borrowed_at DESC",
        )
        .bind(code)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn find_active_by_stock_code(&self, code: &str) -> AppResult<Option<BookTransaction>> {
        let row = sqlx::query_as::<_, BookTransaction>(
            "SELECT * FROM book_transactions WHERE stock_code = $1 AND status IN ($2, $3)",
        )
        .bind(code)
        .bind(TransactionStatus::Borrowed)
        .bind(TransactionStatus::Overdue)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn find_all(&self, request: &PageRequest) -> AppResult<(Vec<BookTransaction>, i64)> {
        fetch_page(
            &self.pool,
            "book_transactions.*",
            LIST_FROM,
            "book_transactions.borrowed_at DESC, book_transactions.id",
            request,
        )
        .await
    }

    async fn find_overdue(&self, now: DateTime<Utc>) -> AppResult<Vec<BookTransaction>> {
        let rows = sqlx::query_as::<_, BookTransaction>(
            r#"
            SELECT * FROM book_transactions
            WHERE status IN ($1, $2) AND due_date < $3
            ORDER BY due_date
            "#,
        )
        .bind(TransactionStatus::Borrowed)
        .bind(TransactionStatus::Overdue)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn create(&self, transaction: &BookTransaction) -> AppResult<BookTransaction> {
        let mut conn = self.pool.acquire().await?;
        insert_transaction_in(&mut *conn, transaction)
            .await
            .map_err(|e| map_constraint(e, "active transaction for this book stock"))
    }

    async fn update(&self, transaction: &BookTransaction) -> AppResult<BookTransaction> {
        let mut conn = self.pool.acquire().await?;
        update_transaction_in(&mut *conn, transaction, None)
            .await
            .map_err(|e| map_constraint(e, "active transaction for this book stock"))?
            .ok_or_else(not_found)
    }

    async fn update_status(&self, id: Uuid, status: TransactionStatus) -> AppResult<BookTransaction> {
        let mut conn = self.pool.acquire().await?;
        set_transaction_status_in(&mut *conn, id, None, status)
            .await?
            .ok_or_else(not_found)
    }

    async fn return_book(&self, id: Uuid, return_at: DateTime<Utc>) -> AppResult<BookTransaction> {
        let mut conn = self.pool.acquire().await?;
        match return_transaction_in(&mut *conn, id, return_at).await? {
            Some(returned) => Ok(returned),
            None => {
                // Distinguish a missing row from a double return
                self.find_by_id(id).await?;
                Err(AppError::PreconditionFailed("book is already returned".to_string()))
            }
        }
    }

    async fn mark_overdue(&self, id: Uuid) -> AppResult<bool> {
        let mut conn = self.pool.acquire().await?;
        let updated = set_transaction_status_in(
            &mut *conn,
            id,
            Some(TransactionStatus::Borrowed),
            TransactionStatus::Overdue,
        )
        .await?;

        Ok(updated.is_some())
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let mut conn = self.pool.acquire().await?;
        if !delete_transaction_in(&mut *conn, id, None).await? {
            return Err(not_found());
        }
        Ok(())
    }
}
