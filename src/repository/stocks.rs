//! Stock copies repository

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgConnection, Pool, Postgres};
use uuid::Uuid;

use super::{fetch_page, map_constraint};
use crate::{
    error::{AppError, AppResult},
    models::{
        stock::{BookStock, StockStatus},
        PageRequest,
    },
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StockRepository: Send + Sync {
    async fn find_by_code(&self, code: &str) -> AppResult<BookStock>;
    async fn find_by_book_id(&self, book_id: Uuid) -> AppResult<Vec<BookStock>>;
    async fn find_available_by_book_id(&self, book_id: Uuid) -> AppResult<Vec<BookStock>>;
    async fn find_all(&self, request: &PageRequest) -> AppResult<(Vec<BookStock>, i64)>;
    async fn create(&self, code: &str, book_id: Uuid, status: StockStatus) -> AppResult<BookStock>;
    /// Move a copy to another book
    async fn update(&self, code: &str, book_id: Uuid) -> AppResult<BookStock>;
    /// Unconditional status write, outside any lending write set
    async fn update_status(&self, code: &str, status: StockStatus) -> AppResult<BookStock>;
    async fn delete(&self, code: &str) -> AppResult<()>;
}

#[derive(Clone)]
pub struct PgStockRepository {
    pool: Pool<Postgres>,
}

impl PgStockRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

const LIST_FROM: &str = "FROM book_stocks LEFT JOIN books ON books.id = book_stocks.book_id";

/// Set a copy's status, optionally only if it currently has `expected`.
///
/// Returns `None` when no row matched (missing copy, or status differs).
pub(crate) async fn set_stock_status_in(
    conn: &mut PgConnection,
    code: &str,
    expected: Option<StockStatus>,
    status: StockStatus,
) -> Result<Option<BookStock>, sqlx::Error> {
    match expected {
        Some(expected) => {
            sqlx::query_as::<_, BookStock>(
                r#"
                UPDATE book_stocks SET status = $2, updated_at = $3
                WHERE code = $1 AND status = $4
                RETURNING *
                "#,
            )
            .bind(code)
            .bind(status)
            .bind(Utc::now())
            .bind(expected)
            .fetch_optional(conn)
            .await
        }
        None => {
            sqlx::query_as::<_, BookStock>(
                "UPDATE book_stocks SET status = $2, updated_at = $3 WHERE code = $1 RETURNING *",
            )
            .bind(code)
            .bind(status)
            .bind(Utc::now())
            .fetch_optional(conn)
            .await
        }
    }
}

#[async_trait]
impl StockRepository for PgStockRepository {
    async fn find_by_code(&self, code: &str) -> AppResult<BookStock> {
        sqlx::query_as::<_, BookStock>("SELECT * FROM book_stocks WHERE code = $1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("book stock not found".to_string()))
    }

    async fn find_by_book_id(&self, book_id: Uuid) -> AppResult<Vec<BookStock>> {
        let stocks = sqlx::query_as::<_, BookStock>(
            "SELECT * FROM book_stocks WHERE book_id = $1 ORDER BY code",
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(stocks)
    }

    async fn find_available_by_book_id(&self, book_id: Uuid) -> AppResult<Vec<BookStock>> {
        let stocks = sqlx::query_as::<_, BookStock>(
            "SELECT * FROM book_stocks WHERE book_id = $1 AND status = $2 ORDER BY code",
        )
        .bind(book_id)
        .bind(StockStatus::Available)
        .fetch_all(&self.pool)
        .await?;

        Ok(stocks)
    }

    async fn find_all(&self, request: &PageRequest) -> AppResult<(Vec<BookStock>, i64)> {
        fetch_page(&self.pool, "book_stocks.*", LIST_FROM, "book_stocks.code", request).await
    }

    async fn create(&self, code: &str, book_id: Uuid, status: StockStatus) -> AppResult<BookStock> {
        let now = Utc::now();
        sqlx::query_as::<_, BookStock>(
            r#"
            INSERT INTO book_stocks (code, book_id, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            RETURNING *
            "#,
        )
        .bind(code)
        .bind(book_id)
        .bind(status)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_constraint(e, &format!("book stock {}", code)))
    }

    async fn update(&self, code: &str, book_id: Uuid) -> AppResult<BookStock> {
        sqlx::query_as::<_, BookStock>(
            "UPDATE book_stocks SET book_id = $2, updated_at = $3 WHERE code = $1 RETURNING *",
        )
        .bind(code)
        .bind(book_id)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_constraint(e, "book stock"))?
        .ok_or_else(|| AppError::NotFound("book stock not found".to_string()))
    }

    async fn update_status(&self, code: &str, status: StockStatus) -> AppResult<BookStock> {
        let mut conn = self.pool.acquire().await?;
        set_stock_status_in(&mut *conn, code, None, status)
            .await
            .map_err(|e| AppError::StockStatusUpdate(e.to_string()))?
            .ok_or_else(|| AppError::NotFound("book stock not found".to_string()))
    }

    async fn delete(&self, code: &str) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM book_stocks WHERE code = $1")
            .bind(code)
            .execute(&self.pool)
            .await
            .map_err(|e| map_constraint(e, "book stock"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("book stock not found".to_string()));
        }
        Ok(())
    }
}
