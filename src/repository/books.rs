//! Books repository

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use super::{fetch_page, map_constraint};
use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, CreateBook, UpdateBook},
        PageRequest,
    },
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Book>;
    async fn find_all(&self, request: &PageRequest) -> AppResult<(Vec<Book>, i64)>;
    async fn create(&self, book: &CreateBook) -> AppResult<Book>;
    async fn update(&self, id: Uuid, book: &UpdateBook) -> AppResult<Book>;
    async fn delete(&self, id: Uuid) -> AppResult<()>;
}

#[derive(Clone)]
pub struct PgBookRepository {
    pool: Pool<Postgres>,
}

impl PgBookRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookRepository for PgBookRepository {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("book not found".to_string()))
    }

    async fn find_all(&self, request: &PageRequest) -> AppResult<(Vec<Book>, i64)> {
        fetch_page(&self.pool, "books.*", "FROM books", "books.title, books.id", request).await
    }

    async fn create(&self, book: &CreateBook) -> AppResult<Book> {
        let now = Utc::now();
        let created = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (id, title, description, cover_url, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&book.title)
        .bind(&book.description)
        .bind(&book.cover_url)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn update(&self, id: Uuid, book: &UpdateBook) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(
            r#"
            UPDATE books SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                cover_url = COALESCE($4, cover_url),
                updated_at = $5
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&book.title)
        .bind(&book.description)
        .bind(&book.cover_url)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("book not found".to_string()))
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_constraint(e, "book"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("book not found".to_string()));
        }
        Ok(())
    }
}
