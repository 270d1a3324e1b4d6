//! Late-fee charges repository

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use super::{fetch_page, map_constraint};
use crate::{
    error::{AppError, AppResult},
    models::{charge::Charge, PageRequest},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChargeRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Charge>;
    async fn find_by_transaction_id(&self, transaction_id: Uuid) -> AppResult<Vec<Charge>>;
    async fn find_by_user_id(&self, user_id: Uuid) -> AppResult<Vec<Charge>>;
    async fn find_all(&self, request: &PageRequest) -> AppResult<(Vec<Charge>, i64)>;
    async fn create(&self, charge: &Charge) -> AppResult<Charge>;
    async fn update(&self, charge: &Charge) -> AppResult<Charge>;
    async fn delete(&self, id: Uuid) -> AppResult<()>;
}

#[derive(Clone)]
pub struct PgChargeRepository {
    pool: Pool<Postgres>,
}

impl PgChargeRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

const LIST_FROM: &str = r#"FROM charges
    LEFT JOIN users ON users.id = charges.user_id
    LEFT JOIN book_transactions ON book_transactions.id = charges.transaction_id"#;

fn not_found() -> AppError {
    AppError::NotFound("charge not found".to_string())
}

#[async_trait]
impl ChargeRepository for PgChargeRepository {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Charge> {
        sqlx::query_as::<_, Charge>("SELECT * FROM charges WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(not_found)
    }

    async fn find_by_transaction_id(&self, transaction_id: Uuid) -> AppResult<Vec<Charge>> {
        let rows = sqlx::query_as::<_, Charge>(
            "SELECT * FROM charges WHERE transaction_id = $1 ORDER BY created_at",
        )
        .bind(transaction_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn find_by_user_id(&self, user_id: Uuid) -> AppResult<Vec<Charge>> {
        let rows = sqlx::query_as::<_, Charge>(
            "SELECT * FROM charges WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn find_all(&self, request: &PageRequest) -> AppResult<(Vec<Charge>, i64)> {
        fetch_page(
            &self.pool,
            "charges.*",
            LIST_FROM,
            "charges.created_at DESC, charges.id",
            request,
        )
        .await
    }

    async fn create(&self, charge: &Charge) -> AppResult<Charge> {
        sqlx::query_as::<_, Charge>(
            r#"
            INSERT INTO charges
                (id, transaction_id, user_id, days_late, daily_late_fee, total, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(charge.id)
        .bind(charge.transaction_id)
        .bind(charge.user_id)
        .bind(charge.days_late)
        .bind(charge.daily_late_fee)
        .bind(charge.total)
        .bind(charge.created_at)
        .bind(charge.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_constraint(e, "charge"))
    }

    async fn update(&self, charge: &Charge) -> AppResult<Charge> {
        sqlx::query_as::<_, Charge>(
            r#"
            UPDATE charges SET days_late = $2, daily_late_fee = $3, total = $4, updated_at = $5
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(charge.id)
        .bind(charge.days_late)
        .bind(charge.daily_late_fee)
        .bind(charge.total)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(not_found)
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM charges WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(not_found());
        }
        Ok(())
    }
}
