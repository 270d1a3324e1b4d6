//! Customers repository

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use super::{fetch_page, map_constraint};
use crate::{
    error::{AppError, AppResult},
    models::{
        customer::{CreateCustomer, Customer, UpdateCustomer},
        PageRequest,
    },
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CustomerRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Customer>;
    async fn find_by_code(&self, code: &str) -> AppResult<Customer>;
    async fn find_all(&self, request: &PageRequest) -> AppResult<(Vec<Customer>, i64)>;
    async fn create(&self, customer: &CreateCustomer) -> AppResult<Customer>;
    async fn update(&self, id: Uuid, customer: &UpdateCustomer) -> AppResult<Customer>;
    async fn delete(&self, id: Uuid) -> AppResult<()>;
}

#[derive(Clone)]
pub struct PgCustomerRepository {
    pool: Pool<Postgres>,
}

impl PgCustomerRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn not_found() -> AppError {
    AppError::NotFound("customer not found".to_string())
}

#[async_trait]
impl CustomerRepository for PgCustomerRepository {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Customer> {
        sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(not_found)
    }

    async fn find_by_code(&self, code: &str) -> AppResult<Customer> {
        sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE code = $1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(not_found)
    }

    async fn find_all(&self, request: &PageRequest) -> AppResult<(Vec<Customer>, i64)> {
        fetch_page(&self.pool, "customers.*", "FROM customers", "customers.name, customers.id", request)
            .await
    }

    async fn create(&self, customer: &CreateCustomer) -> AppResult<Customer> {
        let now = Utc::now();
        sqlx::query_as::<_, Customer>(
            r#"
            INSERT INTO customers (id, code, name, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&customer.code)
        .bind(&customer.name)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_constraint(e, &format!("customer {}", customer.code)))
    }

    async fn update(&self, id: Uuid, customer: &UpdateCustomer) -> AppResult<Customer> {
        sqlx::query_as::<_, Customer>(
            r#"
            UPDATE customers SET
                code = COALESCE($2, code),
                name = COALESCE($3, name),
                updated_at = $4
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&customer.code)
        .bind(&customer.name)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_constraint(e, "customer code"))?
        .ok_or_else(not_found)
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM customers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_constraint(e, "customer"))?;

        if result.rows_affected() == 0 {
            return Err(not_found());
        }
        Ok(())
    }
}
