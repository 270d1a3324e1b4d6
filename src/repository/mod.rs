//! Repository layer for database operations
//!
//! Each facade is a trait so services can be exercised against mocks or an
//! in-memory store; the `Pg*` types are the sqlx implementations. Writes that
//! span transactions and stock copies go through [`LendingStore`].

pub mod books;
pub mod charges;
pub mod customers;
pub mod lending;
pub mod stocks;
pub mod transactions;
pub mod users;

use std::sync::Arc;

use sqlx::{postgres::PgRow, FromRow, Pool, Postgres, QueryBuilder};

use crate::{
    error::{AppError, AppResult},
    models::PageRequest,
};

pub use books::{BookRepository, PgBookRepository};
pub use charges::{ChargeRepository, PgChargeRepository};
pub use customers::{CustomerRepository, PgCustomerRepository};
pub use lending::{LendingStore, LendingWrite, PgLendingStore};
pub use stocks::{PgStockRepository, StockRepository};
pub use transactions::{PgTransactionRepository, TransactionRepository};
pub use users::{PgUserRepository, UserRepository};

/// Main repository struct holding one handle per facade
#[derive(Clone)]
pub struct Repository {
    pub pool: Option<Pool<Postgres>>,
    pub books: Arc<dyn BookRepository>,
    pub stocks: Arc<dyn StockRepository>,
    pub transactions: Arc<dyn TransactionRepository>,
    pub customers: Arc<dyn CustomerRepository>,
    pub charges: Arc<dyn ChargeRepository>,
    pub users: Arc<dyn UserRepository>,
    pub lending: Arc<dyn LendingStore>,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            books: Arc::new(PgBookRepository::new(pool.clone())),
            stocks: Arc::new(PgStockRepository::new(pool.clone())),
            transactions: Arc::new(PgTransactionRepository::new(pool.clone())),
            customers: Arc::new(PgCustomerRepository::new(pool.clone())),
            charges: Arc::new(PgChargeRepository::new(pool.clone())),
            users: Arc::new(PgUserRepository::new(pool.clone())),
            lending: Arc::new(PgLendingStore::new(pool.clone())),
            pool: Some(pool),
        }
    }

    /// Check database connectivity (always Ok without a pool)
    pub async fn ping(&self) -> AppResult<()> {
        if let Some(pool) = &self.pool {
            sqlx::query("SELECT 1").execute(pool).await?;
        }
        Ok(())
    }
}

/// Turn a `NotFound` into `None`, keeping every other error
pub fn optional<T>(result: AppResult<T>) -> AppResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(AppError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Map constraint violations to domain errors
pub(crate) fn map_constraint(e: sqlx::Error, what: &str) -> AppError {
    let code = e
        .as_database_error()
        .and_then(|db| db.code())
        .map(|c| c.into_owned());

    match code.as_deref() {
        // unique_violation
        Some("23505") => AppError::Conflict(format!("{} already exists", what)),
        // foreign_key_violation
        Some("23503") => AppError::PreconditionFailed(format!("{} is still referenced or references a missing record", what)),
        _ => AppError::Database(e),
    }
}

/// Map data exceptions raised by client filter values to `BadRequest`
pub(crate) fn map_filter_error(e: sqlx::Error) -> AppError {
    let code = e
        .as_database_error()
        .and_then(|db| db.code())
        .map(|c| c.into_owned());

    match code.as_deref() {
        // invalid_text_representation, invalid_datetime_format,
        // datetime_field_overflow, numeric_value_out_of_range
        Some("22P02" | "22007" | "22008" | "22003") => {
            AppError::BadRequest("Invalid filter value".to_string())
        }
        _ => AppError::Database(e),
    }
}

/// Run a filtered, paginated listing: `SELECT <select> <from> WHERE ... ORDER BY ... LIMIT/OFFSET`
pub(crate) async fn fetch_page<T>(
    pool: &Pool<Postgres>,
    select: &str,
    from: &str,
    order_by: &str,
    request: &PageRequest,
) -> AppResult<(Vec<T>, i64)>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    let mut count = QueryBuilder::<Postgres>::new(format!("SELECT COUNT(*) {}", from));
    request.filter.push_where(&mut count);
    let total: i64 = count
        .build_query_scalar()
        .fetch_one(pool)
        .await
        .map_err(map_filter_error)?;

    let mut query = QueryBuilder::<Postgres>::new(format!("SELECT {} {}", select, from));
    request.filter.push_where(&mut query);
    query.push(format!(" ORDER BY {} LIMIT ", order_by));
    query.push_bind(request.per_page);
    query.push(" OFFSET ");
    query.push_bind(request.offset());

    let rows = query
        .build_query_as::<T>()
        .fetch_all(pool)
        .await
        .map_err(map_filter_error)?;
    Ok((rows, total))
}
