//! Borrow/return transaction model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::{book::Book, charge::Charge, customer::Customer, stock::BookStock, text_enum_sqlx};
use crate::filter::{Column, ColumnKind, FilterableEntity};

/// Lifecycle state of a transaction.
///
/// `Borrowed -> Returned` and `Borrowed -> Overdue -> Returned`; nothing
/// leaves `Returned`. `Overdue` is only ever set by the overdue sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum TransactionStatus {
    Borrowed,
    Returned,
    Overdue,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Borrowed => "Borrowed",
            TransactionStatus::Returned => "Returned",
            TransactionStatus::Overdue => "Overdue",
        }
    }

    /// Whether the transaction still holds its stock copy
    pub fn is_active(&self) -> bool {
        matches!(self, TransactionStatus::Borrowed | TransactionStatus::Overdue)
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Borrowed" => Ok(TransactionStatus::Borrowed),
            "Returned" => Ok(TransactionStatus::Returned),
            "Overdue" => Ok(TransactionStatus::Overdue),
            _ => Err(format!("Invalid transaction status: {}", s)),
        }
    }
}

text_enum_sqlx!(TransactionStatus);

/// Transaction model from database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BookTransaction {
    pub id: Uuid,
    /// Book of the lent copy, kept in step with `stock_code`
    pub book_id: Uuid,
    pub stock_code: String,
    pub customer_id: Uuid,
    pub due_date: DateTime<Utc>,
    pub status: TransactionStatus,
    pub borrowed_at: DateTime<Utc>,
    pub return_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BookTransaction {
    /// Whether the due date has passed at `now` while the copy is still out
    pub fn is_late_at(&self, now: DateTime<Utc>) -> bool {
        self.status.is_active() && self.due_date < now
    }
}

impl FilterableEntity for BookTransaction {
    const TABLE: &'static str = "book_transactions";
    const COLUMNS: &'static [Column] = &[
        Column::new("id", ColumnKind::Uuid),
        Column::new("book_id", ColumnKind::Uuid),
        Column::new("stock_code", ColumnKind::Text),
        Column::new("customer_id", ColumnKind::Uuid),
        Column::new("status", ColumnKind::Text),
        Column::new("due_date", ColumnKind::Timestamp),
        Column::new("borrowed_at", ColumnKind::Timestamp),
        Column::new("return_at", ColumnKind::Timestamp),
        Column::new("created_at", ColumnKind::Timestamp),
    ];
    const SEARCH_COLUMNS: &'static [&'static str] = &[
        "book_transactions.status",
        "books.title",
        "book_stocks.code",
        "customers.name",
    ];
}

/// Transaction with its related records
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TransactionDetails {
    #[serde(flatten)]
    pub transaction: BookTransaction,
    pub book: Option<Book>,
    pub stock: Option<BookStock>,
    pub customer: Option<Customer>,
    pub charges: Vec<Charge>,
}

/// Create transaction (borrow) request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateTransaction {
    #[validate(length(min = 3, max = 50, message = "Stock code must be 3-50 characters"))]
    pub stock_code: String,
    pub customer_id: Uuid,
    /// Initial status, must be Borrowed when given
    pub status: Option<TransactionStatus>,
}

/// Partial update request
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateTransaction {
    #[validate(length(min = 3, max = 50, message = "Stock code must be 3-50 characters"))]
    pub stock_code: Option<String>,
    pub customer_id: Option<Uuid>,
    pub due_date: Option<DateTime<Utc>>,
    pub status: Option<TransactionStatus>,
    pub return_at: Option<DateTime<Utc>>,
}

/// Status change request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateTransactionStatus {
    pub status: TransactionStatus,
}

/// Return request; the return date defaults to now
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ReturnBook {
    pub return_at: Option<DateTime<Utc>>,
}
