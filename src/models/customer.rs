//! Customer (borrower) model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::transaction::BookTransaction;
use crate::filter::{Column, ColumnKind, FilterableEntity};

/// Customer model from database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Customer {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FilterableEntity for Customer {
    const TABLE: &'static str = "customers";
    const COLUMNS: &'static [Column] = &[
        Column::new("id", ColumnKind::Uuid),
        Column::new("code", ColumnKind::Text),
        Column::new("name", ColumnKind::Text),
        Column::new("created_at", ColumnKind::Timestamp),
        Column::new("updated_at", ColumnKind::Timestamp),
    ];
    const SEARCH_COLUMNS: &'static [&'static str] = &["customers.code", "customers.name"];
}

/// Customer together with its borrowing history
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CustomerWithTransactions {
    #[serde(flatten)]
    pub customer: Customer,
    pub transactions: Vec<BookTransaction>,
}

/// Create customer request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateCustomer {
    #[validate(length(min = 3, max = 50, message = "Code must be 3-50 characters"))]
    pub code: String,
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,
}

/// Update customer request
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateCustomer {
    #[validate(length(min = 3, max = 50, message = "Code must be 3-50 characters"))]
    pub code: Option<String>,
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: Option<String>,
}
