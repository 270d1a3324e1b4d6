//! Late-fee charge model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::filter::{Column, ColumnKind, FilterableEntity};

/// Charge model from database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Charge {
    pub id: Uuid,
    pub transaction_id: Uuid,
    /// Staff user who recorded the charge
    pub user_id: Uuid,
    pub days_late: i32,
    pub daily_late_fee: Decimal,
    /// Always `days_late * daily_late_fee`
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FilterableEntity for Charge {
    const TABLE: &'static str = "charges";
    const COLUMNS: &'static [Column] = &[
        Column::new("id", ColumnKind::Uuid),
        Column::new("transaction_id", ColumnKind::Uuid),
        Column::new("user_id", ColumnKind::Uuid),
        Column::new("days_late", ColumnKind::Integer),
        Column::new("daily_late_fee", ColumnKind::Numeric),
        Column::new("total", ColumnKind::Numeric),
        Column::new("created_at", ColumnKind::Timestamp),
    ];
    const SEARCH_COLUMNS: &'static [&'static str] = &["users.name", "book_transactions.id"];
}

/// Create charge request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateCharge {
    pub transaction_id: Uuid,
    /// Derived from the transaction's lateness when omitted
    #[validate(range(min = 0, message = "Days late cannot be negative"))]
    pub days_late: Option<i32>,
    pub daily_late_fee: Decimal,
}

/// Update charge request; the total is recomputed
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateCharge {
    #[validate(range(min = 0, message = "Days late cannot be negative"))]
    pub days_late: Option<i32>,
    pub daily_late_fee: Option<Decimal>,
}
