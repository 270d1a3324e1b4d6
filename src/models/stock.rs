//! Physical stock copy model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::text_enum_sqlx;
use crate::filter::{Column, ColumnKind, FilterableEntity};

/// Shelf status of a copy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum StockStatus {
    Available,
    Borrowed,
    Damaged,
    Lost,
}

impl StockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::Available => "Available",
            StockStatus::Borrowed => "Borrowed",
            StockStatus::Damaged => "Damaged",
            StockStatus::Lost => "Lost",
        }
    }
}

impl std::fmt::Display for StockStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for StockStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Available" => Ok(StockStatus::Available),
            "Borrowed" => Ok(StockStatus::Borrowed),
            "Damaged" => Ok(StockStatus::Damaged),
            "Lost" => Ok(StockStatus::Lost),
            _ => Err(format!("Invalid stock status: {}", s)),
        }
    }
}

text_enum_sqlx!(StockStatus);

/// Stock copy model from database, keyed by its shelf code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BookStock {
    pub code: String,
    pub book_id: Uuid,
    pub status: StockStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FilterableEntity for BookStock {
    const TABLE: &'static str = "book_stocks";
    const COLUMNS: &'static [Column] = &[
        Column::new("code", ColumnKind::Text),
        Column::new("book_id", ColumnKind::Uuid),
        Column::new("status", ColumnKind::Text),
        Column::new("created_at", ColumnKind::Timestamp),
        Column::new("updated_at", ColumnKind::Timestamp),
    ];
    const SEARCH_COLUMNS: &'static [&'static str] =
        &["book_stocks.code", "book_stocks.status", "books.title"];
}

/// Create stock request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateStock {
    #[validate(length(min = 3, max = 50, message = "Code must be 3-50 characters"))]
    pub code: String,
    pub book_id: Uuid,
    /// Defaults to Available
    pub status: Option<StockStatus>,
}

/// Update stock request
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateStock {
    pub book_id: Option<Uuid>,
    pub status: Option<StockStatus>,
}

/// Administrative status change
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateStockStatus {
    pub status: StockStatus,
}
