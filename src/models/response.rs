//! Response wrappers and pagination

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::filter::QueryFilter;

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PER_PAGE: i64 = 10;
pub const MAX_PER_PAGE: i64 = 100;
/// Highest page whose offset still fits an `i64`
pub const MAX_PAGE: i64 = i64::MAX / MAX_PER_PAGE;

/// Query parameters shared by every list endpoint
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
pub struct ListQuery {
    /// Page number (default: 1)
    pub page: Option<i64>,
    /// Items per page (default: 10, max: 100)
    pub per_page: Option<i64>,
    /// Free-text search across the entity's searchable columns
    pub search: Option<String>,
    /// Filter expression, e.g. `status:Borrowed:equals|due_date:2024-01-01:lessthan`
    pub filter: Option<String>,
}

/// Normalized page window plus the WHERE clause to apply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub per_page: i64,
    pub filter: QueryFilter,
}

impl PageRequest {
    pub fn new(page: Option<i64>, per_page: Option<i64>, filter: QueryFilter) -> Self {
        Self {
            page: page.unwrap_or(DEFAULT_PAGE).clamp(1, MAX_PAGE),
            per_page: per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE),
            filter,
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.per_page)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None, QueryFilter::default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct PaginationMeta {
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
    pub total_items: i64,
    pub items_on_page: i64,
}

impl PaginationMeta {
    pub fn new(request: &PageRequest, total_items: i64, items_on_page: usize) -> Self {
        Self {
            page: request.page,
            per_page: request.per_page,
            total_pages: (total_items + request.per_page - 1) / request.per_page,
            total_items,
            items_on_page: items_on_page as i64,
        }
    }
}

/// Single-record response wrapper
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T>
where
    T: for<'a> ToSchema<'a>,
{
    pub status: u16,
    pub message: String,
    pub data: T,
}

impl<T> ApiResponse<T>
where
    T: for<'a> ToSchema<'a>,
{
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            status: 200,
            message: message.into(),
            data,
        }
    }

    pub fn created(message: impl Into<String>, data: T) -> Self {
        Self {
            status: 201,
            message: message.into(),
            data,
        }
    }
}

/// Unpaginated list response wrapper
#[derive(Debug, Serialize, ToSchema)]
pub struct ListResponse<T>
where
    T: for<'a> ToSchema<'a>,
{
    pub status: u16,
    pub message: String,
    pub data: Vec<T>,
}

impl<T> ListResponse<T>
where
    T: for<'a> ToSchema<'a>,
{
    pub fn ok(message: impl Into<String>, data: Vec<T>) -> Self {
        Self {
            status: 200,
            message: message.into(),
            data,
        }
    }
}

/// Response carrying only a message
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub status: u16,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status: 200,
            message: message.into(),
        }
    }
}

/// Paginated list response wrapper
#[derive(Debug, Serialize, ToSchema)]
pub struct Paginated<T>
where
    T: for<'a> ToSchema<'a>,
{
    pub status: u16,
    pub message: String,
    pub data: Vec<T>,
    pub meta: PaginationMeta,
}

impl<T> Paginated<T>
where
    T: for<'a> ToSchema<'a>,
{
    pub fn new(message: impl Into<String>, request: &PageRequest, data: Vec<T>, total: i64) -> Self {
        let meta = PaginationMeta::new(request, total, data.len());
        Self {
            status: 200,
            message: message.into(),
            data,
            meta,
        }
    }
}
