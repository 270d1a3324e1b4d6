//! Translation of parsed filters into bound Postgres predicates.
//!
//! Field names never reach the SQL text directly: each entity declares the
//! columns a client may filter on, and only those static names are rendered.
//! Every client value is a bind parameter cast to the column's kind.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use super::{FilterOperator, FilterParams, FilterValue};
use crate::error::{AppError, AppResult};

/// Storage type of a filterable column, used to cast bound text values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Uuid,
    Integer,
    Numeric,
    Timestamp,
}

impl ColumnKind {
    fn cast(&self) -> &'static str {
        match self {
            ColumnKind::Text => "text",
            ColumnKind::Uuid => "uuid",
            ColumnKind::Integer => "bigint",
            ColumnKind::Numeric => "numeric",
            ColumnKind::Timestamp => "timestamptz",
        }
    }

    /// Whether `value` casts cleanly to this kind
    pub fn accepts(&self, value: &str) -> bool {
        match self {
            ColumnKind::Text => true,
            ColumnKind::Uuid => Uuid::try_parse(value).is_ok(),
            ColumnKind::Integer => value.parse::<i64>().is_ok(),
            ColumnKind::Numeric => {
                !value.contains('_')
                    && (Decimal::from_str(value).is_ok() || Decimal::from_scientific(value).is_ok())
            }
            ColumnKind::Timestamp => {
                DateTime::parse_from_rfc3339(value).is_ok()
                    || NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S").is_ok()
                    || NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S").is_ok()
                    || NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
            }
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            ColumnKind::Text => "text",
            ColumnKind::Uuid => "a UUID",
            ColumnKind::Integer => "an integer",
            ColumnKind::Numeric => "a number",
            ColumnKind::Timestamp => "a date or RFC 3339 timestamp",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
}

impl Column {
    pub const fn new(name: &'static str, kind: ColumnKind) -> Self {
        Self { name, kind }
    }
}

/// Column namespace of a listable entity
pub trait FilterableEntity {
    /// Table qualifier used on every predicate
    const TABLE: &'static str;
    /// Columns clients may filter on
    const COLUMNS: &'static [Column];
    /// Fully qualified columns matched by free-text search
    const SEARCH_COLUMNS: &'static [&'static str];

    fn column(name: &str) -> Option<&'static Column> {
        Self::COLUMNS.iter().find(|c| c.name == name)
    }
}

/// A filter whose field was found in the entity's column list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFilter {
    pub table: &'static str,
    pub column: &'static Column,
    pub operator: FilterOperator,
    pub value: FilterValue,
}

#[derive(Debug, Clone, Default)]
pub struct ResolvedFilters {
    pub filters: Vec<ResolvedFilter>,
    /// Field names not present on the entity
    pub unknown: Vec<String>,
}

impl FilterParams {
    /// Split triples into known columns of `E` and unknown field names
    pub fn resolve<E: FilterableEntity>(&self) -> ResolvedFilters {
        let mut resolved = ResolvedFilters::default();
        for param in self {
            match E::column(&param.field) {
                Some(column) => resolved.filters.push(ResolvedFilter {
                    table: E::TABLE,
                    column,
                    operator: param.operator,
                    value: param.value.clone(),
                }),
                None => resolved.unknown.push(param.field.clone()),
            }
        }
        resolved
    }
}

/// Optional pre-check: reject filters naming fields `E` does not have
pub fn validate_filter_fields<E: FilterableEntity>(params: &FilterParams) -> AppResult<()> {
    let unknown = params.resolve::<E>().unknown;
    if unknown.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "Unknown filter field(s): {}",
            unknown.join(", ")
        )))
    }
}

/// Reject values that would fail the column cast in storage.
///
/// Pattern operators compare as text and accept any value.
pub fn validate_filter_values(filters: &[ResolvedFilter]) -> AppResult<()> {
    for filter in filters {
        let values = match filter.operator {
            FilterOperator::Contains | FilterOperator::StartsWith | FilterOperator::EndsWith => continue,
            FilterOperator::In => filter.value.as_list(),
            _ => vec![filter.value.as_text()],
        };
        if let Some(bad) = values.iter().find(|v| !filter.column.kind.accepts(v)) {
            return Err(AppError::Validation(format!(
                "Filter value '{}' for {} must be {}",
                bad,
                filter.column.name,
                filter.column.kind.describe()
            )));
        }
    }
    Ok(())
}

/// One storage predicate. All predicates of a [`QueryFilter`] are AND-ed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// `column <op> $n::kind`
    Compare {
        column: String,
        op: &'static str,
        cast: &'static str,
        value: String,
    },
    /// `column::text ILIKE $n`
    Like { column: String, pattern: String },
    /// `column = ANY($n::kind[])`
    AnyOf {
        column: String,
        cast: &'static str,
        values: Vec<String>,
    },
    /// `(c1::text ILIKE $n OR c2::text ILIKE $n ...)`
    Search {
        columns: &'static [&'static str],
        pattern: String,
    },
}

impl Predicate {
    fn from_filter(filter: &ResolvedFilter) -> Self {
        let column = format!("{}.{}", filter.table, filter.column.name);
        let cast = filter.column.kind.cast();
        let compare = |op: &'static str| Predicate::Compare {
            column: column.clone(),
            op,
            cast,
            value: filter.value.as_text(),
        };

        match filter.operator {
            FilterOperator::Equals => compare("="),
            FilterOperator::NotEquals => compare("<>"),
            FilterOperator::GreaterThan => compare(">"),
            FilterOperator::GreaterOrEqual => compare(">="),
            FilterOperator::LessThan => compare("<"),
            FilterOperator::LessOrEqual => compare("<="),
            FilterOperator::Contains => Predicate::Like {
                column,
                pattern: format!("%{}%", escape_like(&filter.value.as_text())),
            },
            FilterOperator::StartsWith => Predicate::Like {
                column,
                pattern: format!("{}%", escape_like(&filter.value.as_text())),
            },
            FilterOperator::EndsWith => Predicate::Like {
                column,
                pattern: format!("%{}", escape_like(&filter.value.as_text())),
            },
            FilterOperator::In => Predicate::AnyOf {
                column,
                cast,
                values: filter.value.as_list(),
            },
        }
    }

    fn push_to(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        match self {
            Predicate::Compare { column, op, cast, value } => {
                builder.push(format!("{} {} ", column, op));
                builder.push_bind(value.clone());
                builder.push(format!("::{}", cast));
            }
            Predicate::Like { column, pattern } => {
                builder.push(format!("{}::text ILIKE ", column));
                builder.push_bind(pattern.clone());
            }
            Predicate::AnyOf { column, cast, values } => {
                builder.push(format!("{} = ANY(", column));
                builder.push_bind(values.clone());
                builder.push(format!("::{}[])", cast));
            }
            Predicate::Search { columns, pattern } => {
                builder.push("(");
                for (i, column) in columns.iter().enumerate() {
                    if i > 0 {
                        builder.push(" OR ");
                    }
                    builder.push(format!("{}::text ILIKE ", column));
                    builder.push_bind(pattern.clone());
                }
                builder.push(")");
            }
        }
    }
}

/// Escape LIKE wildcards so user text matches literally
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Composable WHERE clause for one entity's list query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryFilter {
    predicates: Vec<Predicate>,
}

impl QueryFilter {
    /// Build the predicates for `E` from free-text search and resolved filters
    pub fn build<E: FilterableEntity>(search: Option<&str>, filters: &[ResolvedFilter]) -> Self {
        let mut predicates: Vec<Predicate> = filters.iter().map(Predicate::from_filter).collect();

        if let Some(search) = search.map(str::trim).filter(|s| !s.is_empty()) {
            if !E::SEARCH_COLUMNS.is_empty() {
                predicates.push(Predicate::Search {
                    columns: E::SEARCH_COLUMNS,
                    pattern: format!("%{}%", escape_like(search)),
                });
            }
        }

        Self { predicates }
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// Append ` WHERE p1 AND p2 ...` (nothing when empty)
    pub fn push_where(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        for (i, predicate) in self.predicates.iter().enumerate() {
            builder.push(if i == 0 { " WHERE " } else { " AND " });
            predicate.push_to(builder);
        }
    }
}
