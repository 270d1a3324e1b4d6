//! Business logic services

pub mod auth;
pub mod books;
pub mod charges;
pub mod customers;
pub mod stocks;
pub mod transactions;

use crate::{
    config::{AuthConfig, LendingConfig},
    error::AppResult,
    filter::{
        validate_filter_fields, validate_filter_values, FilterGrammar, FilterableEntity,
        QueryFilter,
    },
    models::{ListQuery, PageRequest},
    repository::Repository,
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub auth: auth::AuthService,
    pub books: books::BooksService,
    pub stocks: stocks::StocksService,
    pub customers: customers::CustomersService,
    pub transactions: transactions::TransactionsService,
    pub charges: charges::ChargesService,
    repository: Repository,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(
        repository: Repository,
        auth_config: AuthConfig,
        lending_config: LendingConfig,
        grammar: FilterGrammar,
    ) -> Self {
        Self {
            auth: auth::AuthService::new(repository.clone(), auth_config),
            books: books::BooksService::new(repository.clone(), grammar),
            stocks: stocks::StocksService::new(repository.clone(), grammar),
            customers: customers::CustomersService::new(repository.clone(), grammar),
            transactions: transactions::TransactionsService::new(
                repository.clone(),
                grammar,
                lending_config.loan_days,
            ),
            charges: charges::ChargesService::new(repository.clone(), grammar),
            repository,
        }
    }

    /// Check storage connectivity
    pub async fn ping(&self) -> AppResult<()> {
        self.repository.ping().await
    }
}

/// Turn list query parameters into a page window and WHERE clause for `E`.
///
/// With `strict`, filters on fields `E` does not have are rejected;
/// otherwise they are dropped.
pub(crate) fn page_request<E: FilterableEntity>(
    grammar: &FilterGrammar,
    query: &ListQuery,
    strict: bool,
) -> AppResult<PageRequest> {
    let params = grammar.parse(query.filter.as_deref().unwrap_or(""));
    if strict {
        validate_filter_fields::<E>(&params)?;
    }

    let resolved = params.resolve::<E>();
    if !resolved.unknown.is_empty() {
        tracing::debug!(
            "Ignoring unknown filter fields on {}: {:?}",
            E::TABLE,
            resolved.unknown
        );
    }

    validate_filter_values(&resolved.filters)?;

    let filter = QueryFilter::build::<E>(query.search.as_deref(), &resolved.filters);
    Ok(PageRequest::new(query.page, query.per_page, filter))
}
