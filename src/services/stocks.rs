//! Stock copy administration

use validator::Validate;

use super::page_request;
use crate::{
    error::{AppError, AppResult},
    filter::FilterGrammar,
    models::{
        stock::{BookStock, CreateStock, StockStatus, UpdateStock},
        ListQuery, Paginated,
    },
    repository::{optional, LendingWrite, Repository},
};

#[derive(Clone)]
pub struct StocksService {
    repository: Repository,
    grammar: FilterGrammar,
}

fn borrowed_not_settable() -> AppError {
    AppError::Validation("a book stock becomes Borrowed only through a transaction".to_string())
}

impl StocksService {
    pub fn new(repository: Repository, grammar: FilterGrammar) -> Self {
        Self { repository, grammar }
    }

    async fn ensure_not_on_loan(&self, code: &str) -> AppResult<()> {
        if self
            .repository
            .transactions
            .find_active_by_stock_code(code)
            .await?
            .is_some()
        {
            return Err(AppError::PreconditionFailed(
                "book stock has an active transaction".to_string(),
            ));
        }
        Ok(())
    }

    pub async fn create(&self, request: CreateStock) -> AppResult<BookStock> {
        request.validate()?;

        let status = request.status.unwrap_or(StockStatus::Available);
        if status == StockStatus::Borrowed {
            return Err(borrowed_not_settable());
        }
        self.repository.books.find_by_id(request.book_id).await?;
        if optional(self.repository.stocks.find_by_code(&request.code).await)?.is_some() {
            return Err(AppError::Conflict(format!("book stock {} already exists", request.code)));
        }

        let stock = self
            .repository
            .stocks
            .create(&request.code, request.book_id, status)
            .await?;
        tracing::info!("Book stock {} created for book {}", stock.code, stock.book_id);
        Ok(stock)
    }

    pub async fn get(&self, code: &str) -> AppResult<BookStock> {
        self.repository.stocks.find_by_code(code).await
    }

    pub async fn list(&self, query: &ListQuery) -> AppResult<Paginated<BookStock>> {
        let request = page_request::<BookStock>(&self.grammar, query, true)?;
        let (rows, total) = self.repository.stocks.find_all(&request).await?;
        Ok(Paginated::new("Book stocks retrieved successfully", &request, rows, total))
    }

    pub async fn update(&self, code: &str, request: UpdateStock) -> AppResult<BookStock> {
        request.validate()?;

        let mut stock = self.repository.stocks.find_by_code(code).await?;
        if let Some(book_id) = request.book_id {
            if book_id != stock.book_id {
                self.ensure_not_on_loan(code).await?;
                self.repository.books.find_by_id(book_id).await?;
                stock = self.repository.stocks.update(code, book_id).await?;
            }
        }
        match request.status {
            Some(status) if status != stock.status => self.set_status(code, status).await,
            _ => Ok(stock),
        }
    }

    /// Administrative status change (Available, Damaged, Lost) of a copy not on loan
    pub async fn set_status(&self, code: &str, status: StockStatus) -> AppResult<BookStock> {
        if status == StockStatus::Borrowed {
            return Err(borrowed_not_settable());
        }

        let stock = self.repository.stocks.find_by_code(code).await?;
        self.ensure_not_on_loan(code).await?;
        if stock.status == status {
            return Ok(stock);
        }

        self.repository
            .lending
            .commit(vec![LendingWrite::SetStockStatus {
                code: code.to_string(),
                expected: Some(stock.status),
                status,
            }])
            .await?;
        tracing::info!("Book stock {} status {} -> {}", code, stock.status, status);

        self.repository.stocks.find_by_code(code).await
    }

    /// Delete a copy that is not on loan
    pub async fn delete(&self, code: &str) -> AppResult<()> {
        self.repository.stocks.find_by_code(code).await?;
        self.ensure_not_on_loan(code).await?;
        self.repository.stocks.delete(code).await?;
        tracing::info!("Book stock {} deleted", code);
        Ok(())
    }
}
