//! Borrow/return lifecycle engine.
//!
//! Every state change is planned against freshly read rows and committed as
//! one [`LendingWrite`] set, so a transaction row and its stock copy never
//! disagree. A copy is acquired with a compare-and-swap on `Available`;
//! losing that race aborts the whole commit with `Conflict`.

use chrono::{Duration, Utc};
use uuid::Uuid;
use validator::Validate;

use super::page_request;
use crate::{
    error::{AppError, AppResult},
    filter::FilterGrammar,
    models::{
        stock::StockStatus,
        transaction::{
            BookTransaction, CreateTransaction, ReturnBook, TransactionDetails, TransactionStatus,
            UpdateTransaction,
        },
        ListQuery, Paginated,
    },
    repository::{optional, LendingWrite, Repository},
};

#[derive(Clone)]
pub struct TransactionsService {
    repository: Repository,
    grammar: FilterGrammar,
    loan_days: i64,
}

fn overdue_not_settable() -> AppError {
    AppError::Validation("status Overdue is only set by the overdue check".to_string())
}

fn cannot_reopen() -> AppError {
    AppError::PreconditionFailed("a returned transaction cannot be reopened".to_string())
}

fn stock_not_available() -> AppError {
    AppError::PreconditionFailed("book stock is not available".to_string())
}

impl TransactionsService {
    pub fn new(repository: Repository, grammar: FilterGrammar, loan_days: i64) -> Self {
        Self {
            repository,
            grammar,
            loan_days,
        }
    }

    /// Load a transaction's book, stock copy, customer and charges
    async fn with_relations(&self, transaction: BookTransaction) -> AppResult<TransactionDetails> {
        let book = optional(self.repository.books.find_by_id(transaction.book_id).await)?;
        let stock = optional(self.repository.stocks.find_by_code(&transaction.stock_code).await)?;
        let customer = optional(self.repository.customers.find_by_id(transaction.customer_id).await)?;
        let charges = self.repository.charges.find_by_transaction_id(transaction.id).await?;

        Ok(TransactionDetails {
            transaction,
            book,
            stock,
            customer,
            charges,
        })
    }

    /// Re-read after a commit so the response reflects storage
    async fn reload(&self, id: Uuid) -> AppResult<TransactionDetails> {
        let transaction = self.repository.transactions.find_by_id(id).await?;
        self.with_relations(transaction).await
    }

    /// Borrow a copy
    pub async fn create(&self, request: CreateTransaction) -> AppResult<TransactionDetails> {
        request.validate()?;

        match request.status.unwrap_or(TransactionStatus::Borrowed) {
            TransactionStatus::Borrowed => {}
            TransactionStatus::Overdue => return Err(overdue_not_settable()),
            TransactionStatus::Returned => {
                return Err(AppError::Validation(
                    "a new transaction must have status Borrowed".to_string(),
                ))
            }
        }

        let stock = self.repository.stocks.find_by_code(&request.stock_code).await?;
        if stock.status != StockStatus::Available {
            return Err(stock_not_available());
        }
        self.repository.customers.find_by_id(request.customer_id).await?;

        let now = Utc::now();
        let transaction = BookTransaction {
            id: Uuid::new_v4(),
            book_id: stock.book_id,
            stock_code: stock.code.clone(),
            customer_id: request.customer_id,
            due_date: now + Duration::days(self.loan_days),
            status: TransactionStatus::Borrowed,
            borrowed_at: now,
            return_at: None,
            created_at: now,
            updated_at: now,
        };

        self.repository
            .lending
            .commit(vec![
                LendingWrite::acquire_stock(&stock.code),
                LendingWrite::InsertTransaction(transaction.clone()),
            ])
            .await?;

        tracing::info!(
            "Book stock {} borrowed by customer {} (transaction {}, due {})",
            transaction.stock_code,
            transaction.customer_id,
            transaction.id,
            transaction.due_date
        );

        self.with_relations(transaction).await
    }

    /// Partial update; moves stock copies as needed
    pub async fn update(&self, id: Uuid, request: UpdateTransaction) -> AppResult<TransactionDetails> {
        request.validate()?;
        if request.status == Some(TransactionStatus::Overdue) {
            return Err(overdue_not_settable());
        }

        let current = self.repository.transactions.find_by_id(id).await?;
        let mut next = current.clone();

        if let Some(status) = request.status {
            if current.status == TransactionStatus::Returned && status != TransactionStatus::Returned {
                return Err(cannot_reopen());
            }
            if status != current.status {
                next.status = status;
            }
        }

        if let Some(customer_id) = request.customer_id {
            if customer_id != current.customer_id {
                self.repository.customers.find_by_id(customer_id).await?;
                next.customer_id = customer_id;
            }
        }

        if let Some(due_date) = request.due_date {
            next.due_date = due_date;
        }

        let code_changed = request
            .stock_code
            .as_deref()
            .is_some_and(|code| code != current.stock_code);
        if let (true, Some(code)) = (code_changed, request.stock_code.as_deref()) {
            let stock = self.repository.stocks.find_by_code(code).await?;
            if next.status.is_active() && stock.status != StockStatus::Available {
                return Err(stock_not_available());
            }
            next.stock_code = stock.code;
            next.book_id = stock.book_id;
        }

        match (next.status, request.return_at) {
            (TransactionStatus::Returned, Some(return_at)) => next.return_at = Some(return_at),
            (TransactionStatus::Returned, None) => {
                if next.return_at.is_none() {
                    next.return_at = Some(Utc::now());
                }
            }
            (_, Some(_)) => {
                return Err(AppError::Validation(
                    "return_at can only be set on a returned transaction".to_string(),
                ))
            }
            (_, None) => {}
        }

        if next == current {
            return self.with_relations(current).await;
        }

        let mut writes = Vec::new();
        if current.status.is_active() && (!next.status.is_active() || code_changed) {
            writes.push(LendingWrite::release_stock(&current.stock_code));
        }
        if next.status.is_active() && code_changed {
            writes.push(LendingWrite::acquire_stock(&next.stock_code));
        }
        writes.push(LendingWrite::UpdateTransaction {
            expected: current.status,
            transaction: next,
        });

        self.repository.lending.commit(writes).await?;
        tracing::info!("Book transaction {} updated", id);

        self.reload(id).await
    }

    /// Delete a transaction, releasing its copy if it was still out
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let current = self.repository.transactions.find_by_id(id).await?;

        let mut writes = Vec::new();
        if current.status.is_active() {
            writes.push(LendingWrite::release_stock(&current.stock_code));
        }
        writes.push(LendingWrite::DeleteTransaction {
            id,
            expected: current.status,
        });

        self.repository.lending.commit(writes).await?;
        tracing::info!("Book transaction {} deleted", id);
        Ok(())
    }

    /// Explicit status change
    pub async fn update_status(&self, id: Uuid, status: TransactionStatus) -> AppResult<TransactionDetails> {
        if status == TransactionStatus::Overdue {
            return Err(overdue_not_settable());
        }

        let current = self.repository.transactions.find_by_id(id).await?;
        if current.status == TransactionStatus::Returned {
            if status == TransactionStatus::Returned {
                return self.with_relations(current).await;
            }
            return Err(cannot_reopen());
        }

        let writes = match status {
            TransactionStatus::Borrowed => vec![
                LendingWrite::force_stock_borrowed(&current.stock_code),
                LendingWrite::SetTransactionStatus {
                    id,
                    expected: current.status,
                    status,
                },
            ],
            _ => vec![
                LendingWrite::ReturnTransaction {
                    id,
                    return_at: Utc::now(),
                },
                LendingWrite::release_stock(&current.stock_code),
            ],
        };

        self.repository.lending.commit(writes).await?;
        tracing::info!("Book transaction {} status set to {}", id, status);

        self.reload(id).await
    }

    /// Return a borrowed copy
    pub async fn return_book(&self, id: Uuid, request: ReturnBook) -> AppResult<TransactionDetails> {
        let current = self.repository.transactions.find_by_id(id).await?;
        if current.status == TransactionStatus::Returned {
            return Err(AppError::PreconditionFailed("book is already returned".to_string()));
        }

        let return_at = request.return_at.unwrap_or_else(Utc::now);
        self.repository
            .lending
            .commit(vec![
                LendingWrite::ReturnTransaction { id, return_at },
                LendingWrite::release_stock(&current.stock_code),
            ])
            .await?;

        tracing::info!(
            "Book stock {} returned (transaction {})",
            current.stock_code,
            id
        );

        self.reload(id).await
    }

    /// Overdue transactions; Borrowed ones past due are persisted as Overdue first.
    ///
    /// Repeated calls return the same set without further writes.
    pub async fn get_overdue(&self) -> AppResult<Vec<BookTransaction>> {
        let now = Utc::now();
        let candidates = self.repository.transactions.find_overdue(now).await?;

        let mut overdue = Vec::with_capacity(candidates.len());
        let mut marked = 0usize;
        for mut transaction in candidates {
            if !transaction.is_late_at(now) {
                continue;
            }
            if transaction.status == TransactionStatus::Borrowed {
                if self.repository.transactions.mark_overdue(transaction.id).await? {
                    transaction.status = TransactionStatus::Overdue;
                    marked += 1;
                } else {
                    // Changed since selection: returned, or marked by a concurrent sweep
                    match optional(self.repository.transactions.find_by_id(transaction.id).await)? {
                        Some(fresh) if fresh.status == TransactionStatus::Overdue => transaction = fresh,
                        _ => continue,
                    }
                }
            }
            overdue.push(transaction);
        }

        if marked > 0 {
            tracing::info!("Marked {} book transactions as overdue", marked);
        }
        Ok(overdue)
    }

    pub async fn get(&self, id: Uuid) -> AppResult<TransactionDetails> {
        self.reload(id).await
    }

    pub async fn list(&self, query: &ListQuery) -> AppResult<Paginated<BookTransaction>> {
        let request = page_request::<BookTransaction>(&self.grammar, query, true)?;
        let (rows, total) = self.repository.transactions.find_all(&request).await?;
        Ok(Paginated::new("Book transactions retrieved successfully", &request, rows, total))
    }

    pub async fn by_customer(&self, customer_id: Uuid) -> AppResult<Vec<BookTransaction>> {
        self.repository.customers.find_by_id(customer_id).await?;
        self.repository.transactions.find_by_customer_id(customer_id).await
    }

    pub async fn by_book(&self, book_id: Uuid) -> AppResult<Vec<BookTransaction>> {
        self.repository.books.find_by_id(book_id).await?;
        self.repository.transactions.find_by_book_id(book_id).await
    }

    pub async fn by_stock_code(&self, code: &str) -> AppResult<Vec<BookTransaction>> {
        self.repository.stocks.find_by_code(code).await?;
        self.repository.transactions.find_by_stock_code(code).await
    }
}
