//! In-memory implementation of every repository facade.
//!
//! `commit` applies a lending write set to a copy of the state and only swaps
//! it in when every write succeeded, mirroring the Postgres transaction. The
//! partial unique index on active transactions per stock code is enforced on
//! every insert and update.

#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use biblio_server::{
    config::{AuthConfig, LendingConfig},
    error::{AppError, AppResult},
    filter::FilterGrammar,
    models::{
        book::{Book, CreateBook, UpdateBook},
        customer::{CreateCustomer, Customer, UpdateCustomer},
        stock::{BookStock, StockStatus},
        transaction::{BookTransaction, TransactionStatus},
        user::{Role, User},
        Charge, PageRequest,
    },
    repository::{
        BookRepository, ChargeRepository, CustomerRepository, LendingStore, LendingWrite,
        Repository, StockRepository, TransactionRepository, UserRepository,
    },
    services::Services,
};

#[derive(Debug, Clone, Default)]
struct Tables {
    books: HashMap<Uuid, Book>,
    stocks: HashMap<String, BookStock>,
    transactions: HashMap<Uuid, BookTransaction>,
    customers: HashMap<Uuid, Customer>,
    charges: HashMap<Uuid, Charge>,
    users: HashMap<Uuid, User>,
    /// Row mutations applied so far
    writes: usize,
}

#[derive(Default)]
struct Inner {
    tables: Tables,
    fail_stock_writes: bool,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

fn not_found(what: &str) -> AppError {
    AppError::NotFound(format!("{} not found", what))
}

fn newest_first<T>(mut rows: Vec<T>, key: impl Fn(&T) -> DateTime<Utc>) -> Vec<T> {
    rows.sort_by_key(|row| std::cmp::Reverse(key(row)));
    rows
}

fn page<T>(rows: Vec<T>, request: &PageRequest, key: impl Fn(&T) -> DateTime<Utc>) -> (Vec<T>, i64) {
    let rows = newest_first(rows, key);
    let total = rows.len() as i64;
    let rows = rows
        .into_iter()
        .skip(request.offset() as usize)
        .take(request.per_page as usize)
        .collect();
    (rows, total)
}

impl Tables {
    fn ensure_single_active(&self, transaction: &BookTransaction) -> AppResult<()> {
        if !transaction.status.is_active() {
            return Ok(());
        }
        let clash = self.transactions.values().any(|other| {
            other.id != transaction.id
                && other.stock_code == transaction.stock_code
                && other.status.is_active()
        });
        if clash {
            return Err(AppError::Conflict(format!(
                "book stock {} is not available",
                transaction.stock_code
            )));
        }
        Ok(())
    }

    fn ensure_references(&self, transaction: &BookTransaction) -> AppResult<()> {
        if !self.stocks.contains_key(&transaction.stock_code)
            || !self.customers.contains_key(&transaction.customer_id)
            || !self.books.contains_key(&transaction.book_id)
        {
            return Err(AppError::PreconditionFailed("referenced record does not exist".to_string()));
        }
        Ok(())
    }

    fn expect_status(&self, id: Uuid, expected: TransactionStatus) -> AppResult<()> {
        match self.transactions.get(&id) {
            Some(t) if t.status == expected => Ok(()),
            _ => Err(AppError::Conflict(format!(
                "book transaction {} was modified concurrently",
                id
            ))),
        }
    }

    fn apply(&mut self, write: &LendingWrite, fail_stock_writes: bool) -> AppResult<()> {
        let now = Utc::now();
        match write {
            LendingWrite::InsertTransaction(transaction) => {
                self.ensure_references(transaction)?;
                self.ensure_single_active(transaction)?;
                self.transactions.insert(transaction.id, transaction.clone());
            }
            LendingWrite::UpdateTransaction { expected, transaction } => {
                self.expect_status(transaction.id, *expected)?;
                self.ensure_references(transaction)?;
                self.ensure_single_active(transaction)?;
                let mut updated = transaction.clone();
                updated.updated_at = now;
                self.transactions.insert(updated.id, updated);
            }
            LendingWrite::SetTransactionStatus { id, expected, status } => {
                self.expect_status(*id, *expected)?;
                let mut updated = self.transactions[id].clone();
                updated.status = *status;
                updated.updated_at = now;
                self.ensure_single_active(&updated)?;
                self.transactions.insert(*id, updated);
            }
            LendingWrite::ReturnTransaction { id, return_at } => {
                let transaction = self
                    .transactions
                    .get_mut(id)
                    .filter(|t| t.status.is_active())
                    .ok_or_else(|| AppError::Conflict("book is already returned".to_string()))?;
                transaction.status = TransactionStatus::Returned;
                transaction.return_at = Some(*return_at);
                transaction.updated_at = now;
            }
            LendingWrite::DeleteTransaction { id, expected } => {
                self.expect_status(*id, *expected)?;
                self.transactions.remove(id);
                self.charges.retain(|_, charge| charge.transaction_id != *id);
            }
            LendingWrite::SetStockStatus { code, expected, status } => {
                if fail_stock_writes {
                    return Err(AppError::StockStatusUpdate("stock table unavailable".to_string()));
                }
                let stock = match (self.stocks.get_mut(code), expected) {
                    (Some(stock), Some(expected)) if stock.status != *expected => {
                        return Err(AppError::Conflict(format!("book stock {} is not available", code)))
                    }
                    (Some(stock), _) => stock,
                    (None, Some(_)) => {
                        return Err(AppError::Conflict(format!("book stock {} is not available", code)))
                    }
                    (None, None) => return Err(not_found("book stock")),
                };
                stock.status = *status;
                stock.updated_at = now;
            }
        }
        self.writes += 1;
        Ok(())
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("store lock poisoned")
    }

    pub fn repository(&self) -> Repository {
        Repository {
            pool: None,
            books: Arc::new(self.clone()),
            stocks: Arc::new(self.clone()),
            transactions: Arc::new(self.clone()),
            customers: Arc::new(self.clone()),
            charges: Arc::new(self.clone()),
            users: Arc::new(self.clone()),
            lending: Arc::new(self.clone()),
        }
    }

    pub fn services(&self) -> Services {
        Services::new(
            self.repository(),
            AuthConfig::default(),
            LendingConfig::default(),
            FilterGrammar::default(),
        )
    }

    /// Make every stock status write inside `commit` fail
    pub fn fail_stock_writes(&self, fail: bool) {
        self.lock().fail_stock_writes = fail;
    }

    pub fn writes(&self) -> usize {
        self.lock().tables.writes
    }

    pub fn stock(&self, code: &str) -> BookStock {
        self.lock().tables.stocks[code].clone()
    }

    pub fn transaction(&self, id: Uuid) -> Option<BookTransaction> {
        self.lock().tables.transactions.get(&id).cloned()
    }

    pub fn transactions(&self) -> Vec<BookTransaction> {
        self.lock().tables.transactions.values().cloned().collect()
    }

    pub fn active_transactions_for(&self, code: &str) -> usize {
        self.lock()
            .tables
            .transactions
            .values()
            .filter(|t| t.stock_code == code && t.status.is_active())
            .count()
    }

    /// Store a transaction as-is, bypassing the lifecycle engine
    pub fn seed_transaction(&self, transaction: BookTransaction) {
        self.lock().tables.transactions.insert(transaction.id, transaction);
    }

    pub fn seed_user(&self, role: Role) -> User {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: "Desk".to_string(),
            email: format!("{}@example.org", Uuid::new_v4()),
            password_hash: String::new(),
            role,
            created_at: now,
            updated_at: now,
        };
        self.lock().tables.users.insert(user.id, user.clone());
        user
    }
}

/// Catalog fixture: one book, one Available copy, one customer
pub struct Library {
    pub store: MemoryStore,
    pub services: Services,
    pub book: Book,
    pub stock: BookStock,
    pub customer: Customer,
}

impl Library {
    pub async fn new() -> Self {
        Self::with_stock_code("BK-001").await
    }

    pub async fn with_stock_code(code: &str) -> Self {
        let store = MemoryStore::new();
        let services = store.services();

        let book = services
            .books
            .create(CreateBook {
                title: "The Name of the Rose".to_string(),
                description: None,
                cover_url: None,
            })
            .await
            .expect("book");
        let stock = services
            .stocks
            .create(biblio_server::models::stock::CreateStock {
                code: code.to_string(),
                book_id: book.id,
                status: None,
            })
            .await
            .expect("stock");
        let customer = services
            .customers
            .create(CreateCustomer {
                code: "C-001".to_string(),
                name: "Carla".to_string(),
            })
            .await
            .expect("customer");

        Self {
            store,
            services,
            book,
            stock,
            customer,
        }
    }

    /// A Borrowed transaction on the fixture copy, due at `due_date`
    pub fn borrowed(&self, due_date: DateTime<Utc>) -> BookTransaction {
        let borrowed_at = due_date - Duration::days(7);
        BookTransaction {
            id: Uuid::new_v4(),
            book_id: self.book.id,
            stock_code: self.stock.code.clone(),
            customer_id: self.customer.id,
            due_date,
            status: TransactionStatus::Borrowed,
            borrowed_at,
            return_at: None,
            created_at: borrowed_at,
            updated_at: borrowed_at,
        }
    }
}

#[async_trait]
impl BookRepository for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Book> {
        self.lock().tables.books.get(&id).cloned().ok_or_else(|| not_found("book"))
    }

    async fn find_all(&self, request: &PageRequest) -> AppResult<(Vec<Book>, i64)> {
        let rows = self.lock().tables.books.values().cloned().collect();
        Ok(page(rows, request, |b: &Book| b.created_at))
    }

    async fn create(&self, book: &CreateBook) -> AppResult<Book> {
        let now = Utc::now();
        let book = Book {
            id: Uuid::new_v4(),
            title: book.title.clone(),
            description: book.description.clone(),
            cover_url: book.cover_url.clone(),
            created_at: now,
            updated_at: now,
        };
        let mut inner = self.lock();
        inner.tables.books.insert(book.id, book.clone());
        inner.tables.writes += 1;
        Ok(book)
    }

    async fn update(&self, id: Uuid, changes: &UpdateBook) -> AppResult<Book> {
        let mut inner = self.lock();
        let book = inner.tables.books.get_mut(&id).ok_or_else(|| not_found("book"))?;
        if let Some(title) = &changes.title {
            book.title = title.clone();
        }
        if let Some(description) = &changes.description {
            book.description = Some(description.clone());
        }
        if let Some(cover_url) = &changes.cover_url {
            book.cover_url = Some(cover_url.clone());
        }
        book.updated_at = Utc::now();
        let book = book.clone();
        inner.tables.writes += 1;
        Ok(book)
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let mut inner = self.lock();
        if inner.tables.stocks.values().any(|s| s.book_id == id) {
            return Err(AppError::PreconditionFailed("book is still referenced".to_string()));
        }
        inner.tables.books.remove(&id).ok_or_else(|| not_found("book"))?;
        inner.tables.writes += 1;
        Ok(())
    }
}

#[async_trait]
impl StockRepository for MemoryStore {
    async fn find_by_code(&self, code: &str) -> AppResult<BookStock> {
        self.lock()
            .tables
            .stocks
            .get(code)
            .cloned()
            .ok_or_else(|| not_found("book stock"))
    }

    async fn find_by_book_id(&self, book_id: Uuid) -> AppResult<Vec<BookStock>> {
        let mut rows: Vec<_> = self
            .lock()
            .tables
            .stocks
            .values()
            .filter(|s| s.book_id == book_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(rows)
    }

    async fn find_available_by_book_id(&self, book_id: Uuid) -> AppResult<Vec<BookStock>> {
        let rows = StockRepository::find_by_book_id(self, book_id).await?;
        Ok(rows
            .into_iter()
            .filter(|s| s.status == StockStatus::Available)
            .collect())
    }

    async fn find_all(&self, request: &PageRequest) -> AppResult<(Vec<BookStock>, i64)> {
        let rows = self.lock().tables.stocks.values().cloned().collect();
        Ok(page(rows, request, |s: &BookStock| s.created_at))
    }

    async fn create(&self, code: &str, book_id: Uuid, status: StockStatus) -> AppResult<BookStock> {
        let mut inner = self.lock();
        if inner.tables.stocks.contains_key(code) {
            return Err(AppError::Conflict("book stock already exists".to_string()));
        }
        if !inner.tables.books.contains_key(&book_id) {
            return Err(AppError::PreconditionFailed("book does not exist".to_string()));
        }
        let now = Utc::now();
        let stock = BookStock {
            code: code.to_string(),
            book_id,
            status,
            created_at: now,
            updated_at: now,
        };
        inner.tables.stocks.insert(stock.code.clone(), stock.clone());
        inner.tables.writes += 1;
        Ok(stock)
    }

    async fn update(&self, code: &str, book_id: Uuid) -> AppResult<BookStock> {
        let mut inner = self.lock();
        let stock = inner.tables.stocks.get_mut(code).ok_or_else(|| not_found("book stock"))?;
        stock.book_id = book_id;
        stock.updated_at = Utc::now();
        let stock = stock.clone();
        inner.tables.writes += 1;
        Ok(stock)
    }

    async fn update_status(&self, code: &str, status: StockStatus) -> AppResult<BookStock> {
        let mut inner = self.lock();
        let stock = inner.tables.stocks.get_mut(code).ok_or_else(|| not_found("book stock"))?;
        stock.status = status;
        stock.updated_at = Utc::now();
        let stock = stock.clone();
        inner.tables.writes += 1;
        Ok(stock)
    }

    async fn delete(&self, code: &str) -> AppResult<()> {
        let mut inner = self.lock();
        if inner.tables.transactions.values().any(|t| t.stock_code == code) {
            return Err(AppError::PreconditionFailed("book stock is still referenced".to_string()));
        }
        inner.tables.stocks.remove(code).ok_or_else(|| not_found("book stock"))?;
        inner.tables.writes += 1;
        Ok(())
    }
}

#[async_trait]
impl TransactionRepository for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<BookTransaction> {
        self.transaction(id).ok_or_else(|| not_found("book transaction"))
    }

    async fn find_by_customer_id(&self, customer_id: Uuid) -> AppResult<Vec<BookTransaction>> {
        let rows = self.transactions().into_iter().filter(|t| t.customer_id == customer_id).collect();
        Ok(newest_first(rows, |t: &BookTransaction| t.borrowed_at))
    }

    async fn find_by_book_id(&self, book_id: Uuid) -> AppResult<Vec<BookTransaction>> {
        let rows = self.transactions().into_iter().filter(|t| t.book_id == book_id).collect();
        Ok(newest_first(rows, |t: &BookTransaction| t.borrowed_at))
    }

    async fn find_by_stock_code(&self, code: &str) -> AppResult<Vec<BookTransaction>> {
        let rows = self.transactions().into_iter().filter(|t| t.stock_code == code).collect();
        Ok(newest_first(rows, |t: &BookTransaction| t.borrowed_at))
    }

    async fn find_active_by_stock_code(&self, code: &str) -> AppResult<Option<BookTransaction>> {
        Ok(self
            .transactions()
            .into_iter()
            .find(|t| t.stock_code == code && t.status.is_active()))
    }

    async fn find_all(&self, request: &PageRequest) -> AppResult<(Vec<BookTransaction>, i64)> {
        Ok(page(self.transactions(), request, |t| t.borrowed_at))
    }

    async fn find_overdue(&self, now: DateTime<Utc>) -> AppResult<Vec<BookTransaction>> {
        let mut rows: Vec<_> = self
            .transactions()
            .into_iter()
            .filter(|t| t.is_late_at(now))
            .collect();
        rows.sort_by_key(|t| t.due_date);
        Ok(rows)
    }

    async fn create(&self, transaction: &BookTransaction) -> AppResult<BookTransaction> {
        self.commit(vec![LendingWrite::InsertTransaction(transaction.clone())]).await?;
        TransactionRepository::find_by_id(self, transaction.id).await
    }

    async fn update(&self, transaction: &BookTransaction) -> AppResult<BookTransaction> {
        let current = TransactionRepository::find_by_id(self, transaction.id).await?;
        self.commit(vec![LendingWrite::UpdateTransaction {
            expected: current.status,
            transaction: transaction.clone(),
        }])
        .await?;
        TransactionRepository::find_by_id(self, transaction.id).await
    }

    async fn update_status(&self, id: Uuid, status: TransactionStatus) -> AppResult<BookTransaction> {
        let current = TransactionRepository::find_by_id(self, id).await?;
        self.commit(vec![LendingWrite::SetTransactionStatus {
            id,
            expected: current.status,
            status,
        }])
        .await?;
        TransactionRepository::find_by_id(self, id).await
    }

    async fn return_book(&self, id: Uuid, return_at: DateTime<Utc>) -> AppResult<BookTransaction> {
        self.commit(vec![LendingWrite::ReturnTransaction { id, return_at }]).await?;
        TransactionRepository::find_by_id(self, id).await
    }

    async fn mark_overdue(&self, id: Uuid) -> AppResult<bool> {
        let mut inner = self.lock();
        match inner.tables.transactions.get_mut(&id) {
            Some(t) if t.status == TransactionStatus::Borrowed => {
                t.status = TransactionStatus::Overdue;
                t.updated_at = Utc::now();
                inner.tables.writes += 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let current = TransactionRepository::find_by_id(self, id).await?;
        self.commit(vec![LendingWrite::DeleteTransaction {
            id,
            expected: current.status,
        }])
        .await
    }
}

#[async_trait]
impl CustomerRepository for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Customer> {
        self.lock()
            .tables
            .customers
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found("customer"))
    }

    async fn find_by_code(&self, code: &str) -> AppResult<Customer> {
        self.lock()
            .tables
            .customers
            .values()
            .find(|c| c.code == code)
            .cloned()
            .ok_or_else(|| not_found("customer"))
    }

    async fn find_all(&self, request: &PageRequest) -> AppResult<(Vec<Customer>, i64)> {
        let rows = self.lock().tables.customers.values().cloned().collect();
        Ok(page(rows, request, |c: &Customer| c.created_at))
    }

    async fn create(&self, customer: &CreateCustomer) -> AppResult<Customer> {
        let mut inner = self.lock();
        if inner.tables.customers.values().any(|c| c.code == customer.code) {
            return Err(AppError::Conflict("customer already exists".to_string()));
        }
        let now = Utc::now();
        let customer = Customer {
            id: Uuid::new_v4(),
            code: customer.code.clone(),
            name: customer.name.clone(),
            created_at: now,
            updated_at: now,
        };
        inner.tables.customers.insert(customer.id, customer.clone());
        inner.tables.writes += 1;
        Ok(customer)
    }

    async fn update(&self, id: Uuid, changes: &UpdateCustomer) -> AppResult<Customer> {
        let mut inner = self.lock();
        if let Some(code) = &changes.code {
            if inner.tables.customers.values().any(|c| c.id != id && &c.code == code) {
                return Err(AppError::Conflict("customer already exists".to_string()));
            }
        }
        let customer = inner.tables.customers.get_mut(&id).ok_or_else(|| not_found("customer"))?;
        if let Some(code) = &changes.code {
            customer.code = code.clone();
        }
        if let Some(name) = &changes.name {
            customer.name = name.clone();
        }
        customer.updated_at = Utc::now();
        let customer = customer.clone();
        inner.tables.writes += 1;
        Ok(customer)
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let mut inner = self.lock();
        if inner.tables.transactions.values().any(|t| t.customer_id == id) {
            return Err(AppError::PreconditionFailed("customer is still referenced".to_string()));
        }
        inner.tables.customers.remove(&id).ok_or_else(|| not_found("customer"))?;
        inner.tables.writes += 1;
        Ok(())
    }
}

#[async_trait]
impl ChargeRepository for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Charge> {
        self.lock()
            .tables
            .charges
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found("charge"))
    }

    async fn find_by_transaction_id(&self, transaction_id: Uuid) -> AppResult<Vec<Charge>> {
        Ok(self
            .lock()
            .tables
            .charges
            .values()
            .filter(|c| c.transaction_id == transaction_id)
            .cloned()
            .collect())
    }

    async fn find_by_user_id(&self, user_id: Uuid) -> AppResult<Vec<Charge>> {
        Ok(self
            .lock()
            .tables
            .charges
            .values()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn find_all(&self, request: &PageRequest) -> AppResult<(Vec<Charge>, i64)> {
        let rows = self.lock().tables.charges.values().cloned().collect();
        Ok(page(rows, request, |c: &Charge| c.created_at))
    }

    async fn create(&self, charge: &Charge) -> AppResult<Charge> {
        let mut inner = self.lock();
        if !inner.tables.transactions.contains_key(&charge.transaction_id)
            || !inner.tables.users.contains_key(&charge.user_id)
        {
            return Err(AppError::PreconditionFailed("referenced record does not exist".to_string()));
        }
        inner.tables.charges.insert(charge.id, charge.clone());
        inner.tables.writes += 1;
        Ok(charge.clone())
    }

    async fn update(&self, charge: &Charge) -> AppResult<Charge> {
        let mut inner = self.lock();
        let stored = inner.tables.charges.get_mut(&charge.id).ok_or_else(|| not_found("charge"))?;
        *stored = Charge {
            updated_at: Utc::now(),
            ..charge.clone()
        };
        let stored = stored.clone();
        inner.tables.writes += 1;
        Ok(stored)
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let mut inner = self.lock();
        inner.tables.charges.remove(&id).ok_or_else(|| not_found("charge"))?;
        inner.tables.writes += 1;
        Ok(())
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<User> {
        self.lock().tables.users.get(&id).cloned().ok_or_else(|| not_found("user"))
    }

    async fn find_by_email(&self, email: &str) -> AppResult<User> {
        self.lock()
            .tables
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned()
            .ok_or_else(|| not_found("user"))
    }

    async fn create(&self, name: &str, email: &str, password_hash: &str, role: Role) -> AppResult<User> {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            role,
            created_at: now,
            updated_at: now,
        };
        let mut inner = self.lock();
        if inner.tables.users.values().any(|u| u.email.eq_ignore_ascii_case(email)) {
            return Err(AppError::Conflict("user already exists".to_string()));
        }
        inner.tables.users.insert(user.id, user.clone());
        inner.tables.writes += 1;
        Ok(user)
    }
}

#[async_trait]
impl LendingStore for MemoryStore {
    async fn commit(&self, writes: Vec<LendingWrite>) -> AppResult<()> {
        let mut inner = self.lock();
        let mut staged = inner.tables.clone();
        for write in &writes {
            staged.apply(write, inner.fail_stock_writes)?;
        }
        inner.tables = staged;
        Ok(())
    }
}

pub fn fee(value: i64) -> Decimal {
    Decimal::new(value, 2)
}
