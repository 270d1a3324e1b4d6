//! Lending store and repository tests against a real Postgres
//!
//! Run with a disposable database:
//! `DATABASE_URL=postgres://... cargo test --test pg_lending_tests -- --ignored`

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tokio_test::{assert_err, assert_ok};
use uuid::Uuid;

use biblio_server::{
    config::{AuthConfig, LendingConfig},
    error::AppError,
    filter::FilterGrammar,
    models::{
        book::CreateBook,
        charge::CreateCharge,
        customer::CreateCustomer,
        stock::{BookStock, CreateStock, StockStatus},
        transaction::{BookTransaction, CreateTransaction, TransactionStatus},
        user::RegisterRequest,
        Customer, ListQuery,
    },
    repository::{LendingWrite, Repository},
    services::{charges::MAX_DAILY_LATE_FEE, Services},
};

async fn pool() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPoolOptions::new()
        .max_connections(24)
        .connect(&url)
        .await
        .expect("Failed to connect to Postgres");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}

fn services(pool: &PgPool) -> Services {
    Services::new(
        Repository::new(pool.clone()),
        AuthConfig::default(),
        LendingConfig::default(),
        FilterGrammar::default(),
    )
}

fn unique(prefix: &str) -> String {
    format!("{}-{}", prefix, &Uuid::new_v4().simple().to_string()[..12])
}

/// A fresh book with one Available copy, and a customer
async fn shelf(services: &Services) -> (BookStock, Customer) {
    let book = services
        .books
        .create(CreateBook {
            title: "The Left Hand of Darkness".to_string(),
            description: None,
            cover_url: None,
        })
        .await
        .expect("Failed to create book");
    let stock = services
        .stocks
        .create(CreateStock {
            code: unique("BK"),
            book_id: book.id,
            status: None,
        })
        .await
        .expect("Failed to create stock");
    let customer = services
        .customers
        .create(CreateCustomer {
            code: unique("C"),
            name: "Genly Ai".to_string(),
        })
        .await
        .expect("Failed to create customer");
    (stock, customer)
}

fn loan(stock: &BookStock, customer: &Customer) -> BookTransaction {
    let now = Utc::now();
    BookTransaction {
        id: Uuid::new_v4(),
        book_id: stock.book_id,
        stock_code: stock.code.clone(),
        customer_id: customer.id,
        due_date: now + Duration::days(7),
        status: TransactionStatus::Borrowed,
        borrowed_at: now,
        return_at: None,
        created_at: now,
        updated_at: now,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
#[ignore]
async fn test_concurrent_creates_lend_a_copy_once() {
    let pool = pool().await;
    let services = services(&pool);
    let (stock, customer) = shelf(&services).await;

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let services = services.clone();
            let request = CreateTransaction {
                stock_code: stock.code.clone(),
                customer_id: customer.id,
                status: None,
            };
            tokio::spawn(async move { services.transactions.create(request).await })
        })
        .collect();

    let mut successes = 0;
    for handle in handles {
        match handle.await.expect("task panicked") {
            Ok(_) => successes += 1,
            Err(AppError::Conflict(_)) | Err(AppError::PreconditionFailed(_)) => {}
            Err(other) => panic!("unexpected error: {:?}", other),
        }
    }
    assert_eq!(successes, 1);

    let active: Vec<_> = services
        .transactions
        .by_stock_code(&stock.code)
        .await
        .unwrap()
        .into_iter()
        .filter(|t| t.status.is_active())
        .collect();
    assert_eq!(active.len(), 1);
    assert_eq!(
        services.stocks.get(&stock.code).await.unwrap().status,
        StockStatus::Borrowed
    );
}

#[tokio::test]
#[ignore]
async fn test_failed_stock_write_rolls_back_insert() {
    let pool = pool().await;
    let services = services(&pool);
    let repository = Repository::new(pool.clone());
    let (stock, customer) = shelf(&services).await;
    let transaction = loan(&stock, &customer);

    let err = repository
        .lending
        .commit(vec![
            LendingWrite::InsertTransaction(transaction.clone()),
            LendingWrite::force_stock_borrowed(unique("missing")),
        ])
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    assert_err!(repository.transactions.find_by_id(transaction.id).await);
    assert_eq!(
        repository.stocks.find_by_code(&stock.code).await.unwrap().status,
        StockStatus::Available
    );
}

#[tokio::test]
#[ignore]
async fn test_acquire_is_compare_and_swap() {
    let pool = pool().await;
    let services = services(&pool);
    let repository = Repository::new(pool.clone());
    let (stock, customer) = shelf(&services).await;

    let lost = assert_ok!(repository.stocks.update_status(&stock.code, StockStatus::Lost).await);
    assert_eq!(lost.status, StockStatus::Lost);

    let transaction = loan(&stock, &customer);
    let err = repository
        .lending
        .commit(vec![
            LendingWrite::acquire_stock(&stock.code),
            LendingWrite::InsertTransaction(transaction.clone()),
        ])
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    assert_err!(repository.transactions.find_by_id(transaction.id).await);
    assert_eq!(
        repository.stocks.find_by_code(&stock.code).await.unwrap().status,
        StockStatus::Lost
    );
}

#[tokio::test]
#[ignore]
async fn test_transaction_facade_writes() {
    let pool = pool().await;
    let services = services(&pool);
    let repository = Repository::new(pool.clone());
    let (stock, customer) = shelf(&services).await;

    let first = assert_ok!(repository.transactions.create(&loan(&stock, &customer)).await);

    // Partial unique index: one open loan per copy
    let err = repository
        .transactions
        .create(&loan(&stock, &customer))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let mut extended = first.clone();
    extended.due_date = first.due_date + Duration::days(14);
    let updated = assert_ok!(repository.transactions.update(&extended).await);
    assert_eq!(updated.due_date.timestamp(), extended.due_date.timestamp());

    let overdue = assert_ok!(
        repository
            .transactions
            .update_status(first.id, TransactionStatus::Overdue)
            .await
    );
    assert_eq!(overdue.status, TransactionStatus::Overdue);

    let returned = assert_ok!(repository.transactions.return_book(first.id, Utc::now()).await);
    assert_eq!(returned.status, TransactionStatus::Returned);
    assert!(returned.return_at.is_some());

    let err = repository
        .transactions
        .return_book(first.id, Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::PreconditionFailed(_)));

    // The copy is free again for a new open loan
    let second = assert_ok!(repository.transactions.create(&loan(&stock, &customer)).await);

    assert_ok!(repository.transactions.delete(second.id).await);
    assert_ok!(repository.transactions.delete(first.id).await);
    let err = repository.transactions.delete(first.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
#[ignore]
async fn test_charge_total_survives_storage() {
    let pool = pool().await;
    let services = services(&pool);
    let (stock, customer) = shelf(&services).await;

    let created = services
        .transactions
        .create(CreateTransaction {
            stock_code: stock.code.clone(),
            customer_id: customer.id,
            status: None,
        })
        .await
        .unwrap();
    let clerk = services
        .auth
        .register(RegisterRequest {
            name: "Clerk".to_string(),
            email: format!("{}@example.org", unique("clerk")),
            password: "long-enough-password".to_string(),
        })
        .await
        .unwrap();

    for (days_late, daily_late_fee) in [
        (10, dec!(0.25)),
        (3, dec!(0.500)),
        (i32::MAX, MAX_DAILY_LATE_FEE),
    ] {
        let charge = services
            .charges
            .create(
                clerk.id,
                CreateCharge {
                    transaction_id: created.transaction.id,
                    days_late: Some(days_late),
                    daily_late_fee,
                },
            )
            .await
            .unwrap();

        let stored = services.charges.get(charge.id).await.unwrap();
        assert_eq!(stored.days_late, days_late);
        assert_eq!(stored.daily_late_fee, daily_late_fee);
        assert_eq!(stored.total, Decimal::from(stored.days_late) * stored.daily_late_fee);
    }

    let err = services
        .charges
        .create(
            clerk.id,
            CreateCharge {
                transaction_id: created.transaction.id,
                days_late: Some(10),
                daily_late_fee: dec!(0.005),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
#[ignore]
async fn test_list_rejects_bad_input_before_storage() {
    let pool = pool().await;
    let services = services(&pool);

    let err = services
        .transactions
        .list(&ListQuery {
            filter: Some("due_date:not-a-date:lessthan".to_string()),
            ..ListQuery::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let page = services
        .customers
        .list(&ListQuery {
            page: Some(i64::MAX),
            per_page: Some(100),
            ..ListQuery::default()
        })
        .await
        .unwrap();
    assert!(page.data.is_empty());
}
