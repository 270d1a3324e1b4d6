//! Biblio Server - Library Lending Backend
//!
//! REST API server for books, stock copies, customers, lending
//! transactions and late-fee charges.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    routing::{get, patch, post},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use biblio_server::{
    api, config::AppConfig, repository::Repository, services::Services, AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("biblio_server={},tower_http=debug", config.logging.level).into());

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting Biblio Server v{}", env!("CARGO_PKG_VERSION"));

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await?;

    tracing::info!("Connected to database");

    sqlx::migrate!("./migrations").run(&pool).await?;

    tracing::info!("Database migrations completed");

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);

    let repository = Repository::new(pool);
    let services = Arc::new(Services::new(
        repository,
        config.auth.clone(),
        config.lending.clone(),
        config.filter_grammar(),
    ));

    services.auth.ensure_admin().await?;

    if let Some(secs) = config.lending.overdue_sweep_interval_secs {
        spawn_overdue_sweep(services.clone(), Duration::from_secs(secs));
    }

    let state = AppState {
        config: Arc::new(config),
        services,
    };

    let app = create_router(state);

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Periodically flag late loans as overdue
fn spawn_overdue_sweep(services: Arc<Services>, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            match services.transactions.get_overdue().await {
                Ok(overdue) => tracing::debug!("Overdue sweep: {} transaction(s) overdue", overdue.len()),
                Err(e) => tracing::warn!("Overdue sweep failed: {}", e),
            }
        }
    });
}

/// Create the application router with all routes
fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        .route("/ready", get(api::health::readiness_check))
        // Authentication
        .route("/auth/register", post(api::auth::register))
        .route("/auth/login", post(api::auth::login))
        .route("/auth/me", get(api::auth::me))
        // Books
        .route("/books", get(api::books::list_books).post(api::books::create_book))
        .route(
            "/books/:id",
            get(api::books::get_book)
                .put(api::books::update_book)
                .delete(api::books::delete_book),
        )
        .route("/books/:id/stocks", get(api::books::get_book_stocks))
        .route("/books/:id/stocks/available", get(api::books::get_available_book_stocks))
        // Stocks
        .route("/stocks", get(api::stocks::list_stocks).post(api::stocks::create_stock))
        .route(
            "/stocks/:code",
            get(api::stocks::get_stock)
                .put(api::stocks::update_stock)
                .delete(api::stocks::delete_stock),
        )
        .route("/stocks/:code/status", patch(api::stocks::update_stock_status))
        // Customers
        .route(
            "/customers",
            get(api::customers::list_customers).post(api::customers::create_customer),
        )
        .route("/customers/code/:code", get(api::customers::get_customer_by_code))
        .route(
            "/customers/:id",
            get(api::customers::get_customer)
                .put(api::customers::update_customer)
                .delete(api::customers::delete_customer),
        )
        .route("/customers/:id/transactions", get(api::customers::get_customer_transactions))
        // Transactions
        .route(
            "/transactions",
            get(api::transactions::list_transactions).post(api::transactions::create_transaction),
        )
        .route("/transactions/overdue", get(api::transactions::get_overdue_transactions))
        .route(
            "/transactions/customer/:id",
            get(api::transactions::get_transactions_by_customer),
        )
        .route("/transactions/book/:id", get(api::transactions::get_transactions_by_book))
        .route("/transactions/stock/:code", get(api::transactions::get_transactions_by_stock))
        .route(
            "/transactions/:id",
            get(api::transactions::get_transaction)
                .put(api::transactions::update_transaction)
                .delete(api::transactions::delete_transaction),
        )
        .route("/transactions/:id/status", patch(api::transactions::update_transaction_status))
        .route("/transactions/:id/return", post(api::transactions::return_book))
        // Charges
        .route("/charges", get(api::charges::list_charges).post(api::charges::create_charge))
        .route(
            "/charges/transaction/:id",
            get(api::charges::get_charges_by_transaction),
        )
        .route("/charges/user/:id", get(api::charges::get_charges_by_user))
        .route(
            "/charges/:id",
            get(api::charges::get_charge)
                .put(api::charges::update_charge)
                .delete(api::charges::delete_charge),
        )
        .with_state(state);

    let openapi = api::openapi::create_openapi_router();

    Router::new()
        .nest("/api", api)
        .merge(openapi)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(cors),
        )
}
