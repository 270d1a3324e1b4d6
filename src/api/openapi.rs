//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, books, charges, customers, health, stocks, transactions};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Biblio API",
        version = "1.0.0",
        description = "Library lending REST API"
    ),
    servers(
        (url = "/api", description = "API")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::register,
        auth::login,
        auth::me,
        // Books
        books::list_books,
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        books::get_book_stocks,
        books::get_available_book_stocks,
        // Stocks
        stocks::list_stocks,
        stocks::get_stock,
        stocks::create_stock,
        stocks::update_stock,
        stocks::update_stock_status,
        stocks::delete_stock,
        // Customers
        customers::list_customers,
        customers::get_customer,
        customers::get_customer_by_code,
        customers::get_customer_transactions,
        customers::create_customer,
        customers::update_customer,
        customers::delete_customer,
        // Transactions
        transactions::list_transactions,
        transactions::get_transaction,
        transactions::create_transaction,
        transactions::update_transaction,
        transactions::delete_transaction,
        transactions::update_transaction_status,
        transactions::return_book,
        transactions::get_overdue_transactions,
        transactions::get_transactions_by_customer,
        transactions::get_transactions_by_book,
        transactions::get_transactions_by_stock,
        // Charges
        charges::list_charges,
        charges::get_charge,
        charges::create_charge,
        charges::update_charge,
        charges::delete_charge,
        charges::get_charges_by_transaction,
        charges::get_charges_by_user,
    ),
    components(
        schemas(
            // Auth
            crate::models::user::Role,
            crate::models::user::User,
            crate::models::user::RegisterRequest,
            crate::models::user::LoginRequest,
            crate::models::user::LoginResponse,
            // Books
            crate::models::book::Book,
            crate::models::book::CreateBook,
            crate::models::book::UpdateBook,
            // Stocks
            crate::models::stock::StockStatus,
            crate::models::stock::BookStock,
            crate::models::stock::CreateStock,
            crate::models::stock::UpdateStock,
            crate::models::stock::UpdateStockStatus,
            // Customers
            crate::models::customer::Customer,
            crate::models::customer::CustomerWithTransactions,
            crate::models::customer::CreateCustomer,
            crate::models::customer::UpdateCustomer,
            // Transactions
            crate::models::transaction::TransactionStatus,
            crate::models::transaction::BookTransaction,
            crate::models::transaction::TransactionDetails,
            crate::models::transaction::CreateTransaction,
            crate::models::transaction::UpdateTransaction,
            crate::models::transaction::UpdateTransactionStatus,
            crate::models::transaction::ReturnBook,
            // Charges
            crate::models::charge::Charge,
            crate::models::charge::CreateCharge,
            crate::models::charge::UpdateCharge,
            // Envelopes
            crate::models::response::PaginationMeta,
            crate::models::response::MessageResponse,
            crate::models::response::ListQuery,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Staff authentication"),
        (name = "books", description = "Book catalog"),
        (name = "stocks", description = "Physical copies of books"),
        (name = "customers", description = "Library customers"),
        (name = "transactions", description = "Lending lifecycle"),
        (name = "charges", description = "Late-fee charges")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
