//! Lending transaction endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        transaction::{
            CreateTransaction, ReturnBook, UpdateTransaction, UpdateTransactionStatus,
        },
        ApiResponse, BookTransaction, ListQuery, ListResponse, MessageResponse, Paginated,
        TransactionDetails,
    },
};

use super::AuthenticatedUser;

/// List transactions with pagination, search and filters
#[utoipa::path(
    get,
    path = "/transactions",
    tag = "transactions",
    security(("bearer_auth" = [])),
    params(ListQuery),
    responses(
        (status = 200, description = "Page of transactions", body = Paginated<BookTransaction>),
        (status = 400, description = "Malformed or unknown filter")
    )
)]
pub async fn list_transactions(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Paginated<BookTransaction>>> {
    let page = state.services.transactions.list(&query).await?;
    Ok(Json(page))
}

/// Get a transaction with its book, stock, customer and charges
#[utoipa::path(
    get,
    path = "/transactions/{id}",
    tag = "transactions",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Transaction ID")),
    responses(
        (status = 200, description = "Transaction details", body = ApiResponse<TransactionDetails>),
        (status = 404, description = "Transaction not found")
    )
)]
pub async fn get_transaction(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<TransactionDetails>>> {
    let transaction = state.services.transactions.get(id).await?;
    Ok(Json(ApiResponse::ok("Transaction retrieved successfully", transaction)))
}

/// Lend a copy to a customer
#[utoipa::path(
    post,
    path = "/transactions",
    tag = "transactions",
    security(("bearer_auth" = [])),
    request_body = CreateTransaction,
    responses(
        (status = 201, description = "Transaction created", body = ApiResponse<TransactionDetails>),
        (status = 400, description = "Invalid status"),
        (status = 404, description = "Stock or customer not found"),
        (status = 409, description = "Stock was lent concurrently"),
        (status = 422, description = "Stock is not available")
    )
)]
pub async fn create_transaction(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateTransaction>,
) -> AppResult<(StatusCode, Json<ApiResponse<TransactionDetails>>)> {
    claims.require_admin()?;

    let transaction = state.services.transactions.create(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::created("Transaction created successfully", transaction)),
    ))
}

/// Update a transaction, moving the loan to another copy if the stock code changes
#[utoipa::path(
    put,
    path = "/transactions/{id}",
    tag = "transactions",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Transaction ID")),
    request_body = UpdateTransaction,
    responses(
        (status = 200, description = "Transaction updated", body = ApiResponse<TransactionDetails>),
        (status = 404, description = "Transaction, stock or customer not found"),
        (status = 422, description = "Target stock is not available")
    )
)]
pub async fn update_transaction(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateTransaction>,
) -> AppResult<Json<ApiResponse<TransactionDetails>>> {
    claims.require_admin()?;

    let transaction = state.services.transactions.update(id, request).await?;
    Ok(Json(ApiResponse::ok("Transaction updated successfully", transaction)))
}

/// Delete a transaction, releasing its copy if still on loan
#[utoipa::path(
    delete,
    path = "/transactions/{id}",
    tag = "transactions",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Transaction ID")),
    responses(
        (status = 200, description = "Transaction deleted", body = MessageResponse),
        (status = 404, description = "Transaction not found")
    )
)]
pub async fn delete_transaction(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    claims.require_admin()?;

    state.services.transactions.delete(id).await?;
    Ok(Json(MessageResponse::ok("Transaction deleted successfully")))
}

/// Set the status of a transaction (Borrowed or Returned)
#[utoipa::path(
    patch,
    path = "/transactions/{id}/status",
    tag = "transactions",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Transaction ID")),
    request_body = UpdateTransactionStatus,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<TransactionDetails>),
        (status = 400, description = "Status cannot be set directly"),
        (status = 404, description = "Transaction not found"),
        (status = 409, description = "Stock is lent elsewhere")
    )
)]
pub async fn update_transaction_status(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateTransactionStatus>,
) -> AppResult<Json<ApiResponse<TransactionDetails>>> {
    claims.require_admin()?;

    let transaction = state
        .services
        .transactions
        .update_status(id, request.status)
        .await?;
    Ok(Json(ApiResponse::ok("Transaction status updated successfully", transaction)))
}

/// Return the copy lent by a transaction
#[utoipa::path(
    post,
    path = "/transactions/{id}/return",
    tag = "transactions",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Transaction ID")),
    request_body(content = ReturnBook, description = "Optional return date, defaults to now"),
    responses(
        (status = 200, description = "Book returned", body = ApiResponse<TransactionDetails>),
        (status = 404, description = "Transaction not found"),
        (status = 422, description = "Transaction already returned")
    )
)]
pub async fn return_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    body: Option<Json<ReturnBook>>,
) -> AppResult<Json<ApiResponse<TransactionDetails>>> {
    claims.require_admin()?;

    let request = body.map(|Json(request)| request).unwrap_or_default();
    let transaction = state.services.transactions.return_book(id, request).await?;
    Ok(Json(ApiResponse::ok("Book returned successfully", transaction)))
}

/// Flag late loans as overdue and list every overdue transaction
#[utoipa::path(
    get,
    path = "/transactions/overdue",
    tag = "transactions",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Overdue transactions", body = ListResponse<BookTransaction>)
    )
)]
pub async fn get_overdue_transactions(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> AppResult<Json<ListResponse<BookTransaction>>> {
    let overdue = state.services.transactions.get_overdue().await?;
    Ok(Json(ListResponse::ok("Overdue transactions retrieved successfully", overdue)))
}

/// Transactions of a customer
#[utoipa::path(
    get,
    path = "/transactions/customer/{id}",
    tag = "transactions",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Customer ID")),
    responses(
        (status = 200, description = "Customer transactions", body = ListResponse<BookTransaction>)
    )
)]
pub async fn get_transactions_by_customer(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(customer_id): Path<Uuid>,
) -> AppResult<Json<ListResponse<BookTransaction>>> {
    let transactions = state.services.transactions.by_customer(customer_id).await?;
    Ok(Json(ListResponse::ok("Transactions retrieved successfully", transactions)))
}

/// Transactions of a book
#[utoipa::path(
    get,
    path = "/transactions/book/{id}",
    tag = "transactions",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book transactions", body = ListResponse<BookTransaction>)
    )
)]
pub async fn get_transactions_by_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(book_id): Path<Uuid>,
) -> AppResult<Json<ListResponse<BookTransaction>>> {
    let transactions = state.services.transactions.by_book(book_id).await?;
    Ok(Json(ListResponse::ok("Transactions retrieved successfully", transactions)))
}

/// Transactions of a single copy
#[utoipa::path(
    get,
    path = "/transactions/stock/{code}",
    tag = "transactions",
    security(("bearer_auth" = [])),
    params(("code" = String, Path, description = "Stock code")),
    responses(
        (status = 200, description = "Stock transactions", body = ListResponse<BookTransaction>)
    )
)]
pub async fn get_transactions_by_stock(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(code): Path<String>,
) -> AppResult<Json<ListResponse<BookTransaction>>> {
    let transactions = state.services.transactions.by_stock_code(&code).await?;
    Ok(Json(ListResponse::ok("Transactions retrieved successfully", transactions)))
}
