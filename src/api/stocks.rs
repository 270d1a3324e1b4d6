//! Book stock (physical copy) endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{
        stock::{CreateStock, UpdateStock, UpdateStockStatus},
        ApiResponse, BookStock, ListQuery, MessageResponse, Paginated,
    },
};

use super::AuthenticatedUser;

/// List book stocks with pagination, search and filters
#[utoipa::path(
    get,
    path = "/stocks",
    tag = "stocks",
    security(("bearer_auth" = [])),
    params(ListQuery),
    responses(
        (status = 200, description = "Page of stocks", body = Paginated<BookStock>),
        (status = 400, description = "Malformed or unknown filter")
    )
)]
pub async fn list_stocks(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Paginated<BookStock>>> {
    let page = state.services.stocks.list(&query).await?;
    Ok(Json(page))
}

/// Get a stock by code
#[utoipa::path(
    get,
    path = "/stocks/{code}",
    tag = "stocks",
    security(("bearer_auth" = [])),
    params(("code" = String, Path, description = "Stock code")),
    responses(
        (status = 200, description = "Stock details", body = ApiResponse<BookStock>),
        (status = 404, description = "Stock not found")
    )
)]
pub async fn get_stock(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(code): Path<String>,
) -> AppResult<Json<ApiResponse<BookStock>>> {
    let stock = state.services.stocks.get(&code).await?;
    Ok(Json(ApiResponse::ok("Book stock retrieved successfully", stock)))
}

/// Register a new copy of a book
#[utoipa::path(
    post,
    path = "/stocks",
    tag = "stocks",
    security(("bearer_auth" = [])),
    request_body = CreateStock,
    responses(
        (status = 201, description = "Stock created", body = ApiResponse<BookStock>),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "Book not found"),
        (status = 409, description = "Stock code already exists")
    )
)]
pub async fn create_stock(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateStock>,
) -> AppResult<(StatusCode, Json<ApiResponse<BookStock>>)> {
    claims.require_admin()?;

    let stock = state.services.stocks.create(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::created("Book stock created successfully", stock)),
    ))
}

/// Update a stock
#[utoipa::path(
    put,
    path = "/stocks/{code}",
    tag = "stocks",
    security(("bearer_auth" = [])),
    params(("code" = String, Path, description = "Stock code")),
    request_body = UpdateStock,
    responses(
        (status = 200, description = "Stock updated", body = ApiResponse<BookStock>),
        (status = 404, description = "Stock or book not found"),
        (status = 422, description = "Stock is on loan")
    )
)]
pub async fn update_stock(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(code): Path<String>,
    Json(request): Json<UpdateStock>,
) -> AppResult<Json<ApiResponse<BookStock>>> {
    claims.require_admin()?;

    let stock = state.services.stocks.update(&code, request).await?;
    Ok(Json(ApiResponse::ok("Book stock updated successfully", stock)))
}

/// Change the status of a stock that is not on loan
#[utoipa::path(
    patch,
    path = "/stocks/{code}/status",
    tag = "stocks",
    security(("bearer_auth" = [])),
    params(("code" = String, Path, description = "Stock code")),
    request_body = UpdateStockStatus,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<BookStock>),
        (status = 400, description = "Status cannot be set directly"),
        (status = 404, description = "Stock not found"),
        (status = 422, description = "Stock is on loan")
    )
)]
pub async fn update_stock_status(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(code): Path<String>,
    Json(request): Json<UpdateStockStatus>,
) -> AppResult<Json<ApiResponse<BookStock>>> {
    claims.require_admin()?;

    let stock = state.services.stocks.set_status(&code, request.status).await?;
    Ok(Json(ApiResponse::ok("Book stock status updated successfully", stock)))
}

/// Delete a stock
#[utoipa::path(
    delete,
    path = "/stocks/{code}",
    tag = "stocks",
    security(("bearer_auth" = [])),
    params(("code" = String, Path, description = "Stock code")),
    responses(
        (status = 200, description = "Stock deleted", body = MessageResponse),
        (status = 404, description = "Stock not found"),
        (status = 422, description = "Stock is referenced by transactions")
    )
)]
pub async fn delete_stock(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(code): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    claims.require_admin()?;

    state.services.stocks.delete(&code).await?;
    Ok(Json(MessageResponse::ok("Book stock deleted successfully")))
}
