//! Book catalog endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        book::{Book, CreateBook, UpdateBook},
        ApiResponse, BookStock, ListQuery, ListResponse, MessageResponse, Paginated,
    },
};

use super::AuthenticatedUser;

/// List books with pagination, search and filters
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    security(("bearer_auth" = [])),
    params(ListQuery),
    responses(
        (status = 200, description = "Page of books", body = Paginated<Book>),
        (status = 400, description = "Malformed filter")
    )
)]
pub async fn list_books(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Paginated<Book>>> {
    let page = state.services.books.list(&query).await?;
    Ok(Json(page))
}

/// Get a book by ID
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book details", body = ApiResponse<Book>),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Book>>> {
    let book = state.services.books.get(id).await?;
    Ok(Json(ApiResponse::ok("Book retrieved successfully", book)))
}

/// Create a book
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    security(("bearer_auth" = [])),
    request_body = CreateBook,
    responses(
        (status = 201, description = "Book created", body = ApiResponse<Book>),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn create_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateBook>,
) -> AppResult<(StatusCode, Json<ApiResponse<Book>>)> {
    claims.require_admin()?;

    let book = state.services.books.create(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::created("Book created successfully", book)),
    ))
}

/// Update a book
#[utoipa::path(
    put,
    path = "/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Book ID")),
    request_body = UpdateBook,
    responses(
        (status = 200, description = "Book updated", body = ApiResponse<Book>),
        (status = 404, description = "Book not found")
    )
)]
pub async fn update_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateBook>,
) -> AppResult<Json<ApiResponse<Book>>> {
    claims.require_admin()?;

    let book = state.services.books.update(id, request).await?;
    Ok(Json(ApiResponse::ok("Book updated successfully", book)))
}

/// Delete a book that has no copies left
#[utoipa::path(
    delete,
    path = "/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book deleted", body = MessageResponse),
        (status = 404, description = "Book not found"),
        (status = 422, description = "Book still has copies")
    )
)]
pub async fn delete_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    claims.require_admin()?;

    state.services.books.delete(id).await?;
    Ok(Json(MessageResponse::ok("Book deleted successfully")))
}

/// All copies of a book
#[utoipa::path(
    get,
    path = "/books/{id}/stocks",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Copies of the book", body = ListResponse<BookStock>),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book_stocks(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ListResponse<BookStock>>> {
    let stocks = state.services.books.stocks(id).await?;
    Ok(Json(ListResponse::ok("Book stocks retrieved successfully", stocks)))
}

/// Copies of a book that can be lent right now
#[utoipa::path(
    get,
    path = "/books/{id}/stocks/available",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Available copies", body = ListResponse<BookStock>),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_available_book_stocks(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ListResponse<BookStock>>> {
    let stocks = state.services.books.available_stocks(id).await?;
    Ok(Json(ListResponse::ok("Available stocks retrieved successfully", stocks)))
}
