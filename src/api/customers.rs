//! Customer endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        customer::{CreateCustomer, CustomerWithTransactions, UpdateCustomer},
        ApiResponse, Customer, ListQuery, MessageResponse, Paginated,
    },
};

use super::AuthenticatedUser;

/// List customers
#[utoipa::path(
    get,
    path = "/customers",
    tag = "customers",
    security(("bearer_auth" = [])),
    params(ListQuery),
    responses(
        (status = 200, description = "Page of customers", body = Paginated<Customer>)
    )
)]
pub async fn list_customers(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Paginated<Customer>>> {
    let page = state.services.customers.list(&query).await?;
    Ok(Json(page))
}

/// Get a customer by ID
#[utoipa::path(
    get,
    path = "/customers/{id}",
    tag = "customers",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Customer ID")),
    responses(
        (status = 200, description = "Customer details", body = ApiResponse<Customer>),
        (status = 404, description = "Customer not found")
    )
)]
pub async fn get_customer(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Customer>>> {
    let customer = state.services.customers.get(id).await?;
    Ok(Json(ApiResponse::ok("Customer retrieved successfully", customer)))
}

/// Get a customer by card code
#[utoipa::path(
    get,
    path = "/customers/code/{code}",
    tag = "customers",
    security(("bearer_auth" = [])),
    params(("code" = String, Path, description = "Customer code")),
    responses(
        (status = 200, description = "Customer details", body = ApiResponse<Customer>),
        (status = 404, description = "Customer not found")
    )
)]
pub async fn get_customer_by_code(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(code): Path<String>,
) -> AppResult<Json<ApiResponse<Customer>>> {
    let customer = state.services.customers.get_by_code(&code).await?;
    Ok(Json(ApiResponse::ok("Customer retrieved successfully", customer)))
}

/// Customer together with their transactions
#[utoipa::path(
    get,
    path = "/customers/{id}/transactions",
    tag = "customers",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Customer ID")),
    responses(
        (status = 200, description = "Customer with transactions", body = ApiResponse<CustomerWithTransactions>),
        (status = 404, description = "Customer not found")
    )
)]
pub async fn get_customer_transactions(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<CustomerWithTransactions>>> {
    let customer = state.services.customers.get_with_transactions(id).await?;
    Ok(Json(ApiResponse::ok("Customer transactions retrieved successfully", customer)))
}

/// Create a customer
#[utoipa::path(
    post,
    path = "/customers",
    tag = "customers",
    security(("bearer_auth" = [])),
    request_body = CreateCustomer,
    responses(
        (status = 201, description = "Customer created", body = ApiResponse<Customer>),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Customer code already exists")
    )
)]
pub async fn create_customer(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateCustomer>,
) -> AppResult<(StatusCode, Json<ApiResponse<Customer>>)> {
    claims.require_admin()?;

    let customer = state.services.customers.create(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::created("Customer created successfully", customer)),
    ))
}

/// Update a customer
#[utoipa::path(
    put,
    path = "/customers/{id}",
    tag = "customers",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Customer ID")),
    request_body = UpdateCustomer,
    responses(
        (status = 200, description = "Customer updated", body = ApiResponse<Customer>),
        (status = 404, description = "Customer not found"),
        (status = 409, description = "Customer code already exists")
    )
)]
pub async fn update_customer(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateCustomer>,
) -> AppResult<Json<ApiResponse<Customer>>> {
    claims.require_admin()?;

    let customer = state.services.customers.update(id, request).await?;
    Ok(Json(ApiResponse::ok("Customer updated successfully", customer)))
}

/// Delete a customer without transactions
#[utoipa::path(
    delete,
    path = "/customers/{id}",
    tag = "customers",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Customer ID")),
    responses(
        (status = 200, description = "Customer deleted", body = MessageResponse),
        (status = 404, description = "Customer not found"),
        (status = 422, description = "Customer has transactions")
    )
)]
pub async fn delete_customer(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    claims.require_admin()?;

    state.services.customers.delete(id).await?;
    Ok(Json(MessageResponse::ok("Customer deleted successfully")))
}
