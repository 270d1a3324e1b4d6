//! Late-fee charge endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        charge::{CreateCharge, UpdateCharge},
        ApiResponse, Charge, ListQuery, ListResponse, MessageResponse, Paginated,
    },
};

use super::AuthenticatedUser;

/// List charges
#[utoipa::path(
    get,
    path = "/charges",
    tag = "charges",
    security(("bearer_auth" = [])),
    params(ListQuery),
    responses(
        (status = 200, description = "Page of charges", body = Paginated<Charge>)
    )
)]
pub async fn list_charges(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Paginated<Charge>>> {
    let page = state.services.charges.list(&query).await?;
    Ok(Json(page))
}

/// Get a charge by ID
#[utoipa::path(
    get,
    path = "/charges/{id}",
    tag = "charges",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Charge ID")),
    responses(
        (status = 200, description = "Charge details", body = ApiResponse<Charge>),
        (status = 404, description = "Charge not found")
    )
)]
pub async fn get_charge(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Charge>>> {
    let charge = state.services.charges.get(id).await?;
    Ok(Json(ApiResponse::ok("Charge retrieved successfully", charge)))
}

/// Record a late-fee charge against a transaction
///
/// The charge is attributed to the authenticated staff member.
#[utoipa::path(
    post,
    path = "/charges",
    tag = "charges",
    security(("bearer_auth" = [])),
    request_body = CreateCharge,
    responses(
        (status = 201, description = "Charge created", body = ApiResponse<Charge>),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "Transaction not found")
    )
)]
pub async fn create_charge(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateCharge>,
) -> AppResult<(StatusCode, Json<ApiResponse<Charge>>)> {
    let charge = state
        .services
        .charges
        .create(claims.user_id(), request)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::created("Charge created successfully", charge)),
    ))
}

/// Update a charge, recomputing its total
#[utoipa::path(
    put,
    path = "/charges/{id}",
    tag = "charges",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Charge ID")),
    request_body = UpdateCharge,
    responses(
        (status = 200, description = "Charge updated", body = ApiResponse<Charge>),
        (status = 404, description = "Charge not found")
    )
)]
pub async fn update_charge(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateCharge>,
) -> AppResult<Json<ApiResponse<Charge>>> {
    claims.require_admin()?;

    let charge = state.services.charges.update(id, request).await?;
    Ok(Json(ApiResponse::ok("Charge updated successfully", charge)))
}

/// Delete a charge
#[utoipa::path(
    delete,
    path = "/charges/{id}",
    tag = "charges",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Charge ID")),
    responses(
        (status = 200, description = "Charge deleted", body = MessageResponse),
        (status = 404, description = "Charge not found")
    )
)]
pub async fn delete_charge(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    claims.require_admin()?;

    state.services.charges.delete(id).await?;
    Ok(Json(MessageResponse::ok("Charge deleted successfully")))
}

/// Charges of a transaction
#[utoipa::path(
    get,
    path = "/charges/transaction/{id}",
    tag = "charges",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Transaction ID")),
    responses(
        (status = 200, description = "Transaction charges", body = ListResponse<Charge>)
    )
)]
pub async fn get_charges_by_transaction(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(transaction_id): Path<Uuid>,
) -> AppResult<Json<ListResponse<Charge>>> {
    let charges = state.services.charges.by_transaction(transaction_id).await?;
    Ok(Json(ListResponse::ok("Charges retrieved successfully", charges)))
}

/// Charges recorded by a staff member
#[utoipa::path(
    get,
    path = "/charges/user/{id}",
    tag = "charges",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User charges", body = ListResponse<Charge>)
    )
)]
pub async fn get_charges_by_user(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<ListResponse<Charge>>> {
    let charges = state.services.charges.by_user(user_id).await?;
    Ok(Json(ListResponse::ok("Charges retrieved successfully", charges)))
}
