use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;

use super::extract::{Path, Query, ValidatedJson};
use crate::error::{ApiResponse, AppError, Result};
use crate::middleware::AuthenticatedUser;
use crate::models::{
    CreateUserRequest, UpdateRolesRequest, UpdateStatusRequest, UserPage, UserProfile,
    UserSearchQuery,
};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/search", get(search_by_email))
        .route("/filter", get(filter_users))
        .route("/employees", get(list_employees))
        .route("/:user_id", get(get_user))
        .route("/:user_id/role", put(update_roles))
        .route("/:user_id/status", put(update_status))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListUsersQuery {
    pub limit: Option<i32>,
    pub next_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EmailQuery {
    pub email: Option<String>,
}

async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<ApiResponse<UserPage>>> {
    let next_token = query.next_token.filter(|t| !t.is_empty());
    let page = state.users.list_users(query.limit, next_token).await?;
    Ok(Json(ApiResponse::success("Users retrieved successfully", page)))
}

async fn search_by_email(
    State(state): State<AppState>,
    Query(query): Query<EmailQuery>,
) -> Result<Json<ApiResponse<Vec<UserProfile>>>> {
    let email = query
        .email
        .filter(|e| !e.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("Email parameter is required".to_string()))?;

    let users = state.users.search_by_email(&email).await?;
    Ok(Json(ApiResponse::success("Search completed successfully", users)))
}

async fn filter_users(
    State(state): State<AppState>,
    Query(query): Query<UserSearchQuery>,
) -> Result<Json<ApiResponse<Vec<UserProfile>>>> {
    let users = state.users.search(&query).await?;
    Ok(Json(ApiResponse::success("Search completed successfully", users)))
}

async fn list_employees(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<UserProfile>>>> {
    let users = state.users.employees().await?;
    Ok(Json(ApiResponse::success("Employees retrieved successfully", users)))
}

async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<ApiResponse<UserProfile>>> {
    let profile = state.users.get_profile(&user_id).await?;
    Ok(Json(ApiResponse::success("User retrieved successfully", profile)))
}

async fn create_user(
    State(state): State<AppState>,
    admin: AuthenticatedUser,
    ValidatedJson(request): ValidatedJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserProfile>>)> {
    tracing::info!(admin = %admin.sub, email = %request.email, "Creating user");
    let profile = state.users.create_user(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("User created successfully", profile)),
    ))
}

async fn update_roles(
    State(state): State<AppState>,
    admin: AuthenticatedUser,
    Path(user_id): Path<String>,
    ValidatedJson(request): ValidatedJson<UpdateRolesRequest>,
) -> Result<Json<ApiResponse<()>>> {
    tracing::info!(admin = %admin.sub, user_id = %user_id, "Updating user roles");
    state.users.sync_roles(&user_id, &request.roles).await?;
    Ok(Json(ApiResponse::ok("User roles updated successfully")))
}

async fn update_status(
    State(state): State<AppState>,
    admin: AuthenticatedUser,
    Path(user_id): Path<String>,
    ValidatedJson(request): ValidatedJson<UpdateStatusRequest>,
) -> Result<Json<ApiResponse<()>>> {
    let enabled = request
        .enabled
        .ok_or_else(|| AppError::BadRequest("Enabled status must be provided".to_string()))?;

    tracing::info!(admin = %admin.sub, user_id = %user_id, enabled, "Updating user status");
    state.users.set_enabled(&user_id, enabled).await?;

    let label = if enabled { "enabled" } else { "disabled" };
    Ok(Json(ApiResponse::ok(format!(
        "User status successfully updated to {}",
        label
    ))))
}
