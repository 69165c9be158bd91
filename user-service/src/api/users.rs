use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use tracing::warn;

use super::extract::{Path, ValidatedJson};
use crate::error::{ApiResponse, Result};
use crate::middleware::AuthenticatedUser;
use crate::models::{Address, AddressRequest, UserProfile};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(users_root))
        .route("/me", get(get_my_profile))
        .route("/me/addresses", get(list_my_addresses).post(add_my_address))
        .route(
            "/me/addresses/:address_id",
            put(update_my_address).delete(delete_my_address),
        )
}

async fn users_root() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::error("No static resource api/v1/users.")),
    )
}

/// Provider profile of the caller; falls back to token claims when the
/// identity provider cannot be reached
async fn get_my_profile(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Json<UserProfile> {
    match state.users.get_profile(&user.sub).await {
        Ok(profile) => Json(profile),
        Err(e) => {
            warn!(sub = %user.sub, error = %e, "Profile lookup failed, answering from token claims");
            Json(user.fallback_profile())
        }
    }
}

async fn add_my_address(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ValidatedJson(request): ValidatedJson<AddressRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Address>>)> {
    let address = state.addresses.add(&user.sub, request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Address added successfully", address)),
    ))
}

async fn list_my_addresses(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<ApiResponse<Vec<Address>>>> {
    let addresses = state.addresses.list(&user.sub).await?;
    Ok(Json(ApiResponse::success(
        "Addresses retrieved successfully",
        addresses,
    )))
}

async fn update_my_address(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(address_id): Path<i64>,
    ValidatedJson(request): ValidatedJson<AddressRequest>,
) -> Result<Json<ApiResponse<Address>>> {
    let address = state.addresses.update(&user.sub, address_id, request).await?;
    Ok(Json(ApiResponse::success(
        "Address updated successfully",
        address,
    )))
}

async fn delete_my_address(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(address_id): Path<i64>,
) -> Result<Json<ApiResponse<()>>> {
    state.addresses.delete(&user.sub, address_id).await?;
    Ok(Json(ApiResponse::ok("Address deleted successfully")))
}
