//! User management service
//!
//! Identity, credentials and group membership live in a Cognito user pool;
//! postal addresses are stored locally in PostgreSQL.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod services;
pub mod validators;

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::middleware::JwtVerifier;
use crate::services::{AddressBook, UserDirectory};

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<UserDirectory>,
    pub addresses: Arc<AddressBook>,
    pub verifier: Arc<JwtVerifier>,
}

/// Full HTTP application: health probe plus the versioned API
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api::routes(state.clone()))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
