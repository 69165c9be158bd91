mod admin_users;
mod extract;
mod users;

use axum::{middleware, Router};

use crate::middleware::{require_auth, require_super_admin};
use crate::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/users", users::routes())
        .nest(
            "/admin/users",
            admin_users::routes().route_layer(middleware::from_fn(require_super_admin)),
        )
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}
