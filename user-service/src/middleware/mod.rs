mod auth;

pub use auth::{require_auth, require_super_admin, AuthenticatedUser, Claims, JwtVerifier};
