use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::services::IdentityProviderError;

pub const ACCESS_DENIED: &str =
    "Access Denied: You do not have the required permissions to perform this action.";

/// Response envelope shared by every JSON endpoint
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub status: &'static str,
    pub message: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            status: "SUCCESS",
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn error_with(message: impl Into<String>, data: T) -> Self {
        Self {
            status: "ERROR",
            message: message.into(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status: "SUCCESS",
            message: message.into(),
            data: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "ERROR",
            message: message.into(),
            data: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Validation failed")]
    Validation(BTreeMap<String, String>),

    #[error("{0}")]
    BadRequest(String),

    #[error("Authentication required")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Identity provider error: {0}")]
    Provider(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn access_denied() -> Self {
        AppError::Forbidden(ACCESS_DENIED.to_string())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Database(_) | AppError::Provider(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = match self {
            AppError::Validation(fields) => {
                return (status, Json(ApiResponse::error_with("Validation failed", fields)))
                    .into_response();
            }
            AppError::Unauthorized => ApiResponse::error(AppError::Unauthorized.to_string()),
            AppError::BadRequest(msg) | AppError::Forbidden(msg) | AppError::NotFound(msg) => {
                ApiResponse::error(msg)
            }
            AppError::Database(e) => {
                tracing::error!(error = ?e, "Database error");
                ApiResponse::error("A database error occurred. Please try again later.")
            }
            AppError::Provider(msg) => {
                tracing::error!(error = %msg, "Identity provider error");
                ApiResponse::error("An error occurred while communicating with the identity provider.")
            }
            AppError::Internal(e) => {
                tracing::error!(error = ?e, "Internal error");
                ApiResponse::error("An unexpected error occurred. Please try again later.")
            }
        };

        (status, Json(body)).into_response()
    }
}

// Convert validator errors to a field -> message map keyed by JSON field names
impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let fields = errors
            .field_errors()
            .into_iter()
            .filter_map(|(field, errs)| {
                errs.first().map(|err| {
                    let message = err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value ({})", err.code));
                    (to_camel_case(&field), message)
                })
            })
            .collect();

        AppError::Validation(fields)
    }
}

impl From<IdentityProviderError> for AppError {
    fn from(error: IdentityProviderError) -> Self {
        match error {
            IdentityProviderError::NotFound(msg) => AppError::NotFound(msg),
            IdentityProviderError::AlreadyExists(msg) => AppError::BadRequest(msg),
            IdentityProviderError::Provider(msg) => AppError::Provider(msg),
        }
    }
}

fn to_camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

pub type Result<T> = std::result::Result<T, AppError>;
