use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::validators::{not_blank, POSTAL_CODE_REGEX};

/// Postal address owned by an identity-provider user
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub id: i64,
    pub user_id: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    #[serde(skip)]
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddressRequest {
    #[validate(
        custom(function = "not_blank", message = "Street is required"),
        length(max = 255, message = "Street cannot be longer than 255 characters")
    )]
    pub street: String,

    #[validate(
        custom(function = "not_blank", message = "City is required"),
        length(max = 100, message = "City cannot be longer than 100 characters")
    )]
    pub city: String,

    #[validate(
        custom(function = "not_blank", message = "State is required"),
        length(max = 100, message = "State cannot be longer than 100 characters")
    )]
    pub state: String,

    #[validate(
        custom(function = "not_blank", message = "Postal code is required"),
        regex(path = *POSTAL_CODE_REGEX, message = "Invalid postal code format")
    )]
    pub postal_code: String,

    #[validate(
        custom(function = "not_blank", message = "Country is required"),
        length(max = 100, message = "Country cannot be longer than 100 characters")
    )]
    pub country: String,
}

/// Address fields written by the repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressFields {
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

impl From<AddressRequest> for AddressFields {
    fn from(request: AddressRequest) -> Self {
        Self {
            street: request.street.trim().to_string(),
            city: request.city.trim().to_string(),
            state: request.state.trim().to_string(),
            postal_code: request.postal_code.trim().to_string(),
            country: request.country.trim().to_string(),
        }
    }
}
