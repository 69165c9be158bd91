use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

use crate::validators::not_blank;

/// Roles map one-to-one onto identity-provider groups
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum UserRole {
    SuperAdmins,
    DataStewards,
    Suppliers,
    Customers,
}

impl UserRole {
    /// Name of the identity-provider group backing this role
    pub fn group_name(&self) -> &'static str {
        match self {
            UserRole::SuperAdmins => "SuperAdmins",
            UserRole::DataStewards => "DataStewards",
            UserRole::Suppliers => "Suppliers",
            UserRole::Customers => "Customers",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.group_name())
    }
}

/// Account status as reported to API clients
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum UserStatus {
    Enabled,
    Disabled,
    Confirmed,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Enabled => "ENABLED",
            UserStatus::Disabled => "DISABLED",
            UserStatus::Confirmed => "CONFIRMED",
        }
    }
}

/// User profile DTO assembled from identity-provider attributes and groups
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Option<String>,
    pub username: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub email_verified: bool,
    pub status: UserStatus,
    pub created_date: Option<DateTime<Utc>>,
    pub last_modified_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub user_groups: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPage {
    pub users: Vec<UserProfile>,
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[validate(custom(function = "not_blank", message = "First name is required"))]
    pub first_name: String,

    #[validate(custom(function = "not_blank", message = "Last name is required"))]
    pub last_name: String,

    #[validate(
        custom(function = "not_blank", message = "Email is required"),
        email(message = "Email should be valid")
    )]
    pub email: String,

    #[validate(required(message = "Role is required"))]
    pub role: Option<UserRole>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateRolesRequest {
    #[validate(length(min = 1, message = "At least one role must be provided"))]
    pub roles: Vec<UserRole>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateStatusRequest {
    #[validate(required(message = "Enabled status must be provided"))]
    pub enabled: Option<bool>,
}

/// Criteria for the in-memory admin user filter; empty values are ignored
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSearchQuery {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub status: Option<String>,
    pub role: Option<String>,
}
