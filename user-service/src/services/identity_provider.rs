use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[derive(Debug, thiserror::Error)]
pub enum IdentityProviderError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    AlreadyExists(String),

    #[error("{0}")]
    Provider(String),
}

pub type ProviderResult<T> = std::result::Result<T, IdentityProviderError>;

/// A user record as held by the identity provider
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderUser {
    pub username: String,
    pub attributes: HashMap<String, String>,
    pub enabled: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub last_modified_at: Option<DateTime<Utc>>,
}

impl ProviderUser {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Stable user id (`sub` attribute)
    pub fn sub(&self) -> Option<&str> {
        self.attribute("sub")
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderUserPage {
    pub users: Vec<ProviderUser>,
    pub next_token: Option<String>,
}

/// Attributes of an account to be created; the email doubles as username
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProviderUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

/// Administrative operations against the external identity provider
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn get_user(&self, username: &str) -> ProviderResult<ProviderUser>;

    async fn list_users(
        &self,
        limit: i32,
        pagination_token: Option<String>,
        filter: Option<String>,
    ) -> ProviderResult<ProviderUserPage>;

    async fn create_user(&self, user: NewProviderUser) -> ProviderResult<ProviderUser>;

    async fn add_user_to_group(&self, username: &str, group: &str) -> ProviderResult<()>;

    async fn remove_user_from_group(&self, username: &str, group: &str) -> ProviderResult<()>;

    async fn list_groups_for_user(&self, username: &str) -> ProviderResult<Vec<String>>;

    /// All group names in the pool, every page
    async fn list_groups(&self) -> ProviderResult<Vec<String>>;

    async fn list_users_in_group(
        &self,
        group: &str,
        next_token: Option<String>,
    ) -> ProviderResult<ProviderUserPage>;

    async fn enable_user(&self, username: &str) -> ProviderResult<()>;

    async fn disable_user(&self, username: &str) -> ProviderResult<()>;
}
