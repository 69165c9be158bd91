use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use super::identity_provider::{
    IdentityProvider, IdentityProviderError, NewProviderUser, ProviderUser,
};
use crate::error::{AppError, Result};
use crate::models::{CreateUserRequest, UserPage, UserProfile, UserRole, UserSearchQuery, UserStatus};
use crate::validators::{escape_filter_value, validate_email, validate_user_id};

pub const SUPER_ADMIN_GROUP: &str = "SuperAdmins";
pub const DEFAULT_PAGE_SIZE: i32 = 20;
pub const MAX_PAGE_SIZE: i32 = 60;

/// User administration facade over the identity provider
pub struct UserDirectory {
    provider: Arc<dyn IdentityProvider>,
    employee_groups: Vec<String>,
}

impl UserDirectory {
    pub fn new(provider: Arc<dyn IdentityProvider>, employee_groups: Vec<String>) -> Self {
        Self {
            provider,
            employee_groups,
        }
    }

    /// Profile of the user identified by `user_id` (the `sub` attribute)
    pub async fn get_profile(&self, user_id: &str) -> Result<UserProfile> {
        let username = self.username_for_id(user_id).await?;
        self.profile_by_username(&username).await
    }

    pub async fn list_users(&self, limit: Option<i32>, next_token: Option<String>) -> Result<UserPage> {
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE);
        if !(1..=MAX_PAGE_SIZE).contains(&limit) {
            return Err(AppError::BadRequest(format!(
                "Limit must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }

        let mut memberships = self.group_memberships().await?;
        let page = self.provider.list_users(limit, next_token, None).await?;

        let users = page
            .users
            .into_iter()
            .map(|user| {
                let groups = memberships.remove(&user.username).unwrap_or_default();
                to_profile(user, groups)
            })
            .collect();

        Ok(UserPage {
            users,
            next_token: page.next_token,
        })
    }

    pub async fn search_by_email(&self, email: &str) -> Result<Vec<UserProfile>> {
        let email = email.trim();
        if !validate_email(email) {
            return Err(AppError::BadRequest("Invalid email format".to_string()));
        }

        let filter = format!("email ^= \"{}\"", escape_filter_value(email));
        let page = self.provider.list_users(MAX_PAGE_SIZE, None, Some(filter)).await?;

        let mut profiles = Vec::with_capacity(page.users.len());
        for user in page.users {
            let groups = self.provider.list_groups_for_user(&user.username).await?;
            profiles.push(to_profile(user, groups));
        }

        Ok(profiles)
    }

    /// Multi-criteria search evaluated in memory over the whole pool
    pub async fn search(&self, query: &UserSearchQuery) -> Result<Vec<UserProfile>> {
        let users = self.all_users_with_groups().await?;
        Ok(users.into_iter().filter(|u| matches_query(u, query)).collect())
    }

    /// Members of any configured employee group
    pub async fn employees(&self) -> Result<Vec<UserProfile>> {
        let users = self.all_users_with_groups().await?;
        Ok(users
            .into_iter()
            .filter(|u| u.user_groups.iter().any(|g| self.employee_groups.contains(g)))
            .collect())
    }

    pub async fn create_user(&self, request: CreateUserRequest) -> Result<UserProfile> {
        let role = request
            .role
            .ok_or_else(|| AppError::BadRequest("Role is required".to_string()))?;

        let created = self
            .provider
            .create_user(NewProviderUser {
                email: request.email.trim().to_string(),
                first_name: request.first_name.trim().to_string(),
                last_name: request.last_name.trim().to_string(),
            })
            .await
            .map_err(|e| match e {
                IdentityProviderError::AlreadyExists(_) => {
                    AppError::BadRequest("A user with this email already exists.".to_string())
                }
                other => other.into(),
            })?;

        self.provider
            .add_user_to_group(&created.username, role.group_name())
            .await?;

        info!(username = %created.username, role = %role, "Admin user created");
        self.profile_by_username(&created.username).await
    }

    /// Make the user's group memberships equal to `roles`
    pub async fn sync_roles(&self, user_id: &str, roles: &[UserRole]) -> Result<()> {
        let username = self.username_for_id(user_id).await?;
        let current = self.provider.list_groups_for_user(&username).await?;

        if current.iter().any(|g| g == SUPER_ADMIN_GROUP) {
            warn!(user_id = %user_id, "Rejected role change for SuperAdmin user");
            return Err(AppError::Forbidden(
                "Security Violation: Cannot modify roles for a SuperAdmin user.".to_string(),
            ));
        }

        let requested: Vec<&str> = roles.iter().map(|r| r.group_name()).collect();

        for group in requested.iter().filter(|g| !current.iter().any(|c| c == *g)) {
            self.provider.add_user_to_group(&username, group).await?;
        }
        for group in current.iter().filter(|c| !requested.contains(&c.as_str())) {
            self.provider.remove_user_from_group(&username, group).await?;
        }

        info!(user_id = %user_id, roles = ?requested, "User roles synchronized");
        Ok(())
    }

    pub async fn set_enabled(&self, user_id: &str, enabled: bool) -> Result<()> {
        let username = self.username_for_id(user_id).await?;

        if enabled {
            self.provider.enable_user(&username).await?;
        } else {
            let groups = self.provider.list_groups_for_user(&username).await?;
            if groups.iter().any(|g| g == SUPER_ADMIN_GROUP) {
                warn!(user_id = %user_id, "Rejected disabling SuperAdmin user");
                return Err(AppError::Forbidden(
                    "Security Violation: Cannot disable a SuperAdmin user.".to_string(),
                ));
            }
            self.provider.disable_user(&username).await?;
        }

        info!(user_id = %user_id, enabled, "User status updated");
        Ok(())
    }

    async fn profile_by_username(&self, username: &str) -> Result<UserProfile> {
        let user = self.provider.get_user(username).await?;
        let groups = self.provider.list_groups_for_user(username).await?;
        Ok(to_profile(user, groups))
    }

    async fn username_for_id(&self, user_id: &str) -> Result<String> {
        let user_id = user_id.trim();
        if !validate_user_id(user_id) {
            return Err(AppError::BadRequest("Invalid user ID".to_string()));
        }

        let filter = format!("sub = \"{}\"", escape_filter_value(user_id));
        let page = self.provider.list_users(1, None, Some(filter)).await?;

        match page.users.into_iter().next() {
            Some(user) => Ok(user.username),
            None => {
                warn!(user_id = %user_id, "No user found for sub");
                Err(AppError::NotFound(format!("User not found with ID: {}", user_id)))
            }
        }
    }

    /// `username -> groups` across every group in the pool
    async fn group_memberships(&self) -> Result<HashMap<String, Vec<String>>> {
        let mut memberships: HashMap<String, Vec<String>> = HashMap::new();

        for group in self.provider.list_groups().await? {
            let mut next_token = None;
            loop {
                let page = self.provider.list_users_in_group(&group, next_token).await?;
                for user in page.users {
                    memberships.entry(user.username).or_default().push(group.clone());
                }
                next_token = page.next_token;
                if next_token.is_none() {
                    break;
                }
            }
        }

        Ok(memberships)
    }

    async fn all_users_with_groups(&self) -> Result<Vec<UserProfile>> {
        let mut memberships = self.group_memberships().await?;
        let mut profiles = Vec::new();
        let mut token = None;

        loop {
            let page = self.provider.list_users(MAX_PAGE_SIZE, token, None).await?;
            for user in page.users {
                let groups = memberships.remove(&user.username).unwrap_or_default();
                profiles.push(to_profile(user, groups));
            }
            token = page.next_token;
            if token.is_none() {
                break;
            }
        }

        Ok(profiles)
    }
}

fn to_profile(user: ProviderUser, groups: Vec<String>) -> UserProfile {
    let attr = |name: &str| user.attribute(name).map(str::to_string);

    UserProfile {
        id: attr("sub"),
        email: attr("email"),
        first_name: attr("given_name"),
        last_name: attr("family_name"),
        phone: attr("phone_number"),
        email_verified: user
            .attribute("email_verified")
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false),
        status: if user.enabled {
            UserStatus::Enabled
        } else {
            UserStatus::Disabled
        },
        created_date: user.created_at,
        last_modified_date: user.last_modified_at,
        username: user.username,
        user_groups: groups,
    }
}

fn contains_ignore_case(value: Option<&str>, needle: &str) -> bool {
    value
        .map(|v| v.to_lowercase().contains(&needle.to_lowercase()))
        .unwrap_or(false)
}

fn matches_query(user: &UserProfile, query: &UserSearchQuery) -> bool {
    let criterion = |c: &Option<String>| c.as_deref().filter(|s| !s.is_empty()).map(str::to_string);

    if let Some(email) = criterion(&query.email) {
        if !contains_ignore_case(user.email.as_deref(), &email) {
            return false;
        }
    }
    if let Some(first_name) = criterion(&query.first_name) {
        if !contains_ignore_case(user.first_name.as_deref(), &first_name) {
            return false;
        }
    }
    if let Some(last_name) = criterion(&query.last_name) {
        if !contains_ignore_case(user.last_name.as_deref(), &last_name) {
            return false;
        }
    }
    if let Some(username) = criterion(&query.username) {
        if !contains_ignore_case(Some(&user.username), &username) {
            return false;
        }
    }
    if let Some(status) = criterion(&query.status) {
        if !user.status.as_str().eq_ignore_ascii_case(&status) {
            return false;
        }
    }
    if let Some(role) = criterion(&query.role) {
        if !user
            .user_groups
            .iter()
            .any(|g| contains_ignore_case(Some(g), &role))
        {
            return false;
        }
    }

    true
}
