//! In-memory identity provider for router tests
//!
//! Mirrors the user pool behaviour the service relies on: `sub` and email
//! prefix filters, numeric pagination tokens, and group membership.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use user_service::services::{
    IdentityProvider, IdentityProviderError, NewProviderUser, ProviderResult, ProviderUser,
    ProviderUserPage,
};

pub const POOL_GROUPS: [&str; 4] = ["SuperAdmins", "DataStewards", "Suppliers", "Customers"];

#[derive(Default)]
pub struct FakeIdentityProvider {
    users: Mutex<Vec<ProviderUser>>,
    memberships: Mutex<HashMap<String, Vec<String>>>,
    unavailable: AtomicBool,
}

#[allow(dead_code)]
impl FakeIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a user; the username is the email
    pub fn add_user(&self, sub: &str, email: &str, first: &str, last: &str, groups: &[&str]) {
        let mut attributes = HashMap::new();
        attributes.insert("sub".to_string(), sub.to_string());
        attributes.insert("email".to_string(), email.to_string());
        attributes.insert("given_name".to_string(), first.to_string());
        attributes.insert("family_name".to_string(), last.to_string());
        attributes.insert("email_verified".to_string(), "true".to_string());

        self.users.lock().unwrap().push(ProviderUser {
            username: email.to_string(),
            attributes,
            enabled: true,
            created_at: Some(Utc::now()),
            last_modified_at: Some(Utc::now()),
        });
        self.memberships.lock().unwrap().insert(
            email.to_string(),
            groups.iter().map(|g| g.to_string()).collect(),
        );
    }

    pub fn groups_of(&self, username: &str) -> Vec<String> {
        self.memberships
            .lock()
            .unwrap()
            .get(username)
            .cloned()
            .unwrap_or_default()
    }

    pub fn is_enabled(&self, username: &str) -> Option<bool> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.username == username)
            .map(|u| u.enabled)
    }

    /// Every call fails with a provider error while set
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> ProviderResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(IdentityProviderError::Provider(
                "ServiceUnavailable: fake outage".to_string(),
            ));
        }
        Ok(())
    }

    fn with_user<T>(
        &self,
        username: &str,
        f: impl FnOnce(&mut ProviderUser) -> T,
    ) -> ProviderResult<T> {
        self.check_available()?;
        let mut users = self.users.lock().unwrap();
        users
            .iter_mut()
            .find(|u| u.username == username)
            .map(f)
            .ok_or_else(|| IdentityProviderError::NotFound("User does not exist.".to_string()))
    }
}

fn quoted(filter: &str, prefix: &str) -> Option<String> {
    filter
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('"'))
        .and_then(|rest| rest.strip_suffix('"'))
        .map(|v| v.replace("\\\"", "\"").replace("\\\\", "\\"))
}

fn paginate(users: Vec<ProviderUser>, limit: usize, token: Option<String>) -> ProviderUserPage {
    let start = token.and_then(|t| t.parse::<usize>().ok()).unwrap_or(0);
    let end = (start + limit).min(users.len());
    let next_token = (end < users.len()).then(|| end.to_string());

    ProviderUserPage {
        users: users.into_iter().skip(start).take(end.saturating_sub(start)).collect(),
        next_token,
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentityProvider {
    async fn get_user(&self, username: &str) -> ProviderResult<ProviderUser> {
        self.with_user(username, |u| u.clone())
    }

    async fn list_users(
        &self,
        limit: i32,
        pagination_token: Option<String>,
        filter: Option<String>,
    ) -> ProviderResult<ProviderUserPage> {
        self.check_available()?;
        let users = self.users.lock().unwrap().clone();

        let matching: Vec<ProviderUser> = match filter.as_deref() {
            None => users,
            Some(f) => {
                if let Some(sub) = quoted(f, "sub = ") {
                    users.into_iter().filter(|u| u.sub() == Some(sub.as_str())).collect()
                } else if let Some(prefix) = quoted(f, "email ^= ") {
                    users
                        .into_iter()
                        .filter(|u| u.attribute("email").is_some_and(|e| e.starts_with(&prefix)))
                        .collect()
                } else {
                    return Err(IdentityProviderError::Provider(format!(
                        "InvalidParameterException: unsupported filter {}",
                        f
                    )));
                }
            }
        };

        Ok(paginate(matching, limit as usize, pagination_token))
    }

    async fn create_user(&self, user: NewProviderUser) -> ProviderResult<ProviderUser> {
        self.check_available()?;
        if self
            .users
            .lock()
            .unwrap()
            .iter()
            .any(|u| u.username == user.email)
        {
            return Err(IdentityProviderError::AlreadyExists(
                "User account already exists".to_string(),
            ));
        }

        let sub = format!("sub-{}", self.users.lock().unwrap().len() + 1);
        self.add_user(&sub, &user.email, &user.first_name, &user.last_name, &[]);
        self.get_user(&user.email).await
    }

    async fn add_user_to_group(&self, username: &str, group: &str) -> ProviderResult<()> {
        self.with_user(username, |_| ())?;
        let mut memberships = self.memberships.lock().unwrap();
        let groups = memberships.entry(username.to_string()).or_default();
        if !groups.iter().any(|g| g == group) {
            groups.push(group.to_string());
        }
        Ok(())
    }

    async fn remove_user_from_group(&self, username: &str, group: &str) -> ProviderResult<()> {
        self.with_user(username, |_| ())?;
        if let Some(groups) = self.memberships.lock().unwrap().get_mut(username) {
            groups.retain(|g| g != group);
        }
        Ok(())
    }

    async fn list_groups_for_user(&self, username: &str) -> ProviderResult<Vec<String>> {
        self.with_user(username, |_| ())?;
        Ok(self.groups_of(username))
    }

    async fn list_groups(&self) -> ProviderResult<Vec<String>> {
        self.check_available()?;
        Ok(POOL_GROUPS.iter().map(|g| g.to_string()).collect())
    }

    async fn list_users_in_group(
        &self,
        group: &str,
        next_token: Option<String>,
    ) -> ProviderResult<ProviderUserPage> {
        self.check_available()?;
        let memberships = self.memberships.lock().unwrap().clone();
        let members = self
            .users
            .lock()
            .unwrap()
            .iter()
            .filter(|u| {
                memberships
                    .get(&u.username)
                    .is_some_and(|groups| groups.iter().any(|g| g == group))
            })
            .cloned()
            .collect();

        Ok(paginate(members, 60, next_token))
    }

    async fn enable_user(&self, username: &str) -> ProviderResult<()> {
        self.with_user(username, |u| u.enabled = true)
    }

    async fn disable_user(&self, username: &str) -> ProviderResult<()> {
        self.with_user(username, |u| u.enabled = false)
    }
}
