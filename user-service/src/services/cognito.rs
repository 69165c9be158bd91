//! Cognito user pool client
//!
//! Implements [`IdentityProvider`] over the Cognito admin API for a single user
//! pool. SDK errors are classified by their service error code:
//! - `UserNotFoundException` -> [`IdentityProviderError::NotFound`]
//! - `UsernameExistsException` -> [`IdentityProviderError::AlreadyExists`]
//! - anything else -> [`IdentityProviderError::Provider`]

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_cognitoidentityprovider::{
    error::{DisplayErrorContext, ProvideErrorMetadata, SdkError},
    operation::admin_get_user::AdminGetUserOutput,
    primitives::DateTime as AwsDateTime,
    types::{AttributeType, DeliveryMediumType, UserType},
    Client,
};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::identity_provider::{
    IdentityProvider, IdentityProviderError, NewProviderUser, ProviderResult, ProviderUser,
    ProviderUserPage,
};

const GROUP_PAGE_SIZE: i32 = 60;

#[derive(Clone)]
pub struct CognitoIdentityProvider {
    client: Client,
    user_pool_id: String,
}

impl CognitoIdentityProvider {
    pub fn new(client: Client, user_pool_id: impl Into<String>) -> Self {
        let user_pool_id = user_pool_id.into();
        info!(user_pool_id = %user_pool_id, "Cognito identity provider initialized");
        Self {
            client,
            user_pool_id,
        }
    }
}

#[async_trait]
impl IdentityProvider for CognitoIdentityProvider {
    async fn get_user(&self, username: &str) -> ProviderResult<ProviderUser> {
        debug!(username = %username, "AdminGetUser");
        let output = self
            .client
            .admin_get_user()
            .user_pool_id(&self.user_pool_id)
            .username(username)
            .send()
            .await
            .map_err(classify_sdk_error)?;

        Ok(user_from_admin_output(&output))
    }

    async fn list_users(
        &self,
        limit: i32,
        pagination_token: Option<String>,
        filter: Option<String>,
    ) -> ProviderResult<ProviderUserPage> {
        debug!(limit, filter = ?filter, "ListUsers");
        let output = self
            .client
            .list_users()
            .user_pool_id(&self.user_pool_id)
            .limit(limit)
            .set_pagination_token(pagination_token)
            .set_filter(filter)
            .send()
            .await
            .map_err(classify_sdk_error)?;

        Ok(ProviderUserPage {
            users: output.users().iter().map(user_from_user_type).collect(),
            next_token: output.pagination_token().map(str::to_string),
        })
    }

    async fn create_user(&self, user: NewProviderUser) -> ProviderResult<ProviderUser> {
        let attributes = vec![
            attribute("email", &user.email)?,
            attribute("given_name", &user.first_name)?,
            attribute("family_name", &user.last_name)?,
            attribute("name", &format!("{} {}", user.first_name, user.last_name))?,
            attribute("email_verified", "true")?,
        ];

        let output = self
            .client
            .admin_create_user()
            .user_pool_id(&self.user_pool_id)
            .username(&user.email)
            .set_user_attributes(Some(attributes))
            .desired_delivery_mediums(DeliveryMediumType::Email)
            .send()
            .await
            .map_err(classify_sdk_error)?;

        info!(username = %user.email, "User created in Cognito");

        output.user().map(user_from_user_type).ok_or_else(|| {
            IdentityProviderError::Provider("AdminCreateUser returned no user".to_string())
        })
    }

    async fn add_user_to_group(&self, username: &str, group: &str) -> ProviderResult<()> {
        self.client
            .admin_add_user_to_group()
            .user_pool_id(&self.user_pool_id)
            .username(username)
            .group_name(group)
            .send()
            .await
            .map_err(classify_sdk_error)?;

        info!(username = %username, group = %group, "User added to group");
        Ok(())
    }

    async fn remove_user_from_group(&self, username: &str, group: &str) -> ProviderResult<()> {
        self.client
            .admin_remove_user_from_group()
            .user_pool_id(&self.user_pool_id)
            .username(username)
            .group_name(group)
            .send()
            .await
            .map_err(classify_sdk_error)?;

        info!(username = %username, group = %group, "User removed from group");
        Ok(())
    }

    async fn list_groups_for_user(&self, username: &str) -> ProviderResult<Vec<String>> {
        let mut groups = Vec::new();
        let mut next_token = None;

        loop {
            let output = self
                .client
                .admin_list_groups_for_user()
                .user_pool_id(&self.user_pool_id)
                .username(username)
                .limit(GROUP_PAGE_SIZE)
                .set_next_token(next_token)
                .send()
                .await
                .map_err(classify_sdk_error)?;

            groups.extend(
                output
                    .groups()
                    .iter()
                    .filter_map(|g| g.group_name().map(str::to_string)),
            );

            next_token = output.next_token().map(str::to_string);
            if next_token.is_none() {
                break;
            }
        }

        Ok(groups)
    }

    async fn list_groups(&self) -> ProviderResult<Vec<String>> {
        let mut groups = Vec::new();
        let mut next_token = None;

        loop {
            let output = self
                .client
                .list_groups()
                .user_pool_id(&self.user_pool_id)
                .limit(GROUP_PAGE_SIZE)
                .set_next_token(next_token)
                .send()
                .await
                .map_err(classify_sdk_error)?;

            groups.extend(
                output
                    .groups()
                    .iter()
                    .filter_map(|g| g.group_name().map(str::to_string)),
            );

            next_token = output.next_token().map(str::to_string);
            if next_token.is_none() {
                break;
            }
        }

        Ok(groups)
    }

    async fn list_users_in_group(
        &self,
        group: &str,
        next_token: Option<String>,
    ) -> ProviderResult<ProviderUserPage> {
        let output = self
            .client
            .list_users_in_group()
            .user_pool_id(&self.user_pool_id)
            .group_name(group)
            .limit(GROUP_PAGE_SIZE)
            .set_next_token(next_token)
            .send()
            .await
            .map_err(classify_sdk_error)?;

        Ok(ProviderUserPage {
            users: output.users().iter().map(user_from_user_type).collect(),
            next_token: output.next_token().map(str::to_string),
        })
    }

    async fn enable_user(&self, username: &str) -> ProviderResult<()> {
        self.client
            .admin_enable_user()
            .user_pool_id(&self.user_pool_id)
            .username(username)
            .send()
            .await
            .map_err(classify_sdk_error)?;

        info!(username = %username, "User enabled");
        Ok(())
    }

    async fn disable_user(&self, username: &str) -> ProviderResult<()> {
        self.client
            .admin_disable_user()
            .user_pool_id(&self.user_pool_id)
            .username(username)
            .send()
            .await
            .map_err(classify_sdk_error)?;

        info!(username = %username, "User disabled");
        Ok(())
    }
}

fn attribute(name: &str, value: &str) -> ProviderResult<AttributeType> {
    AttributeType::builder()
        .name(name)
        .value(value)
        .build()
        .map_err(|e| IdentityProviderError::Provider(format!("Invalid attribute {}: {}", name, e)))
}

fn attribute_map(attributes: &[AttributeType]) -> HashMap<String, String> {
    attributes
        .iter()
        .filter_map(|a| a.value().map(|v| (a.name().to_string(), v.to_string())))
        .collect()
}

fn to_chrono(value: Option<&AwsDateTime>) -> Option<DateTime<Utc>> {
    value.and_then(|dt| DateTime::from_timestamp(dt.secs(), dt.subsec_nanos()))
}

fn user_from_user_type(user: &UserType) -> ProviderUser {
    ProviderUser {
        username: user.username().unwrap_or_default().to_string(),
        attributes: attribute_map(user.attributes()),
        enabled: user.enabled(),
        created_at: to_chrono(user.user_create_date()),
        last_modified_at: to_chrono(user.user_last_modified_date()),
    }
}

fn user_from_admin_output(output: &AdminGetUserOutput) -> ProviderUser {
    ProviderUser {
        username: output.username().to_string(),
        attributes: attribute_map(output.user_attributes()),
        enabled: output.enabled(),
        created_at: to_chrono(output.user_create_date()),
        last_modified_at: to_chrono(output.user_last_modified_date()),
    }
}

fn classify_sdk_error<E>(err: SdkError<E>) -> IdentityProviderError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    let message = err.message().map(str::to_string);
    match err.code() {
        Some("UserNotFoundException") => {
            IdentityProviderError::NotFound(message.unwrap_or_else(|| "User not found".to_string()))
        }
        Some("UsernameExistsException") => IdentityProviderError::AlreadyExists(
            message.unwrap_or_else(|| "User already exists".to_string()),
        ),
        code => {
            let detail = DisplayErrorContext(&err).to_string();
            warn!(code = ?code, error = %detail, "Cognito request failed");
            IdentityProviderError::Provider(detail)
        }
    }
}
