use std::sync::Arc;

use tracing::info;

use crate::db::AddressRepository;
use crate::error::{AppError, Result};
use crate::models::{Address, AddressFields, AddressRequest};
use crate::validators::validate_user_id;

/// Address operations scoped to the authenticated owner
pub struct AddressBook {
    repo: Arc<dyn AddressRepository>,
}

impl AddressBook {
    pub fn new(repo: Arc<dyn AddressRepository>) -> Self {
        Self { repo }
    }

    pub async fn add(&self, user_id: &str, request: AddressRequest) -> Result<Address> {
        check_owner(user_id)?;
        let address = self.repo.insert(user_id, &AddressFields::from(request)).await?;
        info!(user_id = %user_id, address_id = address.id, "Address added");
        Ok(address)
    }

    pub async fn list(&self, user_id: &str) -> Result<Vec<Address>> {
        check_owner(user_id)?;
        Ok(self.repo.find_by_user(user_id).await?)
    }

    pub async fn update(
        &self,
        user_id: &str,
        address_id: i64,
        request: AddressRequest,
    ) -> Result<Address> {
        check_owner(user_id)?;
        let address = self
            .repo
            .update_owned(user_id, address_id, &AddressFields::from(request))
            .await?
            .ok_or_else(|| {
                AppError::NotFound(
                    "Address not found or you do not have permission to update it.".to_string(),
                )
            })?;

        info!(user_id = %user_id, address_id, "Address updated");
        Ok(address)
    }

    pub async fn delete(&self, user_id: &str, address_id: i64) -> Result<()> {
        check_owner(user_id)?;
        if !self.repo.soft_delete_owned(user_id, address_id).await? {
            return Err(AppError::NotFound(
                "Address not found or you do not have permission to delete it.".to_string(),
            ));
        }

        info!(user_id = %user_id, address_id, "Address soft-deleted");
        Ok(())
    }
}

fn check_owner(user_id: &str) -> Result<()> {
    if !validate_user_id(user_id) {
        return Err(AppError::BadRequest("Invalid user ID".to_string()));
    }
    Ok(())
}
