//! Vec-backed address repository with the same owner/soft-delete scoping as
//! the PostgreSQL implementation

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use user_service::db::AddressRepository;
use user_service::models::{Address, AddressFields};

#[derive(Default)]
pub struct MemoryAddressRepository {
    rows: Mutex<Vec<Address>>,
}

#[allow(dead_code)]
impl MemoryAddressRepository {
    /// Raw rows, including soft-deleted ones
    pub fn rows(&self) -> Vec<Address> {
        self.rows.lock().unwrap().clone()
    }
}

fn live(row: &Address, user_id: &str, id: i64) -> bool {
    row.id == id && row.user_id == user_id && !row.deleted
}

#[async_trait]
impl AddressRepository for MemoryAddressRepository {
    async fn insert(&self, user_id: &str, fields: &AddressFields) -> Result<Address, sqlx::Error> {
        let mut rows = self.rows.lock().unwrap();
        let now = Utc::now();
        let address = Address {
            id: rows.len() as i64 + 1,
            user_id: user_id.to_string(),
            street: fields.street.clone(),
            city: fields.city.clone(),
            state: fields.state.clone(),
            postal_code: fields.postal_code.clone(),
            country: fields.country.clone(),
            deleted: false,
            created_at: now,
            updated_at: now,
        };
        rows.push(address.clone());
        Ok(address)
    }

    async fn find_by_user(&self, user_id: &str) -> Result<Vec<Address>, sqlx::Error> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.user_id == user_id && !a.deleted)
            .cloned()
            .collect())
    }

    async fn update_owned(
        &self,
        user_id: &str,
        id: i64,
        fields: &AddressFields,
    ) -> Result<Option<Address>, sqlx::Error> {
        let mut rows = self.rows.lock().unwrap();
        Ok(rows.iter_mut().find(|a| live(a, user_id, id)).map(|a| {
            a.street = fields.street.clone();
            a.city = fields.city.clone();
            a.state = fields.state.clone();
            a.postal_code = fields.postal_code.clone();
            a.country = fields.country.clone();
            a.updated_at = Utc::now();
            a.clone()
        }))
    }

    async fn soft_delete_owned(&self, user_id: &str, id: i64) -> Result<bool, sqlx::Error> {
        let mut rows = self.rows.lock().unwrap();
        match rows.iter_mut().find(|a| live(a, user_id, id)) {
            Some(a) => {
                a.deleted = true;
                a.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
