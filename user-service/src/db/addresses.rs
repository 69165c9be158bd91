use async_trait::async_trait;
use sqlx::PgPool;

use crate::models::{Address, AddressFields};

/// Persistence seam for addresses; every query is scoped to live rows of one owner
#[async_trait]
pub trait AddressRepository: Send + Sync {
    async fn insert(&self, user_id: &str, fields: &AddressFields) -> Result<Address, sqlx::Error>;

    async fn find_by_user(&self, user_id: &str) -> Result<Vec<Address>, sqlx::Error>;

    async fn update_owned(
        &self,
        user_id: &str,
        id: i64,
        fields: &AddressFields,
    ) -> Result<Option<Address>, sqlx::Error>;

    /// Returns whether a live row was flagged as deleted
    async fn soft_delete_owned(&self, user_id: &str, id: i64) -> Result<bool, sqlx::Error>;
}

const ADDRESS_COLUMNS: &str =
    "id, user_id, street, city, state, postal_code, country, deleted, created_at, updated_at";

#[derive(Clone)]
pub struct PgAddressRepository {
    pool: PgPool,
}

impl PgAddressRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AddressRepository for PgAddressRepository {
    async fn insert(&self, user_id: &str, fields: &AddressFields) -> Result<Address, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO addresses (user_id, street, city, state, postal_code, country)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {ADDRESS_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Address>(&query)
            .bind(user_id)
            .bind(&fields.street)
            .bind(&fields.city)
            .bind(&fields.state)
            .bind(&fields.postal_code)
            .bind(&fields.country)
            .fetch_one(&self.pool)
            .await
    }

    async fn find_by_user(&self, user_id: &str) -> Result<Vec<Address>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {ADDRESS_COLUMNS}
            FROM addresses
            WHERE user_id = $1 AND deleted = FALSE
            ORDER BY id
            "#
        );

        sqlx::query_as::<_, Address>(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
    }

    async fn update_owned(
        &self,
        user_id: &str,
        id: i64,
        fields: &AddressFields,
    ) -> Result<Option<Address>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE addresses
            SET street = $3, city = $4, state = $5, postal_code = $6, country = $7,
                updated_at = NOW()
            WHERE id = $1 AND user_id = $2 AND deleted = FALSE
            RETURNING {ADDRESS_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Address>(&query)
            .bind(id)
            .bind(user_id)
            .bind(&fields.street)
            .bind(&fields.city)
            .bind(&fields.state)
            .bind(&fields.postal_code)
            .bind(&fields.country)
            .fetch_optional(&self.pool)
            .await
    }

    async fn soft_delete_owned(&self, user_id: &str, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE addresses
            SET deleted = TRUE, updated_at = NOW()
            WHERE id = $1 AND user_id = $2 AND deleted = FALSE
            "#,
        )
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
