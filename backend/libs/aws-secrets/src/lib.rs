//! AWS Secrets Manager integration with TTL caching
//!
//! Resolves service secrets (database credentials in particular) from AWS
//! Secrets Manager:
//! - Cached values with configurable TTL
//! - Region override for services deployed outside the default AWS region
//! - Typed parsing of RDS-style database credential secrets
//!
//! # Example
//!
//! ```no_run
//! use aws_secrets::SecretManagerBuilder;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = SecretManagerBuilder::new()
//!         .region("ap-southeast-2")
//!         .build()
//!         .await?;
//!
//!     let db = manager.get_database_secret("ecom-postgres").await?;
//!     let _url = db.connection_url();
//!
//!     Ok(())
//! }
//! ```

use anyhow::Result;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_secretsmanager::error::DisplayErrorContext;
use aws_sdk_secretsmanager::Client as SecretsClient;
use moka::future::Cache;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum SecretError {
    #[error("Secret not found: {0}")]
    NotFound(String),

    #[error("Access denied to secret: {0}")]
    AccessDenied(String),

    #[error("Secret decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("Invalid secret format: {0}")]
    InvalidFormat(String),

    #[error("AWS SDK error: {0}")]
    AwsSdk(String),
}

/// Cached secret value with metadata
#[derive(Clone, Debug)]
struct CachedSecret {
    value: String,
    version_id: Option<String>,
    fetched_at: chrono::DateTime<chrono::Utc>,
}

/// Database credentials as stored by RDS-managed secrets
#[derive(Clone, Deserialize)]
pub struct DatabaseSecret {
    pub username: String,
    pub password: String,
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(alias = "database", alias = "dbInstanceIdentifier")]
    pub dbname: String,
    #[serde(default)]
    pub engine: Option<String>,
}

fn default_port() -> u16 {
    5432
}

impl fmt::Debug for DatabaseSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseSecret")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("dbname", &self.dbname)
            .field("engine", &self.engine)
            .finish()
    }
}

impl DatabaseSecret {
    /// Parse database credentials from a secret JSON string
    pub fn from_json(json: &str) -> Result<Self, SecretError> {
        serde_json::from_str(json).map_err(|e| {
            SecretError::InvalidFormat(format!("Failed to parse database secret: {}", e))
        })
    }

    /// PostgreSQL connection URL with percent-encoded credentials
    pub fn connection_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            urlencoding::encode(&self.username),
            urlencoding::encode(&self.password),
            self.host,
            self.port,
            self.dbname
        )
    }
}

/// AWS Secrets Manager client with caching
pub struct SecretManager {
    client: SecretsClient,
    cache: Cache<String, CachedSecret>,
}

impl SecretManager {
    /// Create a SecretManager with the default AWS credential chain and region
    pub async fn new() -> Result<Self> {
        SecretManagerBuilder::default().build().await
    }

    /// Get a secret by name (with caching)
    pub async fn get_secret(&self, secret_name: &str) -> Result<String, SecretError> {
        if let Some(cached) = self.cache.get(secret_name).await {
            debug!(
                secret_name = %secret_name,
                version_id = ?cached.version_id,
                cached_at = %cached.fetched_at,
                "Secret retrieved from cache"
            );
            return Ok(cached.value);
        }

        debug!(secret_name = %secret_name, "Fetching secret from AWS Secrets Manager");
        self.fetch_secret(secret_name).await
    }

    /// Get database credentials stored as an RDS-style JSON secret
    pub async fn get_database_secret(
        &self,
        secret_name: &str,
    ) -> Result<DatabaseSecret, SecretError> {
        let secret_json = self.get_secret(secret_name).await?;
        DatabaseSecret::from_json(&secret_json)
    }

    async fn fetch_secret(&self, secret_name: &str) -> Result<String, SecretError> {
        let response = self
            .client
            .get_secret_value()
            .secret_id(secret_name)
            .send()
            .await
            .map_err(|e| classify_sdk_error(secret_name, DisplayErrorContext(&e).to_string()))?;

        let secret_string = response
            .secret_string()
            .ok_or_else(|| SecretError::InvalidFormat("Secret is binary, not string".to_string()))?
            .to_string();

        let version_id = response.version_id().map(|s| s.to_string());

        let cached = CachedSecret {
            value: secret_string.clone(),
            version_id: version_id.clone(),
            fetched_at: chrono::Utc::now(),
        };
        self.cache.insert(secret_name.to_string(), cached).await;

        info!(
            secret_name = %secret_name,
            version_id = ?version_id,
            "Secret fetched and cached from AWS Secrets Manager"
        );

        Ok(secret_string)
    }
}

fn classify_sdk_error(secret_name: &str, error_msg: String) -> SecretError {
    if error_msg.contains("ResourceNotFoundException") {
        SecretError::NotFound(secret_name.to_string())
    } else if error_msg.contains("AccessDeniedException") {
        SecretError::AccessDenied(secret_name.to_string())
    } else if error_msg.contains("DecryptionFailure") {
        SecretError::DecryptionFailed(secret_name.to_string())
    } else {
        SecretError::AwsSdk(error_msg)
    }
}

/// Builder for SecretManager with custom configuration
pub struct SecretManagerBuilder {
    region: Option<String>,
    cache_ttl: Duration,
    max_cache_entries: u64,
}

impl Default for SecretManagerBuilder {
    fn default() -> Self {
        Self {
            region: None,
            cache_ttl: Duration::from_secs(300),
            max_cache_entries: 100,
        }
    }
}

impl SecretManagerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub async fn build(self) -> Result<SecretManager> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = self.region {
            loader = loader.region(Region::new(region));
        }
        let config = loader.load().await;
        let client = SecretsClient::new(&config);

        info!(
            cache_ttl = ?self.cache_ttl,
            "Initialized AWS Secrets Manager client"
        );

        let cache = Cache::builder()
            .max_capacity(self.max_cache_entries)
            .time_to_live(self.cache_ttl)
            .build();

        Ok(SecretManager { client, cache })
    }
}
