mod addresses;

pub use addresses::{AddressRepository, PgAddressRepository};

use std::fmt;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::config::Config;

#[derive(Clone)]
pub struct Database {
    pub pg: PgPool,
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("pool_size", &self.pg.size())
            .field("idle", &self.pg.num_idle())
            .finish()
    }
}

impl Database {
    /// Connect using credentials from Secrets Manager when a secret name is
    /// configured, falling back to `database.url`
    pub async fn connect(config: &Config) -> anyhow::Result<Self> {
        let url = match config.database.secret_name.as_deref().filter(|s| !s.is_empty()) {
            Some(secret_name) => {
                let secrets = aws_secrets::SecretManagerBuilder::new()
                    .region(config.aws.region.clone())
                    .build()
                    .await?;
                let secret = secrets
                    .get_database_secret(secret_name)
                    .await
                    .with_context(|| format!("Failed to resolve database secret {}", secret_name))?;
                tracing::info!(
                    secret_name = %secret_name,
                    host = %secret.host,
                    dbname = %secret.dbname,
                    "Database credentials resolved from AWS Secrets Manager"
                );
                secret.connection_url()
            }
            None => config.database.url.clone(),
        };

        let pg = PgPoolOptions::new()
            .max_connections(config.database.max_connections)
            .connect(&url)
            .await
            .context("Failed to connect to PostgreSQL")?;

        tracing::info!(
            max_connections = config.database.max_connections,
            "PostgreSQL connection pool established"
        );

        Ok(Self { pg })
    }

    pub async fn run_migrations(&self) -> anyhow::Result<()> {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("./migrations")
            .run(&self.pg)
            .await
            .context("Failed to run database migrations")?;
        tracing::info!("Database migrations completed");
        Ok(())
    }
}
