use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub aws: AwsConfig,
    pub cognito: CognitoConfig,
    #[serde(default)]
    pub users: UsersConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    /// Secrets Manager secret holding RDS-style credentials; overrides `url`
    #[serde(default)]
    pub secret_name: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &"[REDACTED]")
            .field("secret_name", &self.secret_name)
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AwsConfig {
    #[serde(default = "default_region")]
    pub region: String,
}

#[derive(Clone, Deserialize)]
pub struct CognitoConfig {
    pub user_pool_id: String,
    /// Expected `client_id` (access tokens) or `aud` (id tokens); unchecked when unset
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default = "default_jwks_cache_ttl_secs")]
    pub jwks_cache_ttl_secs: u64,
    /// Minimum spacing between JWKS fetches triggered by unknown key ids
    #[serde(default = "default_jwks_min_refresh_secs")]
    pub jwks_min_refresh_secs: u64,
    /// Shared HS256 secret for local development; replaces JWKS verification
    #[serde(default)]
    pub hs256_secret: Option<String>,
}

impl std::fmt::Debug for CognitoConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CognitoConfig")
            .field("user_pool_id", &self.user_pool_id)
            .field("client_id", &self.client_id)
            .field("jwks_cache_ttl_secs", &self.jwks_cache_ttl_secs)
            .field("jwks_min_refresh_secs", &self.jwks_min_refresh_secs)
            .field("hs256_secret", &self.hs256_secret.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl CognitoConfig {
    pub fn issuer(&self, region: &str) -> String {
        format!(
            "https://cognito-idp.{}.amazonaws.com/{}",
            region, self.user_pool_id
        )
    }

    pub fn jwks_url(&self, region: &str) -> String {
        format!("{}/.well-known/jwks.json", self.issuer(region))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UsersConfig {
    #[serde(default = "default_employee_groups")]
    pub employee_groups: Vec<String>,
}

impl Default for UsersConfig {
    fn default() -> Self {
        Self {
            employee_groups: default_employee_groups(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_max_connections() -> u32 {
    10
}

fn default_region() -> String {
    "ap-southeast-2".to_string()
}

fn default_jwks_cache_ttl_secs() -> u64 {
    3600
}

fn default_jwks_min_refresh_secs() -> u64 {
    60
}

fn default_employee_groups() -> Vec<String> {
    vec!["SuperAdmins".to_string(), "DataStewards".to_string()]
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("users.employee_groups")
                    .try_parsing(true),
            )
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("database.url", "postgres://localhost/users")?
            .set_default("database.max_connections", 10)?
            .set_default("aws.region", "ap-southeast-2")?
            .set_default("cognito.user_pool_id", "")?
            .set_default("cognito.jwks_cache_ttl_secs", 3600)?
            .set_default("cognito.jwks_min_refresh_secs", 60)?
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.cognito.user_pool_id.trim().is_empty() && self.cognito.hs256_secret.is_none() {
            anyhow::bail!("COGNITO__USER_POOL_ID must be set (or COGNITO__HS256_SECRET for local development)");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cognito() -> CognitoConfig {
        CognitoConfig {
            user_pool_id: "ap-southeast-2_abc123".to_string(),
            client_id: None,
            jwks_cache_ttl_secs: 3600,
            jwks_min_refresh_secs: 60,
            hs256_secret: Some("dev-secret".to_string()),
        }
    }

    #[test]
    fn test_issuer_and_jwks_url() {
        let cognito = cognito();
        assert_eq!(
            cognito.issuer("ap-southeast-2"),
            "https://cognito-idp.ap-southeast-2.amazonaws.com/ap-southeast-2_abc123"
        );
        assert!(cognito
            .jwks_url("ap-southeast-2")
            .ends_with("/ap-southeast-2_abc123/.well-known/jwks.json"));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let debug = format!("{:?}", cognito());
        assert!(!debug.contains("dev-secret"));

        let db = DatabaseConfig {
            url: "postgres://u:hunter2@h/d".to_string(),
            secret_name: None,
            max_connections: 5,
        };
        assert!(!format!("{:?}", db).contains("hunter2"));
    }

    #[test]
    fn test_default_employee_groups() {
        assert_eq!(
            UsersConfig::default().employee_groups,
            vec!["SuperAdmins".to_string(), "DataStewards".to_string()]
        );
    }
}
