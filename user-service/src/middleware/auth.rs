use std::time::{Duration, Instant};

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, decode_header, jwk::JwkSet, Algorithm, DecodingKey, Validation};
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::AppError;
use crate::models::{UserProfile, UserStatus};
use crate::services::SUPER_ADMIN_GROUP;
use crate::AppState;

/// Claims carried by user pool access and id tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    /// Boolean in id tokens, sometimes a string for imported users
    #[serde(default)]
    pub email_verified: Option<serde_json::Value>,
    #[serde(default)]
    pub iat: Option<i64>,
    pub exp: i64,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub aud: Option<String>,
    /// `access` or `id`
    #[serde(default)]
    pub token_use: Option<String>,
    #[serde(rename = "cognito:groups", default)]
    pub groups: Vec<String>,
}

/// Principal attached to authenticated requests
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub sub: String,
    pub email: Option<String>,
    pub username: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub phone_number: Option<String>,
    pub email_verified: Option<bool>,
    pub issued_at: Option<DateTime<Utc>>,
    pub groups: Vec<String>,
}

impl AuthenticatedUser {
    pub fn is_super_admin(&self) -> bool {
        self.groups.iter().any(|g| g == SUPER_ADMIN_GROUP)
    }

    /// Profile assembled from token claims alone
    pub fn fallback_profile(&self) -> UserProfile {
        UserProfile {
            id: Some(self.sub.clone()),
            username: self.sub.clone(),
            email: self.email.clone().or_else(|| self.username.clone()),
            first_name: self.given_name.clone(),
            last_name: self.family_name.clone(),
            phone: self.phone_number.clone(),
            email_verified: self.email_verified.unwrap_or(false),
            status: UserStatus::Confirmed,
            created_date: self.issued_at,
            last_modified_date: self.issued_at,
            user_groups: self.groups.clone(),
        }
    }
}

impl From<Claims> for AuthenticatedUser {
    fn from(claims: Claims) -> Self {
        let email_verified = claims.email_verified.as_ref().and_then(|v| {
            v.as_bool()
                .or_else(|| v.as_str().map(|s| s.eq_ignore_ascii_case("true")))
        });

        Self {
            sub: claims.sub,
            email: claims.email,
            username: claims.username,
            given_name: claims.given_name,
            family_name: claims.family_name,
            phone_number: claims.phone_number,
            email_verified,
            issued_at: claims.iat.and_then(|iat| DateTime::from_timestamp(iat, 0)),
            groups: claims.groups,
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}

/// Default spacing between JWKS fetches for unknown key ids
const JWKS_MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

enum KeySource {
    Shared(DecodingKey),
    Jwks {
        url: String,
        http: reqwest::Client,
        keys: Cache<String, DecodingKey>,
        /// Time of the last fetch attempt; held across the fetch so
        /// concurrent misses share one request
        last_fetch: Mutex<Option<Instant>>,
        min_refresh_interval: Duration,
    },
}

/// Bearer token verifier for user pool tokens
pub struct JwtVerifier {
    source: KeySource,
    issuer: Option<String>,
    client_id: Option<String>,
}

impl JwtVerifier {
    /// RS256 verification against the user pool JWKS
    pub fn jwks(
        jwks_url: impl Into<String>,
        issuer: impl Into<String>,
        client_id: Option<String>,
        cache_ttl: Duration,
    ) -> Self {
        let keys = Cache::builder()
            .max_capacity(32)
            .time_to_live(cache_ttl)
            .build();

        Self {
            source: KeySource::Jwks {
                url: jwks_url.into(),
                http: reqwest::Client::new(),
                keys,
                last_fetch: Mutex::new(None),
                min_refresh_interval: JWKS_MIN_REFRESH_INTERVAL,
            },
            issuer: Some(issuer.into()),
            client_id,
        }
    }

    /// Minimum time between JWKS fetches caused by unknown key ids
    pub fn with_min_refresh_interval(mut self, interval: Duration) -> Self {
        if let KeySource::Jwks {
            min_refresh_interval,
            ..
        } = &mut self.source
        {
            *min_refresh_interval = interval;
        }
        self
    }

    /// HS256 verification with a shared secret (local development and tests)
    pub fn shared_secret(secret: &str) -> Self {
        Self {
            source: KeySource::Shared(DecodingKey::from_secret(secret.as_bytes())),
            issuer: None,
            client_id: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        match config.cognito.hs256_secret.as_deref().filter(|s| !s.is_empty()) {
            Some(secret) => {
                warn!("JWT verification uses a shared HS256 secret; do not use in production");
                Self::shared_secret(secret)
            }
            None => {
                let region = &config.aws.region;
                info!(jwks_url = %config.cognito.jwks_url(region), "JWT verification via user pool JWKS");
                Self::jwks(
                    config.cognito.jwks_url(region),
                    config.cognito.issuer(region),
                    config.cognito.client_id.clone(),
                    Duration::from_secs(config.cognito.jwks_cache_ttl_secs),
                )
                .with_min_refresh_interval(Duration::from_secs(
                    config.cognito.jwks_min_refresh_secs,
                ))
            }
        }
    }

    pub async fn verify(&self, token: &str) -> Result<Claims, AppError> {
        let header = decode_header(token).map_err(|e| {
            debug!(error = %e, "Malformed token header");
            AppError::Unauthorized
        })?;

        let jwks_mode = matches!(self.source, KeySource::Jwks { .. });
        let (key, mut validation) = match &self.source {
            KeySource::Shared(key) => (key.clone(), Validation::new(Algorithm::HS256)),
            KeySource::Jwks { .. } => {
                let kid = header.kid.ok_or(AppError::Unauthorized)?;
                (self.jwks_key(&kid).await?, Validation::new(Algorithm::RS256))
            }
        };

        validation.validate_aud = false;
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }

        let claims = decode::<Claims>(token, &key, &validation)
            .map_err(|e| {
                debug!(error = %e, "Token rejected");
                AppError::Unauthorized
            })?
            .claims;

        if jwks_mode && claims.token_use.as_deref() != Some("access") {
            debug!(token_use = ?claims.token_use, "Only access tokens are accepted");
            return Err(AppError::Unauthorized);
        }

        if let Some(expected) = &self.client_id {
            let presented = claims.client_id.as_ref().or(claims.aud.as_ref());
            if presented != Some(expected) {
                debug!(client_id = ?presented, "Token issued for another client");
                return Err(AppError::Unauthorized);
            }
        }

        Ok(claims)
    }

    async fn jwks_key(&self, kid: &str) -> Result<DecodingKey, AppError> {
        let KeySource::Jwks {
            url,
            http,
            keys,
            last_fetch,
            min_refresh_interval,
        } = &self.source
        else {
            return Err(AppError::Unauthorized);
        };

        if let Some(key) = keys.get(kid).await {
            return Ok(key);
        }

        // Unknown kid: the pool may have rotated its signing keys
        let mut last_fetch = last_fetch.lock().await;
        if let Some(key) = keys.get(kid).await {
            return Ok(key);
        }
        if last_fetch.is_some_and(|at| at.elapsed() < *min_refresh_interval) {
            debug!(kid = %kid, "Unknown key id within JWKS refresh interval");
            return Err(AppError::Unauthorized);
        }
        *last_fetch = Some(Instant::now());

        let jwks: JwkSet = http
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::Internal(anyhow::anyhow!("JWKS fetch failed: {}", e)))?
            .json()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("JWKS parse failed: {}", e)))?;

        for jwk in &jwks.keys {
            let Some(key_id) = jwk.common.key_id.clone() else {
                continue;
            };
            match DecodingKey::from_jwk(jwk) {
                Ok(key) => keys.insert(key_id, key).await,
                Err(e) => warn!(kid = %key_id, error = %e, "Skipping unusable JWK"),
            }
        }
        debug!(count = jwks.keys.len(), "JWKS refreshed");

        keys.get(kid).await.ok_or_else(|| {
            debug!(kid = %kid, "Token signed with unknown key");
            AppError::Unauthorized
        })
    }
}

fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(&request).ok_or(AppError::Unauthorized)?;
    let claims = state.verifier.verify(token).await?;

    request
        .extensions_mut()
        .insert(AuthenticatedUser::from(claims));

    Ok(next.run(request).await)
}

pub async fn require_super_admin(request: Request, next: Next) -> Result<Response, AppError> {
    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .ok_or(AppError::Unauthorized)?;

    if !user.is_super_admin() {
        warn!(sub = %user.sub, "Non-admin request to admin route");
        return Err(AppError::access_denied());
    }

    Ok(next.run(request).await)
}
