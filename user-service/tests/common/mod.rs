#![allow(dead_code)]

pub mod fake_identity_provider;
pub mod memory_addresses;

use std::env;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use tower::ServiceExt;

use user_service::middleware::JwtVerifier;
use user_service::services::{AddressBook, UserDirectory};
use user_service::{build_router, AppState};

use fake_identity_provider::FakeIdentityProvider;
use memory_addresses::MemoryAddressRepository;

pub const TEST_SECRET: &str = "integration-test-secret";

pub fn test_database_url() -> Option<String> {
    env::var("DATABASE_URL").ok()
}

/// Router wired to in-memory collaborators
pub struct TestApp {
    pub router: Router,
    pub provider: Arc<FakeIdentityProvider>,
    pub addresses: Arc<MemoryAddressRepository>,
}

impl TestApp {
    pub fn new() -> Self {
        let provider = Arc::new(FakeIdentityProvider::new());
        provider.add_user("admin-sub", "root@example.com", "Root", "Admin", &["SuperAdmins"]);
        provider.add_user("steward-sub", "steward@example.com", "Sam", "Steward", &["DataStewards"]);
        provider.add_user("customer-sub", "ada@example.com", "Ada", "Lovelace", &["Customers"]);

        let addresses = Arc::new(MemoryAddressRepository::default());

        let state = AppState {
            users: Arc::new(UserDirectory::new(
                provider.clone(),
                vec!["SuperAdmins".to_string(), "DataStewards".to_string()],
            )),
            addresses: Arc::new(AddressBook::new(addresses.clone())),
            verifier: Arc::new(JwtVerifier::shared_secret(TEST_SECRET)),
        };

        Self {
            router: build_router(state),
            provider,
            addresses,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        (status, value)
    }
}

/// HS256 token with user pool style claims
pub fn token_for(sub: &str, email: &str, groups: &[&str]) -> String {
    let now = Utc::now().timestamp();
    let claims = json!({
        "sub": sub,
        "email": email,
        "iat": now,
        "exp": now + 600,
        "token_use": "access",
        "cognito:groups": groups,
    });

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
    )
    .unwrap()
}

pub fn admin_token() -> String {
    token_for("admin-sub", "root@example.com", &["SuperAdmins"])
}

pub fn customer_token() -> String {
    token_for("customer-sub", "ada@example.com", &["Customers"])
}

pub fn address_body(street: &str) -> Value {
    json!({
        "street": street,
        "city": "Sydney",
        "state": "NSW",
        "postalCode": "2000",
        "country": "Australia"
    })
}
