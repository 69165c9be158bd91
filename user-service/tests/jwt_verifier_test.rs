//! RS256 verification against a JWKS served from a local listener

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};

use user_service::error::AppError;
use user_service::middleware::JwtVerifier;

const PRIVATE_KEY: &str = include_str!("fixtures/rs256_private.pem");
const MODULUS: &str = "zobKL3_m3kE1zN8Or-Fb7jjsiauKK-nZ5FLOHwQz-v_OgnpyJYSMim_PkGTN2KtGethx3E2ktJjF5vOjgRHv1gXScdGwvpNF_4yz82m_QzArTOSCk2gG30TtcnPnVfBA2jxmIkGwy1N6L3_V_gE7KOF3zo5gsNgj5xOVfve9lZWi7fu9q3ALBpSNG5rbsic-RKe7kFZq0TjiOnmPcZFh4ksWyUQjQmmGiG54yR1GuC9mZ_7H3t5BoS3eSQCsxsL60GSWFKkXqJhlfZFew0kdat7nALF3hhE8EPv3sHG5IHbvWm8z90J3VEew9fmavJ9K6YdgJzzipoegvP4AkbZf1w";
const ISSUER: &str = "https://cognito-idp.ap-southeast-2.amazonaws.com/ap-southeast-2_test";
const CLIENT_ID: &str = "web-client";

/// JWKS endpoint that publishes the fixture key under the listed key ids
#[derive(Clone, Default)]
struct JwksStub {
    kids: Arc<Mutex<Vec<String>>>,
    fetches: Arc<AtomicUsize>,
}

impl JwksStub {
    fn publish(&self, kid: &str) {
        self.kids.lock().unwrap().push(kid.to_string());
    }

    fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    async fn start(&self) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new()
            .route("/.well-known/jwks.json", get(serve_jwks))
            .with_state(self.clone());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        format!("http://{}/.well-known/jwks.json", addr)
    }
}

async fn serve_jwks(State(stub): State<JwksStub>) -> Json<Value> {
    stub.fetches.fetch_add(1, Ordering::SeqCst);
    let keys: Vec<Value> = stub
        .kids
        .lock()
        .unwrap()
        .iter()
        .map(|kid| {
            json!({
                "kty": "RSA",
                "kid": kid,
                "alg": "RS256",
                "use": "sig",
                "n": MODULUS,
                "e": "AQAB"
            })
        })
        .collect();
    Json(json!({ "keys": keys }))
}

async fn verifier(stub: &JwksStub) -> JwtVerifier {
    JwtVerifier::jwks(
        stub.start().await,
        ISSUER,
        Some(CLIENT_ID.to_string()),
        Duration::from_secs(3600),
    )
}

fn sign(kid: Option<&str>, claims: &Value) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = kid.map(str::to_string);
    encode(
        &header,
        claims,
        &EncodingKey::from_rsa_pem(PRIVATE_KEY.as_bytes()).unwrap(),
    )
    .unwrap()
}

fn access_claims() -> Value {
    let now = Utc::now().timestamp();
    json!({
        "sub": "sub-1",
        "iss": ISSUER,
        "client_id": CLIENT_ID,
        "token_use": "access",
        "username": "ada@example.com",
        "iat": now,
        "exp": now + 600,
        "cognito:groups": ["Customers"]
    })
}

fn with_claim(key: &str, value: Value) -> Value {
    let mut claims = access_claims();
    claims[key] = value;
    claims
}

#[tokio::test]
async fn test_accepts_access_token_signed_by_pool_key() {
    let stub = JwksStub::default();
    stub.publish("k1");
    let verifier = verifier(&stub).await;

    let token = sign(Some("k1"), &access_claims());
    let claims = verifier.verify(&token).await.unwrap();
    assert_eq!(claims.sub, "sub-1");
    assert_eq!(claims.groups, vec!["Customers".to_string()]);

    verifier.verify(&token).await.unwrap();
    assert_eq!(stub.fetches(), 1);
}

#[tokio::test]
async fn test_rejects_wrong_issuer_client_or_token_use() {
    let stub = JwksStub::default();
    stub.publish("k1");
    let verifier = verifier(&stub).await;

    let rejected = [
        sign(Some("k1"), &with_claim("iss", json!("https://issuer.example.com/other"))),
        sign(Some("k1"), &with_claim("client_id", json!("another-client"))),
        sign(Some("k1"), &with_claim("token_use", json!("id"))),
        sign(None, &access_claims()),
    ];

    for token in rejected {
        assert!(matches!(
            verifier.verify(&token).await,
            Err(AppError::Unauthorized)
        ));
    }
}

#[tokio::test]
async fn test_unknown_kids_share_one_jwks_fetch() {
    let stub = JwksStub::default();
    stub.publish("k1");
    let verifier = verifier(&stub).await;

    for kid in ["x1", "x2", "x3", "x4"] {
        assert!(matches!(
            verifier.verify(&sign(Some(kid), &access_claims())).await,
            Err(AppError::Unauthorized)
        ));
    }
    assert_eq!(stub.fetches(), 1);

    // k1 arrived with the first fetch
    verifier
        .verify(&sign(Some("k1"), &access_claims()))
        .await
        .unwrap();
    assert_eq!(stub.fetches(), 1);
}

#[tokio::test]
async fn test_rotated_key_is_fetched_after_refresh_interval() {
    let stub = JwksStub::default();
    stub.publish("k1");
    let verifier = verifier(&stub).await.with_min_refresh_interval(Duration::ZERO);

    verifier
        .verify(&sign(Some("k1"), &access_claims()))
        .await
        .unwrap();

    let rotated = sign(Some("k2"), &access_claims());
    assert!(verifier.verify(&rotated).await.is_err());
    assert_eq!(stub.fetches(), 2);

    stub.publish("k2");
    let claims = verifier.verify(&rotated).await.unwrap();
    assert_eq!(claims.sub, "sub-1");
    assert_eq!(stub.fetches(), 3);
}
