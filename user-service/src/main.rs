use std::sync::Arc;

use aws_config::{BehaviorVersion, Region};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use user_service::config::Config;
use user_service::db::{Database, PgAddressRepository};
use user_service::middleware::JwtVerifier;
use user_service::services::{AddressBook, CognitoIdentityProvider, UserDirectory};
use user_service::{build_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    // Load configuration
    let config = Config::load()?;
    tracing::info!(
        region = %config.aws.region,
        user_pool_id = %config.cognito.user_pool_id,
        "Configuration loaded successfully"
    );

    // Initialize database connection
    let db = Database::connect(&config).await?;
    db.run_migrations().await?;

    // Identity provider client
    let aws = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(config.aws.region.clone()))
        .load()
        .await;
    let cognito = CognitoIdentityProvider::new(
        aws_sdk_cognitoidentityprovider::Client::new(&aws),
        config.cognito.user_pool_id.clone(),
    );

    // Build application state
    let state = AppState {
        users: Arc::new(UserDirectory::new(
            Arc::new(cognito),
            config.users.employee_groups.clone(),
        )),
        addresses: Arc::new(AddressBook::new(Arc::new(PgAddressRepository::new(
            db.pg.clone(),
        )))),
        verifier: Arc::new(JwtVerifier::from_config(&config)),
    };

    let app = build_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "user_service=info,tower_http=info".into());

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
