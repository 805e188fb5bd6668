//! MentorHub - student/mentor management portal API.

use anyhow::{Context, Result};
use clap::Parser;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mentorhub_backend::{
    api::{build_router, AppState},
    auth::{AuthState, IdentityStore, TokenService},
    config::Config,
    db::PortalDb,
    middleware::{request_logging, AttemptGuard, AttemptGuardConfig},
};

#[derive(Parser, Debug)]
#[command(name = "mentorhub", about = "Student/mentor management portal API")]
struct Cli {
    /// Override the listen port
    #[arg(long)]
    port: Option<u16>,
    /// Override the database path
    #[arg(long)]
    database: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mentorhub_backend=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(database) = cli.database {
        config.database_path = database;
    }

    // Both stores share one SQLite file
    let identities = Arc::new(IdentityStore::new(&config.database_path)?);
    let db = Arc::new(PortalDb::new(&config.database_path)?);

    let tokens = Arc::new(TokenService::new(
        config.jwt_secret.clone(),
        config.token_ttl_hours,
    ));
    let auth_state = AuthState::new(identities.clone(), tokens);

    let guard = AttemptGuard::new(AttemptGuardConfig {
        max_attempts: config.login_max_attempts,
        window: Duration::from_secs(config.login_window_secs),
    });

    // Background maintenance: drop expired revocations and stale attempt
    // counters
    let revocations = auth_state.revocations.clone();
    let cleanup_guard = guard.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(600));
        loop {
            interval.tick().await;
            revocations.prune(chrono::Utc::now().timestamp());
            cleanup_guard.cleanup();
        }
    });

    let app_state = AppState { db, identities };
    let app = build_router(app_state, auth_state, guard)
        .layer(axum::middleware::from_fn(request_logging));

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("MentorHub API listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("Server error")?;

    Ok(())
}
