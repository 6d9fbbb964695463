use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use inkwell_api::{AppState, AppStateInner, build_router};
use inkwell_crypto::{CredentialHasher, TokenService};

/// Secrets that must never sign real tokens.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me", "dev-secret-change-me", "secret"];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "inkwell=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let api_secret = std::env::var("API_SECRET").unwrap_or_default();
    if api_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&api_secret.as_str()) {
        anyhow::bail!("API_SECRET is unset or still a placeholder; set it in .env and restart");
    }

    let db_path = std::env::var("INKWELL_DB_PATH").unwrap_or_else(|_| "inkwell.db".into());
    let host = std::env::var("INKWELL_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("INKWELL_PORT")
        .unwrap_or_else(|_| "8080".into())
        .parse()?;
    let token_ttl: i64 = std::env::var("INKWELL_TOKEN_TTL_SECS")
        .unwrap_or_else(|_| "3600".into())
        .parse()?;

    // Init database
    let db = inkwell_db::Database::open(&PathBuf::from(&db_path), CredentialHasher::default())?;

    // Shared state
    let tokens = TokenService::new(api_secret).with_ttl(chrono::Duration::seconds(token_ttl));
    let state: AppState = Arc::new(AppStateInner { db, tokens });

    let app = build_router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Inkwell server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
