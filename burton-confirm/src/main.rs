//! burton-confirm - email confirmation capability for member login
//!
//! Long-running service that:
//! - Accepts `{ email }` from the member login client
//! - Finds the matching auth account through the provider's admin API
//!   (retrying while a freshly created account propagates)
//! - Marks that account's email as confirmed

mod admin;
mod api;
mod config;
mod confirm;
mod error;
mod state;

use config::Config;
use state::AppState;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load .env file
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "burton_confirm=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;

    tracing::info!("Starting burton-confirm (env: {})", config.environment);

    let state = AppState::new(&config)?;
    let app = api::create_router(state);

    let http_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&http_addr).await?;
    tracing::info!("burton-confirm HTTP listening on {http_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
