use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lyricdash::{catalog::CatalogConfig, lyrics::LyricsConfig, state::AppState, types::GameConfig};

const DEFAULT_ADDR: &str = "0.0.0.0:6574";

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist, only log if it's a different issue
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lyricdash=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting LyricDash...");

    let catalog = match CatalogConfig::from_env().build_provider() {
        Ok(provider) => provider,
        Err(e) => {
            tracing::error!("Failed to initialize catalog provider: {}", e);
            std::process::exit(1);
        }
    };

    let lyrics = match LyricsConfig::from_env().build_provider() {
        Ok(provider) => provider,
        Err(e) => {
            tracing::error!("Failed to initialize lyrics provider: {}", e);
            std::process::exit(1);
        }
    };

    let config = GameConfig::from_env();
    tracing::info!("Game config: {:?}", config);

    let state = Arc::new(AppState::new(Arc::new(catalog), Arc::new(lyrics), config));
    let app = lyricdash::app(state);

    let addr_text = std::env::var("LYRICDASH_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
    let addr: SocketAddr = match addr_text.parse() {
        Ok(addr) => addr,
        Err(e) => {
            tracing::error!("Invalid LYRICDASH_ADDR {:?}: {}", addr_text, e);
            std::process::exit(1);
        }
    };
    tracing::info!("Listening on http://{}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
    }
}
