use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tower_http::trace::TraceLayer;

mod admin;
mod config;
mod expiry;
mod normalize;
mod remote;

use admin::AppState;
use config::PanelConfig;
use remote::ApiClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "keywarden=info,tower_http=warn".into()),
        )
        .init();

    println!("Keywarden v{} - remote API key panel", env!("CARGO_PKG_VERSION"));

    let config_path = PathBuf::from(
        std::env::var("KEYWARDEN_CONFIG").unwrap_or_else(|_| "keywarden.json".to_string()),
    );
    let config = PanelConfig::load_or_init(&config_path)?;
    if config.api_base.is_empty() {
        tracing::warn!("api_base is not configured; remote key operations are disabled");
    }

    let state = Arc::new(AppState::new(config, config_path, ApiClient::new()));
    let app = admin::panel_router(state).layer(TraceLayer::new_for_http());

    let addr = std::env::var("KEYWARDEN_BIND").unwrap_or_else(|_| "0.0.0.0:5000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "keywarden listening");
    axum::serve(listener, app).await?;
    Ok(())
}
