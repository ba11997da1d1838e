use anyhow::{Context, Result};
use clap::Parser;
use csvchart::config::Config;
use csvchart::server::{self, AppState};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "csvchart=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::parse();
    config.validate().context("Invalid configuration")?;

    let state = AppState::from_config(&config);
    state
        .store
        .ensure_dir()
        .context("Failed to create upload directory")?;

    let addr = config.bind_addr()?;

    info!("Starting csvchart on http://{}", addr);
    info!("Upload directory: {}", state.store.root().display());
    info!("Allowed extensions: {}", config.allowed_extensions().join(", "));
    info!("Upload limit: {} MB", config.upload_limit_mb);

    let app = server::router(state).layer(tower_http::trace::TraceLayer::new_for_http());
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
