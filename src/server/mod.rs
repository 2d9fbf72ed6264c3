use crate::config::AppConfig;
use crate::db::Database;
use anyhow::Context;
use std::path::PathBuf;
use std::sync::Arc;

pub mod routes;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    /// Working directory the `SSOT_PATH` is resolved against.
    pub base_dir: PathBuf,
    pub ssot_path: String,
    pub api_token: Option<String>,
}

impl AppState {
    pub fn new(db: Arc<Database>, base_dir: PathBuf, config: &AppConfig) -> Self {
        Self {
            db,
            base_dir,
            ssot_path: config.ssot_path.clone(),
            api_token: config.api_token.clone(),
        }
    }
}

pub async fn run_server(config: &AppConfig) -> anyhow::Result<()> {
    let database_url = config.require_database_url()?;
    let db = Arc::new(Database::open_url(database_url).context("failed to open store")?);
    tracing::info!(store = ?db.location(), "store opened");
    let base_dir = std::env::current_dir().context("failed to read working directory")?;
    let app = routes::router(AppState::new(db, base_dir, config));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!(addr = %config.bind_addr, "lifeos server listening");
    println!("lifeos server listening on http://{}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    tracing::info!("lifeos server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %error, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
