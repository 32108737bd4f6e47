//! # commune binary
//!
//! The entry point that assembles the application based on compile-time
//! features.

use std::sync::Arc;

use anyhow::Context;
use secrecy::ExposeSecret;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cm_api::AppState;
use cm_config::Settings;

// Feature-gated imports: the binary is compiled to order.
#[cfg(feature = "auth-simple")]
use cm_auth_simple::SimpleAuthProvider;
#[cfg(feature = "db-sqlite")]
use cm_db_sqlite::SqliteForumRepo;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Settings::load()?;

    // 1. Initialize the persistence implementation
    #[cfg(feature = "db-sqlite")]
    let repo = SqliteForumRepo::new(&settings.database_url)
        .await
        .context("initializing sqlite")?;

    // 2. Initialize the session implementation
    #[cfg(feature = "auth-simple")]
    let auth = SimpleAuthProvider::new(settings.session_secret.expose_secret());

    // 3. Wrap in AppState (dynamic dispatch keeps the api crate plugin-free)
    let state = AppState { repo: Arc::new(repo), auth: Arc::new(auth) };

    let app = cm_api::router(state);
    let listener = tokio::net::TcpListener::bind(&settings.bind_addr)
        .await
        .with_context(|| format!("binding {}", settings.bind_addr))?;
    info!("commune listening on http://{}", settings.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving")?;
    info!("commune shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("installing Ctrl+C handler");
        info!("received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("installing signal handler")
            .recv()
            .await;
        info!("received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
