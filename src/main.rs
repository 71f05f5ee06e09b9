use anyhow::Result;
use clap::Parser;
use rand::Rng;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use modresolve::advisor::{AdvisorError, AdvisoryService, GeminiClient, UnconfiguredAdvisor};
use modresolve::api::auth::hash_password;
use modresolve::config::Config;
use modresolve::store::{RootAdmin, Store};
use modresolve::AppState;

#[derive(Parser, Debug)]
#[command(name = "modresolve")]
#[command(author, version, about = "AI-assisted Minecraft error log analysis", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "modresolve.toml")]
    config: PathBuf,

    /// Override log level
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(&cli.config)?;

    // Initialize logging
    let log_level = cli
        .log_level
        .as_ref()
        .unwrap_or(&config.logging.level)
        .clone();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting ModResolve v{}", env!("CARGO_PKG_VERSION"));

    // Bootstrap identity for the root administrator. The store only ever
    // sees the hash.
    let admin_password = match config.auth.admin_password.clone() {
        Some(password) => password,
        None => {
            let bytes: [u8; 12] = rand::rng().random();
            let password = hex::encode(bytes);
            tracing::warn!(
                "No admin password configured; generated one for this bootstrap: {} \
                 (set auth.admin_password or MODRESOLVE_ADMIN_PASSWORD to control it)",
                password
            );
            password
        }
    };
    let root_admin = RootAdmin {
        name: config.auth.admin_name.clone(),
        email: config.auth.admin_email.clone(),
        password_hash: hash_password(&admin_password)
            .map_err(|e| anyhow::anyhow!("Failed to hash admin password: {}", e))?,
    };

    // Open the credential store
    let store = Store::open(&config.server.data_dir, root_admin).await?;

    // Wire up the advisory service
    let advisor: Arc<dyn AdvisoryService> = match GeminiClient::from_config(&config.advisor) {
        Ok(client) => Arc::new(client),
        Err(AdvisorError::NotConfigured) => {
            tracing::warn!(
                "No advisor API key configured; advice endpoints will return a service error"
            );
            Arc::new(UnconfiguredAdvisor)
        }
        Err(e) => return Err(e.into()),
    };

    // Create app state and router
    let state = Arc::new(AppState::new(config.clone(), store, advisor));
    let app = modresolve::api::create_router(state);

    // Start API server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("API server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
