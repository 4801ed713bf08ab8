//! Ledger API server

use std::path::PathBuf;
use std::sync::Arc;

use account_service::{AccountService, AccountServiceConfig};
use api_gateway::config::AppConfig;
use api_gateway::{router, AppState};
use clap::Parser;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;
use user_service::UserService;

/// Ledger API server
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Listening address, overrides HOST and PORT
    #[clap(short, long)]
    addr: Option<String>,

    /// JSON configuration file, overrides LEDGER_CONFIG
    #[clap(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv().ok();

    let args = Args::parse();

    // Initialize logging with debug level when DEBUG=1 env var is set
    let log_level = if std::env::var("DEBUG").as_deref() == Ok("1") {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let env_filter = EnvFilter::builder()
        .with_default_directive(log_level.into())
        .from_env_lossy()
        .add_directive("tower_http=debug".parse()?);
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    // Initialize services
    let config = AppConfig::load(args.config.as_deref())?;
    let mut account_config = AccountServiceConfig::from_env();
    account_config.repository_type = config.storage.clone();

    let account_service = Arc::new(AccountService::with_config(&account_config)?);
    let user_service = Arc::new(UserService::new());
    let state = Arc::new(AppState::new(account_service, user_service));

    let app = router(state);

    // Start the server
    let addr = args.addr.unwrap_or_else(|| config.bind_address());
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    // Run until interrupt signal
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown");
}
