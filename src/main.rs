use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use drive_manager::auth::hash_password;
use drive_manager::crypto::CryptoEngine;
use drive_manager::drive::DriveClient;
use drive_manager::providers::GoogleProvider;
use drive_manager::store::TokenStore;
use drive_manager::{api, AppState, Config, SharedState};

#[derive(Parser)]
#[command(name = "drive-manager", version, about = "Browse and download Google Drive files")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the web server (default).
    Serve,
    /// Create a login account.
    AddUser {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "drive_manager=info,tower_http=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let crypto = CryptoEngine::new(&config.master_key, &config.session_secret)?;
    let store = TokenStore::new(&config.database_url, crypto.clone()).await?;
    store.migrate().await?;
    info!("Database connected and migrated");

    match cli.command.unwrap_or(Command::Serve) {
        Command::AddUser { username, password } => {
            let hash = hash_password(&password)?;
            let id = store.create_user(username.trim(), &hash).await?;
            info!(user_id = id, "created user {username}");
            Ok(())
        }
        Command::Serve => serve(config, store, crypto).await,
    }
}

async fn serve(config: Config, store: TokenStore, crypto: CryptoEngine) -> Result<()> {
    info!("drive-manager v{}", env!("CARGO_PKG_VERSION"));

    let provider = GoogleProvider::new(
        config.google_client_id.clone(),
        config.google_client_secret.clone(),
    );
    let drive = DriveClient::new()?;

    let addr = format!("{}:{}", config.host, config.port);
    info!("OAuth redirect URI: {}", config.callback_url());

    let state: SharedState = Arc::new(AppState::new(
        config,
        store,
        crypto,
        Box::new(provider),
        drive,
    ));

    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {addr}");
    axum::serve(listener, app).await?;

    Ok(())
}
