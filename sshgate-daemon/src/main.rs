//! sshgate daemon - SSH-key authentication service.
//!
//! Serves the JSON challenge/response API and manages the user
//! directory. Users register an OpenSSH public key; authentication
//! proves possession of the matching private key without the key ever
//! leaving the client.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::signal;
use tracing_subscriber::EnvFilter;

use sshgate_auth::ledger::ChallengeLedger;
use sshgate_daemon::directory::SqliteUserDirectory;
use sshgate_daemon::http;
use sshgate_daemon::service::Authenticator;
use sshgate_daemon::sessions::MemorySessionStore;

/// sshgate daemon - SSH-key challenge/response authentication
#[derive(Parser)]
#[command(name = "sshgate-daemon", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to the user directory database (defaults to the platform
    /// data directory)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the authentication server (default if no command given)
    Serve {
        /// Listen address for the JSON API
        #[arg(long, default_value = "127.0.0.1:8444")]
        bind: SocketAddr,

        /// Seconds a pending challenge stays answerable
        #[arg(long, default_value_t = 300)]
        challenge_ttl: u64,

        /// Seconds an authenticated session stays valid
        #[arg(long, default_value_t = 3600)]
        session_ttl: u64,
    },

    /// User directory management
    User {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Register a user with their SSH public key
    Add {
        /// User id (login name)
        id: String,

        /// Display name
        #[arg(long, default_value = "")]
        name: String,

        /// OpenSSH public-key record, e.g. "ssh-ed25519 AAAA... laptop"
        #[arg(long)]
        key: String,
    },

    /// List registered users
    List,

    /// Remove a user
    Remove {
        /// User id to remove
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let db_path = cli.db.clone().unwrap_or_else(default_db_path);

    match cli.command {
        Some(Commands::User { action }) => cmd_user(&db_path, action).await,
        Some(Commands::Serve {
            bind,
            challenge_ttl,
            session_ttl,
        }) => cmd_serve(&db_path, bind, challenge_ttl, session_ttl).await,
        None => cmd_serve(&db_path, "127.0.0.1:8444".parse()?, 300, 3600).await,
    }
}

fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sshgate")
        .join("users.db")
}

/// Handle user subcommands.
async fn cmd_user(
    db_path: &PathBuf,
    action: UserAction,
) -> Result<(), Box<dyn std::error::Error>> {
    let directory = SqliteUserDirectory::open(db_path).await?;

    match action {
        UserAction::Add { id, name, key } => {
            let display_name = if name.is_empty() { id.clone() } else { name };
            let user = directory.register(&id, &display_name, &key).await?;
            println!("Registered {} ({})", user.id, user.display_name);
            println!("Key: {}", user.public_key_record);
        }
        UserAction::List => {
            let users = directory.list().await?;
            if users.is_empty() {
                println!("No users registered.");
            }
            for user in users {
                let registered = chrono::DateTime::from_timestamp(user.created_at, 0)
                    .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                println!("{}\t{}\t{}", user.id, user.display_name, registered);
            }
        }
        UserAction::Remove { id } => {
            if directory.remove(&id).await? {
                println!("Removed {id}");
            } else {
                println!("No such user: {id}");
            }
        }
    }

    Ok(())
}

/// Start the authentication server.
async fn cmd_serve(
    db_path: &PathBuf,
    bind: SocketAddr,
    challenge_ttl: u64,
    session_ttl: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!(path = %db_path.display(), "Opening user directory");
    let directory = Arc::new(SqliteUserDirectory::open(db_path).await?);

    let ledger = Arc::new(ChallengeLedger::new(Duration::from_secs(challenge_ttl)));
    let sessions = Arc::new(MemorySessionStore::new());

    let auth = Arc::new(Authenticator::new(
        directory,
        sessions.clone(),
        ledger.clone(),
        Duration::from_secs(session_ttl),
    ));

    let app = http::router(auth);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(
        bind = %bind,
        challenge_ttl_secs = challenge_ttl,
        session_ttl_secs = session_ttl,
        "sshgate daemon listening"
    );

    // Abandoned flows expire lazily; this just bounds memory.
    let sweeper = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            ledger.sweep_expired();
            sessions.sweep_expired();
        }
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    tracing::info!("Daemon shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl+C), initiating shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }
}
