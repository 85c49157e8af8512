//! Photox - command line client for the album API
//!
//! Loads the settings and the stored session, runs one command, and
//! reports when the session has ended and a new login is needed.

mod commands;
mod logging;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use commands::Commands;
use photox_application::ports::KeyValueStore;
use photox_application::{ApiClient, SessionStore};
use photox_domain::SessionEvent;
use photox_infrastructure::{
    ClientSettings, FileKeyValueStore, MemoryKeyValueStore, ReqwestTransport,
};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

#[derive(Parser, Debug)]
#[command(name = "photox")]
#[command(about = "Command line client for the Photox album API")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to ./photox.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// API root, overriding the configuration
    #[arg(long, global = true, env = "PHOTOX_BASE_URL")]
    base_url: Option<String>,

    /// Keep the session in memory only
    #[arg(long, global = true)]
    ephemeral: bool,

    /// Log level used when RUST_LOG is not set
    #[arg(short = 'l', long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

async fn connect(cli: &Cli) -> Result<ApiClient, commands::CommandError> {
    let mut settings = ClientSettings::load_from(cli.config.as_deref())?;
    if let Some(base_url) = &cli.base_url {
        settings.base_url.clone_from(base_url);
    }
    debug!(?settings, "settings loaded");

    let store: Arc<dyn KeyValueStore> = if cli.ephemeral {
        Arc::new(MemoryKeyValueStore::new())
    } else {
        Arc::new(FileKeyValueStore::new(settings.session_file.clone()))
    };
    let session = SessionStore::load(store).await?;
    let transport = ReqwestTransport::new(&settings)?;

    Ok(ApiClient::with_endpoints(
        Arc::new(transport),
        session,
        settings.endpoints(),
    ))
}

/// Logs the login prompt when the session is invalidated.
///
/// The task ends once every clone of the client has been dropped.
fn watch_session(client: &ApiClient) -> JoinHandle<()> {
    let mut events = client.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(SessionEvent::Invalidated { reason }) => {
                    warn!(%reason, "session ended; run `photox login` to sign in again");
                }
                Ok(event) => debug!(?event, "session event"),
                Err(RecvError::Lagged(skipped)) => debug!(skipped, "session events skipped"),
                Err(RecvError::Closed) => break,
            }
        }
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();
    logging::init_logging(&cli.log_level);

    let client = connect(&cli).await?;
    let watcher = watch_session(&client);

    let result = cli.command.execute(client).await;
    if watcher.await.is_err() {
        debug!("session watcher stopped early");
    }

    result.inspect_err(|e| error!("command failed: {e}"))
}
