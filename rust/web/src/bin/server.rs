//! Letterbox game server.
//!
//! Usage: cargo run -p letterbox_web --bin letterbox-server -- --database games.db

use clap::Parser;
use letterbox_web::{ServerSettings, SettingsOverrides, WebServer};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "letterbox-server", version, about = "Realtime Letterbox game server")]
struct Cli {
    /// TOML settings file
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,
    /// Address to bind to (default 0.0.0.0)
    #[arg(long)]
    host: Option<String>,
    /// Port to listen on (default 4000)
    #[arg(long, short = 'p')]
    port: Option<u16>,
    /// SQLite file for game snapshots
    #[arg(long, short = 'd')]
    database: Option<PathBuf>,
    /// Allowed CORS origin; repeat for several
    #[arg(long = "allowed-origin")]
    allowed_origins: Vec<String>,
    /// Minutes an idle game stays in memory
    #[arg(long)]
    session_ttl_minutes: Option<u64>,
}

impl From<Cli> for SettingsOverrides {
    fn from(cli: Cli) -> Self {
        Self {
            config: cli.config,
            host: cli.host,
            port: cli.port,
            allowed_origins: cli.allowed_origins,
            database: cli.database,
            session_ttl_minutes: cli.session_ttl_minutes,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    letterbox_web::init_logging()?;

    let overrides = SettingsOverrides::from(Cli::parse());
    let settings = match ServerSettings::load(&overrides) {
        Ok(settings) => settings,
        Err(err) => {
            tracing::error!(error = %err, "invalid server settings");
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    };

    tracing::info!(
        host = %settings.host,
        port = settings.port,
        session_ttl_minutes = settings.session_ttl_minutes,
        "starting letterbox server"
    );

    let server = match WebServer::from_settings(&settings) {
        Ok(server) => server,
        Err(err) => {
            tracing::error!(error = %err, "failed to open game store");
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    };
    let handle = server.start().await?;

    tokio::signal::ctrl_c().await?;

    tracing::info!("shutting down");
    handle.shutdown().await?;
    Ok(())
}
