//! postline-connect - Manage the social network connection
//!
//! Walks a user through the OAuth authorization flow and manages the
//! stored credential.

use anyhow::Result;
use clap::{Parser, Subcommand};
use libpostline::credentials::CredentialStore;
use libpostline::network::rest::RestNetwork;
use libpostline::network::SocialNetwork;
use libpostline::{Config, Database};
use std::sync::Arc;
use tracing::error;

#[derive(Parser)]
#[command(name = "postline-connect")]
#[command(about = "Connect and disconnect the social network account", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the authorization URL to open in a browser
    Url {
        /// Local user the connection belongs to
        #[arg(long)]
        user: String,
    },

    /// Complete the flow with the code and state from the callback
    Complete {
        /// Local user the connection belongs to
        #[arg(long)]
        user: String,

        /// Authorization code from the callback
        #[arg(long)]
        code: String,

        /// State parameter from the callback
        #[arg(long)]
        state: String,
    },

    /// Show the connection status for a user
    Status {
        #[arg(long)]
        user: String,
    },

    /// Disconnect the active credential (kept inactive for audit)
    Disconnect {
        #[arg(long)]
        user: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    libpostline::logging::init("info", cli.verbose);

    if let Err(e) = run_command(cli.command).await {
        error!("{}", e);
        std::process::exit(1);
    }

    Ok(())
}

async fn run_command(command: Commands) -> Result<()> {
    let config = Config::load()?;
    let db = Arc::new(Database::new(&config.database.path).await?);
    let network: Arc<dyn SocialNetwork> = Arc::new(RestNetwork::new(&config.network)?);
    let store = CredentialStore::new(db, network, config.network.clone());

    match command {
        Commands::Url { user } => {
            let url = store.begin_authorization(&user).await?;
            println!("{}", url);
            Ok(())
        }
        Commands::Complete { user, code, state } => {
            let credential = store.complete_authorization(&user, &code, &state).await?;
            println!(
                "Connected {} as {} (token expires {})",
                user,
                credential.display_name.as_deref().unwrap_or(&credential.external_id),
                format_timestamp(credential.expires_at),
            );
            Ok(())
        }
        Commands::Status { user } => {
            match store.get_active_credential(&user).await? {
                Some(credential) => {
                    let now = chrono::Utc::now().timestamp();
                    let state = if credential.is_expired(now) {
                        "expired"
                    } else {
                        "active"
                    };
                    println!(
                        "{}: {} ({}, scope: {}, expires {})",
                        user,
                        credential.display_name.as_deref().unwrap_or(&credential.external_id),
                        state,
                        credential.scope,
                        format_timestamp(credential.expires_at),
                    );
                }
                None => println!("{}: not connected", user),
            }
            Ok(())
        }
        Commands::Disconnect { user } => {
            store.disconnect(&user).await?;
            println!("Disconnected {}", user);
            Ok(())
        }
    }
}

fn format_timestamp(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| ts.to_string())
}
