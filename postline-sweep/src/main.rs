//! postline-sweep - Background daemon for scheduled publishing
//!
//! Polls the post queue on a fixed interval and drives due posts through
//! the publication engine, one sweep per tick.

use clap::Parser;
use libpostline::analytics::AnalyticsStore;
use libpostline::credentials::CredentialStore;
use libpostline::network::rest::RestNetwork;
use libpostline::network::SocialNetwork;
use libpostline::posts::PostRepository;
use libpostline::publisher::Publisher;
use libpostline::sweep::Sweeper;
use libpostline::{Config, Database, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "postline-sweep")]
#[command(version)]
#[command(about = "Background daemon for scheduled publishing")]
#[command(long_about = "\
postline-sweep - Background daemon for scheduled publishing

DESCRIPTION:
    postline-sweep is a long-running daemon that polls the Postline
    database for scheduled posts whose time has come and publishes each
    one to the connected social network.

    Every tick claims a bounded batch of due posts, processes them in
    ascending scheduled order, and records the outcome on each post row.
    A failing post never blocks the rest of the batch.

USAGE:
    # Run in foreground (logs to stderr)
    postline-sweep

    # Run with custom poll interval
    postline-sweep --poll-interval 30

    # Run a single sweep and print the report as JSON
    postline-sweep --once

SIGNALS:
    SIGTERM, SIGINT - Graceful shutdown (finishes the current sweep)

CONFIGURATION:
    Configuration file: ~/.config/postline/config.toml

    [scheduler]
    batch_size = 20        # posts per sweep
    poll_interval = 60     # seconds between sweeps
    claim_lease_secs = 600 # abandoned claims lapse after this

EXIT CODES:
    0 - Clean shutdown
    1 - Runtime or configuration error
    2 - Authorization error
")]
struct Cli {
    /// Poll interval in seconds (overrides config)
    #[arg(long, value_name = "SECONDS")]
    #[arg(help = "How often to check for due posts (default: from config)")]
    poll_interval: Option<u64>,

    /// Enable verbose logging to stderr
    #[arg(short, long)]
    verbose: bool,

    /// Run one sweep, print the report as JSON, and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    libpostline::logging::init("info", cli.verbose);

    if let Err(e) = run(cli).await {
        error!("{}", e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let (sweeper, credentials) = build_pipeline(&config).await?;

    info!("postline-sweep daemon starting");

    let shutdown = Arc::new(AtomicBool::new(false));
    setup_signal_handlers(shutdown.clone())?;

    let poll_interval = cli.poll_interval.unwrap_or(config.scheduler.poll_interval);
    info!("Poll interval: {}s", poll_interval);

    if cli.once {
        let report = sweeper.run_sweep(chrono::Utc::now().timestamp()).await?;
        println!("{}", serde_json::to_string_pretty(&report).unwrap_or_default());
    } else {
        run_daemon_loop(&sweeper, &credentials, poll_interval, shutdown).await;
    }

    info!("postline-sweep daemon stopped");
    Ok(())
}

/// Wire the publication pipeline from configuration
async fn build_pipeline(config: &Config) -> Result<(Sweeper, Arc<CredentialStore>)> {
    let db = Arc::new(Database::new(&config.database.path).await?);
    let network: Arc<dyn SocialNetwork> = Arc::new(RestNetwork::new(&config.network)?);

    let posts = Arc::new(PostRepository::new(Arc::clone(&db)));
    let analytics = Arc::new(AnalyticsStore::new(Arc::clone(&db)));
    let credentials = Arc::new(CredentialStore::new(
        Arc::clone(&db),
        Arc::clone(&network),
        config.network.clone(),
    ));
    let publisher = Arc::new(Publisher::new(network, Arc::clone(&posts), analytics));

    let sweeper = Sweeper::new(
        posts,
        Arc::clone(&credentials),
        publisher,
        &config.scheduler,
    );
    Ok((sweeper, credentials))
}

/// Set up signal handlers for graceful shutdown
fn setup_signal_handlers(shutdown: Arc<AtomicBool>) -> Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM]).map_err(|e| {
        libpostline::PostlineError::InvalidInput(format!("Signal setup failed: {}", e))
    })?;

    let shutdown_clone = shutdown.clone();
    std::thread::spawn(move || {
        for sig in signals.forever() {
            match sig {
                SIGTERM | SIGINT => {
                    info!("Received shutdown signal, stopping gracefully...");
                    shutdown_clone.store(true, Ordering::Relaxed);
                    break;
                }
                _ => {}
            }
        }
    });

    Ok(())
}

/// Main daemon loop
async fn run_daemon_loop(
    sweeper: &Sweeper,
    credentials: &CredentialStore,
    poll_interval: u64,
    shutdown: Arc<AtomicBool>,
) {
    loop {
        if shutdown.load(Ordering::Relaxed) {
            info!("Shutdown requested, stopping daemon loop");
            break;
        }

        let now = chrono::Utc::now().timestamp();
        match sweeper.run_sweep(now).await {
            Ok(report) if report.scanned > 0 => {
                info!(
                    "Sweep: {} published, {} failed of {} scanned",
                    report.published, report.failed, report.scanned
                );
            }
            Ok(_) => {}
            Err(e) => error!("Sweep error: {}", e),
        }

        // Housekeeping piggybacks on the tick
        if let Err(e) = credentials.purge_expired_states(now).await {
            error!("State purge error: {}", e);
        }

        // Sleep until next poll (check shutdown every second)
        for _ in 0..poll_interval {
            if shutdown.load(Ordering::Relaxed) {
                break;
            }
            sleep(Duration::from_secs(1)).await;
        }
    }
}
