//! postline-stats - Engagement metrics for published posts

use clap::Parser;
use libpostline::analytics::AnalyticsStore;
use libpostline::credentials::CredentialStore;
use libpostline::network::rest::RestNetwork;
use libpostline::network::SocialNetwork;
use libpostline::posts::PostRepository;
use libpostline::publisher::Publisher;
use libpostline::types::PostStatus;
use libpostline::{Config, Database, Result};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "postline-stats")]
#[command(about = "Show engagement metrics for a user's published posts", long_about = None)]
struct Cli {
    /// Local user whose posts to show
    #[arg(short, long)]
    user: String,

    /// Refresh metrics from the network before printing
    #[arg(short, long)]
    refresh: bool,

    /// Output format (text or json)
    #[arg(short, long, default_value = "text")]
    format: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    libpostline::logging::init("error", cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let db = Arc::new(Database::new(&config.database.path).await?);
    let posts = Arc::new(PostRepository::new(Arc::clone(&db)));
    let analytics = Arc::new(AnalyticsStore::new(Arc::clone(&db)));
    let network: Arc<dyn SocialNetwork> = Arc::new(RestNetwork::new(&config.network)?);
    let credentials = CredentialStore::new(
        Arc::clone(&db),
        Arc::clone(&network),
        config.network.clone(),
    );
    let publisher = Publisher::new(network, Arc::clone(&posts), Arc::clone(&analytics));

    let published = posts
        .list_by_owner_and_status(&cli.user, PostStatus::Published)
        .await?;

    let now = chrono::Utc::now().timestamp();
    let credential = credentials.get_active_credential(&cli.user).await?;

    let mut rows = Vec::new();
    for post in &published {
        let record = if cli.refresh {
            publisher
                .refresh_analytics(post, credential.as_ref(), now)
                .await?
        } else {
            match analytics.get(&post.id).await? {
                Some(record) => record,
                None => continue,
            }
        };
        rows.push((post, record));
    }

    if cli.format == "json" {
        let value: Vec<_> = rows
            .iter()
            .map(|(post, record)| {
                serde_json::json!({
                    "id": post.id,
                    "title": post.title,
                    "external_id": post.external_id,
                    "impressions": record.impressions,
                    "clicks": record.clicks,
                    "likes": record.likes,
                    "comments": record.comments,
                    "shares": record.shares,
                    "engagement_rate": record.engagement_rate,
                    "last_refreshed": record.last_refreshed,
                })
            })
            .collect();
        println!("{}", serde_json::json!(value));
    } else if rows.is_empty() {
        println!("No published posts with metrics for {}", cli.user);
    } else {
        for (post, record) in &rows {
            println!(
                "{}  {:<30}  views {:>6}  clicks {:>4}  likes {:>4}  rate {:.2}%",
                post.id,
                truncate(&post.title, 30),
                record.impressions,
                record.clicks,
                record.likes,
                record.engagement_rate * 100.0,
            );
        }
    }

    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}
