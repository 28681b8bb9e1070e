//! postline-compose - Author posts, by hand or from a topic

use clap::Parser;
use libpostline::analytics::AnalyticsStore;
use libpostline::credentials::CredentialStore;
use libpostline::generation::Gateway;
use libpostline::network::rest::RestNetwork;
use libpostline::network::SocialNetwork;
use libpostline::posts::PostRepository;
use libpostline::publisher::Publisher;
use libpostline::rate_limiter::RateLimiter;
use libpostline::types::{Post, PostStatus};
use libpostline::{Config, Database, PostlineError, Result};
use std::io::Read;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "postline-compose")]
#[command(about = "Create a post: draft it, schedule it, or publish it now", long_about = None)]
struct Cli {
    /// Post body (reads from stdin if not provided and no --topic)
    body: Option<String>,

    /// Local user who owns the post
    #[arg(short, long)]
    user: String,

    /// Post title
    #[arg(short, long, default_value = "")]
    title: String,

    /// Category tag
    #[arg(long)]
    category: Option<String>,

    /// Generate title, body, and image from this topic instead of writing one
    #[arg(long, conflicts_with = "body")]
    topic: Option<String>,

    /// Skip the generated image even when a topic is given
    #[arg(long, requires = "topic")]
    no_image: bool,

    /// Schedule for later, e.g. "90m", "2h", "tomorrow 9am"
    #[arg(short, long, conflicts_with = "now")]
    schedule: Option<String>,

    /// Publish immediately instead of saving a draft
    #[arg(long)]
    now: bool,

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

    let mut post = build_post(&cli, &config).await?;
    post.category = cli.category.clone();

    if let Some(schedule) = &cli.schedule {
        let now = chrono::Utc::now().timestamp();
        post.scheduled_for = Some(libpostline::scheduling::parse_future_schedule(
            schedule, now,
        )?);
        post.status = PostStatus::Scheduled;
    }

    posts.create(&post).await?;

    let mut external_id = None;
    if cli.now {
        external_id = Some(publish_now(&config, &db, &posts, &post).await?);
        post = posts.get_by_id(&post.id).await?.ok_or_else(|| {
            PostlineError::InvalidInput(format!("Post not found: {}", post.id))
        })?;
    }

    print_result(&cli.format, &post, external_id.as_deref());
    Ok(())
}

/// Assemble the post content from the CLI: generated from a topic, or
/// written by hand (argument or stdin)
async fn build_post(cli: &Cli, config: &Config) -> Result<Post> {
    if let Some(topic) = &cli.topic {
        let limiter = Arc::new(RateLimiter::new(&config.rate_limits));
        let gateway = Gateway::from_config(
            &config.generation,
            config.network.request_timeout_secs,
            limiter,
        )?;

        let generated = gateway.generate_complete_post(&cli.user, topic).await?;
        let mut post = Post::new_draft(&cli.user, &generated.title, &generated.body);
        if !cli.no_image {
            post.image_url = generated.image_url;
        }
        post.ai_generated = true;
        post.source_topic = Some(generated.topic);
        return Ok(post);
    }

    let body = match &cli.body {
        Some(body) => body.clone(),
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|e| PostlineError::InvalidInput(format!("Failed to read stdin: {}", e)))?;
            buffer.trim().to_string()
        }
    };

    if body.is_empty() {
        return Err(PostlineError::InvalidInput(
            "Post body cannot be empty".to_string(),
        ));
    }

    Ok(Post::new_draft(&cli.user, &cli.title, &body))
}

/// Immediate publication path: requires an active, unexpired credential
async fn publish_now(
    config: &Config,
    db: &Arc<Database>,
    posts: &Arc<PostRepository>,
    post: &Post,
) -> Result<String> {
    let network: Arc<dyn SocialNetwork> = Arc::new(RestNetwork::new(&config.network)?);
    let credentials = CredentialStore::new(
        Arc::clone(db),
        Arc::clone(&network),
        config.network.clone(),
    );
    let analytics = Arc::new(AnalyticsStore::new(Arc::clone(db)));
    let publisher = Publisher::new(network, Arc::clone(posts), analytics);

    let now = chrono::Utc::now().timestamp();
    let credential = credentials
        .get_active_credential(&post.owner_id)
        .await?
        .ok_or_else(|| {
            PostlineError::NotAuthorized(format!("{} has no linked account", post.owner_id))
        })?;

    publisher.publish_and_record(post, &credential, now).await
}

fn print_result(format: &str, post: &Post, external_id: Option<&str>) {
    if format == "json" {
        let value = serde_json::json!({
            "id": post.id,
            "status": post.status.as_str(),
            "scheduled_for": post.scheduled_for,
            "external_id": external_id,
            "ai_generated": post.ai_generated,
        });
        println!("{}", value);
    } else {
        match (post.status, external_id) {
            (PostStatus::Published, Some(id)) => {
                println!("Published {} as {}", post.id, id);
            }
            (PostStatus::Scheduled, _) => {
                println!(
                    "Scheduled {} for {}",
                    post.id,
                    post.scheduled_for.unwrap_or_default()
                );
            }
            _ => println!("Saved draft {}", post.id),
        }
    }
}
