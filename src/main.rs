use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use connections_blogs::{BlogsConfig, BlogsService, Post, PostQuery};

/// Get the default config file path (~/.config/connections-blogs/config.toml)
fn default_config_path() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home)
        .join(".config")
        .join("connections-blogs")
        .join("config.toml"))
}

#[derive(Parser, Debug)]
#[command(name = "connections-blogs", about = "IBM Connections Blogs API client")]
struct Args {
    /// Path to the config file (defaults to ~/.config/connections-blogs/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Base URL of the Blogs application (overrides config and env)
    #[arg(long)]
    base_url: Option<String>,

    /// Username for basic auth
    #[arg(long)]
    username: Option<String>,

    /// Password for basic auth (prefer CONNECTIONS_PASSWORD)
    #[arg(long)]
    password: Option<String>,

    /// Emit the normalized records as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List a blog's entries
    Posts {
        /// Blog handle, e.g. "homepage"
        handle: String,

        /// 1-based page index
        #[arg(long)]
        page: Option<u32>,

        /// Page size (server caps at 50)
        #[arg(long)]
        ps: Option<u32>,

        /// Full-text search filter
        #[arg(long)]
        search: Option<String>,

        /// Comma-separated tag filter
        #[arg(long)]
        tags: Option<String>,
    },
    /// Fetch a single entry by its id
    Post {
        /// Blog handle, e.g. "homepage"
        handle: String,

        /// Entry id (the trailing UUID segment)
        entry_id: String,
    },
}

fn format_timestamp(millis: Option<i64>) -> String {
    millis
        .and_then(chrono::DateTime::<chrono::Utc>::from_timestamp_millis)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn print_post_line(post: &Post) {
    println!(
        "{}  {:<16}  {:>5} hits  {}",
        post.id,
        format_timestamp(post.published),
        post.hit,
        post.title
    );
}

fn print_post(post: &Post) {
    println!("Title:     {}", post.title);
    println!("Id:        {}", post.id);
    if let Some(author) = &post.author {
        println!("Author:    {} ({})", author.name, author.user_id);
    }
    if !post.status.is_empty() {
        println!("Status:    {}", post.status);
    }
    println!("Published: {}", format_timestamp(post.published));
    println!("Updated:   {}", format_timestamp(post.updated));
    println!("Hits:      {}", post.hit);
    if let Some(comments) = &post.comments {
        println!("Comments:  {}", comments.count);
    }
    if let Some(recommendations) = &post.recommendations {
        println!("Likes:     {}", recommendations.count);
    }
    println!();
    println!("{}", post.content);
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing for debug logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => default_config_path()?,
    };
    let mut config = BlogsConfig::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    config.apply_env();
    if let Some(base_url) = args.base_url {
        config.base_url = base_url;
    }
    if let Some(username) = args.username {
        config.username = Some(username);
    }
    if let Some(password) = args.password {
        config.password = Some(password);
    }

    let service = BlogsService::new(config).context("Failed to construct Blogs client")?;

    match args.command {
        Command::Posts {
            handle,
            page,
            ps,
            search,
            tags,
        } => {
            let query = PostQuery {
                page,
                ps,
                search,
                tags,
                ..PostQuery::default()
            };
            let feed = service
                .get_posts(&handle, &query)
                .await
                .with_context(|| format!("Failed to fetch posts for blog '{}'", handle))?;

            if args.json {
                println!("{}", serde_json::to_string_pretty(&feed)?);
            } else {
                println!(
                    "{} of {} posts",
                    feed.entries.len(),
                    feed.total_results
                );
                for post in &feed.entries {
                    print_post_line(post);
                }
            }
        }
        Command::Post { handle, entry_id } => {
            let post = service
                .get_post(&handle, &entry_id)
                .await
                .with_context(|| format!("Failed to fetch post '{}'", entry_id))?;

            if args.json {
                println!("{}", serde_json::to_string_pretty(&post)?);
            } else {
                print_post(&post);
            }
        }
    }

    Ok(())
}
