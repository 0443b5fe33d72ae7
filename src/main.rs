use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use bufferlinks::app::{build_http_client, App, AppEvent};
use bufferlinks::config::Config;
use bufferlinks::feed::Article;
use bufferlinks::post::{BufferClient, UpdateOptions};
use bufferlinks::storage::{Database, DatabaseError};
use bufferlinks::util::{clean_line, terminal_width};

/// Get the config directory path (~/.config/bufferlinks/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    let config_dir = PathBuf::from(home).join(".config").join("bufferlinks");
    Ok(config_dir)
}

#[derive(Parser, Debug)]
#[command(
    name = "bufferlinks",
    about = "Collect outbound links from RSS link roundups and queue them to Buffer"
)]
struct Args {
    /// Config file (default: ~/.config/bufferlinks/config.toml)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// State database (default: ~/.config/bufferlinks/bufferlinks.db)
    #[arg(long, value_name = "FILE", global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch all feeds and print undismissed articles with their links
    List,
    /// Refresh on an interval and reprint the list after each refresh
    Watch {
        /// Minutes between refreshes (overrides config)
        #[arg(long)]
        interval: Option<u64>,
    },
    /// Hide an article from future listings
    Dismiss {
        /// Article URL exactly as listed
        url: String,
    },
    /// List the Buffer profiles on the account
    Profiles,
    /// Post a link to Buffer and mark it as queued
    Post {
        /// Link to share
        #[arg(long)]
        url: String,
        /// Post text
        #[arg(long)]
        content: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Article the link was found in
        #[arg(long)]
        article: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing for debug logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    // Set up config directory
    let config_dir = get_config_dir()?;
    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;
        eprintln!("Created config directory: {}", config_dir.display());
    }

    // User-only access on Unix
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o700);
        if let Err(e) = std::fs::set_permissions(&config_dir, perms) {
            tracing::warn!(
                path = %config_dir.display(),
                error = %e,
                "Failed to set config directory permissions to 0700"
            );
        }
    }

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| config_dir.join("config.toml"));
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    let db_path = args
        .db
        .clone()
        .unwrap_or_else(|| config_dir.join("bufferlinks.db"));
    let db_path_str = db_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;
    let db = match Database::open(db_path_str).await {
        Ok(db) => db,
        Err(DatabaseError::InstanceLocked) => {
            eprintln!(
                "Error: Another instance of bufferlinks appears to be running. Please close it and try again."
            );
            std::process::exit(1);
        }
        Err(e) => {
            return Err(anyhow::anyhow!("Failed to open database: {}", e));
        }
    };

    let http_client = build_http_client(Duration::from_secs(config.request_timeout_secs))
        .context("Failed to create HTTP client")?;
    let app = Arc::new(App::new(db, http_client, config.feeds.clone()));

    match args.command {
        Command::List => {
            let count = app.refresh().await.context("Refresh failed")?;
            tracing::info!(articles = count, "Fetched articles");
            print_articles(&app.articles().await?, terminal_width());
        }
        Command::Watch { interval } => {
            let minutes = interval.unwrap_or(config.refresh_interval_minutes);
            watch(&app, minutes).await?;
        }
        Command::Dismiss { url } => {
            app.dismiss(&url).await?;
            println!("Dismissed {url}");
        }
        Command::Profiles => {
            let client = buffer_client(&app, &config)?;
            let profiles = client.profiles().await.context("Error getting profiles")?;
            let width = terminal_width();
            for profile in profiles {
                let line = format!(
                    "{} {} {}",
                    profile.id, profile.service, profile.formatted_username
                );
                print_line(0, &line, width);
            }
        }
        Command::Post {
            url,
            content,
            title,
            description,
            article,
        } => {
            let client = buffer_client(&app, &config)?;
            let profile_ids: Vec<String> = client
                .profiles()
                .await
                .context("Error getting profiles")?
                .into_iter()
                .filter(|p| p.service == config.buffer.service)
                .map(|p| p.id)
                .collect();
            if profile_ids.is_empty() {
                anyhow::bail!("No Buffer profiles on service '{}'", config.buffer.service);
            }

            let update = UpdateOptions {
                content,
                link_url: url,
                link_title: title.unwrap_or_default(),
                link_description: description.unwrap_or_default(),
            };
            app.commit_link(&client, &profile_ids, &update, article.as_deref())
                .await?;
            println!("pushed post to buffer");
        }
    }

    Ok(())
}

fn buffer_client(app: &App, config: &Config) -> Result<BufferClient> {
    let token = config.buffer.resolve_token().context(
        "No Buffer access token: set BUFFER_ACCESS_TOKEN or buffer.access_token in config",
    )?;
    let client = BufferClient::new(
        app.http_client().clone(),
        token,
        config.buffer.base_url.as_deref(),
    )?;
    Ok(client)
}

/// Refresh in the background and reprint after each completed cycle until
/// Ctrl-C. An interval of 0 refreshes once.
async fn watch(app: &Arc<App>, minutes: u64) -> Result<()> {
    let (event_tx, mut event_rx) = mpsc::channel::<AppEvent>(8);
    app.spawn_refresh(event_tx.clone());

    loop {
        tokio::select! {
            event = event_rx.recv() => {
                let Some(AppEvent::RefreshComplete { articles, error }) = event else {
                    break;
                };
                match error {
                    Some(e) => eprintln!("Refresh failed ({articles} articles kept): {e}"),
                    None => tracing::info!(articles, "Refresh complete"),
                }
                print_articles(&app.articles().await?, terminal_width());

                if minutes == 0 {
                    break;
                }
                let app = Arc::clone(app);
                let tx = event_tx.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_secs(minutes * 60)).await;
                    app.spawn_refresh(tx);
                });
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                break;
            }
        }
    }
    Ok(())
}

/// Print `text` as one cleaned line, indented by `indent` spaces.
fn print_line(indent: usize, text: &str, width: usize) {
    let budget = width.saturating_sub(indent);
    println!("{:indent$}{}", "", clean_line(text, budget));
}

fn print_articles(articles: &[Article], width: usize) {
    if articles.is_empty() {
        println!("No articles.");
        return;
    }

    for article in articles {
        let date = article
            .date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "----------".to_string());
        print_line(0, &format!("{date} {} [{}]", article.title, article.feed), width);
        print_line(2, &article.url, width);

        for link in &article.links {
            let marker = if link.queued { "*" } else { "-" };
            let label = if link.text.trim().is_empty() {
                link.domain.as_str()
            } else {
                link.text.as_str()
            };
            print_line(4, &format!("{marker} {label} <{}>", link.url), width);
            if !link.context.trim().is_empty() {
                print_line(8, &link.context, width);
            }
        }
        println!();
    }
}
