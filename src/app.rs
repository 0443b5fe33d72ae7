use crate::config::FeedSource;
use crate::feed::{refresh_all, Article, RefreshError};
use crate::post::{PostError, Publisher, UpdateOptions};
use crate::storage::Database;
use crate::view::build_view;
use anyhow::Result;
use reqwest::redirect::Policy;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;

// ============================================================================
// Events and Errors
// ============================================================================

/// Messages from background tasks to the front end.
#[derive(Debug)]
pub enum AppEvent {
    /// A refresh cycle finished. `error` is set when the previous list was kept.
    RefreshComplete {
        articles: usize,
        error: Option<String>,
    },
}

/// Failure to post a link and record it as queued.
#[derive(Debug, Error)]
pub enum CommitError {
    #[error("url not provided")]
    MissingUrl,
    #[error("Posting failed: {0}")]
    Post(#[from] PostError),
    /// The post went out but the queue record could not be written.
    #[error("Posted, but failed to record link as queued: {0}")]
    Store(String),
}

/// Create a custom redirect policy with loop detection and limited hops.
///
/// - Limits redirects to 3 hops maximum
/// - Detects redirect loops (same URL appearing twice in chain)
fn create_redirect_policy() -> Policy {
    Policy::custom(|attempt| {
        if attempt.previous().len() >= 3 {
            return attempt.error("Too many redirects (max 3)");
        }

        let url = attempt.url();
        if attempt.previous().iter().any(|prev| prev.as_str() == url.as_str()) {
            return attempt.error("Redirect loop detected");
        }

        tracing::debug!(
            from = %attempt.previous().last().map(|u| u.as_str()).unwrap_or("initial"),
            to = %url,
            hop = attempt.previous().len() + 1,
            "Following redirect"
        );

        attempt.follow()
    })
}

/// HTTP client shared by feed polling and posting.
pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .redirect(create_redirect_policy())
        .pool_max_idle_per_host(4)
        .pool_idle_timeout(Duration::from_secs(30))
        .tcp_keepalive(Duration::from_secs(60))
        .timeout(timeout)
        .user_agent(concat!("bufferlinks/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

// ============================================================================
// App
// ============================================================================

/// Application state shared between the front end and background refreshes.
pub struct App {
    db: Database,
    http_client: reqwest::Client,
    sources: Vec<FeedSource>,
    /// Published article list. Replaced wholesale; never mutated in place.
    last_fetch: RwLock<Arc<Vec<Article>>>,
}

impl App {
    pub fn new(db: Database, http_client: reqwest::Client, sources: Vec<FeedSource>) -> Self {
        Self {
            db,
            http_client,
            sources,
            last_fetch: RwLock::new(Arc::new(Vec::new())),
        }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn http_client(&self) -> &reqwest::Client {
        &self.http_client
    }

    /// The most recently published article list.
    pub async fn snapshot(&self) -> Arc<Vec<Article>> {
        Arc::clone(&*self.last_fetch.read().await)
    }

    /// Poll every source and publish the result.
    ///
    /// On failure the previously published list stays in place.
    pub async fn refresh(&self) -> Result<usize, RefreshError> {
        let articles = refresh_all(&self.http_client, &self.sources).await?;
        let count = articles.len();
        *self.last_fetch.write().await = Arc::new(articles);
        tracing::info!(articles = count, "Published refreshed article list");
        Ok(count)
    }

    /// Run [`App::refresh`] in the background and report on `event_tx`.
    pub fn spawn_refresh(self: &Arc<Self>, event_tx: mpsc::Sender<AppEvent>) -> JoinHandle<()> {
        let app = Arc::clone(self);
        tokio::spawn(async move {
            let event = match app.refresh().await {
                Ok(articles) => AppEvent::RefreshComplete {
                    articles,
                    error: None,
                },
                Err(e) => {
                    tracing::error!(error = %e, "Refresh failed, keeping previous articles");
                    AppEvent::RefreshComplete {
                        articles: app.snapshot().await.len(),
                        error: Some(e.to_string()),
                    }
                }
            };
            if let Err(e) = event_tx.send(event).await {
                tracing::warn!(error = %e, event = "RefreshComplete", "Channel send failed (receiver dropped)");
            }
        })
    }

    /// Current articles merged with dismissal and queue state.
    pub async fn articles(&self) -> Result<Vec<Article>> {
        let snapshot = self.snapshot().await;
        build_view(&snapshot, &self.db).await
    }

    pub async fn dismiss(&self, url: &str) -> Result<()> {
        self.db.mark_article_dismissed(url).await?;
        Ok(())
    }

    /// Post `update` and, once the post is accepted, record its link as queued.
    ///
    /// Nothing is written when posting fails.
    pub async fn commit_link<P: Publisher>(
        &self,
        publisher: &P,
        profile_ids: &[String],
        update: &UpdateOptions,
        article_url: Option<&str>,
    ) -> Result<(), CommitError> {
        if update.link_url.is_empty() {
            return Err(CommitError::MissingUrl);
        }

        publisher.publish(profile_ids, update).await?;

        self.db
            .mark_link_queued(&update.link_url, article_url)
            .await
            .map_err(|e| CommitError::Store(format!("{e:#}")))?;
        tracing::info!(url = %update.link_url, "Pushed post to buffer");
        Ok(())
    }
}
