use crate::config::FeedSource;
use crate::feed::parser::{parse_feed, ParsedFeed};
use crate::feed::{Article, Link};
use crate::html::find_links;
use crate::util::href_host;
use futures::StreamExt;
use thiserror::Error;

const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Errors that can occur while fetching a single feed.
///
/// Any of these aborts the whole feed: no partial article list is returned.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, client timeout)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Feed XML could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),
    /// The feed's own site link is not a valid URL reference
    #[error("Invalid site URL in feed: {0}")]
    SiteUrl(String),
    /// Response body exceeded the 10MB size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Response was incomplete (received fewer bytes than Content-Length)
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
}

/// A refresh cycle stopped at the named feed.
#[derive(Debug, Error)]
#[error("Failed to refresh {feed}: {source}")]
pub struct RefreshError {
    pub feed: String,
    #[source]
    pub source: FetchError,
}

/// Fetches every configured feed, one after another, and returns the
/// concatenated article list.
///
/// Each source's title filter is applied to its own articles. The first
/// failing feed aborts the cycle so the caller can keep its previous list
/// instead of publishing a partial one.
pub async fn refresh_all(
    client: &reqwest::Client,
    sources: &[FeedSource],
) -> Result<Vec<Article>, RefreshError> {
    let mut articles = Vec::new();

    for source in sources {
        tracing::info!(feed = %source.name, url = %source.url, "Polling feed");

        let fetched = fetch(client, &source.url)
            .await
            .map_err(|e| RefreshError {
                feed: source.name.clone(),
                source: e,
            })?;

        let total = fetched.len();
        articles.extend(
            fetched
                .into_iter()
                .filter(|article| source.matches_title(&article.title)),
        );
        tracing::debug!(
            feed = %source.name,
            fetched = total,
            collected = articles.len(),
            "Feed polled"
        );
    }

    Ok(articles)
}

/// Fetches one feed and turns its items into articles with outbound links.
///
/// # Errors
///
/// - [`FetchError::Network`] - Connection, TLS or client timeout errors
/// - [`FetchError::HttpStatus`] - Non-2xx HTTP response
/// - [`FetchError::ResponseTooLarge`] - Response exceeded 10MB
/// - [`FetchError::Parse`] - Invalid feed XML
/// - [`FetchError::SiteUrl`] - Feed site link is not a valid URL reference
pub async fn fetch(client: &reqwest::Client, url: &str) -> Result<Vec<Article>, FetchError> {
    let response = client.get(url).send().await?;

    if !response.status().is_success() {
        return Err(FetchError::HttpStatus(response.status().as_u16()));
    }

    let bytes = read_limited_bytes(response, MAX_FEED_SIZE).await?;
    let feed = parse_feed(&bytes).map_err(|e| FetchError::Parse(e.to_string()))?;

    // A missing or relative site link leaves the host empty, which only
    // matches links that carry no host either.
    let site = feed.site_url.as_deref().unwrap_or_default();
    let site_host = href_host(site).ok_or_else(|| FetchError::SiteUrl(site.to_string()))?;
    if site_host.is_empty() {
        tracing::debug!(site = %site, "Feed site link has no host");
    }

    Ok(collect_articles(feed, &site_host))
}

/// Extract links per item, drop self-links, and keep items that had links.
fn collect_articles(feed: ParsedFeed, site_host: &str) -> Vec<Article> {
    let feed_title = feed.title;

    feed.items
        .into_iter()
        .filter_map(|item| {
            let links = match find_links(&item.body) {
                Ok(links) => links,
                Err(e) => {
                    tracing::warn!(title = %item.title, error = %e, "Link extraction failed");
                    Vec::new()
                }
            };

            // Decided on the unfiltered count: an item whose links all point
            // back at the feed's own site still shows up, with no links.
            if links.is_empty() {
                return None;
            }

            Some(Article {
                title: item.title,
                url: item.url,
                links: external_links(links, site_host),
                feed: feed_title.clone(),
                date: item.published,
            })
        })
        .collect()
}

/// Drop links pointing at `site_host`. Links that fail to parse are kept.
fn external_links(links: Vec<Link>, site_host: &str) -> Vec<Link> {
    links
        .into_iter()
        .filter(|link| match href_host(&link.url) {
            Some(host) => host != site_host,
            None => true,
        })
        .collect()
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    let expected_length = response.content_length();

    if let Some(len) = expected_length {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    if let Some(expected) = expected_length {
        if (bytes.len() as u64) < expected {
            return Err(FetchError::IncompleteResponse {
                expected,
                received: bytes.len(),
            });
        }
    }

    Ok(bytes)
}
