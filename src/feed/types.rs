use chrono::{DateTime, Utc};

/// One feed item enriched with the outbound links found in its body.
///
/// Articles live in memory only. Each refresh builds a new list and the
/// previous one is discarded; only the dismissal flag is persisted, keyed by
/// `url`.
#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    pub title: String,
    /// Item link as published by the feed. Used verbatim as the state key.
    pub url: String,
    pub links: Vec<Link>,
    /// Title of the feed the item came from.
    pub feed: String,
    pub date: Option<DateTime<Utc>>,
}

/// An outbound hyperlink extracted from an article body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// The `href` exactly as written in the markup.
    pub url: String,
    /// Host (and explicit port) of `url`, empty for relative references.
    pub domain: String,
    /// Flattened text of the anchor's parent element.
    pub context: String,
    /// Flattened text of the anchor itself.
    pub text: String,

    /// Populated at render time from the state store.
    pub queued: bool,
    pub queued_at: Option<DateTime<Utc>>,
}

impl Link {
    pub fn new(url: impl Into<String>, domain: impl Into<String>, context: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            domain: domain.into(),
            context: context.into(),
            text: String::new(),
            queued: false,
            queued_at: None,
        }
    }
}
