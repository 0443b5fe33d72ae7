//! Posting links to a social scheduling service.

mod buffer;

pub use buffer::{BufferClient, Profile, Update};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PostError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    #[error("Unexpected response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Update rejected: {0}")]
    Rejected(String),
    #[error("Response too large (exceeds {0} bytes)")]
    ResponseTooLarge(usize),
    #[error("Insecure base URL: HTTPS required (except localhost for testing)")]
    InsecureBaseUrl,
    #[error("Invalid URL")]
    InvalidUrl,
}

/// Content of a single post.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    pub content: String,
    /// Empty means a text-only post.
    pub link_url: String,
    pub link_title: String,
    pub link_description: String,
}

/// Anything that can queue a post on a set of destination profiles.
#[allow(async_fn_in_trait)]
pub trait Publisher {
    async fn publish(&self, profile_ids: &[String], update: &UpdateOptions) -> Result<(), PostError>;
}
