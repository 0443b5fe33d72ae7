//! Feed ingestion: fetch RSS feeds and turn their items into articles with
//! outbound links.
//!
//! - [`parser`] - Feed parsing using the `feed-rs` crate
//! - [`fetcher`] - HTTP retrieval, link extraction and self-link filtering
//! - [`types`] - The in-memory [`Article`] and [`Link`] model

mod fetcher;
mod parser;
mod types;

pub use fetcher::{fetch, refresh_all, FetchError, RefreshError};
pub use parser::{parse_feed, ParsedFeed, ParsedItem};
pub use types::{Article, Link};
