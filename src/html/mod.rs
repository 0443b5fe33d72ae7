//! HTML tree traversal for feed item bodies.
//!
//! - [`walker`] - Depth-first traversal driven by a [`Visitor`]
//! - [`flatten`] - Text flattening, used for link context
//! - [`links`] - Anchor extraction into [`Link`](crate::feed::Link) records

mod flatten;
mod links;
mod walker;

pub use flatten::{flatten, TextFlattener};
pub use links::{extract_links, find_links, ExtractError, LinkExtractor, MAX_BODY_SIZE};
pub use walker::{walk, Continue, Visit, Visitor, MAX_DEPTH};
