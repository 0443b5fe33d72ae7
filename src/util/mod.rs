//! Utility functions for common operations.
//!
//! - **Host resolution**: host-with-port for URLs and raw hrefs
//! - **Text processing**: terminal-safe, width-aware rendering of feed text

mod host;
mod text;

pub use host::{host_of, href_host};
pub use text::{
    clean_line, display_width, one_line, strip_control_chars, terminal_width, truncate_to_width,
};
