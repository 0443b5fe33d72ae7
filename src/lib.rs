//! Collects outbound links from link-roundup RSS feeds, lets the operator
//! dismiss articles, and queues chosen links to Buffer.

pub mod app;
pub mod config;
pub mod feed;
pub mod html;
pub mod post;
pub mod storage;
pub mod util;
pub mod view;
