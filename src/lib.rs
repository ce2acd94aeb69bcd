//! feedpress: a scheduled RSS import pipeline.
//!
//! Fetches configured feeds, keeps items whose title or text mentions a
//! keyword, rewrites their wording, and publishes them with a source
//! attribution and featured image into a WordPress-compatible site.

pub mod config;
pub mod feed;
pub mod filter;
pub mod image;
pub mod pipeline;
pub mod repository;
pub mod rewrite;
pub mod scheduler;
pub mod settings;
pub mod util;
