//! Log-search backend client for tracestitch
//!
//! Everything that talks to the log-search backend lives here:
//!
//! - **Client**: the single-endpoint query runner
//! - **Resolver**: arbitrary identifier → canonical CDN request id
//! - **Root locator**: CDN request id → edge entry + pivot activation id
//! - **Decorator**: batched log correlation onto an assembled span list

mod client;
mod decorate;
mod error;
mod hit;
mod query;
mod resolver;
mod root;

pub use client::LogSearchClient;
pub use error::{LogSearchError, LogSearchResult};
pub use hit::{HitSource, RawHit, SearchResponse};
pub use query::{fields, SearchQuery, KEYWORD_INDEX_LIMIT};
