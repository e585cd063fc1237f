//! # gitsearch
//!
//! Search code on GitHub and collect the text matches by repository and file.
//!
//! Every result page is fetched in order. Rate-limit responses are waited out
//! and the same page is requested again, so a search either completes or
//! fails as a whole. Fragments are re-checked against the literal query term,
//! folded per repository, and returned sorted by repository name.
//!
//! ## Main Components
//!
//! - [`GitHubSearcher`]: fetches pages, handles rate limits, drives the search
//! - [`MatchFilter`]: decides which returned fragments are real matches
//! - [`ResultAggregator`]: folds hits into per-repository records
//! - [`OrderedResultSet`]: the sorted, read-only results
//! - [`Args`]: command line configuration
//!
//! ## Example
//!
//! ```no_run
//! use gitsearch_lib::{GitHubSearcher, MatchFilter, SearchQuery};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let searcher = GitHubSearcher::with_base_url("https://api.github.com/", "ghp_...")?;
//!     let query = SearchQuery::new(&["tokio", "select"], Some("language:rust"));
//!
//!     let results = searcher.search(&query, MatchFilter::default(), false).await?;
//!     for repo in &results {
//!         println!("{} ({} files)", repo.name, repo.files.len());
//!     }
//!
//!     Ok(())
//! }
//! ```

mod aggregator;
mod args;
mod error;
mod filter;
mod github_searcher;
mod ordered;
mod query;
mod rate_limit;
pub mod render;

pub use crate::aggregator::{highlight_anchor, FileRecord, RawMatch, RepoRecord, ResultAggregator};
pub use crate::args::{Args, OutputFormat};
pub use crate::error::{Result, SearchError};
pub use crate::filter::MatchFilter;
pub use crate::github_searcher::{api_base, GitHubSearcher, Organization, SearchPage, DEFAULT_API_BASE};
pub use crate::ordered::OrderedResultSet;
pub use crate::query::{PageCursor, SearchQuery, MAX_PER_PAGE};
pub use crate::rate_limit::{next_page, retry_after, Quota};
