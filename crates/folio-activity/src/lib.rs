//! Cache-backed remote fetching for the folio live activity feed.
//!
//! - **CachedFetcher**: TTL cache in front of any [`RemoteSource`], with a
//!   per-attempt timeout and bounded retries with backoff
//! - **ActivityFeedClient**: the HTTP source for `GET /activities`
//!
//! Fetching is advisory. Failures come back as a
//! [`FetchOutcome`] with an empty value and an error string, never as a
//! panic or `Err`.
//!
//! # Example
//!
//! ```no_run
//! use folio_activity::prelude::*;
//! use folio_scheduler::TokioClock;
//! use std::time::Duration;
//!
//! # async fn run() -> Result<(), FetchConfigError> {
//! let feed = ActivityFeedClient::new("https://api.example.com", Duration::from_secs(10))?
//!     .into_feed(FetcherConfig::default(), TokioClock::shared())?;
//!
//! let outcome = feed.get(&ActivityQuery::with_limit(5)).await;
//! if let Some(reason) = &outcome.error {
//!     eprintln!("activity feed unavailable: {reason}");
//! }
//! # Ok(())
//! # }
//! ```

#![deny(clippy::unwrap_used)]
#![deny(static_mut_refs)]
#![deny(unused_must_use)]

pub mod activity;
pub mod cache;
pub mod client;
pub mod error;
pub mod fetcher;

pub mod prelude;

pub use activity::{Activity, ActivityId, ActivityQuery, DEFAULT_ACTIVITY_LIMIT, newest_first};
pub use cache::{CacheEntry, TtlCache, cache_key};
pub use client::{ActivityFeed, ActivityFeedClient};
pub use error::{FetchConfigError, FetchError, FetchResult};
pub use fetcher::{CachedFetcher, FetchOutcome, FetchState, FetcherConfig, RemoteSource};
