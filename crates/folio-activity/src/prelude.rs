//! Prelude for folio-activity.

pub use crate::activity::{Activity, ActivityId, ActivityQuery};
pub use crate::client::{ActivityFeed, ActivityFeedClient};
pub use crate::error::{FetchConfigError, FetchError, FetchResult};
pub use crate::fetcher::{CachedFetcher, FetchOutcome, FetchState, FetcherConfig, RemoteSource};
