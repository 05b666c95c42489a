//! Client-side state derived from the backend: the query cache and the
//! live feeds.

pub mod cache;
pub mod feed;
pub mod invalidation;

pub use cache::{Cached, Invalidation, QueryCache, QueryKey, QueryState, Resource};
pub use feed::{FeedItem, LiveFeed, StoredMessage};
pub use invalidation::invalidations_for;
