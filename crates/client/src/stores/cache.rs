//! Keyed cache of server resources with explicit invalidation.
//!
//! Reads go through [`QueryCache::fetch`], which returns a fresh cached value
//! or runs the fetcher. Realtime events and successful mutations mark entries
//! stale via [`Invalidation`]s; the next read refetches.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use groupwatch_shared::ApiError;
use tokio::sync::watch;
use tokio::time::Instant;

/// Server resources the dashboard reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    WhatsAppStatus,
    AvailableGroups,
    Groups,
    GroupMembers,
    Messages,
    Events,
    EventSummary,
    Certificates,
    CertificateSummary,
    Broadcasts,
    SettingsSchedules,
    SettingsHistory,
    Welcome,
    Agents,
    Stats,
    AdminUsers,
}

/// Cache key: a resource, the group it is scoped to, and any other
/// parameters rendered to a string (filters, pagination).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub resource: Resource,
    pub group_id: Option<i64>,
    pub params: String,
}

impl QueryKey {
    pub fn new(resource: Resource) -> Self {
        Self {
            resource,
            group_id: None,
            params: String::new(),
        }
    }

    pub fn for_group(resource: Resource, group_id: Option<i64>) -> Self {
        Self {
            group_id,
            ..Self::new(resource)
        }
    }

    pub fn with_params(mut self, params: impl Into<String>) -> Self {
        self.params = params.into();
        self
    }
}

/// Which cached entries to mark stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invalidation {
    /// Every entry of the resource.
    All(Resource),
    /// Entries scoped to the group, plus unscoped entries (which include it).
    Group(Resource, i64),
}

impl Invalidation {
    pub fn resource(&self) -> Resource {
        match self {
            Invalidation::All(resource) | Invalidation::Group(resource, _) => *resource,
        }
    }

    fn matches(&self, key: &QueryKey) -> bool {
        match self {
            Invalidation::All(resource) => key.resource == *resource,
            Invalidation::Group(resource, group_id) => {
                key.resource == *resource
                    && key.group_id.map_or(true, |scoped| scoped == *group_id)
            }
        }
    }
}

struct Entry {
    value: Arc<dyn Any + Send + Sync>,
    fetched_at: Instant,
    invalidated: bool,
}

#[derive(Default)]
struct Store {
    entries: HashMap<QueryKey, Entry>,
    /// Bumped on every invalidation and clear; fetches note it before they
    /// start so anything that lands while they are in flight still applies.
    seq: u64,
    cleared_at: u64,
    resource_invalidated_at: HashMap<Resource, u64>,
    group_invalidated_at: HashMap<(Resource, i64), u64>,
}

impl Store {
    fn invalidated_since(&self, key: &QueryKey, since: u64) -> bool {
        let after = |at: Option<&u64>| at.is_some_and(|at| *at > since);
        if after(self.resource_invalidated_at.get(&key.resource)) {
            return true;
        }
        match key.group_id {
            Some(group_id) => after(self.group_invalidated_at.get(&(key.resource, group_id))),
            None => self
                .group_invalidated_at
                .iter()
                .any(|((resource, _), at)| *resource == key.resource && *at > since),
        }
    }
}

/// A cached value and whether it can be shown without refetching.
#[derive(Debug)]
pub struct Cached<T> {
    pub value: Arc<T>,
    pub fresh: bool,
}

/// Outcome of a read that degrades to stale data when the refetch fails.
#[derive(Debug)]
pub struct QueryState<T> {
    pub data: Option<Arc<T>>,
    /// Set when the latest fetch failed; `data` may still hold an older value.
    pub error: Option<ApiError>,
}

impl<T> QueryState<T> {
    pub fn is_offline(&self) -> bool {
        self.error.is_some()
    }
}

pub struct QueryCache {
    stale_after: Duration,
    store: Mutex<Store>,
    /// Bumped on every invalidation so views can refetch.
    revision: watch::Sender<u64>,
}

impl QueryCache {
    pub fn new(stale_after: Duration) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            stale_after,
            store: Mutex::new(Store::default()),
            revision,
        }
    }

    /// Cached value for `key`, if present and of type `T`.
    pub fn get<T: Any + Send + Sync>(&self, key: &QueryKey) -> Option<Cached<T>> {
        let store = self.lock();
        let entry = store.entries.get(key)?;
        let value = entry.value.clone().downcast::<T>().ok()?;
        Some(Cached {
            value,
            fresh: self.is_fresh(entry),
        })
    }

    pub fn insert<T: Any + Send + Sync>(&self, key: QueryKey, value: T) -> Arc<T> {
        let since = self.lock().seq;
        self.store_fetched(key, value, since)
    }

    /// Cache a value fetched after sequence point `since`. Invalidations seen
    /// in the meantime leave it stale; a clear in the meantime drops it.
    fn store_fetched<T: Any + Send + Sync>(&self, key: QueryKey, value: T, since: u64) -> Arc<T> {
        let value = Arc::new(value);
        let mut store = self.lock();
        if store.cleared_at > since {
            tracing::debug!(?key, "cache cleared during fetch, not storing");
            return value;
        }
        let invalidated = store.invalidated_since(&key, since);
        store.entries.insert(
            key,
            Entry {
                value: value.clone(),
                fetched_at: Instant::now(),
                invalidated,
            },
        );
        value
    }

    /// Return the fresh cached value or run `fetcher` and cache its result.
    pub async fn fetch<T, F, Fut>(&self, key: QueryKey, fetcher: F) -> Result<Arc<T>, ApiError>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        if let Some(cached) = self.get::<T>(&key) {
            if cached.fresh {
                return Ok(cached.value);
            }
        }
        let since = self.lock().seq;
        let value = fetcher().await?;
        Ok(self.store_fetched(key, value, since))
    }

    /// Like [`QueryCache::fetch`], but a failed refetch keeps serving the last
    /// value alongside the error.
    pub async fn query<T, F, Fut>(&self, key: QueryKey, fetcher: F) -> QueryState<T>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let previous = self.get::<T>(&key).map(|c| c.value);
        match self.fetch(key.clone(), fetcher).await {
            Ok(value) => QueryState {
                data: Some(value),
                error: None,
            },
            Err(error) => {
                tracing::debug!(?key, error = %error, "query failed, serving cached data");
                QueryState {
                    data: previous,
                    error: Some(error),
                }
            }
        }
    }

    /// Mark matching entries stale. Returns how many were affected.
    pub fn invalidate(&self, invalidation: Invalidation) -> usize {
        let mut count = 0;
        {
            let mut store = self.lock();
            store.seq += 1;
            let seq = store.seq;
            match invalidation {
                Invalidation::All(resource) => {
                    store.resource_invalidated_at.insert(resource, seq);
                }
                Invalidation::Group(resource, group_id) => {
                    store.group_invalidated_at.insert((resource, group_id), seq);
                }
            }
            for (key, entry) in store.entries.iter_mut() {
                if invalidation.matches(key) && !entry.invalidated {
                    entry.invalidated = true;
                    count += 1;
                }
            }
        }
        self.revision.send_modify(|r| *r += 1);
        count
    }

    pub fn invalidate_all(&self, invalidations: &[Invalidation]) -> usize {
        invalidations.iter().map(|i| self.invalidate(*i)).sum()
    }

    /// Run a mutation; on success invalidate the related queries. The error
    /// is returned untouched so the caller can show the server's message.
    pub async fn mutate<T, Fut>(
        &self,
        request: Fut,
        invalidates: &[Invalidation],
    ) -> Result<T, ApiError>
    where
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let result = request.await;
        if result.is_ok() {
            self.invalidate_all(invalidates);
        }
        result
    }

    /// Drop everything, e.g. on logout.
    pub fn clear(&self) {
        {
            let mut store = self.lock();
            store.seq += 1;
            store.cleared_at = store.seq;
            store.entries.clear();
            store.resource_invalidated_at.clear();
            store.group_invalidated_at.clear();
        }
        self.revision.send_modify(|r| *r += 1);
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn watch_revision(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    fn is_fresh(&self, entry: &Entry) -> bool {
        !entry.invalidated && entry.fetched_at.elapsed() < self.stale_after
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_fetch(
        calls: &Arc<AtomicUsize>,
        value: u32,
    ) -> impl Future<Output = Result<u32, ApiError>> {
        calls.fetch_add(1, Ordering::SeqCst);
        async move { Ok(value) }
    }

    #[tokio::test]
    async fn fresh_entries_are_served_from_cache() {
        let cache = QueryCache::new(Duration::from_secs(30));
        let calls = Arc::new(AtomicUsize::new(0));
        let key = QueryKey::new(Resource::Groups);

        let first = cache.fetch(key.clone(), || counting_fetch(&calls, 1)).await.unwrap();
        let second = cache.fetch(key, || counting_fetch(&calls, 2)).await.unwrap();

        assert_eq!((*first, *second), (1, 1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalidated_entries_refetch() {
        let cache = QueryCache::new(Duration::from_secs(30));
        let calls = Arc::new(AtomicUsize::new(0));
        let key = QueryKey::new(Resource::Agents);

        cache.fetch(key.clone(), || counting_fetch(&calls, 1)).await.unwrap();
        assert_eq!(cache.invalidate(Invalidation::All(Resource::Agents)), 1);
        let value = cache.fetch(key, || counting_fetch(&calls, 2)).await.unwrap();

        assert_eq!(*value, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn invalidation_during_fetch_leaves_result_stale() {
        let cache = QueryCache::new(Duration::from_secs(30));
        let calls = Arc::new(AtomicUsize::new(0));
        let key = QueryKey::new(Resource::Messages);

        let value = cache
            .fetch(key.clone(), || {
                cache.invalidate(Invalidation::All(Resource::Messages));
                counting_fetch(&calls, 1)
            })
            .await
            .unwrap();
        assert_eq!(*value, 1);
        assert!(!cache.get::<u32>(&key).unwrap().fresh);

        let value = cache.fetch(key, || counting_fetch(&calls, 2)).await.unwrap();
        assert_eq!(*value, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn group_event_during_fetch_only_stales_matching_keys() {
        let cache = QueryCache::new(Duration::from_secs(30));
        let calls = Arc::new(AtomicUsize::new(0));
        let group_1 = QueryKey::for_group(Resource::Messages, Some(1));
        let group_2 = QueryKey::for_group(Resource::Messages, Some(2));
        let unscoped = QueryKey::new(Resource::Messages);

        for key in [&group_1, &group_2, &unscoped] {
            cache
                .fetch(key.clone(), || {
                    cache.invalidate(Invalidation::Group(Resource::Messages, 1));
                    counting_fetch(&calls, 1)
                })
                .await
                .unwrap();
        }
        assert!(!cache.get::<u32>(&group_1).unwrap().fresh);
        assert!(!cache.get::<u32>(&unscoped).unwrap().fresh);
        assert!(cache.get::<u32>(&group_2).unwrap().fresh);
    }

    #[tokio::test]
    async fn clear_during_fetch_discards_the_result() {
        let cache = QueryCache::new(Duration::from_secs(30));
        let key = QueryKey::new(Resource::Groups);

        let value = cache
            .fetch(key.clone(), || {
                cache.clear();
                async { Ok(5u32) }
            })
            .await
            .unwrap();
        assert_eq!(*value, 5);
        assert!(cache.get::<u32>(&key).is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn entries_go_stale_with_time() {
        let cache = QueryCache::new(Duration::from_secs(30));
        let key = QueryKey::new(Resource::Stats);
        cache.insert(key.clone(), 7u32);
        assert!(cache.get::<u32>(&key).unwrap().fresh);

        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(!cache.get::<u32>(&key).unwrap().fresh);
    }

    #[test]
    fn group_invalidation_spares_other_groups() {
        let cache = QueryCache::new(Duration::from_secs(30));
        let group_1 = QueryKey::for_group(Resource::Messages, Some(1));
        let group_2 = QueryKey::for_group(Resource::Messages, Some(2));
        let all = QueryKey::new(Resource::Messages).with_params("limit=50");
        let groups = QueryKey::new(Resource::Groups);
        for key in [&group_1, &group_2, &all, &groups] {
            cache.insert(key.clone(), ());
        }

        assert_eq!(cache.invalidate(Invalidation::Group(Resource::Messages, 1)), 2);
        assert!(!cache.get::<()>(&group_1).unwrap().fresh);
        assert!(!cache.get::<()>(&all).unwrap().fresh);
        assert!(cache.get::<()>(&group_2).unwrap().fresh);
        assert!(cache.get::<()>(&groups).unwrap().fresh);
    }

    #[tokio::test]
    async fn failed_refetch_serves_stale_data() {
        let cache = QueryCache::new(Duration::from_secs(30));
        let key = QueryKey::new(Resource::WhatsAppStatus);
        cache.insert(key.clone(), "ready".to_string());
        cache.invalidate(Invalidation::All(Resource::WhatsAppStatus));

        let state = cache
            .query::<String, _, _>(key, || async {
                Err(ApiError::Network("connection refused".into()))
            })
            .await;

        assert!(state.is_offline());
        assert_eq!(state.data.as_deref().map(String::as_str), Some("ready"));
    }

    #[tokio::test]
    async fn mutations_invalidate_only_on_success() {
        let cache = QueryCache::new(Duration::from_secs(30));
        let key = QueryKey::new(Resource::SettingsSchedules);
        cache.insert(key.clone(), ());
        let related = [Invalidation::All(Resource::SettingsSchedules)];

        let err = cache
            .mutate::<(), _>(
                async {
                    Err(ApiError::Http {
                        status: 400,
                        body: r#"{"detail":"Invalid time format"}"#.into(),
                    })
                },
                &related,
            )
            .await
            .unwrap_err();
        assert_eq!(err.message(), "Invalid time format");
        assert!(cache.get::<()>(&key).unwrap().fresh);

        cache.mutate(async { Ok(()) }, &related).await.unwrap();
        assert!(!cache.get::<()>(&key).unwrap().fresh);
    }

    #[test]
    fn wrong_type_reads_as_missing() {
        let cache = QueryCache::new(Duration::from_secs(30));
        let key = QueryKey::new(Resource::Groups);
        cache.insert(key.clone(), 1u32);
        assert!(cache.get::<String>(&key).is_none());
    }
}
