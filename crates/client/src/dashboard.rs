//! The dashboard lifecycle: one object owning the session, the realtime
//! channel, the query cache and the live feeds.
//!
//! [`Dashboard::mount`] restores the session and opens the channel;
//! [`Dashboard::unmount`] tears everything down. Signing out (explicitly or
//! through a 401) closes the channel and drops all cached data.

use std::any::Any;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use groupwatch_shared::{
    ApiError, Certificate, MemberEvent, RealtimeEnvelope, RealtimeEvent, User,
};
use tokio::task::JoinHandle;

use crate::api::ApiClient;
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::session::{Session, SessionState};
use crate::storage::TokenStorage;
use crate::stores::{
    invalidations_for, Invalidation, LiveFeed, QueryCache, QueryKey, QueryState, StoredMessage,
};
use crate::ws::{Connector, RealtimeChannel, Subscription};

/// Feed sizes kept in memory.
const MAX_FEED_LEN: usize = 500;

/// Realtime-fed lists shown on the dashboard.
#[derive(Debug, Clone)]
pub struct Feeds {
    pub messages: LiveFeed<StoredMessage>,
    pub events: LiveFeed<MemberEvent>,
    pub certificates: LiveFeed<Certificate>,
}

impl Default for Feeds {
    fn default() -> Self {
        Self {
            messages: LiveFeed::with_max_len(MAX_FEED_LEN),
            events: LiveFeed::with_max_len(MAX_FEED_LEN),
            certificates: LiveFeed::with_max_len(MAX_FEED_LEN),
        }
    }
}

impl Feeds {
    fn apply(&mut self, event: &RealtimeEvent) {
        match event {
            RealtimeEvent::NewMessage { message } => {
                self.messages.push_live(StoredMessage::from(message.clone()));
            }
            RealtimeEvent::MemberJoin { event } | RealtimeEvent::MemberLeave { event } => {
                self.events.push_live(event.clone());
            }
            RealtimeEvent::Certificate { event } => {
                self.events.push_live(event.clone());
                self.certificates.push_live(certificate_from_event(event));
            }
            _ => {}
        }
    }

    fn clear(&mut self) {
        self.messages.clear();
        self.events.clear();
        self.certificates.clear();
    }
}

fn certificate_from_event(event: &MemberEvent) -> Certificate {
    Certificate {
        id: event.id,
        group_id: event.group_id,
        group_name: event.group_name.clone(),
        member_name: event.member_name.clone(),
        member_phone: event.member_phone.clone(),
        event_date: event.event_date,
        timestamp: event.timestamp,
    }
}

pub struct Dashboard {
    session: Session,
    channel: RealtimeChannel,
    cache: Arc<QueryCache>,
    feeds: Arc<Mutex<Feeds>>,
    subscriptions: Mutex<Vec<Subscription>>,
    session_watcher: Mutex<Option<JoinHandle<()>>>,
}

impl Dashboard {
    pub fn new(config: ClientConfig, storage: Arc<dyn TokenStorage>) -> Self {
        let session = Session::new(config.clone(), storage);
        let channel = RealtimeChannel::new(config.clone(), session.token_source());
        Self::assemble(config, session, channel)
    }

    /// Like [`Dashboard::new`] with a custom socket connector.
    pub fn with_connector(
        config: ClientConfig,
        storage: Arc<dyn TokenStorage>,
        connector: Arc<dyn Connector>,
    ) -> Self {
        let session = Session::new(config.clone(), storage);
        let channel =
            RealtimeChannel::with_connector(config.clone(), session.token_source(), connector);
        Self::assemble(config, session, channel)
    }

    fn assemble(config: ClientConfig, session: Session, channel: RealtimeChannel) -> Self {
        Self {
            session,
            channel,
            cache: Arc::new(QueryCache::new(config.cache_stale_after)),
            feeds: Arc::new(Mutex::new(Feeds::default())),
            subscriptions: Mutex::new(Vec::new()),
            session_watcher: Mutex::new(None),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn channel(&self) -> &RealtimeChannel {
        &self.channel
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// Snapshot of the live feeds.
    pub fn feeds(&self) -> Feeds {
        lock(&self.feeds).clone()
    }

    /// Restore the session, route realtime events into the cache and feeds,
    /// and open the channel if someone is logged in.
    pub async fn mount(&self) -> Option<User> {
        self.install_listeners();
        self.watch_session();

        let user = match self.session.state() {
            SessionState::Authenticated(user) => Some(user),
            _ => self.session.restore().await,
        };
        if user.is_some() {
            self.channel.connect();
        }
        user
    }

    /// Stop everything started by [`Dashboard::mount`].
    pub fn unmount(&self) {
        if let Some(watcher) = lock(&self.session_watcher).take() {
            watcher.abort();
        }
        lock(&self.subscriptions).clear();
        self.channel.teardown();
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<User, ClientError> {
        let previous = self.session.token();
        let user = self.session.login(email, password).await?;
        self.signed_in(previous);
        Ok(user)
    }

    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, ClientError> {
        let previous = self.session.token();
        let user = self.session.register(username, email, password).await?;
        self.signed_in(previous);
        Ok(user)
    }

    pub fn logout(&self) {
        self.session.logout();
        self.signed_out();
    }

    /// Bearer-authenticated client for the current session.
    pub fn client(&self) -> ApiClient {
        self.session.client()
    }

    /// Cached read. A failed refetch keeps the last value and reports the
    /// error; a 401 ends the session.
    pub async fn query<T, F, Fut>(&self, key: QueryKey, fetch: F) -> QueryState<T>
    where
        T: Any + Send + Sync,
        F: FnOnce(ApiClient) -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let client = self.session.client();
        let state = self.cache.query(key, || fetch(client)).await;
        if state.error.as_ref().is_some_and(ApiError::is_unauthorized) {
            self.session.expire();
            self.signed_out();
        }
        state
    }

    /// Run a mutation and invalidate `invalidates` on success. Errors carry
    /// the server's message. Fails without a request when signed out.
    pub async fn mutate<T, F, Fut>(
        &self,
        invalidates: &[Invalidation],
        request: F,
    ) -> Result<T, ClientError>
    where
        F: FnOnce(ApiClient) -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        if self.session.token().is_none() {
            return Err(ClientError::Unauthenticated);
        }
        let client = self.session.client();
        let result = self.cache.mutate(request(client), invalidates).await;
        let checked = self.session.check(result);
        if checked.as_ref().is_err_and(ClientError::is_unauthorized) {
            self.signed_out();
        }
        checked
    }

    /// Merge a fetched page into a feed.
    pub fn merge_messages(&self, page: impl IntoIterator<Item = StoredMessage>) -> usize {
        lock(&self.feeds).messages.merge_page(page)
    }

    pub fn merge_events(&self, page: impl IntoIterator<Item = MemberEvent>) -> usize {
        lock(&self.feeds).events.merge_page(page)
    }

    pub fn merge_certificates(&self, page: impl IntoIterator<Item = Certificate>) -> usize {
        lock(&self.feeds).certificates.merge_page(page)
    }

    fn install_listeners(&self) {
        let mut subscriptions = lock(&self.subscriptions);
        if !subscriptions.is_empty() {
            return;
        }

        let cache = self.cache.clone();
        let feeds = self.feeds.clone();
        subscriptions.push(self.channel.subscribe_all(move |envelope: &RealtimeEnvelope| {
            let invalidations = invalidations_for(&envelope.event);
            if !invalidations.is_empty() {
                cache.invalidate_all(&invalidations);
            }
            lock(&feeds).apply(&envelope.event);
        }));
    }

    /// React to session changes made outside this object, e.g. a 401 seen
    /// by a caller using [`Session::check`] directly.
    fn watch_session(&self) {
        let mut slot = lock(&self.session_watcher);
        if slot.is_some() {
            return;
        }

        let mut states = self.session.watch();
        let channel = self.channel.clone();
        let cache = self.cache.clone();
        let feeds = self.feeds.clone();
        *slot = Some(tokio::spawn(async move {
            while states.changed().await.is_ok() {
                let state = states.borrow_and_update().clone();
                match state {
                    SessionState::Authenticated(_) => channel.connect(),
                    SessionState::Anonymous => {
                        channel.teardown();
                        cache.clear();
                        lock(&feeds).clear();
                    }
                    SessionState::Resolving => {}
                }
            }
        }));
    }

    /// Data loaded under another token belongs to another account. The
    /// channel reopens itself when the token changed.
    fn signed_in(&self, previous: Option<String>) {
        if previous.is_some() && previous != self.session.token() {
            self.cache.clear();
            lock(&self.feeds).clear();
        }
        self.channel.connect();
    }

    fn signed_out(&self) {
        self.channel.teardown();
        self.cache.clear();
        lock(&self.feeds).clear();
    }
}

impl Drop for Dashboard {
    fn drop(&mut self) {
        self.unmount();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
