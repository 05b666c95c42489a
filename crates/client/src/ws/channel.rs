//! The realtime channel: one socket per session token, exponential backoff
//! reconnects, and typed fan-out to listeners.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use groupwatch_shared::{RealtimeEnvelope, WILDCARD};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

use super::registry::{ListenerRegistry, Subscription};
use super::transport::{Connector, Frame, TungsteniteConnector, CLOSE_NORMAL};
use super::{ConnectionState, ReconnectConfig};
use crate::config::ClientConfig;

/// Supplies the current session token, if any.
pub type TokenSource = Arc<dyn Fn() -> Option<String> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Connecting,
    Open,
    Closed,
}

struct Control {
    phase: Phase,
    /// Consecutive automatic reconnects since the last open or explicit connect.
    attempts: u32,
    /// Bumped on every open and on teardown; stale tasks compare and bail.
    generation: u64,
    reconnect_timer: Option<JoinHandle<()>>,
    shutdown: Option<oneshot::Sender<()>>,
    /// Token the current connection was opened with.
    token: Option<String>,
}

struct Inner {
    config: ClientConfig,
    connector: Arc<dyn Connector>,
    token: TokenSource,
    registry: Arc<ListenerRegistry>,
    state: watch::Sender<ConnectionState>,
    control: Mutex<Control>,
}

/// Client for the backend's realtime event feed.
///
/// Cheap to clone; clones share the socket and listeners. Methods that
/// open a connection spawn onto the current tokio runtime.
#[derive(Clone)]
pub struct RealtimeChannel {
    inner: Arc<Inner>,
}

impl RealtimeChannel {
    pub fn new(config: ClientConfig, token: TokenSource) -> Self {
        Self::with_connector(config, token, Arc::new(TungsteniteConnector))
    }

    pub fn with_connector(
        config: ClientConfig,
        token: TokenSource,
        connector: Arc<dyn Connector>,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Idle);
        Self {
            inner: Arc::new(Inner {
                config,
                connector,
                token,
                registry: ListenerRegistry::new(),
                state,
                control: Mutex::new(Control {
                    phase: Phase::Idle,
                    attempts: 0,
                    generation: 0,
                    reconnect_timer: None,
                    shutdown: None,
                    token: None,
                }),
            }),
        }
    }

    /// Open the channel. No-op without a token, or while open or connecting
    /// with the current token. A socket opened with a different token is
    /// closed and replaced.
    ///
    /// A pending reconnect timer is cancelled and the attempt counter reset.
    pub fn connect(&self) {
        let mut ctl = self.inner.lock();
        let Some(token) = (self.inner.token)() else {
            tracing::debug!("connect ignored, no session token");
            return;
        };
        if matches!(ctl.phase, Phase::Open | Phase::Connecting) {
            if ctl.token.as_deref() == Some(token.as_str()) {
                tracing::debug!(phase = ?ctl.phase, "connect ignored, channel already active");
                return;
            }
            tracing::info!("session token changed, reopening realtime channel");
            if let Some(shutdown) = ctl.shutdown.take() {
                let _ = shutdown.send(());
            }
        }
        if let Some(timer) = ctl.reconnect_timer.take() {
            timer.abort();
        }
        ctl.attempts = 0;
        self.inner.open(&mut ctl, &token);
    }

    /// Close the channel for good: cancel any pending reconnect and close the
    /// live socket with a normal close code.
    pub fn teardown(&self) {
        let mut ctl = self.inner.lock();
        ctl.generation += 1;
        ctl.attempts = 0;
        if let Some(timer) = ctl.reconnect_timer.take() {
            timer.abort();
        }
        if let Some(shutdown) = ctl.shutdown.take() {
            let _ = shutdown.send(());
        }
        ctl.token = None;
        if ctl.phase != Phase::Idle {
            tracing::info!("realtime channel torn down");
        }
        ctl.phase = Phase::Idle;
        self.inner.state.send_replace(ConnectionState::Idle);
    }

    /// Listen for one event type, or every event with [`WILDCARD`].
    pub fn subscribe(
        &self,
        event_type: &str,
        callback: impl Fn(&RealtimeEnvelope) + Send + Sync + 'static,
    ) -> Subscription {
        self.inner.registry.subscribe(event_type, callback)
    }

    pub fn subscribe_all(
        &self,
        callback: impl Fn(&RealtimeEnvelope) + Send + Sync + 'static,
    ) -> Subscription {
        self.subscribe(WILDCARD, callback)
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.state.borrow().clone()
    }

    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Consecutive automatic reconnect attempts so far.
    pub fn attempts(&self) -> u32 {
        self.inner.lock().attempts
    }

    pub fn reconnect_config(&self) -> &ReconnectConfig {
        &self.inner.config.reconnect
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Control> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn open(self: &Arc<Self>, ctl: &mut Control, token: &str) {
        ctl.generation += 1;
        ctl.phase = Phase::Connecting;
        ctl.token = Some(token.to_string());
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        ctl.shutdown = Some(shutdown_tx);
        self.state.send_replace(ConnectionState::Connecting);

        let url = self.config.realtime_url(token);
        tracing::info!(attempt = ctl.attempts, "opening realtime channel");
        tokio::spawn(run_connection(self.clone(), ctl.generation, url, shutdown_rx));
    }

    fn on_open(&self, generation: u64) -> bool {
        let mut ctl = self.lock();
        if ctl.generation != generation {
            return false;
        }
        ctl.attempts = 0;
        ctl.phase = Phase::Open;
        self.state.send_replace(ConnectionState::Open);
        tracing::info!("realtime channel open");
        true
    }

    fn on_message(&self, text: &str) {
        match RealtimeEnvelope::parse(text) {
            Ok(envelope) => {
                tracing::debug!(event_type = %envelope.event_type, "realtime event");
                self.registry.dispatch(&envelope);
            }
            Err(e) => {
                tracing::warn!(error = %e, "dropping malformed realtime frame");
            }
        }
    }

    fn on_closed(self: &Arc<Self>, generation: u64, code: Option<u16>) {
        let mut ctl = self.lock();
        if ctl.generation != generation {
            return;
        }
        ctl.phase = Phase::Closed;
        ctl.shutdown = None;

        if code == Some(CLOSE_NORMAL) {
            tracing::info!("realtime channel closed cleanly");
            self.state.send_replace(ConnectionState::Closed);
            return;
        }

        let max_attempts = self.config.reconnect.max_attempts;
        if ctl.attempts >= max_attempts {
            tracing::error!(attempts = ctl.attempts, "giving up on realtime channel");
            self.state.send_replace(ConnectionState::Failed {
                reason: format!("Max reconnect attempts ({max_attempts}) exceeded"),
            });
            return;
        }

        ctl.attempts += 1;
        let attempt = ctl.attempts;
        let delay = self.config.reconnect.delay_for_attempt(attempt);
        tracing::warn!(
            ?code,
            attempt,
            delay_ms = delay.as_millis() as u64,
            "realtime channel lost, reconnecting"
        );
        self.state
            .send_replace(ConnectionState::Reconnecting { attempt, delay });

        let inner = self.clone();
        ctl.reconnect_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            inner.reconnect_due(generation);
        }));
    }

    fn reconnect_due(self: &Arc<Self>, generation: u64) {
        let mut ctl = self.lock();
        if ctl.generation != generation || ctl.phase != Phase::Closed {
            return;
        }
        ctl.reconnect_timer = None;
        match (self.token)() {
            Some(token) => self.open(&mut ctl, &token),
            None => {
                tracing::debug!("reconnect skipped, session ended");
                self.state.send_replace(ConnectionState::Closed);
            }
        }
    }
}

async fn run_connection(
    inner: Arc<Inner>,
    generation: u64,
    url: String,
    mut shutdown: oneshot::Receiver<()>,
) {
    let connected = tokio::select! {
        result = inner.connector.connect(&url) => result,
        _ = &mut shutdown => return,
    };

    let mut transport = match connected {
        Ok(transport) => transport,
        Err(e) => {
            tracing::warn!(error = %e, "realtime connection attempt failed");
            inner.on_closed(generation, None);
            return;
        }
    };

    if !inner.on_open(generation) {
        transport.close(CLOSE_NORMAL).await;
        return;
    }

    loop {
        tokio::select! {
            frame = transport.next_frame() => match frame {
                Some(Frame::Text(text)) => inner.on_message(&text),
                Some(Frame::Closed { code }) => {
                    inner.on_closed(generation, code);
                    return;
                }
                None => {
                    inner.on_closed(generation, None);
                    return;
                }
            },
            _ = &mut shutdown => {
                transport.close(CLOSE_NORMAL).await;
                return;
            }
        }
    }
}
