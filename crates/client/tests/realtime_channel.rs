//! Realtime channel behavior against a scripted in-process connector.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use groupwatch_client::ws::{
    ConnectionState, Connector, Frame, RealtimeChannel, TokenSource, Transport, TransportError,
    CLOSE_NORMAL,
};
use groupwatch_client::ClientConfig;
use groupwatch_shared::WILDCARD;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// What the next connection attempt does.
enum Step {
    Refuse,
    Accept(mpsc::UnboundedReceiver<Frame>),
}

#[derive(Default)]
struct ScriptedConnector {
    script: Mutex<VecDeque<Step>>,
    attempts: Mutex<Vec<(String, Instant)>>,
    closes: Arc<Mutex<Vec<u16>>>,
}

impl ScriptedConnector {
    /// Queue an accepted connection; frames sent on the returned handle are
    /// delivered to the client. Dropping the handle drops the connection.
    fn accept(&self) -> mpsc::UnboundedSender<Frame> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.script.lock().unwrap().push_back(Step::Accept(rx));
        tx
    }

    fn attempt_count(&self) -> usize {
        self.attempts.lock().unwrap().len()
    }

    fn attempt_gaps_ms(&self) -> Vec<u64> {
        let attempts = self.attempts.lock().unwrap();
        attempts
            .windows(2)
            .map(|w| (w[1].1 - w[0].1).as_millis() as u64)
            .collect()
    }
}

struct ScriptedTransport {
    frames: mpsc::UnboundedReceiver<Frame>,
    closes: Arc<Mutex<Vec<u16>>>,
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn next_frame(&mut self) -> Option<Frame> {
        self.frames.recv().await
    }

    async fn close(&mut self, code: u16) {
        self.closes.lock().unwrap().push(code);
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn Transport>, TransportError> {
        self.attempts
            .lock()
            .unwrap()
            .push((url.to_string(), Instant::now()));
        match self.script.lock().unwrap().pop_front() {
            Some(Step::Accept(frames)) => Ok(Box::new(ScriptedTransport {
                frames,
                closes: self.closes.clone(),
            })),
            Some(Step::Refuse) | None => Err(TransportError::Connect("connection refused".into())),
        }
    }
}

fn token(value: Option<&str>) -> TokenSource {
    let value = value.map(str::to_string);
    Arc::new(move || value.clone())
}

fn channel_with(connector: &Arc<ScriptedConnector>, session_token: Option<&str>) -> RealtimeChannel {
    RealtimeChannel::with_connector(
        ClientConfig::for_host("localhost"),
        token(session_token),
        connector.clone(),
    )
}

async fn wait_for_state(
    channel: &RealtimeChannel,
    predicate: impl Fn(&ConnectionState) -> bool,
) -> ConnectionState {
    let mut rx = channel.watch_state();
    let state = tokio::time::timeout(Duration::from_secs(600), rx.wait_for(|s| predicate(s)))
        .await
        .expect("timed out waiting for channel state")
        .expect("channel dropped");
    state.clone()
}

const NEW_MESSAGE: &str = r#"{"type":"new_message","message":{"id":"3EB0A1","group_id":7,"group_name":"Class of 2024","sender_name":"Achieng","sender_phone":"254700111222","content":"Good morning","timestamp":"2024-05-01T07:30:00"}}"#;

#[tokio::test]
async fn open_channel_fans_out_to_exact_and_wildcard_listeners() {
    let connector = Arc::new(ScriptedConnector::default());
    let server = connector.accept();
    let channel = channel_with(&connector, Some("tok en"));

    let (seen_tx, mut seen) = mpsc::unbounded_channel::<(&'static str, String, serde_json::Value)>();
    let tx = seen_tx.clone();
    let _messages = channel.subscribe("new_message", move |e| {
        tx.send(("new_message", e.event_type.clone(), e.payload.clone())).unwrap();
    });
    let tx = seen_tx.clone();
    let _all = channel.subscribe(WILDCARD, move |e| {
        tx.send(("*", e.event_type.clone(), e.payload.clone())).unwrap();
    });
    let tx = seen_tx.clone();
    let _qr = channel.subscribe("qr", move |e| {
        tx.send(("qr", e.event_type.clone(), e.payload.clone())).unwrap();
    });

    channel.connect();
    wait_for_state(&channel, ConnectionState::is_connected).await;
    assert_eq!(channel.attempts(), 0);
    assert_eq!(
        connector.attempts.lock().unwrap()[0].0,
        "ws://localhost:8000/ws?token=tok%20en"
    );

    server.send(Frame::Text(NEW_MESSAGE.to_string())).unwrap();
    let expected: serde_json::Value = serde_json::from_str(NEW_MESSAGE).unwrap();
    let first = seen.recv().await.unwrap();
    let second = seen.recv().await.unwrap();
    assert_eq!((first.0, first.1.as_str()), ("new_message", "new_message"));
    assert_eq!((second.0, second.1.as_str()), ("*", "new_message"));
    assert_eq!(first.2, expected);
    assert_eq!(second.2, expected);

    // A marker event proves nothing else was delivered for the first frame.
    server
        .send(Frame::Text(r#"{"type":"authenticated"}"#.to_string()))
        .unwrap();
    let marker = seen.recv().await.unwrap();
    assert_eq!((marker.0, marker.1.as_str()), ("*", "authenticated"));
    assert!(seen.try_recv().is_err());
}

#[tokio::test]
async fn malformed_frames_are_dropped_without_closing() {
    let connector = Arc::new(ScriptedConnector::default());
    let server = connector.accept();
    let channel = channel_with(&connector, Some("abc"));

    let (tx, mut seen) = mpsc::unbounded_channel::<String>();
    let _all = channel.subscribe_all(move |e| {
        tx.send(e.event_type.clone()).unwrap();
    });

    channel.connect();
    wait_for_state(&channel, ConnectionState::is_connected).await;

    for junk in [
        "not json",
        r#"{"no_type":true}"#,
        r#"{"type":42}"#,
        r#"{"type":"new_message","message":{"id":"x"}}"#,
    ] {
        server.send(Frame::Text(junk.to_string())).unwrap();
    }
    server
        .send(Frame::Text(r#"{"type":"ready","phoneNumber":"254700000000"}"#.to_string()))
        .unwrap();

    assert_eq!(seen.recv().await.unwrap(), "ready");
    assert!(seen.try_recv().is_err());
    assert!(channel.is_connected());
}

#[tokio::test]
async fn unsubscribed_listeners_stop_receiving() {
    let connector = Arc::new(ScriptedConnector::default());
    let server = connector.accept();
    let channel = channel_with(&connector, Some("abc"));

    let (tx, mut seen) = mpsc::unbounded_channel::<&'static str>();
    let tx_a = tx.clone();
    let first = channel.subscribe("authenticated", move |_| {
        tx_a.send("first").unwrap();
    });
    let _second = channel.subscribe("authenticated", move |_| {
        tx.send("second").unwrap();
    });

    channel.connect();
    wait_for_state(&channel, ConnectionState::is_connected).await;

    first.unsubscribe();
    server
        .send(Frame::Text(r#"{"type":"authenticated"}"#.to_string()))
        .unwrap();
    assert_eq!(seen.recv().await.unwrap(), "second");
    assert!(seen.try_recv().is_err());
}

#[tokio::test]
async fn connect_is_a_no_op_while_open_or_without_token() {
    let connector = Arc::new(ScriptedConnector::default());
    let _server = connector.accept();

    let anonymous = channel_with(&connector, None);
    anonymous.connect();
    assert_eq!(anonymous.state(), ConnectionState::Idle);
    assert_eq!(connector.attempt_count(), 0);

    let channel = channel_with(&connector, Some("abc"));
    channel.connect();
    channel.connect();
    wait_for_state(&channel, ConnectionState::is_connected).await;
    channel.connect();
    assert_eq!(connector.attempt_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_attempts_back_off_and_stop_after_five() {
    let connector = Arc::new(ScriptedConnector::default());
    let channel = channel_with(&connector, Some("abc"));

    channel.connect();
    let state = wait_for_state(&channel, |s| matches!(s, ConnectionState::Failed { .. })).await;
    assert!(matches!(state, ConnectionState::Failed { .. }));

    // The explicit attempt plus five automatic ones.
    assert_eq!(connector.attempt_count(), 6);
    assert_eq!(
        connector.attempt_gaps_ms(),
        vec![2000, 4000, 8000, 16000, 30000]
    );

    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(connector.attempt_count(), 6);
}

#[tokio::test(start_paused = true)]
async fn unclean_close_schedules_reconnect_and_open_resets_counter() {
    let connector = Arc::new(ScriptedConnector::default());
    let server = connector.accept();
    let channel = channel_with(&connector, Some("abc"));

    channel.connect();
    wait_for_state(&channel, ConnectionState::is_connected).await;

    let _next = connector.accept();
    server.send(Frame::Closed { code: Some(1011) }).unwrap();
    let state = wait_for_state(&channel, |s| {
        matches!(s, ConnectionState::Reconnecting { .. })
    })
    .await;
    assert_eq!(
        state,
        ConnectionState::Reconnecting {
            attempt: 1,
            delay: Duration::from_millis(2000)
        }
    );

    wait_for_state(&channel, ConnectionState::is_connected).await;
    assert_eq!(channel.attempts(), 0);
    assert_eq!(connector.attempt_gaps_ms(), vec![2000]);
}

#[tokio::test(start_paused = true)]
async fn dropped_stream_counts_as_unclean() {
    let connector = Arc::new(ScriptedConnector::default());
    let server = connector.accept();
    let channel = channel_with(&connector, Some("abc"));

    channel.connect();
    wait_for_state(&channel, ConnectionState::is_connected).await;
    drop(server);

    wait_for_state(&channel, |s| matches!(s, ConnectionState::Reconnecting { attempt: 1, .. })).await;
}

#[tokio::test(start_paused = true)]
async fn clean_server_close_does_not_reconnect() {
    let connector = Arc::new(ScriptedConnector::default());
    let server = connector.accept();
    let channel = channel_with(&connector, Some("abc"));

    channel.connect();
    wait_for_state(&channel, ConnectionState::is_connected).await;
    server
        .send(Frame::Closed {
            code: Some(CLOSE_NORMAL),
        })
        .unwrap();
    wait_for_state(&channel, |s| *s == ConnectionState::Closed).await;

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(connector.attempt_count(), 1);
    assert_eq!(channel.state(), ConnectionState::Closed);
}

#[tokio::test(start_paused = true)]
async fn teardown_closes_normally_and_never_reconnects() {
    let connector = Arc::new(ScriptedConnector::default());
    let _server = connector.accept();
    let channel = channel_with(&connector, Some("abc"));

    channel.connect();
    wait_for_state(&channel, ConnectionState::is_connected).await;
    channel.teardown();

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(*connector.closes.lock().unwrap(), vec![CLOSE_NORMAL]);
    assert_eq!(connector.attempt_count(), 1);
    assert_eq!(channel.state(), ConnectionState::Idle);
}

#[tokio::test(start_paused = true)]
async fn teardown_cancels_pending_reconnect() {
    let connector = Arc::new(ScriptedConnector::default());
    let channel = channel_with(&connector, Some("abc"));

    channel.connect();
    wait_for_state(&channel, |s| matches!(s, ConnectionState::Reconnecting { .. })).await;
    channel.teardown();

    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(connector.attempt_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn explicit_connect_during_backoff_resets_the_counter() {
    let connector = Arc::new(ScriptedConnector::default());
    let channel = channel_with(&connector, Some("abc"));

    channel.connect();
    wait_for_state(&channel, |s| matches!(s, ConnectionState::Reconnecting { attempt: 2, .. })).await;
    assert_eq!(channel.attempts(), 2);

    let _server = connector.accept();
    channel.connect();
    wait_for_state(&channel, ConnectionState::is_connected).await;
    assert_eq!(channel.attempts(), 0);
    // Initial, automatic attempt 1, then the explicit connect.
    assert_eq!(connector.attempt_count(), 3);
}

#[tokio::test]
async fn new_session_token_replaces_the_open_socket() {
    let connector = Arc::new(ScriptedConnector::default());
    let _alice = connector.accept();
    let _bob = connector.accept();
    let current = Arc::new(Mutex::new("alice".to_string()));
    let source = current.clone();
    let channel = RealtimeChannel::with_connector(
        ClientConfig::for_host("localhost"),
        Arc::new(move || Some(source.lock().unwrap().clone())),
        connector.clone(),
    );

    channel.connect();
    wait_for_state(&channel, ConnectionState::is_connected).await;
    channel.connect();
    assert_eq!(connector.attempt_count(), 1);

    *current.lock().unwrap() = "bob".to_string();
    channel.connect();
    wait_for_state(&channel, ConnectionState::is_connected).await;
    for _ in 0..100 {
        if !connector.closes.lock().unwrap().is_empty() {
            break;
        }
        tokio::task::yield_now().await;
    }

    let urls: Vec<String> = connector
        .attempts
        .lock()
        .unwrap()
        .iter()
        .map(|(url, _)| url.clone())
        .collect();
    assert_eq!(
        urls,
        vec![
            "ws://localhost:8000/ws?token=alice".to_string(),
            "ws://localhost:8000/ws?token=bob".to_string(),
        ]
    );
    assert_eq!(*connector.closes.lock().unwrap(), vec![CLOSE_NORMAL]);
    assert_eq!(channel.attempts(), 0);
}
