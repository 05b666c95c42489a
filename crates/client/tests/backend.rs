//! Session and dashboard flows against an in-process stub of the backend.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message as WsMessage, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use groupwatch_client::api::EventFilter;
use groupwatch_client::storage::TokenStorage;
use groupwatch_client::{
    ClientConfig, ConnectionState, Dashboard, FileStorage, MemoryStorage, Page, Session,
    SessionState,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::Notify;

const TOKEN: &str = "tok-1";
const PASSWORD: &str = "correct horse";

#[derive(Default)]
struct Backend {
    group_fetches: AtomicUsize,
    message_fetches: AtomicUsize,
    /// Rejects every bearer token once set, as after a server-side expiry.
    revoked: AtomicBool,
    groups: std::sync::Mutex<Vec<Value>>,
    /// Releases the one realtime frame the socket pushes.
    push: Notify,
}

impl Backend {
    fn authorized(&self, headers: &HeaderMap) -> bool {
        let bearer = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        !self.revoked.load(Ordering::SeqCst) && bearer == Some(format!("Bearer {TOKEN}").as_str())
    }
}

fn user() -> Value {
    json!({
        "id": 1,
        "username": "amina",
        "email": "amina@example.com",
        "is_admin": false,
        "is_active": true,
        "created_at": "2024-05-01T08:00:00"
    })
}

fn detail(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "detail": message }))).into_response()
}

fn unauthorized() -> Response {
    detail(StatusCode::UNAUTHORIZED, "Could not validate credentials")
}

async fn login(Json(body): Json<Value>) -> Response {
    if body["password"] == PASSWORD {
        Json(json!({ "access_token": TOKEN, "token_type": "bearer" })).into_response()
    } else {
        detail(StatusCode::UNAUTHORIZED, "Incorrect email or password")
    }
}

async fn register(Json(body): Json<Value>) -> Response {
    if body["email"] == "taken@example.com" {
        return detail(StatusCode::BAD_REQUEST, "Email already registered");
    }
    Json(user()).into_response()
}

async fn me(State(backend): State<Arc<Backend>>, headers: HeaderMap) -> Response {
    if !backend.authorized(&headers) {
        return unauthorized();
    }
    Json(user()).into_response()
}

async fn list_groups(State(backend): State<Arc<Backend>>, headers: HeaderMap) -> Response {
    backend.group_fetches.fetch_add(1, Ordering::SeqCst);
    if !backend.authorized(&headers) {
        return unauthorized();
    }
    let groups = backend.groups.lock().unwrap().clone();
    Json(groups).into_response()
}

async fn add_group(
    State(backend): State<Arc<Backend>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !backend.authorized(&headers) {
        return unauthorized();
    }
    let mut groups = backend.groups.lock().unwrap();
    let group = json!({
        "id": groups.len() as i64 + 7,
        "user_id": 1,
        "whatsapp_group_id": body["whatsapp_group_id"],
        "group_name": body["group_name"],
        "member_count": body["member_count"],
        "is_active": true,
        "added_at": "2024-05-01T09:00:00"
    });
    groups.push(group.clone());
    Json(group).into_response()
}

async fn list_messages(State(backend): State<Arc<Backend>>, headers: HeaderMap) -> Response {
    backend.message_fetches.fetch_add(1, Ordering::SeqCst);
    if !backend.authorized(&headers) {
        return unauthorized();
    }
    Json(json!({
        "messages": [{
            "id": "3EB0A0",
            "group_id": 7,
            "whatsapp_group_id": "120363041234567890@g.us",
            "group_name": "Class of 2024",
            "sender_name": "Baraka",
            "sender_phone": "254700333444",
            "content": "Who has the notes?",
            "message_type": "chat",
            "timestamp": "2024-05-01T07:00:00"
        }],
        "total": 1,
        "limit": 50,
        "offset": 0
    }))
    .into_response()
}

async fn export_events(State(backend): State<Arc<Backend>>, headers: HeaderMap) -> Response {
    if !backend.authorized(&headers) {
        return unauthorized();
    }
    (
        [
            (header::CONTENT_TYPE, "text/csv"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"events_2024-05-01.csv\"",
            ),
        ],
        "Date,Member,Type\n2024-05-01,Achieng,JOIN\n",
    )
        .into_response()
}

async fn realtime(
    State(backend): State<Arc<Backend>>,
    Query(params): Query<HashMap<String, String>>,
    upgrade: WebSocketUpgrade,
) -> Response {
    if params.get("token").map(String::as_str) != Some(TOKEN) {
        return StatusCode::FORBIDDEN.into_response();
    }
    upgrade.on_upgrade(move |mut socket| async move {
        backend.push.notified().await;
        let frame = json!({
            "type": "new_message",
            "message": {
                "id": "3EB0A1",
                "group_id": 7,
                "group_name": "Class of 2024",
                "sender_name": "Achieng",
                "sender_phone": "254700111222",
                "content": "I do, sending now",
                "timestamp": "2024-05-01T07:30:00"
            }
        });
        if socket
            .send(WsMessage::Text(frame.to_string().into()))
            .await
            .is_err()
        {
            return;
        }
        while let Some(Ok(_)) = socket.recv().await {}
    })
}

async fn spawn_backend() -> (SocketAddr, Arc<Backend>) {
    let backend = Arc::new(Backend::default());
    let app = Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/register", post(register))
        .route("/api/auth/me", get(me))
        .route("/api/groups/", get(list_groups).post(add_group))
        .route("/api/messages/", get(list_messages))
        .route("/api/events/export/csv", get(export_events))
        .route("/ws", get(realtime))
        .with_state(backend.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, backend)
}

fn config_for(addr: SocketAddr) -> ClientConfig {
    ClientConfig::with_api_base(format!("http://{addr}"))
}

async fn eventually(what: &str, mut check: impl FnMut() -> bool) {
    for _ in 0..300 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {what}");
}

#[tokio::test]
async fn login_persists_token_and_a_new_process_restores_it() {
    let (addr, _backend) = spawn_backend().await;
    let dir = tempfile::tempdir().unwrap();

    let session = Session::new(config_for(addr), Arc::new(FileStorage::new(dir.path())));
    assert_eq!(session.state(), SessionState::Anonymous);
    let user = session
        .login("amina@example.com", PASSWORD)
        .await
        .unwrap();
    assert_eq!(user.username, "amina");
    assert_eq!(session.token().as_deref(), Some(TOKEN));
    assert_eq!(
        FileStorage::new(dir.path()).load_token().as_deref(),
        Some(TOKEN)
    );

    // Same storage, no credentials.
    let restarted = Session::new(config_for(addr), Arc::new(FileStorage::new(dir.path())));
    assert_eq!(restarted.state(), SessionState::Resolving);
    let restored = restarted.restore().await.unwrap();
    assert_eq!(restored, user);
    assert_eq!(restarted.state(), SessionState::Authenticated(user));
}

#[tokio::test]
async fn rejected_login_reports_server_detail_and_keeps_state() {
    let (addr, _backend) = spawn_backend().await;
    let storage = Arc::new(MemoryStorage::default());
    let session = Session::new(config_for(addr), storage.clone());

    let err = session
        .login("amina@example.com", "wrong password")
        .await
        .unwrap_err();
    assert_eq!(err.message(), "Incorrect email or password");
    assert_eq!(session.state(), SessionState::Anonymous);
    assert_eq!(session.token(), None);
    assert_eq!(storage.load_token(), None);
}

#[tokio::test]
async fn rejected_stored_token_signs_out_silently() {
    let (addr, _backend) = spawn_backend().await;
    let storage = Arc::new(MemoryStorage::with_token("expired"));
    let session = Session::new(config_for(addr), storage.clone());

    assert_eq!(session.restore().await, None);
    assert_eq!(session.state(), SessionState::Anonymous);
    assert_eq!(storage.load_token(), None);
}

#[tokio::test]
async fn register_logs_in_and_surfaces_conflicts() {
    let (addr, _backend) = spawn_backend().await;
    let session = Session::new(config_for(addr), Arc::new(MemoryStorage::default()));

    let err = session
        .register("amina", "taken@example.com", PASSWORD)
        .await
        .unwrap_err();
    assert_eq!(err.message(), "Email already registered");
    assert!(!session.is_authenticated());

    let user = session
        .register("amina", "amina@example.com", PASSWORD)
        .await
        .unwrap();
    assert_eq!(user.id, 1);
    assert!(session.is_authenticated());
}

#[tokio::test]
async fn mutations_invalidate_cached_reads() {
    let (addr, backend) = spawn_backend().await;
    let dashboard = Dashboard::new(config_for(addr), Arc::new(MemoryStorage::default()));
    dashboard.login("amina@example.com", PASSWORD).await.unwrap();

    let groups = dashboard.groups().await;
    assert!(groups.error.is_none());
    assert!(groups.data.unwrap().is_empty());
    dashboard.groups().await;
    assert_eq!(backend.group_fetches.load(Ordering::SeqCst), 1);

    let added = dashboard
        .add_group("120363041234567890@g.us", "Class of 2024", 42)
        .await
        .unwrap();
    assert_eq!(added.group_name, "Class of 2024");

    let groups = dashboard.groups().await;
    assert_eq!(backend.group_fetches.load(Ordering::SeqCst), 2);
    assert_eq!(groups.data.unwrap().len(), 1);
}

#[tokio::test]
async fn expired_token_during_a_read_ends_the_session() {
    let (addr, backend) = spawn_backend().await;
    let storage = Arc::new(MemoryStorage::default());
    let dashboard = Dashboard::new(config_for(addr), storage.clone());
    dashboard.login("amina@example.com", PASSWORD).await.unwrap();

    backend.revoked.store(true, Ordering::SeqCst);
    let groups = dashboard.groups().await;
    assert!(groups.error.unwrap().is_unauthorized());
    assert_eq!(dashboard.session().state(), SessionState::Anonymous);
    assert_eq!(storage.load_token(), None);
    assert!(dashboard.cache().is_empty());
}

#[tokio::test]
async fn export_uses_server_filename() {
    let (addr, _backend) = spawn_backend().await;
    let dashboard = Dashboard::new(config_for(addr), Arc::new(MemoryStorage::default()));
    dashboard.login("amina@example.com", PASSWORD).await.unwrap();

    let download = dashboard
        .export_events(&EventFilter::default())
        .await
        .unwrap();
    assert_eq!(download.filename, "events_2024-05-01.csv");

    let dir = tempfile::tempdir().unwrap();
    let path = download.save_in(dir.path()).unwrap();
    assert!(std::fs::read_to_string(path)
        .unwrap()
        .starts_with("Date,Member,Type"));
}

#[tokio::test]
async fn live_message_reaches_feed_and_invalidates_message_queries() {
    let (addr, backend) = spawn_backend().await;
    let dashboard = Dashboard::new(config_for(addr), Arc::new(MemoryStorage::default()));
    assert_eq!(dashboard.mount().await, None);

    let mut states = dashboard.channel().watch_state();
    dashboard.login("amina@example.com", PASSWORD).await.unwrap();
    tokio::time::timeout(
        Duration::from_secs(5),
        states.wait_for(ConnectionState::is_connected),
    )
    .await
    .unwrap()
    .unwrap();

    let page = dashboard.messages(None, Page::default()).await;
    assert!(page.error.is_none());
    dashboard.messages(None, Page::default()).await;
    assert_eq!(backend.message_fetches.load(Ordering::SeqCst), 1);

    backend.push.notify_one();
    eventually("live message in feed", || {
        dashboard.feeds().messages.contains(&"3EB0A1".to_string())
    })
    .await;
    let feed = dashboard.feeds().messages;
    assert_eq!(feed.len(), 2);
    assert_eq!(feed.items()[0].id, "3EB0A0");

    // A message in group 7 makes the unscoped message list stale.
    dashboard.messages(None, Page::default()).await;
    assert_eq!(backend.message_fetches.load(Ordering::SeqCst), 2);

    dashboard.logout();
    assert_eq!(dashboard.channel().state(), ConnectionState::Idle);
    assert!(dashboard.feeds().messages.is_empty());
}
