//! Groupwatch Client - headless dashboard client
//!
//! This crate contains the client side of the groupwatch WhatsApp group
//! monitor: session handling, the realtime event channel, cached resource
//! queries with realtime invalidation, and the REST surface of the backend.

pub mod actions;
pub mod api;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod forms;
pub mod routes;
pub mod session;
pub mod storage;
pub mod stores;
pub mod ws;

pub use api::{ApiClient, Download, MediaFile, Page};
pub use config::ClientConfig;
pub use dashboard::{Dashboard, Feeds};
pub use error::ClientError;
pub use routes::{Access, Route};
pub use session::{Session, SessionState};
pub use storage::{FileStorage, MemoryStorage, TokenStorage};
pub use ws::{ConnectionState, RealtimeChannel, Subscription};
