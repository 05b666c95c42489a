//! Shared types for the groupwatch dashboard client: REST models, the
//! realtime event protocol and API errors.

pub mod error;
pub mod models;
pub mod protocol;
pub mod time;

pub use error::*;
pub use models::*;
pub use protocol::*;
