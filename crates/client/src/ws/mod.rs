//! Realtime event channel.

mod channel;
mod connection;
mod registry;
mod transport;

pub use channel::{RealtimeChannel, TokenSource};
pub use connection::{ConnectionState, ReconnectConfig};
pub use registry::{Listener, ListenerRegistry, Subscription};
pub use transport::{
    Connector, Frame, Transport, TransportError, TungsteniteConnector, CLOSE_NORMAL,
};
