//! Groupwatch Monitor - tails the realtime feed to the log.
//!
//! Restores the stored session (or logs in with `GROUPWATCH_EMAIL` /
//! `GROUPWATCH_PASSWORD`), connects the realtime channel and logs every
//! event until Ctrl-C.

use std::sync::Arc;

use anyhow::{bail, Context};
use groupwatch_client::{
    ClientConfig, ConnectionState, Dashboard, FileStorage, MemoryStorage, TokenStorage,
};
use groupwatch_shared::RealtimeEvent;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    EnvFilter::new("groupwatch_client=debug,groupwatch_monitor=debug")
                }),
        )
        .init();

    let config = ClientConfig::from_env();
    tracing::info!(api = %config.api_base_url, ws = %config.ws_base_url, "starting monitor");

    let storage: Arc<dyn TokenStorage> = match FileStorage::in_config_dir() {
        Some(storage) => Arc::new(storage),
        None => {
            tracing::warn!("no config directory, session will not persist");
            Arc::new(MemoryStorage::default())
        }
    };

    let dashboard = Dashboard::new(config, storage);
    let user = match dashboard.mount().await {
        Some(user) => user,
        None => {
            let (Ok(email), Ok(password)) = (
                std::env::var("GROUPWATCH_EMAIL"),
                std::env::var("GROUPWATCH_PASSWORD"),
            ) else {
                bail!("no stored session; set GROUPWATCH_EMAIL and GROUPWATCH_PASSWORD to log in");
            };
            dashboard
                .login(&email, &password)
                .await
                .context("login failed")?
        }
    };
    tracing::info!(user = %user.username, admin = user.is_admin, "signed in");

    let _events = dashboard.channel().subscribe_all(|envelope| match &envelope.event {
        RealtimeEvent::NewMessage { message } => tracing::info!(
            group = %message.group_name,
            sender = %message.sender_name,
            "{}",
            message.content
        ),
        RealtimeEvent::MemberJoin { event } => {
            tracing::info!(group = %event.group_name, member = %event.member_name, "joined")
        }
        RealtimeEvent::MemberLeave { event } => {
            tracing::info!(group = %event.group_name, member = %event.member_name, "left")
        }
        RealtimeEvent::Certificate { event } => {
            tracing::info!(group = %event.group_name, member = %event.member_name, "certificate")
        }
        RealtimeEvent::Unknown => {
            tracing::debug!(event_type = %envelope.event_type, "unhandled event")
        }
        other => tracing::info!(event_type = %envelope.event_type, "{other:?}"),
    });

    let mut states = dashboard.channel().watch_state();
    loop {
        tokio::select! {
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = states.borrow_and_update().clone();
                match state {
                    ConnectionState::Failed { reason } => {
                        bail!("realtime channel gave up: {reason}");
                    }
                    ConnectionState::Idle if !dashboard.session().is_authenticated() => {
                        bail!("session ended");
                    }
                    state => tracing::debug!(?state, "channel state"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down");
                break;
            }
        }
    }

    dashboard.unmount();
    Ok(())
}
