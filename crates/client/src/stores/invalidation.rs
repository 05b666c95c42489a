//! Which cached queries a realtime event makes stale.

use groupwatch_shared::RealtimeEvent;

use super::cache::{Invalidation, Resource};

/// Queries to invalidate when `event` arrives.
pub fn invalidations_for(event: &RealtimeEvent) -> Vec<Invalidation> {
    use Invalidation::{All, Group};
    use RealtimeEvent as E;

    let scoped = |resource: Resource| match event.group_id() {
        Some(group_id) => Group(resource, group_id),
        None => All(resource),
    };

    match event {
        E::Qr { .. } | E::Authenticated | E::Ready { .. } | E::Disconnected { .. } => {
            vec![All(Resource::WhatsAppStatus)]
        }
        E::NewMessage { .. } => vec![scoped(Resource::Messages), All(Resource::Stats)],
        E::MemberJoin { .. } | E::MemberLeave { .. } => vec![
            scoped(Resource::Events),
            All(Resource::EventSummary),
            All(Resource::Groups),
            All(Resource::Stats),
        ],
        E::Certificate { .. } => vec![
            All(Resource::Certificates),
            All(Resource::CertificateSummary),
        ],
        E::BroadcastComplete(_)
        | E::PollComplete(_)
        | E::ChannelBroadcastComplete(_)
        | E::ChannelPollComplete(_) => vec![All(Resource::Broadcasts)],
        E::SettingsComplete(_) | E::ImmediateSettingsComplete(_) => vec![
            All(Resource::SettingsSchedules),
            All(Resource::SettingsHistory),
        ],
        E::WelcomeSent { .. } => vec![All(Resource::Welcome)],
        E::BroadcastProgress(_)
        | E::PollProgress(_)
        | E::ChannelBroadcastProgress(_)
        | E::ChannelPollProgress(_)
        | E::SettingsProgress(_)
        | E::ImmediateSettingsProgress(_)
        | E::AgentResponse { .. }
        | E::Unknown => Vec::new(),
    }
}
