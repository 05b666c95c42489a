//! Typed reads and mutations on the [`Dashboard`].
//!
//! Reads are cached under a [`QueryKey`]; each mutation validates its input,
//! then names the resources its success makes stale.

use groupwatch_shared::{
    ActionResponse, AdminUser, Agent, ApiError, AvailableGroups, GroupMembers, AgentList, BroadcastAccepted, BroadcastHistory, BroadcastRequest,
    BroadcastTask, CertificatePage, CertificateSummary, CreateAgentRequest,
    CreateScheduleRequest, EventPage, EventSummary, Group, ImmediateSettingsAccepted,
    ImmediateSettingsRequest, MessagePage, PollRequest, SendMessageRequest, SettingsHistory,
    SettingsSchedule, SettingsSchedules, StatsOverview, UpdateAgentRequest, WelcomeSettings,
    WelcomeUpdate, WhatsAppStatus,
};

use crate::api::{CertificateFilter, Download, EventFilter, MediaFile, Page};
use crate::dashboard::Dashboard;
use crate::error::ClientError;
use crate::forms;
use crate::stores::Invalidation::{All, Group as InGroup};
use crate::stores::{QueryKey, QueryState, Resource, StoredMessage};

fn page_params(page: Page) -> String {
    format!("limit={}&offset={}", page.limit, page.offset)
}

impl Dashboard {
    // --- Reads ---

    pub async fn whatsapp_status(&self) -> QueryState<WhatsAppStatus> {
        self.query(QueryKey::new(Resource::WhatsAppStatus), |api| async move {
            api.whatsapp_status().await
        })
        .await
    }

    pub async fn groups(&self) -> QueryState<Vec<Group>> {
        self.query(QueryKey::new(Resource::Groups), |api| async move {
            api.groups().await
        })
        .await
    }

    /// Participants of a monitored group, for picking mentions.
    pub async fn group_members(&self, group_id: i64) -> QueryState<GroupMembers> {
        let key = QueryKey::for_group(Resource::GroupMembers, Some(group_id));
        self.query(key, |api| async move { api.group_members(group_id).await })
            .await
    }

    /// WhatsApp groups the account is in, for the "add group" picker.
    pub async fn available_groups(&self) -> QueryState<AvailableGroups> {
        self.query(QueryKey::new(Resource::AvailableGroups), |api| async move {
            api.available_groups().await
        })
        .await
    }

    /// A page of messages; fetched messages also land in the message feed.
    pub async fn messages(&self, group_id: Option<i64>, page: Page) -> QueryState<MessagePage> {
        let key = QueryKey::for_group(Resource::Messages, group_id).with_params(page_params(page));
        let state = self
            .query(key, |api| async move { api.messages(group_id, page).await })
            .await;
        if let Some(data) = &state.data {
            self.merge_messages(data.messages.iter().cloned().map(StoredMessage::from));
        }
        state
    }

    pub async fn events(&self, filter: &EventFilter, page: Page) -> QueryState<EventPage> {
        let key = QueryKey::for_group(Resource::Events, filter.group_id)
            .with_params(format!("{:?}&{}", filter, page_params(page)));
        let filter = filter.clone();
        let state = self
            .query(key, |api| async move { api.events(&filter, page).await })
            .await;
        if let Some(data) = &state.data {
            self.merge_events(data.events.iter().cloned());
        }
        state
    }

    pub async fn event_summary(&self, group_id: Option<i64>) -> QueryState<EventSummary> {
        let key = QueryKey::for_group(Resource::EventSummary, group_id);
        self.query(key, |api| async move {
            api.event_summary(None, None, group_id).await
        })
        .await
    }

    pub async fn certificates(
        &self,
        filter: &CertificateFilter,
        page: Page,
    ) -> QueryState<CertificatePage> {
        let key = QueryKey::for_group(Resource::Certificates, filter.group_id)
            .with_params(format!("{:?}&{}", filter, page_params(page)));
        let filter = filter.clone();
        let state = self
            .query(key, |api| async move { api.certificates(&filter, page).await })
            .await;
        if let Some(data) = &state.data {
            self.merge_certificates(data.certificates.iter().cloned());
        }
        state
    }

    pub async fn certificate_summary(
        &self,
        filter: &CertificateFilter,
    ) -> QueryState<CertificateSummary> {
        let key = QueryKey::for_group(Resource::CertificateSummary, filter.group_id)
            .with_params(format!("{filter:?}"));
        let filter = filter.clone();
        self.query(key, |api| async move { api.certificate_summary(&filter).await })
            .await
    }

    pub async fn scheduled_broadcasts(&self) -> QueryState<Vec<BroadcastTask>> {
        let key = QueryKey::new(Resource::Broadcasts).with_params("scheduled");
        self.query(key, |api| async move { api.scheduled_broadcasts().await })
            .await
    }

    pub async fn broadcast_history(&self, page: Page) -> QueryState<BroadcastHistory> {
        let key = QueryKey::new(Resource::Broadcasts).with_params(page_params(page));
        self.query(key, |api| async move { api.broadcast_history(page).await })
            .await
    }

    pub async fn schedules(&self) -> QueryState<SettingsSchedules> {
        self.query(QueryKey::new(Resource::SettingsSchedules), |api| async move {
            api.schedules().await
        })
        .await
    }

    pub async fn settings_history(&self, limit: u32) -> QueryState<SettingsHistory> {
        let key = QueryKey::new(Resource::SettingsHistory).with_params(format!("limit={limit}"));
        self.query(key, |api| async move { api.settings_history(limit).await })
            .await
    }

    pub async fn welcome_settings(&self) -> QueryState<Vec<WelcomeSettings>> {
        self.query(QueryKey::new(Resource::Welcome), |api| async move {
            api.welcome_settings().await
        })
        .await
    }

    pub async fn agents(&self) -> QueryState<AgentList> {
        self.query(QueryKey::new(Resource::Agents), |api| async move {
            api.agents().await
        })
        .await
    }

    pub async fn stats_overview(&self, days: u32, group_id: Option<i64>) -> QueryState<StatsOverview> {
        let key = QueryKey::for_group(Resource::Stats, group_id).with_params(format!("days={days}"));
        self.query(key, |api| async move {
            api.stats_overview(days, group_id).await
        })
        .await
    }

    pub async fn admin_users(&self, page: Page) -> QueryState<Vec<AdminUser>> {
        let key = QueryKey::new(Resource::AdminUsers).with_params(page_params(page));
        self.query(key, |api| async move { api.admin_users(page).await })
            .await
    }

    // --- Exports ---

    pub async fn export_events(&self, filter: &EventFilter) -> Result<Download, ClientError> {
        if self.session().token().is_none() {
            return Err(ClientError::Unauthenticated);
        }
        let result = self.client().export_events_csv(filter).await;
        self.session().check(result)
    }

    pub async fn export_certificates(
        &self,
        filter: &CertificateFilter,
    ) -> Result<Download, ClientError> {
        if self.session().token().is_none() {
            return Err(ClientError::Unauthenticated);
        }
        let result = self.client().export_certificates_csv(filter).await;
        self.session().check(result)
    }

    // --- WhatsApp session ---

    pub async fn connect_whatsapp(&self) -> Result<ActionResponse, ClientError> {
        self.mutate(&[All(Resource::WhatsAppStatus)], |api| async move {
            let init = api.whatsapp_init().await?;
            Ok::<_, ApiError>(ActionResponse {
                success: init.success,
                message: init.message,
            })
        })
        .await
    }

    pub async fn disconnect_whatsapp(&self) -> Result<ActionResponse, ClientError> {
        self.mutate(&[All(Resource::WhatsAppStatus)], |api| async move {
            api.whatsapp_logout().await
        })
        .await
    }

    // --- Groups ---

    pub async fn add_group(
        &self,
        whatsapp_group_id: &str,
        group_name: &str,
        member_count: u32,
    ) -> Result<Group, ClientError> {
        let request = groupwatch_shared::AddGroupRequest {
            whatsapp_group_id: whatsapp_group_id.to_string(),
            group_name: group_name.to_string(),
            member_count,
        };
        self.mutate(
            &[All(Resource::Groups), All(Resource::AvailableGroups)],
            |api| async move { api.add_group(&request).await },
        )
        .await
    }

    pub async fn remove_group(&self, group_id: i64) -> Result<ActionResponse, ClientError> {
        self.mutate(
            &[All(Resource::Groups), All(Resource::AvailableGroups)],
            |api| async move { api.remove_group(group_id).await },
        )
        .await
    }

    pub async fn send_to_group(
        &self,
        group_id: i64,
        request: SendMessageRequest,
        media: Option<MediaFile>,
    ) -> Result<ActionResponse, ClientError> {
        forms::validate_group_message(&request.content, media.is_some())?;
        self.mutate(&[InGroup(Resource::Messages, group_id)], |api| async move {
            match media {
                Some(media) => {
                    let caption = Some(request.content.as_str()).filter(|c| !c.trim().is_empty());
                    api.send_media_to_group(
                        group_id,
                        media,
                        caption,
                        request.mention_all,
                        request.mention_ids.as_deref(),
                    )
                    .await
                }
                None => api.send_to_group(group_id, &request).await,
            }
        })
        .await
    }

    // --- Broadcasts ---

    pub async fn send_broadcast(
        &self,
        request: BroadcastRequest,
        media: Option<MediaFile>,
    ) -> Result<BroadcastAccepted, ClientError> {
        forms::validate_broadcast(&request, media.is_some())?;
        self.mutate(&[All(Resource::Broadcasts)], |api| async move {
            match media {
                Some(media) => api.send_broadcast_media(&request, media).await,
                None => api.send_broadcast(&request).await,
            }
        })
        .await
    }

    pub async fn send_poll(&self, request: PollRequest) -> Result<BroadcastAccepted, ClientError> {
        forms::validate_poll(&request)?;
        self.mutate(&[All(Resource::Broadcasts)], |api| async move {
            api.send_poll(&request).await
        })
        .await
    }

    pub async fn cancel_broadcast(&self, task_id: i64) -> Result<ActionResponse, ClientError> {
        self.mutate(&[All(Resource::Broadcasts)], |api| async move {
            api.cancel_broadcast(task_id).await
        })
        .await
    }

    // --- Group settings ---

    pub async fn create_schedule(
        &self,
        request: CreateScheduleRequest,
    ) -> Result<SettingsSchedule, ClientError> {
        forms::validate_schedule(&request)?;
        self.mutate(&[All(Resource::SettingsSchedules)], |api| async move {
            api.create_schedule(&request).await
        })
        .await
    }

    pub async fn delete_schedule(&self, schedule_id: &str) -> Result<ActionResponse, ClientError> {
        let schedule_id = schedule_id.to_string();
        self.mutate(&[All(Resource::SettingsSchedules)], |api| async move {
            api.delete_schedule(&schedule_id).await
        })
        .await
    }

    pub async fn toggle_schedule(&self, schedule_id: &str) -> Result<ActionResponse, ClientError> {
        let schedule_id = schedule_id.to_string();
        self.mutate(&[All(Resource::SettingsSchedules)], |api| async move {
            api.toggle_schedule(&schedule_id).await
        })
        .await
    }

    pub async fn apply_settings_now(
        &self,
        request: ImmediateSettingsRequest,
    ) -> Result<ImmediateSettingsAccepted, ClientError> {
        forms::validate_immediate_settings(&request)?;
        self.mutate(&[All(Resource::SettingsHistory)], |api| async move {
            api.apply_settings_now(&request).await
        })
        .await
    }

    // --- Welcome messages ---

    pub async fn update_welcome(&self, update: WelcomeUpdate) -> Result<ActionResponse, ClientError> {
        forms::validate_welcome(&update)?;
        self.mutate(&[All(Resource::Welcome)], |api| async move {
            match update.group_ids.as_slice() {
                [group_id] => api.update_group_welcome(*group_id, &update).await,
                _ => api.update_welcome_bulk(&update).await,
            }
        })
        .await
    }

    pub async fn upload_welcome_image(
        &self,
        group_ids: &[i64],
        image: MediaFile,
    ) -> Result<ActionResponse, ClientError> {
        if group_ids.is_empty() {
            return Err(forms::ValidationError::new("group_ids", "Select at least one group").into());
        }
        let group_ids = group_ids.to_vec();
        self.mutate(&[All(Resource::Welcome)], |api| async move {
            api.upload_welcome_image(&group_ids, image).await
        })
        .await
    }

    pub async fn reset_welcome_counter(&self, group_id: i64) -> Result<ActionResponse, ClientError> {
        self.mutate(&[All(Resource::Welcome)], |api| async move {
            api.reset_welcome_counter(group_id).await
        })
        .await
    }

    // --- Agents ---

    pub async fn create_agent(&self, request: CreateAgentRequest) -> Result<Agent, ClientError> {
        forms::validate_agent(&request)?;
        self.mutate(&[All(Resource::Agents)], |api| async move {
            api.create_agent(&request).await
        })
        .await
    }

    pub async fn update_agent(
        &self,
        agent_id: i64,
        request: UpdateAgentRequest,
    ) -> Result<Agent, ClientError> {
        forms::validate_agent_update(&request)?;
        self.mutate(&[All(Resource::Agents)], |api| async move {
            api.update_agent(agent_id, &request).await
        })
        .await
    }

    pub async fn set_agent_active(
        &self,
        agent_id: i64,
        active: bool,
    ) -> Result<ActionResponse, ClientError> {
        self.mutate(&[All(Resource::Agents)], |api| async move {
            if active {
                api.activate_agent(agent_id).await
            } else {
                api.deactivate_agent(agent_id).await
            }
        })
        .await
    }

    pub async fn delete_agent(&self, agent_id: i64) -> Result<ActionResponse, ClientError> {
        self.mutate(&[All(Resource::Agents)], |api| async move {
            api.delete_agent(agent_id).await
        })
        .await
    }

    // --- Admin ---

    pub async fn toggle_admin(
        &self,
        user_id: i64,
    ) -> Result<groupwatch_shared::AdminToggled, ClientError> {
        self.mutate(&[All(Resource::AdminUsers)], |api| async move {
            api.toggle_admin(user_id).await
        })
        .await
    }

    pub async fn delete_user(&self, user_id: i64) -> Result<ActionResponse, ClientError> {
        self.mutate(&[All(Resource::AdminUsers)], |api| async move {
            api.delete_user(user_id).await
        })
        .await
    }
}
