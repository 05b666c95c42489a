use groupwatch_shared::{
    ActionResponse, ApiError, CreateScheduleRequest, ImmediateSettingsAccepted,
    ImmediateSettingsRequest, SettingsHistory, SettingsSchedule, SettingsSchedules,
};

use super::{ApiClient, QueryParams};

impl ApiClient {
    /// Create a recurring daily open/close schedule.
    pub async fn create_schedule(
        &self,
        request: &CreateScheduleRequest,
    ) -> Result<SettingsSchedule, ApiError> {
        self.post_json("/api/group-settings/schedules", request)
            .await
    }

    pub async fn schedules(&self) -> Result<SettingsSchedules, ApiError> {
        self.get_json("/api/group-settings/schedules").await
    }

    pub async fn delete_schedule(&self, schedule_id: &str) -> Result<ActionResponse, ApiError> {
        let path = format!(
            "/api/group-settings/schedules/{}",
            urlencoding::encode(schedule_id)
        );
        self.delete(&path).await
    }

    pub async fn toggle_schedule(&self, schedule_id: &str) -> Result<ActionResponse, ApiError> {
        let path = format!(
            "/api/group-settings/schedules/{}/toggle",
            urlencoding::encode(schedule_id)
        );
        self.post_empty(&path).await
    }

    /// Open or close groups now.
    pub async fn apply_settings_now(
        &self,
        request: &ImmediateSettingsRequest,
    ) -> Result<ImmediateSettingsAccepted, ApiError> {
        self.post_json("/api/group-settings/immediate", request)
            .await
    }

    pub async fn settings_history(&self, limit: u32) -> Result<SettingsHistory, ApiError> {
        let query = QueryParams::new().push("limit", limit);
        self.get_json_with("/api/group-settings/history", &query)
            .await
    }
}
