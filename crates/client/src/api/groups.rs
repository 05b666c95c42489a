use groupwatch_shared::{
    ActionResponse, AddGroupRequest, ApiError, Group, GroupMembers, SendMessageRequest,
};
use reqwest::multipart::Form;

use super::{ApiClient, MediaFile};

impl ApiClient {
    /// Monitored groups.
    pub async fn groups(&self) -> Result<Vec<Group>, ApiError> {
        self.get_json("/api/groups/").await
    }

    pub async fn add_group(&self, request: &AddGroupRequest) -> Result<Group, ApiError> {
        self.post_json("/api/groups/", request).await
    }

    pub async fn group(&self, group_id: i64) -> Result<Group, ApiError> {
        self.get_json(&format!("/api/groups/{group_id}")).await
    }

    /// Stop monitoring a group. History is kept server-side.
    pub async fn remove_group(&self, group_id: i64) -> Result<ActionResponse, ApiError> {
        self.delete(&format!("/api/groups/{group_id}")).await
    }

    pub async fn group_members(&self, group_id: i64) -> Result<GroupMembers, ApiError> {
        self.get_json(&format!("/api/groups/{group_id}/members")).await
    }

    pub async fn send_to_group(
        &self,
        group_id: i64,
        request: &SendMessageRequest,
    ) -> Result<ActionResponse, ApiError> {
        self.post_json(&format!("/api/groups/{group_id}/send"), request)
            .await
    }

    pub async fn send_media_to_group(
        &self,
        group_id: i64,
        media: MediaFile,
        caption: Option<&str>,
        mention_all: bool,
        mention_ids: Option<&[String]>,
    ) -> Result<ActionResponse, ApiError> {
        let mut form = Form::new()
            .part("media", media.into_part())
            .text("mention_all", mention_all.to_string());
        if let Some(caption) = caption {
            form = form.text("caption", caption.to_string());
        }
        if let Some(ids) = mention_ids {
            let ids = serde_json::to_string(ids).map_err(|e| ApiError::Deserialize(e.to_string()))?;
            form = form.text("mention_ids", ids);
        }
        self.post_multipart(&format!("/api/groups/{group_id}/send-media"), form)
            .await
    }
}
