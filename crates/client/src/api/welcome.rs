use groupwatch_shared::{ActionResponse, ApiError, DisableAllResponse, WelcomeSettings, WelcomeUpdate};
use reqwest::multipart::Form;

use super::{ApiClient, MediaFile};

impl ApiClient {
    pub async fn welcome_settings(&self) -> Result<Vec<WelcomeSettings>, ApiError> {
        self.get_json("/api/welcome/").await
    }

    pub async fn group_welcome(&self, group_id: i64) -> Result<WelcomeSettings, ApiError> {
        self.get_json(&format!("/api/welcome/{group_id}")).await
    }

    /// Apply the same welcome configuration to several groups.
    pub async fn update_welcome_bulk(
        &self,
        update: &WelcomeUpdate,
    ) -> Result<ActionResponse, ApiError> {
        self.put_json("/api/welcome/bulk", update).await
    }

    pub async fn update_group_welcome(
        &self,
        group_id: i64,
        update: &WelcomeUpdate,
    ) -> Result<ActionResponse, ApiError> {
        self.put_json(&format!("/api/welcome/{group_id}"), update)
            .await
    }

    /// Attach the part-two image to each listed group.
    pub async fn upload_welcome_image(
        &self,
        group_ids: &[i64],
        image: MediaFile,
    ) -> Result<ActionResponse, ApiError> {
        let ids = group_ids
            .iter()
            .map(i64::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let form = Form::new()
            .text("group_ids", ids)
            .part("image", image.into_part());
        self.post_multipart("/api/welcome/upload-image", form).await
    }

    pub async fn delete_welcome_image(&self, group_id: i64) -> Result<ActionResponse, ApiError> {
        self.delete(&format!("/api/welcome/{group_id}/image")).await
    }

    pub async fn reset_welcome_counter(&self, group_id: i64) -> Result<ActionResponse, ApiError> {
        self.post_empty(&format!("/api/welcome/{group_id}/reset-counter"))
            .await
    }

    pub async fn disable_all_welcome(&self) -> Result<DisableAllResponse, ApiError> {
        self.post_empty("/api/welcome/disable-all").await
    }
}
