use chrono::{DateTime, Utc};
use groupwatch_shared::{
    ActionResponse, ApiError, BroadcastAccepted, BroadcastHistory, BroadcastRequest,
    BroadcastTask, MentionType, PollRequest,
};
use reqwest::multipart::Form;

use super::{ApiClient, MediaFile, Page, QueryParams};

fn json_field<T: serde::Serialize + ?Sized>(value: &T) -> Result<String, ApiError> {
    serde_json::to_string(value).map_err(|e| ApiError::Deserialize(e.to_string()))
}

fn mention_param(mention_type: MentionType) -> &'static str {
    match mention_type {
        MentionType::None => "none",
        MentionType::All => "all",
        MentionType::Selected => "selected",
    }
}

impl ApiClient {
    /// Queue a text broadcast. Progress arrives over the realtime channel.
    pub async fn send_broadcast(
        &self,
        request: &BroadcastRequest,
    ) -> Result<BroadcastAccepted, ApiError> {
        self.post_json("/api/broadcast/send", request).await
    }

    /// Queue a media broadcast; `request.content` becomes the caption.
    pub async fn send_broadcast_media(
        &self,
        request: &BroadcastRequest,
        media: MediaFile,
    ) -> Result<BroadcastAccepted, ApiError> {
        let mut form = Form::new()
            .part("media", media.into_part())
            .text("content", request.content.clone())
            .text("group_ids", json_field(&request.group_ids)?)
            .text("mention_type", mention_param(request.mention_type));
        if let Some(ids) = &request.mention_ids {
            form = form.text("mention_ids", json_field(ids)?);
        }
        if let Some(at) = request.scheduled_at {
            form = form.text("scheduled_at", scheduled_param(at));
        }
        self.post_multipart("/api/broadcast/send-media", form).await
    }

    pub async fn send_poll(&self, request: &PollRequest) -> Result<BroadcastAccepted, ApiError> {
        self.post_json("/api/broadcast/send-poll", request).await
    }

    /// Broadcasts still waiting for their send time.
    pub async fn scheduled_broadcasts(&self) -> Result<Vec<BroadcastTask>, ApiError> {
        self.get_json("/api/broadcast/scheduled").await
    }

    pub async fn broadcast_history(&self, page: Page) -> Result<BroadcastHistory, ApiError> {
        let query = page.apply(QueryParams::new());
        self.get_json_with("/api/broadcast/history", &query).await
    }

    pub async fn cancel_broadcast(&self, task_id: i64) -> Result<ActionResponse, ApiError> {
        self.delete(&format!("/api/broadcast/scheduled/{task_id}"))
            .await
    }

    pub async fn broadcast(&self, task_id: i64) -> Result<BroadcastTask, ApiError> {
        self.get_json(&format!("/api/broadcast/{task_id}")).await
    }
}

fn scheduled_param(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn scheduled_time_is_rfc3339_utc() {
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap();
        assert_eq!(scheduled_param(at), "2024-06-01T09:30:00Z");
    }

    #[test]
    fn mention_ids_are_sent_as_json_text() {
        let ids = vec!["123@c.us".to_string(), "456@c.us".to_string()];
        assert_eq!(json_field(&ids).unwrap(), r#"["123@c.us","456@c.us"]"#);
        assert_eq!(mention_param(MentionType::Selected), "selected");
    }
}
