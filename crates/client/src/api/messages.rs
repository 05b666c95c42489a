use groupwatch_shared::{ApiError, Message, MessagePage};

use super::{ApiClient, Page, QueryParams};

impl ApiClient {
    /// Messages across every monitored group, or one when `group_id` is set.
    pub async fn messages(&self, group_id: Option<i64>, page: Page) -> Result<MessagePage, ApiError> {
        let query = page.apply(QueryParams::new().push_opt("group_id", group_id));
        self.get_json_with("/api/messages/", &query).await
    }

    pub async fn group_messages(&self, group_id: i64, page: Page) -> Result<MessagePage, ApiError> {
        let query = page.apply(QueryParams::new());
        self.get_json_with(&format!("/api/messages/group/{group_id}"), &query)
            .await
    }

    pub async fn search_messages(
        &self,
        text: &str,
        group_id: Option<i64>,
        page: Page,
    ) -> Result<MessagePage, ApiError> {
        let query = page.apply(
            QueryParams::new()
                .push("query", text)
                .push_opt("group_id", group_id),
        );
        self.get_json_with("/api/messages/search", &query).await
    }

    pub async fn message(&self, message_id: &str) -> Result<Message, ApiError> {
        let path = format!("/api/messages/{}", urlencoding::encode(message_id));
        self.get_json(&path).await
    }
}
