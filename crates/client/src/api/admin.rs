use groupwatch_shared::{
    ActionResponse, AdminOverview, AdminToggled, AdminUser, AdminUserStats, ApiError,
    CertificatePage, EventPage, Group, MessagePage, User,
};

use super::{ApiClient, Page, QueryParams};

impl ApiClient {
    pub async fn admin_users(&self, page: Page) -> Result<Vec<AdminUser>, ApiError> {
        let query = page.apply(QueryParams::new());
        self.get_json_with("/api/admin/users", &query).await
    }

    pub async fn admin_user(&self, user_id: i64) -> Result<User, ApiError> {
        self.get_json(&format!("/api/admin/users/{user_id}")).await
    }

    /// Flip the admin flag. Admins cannot demote themselves.
    pub async fn toggle_admin(&self, user_id: i64) -> Result<AdminToggled, ApiError> {
        self.put_empty(&format!("/api/admin/users/{user_id}/admin"))
            .await
    }

    pub async fn delete_user(&self, user_id: i64) -> Result<ActionResponse, ApiError> {
        self.delete(&format!("/api/admin/users/{user_id}")).await
    }

    pub async fn admin_user_groups(&self, user_id: i64) -> Result<Vec<Group>, ApiError> {
        self.get_json(&format!("/api/admin/users/{user_id}/groups"))
            .await
    }

    pub async fn admin_user_messages(
        &self,
        user_id: i64,
        page: Page,
    ) -> Result<MessagePage, ApiError> {
        let query = page.apply(QueryParams::new());
        self.get_json_with(&format!("/api/admin/users/{user_id}/messages"), &query)
            .await
    }

    pub async fn admin_user_stats(&self, user_id: i64) -> Result<AdminUserStats, ApiError> {
        self.get_json(&format!("/api/admin/users/{user_id}/stats"))
            .await
    }

    pub async fn admin_user_events(&self, user_id: i64, page: Page) -> Result<EventPage, ApiError> {
        let query = page.apply(QueryParams::new());
        self.get_json_with(&format!("/api/admin/users/{user_id}/events"), &query)
            .await
    }

    pub async fn admin_user_certificates(
        &self,
        user_id: i64,
        page: Page,
    ) -> Result<CertificatePage, ApiError> {
        let query = page.apply(QueryParams::new());
        self.get_json_with(
            &format!("/api/admin/users/{user_id}/certificates"),
            &query,
        )
        .await
    }

    /// Platform-wide totals.
    pub async fn admin_overview(&self) -> Result<AdminOverview, ApiError> {
        self.get_json("/api/admin/stats/overview").await
    }
}
