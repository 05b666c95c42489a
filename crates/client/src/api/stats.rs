use groupwatch_shared::{ApiError, DailyCount, GroupActivity, MemberChange, StatsOverview, TopSender};

use super::{ApiClient, QueryParams};

impl ApiClient {
    pub async fn stats_overview(
        &self,
        days: u32,
        group_id: Option<i64>,
    ) -> Result<StatsOverview, ApiError> {
        let query = QueryParams::new()
            .push("days", days)
            .push_opt("group_id", group_id);
        self.get_json_with("/api/stats/overview", &query).await
    }

    /// Message counts per day.
    pub async fn daily_stats(
        &self,
        days: u32,
        group_id: Option<i64>,
    ) -> Result<Vec<DailyCount>, ApiError> {
        let query = QueryParams::new()
            .push("days", days)
            .push_opt("group_id", group_id);
        self.get_json_with("/api/stats/daily", &query).await
    }

    pub async fn top_senders(
        &self,
        limit: u32,
        group_id: Option<i64>,
    ) -> Result<Vec<TopSender>, ApiError> {
        let query = QueryParams::new()
            .push("limit", limit)
            .push_opt("group_id", group_id);
        self.get_json_with("/api/stats/top-senders", &query).await
    }

    pub async fn activity_by_group(&self, days: u32) -> Result<Vec<GroupActivity>, ApiError> {
        let query = QueryParams::new().push("days", days);
        self.get_json_with("/api/stats/activity-by-group", &query)
            .await
    }

    pub async fn member_changes(
        &self,
        days: u32,
        group_id: Option<i64>,
    ) -> Result<Vec<MemberChange>, ApiError> {
        let query = QueryParams::new()
            .push("days", days)
            .push_opt("group_id", group_id);
        self.get_json_with("/api/stats/member-changes", &query).await
    }
}
