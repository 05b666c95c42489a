use chrono::NaiveDate;
use groupwatch_shared::{ApiError, DailyEvents, EventPage, EventSummary, MemberEventType};

use super::{ApiClient, Download, Page, QueryParams};

/// Filters accepted by the event list and CSV export.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventFilter {
    pub event_type: Option<MemberEventType>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub member_name: Option<String>,
    pub group_id: Option<i64>,
}

impl EventFilter {
    pub(crate) fn query(&self) -> QueryParams {
        QueryParams::new()
            .push_opt("event_type", self.event_type.map(event_type_param))
            .push_opt("date_from", self.date_from)
            .push_opt("date_to", self.date_to)
            .push_opt(
                "member_name",
                self.member_name.as_deref().filter(|n| !n.trim().is_empty()),
            )
            .push_opt("group_id", self.group_id)
    }
}

fn event_type_param(event_type: MemberEventType) -> &'static str {
    match event_type {
        MemberEventType::Join => "JOIN",
        MemberEventType::Leave => "LEAVE",
        MemberEventType::Certificate => "CERTIFICATE",
    }
}

impl ApiClient {
    pub async fn events(&self, filter: &EventFilter, page: Page) -> Result<EventPage, ApiError> {
        let query = page.apply(filter.query());
        self.get_json_with("/api/events/", &query).await
    }

    pub async fn group_events(&self, group_id: i64, page: Page) -> Result<EventPage, ApiError> {
        let query = page.apply(QueryParams::new());
        self.get_json_with(&format!("/api/events/group/{group_id}"), &query)
            .await
    }

    pub async fn event_summary(
        &self,
        date_from: Option<NaiveDate>,
        date_to: Option<NaiveDate>,
        group_id: Option<i64>,
    ) -> Result<EventSummary, ApiError> {
        let query = QueryParams::new()
            .push_opt("date_from", date_from)
            .push_opt("date_to", date_to)
            .push_opt("group_id", group_id);
        self.get_json_with("/api/events/summary", &query).await
    }

    pub async fn daily_events(
        &self,
        days: u32,
        group_id: Option<i64>,
    ) -> Result<Vec<DailyEvents>, ApiError> {
        let query = QueryParams::new()
            .push("days", days)
            .push_opt("group_id", group_id);
        self.get_json_with("/api/events/daily", &query).await
    }

    pub async fn export_events_csv(&self, filter: &EventFilter) -> Result<Download, ApiError> {
        self.download("/api/events/export/csv", &filter.query(), "events.csv")
            .await
    }
}
