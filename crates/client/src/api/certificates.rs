use chrono::NaiveDate;
use groupwatch_shared::{ApiError, CertificatePage, CertificateSummary};

use super::{ApiClient, Download, Page, QueryParams};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CertificateFilter {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub member_name: Option<String>,
    pub group_id: Option<i64>,
}

impl CertificateFilter {
    pub(crate) fn query(&self) -> QueryParams {
        QueryParams::new()
            .push_opt("date_from", self.date_from)
            .push_opt("date_to", self.date_to)
            .push_opt(
                "member_name",
                self.member_name.as_deref().filter(|n| !n.trim().is_empty()),
            )
            .push_opt("group_id", self.group_id)
    }
}

impl ApiClient {
    pub async fn certificates(
        &self,
        filter: &CertificateFilter,
        page: Page,
    ) -> Result<CertificatePage, ApiError> {
        let query = page.apply(filter.query());
        self.get_json_with("/api/certificates/", &query).await
    }

    /// Per-member certificate counts. Member name is not a summary filter.
    pub async fn certificate_summary(
        &self,
        filter: &CertificateFilter,
    ) -> Result<CertificateSummary, ApiError> {
        let query = QueryParams::new()
            .push_opt("date_from", filter.date_from)
            .push_opt("date_to", filter.date_to)
            .push_opt("group_id", filter.group_id);
        self.get_json_with("/api/certificates/summary", &query).await
    }

    pub async fn export_certificates_csv(
        &self,
        filter: &CertificateFilter,
    ) -> Result<Download, ApiError> {
        self.download(
            "/api/certificates/export/csv",
            &filter.query(),
            "certificates.csv",
        )
        .await
    }
}
