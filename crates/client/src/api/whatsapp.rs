use groupwatch_shared::{
    ActionResponse, ApiError, AvailableGroups, GroupMembers, InitResponse, QrCode, WhatsAppChannels,
    WhatsAppStatus,
};

use super::ApiClient;

impl ApiClient {
    pub async fn whatsapp_status(&self) -> Result<WhatsAppStatus, ApiError> {
        self.get_json("/api/whatsapp/status").await
    }

    /// Start (or resume) the WhatsApp session; a QR event follows when
    /// the account needs pairing.
    pub async fn whatsapp_init(&self) -> Result<InitResponse, ApiError> {
        self.post_empty("/api/whatsapp/init").await
    }

    pub async fn whatsapp_qr(&self) -> Result<QrCode, ApiError> {
        self.get_json("/api/whatsapp/qr").await
    }

    pub async fn whatsapp_logout(&self) -> Result<ActionResponse, ApiError> {
        self.post_empty("/api/whatsapp/logout").await
    }

    /// Groups the connected account belongs to, monitored or not.
    pub async fn available_groups(&self) -> Result<AvailableGroups, ApiError> {
        self.get_json("/api/whatsapp/available-groups").await
    }

    pub async fn whatsapp_group_members(&self, wa_group_id: &str) -> Result<GroupMembers, ApiError> {
        let path = format!(
            "/api/whatsapp/groups/{}/members",
            urlencoding::encode(wa_group_id)
        );
        self.get_json(&path).await
    }

    pub async fn whatsapp_channels(&self) -> Result<WhatsAppChannels, ApiError> {
        self.get_json("/api/whatsapp/channels").await
    }
}
