use groupwatch_shared::{
    ActionResponse, Agent, AgentGroupList, AgentGroups, AgentList, ApiError, CreateAgentRequest,
    UpdateAgentRequest,
};

use super::ApiClient;

impl ApiClient {
    pub async fn agents(&self) -> Result<AgentList, ApiError> {
        self.get_json("/api/agents/").await
    }

    pub async fn create_agent(&self, request: &CreateAgentRequest) -> Result<Agent, ApiError> {
        self.post_json("/api/agents/", request).await
    }

    pub async fn agent(&self, agent_id: i64) -> Result<Agent, ApiError> {
        self.get_json(&format!("/api/agents/{agent_id}")).await
    }

    pub async fn update_agent(
        &self,
        agent_id: i64,
        request: &UpdateAgentRequest,
    ) -> Result<Agent, ApiError> {
        self.put_json(&format!("/api/agents/{agent_id}"), request)
            .await
    }

    pub async fn delete_agent(&self, agent_id: i64) -> Result<ActionResponse, ApiError> {
        self.delete(&format!("/api/agents/{agent_id}")).await
    }

    /// Only one agent is active at a time; activating one deactivates the rest.
    pub async fn activate_agent(&self, agent_id: i64) -> Result<ActionResponse, ApiError> {
        self.post_empty(&format!("/api/agents/{agent_id}/activate"))
            .await
    }

    pub async fn deactivate_agent(&self, agent_id: i64) -> Result<ActionResponse, ApiError> {
        self.post_empty(&format!("/api/agents/{agent_id}/deactivate"))
            .await
    }

    pub async fn set_agent_groups(
        &self,
        agent_id: i64,
        group_ids: &[i64],
    ) -> Result<ActionResponse, ApiError> {
        let body = AgentGroups {
            enabled_group_ids: group_ids.to_vec(),
        };
        self.put_json(&format!("/api/agents/{agent_id}/groups"), &body)
            .await
    }

    /// Every monitored group with the agent's enabled flag.
    pub async fn agent_groups(&self, agent_id: i64) -> Result<AgentGroupList, ApiError> {
        self.get_json(&format!("/api/agents/{agent_id}/groups"))
            .await
    }
}
