use groupwatch_shared::{ApiError, LoginRequest, RegisterRequest, Token, User};

use super::ApiClient;

impl ApiClient {
    pub async fn register(&self, request: &RegisterRequest) -> Result<User, ApiError> {
        self.post_json("/api/auth/register", request).await
    }

    pub async fn login(&self, request: &LoginRequest) -> Result<Token, ApiError> {
        self.post_json("/api/auth/login", request).await
    }

    /// The user the attached token belongs to.
    pub async fn me(&self) -> Result<User, ApiError> {
        self.get_json("/api/auth/me").await
    }

    /// Server-side logout is advisory; tokens are stateless.
    pub async fn logout_remote(&self) -> Result<serde_json::Value, ApiError> {
        self.post_empty("/api/auth/logout").await
    }
}
