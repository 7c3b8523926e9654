//! HTTP client for the counselor REST backend: chat credentials and preferences.

use async_trait::async_trait;
use conseiller_core::ConseillerPreferences;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::info;

use crate::ChatError;
use crate::context::{ChatCredentials, CredentialsSource};

/// REST client authenticated with the counselor's access token.
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
}

/// Body of `GET /auth/firebase/token`.
#[derive(Deserialize)]
struct CredentialsResponse {
    token: String,
    cle: String,
}

impl From<CredentialsResponse> for ChatCredentials {
    fn from(resp: CredentialsResponse) -> Self {
        Self {
            token: resp.token,
            encryption_key: resp.cle,
        }
    }
}

impl ApiClient {
    /// Create a client for the given API base URL.
    ///
    /// `base_url` should be like `http://localhost:5000` (no trailing slash).
    pub fn new(base_url: String, access_token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token,
        }
    }

    /// Fetch the chat backend token and the message encryption key.
    pub async fn fetch_chat_credentials(&self) -> Result<ChatCredentials, ChatError> {
        let url = format!("{}/auth/firebase/token", self.base_url);
        info!(url = %url, "fetching chat credentials");
        let resp: CredentialsResponse = self.get_json(&url).await?;
        Ok(resp.into())
    }

    /// Fetch a counselor's notification preferences.
    pub async fn conseiller_preferences(
        &self,
        conseiller_id: &str,
    ) -> Result<ConseillerPreferences, ChatError> {
        let url = format!("{}/conseillers/{}", self.base_url, conseiller_id);
        info!(url = %url, "fetching conseiller preferences");
        self.get_json(&url).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ChatError> {
        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ChatError::Server {
                status: status.as_u16(),
                body,
            });
        }
        let body = resp.bytes().await?;
        serde_json::from_slice(&body).map_err(ChatError::from)
    }
}

#[async_trait]
impl CredentialsSource for ApiClient {
    async fn chat_credentials(&self) -> Result<ChatCredentials, ChatError> {
        self.fetch_chat_credentials().await
    }
}
