//! HTTP experiment submission client.

use async_trait::async_trait;

use crate::errors::ClientError;
use crate::traits::ExperimentClient;
use crate::types::{ExperimentInstance, ExperimentTemplate};

const CREATE_EXPERIMENT: &str = "create_experiment";

/// [`ExperimentClient`] posting templates as JSON to
/// `{base_url}/api/experiments`.
///
/// A 2xx response must carry an [`ExperimentInstance`] body. Any other
/// status becomes [`ClientError::Status`]; a request that never got a
/// response becomes [`ClientError::Transport`]. No retries.
#[derive(Clone)]
pub struct HttpExperimentClient {
    http: reqwest::Client,
    base_url: String,
    bearer_token: Option<String>,
}

impl HttpExperimentClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Use a preconfigured `reqwest` client (timeouts, proxies, TLS roots).
    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bearer_token: None,
        }
    }

    /// Send `Authorization: Bearer <token>` with every request.
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    fn transport(message: String) -> ClientError {
        ClientError::Transport {
            operation: CREATE_EXPERIMENT.into(),
            message,
        }
    }
}

#[async_trait]
impl ExperimentClient for HttpExperimentClient {
    async fn create_experiment(
        &self,
        template: &ExperimentTemplate,
    ) -> Result<ExperimentInstance, ClientError> {
        let url = format!("{}/api/experiments", self.base_url);
        let mut request = self.http.post(&url).json(template);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Self::transport(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::warn!(
                url = %url,
                status = status.as_u16(),
                "experiment submission rejected"
            );
            return Err(ClientError::Status {
                operation: CREATE_EXPERIMENT.into(),
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<ExperimentInstance>()
            .await
            .map_err(|e| Self::transport(format!("failed to decode response body: {e}")))
    }
}
