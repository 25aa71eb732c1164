use parla_core::{CloudConfig, CloudError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Authenticated JSON-over-HTTP client for one Google REST endpoint.
pub(crate) struct RestEndpoint {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl RestEndpoint {
    pub(crate) fn new(config: &CloudConfig, url: &str, service: &str) -> Result<Self, CloudError> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| CloudError::NotConfigured(service.to_string()))?;
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| CloudError::Request(e.to_string()))?;
        Ok(Self {
            client,
            url: url.to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub(crate) async fn post<B, R>(&self, body: &B) -> Result<R, CloudError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self
            .client
            .post(&self.url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| CloudError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(CloudError::Response(format!("{status}: {text}")));
        }

        response
            .json()
            .await
            .map_err(|e| CloudError::Response(e.to_string()))
    }
}
