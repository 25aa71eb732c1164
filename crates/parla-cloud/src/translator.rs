use crate::rest::RestEndpoint;
use async_trait::async_trait;
use parla_core::{CloudConfig, CloudError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq)]
pub struct Translation {
    pub translated_text: String,
    /// Only set when the source language was detected rather than given.
    pub detected_source_language: Option<String>,
}

/// Unary text translation.
#[async_trait]
pub trait Translator: Send + Sync {
    /// `source_language` of `None` asks the service to detect it.
    async fn translate(
        &self,
        text: &str,
        source_language: Option<&str>,
        target_language: &str,
    ) -> Result<Translation, CloudError>;
}

/// Cloud Translation v2 over REST.
pub struct GoogleTranslator {
    endpoint: RestEndpoint,
}

impl GoogleTranslator {
    pub fn from_config(config: &CloudConfig) -> Result<Self, CloudError> {
        Ok(Self {
            endpoint: RestEndpoint::new(config, &config.translate_url, "Translation")?,
        })
    }
}

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    target: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<&'a str>,
    format: &'static str,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    data: TranslateData,
}

#[derive(Debug, Deserialize)]
struct TranslateData {
    #[serde(default)]
    translations: Vec<TranslatedText>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslatedText {
    translated_text: String,
    #[serde(default)]
    detected_source_language: Option<String>,
}

impl TranslateResponse {
    fn into_translation(self) -> Result<Translation, CloudError> {
        self.data
            .translations
            .into_iter()
            .next()
            .map(|t| Translation {
                translated_text: t.translated_text,
                detected_source_language: t.detected_source_language,
            })
            .ok_or_else(|| CloudError::Response("no translations returned".to_string()))
    }
}

#[async_trait]
impl Translator for GoogleTranslator {
    async fn translate(
        &self,
        text: &str,
        source_language: Option<&str>,
        target_language: &str,
    ) -> Result<Translation, CloudError> {
        let request = TranslateRequest {
            q: text,
            target: target_language,
            source: source_language,
            format: "text",
        };
        let response: TranslateResponse = self.endpoint.post(&request).await?;
        let translation = response.into_translation()?;
        tracing::debug!(
            target_language,
            detected = ?translation.detected_source_language,
            "translated {} chars",
            text.chars().count()
        );
        Ok(translation)
    }
}
