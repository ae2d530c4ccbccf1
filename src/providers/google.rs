use async_trait::async_trait;
use log::error;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use url::Url;

use crate::app_config::TranslationConfig;
use crate::errors::ProviderError;
use crate::language_utils;
use crate::providers::{Translator, error_from_response};

/// Client for the Google web translation endpoint
#[derive(Debug)]
pub struct GoogleTranslate {
    client: Client,
    endpoint: String,
}

impl GoogleTranslate {
    pub fn from_config(config: &TranslationConfig) -> Self {
        Self::new(&config.endpoint, config.timeout_secs)
    }

    pub fn new(endpoint: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs.max(1)))
                .build()
                .unwrap_or_default(),
            endpoint: endpoint.into(),
        }
    }

    /// Build the request URL for one text
    pub fn request_url(&self, text: &str, source: &str, target: &str) -> Result<Url, ProviderError> {
        Url::parse_with_params(
            &self.endpoint,
            &[
                ("client", "gtx"),
                ("sl", language_utils::google_language_code(source).as_str()),
                ("tl", language_utils::google_language_code(target).as_str()),
                ("dt", "t"),
                ("q", text),
            ],
        )
        .map_err(|e| ProviderError::RequestFailed(format!("invalid endpoint: {}", e)))
    }

    /// Extract the translated text from the nested array response
    ///
    /// The body looks like `[[["translated", "original", ...], ...], ...]`,
    /// one inner entry per sentence.
    pub fn extract_text(body: &Value) -> Result<String, ProviderError> {
        let sentences = body
            .get(0)
            .and_then(|v| v.as_array())
            .ok_or_else(|| ProviderError::ParseError("missing sentence array".to_string()))?;

        let text: String = sentences
            .iter()
            .filter_map(|sentence| sentence.get(0).and_then(|t| t.as_str()))
            .collect();

        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ProviderError::ParseError("empty translation".to_string()));
        }
        Ok(trimmed.to_string())
    }
}

#[async_trait]
impl Translator for GoogleTranslate {
    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String, ProviderError> {
        let url = self.request_url(text, source_language, target_language)?;

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            let err = error_from_response(response).await;
            error!("Google translation error: {}", err);
            return Err(err);
        }

        let body = response
            .json::<Value>()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        Self::extract_text(&body)
    }
}
