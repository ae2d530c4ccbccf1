use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::app_config::TranscriptionConfig;
use crate::errors::ProviderError;
use crate::providers::{SpeechToText, error_from_response};
use crate::segments::Segment;

/// Whisper client for OpenAI-compatible `/audio/transcriptions` endpoints
#[derive(Debug)]
pub struct WhisperApi {
    /// HTTP client for API requests
    client: Client,
    /// Backend name used in logs
    name: String,
    /// API key for authentication
    api_key: String,
    /// Base URL, e.g. https://api.groq.com/openai/v1
    endpoint: String,
    /// Model identifier
    model: String,
}

/// Response body for `response_format=verbose_json`
#[derive(Debug, Deserialize)]
pub struct VerboseTranscription {
    /// Full text, unused by the pipeline
    #[serde(default)]
    pub text: String,
    /// Timed segments
    #[serde(default)]
    pub segments: Vec<TranscriptionSegment>,
}

/// One timed segment of a verbose transcription
#[derive(Debug, Deserialize)]
pub struct TranscriptionSegment {
    pub start: f64,
    pub end: f64,
    #[serde(default)]
    pub text: String,
}

impl WhisperApi {
    /// Create a new client from the transcription section of the config
    pub fn from_config(config: &TranscriptionConfig) -> Self {
        Self::new(
            config.provider.display_name(),
            &config.api_key,
            config.get_endpoint(),
            config.get_model(),
            config.timeout_secs,
        )
    }

    pub fn new(
        name: impl Into<String>,
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        model: impl Into<String>,
        timeout_secs: u64,
    ) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs.max(1)))
                .build()
                .unwrap_or_default(),
            name: name.into(),
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            model: model.into(),
        }
    }

    /// Convert a verbose response into validated segments
    pub fn segments_from_response(response: VerboseTranscription) -> Vec<Segment> {
        Segment::collect_valid(
            response
                .segments
                .into_iter()
                .map(|s| (s.start, s.end, s.text)),
        )
    }
}

#[async_trait]
impl SpeechToText for WhisperApi {
    async fn transcribe(&self, audio: &Path, language: &str) -> Result<Vec<Segment>, ProviderError> {
        let api_url = format!("{}/audio/transcriptions", self.endpoint.trim_end_matches('/'));

        let file_name = audio
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| "audio.mp3".to_string());

        // The upload buffer lives only for the duration of this call
        let bytes = tokio::fs::read(audio)
            .await
            .map_err(|e| ProviderError::RequestFailed(format!("cannot read {}: {}", audio.display(), e)))?;
        debug!("Uploading {} bytes of audio to {}", bytes.len(), self.name);

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("audio/mpeg")
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

        let form = Form::new()
            .part("file", part)
            .text("model", self.model.clone())
            .text("language", language.to_string())
            .text("response_format", "verbose_json")
            .text("timestamp_granularities[]", "segment");

        let response = self
            .client
            .post(&api_url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let err = error_from_response(response).await;
            error!("{} transcription error: {}", self.name, err);
            return Err(err);
        }

        let body = response
            .json::<VerboseTranscription>()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        Ok(Self::segments_from_response(body))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
