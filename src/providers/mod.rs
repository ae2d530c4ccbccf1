/*!
 * Provider implementations for the external speech and translation services.
 *
 * This module defines the narrow interfaces the pipeline consumes and
 * client implementations for them:
 * - `whisper`: OpenAI-compatible Whisper transcription (Groq, OpenAI)
 * - `google`: Google web translation endpoint
 * - `mock`: Deterministic in-process providers for tests
 */

use async_trait::async_trait;
use std::fmt::Debug;
use std::path::Path;
use std::sync::Arc;

use crate::errors::ProviderError;
use crate::segments::Segment;

/// Speech-to-text collaborator
///
/// Returns segments in the order they were spoken.
#[async_trait]
pub trait SpeechToText: Send + Sync + Debug {
    /// Transcribe an audio file in the given source language
    async fn transcribe(&self, audio: &Path, language: &str) -> Result<Vec<Segment>, ProviderError>;

    /// Human readable backend name
    fn name(&self) -> &str;
}

/// Machine translation collaborator, called once per text
#[async_trait]
pub trait Translator: Send + Sync + Debug {
    /// Translate a single text between two ISO language codes
    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String, ProviderError>;
}

#[async_trait]
impl<T: SpeechToText + ?Sized> SpeechToText for Arc<T> {
    async fn transcribe(&self, audio: &Path, language: &str) -> Result<Vec<Segment>, ProviderError> {
        (**self).transcribe(audio, language).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

#[async_trait]
impl<T: Translator + ?Sized> Translator for Arc<T> {
    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String, ProviderError> {
        (**self).translate(text, source_language, target_language).await
    }
}

/// Map a non-success HTTP response to a provider error
pub(crate) async fn error_from_response(response: reqwest::Response) -> ProviderError {
    let status = response.status();
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to get error response text".to_string());

    match status.as_u16() {
        401 | 403 => ProviderError::AuthenticationError(message),
        429 => ProviderError::RateLimitExceeded(message),
        code => ProviderError::ApiError {
            status_code: code,
            message,
        },
    }
}

pub mod google;
pub mod mock;
pub mod whisper;
