/*!
 * Per-segment translation of transcribed speech.
 *
 * Each segment is translated independently: noise segments are filtered
 * out, a failing or timed-out request drops only that segment, and the
 * surviving translations keep the order of their source segments.
 */

use futures::stream::{self, StreamExt};
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;

use crate::errors::ProviderError;
use crate::providers::Translator;
use crate::segments::{Segment, TranslatedSegment};

/// Outcome counters for one translation batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslationStats {
    pub translated: usize,
    pub skipped_noise: usize,
    pub failed: usize,
}

/// Maps source segments to target-language segments through a `Translator`
#[derive(Debug, Clone)]
pub struct SegmentTranslator {
    translator: Arc<dyn Translator>,
    // @field: Requests in flight at once; results still come back in order
    concurrency: usize,
    // @field: Budget for a single request
    request_timeout: Duration,
}

impl SegmentTranslator {
    pub fn new(translator: Arc<dyn Translator>, concurrency: usize, request_timeout: Duration) -> Self {
        Self {
            translator,
            concurrency: concurrency.max(1),
            request_timeout,
        }
    }

    /// Translate segments, dropping noise and per-segment failures
    pub async fn translate(
        &self,
        segments: &[Segment],
        source_language: &str,
        target_language: &str,
    ) -> Vec<TranslatedSegment> {
        self.translate_with_stats(segments, source_language, target_language)
            .await
            .0
    }

    /// Same as `translate`, also reporting what was dropped
    pub async fn translate_with_stats(
        &self,
        segments: &[Segment],
        source_language: &str,
        target_language: &str,
    ) -> (Vec<TranslatedSegment>, TranslationStats) {
        let mut stats = TranslationStats::default();

        let candidates: Vec<&Segment> = segments
            .iter()
            .filter(|segment| {
                if segment.is_noise() {
                    debug!("Skipping noise segment at {:.2}s: {:?}", segment.start, segment.source_text);
                    stats.skipped_noise += 1;
                    false
                } else {
                    true
                }
            })
            .collect();

        // `buffered` yields results in input order regardless of completion order
        let results: Vec<(&Segment, Result<String, ProviderError>)> = stream::iter(candidates)
            .map(|segment| async move {
                let result = self.translate_one(segment, source_language, target_language).await;
                (segment, result)
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let translated: Vec<TranslatedSegment> = results
            .into_iter()
            .filter_map(|(segment, result)| match result {
                Ok(text) => Some(TranslatedSegment::from_segment(segment, text)),
                Err(e) => {
                    warn!("Dropping segment at {:.2}s after translation error: {}", segment.start, e);
                    stats.failed += 1;
                    None
                }
            })
            .collect();

        stats.translated = translated.len();
        info!(
            "Translated {} of {} segments ({} noise, {} failed)",
            stats.translated,
            segments.len(),
            stats.skipped_noise,
            stats.failed
        );

        (translated, stats)
    }

    async fn translate_one(
        &self,
        segment: &Segment,
        source_language: &str,
        target_language: &str,
    ) -> Result<String, ProviderError> {
        let call = self
            .translator
            .translate(&segment.source_text, source_language, target_language);

        let text = tokio::time::timeout(self.request_timeout, call)
            .await
            .map_err(|_| ProviderError::Timeout(self.request_timeout.as_secs()))??;

        let text = text.trim();
        if text.is_empty() {
            return Err(ProviderError::ParseError("empty translation".to_string()));
        }
        Ok(text.to_string())
    }
}
