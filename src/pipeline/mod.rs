/*!
 * Job orchestration.
 *
 * `Pipeline::run` drives one submitted video through
 * Received → Admitted → AudioExtracted → Transcribed → Translated →
 * Overlaid → Encoded → Delivered, or into Failed from any working stage,
 * and always finishes in Cleaned with every artifact released. Stages run
 * strictly in sequence; independent jobs only share the admission semaphore.
 */

pub mod admission;
pub mod collaborators;
pub mod job;

use futures::FutureExt;
use log::{debug, error, info, warn};
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::app_config::Config;
use crate::artifacts::{ArtifactKind, ArtifactRegistry};
use crate::errors::JobError;
use crate::media::MediaToolkit;
use crate::overlay::{BandLayout, OverlayTimeline};
use crate::providers::{SpeechToText, Translator};
use crate::render::{self, FontChain, RasterStyle, TextRasterizer};
use crate::segments::TranslatedSegment;
use crate::translation::SegmentTranslator;

pub use admission::{AdmissionControl, AdmissionLimits};
pub use collaborators::{
    Delivery, DeliveryReceipt, FileDelivery, LocalFileSource, LogStatusSink, MediaSource,
    ProgressStatusSink, StatusSink,
};
pub use job::{Job, JobReport, JobStage};

/// Cooperative cancellation shared between a caller and running jobs
///
/// Every handle shares one trigger. A handle from `scope` only reacts to
/// cancellations issued after it was created, so a long-lived owner can hand
/// out a fresh scope per run.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    sender: Arc<watch::Sender<u64>>,
    receiver: watch::Receiver<u64>,
    // @field: Trigger count at creation; anything above it means cancelled
    baseline: u64,
}

impl CancelSignal {
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(0);
        Self {
            sender: Arc::new(sender),
            receiver,
            baseline: 0,
        }
    }

    /// Handle on the same trigger that ignores earlier cancellations
    pub fn scope(&self) -> Self {
        Self {
            sender: Arc::clone(&self.sender),
            receiver: self.receiver.clone(),
            baseline: *self.receiver.borrow(),
        }
    }

    /// Cancel every live scope of this signal
    pub fn cancel(&self) {
        self.sender.send_modify(|count| *count += 1);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow() > self.baseline
    }

    /// Resolve once `cancel` has been called on this scope's trigger
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        loop {
            if *receiver.borrow_and_update() > self.baseline {
                return;
            }
            if receiver.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Services a pipeline is assembled from
#[derive(Debug, Clone)]
pub struct PipelineServices {
    pub media: Arc<dyn MediaToolkit>,
    pub speech: Arc<dyn SpeechToText>,
    pub translator: Arc<dyn Translator>,
    pub status: Arc<dyn StatusSink>,
    pub fonts: Arc<FontChain>,
}

/// Per-stage time budgets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageTimeouts {
    pub fetch: Duration,
    pub media: Duration,
    pub transcription: Duration,
    pub delivery: Duration,
}

impl From<&Config> for StageTimeouts {
    fn from(config: &Config) -> Self {
        Self {
            fetch: Duration::from_secs(config.source.fetch_timeout_secs.max(1)),
            media: Duration::from_secs(config.encoder.timeout_secs.max(1)),
            transcription: Duration::from_secs(config.transcription.timeout_secs.max(1)),
            delivery: Duration::from_secs(config.delivery.timeout_secs.max(1)),
        }
    }
}

/// Runs jobs end to end
#[derive(Debug, Clone)]
pub struct Pipeline {
    source_language: String,
    target_language: String,
    limits: AdmissionLimits,
    timeouts: StageTimeouts,
    work_root: PathBuf,
    media: Arc<dyn MediaToolkit>,
    speech: Arc<dyn SpeechToText>,
    translator: SegmentTranslator,
    timeline: OverlayTimeline,
    admission: AdmissionControl,
    status: Arc<dyn StatusSink>,
}

/// Successful result of the working stages
type StageOutput = (DeliveryReceipt, Vec<TranslatedSegment>);

impl Pipeline {
    pub fn new(config: &Config, services: PipelineServices) -> Self {
        let rasterizer = TextRasterizer::new(services.fonts, RasterStyle::from(&config.overlay))
            .with_direction(render::direction_for(&config.target_language));
        let timeline = OverlayTimeline::new(rasterizer, BandLayout::from(&config.overlay));
        let translator = SegmentTranslator::new(
            services.translator,
            config.translation.concurrent_requests,
            Duration::from_secs(config.translation.timeout_secs.max(1)),
        );

        Self {
            source_language: config.source_language.clone(),
            target_language: config.target_language.clone(),
            limits: AdmissionLimits::from(&config.limits),
            timeouts: StageTimeouts::from(config),
            work_root: config.work_root(),
            media: services.media,
            speech: services.speech,
            translator,
            timeline,
            admission: AdmissionControl::new(config.limits.max_concurrent_jobs),
            status: services.status,
        }
    }

    /// Share `admission` with every other pipeline holding it
    pub fn with_admission(mut self, admission: AdmissionControl) -> Self {
        self.admission = admission;
        self
    }

    pub fn admission(&self) -> &AdmissionControl {
        &self.admission
    }

    /// Process one video; never panics and always releases the job's artifacts
    pub async fn run(
        &self,
        source: &dyn MediaSource,
        delivery: &dyn Delivery,
        cancel: &CancelSignal,
    ) -> JobReport {
        let mut job = Job::new(new_job_id());
        let _permit = self.admission.acquire(job.id()).await;
        info!("Job {} started for {}", job.id(), source.display_name());
        self.status.report(job.id(), JobStage::Received.status_text());

        let outcome = {
            let work = AssertUnwindSafe(self.execute(&mut job, source, delivery)).catch_unwind();
            tokio::select! {
                result = work => match result {
                    Ok(result) => result,
                    Err(panic) => Err(JobError::Unexpected(panic_message(panic))),
                },
                _ = cancel.cancelled() => Err(JobError::Cancelled),
            }
        };

        let (outcome, segments) = match outcome {
            Ok((receipt, segments)) => (Ok(receipt), segments),
            Err(e) => {
                error!("Job {} failed at {}: {}", job.id(), job.stage(), e);
                job.fail();
                self.status.report(job.id(), &e.user_message());
                (Err(e), Vec::new())
            }
        };

        let released = job.clean();
        if !released.is_clean() {
            warn!(
                "Job {}: {} artifacts could not be released",
                job.id(),
                released.failures.len()
            );
        }

        let final_status = match &outcome {
            Ok(_) => JobStage::Delivered.status_text().to_string(),
            Err(e) => e.user_message(),
        };
        self.status.finish(job.id(), &final_status);

        JobReport {
            job_id: job.id().to_string(),
            history: job.history().to_vec(),
            outcome,
            segments,
            released,
        }
    }

    async fn execute(
        &self,
        job: &mut Job,
        source: &dyn MediaSource,
        delivery: &dyn Delivery,
    ) -> Result<StageOutput, JobError> {
        // Received → Admitted
        let size = source
            .file_size_bytes()
            .map_err(|e| JobError::Extraction(format!("cannot read source video: {}", e)))?;
        self.limits.check_size(size)?;

        let registry = ArtifactRegistry::create(&self.work_root, job.id())
            .map_err(|e| JobError::Unexpected(format!("cannot create job workspace: {}", e)))?;
        let artifacts = job.attach_artifacts(registry);
        let source_path = artifacts.register(ArtifactKind::SourceVideo);
        bounded(self.timeouts.fetch, source.fetch(&source_path))
            .await
            .map_err(|e| JobError::Extraction(format!("cannot fetch source video: {}", e)))?
            .map_err(|e| JobError::Extraction(format!("cannot fetch source video: {}", e)))?;
        self.transition(job, JobStage::Admitted)?;

        // Admitted → AudioExtracted
        let info = bounded(self.timeouts.media, self.media.probe(&source_path))
            .await
            .map_err(JobError::Extraction)?
            .map_err(|e| JobError::Extraction(e.to_string()))?;
        self.limits.check_duration(info.duration_secs)?;
        if !info.has_audio {
            return Err(JobError::Extraction("video has no audio track".to_string()));
        }
        debug!("Job {}: {:?}", job.id(), info);

        let audio_path = self.artifacts(job)?.register(ArtifactKind::ExtractedAudio);
        bounded(self.timeouts.media, self.media.extract_audio(&source_path, &audio_path))
            .await
            .map_err(JobError::Extraction)?
            .map_err(|e| JobError::Extraction(e.to_string()))?;
        self.transition(job, JobStage::AudioExtracted)?;

        // AudioExtracted → Transcribed
        let transcription = bounded(
            self.timeouts.transcription,
            self.speech.transcribe(&audio_path, &self.source_language),
        )
        .await;
        // The audio is only needed for transcription
        if let Err(e) = self.artifacts(job)?.release(ArtifactKind::ExtractedAudio) {
            warn!("Job {}: could not release audio early: {}", job.id(), e);
        }
        let segments = transcription
            .map_err(JobError::Transcription)?
            .map_err(|e| JobError::Transcription(format!("Transcription failed: {}", e)))?;
        if segments.is_empty() {
            return Err(JobError::Transcription("No speech detected in the video".to_string()));
        }
        info!("Job {}: {} segments transcribed by {}", job.id(), segments.len(), self.speech.name());
        self.transition(job, JobStage::Transcribed)?;

        // Transcribed → Translated
        let translated = self
            .translator
            .translate(&segments, &self.source_language, &self.target_language)
            .await;
        drop(segments);
        if translated.is_empty() {
            return Err(JobError::Translation("No text to translate".to_string()));
        }
        self.transition(job, JobStage::Translated)?;

        // Translated → Overlaid
        let timeline = self.timeline.clone();
        let overlay_input = translated.clone();
        let frame = info.frame_size();
        let duration = info.duration_secs;
        let tracks = tokio::task::spawn_blocking(move || timeline.build(&overlay_input, frame, Some(duration)))
            .await
            .map_err(|e| JobError::Unexpected(format!("overlay rendering aborted: {}", e)))?;
        if tracks.is_empty() {
            return Err(JobError::Translation("No text to overlay".to_string()));
        }
        self.transition(job, JobStage::Overlaid)?;

        // Overlaid → Encoded
        let artifacts = self.artifacts(job)?;
        artifacts.register(ArtifactKind::PartialOutput);
        let output_path = artifacts.register(ArtifactKind::RenderedOutput);
        self.media
            .compose(&source_path, &info, &tracks, &output_path)
            .await
            .map_err(|e| JobError::Encode(e.to_string()))?;
        drop(tracks);
        if let Err(e) = self.artifacts(job)?.release(ArtifactKind::SourceVideo) {
            warn!("Job {}: could not release source early: {}", job.id(), e);
        }
        self.transition(job, JobStage::Encoded)?;

        // Encoded → Delivered
        let caption = format!(
            "{} ({} → {})",
            source.display_name(),
            self.source_language,
            self.target_language
        );
        let receipt = bounded(self.timeouts.delivery, delivery.deliver(&output_path, &caption))
            .await
            .map_err(JobError::Delivery)?
            .map_err(|e| JobError::Delivery(e.to_string()))?;
        self.transition(job, JobStage::Delivered)?;

        Ok((receipt, translated))
    }

    fn transition(&self, job: &mut Job, stage: JobStage) -> Result<(), JobError> {
        job.advance(stage)?;
        debug!("Job {} → {}", job.id(), stage);
        self.status.report(job.id(), stage.status_text());
        Ok(())
    }

    fn artifacts<'a>(&self, job: &'a mut Job) -> Result<&'a mut ArtifactRegistry, JobError> {
        job.artifacts_mut()
            .ok_or_else(|| JobError::Unexpected("job has no workspace".to_string()))
    }
}

/// Await `future` for at most `limit`
async fn bounded<F: Future>(limit: Duration, future: F) -> Result<F::Output, String> {
    tokio::time::timeout(limit, future)
        .await
        .map_err(|_| format!("Timed out after {} seconds", limit.as_secs()))
}

fn new_job_id() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    id[..8].to_string()
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "job panicked".to_string()
    }
}
