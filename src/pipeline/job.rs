use std::fmt;

use crate::artifacts::{ArtifactRegistry, ReleaseReport};
use crate::errors::JobError;
use crate::pipeline::collaborators::DeliveryReceipt;
use crate::segments::TranslatedSegment;

/// Stages a job moves through, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStage {
    Received,
    Admitted,
    AudioExtracted,
    Transcribed,
    Translated,
    Overlaid,
    Encoded,
    Delivered,
    Failed,
    Cleaned,
}

impl JobStage {
    /// Next stage on the success path
    pub fn next(&self) -> Option<JobStage> {
        match self {
            Self::Received => Some(Self::Admitted),
            Self::Admitted => Some(Self::AudioExtracted),
            Self::AudioExtracted => Some(Self::Transcribed),
            Self::Transcribed => Some(Self::Translated),
            Self::Translated => Some(Self::Overlaid),
            Self::Overlaid => Some(Self::Encoded),
            Self::Encoded => Some(Self::Delivered),
            Self::Delivered | Self::Failed => Some(Self::Cleaned),
            Self::Cleaned => None,
        }
    }

    pub fn can_transition_to(&self, target: JobStage) -> bool {
        match target {
            Self::Failed => !matches!(self, Self::Delivered | Self::Failed | Self::Cleaned),
            _ => self.next() == Some(target),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cleaned)
    }

    /// One-line status shown to whoever submitted the video
    pub fn status_text(&self) -> &'static str {
        match self {
            Self::Received => "📥 Video received",
            Self::Admitted => "✅ Video accepted, reading audio...",
            Self::AudioExtracted => "🎙️ Transcribing speech...",
            Self::Transcribed => "🌐 Translating...",
            Self::Translated => "🖋️ Rendering subtitles...",
            Self::Overlaid => "🎬 Encoding video...",
            Self::Encoded => "📤 Sending video...",
            Self::Delivered => "✨ Done!",
            Self::Failed => "❌ Processing failed",
            Self::Cleaned => "🧹 Cleaned up",
        }
    }
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// One video moving through the pipeline
///
/// Owns the artifact registry, so dropping a job releases its files. The
/// registry is attached on admission; a rejected job never creates one.
#[derive(Debug)]
pub struct Job {
    id: String,
    stage: JobStage,
    history: Vec<JobStage>,
    artifacts: Option<ArtifactRegistry>,
}

impl Job {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            stage: JobStage::Received,
            history: vec![JobStage::Received],
            artifacts: None,
        }
    }

    pub fn attach_artifacts(&mut self, artifacts: ArtifactRegistry) -> &mut ArtifactRegistry {
        self.artifacts.insert(artifacts)
    }

    pub fn artifacts_mut(&mut self) -> Option<&mut ArtifactRegistry> {
        self.artifacts.as_mut()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn stage(&self) -> JobStage {
        self.stage
    }

    pub fn history(&self) -> &[JobStage] {
        &self.history
    }

    /// Move to `target`, rejecting transitions the state machine does not allow
    pub fn advance(&mut self, target: JobStage) -> Result<(), JobError> {
        if !self.stage.can_transition_to(target) {
            return Err(JobError::Unexpected(format!(
                "invalid stage transition {} -> {}",
                self.stage, target
            )));
        }
        self.stage = target;
        self.history.push(target);
        Ok(())
    }

    /// Enter `Failed` unless the job already finished its work
    pub fn fail(&mut self) {
        if self.stage.can_transition_to(JobStage::Failed) {
            self.stage = JobStage::Failed;
            self.history.push(JobStage::Failed);
        }
    }

    /// Release every artifact and enter `Cleaned`
    pub fn clean(&mut self) -> ReleaseReport {
        let report = self
            .artifacts
            .as_mut()
            .map(ArtifactRegistry::release_all)
            .unwrap_or_default();
        if self.stage != JobStage::Delivered {
            self.fail();
        }
        self.stage = JobStage::Cleaned;
        self.history.push(JobStage::Cleaned);
        report
    }
}

/// Everything the caller learns about a finished job
#[derive(Debug)]
pub struct JobReport {
    pub job_id: String,
    pub history: Vec<JobStage>,
    pub outcome: Result<DeliveryReceipt, JobError>,
    // @field: Translations that were overlaid, empty when the job failed earlier
    pub segments: Vec<TranslatedSegment>,
    pub released: ReleaseReport,
}

impl JobReport {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn final_stage(&self) -> Option<JobStage> {
        self.history.last().copied()
    }

    /// Whether the job passed through `stage`
    pub fn reached(&self, stage: JobStage) -> bool {
        self.history.contains(&stage)
    }
}
