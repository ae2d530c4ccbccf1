use anyhow::{Result, anyhow};
use futures::stream::{self, StreamExt};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::app_config::Config;
use crate::file_utils::FileManager;
use crate::media::{EncoderSettings, FfmpegToolkit, MediaToolkit};
use crate::pipeline::{
    AdmissionControl, CancelSignal, FileDelivery, JobReport, LocalFileSource, Pipeline,
    PipelineServices, ProgressStatusSink, StatusSink,
};
use crate::providers::google::GoogleTranslate;
use crate::providers::whisper::WhisperApi;
use crate::providers::{SpeechToText, Translator};
use crate::render::{self, FontChain};
use crate::segments;

// @module: Application controller for subtitle burning

/// Per-invocation switches from the command line
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub force_overwrite: bool,
    // @field: Also write the translations as an SRT next to the video
    pub write_srt: bool,
}

/// Counts for a folder run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Main application controller
pub struct Controller {
    // @field: App configuration
    config: Config,
    media: Arc<dyn MediaToolkit>,
    speech: Arc<dyn SpeechToText>,
    translator: Arc<dyn Translator>,
    fonts: Arc<FontChain>,
    // @field: Overrides the terminal spinners, mainly for tests
    status: Option<Arc<dyn StatusSink>>,
    // @field: Concurrent-job cap shared by every run of this controller
    admission: AdmissionControl,
    cancel: CancelSignal,
}

impl Controller {
    // @method: Create a controller talking to the configured services
    pub async fn from_config(config: Config) -> Result<Self> {
        config.validate()?;
        let fonts = render::shared_font_chain(&config.overlay).await;
        let media = Arc::new(FfmpegToolkit::new(EncoderSettings::from(&config.encoder)));
        let speech = Arc::new(WhisperApi::from_config(&config.transcription));
        let translator = Arc::new(GoogleTranslate::from_config(&config.translation));
        info!(
            "Using {} ({}) for transcription, {} fonts loaded",
            config.transcription.provider.display_name(),
            config.transcription.get_model(),
            fonts.len()
        );
        Ok(Self::with_services(config, media, speech, translator, fonts))
    }

    /// Create a controller from explicit services
    pub fn with_services(
        config: Config,
        media: Arc<dyn MediaToolkit>,
        speech: Arc<dyn SpeechToText>,
        translator: Arc<dyn Translator>,
        fonts: Arc<FontChain>,
    ) -> Self {
        let admission = AdmissionControl::new(config.limits.max_concurrent_jobs);
        Self {
            config,
            media,
            speech,
            translator,
            fonts,
            status: None,
            admission,
            cancel: CancelSignal::new(),
        }
    }

    /// Report status through `sink` instead of terminal spinners
    pub fn with_status_sink(mut self, sink: Arc<dyn StatusSink>) -> Self {
        self.status = Some(sink);
        self
    }

    /// Signal that aborts every job running when it fires
    ///
    /// Runs started after a cancellation are not affected by it.
    pub fn cancel_signal(&self) -> CancelSignal {
        self.cancel.clone()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn build_pipeline(&self, multi_progress: &MultiProgress) -> Pipeline {
        let status: Arc<dyn StatusSink> = match &self.status {
            Some(sink) => Arc::clone(sink),
            None => Arc::new(ProgressStatusSink::new(multi_progress.clone())),
        };
        Pipeline::new(
            &self.config,
            PipelineServices {
                media: Arc::clone(&self.media),
                speech: Arc::clone(&self.speech),
                translator: Arc::clone(&self.translator),
                status,
                fonts: Arc::clone(&self.fonts),
            },
        )
        .with_admission(self.admission.clone())
    }

    /// Subtitle one video; `None` when skipped because the output exists
    pub async fn run(
        &self,
        input_file: PathBuf,
        output_dir: PathBuf,
        options: RunOptions,
    ) -> Result<Option<JobReport>> {
        if !input_file.is_file() {
            return Err(anyhow!("Input file does not exist: {:?}", input_file));
        }
        FileManager::ensure_dir(&output_dir)?;

        let multi_progress = MultiProgress::new();
        let pipeline = self.build_pipeline(&multi_progress);
        let cancel = self.cancel.scope();
        Ok(self.run_one(&pipeline, &cancel, &input_file, &output_dir, options).await)
    }

    async fn run_one(
        &self,
        pipeline: &Pipeline,
        cancel: &CancelSignal,
        input_file: &Path,
        output_dir: &Path,
        options: RunOptions,
    ) -> Option<JobReport> {
        let target = &self.config.target_language;
        let destination = FileManager::generate_output_path(input_file, output_dir, target, "mp4");
        if destination.exists() && !options.force_overwrite {
            warn!(
                "Skipping {}, output already exists (use -f to force overwrite)",
                input_file.display()
            );
            return None;
        }

        let source = LocalFileSource::new(input_file);
        let delivery = FileDelivery::new(&destination, options.force_overwrite);
        let report = pipeline.run(&source, &delivery, cancel).await;

        match &report.outcome {
            Ok(receipt) => {
                info!("Success: {}", receipt.location);
                if options.write_srt {
                    let srt = FileManager::generate_output_path(input_file, output_dir, target, "srt");
                    match segments::write_srt(&report.segments, &srt) {
                        Ok(()) => info!("Subtitles written to {}", srt.display()),
                        Err(e) => warn!("Failed to write {}: {}", srt.display(), e),
                    }
                }
            }
            Err(e) => error!("{}: {}", input_file.display(), e.user_message()),
        }
        Some(report)
    }

    /// Subtitle every video below `input_dir`, next to its source
    pub async fn run_folder(&self, input_dir: PathBuf, options: RunOptions) -> Result<FolderSummary> {
        let start_time = std::time::Instant::now();

        if !input_dir.is_dir() {
            return Err(anyhow!("Input directory does not exist: {:?}", input_dir));
        }

        let videos = FileManager::find_videos(&input_dir)?;
        if videos.is_empty() {
            return Err(anyhow!("No video files found in directory: {:?}", input_dir));
        }

        let multi_progress = MultiProgress::new();
        let folder_pb = multi_progress.add(ProgressBar::new(videos.len() as u64));
        let template_result = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} videos ({percent}%) {msg}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        folder_pb.set_style(template_result.progress_chars("█▓▒░"));
        folder_pb.set_message("Processing videos");

        let pipeline = self.build_pipeline(&multi_progress);
        // One scope for the folder, so a cancellation also stops queued videos
        let cancel = self.cancel.scope();
        let concurrency = self.config.limits.max_concurrent_jobs.max(1);
        let input_root = input_dir.as_path();

        let outcomes: Vec<Option<bool>> = stream::iter(videos.iter())
            .map(|video| {
                let pipeline = &pipeline;
                let cancel = &cancel;
                let folder_pb = &folder_pb;
                async move {
                    let output_dir = video.parent().unwrap_or(input_root).to_path_buf();
                    let report = self.run_one(pipeline, cancel, video, &output_dir, options).await;
                    folder_pb.inc(1);
                    report.map(|r| r.is_success())
                }
            })
            .buffer_unordered(concurrency)
            .collect()
            .await;

        let summary = FolderSummary {
            succeeded: outcomes.iter().filter(|o| **o == Some(true)).count(),
            failed: outcomes.iter().filter(|o| **o == Some(false)).count(),
            skipped: outcomes.iter().filter(|o| o.is_none()).count(),
        };
        folder_pb.finish_with_message("Folder processing complete");

        let summary_message = format!(
            "Folder processing completed: {} subtitled, {} skipped, {} failed in {:.1}s",
            summary.succeeded,
            summary.skipped,
            summary.failed,
            start_time.elapsed().as_secs_f64()
        );
        info!("{}", summary_message);

        let log_file = input_dir.join("subburn.log");
        if let Err(e) = FileManager::append_to_log_file(&log_file, &summary_message) {
            warn!("Failed to write folder log to {}: {}", log_file.display(), e);
        }

        Ok(summary)
    }
}
