/*!
 * Common test utilities for the subburn test suite
 */

#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use subburn::app_config::Config;
use subburn::errors::{MediaError, ProviderError};
use subburn::media::{Compositor, MediaInfo, MediaToolkit};
use subburn::overlay::OverlayTrack;
use subburn::pipeline::{
    Delivery, DeliveryReceipt, MediaSource, Pipeline, PipelineServices, StatusSink,
};
use subburn::providers::mock::{MockSpeechToText, MockTranslator};
use subburn::render::FontChain;
use subburn::segments::Segment;

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a file of exactly `size` bytes
pub fn create_sized_file(dir: &Path, filename: &str, size: usize) -> Result<PathBuf> {
    let path = dir.join(filename);
    fs::write(&path, vec![0u8; size])?;
    Ok(path)
}

/// Config that passes validation and keeps job workspaces under `work_dir`
pub fn test_config(work_dir: &Path) -> Config {
    let mut config = Config::default();
    config.transcription.api_key = "test-key".to_string();
    config.work_dir = Some(work_dir.to_path_buf());
    config
}

/// Entries left in a directory, used to prove workspaces were removed
pub fn leftover_entries(dir: &Path) -> Vec<PathBuf> {
    fs::read_dir(dir)
        .map(|entries| entries.filter_map(|e| e.ok()).map(|e| e.path()).collect())
        .unwrap_or_default()
}

/// The two-segment clip used across the pipeline tests
pub fn hello_world_segments() -> Vec<Segment> {
    vec![
        Segment::new(0.0, 2.0, "Hello").unwrap(),
        Segment::new(2.0, 4.0, "world").unwrap(),
    ]
}

pub fn hebrew_translator() -> MockTranslator {
    MockTranslator::working()
        .with_translation("Hello", "שלום")
        .with_translation("world", "עולם")
}

/// How the mock toolkit finishes `compose`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeBehavior {
    Succeed,
    // Writes an output of the given size, for slow deliveries
    SucceedWithBytes(usize),
    // Leaves a partial file behind and reports an encoder crash
    CrashMidEncode,
    Panic,
}

/// Media toolkit that never spawns ffmpeg
#[derive(Debug)]
pub struct MockMediaToolkit {
    info: MediaInfo,
    compose_behavior: ComposeBehavior,
    // @field: Intervals of every track handed to compose
    composed: Mutex<Vec<(f64, f64)>>,
    // @field: Workspace files seen while composing
    composed_inputs: Mutex<Vec<PathBuf>>,
}

impl MockMediaToolkit {
    pub fn new(info: MediaInfo) -> Self {
        Self {
            info,
            compose_behavior: ComposeBehavior::Succeed,
            composed: Mutex::new(Vec::new()),
            composed_inputs: Mutex::new(Vec::new()),
        }
    }

    /// A 1280x720 clip of `duration_secs` with an audio track
    pub fn clip(duration_secs: f64) -> Self {
        Self::new(MediaInfo {
            duration_secs,
            width: 1280,
            height: 720,
            fps: 25.0,
            has_audio: true,
        })
    }

    pub fn without_audio(mut self) -> Self {
        self.info.has_audio = false;
        self
    }

    pub fn with_compose(mut self, behavior: ComposeBehavior) -> Self {
        self.compose_behavior = behavior;
        self
    }

    pub fn composed_intervals(&self) -> Vec<(f64, f64)> {
        self.composed.lock().clone()
    }

    pub fn composed_inputs(&self) -> Vec<PathBuf> {
        self.composed_inputs.lock().clone()
    }
}

#[async_trait]
impl MediaToolkit for MockMediaToolkit {
    async fn probe(&self, video: &Path) -> Result<MediaInfo, MediaError> {
        if !video.exists() {
            return Err(MediaError::InvalidMedia(format!("missing {}", video.display())));
        }
        Ok(self.info.clone())
    }

    async fn extract_audio(&self, video: &Path, dest: &Path) -> Result<(), MediaError> {
        if !video.exists() {
            return Err(MediaError::InvalidMedia(format!("missing {}", video.display())));
        }
        fs::write(dest, b"ID3 fake audio").map_err(MediaError::from)
    }

    async fn compose(
        &self,
        video: &Path,
        _info: &MediaInfo,
        tracks: &[OverlayTrack],
        output: &Path,
    ) -> Result<(), MediaError> {
        self.composed
            .lock()
            .extend(tracks.iter().map(|track| track.interval()));
        self.composed_inputs.lock().push(video.to_path_buf());

        match self.compose_behavior {
            ComposeBehavior::Succeed => {
                fs::write(output, b"fake mp4").map_err(MediaError::from)
            }
            ComposeBehavior::SucceedWithBytes(size) => {
                fs::write(output, vec![0u8; size]).map_err(MediaError::from)
            }
            ComposeBehavior::CrashMidEncode => {
                let partial = Compositor::partial_path(output);
                fs::write(&partial, b"half an mp4").map_err(MediaError::from)?;
                Err(MediaError::Failed {
                    tool: "ffmpeg",
                    stderr: "Conversion failed!".to_string(),
                })
            }
            ComposeBehavior::Panic => panic!("encoder exploded"),
        }
    }
}

/// Source that claims a size and writes a placeholder on fetch
#[derive(Debug, Clone)]
pub struct MockMediaSource {
    size_bytes: u64,
    fail_fetch: bool,
}

impl MockMediaSource {
    pub fn with_size(size_bytes: u64) -> Self {
        Self {
            size_bytes,
            fail_fetch: false,
        }
    }

    pub fn unreachable() -> Self {
        Self {
            size_bytes: 1024,
            fail_fetch: true,
        }
    }
}

#[async_trait]
impl MediaSource for MockMediaSource {
    fn file_size_bytes(&self) -> Result<u64, ProviderError> {
        Ok(self.size_bytes)
    }

    fn display_name(&self) -> String {
        "clip.mp4".to_string()
    }

    async fn fetch(&self, dest: &Path) -> Result<(), ProviderError> {
        if self.fail_fetch {
            return Err(ProviderError::ConnectionError("source unreachable".to_string()));
        }
        fs::write(dest, b"fake source video")
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))
    }
}

/// Delivery that records captions instead of moving files
#[derive(Debug, Default)]
pub struct MockDelivery {
    fail: bool,
    captions: Mutex<Vec<String>>,
    // @field: Whether the rendered output existed when delivery ran
    saw_output: Mutex<Vec<bool>>,
}

impl MockDelivery {
    pub fn working() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn captions(&self) -> Vec<String> {
        self.captions.lock().clone()
    }

    pub fn saw_output(&self) -> Vec<bool> {
        self.saw_output.lock().clone()
    }
}

#[async_trait]
impl Delivery for MockDelivery {
    async fn deliver(&self, output: &Path, caption: &str) -> Result<DeliveryReceipt, ProviderError> {
        self.captions.lock().push(caption.to_string());
        self.saw_output.lock().push(output.exists());
        if self.fail {
            return Err(ProviderError::ConnectionError("upload rejected".to_string()));
        }
        Ok(DeliveryReceipt {
            location: format!("mock://{}", caption),
        })
    }
}

/// Status sink that keeps every line it receives
#[derive(Debug, Default)]
pub struct RecordingStatusSink {
    lines: Mutex<Vec<String>>,
    finished: Mutex<Vec<String>>,
}

impl RecordingStatusSink {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    pub fn finished(&self) -> Vec<String> {
        self.finished.lock().clone()
    }
}

impl StatusSink for RecordingStatusSink {
    fn report(&self, _job_id: &str, status: &str) {
        self.lines.lock().push(status.to_string());
    }

    fn finish(&self, _job_id: &str, final_status: &str) {
        self.finished.lock().push(final_status.to_string());
    }
}

/// Pipeline wired to mocks, using the built-in bitmap font
pub fn pipeline_with(
    config: &Config,
    media: Arc<MockMediaToolkit>,
    speech: MockSpeechToText,
    translator: MockTranslator,
    status: Arc<RecordingStatusSink>,
) -> Pipeline {
    Pipeline::new(
        config,
        PipelineServices {
            media,
            speech: Arc::new(speech),
            translator: Arc::new(translator),
            status,
            fonts: Arc::new(FontChain::default()),
        },
    )
}
