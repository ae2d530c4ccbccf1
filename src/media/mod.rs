/*!
 * External media toolchain.
 *
 * Everything that touches ffmpeg/ffprobe goes through the `MediaToolkit`
 * trait so the pipeline can be exercised without the binaries installed:
 * - `probe`: duration, frame size, frame rate and audio presence
 * - `extract_audio`: a small mono track for the speech-to-text service
 * - `compose`: burn overlay tracks into the video (see `compositor`)
 */

pub mod compositor;

use async_trait::async_trait;
use log::{debug, error};
use serde_json::Value;
use std::fmt::Debug;
use std::path::Path;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::{ChildStderr, Command};
use tokio::task::JoinHandle;

use crate::errors::MediaError;
use crate::overlay::{FrameSize, OverlayTrack};

pub use compositor::{Compositor, EncoderSettings, composite_frame};

/// Frame rate assumed when the container does not report one
pub const FALLBACK_FPS: f64 = 25.0;

/// Facts about a source video needed by the pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct MediaInfo {
    pub duration_secs: f64,
    // @field: Display width after rotation metadata is applied
    pub width: u32,
    // @field: Display height after rotation metadata is applied
    pub height: u32,
    pub fps: f64,
    pub has_audio: bool,
}

impl MediaInfo {
    pub fn frame_size(&self) -> FrameSize {
        FrameSize::new(self.width, self.height)
    }
}

/// Media operations the pipeline depends on
#[async_trait]
pub trait MediaToolkit: Send + Sync + Debug {
    /// Read duration, frame size and stream layout
    async fn probe(&self, video: &Path) -> Result<MediaInfo, MediaError>;

    /// Write the audio track of `video` to `dest`
    async fn extract_audio(&self, video: &Path, dest: &Path) -> Result<(), MediaError>;

    /// Render `tracks` over `video` into `output`
    ///
    /// Must leave nothing at `output` unless it succeeds.
    async fn compose(
        &self,
        video: &Path,
        info: &MediaInfo,
        tracks: &[OverlayTrack],
        output: &Path,
    ) -> Result<(), MediaError>;
}

/// `MediaToolkit` backed by the ffmpeg and ffprobe binaries
#[derive(Debug, Clone)]
pub struct FfmpegToolkit {
    compositor: Compositor,
    // @field: Budget for probe and audio extraction
    tool_timeout: Duration,
}

impl FfmpegToolkit {
    pub fn new(settings: EncoderSettings) -> Self {
        let tool_timeout = settings.timeout;
        Self {
            compositor: Compositor::new(settings),
            tool_timeout,
        }
    }

    pub fn compositor(&self) -> &Compositor {
        &self.compositor
    }
}

#[async_trait]
impl MediaToolkit for FfmpegToolkit {
    async fn probe(&self, video: &Path) -> Result<MediaInfo, MediaError> {
        let mut command = Command::new("ffprobe");
        command
            .args(["-v", "error", "-print_format", "json", "-show_format", "-show_streams"])
            .arg(video);

        let output = run_tool(command, "ffprobe", self.tool_timeout).await?;
        let json: Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| MediaError::InvalidMedia(format!("unreadable ffprobe output: {}", e)))?;
        parse_probe(&json)
    }

    async fn extract_audio(&self, video: &Path, dest: &Path) -> Result<(), MediaError> {
        let mut command = Command::new("ffmpeg");
        command
            .args(["-y", "-v", "error", "-i"])
            .arg(video)
            .args(["-vn", "-ac", "1", "-ar", "16000", "-c:a", "libmp3lame", "-q:a", "4"])
            .arg(dest);

        run_tool(command, "ffmpeg", self.tool_timeout).await?;

        let size = tokio::fs::metadata(dest).await?.len();
        if size == 0 {
            return Err(MediaError::InvalidMedia("extracted audio is empty".to_string()));
        }
        debug!("Extracted {} bytes of audio to {}", size, dest.display());
        Ok(())
    }

    async fn compose(
        &self,
        video: &Path,
        info: &MediaInfo,
        tracks: &[OverlayTrack],
        output: &Path,
    ) -> Result<(), MediaError> {
        self.compositor.compose(video, info, tracks, output).await
    }
}

/// Run a tool to completion within `limit`, failing on non-zero exit
pub(crate) async fn run_tool(
    mut command: Command,
    tool: &'static str,
    limit: Duration,
) -> Result<Output, MediaError> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = command.spawn().map_err(|e| spawn_error(tool, e))?;

    let output = tokio::select! {
        result = child.wait_with_output() => result?,
        _ = tokio::time::sleep(limit) => {
            return Err(MediaError::Timeout { tool, secs: limit.as_secs() });
        }
    };

    if !output.status.success() {
        let filtered = filter_ffmpeg_stderr(&String::from_utf8_lossy(&output.stderr));
        error!("{} failed: {}", tool, filtered);
        return Err(MediaError::Failed {
            tool,
            stderr: filtered,
        });
    }
    Ok(output)
}

pub(crate) fn spawn_error(tool: &'static str, e: std::io::Error) -> MediaError {
    if e.kind() == std::io::ErrorKind::NotFound {
        MediaError::ToolMissing(tool)
    } else {
        MediaError::Spawn {
            tool,
            message: e.to_string(),
        }
    }
}

/// Read a child's stderr to the end on a separate task so the pipe never fills
pub(crate) fn drain_stderr(stderr: Option<ChildStderr>) -> JoinHandle<String> {
    tokio::spawn(async move {
        let Some(mut stderr) = stderr else {
            return String::new();
        };
        let mut buf = Vec::new();
        match stderr.read_to_end(&mut buf).await {
            Ok(_) => String::from_utf8_lossy(&buf).into_owned(),
            Err(e) => format!("<failed to read stderr: {}>", e),
        }
    })
}

/// Extract `MediaInfo` from `ffprobe -show_format -show_streams` JSON
pub fn parse_probe(json: &Value) -> Result<MediaInfo, MediaError> {
    let streams = json
        .get("streams")
        .and_then(|s| s.as_array())
        .ok_or_else(|| MediaError::InvalidMedia("no streams reported".to_string()))?;

    let video = streams
        .iter()
        .find(|s| s.get("codec_type").and_then(|t| t.as_str()) == Some("video"))
        .ok_or_else(|| MediaError::InvalidMedia("no video stream".to_string()))?;

    let has_audio = streams
        .iter()
        .any(|s| s.get("codec_type").and_then(|t| t.as_str()) == Some("audio"));

    let width = video.get("width").and_then(|v| v.as_u64()).unwrap_or(0) as u32;
    let height = video.get("height").and_then(|v| v.as_u64()).unwrap_or(0) as u32;
    if width == 0 || height == 0 {
        return Err(MediaError::InvalidMedia("video stream has no frame size".to_string()));
    }

    let fps = ["avg_frame_rate", "r_frame_rate"]
        .iter()
        .filter_map(|key| video.get(*key).and_then(|v| v.as_str()))
        .find_map(parse_frame_rate)
        .unwrap_or(FALLBACK_FPS);

    let duration_secs = json
        .get("format")
        .and_then(|f| f.get("duration"))
        .or_else(|| video.get("duration"))
        .and_then(|d| d.as_str())
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0)
        .ok_or_else(|| MediaError::InvalidMedia("unknown duration".to_string()))?;

    // Decoded frames come out rotated, so report the display orientation
    let (width, height) = if rotation_degrees(video).rem_euclid(180) == 90 {
        (height, width)
    } else {
        (width, height)
    };

    Ok(MediaInfo {
        duration_secs,
        width,
        height,
        fps,
        has_audio,
    })
}

/// Parse "30000/1001" or "25" into frames per second
pub fn parse_frame_rate(rate: &str) -> Option<f64> {
    let fps = match rate.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => rate.trim().parse().ok()?,
    };
    (fps.is_finite() && fps > 0.0).then_some(fps)
}

fn rotation_degrees(stream: &Value) -> i64 {
    let from_tags = stream
        .get("tags")
        .and_then(|t| t.get("rotate"))
        .and_then(|r| r.as_str())
        .and_then(|r| r.parse::<i64>().ok());

    let from_side_data = || {
        stream
            .get("side_data_list")
            .and_then(|l| l.as_array())
            .and_then(|list| list.iter().find_map(|d| d.get("rotation").and_then(|r| r.as_i64())))
    };

    from_tags.or_else(from_side_data).unwrap_or(0)
}

/// Filter ffmpeg stderr to only show meaningful error lines, stripping the
/// version banner, build configuration, and stream metadata noise.
pub fn filter_ffmpeg_stderr(stderr: &str) -> String {
    let noise_prefixes = [
        "ffmpeg version",
        "ffprobe version",
        "built with",
        "configuration:",
        "lib",
        "Input #",
        "Metadata:",
        "Duration:",
        "Stream #",
        "Output #",
        "Stream mapping:",
        "Press [q]",
        "frame=",
    ];

    let meaningful: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !noise_prefixes.iter().any(|p| line.starts_with(p)))
        .collect();

    if meaningful.is_empty() {
        "unknown ffmpeg error (stderr was empty after filtering)".to_string()
    } else {
        meaningful.join("\n")
    }
}

/// Whether the installed ffmpeg offers the named encoder
pub async fn encoder_available(name: &str) -> bool {
    let mut command = Command::new("ffmpeg");
    command.args(["-hide_banner", "-encoders"]);
    match run_tool(command, "ffmpeg", Duration::from_secs(10)).await {
        Ok(output) => String::from_utf8_lossy(&output.stdout)
            .split_whitespace()
            .any(|word| word == name),
        Err(_) => false,
    }
}
