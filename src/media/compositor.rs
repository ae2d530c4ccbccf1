/*!
 * Frame-by-frame subtitle burn-in.
 *
 * One ffmpeg process decodes the source into constant-rate raw RGB frames,
 * each frame is blended with the overlays active at its timestamp, and a
 * second ffmpeg process encodes the result while muxing the source audio
 * back in. Output goes to a `.partial.mp4` sibling that is renamed into
 * place only after both processes exit cleanly.
 */

use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;

use crate::app_config::EncoderConfig;
use crate::errors::MediaError;
use crate::media::{FALLBACK_FPS, MediaInfo, drain_stderr, filter_ffmpeg_stderr, spawn_error};
use crate::overlay::{self, OverlayTrack};

/// Bytes per decoded pixel (rgb24)
const CHANNELS: usize = 3;

/// Re-encode parameters
#[derive(Debug, Clone, PartialEq)]
pub struct EncoderSettings {
    pub video_codec: String,
    pub audio_codec: String,
    pub preset: String,
    pub crf: u8,
    pub threads: u32,
    // @field: Budget for the whole decode/blend/encode pass
    pub timeout: Duration,
}

impl From<&EncoderConfig> for EncoderSettings {
    fn from(config: &EncoderConfig) -> Self {
        Self {
            video_codec: config.video_codec.clone(),
            audio_codec: config.audio_codec.clone(),
            preset: config.preset.clone(),
            crf: config.crf,
            threads: config.threads.max(1),
            timeout: Duration::from_secs(config.timeout_secs.max(1)),
        }
    }
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self::from(&EncoderConfig::default())
    }
}

#[derive(Debug, Clone)]
pub struct Compositor {
    settings: EncoderSettings,
}

impl Compositor {
    pub fn new(settings: EncoderSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &EncoderSettings {
        &self.settings
    }

    /// Where output is written before it is complete
    pub fn partial_path(output: &Path) -> PathBuf {
        let stem = output
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());
        output.with_file_name(format!("{}.partial.mp4", stem))
    }

    fn fps(info: &MediaInfo) -> f64 {
        if info.fps.is_finite() && info.fps > 0.0 {
            info.fps
        } else {
            FALLBACK_FPS
        }
    }

    /// Arguments for the decoder process
    pub fn decoder_args(&self, source: &Path, info: &MediaInfo) -> Vec<String> {
        vec![
            "-v".into(),
            "error".into(),
            "-i".into(),
            source.to_string_lossy().into_owned(),
            "-an".into(),
            "-vf".into(),
            format!("fps={}", Self::fps(info)),
            "-f".into(),
            "rawvideo".into(),
            "-pix_fmt".into(),
            "rgb24".into(),
            "pipe:1".into(),
        ]
    }

    /// Arguments for the encoder process
    pub fn encoder_args(&self, source: &Path, info: &MediaInfo, dest: &Path) -> Vec<String> {
        let s = &self.settings;
        vec![
            "-y".into(),
            "-v".into(),
            "error".into(),
            "-f".into(),
            "rawvideo".into(),
            "-pix_fmt".into(),
            "rgb24".into(),
            "-s".into(),
            format!("{}x{}", info.width, info.height),
            "-r".into(),
            format!("{}", Self::fps(info)),
            "-i".into(),
            "pipe:0".into(),
            "-i".into(),
            source.to_string_lossy().into_owned(),
            "-map".into(),
            "0:v:0".into(),
            "-map".into(),
            "1:a:0?".into(),
            // yuv420p needs even dimensions
            "-vf".into(),
            "pad=ceil(iw/2)*2:ceil(ih/2)*2".into(),
            "-c:v".into(),
            s.video_codec.clone(),
            "-preset".into(),
            s.preset.clone(),
            "-crf".into(),
            s.crf.to_string(),
            "-threads".into(),
            s.threads.to_string(),
            "-pix_fmt".into(),
            "yuv420p".into(),
            "-c:a".into(),
            s.audio_codec.clone(),
            "-shortest".into(),
            "-movflags".into(),
            "+faststart".into(),
            "-f".into(),
            "mp4".into(),
            dest.to_string_lossy().into_owned(),
        ]
    }

    /// Burn `tracks` into `source`, writing `output` atomically
    pub async fn compose(
        &self,
        source: &Path,
        info: &MediaInfo,
        tracks: &[OverlayTrack],
        output: &Path,
    ) -> Result<(), MediaError> {
        let partial = Self::partial_path(output);
        let started = Instant::now();

        let result = match tokio::time::timeout(
            self.settings.timeout,
            self.render(source, info, tracks, &partial),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(MediaError::Timeout {
                tool: "ffmpeg",
                secs: self.settings.timeout.as_secs(),
            }),
        };

        match result {
            Ok(frames) => {
                tokio::fs::rename(&partial, output).await?;
                info!(
                    "Encoded {} frames to {} in {:.1}s",
                    frames,
                    output.display(),
                    started.elapsed().as_secs_f64()
                );
                Ok(())
            }
            Err(e) => {
                if let Err(remove_err) = tokio::fs::remove_file(&partial).await {
                    if remove_err.kind() != std::io::ErrorKind::NotFound {
                        warn!("Failed to remove {}: {}", partial.display(), remove_err);
                    }
                }
                Err(e)
            }
        }
    }

    async fn render(
        &self,
        source: &Path,
        info: &MediaInfo,
        tracks: &[OverlayTrack],
        dest: &Path,
    ) -> Result<u64, MediaError> {
        if info.width == 0 || info.height == 0 {
            return Err(MediaError::InvalidMedia("frame size is zero".to_string()));
        }

        let mut decoder = Command::new("ffmpeg")
            .args(self.decoder_args(source, info))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| spawn_error("ffmpeg", e))?;

        let mut encoder = Command::new("ffmpeg")
            .args(self.encoder_args(source, info, dest))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| spawn_error("ffmpeg", e))?;

        let decoder_stderr = drain_stderr(decoder.stderr.take());
        let encoder_stderr = drain_stderr(encoder.stderr.take());

        let mut frames_in = decoder
            .stdout
            .take()
            .ok_or_else(|| MediaError::InvalidMedia("decoder stdout unavailable".to_string()))?;
        let mut frames_out = encoder
            .stdin
            .take()
            .ok_or_else(|| MediaError::InvalidMedia("encoder stdin unavailable".to_string()))?;

        let (width, height) = (info.width, info.height);
        let fps = Self::fps(info);
        let mut frame = vec![0u8; width as usize * height as usize * CHANNELS];
        let mut index: u64 = 0;
        let mut encoder_closed = false;

        loop {
            match frames_in.read_exact(&mut frame).await {
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e.into()),
            }

            let t = index as f64 / fps;
            composite_frame(&mut frame, width, height, t, tracks);

            if frames_out.write_all(&frame).await.is_err() {
                encoder_closed = true;
                break;
            }
            index += 1;
        }
        drop(frames_out);
        // Unblocks a decoder still writing when the encoder bailed out early
        drop(frames_in);

        let decoder_status = decoder.wait().await?;
        let encoder_status = encoder.wait().await?;
        let decoder_log = decoder_stderr.await.unwrap_or_default();
        let encoder_log = encoder_stderr.await.unwrap_or_default();

        if !encoder_status.success() || encoder_closed {
            return Err(MediaError::Failed {
                tool: "ffmpeg",
                stderr: filter_ffmpeg_stderr(&encoder_log),
            });
        }
        if !decoder_status.success() {
            return Err(MediaError::Failed {
                tool: "ffmpeg",
                stderr: filter_ffmpeg_stderr(&decoder_log),
            });
        }
        if index == 0 {
            return Err(MediaError::InvalidMedia("no frames decoded".to_string()));
        }

        debug!("Composited {} frames at {} fps", index, fps);
        Ok(index)
    }
}

/// Blend every overlay active at `t` into an rgb24 frame
///
/// Overlays are drawn in ascending start time, so the later start ends up on
/// top; pixels outside the frame are skipped.
pub fn composite_frame(frame: &mut [u8], width: u32, height: u32, t: f64, tracks: &[OverlayTrack]) {
    let stride = width as usize * CHANNELS;
    debug_assert!(frame.len() >= stride * height as usize);

    for track in overlay::active_tracks(tracks, t) {
        let Some(bounds) = track.content_bounds() else {
            continue;
        };
        let region = track.region;

        for by in bounds.y0..bounds.y1 {
            let fy = region.y + by;
            if fy >= height {
                break;
            }
            for bx in bounds.x0..bounds.x1 {
                let fx = region.x + bx;
                if fx >= width {
                    break;
                }
                let src = track.bitmap.get_pixel(bx, by).0;
                let idx = fy as usize * stride + fx as usize * CHANNELS;
                blend_pixel(frame, idx, src);
            }
        }
    }
}

fn blend_pixel(frame: &mut [u8], idx: usize, src: [u8; 4]) {
    let alpha = u16::from(src[3]);
    if alpha == 0 {
        return;
    }
    let inv_alpha = 255 - alpha;
    for channel in 0..CHANNELS {
        let dst = u16::from(frame[idx + channel]);
        let src_c = u16::from(src[channel]);
        frame[idx + channel] = ((src_c * alpha + dst * inv_alpha + 127) / 255) as u8;
    }
}
