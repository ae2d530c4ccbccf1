/*!
 * Tests that run the real ffmpeg toolchain
 *
 * Every test returns early when ffmpeg or the encoders it needs are missing,
 * so the suite stays green on machines without a media toolchain.
 */

use std::path::{Path, PathBuf};
use std::sync::Arc;

use subburn::errors::JobErrorKind;
use subburn::media::{self, Compositor, EncoderSettings, FfmpegToolkit, MediaToolkit};
use subburn::overlay::{BandLayout, OverlayTimeline};
use subburn::pipeline::{CancelSignal, FileDelivery, JobStage, LocalFileSource, Pipeline, PipelineServices};
use subburn::providers::mock::MockSpeechToText;
use subburn::render::{BaseDirection, FontChain, RasterStyle, TextRasterizer};
use subburn::segments::TranslatedSegment;

use crate::common::{self, RecordingStatusSink};

async fn toolchain_available() -> bool {
    for encoder in ["libx264", "libmp3lame", "aac"] {
        if !media::encoder_available(encoder).await {
            eprintln!("skipping: ffmpeg encoder {} is not available", encoder);
            return false;
        }
    }
    true
}

/// Two seconds of test pattern with a sine tone
async fn make_test_video(dir: &Path, width: u32, height: u32) -> PathBuf {
    let path = dir.join("input.mp4");
    let status = tokio::process::Command::new("ffmpeg")
        .args(["-y", "-v", "error", "-f", "lavfi", "-i"])
        .arg(format!("testsrc=size={}x{}:rate=10", width, height))
        .args(["-f", "lavfi", "-i", "sine=frequency=440:sample_rate=44100"])
        .args(["-t", "2", "-c:v", "libx264", "-pix_fmt", "yuv420p", "-c:a", "aac", "-shortest"])
        .arg(&path)
        .status()
        .await
        .unwrap();
    assert!(status.success(), "could not generate test video");
    path
}

#[tokio::test]
async fn test_probe_withGeneratedVideo_shouldReadDimensionsAndAudio() {
    if !toolchain_available().await {
        return;
    }
    let temp_dir = common::create_temp_dir().unwrap();
    let video = make_test_video(temp_dir.path(), 320, 240).await;
    let toolkit = FfmpegToolkit::new(EncoderSettings::default());

    let info = toolkit.probe(&video).await.unwrap();

    assert_eq!((info.width, info.height), (320, 240));
    assert!(info.has_audio);
    assert!((info.duration_secs - 2.0).abs() < 0.3, "duration {}", info.duration_secs);
    assert!((info.fps - 10.0).abs() < 0.01);
}

#[tokio::test]
async fn test_extract_audio_withGeneratedVideo_shouldWriteMp3() {
    if !toolchain_available().await {
        return;
    }
    let temp_dir = common::create_temp_dir().unwrap();
    let video = make_test_video(temp_dir.path(), 320, 240).await;
    let audio = temp_dir.path().join("audio.mp3");
    let toolkit = FfmpegToolkit::new(EncoderSettings::default());

    toolkit.extract_audio(&video, &audio).await.unwrap();

    assert!(std::fs::metadata(&audio).unwrap().len() > 0);
}

#[tokio::test]
async fn test_compose_withOneTrack_shouldKeepDimensionsAndRemovePartial() {
    if !toolchain_available().await {
        return;
    }
    let temp_dir = common::create_temp_dir().unwrap();
    let video = make_test_video(temp_dir.path(), 320, 240).await;
    let toolkit = FfmpegToolkit::new(EncoderSettings::default());
    let info = toolkit.probe(&video).await.unwrap();

    let rasterizer =
        TextRasterizer::builtin(RasterStyle::default()).with_direction(BaseDirection::RightToLeft);
    let timeline = OverlayTimeline::new(rasterizer, BandLayout::default());
    let segments = vec![TranslatedSegment {
        start: 0.0,
        end: 1.0,
        target_text: "שלום".to_string(),
    }];
    let tracks = timeline.build(&segments, info.frame_size(), Some(info.duration_secs));
    let output = temp_dir.path().join("output.mp4");

    toolkit.compose(&video, &info, &tracks, &output).await.unwrap();

    assert!(output.exists());
    assert!(!Compositor::partial_path(&output).exists());
    let rendered = toolkit.probe(&output).await.unwrap();
    assert_eq!((rendered.width, rendered.height), (320, 240));
    assert!(rendered.has_audio);
}

#[tokio::test]
async fn test_compose_withCorruptSource_shouldFailWithoutLeftovers() {
    if !toolchain_available().await {
        return;
    }
    let temp_dir = common::create_temp_dir().unwrap();
    let video = common::create_sized_file(temp_dir.path(), "broken.mp4", 512).unwrap();
    let toolkit = FfmpegToolkit::new(EncoderSettings::default());
    let output = temp_dir.path().join("output.mp4");
    let info = media::MediaInfo {
        duration_secs: 2.0,
        width: 320,
        height: 240,
        fps: 10.0,
        has_audio: true,
    };

    assert!(toolkit.probe(&video).await.is_err());
    let result = toolkit.compose(&video, &info, &[], &output).await;

    assert!(result.is_err());
    assert!(!output.exists());
    assert!(!Compositor::partial_path(&output).exists());
}

#[tokio::test]
async fn test_pipeline_withRealToolchain_shouldDeliverPlayableVideo() {
    if !toolchain_available().await {
        return;
    }
    let temp_dir = common::create_temp_dir().unwrap();
    let work_dir = common::create_temp_dir().unwrap();
    let video = make_test_video(temp_dir.path(), 320, 240).await;
    let config = common::test_config(work_dir.path());
    let pipeline = Pipeline::new(
        &config,
        PipelineServices {
            media: Arc::new(FfmpegToolkit::new(EncoderSettings::from(&config.encoder))),
            speech: Arc::new(MockSpeechToText::with_segments(vec![
                subburn::Segment::new(0.0, 1.0, "Hello").unwrap(),
                subburn::Segment::new(1.0, 2.0, "world").unwrap(),
            ])),
            translator: Arc::new(common::hebrew_translator()),
            status: Arc::new(RecordingStatusSink::default()),
            fonts: Arc::new(FontChain::default()),
        },
    );
    let destination = temp_dir.path().join("input.subburn.he.mp4");

    let report = pipeline
        .run(
            &LocalFileSource::new(&video),
            &FileDelivery::new(&destination, false),
            &CancelSignal::new(),
        )
        .await;

    assert!(report.is_success(), "{:?}", report.outcome);
    assert_eq!(report.final_stage(), Some(JobStage::Cleaned));
    let rendered = FfmpegToolkit::new(EncoderSettings::default())
        .probe(&destination)
        .await
        .unwrap();
    assert_eq!((rendered.width, rendered.height), (320, 240));
    assert!(common::leftover_entries(work_dir.path()).is_empty());
}

#[tokio::test]
async fn test_pipeline_withVideoWithoutAudio_shouldFailExtraction() {
    if !toolchain_available().await {
        return;
    }
    let temp_dir = common::create_temp_dir().unwrap();
    let work_dir = common::create_temp_dir().unwrap();
    let video = temp_dir.path().join("mute.mp4");
    let status = tokio::process::Command::new("ffmpeg")
        .args(["-y", "-v", "error", "-f", "lavfi", "-i", "testsrc=size=160x120:rate=10"])
        .args(["-t", "1", "-c:v", "libx264", "-pix_fmt", "yuv420p"])
        .arg(&video)
        .status()
        .await
        .unwrap();
    assert!(status.success());
    let config = common::test_config(work_dir.path());
    let pipeline = Pipeline::new(
        &config,
        PipelineServices {
            media: Arc::new(FfmpegToolkit::new(EncoderSettings::default())),
            speech: Arc::new(MockSpeechToText::with_segments(common::hello_world_segments())),
            translator: Arc::new(common::hebrew_translator()),
            status: Arc::new(RecordingStatusSink::default()),
            fonts: Arc::new(FontChain::default()),
        },
    );

    let report = pipeline
        .run(
            &LocalFileSource::new(&video),
            &FileDelivery::new(temp_dir.path().join("out.mp4"), false),
            &CancelSignal::new(),
        )
        .await;

    assert_eq!(
        report.outcome.as_ref().unwrap_err().kind(),
        JobErrorKind::Extraction
    );
    assert!(common::leftover_entries(work_dir.path()).is_empty());
}
