/*!
 * Tests for compositing overlays into raw frames
 */

use image::{Rgba, RgbaImage};
use std::path::Path;

use subburn::media::{Compositor, EncoderSettings, MediaInfo, composite_frame};
use subburn::overlay::{OverlayTrack, ScreenRegion};

const WIDTH: u32 = 20;
const HEIGHT: u32 = 10;

fn gray_frame() -> Vec<u8> {
    vec![100u8; (WIDTH * HEIGHT * 3) as usize]
}

fn pixel(frame: &[u8], x: u32, y: u32) -> [u8; 3] {
    let idx = ((y * WIDTH + x) * 3) as usize;
    [frame[idx], frame[idx + 1], frame[idx + 2]]
}

fn solid_track(start: f64, end: f64, color: [u8; 4]) -> OverlayTrack {
    let region = ScreenRegion {
        x: 2,
        y: 2,
        width: 4,
        height: 3,
    };
    OverlayTrack::new(start, end, region, RgbaImage::from_pixel(4, 3, Rgba(color)))
}

#[test]
fn test_composite_frame_withActiveTrack_shouldPaintRegionOnly() {
    let tracks = vec![solid_track(0.0, 1.0, [255, 0, 0, 255])];
    let mut frame = gray_frame();

    composite_frame(&mut frame, WIDTH, HEIGHT, 0.5, &tracks);

    assert_eq!(pixel(&frame, 2, 2), [255, 0, 0]);
    assert_eq!(pixel(&frame, 5, 4), [255, 0, 0]);
    assert_eq!(pixel(&frame, 1, 2), [100, 100, 100]);
    assert_eq!(pixel(&frame, 6, 2), [100, 100, 100]);
    assert_eq!(pixel(&frame, 2, 5), [100, 100, 100]);
}

#[test]
fn test_composite_frame_atEndTime_shouldLeaveFrameUntouched() {
    let tracks = vec![solid_track(0.0, 1.0, [255, 0, 0, 255])];
    let mut frame = gray_frame();

    composite_frame(&mut frame, WIDTH, HEIGHT, 1.0, &tracks);

    assert_eq!(frame, gray_frame());
}

#[test]
fn test_composite_frame_withOverlap_shouldDrawLaterStartOnTop() {
    // Slice order is deliberately reversed
    let tracks = vec![
        solid_track(0.5, 2.0, [0, 0, 255, 255]),
        solid_track(0.0, 2.0, [255, 0, 0, 255]),
    ];
    let mut frame = gray_frame();

    composite_frame(&mut frame, WIDTH, HEIGHT, 0.7, &tracks);
    assert_eq!(pixel(&frame, 3, 3), [0, 0, 255]);

    let mut frame = gray_frame();
    composite_frame(&mut frame, WIDTH, HEIGHT, 0.2, &tracks);
    assert_eq!(pixel(&frame, 3, 3), [255, 0, 0]);
}

#[test]
fn test_composite_frame_withHalfAlpha_shouldBlendRounded() {
    let tracks = vec![solid_track(0.0, 1.0, [255, 255, 255, 128])];
    let mut frame = vec![0u8; (WIDTH * HEIGHT * 3) as usize];

    composite_frame(&mut frame, WIDTH, HEIGHT, 0.0, &tracks);

    // (255 * 128 + 0 * 127 + 127) / 255
    assert_eq!(pixel(&frame, 3, 3), [128, 128, 128]);
}

#[test]
fn test_composite_frame_withRegionPastFrameEdge_shouldClip() {
    let region = ScreenRegion {
        x: 18,
        y: 8,
        width: 4,
        height: 4,
    };
    let tracks = vec![OverlayTrack::new(
        0.0,
        1.0,
        region,
        RgbaImage::from_pixel(4, 4, Rgba([0, 255, 0, 255])),
    )];
    let mut frame = gray_frame();

    composite_frame(&mut frame, WIDTH, HEIGHT, 0.0, &tracks);

    assert_eq!(pixel(&frame, 19, 9), [0, 255, 0]);
    assert_eq!(pixel(&frame, 17, 9), [100, 100, 100]);
}

#[test]
fn test_composite_frame_withTransparentBitmap_shouldSkipTrack() {
    let tracks = vec![solid_track(0.0, 1.0, [255, 0, 0, 0])];
    let mut frame = gray_frame();

    composite_frame(&mut frame, WIDTH, HEIGHT, 0.5, &tracks);

    assert_eq!(frame, gray_frame());
}

#[test]
fn test_decoder_args_withUnknownFps_shouldFallBack() {
    let compositor = Compositor::new(EncoderSettings::default());
    let info = MediaInfo {
        duration_secs: 3.0,
        width: 640,
        height: 360,
        fps: 0.0,
        has_audio: true,
    };

    let args = compositor.decoder_args(Path::new("in.mp4"), &info);

    assert!(args.contains(&"fps=25".to_string()));
    assert!(args.contains(&"rgb24".to_string()));
}

#[test]
fn test_encoder_args_withAacAudio_shouldReencodeAudio() {
    let settings = EncoderSettings {
        audio_codec: "aac".to_string(),
        ..EncoderSettings::default()
    };
    let compositor = Compositor::new(settings);
    let info = MediaInfo {
        duration_secs: 3.0,
        width: 640,
        height: 360,
        fps: 30.0,
        has_audio: true,
    };

    let args = compositor.encoder_args(Path::new("in.mp4"), &info, Path::new("out.mp4"));

    assert!(args.join(" ").contains("-c:a aac"));
}
