/*!
 * # subburn - translated subtitles burned into short videos
 *
 * A Rust library that takes a short video, transcribes its speech,
 * translates every spoken segment and renders the translation into the
 * picture, with proper right-to-left layout for Hebrew and similar scripts.
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `pipeline`: Job state machine, admission and collaborator interfaces
 * - `translation`: Per-segment translation with noise filtering
 * - `render`: Text rasterization, font fallback and bidi layout
 * - `overlay`: Timed subtitle bitmaps anchored to the bottom band
 * - `media`: ffmpeg/ffprobe toolchain and frame compositing
 * - `artifacts`: Per-job temporary files with guaranteed release
 * - `providers`: Speech-to-text and translation clients
 * - `segments`: Timed transcript segments and SRT output
 * - `app_controller`: Main application controller
 * - `language_utils`: ISO language code utilities
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod artifacts;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod media;
pub mod overlay;
pub mod pipeline;
pub mod providers;
pub mod render;
pub mod resource;
pub mod segments;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use errors::{AdmissionError, JobError, MediaError, ProviderError};
pub use overlay::{OverlayTimeline, OverlayTrack};
pub use pipeline::{CancelSignal, JobReport, JobStage, Pipeline};
pub use render::TextRasterizer;
pub use segments::{Segment, TranslatedSegment};
pub use translation::SegmentTranslator;
