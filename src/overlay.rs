/*!
 * Timed subtitle overlays.
 *
 * Each translated segment becomes one `OverlayTrack`: a bitmap rendered for
 * the bottom-centre subtitle band plus the half-open interval during which
 * it is visible. Overlapping intervals are not merged; the compositor layers
 * them by ascending start time.
 */

use image::RgbaImage;
use log::debug;

use crate::app_config::OverlayConfig;
use crate::render::TextRasterizer;
use crate::segments::TranslatedSegment;

/// Decoded video frame dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Rectangle of the frame an overlay is drawn into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Placement rules for the subtitle band
#[derive(Debug, Clone, PartialEq)]
pub struct BandLayout {
    pub band_height: u32,
    pub bottom_offset: u32,
    pub band_width_ratio: f32,
}

impl From<&OverlayConfig> for BandLayout {
    fn from(config: &OverlayConfig) -> Self {
        Self {
            band_height: config.band_height,
            bottom_offset: config.bottom_offset,
            band_width_ratio: config.band_width_ratio,
        }
    }
}

impl Default for BandLayout {
    fn default() -> Self {
        Self::from(&OverlayConfig::default())
    }
}

impl BandLayout {
    /// Bottom-centre band for a frame, always inside the frame
    pub fn region(&self, frame: FrameSize) -> ScreenRegion {
        let width = ((frame.width as f32 * self.band_width_ratio).round() as u32)
            .clamp(1, frame.width.max(1));
        let height = self.band_height.min(frame.height).max(1);
        let x = (frame.width.saturating_sub(width)) / 2;
        let y = frame
            .height
            .saturating_sub(height + self.bottom_offset)
            .min(frame.height.saturating_sub(height));
        ScreenRegion { x, y, width, height }
    }
}

/// Inclusive-exclusive box of pixels with non-zero alpha, in bitmap coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentBounds {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

/// A rendered subtitle and the time span it is shown for
#[derive(Debug, Clone)]
pub struct OverlayTrack {
    // @field: Inclusive start in seconds
    pub start: f64,
    // @field: Exclusive end in seconds
    pub end: f64,
    pub region: ScreenRegion,
    pub bitmap: RgbaImage,
    content: Option<ContentBounds>,
}

impl OverlayTrack {
    pub fn new(start: f64, end: f64, region: ScreenRegion, bitmap: RgbaImage) -> Self {
        let content = content_bounds(&bitmap);
        Self {
            start,
            end,
            region,
            bitmap,
            content,
        }
    }

    /// Whether `t` falls inside `[start, end)`
    pub fn is_active_at(&self, t: f64) -> bool {
        self.start <= t && t < self.end
    }

    pub fn interval(&self) -> (f64, f64) {
        (self.start, self.end)
    }

    /// Opaque area of the bitmap, `None` when fully transparent
    pub fn content_bounds(&self) -> Option<ContentBounds> {
        self.content
    }
}

fn content_bounds(bitmap: &RgbaImage) -> Option<ContentBounds> {
    let mut bounds: Option<ContentBounds> = None;
    for (x, y, pixel) in bitmap.enumerate_pixels() {
        if pixel.0[3] == 0 {
            continue;
        }
        bounds = Some(match bounds {
            None => ContentBounds {
                x0: x,
                y0: y,
                x1: x + 1,
                y1: y + 1,
            },
            Some(b) => ContentBounds {
                x0: b.x0.min(x),
                y0: b.y0.min(y),
                x1: b.x1.max(x + 1),
                y1: b.y1.max(y + 1),
            },
        });
    }
    bounds
}

/// Turns translated segments into overlay tracks
#[derive(Debug, Clone)]
pub struct OverlayTimeline {
    rasterizer: TextRasterizer,
    band: BandLayout,
}

impl OverlayTimeline {
    pub fn new(rasterizer: TextRasterizer, band: BandLayout) -> Self {
        Self { rasterizer, band }
    }

    /// Build one track per segment, in segment order
    ///
    /// Intervals are clamped to `[0, duration]` when a duration is known;
    /// segments whose interval is empty after clamping are dropped.
    pub fn build(
        &self,
        segments: &[TranslatedSegment],
        frame: FrameSize,
        duration: Option<f64>,
    ) -> Vec<OverlayTrack> {
        let region = self.band.region(frame);

        segments
            .iter()
            .filter_map(|segment| {
                let (start, end) = clamp_interval(segment.start, segment.end, duration)?;
                let bitmap = self
                    .rasterizer
                    .render(&segment.target_text, region.width, region.height);
                Some(OverlayTrack::new(start, end, region, bitmap))
            })
            .collect()
    }
}

fn clamp_interval(start: f64, end: f64, duration: Option<f64>) -> Option<(f64, f64)> {
    let start = start.max(0.0);
    let end = match duration {
        Some(limit) => end.min(limit),
        None => end,
    };
    if !start.is_finite() || !end.is_finite() || end - start <= 0.0 {
        debug!("Dropping overlay with empty interval [{:.3}, {:.3})", start, end);
        return None;
    }
    Some((start, end))
}

/// Tracks visible at `t`, in drawing order (ascending start, stable)
pub fn active_tracks(tracks: &[OverlayTrack], t: f64) -> Vec<&OverlayTrack> {
    let mut active: Vec<&OverlayTrack> = tracks.iter().filter(|track| track.is_active_at(t)).collect();
    active.sort_by(|a, b| a.start.total_cmp(&b.start));
    active
}
