use fontdue::Font;
use fontdue::layout::{CoordinateSystem, Layout, LayoutSettings, TextStyle};
use image::{Rgba, RgbaImage};
use log::debug;
use std::sync::Arc;

use crate::app_config::OverlayConfig;
use crate::render::bidi::{self, BaseDirection};
use crate::render::fonts::{BitmapFont, FontChain};

/// Font sizes are reduced in steps of this many pixels while shrinking to fit
const SHRINK_STEP: f32 = 2.0;

/// Text colour; the backdrop is black at `backdrop_alpha`
const TEXT_COLOR: [u8; 3] = [255, 255, 255];

/// Visual parameters of one subtitle band
#[derive(Debug, Clone, PartialEq)]
pub struct RasterStyle {
    pub font_size: f32,
    pub min_font_size: f32,
    pub padding: u32,
    pub backdrop_alpha: u8,
}

impl From<&OverlayConfig> for RasterStyle {
    fn from(config: &OverlayConfig) -> Self {
        Self {
            font_size: config.font_size,
            min_font_size: config.min_font_size.min(config.font_size),
            padding: config.padding,
            backdrop_alpha: config.backdrop_alpha,
        }
    }
}

impl Default for RasterStyle {
    fn default() -> Self {
        Self::from(&OverlayConfig::default())
    }
}

/// One glyph coverage mask positioned inside a text block
#[derive(Debug)]
struct PlacedMask {
    x: i32,
    y: i32,
    width: usize,
    height: usize,
    coverage: Vec<u8>,
}

/// Laid-out line of text, origin at the top-left of its bounding box
#[derive(Debug, Default)]
struct TextBlock {
    width: u32,
    height: u32,
    masks: Vec<PlacedMask>,
}

/// Renders subtitle lines into fixed-size transparent bitmaps
///
/// Holds only immutable state, so one instance can be shared between tasks
/// rendering independent segments.
#[derive(Debug, Clone)]
pub struct TextRasterizer {
    fonts: Arc<FontChain>,
    style: RasterStyle,
    direction: BaseDirection,
}

impl TextRasterizer {
    pub fn new(fonts: Arc<FontChain>, style: RasterStyle) -> Self {
        Self {
            fonts,
            style,
            direction: BaseDirection::Auto,
        }
    }

    /// Rasterizer that only ever uses the built-in bitmap font
    pub fn builtin(style: RasterStyle) -> Self {
        Self::new(Arc::new(FontChain::default()), style)
    }

    /// Force right-to-left paragraphs, for Hebrew, Arabic and similar targets
    pub fn with_direction(mut self, direction: BaseDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn style(&self) -> &RasterStyle {
        &self.style
    }

    /// Render `text` centred on a backdrop inside a `width` x `height` bitmap
    ///
    /// Never fails: missing glyphs degrade to boxes, text that does not fit
    /// even at the minimum size is clipped, and blank text yields a fully
    /// transparent bitmap.
    pub fn render(&self, text: &str, width: u32, height: u32) -> RgbaImage {
        let mut canvas = RgbaImage::new(width, height);
        if width == 0 || height == 0 {
            return canvas;
        }

        let visual = bidi::visual_order(text.trim(), self.direction);
        if visual.trim().is_empty() {
            return canvas;
        }

        let pad = self.style.padding;
        let max_width = width.saturating_sub(2 * pad);
        let max_height = height.saturating_sub(2 * pad);
        let block = self.fit(&visual, max_width, max_height);

        let text_x = (width as i32 - block.width as i32) / 2;
        let text_y = (height as i32 - block.height as i32) / 2;

        let backdrop = [0, 0, 0, self.style.backdrop_alpha];
        fill_rect(
            &mut canvas,
            text_x - pad as i32,
            text_y - pad as i32,
            block.width + 2 * pad,
            block.height + 2 * pad,
            backdrop,
        );

        for mask in &block.masks {
            draw_mask(&mut canvas, text_x + mask.x, text_y + mask.y, mask);
        }
        canvas
    }

    /// Lay out at the configured size, shrinking until the block fits
    fn fit(&self, text: &str, max_width: u32, max_height: u32) -> TextBlock {
        let mut size = self.style.font_size;
        loop {
            let block = self.layout(text, size);
            let fits = block.width <= max_width && block.height <= max_height;
            if fits || size <= self.style.min_font_size {
                if !fits {
                    debug!("Subtitle clipped at minimum font size {}: {:?}", size, text);
                }
                return block;
            }
            size = (size - SHRINK_STEP).max(self.style.min_font_size);
        }
    }

    fn layout(&self, text: &str, size: f32) -> TextBlock {
        match self.fonts.select(text) {
            Some(loaded) => layout_with_font(&loaded.font, text, size),
            None => layout_with_bitmap(BitmapFont::for_size(size), text),
        }
    }
}

fn layout_with_font(font: &Font, text: &str, size: f32) -> TextBlock {
    let mut layout = Layout::new(CoordinateSystem::PositiveYDown);
    layout.reset(&LayoutSettings {
        max_width: None,
        ..LayoutSettings::default()
    });
    layout.append(&[font], &TextStyle::new(text, size, 0));

    let glyphs: Vec<_> = layout
        .glyphs()
        .iter()
        .filter(|g| g.width > 0 && g.height > 0)
        .collect();
    if glyphs.is_empty() {
        return TextBlock::default();
    }

    let min_x = glyphs.iter().map(|g| g.x.floor() as i32).min().unwrap_or(0);
    let max_x = glyphs
        .iter()
        .map(|g| g.x.floor() as i32 + g.width as i32)
        .max()
        .unwrap_or(0);
    let line_height = layout.height().ceil().max(size) as i32;
    let max_y = glyphs
        .iter()
        .map(|g| g.y.floor() as i32 + g.height as i32)
        .max()
        .unwrap_or(0)
        .max(line_height);

    let masks = glyphs
        .iter()
        .map(|g| {
            let (_, coverage) = font.rasterize_config(g.key);
            PlacedMask {
                x: g.x.floor() as i32 - min_x,
                y: g.y.floor() as i32,
                width: g.width,
                height: g.height,
                coverage,
            }
        })
        .collect();

    TextBlock {
        width: (max_x - min_x).max(0) as u32,
        height: max_y.max(0) as u32,
        masks,
    }
}

fn layout_with_bitmap(font: BitmapFont, text: &str) -> TextBlock {
    let scale = font.scale as usize;
    let cell_w = BitmapFont::GLYPH_WIDTH as usize * scale;
    let cell_h = BitmapFont::GLYPH_HEIGHT as usize * scale;

    let mut masks = Vec::new();
    for (i, c) in text.chars().enumerate() {
        let Some(rows) = BitmapFont::glyph(c) else {
            continue;
        };
        let mut coverage = vec![0u8; cell_w * cell_h];
        for (row, bits) in rows.iter().enumerate() {
            for col in 0..BitmapFont::GLYPH_WIDTH as usize {
                if bits & (0b100 >> col) == 0 {
                    continue;
                }
                for dy in 0..scale {
                    let y = row * scale + dy;
                    let start = y * cell_w + col * scale;
                    coverage[start..start + scale].fill(255);
                }
            }
        }
        masks.push(PlacedMask {
            x: (i as u32 * font.advance()) as i32,
            y: 0,
            width: cell_w,
            height: cell_h,
            coverage,
        });
    }

    TextBlock {
        width: font.measure(text),
        height: font.height(),
        masks,
    }
}

/// Fill a rectangle, clipped to the canvas
fn fill_rect(canvas: &mut RgbaImage, x: i32, y: i32, w: u32, h: u32, color: [u8; 4]) {
    let (cw, ch) = canvas.dimensions();
    let x0 = x.max(0) as u32;
    let y0 = y.max(0) as u32;
    let x1 = (x + w as i32).clamp(0, cw as i32) as u32;
    let y1 = (y + h as i32).clamp(0, ch as i32) as u32;
    for py in y0..y1 {
        for px in x0..x1 {
            canvas.put_pixel(px, py, Rgba(color));
        }
    }
}

/// Blend a white coverage mask at (x, y), clipped to the canvas
fn draw_mask(canvas: &mut RgbaImage, x: i32, y: i32, mask: &PlacedMask) {
    let (cw, ch) = (canvas.width() as i32, canvas.height() as i32);
    for my in 0..mask.height {
        let py = y + my as i32;
        if py < 0 || py >= ch {
            continue;
        }
        for mx in 0..mask.width {
            let px = x + mx as i32;
            if px < 0 || px >= cw {
                continue;
            }
            let alpha = mask.coverage[my * mask.width + mx];
            if alpha == 0 {
                continue;
            }
            let dst = canvas.get_pixel_mut(px as u32, py as u32);
            *dst = Rgba(blend_over(dst.0, [TEXT_COLOR[0], TEXT_COLOR[1], TEXT_COLOR[2], alpha]));
        }
    }
}

/// Straight-alpha "source over destination"
pub fn blend_over(dst: [u8; 4], src: [u8; 4]) -> [u8; 4] {
    let sa = u32::from(src[3]);
    if sa == 0 {
        return dst;
    }
    if sa == 255 {
        return src;
    }
    let da = u32::from(dst[3]);
    // out_a = sa + da * (1 - sa), scaled by 255
    let out_a = sa * 255 + da * (255 - sa);
    if out_a == 0 {
        return [0, 0, 0, 0];
    }
    let mut out = [0u8; 4];
    for channel in 0..3 {
        let s = u32::from(src[channel]) * sa * 255;
        let d = u32::from(dst[channel]) * da * (255 - sa);
        out[channel] = ((s + d + out_a / 2) / out_a) as u8;
    }
    out[3] = ((out_a + 127) / 255) as u8;
    out
}
