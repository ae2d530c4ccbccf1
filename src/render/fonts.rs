use fontdue::{Font, FontSettings};
use log::{debug, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::app_config::OverlayConfig;
use crate::resource::SharedResource;

/// A font that loaded successfully from the fallback list
pub struct LoadedFont {
    pub path: PathBuf,
    pub font: Font,
}

impl std::fmt::Debug for LoadedFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedFont").field("path", &self.path).finish()
    }
}

impl LoadedFont {
    /// Whether the font has a glyph for every visible character
    pub fn covers(&self, text: &str) -> bool {
        text.chars()
            .filter(|c| !c.is_whitespace() && !c.is_control())
            .all(|c| self.font.lookup_glyph_index(c) != 0)
    }
}

/// Ordered list of usable fonts
#[derive(Debug, Default)]
pub struct FontChain {
    fonts: Vec<LoadedFont>,
}

impl FontChain {
    /// Load every font in `paths` that parses, in order
    ///
    /// Missing or corrupt files are skipped; an empty chain is valid and
    /// makes the rasterizer fall back to the built-in bitmap font.
    pub fn load(paths: &[PathBuf], scale: f32) -> Self {
        let mut fonts = Vec::new();
        for path in paths {
            match Self::load_one(path, scale) {
                Ok(font) => {
                    debug!("Loaded subtitle font {}", path.display());
                    fonts.push(LoadedFont {
                        path: path.clone(),
                        font,
                    });
                }
                Err(e) => debug!("Skipping font {}: {}", path.display(), e),
            }
        }
        if fonts.is_empty() {
            warn!("No subtitle font could be loaded, using the built-in bitmap font");
        }
        Self { fonts }
    }

    /// Configured paths followed by the user font directory
    pub fn candidate_paths(configured: &[PathBuf]) -> Vec<PathBuf> {
        let mut paths = configured.to_vec();
        if let Some(dir) = dirs::font_dir() {
            for name in ["DejaVuSans-Bold.ttf", "FreeSans.ttf", "LiberationSans-Bold.ttf"] {
                let candidate = dir.join(name);
                if !paths.contains(&candidate) {
                    paths.push(candidate);
                }
            }
        }
        paths
    }

    fn load_one(path: &Path, scale: f32) -> Result<Font, String> {
        let bytes = std::fs::read(path).map_err(|e| e.to_string())?;
        Font::from_bytes(
            bytes,
            FontSettings {
                scale,
                ..FontSettings::default()
            },
        )
        .map_err(|e| e.to_string())
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    /// First font covering the whole text, else the first font at all
    pub fn select(&self, text: &str) -> Option<&LoadedFont> {
        self.fonts
            .iter()
            .find(|f| f.covers(text))
            .or_else(|| self.fonts.first())
    }
}

static SHARED_FONTS: SharedResource<FontChain> = SharedResource::new("font chain");

/// Process-wide font chain, loaded by the first job that needs it
pub async fn shared_font_chain(config: &OverlayConfig) -> Arc<FontChain> {
    let paths = FontChain::candidate_paths(&config.font_paths);
    let scale = config.font_size;
    SHARED_FONTS
        .get_or_init(|| async move {
            tokio::task::spawn_blocking(move || FontChain::load(&paths, scale))
                .await
                .unwrap_or_default()
        })
        .await
}

/// Drop the process-wide font chain
pub async fn release_shared_font_chain() {
    SHARED_FONTS.teardown().await;
}

/// Rows of a 3x5 glyph, most significant of the three bits on the left
type Glyph = [u8; 5];

const UNKNOWN_GLYPH: Glyph = [0b111, 0b101, 0b101, 0b101, 0b111];

/// Minimal built-in font used when no font file is available
///
/// Covers ASCII digits, letters (upper-cased) and common punctuation;
/// anything else is drawn as a hollow box.
#[derive(Debug, Clone, Copy)]
pub struct BitmapFont {
    // @field: Device pixels per glyph cell
    pub scale: u32,
}

impl BitmapFont {
    pub const GLYPH_WIDTH: u32 = 3;
    pub const GLYPH_HEIGHT: u32 = 5;
    /// Empty columns between glyphs
    pub const SPACING: u32 = 1;

    /// Pick a cell scale so glyphs are roughly `font_size` pixels tall
    pub fn for_size(font_size: f32) -> Self {
        let scale = (font_size / 7.0).round().max(1.0) as u32;
        Self { scale }
    }

    pub fn advance(&self) -> u32 {
        (Self::GLYPH_WIDTH + Self::SPACING) * self.scale
    }

    pub fn height(&self) -> u32 {
        Self::GLYPH_HEIGHT * self.scale
    }

    /// Width of a rendered string without trailing spacing
    pub fn measure(&self, text: &str) -> u32 {
        let count = text.chars().count() as u32;
        if count == 0 {
            0
        } else {
            count * self.advance() - Self::SPACING * self.scale
        }
    }

    /// Coverage mask of one character, `None` for whitespace
    pub fn glyph(c: char) -> Option<Glyph> {
        if c.is_whitespace() {
            return None;
        }
        Some(match c.to_ascii_uppercase() {
            '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
            '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
            '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
            '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
            '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
            '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
            '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
            '7' => [0b111, 0b001, 0b010, 0b010, 0b010],
            '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
            '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
            'A' => [0b010, 0b101, 0b111, 0b101, 0b101],
            'B' => [0b110, 0b101, 0b110, 0b101, 0b110],
            'C' => [0b011, 0b100, 0b100, 0b100, 0b011],
            'D' => [0b110, 0b101, 0b101, 0b101, 0b110],
            'E' => [0b111, 0b100, 0b110, 0b100, 0b111],
            'F' => [0b111, 0b100, 0b110, 0b100, 0b100],
            'G' => [0b011, 0b100, 0b101, 0b101, 0b011],
            'H' => [0b101, 0b101, 0b111, 0b101, 0b101],
            'I' => [0b111, 0b010, 0b010, 0b010, 0b111],
            'J' => [0b001, 0b001, 0b001, 0b101, 0b010],
            'K' => [0b101, 0b101, 0b110, 0b101, 0b101],
            'L' => [0b100, 0b100, 0b100, 0b100, 0b111],
            'M' => [0b101, 0b111, 0b111, 0b101, 0b101],
            'N' => [0b110, 0b101, 0b101, 0b101, 0b101],
            'O' => [0b010, 0b101, 0b101, 0b101, 0b010],
            'P' => [0b110, 0b101, 0b110, 0b100, 0b100],
            'Q' => [0b010, 0b101, 0b101, 0b110, 0b011],
            'R' => [0b110, 0b101, 0b110, 0b101, 0b101],
            'S' => [0b011, 0b100, 0b010, 0b001, 0b110],
            'T' => [0b111, 0b010, 0b010, 0b010, 0b010],
            'U' => [0b101, 0b101, 0b101, 0b101, 0b111],
            'V' => [0b101, 0b101, 0b101, 0b101, 0b010],
            'W' => [0b101, 0b101, 0b111, 0b111, 0b101],
            'X' => [0b101, 0b101, 0b010, 0b101, 0b101],
            'Y' => [0b101, 0b101, 0b010, 0b010, 0b010],
            'Z' => [0b111, 0b001, 0b010, 0b100, 0b111],
            '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
            ',' => [0b000, 0b000, 0b000, 0b010, 0b100],
            '!' => [0b010, 0b010, 0b010, 0b000, 0b010],
            '?' => [0b111, 0b001, 0b010, 0b000, 0b010],
            '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
            ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
            '\'' => [0b010, 0b010, 0b000, 0b000, 0b000],
            '"' => [0b101, 0b101, 0b000, 0b000, 0b000],
            '(' => [0b001, 0b010, 0b010, 0b010, 0b001],
            ')' => [0b100, 0b010, 0b010, 0b010, 0b100],
            _ => UNKNOWN_GLYPH,
        })
    }
}
