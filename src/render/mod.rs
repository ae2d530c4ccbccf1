/*!
 * Subtitle text rendering.
 *
 * This module turns one line of translated text into an RGBA bitmap:
 * - `bidi`: reorders logical text into visual order for right-to-left scripts
 * - `fonts`: the font fallback chain and the built-in bitmap font
 * - `rasterizer`: layout, shrink-to-fit, backdrop and glyph blending
 */

pub mod bidi;
pub mod fonts;
pub mod rasterizer;

pub use bidi::BaseDirection;
pub use fonts::{BitmapFont, FontChain, release_shared_font_chain, shared_font_chain};
pub use rasterizer::{RasterStyle, TextRasterizer};

use crate::language_utils;

/// Paragraph direction to use for subtitles in `language`
pub fn direction_for(language: &str) -> BaseDirection {
    if language_utils::is_rtl_language(language) {
        BaseDirection::RightToLeft
    } else {
        BaseDirection::Auto
    }
}
