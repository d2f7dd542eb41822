//! Deterministic provider shared by unit tests.

use crate::geom::{Rect, Vec2};
use crate::glyph_provider::{AtlasInfo, GlyphHit, GlyphMetrics, GlyphProvider, LineMetrics};
use crate::style::FontStyleFlags;

const BAKED_SIZE: f32 = 10.0;

/// Monospace font: at size 10 every glyph advances 6px, ascend 8, descend 2,
/// line height 10. Everything scales linearly with the font size.
#[derive(Clone, Copy, Debug)]
pub(crate) struct FixedProvider {
    pub advance: f32,
    /// Codepoints with no glyph.
    pub missing: &'static [u32],
    /// Kerning pairs (left, right, adjustment at size 10).
    pub kerning: &'static [(u32, u32, f32)],
    /// Only one atlas, baked at size 10, answers every request.
    pub bitmap_only: bool,
    /// Logical box width at size 10 when narrower than the advance.
    pub logical_width: Option<f32>,
}

impl Default for FixedProvider {
    fn default() -> Self {
        Self {
            advance: 6.0,
            missing: &[],
            kerning: &[],
            bitmap_only: false,
            logical_width: None,
        }
    }
}

impl FixedProvider {
    fn metrics_at(&self, font_size: f32) -> LineMetrics {
        let scale = font_size / BAKED_SIZE;
        LineMetrics {
            ascend: 8.0 * scale,
            descend: 2.0 * scale,
            line_height: 10.0 * scale,
            center_offset: 3.0 * scale,
        }
    }
}

impl GlyphProvider for FixedProvider {
    fn try_get_glyph(
        &self,
        codepoint: u32,
        font_size: f32,
        flags: FontStyleFlags,
        _allow_substitution: bool,
    ) -> Option<GlyphHit> {
        if self.missing.contains(&codepoint) {
            return None;
        }
        let atlas_size = if self.bitmap_only { BAKED_SIZE } else { font_size };
        let scale = atlas_size / BAKED_SIZE;
        let line = self.metrics_at(atlas_size);
        let bold = flags.contains(FontStyleFlags::BOLD);
        let logical_width = self.logical_width.unwrap_or(self.advance) * scale;
        Some(GlyphHit {
            atlas: AtlasInfo {
                id: u32::from(bold),
                font_size: atlas_size,
                font_scale: if bold { scale * 1.1 } else { scale },
                style_flags: flags.intersection(FontStyleFlags::ATLAS_FLAGS),
                line_height: line.line_height,
            },
            glyph: GlyphMetrics {
                codepoint,
                size: Vec2::new(self.advance * scale, line.line_height),
                render_offset: Vec2::new(0.0, -line.ascend),
                advance_x: self.advance * scale,
                logical_rec: Rect::new(0.0, -line.ascend, logical_width, line.line_height),
            },
        })
    }

    fn line_metrics(&self, font_size: f32, _flags: FontStyleFlags) -> Option<LineMetrics> {
        Some(self.metrics_at(font_size))
    }

    fn kerning(&self, font_scale: f32, left: &GlyphMetrics, right: &GlyphMetrics) -> f32 {
        self.kerning
            .iter()
            .find(|(l, r, _)| *l == left.codepoint && *r == right.codepoint)
            .map_or(0.0, |(_, _, k)| k * font_scale)
    }

    fn default_font_size(&self) -> f32 {
        BAKED_SIZE
    }
}
