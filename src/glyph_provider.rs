use crate::geom::{Rect, Vec2};
use crate::style::FontStyleFlags;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Identity and bake parameters of the atlas a glyph came from.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AtlasInfo {
    /// Provider-local atlas identifier.
    pub id: u32,
    /// Font size the atlas was baked at.
    pub font_size: f32,
    /// Font-unit to pixel scale. Kerning is only valid between equal scales.
    pub font_scale: f32,
    pub style_flags: FontStyleFlags,
    /// Line height of the atlas at its baked size.
    pub line_height: f32,
}

/// Placement metrics of one glyph, relative to the pen on the baseline.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GlyphMetrics {
    /// Codepoint the glyph was baked for (differs from the requested one after substitution).
    pub codepoint: u32,
    /// Size of the rasterized glyph box.
    pub size: Vec2,
    /// Offset from the pen to the top-left of the glyph box.
    pub render_offset: Vec2,
    pub advance_x: f32,
    /// Layout box relative to the pen.
    pub logical_rec: Rect,
}

impl GlyphMetrics {
    /// Metrics scaled uniformly, for atlases baked at another size.
    pub fn scaled(&self, factor: f32) -> Self {
        Self {
            codepoint: self.codepoint,
            size: self.size.scale(factor),
            render_offset: self.render_offset.scale(factor),
            advance_x: self.advance_x * factor,
            logical_rec: self.logical_rec.scale(factor),
        }
    }
}

/// A resolved glyph together with its atlas.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GlyphHit {
    pub atlas: AtlasInfo,
    pub glyph: GlyphMetrics,
}

/// Vertical metrics of one line for a (size, style) pair.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LineMetrics {
    pub ascend: f32,
    pub descend: f32,
    pub line_height: f32,
    /// Distance from the baseline up to the vertical center of the line box.
    pub center_offset: f32,
}

/// Glyph and metrics source consumed by the flow engine.
///
/// Implementations must be deterministic for a given (codepoint, size, style)
/// within one flow pass.
pub trait GlyphProvider {
    /// Look up a glyph. With `allow_substitution` the provider may answer from
    /// an atlas baked at another size or style.
    fn try_get_glyph(
        &self,
        codepoint: u32,
        font_size: f32,
        flags: FontStyleFlags,
        allow_substitution: bool,
    ) -> Option<GlyphHit>;

    fn line_metrics(&self, font_size: f32, flags: FontStyleFlags) -> Option<LineMetrics>;

    /// Horizontal adjustment between two adjacent glyphs of the same scale.
    fn kerning(&self, _font_scale: f32, _left: &GlyphMetrics, _right: &GlyphMetrics) -> f32 {
        0.0
    }

    /// Size used by the style-less measurement entry points.
    fn default_font_size(&self) -> f32;

    fn default_style_flags(&self) -> FontStyleFlags {
        FontStyleFlags::NONE
    }
}

impl<P: GlyphProvider + ?Sized> GlyphProvider for &P {
    fn try_get_glyph(
        &self,
        codepoint: u32,
        font_size: f32,
        flags: FontStyleFlags,
        allow_substitution: bool,
    ) -> Option<GlyphHit> {
        (**self).try_get_glyph(codepoint, font_size, flags, allow_substitution)
    }

    fn line_metrics(&self, font_size: f32, flags: FontStyleFlags) -> Option<LineMetrics> {
        (**self).line_metrics(font_size, flags)
    }

    fn kerning(&self, font_scale: f32, left: &GlyphMetrics, right: &GlyphMetrics) -> f32 {
        (**self).kerning(font_scale, left, right)
    }

    fn default_font_size(&self) -> f32 {
        (**self).default_font_size()
    }

    fn default_style_flags(&self) -> FontStyleFlags {
        (**self).default_style_flags()
    }
}

/// Whether kerning may be applied between glyphs from atlases `a` and `b`.
pub fn same_font_scale(a: &AtlasInfo, b: &AtlasInfo) -> bool {
    a.font_scale == b.font_scale
}

/// Codepoints tried, in order, after the literal codepoint misses.
pub const SUBSTITUTE_CODEPOINTS: [u32; 2] = [0xFFFD, '?' as u32];
