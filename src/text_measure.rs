//! Text measurement without drawing.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::flow_engine::{FlowConfig, FlowSession};
use crate::flow_layout::{do_flow, FlowResult, NoGlyphs};
use crate::geom::{Rect, Vec2};
use crate::glyph_provider::GlyphProvider;
use crate::rich_text::RichText;
use crate::style::FontStyleFlags;

/// Extents of a text laid out from the origin.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TextMeasure {
    pub visual_rec: Rect,
    pub logical_rec: Rect,
    /// Pen position after the last codepoint.
    pub end_position: Vec2,
    pub glyph_count: usize,
}

impl TextMeasure {
    /// Build from a flow result. With `include_advance_x` the logical box
    /// also reaches the end pen position.
    pub fn from_flow(flow: &FlowResult, include_advance_x: bool) -> Self {
        let mut logical_rec = flow.logical_rec;
        if include_advance_x {
            logical_rec.width = logical_rec.width.max(flow.end_position.x - logical_rec.x);
        }
        Self {
            visual_rec: flow.visual_rec,
            logical_rec,
            end_position: flow.end_position,
            glyph_count: flow.glyph_count,
        }
    }

    pub fn offset_x(&self) -> f32 {
        self.logical_rec.x
    }

    pub fn offset_y(&self) -> f32 {
        self.logical_rec.y
    }

    pub fn width(&self) -> f32 {
        self.logical_rec.width
    }

    pub fn height(&self) -> f32 {
        self.logical_rec.height
    }
}

/// Measure `text` at `font_size` with `flags`, laid out without wrapping
/// from the origin.
pub fn measure_rich_text_ex<P: GlyphProvider + ?Sized>(
    provider: &P,
    font_size: f32,
    flags: FontStyleFlags,
    text: RichText<'_>,
    include_advance_x: bool,
) -> TextMeasure {
    let config = FlowConfig::for_font_size(font_size).with_style_flags(flags);
    let session = FlowSession::new(provider, text, Vec2::ZERO, config);
    let flow = do_flow(session, &mut (), &mut NoGlyphs);
    TextMeasure::from_flow(&flow, include_advance_x)
}

/// [`measure_rich_text_ex`] with the provider's default size and style.
pub fn measure_rich_text<P: GlyphProvider + ?Sized>(provider: &P, text: RichText<'_>) -> TextMeasure {
    measure_rich_text_ex(
        provider,
        provider.default_font_size(),
        provider.default_style_flags(),
        text,
        false,
    )
}

pub fn measure_text_ex<P: GlyphProvider + ?Sized>(
    provider: &P,
    font_size: f32,
    flags: FontStyleFlags,
    text: &str,
    include_advance_x: bool,
) -> TextMeasure {
    measure_rich_text_ex(provider, font_size, flags, RichText::plain(text), include_advance_x)
}

pub fn measure_text<P: GlyphProvider + ?Sized>(provider: &P, text: &str) -> TextMeasure {
    measure_rich_text(provider, RichText::plain(text))
}
