use glyph_flow::{
    AtlasInfo, FlowConfig, FlowEvent, FlowSession, FontStyleFlags, GlyphHit, GlyphMetrics,
    GlyphProvider, LineMetrics, PlacedGlyph, Rect, RichText, Vec2,
};

pub const PARAGRAPH: &str = "The quick brown fox jumps over the lazy dog. \
Pack my box with five dozen liquor jugs.\n\
Sphinx of black quartz, judge my vow! How vexingly quick daft zebras jump.";

/// Monospace test font: at size 10 each glyph advances 6px, ascend 8,
/// descend 2, line height 10. Glyph boxes equal their advance.
#[derive(Clone, Copy, Debug, Default)]
pub struct MonoFixture {
    /// Codepoints without a glyph.
    pub missing: &'static [u32],
}

impl MonoFixture {
    pub const ADVANCE: f32 = 6.0;
    pub const LINE_HEIGHT: f32 = 10.0;
    pub const ASCEND: f32 = 8.0;

    fn scale(font_size: f32) -> f32 {
        font_size / 10.0
    }
}

impl GlyphProvider for MonoFixture {
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
        let scale = Self::scale(font_size);
        let advance = Self::ADVANCE * scale;
        let line_height = Self::LINE_HEIGHT * scale;
        let ascend = Self::ASCEND * scale;
        Some(GlyphHit {
            atlas: AtlasInfo {
                id: 0,
                font_size,
                font_scale: scale,
                style_flags: flags.intersection(FontStyleFlags::ATLAS_FLAGS),
                line_height,
            },
            glyph: GlyphMetrics {
                codepoint,
                size: Vec2::new(advance, line_height),
                render_offset: Vec2::new(0.0, -ascend),
                advance_x: advance,
                logical_rec: Rect::new(0.0, -ascend, advance, line_height),
            },
        })
    }

    fn line_metrics(&self, font_size: f32, _flags: FontStyleFlags) -> Option<LineMetrics> {
        let scale = Self::scale(font_size);
        Some(LineMetrics {
            ascend: Self::ASCEND * scale,
            descend: 2.0 * scale,
            line_height: Self::LINE_HEIGHT * scale,
            center_offset: 3.0 * scale,
        })
    }

    fn default_font_size(&self) -> f32 {
        10.0
    }
}

pub fn session<'a>(
    provider: &'a MonoFixture,
    text: RichText<'a>,
    wrap_width: f32,
) -> FlowSession<'a, MonoFixture> {
    FlowSession::new(
        provider,
        text,
        Vec2::ZERO,
        FlowConfig::for_font_size(10.0).with_wrap_width(wrap_width),
    )
}

pub fn placed_glyphs(events: &[FlowEvent]) -> Vec<PlacedGlyph> {
    events
        .iter()
        .filter_map(|event| match event {
            FlowEvent::GlyphPlaced(glyph) => Some(*glyph),
            _ => None,
        })
        .collect()
}

pub fn highlight_rects(events: &[FlowEvent]) -> Vec<Rect> {
    events
        .iter()
        .filter_map(|event| match event {
            FlowEvent::HighlightSpanClosed(rect) => Some(*rect),
            _ => None,
        })
        .collect()
}
