//! embedded-graphics mono-font glyph provider and flow painter for `glyph-flow`.

#![cfg_attr(
    not(test),
    deny(
        clippy::disallowed_methods,
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::panic_in_result_fn,
        clippy::todo,
        clippy::unimplemented
    )
)]

use embedded_graphics::{
    mono_font::{
        ascii::{
            FONT_10X20, FONT_6X13_BOLD, FONT_6X13_ITALIC, FONT_6X9, FONT_7X13_ITALIC, FONT_7X14,
            FONT_7X14_BOLD, FONT_8X13, FONT_8X13_BOLD, FONT_8X13_ITALIC, FONT_9X18,
            FONT_9X18_BOLD,
        },
        MonoFont, MonoTextStyle,
    },
    pixelcolor::BinaryColor,
    prelude::*,
    primitives::{PrimitiveStyle, Rectangle},
    text::{Baseline, Text},
};
use glyph_flow::{
    do_flow, AtlasInfo, Color32, FlowCallbacks, FlowConfig, FlowResult, FlowSession,
    FontStyleFlags, GlyphHit, GlyphMetrics, GlyphProvider, LineMetrics, NoGlyphs, PlacedGlyph,
    Rect, RichText, Vec2,
};
use log::{debug, warn};

/// Backend-local font identifier, also used as the atlas id.
pub type FontId = u8;

/// Why a style had to fall back to another face.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FontFallbackReason {
    UnknownFontId,
    UnsupportedWeightItalic,
}

/// Resolved font for a (size, style) pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FontSelection {
    pub font_id: FontId,
    pub fallback_reason: Option<FontFallbackReason>,
}

/// Glyph provider over the built-in ASCII mono fonts.
///
/// Sizes map to four buckets and bold/italic to four variants. Only
/// printable ASCII has glyphs, so anything else substitutes to `?`.
#[derive(Clone, Copy, Debug, Default)]
pub struct MonoFontProvider;

/// One face of the size/variant table. `exact` is false when the face stands
/// in for a weight/italic combination the built-in fonts lack.
#[derive(Clone, Copy)]
struct Face {
    font: &'static MonoFont<'static>,
    exact: bool,
}

const fn face(font: &'static MonoFont<'static>) -> Face {
    Face { font, exact: true }
}

const fn stand_in(font: &'static MonoFont<'static>) -> Face {
    Face { font, exact: false }
}

/// Rows are size buckets, columns are regular, italic, bold, bold italic.
static FACES: [[Face; 4]; 4] = [
    [
        face(&FONT_6X9),
        face(&FONT_6X13_ITALIC),
        face(&FONT_6X13_BOLD),
        stand_in(&FONT_6X13_BOLD),
    ],
    [
        face(&FONT_7X14),
        face(&FONT_7X13_ITALIC),
        face(&FONT_7X14_BOLD),
        stand_in(&FONT_7X14_BOLD),
    ],
    [
        face(&FONT_8X13),
        face(&FONT_8X13_ITALIC),
        face(&FONT_8X13_BOLD),
        stand_in(&FONT_8X13_BOLD),
    ],
    [
        face(&FONT_10X20),
        stand_in(&FONT_9X18),
        face(&FONT_9X18_BOLD),
        stand_in(&FONT_9X18_BOLD),
    ],
];

impl MonoFontProvider {
    /// Size buckets by minimum font size, largest first.
    const SIZE_BUCKETS: [(f32, FontId); 3] = [(24.0, 3), (20.0, 2), (16.0, 1)];

    fn encode_font_id(size_bucket: FontId, variant: FontId) -> FontId {
        (size_bucket << 2) | (variant & 0x03)
    }

    fn size_bucket_for(font_size: f32) -> FontId {
        Self::SIZE_BUCKETS
            .iter()
            .find(|(min_size, _)| font_size >= *min_size)
            .map_or(0, |(_, bucket)| *bucket)
    }

    fn style_variant_for(flags: FontStyleFlags) -> FontId {
        let italic = FontId::from(flags.contains(FontStyleFlags::ITALIC));
        let bold = FontId::from(flags.contains(FontStyleFlags::BOLD));
        (bold << 1) | italic
    }

    /// Font for a font id, and why it is not an exact match if it isn't.
    pub fn font_for(font_id: FontId) -> (&'static MonoFont<'static>, Option<FontFallbackReason>) {
        let row = usize::from(font_id >> 2);
        let column = usize::from(font_id & 0x03);
        match FACES.get(row).map(|faces| faces[column]) {
            Some(Face { font, exact: true }) => (font, None),
            Some(Face { font, exact: false }) => {
                (font, Some(FontFallbackReason::UnsupportedWeightItalic))
            }
            None => (&FONT_8X13, Some(FontFallbackReason::UnknownFontId)),
        }
    }

    pub fn resolve_font(&self, font_size: f32, flags: FontStyleFlags) -> FontSelection {
        let font_id = Self::encode_font_id(
            Self::size_bucket_for(font_size),
            Self::style_variant_for(flags),
        );
        let (_, fallback_reason) = Self::font_for(font_id);
        FontSelection {
            font_id,
            fallback_reason,
        }
    }

    fn line_metrics_for(font: &MonoFont<'_>) -> LineMetrics {
        let ascend = font.baseline as f32;
        let line_height = font.character_size.height as f32;
        let descend = line_height - ascend;
        LineMetrics {
            ascend,
            descend,
            line_height,
            center_offset: (ascend - descend) / 2.0,
        }
    }
}

impl GlyphProvider for MonoFontProvider {
    fn try_get_glyph(
        &self,
        codepoint: u32,
        font_size: f32,
        flags: FontStyleFlags,
        _allow_substitution: bool,
    ) -> Option<GlyphHit> {
        if !(0x20..=0x7E).contains(&codepoint) {
            return None;
        }
        let selection = self.resolve_font(font_size, flags);
        let (font, _) = Self::font_for(selection.font_id);
        let line = Self::line_metrics_for(font);
        let width = font.character_size.width as f32;
        let advance_x = width + font.character_spacing as f32;
        Some(GlyphHit {
            atlas: AtlasInfo {
                id: u32::from(selection.font_id),
                // Bitmap faces are never rescaled: report the requested size.
                font_size,
                font_scale: 1.0,
                style_flags: flags.intersection(FontStyleFlags::ATLAS_FLAGS),
                line_height: line.line_height,
            },
            glyph: GlyphMetrics {
                codepoint,
                size: Vec2::new(width, line.line_height),
                render_offset: Vec2::new(0.0, -line.ascend),
                advance_x,
                logical_rec: Rect::new(0.0, -line.ascend, advance_x, line.line_height),
            },
        })
    }

    fn line_metrics(&self, font_size: f32, flags: FontStyleFlags) -> Option<LineMetrics> {
        let selection = self.resolve_font(font_size, flags);
        let (font, _) = Self::font_for(selection.font_id);
        Some(Self::line_metrics_for(font))
    }

    fn default_font_size(&self) -> f32 {
        16.0
    }
}

/// Painter settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PainterConfig {
    /// Fill used for highlight backgrounds.
    pub highlight_color: BinaryColor,
    /// Colors with luma at or above this draw as `On`.
    pub luma_threshold: u8,
}

impl Default for PainterConfig {
    fn default() -> Self {
        Self {
            highlight_color: BinaryColor::On,
            luma_threshold: 128,
        }
    }
}

/// Counters collected while painting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PaintDiagnostics {
    pub glyphs_drawn: u64,
    pub highlights_drawn: u64,
    pub font_fallbacks: u64,
}

/// [`FlowCallbacks`] that draws glyphs and highlights onto a monochrome
/// display. The first draw error stops further drawing and is kept for
/// [`FlowPainter::finish`].
pub struct FlowPainter<'d, D>
where
    D: DrawTarget<Color = BinaryColor>,
{
    display: &'d mut D,
    config: PainterConfig,
    diagnostics: PaintDiagnostics,
    error: Option<D::Error>,
}

impl<'d, D> FlowPainter<'d, D>
where
    D: DrawTarget<Color = BinaryColor>,
{
    pub fn new(display: &'d mut D, config: PainterConfig) -> Self {
        Self {
            display,
            config,
            diagnostics: PaintDiagnostics::default(),
            error: None,
        }
    }

    pub fn diagnostics(&self) -> PaintDiagnostics {
        self.diagnostics
    }

    /// Diagnostics, or the first draw error.
    pub fn finish(self) -> Result<PaintDiagnostics, D::Error> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.diagnostics),
        }
    }

    fn binary_color(&self, color: Color32, flags: FontStyleFlags) -> BinaryColor {
        let on = color.luma() >= self.config.luma_threshold;
        let color = if on { BinaryColor::On } else { BinaryColor::Off };
        if flags.contains(FontStyleFlags::INVERTED) {
            color.invert()
        } else {
            color
        }
    }

    fn record<T>(&mut self, result: Result<T, D::Error>) {
        if let Err(err) = result {
            debug!("flow painter: draw failed, skipping remaining draws");
            self.error = Some(err);
        }
    }
}

impl<D> FlowCallbacks for FlowPainter<'_, D>
where
    D: DrawTarget<Color = BinaryColor>,
{
    fn draw_char(&mut self, glyph: &PlacedGlyph) {
        if self.error.is_some() {
            return;
        }
        let Some(ch) = char::from_u32(glyph.hit.glyph.codepoint) else {
            return;
        };
        let font_id = FontId::try_from(glyph.hit.atlas.id).unwrap_or(FontId::MAX);
        let (font, fallback) = MonoFontProvider::font_for(font_id);
        if let Some(reason) = fallback {
            self.diagnostics.font_fallbacks += 1;
            if self.diagnostics.font_fallbacks == 1 {
                warn!(
                    "flow painter: font {} drawn with fallback face ({:?})",
                    font_id, reason
                );
            }
        }
        let color = self.binary_color(glyph.color, glyph.hit.atlas.style_flags);
        let mut buf = [0u8; 4];
        let text = ch.encode_utf8(&mut buf);
        let origin = Point::new(
            glyph.draw_rec.x.round() as i32,
            glyph.draw_rec.y.round() as i32,
        );
        let result = Text::with_baseline(
            text,
            origin,
            MonoTextStyle::new(font, color),
            Baseline::Top,
        )
        .draw(self.display);
        self.record(result);
        self.diagnostics.glyphs_drawn += 1;
    }

    fn draw_highlight(&mut self, rect: Rect) {
        if self.error.is_some() {
            return;
        }
        let result = Rectangle::new(
            Point::new(rect.x.round() as i32, rect.y.round() as i32),
            Size::new(
                rect.width.max(0.0).ceil() as u32,
                rect.height.max(0.0).ceil() as u32,
            ),
        )
        .into_styled(PrimitiveStyle::with_fill(self.config.highlight_color))
        .draw(self.display);
        self.record(result);
        self.diagnostics.highlights_drawn += 1;
    }
}

/// Lay out `text` with its first baseline at `baseline` and paint it.
pub fn draw_rich_text<D>(
    display: &mut D,
    provider: &MonoFontProvider,
    text: RichText<'_>,
    baseline: Point,
    config: FlowConfig,
) -> Result<FlowResult, D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    let session = FlowSession::new(
        provider,
        text,
        Vec2::new(baseline.x as f32, baseline.y as f32),
        config,
    );
    let mut painter = FlowPainter::new(display, PainterConfig::default());
    let result = do_flow(session, &mut painter, &mut NoGlyphs);
    painter.finish()?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use glyph_flow::{measure_text_ex, RichTextBuf, StyleChange};

    #[derive(Default)]
    struct PixelCaptureDisplay {
        size: Size,
        on_pixels: Vec<Point>,
    }

    impl PixelCaptureDisplay {
        fn with_size(width: u32, height: u32) -> Self {
            Self {
                size: Size::new(width, height),
                on_pixels: Vec::new(),
            }
        }
    }

    impl OriginDimensions for PixelCaptureDisplay {
        fn size(&self) -> Size {
            self.size
        }
    }

    impl DrawTarget for PixelCaptureDisplay {
        type Color = BinaryColor;
        type Error = Infallible;

        fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
        where
            I: IntoIterator<Item = Pixel<Self::Color>>,
        {
            for Pixel(point, color) in pixels {
                if color == BinaryColor::On {
                    self.on_pixels.push(point);
                }
            }
            Ok(())
        }
    }

    struct FailingDisplay;

    impl OriginDimensions for FailingDisplay {
        fn size(&self) -> Size {
            Size::new(64, 64)
        }
    }

    impl DrawTarget for FailingDisplay {
        type Color = BinaryColor;
        type Error = &'static str;

        fn draw_iter<I>(&mut self, _pixels: I) -> Result<(), Self::Error>
        where
            I: IntoIterator<Item = Pixel<Self::Color>>,
        {
            Err("bus error")
        }
    }

    #[test]
    fn size_and_style_map_to_expected_faces() {
        let provider = MonoFontProvider;
        let small = provider.resolve_font(12.0, FontStyleFlags::NONE);
        let (font, reason) = MonoFontProvider::font_for(small.font_id);
        assert_eq!(font.character_size, FONT_6X9.character_size);
        assert_eq!(reason, None);

        let xl = provider.resolve_font(30.0, FontStyleFlags::BOLD | FontStyleFlags::ITALIC);
        assert_eq!(
            xl.fallback_reason,
            Some(FontFallbackReason::UnsupportedWeightItalic)
        );
    }

    #[test]
    fn every_encoded_id_has_a_face() {
        for font_id in 0..16 {
            let (_, reason) = MonoFontProvider::font_for(font_id);
            assert_ne!(reason, Some(FontFallbackReason::UnknownFontId), "id {font_id}");
        }
        let (font, reason) = MonoFontProvider::font_for(16);
        assert_eq!(font.character_size, FONT_8X13.character_size);
        assert_eq!(reason, Some(FontFallbackReason::UnknownFontId));

        let xl_italic = MonoFontProvider.resolve_font(24.0, FontStyleFlags::ITALIC);
        assert_eq!(
            xl_italic.fallback_reason,
            Some(FontFallbackReason::UnsupportedWeightItalic)
        );
        let medium_bold = MonoFontProvider.resolve_font(16.0, FontStyleFlags::BOLD);
        let (font, _) = MonoFontProvider::font_for(medium_bold.font_id);
        assert_eq!(font.character_size, FONT_7X14_BOLD.character_size);
    }

    #[test]
    fn line_metrics_follow_font_baseline() {
        let metrics = MonoFontProvider
            .line_metrics(16.0, FontStyleFlags::NONE)
            .unwrap_or_default();
        assert_eq!(metrics.ascend, FONT_7X14.baseline as f32);
        assert_eq!(metrics.line_height, 14.0);
        assert_eq!(metrics.ascend + metrics.descend, metrics.line_height);
    }

    #[test]
    fn non_ascii_substitutes_question_mark() {
        let provider = MonoFontProvider;
        assert!(provider
            .try_get_glyph(0xE9, 12.0, FontStyleFlags::NONE, true)
            .is_none());
        let m = measure_text_ex(&provider, 12.0, FontStyleFlags::NONE, "caf\u{e9}", false);
        assert_eq!(m.glyph_count, 4);
        assert_eq!(m.width(), 24.0);
    }

    #[test]
    fn draws_text_inside_visual_rect() {
        let provider = MonoFontProvider;
        let mut display = PixelCaptureDisplay::with_size(128, 64);
        let result = draw_rich_text(
            &mut display,
            &provider,
            RichText::plain("Hi"),
            Point::new(4, 20),
            FlowConfig::for_font_size(12.0),
        )
        .unwrap_or_else(|err| match err {});
        assert!(!display.on_pixels.is_empty());
        let v = result.visual_rec;
        assert!(display.on_pixels.iter().all(|p| {
            p.x as f32 >= v.x && (p.x as f32) < v.right() && p.y as f32 >= v.y && (p.y as f32) < v.bottom()
        }));
    }

    #[test]
    fn highlight_fills_line_box() {
        let provider = MonoFontProvider;
        let mut buf = RichTextBuf::new();
        buf.push("  ", StyleChange::enable(FontStyleFlags::HIGHLIGHTED));
        let mut display = PixelCaptureDisplay::with_size(64, 64);
        let config = FlowConfig::for_font_size(12.0);
        let mut painter = FlowPainter::new(&mut display, PainterConfig::default());
        do_flow(
            FlowSession::new(&provider, buf.as_rich(), Vec2::new(0.0, 20.0), config),
            &mut painter,
            &mut NoGlyphs,
        );
        let diagnostics = painter.finish().unwrap_or_else(|err| match err {});
        assert_eq!(diagnostics.highlights_drawn, 1);
        assert_eq!(diagnostics.glyphs_drawn, 2);
        let line = FONT_6X9.character_size;
        assert_eq!(display.on_pixels.len() as u32, 2 * line.width * line.height);
        let top = 20 - FONT_6X9.baseline as i32;
        assert!(display.on_pixels.iter().all(|p| p.y >= top));
    }

    #[test]
    fn wrap_width_breaks_lines() {
        let provider = MonoFontProvider;
        let mut display = PixelCaptureDisplay::with_size(128, 128);
        let result = draw_rich_text(
            &mut display,
            &provider,
            RichText::plain("one two three"),
            Point::new(0, 10),
            FlowConfig::for_font_size(12.0).with_wrap_width(40.0),
        )
        .unwrap_or_else(|err| match err {});
        assert_eq!(result.line_count, 3);
    }

    #[test]
    fn draw_error_is_returned() {
        let provider = MonoFontProvider;
        let result = draw_rich_text(
            &mut FailingDisplay,
            &provider,
            RichText::plain("x"),
            Point::new(0, 10),
            FlowConfig::for_font_size(12.0),
        );
        assert_eq!(result, Err("bus error"));
    }
}
