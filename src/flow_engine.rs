//! Glyph flow: one stateful walk over rich text that places glyphs, wraps
//! lines and finds highlight spans.
//!
//! The walk runs in one of three modes. The normal pass yields
//! [`FlowEvent`]s. Before it needs them, it runs two lookahead passes on
//! owned copies of itself: [`find_wrap_point`] to locate the next line
//! break, and [`compute_highlight_spans`] to produce highlight rectangles
//! ahead of the glyphs drawn on top of them.

use core::fmt;

use log::{debug, trace};

use crate::geom::{Rect, Vec2};
use crate::glyph_provider::{
    same_font_scale, GlyphHit, GlyphProvider, LineMetrics, SUBSTITUTE_CODEPOINTS,
};
use crate::rich_text::{decode_utf8, is_line_control, is_whitespace, RichText};
use crate::style::{ActiveStyle, Color32, FontStyleFlags};

/// Start style and layout options for one flow pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FlowConfig {
    /// Font size at the start of the text.
    pub font_size: f32,
    /// Style flags at the start of the text.
    pub style_flags: FontStyleFlags,
    /// Color at the start of the text.
    pub color: Color32,
    /// Maximum line width measured from the start X. `0.0` disables wrapping.
    pub wrap_width: f32,
    /// Draw positions snap to `1 / align_pixel_size` steps per axis. A zero
    /// axis disables snapping on that axis.
    pub align_pixel_size: Vec2,
    /// Newlines advance without a glyph and never end the line.
    pub single_line: bool,
}

impl FlowConfig {
    /// Convenience for a font size with sensible defaults.
    pub fn for_font_size(font_size: f32) -> Self {
        Self {
            font_size,
            ..Self::default()
        }
    }

    pub fn with_style_flags(mut self, flags: FontStyleFlags) -> Self {
        self.style_flags = flags;
        self
    }

    pub fn with_color(mut self, color: Color32) -> Self {
        self.color = color;
        self
    }

    pub fn with_wrap_width(mut self, wrap_width: f32) -> Self {
        self.wrap_width = wrap_width;
        self
    }

    pub fn with_pixel_grid(mut self, align_pixel_size: Vec2) -> Self {
        self.align_pixel_size = align_pixel_size;
        self
    }

    pub fn with_single_line(mut self, single_line: bool) -> Self {
        self.single_line = single_line;
        self
    }

    fn start_style(&self) -> ActiveStyle {
        ActiveStyle::new(self.font_size, self.style_flags, self.color)
    }
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            font_size: 16.0,
            style_flags: FontStyleFlags::NONE,
            color: Color32::WHITE,
            wrap_width: 0.0,
            align_pixel_size: Vec2::ONE,
            single_line: false,
        }
    }
}

/// Which pass a session is running.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlowMode {
    Normal,
    FindingWrapPoint,
    ComputingHighlightRects,
}

/// Result of the wrap lookahead.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WrapPoint {
    /// Byte index where the next line starts.
    pub byte_index: usize,
    /// The break was caused by a newline rather than by width overflow.
    pub is_line_end: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineBreakKind {
    Newline,
    Wrap,
}

/// A glyph placed by the normal pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlacedGlyph {
    /// Codepoint decoded from the text (before substitution).
    pub codepoint: u32,
    pub byte_index: usize,
    pub hit: GlyphHit,
    /// Pen position on the baseline, kerning applied.
    pub position: Vec2,
    pub draw_rec: Rect,
    pub logical_rec: Rect,
    pub kerning: f32,
    pub color: Color32,
    /// Metrics of the line style the glyph was placed with.
    pub line: LineMetrics,
}

/// Layout events in document order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FlowEvent {
    GlyphPlaced(PlacedGlyph),
    /// A codepoint that advanced the cursor without a glyph.
    CharSkipped { codepoint: u32, byte_index: usize },
    /// Highlight background. Always precedes the glyphs it sits under.
    HighlightSpanClosed(Rect),
    /// A new line starts at `byte_index`, pen at `position`.
    LineBroken {
        byte_index: usize,
        position: Vec2,
        kind: LineBreakKind,
    },
}

#[derive(Clone, Copy, Debug)]
struct Placement {
    hit: GlyphHit,
    kerning: f32,
    pen: Vec2,
    draw_rec: Rect,
    logical_rec: Rect,
}

#[derive(Clone, Copy, Debug)]
struct Probe {
    codepoint: u32,
    byte_index: usize,
    size: usize,
    whitespace: bool,
    right_edge: Option<f32>,
}

enum Step<'a, P: ?Sized> {
    Glyph(PlacedGlyph),
    Skipped { codepoint: u32, byte_index: usize },
    LineBroken {
        byte_index: usize,
        position: Vec2,
        kind: LineBreakKind,
    },
    Highlight(Rect),
    BeginHighlight(HighlightSpans<'a, P>),
    Probe(Probe),
}

/// Cursor, style and pass bookkeeping for one walk over a rich text.
pub struct FlowSession<'a, P: ?Sized> {
    provider: &'a P,
    text: RichText<'a>,
    config: FlowConfig,
    start_position: Vec2,
    start_style: ActiveStyle,
    mode: FlowMode,

    position: Vec2,
    byte_index: usize,
    char_index: usize,
    glyph_index: usize,
    piece_index: usize,
    piece_byte_index: usize,
    applied_piece: Option<usize>,
    style: ActiveStyle,
    prev_glyph: Option<GlyphHit>,

    next_wrap: Option<WrapPoint>,
    line_max_height: f32,

    highlight_drawn_to: usize,
    highlight_start: Vec2,

    invalid_utf8: bool,
    finished: bool,
}

impl<P: ?Sized> Clone for FlowSession<'_, P> {
    fn clone(&self) -> Self {
        Self { ..*self }
    }
}

impl<P: ?Sized> fmt::Debug for FlowSession<'_, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlowSession")
            .field("mode", &self.mode)
            .field("config", &self.config)
            .field("position", &self.position)
            .field("byte_index", &self.byte_index)
            .field("char_index", &self.char_index)
            .field("glyph_index", &self.glyph_index)
            .field("piece_index", &self.piece_index)
            .field("style", &self.style)
            .field("next_wrap", &self.next_wrap)
            .field("highlight_drawn_to", &self.highlight_drawn_to)
            .finish()
    }
}

impl<'a, P: GlyphProvider + ?Sized> FlowSession<'a, P> {
    /// Create a session that lays out `text` with its first baseline at `position`.
    ///
    /// # Panics
    ///
    /// Panics if `config.wrap_width` is negative or not finite.
    pub fn new(provider: &'a P, text: RichText<'a>, position: Vec2, config: FlowConfig) -> Self {
        assert!(
            config.wrap_width.is_finite() && config.wrap_width >= 0.0,
            "wrap width must be finite and non-negative, got {}",
            config.wrap_width
        );
        let start_style = config.start_style();
        Self {
            provider,
            text,
            config,
            start_position: position,
            start_style,
            mode: FlowMode::Normal,
            position,
            byte_index: 0,
            char_index: 0,
            glyph_index: 0,
            piece_index: 0,
            piece_byte_index: 0,
            applied_piece: None,
            style: start_style,
            prev_glyph: None,
            next_wrap: None,
            line_max_height: 0.0,
            highlight_drawn_to: 0,
            highlight_start: position,
            invalid_utf8: false,
            finished: false,
        }
    }

    pub fn provider(&self) -> &'a P {
        self.provider
    }

    pub fn text(&self) -> RichText<'a> {
        self.text
    }

    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    pub fn mode(&self) -> FlowMode {
        self.mode
    }

    pub fn start_position(&self) -> Vec2 {
        self.start_position
    }

    /// Current pen position on the baseline.
    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn byte_index(&self) -> usize {
        self.byte_index
    }

    pub fn char_index(&self) -> usize {
        self.char_index
    }

    pub fn glyph_index(&self) -> usize {
        self.glyph_index
    }

    pub fn style(&self) -> &ActiveStyle {
        &self.style
    }

    /// Whether any malformed UTF-8 has been laid out so far.
    pub fn invalid_utf8(&self) -> bool {
        self.invalid_utf8
    }

    /// Metrics for the style at the cursor.
    pub fn line_metrics(&self) -> LineMetrics {
        self.provider
            .line_metrics(self.style.font_size, self.style.flags)
            .unwrap_or_default()
    }

    /// Turn the session into its event sequence. Clone first to replay.
    pub fn events(self) -> FlowIter<'a, P> {
        FlowIter {
            session: self,
            highlight: None,
        }
    }

    fn advance(&mut self) -> Option<Step<'a, P>> {
        loop {
            if self.finished {
                return None;
            }
            if self.byte_index >= self.text.len() {
                if self.mode == FlowMode::Normal {
                    if let Some(step) = self.break_trailing_newline() {
                        return Some(step);
                    }
                }
                self.finished = true;
                if self.mode == FlowMode::ComputingHighlightRects && self.style.is_highlighted()
                {
                    return self.close_highlight_span().map(Step::Highlight);
                }
                return None;
            }

            if self.applied_piece != Some(self.piece_index) {
                if let Some(step) = self.enter_piece() {
                    return Some(step);
                }
                continue;
            }

            if self.mode != FlowMode::FindingWrapPoint {
                if let Some(step) = self.check_wrap() {
                    return Some(step);
                }
            }

            let piece_bytes = self.text.piece_bytes(self.piece_index);
            let (codepoint, size) = match decode_utf8(piece_bytes, self.piece_byte_index) {
                Some(decoded) => decoded,
                None => {
                    if !self.invalid_utf8 && self.mode == FlowMode::Normal {
                        debug!(
                            "glyph flow: invalid utf-8 at byte {}, laying out raw byte",
                            self.byte_index
                        );
                    }
                    self.invalid_utf8 = true;
                    (piece_bytes[self.piece_byte_index] as u32, 1)
                }
            };

            let byte_index = self.byte_index;
            let whitespace = is_whitespace(codepoint);
            let placement = if is_line_control(codepoint) {
                None
            } else {
                self.resolve_glyph(codepoint, whitespace)
                    .map(|hit| self.place_glyph(hit))
            };
            let line = self.line_metrics();

            if let Some(placed) = &placement {
                self.position.x = placed.pen.x + placed.hit.glyph.advance_x;
                self.glyph_index += 1;
                self.prev_glyph = Some(placed.hit);
                self.line_max_height = self.line_max_height.max(line.line_height);
            }
            self.char_index += 1;
            self.byte_index += size;
            self.piece_byte_index += size;
            if self.piece_byte_index >= piece_bytes.len() {
                self.piece_index += 1;
                self.piece_byte_index = 0;
            }

            match self.mode {
                FlowMode::ComputingHighlightRects => continue,
                FlowMode::FindingWrapPoint => {
                    return Some(Step::Probe(Probe {
                        codepoint,
                        byte_index,
                        size,
                        whitespace,
                        right_edge: placement.map(|placed| placed.logical_rec.right()),
                    }));
                }
                FlowMode::Normal => {
                    return Some(match placement {
                        Some(placed) => Step::Glyph(PlacedGlyph {
                            codepoint,
                            byte_index,
                            hit: placed.hit,
                            position: placed.pen,
                            draw_rec: placed.draw_rec,
                            logical_rec: placed.logical_rec,
                            kerning: placed.kerning,
                            color: self.style.color,
                            line,
                        }),
                        None => Step::Skipped {
                            codepoint,
                            byte_index,
                        },
                    });
                }
            }
        }
    }

    /// Apply the current piece's style change once and handle the highlight
    /// transitions it causes.
    fn enter_piece(&mut self) -> Option<Step<'a, P>> {
        let piece = self.text.piece(self.piece_index);
        let change = piece.style_change;
        let was_highlighted = self.style.is_highlighted();
        let highlight_changing =
            self.style
                .flag_changing(change, self.start_style.flags, FontStyleFlags::HIGHLIGHTED);

        let mut closed = None;
        if self.mode == FlowMode::ComputingHighlightRects
            && was_highlighted
            && (highlight_changing || change.splits_highlight_span())
        {
            closed = self.close_highlight_span();
            if highlight_changing {
                self.finished = true;
                return closed.map(Step::Highlight);
            }
        }

        self.style.apply(change, &self.start_style);
        self.applied_piece = Some(self.piece_index);
        if !was_highlighted && self.style.is_highlighted() {
            self.highlight_start = self.position;
        }

        if piece.is_empty() {
            self.piece_index += 1;
            self.piece_byte_index = 0;
        } else if self.mode == FlowMode::Normal
            && self.style.is_highlighted()
            && self.byte_index >= self.highlight_drawn_to
        {
            return Some(Step::BeginHighlight(compute_highlight_spans(self.clone())));
        }
        closed.map(Step::Highlight)
    }

    /// Break the line when the cursor reaches the pending wrap point.
    fn check_wrap(&mut self) -> Option<Step<'a, P>> {
        let wrap = match self.next_wrap {
            Some(wrap) => wrap,
            None => {
                let wrap = find_wrap_point(self.clone());
                self.next_wrap = Some(wrap);
                wrap
            }
        };
        if self.byte_index < wrap.byte_index {
            return None;
        }

        let closed = if self.mode == FlowMode::ComputingHighlightRects && self.style.is_highlighted()
        {
            self.close_highlight_span()
        } else {
            None
        };
        self.break_line();
        self.highlight_start = self.position;
        self.next_wrap = Some(find_wrap_point(self.clone()));

        match self.mode {
            FlowMode::Normal => Some(Step::LineBroken {
                byte_index: self.byte_index,
                position: self.position,
                kind: if wrap.is_line_end {
                    LineBreakKind::Newline
                } else {
                    LineBreakKind::Wrap
                },
            }),
            _ => closed.map(Step::Highlight),
        }
    }

    /// A newline that ends the text still opens the next line.
    fn break_trailing_newline(&mut self) -> Option<Step<'a, P>> {
        let wrap = self.next_wrap.take()?;
        if !wrap.is_line_end || self.byte_index < wrap.byte_index {
            return None;
        }
        self.break_line();
        self.highlight_start = self.position;
        Some(Step::LineBroken {
            byte_index: self.byte_index,
            position: self.position,
            kind: LineBreakKind::Newline,
        })
    }

    /// Resolve through the substitution chain. Whitespace only tries itself.
    fn resolve_glyph(&self, codepoint: u32, whitespace: bool) -> Option<GlyphHit> {
        let style = self.style;
        let lookup = |candidate: u32| {
            self.provider
                .try_get_glyph(candidate, style.font_size, style.flags, true)
        };
        let found = if whitespace {
            lookup(codepoint)
        } else {
            core::iter::once(codepoint)
                .chain(SUBSTITUTE_CODEPOINTS)
                .find_map(lookup)
        };
        let Some(mut hit) = found else {
            if self.mode == FlowMode::Normal {
                trace!(
                    "glyph flow: no glyph for U+{:04X} at size {} ({})",
                    codepoint,
                    style.font_size,
                    style.flags
                );
            }
            return None;
        };

        if (hit.atlas.font_size - style.font_size).abs() > f32::EPSILON {
            let factor = match self.provider.line_metrics(style.font_size, style.flags) {
                Some(metrics) if hit.atlas.line_height > 0.0 => {
                    metrics.line_height / hit.atlas.line_height
                }
                _ if hit.atlas.font_size > 0.0 => style.font_size / hit.atlas.font_size,
                _ => 1.0,
            };
            hit.glyph = hit.glyph.scaled(factor);
        }
        Some(hit)
    }

    fn place_glyph(&self, hit: GlyphHit) -> Placement {
        let kerning = match &self.prev_glyph {
            Some(prev) if same_font_scale(&prev.atlas, &hit.atlas) => {
                self.provider
                    .kerning(hit.atlas.font_scale, &prev.glyph, &hit.glyph)
            }
            _ => 0.0,
        };
        let pen = Vec2::new(self.position.x + kerning, self.position.y);
        let draw_origin = pen
            .add(hit.glyph.render_offset)
            .snap_to(self.config.align_pixel_size);
        Placement {
            hit,
            kerning,
            pen,
            draw_rec: Rect::from_origin_size(draw_origin, hit.glyph.size),
            logical_rec: hit.glyph.logical_rec.translate(pen),
        }
    }

    fn break_line(&mut self) {
        let natural = self.line_metrics().line_height;
        self.position.x = self.start_position.x;
        // Uses only this line's metrics; the next line's ascend is not consulted.
        self.position.y += self.line_max_height.max(natural);
        self.line_max_height = 0.0;
        self.prev_glyph = None;
    }

    fn close_highlight_span(&mut self) -> Option<Rect> {
        let line = self.line_metrics();
        let start = self.highlight_start;
        let width = self.position.x - start.x;
        self.highlight_start = self.position;
        if width <= 0.0 {
            return None;
        }
        let origin = Vec2::new(
            start.x,
            start.y - line.center_offset - line.line_height / 2.0,
        )
        .snap_to(self.config.align_pixel_size);
        Some(Rect::from_origin_size(
            origin,
            Vec2::new(width, line.line_height).ceil(),
        ))
    }
}

/// Move `session` to the start of the next line.
pub fn advance_one_line<P: GlyphProvider + ?Sized>(
    mut session: FlowSession<'_, P>,
) -> FlowSession<'_, P> {
    session.break_line();
    session
}

/// Scan ahead from the session's cursor for the byte index where the next
/// line should start.
///
/// Prefers the last word boundary before the first glyph that overflows
/// `wrap_width`, otherwise breaks right before that glyph. The first glyph of
/// a line never overflows. Trailing whitespace and at most one newline are
/// swallowed into the break. A newline always ends the line.
pub fn find_wrap_point<P: GlyphProvider + ?Sized>(mut session: FlowSession<'_, P>) -> WrapPoint {
    session.mode = FlowMode::FindingWrapPoint;
    let line_start = session.byte_index;
    let wrapping = session.config.wrap_width > 0.0;
    let limit = session.start_position.x + session.config.wrap_width;

    let mut boundary: Option<usize> = None;
    let mut prev_whitespace: Option<bool> = None;
    let mut placed_on_line = false;
    while let Some(step) = session.advance() {
        let Step::Probe(probe) = step else {
            continue;
        };
        if probe.codepoint == '\n' as u32 && !session.config.single_line {
            return WrapPoint {
                byte_index: probe.byte_index + probe.size,
                is_line_end: true,
            };
        }
        if !probe.whitespace {
            if let Some(right_edge) = probe.right_edge {
                if wrapping && placed_on_line && right_edge > limit {
                    let break_at = boundary.unwrap_or(probe.byte_index);
                    return WrapPoint {
                        byte_index: session.text.skip_break_whitespace(break_at),
                        is_line_end: false,
                    };
                }
                placed_on_line = true;
            }
        }
        if prev_whitespace.is_some_and(|prev| prev != probe.whitespace)
            && probe.byte_index > line_start
        {
            boundary = Some(probe.byte_index);
        }
        prev_whitespace = Some(probe.whitespace);
    }
    WrapPoint {
        byte_index: session.text.len(),
        is_line_end: false,
    }
}

/// Lookahead yielding one rectangle per contiguous highlighted sub-run.
///
/// Spans close when highlighting turns off, on color or size changes, on
/// line wraps and at the end of the text. The pass stops when highlighting
/// turns off.
pub struct HighlightSpans<'a, P: ?Sized> {
    session: FlowSession<'a, P>,
}

impl<P: ?Sized> Clone for HighlightSpans<'_, P> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
        }
    }
}

impl<P: GlyphProvider + ?Sized> HighlightSpans<'_, P> {
    /// Byte index the pass has reached.
    pub fn end_byte_index(&self) -> usize {
        self.session.byte_index
    }
}

impl<P: GlyphProvider + ?Sized> Iterator for HighlightSpans<'_, P> {
    type Item = Rect;

    fn next(&mut self) -> Option<Rect> {
        while let Some(step) = self.session.advance() {
            if let Step::Highlight(rect) = step {
                return Some(rect);
            }
        }
        None
    }
}

/// Start a highlight lookahead at the session's cursor.
pub fn compute_highlight_spans<P: GlyphProvider + ?Sized>(
    mut session: FlowSession<'_, P>,
) -> HighlightSpans<'_, P> {
    session.mode = FlowMode::ComputingHighlightRects;
    session.highlight_start = session.position;
    session.finished = false;
    HighlightSpans { session }
}

/// Lazy, allocation-free sequence of [`FlowEvent`]s for one session.
pub struct FlowIter<'a, P: ?Sized> {
    session: FlowSession<'a, P>,
    highlight: Option<HighlightSpans<'a, P>>,
}

impl<P: ?Sized> Clone for FlowIter<'_, P> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
            highlight: self.highlight.clone(),
        }
    }
}

impl<'a, P: GlyphProvider + ?Sized> FlowIter<'a, P> {
    /// Session state at the current point of iteration.
    pub fn session(&self) -> &FlowSession<'a, P> {
        &self.session
    }

    pub fn into_session(self) -> FlowSession<'a, P> {
        self.session
    }
}

impl<P: GlyphProvider + ?Sized> Iterator for FlowIter<'_, P> {
    type Item = FlowEvent;

    fn next(&mut self) -> Option<FlowEvent> {
        loop {
            if let Some(spans) = &mut self.highlight {
                if let Some(rect) = spans.next() {
                    return Some(FlowEvent::HighlightSpanClosed(rect));
                }
                self.session.highlight_drawn_to = spans.end_byte_index();
                self.highlight = None;
            }
            match self.session.advance()? {
                Step::BeginHighlight(spans) => self.highlight = Some(spans),
                Step::Glyph(glyph) => return Some(FlowEvent::GlyphPlaced(glyph)),
                Step::Skipped {
                    codepoint,
                    byte_index,
                } => {
                    return Some(FlowEvent::CharSkipped {
                        codepoint,
                        byte_index,
                    })
                }
                Step::LineBroken {
                    byte_index,
                    position,
                    kind,
                } => {
                    return Some(FlowEvent::LineBroken {
                        byte_index,
                        position,
                        kind,
                    })
                }
                Step::Highlight(_) | Step::Probe(_) => {}
            }
        }
    }
}
