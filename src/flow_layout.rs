//! Driving a flow session to completion: callbacks, glyph output and the
//! aggregate [`FlowResult`].

use core::fmt;

use log::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::flow_engine::{FlowEvent, FlowSession, LineBreakKind, PlacedGlyph};
use crate::geom::{Rect, Vec2};
use crate::glyph_provider::{AtlasInfo, GlyphMetrics, GlyphProvider};
use crate::style::Color32;

/// Per-event hooks for [`do_flow`]. Every method defaults to a no-op.
pub trait FlowCallbacks {
    /// Called before each codepoint, placed or not.
    fn before_char(&mut self, _codepoint: u32) {}

    fn draw_char(&mut self, _glyph: &PlacedGlyph) {}

    /// Highlight background, reported before the glyphs it covers.
    fn draw_highlight(&mut self, _rect: Rect) {}

    /// Called after each codepoint. `glyph` is `None` when nothing was placed.
    fn after_char(&mut self, _codepoint: u32, _glyph: Option<&PlacedGlyph>) {}

    fn line_broken(&mut self, _byte_index: usize, _position: Vec2, _kind: LineBreakKind) {}
}

impl FlowCallbacks for () {}

/// Placed glyph as written to a [`GlyphStore`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FlowGlyph {
    pub codepoint: u32,
    pub byte_index: usize,
    pub atlas: AtlasInfo,
    pub glyph: GlyphMetrics,
    /// Pen position on the baseline.
    pub position: Vec2,
    pub draw_rec: Rect,
    pub color: Color32,
}

impl From<&PlacedGlyph> for FlowGlyph {
    fn from(placed: &PlacedGlyph) -> Self {
        Self {
            codepoint: placed.codepoint,
            byte_index: placed.byte_index,
            atlas: placed.hit.atlas,
            glyph: placed.hit.glyph,
            position: placed.position,
            draw_rec: placed.draw_rec,
            color: placed.color,
        }
    }
}

/// Caller-owned glyph output with fixed capacity.
pub trait GlyphStore {
    fn capacity(&self) -> usize;

    /// Write glyph number `index`. Returns `false` when there is no room.
    fn store(&mut self, index: usize, glyph: FlowGlyph) -> bool;

    /// `false` for stores that discard everything, such as [`NoGlyphs`].
    fn is_attached(&self) -> bool {
        true
    }
}

impl GlyphStore for [FlowGlyph] {
    fn capacity(&self) -> usize {
        self.len()
    }

    fn store(&mut self, index: usize, glyph: FlowGlyph) -> bool {
        match self.get_mut(index) {
            Some(slot) => {
                *slot = glyph;
                true
            }
            None => false,
        }
    }
}

impl<const N: usize> GlyphStore for heapless::Vec<FlowGlyph, N> {
    fn capacity(&self) -> usize {
        N
    }

    fn store(&mut self, index: usize, glyph: FlowGlyph) -> bool {
        if let Some(slot) = self.get_mut(index) {
            *slot = glyph;
            return true;
        }
        index == self.len() && self.push(glyph).is_ok()
    }
}

/// Store that keeps nothing, for measurement-only flows.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoGlyphs;

impl GlyphStore for NoGlyphs {
    fn capacity(&self) -> usize {
        0
    }

    fn store(&mut self, _index: usize, _glyph: FlowGlyph) -> bool {
        false
    }

    fn is_attached(&self) -> bool {
        false
    }
}

/// Aggregate outcome of one full flow pass.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FlowResult {
    pub start_position: Vec2,
    pub end_position: Vec2,
    /// Union of all glyph draw rectangles. Zero-sized at the start when no glyph was placed.
    pub visual_rec: Rect,
    /// Union of the starting line box and every glyph's logical rectangle.
    pub logical_rec: Rect,
    pub glyph_count: usize,
    pub glyphs_written: usize,
    /// Capacity of the attached glyph store, if any.
    pub glyph_capacity: Option<usize>,
    pub line_count: usize,
    pub invalid_utf8: bool,
}

impl FlowResult {
    pub fn status(&self) -> FlowStatus {
        if self.glyph_capacity.is_some() && self.glyphs_written < self.glyph_count {
            FlowStatus::Truncated {
                written: self.glyphs_written,
                needed: self.glyph_count,
            }
        } else if self.invalid_utf8 {
            FlowStatus::InvalidUtf8
        } else {
            FlowStatus::Success
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlowStatus {
    Success,
    InvalidUtf8,
    /// The glyph store filled up; layout itself still ran to the end.
    Truncated { written: usize, needed: usize },
}

/// Run `session` to the end, reporting through `callbacks` and writing
/// placed glyphs into `glyphs`.
pub fn do_flow<P, C, S>(session: FlowSession<'_, P>, callbacks: &mut C, glyphs: &mut S) -> FlowResult
where
    P: GlyphProvider + ?Sized,
    C: FlowCallbacks + ?Sized,
    S: GlyphStore + ?Sized,
{
    let start = session.position();
    let ascend = session.line_metrics().ascend;
    let mut result = FlowResult {
        start_position: start,
        end_position: start,
        visual_rec: Rect::from_origin_size(start, Vec2::ZERO),
        logical_rec: Rect::new(start.x, start.y - ascend, 0.0, ascend),
        glyph_count: 0,
        glyphs_written: 0,
        glyph_capacity: glyphs.is_attached().then(|| glyphs.capacity()),
        line_count: 1,
        invalid_utf8: false,
    };

    let mut events = session.events();
    while let Some(event) = events.next() {
        match event {
            FlowEvent::GlyphPlaced(glyph) => {
                callbacks.before_char(glyph.codepoint);
                callbacks.draw_char(&glyph);
                if glyphs.store(result.glyph_count, FlowGlyph::from(&glyph)) {
                    result.glyphs_written += 1;
                }
                result.visual_rec = if result.glyph_count == 0 {
                    glyph.draw_rec
                } else {
                    result.visual_rec.union(&glyph.draw_rec)
                };
                result.logical_rec = result.logical_rec.union(&glyph.logical_rec);
                result.glyph_count += 1;
                callbacks.after_char(glyph.codepoint, Some(&glyph));
            }
            FlowEvent::CharSkipped { codepoint, .. } => {
                callbacks.before_char(codepoint);
                callbacks.after_char(codepoint, None);
            }
            FlowEvent::HighlightSpanClosed(rect) => callbacks.draw_highlight(rect),
            FlowEvent::LineBroken {
                byte_index,
                position,
                kind,
            } => {
                let line = events.session().line_metrics();
                let line_box = Rect::new(
                    position.x,
                    position.y - line.ascend,
                    0.0,
                    line.ascend + line.descend,
                );
                result.logical_rec = result.logical_rec.union(&line_box);
                result.line_count += 1;
                callbacks.line_broken(byte_index, position, kind);
            }
        }
    }

    let session = events.session();
    result.end_position = session.position();
    result.invalid_utf8 = session.invalid_utf8();
    if let FlowStatus::Truncated { written, needed } = result.status() {
        debug!(
            "glyph flow: glyph store full, wrote {} of {} glyphs",
            written, needed
        );
    }
    result
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowError {
    /// The glyph buffer for a full layout could not be allocated.
    FailedToAllocateMemory { glyphs: usize },
}

impl fmt::Display for FlowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FailedToAllocateMemory { glyphs } => {
                write!(f, "failed to allocate layout buffer for {} glyphs", glyphs)
            }
        }
    }
}

impl std::error::Error for FlowError {}

/// Owned result of [`layout_text`].
#[derive(Clone, Debug, PartialEq)]
pub struct TextLayout {
    pub flow: FlowResult,
    pub glyphs: Vec<FlowGlyph>,
}

/// Lay out a whole text into a freshly allocated glyph buffer sized to its
/// codepoint count.
pub fn layout_text<P: GlyphProvider + ?Sized>(
    session: FlowSession<'_, P>,
) -> Result<TextLayout, FlowError> {
    let needed = session.text().codepoint_count();
    let mut glyphs = Vec::new();
    glyphs
        .try_reserve_exact(needed)
        .map_err(|_| FlowError::FailedToAllocateMemory { glyphs: needed })?;
    glyphs.resize(needed, FlowGlyph::default());

    let flow = do_flow(session, &mut (), glyphs.as_mut_slice());
    glyphs.truncate(flow.glyphs_written);
    Ok(TextLayout { flow, glyphs })
}
