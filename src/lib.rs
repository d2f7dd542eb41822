//! Rich text flow for immediate-mode renderers.
//!
//! A [`FlowSession`] walks a [`RichText`] once, resolving glyphs through a
//! [`GlyphProvider`], wrapping lines and producing highlight rectangles ahead
//! of the glyphs drawn over them. [`do_flow`] drives a session to completion;
//! [`FlowSession::events`] exposes the same walk as a lazy iterator.
//! Measurement and ellipsis shortening are built on the same pass.

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

mod flow_engine;
mod flow_layout;
mod geom;
mod glyph_provider;
mod rich_text;
mod style;
mod text_measure;
mod text_shorten;

#[cfg(test)]
mod testing;

pub use flow_engine::{
    advance_one_line, compute_highlight_spans, find_wrap_point, FlowConfig, FlowEvent, FlowIter,
    FlowMode, FlowSession, HighlightSpans, LineBreakKind, PlacedGlyph, WrapPoint,
};
pub use flow_layout::{
    do_flow, layout_text, FlowCallbacks, FlowError, FlowGlyph, FlowResult, FlowStatus,
    GlyphStore, NoGlyphs, TextLayout,
};
pub use geom::{Rect, Vec2};
pub use glyph_provider::{
    same_font_scale, AtlasInfo, GlyphHit, GlyphMetrics, GlyphProvider, LineMetrics,
    SUBSTITUTE_CODEPOINTS,
};
pub use rich_text::{decode_utf8, is_line_control, is_whitespace, RichPiece, RichText, RichTextBuf};
pub use style::{ActiveStyle, Color32, FontStyleFlags, StyleChange};
pub use text_measure::{
    measure_rich_text, measure_rich_text_ex, measure_text, measure_text_ex, TextMeasure,
};
pub use text_shorten::{
    shorten_file_path_to_fit_width, shorten_text_end_to_fit_width,
    shorten_text_start_to_fit_width, shorten_text_to_fit_width, shorten_text_to_fit_width_ex,
    Shortened,
};
