//! Fitting text into a width by replacing removed characters with an ellipsis.

use crate::flow_engine::{FlowConfig, FlowSession};
use crate::flow_layout::{do_flow, FlowGlyph};
use crate::geom::Vec2;
use crate::glyph_provider::GlyphProvider;
use crate::rich_text::RichText;
use crate::style::FontStyleFlags;
use crate::text_measure::measure_text_ex;

/// Parts of a shortened text. The ellipsis goes between `before` and `after`
/// when `removed > 0`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Shortened<'t> {
    /// Number of characters removed.
    pub removed: usize,
    pub before: &'t str,
    pub after: &'t str,
}

impl Shortened<'_> {
    pub fn join(&self, ellipsis: &str) -> String {
        let mut out = String::with_capacity(self.before.len() + ellipsis.len() + self.after.len());
        out.push_str(self.before);
        if self.removed > 0 {
            out.push_str(ellipsis);
        }
        out.push_str(self.after);
        out
    }
}

/// Remove characters around `ellipsis_index` until the left part, the
/// ellipsis and the right part fit in `max_width`.
///
/// Characters are removed alternately from the left part (nearest to the
/// split first) and the right part, starting on the left. A side that runs
/// empty stops taking turns. `scratch` receives the glyphs of the full text.
///
/// # Panics
///
/// Panics if `ellipsis_index` is not a char boundary of `text`, `max_width`
/// is NaN or positive infinity, or `scratch` holds fewer entries than `text`
/// has characters.
#[allow(clippy::too_many_arguments)]
pub fn shorten_text_to_fit_width_ex<'t, P: GlyphProvider + ?Sized>(
    provider: &P,
    font_size: f32,
    flags: FontStyleFlags,
    text: &'t str,
    max_width: f32,
    ellipsis: &str,
    ellipsis_index: usize,
    scratch: &mut [FlowGlyph],
) -> Shortened<'t> {
    assert!(
        text.is_char_boundary(ellipsis_index),
        "ellipsis index {} is not a char boundary of a {} byte text",
        ellipsis_index,
        text.len()
    );
    assert!(
        max_width.is_finite() || max_width < 0.0,
        "max width must be finite, got {}",
        max_width
    );
    let rich = RichText::plain(text);
    let needed = rich.codepoint_count();
    assert!(
        scratch.len() >= needed,
        "shortening scratch holds {} glyphs, text needs {}",
        scratch.len(),
        needed
    );

    if max_width <= 0.0 {
        return Shortened {
            removed: needed,
            before: "",
            after: "",
        };
    }

    // Widths below are read off one row of glyphs, so newlines must not break.
    let config = FlowConfig::for_font_size(font_size)
        .with_style_flags(flags)
        .with_single_line(true);
    let flow = do_flow(
        FlowSession::new(provider, rich, Vec2::ZERO, config),
        &mut (),
        &mut *scratch,
    );
    if flow.logical_rec.width <= max_width {
        return Shortened {
            removed: 0,
            before: text,
            after: "",
        };
    }

    let glyphs = &scratch[..flow.glyphs_written];
    let glyph_at = |byte_index: usize| {
        glyphs
            .binary_search_by_key(&byte_index, |glyph| glyph.byte_index)
            .ok()
            .map(|i| &glyphs[i])
    };
    let left_edge = flow.logical_rec.x;
    let right_edge = flow.logical_rec.right();
    let ellipsis_width = if ellipsis.is_empty() {
        0.0
    } else {
        measure_text_ex(provider, font_size, flags, ellipsis, false).width()
    };

    let mut left_end = ellipsis_index;
    let mut right_start = ellipsis_index;
    let mut left_width = glyphs
        .iter()
        .rev()
        .find(|glyph| glyph.byte_index < left_end)
        .map_or(0.0, |glyph| glyph.draw_rec.right() - left_edge);
    let mut right_width = glyphs
        .iter()
        .find(|glyph| glyph.byte_index >= right_start)
        .map_or(0.0, |glyph| right_edge - glyph.draw_rec.x);

    let mut removed = 0usize;
    let mut take_left = true;
    while left_width + ellipsis_width + right_width > max_width {
        let left_open = left_end > 0;
        let right_open = right_start < text.len();
        if !left_open && !right_open {
            break;
        }
        if (take_left && !left_open) || (!take_left && !right_open) {
            take_left = !take_left;
        }

        if take_left {
            let Some((index, _)) = text[..left_end].char_indices().next_back() else {
                break;
            };
            if let Some(glyph) = glyph_at(index) {
                left_width = glyph.draw_rec.x - left_edge;
            }
            left_end = index;
        } else {
            let Some(ch) = text[right_start..].chars().next() else {
                break;
            };
            if let Some(glyph) = glyph_at(right_start) {
                right_width = right_edge - glyph.draw_rec.right();
            }
            right_start += ch.len_utf8();
        }
        removed += 1;
        take_left = !take_left;
    }

    Shortened {
        removed,
        before: &text[..left_end],
        after: &text[right_start..],
    }
}

/// Shorten `text` around `ellipsis_index` and return the joined result.
pub fn shorten_text_to_fit_width<P: GlyphProvider + ?Sized>(
    provider: &P,
    font_size: f32,
    flags: FontStyleFlags,
    text: &str,
    max_width: f32,
    ellipsis: &str,
    ellipsis_index: usize,
) -> String {
    let mut scratch = vec![FlowGlyph::default(); RichText::plain(text).codepoint_count()];
    shorten_text_to_fit_width_ex(
        provider,
        font_size,
        flags,
        text,
        max_width,
        ellipsis,
        ellipsis_index,
        &mut scratch,
    )
    .join(ellipsis)
}

/// Keep the end of `text`, cutting from the start.
pub fn shorten_text_start_to_fit_width<P: GlyphProvider + ?Sized>(
    provider: &P,
    font_size: f32,
    flags: FontStyleFlags,
    text: &str,
    max_width: f32,
    ellipsis: &str,
) -> String {
    shorten_text_to_fit_width(provider, font_size, flags, text, max_width, ellipsis, 0)
}

/// Keep the start of `text`, cutting from the end.
pub fn shorten_text_end_to_fit_width<P: GlyphProvider + ?Sized>(
    provider: &P,
    font_size: f32,
    flags: FontStyleFlags,
    text: &str,
    max_width: f32,
    ellipsis: &str,
) -> String {
    shorten_text_to_fit_width(provider, font_size, flags, text, max_width, ellipsis, text.len())
}

/// Shorten a path, cutting from the middle of its directory part so that
/// the file name survives longest. Both `/` and `\` separate components.
pub fn shorten_file_path_to_fit_width<P: GlyphProvider + ?Sized>(
    provider: &P,
    font_size: f32,
    flags: FontStyleFlags,
    path: &str,
    max_width: f32,
    ellipsis: &str,
) -> String {
    let name_start = path
        .rfind(|c: char| c == '/' || c == '\\')
        .map_or(0, |separator| separator + 1);
    let mut split = name_start / 2;
    while !path.is_char_boundary(split) {
        split -= 1;
    }
    shorten_text_to_fit_width(provider, font_size, flags, path, max_width, ellipsis, split)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text_measure::measure_text;
    use crate::testing::FixedProvider;

    const ELLIPSIS: &str = "\u{2026}";

    fn shorten(text: &str, max_width: f32, index: usize) -> String {
        shorten_text_to_fit_width(
            &FixedProvider::default(),
            10.0,
            FontStyleFlags::NONE,
            text,
            max_width,
            ELLIPSIS,
            index,
        )
    }

    #[test]
    fn fitting_text_is_unchanged() {
        assert_eq!(shorten("hello", 30.0, 2), "hello");
    }

    #[test]
    fn removes_alternately_around_split() {
        assert_eq!(shorten("abcdefghij", 36.0, 5), "ab\u{2026}hij");
    }

    #[test]
    fn shortened_text_fits() {
        let provider = FixedProvider::default();
        for max_width in [7.0, 13.0, 25.0, 40.0, 55.0] {
            let out = shorten("abcdefghij", max_width, 4);
            assert!(
                measure_text(&provider, &out).width() <= max_width,
                "{out:?} does not fit {max_width}"
            );
        }
    }

    #[test]
    fn start_and_end_variants_keep_opposite_sides() {
        let provider = FixedProvider::default();
        let flags = FontStyleFlags::NONE;
        assert_eq!(
            shorten_text_start_to_fit_width(&provider, 10.0, flags, "abcdef", 24.0, ELLIPSIS),
            "\u{2026}def"
        );
        assert_eq!(
            shorten_text_end_to_fit_width(&provider, 10.0, flags, "abcdef", 24.0, ELLIPSIS),
            "abc\u{2026}"
        );
    }

    #[test]
    fn non_positive_width_removes_everything() {
        let mut scratch = [FlowGlyph::default(); 4];
        let out = shorten_text_to_fit_width_ex(
            &FixedProvider::default(),
            10.0,
            FontStyleFlags::NONE,
            "abcd",
            0.0,
            ELLIPSIS,
            2,
            &mut scratch,
        );
        assert_eq!(
            out,
            Shortened {
                removed: 4,
                before: "",
                after: ""
            }
        );
        assert_eq!(out.join(ELLIPSIS), ELLIPSIS);
    }

    #[test]
    fn file_path_keeps_file_name() {
        let provider = FixedProvider::default();
        let out = shorten_file_path_to_fit_width(
            &provider,
            10.0,
            FontStyleFlags::NONE,
            "/home/user/docs/notes.txt",
            90.0,
            ELLIPSIS,
        );
        assert!(out.ends_with("notes.txt"), "{out:?}");
        assert!(out.contains(ELLIPSIS));
        assert!(measure_text(&provider, &out).width() <= 90.0);
    }

    #[test]
    fn embedded_newline_is_measured_as_one_row() {
        let provider = FixedProvider::default();
        let out = shorten("abcdef\nghijkl", 30.0, 13);
        assert_eq!(out, "abcd\u{2026}");
        assert!(measure_text(&provider, &out).width() <= 30.0);
    }

    #[test]
    #[should_panic(expected = "max width")]
    fn nan_width_panics() {
        let _ = shorten("abcdefgh", f32::NAN, 4);
    }

    #[test]
    fn negative_infinite_width_removes_everything() {
        assert_eq!(shorten("abcd", f32::NEG_INFINITY, 2), ELLIPSIS);
    }

    #[test]
    #[should_panic(expected = "scratch")]
    fn short_scratch_panics() {
        let mut scratch = [FlowGlyph::default(); 2];
        let _ = shorten_text_to_fit_width_ex(
            &FixedProvider::default(),
            10.0,
            FontStyleFlags::NONE,
            "abcd",
            10.0,
            ELLIPSIS,
            2,
            &mut scratch,
        );
    }
}
