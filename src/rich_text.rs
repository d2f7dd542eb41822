//! Rich text model: raw bytes split into pieces that each carry one style change.

use smallvec::SmallVec;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::style::StyleChange;

/// One contiguous byte range sharing a style change applied at its start.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RichPiece {
    pub start: usize,
    pub end: usize,
    pub style_change: StyleChange,
}

impl RichPiece {
    pub const fn new(start: usize, end: usize, style_change: StyleChange) -> Self {
        Self {
            start,
            end,
            style_change,
        }
    }

    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Pieces<'a> {
    Single(RichPiece),
    Many(&'a [RichPiece]),
}

/// Borrowed rich text view consumed by the flow engine.
///
/// Bytes are not required to be valid UTF-8; malformed sequences are laid
/// out as single-byte codepoints.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RichText<'a> {
    bytes: &'a [u8],
    pieces: Pieces<'a>,
}

impl<'a> RichText<'a> {
    /// Unstyled text as a single piece.
    pub fn plain(text: &'a str) -> Self {
        Self::styled_bytes(text.as_bytes(), StyleChange::None)
    }

    /// Raw bytes as a single unstyled piece.
    pub fn from_bytes(bytes: &'a [u8]) -> Self {
        Self::styled_bytes(bytes, StyleChange::None)
    }

    /// Whole text with one style change at its start.
    pub fn styled(text: &'a str, change: StyleChange) -> Self {
        Self::styled_bytes(text.as_bytes(), change)
    }

    fn styled_bytes(bytes: &'a [u8], change: StyleChange) -> Self {
        Self {
            bytes,
            pieces: Pieces::Single(RichPiece::new(0, bytes.len(), change)),
        }
    }

    /// Text with explicit pieces.
    ///
    /// # Panics
    ///
    /// Panics unless `pieces` are ordered and cover `bytes` exactly once.
    pub fn with_pieces(bytes: &'a [u8], pieces: &'a [RichPiece]) -> Self {
        let mut cursor = 0usize;
        for piece in pieces {
            assert!(
                piece.start == cursor && piece.end >= piece.start,
                "rich text piece {}..{} does not continue at byte {}",
                piece.start,
                piece.end,
                cursor
            );
            cursor = piece.end;
        }
        assert!(
            cursor == bytes.len(),
            "rich text pieces cover {} of {} bytes",
            cursor,
            bytes.len()
        );
        Self {
            bytes,
            pieces: Pieces::Many(pieces),
        }
    }

    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn piece_count(&self) -> usize {
        match self.pieces {
            Pieces::Single(_) => 1,
            Pieces::Many(pieces) => pieces.len(),
        }
    }

    /// Piece at `index`. Out-of-range indices yield an empty trailing piece.
    pub fn piece(&self, index: usize) -> RichPiece {
        let found = match self.pieces {
            Pieces::Single(piece) => (index == 0).then_some(piece),
            Pieces::Many(pieces) => pieces.get(index).copied(),
        };
        found.unwrap_or(RichPiece::new(self.len(), self.len(), StyleChange::None))
    }

    pub fn piece_bytes(&self, index: usize) -> &'a [u8] {
        let piece = self.piece(index);
        &self.bytes[piece.start..piece.end]
    }

    /// Number of decoded codepoints, counting malformed bytes individually.
    pub fn codepoint_count(&self) -> usize {
        let mut count = 0usize;
        let mut index = 0usize;
        while index < self.bytes.len() {
            index += decode_utf8(self.bytes, index).map_or(1, |(_, size)| size);
            count += 1;
        }
        count
    }

    /// Skip a run of non-newline whitespace starting at `index`, then at most
    /// one newline. Returns the byte index after the swallowed run.
    pub(crate) fn skip_break_whitespace(&self, mut index: usize) -> usize {
        while let Some((codepoint, size)) = decode_utf8(self.bytes, index) {
            if codepoint == '\n' as u32 {
                return index + size;
            }
            if !is_whitespace(codepoint) {
                break;
            }
            index += size;
        }
        index
    }
}

/// Owned rich text assembled piece by piece.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RichTextBuf {
    bytes: Vec<u8>,
    pieces: SmallVec<[RichPiece; 4]>,
}

impl RichTextBuf {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `text` as a new piece that starts with `change`.
    pub fn push(&mut self, text: &str, change: StyleChange) -> &mut Self {
        self.push_bytes(text.as_bytes(), change)
    }

    pub fn push_bytes(&mut self, bytes: &[u8], change: StyleChange) -> &mut Self {
        let start = self.bytes.len();
        self.bytes.extend_from_slice(bytes);
        self.pieces
            .push(RichPiece::new(start, self.bytes.len(), change));
        self
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_rich(&self) -> RichText<'_> {
        RichText {
            bytes: &self.bytes,
            pieces: Pieces::Many(&self.pieces),
        }
    }
}

/// Decode one UTF-8 codepoint at `index`.
///
/// Returns `None` at the end of `bytes` and for malformed or truncated
/// sequences.
pub fn decode_utf8(bytes: &[u8], index: usize) -> Option<(u32, usize)> {
    let lead = *bytes.get(index)?;
    let size = match lead {
        0x00..=0x7F => return Some((lead as u32, 1)),
        0xC2..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF4 => 4,
        _ => return None,
    };
    let chunk = bytes.get(index..index + size)?;
    let decoded = core::str::from_utf8(chunk).ok()?;
    decoded.chars().next().map(|ch| (ch as u32, size))
}

/// Whitespace used for word boundaries and wrap swallowing.
pub fn is_whitespace(codepoint: u32) -> bool {
    char::from_u32(codepoint).is_some_and(char::is_whitespace)
}

/// Codepoints that move the cursor without resolving a glyph.
pub fn is_line_control(codepoint: u32) -> bool {
    codepoint == '\n' as u32 || codepoint == '\r' as u32
}
