//! Inline text style: colors, style flags, style changes and the resolved active style.

use core::fmt;
use core::ops::{BitOr, BitOrAssign};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 8-bit RGBA color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Color32 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color32 {
    pub const WHITE: Self = Self::rgba(255, 255, 255, 255);
    pub const BLACK: Self = Self::rgba(0, 0, 0, 255);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 255)
    }

    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    /// Perceptual luma in `0..=255`.
    pub fn luma(self) -> u8 {
        let y = 0.299 * self.r as f32 + 0.587 * self.g as f32 + 0.114 * self.b as f32;
        y.round().clamp(0.0, 255.0) as u8
    }
}

impl Default for Color32 {
    fn default() -> Self {
        Self::WHITE
    }
}

/// Bit set of font style flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FontStyleFlags(u8);

impl FontStyleFlags {
    pub const NONE: Self = Self(0x00);
    pub const BOLD: Self = Self(0x01);
    pub const ITALIC: Self = Self(0x02);
    pub const INVERTED: Self = Self(0x04);
    pub const UNDERLINE: Self = Self(0x08);
    pub const STRIKETHROUGH: Self = Self(0x10);
    pub const OUTLINE: Self = Self(0x20);
    pub const HIGHLIGHTED: Self = Self(0x40);
    pub const COLORED_GLYPHS: Self = Self(0x80);
    pub const ALL: Self = Self(0xFF);
    /// Flags that select which baked atlas a glyph comes from.
    pub const ATLAS_FLAGS: Self = Self(0x01 | 0x02 | 0x04);

    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, other: Self) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    pub const fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }
}

impl BitOr for FontStyleFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitOrAssign for FontStyleFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.insert(rhs);
    }
}

impl fmt::Display for FontStyleFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(FontStyleFlags, &str); 8] = [
            (FontStyleFlags::BOLD, "bold"),
            (FontStyleFlags::ITALIC, "italic"),
            (FontStyleFlags::INVERTED, "inverted"),
            (FontStyleFlags::UNDERLINE, "underline"),
            (FontStyleFlags::STRIKETHROUGH, "strikethrough"),
            (FontStyleFlags::OUTLINE, "outline"),
            (FontStyleFlags::HIGHLIGHTED, "highlighted"),
            (FontStyleFlags::COLORED_GLYPHS, "colored-glyphs"),
        ];
        if self.is_empty() {
            return f.write_str("none");
        }
        let mut first = true;
        for (flag, name) in NAMES {
            if self.contains(flag) {
                if !first {
                    f.write_str("|")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Style operation applied at the start of a rich text piece.
///
/// `None` payloads revert the property to the session's start style.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum StyleChange {
    #[default]
    None,
    FontSize(Option<f32>),
    FontStyle {
        enable: FontStyleFlags,
        disable: FontStyleFlags,
        /// Flags reset to their value in the start style.
        reset: FontStyleFlags,
    },
    /// Replace RGB, keep the current alpha.
    Color(Option<Color32>),
    ColorAndAlpha(Option<Color32>),
}

impl StyleChange {
    pub const fn enable(flags: FontStyleFlags) -> Self {
        Self::FontStyle {
            enable: flags,
            disable: FontStyleFlags::NONE,
            reset: FontStyleFlags::NONE,
        }
    }

    pub const fn disable(flags: FontStyleFlags) -> Self {
        Self::FontStyle {
            enable: FontStyleFlags::NONE,
            disable: flags,
            reset: FontStyleFlags::NONE,
        }
    }

    pub const fn reset(flags: FontStyleFlags) -> Self {
        Self::FontStyle {
            enable: FontStyleFlags::NONE,
            disable: FontStyleFlags::NONE,
            reset: flags,
        }
    }

    /// Whether a highlight span in progress must be closed before this change.
    pub fn splits_highlight_span(&self) -> bool {
        matches!(
            self,
            Self::FontSize(_) | Self::Color(_) | Self::ColorAndAlpha(_)
        )
    }
}

/// Resolved style in effect at the cursor.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ActiveStyle {
    pub font_size: f32,
    pub flags: FontStyleFlags,
    pub color: Color32,
}

impl ActiveStyle {
    pub const fn new(font_size: f32, flags: FontStyleFlags, color: Color32) -> Self {
        Self {
            font_size,
            flags,
            color,
        }
    }

    pub fn is_highlighted(&self) -> bool {
        self.flags.contains(FontStyleFlags::HIGHLIGHTED)
    }

    /// Apply `change` on top of this style. `start` supplies reset values.
    pub fn apply(&mut self, change: StyleChange, start: &ActiveStyle) {
        match change {
            StyleChange::None => {}
            StyleChange::FontSize(size) => self.font_size = size.unwrap_or(start.font_size),
            StyleChange::FontStyle {
                enable,
                disable,
                reset,
            } => {
                self.flags.insert(enable);
                self.flags.remove(disable);
                self.flags = self
                    .flags
                    .difference(reset)
                    .union(start.flags.intersection(reset));
            }
            StyleChange::Color(color) => {
                let alpha = self.color.a;
                self.color = color.unwrap_or(start.color).with_alpha(alpha);
            }
            StyleChange::ColorAndAlpha(color) => self.color = color.unwrap_or(start.color),
        }
    }

    /// Whether applying `change` would toggle `flag`.
    pub fn flag_changing(
        &self,
        change: StyleChange,
        start_flags: FontStyleFlags,
        flag: FontStyleFlags,
    ) -> bool {
        if flag.is_empty() {
            return false;
        }
        let StyleChange::FontStyle {
            enable,
            disable,
            reset,
        } = change
        else {
            return false;
        };
        let current = self.flags.contains(flag);
        if current && disable.contains(flag) {
            return true;
        }
        if !current && enable.contains(flag) {
            return true;
        }
        reset.contains(flag) && start_flags.contains(flag) != current
    }
}
