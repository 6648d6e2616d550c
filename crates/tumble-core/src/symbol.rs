//! Symbol entities: the mutable tokens that live in column slots.
//!
//! A [`Symbol`] carries a type code plus the visual state the consumer-facing
//! layer draws from (visibility, highlight, alpha, scale, and an animated
//! vertical offset in row units). Symbols are identified by [`SymbolId`]
//! arena indices and owned either by exactly one column slot or by the pool's
//! free list — never both.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::grid::TypeCode;

/// Arena index of a symbol entity.
///
/// Ids are stable for the lifetime of the pool: releasing a symbol returns
/// its index to the free list, and a later acquire may hand the same id back
/// out with every field reset.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SymbolId(u32);

impl SymbolId {
    /// Creates an id from a raw arena index.
    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw arena index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SymbolId({})", self.0)
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

bitflags! {
    /// Boolean visual state of a symbol.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct SymbolFlags: u8 {
        /// The symbol is drawn and counts as occupying its slot.
        const VISIBLE = 1;
        /// The symbol is outlined as part of a matched cluster.
        const HIGHLIGHT = 1 << 1;
    }
}

/// A grid token with animated visual state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    type_code: TypeCode,
    flags: SymbolFlags,
    alpha: f32,
    scale: f32,
    /// Vertical position in row units, 0.0 at the top visible row. Negative
    /// while spawned above the window, animated downward by drops.
    offset: f32,
}

impl Symbol {
    /// Creates a fresh, visible symbol of the given type at offset 0.
    #[must_use]
    pub fn new(type_code: TypeCode) -> Self {
        Self {
            type_code,
            flags: SymbolFlags::VISIBLE,
            alpha: 1.0,
            scale: 1.0,
            offset: 0.0,
        }
    }

    /// Resets every field for reuse as a `type_code` token.
    ///
    /// Called at acquire time, not release time, so stale state from the
    /// previous owner can never leak into a new one.
    pub fn reset(&mut self, type_code: TypeCode) {
        self.type_code = type_code;
        self.flags = SymbolFlags::VISIBLE;
        self.alpha = 1.0;
        self.scale = 1.0;
        self.offset = 0.0;
    }

    /// Returns the current type code.
    #[must_use]
    pub const fn type_code(&self) -> TypeCode {
        self.type_code
    }

    /// Re-skins the symbol without touching other state.
    pub fn set_type_code(&mut self, type_code: TypeCode) {
        self.type_code = type_code;
    }

    /// Returns true if the symbol is drawn and occupies its slot.
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        self.flags.contains(SymbolFlags::VISIBLE)
    }

    /// Shows or hides the symbol.
    pub fn set_visible(&mut self, visible: bool) {
        self.flags.set(SymbolFlags::VISIBLE, visible);
    }

    /// Returns true if the symbol is highlighted as part of a match.
    #[must_use]
    pub const fn is_highlighted(&self) -> bool {
        self.flags.contains(SymbolFlags::HIGHLIGHT)
    }

    /// Sets or clears the match highlight.
    pub fn set_highlight(&mut self, on: bool) {
        self.flags.set(SymbolFlags::HIGHLIGHT, on);
    }

    /// Current opacity in `[0, 1]`.
    #[must_use]
    pub const fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Sets the opacity.
    pub fn set_alpha(&mut self, alpha: f32) {
        self.alpha = alpha;
    }

    /// Current scale factor.
    #[must_use]
    pub const fn scale(&self) -> f32 {
        self.scale
    }

    /// Sets the scale factor.
    pub fn set_scale(&mut self, scale: f32) {
        self.scale = scale;
    }

    /// Current vertical offset in row units.
    #[must_use]
    pub const fn offset(&self) -> f32 {
        self.offset
    }

    /// Moves the symbol vertically.
    pub fn set_offset(&mut self, offset: f32) {
        self.offset = offset;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_symbol_is_visible_and_unhighlighted() {
        let symbol = Symbol::new(TypeCode::new('3'));
        assert!(symbol.is_visible());
        assert!(!symbol.is_highlighted());
        assert_eq!(symbol.alpha(), 1.0);
        assert_eq!(symbol.scale(), 1.0);
        assert_eq!(symbol.offset(), 0.0);
    }

    #[test]
    fn reset_clears_every_field() {
        let mut symbol = Symbol::new(TypeCode::new('3'));
        symbol.set_visible(false);
        symbol.set_highlight(true);
        symbol.set_alpha(0.2);
        symbol.set_scale(0.1);
        symbol.set_offset(-3.0);

        symbol.reset(TypeCode::new('7'));

        assert_eq!(symbol.type_code(), TypeCode::new('7'));
        assert!(symbol.is_visible());
        assert!(!symbol.is_highlighted());
        assert_eq!(symbol.alpha(), 1.0);
        assert_eq!(symbol.scale(), 1.0);
        assert_eq!(symbol.offset(), 0.0);
    }

    #[test]
    fn flags_toggle_independently() {
        let mut symbol = Symbol::new(TypeCode::new('0'));
        symbol.set_highlight(true);
        assert!(symbol.is_visible());
        symbol.set_visible(false);
        assert!(symbol.is_highlighted());
    }

    #[test]
    fn id_round_trips_index() {
        let id = SymbolId::new(42);
        assert_eq!(id.index(), 42);
        assert_eq!(format!("{id:?}"), "SymbolId(42)");
    }

    #[test]
    fn serialization_roundtrip() {
        let mut symbol = Symbol::new(TypeCode::new('K'));
        symbol.set_highlight(true);
        let json = serde_json::to_string(&symbol).unwrap();
        let back: Symbol = serde_json::from_str(&json).unwrap();
        assert_eq!(symbol, back);
    }
}
