//! Symbol pool: an arena of entities plus a free-list of reusable indices.
//!
//! Exploded symbols are released here instead of being dropped, and later
//! spins and refills reuse them. The arena grows on demand and never shrinks,
//! so acquisition cannot fail.
//!
//! # Invariants
//!
//! - An id is never simultaneously on the free list and in a column slot.
//! - `live_count() + free_count()` equals the arena size at all times, so
//!   the sum is conserved across any acquire/release sequence.
//! - Every field of a reused symbol is reset at *acquire* time; release only
//!   hides the symbol and clears its highlight.
//!
//! # Example
//!
//! ```
//! use tumble_core::grid::TypeCode;
//! use tumble_core::pool::SymbolPool;
//!
//! let mut pool = SymbolPool::new();
//! let id = pool.acquire(TypeCode::new('3'));
//! assert_eq!(pool.live_count(), 1);
//!
//! pool.release(id);
//! assert_eq!(pool.free_count(), 1);
//!
//! // The same arena slot comes back, re-skinned and fully reset.
//! let reused = pool.acquire(TypeCode::new('7'));
//! assert_eq!(reused, id);
//! assert_eq!(pool.get(reused).type_code(), TypeCode::new('7'));
//! ```

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::grid::TypeCode;
use crate::symbol::{Symbol, SymbolId};

/// Arena + free-list lifecycle manager for [`Symbol`] entities.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SymbolPool {
    arena: Vec<Symbol>,
    free: Vec<SymbolId>,
}

impl SymbolPool {
    /// Creates an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a symbol of the given type, reusing a free arena slot when
    /// one exists.
    ///
    /// The returned symbol is visible, unhighlighted, fully opaque, at unit
    /// scale and offset zero, regardless of its previous life.
    pub fn acquire(&mut self, type_code: TypeCode) -> SymbolId {
        if let Some(id) = self.free.pop() {
            self.arena[id.index()].reset(type_code);
            trace!(id = %id, %type_code, "symbol reused from pool");
            return id;
        }
        let id = SymbolId::new(u32::try_from(self.arena.len()).expect("arena index fits u32"));
        self.arena.push(Symbol::new(type_code));
        trace!(id = %id, %type_code, "symbol allocated");
        id
    }

    /// Returns a symbol to the free list.
    ///
    /// The symbol is hidden and its highlight cleared so a consumer holding
    /// a stale id cannot draw it; everything else is reset on the next
    /// acquire.
    ///
    /// # Panics
    ///
    /// Panics if `id` is already free — double release means two owners
    /// believed they held the symbol.
    pub fn release(&mut self, id: SymbolId) {
        assert!(
            !self.free.contains(&id),
            "symbol {id} released while already free"
        );
        let symbol = &mut self.arena[id.index()];
        symbol.set_highlight(false);
        symbol.set_visible(false);
        symbol.set_alpha(0.0);
        self.free.push(id);
        trace!(id = %id, free = self.free.len(), "symbol released");
    }

    /// Returns a reference to a symbol.
    ///
    /// # Panics
    ///
    /// Panics if `id` was never handed out by this pool.
    #[must_use]
    pub fn get(&self, id: SymbolId) -> &Symbol {
        &self.arena[id.index()]
    }

    /// Returns a mutable reference to a symbol.
    ///
    /// # Panics
    ///
    /// Panics if `id` was never handed out by this pool.
    #[must_use]
    pub fn get_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.arena[id.index()]
    }

    /// Number of symbols currently free for reuse. Diagnostic only.
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Number of symbols currently owned by column slots.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.arena.len() - self.free.len()
    }

    /// Total arena size (live + free).
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.arena.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(c: char) -> TypeCode {
        TypeCode::new(c)
    }

    #[test]
    fn acquire_allocates_sequential_ids() {
        let mut pool = SymbolPool::new();
        assert_eq!(pool.acquire(code('1')), SymbolId::new(0));
        assert_eq!(pool.acquire(code('2')), SymbolId::new(1));
        assert_eq!(pool.live_count(), 2);
        assert_eq!(pool.free_count(), 0);
    }

    #[test]
    fn release_then_acquire_reuses_the_slot() {
        let mut pool = SymbolPool::new();
        let a = pool.acquire(code('1'));
        let b = pool.acquire(code('2'));
        pool.release(a);

        let c = pool.acquire(code('3'));
        assert_eq!(c, a);
        assert_ne!(c, b);
        assert_eq!(pool.capacity(), 2);
    }

    #[test]
    fn released_symbol_is_hidden() {
        let mut pool = SymbolPool::new();
        let id = pool.acquire(code('5'));
        pool.get_mut(id).set_highlight(true);
        pool.release(id);

        let symbol = pool.get(id);
        assert!(!symbol.is_visible());
        assert!(!symbol.is_highlighted());
        assert_eq!(symbol.alpha(), 0.0);
    }

    #[test]
    fn acquire_resets_stale_state() {
        let mut pool = SymbolPool::new();
        let id = pool.acquire(code('5'));
        pool.get_mut(id).set_scale(0.1);
        pool.get_mut(id).set_offset(-4.0);
        pool.release(id);

        let id = pool.acquire(code('8'));
        let symbol = pool.get(id);
        assert_eq!(symbol.type_code(), code('8'));
        assert!(symbol.is_visible());
        assert_eq!(symbol.scale(), 1.0);
        assert_eq!(symbol.offset(), 0.0);
        assert_eq!(symbol.alpha(), 1.0);
    }

    #[test]
    #[should_panic(expected = "released while already free")]
    fn double_release_panics() {
        let mut pool = SymbolPool::new();
        let id = pool.acquire(code('1'));
        pool.release(id);
        pool.release(id);
    }

    mod conservation {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// live + free always equals the arena size, for any interleaving
            /// of acquires and releases.
            #[test]
            fn live_plus_free_is_conserved(ops in proptest::collection::vec(any::<bool>(), 1..200)) {
                let mut pool = SymbolPool::new();
                let mut live: Vec<SymbolId> = Vec::new();

                for acquire in ops {
                    if acquire || live.is_empty() {
                        live.push(pool.acquire(TypeCode::new('0')));
                    } else {
                        pool.release(live.pop().unwrap());
                    }
                    prop_assert_eq!(pool.live_count(), live.len());
                    prop_assert_eq!(pool.live_count() + pool.free_count(), pool.capacity());
                }
            }
        }
    }
}
