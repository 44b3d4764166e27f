//! Atomically swappable snapshot cells.
//!
//! # Responsibilities
//! - Hold the single current compiled value of a config-derived artifact
//! - Publish replacements atomically (readers see old or new, never a mix)
//!
//! # Design Decisions
//! - arc-swap instead of RwLock: the request hot path only ever loads
//! - Values are immutable snapshots; an update is a whole-value replace
//! - No history: a superseded snapshot drops when its last reader is done

use std::sync::Arc;

use arc_swap::ArcSwap;

/// Holder for the current immutable snapshot of a compiled artifact
/// (resolver, auth provider set, sink provider).
///
/// A request in flight keeps whichever snapshot it loaded; a concurrent
/// store does not affect it.
#[derive(Debug)]
pub struct Atom<T> {
    cell: ArcSwap<T>,
}

impl<T> Atom<T> {
    /// Create an atom seeded with an initial value.
    pub fn new(value: T) -> Self {
        Self {
            cell: ArcSwap::from_pointee(value),
        }
    }

    /// Load the current snapshot.
    pub fn load(&self) -> Arc<T> {
        self.cell.load_full()
    }

    /// Replace the snapshot. The value must be fully computed before
    /// this call; concurrent readers keep the previous snapshot.
    pub fn store(&self, value: T) {
        self.cell.store(Arc::new(value));
    }
}
