// this_file: src/pending.rs

//! Drawables handed to the presentation layer and not yet safe to reuse.
//!
//! Entries are addressed by a generation-indexed [`PendingHandle`]. Removing
//! an entry, or clearing the whole set, bumps the slot generation, so a
//! completion signal carrying an old handle can never resolve to a drawable
//! submitted later into the same slot.

use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Stable identity of one in-flight drawable
    pub struct PendingHandle;
}

/// In-flight drawables keyed by handle
#[derive(Debug)]
pub struct PendingSet<R> {
    entries: SlotMap<PendingHandle, R>,
}

impl<R> Default for PendingSet<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> PendingSet<R> {
    pub fn new() -> Self {
        Self {
            entries: SlotMap::with_key(),
        }
    }

    /// Store `resource` under a fresh handle. `arm` runs before the entry is
    /// stored and receives the handle, so the completion signal can be wired
    /// to it.
    pub fn insert_with<F>(&mut self, mut resource: R, arm: F) -> PendingHandle
    where
        F: FnOnce(PendingHandle, &mut R),
    {
        self.entries.insert_with_key(|handle| {
            arm(handle, &mut resource);
            resource
        })
    }

    /// Take the entry for `handle`. Unknown or stale handles yield `None`.
    pub fn remove(&mut self, handle: PendingHandle) -> Option<R> {
        self.entries.remove(handle)
    }

    pub fn contains(&self, handle: PendingHandle) -> bool {
        self.entries.contains_key(handle)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry and invalidate every outstanding handle. Returns how
    /// many entries were dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.entries.len();
        self.entries.clear();
        dropped
    }
}
