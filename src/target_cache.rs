// this_file: src/target_cache.rs

//! Render targets cached per logical view.
//!
//! Many independent views (platform overlays, embedded native views) each need
//! a render target every frame. A target is only compatible with the view and
//! size it was created for, so targets are keyed by [`TargetDescriptor`] and
//! kept on a LIFO stack per descriptor.
//!
//! Targets that fail the caller's availability test while being looked up are
//! dropped rather than pushed back. That favours lookup throughput over reuse:
//! a target whose GPU work has not retired yet is lost even if it would have
//! been usable a moment later.

use crate::free_list::KeyedFreeList;
use crate::resource::{Resource, Size};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Identity of one logical view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
pub struct ViewId(pub i64);

/// Reuse-compatibility key for cached targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetDescriptor {
    pub view: ViewId,
    pub size: Size,
}

impl TargetDescriptor {
    pub fn new(view: ViewId, size: Size) -> Self {
        Self { view, size }
    }
}

/// What a view needs this frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewRequest {
    /// Size of the target the view would paint into
    pub size: Size,
    /// Views whose content is unchanged are skipped
    pub needs_render: bool,
}

/// Result of [`RenderTargetCache::take_existing_targets`]
#[derive(Debug)]
pub struct CacheLookup<T> {
    /// Views that got a cached target
    pub resolved: HashMap<ViewId, T>,
    /// Views that need rendering but found nothing usable
    pub unmatched: HashSet<ViewId>,
}

impl<T> Default for CacheLookup<T> {
    fn default() -> Self {
        Self {
            resolved: HashMap::new(),
            unmatched: HashSet::new(),
        }
    }
}

/// Descriptor-keyed LIFO cache of render targets
#[derive(Debug)]
pub struct RenderTargetCache<T> {
    stacks: KeyedFreeList<TargetDescriptor, T>,
}

impl<T: Resource> Default for RenderTargetCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Resource> RenderTargetCache<T> {
    pub fn new() -> Self {
        Self {
            stacks: KeyedFreeList::unbounded(),
        }
    }

    /// Claim one cached target for every view that needs rendering.
    ///
    /// For each such view, targets are popped off its descriptor's stack until
    /// one passes `is_available`; that one is claimed. Targets that fail are
    /// dropped. Views left without a target are reported in `unmatched`.
    /// Views that do not need rendering are skipped entirely.
    pub fn take_existing_targets<'a, I, P>(
        &mut self,
        pending_views: I,
        mut is_available: P,
    ) -> CacheLookup<T>
    where
        I: IntoIterator<Item = (&'a ViewId, &'a ViewRequest)>,
        P: FnMut(&T) -> bool,
    {
        let mut lookup = CacheLookup::default();
        let mut dropped = 0usize;

        for (&view, request) in pending_views {
            if !request.needs_render {
                continue;
            }
            let descriptor = TargetDescriptor::new(view, request.size);
            let mut claimed = None;
            while let Some(target) = self.stacks.pop(&descriptor) {
                if is_available(&target) {
                    claimed = Some(target);
                    break;
                }
                dropped += 1;
            }
            match claimed {
                Some(target) => {
                    lookup.resolved.insert(view, target);
                }
                None => {
                    lookup.unmatched.insert(view);
                }
            }
        }

        if dropped > 0 {
            debug!("Dropped {} cached render target(s) that were not available", dropped);
        }
        lookup
    }

    /// Return `target` to the cache under `(view, target.size())`
    pub fn cache_render_target(&mut self, view: ViewId, target: T) {
        let descriptor = TargetDescriptor::new(view, target.size());
        let rejected = self.stacks.push(descriptor, target);
        debug_assert!(rejected.is_none(), "unbounded target cache rejected a push");
    }

    /// Empty the cache, handing every target to the caller for deferred
    /// destruction
    pub fn clear_all_render_targets(&mut self) -> Vec<T> {
        let targets = self.stacks.drain();
        debug!("Cleared {} cached render target(s)", targets.len());
        targets
    }

    /// Total targets across all descriptors
    pub fn cached_targets_count(&self) -> usize {
        self.stacks.len()
    }

    /// Targets cached for one descriptor
    pub fn cached_count_for(&self, descriptor: &TargetDescriptor) -> usize {
        self.stacks.len_for(descriptor)
    }
}
