// this_file: src/pool.rs

//! Frame-synchronized pool of backing-store drawables.
//!
//! A drawable is always owned by exactly one holder:
//!
//! - the free-list, idle and keyed by size,
//! - the pending set, handed to the presentation layer,
//! - the caller, between [`ResourcePool::acquire`] and [`ResourcePool::submit`].
//!
//! Ownership moves between them by value, so a drawable cannot be in two
//! places at once. The pool is driven from the thread that owns the GPU
//! context. Completion signals may fire on any thread; they only post a
//! handle onto a channel, and [`ResourcePool::drain_completions`] recycles
//! those handles on the owning thread.

use crate::config::PoolConfig;
use crate::error::{Error, Result};
use crate::free_list::KeyedFreeList;
use crate::pending::{PendingHandle, PendingSet};
use crate::resource::{Allocator, Resource, Size};
use crossbeam_channel::{Receiver, Sender};
use log::{debug, info, log_enabled, trace, warn, Level};
use serde::{Deserialize, Serialize};

/// Snapshot of pool occupancy and lifetime counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    /// Completed sweeps
    pub frame: u64,
    /// Idle drawables across all sizes
    pub idle: usize,
    /// Sizes with at least one idle drawable
    pub buckets: usize,
    /// Drawables waiting for their completion signal
    pub pending: usize,
    /// Drawables created by the allocator
    pub allocations: u64,
    /// Acquisitions served from the free-list
    pub reuses: u64,
    /// Drawables dropped because they were no longer valid
    pub discarded_invalid: u64,
    /// Drawables dropped because their bucket was full
    pub discarded_overflow: u64,
    /// Drawables dropped by the age sweep
    pub evicted: u64,
    /// Acquisitions that failed on allocation or sync flush
    pub acquire_failures: u64,
    /// Completion signals for handles no longer pending
    pub late_signals: u64,
}

/// What happened at the end of one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameReport {
    /// Drawables moved from pending back to the free-list (or dropped)
    pub recycled: usize,
    /// Drawables evicted by the sweep
    pub evicted: usize,
    pub stats: PoolStats,
}

#[derive(Debug, Default, Clone, Copy)]
struct Counters {
    frame: u64,
    allocations: u64,
    reuses: u64,
    discarded_invalid: u64,
    discarded_overflow: u64,
    evicted: u64,
    acquire_failures: u64,
    late_signals: u64,
}

/// Size-keyed pool of reusable drawables
pub struct ResourcePool<R: Resource, A: Allocator<R>> {
    config: PoolConfig,
    allocator: A,
    free: KeyedFreeList<Size, R>,
    pending: PendingSet<R>,
    completions_tx: Sender<PendingHandle>,
    completions_rx: Receiver<PendingHandle>,
    counters: Counters,
}

impl<R: Resource, A: Allocator<R>> ResourcePool<R, A> {
    /// Create a pool that allocates through `allocator`
    pub fn new(config: PoolConfig, allocator: A) -> Result<Self> {
        config.validate()?;
        let (completions_tx, completions_rx) = crossbeam_channel::unbounded();
        debug!(
            "Created resource pool (max_per_bucket={}, max_age={})",
            config.max_per_bucket, config.max_age
        );
        Ok(Self {
            config,
            allocator,
            free: KeyedFreeList::bounded(config.max_per_bucket),
            pending: PendingSet::new(),
            completions_tx,
            completions_rx,
            counters: Counters::default(),
        })
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    /// Hand out a drawable of `size`, reusing an idle one when possible.
    ///
    /// The most recently returned drawable of that size is tried first. If it
    /// is no longer valid it is dropped and a new one is allocated. Either way
    /// the drawable's outstanding sync events are flushed before it is
    /// returned; a failed flush fails the whole acquisition.
    pub fn acquire(&mut self, size: Size) -> Result<R> {
        if size.is_empty() {
            return Err(Error::InvalidParameter(format!(
                "cannot acquire a drawable of empty size {}",
                size
            )));
        }

        let (mut resource, reused) = match self.take_idle(size) {
            Some(resource) => (resource, true),
            None => (self.allocate(size)?, false),
        };

        if let Err(err) = resource.flush_pending_sync_events() {
            self.counters.acquire_failures += 1;
            warn!("Sync flush failed for {} drawable: {}", size, err);
            return Err(err);
        }

        if reused {
            self.counters.reuses += 1;
        }
        resource.reset_age();
        Ok(resource)
    }

    fn take_idle(&mut self, size: Size) -> Option<R> {
        let resource = self.free.pop(&size)?;
        if !resource.is_valid() {
            self.counters.discarded_invalid += 1;
            debug!("Discarding stale {} drawable from free-list", size);
            return None;
        }
        trace!("Reusing idle {} drawable", size);
        Some(resource)
    }

    fn allocate(&mut self, size: Size) -> Result<R> {
        match self.allocator.create_resource(size) {
            Ok(resource) => {
                self.counters.allocations += 1;
                debug!("Allocated new {} drawable", size);
                Ok(resource)
            }
            Err(err) => {
                self.counters.acquire_failures += 1;
                warn!("Allocation of {} drawable failed: {}", size, err);
                Err(err)
            }
        }
    }

    /// Hand a painted drawable to the presentation layer.
    ///
    /// The drawable is parked in the pending set and its completion callback
    /// is armed. When that callback fires the handle is queued for
    /// [`drain_completions`](Self::drain_completions).
    pub fn submit(&mut self, resource: R) -> PendingHandle {
        let completions = self.completions_tx.clone();
        let handle = self.pending.insert_with(resource, move |handle, resource| {
            resource.register_completion_callback(Box::new(move || {
                // A closed channel means the pool is gone; nothing to recycle.
                let _ = completions.send(handle);
            }));
        });
        trace!("Submitted drawable {:?}", handle);
        handle
    }

    /// Move a pending drawable back to the free-list.
    ///
    /// Unknown handles (already recycled, or dropped by [`clear_all`](Self::clear_all))
    /// are ignored. Invalid drawables and drawables whose bucket is full are
    /// dropped instead. Returns whether `handle` was pending.
    pub fn recycle(&mut self, handle: PendingHandle) -> bool {
        let Some(resource) = self.pending.remove(handle) else {
            self.counters.late_signals += 1;
            trace!("Ignoring completion for unknown handle {:?}", handle);
            return false;
        };

        if !resource.is_valid() {
            self.counters.discarded_invalid += 1;
            debug!("Dropping invalid drawable {:?} on recycle", handle);
            return true;
        }

        let size = resource.size();
        debug_assert!(!size.is_empty(), "recycled drawable reports an empty size");
        if self.free.push(size, resource).is_some() {
            self.counters.discarded_overflow += 1;
            debug!("Free-list for {} is full, dropping drawable", size);
        }
        true
    }

    /// Recycle every handle whose completion signal has fired since the last
    /// call. Returns how many were still pending.
    pub fn drain_completions(&mut self) -> usize {
        let handles: Vec<PendingHandle> = self.completions_rx.try_iter().collect();
        handles
            .into_iter()
            .filter(|&handle| self.recycle(handle))
            .count()
    }

    /// Age every idle drawable by one frame and drop those that reached
    /// `max_age`. Returns how many were evicted.
    pub fn sweep(&mut self) -> usize {
        let max_age = self.config.max_age;
        let evicted = self
            .free
            .retain(|_, resource| resource.advance_and_get_age() < max_age);
        self.counters.evicted += evicted as u64;
        self.counters.frame += 1;

        if log_enabled!(Level::Debug) {
            for (size, count) in self.free.bucket_sizes() {
                debug!("frame {}: {} idle {} drawable(s)", self.counters.frame, count, size);
            }
            debug!(
                "frame {}: {} pending, {} evicted",
                self.counters.frame,
                self.pending.len(),
                evicted
            );
        }
        evicted
    }

    /// Frame boundary: recycle completed drawables, then sweep
    pub fn end_frame(&mut self) -> FrameReport {
        let recycled = self.drain_completions();
        let evicted = self.sweep();
        FrameReport {
            recycled,
            evicted,
            stats: self.stats(),
        }
    }

    /// Drop every idle and pending drawable. Completion signals that arrive
    /// afterwards for the dropped drawables are ignored.
    pub fn clear_all(&mut self) -> usize {
        let idle = self.free.clear();
        let pending = self.pending.clear();
        info!("Cleared resource pool ({} idle, {} pending)", idle, pending);
        idle + pending
    }

    /// The GPU context was (re)created; nothing cached survives it
    pub fn on_gpu_context_created(&mut self) {
        info!("GPU context created");
        self.clear_all();
    }

    /// The GPU context is going away
    pub fn on_gpu_context_destroyed(&mut self) {
        info!("GPU context destroyed");
        self.clear_all();
    }

    pub fn is_pending(&self, handle: PendingHandle) -> bool {
        self.pending.contains(handle)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn idle_count(&self) -> usize {
        self.free.len()
    }

    pub fn idle_count_for(&self, size: Size) -> usize {
        self.free.len_for(&size)
    }

    /// Whether a free-list bucket exists for `size`
    pub fn has_bucket(&self, size: Size) -> bool {
        self.free.contains_key(&size)
    }

    pub fn stats(&self) -> PoolStats {
        let c = self.counters;
        PoolStats {
            frame: c.frame,
            idle: self.free.len(),
            buckets: self.free.bucket_count(),
            pending: self.pending.len(),
            allocations: c.allocations,
            reuses: c.reuses,
            discarded_invalid: c.discarded_invalid,
            discarded_overflow: c.discarded_overflow,
            evicted: c.evicted,
            acquire_failures: c.acquire_failures,
            late_signals: c.late_signals,
        }
    }
}
