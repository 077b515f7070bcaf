// this_file: src/software.rs

//! Software-bitmap backend.
//!
//! Drawables are RGBA8 pixel buffers whose bytes are charged against a
//! [`MemoryTracker`] budget. A shared context generation stands in for the
//! GPU context: [`SoftwareAllocator::lose_context`] bumps it and every
//! surface created under an older generation reports itself invalid.
//!
//! The presentation side of the completion signal is a [`ReleaseFence`].
//! The frame driver takes a clone of a surface's fence before submitting it
//! and signals it once the presenter is done reading.

use crate::error::{Error, Result};
use crate::memory_tracker::{MemoryGuard, MemoryTracker};
use crate::resource::{AgeCounter, Allocator, CompletionCallback, Resource, Size};
use log::trace;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Bytes per RGBA8 pixel
pub const BYTES_PER_PIXEL: usize = 4;

#[derive(Debug, Default)]
struct ContextState {
    generation: AtomicU64,
    fail_flush: AtomicBool,
}

/// One-shot completion signal shared between a surface and its presenter
#[derive(Clone, Default)]
pub struct ReleaseFence {
    slot: Arc<Mutex<Option<CompletionCallback>>>,
}

impl ReleaseFence {
    pub fn new() -> Self {
        Self::default()
    }

    fn arm(&self, callback: CompletionCallback) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(callback);
    }

    /// Whether a callback is waiting to be fired
    pub fn is_armed(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Fire the armed callback, if any. Returns whether one fired; a fence
    /// fires at most once per arming.
    pub fn signal(&self) -> bool {
        let callback = self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match callback {
            Some(callback) => {
                callback();
                true
            }
            None => false,
        }
    }
}

impl std::fmt::Debug for ReleaseFence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReleaseFence")
            .field("armed", &self.is_armed())
            .finish()
    }
}

/// CPU pixel buffer drawable
#[derive(Debug)]
pub struct SoftwareSurface {
    id: u64,
    size: Size,
    pixels: Vec<u8>,
    age: AgeCounter,
    generation: u64,
    context: Arc<ContextState>,
    fence: ReleaseFence,
    pending_sync_events: u32,
    _memory: MemoryGuard,
}

impl SoftwareSurface {
    /// Allocator-assigned identity, stable for the surface's lifetime
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Fill every pixel with one RGBA colour
    pub fn clear(&mut self, rgba: [u8; 4]) {
        for pixel in self.pixels.chunks_exact_mut(BYTES_PER_PIXEL) {
            pixel.copy_from_slice(&rgba);
        }
    }

    /// Fence the presenter signals when it stops reading this surface
    pub fn release_fence(&self) -> ReleaseFence {
        self.fence.clone()
    }

    /// Acquire/release events not yet drained
    pub fn pending_sync_events(&self) -> u32 {
        self.pending_sync_events
    }
}

impl Resource for SoftwareSurface {
    fn is_valid(&self) -> bool {
        self.generation == self.context.generation.load(Ordering::Acquire)
    }

    fn size(&self) -> Size {
        self.size
    }

    fn advance_and_get_age(&mut self) -> u32 {
        self.age.advance()
    }

    fn reset_age(&mut self) {
        self.age.reset();
    }

    fn flush_pending_sync_events(&mut self) -> Result<()> {
        if self.context.fail_flush.load(Ordering::Relaxed) {
            return Err(Error::SyncFlush(format!(
                "surface {} could not drain {} sync event(s)",
                self.id, self.pending_sync_events
            )));
        }
        self.pending_sync_events = 0;
        Ok(())
    }

    fn register_completion_callback(&mut self, callback: CompletionCallback) {
        // The presenter's release is one more event to drain before reuse.
        self.pending_sync_events += 1;
        self.fence.arm(callback);
    }
}

/// Creates [`SoftwareSurface`]s within a byte budget
#[derive(Debug)]
pub struct SoftwareAllocator {
    memory: Arc<MemoryTracker>,
    context: Arc<ContextState>,
    next_id: u64,
}

impl SoftwareAllocator {
    /// Allocator with a budget in megabytes
    pub fn new(budget_mb: usize) -> Self {
        Self::with_tracker(Arc::new(MemoryTracker::new(budget_mb)))
    }

    /// Allocator charging an existing tracker
    pub fn with_tracker(memory: Arc<MemoryTracker>) -> Self {
        Self {
            memory,
            context: Arc::new(ContextState::default()),
            next_id: 0,
        }
    }

    pub fn memory(&self) -> &MemoryTracker {
        &self.memory
    }

    /// Surfaces created so far
    pub fn created_count(&self) -> u64 {
        self.next_id
    }

    /// Invalidate every surface created so far
    pub fn lose_context(&self) {
        let generation = self.context.generation.fetch_add(1, Ordering::AcqRel) + 1;
        trace!("Software context now at generation {}", generation);
    }

    /// Make subsequent sync flushes fail (or succeed again)
    pub fn set_flush_failure(&self, fail: bool) {
        self.context.fail_flush.store(fail, Ordering::Relaxed);
    }
}

impl Allocator<SoftwareSurface> for SoftwareAllocator {
    fn create_resource(&mut self, size: Size) -> Result<SoftwareSurface> {
        let bytes = size.byte_len(BYTES_PER_PIXEL);
        let memory = MemoryGuard::new(self.memory.clone(), bytes)?;
        self.next_id += 1;
        Ok(SoftwareSurface {
            id: self.next_id,
            size,
            pixels: vec![0; bytes],
            age: AgeCounter::new(),
            generation: self.context.generation.load(Ordering::Acquire),
            context: self.context.clone(),
            fence: ReleaseFence::new(),
            pending_sync_events: 0,
            _memory: memory,
        })
    }
}
