// this_file: src/memory_tracker.rs
//! Byte budget for drawable memory
//!
//! Backends charge each drawable's pixel storage against a shared tracker.
//! Going over the limit is how an allocation failure surfaces.

use crate::error::{Error, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const MB: usize = 1024 * 1024;

/// Tracks bytes held by live drawables
#[derive(Debug)]
pub struct MemoryTracker {
    /// Current usage in bytes
    current: AtomicUsize,
    /// Peak usage in bytes
    peak: AtomicUsize,
    /// Limit in bytes
    limit: usize,
}

impl MemoryTracker {
    /// Create a tracker with a limit in megabytes
    pub fn new(limit_mb: usize) -> Self {
        Self::with_limit_bytes(limit_mb.saturating_mul(MB))
    }

    /// Create a tracker with a limit in bytes
    pub fn with_limit_bytes(limit: usize) -> Self {
        Self {
            current: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            limit,
        }
    }

    /// Reserve `bytes`, failing if the limit would be exceeded
    pub fn allocate(&self, bytes: usize) -> Result<()> {
        let mut current = self.current.load(Ordering::Relaxed);
        loop {
            let new = current.saturating_add(bytes);
            if new > self.limit {
                return Err(Error::Allocation(format!(
                    "drawable memory budget exceeded: {} bytes requested, {} of {} bytes in use",
                    bytes, current, self.limit
                )));
            }
            match self.current.compare_exchange_weak(
                current,
                new,
                Ordering::SeqCst,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    self.peak.fetch_max(new, Ordering::Relaxed);
                    return Ok(());
                }
                Err(actual) => current = actual,
            }
        }
    }

    /// Release `bytes` previously reserved
    pub fn deallocate(&self, bytes: usize) {
        self.current.fetch_sub(bytes, Ordering::SeqCst);
    }

    /// Current usage in bytes
    pub fn current_usage(&self) -> usize {
        self.current.load(Ordering::Relaxed)
    }

    /// Peak usage in bytes
    pub fn peak_usage(&self) -> usize {
        self.peak.load(Ordering::Relaxed)
    }

    /// Human-readable usage summary
    pub fn stats(&self) -> String {
        format!(
            "Memory: {} MB / {} MB (peak: {} MB)",
            self.current_usage() / MB,
            self.limit / MB,
            self.peak_usage() / MB
        )
    }
}

/// Holds a reservation for as long as the owning drawable lives
#[derive(Debug)]
pub struct MemoryGuard {
    tracker: Arc<MemoryTracker>,
    bytes: usize,
}

impl MemoryGuard {
    pub fn new(tracker: Arc<MemoryTracker>, bytes: usize) -> Result<Self> {
        tracker.allocate(bytes)?;
        Ok(Self { tracker, bytes })
    }
}

impl Drop for MemoryGuard {
    fn drop(&mut self) {
        self.tracker.deallocate(self.bytes);
    }
}
