// this_file: src/resource.rs
//! Capability interface for pooled GPU drawables
//!
//! Every backend (Vulkan session image, Metal texture, software bitmap) wraps
//! its drawable in a type implementing [`Resource`]. The pool never looks past
//! this trait: it only asks whether a drawable is still valid, what size it
//! is, how long it has been idle, and it hands the drawable a callback to
//! fire once the presentation layer has stopped reading from it.
//!
//! Dropping a `Resource` destroys the underlying drawable.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pixel dimensions of a drawable. This is the shape key of the
/// backing-store pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True when either side is zero
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Bytes needed to back this size at `bytes_per_pixel`
    pub fn byte_len(&self, bytes_per_pixel: usize) -> usize {
        (self.width as usize)
            .saturating_mul(self.height as usize)
            .saturating_mul(bytes_per_pixel)
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl From<(u32, u32)> for Size {
    fn from((width, height): (u32, u32)) -> Self {
        Self::new(width, height)
    }
}

/// Fired by the presentation layer once a drawable is no longer being read.
///
/// May be invoked from any thread.
pub type CompletionCallback = Box<dyn FnOnce() + Send + 'static>;

/// A pooled drawable.
pub trait Resource {
    /// Whether the drawable is still backed by a live GPU context
    fn is_valid(&self) -> bool;

    /// Current pixel size
    fn size(&self) -> Size;

    /// Count one more idle sweep and return the new age
    fn advance_and_get_age(&mut self) -> u32;

    /// Mark the drawable as freshly used
    fn reset_age(&mut self);

    /// Drain outstanding acquire/release events. Must not block indefinitely;
    /// a drain that cannot complete is reported as an error.
    fn flush_pending_sync_events(&mut self) -> Result<()>;

    /// Arm the completion signal. Registering again replaces the previous
    /// callback.
    fn register_completion_callback(&mut self, callback: CompletionCallback);
}

/// Creates drawables on a cache miss.
pub trait Allocator<R: Resource> {
    fn create_resource(&mut self, size: Size) -> Result<R>;
}

impl<R, F> Allocator<R> for F
where
    R: Resource,
    F: FnMut(Size) -> Result<R>,
{
    fn create_resource(&mut self, size: Size) -> Result<R> {
        self(size)
    }
}

/// Idle-sweep counter that backends embed to implement the age half of
/// [`Resource`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AgeCounter(u32);

impl AgeCounter {
    pub fn new() -> Self {
        Self(0)
    }

    pub fn get(&self) -> u32 {
        self.0
    }

    pub fn advance(&mut self) -> u32 {
        self.0 = self.0.saturating_add(1);
        self.0
    }

    pub fn reset(&mut self) {
        self.0 = 0;
    }
}
