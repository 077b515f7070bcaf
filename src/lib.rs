// this_file: src/lib.rs
//! Surfpool - frame-synchronized recycling of GPU drawables
//!
//! This library provides:
//! - A size-keyed pool that reuses idle backing stores across frames
//! - Tracking of drawables handed to the presentation layer until their
//!   completion signal fires
//! - Per-frame aging and eviction of idle drawables
//! - A view-descriptor-keyed render target cache
//! - A software-bitmap backend and a scenario-driven simulator

pub mod config;
pub mod error;
pub mod free_list;
pub mod logging;
pub mod memory_tracker;
pub mod pending;
pub mod pool;
pub mod resource;
pub mod scenario;
pub mod software;
pub mod target_cache;

// Re-export commonly used types
pub use config::PoolConfig;
pub use error::{Error, Result};
pub use pending::PendingHandle;
pub use pool::{FrameReport, PoolStats, ResourcePool};
pub use resource::{Allocator, CompletionCallback, Resource, Size};
pub use target_cache::{CacheLookup, RenderTargetCache, TargetDescriptor, ViewId, ViewRequest};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
