// this_file: tests/target_cache.rs
//! Descriptor-keyed render target cache with software surfaces

use std::collections::{BTreeMap, HashMap};
use surfpool::software::{SoftwareAllocator, SoftwareSurface};
use surfpool::{Allocator, RenderTargetCache, Resource, Size, ViewId, ViewRequest};

fn target(allocator: &mut SoftwareAllocator, width: u32, height: u32) -> SoftwareSurface {
    allocator
        .create_resource(Size::new(width, height))
        .expect("allocation within budget")
}

#[test]
fn test_count_tracks_cached_targets() {
    let mut allocator = SoftwareAllocator::new(16);
    let mut cache = RenderTargetCache::new();

    cache.cache_render_target(ViewId(1), target(&mut allocator, 10, 10));
    cache.cache_render_target(ViewId(2), target(&mut allocator, 10, 10));
    cache.cache_render_target(ViewId(1), target(&mut allocator, 20, 10));
    cache.cache_render_target(ViewId(3), target(&mut allocator, 5, 5));
    assert_eq!(cache.cached_targets_count(), 4);

    let drained = cache.clear_all_render_targets();
    assert_eq!(drained.len(), 4);
    assert_eq!(cache.cached_targets_count(), 0);

    // Ownership moved to the caller; memory is released once they drop it
    assert!(allocator.memory().current_usage() > 0);
    drop(drained);
    assert_eq!(allocator.memory().current_usage(), 0);
}

#[test]
fn test_clean_views_are_skipped_on_empty_cache() {
    let mut cache: RenderTargetCache<SoftwareSurface> = RenderTargetCache::new();
    let mut views = HashMap::new();
    views.insert(
        ViewId(1),
        ViewRequest {
            size: Size::new(100, 100),
            needs_render: true,
        },
    );
    views.insert(
        ViewId(2),
        ViewRequest {
            size: Size::new(100, 100),
            needs_render: false,
        },
    );

    let lookup = cache.take_existing_targets(&views, |_| true);
    assert!(lookup.resolved.is_empty());
    assert_eq!(lookup.unmatched.len(), 1);
    assert!(lookup.unmatched.contains(&ViewId(1)));
}

#[test]
fn test_frame_to_frame_reuse_per_view() {
    let mut allocator = SoftwareAllocator::new(16);
    let mut cache = RenderTargetCache::new();
    let size = Size::new(64, 32);

    let mut views = BTreeMap::new();
    for id in 1..=3 {
        views.insert(
            ViewId(id),
            ViewRequest {
                size,
                needs_render: true,
            },
        );
    }

    // Frame 1: nothing cached, every view allocates
    let lookup = cache.take_existing_targets(&views, |_| true);
    assert_eq!(lookup.unmatched.len(), 3);
    let mut ids = BTreeMap::new();
    for view in lookup.unmatched {
        let surface = target(&mut allocator, size.width, size.height);
        ids.insert(view, surface.id());
        cache.cache_render_target(view, surface);
    }

    // Frame 2: each view gets its own target back
    let lookup = cache.take_existing_targets(&views, |surface| surface.is_valid());
    assert!(lookup.unmatched.is_empty());
    for (view, surface) in &lookup.resolved {
        assert_eq!(ids[view], surface.id());
    }
    assert_eq!(cache.cached_targets_count(), 0);
}

#[test]
fn test_unavailable_targets_are_dropped() {
    let mut allocator = SoftwareAllocator::new(16);
    let mut cache = RenderTargetCache::new();
    let size = Size::new(16, 16);
    cache.cache_render_target(ViewId(7), target(&mut allocator, 16, 16));
    allocator.lose_context();

    let mut views = BTreeMap::new();
    views.insert(
        ViewId(7),
        ViewRequest {
            size,
            needs_render: true,
        },
    );
    let lookup = cache.take_existing_targets(&views, |surface| surface.is_valid());

    assert!(lookup.unmatched.contains(&ViewId(7)));
    assert_eq!(cache.cached_targets_count(), 0);
    assert_eq!(allocator.memory().current_usage(), 0);
}
