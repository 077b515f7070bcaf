// this_file: tests/pool_properties.rs
//! Lifecycle properties of the size-keyed pool, exercised through the
//! software backend

use surfpool::software::{ReleaseFence, SoftwareAllocator, SoftwareSurface, BYTES_PER_PIXEL};
use surfpool::{PoolConfig, ResourcePool, Size};

type Pool = ResourcePool<SoftwareSurface, SoftwareAllocator>;

fn pool(config: PoolConfig) -> Pool {
    ResourcePool::new(config, SoftwareAllocator::new(64)).expect("valid config")
}

/// Acquire and submit one surface, returning its id, handle and fence
fn present(pool: &mut Pool, size: Size) -> (u64, surfpool::PendingHandle, ReleaseFence) {
    let surface = pool.acquire(size).expect("acquire succeeds");
    let id = surface.id();
    let fence = surface.release_fence();
    let handle = pool.submit(surface);
    (id, handle, fence)
}

#[test]
fn test_capacity_bound_discards_overflow() {
    let mut pool = pool(PoolConfig::default().with_max_per_bucket(2));
    let size = Size::new(64, 64);

    let a = pool.acquire(size).unwrap();
    let b = pool.acquire(size).unwrap();
    let c = pool.acquire(size).unwrap();
    let (id_b, id_c) = (b.id(), c.id());
    let handles = [pool.submit(a), pool.submit(b), pool.submit(c)];
    for handle in handles {
        assert!(pool.recycle(handle));
    }

    assert_eq!(pool.idle_count_for(size), 2);
    assert_eq!(pool.stats().discarded_overflow, 1);
    assert_eq!(pool.allocator().created_count(), 3);

    // Served from cache: the most recently retained surface, no allocation
    let reused = pool.acquire(size).unwrap();
    assert_eq!(reused.id(), id_b);
    assert_ne!(reused.id(), id_c);
    assert_eq!(pool.allocator().created_count(), 3);
    assert_eq!(pool.stats().reuses, 1);
}

#[test]
fn test_idle_surface_evicted_after_max_age_sweeps() {
    let mut pool = pool(PoolConfig::default().with_max_age(3));
    let size = Size::new(32, 16);
    let (_, handle, _) = present(&mut pool, size);
    pool.recycle(handle);

    assert_eq!(pool.sweep(), 0);
    assert_eq!(pool.sweep(), 0);
    assert!(pool.has_bucket(size));
    assert_eq!(pool.sweep(), 1);
    assert!(!pool.has_bucket(size));
    assert_eq!(pool.stats().buckets, 0);
    assert_eq!(pool.allocator().memory().current_usage(), 0);
}

#[test]
fn test_reuse_between_sweeps_restarts_aging() {
    let mut pool = pool(PoolConfig::default().with_max_age(2));
    let size = Size::new(8, 8);
    let (id, handle, _) = present(&mut pool, size);
    pool.recycle(handle);
    pool.sweep();

    let (again, handle, _) = present(&mut pool, size);
    assert_eq!(again, id);
    pool.recycle(handle);
    assert_eq!(pool.sweep(), 0);
    assert_eq!(pool.idle_count_for(size), 1);
    assert_eq!(pool.sweep(), 1);
}

#[test]
fn test_recycle_is_idempotent() {
    let mut pool = pool(PoolConfig::default());
    let size = Size::new(16, 16);
    let (_, handle, _) = present(&mut pool, size);

    assert!(pool.recycle(handle));
    let after_first = pool.stats();
    assert!(!pool.recycle(handle));
    let after_second = pool.stats();

    assert_eq!(after_first.idle, after_second.idle);
    assert_eq!(after_first.pending, after_second.pending);
    assert_eq!(after_second.late_signals, after_first.late_signals + 1);
}

#[test]
fn test_duplicate_fence_signal_is_harmless() {
    let mut pool = pool(PoolConfig::default());
    let size = Size::new(16, 16);
    let (_, _, fence) = present(&mut pool, size);

    assert!(fence.signal());
    assert!(!fence.signal());
    assert_eq!(pool.drain_completions(), 1);
    assert_eq!(pool.idle_count_for(size), 1);
}

#[test]
fn test_signal_after_clear_all_is_ignored() {
    let mut pool = pool(PoolConfig::default());
    let size = Size::new(16, 16);
    let (_, handle, fence) = present(&mut pool, size);

    assert_eq!(pool.clear_all(), 1);
    assert!(!pool.is_pending(handle));

    fence.signal();
    assert_eq!(pool.drain_completions(), 0);
    assert_eq!(pool.idle_count(), 0);
    assert_eq!(pool.stats().late_signals, 1);

    // A new submission never inherits the stale handle
    let (_, new_handle, _) = present(&mut pool, size);
    assert_ne!(new_handle, handle);
    assert!(!pool.recycle(handle));
    assert!(pool.is_pending(new_handle));
}

#[test]
fn test_context_loss_invalidates_idle_surfaces() {
    let mut pool = pool(PoolConfig::default());
    let size = Size::new(16, 16);
    let (old_id, handle, _) = present(&mut pool, size);
    pool.recycle(handle);

    // Lost without the driver clearing: the stale entry is caught on reuse
    pool.allocator().lose_context();
    let surface = pool.acquire(size).unwrap();
    assert_ne!(surface.id(), old_id);
    assert_eq!(pool.stats().discarded_invalid, 1);
}

#[test]
fn test_context_hooks_clear_everything() {
    let mut pool = pool(PoolConfig::default());
    let size = Size::new(16, 16);
    let (_, recycled, _) = present(&mut pool, size);
    pool.recycle(recycled);
    present(&mut pool, Size::new(4, 4));

    pool.on_gpu_context_destroyed();
    assert_eq!(pool.idle_count(), 0);
    assert_eq!(pool.pending_count(), 0);
    assert_eq!(pool.allocator().memory().current_usage(), 0);

    pool.on_gpu_context_created();
    assert!(pool.acquire(size).is_ok());
}

#[test]
fn test_flush_failure_fails_acquire_and_is_recoverable() {
    let mut pool = pool(PoolConfig::default());
    let size = Size::new(16, 16);
    pool.allocator().set_flush_failure(true);
    let err = pool.acquire(size).unwrap_err();
    assert!(err.is_frame_skippable());

    pool.allocator().set_flush_failure(false);
    assert!(pool.acquire(size).is_ok());
}

#[test]
fn test_flush_failure_discards_reused_surface() {
    let mut pool = pool(PoolConfig::default());
    let size = Size::new(16, 16);
    let (_, handle, _fence) = present(&mut pool, size);
    assert!(pool.recycle(handle));
    assert_eq!(pool.idle_count_for(size), 1);

    pool.allocator().set_flush_failure(true);
    let err = pool.acquire(size).unwrap_err();
    assert!(err.is_frame_skippable());

    let stats = pool.stats();
    assert_eq!(stats.reuses, 0);
    assert_eq!(stats.acquire_failures, 1);
    assert_eq!(pool.idle_count(), 0);
    assert_eq!(pool.pending_count(), 0);
    assert_eq!(pool.allocator().memory().current_usage(), 0);
}

#[test]
fn test_completion_from_presenter_thread() {
    let mut pool = pool(PoolConfig::default());
    let size = Size::new(16, 16);
    let (_, handle, fence) = present(&mut pool, size);

    std::thread::spawn(move || {
        fence.signal();
    })
    .join()
    .unwrap();

    assert!(pool.is_pending(handle));
    assert_eq!(pool.drain_completions(), 1);
    assert!(!pool.is_pending(handle));
}

/// Drive a deterministic mix of operations and check after every step that
/// each live surface is held by exactly one owner.
#[test]
fn test_every_surface_has_exactly_one_owner() {
    let size = Size::new(16, 16);
    let surface_bytes = size.byte_len(BYTES_PER_PIXEL);
    let mut pool = pool(PoolConfig::default().with_max_per_bucket(2).with_max_age(2));
    let mut held: Vec<SoftwareSurface> = Vec::new();
    let mut fences: Vec<ReleaseFence> = Vec::new();
    let mut seed: u32 = 0x2545_f491;

    for _ in 0..500 {
        seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        match (seed >> 16) % 6 {
            0 | 1 => held.push(pool.acquire(size).unwrap()),
            2 => {
                if let Some(surface) = held.pop() {
                    fences.push(surface.release_fence());
                    pool.submit(surface);
                }
            }
            3 => {
                if let Some(fence) = fences.pop() {
                    fence.signal();
                }
                pool.drain_completions();
            }
            4 => {
                pool.sweep();
            }
            _ => {
                if (seed >> 8) % 17 == 0 {
                    pool.clear_all();
                }
            }
        }

        let owned = pool.idle_count() + pool.pending_count() + held.len();
        assert_eq!(
            pool.allocator().memory().current_usage(),
            owned * surface_bytes,
            "live surfaces must equal idle + pending + held"
        );
        assert!(pool.idle_count_for(size) <= 2);
    }
}
