// this_file: src/free_list.rs

//! Idle drawables grouped by shape.
//!
//! Each shape key owns a LIFO stack. Popping the most recently pushed entry
//! favours the drawable whose previous GPU work is most likely retired and
//! whose memory is still hot. Empty stacks are removed from the map so the
//! bucket count always reflects shapes that actually have idle entries.

use smallvec::SmallVec;
use std::collections::HashMap;
use std::hash::Hash;

/// Entries kept inline before a bucket spills to the heap. Matches the
/// default per-shape cap with one spare.
const INLINE_BUCKET: usize = 4;

type Bucket<R> = SmallVec<[R; INLINE_BUCKET]>;

/// Shape-keyed LIFO free-list, optionally bounded per shape.
#[derive(Debug)]
pub struct KeyedFreeList<K, R> {
    buckets: HashMap<K, Bucket<R>>,
    max_per_bucket: Option<usize>,
}

impl<K: Eq + Hash, R> KeyedFreeList<K, R> {
    /// A free-list that holds at most `max_per_bucket` entries per key
    pub fn bounded(max_per_bucket: usize) -> Self {
        Self {
            buckets: HashMap::new(),
            max_per_bucket: Some(max_per_bucket),
        }
    }

    /// A free-list without a per-key cap
    pub fn unbounded() -> Self {
        Self {
            buckets: HashMap::new(),
            max_per_bucket: None,
        }
    }

    /// Pop the most recently pushed entry for `key`. The bucket is removed
    /// once it runs empty.
    pub fn pop(&mut self, key: &K) -> Option<R> {
        let bucket = self.buckets.get_mut(key)?;
        let item = bucket.pop();
        if bucket.is_empty() {
            self.buckets.remove(key);
        }
        item
    }

    /// Push an entry for `key`.
    ///
    /// Returns the entry back when the bucket is already at capacity; the
    /// caller decides how to dispose of it.
    pub fn push(&mut self, key: K, item: R) -> Option<R> {
        if let Some(limit) = self.max_per_bucket {
            let current = self.buckets.get(&key).map_or(0, |bucket| bucket.len());
            if current >= limit {
                return Some(item);
            }
        }
        self.buckets.entry(key).or_default().push(item);
        None
    }

    /// Number of idle entries stored for `key`
    pub fn len_for(&self, key: &K) -> usize {
        self.buckets.get(key).map_or(0, |bucket| bucket.len())
    }

    /// Whether `key` currently has a bucket
    pub fn contains_key(&self, key: &K) -> bool {
        self.buckets.contains_key(key)
    }

    /// Total idle entries across all keys
    pub fn len(&self) -> usize {
        self.buckets.values().map(|bucket| bucket.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Number of keys that currently hold at least one entry
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Iterate over `(key, idle count)` pairs
    pub fn bucket_sizes(&self) -> impl Iterator<Item = (&K, usize)> + '_ {
        self.buckets.iter().map(|(key, bucket)| (key, bucket.len()))
    }

    /// Keep only the entries for which `keep` returns true. Removed entries
    /// are dropped and emptied buckets removed. Returns how many entries
    /// were dropped.
    pub fn retain<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&K, &mut R) -> bool,
    {
        let before = self.len();
        self.buckets.retain(|key, bucket| {
            bucket.retain(|item| keep(key, item));
            !bucket.is_empty()
        });
        before - self.len()
    }

    /// Move every entry out, leaving the free-list empty
    pub fn drain(&mut self) -> Vec<R> {
        self.buckets
            .drain()
            .flat_map(|(_, bucket)| bucket.into_iter())
            .collect()
    }

    /// Drop every entry. Returns how many were dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.len();
        self.buckets.clear();
        dropped
    }
}
