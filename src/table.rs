//! Concurrent lookup table from block name to resident entry.

use crate::entry::CacheEntry;
use ahash::RandomState;
use parking_lot::RwLock;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::hash::BuildHasher;

const SHARD_COUNT: usize = 16;

/// Outcome of an admission attempt.
pub(crate) enum Admission {
    /// The entry became resident.
    Inserted,
    /// The name was already resident; the existing entry is returned and
    /// the candidate is discarded without touching the accounting.
    Existing(CacheEntry),
}

/// Lock-striped map from block name to `CacheEntry`.
///
/// The single source of truth for residency: a block is cached exactly
/// when its name is present here. Point lookups, inserts and removals are
/// atomic per key under the owning shard's lock.
#[derive(Debug)]
pub(crate) struct LookupTable {
    shards: Vec<RwLock<HashMap<String, CacheEntry, RandomState>>>,
    hasher: RandomState,
}

impl LookupTable {
    /// Creates a table pre-sized for roughly `capacity_hint` entries.
    pub fn new(capacity_hint: usize) -> Self {
        let per_shard = (capacity_hint / SHARD_COUNT).max(8);
        let shards = (0..SHARD_COUNT)
            .map(|_| {
                RwLock::new(HashMap::with_capacity_and_hasher(per_shard, RandomState::new()))
            })
            .collect();
        Self { shards, hasher: RandomState::new() }
    }

    fn shard(&self, name: &str) -> &RwLock<HashMap<String, CacheEntry, RandomState>> {
        let hash = self.hasher.hash_one(name) as usize;
        &self.shards[hash % SHARD_COUNT]
    }

    /// Looks up a resident entry by name.
    pub fn get(&self, name: &str) -> Option<CacheEntry> {
        self.shard(name).read().get(name).cloned()
    }

    /// Inserts `entry` unless its name is already resident. Exactly one of
    /// two racing inserts for the same new name wins; the loser observes
    /// the winner's entry.
    pub fn insert_if_absent(&self, entry: CacheEntry) -> Admission {
        let mut shard = self.shard(entry.block_name()).write();
        match shard.entry(entry.block_name().to_string()) {
            Entry::Occupied(occupied) => Admission::Existing(occupied.get().clone()),
            Entry::Vacant(vacant) => {
                vacant.insert(entry);
                Admission::Inserted
            }
        }
    }

    /// Removes `entry` only if it is still the resident entry for its
    /// name. Returns false when the slot is empty or holds a different
    /// entry, so a given entry is removed exactly once.
    pub fn remove_if_same(&self, entry: &CacheEntry) -> bool {
        let mut shard = self.shard(entry.block_name()).write();
        match shard.get(entry.block_name()) {
            Some(resident) if resident.same_entry(entry) => {
                shard.remove(entry.block_name());
                true
            }
            _ => false,
        }
    }

    /// Clones out all resident entries. Used by the evictor to build its
    /// priority segments; the snapshot may go stale, which removal
    /// identity checks tolerate.
    pub fn snapshot(&self) -> Vec<CacheEntry> {
        let mut entries = Vec::with_capacity(self.len());
        for shard in &self.shards {
            entries.extend(shard.read().values().cloned());
        }
        entries
    }

    /// Number of resident entries.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.read().len()).sum()
    }

    /// Drops all resident entries. Used by `stop`.
    pub fn clear(&self) {
        for shard in &self.shards {
            shard.write().clear();
        }
    }
}
