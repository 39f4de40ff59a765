//! Cached block entries and their retention priority.

use bytes::Bytes;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

/// Fixed per-entry bookkeeping overhead, charged against the budget in
/// addition to the payload and name bytes.
pub const PER_BLOCK_OVERHEAD: u64 = 64;

/// Retention priority of a cached block.
///
/// New blocks enter as `Single` (or `Memory` when the caller flags them
/// in-memory) and are promoted to `Multi` on a subsequent hit. `Memory`
/// is sticky: access patterns never demote it, only eviction pressure
/// removes it, and only as a last resort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BlockPriority {
    /// Accessed exactly once since admission.
    Single = 0,
    /// Accessed more than once; resists single-scan pollution.
    Multi = 1,
    /// Flagged by the caller as disproportionately valuable to retain.
    Memory = 2,
}

impl BlockPriority {
    fn from_u8(value: u8) -> BlockPriority {
        match value {
            0 => BlockPriority::Single,
            1 => BlockPriority::Multi,
            _ => BlockPriority::Memory,
        }
    }
}

/// A single cached block: immutable payload plus recency and priority
/// bookkeeping.
///
/// `CacheEntry` is a cheap-clone handle (`Arc` internally); clones share
/// the same payload and bookkeeping, so a handle returned by `get_block`
/// stays valid even if the block is evicted afterwards.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    inner: Arc<EntryInner>,
}

#[derive(Debug)]
struct EntryInner {
    block_name: String,
    buffer: Bytes,
    size: u64,
    access_tick: AtomicU64,
    priority: AtomicU8,
}

impl CacheEntry {
    pub(crate) fn new(block_name: &str, buffer: Bytes, in_memory: bool, tick: u64) -> Self {
        let size = buffer.len() as u64 + block_name.len() as u64 + PER_BLOCK_OVERHEAD;
        let priority = if in_memory { BlockPriority::Memory } else { BlockPriority::Single };
        Self {
            inner: Arc::new(EntryInner {
                block_name: block_name.to_string(),
                buffer,
                size,
                access_tick: AtomicU64::new(tick),
                priority: AtomicU8::new(priority as u8),
            }),
        }
    }

    /// The block's unique name.
    pub fn block_name(&self) -> &str {
        &self.inner.block_name
    }

    /// The block payload.
    pub fn buffer(&self) -> &Bytes {
        &self.inner.buffer
    }

    /// Accounted size in bytes: payload plus name plus fixed overhead.
    /// Computed once at admission.
    pub fn size(&self) -> u64 {
        self.inner.size
    }

    /// Current retention priority.
    pub fn priority(&self) -> BlockPriority {
        BlockPriority::from_u8(self.inner.priority.load(Ordering::Relaxed))
    }

    /// Whether this block was admitted with the in-memory flag.
    pub fn is_in_memory(&self) -> bool {
        self.priority() == BlockPriority::Memory
    }

    /// Records an access at the given logical tick. Relaxed: losing a
    /// racing update costs eviction quality, not correctness.
    pub(crate) fn touch(&self, tick: u64) {
        self.inner.access_tick.store(tick, Ordering::Relaxed);
    }

    pub(crate) fn access_tick(&self) -> u64 {
        self.inner.access_tick.load(Ordering::Relaxed)
    }

    /// Promotes `Single` to `Multi` on a repeat access. `Multi` and
    /// `Memory` are left unchanged.
    pub(crate) fn promote(&self) {
        let _ = self.inner.priority.compare_exchange(
            BlockPriority::Single as u8,
            BlockPriority::Multi as u8,
            Ordering::Relaxed,
            Ordering::Relaxed,
        );
    }

    /// True when both handles refer to the same resident entry.
    pub(crate) fn same_entry(&self, other: &CacheEntry) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}
