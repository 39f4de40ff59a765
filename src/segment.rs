//! Priority segments used by the eviction pass.

use crate::config::CacheOptions;
use crate::entry::{BlockPriority, CacheEntry};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Proportional byte shares of the budget per retention class. Soft
/// targets: a segment may exceed its share until eviction rebalances.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SegmentTargets {
    single: u64,
    multi: u64,
    memory: u64,
}

impl SegmentTargets {
    pub fn new(options: &CacheOptions, max_size: u64) -> Self {
        Self {
            single: (max_size as f64 * options.single_fraction) as u64,
            multi: (max_size as f64 * options.multi_fraction) as u64,
            memory: (max_size as f64 * options.in_memory_fraction) as u64,
        }
    }

    pub fn target_for(&self, priority: BlockPriority) -> u64 {
        match priority {
            BlockPriority::Single => self.single,
            BlockPriority::Multi => self.multi,
            BlockPriority::Memory => self.memory,
        }
    }
}

/// Heap entry ordered so the coldest block (smallest access tick) pops
/// first. Ticks are captured at snapshot time so the ordering is stable
/// for the duration of one pass.
#[derive(Debug)]
struct ByColdest {
    tick: u64,
    entry: CacheEntry,
}

impl PartialEq for ByColdest {
    fn eq(&self, other: &Self) -> bool {
        self.tick == other.tick
    }
}

impl Eq for ByColdest {}

impl PartialOrd for ByColdest {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ByColdest {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap, we want the smallest tick on top.
        other.tick.cmp(&self.tick)
    }
}

/// One retention class's view of the resident set during an eviction
/// pass: entries ordered coldest-first, plus the class's byte target.
#[derive(Debug)]
pub(crate) struct Segment {
    priority: BlockPriority,
    target: u64,
    bytes: u64,
    entries: BinaryHeap<ByColdest>,
}

impl Segment {
    pub fn new(priority: BlockPriority, target: u64) -> Self {
        Self { priority, target, bytes: 0, entries: BinaryHeap::new() }
    }

    /// The retention class this segment holds.
    pub fn priority(&self) -> BlockPriority {
        self.priority
    }

    /// Adds a snapshot entry filed under this segment's class. The class
    /// was read once at snapshot time; a concurrent promotion after that
    /// point only affects the next pass.
    pub fn add(&mut self, entry: CacheEntry) {
        self.bytes += entry.size();
        self.entries.push(ByColdest { tick: entry.access_tick(), entry });
    }

    /// Removes and returns the coldest entry.
    pub fn pop_coldest(&mut self) -> Option<CacheEntry> {
        let coldest = self.entries.pop()?;
        self.bytes -= coldest.entry.size();
        Some(coldest.entry)
    }

    /// Bytes this segment holds beyond its proportional share. Positive
    /// values mark the segment eviction should drain first.
    pub fn overflow(&self) -> i64 {
        self.bytes as i64 - self.target as i64
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
