//! The block cache facade and its eviction engine.

use crate::accounting::SizeAccountant;
use crate::config::CacheOptions;
use crate::entry::{BlockPriority, CacheEntry};
use crate::error::{Error, Result};
use crate::evictor::EvictionThread;
use crate::segment::{Segment, SegmentTargets};
use crate::stats::{CacheStats, StatsCounters};
use crate::table::{Admission, LookupTable};
use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// The shared state of one started cache: the lookup table, accounting,
/// statistics and the eviction machinery. Dropped wholesale by `stop`.
#[derive(Debug)]
pub(crate) struct CacheCore {
    table: LookupTable,
    accountant: SizeAccountant,
    stats: StatsCounters,
    targets: SegmentTargets,
    tick: AtomicU64,
    eviction_lock: Mutex<()>,
}

impl CacheCore {
    fn new(options: &CacheOptions, max_size: u64, capacity_hint: usize) -> Self {
        Self {
            table: LookupTable::new(capacity_hint),
            accountant: SizeAccountant::new(
                max_size,
                options.acceptable_factor,
                options.min_factor,
            ),
            stats: StatsCounters::new(),
            targets: SegmentTargets::new(options, max_size),
            tick: AtomicU64::new(0),
            eviction_lock: Mutex::new(()),
        }
    }

    fn next_tick(&self) -> u64 {
        self.tick.fetch_add(1, Ordering::Relaxed)
    }

    /// Admits a block, or returns the resident entry if the name is
    /// already cached. The second element reports whether the reservation
    /// pushed usage over the eviction trigger.
    fn admit(&self, block_name: &str, buffer: Bytes, in_memory: bool) -> (CacheEntry, bool) {
        let entry = CacheEntry::new(block_name, buffer, in_memory, self.next_tick());
        // Reserve before publishing the entry so a concurrent eviction of
        // it can never release bytes that were not yet accounted.
        let needs_eviction = self.accountant.reserve(entry.size());
        match self.table.insert_if_absent(entry.clone()) {
            Admission::Inserted => {
                self.stats.record_insertion();
                (entry, needs_eviction)
            }
            Admission::Existing(existing) => {
                self.accountant.release(entry.size());
                log::debug!("block {:?} already cached, keeping resident entry", block_name);
                (existing, false)
            }
        }
    }

    /// Looks up a block, updating counters and recency on the way.
    fn lookup(&self, block_name: &str) -> Option<CacheEntry> {
        self.stats.record_request();
        let entry = self.table.get(block_name)?;
        entry.touch(self.next_tick());
        entry.promote();
        self.stats.record_hit();
        Some(entry)
    }

    /// One eviction pass: frees the coldest entries of the most
    /// over-share segment until usage reaches the low-water mark.
    ///
    /// Only one pass runs at a time; a second caller backs off instead of
    /// waiting, since the running pass already covers its signal.
    pub(crate) fn evict(&self) {
        let _guard = match self.eviction_lock.try_lock() {
            Some(guard) => guard,
            None => return,
        };
        if !self.accountant.over_acceptable() {
            return;
        }
        let bytes_to_free = self.accountant.bytes_to_free();
        if bytes_to_free == 0 {
            return;
        }

        let mut segments = [
            Segment::new(BlockPriority::Single, self.targets.target_for(BlockPriority::Single)),
            Segment::new(BlockPriority::Multi, self.targets.target_for(BlockPriority::Multi)),
            Segment::new(BlockPriority::Memory, self.targets.target_for(BlockPriority::Memory)),
        ];
        for entry in self.table.snapshot() {
            let class = entry.priority() as usize;
            segments[class].add(entry);
        }

        let mut freed = 0u64;
        let mut evicted = 0u64;
        while freed < bytes_to_free {
            let Some(segment) = Self::next_victim_segment(&mut segments) else {
                break;
            };
            let class = segment.priority();
            let Some(entry) = segment.pop_coldest() else {
                break;
            };
            // Identity-checked removal: a stale snapshot entry that was
            // already removed is skipped without double-releasing.
            if self.table.remove_if_same(&entry) {
                self.accountant.release(entry.size());
                freed += entry.size();
                evicted += 1;
                log::trace!(
                    "evicted block {:?} ({} bytes, {:?})",
                    entry.block_name(),
                    entry.size(),
                    class
                );
            }
        }

        self.stats.record_evictions(evicted);
        log::debug!(
            "eviction pass freed {} bytes across {} blocks, usage {}/{}",
            freed,
            evicted,
            self.accountant.used(),
            self.accountant.max_size()
        );
    }

    /// Picks the segment to evict from next: whichever is most over its
    /// proportional share, otherwise the lowest-priority non-empty one
    /// (single, then multi, then in-memory as a last resort).
    fn next_victim_segment(segments: &mut [Segment; 3]) -> Option<&mut Segment> {
        let mut pick = None;
        let mut best_overflow = 0i64;
        for (idx, segment) in segments.iter().enumerate() {
            if !segment.is_empty() && segment.overflow() > best_overflow {
                best_overflow = segment.overflow();
                pick = Some(idx);
            }
        }
        let idx = pick.or_else(|| segments.iter().position(|segment| !segment.is_empty()))?;
        Some(&mut segments[idx])
    }

    fn clear(&self) {
        self.table.clear();
        self.accountant.reset();
    }

    fn used(&self) -> u64 {
        self.accountant.used()
    }

    fn len(&self) -> usize {
        self.table.len()
    }

    fn snapshot_stats(&self) -> CacheStats {
        self.stats.snapshot()
    }
}

/// A concurrent segmented-LRU block cache with a hard memory budget.
///
/// Blocks are opaque byte payloads keyed by name. Lookups and admissions
/// run concurrently from any number of threads; eviction keeps aggregate
/// size under the budget configured at [`start`](Self::start), preferring
/// to retain blocks that were accessed repeatedly or flagged in-memory.
///
/// A freshly constructed cache is stopped: `get_block` and `cache_block`
/// return `None` until `start` is called.
#[derive(Debug, Default)]
pub struct LruBlockCache {
    state: RwLock<Option<Started>>,
    last_max_size: AtomicU64,
}

#[derive(Debug)]
struct Started {
    core: Arc<CacheCore>,
    evictor: Option<EvictionThread>,
}

impl LruBlockCache {
    /// Creates a stopped cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts the cache with the given policy, hard budget and nominal
    /// block size.
    ///
    /// `max_size` must be positive. `block_size` is advisory: it only
    /// pre-sizes the lookup table and is never enforced against admitted
    /// payloads.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for a zero `max_size` or invalid
    /// policy options, and [`Error::AlreadyStarted`] when called without
    /// an intervening `stop`.
    pub fn start(&self, options: CacheOptions, max_size: u64, block_size: u64) -> Result<()> {
        if max_size == 0 {
            return Err(Error::configuration("max_size must be > 0"));
        }
        options.validate()?;

        let mut state = self.state.write();
        if state.is_some() {
            return Err(Error::AlreadyStarted);
        }

        let capacity_hint = (max_size / block_size.max(1)) as usize;
        let core = Arc::new(CacheCore::new(&options, max_size, capacity_hint));
        let evictor = if options.eviction_thread {
            Some(EvictionThread::spawn(Arc::clone(&core)))
        } else {
            None
        };
        *state = Some(Started { core, evictor });
        self.last_max_size.store(max_size, Ordering::Relaxed);

        log::info!(
            "block cache started: max_size={} block_size={} eviction_thread={}",
            max_size,
            block_size,
            options.eviction_thread
        );
        Ok(())
    }

    /// Stops the cache, releasing all entries and joining the eviction
    /// thread. Idempotent: stopping a stopped cache is a no-op.
    ///
    /// Calls already in flight complete against the pre-stop state; calls
    /// arriving afterwards observe an empty cache.
    pub fn stop(&self) {
        let taken = self.state.write().take();
        let Some(mut started) = taken else {
            return;
        };
        if let Some(mut evictor) = started.evictor.take() {
            evictor.shutdown();
        }
        started.core.clear();
        log::info!("block cache stopped");
    }

    /// Admits a block with normal priority. Equivalent to
    /// [`cache_block_with_priority`](Self::cache_block_with_priority)
    /// with `in_memory = false`.
    pub fn cache_block(&self, block_name: &str, buffer: Bytes) -> Option<CacheEntry> {
        self.cache_block_with_priority(block_name, buffer, false)
    }

    /// Admits a block, taking ownership of its payload.
    ///
    /// If the name is already resident this is an idempotent no-op that
    /// returns the existing entry, so racing admissions can never corrupt
    /// the size accounting. Admission never fails for capacity reasons;
    /// an over-budget admission is accepted and eviction catches up.
    ///
    /// Returns `None` only when the cache is stopped.
    pub fn cache_block_with_priority(
        &self,
        block_name: &str,
        buffer: Bytes,
        in_memory: bool,
    ) -> Option<CacheEntry> {
        let state = self.state.read();
        let started = state.as_ref()?;
        let (entry, needs_eviction) = started.core.admit(block_name, buffer, in_memory);
        if needs_eviction {
            match &started.evictor {
                Some(evictor) => evictor.trigger(),
                None => started.core.evict(),
            }
        }
        Some(entry)
    }

    /// Fetches a block from the cache.
    ///
    /// A hit refreshes the entry's recency, promotes a single-access
    /// block to multi-access, and increments both counters. A miss is a
    /// normal outcome: only the request counter moves and `None` is
    /// returned. The cache never fetches from backing storage.
    pub fn get_block(&self, block_name: &str) -> Option<CacheEntry> {
        self.state.read().as_ref()?.core.lookup(block_name)
    }

    /// The configured maximum size in bytes. Retains the last-configured
    /// value after `stop`; 0 before the first `start`.
    pub fn max_size(&self) -> u64 {
        self.last_max_size.load(Ordering::Relaxed)
    }

    /// Current accounted bytes, 0 when stopped.
    pub fn current_size(&self) -> u64 {
        self.state.read().as_ref().map_or(0, |started| started.core.used())
    }

    /// Number of resident blocks, 0 when stopped.
    pub fn block_count(&self) -> usize {
        self.state.read().as_ref().map_or(0, |started| started.core.len())
    }

    /// A snapshot of the hit/request statistics. Zeroed when stopped.
    pub fn stats(&self) -> CacheStats {
        self.state
            .read()
            .as_ref()
            .map_or_else(CacheStats::default, |started| started.core.snapshot_stats())
    }

    /// Whether the cache is currently started.
    pub fn is_started(&self) -> bool {
        self.state.read().is_some()
    }
}

impl Drop for LruBlockCache {
    fn drop(&mut self) {
        // Joins the eviction thread even when the host never calls stop.
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::PER_BLOCK_OVERHEAD;

    /// Inline eviction makes every test deterministic: an admission that
    /// crosses the trigger returns only after usage is back at the
    /// low-water mark.
    fn inline_options() -> CacheOptions {
        CacheOptions::default().eviction_thread(false)
    }

    fn started(max_size: u64) -> LruBlockCache {
        let cache = LruBlockCache::new();
        cache.start(inline_options(), max_size, 1024).unwrap();
        cache
    }

    fn entry_size(name: &str, payload_len: usize) -> u64 {
        payload_len as u64 + name.len() as u64 + PER_BLOCK_OVERHEAD
    }

    #[test]
    fn test_miss_then_hit_counters() {
        let cache = started(1 << 20);

        assert!(cache.get_block("a").is_none());
        let stats = cache.stats();
        assert_eq!(stats.request_count(), 1);
        assert_eq!(stats.hit_count(), 0);

        cache.cache_block("a", Bytes::from_static(b"payload")).unwrap();
        let entry = cache.get_block("a").unwrap();
        assert_eq!(entry.buffer().as_ref(), b"payload");

        let stats = cache.stats();
        assert_eq!(stats.request_count(), 2);
        assert_eq!(stats.hit_count(), 1);
        assert_eq!(stats.insertion_count(), 1);
    }

    #[test]
    fn test_start_rejects_zero_max_size() {
        let cache = LruBlockCache::new();
        let err = cache.start(inline_options(), 0, 1024).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(!cache.is_started());
    }

    #[test]
    fn test_start_rejects_invalid_options() {
        let cache = LruBlockCache::new();
        let options = inline_options().single_fraction(0.9);
        assert!(cache.start(options, 1024, 128).is_err());
    }

    #[test]
    fn test_double_start_fails() {
        let cache = started(1024);
        let err = cache.start(inline_options(), 2048, 128).unwrap_err();
        assert!(matches!(err, Error::AlreadyStarted));
        // The original configuration stays in effect.
        assert_eq!(cache.max_size(), 1024);
    }

    #[test]
    fn test_idempotent_readmission() {
        let cache = started(1 << 20);

        let first = cache.cache_block("blk", Bytes::from_static(b"first")).unwrap();
        let size_after_first = cache.current_size();

        let second = cache.cache_block("blk", Bytes::from_static(b"second")).unwrap();
        assert_eq!(second.buffer().as_ref(), b"first");
        assert_eq!(cache.current_size(), size_after_first);
        assert_eq!(cache.block_count(), 1);

        // The in-memory flag of a re-admission is ignored as well.
        let third = cache
            .cache_block_with_priority("blk", Bytes::from_static(b"third"), true)
            .unwrap();
        assert!(!third.is_in_memory());
        assert_eq!(cache.current_size(), size_after_first);
        assert_eq!(cache.stats().insertion_count(), 1);
        assert_eq!(first.buffer(), third.buffer());
    }

    #[test]
    fn test_eviction_scenario_coldest_single_goes_first() {
        // Budget fits two and a half blocks: admitting the third must
        // evict down to the low-water mark, dropping the coldest blocks.
        let unit = entry_size("A", 400);
        let cache = started(unit * 2 + unit / 2);

        cache.cache_block("A", Bytes::from(vec![b'a'; 400])).unwrap();
        cache.cache_block("B", Bytes::from(vec![b'b'; 400])).unwrap();
        cache.cache_block("C", Bytes::from(vec![b'c'; 400])).unwrap();

        assert!(cache.current_size() <= cache.max_size());
        assert!(cache.get_block("A").is_none());
        let entry = cache.get_block("C").unwrap();
        assert_eq!(entry.buffer().as_ref(), vec![b'c'; 400].as_slice());
        assert!(cache.stats().eviction_count() >= 1);
    }

    #[test]
    fn test_in_memory_block_survives_scan_pressure() {
        let unit = entry_size("mem", 100);
        let cache = started(unit * 10);

        // The in-memory block is admitted first, so by recency alone it
        // would be the first victim.
        cache
            .cache_block_with_priority("mem", Bytes::from(vec![b'm'; 100]), true)
            .unwrap();
        for i in 0..12 {
            cache.cache_block(&format!("s{:02}", i), Bytes::from(vec![b's'; 100])).unwrap();
        }

        assert!(cache.current_size() <= cache.max_size());
        assert!(cache.get_block("mem").is_some());
        assert!(cache.get_block("s00").is_none());
    }

    #[test]
    fn test_promoted_block_outlives_single_access_peers() {
        let unit = entry_size("xx", 100);
        let cache = started(unit * 10);

        cache.cache_block("xx", Bytes::from(vec![b'x'; 100])).unwrap();
        cache.cache_block("yy", Bytes::from(vec![b'y'; 100])).unwrap();

        // Two lookups promote "xx" to the multi-access class.
        assert!(cache.get_block("xx").is_some());
        let promoted = cache.get_block("xx").unwrap();
        assert_eq!(promoted.priority(), BlockPriority::Multi);

        for i in 0..12 {
            cache.cache_block(&format!("z{:02}", i), Bytes::from(vec![b'z'; 100])).unwrap();
        }

        assert!(cache.get_block("xx").is_some());
        assert!(cache.get_block("yy").is_none());
    }

    #[test]
    fn test_oversized_admission_is_accepted_then_evicted() {
        let cache = started(1000);

        let entry = cache.cache_block("huge", Bytes::from(vec![0u8; 5000])).unwrap();
        // The caller's handle stays valid even though the block could not
        // be retained.
        assert_eq!(entry.buffer().len(), 5000);
        assert!(cache.get_block("huge").is_none());
        assert_eq!(cache.current_size(), 0);
    }

    #[test]
    fn test_stop_clears_and_is_idempotent() {
        let cache = started(1 << 20);
        cache.cache_block("a", Bytes::from_static(b"payload")).unwrap();

        cache.stop();
        assert!(!cache.is_started());
        assert!(cache.get_block("a").is_none());
        assert!(cache.cache_block("b", Bytes::from_static(b"late")).is_none());
        assert_eq!(cache.current_size(), 0);
        assert_eq!(cache.max_size(), 1 << 20);

        // Stopping again is a no-op.
        cache.stop();
    }

    #[test]
    fn test_restart_resets_counters_and_contents() {
        let cache = started(1 << 20);
        cache.cache_block("a", Bytes::from_static(b"payload")).unwrap();
        cache.get_block("a").unwrap();
        cache.stop();

        cache.start(inline_options(), 2048, 128).unwrap();
        assert_eq!(cache.max_size(), 2048);
        assert_eq!(cache.stats(), CacheStats::default());
        assert!(cache.get_block("a").is_none());
        assert_eq!(cache.block_count(), 0);
    }

    #[test]
    fn test_background_evictor_start_stop() {
        // Exercises thread spawn/join; eviction behavior itself is
        // covered deterministically by the inline tests.
        let cache = LruBlockCache::new();
        cache.start(CacheOptions::default(), 1 << 20, 1024).unwrap();
        for i in 0..100 {
            cache.cache_block(&format!("blk-{}", i), Bytes::from(vec![0u8; 256])).unwrap();
        }
        cache.stop();
        assert!(!cache.is_started());
    }
}
