//! Aggregate size accounting against the configured memory budget.

use std::sync::atomic::{AtomicU64, Ordering};

/// Tracks the total accounted bytes held by the cache.
///
/// Reservation always succeeds immediately: admission is never blocked on
/// space. Instead, a reservation that pushes usage over the acceptable
/// threshold tells the caller to schedule an eviction pass, which drives
/// usage back down to the low-water mark.
#[derive(Debug)]
pub(crate) struct SizeAccountant {
    used: AtomicU64,
    max_size: u64,
    acceptable: u64,
    low_water: u64,
}

impl SizeAccountant {
    /// Creates an accountant for the given budget. `acceptable_factor`
    /// sets the eviction trigger, `min_factor` the low-water mark.
    pub fn new(max_size: u64, acceptable_factor: f64, min_factor: f64) -> Self {
        Self {
            used: AtomicU64::new(0),
            max_size,
            acceptable: (max_size as f64 * acceptable_factor) as u64,
            low_water: (max_size as f64 * min_factor) as u64,
        }
    }

    /// Reserves `bytes` and returns true when the new total calls for an
    /// eviction pass.
    pub fn reserve(&self, bytes: u64) -> bool {
        let total = self.used.fetch_add(bytes, Ordering::Relaxed) + bytes;
        total > self.acceptable
    }

    /// Releases `bytes` previously reserved. Called only on removal.
    pub fn release(&self, bytes: u64) {
        let prev = self.used.fetch_sub(bytes, Ordering::Relaxed);
        debug_assert!(prev >= bytes, "released more bytes than reserved");
    }

    /// Current accounted total.
    pub fn used(&self) -> u64 {
        self.used.load(Ordering::Relaxed)
    }

    /// The configured hard budget.
    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    /// True when usage is above the eviction trigger threshold.
    pub fn over_acceptable(&self) -> bool {
        self.used() > self.acceptable
    }

    /// Bytes an eviction pass must free to reach the low-water mark.
    pub fn bytes_to_free(&self) -> u64 {
        self.used().saturating_sub(self.low_water)
    }

    /// Drops all accounting. Used by `stop`.
    pub fn reset(&self) {
        self.used.store(0, Ordering::Relaxed);
    }
}
