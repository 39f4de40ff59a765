//! # BlockCache - A Concurrent Segmented-LRU Block Cache
//!
//! BlockCache is an in-memory cache for storage-engine file blocks. It
//! serves repeated reads from memory instead of slower backing storage
//! while keeping aggregate size under a hard budget, and it biases
//! retention toward blocks that are reused or explicitly flagged as
//! in-memory (index/metadata blocks).
//!
//! ## Architecture
//!
//! The cache consists of several key components:
//!
//! - **Lookup Table**: lock-striped concurrent index from block name to
//!   entry, the single source of truth for residency
//! - **Size Accountant**: atomic aggregate-size tracking against the
//!   budget, with an eviction trigger and a low-water mark
//! - **Priority Segments**: single-access, multi-access and in-memory
//!   retention classes forming a segmented-LRU discipline
//! - **Evictor**: background (or inline) pass that frees the coldest
//!   blocks of the most over-share segment until usage is back under
//!   the low-water mark
//! - **Stats**: monotonic hit/request counters exposed as snapshots
//!
//! The cache never fetches on a miss: the host application consults
//! [`LruBlockCache::get_block`] before reading from backing storage and
//! calls [`LruBlockCache::cache_block`] after a real fetch.
//!
//! ## Example Usage
//!
//! ```rust
//! use blockcache::{CacheOptions, LruBlockCache};
//! use bytes::Bytes;
//!
//! # fn main() -> Result<(), blockcache::Error> {
//! let cache = LruBlockCache::new();
//! cache.start(CacheOptions::default(), 8 * 1024 * 1024, 4 * 1024)?;
//!
//! // Populate after a real fetch from backing storage.
//! cache.cache_block("sst-000001:0", Bytes::from_static(b"block bytes"));
//!
//! // Serve repeated reads from memory.
//! if let Some(entry) = cache.get_block("sst-000001:0") {
//!     assert_eq!(entry.buffer().as_ref(), b"block bytes");
//! }
//!
//! let stats = cache.stats();
//! assert_eq!(stats.request_count(), 1);
//! assert_eq!(stats.hit_count(), 1);
//!
//! cache.stop();
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

// Module declarations
mod accounting;
mod cache;
pub mod config;
pub mod entry;
pub mod error;
mod evictor;
mod segment;
pub mod stats;
mod table;

// Re-exports
pub use cache::LruBlockCache;
pub use config::CacheOptions;
pub use entry::{BlockPriority, CacheEntry};
pub use error::{Error, Result};
pub use stats::CacheStats;
