#![doc = include_str!("../README.md")]
//!
//! ---
//!
//! # How It Fits Together
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                        get / fetch (key)                             │
//! │                              │                                       │
//! │                              ▼                                       │
//! │                       ┌────────────┐                                 │
//! │                       │   hasher   │  CRC32 (SSE 4.2) or mix         │
//! │                       └─────┬──────┘                                 │
//! │                             ▼                                        │
//! │                     ┌───────────────┐    hit: bump age, return       │
//! │                     │ lookup engine │──────────────────────────▶     │
//! │                     └───────┬───────┘                                │
//! │                        miss │                                        │
//! │                             ▼                                        │
//! │                      ┌────────────┐  declined: report failure        │
//! │                      │   filler   │─────────────────────────▶        │
//! │                      └─────┬──────┘                                  │
//! │                    value   │                                         │
//! │                            ▼                                        │
//! │                  ┌──────────────────┐   pool full   ┌──────────────┐ │
//! │                  │ insertion engine │──────────────▶│ eviction     │ │
//! │                  │                  │◀──────────────│ sweep        │ │
//! │                  └──────────────────┘  freed index  └──────────────┘ │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `put` and `lookup` use the same machinery but never consult the filler.
//!
//! # Operations
//!
//! | Operation | Effect | May evict | Calls filler |
//! |-----------|--------|-----------|--------------|
//! | [`IhtCache::put`] | insert or update | yes | no |
//! | [`IhtCache::lookup`] | copy value out on hit | no | no |
//! | [`IhtCache::fetch`] | copy value out, fill on miss | on fill | yes |
//! | [`IhtCache::get`] | borrow value, fill on miss | on fill | yes |
//! | [`IhtCache::get_fast`] | register-sized get, NA on dry miss | on fill | yes |
//! | [`IhtCache::remove_all`] | discard everything | no | no |
//! | [`IhtCache::reconfigure`] | rebuild from staged config | no | no |
//!
//! # Modules
//!
//! - [`hash`]: key hashing, [`FastKey`]/[`FastValue`] register types
//! - [`config`]: sizing rules and the [`IhtCacheConfig`] struct
//! - [`metrics`]: per-operation counters and the [`CacheMetrics`] trait
//! - [`iht`]: the cache engine itself

#![no_std]

#[cfg(feature = "std")]
extern crate std;

extern crate alloc;

/// Key hashing.
///
/// Register-sized keys hash through hardware CRC32 when available, a
/// golden-ratio mixer otherwise; wider keys fold 8-byte chunks. Also home
/// of the [`FastKey`] and [`FastValue`] pair types.
pub mod hash;

/// Cache configuration and sizing rules.
pub mod config;

/// Probe-slot table: cached hashes, item indices, and the age bytes that
/// drive the eviction policy.
mod slot;

/// Item pool: the fixed arena of key/value records referenced by slot
/// index.
mod pool;

/// The cache engine: lookup, insertion, eviction, filler integration, and
/// lifecycle.
pub mod iht;

/// Operation statistics.
///
/// Each operation class counts occurrences and probe scans; reporting is
/// deterministic through the [`CacheMetrics`] trait.
pub mod metrics;

pub use config::{IhtCacheConfig, DEFAULT_LOAD_FACTOR, MIN_CAPACITY};
pub use hash::{FastKey, FastValue};
pub use iht::{Filler, IhtCache, ValueDestroyer, MAX_EVICTION_SEARCH};
pub use metrics::{CacheMetrics, IhtCacheMetrics, OpCounter};
