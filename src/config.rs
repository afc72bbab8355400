//! Cache Configuration
//!
//! Configuration is a plain struct with public fields, created once and
//! handed to [`IhtCache::init`](crate::IhtCache::init). Capacity and load
//! factor can be restaged later through the cache's setters; a subsequent
//! `reconfigure` rebuilds the table (destructively) from the staged values.
//!
//! # Sizing rules
//!
//! For requested minimum capacity `c` and load factor `a`:
//!
//! - slots `M` = smallest power of two >= ceil(max(c, 16) / a)
//! - items `K` = floor(M * a)
//!
//! `K` is the number of keys the cache holds at once; the extra slots keep
//! probe chains short.
//!
//! # Examples
//!
//! ```
//! use iht_cache::IhtCacheConfig;
//! use core::num::NonZeroUsize;
//!
//! let config = IhtCacheConfig {
//!     min_capacity: NonZeroUsize::new(1000).unwrap(),
//!     key_size: NonZeroUsize::new(8).unwrap(),
//!     value_size: NonZeroUsize::new(16).unwrap(),
//!     max_load_factor: 0.5,
//! };
//! assert!(config.max_items() >= 1000);
//! ```

use core::fmt;
use core::num::NonZeroUsize;

/// Capacity floor applied to every cache regardless of the requested minimum.
pub const MIN_CAPACITY: usize = 16;

/// Load factor used when none is specified.
pub const DEFAULT_LOAD_FACTOR: f64 = 0.40;

/// Configuration for an indexed hash-table cache.
///
/// Key and value sizes are fixed for the lifetime of a cache. Capacity and
/// load factor are staged values: changing them on a live cache takes effect
/// at the next [`reconfigure`](crate::IhtCache::reconfigure).
#[derive(Clone, Copy)]
pub struct IhtCacheConfig {
    /// Minimum number of items the cache must be able to hold.
    pub min_capacity: NonZeroUsize,
    /// Exact size of every key, in bytes.
    pub key_size: NonZeroUsize,
    /// Exact size of every value, in bytes.
    pub value_size: NonZeroUsize,
    /// Upper bound on `items / slots`, in `(0.0, 1.0]`. Lower values trade
    /// memory for shorter probe chains.
    pub max_load_factor: f64,
}

impl IhtCacheConfig {
    /// Config with the default load factor.
    pub fn with_sizes(
        min_capacity: NonZeroUsize,
        key_size: NonZeroUsize,
        value_size: NonZeroUsize,
    ) -> Self {
        Self {
            min_capacity,
            key_size,
            value_size,
            max_load_factor: DEFAULT_LOAD_FACTOR,
        }
    }

    /// Asserts the constraints that the sizing arithmetic relies on.
    pub(crate) fn validate(&self) {
        assert!(
            self.max_load_factor > 0.0 && self.max_load_factor <= 1.0,
            "max_load_factor must be in (0.0, 1.0], got {}",
            self.max_load_factor
        );
    }

    /// Number of probe slots implied by this configuration.
    pub fn max_entries(&self) -> usize {
        let capacity = self.min_capacity.get().max(MIN_CAPACITY);
        // ceil(capacity / load_factor) without pulling in a float ceil.
        let mut min_entries = (capacity as f64 / self.max_load_factor) as usize;
        if (min_entries as f64) * self.max_load_factor < capacity as f64 {
            min_entries += 1;
        }
        min_entries.next_power_of_two()
    }

    /// Number of items the cache will hold at once.
    pub fn max_items(&self) -> usize {
        (self.max_entries() as f64 * self.max_load_factor) as usize
    }
}

impl fmt::Debug for IhtCacheConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IhtCacheConfig")
            .field("min_capacity", &self.min_capacity)
            .field("key_size", &self.key_size)
            .field("value_size", &self.value_size)
            .field("max_load_factor", &self.max_load_factor)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nz(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn test_config_creation() {
        let config = IhtCacheConfig::with_sizes(nz(100), nz(8), nz(8));
        assert_eq!(config.min_capacity.get(), 100);
        assert_eq!(config.max_load_factor, DEFAULT_LOAD_FACTOR);
    }

    #[test]
    fn test_sizing_applies_capacity_floor() {
        // A tiny request is raised to MIN_CAPACITY before sizing.
        let config = IhtCacheConfig {
            min_capacity: nz(4),
            key_size: nz(8),
            value_size: nz(8),
            max_load_factor: 0.5,
        };
        assert_eq!(config.max_entries(), 32);
        assert_eq!(config.max_items(), 16);
    }

    #[test]
    fn test_sizing_rounds_slots_to_power_of_two() {
        let config = IhtCacheConfig {
            min_capacity: nz(16),
            key_size: nz(8),
            value_size: nz(8),
            max_load_factor: 0.40,
        };
        // ceil(16 / 0.4) = 40 rounds up to 64 slots.
        assert_eq!(config.max_entries(), 64);
        assert_eq!(config.max_items(), 25);
    }

    #[test]
    fn test_full_load_factor_sizes_exactly() {
        let config = IhtCacheConfig {
            min_capacity: nz(16),
            key_size: nz(8),
            value_size: nz(8),
            max_load_factor: 1.0,
        };
        assert_eq!(config.max_entries(), 16);
        assert_eq!(config.max_items(), 16);
    }

    #[test]
    fn test_max_items_covers_requested_capacity() {
        for cap in [1usize, 16, 100, 1000, 4096] {
            for alpha in [0.1, 0.25, 0.4, 0.75, 1.0] {
                let config = IhtCacheConfig {
                    min_capacity: nz(cap),
                    key_size: nz(8),
                    value_size: nz(8),
                    max_load_factor: alpha,
                };
                assert!(
                    config.max_items() >= cap.max(MIN_CAPACITY),
                    "cap={cap} alpha={alpha}"
                );
            }
        }
    }

    #[test]
    #[should_panic(expected = "max_load_factor")]
    fn test_validate_rejects_out_of_range_load_factor() {
        let config = IhtCacheConfig {
            min_capacity: nz(16),
            key_size: nz(8),
            value_size: nz(8),
            max_load_factor: 1.5,
        };
        config.validate();
    }
}
