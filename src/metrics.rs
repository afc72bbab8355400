//! Cache Statistics
//!
//! Every operation class keeps a `(count, scans)` pair: how many times the
//! operation ran and how many probe steps it took beyond the home slot (for
//! evictions, how many sweep steps). The scan totals are the cheapest honest
//! signal of table health: a rising hit-scan ratio means clusters are
//! growing and the load factor is too aggressive.
//!
//! Reporting goes through the [`CacheMetrics`] trait as a `BTreeMap` so that
//! metric keys always come out in the same order, which keeps test output and
//! exported snapshots reproducible. Human-readable output is the `Display`
//! impl; the engine itself never formats text.

extern crate alloc;

use alloc::collections::BTreeMap;
use alloc::format;
use alloc::string::{String, ToString};
use core::fmt;

/// Counter for one operation class: occurrences plus probe scans.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct OpCounter {
    /// Number of times the operation completed.
    pub count: u64,
    /// Probe steps taken past the home slot, summed over all occurrences.
    pub scans: u64,
}

impl OpCounter {
    #[inline]
    pub(crate) fn record(&mut self, scans: u64) {
        self.count += 1;
        self.scans += scans;
    }

    /// Average scans per occurrence, or -1.0 when the counter is empty.
    pub fn scan_ratio(&self) -> f64 {
        if self.count > 0 {
            self.scans as f64 / self.count as f64
        } else {
            -1.0
        }
    }
}

/// Statistics block of one cache instance.
///
/// `lookups` counts every probe-sequence walk started by `lookup`, `fetch`,
/// `get` and `get_fast`. Each walk then lands in exactly one of `hits` or
/// `misses`. `adds`, `updates` and `evictions` are insertion-side counters;
/// `put` contributes to those without touching `lookups`.
#[derive(Debug, Default, Clone)]
pub struct IhtCacheMetrics {
    pub lookups: u64,
    pub hits: OpCounter,
    pub misses: OpCounter,
    pub adds: OpCounter,
    pub updates: OpCounter,
    pub evictions: OpCounter,
}

impl IhtCacheMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn record_lookup(&mut self) {
        self.lookups += 1;
    }

    /// Fraction of lookups that hit, in `[0.0, 1.0]`.
    pub fn hit_rate(&self) -> f64 {
        if self.lookups > 0 {
            self.hits.count as f64 / self.lookups as f64
        } else {
            0.0
        }
    }

    /// Fraction of lookups that missed, in `[0.0, 1.0]`.
    pub fn miss_rate(&self) -> f64 {
        if self.lookups > 0 {
            self.misses.count as f64 / self.lookups as f64
        } else {
            0.0
        }
    }

    /// Zeroes every counter.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// One-line digest: lookup volume and hit/miss percentages.
    pub fn summary(&self) -> String {
        format!(
            "lookups: {} hit={:.2} miss={:.2}",
            self.lookups,
            100.0 * self.hit_rate(),
            100.0 * self.miss_rate()
        )
    }

    /// All counters as key-value pairs in deterministic order.
    pub fn to_btreemap(&self) -> BTreeMap<String, f64> {
        let mut metrics = BTreeMap::new();
        metrics.insert("lookups".to_string(), self.lookups as f64);
        metrics.insert("hit_rate".to_string(), self.hit_rate());
        metrics.insert("miss_rate".to_string(), self.miss_rate());
        for (name, counter) in [
            ("hits", &self.hits),
            ("misses", &self.misses),
            ("adds", &self.adds),
            ("updates", &self.updates),
            ("evictions", &self.evictions),
        ] {
            metrics.insert(name.to_string(), counter.count as f64);
            let mut scans_key = String::from(name);
            scans_key.push_str("_scans");
            metrics.insert(scans_key, counter.scans as f64);
        }
        metrics
    }
}

impl fmt::Display for IhtCacheMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Cache Stats: {}", self.summary())?;
        for (name, counter) in [
            ("hits", &self.hits),
            ("misses", &self.misses),
            ("adds", &self.adds),
            ("updates", &self.updates),
            ("evictions", &self.evictions),
        ] {
            writeln!(
                f,
                "  {}: {} (scans={}, ratio={:.2})",
                name,
                counter.count,
                counter.scans,
                counter.scan_ratio()
            )?;
        }
        Ok(())
    }
}

/// Uniform metrics reporting for cache implementations.
///
/// `BTreeMap` rather than a hash map so that iteration order, and therefore
/// any serialized or printed form, is deterministic.
pub trait CacheMetrics {
    /// Returns all metrics as key-value pairs in deterministic order.
    fn metrics(&self) -> BTreeMap<String, f64>;

    /// Short identifier of the implementation (for labeling reports).
    fn algorithm_name(&self) -> &'static str;
}

impl CacheMetrics for IhtCacheMetrics {
    fn metrics(&self) -> BTreeMap<String, f64> {
        self.to_btreemap()
    }

    fn algorithm_name(&self) -> &'static str {
        "IHT"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let mut stats = IhtCacheMetrics::new();
        stats.record_lookup();
        stats.record_lookup();
        stats.hits.record(0);
        stats.misses.record(3);
        assert_eq!(stats.lookups, 2);
        assert_eq!(stats.hits.count, 1);
        assert_eq!(stats.misses.scans, 3);
        assert_eq!(stats.hit_rate(), 0.5);
        assert_eq!(stats.miss_rate(), 0.5);
    }

    #[test]
    fn test_empty_counter_ratio_is_sentinel() {
        assert_eq!(OpCounter::default().scan_ratio(), -1.0);
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut stats = IhtCacheMetrics::new();
        stats.record_lookup();
        stats.adds.record(5);
        stats.clear();
        assert_eq!(stats.lookups, 0);
        assert_eq!(stats.adds, OpCounter::default());
    }

    #[test]
    fn test_btreemap_reports_all_counters() {
        let mut stats = IhtCacheMetrics::new();
        stats.record_lookup();
        stats.hits.record(2);
        stats.evictions.record(7);
        let map = stats.metrics();
        assert_eq!(map.get("lookups"), Some(&1.0));
        assert_eq!(map.get("hits"), Some(&1.0));
        assert_eq!(map.get("hits_scans"), Some(&2.0));
        assert_eq!(map.get("evictions_scans"), Some(&7.0));
        assert_eq!(map.get("hit_rate"), Some(&1.0));
        assert_eq!(stats.algorithm_name(), "IHT");
    }

    #[test]
    fn test_display_contains_every_counter_line() {
        let stats = IhtCacheMetrics::new();
        let text = format!("{stats}");
        for label in ["hits", "misses", "adds", "updates", "evictions"] {
            assert!(text.contains(label), "missing {label} in {text}");
        }
    }
}
