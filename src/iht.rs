//! Indexed Hash-Table Cache
//!
//! The cache is an open-addressing hash table with linear probing, a 3-bit
//! aging counter per slot for approximate-LRU eviction, and a fixed item
//! pool referenced by index from the probe slots.
//!
//! # Data Structure
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                           IhtCache                                │
//! │                                                                   │
//! │  slots (M = power of two)          item pool (K = M * alpha)      │
//! │  ┌──────┬────────────┬──────┐      ┌───────────────────────┐      │
//! │  │ hash │ item_index │ age  │──┐   │ key bytes │ val bytes │ 0    │
//! │  ├──────┼────────────┼──────┤  └──▶├───────────┼───────────┤      │
//! │  │ hash │ item_index │ age  │      │ key bytes │ val bytes │ 1    │
//! │  ├──────┼────────────┼──────┤      ├───────────┼───────────┤      │
//! │  │  .   │     .      │  .   │      │     .     │     .     │ ...  │
//! │  └──────┴────────────┴──────┘      └───────────┴───────────┘      │
//! │      ▲                                                            │
//! │  hash & (M-1) = home slot, probe forward until age <= 1           │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Eviction
//!
//! When the item pool is full, an insert sweeps forward from a persistent
//! cursor over at most [`MAX_EVICTION_SEARCH`] live slots. The coldest slot
//! in the window becomes the victim and its pool record is recycled; every
//! other live slot in the window ages down one step. A slot already at the
//! minimum live age is taken immediately. Spreading the decay across inserts
//! is what makes the 3-bit counter approximate LRU without any ordering
//! structure.
//!
//! An evicted slot is marked empty rather than tombstoned. A key that homed
//! before the victim inside the same probe cluster can then miss until the
//! gap is repopulated; the cache trades that occasional spurious miss for
//! tombstone-free probing. Callers get best-effort retention, never wrong
//! values.
//!
//! # Thread Safety
//!
//! `IhtCache` is not thread-safe; every operation takes `&mut self` and
//! callers serialize access externally.

extern crate alloc;

use alloc::boxed::Box;
use alloc::vec;
use core::fmt;
use core::num::NonZeroUsize;

use crate::config::IhtCacheConfig;
use crate::hash::{fast_key_hash, wide_key_hash, FastKey, FastValue};
use crate::metrics::IhtCacheMetrics;
use crate::pool::{AlignedBuf, ItemLayout, ItemPool};
use crate::slot::{is_vacant, SlotEntry, SlotTable, INITIAL_AGE, SLOT_EMPTY, SLOT_MAX_AGE, SLOT_MIN_AGE};

/// Upper bound on live slots visited by one eviction sweep.
pub const MAX_EVICTION_SEARCH: usize = 16;

/// Computes a value for a missing key.
///
/// Receives the key bytes and a zeroed, 16-byte-aligned output buffer of
/// exactly `value_size` bytes. Returns `true` after writing the value,
/// `false` to report that no value exists (the cache is left unchanged).
pub type Filler = Box<dyn FnMut(&[u8], &mut [u8]) -> bool>;

/// Releases resources owned by a value that is being discarded.
///
/// Runs on eviction, on `remove_all`, and on drop. The byte storage itself
/// belongs to the cache; the destroyer only cleans up whatever the value
/// bytes refer to.
pub type ValueDestroyer = Box<dyn FnMut(&mut [u8])>;

/// Fixed-capacity byte-blob cache with aging-based eviction.
///
/// Keys and values are contiguous byte blobs of the exact sizes fixed at
/// creation. The table never grows; once `max_items` distinct keys are
/// resident, every further insert recycles the pool record of an
/// approximately coldest slot. All operations are allocation-free.
///
/// # Example
///
/// ```
/// use iht_cache::IhtCache;
/// use core::num::NonZeroUsize;
///
/// let mut cache = IhtCache::new(
///     NonZeroUsize::new(64).unwrap(),
///     NonZeroUsize::new(8).unwrap(),
///     NonZeroUsize::new(8).unwrap(),
/// );
///
/// assert!(cache.put(&1u64.to_ne_bytes(), &10u64.to_ne_bytes()));
///
/// let mut out = [0u8; 8];
/// assert!(cache.lookup(&1u64.to_ne_bytes(), &mut out));
/// assert_eq!(u64::from_ne_bytes(out), 10);
/// assert!(!cache.lookup(&2u64.to_ne_bytes(), &mut out));
/// ```
pub struct IhtCache {
    config: IhtCacheConfig,
    layout: ItemLayout,
    slots: SlotTable,
    pool: ItemPool,
    item_count: usize,
    max_items: usize,
    /// Sweep cursor; persists across evictions so decay eventually covers
    /// the whole table.
    evict_index: usize,
    filler: Option<Filler>,
    value_destroyer: Option<ValueDestroyer>,
    /// Returned by `get_fast` on a miss that nothing could fill.
    na_value: Box<[u8]>,
    /// Reusable aligned scratch the filler writes into.
    work_value: AlignedBuf,
    metrics: IhtCacheMetrics,
}

impl IhtCache {
    /// Creates a cache with the default load factor and no filler.
    pub fn new(
        min_capacity: NonZeroUsize,
        key_size: NonZeroUsize,
        value_size: NonZeroUsize,
    ) -> Self {
        Self::init(
            IhtCacheConfig::with_sizes(min_capacity, key_size, value_size),
            None,
        )
    }

    /// Creates a cache whose misses are populated by `filler`.
    ///
    /// # Example
    ///
    /// ```
    /// use iht_cache::IhtCache;
    /// use core::num::NonZeroUsize;
    ///
    /// let mut cache = IhtCache::with_filler(
    ///     NonZeroUsize::new(64).unwrap(),
    ///     NonZeroUsize::new(8).unwrap(),
    ///     NonZeroUsize::new(8).unwrap(),
    ///     Box::new(|key, out| {
    ///         let k = u64::from_ne_bytes(key.try_into().unwrap());
    ///         out.copy_from_slice(&(k * k).to_ne_bytes());
    ///         true
    ///     }),
    /// );
    ///
    /// let mut out = [0u8; 8];
    /// assert!(cache.fetch(&9u64.to_ne_bytes(), &mut out));
    /// assert_eq!(u64::from_ne_bytes(out), 81);
    /// ```
    pub fn with_filler(
        min_capacity: NonZeroUsize,
        key_size: NonZeroUsize,
        value_size: NonZeroUsize,
        filler: Filler,
    ) -> Self {
        Self::init(
            IhtCacheConfig::with_sizes(min_capacity, key_size, value_size),
            Some(filler),
        )
    }

    /// Creates a cache from an explicit configuration.
    ///
    /// # Panics
    ///
    /// Panics if `config.max_load_factor` is outside `(0.0, 1.0]`.
    pub fn init(config: IhtCacheConfig, filler: Option<Filler>) -> Self {
        config.validate();
        let layout = ItemLayout::new(config.key_size.get(), config.value_size.get());
        let max_entries = config.max_entries();
        let max_items = config.max_items();
        assert!(
            max_items <= u32::MAX as usize,
            "item pool exceeds 32-bit slot indices"
        );
        Self {
            config,
            layout,
            slots: SlotTable::new(max_entries),
            pool: ItemPool::new(layout, max_items),
            item_count: 0,
            max_items,
            evict_index: 0,
            filler,
            value_destroyer: None,
            na_value: vec![0u8; layout.value_size].into_boxed_slice(),
            work_value: AlignedBuf::zeroed(layout.value_size),
            metrics: IhtCacheMetrics::new(),
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Number of items currently resident.
    #[inline]
    pub fn item_count(&self) -> usize {
        self.item_count
    }

    /// Same as [`item_count`](Self::item_count).
    #[inline]
    pub fn len(&self) -> usize {
        self.item_count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.item_count == 0
    }

    /// Number of items the cache holds once warm.
    #[inline]
    pub fn max_items(&self) -> usize {
        self.max_items
    }

    /// Exact key size in bytes.
    #[inline]
    pub fn key_size(&self) -> usize {
        self.layout.key_size
    }

    /// Exact value size in bytes.
    #[inline]
    pub fn value_size(&self) -> usize {
        self.layout.value_size
    }

    #[inline]
    pub fn max_load_factor(&self) -> f64 {
        self.config.max_load_factor
    }

    #[inline]
    pub fn has_filler(&self) -> bool {
        self.filler.is_some()
    }

    /// Operation counters accumulated since creation or [`clear_stats`](Self::clear_stats).
    #[inline]
    pub fn stats(&self) -> &IhtCacheMetrics {
        &self.metrics
    }

    /// Zeroes all operation counters.
    pub fn clear_stats(&mut self) {
        self.metrics.clear();
    }

    // ------------------------------------------------------------------
    // Staged configuration
    // ------------------------------------------------------------------

    /// Stages a new load factor; takes effect at [`reconfigure`](Self::reconfigure).
    pub fn set_max_load_factor(&mut self, max_load_factor: f64) {
        self.config.max_load_factor = max_load_factor;
    }

    /// Stages a new minimum capacity; takes effect at [`reconfigure`](Self::reconfigure).
    pub fn set_min_capacity(&mut self, min_capacity: NonZeroUsize) {
        self.config.min_capacity = min_capacity;
    }

    /// Installs or removes the value destroyer.
    pub fn set_value_destroyer(&mut self, destroyer: Option<ValueDestroyer>) {
        self.value_destroyer = destroyer;
    }

    /// Sets the value reported by `get_fast` misses that nothing could
    /// fill. `None` resets to all-zero bytes.
    ///
    /// # Panics
    ///
    /// Panics if a provided slice is not exactly `value_size` bytes.
    pub fn set_na_value(&mut self, na_value: Option<&[u8]>) {
        match na_value {
            Some(bytes) => {
                assert_eq!(bytes.len(), self.layout.value_size, "na value size mismatch");
                self.na_value.copy_from_slice(bytes);
            }
            None => self.na_value.fill(0),
        }
    }

    /// Rebuilds the table from the staged configuration.
    ///
    /// Destructive: all resident items are discarded (the value destroyer
    /// runs on each) and the arrays are reallocated to the new sizing.
    /// Statistics survive.
    pub fn reconfigure(&mut self) {
        self.config.validate();
        self.purge_values();
        let max_entries = self.config.max_entries();
        self.max_items = self.config.max_items();
        self.slots = SlotTable::new(max_entries);
        self.pool = ItemPool::new(self.layout, self.max_items);
        self.item_count = 0;
        self.evict_index = 0;
    }

    /// Discards every resident item, running the value destroyer on each.
    pub fn remove_all(&mut self) {
        self.purge_values();
        self.item_count = 0;
        self.slots.clear();
        self.pool.clear();
    }

    // ------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------

    /// Inserts or updates a mapping. Never fails for capacity reasons: a
    /// full cache evicts an approximately coldest entry instead.
    ///
    /// # Panics
    ///
    /// Panics if `key` or `value` does not match the configured sizes.
    pub fn put(&mut self, key: &[u8], value: &[u8]) -> bool {
        assert_eq!(key.len(), self.layout.key_size, "key size mismatch");
        assert_eq!(value.len(), self.layout.value_size, "value size mismatch");
        let slot = self.alloc_slot(key);
        let item = self.slots.entry(slot).item_index as usize;
        self.pool.store(item, key, value);
        true
    }

    /// Copies the value for `key` into `value_out` if resident. Bumps the
    /// entry's age on a hit. Never invokes the filler.
    ///
    /// # Panics
    ///
    /// Panics if `key` or `value_out` does not match the configured sizes.
    pub fn lookup(&mut self, key: &[u8], value_out: &mut [u8]) -> bool {
        assert_eq!(key.len(), self.layout.key_size, "key size mismatch");
        assert_eq!(
            value_out.len(),
            self.layout.value_size,
            "value size mismatch"
        );
        match self.lookup_slot(key) {
            Some(slot) => {
                let item = self.slots.entry(slot).item_index as usize;
                value_out.copy_from_slice(self.pool.value(item));
                true
            }
            None => false,
        }
    }

    /// Like [`lookup`](Self::lookup), but a miss consults the filler and
    /// installs its result. Returns `false` only when there is no filler or
    /// the filler declined.
    pub fn fetch(&mut self, key: &[u8], value_out: &mut [u8]) -> bool {
        assert_eq!(key.len(), self.layout.key_size, "key size mismatch");
        assert_eq!(
            value_out.len(),
            self.layout.value_size,
            "value size mismatch"
        );
        let slot = match self.lookup_slot(key) {
            Some(slot) => slot,
            None => match self.fill_slot(key) {
                Some(slot) => slot,
                None => return false,
            },
        };
        let item = self.slots.entry(slot).item_index as usize;
        value_out.copy_from_slice(self.pool.value(item));
        true
    }

    /// Borrowing variant of [`fetch`](Self::fetch).
    ///
    /// The returned slice points into the item pool and is invalidated by
    /// the next mutating call (`put`, a missing `fetch`/`get`/`get_fast`,
    /// `remove_all`, `reconfigure`).
    pub fn get(&mut self, key: &[u8]) -> Option<&[u8]> {
        assert_eq!(key.len(), self.layout.key_size, "key size mismatch");
        let slot = match self.lookup_slot(key) {
            Some(slot) => Some(slot),
            None => self.fill_slot(key),
        }?;
        let item = self.slots.entry(slot).item_index as usize;
        Some(self.pool.value(item))
    }

    /// Register-sized entry point: the whole key travels in two words and
    /// the value comes back the same way.
    ///
    /// A miss consults the filler like [`fetch`](Self::fetch); if nothing
    /// fills it, the configured NA value (zero bytes by default) is
    /// returned. For keys shorter than 16 bytes the caller must zero the
    /// unused tail of `key`.
    ///
    /// # Panics
    ///
    /// Panics unless both key and value fit 16 bytes (fast mode).
    pub fn get_fast(&mut self, key: FastKey) -> FastValue {
        assert!(
            self.layout.fast_mode,
            "get_fast requires register-sized keys and values"
        );
        if let Some(slot) = self.fast_lookup_slot(key) {
            let item = self.slots.entry(slot).item_index as usize;
            return self.pool.fast_value(item);
        }
        let key_bytes = key.to_bytes();
        match self.fill_slot(&key_bytes[..self.layout.key_size]) {
            Some(slot) => {
                let item = self.slots.entry(slot).item_index as usize;
                self.pool.fast_value(item)
            }
            None => FastValue::from_slice(&self.na_value),
        }
    }

    /// `f64` → `f64` convenience over [`get_fast`](Self::get_fast), for
    /// memoizing numeric functions.
    ///
    /// # Panics
    ///
    /// Panics unless keys and values are both 8 bytes.
    pub fn get_double(&mut self, key: f64) -> f64 {
        assert_eq!(self.layout.key_size, 8, "get_double requires 8-byte keys");
        assert_eq!(
            self.layout.value_size, 8,
            "get_double requires 8-byte values"
        );
        let result = self.get_fast(FastKey::new(key.to_bits(), 0));
        f64::from_bits(result.v0)
    }

    // ------------------------------------------------------------------
    // Engine
    // ------------------------------------------------------------------

    #[inline]
    fn hash_key(&self, key: &[u8]) -> u32 {
        if self.layout.fast_key {
            fast_key_hash(FastKey::from_slice(key))
        } else {
            wide_key_hash(key)
        }
    }

    /// Probe walk for `key`. Returns the slot index on a hit, bumping the
    /// slot's age and the hit counters; counts a miss otherwise.
    fn lookup_slot(&mut self, key: &[u8]) -> Option<usize> {
        let hash = self.hash_key(key);
        let mut index = self.slots.home(hash);
        self.metrics.record_lookup();
        let mut scans = 0u64;
        while !self.slots.is_vacant_at(index) {
            let entry = self.slots.entry(index);
            if entry.hash == hash && self.pool.key(entry.item_index as usize) == key {
                self.metrics.hits.record(scans);
                self.slots.touch(index);
                return Some(index);
            }
            index = self.slots.next(index);
            scans += 1;
        }
        self.metrics.misses.record(scans);
        None
    }

    /// Probe walk specialized for fast mode: two-word key equality against
    /// the padded key blob, first probe unrolled because it is the common
    /// hit case.
    fn fast_lookup_slot(&mut self, key: FastKey) -> Option<usize> {
        let hash = fast_key_hash(key);
        let mut index = self.slots.home(hash);
        self.metrics.record_lookup();

        let state = self.slots.state(index);
        if is_vacant(state) {
            self.metrics.misses.record(0);
            return None;
        }
        let entry = self.slots.entry(index);
        if entry.hash == hash && self.pool.fast_key(entry.item_index as usize) == key {
            self.metrics.hits.record(0);
            self.slots.touch(index);
            return Some(index);
        }

        index = self.slots.next(index);
        let mut scans = 1u64;
        while !self.slots.is_vacant_at(index) {
            let entry = self.slots.entry(index);
            if entry.hash == hash && self.pool.fast_key(entry.item_index as usize) == key {
                self.metrics.hits.record(scans);
                self.slots.touch(index);
                return Some(index);
            }
            index = self.slots.next(index);
            scans += 1;
        }
        self.metrics.misses.record(scans);
        None
    }

    /// Selects and ages the eviction window. Returns the victim slot,
    /// leaving it live; the caller takes its pool record.
    ///
    /// Visits at most [`MAX_EVICTION_SEARCH`] live slots. Vacant slots
    /// advance the cursor without consuming budget. Every live slot that is
    /// not the running victim ages down one step, and a slot at the minimum
    /// live age ends the sweep on the spot.
    fn find_victim(&mut self) -> usize {
        debug_assert!(self.item_count > 0);
        let mut index = self.evict_index;
        let mut victim_index = index;
        let mut victim_state = SLOT_MAX_AGE + 1;
        let mut scans = 0u64;
        let mut search = MAX_EVICTION_SEARCH;
        while search > 0 {
            let state = self.slots.state(index);
            if is_vacant(state) {
                index = self.slots.next(index);
                scans += 1;
                continue;
            }
            if state < victim_state {
                victim_index = index;
                victim_state = state;
                if victim_state == SLOT_MIN_AGE {
                    // Nothing colder exists; stop the sweep here.
                    index = self.slots.next(index);
                    scans += 1;
                    break;
                }
            } else {
                self.slots.decay(index);
            }
            index = self.slots.next(index);
            scans += 1;
            search -= 1;
        }
        self.evict_index = index;
        self.metrics.evictions.record(scans);
        victim_index
    }

    /// Finds or creates the slot for `key`, evicting if the pool is full.
    /// The caller writes the item record at the returned slot's
    /// `item_index`.
    fn alloc_slot(&mut self, key: &[u8]) -> usize {
        let mut victim: Option<(usize, SlotEntry, u8)> = None;
        let mut item_index = self.item_count as u32;

        if self.item_count >= self.max_items {
            // Take the victim up front; the saved tuple is restored in the
            // rare case the key turns out to already be resident.
            let victim_index = self.find_victim();
            let entry = self.slots.entry(victim_index);
            let state = self.slots.state(victim_index);
            self.slots.set_state(victim_index, SLOT_EMPTY);
            self.item_count -= 1;
            item_index = entry.item_index;
            victim = Some((victim_index, entry, state));
        }

        let hash = self.hash_key(key);
        let mut index = self.slots.home(hash);
        let mut scans = 0u64;
        while !self.slots.is_vacant_at(index) {
            let entry = self.slots.entry(index);
            if entry.hash == hash && self.pool.key(entry.item_index as usize) == key {
                // Already resident: this is an update. Resurrect the victim.
                if let Some((victim_index, victim_entry, victim_state)) = victim {
                    self.slots.set_entry(victim_index, victim_entry);
                    self.slots.set_state(victim_index, victim_state);
                    self.item_count += 1;
                }
                self.metrics.updates.record(scans);
                return index;
            }
            index = self.slots.next(index);
            scans += 1;
        }

        // Committed to the insert; the recycled record's old value is
        // discarded for good now.
        if victim.is_some() {
            self.destroy_value(item_index as usize);
        }
        self.slots.set_entry(index, SlotEntry { hash, item_index });
        self.slots.set_state(index, INITIAL_AGE);
        self.metrics.adds.record(scans);
        self.item_count += 1;
        index
    }

    /// Runs the filler for a missing `key` and installs the produced value.
    fn fill_slot(&mut self, key: &[u8]) -> Option<usize> {
        let filler = self.filler.as_mut()?;
        if !filler(key, self.work_value.as_mut_slice()) {
            return None;
        }
        let slot = self.alloc_slot(key);
        let item = self.slots.entry(slot).item_index as usize;
        self.pool.store(item, key, self.work_value.as_slice());
        Some(slot)
    }

    #[inline]
    fn destroy_value(&mut self, item_index: usize) {
        if let Some(destroyer) = self.value_destroyer.as_mut() {
            destroyer(self.pool.value_mut(item_index));
        }
    }

    /// Runs the value destroyer over every resident value.
    fn purge_values(&mut self) {
        if self.value_destroyer.is_none() {
            return;
        }
        for index in 0..self.slots.capacity() {
            if !self.slots.is_vacant_at(index) {
                let item = self.slots.entry(index).item_index as usize;
                self.destroy_value(item);
            }
        }
    }
}

impl Drop for IhtCache {
    fn drop(&mut self) {
        self.purge_values();
    }
}

impl fmt::Debug for IhtCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IhtCache")
            .field("key_size", &self.layout.key_size)
            .field("value_size", &self.layout.value_size)
            .field("item_count", &self.item_count)
            .field("max_items", &self.max_items)
            .field("max_load_factor", &self.config.max_load_factor)
            .field("has_filler", &self.filler.is_some())
            .finish()
    }
}
