//! Fx hash map and set aliases.
//!
//! Field-name indexes and duplicate-key tables are keyed by short strings
//! from trusted input files, which is the case the Fx hash from
//! `rustc-hash` is built for. No denial-of-service resistance is needed.
//!
//! # Examples
//!
//! ```
//! use rf_core::{FxHashMap, fx_hash_map};
//!
//! let mut seen: FxHashMap<String, usize> = fx_hash_map();
//! *seen.entry("John|".to_owned()).or_default() += 1;
//! assert_eq!(seen.get("John|"), Some(&1));
//! ```

/// A [`HashMap`](std::collections::HashMap) using the Fx hash algorithm.
pub type FxHashMap<K, V> = rustc_hash::FxHashMap<K, V>;

/// A [`HashSet`](std::collections::HashSet) using the Fx hash algorithm.
pub type FxHashSet<V> = rustc_hash::FxHashSet<V>;

/// Creates a new empty [`FxHashMap`].
#[inline]
#[must_use]
pub fn fx_hash_map<K, V>() -> FxHashMap<K, V> {
    FxHashMap::default()
}

/// Creates a new empty [`FxHashSet`].
#[inline]
#[must_use]
pub fn fx_hash_set<V>() -> FxHashSet<V> {
    FxHashSet::default()
}

/// Creates a new [`FxHashMap`] able to hold `capacity` entries without
/// reallocating.
///
/// ```
/// use rf_core::fx_hash_map_with_capacity;
///
/// let map: rf_core::FxHashMap<String, usize> = fx_hash_map_with_capacity(16);
/// assert!(map.capacity() >= 16);
/// ```
#[inline]
#[must_use]
pub fn fx_hash_map_with_capacity<K, V>(capacity: usize) -> FxHashMap<K, V> {
    FxHashMap::with_capacity_and_hasher(capacity, rustc_hash::FxBuildHasher)
}
