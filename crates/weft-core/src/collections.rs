//! Map types backing the component registry and field-state tables.
//!
//! `hashbrown` keyed with `ahash` by default. Enabling the `std-hash` feature
//! falls back to the standard library maps.

#[cfg(feature = "std-hash")]
pub mod map {
    pub type HashMap<K, V> = std::collections::HashMap<K, V>;
    pub type HashSet<K> = std::collections::HashSet<K>;
}

#[cfg(not(feature = "std-hash"))]
pub mod map {
    pub type HashMap<K, V> = hashbrown::HashMap<K, V, ahash::RandomState>;
    pub type HashSet<K> = hashbrown::HashSet<K, ahash::RandomState>;
}
