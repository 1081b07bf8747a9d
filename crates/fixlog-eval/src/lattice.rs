//! Keyed lattice maps joined through a user-supplied least upper bound.
//!
//! A lattice predicate of arity `n` keys on its first `n - 1` positions and
//! stores one lattice element per key. Deriving `p(k…, v)` joins `v` into the
//! stored element; the "changed?" bit plays the role the novelty bit plays
//! for relations.

use fixlog_ir::{LeqFn, LubFn, Tuple, Value};
use rustc_hash::FxHashMap;

/// Storage for a single lattice predicate.
pub struct LatticeMap {
    key_arity: usize,
    bottom: Value,
    leq: LeqFn,
    lub: LubFn,
    /// Key -> slot in `entries`.
    index: FxHashMap<Tuple, usize>,
    /// Entries in key-insertion order. Iteration order is part of the
    /// determinism contract.
    entries: Vec<(Tuple, Value)>,
}

impl LatticeMap {
    pub fn new(key_arity: usize, bottom: Value, leq: LeqFn, lub: LubFn) -> Self {
        Self {
            key_arity,
            bottom,
            leq,
            lub,
            index: FxHashMap::default(),
            entries: Vec::new(),
        }
    }

    pub fn key_arity(&self) -> usize {
        self.key_arity
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of keys holding an element above bottom.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Partial-order test of this lattice.
    pub fn leq(&self, a: &Value, b: &Value) -> bool {
        (self.leq)(a, b)
    }

    /// Join `value` into the element stored at `key`. Returns true iff the
    /// stored element changed. Joining something already below the stored
    /// element (including anything into an absent key that lubs to bottom)
    /// reports no change.
    pub fn join(&mut self, key: Tuple, value: Value) -> bool {
        debug_assert_eq!(key.len(), self.key_arity, "lattice key arity mismatch");
        match self.index.get(&key) {
            Some(&slot) => {
                let current = &self.entries[slot].1;
                let joined = (self.lub)(current, &value);
                if !self.moved_up(current, &joined) {
                    return false;
                }
                self.entries[slot].1 = joined;
                true
            }
            None => {
                let joined = (self.lub)(&self.bottom, &value);
                if !self.moved_up(&self.bottom, &joined) {
                    return false;
                }
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, joined));
                true
            }
        }
    }

    /// The element stored at `key`, or bottom if the key is absent.
    pub fn get(&self, key: &[Value]) -> &Value {
        match self.index.get(key) {
            Some(&slot) => &self.entries[slot].1,
            None => &self.bottom,
        }
    }

    pub fn bottom(&self) -> &Value {
        &self.bottom
    }

    /// Iterate over keys and elements, in key-insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&Tuple, &Value)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub(crate) fn into_entries(self) -> Vec<(Tuple, Value)> {
        self.entries
    }

    /// Whether `joined` is strictly above `current`: value-equality fast
    /// path, then `leq` in both directions for lattices with non-structural
    /// equality.
    fn moved_up(&self, current: &Value, joined: &Value) -> bool {
        if joined == current {
            return false;
        }
        !((self.leq)(joined, current) && (self.leq)(current, joined))
    }
}

impl std::fmt::Debug for LatticeMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LatticeMap")
            .field("key_arity", &self.key_arity)
            .field("bottom", &self.bottom)
            .field("entries", &self.entries)
            .finish()
    }
}
