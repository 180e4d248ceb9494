//! A set of integer tuples (fixed-size arrays, all of the same size) with a
//! basic API.
//!
//! The key feature is the lazy copy: cloning an [`IntTupleSet`] only bumps
//! the owner count of the shared payload, and a mutation through a handle
//! whose payload is shared clones the payload first. The owner count is the
//! strong count of the shared pointer, so the compiler enforces the
//! single-thread restriction of the scheme.

#[cfg(test)]
#[path = "../tests/unit/tuples_test.rs"]
mod tuples_test;

use hashbrown::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

#[derive(Clone, Debug, Default)]
struct Data {
    arity: usize,
    flat_tuples: Vec<i64>,
    /// Maps a tuple fingerprint to the tuples carrying it, by their start
    /// offset in `flat_tuples`.
    fingerprints: HashMap<u64, Vec<usize>>,
}

impl Data {
    fn fingerprint(tuple: &[i64]) -> u64 {
        let mut hasher = DefaultHasher::new();
        tuple.hash(&mut hasher);
        hasher.finish()
    }

    fn contains(&self, candidate: &[i64]) -> bool {
        if candidate.len() != self.arity {
            return false;
        }
        match self.fingerprints.get(&Self::fingerprint(candidate)) {
            Some(offsets) => offsets.iter().any(|&offset| &self.flat_tuples[offset..offset + self.arity] == candidate),
            None => false,
        }
    }

    fn insert(&mut self, tuple: &[i64]) {
        assert_eq!(tuple.len(), self.arity, "tuple length must match the arity of the set");
        if !self.contains(tuple) {
            let offset = self.flat_tuples.len();
            self.flat_tuples.extend_from_slice(tuple);
            self.fingerprints.entry(Self::fingerprint(tuple)).or_default().push(offset);
        }
    }
}

/// A set of integer tuples of a fixed arity, with clone-on-write payload
/// sharing.
#[derive(Clone, Debug)]
pub struct IntTupleSet {
    data: Rc<Data>,
}

impl IntTupleSet {
    /// Creates an empty tuple set with a fixed length for all tuples.
    pub fn new(arity: usize) -> Self {
        Self { data: Rc::new(Data { arity, ..Data::default() }) }
    }

    /// Inserts the tuple into the set; does nothing if the tuple is already
    /// present. The tuple length must equal the arity of the set.
    pub fn insert(&mut self, tuple: &[i64]) {
        Rc::make_mut(&mut self.data).insert(tuple);
    }

    /// Arity-fixed version of insert removing the need for a slice.
    pub fn insert2(&mut self, v0: i64, v1: i64) {
        self.insert(&[v0, v1]);
    }

    /// Arity-fixed version of insert removing the need for a slice.
    pub fn insert3(&mut self, v0: i64, v1: i64, v2: i64) {
        self.insert(&[v0, v1, v2]);
    }

    /// Inserts all the tuples.
    pub fn insert_all<'a, I: IntoIterator<Item = &'a [i64]>>(&mut self, tuples: I) {
        for tuple in tuples {
            self.insert(tuple);
        }
    }

    /// Checks if the tuple is in the set.
    pub fn contains(&self, tuple: &[i64]) -> bool {
        self.data.contains(tuple)
    }

    /// Returns the number of tuples.
    pub fn num_tuples(&self) -> usize {
        if self.data.arity == 0 {
            0
        } else {
            self.data.flat_tuples.len() / self.data.arity
        }
    }

    /// Returns the arity of the set.
    pub fn arity(&self) -> usize {
        self.data.arity
    }

    /// Returns the value of the given tuple at the given position.
    pub fn value(&self, tuple_index: usize, pos_in_tuple: usize) -> i64 {
        debug_assert!(tuple_index < self.num_tuples() && pos_in_tuple < self.data.arity);
        self.data.flat_tuples[tuple_index * self.data.arity + pos_in_tuple]
    }

    /// Removes all tuples, detaching from any shared payload first.
    pub fn clear(&mut self) {
        let data = Rc::make_mut(&mut self.data);
        data.flat_tuples.clear();
        data.fingerprints.clear();
    }

    /// Returns the number of handles sharing the payload of this set.
    pub fn num_shared_owners(&self) -> usize {
        Rc::strong_count(&self.data)
    }
}
