#[cfg(test)]
#[path = "../../tests/unit/state/multimap_test.rs"]
mod multimap_test;

use crate::state::{Rev, Trail};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

struct Cell<K, V> {
    key: K,
    value: V,
    next: Rev<i64>,
}

/// A reversible immutable multi-map: insertions performed inside a search
/// frame are undone when the frame is backtracked, existing entries are never
/// mutated.
///
/// The map is a chained hash table whose bucket heads and cell links are
/// reversible slots. It doubles its bucket count when the number of items
/// exceeds twice the number of buckets; the re-linking performed by the
/// doubling is recorded on the trail like any other mutation, while the new
/// bucket array generation simply stops being referenced after a backtrack.
pub struct RevImmutableMultiMap<K, V> {
    generations: Vec<Vec<Rev<i64>>>,
    generation: Rev<i64>,
    cells: Vec<Cell<K, V>>,
    num_items: Rev<i64>,
}

impl<K: Hash + Eq + Clone, V: Clone> RevImmutableMultiMap<K, V> {
    /// Creates a map with the given initial number of buckets.
    pub fn new(trail: &mut Trail, initial_size: usize) -> Self {
        assert!(initial_size > 0, "the map needs at least one bucket");
        let buckets = (0..initial_size).map(|_| Rev::<i64>::new(trail, -1)).collect();
        Self {
            generations: vec![buckets],
            generation: Rev::<i64>::new(trail, 0),
            cells: Vec::new(),
            num_items: Rev::<i64>::new(trail, 0),
        }
    }

    /// Returns the number of items in the map.
    pub fn num_items(&self, trail: &Trail) -> usize {
        self.num_items.value(trail) as usize
    }

    /// Returns true if the map contains at least one instance of `key`.
    pub fn contains_key(&self, trail: &Trail, key: &K) -> bool {
        self.find(trail, key).is_some()
    }

    /// Returns one value attached to `key`, or `default` if `key` is not in
    /// the map. Which value is returned when several are attached to the same
    /// key is not specified.
    pub fn find_with_default(&self, trail: &Trail, key: &K, default: V) -> V {
        self.find(trail, key).map(|cell| self.cells[cell].value.clone()).unwrap_or(default)
    }

    /// Inserts `(key, value)` into the map.
    pub fn insert(&mut self, trail: &mut Trail, key: K, value: V) {
        // Cells above the live count belong to backtracked frames.
        self.cells.truncate(self.num_items(trail));
        let bucket = &self.buckets(trail)[self.bucket_of(trail, &key)];
        let head = bucket.value(trail);
        let bucket = *bucket;
        let next = Rev::<i64>::new(trail, head);
        self.cells.push(Cell { key, value, next });
        bucket.set_value(trail, self.cells.len() as i64 - 1);
        self.num_items.incr(trail);
        if self.num_items(trail) > 2 * self.buckets(trail).len() {
            self.double(trail);
        }
    }

    fn buckets(&self, trail: &Trail) -> &[Rev<i64>] {
        &self.generations[self.generation.value(trail) as usize]
    }

    fn bucket_of(&self, trail: &Trail, key: &K) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        hasher.finish() as usize % self.buckets(trail).len()
    }

    fn find(&self, trail: &Trail, key: &K) -> Option<usize> {
        let mut cell = self.buckets(trail)[self.bucket_of(trail, key)].value(trail);
        while cell >= 0 {
            if self.cells[cell as usize].key == *key {
                return Some(cell as usize);
            }
            cell = self.cells[cell as usize].next.value(trail);
        }
        None
    }

    fn double(&mut self, trail: &mut Trail) {
        let new_size = 2 * self.buckets(trail).len();
        let buckets: Vec<_> = (0..new_size).map(|_| Rev::<i64>::new(trail, -1)).collect();
        self.generations.push(buckets);
        self.generation.set_value(trail, self.generations.len() as i64 - 1);
        for index in 0..self.cells.len() {
            let bucket = self.buckets(trail)[self.bucket_of(trail, &self.cells[index].key)];
            let head = bucket.value(trail);
            self.cells[index].next.set_value(trail, head);
            bucket.set_value(trail, index as i64);
        }
    }
}
