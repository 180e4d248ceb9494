//! The memoizing wrapper around arc cost evaluators.

#[cfg(test)]
#[path = "../tests/unit/cache_test.rs"]
mod cache_test;

use std::cell::RefCell;
use std::rc::Rc;

/// An arc cost evaluator over variable indices.
pub type IndexEvaluator = dyn Fn(i64, i64) -> i64;

/// One memoized arc cost: the last queried target and vehicle for a given
/// source slot, with the cost computed then.
#[derive(Clone, Copy, Debug)]
pub struct CostCacheElement {
    /// The target slot of the memoized query.
    pub node: i64,
    /// The vehicle of the memoized query.
    pub vehicle: i64,
    /// The memoized cost.
    pub cost: i64,
}

/// Caches arc costs per source slot: sequential search re-queries of the
/// same `(from, to, vehicle)` triple are answered without calling the
/// evaluator again.
pub struct RoutingCache {
    evaluators: Vec<Rc<IndexEvaluator>>,
    cache: RefCell<Vec<CostCacheElement>>,
}

impl RoutingCache {
    /// Creates a cache over one evaluator per vehicle, for `size` source
    /// slots.
    pub fn new(evaluators: Vec<Rc<IndexEvaluator>>, size: usize) -> Self {
        assert!(!evaluators.is_empty());
        Self { evaluators, cache: RefCell::new(vec![CostCacheElement { node: -1, vehicle: -1, cost: 0 }; size]) }
    }

    /// Returns the cost of the arc `(from, to)` for the vehicle, memoizing
    /// the query.
    pub fn cost(&self, from: i64, to: i64, vehicle: i64) -> i64 {
        let slot = from as usize;
        {
            let cache = self.cache.borrow();
            let element = &cache[slot];
            if element.node == to && element.vehicle == vehicle {
                return element.cost;
            }
        }
        debug_assert!((vehicle as usize) < self.evaluators.len());
        let evaluator = &self.evaluators[vehicle as usize];
        let cost = evaluator(from, to);
        self.cache.borrow_mut()[slot] = CostCacheElement { node: to, vehicle, cost };
        cost
    }

    /// Forgets every memoized cost.
    pub fn clear(&self) {
        let mut cache = self.cache.borrow_mut();
        cache.iter_mut().for_each(|element| *element = CostCacheElement { node: -1, vehicle: -1, cost: 0 });
    }
}
