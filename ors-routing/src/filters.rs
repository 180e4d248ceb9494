//! Local search filters rejecting deltas before any propagation runs.

#[cfg(test)]
#[path = "../tests/unit/filters_test.rs"]
mod filters_test;

use crate::cache::IndexEvaluator;
use ors_cp::search::local::{Delta, LocalSearchFilter, PathState};
use std::rc::Rc;

/// The per-dimension data a filter walk needs.
pub struct DimensionFilterData {
    /// The transit evaluator of the dimension, over variable indices.
    pub evaluator: Rc<IndexEvaluator>,
    /// The upper bound of the cumul variables.
    pub capacity: i64,
}

/// Rejects deltas whose routes overrun a dimension capacity. The walk takes
/// no slack (slack only ever increases cumuls) and clamps at zero, the lower
/// bound of every cumul variable.
pub struct DimensionFilter {
    dimensions: Vec<DimensionFilterData>,
}

impl DimensionFilter {
    /// Creates the filter over the given dimensions.
    pub fn new(dimensions: Vec<DimensionFilterData>) -> Self {
        Self { dimensions }
    }

    fn routes_fit(&self, state: &PathState, nexts: &[i64]) -> bool {
        for dimension in &self.dimensions {
            for path in 0..state.num_paths() {
                let mut cumul: i64 = 0;
                let mut current = state.start(path) as i64;
                let mut steps = 0;
                while !state.is_path_end(current) {
                    let next = nexts[current as usize];
                    if next == current {
                        break;
                    }
                    cumul = (cumul + (dimension.evaluator)(current, next)).max(0);
                    if cumul > dimension.capacity {
                        return false;
                    }
                    current = next;
                    steps += 1;
                    if steps > nexts.len() + 1 {
                        // A cyclic candidate; let the solver reject it.
                        return true;
                    }
                }
            }
        }
        true
    }
}

impl LocalSearchFilter for DimensionFilter {
    fn synchronize(&mut self, _state: &PathState) {}

    fn accept(&mut self, state: &PathState, delta: &Delta) -> bool {
        if !delta.released.is_empty() {
            // The released parts are unknown; the re-optimization decides.
            return true;
        }
        self.routes_fit(state, &state.apply(delta))
    }
}

/// Rejects deltas which cannot improve on the synchronized objective. Only
/// wired when the acceptance rule is a strict descent, as the bound would
/// starve the worsening moves other metaheuristics rely on.
pub struct ObjectiveFilter {
    cost: Rc<dyn Fn(&[i64]) -> i64>,
    bound: i64,
}

impl ObjectiveFilter {
    /// Creates the filter over a full-solution objective function.
    pub fn new(cost: Rc<dyn Fn(&[i64]) -> i64>) -> Self {
        Self { cost, bound: i64::MAX }
    }
}

impl LocalSearchFilter for ObjectiveFilter {
    fn synchronize(&mut self, state: &PathState) {
        self.bound = (self.cost)(state.nexts());
    }

    fn accept(&mut self, state: &PathState, delta: &Delta) -> bool {
        if !delta.released.is_empty() {
            return true;
        }
        (self.cost)(&state.apply(delta)) < self.bound
    }
}
