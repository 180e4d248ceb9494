//! A table constraint over pairs of variables.

#[cfg(test)]
#[path = "../../tests/unit/solver/table_test.rs"]
mod table_test;

use crate::solver::{Constraint, CpResult, Demon, IntVar, Solver};
use crate::tuples::IntTupleSet;

/// Constrains `(x, y)` to take one of the value pairs of a tuple set of
/// arity two.
pub struct AllowedPairs {
    x: IntVar,
    y: IntVar,
    tuples: IntTupleSet,
}

impl AllowedPairs {
    /// Creates the constraint; the tuple set must have arity two.
    pub fn new(x: IntVar, y: IntVar, tuples: IntTupleSet) -> Self {
        assert_eq!(tuples.arity(), 2, "pairwise table constraint needs tuples of arity two");
        Self { x, y, tuples }
    }

    fn has_support_for_x(&self, solver: &Solver, value: i64) -> bool {
        solver.domain_values(self.y).iter().any(|&other| self.tuples.contains(&[value, other]))
    }

    fn has_support_for_y(&self, solver: &Solver, value: i64) -> bool {
        solver.domain_values(self.x).iter().any(|&other| self.tuples.contains(&[other, value]))
    }

    fn filter(&self, solver: &mut Solver) -> CpResult<()> {
        for value in solver.domain_values(self.x) {
            if !self.has_support_for_x(solver, value) {
                solver.remove_value(self.x, value)?;
            }
        }
        for value in solver.domain_values(self.y) {
            if !self.has_support_for_y(solver, value) {
                solver.remove_value(self.y, value)?;
            }
        }
        Ok(())
    }
}

impl Constraint for AllowedPairs {
    fn post(&self, solver: &mut Solver, constraint: usize) {
        solver.when_bound(self.x, Demon { constraint, payload: 0 });
        solver.when_bound(self.y, Demon { constraint, payload: 1 });
    }

    fn initial_propagate(&self, solver: &mut Solver) -> CpResult<()> {
        self.filter(solver)
    }

    fn propagate(&self, solver: &mut Solver, _payload: i64) -> CpResult<()> {
        self.filter(solver)
    }
}
