//! First solution strategies: decision builders growing routes from scratch.

#[cfg(test)]
#[path = "../tests/unit/first_solution_test.rs"]
mod first_solution_test;

use ors_cp::search::{Decision, DecisionBuilder};
use ors_cp::solver::{IntVar, Solver};
use std::rc::Rc;

/// An arc evaluator over variable indices used to rank candidate segments.
pub type SegmentEvaluator = Rc<dyn Fn(i64, i64) -> i64>;

/// The shared plumbing of the route-growing builders.
struct RouteGrower {
    nexts: Vec<IntVar>,
    starts: Vec<usize>,
    evaluator: SegmentEvaluator,
}

impl RouteGrower {
    fn size(&self) -> usize {
        self.nexts.len()
    }

    /// Returns the slot at the open tip of the route of a vehicle, or None
    /// when the route already reached its end.
    fn route_head(&self, solver: &Solver, vehicle: usize) -> Option<usize> {
        let mut current = self.starts[vehicle] as i64;
        loop {
            if current as usize >= self.size() {
                return None;
            }
            let var = self.nexts[current as usize];
            if !solver.is_bound(var) {
                return Some(current as usize);
            }
            let next = solver.value(var);
            if next == current {
                return None;
            }
            current = next;
        }
    }

    /// Ranks the domain of the next variable of `head`: the cheapest
    /// extension first, route ends after every real extension, the self loop
    /// last.
    fn cheapest_value(&self, solver: &Solver, head: usize) -> Option<i64> {
        let values = solver.domain_values(self.nexts[head]);
        let extension = values
            .iter()
            .filter(|&&value| (value as usize) < self.size() && value != head as i64)
            .min_by_key(|&&value| (self.evaluator)(head as i64, value));
        if let Some(&value) = extension {
            return Some(value);
        }
        values.iter().find(|&&value| value as usize >= self.size()).or(values.first()).copied()
    }

    /// Deactivates or closes the slots left once every route is complete
    /// (optional nodes under a disjunction).
    fn leftover_decision(&self, solver: &Solver) -> Option<Decision> {
        (0..self.size()).find(|&index| !solver.is_bound(self.nexts[index])).map(|index| {
            let var = self.nexts[index];
            let value = if solver.contains(var, index as i64) { index as i64 } else { solver.min(var) };
            Decision { var, value }
        })
    }
}

/// Grows each route from its start, connecting the tip to its cheapest
/// feasible successor.
pub struct PathCheapestArc {
    grower: RouteGrower,
}

impl PathCheapestArc {
    /// Creates the builder over the given next variables and route starts.
    pub fn new(nexts: Vec<IntVar>, starts: Vec<usize>, evaluator: SegmentEvaluator) -> Self {
        Self { grower: RouteGrower { nexts, starts, evaluator } }
    }
}

impl DecisionBuilder for PathCheapestArc {
    fn next_decision(&mut self, solver: &mut Solver) -> Option<Decision> {
        for vehicle in 0..self.grower.starts.len() {
            if let Some(head) = self.grower.route_head(solver, vehicle) {
                let value = self.grower.cheapest_value(solver, head)?;
                return Some(Decision { var: self.grower.nexts[head], value });
            }
        }
        self.grower.leftover_decision(solver)
    }
}

/// Repeatedly picks the cheapest arc extending any route.
pub struct GlobalCheapestArc {
    grower: RouteGrower,
}

impl GlobalCheapestArc {
    /// Creates the builder over the given next variables and route starts.
    pub fn new(nexts: Vec<IntVar>, starts: Vec<usize>, evaluator: SegmentEvaluator) -> Self {
        Self { grower: RouteGrower { nexts, starts, evaluator } }
    }
}

impl DecisionBuilder for GlobalCheapestArc {
    fn next_decision(&mut self, solver: &mut Solver) -> Option<Decision> {
        let mut best: Option<(i64, usize, i64)> = None;
        let mut open_head = None;
        for vehicle in 0..self.grower.starts.len() {
            let Some(head) = self.grower.route_head(solver, vehicle) else { continue };
            open_head = open_head.or(Some(head));
            for value in solver.domain_values(self.grower.nexts[head]) {
                if value as usize >= self.grower.size() || value == head as i64 {
                    continue;
                }
                let cost = (self.grower.evaluator)(head as i64, value);
                if best.map_or(true, |(best_cost, _, _)| cost < best_cost) {
                    best = Some((cost, head, value));
                }
            }
        }
        if let Some((_, head, value)) = best {
            return Some(Decision { var: self.grower.nexts[head], value });
        }
        // No real extension anywhere: close the first open route.
        if let Some(head) = open_head {
            let value = self.grower.cheapest_value(solver, head)?;
            return Some(Decision { var: self.grower.nexts[head], value });
        }
        self.grower.leftover_decision(solver)
    }
}

/// Connects the first slot with an unbound successor to its cheapest
/// feasible target.
pub struct LocalCheapestArc {
    grower: RouteGrower,
}

impl LocalCheapestArc {
    /// Creates the builder over the given next variables and route starts.
    pub fn new(nexts: Vec<IntVar>, starts: Vec<usize>, evaluator: SegmentEvaluator) -> Self {
        Self { grower: RouteGrower { nexts, starts, evaluator } }
    }
}

impl DecisionBuilder for LocalCheapestArc {
    fn next_decision(&mut self, solver: &mut Solver) -> Option<Decision> {
        let head = (0..self.grower.size()).find(|&index| !solver.is_bound(self.grower.nexts[index]))?;
        let value = self.grower.cheapest_value(solver, head)?;
        Some(Decision { var: self.grower.nexts[head], value })
    }
}
