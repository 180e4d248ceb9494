//! The propagators the routing model composes: path structure, activity,
//! disjunctions, dimensions and the cost aggregation.

#[cfg(test)]
#[path = "../tests/unit/constraints_test.rs"]
mod constraints_test;

use crate::cache::IndexEvaluator;
use ors_cp::solver::{Constraint, CpResult, Demon, Failure, IntVar, Solver};
use ors_cp::state::{Rev, RevSwitch, SmallRevBitSet};
use std::rc::Rc;

/// Maintains the path structure over the next variables: at most one
/// predecessor per slot, no cycle avoiding the route ends, and vehicle
/// equality along bound chains.
///
/// Chain heads and tails are kept reversibly; binding `next[i] = j` merges
/// the chain ending at `i` with the one starting at `j` and forbids the arc
/// that would close the merged chain into a cycle.
pub struct PathConstraint {
    nexts: Vec<IntVar>,
    vehicles: Vec<IntVar>,
    chain_head: Vec<Rev<i64>>,
    chain_tail: Vec<Rev<i64>>,
    pred: Vec<Rev<i64>>,
    starts: Vec<usize>,
}

impl PathConstraint {
    /// Creates the constraint; `vehicles` covers every slot including the
    /// route ends.
    pub fn new(solver: &mut Solver, nexts: Vec<IntVar>, vehicles: Vec<IntVar>, starts: Vec<usize>) -> Self {
        let total = vehicles.len();
        let trail = solver.trail_mut();
        let chain_head = (0..total).map(|index| Rev::<i64>::new(trail, index as i64)).collect();
        let chain_tail = (0..total).map(|index| Rev::<i64>::new(trail, index as i64)).collect();
        let pred = (0..total).map(|_| Rev::<i64>::new(trail, -1)).collect();
        Self { nexts, vehicles, chain_head, chain_tail, pred, starts }
    }

    fn size(&self) -> usize {
        self.nexts.len()
    }

    fn equalize_vehicles(&self, solver: &mut Solver, first: usize, second: usize) -> CpResult<()> {
        let first = self.vehicles[first];
        let second = self.vehicles[second];
        solver.set_range(first, solver.min(second), solver.max(second))?;
        solver.set_range(second, solver.min(first), solver.max(first))
    }

    fn propagate_next_bound(&self, solver: &mut Solver, index: usize) -> CpResult<()> {
        let next = solver.value(self.nexts[index]);
        if next == index as i64 {
            // A self loop keeps the slot out of every chain.
            return Ok(());
        }
        let next = next as usize;
        if self.pred[next].value(solver.trail()) == index as i64 {
            return Ok(());
        }
        self.pred[next].set_value(solver.trail_mut(), index as i64);
        // One predecessor per slot: no other next variable may take this
        // value.
        for (other, &var) in self.nexts.iter().enumerate() {
            if other != index {
                solver.remove_value(var, next as i64)?;
            }
        }
        // Merge the chains and forbid closing them into a cycle.
        let head = self.chain_head[index].value(solver.trail());
        let tail = self.chain_tail[next].value(solver.trail());
        self.chain_tail[head as usize].set_value(solver.trail_mut(), tail);
        self.chain_head[tail as usize].set_value(solver.trail_mut(), head);
        let head_is_start = (head as usize) < self.size() && self.starts.contains(&(head as usize));
        if (tail as usize) < self.size() && !head_is_start {
            solver.remove_value(self.nexts[tail as usize], head)?;
        }
        self.equalize_vehicles(solver, index, next)
    }

    fn propagate_vehicle_change(&self, solver: &mut Solver, index: usize) -> CpResult<()> {
        if index < self.size() && solver.is_bound(self.nexts[index]) {
            let next = solver.value(self.nexts[index]);
            if next != index as i64 {
                self.equalize_vehicles(solver, index, next as usize)?;
            }
        }
        let pred = self.pred[index].value(solver.trail());
        if pred >= 0 {
            self.equalize_vehicles(solver, pred as usize, index)?;
        }
        Ok(())
    }
}

impl Constraint for PathConstraint {
    fn post(&self, solver: &mut Solver, constraint: usize) {
        let total = self.vehicles.len() as i64;
        for (index, &var) in self.nexts.iter().enumerate() {
            solver.when_bound(var, Demon { constraint, payload: index as i64 });
        }
        for (index, &var) in self.vehicles.iter().enumerate() {
            solver.when_domain(var, Demon { constraint, payload: total + index as i64 });
        }
    }

    fn initial_propagate(&self, solver: &mut Solver) -> CpResult<()> {
        for index in 0..self.size() {
            if solver.is_bound(self.nexts[index]) {
                self.propagate_next_bound(solver, index)?;
            }
        }
        Ok(())
    }

    fn propagate(&self, solver: &mut Solver, payload: i64) -> CpResult<()> {
        let total = self.vehicles.len() as i64;
        if payload < total {
            self.propagate_next_bound(solver, payload as usize)
        } else {
            self.propagate_vehicle_change(solver, (payload - total) as usize)
        }
    }
}

/// Channels `active[i] = 0` with the self loop `next[i] = i`: a skipped slot
/// loops on itself, a visited slot does not, and a slot some bound arc
/// points at is visited.
pub struct ActivityConstraint {
    nexts: Vec<IntVar>,
    actives: Vec<IntVar>,
}

impl ActivityConstraint {
    /// Creates the constraint over parallel next and active variables.
    pub fn new(nexts: Vec<IntVar>, actives: Vec<IntVar>) -> Self {
        assert_eq!(nexts.len(), actives.len());
        Self { nexts, actives }
    }

    fn propagate_index(&self, solver: &mut Solver, index: usize) -> CpResult<()> {
        let next = self.nexts[index];
        let active = self.actives[index];
        if solver.is_bound(next) {
            let value = solver.value(next);
            solver.set_value(active, if value == index as i64 { 0 } else { 1 })?;
            if value != index as i64 && (value as usize) < self.nexts.len() {
                solver.set_value(self.actives[value as usize], 1)?;
            }
        }
        if solver.is_bound(active) {
            if solver.value(active) == 0 {
                solver.set_value(next, index as i64)?;
                // Nobody visits a deactivated slot.
                for (other, &var) in self.nexts.iter().enumerate() {
                    if other != index {
                        solver.remove_value(var, index as i64)?;
                    }
                }
            } else {
                solver.remove_value(next, index as i64)?;
            }
        }
        Ok(())
    }
}

impl Constraint for ActivityConstraint {
    fn post(&self, solver: &mut Solver, constraint: usize) {
        for (index, (&next, &active)) in self.nexts.iter().zip(self.actives.iter()).enumerate() {
            solver.when_bound(next, Demon { constraint, payload: index as i64 });
            solver.when_bound(active, Demon { constraint, payload: index as i64 });
        }
    }

    fn initial_propagate(&self, solver: &mut Solver) -> CpResult<()> {
        for index in 0..self.nexts.len() {
            self.propagate_index(solver, index)?;
        }
        Ok(())
    }

    fn propagate(&self, solver: &mut Solver, payload: i64) -> CpResult<()> {
        self.propagate_index(solver, payload as usize)
    }
}

/// At most one active slot in a set, with an indicator variable bound to one
/// exactly when the whole set is inactive. This models
/// `indicator + sum(active[i]) == 1`.
pub struct DisjunctionConstraint {
    actives: Vec<IntVar>,
    indicator: IntVar,
    undecided: SmallRevBitSet,
    resolved: RevSwitch,
}

impl DisjunctionConstraint {
    /// Creates the constraint over the active variables of the disjunction
    /// members. Disjunctions are limited to 64 members.
    pub fn new(solver: &mut Solver, actives: Vec<IntVar>, indicator: IntVar) -> Self {
        assert!(actives.len() <= 64, "disjunctions are limited to 64 members");
        let trail = solver.trail_mut();
        let undecided = SmallRevBitSet::new(trail, actives.len());
        for position in 0..actives.len() {
            undecided.set_to_one(trail, position);
        }
        let resolved = RevSwitch::new(trail);
        Self { actives, indicator, undecided, resolved }
    }

    fn propagate_all(&self, solver: &mut Solver) -> CpResult<()> {
        if self.resolved.switched(solver.trail()) {
            return Ok(());
        }
        let mut one_active = None;
        for (position, &active) in self.actives.iter().enumerate() {
            if solver.is_bound(active) {
                self.undecided.set_to_zero(solver.trail_mut(), position);
                if solver.value(active) == 1 {
                    one_active = Some(position);
                }
            }
        }
        if let Some(position) = one_active {
            // One member is in: every other member is out and no penalty.
            self.resolved.switch(solver.trail_mut());
            for (other, &active) in self.actives.iter().enumerate() {
                if other != position {
                    solver.set_value(active, 0)?;
                }
            }
            return solver.set_value(self.indicator, 0);
        }
        if self.undecided.is_cardinality_zero(solver.trail()) {
            // Everybody is out: the penalty indicator turns on.
            self.resolved.switch(solver.trail_mut());
            return solver.set_value(self.indicator, 1);
        }
        if solver.is_bound(self.indicator) {
            match solver.value(self.indicator) {
                // No penalty allowed: with a single undecided member left it
                // must be the active one.
                0 if self.undecided.is_cardinality_one(solver.trail()) => {
                    let position = self.undecided.get_first_one(solver.trail()).expect("one undecided member");
                    self.resolved.switch(solver.trail_mut());
                    return solver.set_value(self.actives[position], 1);
                }
                1 => {
                    self.resolved.switch(solver.trail_mut());
                    while let Some(position) = self.undecided.get_first_one(solver.trail()) {
                        self.undecided.set_to_zero(solver.trail_mut(), position);
                        solver.set_value(self.actives[position], 0)?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }
}

impl Constraint for DisjunctionConstraint {
    fn post(&self, solver: &mut Solver, constraint: usize) {
        for &active in &self.actives {
            solver.when_bound(active, Demon { constraint, payload: 0 });
        }
        solver.when_bound(self.indicator, Demon { constraint, payload: 0 });
    }

    fn initial_propagate(&self, solver: &mut Solver) -> CpResult<()> {
        self.propagate_all(solver)
    }

    fn propagate(&self, solver: &mut Solver, _payload: i64) -> CpResult<()> {
        self.propagate_all(solver)
    }
}

/// Links the cumul and transit variables of one dimension along bound arcs:
/// `cumul[j]` lies in `[cumul[i] + transit[i], cumul[i] + transit[i] +
/// slack_max]` whenever `next[i] = j`.
pub struct DimensionConstraint {
    nexts: Vec<IntVar>,
    cumuls: Vec<IntVar>,
    transits: Vec<IntVar>,
    evaluator: Rc<IndexEvaluator>,
    slack_max: i64,
    pred: Vec<Rev<i64>>,
}

impl DimensionConstraint {
    /// Creates the constraint; `cumuls` covers every slot including ends,
    /// `transits` covers the slots with a next variable.
    pub fn new(
        solver: &mut Solver,
        nexts: Vec<IntVar>,
        cumuls: Vec<IntVar>,
        transits: Vec<IntVar>,
        evaluator: Rc<IndexEvaluator>,
        slack_max: i64,
    ) -> Self {
        let trail = solver.trail_mut();
        let pred = (0..cumuls.len()).map(|_| Rev::<i64>::new(trail, -1)).collect();
        Self { nexts, cumuls, transits, evaluator, slack_max, pred }
    }

    fn propagate_link(&self, solver: &mut Solver, index: usize) -> CpResult<()> {
        if !solver.is_bound(self.nexts[index]) {
            return Ok(());
        }
        let next = solver.value(self.nexts[index]);
        if next == index as i64 {
            // Skipped slots add nothing to the dimension.
            return solver.set_value(self.transits[index], 0);
        }
        let next = next as usize;
        if self.pred[next].value(solver.trail()) != index as i64 {
            self.pred[next].set_value(solver.trail_mut(), index as i64);
        }
        let transit = (self.evaluator)(index as i64, next as i64);
        solver.set_value(self.transits[index], transit)?;
        let (from, to) = (self.cumuls[index], self.cumuls[next]);
        solver.set_min(to, solver.min(from).saturating_add(transit))?;
        solver.set_max(to, solver.max(from).saturating_add(transit).saturating_add(self.slack_max))?;
        solver.set_max(from, solver.max(to).saturating_sub(transit))?;
        solver.set_min(from, solver.min(to).saturating_sub(transit).saturating_sub(self.slack_max))
    }
}

impl Constraint for DimensionConstraint {
    fn post(&self, solver: &mut Solver, constraint: usize) {
        let total = self.cumuls.len() as i64;
        for (index, &next) in self.nexts.iter().enumerate() {
            solver.when_bound(next, Demon { constraint, payload: index as i64 });
        }
        for (index, &cumul) in self.cumuls.iter().enumerate() {
            solver.when_domain(cumul, Demon { constraint, payload: total + index as i64 });
        }
    }

    fn initial_propagate(&self, solver: &mut Solver) -> CpResult<()> {
        for index in 0..self.nexts.len() {
            self.propagate_link(solver, index)?;
        }
        Ok(())
    }

    fn propagate(&self, solver: &mut Solver, payload: i64) -> CpResult<()> {
        let total = self.cumuls.len() as i64;
        if payload < total {
            return self.propagate_link(solver, payload as usize);
        }
        // A cumul changed: refresh the links around its slot.
        let index = (payload - total) as usize;
        if index < self.nexts.len() {
            self.propagate_link(solver, index)?;
        }
        let pred = self.pred[index].value(solver.trail());
        if pred >= 0 {
            self.propagate_link(solver, pred as usize)?;
        }
        Ok(())
    }
}

/// Defines the objective: the sum of the arc costs of every active slot,
/// the fixed costs of the used vehicles and the penalties of the fully
/// inactive disjunctions. The cost variable is bound as soon as every term
/// is known.
pub struct CostConstraint {
    nexts: Vec<IntVar>,
    vehicles: Vec<IntVar>,
    cost_var: IntVar,
    arc_cost: Rc<dyn Fn(i64, i64, i64) -> i64>,
    fixed_costs: Vec<i64>,
    starts: Vec<usize>,
    ends: Vec<usize>,
    penalties: Vec<(IntVar, i64)>,
}

impl CostConstraint {
    /// Creates the aggregation; `arc_cost` maps `(from, to, vehicle)` to a
    /// cost, `penalties` are the disjunction indicators with their price.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        nexts: Vec<IntVar>,
        vehicles: Vec<IntVar>,
        cost_var: IntVar,
        arc_cost: Rc<dyn Fn(i64, i64, i64) -> i64>,
        fixed_costs: Vec<i64>,
        starts: Vec<usize>,
        ends: Vec<usize>,
        penalties: Vec<(IntVar, i64)>,
    ) -> Self {
        Self { nexts, vehicles, cost_var, arc_cost, fixed_costs, starts, ends, penalties }
    }

    fn try_bind_cost(&self, solver: &mut Solver) -> CpResult<()> {
        let mut total: i64 = 0;
        for (index, &next) in self.nexts.iter().enumerate() {
            if !solver.is_bound(next) {
                return Ok(());
            }
            let next = solver.value(next);
            if next == index as i64 {
                continue;
            }
            let vehicle = self.vehicles[index];
            if !solver.is_bound(vehicle) {
                return Ok(());
            }
            total = total.saturating_add((self.arc_cost)(index as i64, next, solver.value(vehicle)));
        }
        for (vehicle, (&start, &end)) in self.starts.iter().zip(self.ends.iter()).enumerate() {
            if solver.value(self.nexts[start]) != end as i64 {
                total = total.saturating_add(self.fixed_costs[vehicle]);
            }
        }
        for &(indicator, penalty) in &self.penalties {
            if !solver.is_bound(indicator) {
                return Ok(());
            }
            total = total.saturating_add(solver.value(indicator) * penalty);
        }
        if total < solver.min(self.cost_var) || total > solver.max(self.cost_var) {
            return Err(Failure);
        }
        solver.set_value(self.cost_var, total)
    }
}

impl Constraint for CostConstraint {
    fn post(&self, solver: &mut Solver, constraint: usize) {
        for &next in &self.nexts {
            solver.when_bound(next, Demon { constraint, payload: 0 });
        }
        for &vehicle in &self.vehicles {
            solver.when_bound(vehicle, Demon { constraint, payload: 0 });
        }
        for &(indicator, _) in &self.penalties {
            solver.when_bound(indicator, Demon { constraint, payload: 0 });
        }
    }

    fn initial_propagate(&self, solver: &mut Solver) -> CpResult<()> {
        self.try_bind_cost(solver)
    }

    fn propagate(&self, solver: &mut Solver, _payload: i64) -> CpResult<()> {
        self.try_bind_cost(solver)
    }
}
