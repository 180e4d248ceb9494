//! The constraint solver core: integer variables, demons and propagation.

#[cfg(test)]
#[path = "../../tests/unit/solver/solver_test.rs"]
mod solver_test;

pub mod assignment;
pub mod table;

use crate::state::{Rev, RevBitSet, SimpleRevFifo, Trail};
use std::collections::VecDeque;
use std::rc::Rc;

/// Signals that a domain became empty: the current search node is dead.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Failure;

/// A result type threaded through every propagation step.
pub type CpResult<T> = Result<T, Failure>;

/// A handle on an integer variable owned by a [`Solver`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct IntVar(usize);

impl IntVar {
    /// Returns the identifier of the variable inside its solver.
    pub fn index(self) -> usize {
        self.0
    }

    /// Rebuilds a handle from a raw identifier, e.g. one read back from a
    /// persisted assignment. The identifier is not validated here.
    pub fn from_index(index: usize) -> Self {
        Self(index)
    }
}

/// A propagation demon: the constraint to wake up and a payload whose meaning
/// is private to that constraint (typically the index of the touched
/// variable).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Demon {
    /// The identifier the constraint was registered under.
    pub constraint: usize,
    /// A constraint-specific payload.
    pub payload: i64,
}

/// A constraint over integer variables.
///
/// Constraints are stored behind shared pointers and keep their own state in
/// reversible slots created at post time, so that propagation only needs a
/// shared reference to the constraint itself.
pub trait Constraint {
    /// Attaches the demons of the constraint; `constraint` is the identifier
    /// to wake it up with.
    fn post(&self, solver: &mut Solver, constraint: usize);

    /// Performs the propagation which does not depend on any event.
    fn initial_propagate(&self, solver: &mut Solver) -> CpResult<()>;

    /// Performs one propagation step for a woken demon.
    fn propagate(&self, solver: &mut Solver, payload: i64) -> CpResult<()>;
}

/// Domains narrower than this get a value bitset supporting removals of
/// inner values; wider domains are interval-only.
const MAX_BITSET_SPAN: i64 = 4096;

struct Domain {
    min: Rev<i64>,
    max: Rev<i64>,
    bits: Option<DomainBits>,
}

struct DomainBits {
    offset: i64,
    bitset: RevBitSet,
}

struct VarDemons {
    on_bound: SimpleRevFifo<Demon>,
    on_domain: SimpleRevFifo<Demon>,
}

/// The solver: owner of the trail, the variables and the constraints.
#[derive(Default)]
pub struct Solver {
    trail: Trail,
    domains: Vec<Domain>,
    demons: Vec<VarDemons>,
    constraints: Vec<Rc<dyn Constraint>>,
    queue: VecDeque<Demon>,
}

impl Solver {
    /// Creates an empty solver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the trail owning all reversible state.
    pub fn trail(&self) -> &Trail {
        &self.trail
    }

    /// Returns the trail mutably, for constraints maintaining their own
    /// reversible slots.
    pub fn trail_mut(&mut self) -> &mut Trail {
        &mut self.trail
    }

    /// Returns the number of variables created so far.
    pub fn num_vars(&self) -> usize {
        self.domains.len()
    }

    /// Creates a new integer variable with the domain `[min, max]`.
    pub fn new_int_var(&mut self, min: i64, max: i64) -> IntVar {
        assert!(min <= max, "empty initial domain");
        let bits = if max - min < MAX_BITSET_SPAN {
            let bitset = RevBitSet::new(&mut self.trail, (max - min + 1) as usize);
            for pos in 0..bitset.size() {
                bitset.set_to_one(&mut self.trail, pos);
            }
            Some(DomainBits { offset: min, bitset })
        } else {
            None
        };
        let domain =
            Domain { min: Rev::<i64>::new(&mut self.trail, min), max: Rev::<i64>::new(&mut self.trail, max), bits };
        self.domains.push(domain);
        let demons = VarDemons {
            on_bound: SimpleRevFifo::new(&mut self.trail),
            on_domain: SimpleRevFifo::new(&mut self.trail),
        };
        self.demons.push(demons);
        IntVar(self.domains.len() - 1)
    }

    /// Returns the smallest value in the domain of the variable.
    pub fn min(&self, var: IntVar) -> i64 {
        self.domains[var.0].min.value(&self.trail)
    }

    /// Returns the largest value in the domain of the variable.
    pub fn max(&self, var: IntVar) -> i64 {
        self.domains[var.0].max.value(&self.trail)
    }

    /// Returns true when the variable is bound to a single value.
    pub fn is_bound(&self, var: IntVar) -> bool {
        self.min(var) == self.max(var)
    }

    /// Returns the value of a bound variable.
    pub fn value(&self, var: IntVar) -> i64 {
        debug_assert!(self.is_bound(var));
        self.min(var)
    }

    /// Returns true when the value belongs to the domain of the variable.
    pub fn contains(&self, var: IntVar, value: i64) -> bool {
        let domain = &self.domains[var.0];
        if value < domain.min.value(&self.trail) || value > domain.max.value(&self.trail) {
            return false;
        }
        match &domain.bits {
            Some(bits) => bits.bitset.is_set(&self.trail, (value - bits.offset) as usize),
            None => true,
        }
    }

    /// Returns the values currently in the domain of the variable, in
    /// increasing order.
    pub fn domain_values(&self, var: IntVar) -> Vec<i64> {
        (self.min(var)..=self.max(var)).filter(|&value| self.contains(var, value)).collect()
    }

    /// Returns the number of values in the domain of the variable.
    pub fn domain_size(&self, var: IntVar) -> usize {
        match &self.domains[var.0].bits {
            Some(_) => self.domain_values(var).len(),
            None => (self.max(var) - self.min(var) + 1) as usize,
        }
    }

    /// Raises the lower bound of the variable.
    pub fn set_min(&mut self, var: IntVar, value: i64) -> CpResult<()> {
        if value <= self.min(var) {
            return Ok(());
        }
        if value > self.max(var) {
            return Err(Failure);
        }
        let mut new_min = value;
        let max = self.max(var);
        while new_min <= max && !self.domain_contains_raw(var, new_min) {
            new_min += 1;
        }
        if new_min > max {
            return Err(Failure);
        }
        self.domains[var.0].min.set_value(&mut self.trail, new_min);
        self.wake(var);
        Ok(())
    }

    /// Lowers the upper bound of the variable.
    pub fn set_max(&mut self, var: IntVar, value: i64) -> CpResult<()> {
        if value >= self.max(var) {
            return Ok(());
        }
        if value < self.min(var) {
            return Err(Failure);
        }
        let mut new_max = value;
        let min = self.min(var);
        while new_max >= min && !self.domain_contains_raw(var, new_max) {
            new_max -= 1;
        }
        if new_max < min {
            return Err(Failure);
        }
        self.domains[var.0].max.set_value(&mut self.trail, new_max);
        self.wake(var);
        Ok(())
    }

    /// Restricts the domain of the variable to `[min, max]`.
    pub fn set_range(&mut self, var: IntVar, min: i64, max: i64) -> CpResult<()> {
        self.set_min(var, min)?;
        self.set_max(var, max)
    }

    /// Binds the variable to the value.
    pub fn set_value(&mut self, var: IntVar, value: i64) -> CpResult<()> {
        if !self.contains(var, value) {
            return Err(Failure);
        }
        self.set_min(var, value)?;
        self.set_max(var, value)
    }

    /// Removes one value from the domain of the variable. Removing an inner
    /// value of an interval-only domain is a no-op, which is sound: the
    /// domain just stays weaker than it could be.
    pub fn remove_value(&mut self, var: IntVar, value: i64) -> CpResult<()> {
        if value < self.min(var) || value > self.max(var) {
            return Ok(());
        }
        if self.is_bound(var) {
            return Err(Failure);
        }
        if value == self.min(var) {
            return self.set_min(var, value + 1);
        }
        if value == self.max(var) {
            return self.set_max(var, value - 1);
        }
        let removed = match &self.domains[var.0].bits {
            Some(bits) => {
                let pos = (value - bits.offset) as usize;
                let was_set = bits.bitset.is_set(&self.trail, pos);
                if was_set {
                    bits.bitset.set_to_zero(&mut self.trail, pos);
                }
                was_set
            }
            None => false,
        };
        if removed {
            self.wake(var);
        }
        Ok(())
    }

    fn domain_contains_raw(&self, var: IntVar, value: i64) -> bool {
        match &self.domains[var.0].bits {
            Some(bits) => bits.bitset.is_set(&self.trail, (value - bits.offset) as usize),
            None => true,
        }
    }

    fn wake(&mut self, var: IntVar) {
        let demons = &self.demons[var.0];
        self.queue.extend(demons.on_domain.iter(&self.trail));
        if self.is_bound(var) {
            let bound: Vec<_> = demons.on_bound.iter(&self.trail).collect();
            self.queue.extend(bound);
        }
    }

    /// Wakes the given demon when the variable gets bound.
    pub fn when_bound(&mut self, var: IntVar, demon: Demon) {
        self.demons[var.0].on_bound.push(&mut self.trail, demon);
    }

    /// Wakes the given demon on any domain change of the variable.
    pub fn when_domain(&mut self, var: IntVar, demon: Demon) {
        self.demons[var.0].on_domain.push(&mut self.trail, demon);
    }

    /// Registers a constraint, attaches its demons and runs its initial
    /// propagation to a fixpoint.
    pub fn add_constraint(&mut self, constraint: Rc<dyn Constraint>) -> CpResult<()> {
        let id = self.constraints.len();
        self.constraints.push(constraint.clone());
        constraint.post(self, id);
        constraint.initial_propagate(self)?;
        self.propagate()
    }

    /// Runs the propagation queue to a fixpoint. On failure the queue is
    /// drained so that the solver is ready for a backtrack.
    pub fn propagate(&mut self) -> CpResult<()> {
        while let Some(demon) = self.queue.pop_front() {
            let constraint = self.constraints[demon.constraint].clone();
            if let Err(failure) = constraint.propagate(self, demon.payload) {
                self.queue.clear();
                return Err(failure);
            }
        }
        Ok(())
    }

    /// Binds a variable and propagates to a fixpoint.
    pub fn try_assign(&mut self, var: IntVar, value: i64) -> CpResult<()> {
        self.set_value(var, value)?;
        self.propagate()
    }

    /// Removes a value and propagates to a fixpoint.
    pub fn try_refute(&mut self, var: IntVar, value: i64) -> CpResult<()> {
        self.remove_value(var, value)?;
        self.propagate()
    }

    /// Opens a new search frame.
    pub fn push_frame(&mut self) {
        self.trail.push_frame();
    }

    /// Restores the state of the innermost frame.
    pub fn backtrack(&mut self) {
        self.queue.clear();
        self.trail.backtrack();
    }

    /// Restores the state at the given depth.
    pub fn backtrack_to(&mut self, depth: usize) {
        self.queue.clear();
        self.trail.backtrack_to(depth);
    }

    /// Returns the current search depth.
    pub fn depth(&self) -> usize {
        self.trail.depth()
    }
}
