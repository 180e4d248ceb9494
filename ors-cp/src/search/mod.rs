//! Tree search: decision builders, monitors, limits and the search loop.

#[cfg(test)]
#[path = "../../tests/unit/search/search_test.rs"]
mod search_test;

pub mod local;
pub mod metaheuristics;

use crate::solver::{IntVar, Solver};
use crate::utils::{InfoLogger, Timer};

/// A branching choice: try `var = value` first, then `var != value`.
#[derive(Clone, Copy, Debug)]
pub struct Decision {
    /// The variable to branch on.
    pub var: IntVar,
    /// The value of the left branch.
    pub value: i64,
}

/// Produces the next decision for the search, or None when every variable
/// the builder cares about is bound.
pub trait DecisionBuilder {
    /// Returns the next decision given the current solver state.
    fn next_decision(&mut self, solver: &mut Solver) -> Option<Decision>;
}

/// A decision builder assigning its minimum value to the first unbound
/// variable, in the order the variables were given.
pub struct AssignFirstUnbound {
    vars: Vec<IntVar>,
}

impl AssignFirstUnbound {
    /// Creates a builder over the given variables.
    pub fn new(vars: Vec<IntVar>) -> Self {
        Self { vars }
    }
}

impl DecisionBuilder for AssignFirstUnbound {
    fn next_decision(&mut self, solver: &mut Solver) -> Option<Decision> {
        self.vars
            .iter()
            .find(|&&var| !solver.is_bound(var))
            .map(|&var| Decision { var, value: solver.min(var) })
    }
}

/// Observes search events. Monitors are also the stopping authority: the
/// search polls [`SearchMonitor::must_stop`] between nodes.
pub trait SearchMonitor {
    /// Called when the search starts.
    fn enter_search(&mut self) {}

    /// Called on every solution (or accepted local search improvement) with
    /// its objective value.
    fn at_solution(&mut self, objective: i64) {
        let _ = objective;
    }

    /// Called when the search ends.
    fn exit_search(&mut self) {}

    /// Returns true when the search must stop now.
    fn must_stop(&self) -> bool {
        false
    }
}

/// Stops the search after a wall-clock budget, in milliseconds.
pub struct TimeLimit {
    timer: Timer,
    limit_ms: u128,
}

impl TimeLimit {
    /// Creates a limit of the given number of milliseconds.
    pub fn new(limit_ms: u64) -> Self {
        Self { timer: Timer::start(), limit_ms: limit_ms as u128 }
    }

    /// Restarts the countdown with a new budget.
    pub fn reset(&mut self, limit_ms: u64) {
        self.timer = Timer::start();
        self.limit_ms = limit_ms as u128;
    }
}

impl SearchMonitor for TimeLimit {
    fn enter_search(&mut self) {
        self.timer = Timer::start();
    }

    fn must_stop(&self) -> bool {
        self.timer.elapsed_millis() >= self.limit_ms
    }
}

/// Stops the search after a number of solutions was found.
pub struct SolutionLimit {
    solutions: usize,
    limit: usize,
}

impl SolutionLimit {
    /// Creates a limit of the given number of solutions.
    pub fn new(limit: usize) -> Self {
        Self { solutions: 0, limit }
    }
}

impl SearchMonitor for SolutionLimit {
    fn enter_search(&mut self) {
        self.solutions = 0;
    }

    fn at_solution(&mut self, _objective: i64) {
        self.solutions += 1;
    }

    fn must_stop(&self) -> bool {
        self.solutions >= self.limit
    }
}

/// Reports search progress to an [`InfoLogger`].
pub struct SearchLog {
    logger: InfoLogger,
    timer: Timer,
    solutions: usize,
}

impl SearchLog {
    /// Creates a log writing to the given logger.
    pub fn new(logger: InfoLogger) -> Self {
        Self { logger, timer: Timer::start(), solutions: 0 }
    }
}

impl SearchMonitor for SearchLog {
    fn enter_search(&mut self) {
        self.timer = Timer::start();
        self.solutions = 0;
        (self.logger)("search started");
    }

    fn at_solution(&mut self, objective: i64) {
        self.solutions += 1;
        (self.logger)(&format!(
            "solution #{} found, objective: {}, elapsed: {}ms",
            self.solutions,
            objective,
            self.timer.elapsed_millis()
        ));
    }

    fn exit_search(&mut self) {
        (self.logger)(&format!(
            "search finished, solutions: {}, elapsed: {}ms",
            self.solutions,
            self.timer.elapsed_millis()
        ));
    }
}

/// Returns true when any monitor requests a stop.
pub fn must_stop(monitors: &[Box<dyn SearchMonitor>]) -> bool {
    monitors.iter().any(|monitor| monitor.must_stop())
}

/// The outcome of a tree search.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchOutcome {
    /// A solution was found; the solver is left at the solution state and the
    /// caller is expected to capture it, then backtrack to its entry depth.
    Solution,
    /// The whole subtree was explored without finding a solution.
    Exhausted,
    /// A monitor stopped the search.
    Aborted,
}

/// Runs a depth-first search driven by the decision builder: the left branch
/// assigns the decision value, the right branch removes it. Frames pushed by
/// the search are not popped when a solution is found, so the caller can read
/// the solution off the solver; it must backtrack to its entry depth
/// afterwards in every case.
pub fn find_solution(
    solver: &mut Solver,
    builder: &mut dyn DecisionBuilder,
    monitors: &[Box<dyn SearchMonitor>],
) -> SearchOutcome {
    if must_stop(monitors) {
        return SearchOutcome::Aborted;
    }
    let decision = match builder.next_decision(solver) {
        Some(decision) => decision,
        None => return SearchOutcome::Solution,
    };
    solver.push_frame();
    if solver.try_assign(decision.var, decision.value).is_ok() {
        match find_solution(solver, builder, monitors) {
            SearchOutcome::Exhausted => {}
            outcome => return outcome,
        }
    }
    solver.backtrack();
    solver.push_frame();
    if solver.try_refute(decision.var, decision.value).is_ok() {
        match find_solution(solver, builder, monitors) {
            SearchOutcome::Exhausted => {}
            outcome => return outcome,
        }
    }
    solver.backtrack();
    SearchOutcome::Exhausted
}
