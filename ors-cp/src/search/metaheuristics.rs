//! Metaheuristics arbitrating acceptance around the local search loop.
//!
//! All of them keep searching past local optima, so a search using anything
//! but greedy descent needs a time or solution limit. As a safety net every
//! implementation also caps the number of escape rounds it is willing to pay
//! for, so that a run without limits still terminates.

#[cfg(test)]
#[path = "../../tests/unit/search/metaheuristics_test.rs"]
mod metaheuristics_test;

use crate::search::local::Delta;
use crate::utils::Random;
use hashbrown::HashMap;
use std::rc::Rc;
use std::sync::Arc;

/// A solution handed to a metaheuristic: its cost and its next values.
pub struct Candidate<'a> {
    /// The raw objective value.
    pub cost: i64,
    /// The full vector of next values.
    pub nexts: &'a [i64],
}

/// Gates the acceptance of local search moves and decides whether to keep
/// searching at a local optimum.
pub trait Metaheuristic {
    /// Called once with the cost of the initial solution.
    fn reset(&mut self, initial_cost: i64) {
        let _ = initial_cost;
    }

    /// Returns true when the candidate should replace the current solution.
    fn accept(&mut self, candidate: &Candidate, current: &Candidate, delta: &Delta) -> bool;

    /// Called after a candidate was accepted; `current` is the solution being
    /// left.
    fn on_accepted(&mut self, delta: &Delta, current: &Candidate, new_cost: i64) {
        let _ = (delta, current, new_cost);
    }

    /// Called when a full sweep accepted nothing; returns true to keep
    /// searching (the implementation is expected to have changed its state so
    /// that the next sweep differs).
    fn at_local_optimum(&mut self, current: &Candidate) -> bool;
}

/// Plain greedy descent: accepts improving moves only and stops at the first
/// local optimum.
#[derive(Default)]
pub struct GreedyDescent {}

impl Metaheuristic for GreedyDescent {
    fn accept(&mut self, candidate: &Candidate, current: &Candidate, _delta: &Delta) -> bool {
        candidate.cost < current.cost
    }

    fn at_local_optimum(&mut self, _current: &Candidate) -> bool {
        false
    }
}

/// Guided local search: penalizes the costly arcs of local optima and judges
/// moves by the penalty-augmented objective.
pub struct GuidedLocalSearch {
    arc_cost: Rc<dyn Fn(usize, i64) -> i64>,
    penalties: HashMap<(usize, i64), i64>,
    lambda: i64,
    rounds: usize,
    max_rounds: usize,
}

impl GuidedLocalSearch {
    /// Creates the metaheuristic over the given arc cost function;
    /// `max_rounds` caps the number of penalization rounds.
    pub fn new(arc_cost: Rc<dyn Fn(usize, i64) -> i64>, max_rounds: usize) -> Self {
        Self { arc_cost, penalties: HashMap::new(), lambda: 1, rounds: 0, max_rounds }
    }

    fn augmented(&self, solution: &Candidate) -> i64 {
        let penalty: i64 = solution
            .nexts
            .iter()
            .enumerate()
            .filter(|&(index, &next)| next != index as i64)
            .map(|(index, &next)| {
                self.penalties.get(&(index, next)).copied().unwrap_or(0) * (self.arc_cost)(index, next)
            })
            .sum();
        solution.cost + self.lambda * penalty
    }
}

impl Metaheuristic for GuidedLocalSearch {
    fn reset(&mut self, initial_cost: i64) {
        self.penalties.clear();
        self.rounds = 0;
        // A fraction of the initial cost spreads penalties over many arcs
        // before they dominate the raw objective.
        self.lambda = (initial_cost / 16).max(1);
    }

    fn accept(&mut self, candidate: &Candidate, current: &Candidate, _delta: &Delta) -> bool {
        self.augmented(candidate) < self.augmented(current)
    }

    fn at_local_optimum(&mut self, current: &Candidate) -> bool {
        self.rounds += 1;
        if self.rounds > self.max_rounds {
            return false;
        }
        // Penalize the arcs of maximum utility cost / (1 + penalty).
        let arcs: Vec<(usize, i64, i64)> = current
            .nexts
            .iter()
            .enumerate()
            .filter(|&(index, &next)| next != index as i64)
            .map(|(index, &next)| {
                let penalty = self.penalties.get(&(index, next)).copied().unwrap_or(0);
                (index, next, (self.arc_cost)(index, next) / (1 + penalty))
            })
            .collect();
        let max_utility = arcs.iter().map(|&(_, _, utility)| utility).max().unwrap_or(0);
        if max_utility == 0 {
            return false;
        }
        for (index, next, utility) in arcs {
            if utility == max_utility {
                *self.penalties.entry((index, next)).or_insert(0) += 1;
            }
        }
        true
    }
}

/// Simulated annealing: accepts worsening moves with a probability driven by
/// a geometrically cooling temperature.
pub struct SimulatedAnnealing {
    random: Arc<dyn Random>,
    temperature: f64,
    initial_temperature: f64,
    cooling: f64,
    min_temperature: f64,
}

impl SimulatedAnnealing {
    /// Creates the metaheuristic with the given initial temperature and
    /// cooling factor in `(0, 1)`.
    pub fn new(random: Arc<dyn Random>, initial_temperature: f64, cooling: f64) -> Self {
        assert!(cooling > 0. && cooling < 1.);
        Self { random, temperature: initial_temperature, initial_temperature, cooling, min_temperature: 1e-3 }
    }
}

impl Metaheuristic for SimulatedAnnealing {
    fn reset(&mut self, _initial_cost: i64) {
        self.temperature = self.initial_temperature;
    }

    fn accept(&mut self, candidate: &Candidate, current: &Candidate, _delta: &Delta) -> bool {
        if candidate.cost < current.cost {
            return true;
        }
        if self.temperature <= self.min_temperature {
            return false;
        }
        let delta_cost = (candidate.cost - current.cost) as f64;
        self.random.is_hit((-delta_cost / self.temperature).exp())
    }

    fn on_accepted(&mut self, _delta: &Delta, _current: &Candidate, _new_cost: i64) {
        self.temperature *= self.cooling;
    }

    fn at_local_optimum(&mut self, _current: &Candidate) -> bool {
        self.temperature *= self.cooling;
        self.temperature > self.min_temperature
    }
}

/// Tabu search: forbids undoing recent moves for a fixed tenure, with the
/// usual aspiration on the best known cost.
pub struct TabuSearch {
    tenure: u64,
    max_rounds: usize,
    iteration: u64,
    rounds: usize,
    best_cost: i64,
    allow_worsening: bool,
    tabu: Vec<(usize, i64, u64)>,
}

impl TabuSearch {
    /// Creates the metaheuristic with the given tenure (in accepted moves)
    /// and escape-round cap.
    pub fn new(tenure: u64, max_rounds: usize) -> Self {
        Self {
            tenure,
            max_rounds,
            iteration: 0,
            rounds: 0,
            best_cost: i64::MAX,
            allow_worsening: false,
            tabu: Vec::new(),
        }
    }

    fn is_tabu(&self, delta: &Delta) -> bool {
        delta
            .changes
            .iter()
            .any(|&(index, value)| {
                self.tabu.iter().any(|&(tabu_index, tabu_value, expiry)| {
                    tabu_index == index && tabu_value == value && expiry > self.iteration
                })
            })
    }
}

impl Metaheuristic for TabuSearch {
    fn reset(&mut self, initial_cost: i64) {
        self.iteration = 0;
        self.rounds = 0;
        self.best_cost = initial_cost;
        self.allow_worsening = false;
        self.tabu.clear();
    }

    fn accept(&mut self, candidate: &Candidate, current: &Candidate, delta: &Delta) -> bool {
        if candidate.cost < self.best_cost {
            return true;
        }
        if self.is_tabu(delta) {
            return false;
        }
        candidate.cost < current.cost || self.allow_worsening
    }

    fn on_accepted(&mut self, delta: &Delta, current: &Candidate, new_cost: i64) {
        self.iteration += 1;
        self.allow_worsening = false;
        self.best_cost = self.best_cost.min(new_cost);
        self.tabu.retain(|&(_, _, expiry)| expiry > self.iteration);
        // Forbid restoring the previous value of every changed variable.
        let expiry = self.iteration + self.tenure;
        self.tabu.extend(delta.changes.iter().map(|&(index, _)| (index, current.nexts[index], expiry)));
    }

    fn at_local_optimum(&mut self, _current: &Candidate) -> bool {
        self.rounds += 1;
        self.allow_worsening = true;
        self.rounds <= self.max_rounds
    }
}
