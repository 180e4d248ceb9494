//! Local search over successor ("next") variables.
//!
//! A solution of a path model is a vector of next values: `nexts[i]` is the
//! index visited right after `i`, an index at least `num_nexts` denotes a
//! path end, and a self loop denotes an inactive index. Operators iterate
//! candidate moves as [`Delta`]s against a synchronized [`PathState`];
//! filters cheaply reject deltas before the solver is asked to validate and
//! complete them.

#[cfg(test)]
#[path = "../../tests/unit/search/local_test.rs"]
mod local_test;

use crate::search::metaheuristics::{Candidate, Metaheuristic};
use crate::search::{must_stop, SearchMonitor};
use crate::utils::Random;
use std::sync::Arc;

/// An incremental change to a solution: explicit new values for some next
/// variables, plus variables released entirely (used by the large
/// neighborhood operators, the solver re-assigns them).
#[derive(Clone, Debug, Default)]
pub struct Delta {
    /// `(variable index, new value)` pairs.
    pub changes: Vec<(usize, i64)>,
    /// Indices whose next variable is unassigned by the move.
    pub released: Vec<usize>,
}

impl Delta {
    /// Removes all recorded changes.
    pub fn clear(&mut self) {
        self.changes.clear();
        self.released.clear();
    }

    /// Records `nexts[index] = value`.
    pub fn set(&mut self, index: usize, value: i64) {
        self.changes.push((index, value));
    }

    /// Releases the next variable of `index`.
    pub fn release(&mut self, index: usize) {
        self.released.push(index);
    }

    /// Returns true when the delta changes nothing.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty() && self.released.is_empty()
    }
}

/// The solution a local search is currently standing on, with the path
/// metadata operators need: starts, ends and predecessors.
#[derive(Clone, Debug)]
pub struct PathState {
    nexts: Vec<i64>,
    prevs: Vec<i64>,
    starts: Vec<usize>,
    ends: Vec<usize>,
    is_start: Vec<bool>,
}

impl PathState {
    /// Creates a state for `num_nexts` next variables and the given per
    /// vehicle start indices (below `num_nexts`) and end indices (at least
    /// `num_nexts`).
    pub fn new(num_nexts: usize, starts: Vec<usize>, ends: Vec<usize>) -> Self {
        assert_eq!(starts.len(), ends.len());
        debug_assert!(starts.iter().all(|&start| start < num_nexts));
        debug_assert!(ends.iter().all(|&end| end >= num_nexts));
        let mut is_start = vec![false; num_nexts];
        starts.iter().for_each(|&start| is_start[start] = true);
        Self { nexts: vec![0; num_nexts], prevs: vec![-1; num_nexts], starts, ends, is_start }
    }

    /// Returns the number of next variables.
    pub fn num_nexts(&self) -> usize {
        self.nexts.len()
    }

    /// Returns the number of vehicles (paths).
    pub fn num_paths(&self) -> usize {
        self.starts.len()
    }

    /// Returns the current next values.
    pub fn nexts(&self) -> &[i64] {
        &self.nexts
    }

    /// Synchronizes the state with a full solution.
    pub fn set_solution(&mut self, nexts: &[i64]) {
        assert_eq!(nexts.len(), self.nexts.len());
        self.nexts.copy_from_slice(nexts);
        self.prevs.iter_mut().for_each(|prev| *prev = -1);
        for (index, &next) in nexts.iter().enumerate() {
            if !self.is_path_end(next) && next as usize != index {
                self.prevs[next as usize] = index as i64;
            }
        }
    }

    /// Returns the successor of an index.
    pub fn next(&self, index: usize) -> i64 {
        self.nexts[index]
    }

    /// Returns the predecessor of an index, or -1 when it has none.
    pub fn prev(&self, index: usize) -> i64 {
        self.prevs[index]
    }

    /// Returns true when the value denotes a path end.
    pub fn is_path_end(&self, value: i64) -> bool {
        value as usize >= self.nexts.len()
    }

    /// Returns true when the index is the start of a path.
    pub fn is_start(&self, index: usize) -> bool {
        self.is_start[index]
    }

    /// Returns true when the index is currently skipped (a self loop).
    pub fn is_inactive(&self, index: usize) -> bool {
        self.nexts[index] == index as i64
    }

    /// Returns the start index of a path.
    pub fn start(&self, path: usize) -> usize {
        self.starts[path]
    }

    /// Returns the end index of a path.
    pub fn end(&self, path: usize) -> usize {
        self.ends[path]
    }

    /// Returns the full node sequence of a path, from its start index to its
    /// end index inclusive.
    pub fn path(&self, path: usize) -> Vec<i64> {
        let mut nodes = vec![self.starts[path] as i64];
        loop {
            let last = *nodes.last().expect("path is never empty");
            if self.is_path_end(last) {
                return nodes;
            }
            nodes.push(self.nexts[last as usize]);
        }
    }

    /// Returns the indices which are active and not path starts.
    pub fn active_non_start_indices(&self) -> Vec<usize> {
        (0..self.nexts.len()).filter(|&index| !self.is_start(index) && !self.is_inactive(index)).collect()
    }

    /// Returns the currently inactive indices.
    pub fn inactive_indices(&self) -> Vec<usize> {
        (0..self.nexts.len()).filter(|&index| self.is_inactive(index)).collect()
    }

    /// Applies a delta to the current solution and returns the resulting
    /// next values; released variables keep their current value.
    pub fn apply(&self, delta: &Delta) -> Vec<i64> {
        let mut nexts = self.nexts.clone();
        for &(index, value) in &delta.changes {
            nexts[index] = value;
        }
        nexts
    }
}

/// A local search operator: a neighborhood iterator over a synchronized
/// solution.
pub trait LocalSearchOperator {
    /// Synchronizes the operator with the current solution.
    fn start(&mut self, state: &PathState);

    /// Writes the next candidate move into `delta`; returns false when the
    /// neighborhood is exhausted.
    fn make_next_neighbor(&mut self, state: &PathState, delta: &mut Delta) -> bool;
}

/// Rejects candidate moves before the solver validates them.
pub trait LocalSearchFilter {
    /// Synchronizes the filter with the current solution.
    fn synchronize(&mut self, state: &PathState);

    /// Returns false when the delta is surely infeasible or not worth the
    /// full propagation.
    fn accept(&mut self, state: &PathState, delta: &Delta) -> bool;
}

/// Shares the move-list plumbing of the concrete path operators: neighbors
/// are precomputed against the synchronized solution and replayed one by one.
#[derive(Default)]
struct MoveList {
    moves: Vec<Delta>,
    cursor: usize,
}

impl MoveList {
    fn clear(&mut self) {
        self.moves.clear();
        self.cursor = 0;
    }

    fn push(&mut self, delta: Delta) {
        self.moves.push(delta);
    }

    fn next_into(&mut self, delta: &mut Delta) -> bool {
        if self.cursor == self.moves.len() {
            return false;
        }
        delta.clear();
        delta.changes.extend_from_slice(&self.moves[self.cursor].changes);
        delta.released.extend_from_slice(&self.moves[self.cursor].released);
        self.cursor += 1;
        true
    }
}

/// Reverses a sub-chain of a path: the classical 2-opt move.
#[derive(Default)]
pub struct TwoOpt {
    moves: MoveList,
}

impl LocalSearchOperator for TwoOpt {
    fn start(&mut self, state: &PathState) {
        self.moves.clear();
        for path in 0..state.num_paths() {
            let nodes = state.path(path);
            // nodes[0] is the start, the last entry is the end index.
            for i in 1..nodes.len().saturating_sub(2) {
                for j in (i + 1)..nodes.len() - 1 {
                    let mut delta = Delta::default();
                    delta.set(nodes[i - 1] as usize, nodes[j]);
                    for k in i..j {
                        delta.set(nodes[k + 1] as usize, nodes[k]);
                    }
                    delta.set(nodes[i] as usize, nodes[j + 1]);
                    self.moves.push(delta);
                }
            }
        }
    }

    fn make_next_neighbor(&mut self, _state: &PathState, delta: &mut Delta) -> bool {
        self.moves.next_into(delta)
    }
}

/// Relocates chains of one to three consecutive nodes inside their path.
#[derive(Default)]
pub struct OrOpt {
    moves: MoveList,
}

impl LocalSearchOperator for OrOpt {
    fn start(&mut self, state: &PathState) {
        self.moves.clear();
        for path in 0..state.num_paths() {
            let nodes = state.path(path);
            if nodes.len() < 4 {
                continue;
            }
            for length in 1..=3usize {
                // Chain of `length` visits starting at position p; insertion
                // after position q outside of the removed chain.
                for p in 1..nodes.len() - 1 {
                    if p + length >= nodes.len() {
                        break;
                    }
                    for q in 0..nodes.len() - 1 {
                        if q + 1 >= p && q <= p + length - 1 {
                            continue;
                        }
                        let mut delta = Delta::default();
                        delta.set(nodes[p - 1] as usize, nodes[p + length]);
                        delta.set(nodes[q] as usize, nodes[p]);
                        delta.set(nodes[p + length - 1] as usize, nodes[q + 1]);
                        self.moves.push(delta);
                    }
                }
            }
        }
    }

    fn make_next_neighbor(&mut self, _state: &PathState, delta: &mut Delta) -> bool {
        self.moves.next_into(delta)
    }
}

/// Moves one node behind any other node, inside or across paths.
#[derive(Default)]
pub struct Relocate {
    moves: MoveList,
}

impl LocalSearchOperator for Relocate {
    fn start(&mut self, state: &PathState) {
        self.moves.clear();
        for node in state.active_non_start_indices() {
            let prev = state.prev(node);
            debug_assert!(prev >= 0);
            for target in 0..state.num_nexts() {
                if target == node || target as i64 == prev || state.is_inactive(target) {
                    continue;
                }
                let mut delta = Delta::default();
                delta.set(prev as usize, state.next(node));
                delta.set(node, state.next(target));
                delta.set(target, node as i64);
                self.moves.push(delta);
            }
        }
    }

    fn make_next_neighbor(&mut self, _state: &PathState, delta: &mut Delta) -> bool {
        self.moves.next_into(delta)
    }
}

/// Swaps the positions of two nodes, inside or across paths.
#[derive(Default)]
pub struct Exchange {
    moves: MoveList,
}

impl LocalSearchOperator for Exchange {
    fn start(&mut self, state: &PathState) {
        self.moves.clear();
        let candidates = state.active_non_start_indices();
        for (position, &first) in candidates.iter().enumerate() {
            for &second in candidates.iter().skip(position + 1) {
                let mut delta = Delta::default();
                if state.next(first) == second as i64 {
                    delta.set(state.prev(first) as usize, second as i64);
                    delta.set(second, first as i64);
                    delta.set(first, state.next(second));
                } else if state.next(second) == first as i64 {
                    delta.set(state.prev(second) as usize, first as i64);
                    delta.set(first, second as i64);
                    delta.set(second, state.next(first));
                } else {
                    delta.set(state.prev(first) as usize, second as i64);
                    delta.set(second, state.next(first));
                    delta.set(state.prev(second) as usize, first as i64);
                    delta.set(first, state.next(second));
                }
                self.moves.push(delta);
            }
        }
    }

    fn make_next_neighbor(&mut self, _state: &PathState, delta: &mut Delta) -> bool {
        self.moves.next_into(delta)
    }
}

/// Exchanges the tails of two paths after a cut point in each.
#[derive(Default)]
pub struct Cross {
    moves: MoveList,
}

impl LocalSearchOperator for Cross {
    fn start(&mut self, state: &PathState) {
        self.moves.clear();
        for first_path in 0..state.num_paths() {
            for second_path in (first_path + 1)..state.num_paths() {
                let first = state.path(first_path);
                let second = state.path(second_path);
                for cut1 in 0..first.len() - 1 {
                    for cut2 in 0..second.len() - 1 {
                        // Visits moved to the other path; both ends stay put.
                        let tail1 = &first[cut1 + 1..first.len() - 1];
                        let tail2 = &second[cut2 + 1..second.len() - 1];
                        if tail1.is_empty() && tail2.is_empty() {
                            continue;
                        }
                        let end1 = *first.last().expect("path end");
                        let end2 = *second.last().expect("path end");
                        let mut delta = Delta::default();
                        delta.set(first[cut1] as usize, *tail2.first().unwrap_or(&end1));
                        if let Some(&last) = tail2.last() {
                            delta.set(last as usize, end1);
                        }
                        delta.set(second[cut2] as usize, *tail1.first().unwrap_or(&end2));
                        if let Some(&last) = tail1.last() {
                            delta.set(last as usize, end2);
                        }
                        self.moves.push(delta);
                    }
                }
            }
        }
    }

    fn make_next_neighbor(&mut self, _state: &PathState, delta: &mut Delta) -> bool {
        self.moves.next_into(delta)
    }
}

/// Inserts an inactive node behind an active one.
#[derive(Default)]
pub struct MakeActive {
    moves: MoveList,
}

impl LocalSearchOperator for MakeActive {
    fn start(&mut self, state: &PathState) {
        self.moves.clear();
        for node in state.inactive_indices() {
            for target in 0..state.num_nexts() {
                if target == node || state.is_inactive(target) {
                    continue;
                }
                let mut delta = Delta::default();
                delta.set(target, node as i64);
                delta.set(node, state.next(target));
                self.moves.push(delta);
            }
        }
    }

    fn make_next_neighbor(&mut self, _state: &PathState, delta: &mut Delta) -> bool {
        self.moves.next_into(delta)
    }
}

/// Takes an active node out of its path, leaving it as a self loop.
#[derive(Default)]
pub struct MakeInactive {
    moves: MoveList,
}

impl LocalSearchOperator for MakeInactive {
    fn start(&mut self, state: &PathState) {
        self.moves.clear();
        for node in state.active_non_start_indices() {
            let mut delta = Delta::default();
            delta.set(state.prev(node) as usize, state.next(node));
            delta.set(node, node as i64);
            self.moves.push(delta);
        }
    }

    fn make_next_neighbor(&mut self, _state: &PathState, delta: &mut Delta) -> bool {
        self.moves.next_into(delta)
    }
}

/// Releases a random contiguous sub-path per path, letting the solver
/// re-stitch the fragment.
pub struct PathLns {
    random: Arc<dyn Random>,
    max_chain: usize,
    fragments_per_path: usize,
    moves: MoveList,
}

impl PathLns {
    /// Creates the operator; `max_chain` bounds the released chain length.
    pub fn new(random: Arc<dyn Random>, max_chain: usize) -> Self {
        Self { random, max_chain, fragments_per_path: 2, moves: MoveList::default() }
    }
}

impl LocalSearchOperator for PathLns {
    fn start(&mut self, state: &PathState) {
        self.moves.clear();
        for path in 0..state.num_paths() {
            let nodes = state.path(path);
            let visits = nodes.len() - 2;
            if visits == 0 {
                continue;
            }
            for _ in 0..self.fragments_per_path {
                let length = self.random.uniform_int(1, (visits.min(self.max_chain)) as i64) as usize;
                let position = self.random.uniform_int(1, (visits - length + 1) as i64) as usize;
                let mut delta = Delta::default();
                delta.release(nodes[position - 1] as usize);
                for &node in &nodes[position..position + length] {
                    delta.release(node as usize);
                }
                self.moves.push(delta);
            }
        }
    }

    fn make_next_neighbor(&mut self, _state: &PathState, delta: &mut Delta) -> bool {
        self.moves.next_into(delta)
    }
}

/// Releases whole paths together with all inactive nodes.
#[derive(Default)]
pub struct FullPathLns {
    moves: MoveList,
}

impl LocalSearchOperator for FullPathLns {
    fn start(&mut self, state: &PathState) {
        self.moves.clear();
        let inactive = state.inactive_indices();
        for path in 0..state.num_paths() {
            let nodes = state.path(path);
            let mut delta = Delta::default();
            for &node in &nodes[..nodes.len() - 1] {
                delta.release(node as usize);
            }
            for &node in &inactive {
                delta.release(node);
            }
            self.moves.push(delta);
        }
    }

    fn make_next_neighbor(&mut self, _state: &PathState, delta: &mut Delta) -> bool {
        self.moves.next_into(delta)
    }
}

/// The result of a local search run.
#[derive(Clone, Debug)]
pub struct LocalSearchOutcome {
    /// The best solution found.
    pub nexts: Vec<i64>,
    /// Its cost.
    pub cost: i64,
    /// True when a monitor stopped the search before a local optimum was
    /// proven.
    pub aborted: bool,
}

/// Runs the local search loop: sweep the operators, filter and validate
/// neighbors, let the metaheuristic arbitrate acceptance, restart after each
/// accepted move and stop at a local optimum the metaheuristic does not want
/// to escape from.
///
/// `commit` asks the owner of the model to validate a delta and complete the
/// released variables; it returns the full solution and its cost, or None
/// when the delta is infeasible.
#[allow(clippy::too_many_arguments)]
pub fn run_local_search(
    state: &mut PathState,
    initial_cost: i64,
    operators: &mut [Box<dyn LocalSearchOperator>],
    filters: &mut [Box<dyn LocalSearchFilter>],
    metaheuristic: &mut dyn Metaheuristic,
    monitors: &mut [Box<dyn SearchMonitor>],
    commit: &mut dyn FnMut(&PathState, &Delta) -> Option<(Vec<i64>, i64)>,
) -> LocalSearchOutcome {
    let mut best_nexts = state.nexts().to_vec();
    let mut best_cost = initial_cost;
    let mut current_cost = initial_cost;
    metaheuristic.reset(initial_cost);
    let mut delta = Delta::default();
    loop {
        if must_stop(monitors) {
            return LocalSearchOutcome { nexts: best_nexts, cost: best_cost, aborted: true };
        }
        let mut accepted = false;
        'sweep: for operator in operators.iter_mut() {
            operator.start(state);
            filters.iter_mut().for_each(|filter| filter.synchronize(state));
            while operator.make_next_neighbor(state, &mut delta) {
                if must_stop(monitors) {
                    return LocalSearchOutcome { nexts: best_nexts, cost: best_cost, aborted: true };
                }
                if delta.is_empty() || !filters.iter_mut().all(|filter| filter.accept(state, &delta)) {
                    continue;
                }
                let Some((nexts, cost)) = commit(state, &delta) else { continue };
                let candidate = Candidate { cost, nexts: &nexts };
                let current = Candidate { cost: current_cost, nexts: state.nexts() };
                if metaheuristic.accept(&candidate, &current, &delta) {
                    metaheuristic.on_accepted(&delta, &current, cost);
                    state.set_solution(&nexts);
                    current_cost = cost;
                    if cost < best_cost {
                        best_cost = cost;
                        best_nexts = nexts;
                        monitors.iter_mut().for_each(|monitor| monitor.at_solution(cost));
                    }
                    accepted = true;
                    break 'sweep;
                }
            }
        }
        if !accepted {
            let current = Candidate { cost: current_cost, nexts: state.nexts() };
            if !metaheuristic.at_local_optimum(&current) {
                return LocalSearchOutcome { nexts: best_nexts, cost: best_cost, aborted: false };
            }
        }
    }
}
