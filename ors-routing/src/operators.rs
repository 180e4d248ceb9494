//! Routing-specific local search operators.

#[cfg(test)]
#[path = "../tests/unit/operators_test.rs"]
mod operators_test;

use crate::cache::IndexEvaluator;
use ors_cp::search::local::{Delta, LocalSearchOperator, PathState};
use std::rc::Rc;

/// Reorders small sub-routes exactly: routes of up to `max_size` visits are
/// solved to optimality by Held-Karp dynamic programming and the improved
/// order is proposed as a move.
pub struct TspOpt {
    evaluator: Rc<IndexEvaluator>,
    max_size: usize,
    moves: Vec<Delta>,
    cursor: usize,
}

impl TspOpt {
    /// Creates the operator; `max_size` bounds the number of visits solved
    /// exactly.
    pub fn new(evaluator: Rc<IndexEvaluator>, max_size: usize) -> Self {
        Self { evaluator, max_size, moves: Vec::new(), cursor: 0 }
    }

    /// Solves the open path from `from` through all of `visits` to `to` and
    /// returns the optimal visit order.
    fn solve_exact(&self, from: i64, visits: &[i64], to: i64) -> Vec<i64> {
        let count = visits.len();
        let full = 1usize << count;
        let mut cost = vec![vec![i64::MAX; count]; full];
        let mut parent = vec![vec![usize::MAX; count]; full];
        for last in 0..count {
            cost[1 << last][last] = (self.evaluator)(from, visits[last]);
        }
        for mask in 1..full {
            for last in 0..count {
                if mask & (1 << last) == 0 || cost[mask][last] == i64::MAX {
                    continue;
                }
                for next in 0..count {
                    if mask & (1 << next) != 0 {
                        continue;
                    }
                    let next_mask = mask | (1 << next);
                    let candidate = cost[mask][last] + (self.evaluator)(visits[last], visits[next]);
                    if candidate < cost[next_mask][next] {
                        cost[next_mask][next] = candidate;
                        parent[next_mask][next] = last;
                    }
                }
            }
        }
        let best = (0..count)
            .min_by_key(|&last| cost[full - 1][last].saturating_add((self.evaluator)(visits[last], to)))
            .expect("at least one visit");
        let mut order = Vec::with_capacity(count);
        let mut mask = full - 1;
        let mut last = best;
        while last != usize::MAX {
            order.push(visits[last]);
            let previous = parent[mask][last];
            mask &= !(1 << last);
            last = previous;
        }
        order.reverse();
        order
    }
}

impl LocalSearchOperator for TspOpt {
    fn start(&mut self, state: &PathState) {
        self.moves.clear();
        self.cursor = 0;
        for path in 0..state.num_paths() {
            let nodes = state.path(path);
            let visits = &nodes[1..nodes.len() - 1];
            if visits.len() < 2 || visits.len() > self.max_size {
                continue;
            }
            let from = nodes[0];
            let to = *nodes.last().expect("path end");
            let order = self.solve_exact(from, visits, to);
            if order == visits {
                continue;
            }
            let mut delta = Delta::default();
            delta.set(from as usize, order[0]);
            for pair in order.windows(2) {
                delta.set(pair[0] as usize, pair[1]);
            }
            delta.set(*order.last().expect("non-empty order") as usize, to);
            self.moves.push(delta);
        }
    }

    fn make_next_neighbor(&mut self, _state: &PathState, delta: &mut Delta) -> bool {
        if self.cursor == self.moves.len() {
            return false;
        }
        delta.clear();
        delta.changes.extend_from_slice(&self.moves[self.cursor].changes);
        self.cursor += 1;
        true
    }
}
