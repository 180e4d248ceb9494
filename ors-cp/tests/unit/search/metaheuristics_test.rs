use super::*;
use crate::utils::DefaultRandom;

fn candidate(cost: i64, nexts: &[i64]) -> Candidate<'_> {
    Candidate { cost, nexts }
}

#[test]
fn can_descend_greedily() {
    let mut greedy = GreedyDescent::default();
    let nexts = vec![1, 2, 0];
    let delta = Delta::default();

    assert!(greedy.accept(&candidate(5, &nexts), &candidate(6, &nexts), &delta));
    assert!(!greedy.accept(&candidate(6, &nexts), &candidate(6, &nexts), &delta));
    assert!(!greedy.at_local_optimum(&candidate(6, &nexts)));
}

#[test]
fn can_penalize_costly_arcs() {
    // Two arcs: 0 -> 1 costs 10, 1 -> 2 costs 1.
    let arc_cost = std::rc::Rc::new(|index: usize, _next: i64| if index == 0 { 10 } else { 1 });
    let mut gls = GuidedLocalSearch::new(arc_cost, 10);
    gls.reset(11);
    let nexts = vec![1, 2];

    assert!(gls.at_local_optimum(&candidate(11, &nexts)));

    // The penalized solution now looks worse than its raw cost.
    let delta = Delta::default();
    assert!(!gls.accept(&candidate(11, &nexts), &candidate(11, &nexts), &delta));
    // An unpenalized solution with the same raw cost is preferred.
    let other = vec![0i64, 2];
    let other = Candidate { cost: 11, nexts: &other };
    assert!(gls.accept(&other, &candidate(11, &nexts), &delta));
}

#[test]
fn can_stop_penalizing_after_the_round_cap() {
    let arc_cost = std::rc::Rc::new(|_: usize, _: i64| 1);
    let mut gls = GuidedLocalSearch::new(arc_cost, 2);
    gls.reset(10);
    let nexts = vec![1, 2];

    assert!(gls.at_local_optimum(&candidate(10, &nexts)));
    assert!(gls.at_local_optimum(&candidate(10, &nexts)));
    assert!(!gls.at_local_optimum(&candidate(10, &nexts)));
}

#[test]
fn can_accept_improvements_when_annealing() {
    let random = std::sync::Arc::new(DefaultRandom::new_repeatable());
    let mut annealing = SimulatedAnnealing::new(random, 10., 0.5);
    let nexts = vec![1, 2, 0];
    let delta = Delta::default();

    assert!(annealing.accept(&candidate(5, &nexts), &candidate(6, &nexts), &delta));
}

#[test]
fn can_freeze_out_annealing() {
    let random = std::sync::Arc::new(DefaultRandom::new_repeatable());
    let mut annealing = SimulatedAnnealing::new(random, 1., 0.5);
    let nexts = vec![1, 2, 0];

    // Cooling at every local optimum eventually freezes the search.
    let mut rounds = 0;
    while annealing.at_local_optimum(&candidate(5, &nexts)) {
        rounds += 1;
        assert!(rounds < 64, "annealing never froze");
    }

    // Once frozen, worsening moves are rejected deterministically.
    let delta = Delta::default();
    assert!(!annealing.accept(&candidate(9, &nexts), &candidate(5, &nexts), &delta));
}

#[test]
fn can_forbid_reverting_moves_with_tabu() {
    let mut tabu = TabuSearch::new(8, 4);
    tabu.reset(10);
    let before = vec![1i64, 2, 0];
    let after = vec![2i64, 1, 0];
    let mut delta = Delta::default();
    delta.set(0, 2);
    delta.set(1, 1);

    // A worsening move is only taken after a local optimum was declared.
    assert!(!tabu.accept(&candidate(12, &after), &candidate(10, &before), &delta));
    assert!(tabu.at_local_optimum(&candidate(10, &before)));
    assert!(tabu.accept(&candidate(12, &after), &candidate(10, &before), &delta));
    tabu.on_accepted(&delta, &candidate(10, &before), 12);

    // Undoing the move is tabu now, even though it improves.
    let mut revert = Delta::default();
    revert.set(0, 1);
    revert.set(1, 2);
    assert!(!tabu.accept(&candidate(11, &before), &candidate(12, &after), &revert));

    // Unless it beats the best known cost.
    assert!(tabu.accept(&candidate(9, &before), &candidate(12, &after), &revert));
}
