use super::*;
use crate::solver::table::AllowedPairs;
use crate::solver::Solver;
use std::rc::Rc;
use std::sync::Arc;

fn create_difference_problem() -> (Solver, Vec<crate::solver::IntVar>) {
    // Three variables, consecutive ones must differ.
    let mut solver = Solver::new();
    let vars: Vec<_> = (0..3).map(|_| solver.new_int_var(0, 1)).collect();
    let mut tuples = crate::tuples::IntTupleSet::new(2);
    tuples.insert2(0, 1);
    tuples.insert2(1, 0);
    for pair in vars.windows(2) {
        solver.add_constraint(Rc::new(AllowedPairs::new(pair[0], pair[1], tuples.clone()))).expect("can post");
    }
    (solver, vars)
}

#[test]
fn can_find_a_solution_by_backtracking() {
    let (mut solver, vars) = create_difference_problem();
    let mut builder = AssignFirstUnbound::new(vars.clone());

    let outcome = find_solution(&mut solver, &mut builder, &[]);

    assert_eq!(outcome, SearchOutcome::Solution);
    let values: Vec<_> = vars.iter().map(|&var| solver.value(var)).collect();
    assert_eq!(values, vec![0, 1, 0]);
    solver.backtrack_to(0);
}

#[test]
fn can_exhaust_an_infeasible_tree() {
    let mut solver = Solver::new();
    let x = solver.new_int_var(0, 1);
    let y = solver.new_int_var(0, 1);
    // Only pair (0, 0) is allowed but x and y must also differ.
    let mut same = crate::tuples::IntTupleSet::new(2);
    same.insert2(0, 0);
    same.insert2(1, 1);
    let mut differ = crate::tuples::IntTupleSet::new(2);
    differ.insert2(0, 1);
    differ.insert2(1, 0);
    solver.add_constraint(Rc::new(AllowedPairs::new(x, y, same))).expect("can post");
    let result = solver.add_constraint(Rc::new(AllowedPairs::new(x, y, differ)));

    // The contradiction is already found while posting.
    assert!(result.is_err());
}

#[test]
fn can_abort_on_a_tripped_limit() {
    let (mut solver, vars) = create_difference_problem();
    let mut builder = AssignFirstUnbound::new(vars);
    let monitors: Vec<Box<dyn SearchMonitor>> = vec![Box::new(TimeLimit::new(0))];

    let outcome = find_solution(&mut solver, &mut builder, &monitors);

    assert_eq!(outcome, SearchOutcome::Aborted);
    solver.backtrack_to(0);
}

#[test]
fn can_count_solutions_with_a_limit() {
    let mut limit = SolutionLimit::new(2);
    limit.enter_search();
    assert!(!limit.must_stop());

    limit.at_solution(10);
    assert!(!limit.must_stop());
    limit.at_solution(9);
    assert!(limit.must_stop());
}

#[test]
fn can_log_search_events() {
    let lines = Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink = lines.clone();
    let mut log = SearchLog::new(Arc::new(move |message: &str| {
        sink.lock().expect("lock").push(message.to_string());
    }));

    log.enter_search();
    log.at_solution(7);
    log.exit_search();

    let lines = lines.lock().expect("lock");
    assert_eq!(lines.len(), 3);
    assert!(lines[1].contains("objective: 7"));
    assert!(lines[2].contains("solutions: 1"));
}

#[test]
fn can_reset_a_time_limit() {
    let mut limit = TimeLimit::new(0);
    assert!(limit.must_stop());

    limit.reset(60_000);
    assert!(!limit.must_stop());
}
