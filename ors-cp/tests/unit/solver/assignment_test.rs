use super::*;
use crate::solver::Solver;

fn temp_file(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("ors_cp_assignment_{name}_{}.json", std::process::id()))
}

#[test]
fn can_store_values_and_bounds() {
    let mut assignment = Assignment::new();
    let var = IntVar::from_index(3);

    assignment.set_value(var, 9);
    assignment.set_objective(42);

    assert!(assignment.has_var(var));
    assert_eq!(assignment.value(var), Some(9));
    assert_eq!(assignment.bounds(var), Some((9, 9)));
    assert_eq!(assignment.objective(), Some(42));
    assert!(!assignment.has_var(IntVar::from_index(4)));
}

#[test]
fn can_capture_solver_bounds() {
    let mut solver = Solver::new();
    let var = solver.new_int_var(1, 8);
    let mut assignment = Assignment::new();

    assignment.store_var(&solver, var);

    assert_eq!(assignment.bounds(var), Some((1, 8)));
    assert_eq!(assignment.value(var), None);
}

#[test]
fn can_sort_entries_by_variable() {
    let mut assignment = Assignment::new();
    assignment.set_value(IntVar::from_index(5), 50);
    assignment.set_value(IntVar::from_index(1), 10);
    assignment.set_value(IntVar::from_index(3), 30);

    let entries = assignment.sorted_entries();

    assert_eq!(entries.iter().map(|(var, _, _)| var.index()).collect::<Vec<_>>(), vec![1, 3, 5]);
}

#[test]
fn can_round_trip_through_a_file() {
    let path = temp_file("round_trip");
    let mut assignment = Assignment::new();
    assignment.set_value(IntVar::from_index(0), 4);
    assignment.set_bounds(IntVar::from_index(2), 1, 7);
    assignment.set_objective(11);

    assignment.save(&path).expect("can save");
    let loaded = Assignment::load(&path).expect("can load");
    std::fs::remove_file(&path).ok();

    assert_eq!(loaded.objective(), Some(11));
    assert_eq!(loaded.value(IntVar::from_index(0)), Some(4));
    assert_eq!(loaded.bounds(IntVar::from_index(2)), Some((1, 7)));
    assert_eq!(loaded.len(), 2);
}

#[test]
fn can_reject_missing_files() {
    assert!(Assignment::load(temp_file("does_not_exist")).is_err());
}

#[test]
fn can_reject_inconsistent_bounds() {
    let path = temp_file("inconsistent");
    std::fs::write(&path, r#"{"objective":null,"variables":[{"id":0,"min":5,"max":2}]}"#).expect("can write");

    let result = Assignment::load(&path);
    std::fs::remove_file(&path).ok();

    assert!(result.is_err());
}

#[test]
fn can_merge_assignments() {
    let mut base = Assignment::new();
    base.set_value(IntVar::from_index(0), 1);
    base.set_value(IntVar::from_index(1), 2);
    let mut overlay = Assignment::new();
    overlay.set_value(IntVar::from_index(1), 9);
    overlay.set_objective(5);

    base.copy_from(&overlay);

    assert_eq!(base.value(IntVar::from_index(0)), Some(1));
    assert_eq!(base.value(IntVar::from_index(1)), Some(9));
    assert_eq!(base.objective(), Some(5));
}
