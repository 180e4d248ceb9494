use super::*;

/// Keeps `x <= y` by bounds propagation, enough to observe demons firing.
struct LessOrEqual {
    x: IntVar,
    y: IntVar,
}

impl Constraint for LessOrEqual {
    fn post(&self, solver: &mut Solver, constraint: usize) {
        solver.when_domain(self.x, Demon { constraint, payload: 0 });
        solver.when_domain(self.y, Demon { constraint, payload: 1 });
    }

    fn initial_propagate(&self, solver: &mut Solver) -> CpResult<()> {
        solver.set_max(self.x, solver.max(self.y))?;
        solver.set_min(self.y, solver.min(self.x))
    }

    fn propagate(&self, solver: &mut Solver, _payload: i64) -> CpResult<()> {
        self.initial_propagate(solver)
    }
}

#[test]
fn can_create_variables_with_bounds() {
    let mut solver = Solver::new();
    let var = solver.new_int_var(2, 7);

    assert_eq!(solver.min(var), 2);
    assert_eq!(solver.max(var), 7);
    assert_eq!(solver.domain_size(var), 6);
    assert!(!solver.is_bound(var));
    assert!(solver.contains(var, 5));
    assert!(!solver.contains(var, 8));
}

#[test]
fn can_shrink_and_restore_domains() {
    let mut solver = Solver::new();
    let var = solver.new_int_var(0, 10);

    solver.push_frame();
    assert!(solver.set_min(var, 3).is_ok());
    assert!(solver.set_max(var, 5).is_ok());
    assert_eq!((solver.min(var), solver.max(var)), (3, 5));

    solver.backtrack();
    assert_eq!((solver.min(var), solver.max(var)), (0, 10));
}

#[test]
fn can_remove_inner_values() {
    let mut solver = Solver::new();
    let var = solver.new_int_var(0, 4);

    assert!(solver.remove_value(var, 2).is_ok());
    assert_eq!(solver.domain_values(var), vec![0, 1, 3, 4]);
    assert!(!solver.contains(var, 2));

    // Bounds skip removed values.
    assert!(solver.set_min(var, 2).is_ok());
    assert_eq!(solver.min(var), 3);
}

#[test]
fn can_fail_on_empty_domain() {
    let mut solver = Solver::new();
    let var = solver.new_int_var(0, 1);

    assert!(solver.remove_value(var, 0).is_ok());
    assert!(solver.is_bound(var));
    assert_eq!(solver.value(var), 1);
    assert_eq!(solver.remove_value(var, 1), Err(Failure));
    assert_eq!(solver.set_min(var, 2), Err(Failure));
}

#[test]
fn can_propagate_through_demons() {
    let mut solver = Solver::new();
    let x = solver.new_int_var(0, 10);
    let y = solver.new_int_var(0, 5);
    assert!(solver.add_constraint(std::rc::Rc::new(LessOrEqual { x, y })).is_ok());
    assert_eq!(solver.max(x), 5);

    assert!(solver.try_assign(x, 4).is_ok());
    assert_eq!(solver.min(y), 4);
}

#[test]
fn can_restore_propagated_state() {
    let mut solver = Solver::new();
    let x = solver.new_int_var(0, 10);
    let y = solver.new_int_var(0, 5);
    assert!(solver.add_constraint(std::rc::Rc::new(LessOrEqual { x, y })).is_ok());

    solver.push_frame();
    assert!(solver.try_assign(y, 2).is_ok());
    assert_eq!(solver.max(x), 2);

    solver.backtrack();
    assert_eq!(solver.max(x), 5);
    assert_eq!(solver.max(y), 5);
}

#[test]
fn can_detect_conflicting_propagation() {
    let mut solver = Solver::new();
    let x = solver.new_int_var(4, 10);
    let y = solver.new_int_var(0, 5);
    assert!(solver.add_constraint(std::rc::Rc::new(LessOrEqual { x, y })).is_ok());

    solver.push_frame();
    assert!(solver.try_assign(y, 4).is_ok());
    assert!(solver.try_assign(x, 5).is_err());
    solver.backtrack();
    assert_eq!(solver.min(x), 4);
}

#[test]
fn can_bind_with_set_value() {
    let mut solver = Solver::new();
    let var = solver.new_int_var(0, 9);

    assert!(solver.set_value(var, 6).is_ok());
    assert!(solver.is_bound(var));
    assert_eq!(solver.value(var), 6);
    assert_eq!(solver.set_value(var, 7), Err(Failure));
}
