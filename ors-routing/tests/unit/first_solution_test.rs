use super::*;
use crate::helpers::models::{create_silent_environment, create_tsp_model, manhattan_evaluator, TSP_POINTS};
use crate::model::RoutingModel;
use crate::parameters::RoutingStatus;
use ors_cp::search::{find_solution, SearchOutcome};

fn manhattan_by_index(model: &RoutingModel) -> SegmentEvaluator {
    let nodes: Vec<_> = (0..model.size() + model.vehicles()).map(|index| model.index_to_node(index)).collect();
    Rc::new(move |from, to| {
        let (x1, y1) = TSP_POINTS[nodes[from as usize].0];
        let (x2, y2) = TSP_POINTS[nodes[to as usize].0];
        (x1 - x2).abs() + (y1 - y2).abs()
    })
}

#[test]
fn can_grow_the_cheapest_path() {
    let mut model = create_tsp_model();
    model.close_model();
    let evaluator = manhattan_by_index(&model);
    let nexts: Vec<_> = (0..model.size()).map(|index| model.next_var(index)).collect();
    let mut builder = PathCheapestArc::new(nexts.clone(), vec![model.start(0)], evaluator);

    let outcome = find_solution(model.solver_mut(), &mut builder, &[]);

    assert_eq!(outcome, SearchOutcome::Solution);
    // The greedy growth chains the nearest unvisited slot each time.
    let values: Vec<_> = nexts.iter().map(|&var| model.solver().value(var)).collect();
    assert_eq!(values, vec![1, 2, 3, 5, 0]);
}

#[test]
fn can_pick_the_globally_cheapest_arcs() {
    let mut model = create_tsp_model();
    model.close_model();
    let evaluator = manhattan_by_index(&model);
    let nexts: Vec<_> = (0..model.size()).map(|index| model.next_var(index)).collect();
    let mut builder = GlobalCheapestArc::new(nexts.clone(), vec![model.start(0)], evaluator);

    let outcome = find_solution(model.solver_mut(), &mut builder, &[]);

    assert_eq!(outcome, SearchOutcome::Solution);
    // Every slot is visited exactly once.
    let values: Vec<_> = nexts.iter().map(|&var| model.solver().value(var)).collect();
    let mut targets: Vec<_> = values.iter().filter(|&&value| value < model.size() as i64).collect();
    targets.sort_unstable();
    targets.dedup();
    assert_eq!(targets.len(), model.size() - 1);
}

#[test]
fn can_connect_the_first_unbound_slot() {
    let mut model = create_tsp_model();
    model.close_model();
    let evaluator = manhattan_by_index(&model);
    let nexts: Vec<_> = (0..model.size()).map(|index| model.next_var(index)).collect();
    let mut builder = LocalCheapestArc::new(nexts.clone(), vec![model.start(0)], evaluator);

    let outcome = find_solution(model.solver_mut(), &mut builder, &[]);

    assert_eq!(outcome, SearchOutcome::Solution);
}

#[test]
fn can_complete_models_with_optional_slots() {
    let mut model = RoutingModel::new(3, 1, create_silent_environment());
    model.set_cost(manhattan_evaluator());
    // Both customers are optional and expensive to keep.
    model.add_disjunction_with_penalty(&[crate::model::NodeIndex(1)], 0);
    model.add_disjunction_with_penalty(&[crate::model::NodeIndex(2)], 0);
    model.close_model();
    let evaluator = manhattan_by_index(&model);
    let nexts: Vec<_> = (0..model.size()).map(|index| model.next_var(index)).collect();
    let mut builder = PathCheapestArc::new(nexts.clone(), vec![model.start(0)], evaluator);

    let outcome = find_solution(model.solver_mut(), &mut builder, &[]);

    // The route grows over the optional slots; none is left unbound.
    assert_eq!(outcome, SearchOutcome::Solution);
    assert!(nexts.iter().all(|&var| model.solver().is_bound(var)));
}

#[test]
fn can_fail_on_an_impossible_model() {
    let mut model = RoutingModel::new(3, 1, create_silent_environment());
    model.set_cost(Rc::new(|_, _| 1));
    model.add_vector_dimension(vec![0, 1, 1], 1, "load");

    assert!(model.solve(None).is_none());
    assert_eq!(model.status(), RoutingStatus::Fail);
}
