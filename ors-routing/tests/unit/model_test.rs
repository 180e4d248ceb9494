use super::*;
use crate::helpers::models::*;
use crate::parameters::{FirstSolutionStrategy, RoutingMetaheuristic, RoutingStatus};

fn temp_file(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("ors_routing_{name}_{}.json", std::process::id()))
}

#[test]
fn can_build_the_index_layout() {
    let model = create_tsp_model();

    assert_eq!(model.nodes(), 5);
    assert_eq!(model.vehicles(), 1);
    // Four visit slots plus one start slot.
    assert_eq!(model.size(), 5);
    assert_eq!(model.start(0), 4);
    assert_eq!(model.end(0), 5);
    assert!(model.is_start(4));
    assert!(model.is_end(5));
    assert!(!model.is_end(4));
    assert_eq!(model.index_to_node(0), NodeIndex(1));
    assert_eq!(model.index_to_node(4), NodeIndex(0));
    assert_eq!(model.index_to_node(5), NodeIndex(0));
    assert_eq!(model.node_to_index(NodeIndex(1)), Some(0));
    assert_eq!(model.node_to_index(NodeIndex(0)), None);
}

#[test]
fn can_lay_out_distinct_start_ends() {
    let model = RoutingModel::new_with_start_ends(
        4,
        2,
        vec![NodeIndex(0), NodeIndex(1)],
        vec![NodeIndex(1), NodeIndex(0)],
        create_silent_environment(),
    );

    // Two terminal nodes, two visit slots, two start slots.
    assert_eq!(model.size(), 4);
    assert_eq!(model.index_to_node(model.start(0)), NodeIndex(0));
    assert_eq!(model.index_to_node(model.end(0)), NodeIndex(1));
    assert_eq!(model.index_to_node(model.start(1)), NodeIndex(1));
    assert_eq!(model.index_to_node(model.end(1)), NodeIndex(0));
}

#[test]
fn can_solve_the_manhattan_tour() {
    let mut model = create_tsp_model();

    let solution = model.solve(None).expect("a tour exists");

    assert_eq!(model.status(), RoutingStatus::Success);
    assert_eq!(solution.objective(), Some(6));
    let routes = model.assignment_to_routes(&solution);
    assert_eq!(routes.len(), 1);
    assert_eq!(routes[0].len(), 4);
    let mut visited: Vec<usize> = routes[0].iter().map(|node| node.0).collect();
    visited.sort_unstable();
    assert_eq!(visited, vec![1, 2, 3, 4]);
}

#[test]
fn can_skip_a_penalized_node() {
    // Serving node 4 costs two extra units but skipping it only costs one.
    let mut model = create_tsp_model();
    model.add_disjunction_with_penalty(&[NodeIndex(4)], 1);

    let solution = model.solve(None).expect("a tour exists");

    assert_eq!(solution.objective(), Some(5));
    let routes = model.assignment_to_routes(&solution);
    let mut visited: Vec<usize> = routes[0].iter().map(|node| node.0).collect();
    visited.sort_unstable();
    assert_eq!(visited, vec![1, 2, 3]);
    let index = model.node_to_index(NodeIndex(4)).expect("node 4 has a slot");
    assert_eq!(solution.value(model.active_var(index)), Some(0));
}

#[test]
fn can_keep_a_cheap_node_active() {
    // Serving node 4 costs two extra units; a penalty of three keeps it in.
    let mut model = create_tsp_model();
    model.add_disjunction_with_penalty(&[NodeIndex(4)], 3);

    let solution = model.solve(None).expect("a tour exists");

    assert_eq!(solution.objective(), Some(6));
    assert_eq!(model.assignment_to_routes(&solution)[0].len(), 4);
}

#[test]
fn can_split_load_between_vehicles() {
    let mut model = create_capacitated_model();

    let solution = model.solve(None).expect("a split exists");

    let routes = model.assignment_to_routes(&solution);
    assert!(model.is_vehicle_used(&solution, 0));
    assert!(model.is_vehicle_used(&solution, 1));
    let loads = route_loads(&routes, &[0, 1, 1, 1, 1, 1]);
    assert!(loads.iter().all(|&load| load <= 3));
    assert_eq!(loads.iter().sum::<i64>(), 5);
}

#[test]
fn can_round_trip_routes_through_assignments() {
    let mut model = create_tsp_model();
    let solution = model.solve(None).expect("a tour exists");
    let routes = model.assignment_to_routes(&solution);

    let restored = model.read_assignment_from_routes(&routes, false).expect("routes are valid");

    assert_eq!(restored.objective(), solution.objective());
    assert_eq!(model.assignment_to_routes(&restored), routes);
}

#[test]
fn can_inspect_solutions() {
    let mut model = create_tsp_model();
    let solution = model.solve(None).expect("a tour exists");

    let mut current = model.start(0);
    let mut hops = 0;
    while !model.is_end(current) {
        current = model.next(&solution, current).expect("a bound next variable");
        hops += 1;
        assert!(hops <= model.size());
    }
    assert_eq!(current, model.end(0));
    assert_eq!(hops, 5);
}

#[test]
fn can_write_and_read_assignments() {
    let path = temp_file("tour");
    let mut model = create_tsp_model();
    let solution = model.solve(None).expect("a tour exists");
    model.write_assignment(&path).expect("can write");

    let mut fresh = create_tsp_model();
    let restored = fresh.read_assignment(&path).expect("can read");
    std::fs::remove_file(&path).ok();

    assert_eq!(restored.objective(), solution.objective());
}

#[test]
fn can_reject_writing_without_a_solution() {
    let model = create_tsp_model();

    assert!(model.write_assignment(temp_file("none")).is_err());
}

#[test]
fn can_reject_foreign_assignment_files() {
    let path = temp_file("foreign");
    std::fs::write(&path, r#"{"objective":1,"variables":[{"id":99999,"min":0,"max":0}]}"#).expect("can write");

    let mut model = create_tsp_model();
    let result = model.read_assignment(&path);
    std::fs::remove_file(&path).ok();

    assert!(result.is_err());
}

#[test]
fn can_apply_locks() {
    let mut model = create_tsp_model();
    // Force the route to leave the depot towards node 3's slot.
    let slot = model.node_to_index(NodeIndex(3)).expect("node 3 has a slot");
    let start = model.start(0);
    model.apply_locks(&[start, slot]);

    let solution = model.solve(None).expect("a tour exists");

    assert_eq!(model.next(&solution, start), Some(slot));
    assert_eq!(solution.objective(), Some(6));
}

#[test]
fn can_apply_locks_to_all_vehicles() {
    let mut model = create_capacitated_model();
    let locks = vec![vec![NodeIndex(1), NodeIndex(2)], vec![]];

    assert!(model.apply_locks_to_all_vehicles(&locks, false));
    let solution = model.solve(None).expect("a solution exists");

    let start = model.start(0);
    let first = model.next(&solution, start).expect("bound");
    assert_eq!(model.index_to_node(first), NodeIndex(1));
}

#[test]
fn can_detect_infeasible_models() {
    // Two unit demands cannot fit a capacity of one.
    let mut model = RoutingModel::new(3, 1, create_silent_environment());
    model.set_cost(Rc::new(|_, _| 1));
    model.add_vector_dimension(vec![0, 1, 1], 1, "load");

    assert!(model.solve(None).is_none());
    assert_eq!(model.status(), RoutingStatus::Fail);
}

#[test]
fn can_compute_a_lower_bound() {
    let mut model = create_tsp_model();

    let lower_bound = model.compute_lower_bound();

    assert!(lower_bound > 0);
    assert!(lower_bound <= 6);
}

#[test]
fn can_refuse_lower_bounds_on_unsupported_models() {
    let mut with_disjunction = create_tsp_model();
    with_disjunction.add_disjunction_with_penalty(&[NodeIndex(4)], 1);
    assert_eq!(with_disjunction.compute_lower_bound(), 0);

    let mut heterogeneous = create_tsp_model();
    heterogeneous.set_vehicle_cost(0, manhattan_evaluator());
    assert_eq!(heterogeneous.compute_lower_bound(), 0);
}

#[test]
fn can_compact_assignments() {
    // Three nodes, two equivalent vehicles, no capacity: a solution keeping
    // the first vehicle idle can be compacted onto it.
    let mut model = RoutingModel::new(3, 2, create_silent_environment());
    model.set_cost(Rc::new(|_, _| 1));
    let routes = vec![Vec::new(), vec![NodeIndex(1), NodeIndex(2)]];
    let spread = model.read_assignment_from_routes(&routes, false).expect("a valid assignment");
    assert!(!model.is_vehicle_used(&spread, 0));

    let compact = model.compact_assignment(&spread).expect("compaction succeeds");

    let routes = model.assignment_to_routes(&compact);
    assert_eq!(routes[0], vec![NodeIndex(1), NodeIndex(2)]);
    assert!(routes[1].is_empty());
    assert_eq!(compact.objective(), spread.objective());
}

#[test]
fn can_track_fixed_costs() {
    let mut model = create_capacitated_model();
    model.set_route_fixed_cost(10);
    assert_eq!(model.get_route_fixed_cost(), 10);
    model.set_vehicle_fixed_cost(1, 3);
    assert_eq!(model.get_vehicle_fixed_cost(0), 10);
    assert_eq!(model.get_vehicle_fixed_cost(1), 3);

    let solution = model.solve(None).expect("a split exists");
    // Both vehicles are needed, so both fixed costs are paid.
    let objective = solution.objective().expect("an objective");
    assert!(objective >= 13);
}

#[test]
fn can_report_homogeneous_costs() {
    let mut model = create_tsp_model();
    assert!(model.homogeneous_costs());
    assert_eq!(model.get_homogeneous_cost(0, 1), model.get_cost(0, 1, 0));

    model.set_vehicle_cost(0, manhattan_evaluator());
    assert!(!model.homogeneous_costs());
}

parameterized_test! {can_solve_with_metaheuristics, metaheuristic, {
    let mut model = create_tsp_model();
    model.set_metaheuristic(metaheuristic);
    let mut parameters = model.search_parameters().clone();
    parameters.solution_limit = Some(16);
    model.set_search_parameters(parameters);

    let solution = model.solve(None).expect("a tour exists");

    let objective = solution.objective().expect("an objective");
    assert!((6..=8).contains(&objective));
}}

can_solve_with_metaheuristics! {
    case_01_guided_local_search: RoutingMetaheuristic::GuidedLocalSearch,
    case_02_simulated_annealing: RoutingMetaheuristic::SimulatedAnnealing,
    case_03_tabu_search: RoutingMetaheuristic::TabuSearch,
}

#[test]
fn can_warm_start_from_a_hint() {
    let mut model = create_tsp_model();
    let first = model.solve(None).expect("a tour exists");

    let second = model.solve(Some(&first)).expect("the hint restores");

    assert_eq!(second.objective(), Some(6));
}

#[test]
fn can_use_other_first_solution_strategies() {
    for strategy in [
        FirstSolutionStrategy::Default,
        FirstSolutionStrategy::GlobalCheapestArc,
        FirstSolutionStrategy::LocalCheapestArc,
    ] {
        let mut model = create_tsp_model();
        model.set_first_solution_strategy(strategy);
        let solution = model.solve(None).expect("a tour exists");
        assert_eq!(solution.objective(), Some(6), "strategy {strategy:?}");
    }
}

#[test]
fn can_use_an_evaluator_strategy() {
    let mut model = create_tsp_model();
    model.set_first_solution_strategy(FirstSolutionStrategy::EvaluatorStrategy);
    // Rank segments by target slot only; search still reaches the optimum.
    model.set_first_solution_evaluator(Rc::new(|_, to| to));

    let solution = model.solve(None).expect("a tour exists");

    assert_eq!(solution.objective(), Some(6));
}

#[test]
fn can_reset_the_depot() {
    let mut model = RoutingModel::new(3, 1, create_silent_environment());
    model.set_depot(NodeIndex(2));
    model.set_cost(Rc::new(|from: NodeIndex, to: NodeIndex| (from.0 as i64 - to.0 as i64).abs()));

    let solution = model.solve(None).expect("a tour exists");

    assert_eq!(model.index_to_node(model.start(0)), NodeIndex(2));
    let routes = model.assignment_to_routes(&solution);
    assert_eq!(routes[0].len(), 2);
}
