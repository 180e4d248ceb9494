use crate::model::{NodeEvaluator, NodeIndex, RoutingModel};
use crate::parameters::FirstSolutionStrategy;
use ors_cp::utils::{DefaultRandom, Environment};
use std::rc::Rc;
use std::sync::Arc;

/// The five points of the small Manhattan tour instance: the depot at the
/// origin and four customers around it.
pub const TSP_POINTS: [(i64, i64); 5] = [(0, 0), (1, 0), (1, 1), (0, 1), (2, 0)];

/// Returns a Manhattan distance evaluator over [`TSP_POINTS`].
pub fn manhattan_evaluator() -> Rc<NodeEvaluator> {
    Rc::new(|from: NodeIndex, to: NodeIndex| {
        let (x1, y1) = TSP_POINTS[from.0];
        let (x2, y2) = TSP_POINTS[to.0];
        (x1 - x2).abs() + (y1 - y2).abs()
    })
}

/// Creates an environment with a repeatable random source and no logging.
pub fn create_silent_environment() -> Environment {
    Environment::new(Arc::new(DefaultRandom::new_repeatable()), None, Arc::new(|_: &str| {}))
}

/// Creates the single-vehicle Manhattan tour model: five nodes, the depot at
/// node 0 and the path-cheapest-arc first solution strategy.
pub fn create_tsp_model() -> RoutingModel {
    let mut model = RoutingModel::new(5, 1, create_silent_environment());
    model.set_cost(manhattan_evaluator());
    model.set_first_solution_strategy(FirstSolutionStrategy::PathCheapestArc);
    model
}

/// Creates the two-vehicle capacitated model: six nodes sharing the depot at
/// node 0, unit demands and a capacity of three per vehicle.
pub fn create_capacitated_model() -> RoutingModel {
    let mut model = RoutingModel::new(6, 2, create_silent_environment());
    model.set_cost(Rc::new(|_, _| 1));
    model.add_vector_dimension(vec![0, 1, 1, 1, 1, 1], 3, "load");
    model.set_first_solution_strategy(FirstSolutionStrategy::PathCheapestArc);
    model
}

/// Sums the demands served by each route of a solution.
pub fn route_loads(routes: &[Vec<NodeIndex>], demands: &[i64]) -> Vec<i64> {
    routes.iter().map(|route| route.iter().map(|node| demands[node.0]).sum()).collect()
}
