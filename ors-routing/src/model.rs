//! The routing model: compiles a vehicle routing problem onto the CP solver
//! and orchestrates first solution, local search and metaheuristics.

#[cfg(test)]
#[path = "../tests/unit/model_test.rs"]
mod model_test;

use crate::cache::{IndexEvaluator, RoutingCache};
use crate::constraints::{
    ActivityConstraint, CostConstraint, DimensionConstraint, DisjunctionConstraint, PathConstraint,
};
use crate::filters::{DimensionFilter, DimensionFilterData, ObjectiveFilter};
use crate::first_solution::{GlobalCheapestArc, LocalCheapestArc, PathCheapestArc, SegmentEvaluator};
use crate::operators::TspOpt;
use crate::parameters::{FirstSolutionStrategy, RoutingMetaheuristic, RoutingStatus, SearchParameters};
use hashbrown::{HashMap, HashSet};
use ors_cp::search::local::{
    run_local_search, Cross, Delta, Exchange, FullPathLns, LocalSearchFilter, LocalSearchOperator, MakeActive,
    MakeInactive, OrOpt, PathLns, PathState, Relocate, TwoOpt,
};
use ors_cp::search::metaheuristics::{
    GreedyDescent, GuidedLocalSearch, Metaheuristic, SimulatedAnnealing, TabuSearch,
};
use ors_cp::search::{
    find_solution, AssignFirstUnbound, DecisionBuilder, SearchLog, SearchMonitor, SearchOutcome, SolutionLimit,
    TimeLimit,
};
use ors_cp::solver::assignment::Assignment;
use ors_cp::solver::{CpResult, IntVar, Solver};
use ors_cp::utils::{Environment, GenericResult, Quota};
use ors_graph::{MinCostFlow, StarGraph};
use std::rc::Rc;
use std::sync::Arc;

/// A strongly typed node identifier of a routing problem.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIndex(pub usize);

impl std::fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A cost or transit evaluator over problem nodes.
pub type NodeEvaluator = dyn Fn(NodeIndex, NodeIndex) -> i64;

struct DimensionData {
    name: String,
    cumuls: Vec<IntVar>,
    transits: Vec<IntVar>,
    evaluator: Rc<NodeEvaluator>,
    slack_max: i64,
    capacity: i64,
}

struct DisjunctionData {
    indices: Vec<usize>,
    penalty: i64,
    indicator: Option<IntVar>,
}

struct QuotaMonitor {
    quota: Arc<dyn Quota>,
}

impl SearchMonitor for QuotaMonitor {
    fn must_stop(&self) -> bool {
        self.quota.is_reached()
    }
}

/// A vehicle routing model over a constraint solver.
///
/// A model distinguishes problem nodes from variable indices: every node
/// which is not a route start or end owns one "visit slot", and each vehicle
/// contributes one start slot and one end slot. `next` variables live on the
/// non-end slots, `vehicle` and dimension `cumul` variables on all slots.
///
/// A model is open for mutation (dimensions, disjunctions, costs) until
/// [`RoutingModel::close_model`] runs; afterwards only searches and
/// assignment inspection are valid.
pub struct RoutingModel {
    solver: Solver,
    environment: Environment,
    nodes: usize,
    vehicles: usize,
    start_nodes: Vec<NodeIndex>,
    end_nodes: Vec<NodeIndex>,
    size: usize,
    start_end_count: usize,
    index_to_node: Vec<NodeIndex>,
    node_to_index: Vec<i64>,
    start_indices: Vec<usize>,
    end_indices: Vec<usize>,
    nexts: Vec<IntVar>,
    vehicle_vars: Vec<IntVar>,
    actives: Vec<IntVar>,
    cost_var: Option<IntVar>,
    costs: Vec<Option<Rc<NodeEvaluator>>>,
    homogeneous_costs: bool,
    fixed_costs: Vec<i64>,
    cache: Option<Rc<RoutingCache>>,
    dimensions: Vec<DimensionData>,
    dimension_names: HashMap<String, usize>,
    disjunctions: Vec<DisjunctionData>,
    node_to_disjunction: HashMap<usize, usize>,
    all_active: bool,
    parameters: SearchParameters,
    first_solution_evaluator: Option<SegmentEvaluator>,
    monitors: Vec<Box<dyn SearchMonitor>>,
    extra_operators: Vec<Box<dyn LocalSearchOperator>>,
    extra_vars: Vec<IntVar>,
    preassignment: Assignment,
    assignment: Option<Assignment>,
    closed: bool,
    root_failed: bool,
    status: RoutingStatus,
}

impl RoutingModel {
    /// Creates a model with a single depot at node 0: every route starts and
    /// ends there.
    pub fn new(nodes: usize, vehicles: usize, environment: Environment) -> Self {
        Self::new_with_depot(nodes, vehicles, NodeIndex(0), environment)
    }

    /// Creates a model where every route starts and ends at `depot`.
    pub fn new_with_depot(nodes: usize, vehicles: usize, depot: NodeIndex, environment: Environment) -> Self {
        Self::new_with_start_ends(nodes, vehicles, vec![depot; vehicles], vec![depot; vehicles], environment)
    }

    /// Creates a model with per-vehicle start and end nodes, to model
    /// multiple depots.
    pub fn new_with_start_ends(
        nodes: usize,
        vehicles: usize,
        starts: Vec<NodeIndex>,
        ends: Vec<NodeIndex>,
        environment: Environment,
    ) -> Self {
        assert!(nodes > 0 && vehicles > 0, "a model needs nodes and vehicles");
        assert_eq!(starts.len(), vehicles);
        assert_eq!(ends.len(), vehicles);
        assert!(starts.iter().chain(ends.iter()).all(|node| node.0 < nodes), "start/end nodes out of range");
        let mut model = Self {
            solver: Solver::new(),
            environment,
            nodes,
            vehicles,
            start_nodes: starts,
            end_nodes: ends,
            size: 0,
            start_end_count: 0,
            index_to_node: Vec::new(),
            node_to_index: Vec::new(),
            start_indices: Vec::new(),
            end_indices: Vec::new(),
            nexts: Vec::new(),
            vehicle_vars: Vec::new(),
            actives: Vec::new(),
            cost_var: None,
            costs: vec![None; vehicles],
            homogeneous_costs: true,
            fixed_costs: vec![0; vehicles],
            cache: None,
            dimensions: Vec::new(),
            dimension_names: HashMap::new(),
            disjunctions: Vec::new(),
            node_to_disjunction: HashMap::new(),
            all_active: false,
            parameters: SearchParameters::default(),
            first_solution_evaluator: None,
            monitors: Vec::new(),
            extra_operators: Vec::new(),
            extra_vars: Vec::new(),
            preassignment: Assignment::new(),
            assignment: None,
            closed: false,
            root_failed: false,
            status: RoutingStatus::NotSolved,
        };
        model.initialize();
        model
    }

    /// Builds the index layout and the path variables.
    fn initialize(&mut self) {
        let mut is_terminal = vec![false; self.nodes];
        for node in self.start_nodes.iter().chain(self.end_nodes.iter()) {
            is_terminal[node.0] = true;
        }
        self.start_end_count = is_terminal.iter().filter(|&&terminal| terminal).count();
        self.size = self.nodes - self.start_end_count + self.vehicles;
        let total = self.size + self.vehicles;

        self.node_to_index = vec![-1; self.nodes];
        self.index_to_node = vec![NodeIndex(0); total];
        let mut index = 0;
        for node in 0..self.nodes {
            if !is_terminal[node] {
                self.node_to_index[node] = index as i64;
                self.index_to_node[index] = NodeIndex(node);
                index += 1;
            }
        }
        self.start_indices = (0..self.vehicles).map(|vehicle| index + vehicle).collect();
        self.end_indices = (0..self.vehicles).map(|vehicle| self.size + vehicle).collect();
        for vehicle in 0..self.vehicles {
            self.index_to_node[self.start_indices[vehicle]] = self.start_nodes[vehicle];
            self.index_to_node[self.end_indices[vehicle]] = self.end_nodes[vehicle];
        }

        self.nexts = (0..self.size).map(|_| self.solver.new_int_var(0, total as i64 - 1)).collect();
        for index in 0..self.size {
            for &start in &self.start_indices {
                self.solver
                    .remove_value(self.nexts[index], start as i64)
                    .expect("a fresh next domain accepts removals");
            }
        }
        self.vehicle_vars = (0..total).map(|_| self.solver.new_int_var(0, self.vehicles as i64 - 1)).collect();
        self.actives = (0..self.size).map(|_| self.solver.new_int_var(0, 1)).collect();
        for vehicle in 0..self.vehicles {
            let start = self.start_indices[vehicle];
            let end = self.end_indices[vehicle];
            self.solver.set_value(self.vehicle_vars[start], vehicle as i64).expect("start vehicle is free");
            self.solver.set_value(self.vehicle_vars[end], vehicle as i64).expect("end vehicle is free");
            self.solver.set_value(self.actives[start], 1).expect("start slots are always active");
        }
    }

    /// Re-targets all routes to a new single depot. Must be called before
    /// any dimension or disjunction is added.
    pub fn set_depot(&mut self, depot: NodeIndex) {
        assert!(!self.closed, "the model is closed");
        assert!(self.dimensions.is_empty() && self.disjunctions.is_empty(), "set the depot before dimensions");
        assert!(depot.0 < self.nodes);
        self.solver = Solver::new();
        self.start_nodes = vec![depot; self.vehicles];
        self.end_nodes = vec![depot; self.vehicles];
        self.preassignment = Assignment::new();
        self.initialize();
    }

    // ----- Sizes and indices -----

    /// Returns the number of nodes of the problem.
    pub fn nodes(&self) -> usize {
        self.nodes
    }

    /// Returns the number of vehicles.
    pub fn vehicles(&self) -> usize {
        self.vehicles
    }

    /// Returns the number of next variables: one per visit slot plus one per
    /// vehicle start.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Returns the variable index of the start slot of a vehicle.
    pub fn start(&self, vehicle: usize) -> usize {
        self.start_indices[vehicle]
    }

    /// Returns the variable index of the end slot of a vehicle.
    pub fn end(&self, vehicle: usize) -> usize {
        self.end_indices[vehicle]
    }

    /// Returns true when the variable index is the start slot of a route.
    pub fn is_start(&self, index: usize) -> bool {
        self.start_indices.contains(&index)
    }

    /// Returns true when the variable index is the end slot of a route.
    pub fn is_end(&self, index: usize) -> bool {
        index >= self.size
    }

    /// Returns the problem node behind a variable index.
    pub fn index_to_node(&self, index: usize) -> NodeIndex {
        self.index_to_node[index]
    }

    /// Returns the variable index of a node, or None for start/end nodes
    /// whose slots are ambiguous; use [`RoutingModel::start`] and
    /// [`RoutingModel::end`] for those.
    pub fn node_to_index(&self, node: NodeIndex) -> Option<usize> {
        let index = self.node_to_index[node.0];
        (index >= 0).then_some(index as usize)
    }

    // ----- Variables -----

    /// Returns the successor variable of a slot.
    pub fn next_var(&self, index: usize) -> IntVar {
        self.nexts[index]
    }

    /// Returns the vehicle variable of a slot.
    pub fn vehicle_var(&self, index: usize) -> IntVar {
        self.vehicle_vars[index]
    }

    /// Returns the activity variable of a slot.
    pub fn active_var(&self, index: usize) -> IntVar {
        self.actives[index]
    }

    /// Returns the objective variable; only available once the model is
    /// closed.
    pub fn cost_var(&self) -> IntVar {
        self.cost_var.expect("the model must be closed before reading the cost variable")
    }

    /// Returns the cumul variable of a dimension at a slot.
    pub fn cumul_var(&self, index: usize, name: &str) -> Option<IntVar> {
        self.dimension_names.get(name).map(|&dimension| self.dimensions[dimension].cumuls[index])
    }

    /// Returns the transit variable of a dimension at a slot.
    pub fn transit_var(&self, index: usize, name: &str) -> Option<IntVar> {
        self.dimension_names.get(name).map(|&dimension| self.dimensions[dimension].transits[index])
    }

    /// Returns the underlying solver, e.g. to inspect domains.
    pub fn solver(&self) -> &Solver {
        &self.solver
    }

    /// Returns the underlying solver mutably, e.g. to post extra
    /// constraints before the model is closed.
    pub fn solver_mut(&mut self) -> &mut Solver {
        &mut self.solver
    }

    /// Registers an extra variable to be stored in produced assignments.
    pub fn add_to_assignment(&mut self, var: IntVar) {
        self.extra_vars.push(var);
    }

    // ----- Model creation -----

    /// Creates a dimension accumulating `evaluator(i, next(i))` along the
    /// routes: `cumul(next(i)) = cumul(i) + transit(i) + slack(i)` with
    /// `slack` in `[0, slack_max]` and `cumul` in `[0, capacity]`.
    pub fn add_dimension(&mut self, evaluator: Rc<NodeEvaluator>, slack_max: i64, capacity: i64, name: &str) {
        assert!(!self.closed, "the model is closed");
        assert!(slack_max >= 0 && capacity >= 0);
        assert!(!self.dimension_names.contains_key(name), "duplicate dimension {name}");
        let total = self.size + self.vehicles;
        let cumuls = (0..total).map(|_| self.solver.new_int_var(0, capacity)).collect();
        let transits = (0..self.size).map(|_| self.solver.new_int_var(-capacity, capacity)).collect();
        self.dimension_names.insert(name.to_string(), self.dimensions.len());
        self.dimensions.push(DimensionData {
            name: name.to_string(),
            cumuls,
            transits,
            evaluator,
            slack_max,
            capacity,
        });
    }

    /// Creates a dimension whose transit is the same constant after every
    /// slot.
    pub fn add_constant_dimension(&mut self, value: i64, capacity: i64, name: &str) {
        self.add_dimension(Rc::new(move |_, _| value), 0, capacity, name);
    }

    /// Creates a dimension whose transit only depends on the slot left:
    /// `values[i]`.
    pub fn add_vector_dimension(&mut self, values: Vec<i64>, capacity: i64, name: &str) {
        assert_eq!(values.len(), self.nodes);
        self.add_dimension(Rc::new(move |from, _| values[from.0]), 0, capacity, name);
    }

    /// Creates a dimension whose transit is `matrix[i][next(i)]`.
    pub fn add_matrix_dimension(&mut self, matrix: Vec<Vec<i64>>, capacity: i64, name: &str) {
        assert_eq!(matrix.len(), self.nodes);
        self.add_dimension(Rc::new(move |from, to| matrix[from.0][to.0]), 0, capacity, name);
    }

    /// Constrains all nodes to be active, disjunctions included.
    pub fn add_all_active(&mut self) {
        assert!(!self.closed, "the model is closed");
        self.all_active = true;
    }

    /// Adds a disjunction: exactly one of the nodes is visited.
    pub fn add_disjunction(&mut self, nodes: &[NodeIndex]) {
        self.add_disjunction_internal(nodes, -1);
    }

    /// Adds a penalized disjunction: at most one of the nodes is visited and
    /// leaving all of them unvisited costs `penalty`. A single-node
    /// disjunction models an optional node.
    pub fn add_disjunction_with_penalty(&mut self, nodes: &[NodeIndex], penalty: i64) {
        assert!(penalty >= 0, "the penalty must be positive");
        self.add_disjunction_internal(nodes, penalty);
    }

    fn add_disjunction_internal(&mut self, nodes: &[NodeIndex], penalty: i64) {
        assert!(!self.closed, "the model is closed");
        assert!(!nodes.is_empty());
        let indices: Vec<usize> = nodes
            .iter()
            .map(|&node| self.node_to_index(node).expect("start/end nodes cannot be part of a disjunction"))
            .collect();
        for &index in &indices {
            assert!(
                self.node_to_disjunction.insert(index, self.disjunctions.len()).is_none(),
                "a node belongs to at most one disjunction"
            );
        }
        self.disjunctions.push(DisjunctionData { indices, penalty, indicator: None });
    }

    // ----- Costs -----

    /// Sets the cost of route segments: `evaluator(i, next(i))`, whatever
    /// the vehicle.
    pub fn set_cost(&mut self, evaluator: Rc<NodeEvaluator>) {
        assert!(!self.closed, "the model is closed");
        self.costs.iter_mut().for_each(|cost| *cost = Some(evaluator.clone()));
        self.homogeneous_costs = true;
    }

    /// Sets the segment cost of a single vehicle route.
    pub fn set_vehicle_cost(&mut self, vehicle: usize, evaluator: Rc<NodeEvaluator>) {
        assert!(!self.closed, "the model is closed");
        self.costs[vehicle] = Some(evaluator);
        self.homogeneous_costs = false;
    }

    /// Returns true when every vehicle shares the same segment cost.
    pub fn homogeneous_costs(&self) -> bool {
        self.homogeneous_costs
    }

    /// Sets the fixed cost of all vehicle routes, counted when a route
    /// serves at least one node.
    pub fn set_route_fixed_cost(&mut self, cost: i64) {
        self.fixed_costs.iter_mut().for_each(|fixed| *fixed = cost);
    }

    /// Returns the fixed cost of the first vehicle route.
    pub fn get_route_fixed_cost(&self) -> i64 {
        self.fixed_costs[0]
    }

    /// Sets the fixed cost of one vehicle route.
    pub fn set_vehicle_fixed_cost(&mut self, vehicle: usize, cost: i64) {
        self.fixed_costs[vehicle] = cost;
    }

    /// Returns the fixed cost of one vehicle route.
    pub fn get_vehicle_fixed_cost(&self, vehicle: usize) -> i64 {
        self.fixed_costs[vehicle]
    }

    fn index_evaluator(&self, vehicle: usize) -> Rc<IndexEvaluator> {
        let evaluator = self.costs[vehicle].clone();
        let index_to_node = self.index_to_node.clone();
        Rc::new(move |from, to| match &evaluator {
            Some(evaluator) => evaluator(index_to_node[from as usize], index_to_node[to as usize]),
            None => 0,
        })
    }

    /// Returns the cost of the segment from one slot to another for a
    /// vehicle; the last query per source slot is memoized.
    pub fn get_cost(&self, from: usize, to: usize, vehicle: usize) -> i64 {
        match &self.cache {
            Some(cache) => cache.cost(from as i64, to as i64, vehicle as i64),
            None => self.index_evaluator(vehicle)(from as i64, to as i64),
        }
    }

    /// Returns the segment cost assuming all vehicle costs are the same.
    pub fn get_homogeneous_cost(&self, from: usize, to: usize) -> i64 {
        self.get_cost(from, to, 0)
    }

    /// Computes the objective of a full next-variable solution: arc costs
    /// with the vehicles derived from the route structure, fixed costs of
    /// used vehicles and the penalties of fully skipped disjunctions.
    fn evaluate_solution(&self, nexts: &[i64]) -> i64 {
        let mut total: i64 = 0;
        for vehicle in 0..self.vehicles {
            let mut current = self.start_indices[vehicle] as i64;
            if nexts[current as usize] != self.end_indices[vehicle] as i64 {
                total += self.fixed_costs[vehicle];
            }
            while (current as usize) < self.size {
                let next = nexts[current as usize];
                total += self.get_cost(current as usize, next as usize, vehicle);
                current = next;
            }
        }
        for disjunction in &self.disjunctions {
            if disjunction.penalty > 0 && disjunction.indices.iter().all(|&index| nexts[index] == index as i64) {
                total += disjunction.penalty;
            }
        }
        total
    }

    // ----- Model lifecycle -----

    /// Returns true once the model was closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Returns the status of the last search.
    pub fn status(&self) -> RoutingStatus {
        self.status
    }

    /// Closes the model: posts the routing constraint network and the cost
    /// aggregation. No model mutation is allowed afterwards. Called
    /// automatically by the methods producing solutions.
    pub fn close_model(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        let cache =
            Rc::new(RoutingCache::new((0..self.vehicles).map(|vehicle| self.index_evaluator(vehicle)).collect(), self.size));
        self.cache = Some(cache.clone());
        let cost_var = self.solver.new_int_var(0, i64::MAX / 4);
        self.cost_var = Some(cost_var);

        let posted = self.post_constraints(cache, cost_var);
        if posted.is_err() {
            self.root_failed = true;
        }
    }

    fn post_constraints(&mut self, cache: Rc<RoutingCache>, cost_var: IntVar) -> CpResult<()> {
        let path = PathConstraint::new(
            &mut self.solver,
            self.nexts.clone(),
            self.vehicle_vars.clone(),
            self.start_indices.clone(),
        );
        self.solver.add_constraint(Rc::new(path))?;
        let activity = ActivityConstraint::new(self.nexts.clone(), self.actives.clone());
        self.solver.add_constraint(Rc::new(activity))?;

        // Nodes outside of every disjunction must be visited.
        for index in 0..self.size {
            if self.is_start(index) {
                continue;
            }
            if self.all_active || !self.node_to_disjunction.contains_key(&index) {
                self.solver.set_value(self.actives[index], 1)?;
            }
        }
        self.solver.propagate()?;

        let mut penalties = Vec::new();
        for position in 0..self.disjunctions.len() {
            let (indices, penalty) = {
                let disjunction = &self.disjunctions[position];
                (disjunction.indices.clone(), disjunction.penalty)
            };
            let indicator = if penalty < 0 {
                self.solver.new_int_var(0, 0)
            } else {
                self.solver.new_int_var(0, 1)
            };
            self.disjunctions[position].indicator = Some(indicator);
            if penalty > 0 {
                penalties.push((indicator, penalty));
            }
            let actives = indices.iter().map(|&index| self.actives[index]).collect();
            let constraint = DisjunctionConstraint::new(&mut self.solver, actives, indicator);
            self.solver.add_constraint(Rc::new(constraint))?;
        }

        for dimension in &self.dimensions {
            let evaluator = dimension.evaluator.clone();
            let index_to_node = self.index_to_node.clone();
            let index_evaluator: Rc<IndexEvaluator> =
                Rc::new(move |from, to| evaluator(index_to_node[from as usize], index_to_node[to as usize]));
            let constraint = DimensionConstraint::new(
                &mut self.solver,
                self.nexts.clone(),
                dimension.cumuls.clone(),
                dimension.transits.clone(),
                index_evaluator,
                dimension.slack_max,
            );
            self.solver.add_constraint(Rc::new(constraint))?;
        }

        let arc_cost: Rc<dyn Fn(i64, i64, i64) -> i64> = Rc::new(move |from, to, vehicle| cache.cost(from, to, vehicle));
        let cost = CostConstraint::new(
            self.nexts.clone(),
            self.vehicle_vars.clone(),
            cost_var,
            arc_cost,
            self.fixed_costs.clone(),
            self.start_indices.clone(),
            self.end_indices.clone(),
            penalties,
        );
        self.solver.add_constraint(Rc::new(cost))
    }

    // ----- Search configuration -----

    /// Returns the strategy used to build a first solution.
    pub fn first_solution_strategy(&self) -> FirstSolutionStrategy {
        self.parameters.first_solution
    }

    /// Sets the strategy used to build a first solution.
    pub fn set_first_solution_strategy(&mut self, strategy: FirstSolutionStrategy) {
        self.parameters.first_solution = strategy;
    }

    /// Returns the metaheuristic driving the search.
    pub fn metaheuristic(&self) -> RoutingMetaheuristic {
        self.parameters.metaheuristic
    }

    /// Sets the metaheuristic driving the search.
    pub fn set_metaheuristic(&mut self, metaheuristic: RoutingMetaheuristic) {
        self.parameters.metaheuristic = metaheuristic;
    }

    /// Returns the search parameters.
    pub fn search_parameters(&self) -> &SearchParameters {
        &self.parameters
    }

    /// Replaces the search parameters.
    pub fn set_search_parameters(&mut self, parameters: SearchParameters) {
        self.parameters = parameters;
    }

    /// Returns the evaluator of the evaluator strategy, when one was set.
    pub fn first_solution_evaluator(&self) -> Option<SegmentEvaluator> {
        self.first_solution_evaluator.clone()
    }

    /// Sets the evaluator ordering segments under
    /// [`FirstSolutionStrategy::EvaluatorStrategy`].
    pub fn set_first_solution_evaluator(&mut self, evaluator: SegmentEvaluator) {
        self.first_solution_evaluator = Some(evaluator);
    }

    /// Updates the time limit of the upcoming searches, in milliseconds.
    pub fn update_time_limit(&mut self, limit_ms: u64) {
        self.parameters.time_limit_ms = Some(limit_ms);
    }

    /// Updates the time limit of the large neighborhood re-optimizations, in
    /// milliseconds.
    pub fn update_lns_time_limit(&mut self, limit_ms: u64) {
        self.parameters.lns_time_limit_ms = limit_ms;
    }

    /// Adds a local search operator to the set used to improve solutions.
    pub fn add_local_search_operator(&mut self, operator: Box<dyn LocalSearchOperator>) {
        self.extra_operators.push(operator);
    }

    /// Adds a search monitor observing the searches of this model.
    pub fn add_search_monitor(&mut self, monitor: Box<dyn SearchMonitor>) {
        self.monitors.push(monitor);
    }

    // ----- Locks -----

    /// Fixes `next[chain[k]] = chain[k + 1]` for the upcoming searches and
    /// returns the next variable at the (unlocked) end of the chain. The
    /// chain is expressed over variable indices.
    pub fn apply_locks(&mut self, chain: &[usize]) -> IntVar {
        assert!(!chain.is_empty());
        for pair in chain.windows(2) {
            self.preassignment.set_value(self.nexts[pair[0]], pair[1] as i64);
        }
        self.nexts[*chain.last().expect("non-empty chain")]
    }

    /// Fixes one partial route per vehicle for the upcoming searches; the
    /// routes must not contain depots (empty vectors stand for empty
    /// routes). With `close_routes` the routes are closed onto their ends
    /// and every unmentioned node is deactivated. Returns false when the
    /// routes do not form valid chains.
    pub fn apply_locks_to_all_vehicles(&mut self, routes: &[Vec<NodeIndex>], close_routes: bool) -> bool {
        let mut locks = Assignment::new();
        if !self.routes_to_assignment(routes, false, close_routes, &mut locks) {
            return false;
        }
        self.preassignment.copy_from(&locks);
        true
    }

    /// Returns the assignment used to fix variables at the start of every
    /// search, built by the lock methods.
    pub fn pre_assignment(&self) -> &Assignment {
        &self.preassignment
    }

    // ----- Assignment conversions -----

    /// Fills an assignment from per-vehicle routes expressed as node lists
    /// (starts and ends excluded). Deactivated nodes fail the conversion
    /// unless `ignore_inactive_indices` is set. With `close_routes`, routes
    /// are closed onto their end slots and unmentioned nodes are made
    /// inactive. The produced assignment may still violate other model
    /// constraints.
    pub fn routes_to_assignment(
        &self,
        routes: &[Vec<NodeIndex>],
        ignore_inactive_indices: bool,
        close_routes: bool,
        assignment: &mut Assignment,
    ) -> bool {
        if routes.len() != self.vehicles {
            return false;
        }
        let mut mentioned = HashSet::new();
        for (vehicle, route) in routes.iter().enumerate() {
            let mut current = self.start_indices[vehicle];
            for &node in route {
                let Some(index) = self.node_to_index(node) else { return false };
                if mentioned.contains(&index) {
                    return false;
                }
                let active = self.actives[index];
                if self.solver.is_bound(active) && self.solver.value(active) == 0 {
                    if ignore_inactive_indices {
                        continue;
                    }
                    return false;
                }
                mentioned.insert(index);
                assignment.set_value(self.nexts[current], index as i64);
                current = index;
            }
            if close_routes {
                assignment.set_value(self.nexts[current], self.end_indices[vehicle] as i64);
            }
        }
        if close_routes {
            for index in 0..self.size {
                if !self.is_start(index) && !mentioned.contains(&index) {
                    assignment.set_value(self.nexts[index], index as i64);
                }
            }
        }
        true
    }

    /// Converts a solution to per-vehicle routes expressed as node lists,
    /// starts and ends excluded. The assignment must hold a value for every
    /// next variable reached.
    pub fn assignment_to_routes(&self, assignment: &Assignment) -> Vec<Vec<NodeIndex>> {
        (0..self.vehicles)
            .map(|vehicle| {
                let mut route = Vec::new();
                let mut current = self.start_indices[vehicle];
                loop {
                    let Some(next) = assignment.value(self.nexts[current]) else { return route };
                    if next as usize >= self.size || next as usize == current {
                        return route;
                    }
                    route.push(self.index_to_node[next as usize]);
                    current = next as usize;
                }
            })
            .collect()
    }

    /// Restores routes as a solution: the next variables are fixed from the
    /// routes, the remaining variables (dimensions in particular) are
    /// completed by a search. Returns None when the routes are invalid.
    pub fn read_assignment_from_routes(
        &mut self,
        routes: &[Vec<NodeIndex>],
        ignore_inactive_indices: bool,
    ) -> Option<Assignment> {
        self.close_model();
        let mut assignment = Assignment::new();
        if !self.routes_to_assignment(routes, ignore_inactive_indices, true, &mut assignment) {
            return None;
        }
        self.restore_assignment(&assignment)
    }

    /// Restores an assignment as a solution of the model and returns the
    /// completed solution, or None when it violates the constraints.
    pub fn restore_assignment(&mut self, assignment: &Assignment) -> Option<Assignment> {
        self.close_model();
        if self.root_failed {
            return None;
        }
        let depth = self.solver.depth();
        self.solver.push_frame();
        let restored = self.try_restore(assignment);
        let solution = restored.ok().map(|_| self.capture_assignment());
        self.solver.backtrack_to(depth);
        solution
    }

    fn try_restore(&mut self, assignment: &Assignment) -> CpResult<()> {
        for (var, min, max) in assignment.sorted_entries() {
            self.solver.set_range(var, min, max)?;
        }
        self.solver.propagate()?;
        if self.nexts.iter().any(|&var| !self.solver.is_bound(var)) {
            let mut builder = AssignFirstUnbound::new(self.nexts.clone());
            if find_solution(&mut self.solver, &mut builder, &[]) != SearchOutcome::Solution {
                return Err(ors_cp::solver::Failure);
            }
        }
        Ok(())
    }

    /// Captures every model variable into an assignment; the solver must be
    /// at a solution state.
    fn capture_assignment(&self) -> Assignment {
        let mut assignment = Assignment::new();
        for &var in self
            .nexts
            .iter()
            .chain(self.vehicle_vars.iter())
            .chain(self.actives.iter())
            .chain(self.extra_vars.iter())
        {
            assignment.store_var(&self.solver, var);
        }
        for dimension in &self.dimensions {
            for &var in dimension.cumuls.iter().chain(dimension.transits.iter()) {
                assignment.store_var(&self.solver, var);
            }
        }
        if let Some(cost_var) = self.cost_var {
            assignment.store_var(&self.solver, cost_var);
            if self.solver.is_bound(cost_var) {
                assignment.set_objective(self.solver.value(cost_var));
            }
        }
        assignment
    }

    /// Returns a compacted version of an assignment where the non-empty
    /// routes belong to the lowest vehicle identifiers. Only valid in
    /// homogeneous cost mode; may return None even when a compaction would
    /// be logically possible.
    pub fn compact_assignment(&mut self, assignment: &Assignment) -> Option<Assignment> {
        if !self.homogeneous_costs {
            return None;
        }
        let mut routes = self.assignment_to_routes(assignment);
        for unused in 0..self.vehicles {
            if !routes[unused].is_empty() {
                continue;
            }
            let donor = (unused + 1..self.vehicles).rev().find(|&donor| {
                !routes[donor].is_empty()
                    && self.start_nodes[donor] == self.start_nodes[unused]
                    && self.end_nodes[donor] == self.end_nodes[unused]
            });
            if let Some(donor) = donor {
                routes.swap(unused, donor);
            }
        }
        self.read_assignment_from_routes(&routes, false)
    }

    /// Returns the value of the next variable of a slot in an assignment.
    pub fn next(&self, assignment: &Assignment, index: usize) -> Option<usize> {
        assignment.value(self.nexts[index]).map(|value| value as usize)
    }

    /// Returns true when the route of the vehicle serves at least one node
    /// in the assignment.
    pub fn is_vehicle_used(&self, assignment: &Assignment, vehicle: usize) -> bool {
        self.next(assignment, self.start_indices[vehicle])
            .map(|next| next != self.end_indices[vehicle])
            .unwrap_or(false)
    }

    /// Writes the best solution of the last search to a file. Fails when no
    /// solution is available.
    pub fn write_assignment<P: AsRef<std::path::Path>>(&self, path: P) -> GenericResult<()> {
        match &self.assignment {
            Some(assignment) => assignment.save(path),
            None => Err("no solution to write".into()),
        }
    }

    /// Reads an assignment from a file and restores it as the current
    /// solution. Fails when the file lists unknown variables or bounds
    /// incompatible with the current domains.
    pub fn read_assignment<P: AsRef<std::path::Path>>(&mut self, path: P) -> GenericResult<Assignment> {
        self.close_model();
        let loaded = Assignment::load(path)?;
        for (var, min, max) in loaded.sorted_entries() {
            if var.index() >= self.solver.num_vars() {
                return Err(format!("unknown variable {}", var.index()).into());
            }
            if max < self.solver.min(var) || min > self.solver.max(var) {
                return Err(format!("variable {} is incompatible with its domain", var.index()).into());
            }
        }
        let solution = self.restore_assignment(&loaded).ok_or_else(|| {
            ors_cp::utils::GenericError::from("the assignment is not a solution of the model".to_string())
        })?;
        self.assignment = Some(solution.clone());
        Ok(solution)
    }

    // ----- Lower bound -----

    /// Computes a lower bound to the routing problem by solving a linear
    /// assignment relaxation with a min-cost flow: every slot must pick a
    /// distinct successor. Models with disjunctions or heterogeneous costs
    /// are not supported: the method returns 0 for them.
    pub fn compute_lower_bound(&mut self) -> i64 {
        self.close_model();
        if !self.homogeneous_costs || !self.disjunctions.is_empty() || self.root_failed {
            return 0;
        }
        let total = self.size + self.vehicles;
        let right_of = {
            let mut right_of = vec![-1i64; total];
            let mut count = 0;
            for index in 0..total {
                if !self.is_start(index) {
                    right_of[index] = count;
                    count += 1;
                }
            }
            right_of
        };
        let right_count = total - self.vehicles;
        debug_assert_eq!(right_count, self.size);

        let mut graph = StarGraph::with_capacities(2 + self.size + right_count, 4 * self.size);
        graph.add_nodes(2 + self.size + right_count);
        let source = 0;
        let sink = 1 + self.size + right_count;
        let mut arc_costs = Vec::new();
        for index in 0..self.size {
            let left = 1 + index;
            arc_costs.push((graph.add_arc(source, left), 0));
            for value in self.solver.domain_values(self.nexts[index]) {
                if value == index as i64 {
                    continue;
                }
                let right = 1 + self.size + right_of[value as usize] as usize;
                arc_costs.push((graph.add_arc(left, right), self.get_homogeneous_cost(index, value as usize)));
            }
        }
        for index in 0..total {
            if right_of[index] >= 0 {
                arc_costs.push((graph.add_arc(1 + self.size + right_of[index] as usize, sink), 0));
            }
        }

        let mut flow = MinCostFlow::new(&graph);
        for &(arc, cost) in &arc_costs {
            flow.set_arc_capacity(arc, 1);
            flow.set_arc_unit_cost(arc, cost);
        }
        flow.set_node_supply(source, self.size as i64);
        flow.set_node_supply(sink, -(self.size as i64));
        if flow.solve() {
            flow.get_optimal_cost()
        } else {
            0
        }
    }

    // ----- Search -----

    /// Solves the model, optionally warm-started from a hint, and returns
    /// the best solution found, or None when the search failed.
    pub fn solve(&mut self, hint: Option<&Assignment>) -> Option<Assignment> {
        self.close_model();
        self.status = RoutingStatus::NotSolved;
        if self.root_failed {
            self.status = RoutingStatus::Fail;
            return None;
        }
        let parameters = self.parameters.clone();
        if parameters.metaheuristic != RoutingMetaheuristic::GreedyDescent
            && parameters.time_limit_ms.is_none()
            && parameters.solution_limit.is_none()
        {
            (self.environment.logger)("a metaheuristic without a time or solution limit relies on its internal round cap");
        }

        // Monitors: the registered ones plus the limits of this search.
        let mut monitors = std::mem::take(&mut self.monitors);
        let user_monitors = monitors.len();
        monitors.push(Box::new(SearchLog::new(self.environment.logger.clone())));
        if let Some(limit_ms) = parameters.time_limit_ms {
            monitors.push(Box::new(TimeLimit::new(limit_ms)));
        }
        if let Some(limit) = parameters.solution_limit {
            monitors.push(Box::new(SolutionLimit::new(limit)));
        }
        if let Some(quota) = self.environment.quota.clone() {
            monitors.push(Box::new(QuotaMonitor { quota }));
        }
        monitors.iter_mut().for_each(|monitor| monitor.enter_search());

        let base_depth = self.solver.depth();
        let outcome = self.run_search(hint, &parameters, &mut monitors);

        monitors.iter_mut().for_each(|monitor| monitor.exit_search());
        monitors.truncate(user_monitors);
        self.monitors = monitors;
        self.solver.backtrack_to(base_depth);

        match outcome {
            Some((assignment, status)) => {
                self.status = status;
                self.assignment = Some(assignment.clone());
                Some(assignment)
            }
            None => {
                if self.status == RoutingStatus::NotSolved {
                    self.status = RoutingStatus::Fail;
                }
                None
            }
        }
    }

    fn run_search(
        &mut self,
        hint: Option<&Assignment>,
        parameters: &SearchParameters,
        monitors: &mut Vec<Box<dyn SearchMonitor>>,
    ) -> Option<(Assignment, RoutingStatus)> {
        let cache = self.cache.clone().expect("the model is closed");
        let cost_var = self.cost_var.expect("the model is closed");
        let first_solution_cost: SegmentEvaluator = {
            let cache = cache.clone();
            Rc::new(move |from, to| cache.cost(from, to, 0))
        };

        // Locks and hint apply below a dedicated frame kept for the whole
        // search.
        let locks_depth = self.solver.depth() + 1;
        self.solver.push_frame();
        let applied = self.apply_assignments(hint);
        if applied.is_err() {
            self.status = RoutingStatus::Fail;
            return None;
        }

        let first = self.build_first_solution(parameters, first_solution_cost.clone(), monitors, locks_depth);
        let (first_nexts, first_cost) = match first {
            Ok(solution) => solution,
            Err(status) => {
                self.status = status;
                return None;
            }
        };
        monitors.iter_mut().for_each(|monitor| monitor.at_solution(first_cost));

        let mut path_state = PathState::new(self.size, self.start_indices.clone(), self.end_indices.clone());
        path_state.set_solution(&first_nexts);

        let mut operators = self.build_operators(parameters, first_solution_cost.clone());
        let builtin_operators = operators.len();
        operators.append(&mut self.extra_operators);
        let mut filters = self.build_filters(parameters);
        let mut metaheuristic = self.build_metaheuristic(parameters);

        let nexts = self.nexts.clone();
        let starts = self.start_indices.clone();
        let lns_time_limit = parameters.lns_time_limit_ms;
        let solver = &mut self.solver;
        let mut commit = |state: &PathState, delta: &Delta| {
            commit_delta(solver, &nexts, cost_var, &starts, first_solution_cost.clone(), lns_time_limit, state, delta)
        };
        let outcome = run_local_search(
            &mut path_state,
            first_cost,
            &mut operators,
            &mut filters,
            metaheuristic.as_mut(),
            monitors,
            &mut commit,
        );

        self.extra_operators = operators.split_off(builtin_operators);

        // Re-commit the best solution to rebuild its full variable state.
        let depth = self.solver.depth();
        self.solver.push_frame();
        let mut restored = Assignment::new();
        for (index, &value) in outcome.nexts.iter().enumerate() {
            restored.set_value(self.nexts[index], value);
        }
        let captured = self.try_restore(&restored).ok().map(|_| self.capture_assignment());
        self.solver.backtrack_to(depth);

        let status = if outcome.aborted { RoutingStatus::FailTimeout } else { RoutingStatus::Success };
        captured.map(|assignment| (assignment, status))
    }

    fn apply_assignments(&mut self, hint: Option<&Assignment>) -> CpResult<()> {
        let mut combined = self.preassignment.clone();
        if let Some(hint) = hint {
            combined.copy_from(hint);
        }
        for (var, min, max) in combined.sorted_entries() {
            self.solver.set_range(var, min, max)?;
        }
        self.solver.propagate()
    }

    fn build_first_solution(
        &mut self,
        parameters: &SearchParameters,
        cost: SegmentEvaluator,
        monitors: &[Box<dyn SearchMonitor>],
        locks_depth: usize,
    ) -> Result<(Vec<i64>, i64), RoutingStatus> {
        let mut builder: Box<dyn DecisionBuilder> = match parameters.first_solution {
            FirstSolutionStrategy::Default => Box::new(AssignFirstUnbound::new(self.nexts.clone())),
            FirstSolutionStrategy::GlobalCheapestArc => {
                Box::new(GlobalCheapestArc::new(self.nexts.clone(), self.start_indices.clone(), cost))
            }
            FirstSolutionStrategy::LocalCheapestArc => {
                Box::new(LocalCheapestArc::new(self.nexts.clone(), self.start_indices.clone(), cost))
            }
            FirstSolutionStrategy::PathCheapestArc => {
                Box::new(PathCheapestArc::new(self.nexts.clone(), self.start_indices.clone(), cost))
            }
            FirstSolutionStrategy::EvaluatorStrategy => {
                let evaluator = self.first_solution_evaluator.clone().unwrap_or(cost);
                Box::new(PathCheapestArc::new(self.nexts.clone(), self.start_indices.clone(), evaluator))
            }
        };
        match find_solution(&mut self.solver, builder.as_mut(), monitors) {
            SearchOutcome::Solution => {
                let nexts: Vec<i64> = self.nexts.iter().map(|&var| self.solver.value(var)).collect();
                debug_assert!(self.solver.is_bound(self.cost_var.expect("closed model")));
                let cost = self.solver.value(self.cost_var.expect("closed model"));
                debug_assert_eq!(cost, self.evaluate_solution(&nexts));
                // Keep the locks frame only.
                self.solver.backtrack_to(locks_depth);
                Ok((nexts, cost))
            }
            SearchOutcome::Exhausted => Err(RoutingStatus::Fail),
            SearchOutcome::Aborted => Err(RoutingStatus::FailTimeout),
        }
    }

    fn build_operators(
        &self,
        parameters: &SearchParameters,
        cost: SegmentEvaluator,
    ) -> Vec<Box<dyn LocalSearchOperator>> {
        let mut operators: Vec<Box<dyn LocalSearchOperator>> = vec![
            Box::new(TwoOpt::default()),
            Box::new(OrOpt::default()),
            Box::new(Relocate::default()),
            Box::new(Exchange::default()),
        ];
        if self.vehicles > 1 {
            operators.push(Box::new(Cross::default()));
        }
        if !self.disjunctions.is_empty() {
            operators.push(Box::new(MakeActive::default()));
            operators.push(Box::new(MakeInactive::default()));
        }
        if !parameters.no_tsp {
            operators.push(Box::new(TspOpt::new(cost.clone(), parameters.tsp_opt_size)));
        }
        if !parameters.no_lns {
            operators.push(Box::new(PathLns::new(self.environment.random.clone(), 4)));
            operators.push(Box::new(FullPathLns::default()));
        }
        operators
    }

    fn build_filters(&self, parameters: &SearchParameters) -> Vec<Box<dyn LocalSearchFilter>> {
        let mut filters: Vec<Box<dyn LocalSearchFilter>> = Vec::new();
        if !self.dimensions.is_empty() {
            let data = self
                .dimensions
                .iter()
                .map(|dimension| {
                    let evaluator = dimension.evaluator.clone();
                    let index_to_node = self.index_to_node.clone();
                    DimensionFilterData {
                        evaluator: Rc::new(move |from, to| {
                            evaluator(index_to_node[from as usize], index_to_node[to as usize])
                        }),
                        capacity: dimension.capacity,
                    }
                })
                .collect();
            filters.push(Box::new(DimensionFilter::new(data)));
        }
        if parameters.metaheuristic == RoutingMetaheuristic::GreedyDescent {
            let model_costs = self.objective_closure();
            filters.push(Box::new(ObjectiveFilter::new(model_costs)));
        }
        filters
    }

    fn objective_closure(&self) -> Rc<dyn Fn(&[i64]) -> i64> {
        let cache = self.cache.clone().expect("the model is closed");
        let starts = self.start_indices.clone();
        let ends = self.end_indices.clone();
        let fixed_costs = self.fixed_costs.clone();
        let size = self.size;
        let disjunctions: Vec<(Vec<usize>, i64)> = self
            .disjunctions
            .iter()
            .filter(|disjunction| disjunction.penalty > 0)
            .map(|disjunction| (disjunction.indices.clone(), disjunction.penalty))
            .collect();
        Rc::new(move |nexts| {
            let mut total: i64 = 0;
            for vehicle in 0..starts.len() {
                let mut current = starts[vehicle] as i64;
                if nexts[current as usize] != ends[vehicle] as i64 {
                    total += fixed_costs[vehicle];
                }
                let mut steps = 0;
                while (current as usize) < size {
                    let next = nexts[current as usize];
                    total += cache.cost(current, next, vehicle as i64);
                    current = next;
                    steps += 1;
                    if steps > size {
                        // A cyclic candidate; price it out, the solver would
                        // reject it anyway.
                        return i64::MAX / 2;
                    }
                }
            }
            for (indices, penalty) in &disjunctions {
                if indices.iter().all(|&index| nexts[index] == index as i64) {
                    total += penalty;
                }
            }
            total
        })
    }

    fn build_metaheuristic(&self, parameters: &SearchParameters) -> Box<dyn Metaheuristic> {
        match parameters.metaheuristic {
            RoutingMetaheuristic::GreedyDescent => Box::new(GreedyDescent::default()),
            RoutingMetaheuristic::GuidedLocalSearch => {
                let cache = self.cache.clone().expect("the model is closed");
                let arc_cost: Rc<dyn Fn(usize, i64) -> i64> =
                    Rc::new(move |from, to| cache.cost(from as i64, to, 0));
                Box::new(GuidedLocalSearch::new(arc_cost, 30))
            }
            RoutingMetaheuristic::SimulatedAnnealing => {
                Box::new(SimulatedAnnealing::new(self.environment.random.clone(), 100., 0.9))
            }
            RoutingMetaheuristic::TabuSearch => Box::new(TabuSearch::new(10, 30)),
        }
    }
}

/// Validates a delta on the solver: fixes the changed next variables,
/// propagates, re-optimizes the released fragment under the LNS time limit
/// and reads the completed solution back.
#[allow(clippy::too_many_arguments)]
fn commit_delta(
    solver: &mut Solver,
    nexts: &[IntVar],
    cost_var: IntVar,
    starts: &[usize],
    completion_cost: SegmentEvaluator,
    lns_time_limit_ms: u64,
    state: &PathState,
    delta: &Delta,
) -> Option<(Vec<i64>, i64)> {
    let depth = solver.depth();
    solver.push_frame();
    let released: HashSet<usize> = delta.released.iter().copied().collect();
    let candidate = state.apply(delta);
    let mut feasible = (|| -> CpResult<()> {
        for (index, &var) in nexts.iter().enumerate() {
            if !released.contains(&index) {
                solver.set_value(var, candidate[index])?;
            }
        }
        solver.propagate()
    })()
    .is_ok();
    if feasible && !released.is_empty() {
        let mut builder = PathCheapestArc::new(nexts.to_vec(), starts.to_vec(), completion_cost);
        let monitors: Vec<Box<dyn SearchMonitor>> = vec![Box::new(TimeLimit::new(lns_time_limit_ms))];
        feasible = find_solution(solver, &mut builder, &monitors) == SearchOutcome::Solution;
    }
    let result = if feasible {
        debug_assert!(solver.is_bound(cost_var));
        let values = nexts.iter().map(|&var| solver.value(var)).collect();
        Some((values, solver.value(cost_var)))
    } else {
        None
    };
    solver.backtrack_to(depth);
    result
}
