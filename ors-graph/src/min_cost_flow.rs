//! A cost-scaling push-relabel minimum cost flow algorithm.
//!
//! The implementation follows the successive-approximation scheme of Goldberg
//! and Tarjan: it works on pseudo-flows (per-node excesses and deficits are
//! allowed during the computation) and refines an epsilon-optimal pseudo-flow
//! until epsilon is small enough to certify optimality. With integer costs
//! multiplied by `num_nodes + 1`, an epsilon-optimal flow with `epsilon == 1`
//! is exact.
//!
//! The algorithm alone cannot detect infeasible inputs and may loop on them,
//! which is why a max-flow based feasibility check runs first by default (see
//! [`FlowOptions::check_feasibility`]).

#[cfg(test)]
#[path = "../tests/unit/min_cost_flow_test.rs"]
mod min_cost_flow_test;

use crate::graph::{ArcIndex, CostValue, FlowQuantity, NodeIndex, SignedArcVec, StarGraph};
use crate::max_flow::MaxFlow;

/// Specifies the outcome of the last [`MinCostFlow::solve`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MinCostFlowStatus {
    /// The problem was not solved yet, or the input changed since the last run.
    NotSolved,
    /// A minimum cost flow shipping all supplies was found.
    Optimal,
    /// A flow was found for truncated supplies (after [`MinCostFlow::make_feasible`]).
    Feasible,
    /// The network cannot carry all the supplies to the demands.
    Infeasible,
    /// The sum of supplies and demands is not zero.
    Unbalanced,
    /// The solution found violates the optimality post-conditions.
    BadResult,
    /// Scaling the costs by `num_nodes + 1` would overflow 64-bit integers.
    BadCostRange,
}

/// Specifies tunable parameters of the engine.
#[derive(Clone, Copy, Debug)]
pub struct FlowOptions {
    /// Runs the max-flow feasibility check before solving. Disabling it
    /// removes one max-flow computation but the solver may then loop forever
    /// on infeasible inputs.
    pub check_feasibility: bool,
    /// The factor by which epsilon is divided at each refine phase.
    pub alpha: i64,
}

impl Default for FlowOptions {
    fn default() -> Self {
        Self { check_feasibility: true, alpha: 5 }
    }
}

/// Specifies the result of a feasibility check.
#[derive(Clone, Debug, Default)]
pub struct FeasibilityCheck {
    /// True when the network can absorb all supplies and demands.
    pub feasible: bool,
    /// Nodes whose supply cannot be fully shipped.
    pub infeasible_supply_nodes: Vec<NodeIndex>,
    /// Nodes whose demand cannot be fully served.
    pub infeasible_demand_nodes: Vec<NodeIndex>,
}

/// A minimum cost flow engine over a [`StarGraph`].
pub struct MinCostFlow<'a> {
    graph: &'a StarGraph,
    node_excess: Vec<FlowQuantity>,
    node_potential: Vec<CostValue>,
    residual_arc_capacity: SignedArcVec<FlowQuantity>,
    first_admissible_arc: Vec<usize>,
    active_nodes: Vec<NodeIndex>,
    epsilon: CostValue,
    cost_scaling_factor: CostValue,
    scaled_arc_unit_cost: SignedArcVec<CostValue>,
    total_flow_cost: CostValue,
    status: MinCostFlowStatus,
    initial_node_excess: Vec<FlowQuantity>,
    feasible_node_excess: Vec<FlowQuantity>,
    feasibility_checked: bool,
    options: FlowOptions,
}

impl<'a> MinCostFlow<'a> {
    /// Creates an engine for the given graph with default options.
    pub fn new(graph: &'a StarGraph) -> Self {
        Self::with_options(graph, FlowOptions::default())
    }

    /// Creates an engine for the given graph with the given options.
    pub fn with_options(graph: &'a StarGraph, options: FlowOptions) -> Self {
        assert!(options.alpha >= 2, "epsilon divisor must be at least 2");
        let num_nodes = graph.num_nodes();
        Self {
            graph,
            node_excess: vec![0; num_nodes],
            node_potential: vec![0; num_nodes],
            residual_arc_capacity: SignedArcVec::new(graph.num_arcs(), 0),
            first_admissible_arc: vec![0; num_nodes],
            active_nodes: Vec::new(),
            epsilon: 0,
            cost_scaling_factor: 1,
            scaled_arc_unit_cost: SignedArcVec::new(graph.num_arcs(), 0),
            total_flow_cost: 0,
            status: MinCostFlowStatus::NotSolved,
            initial_node_excess: vec![0; num_nodes],
            feasible_node_excess: vec![0; num_nodes],
            feasibility_checked: false,
            options,
        }
    }

    /// Returns the graph the engine works on.
    pub fn graph(&self) -> &StarGraph {
        self.graph
    }

    /// Returns the status of the last solve.
    pub fn status(&self) -> MinCostFlowStatus {
        self.status
    }

    /// Sets the supply of a node; a demand is a negative supply.
    pub fn set_node_supply(&mut self, node: NodeIndex, supply: FlowQuantity) {
        debug_assert!(self.graph.is_node_valid(node));
        self.node_excess[node] = supply;
        self.initial_node_excess[node] = supply;
        self.status = MinCostFlowStatus::NotSolved;
        self.feasibility_checked = false;
    }

    /// Sets the unit cost of a direct arc; the opposite arc gets the negated
    /// cost to keep the antisymmetry invariant.
    pub fn set_arc_unit_cost(&mut self, arc: ArcIndex, unit_cost: CostValue) {
        debug_assert!(self.graph.is_direct(arc));
        self.scaled_arc_unit_cost.set(arc, unit_cost);
        self.scaled_arc_unit_cost.set(self.graph.opposite(arc), -unit_cost);
        self.status = MinCostFlowStatus::NotSolved;
        self.feasibility_checked = false;
    }

    /// Sets the capacity of a direct arc. Lowering the capacity below the
    /// current flow pushes the overflow back as excesses on the endpoints.
    pub fn set_arc_capacity(&mut self, arc: ArcIndex, new_capacity: FlowQuantity) {
        debug_assert!(self.graph.is_direct(arc));
        debug_assert!(new_capacity >= 0);
        let opposite = self.graph.opposite(arc);
        let flow = self.residual_arc_capacity.get(opposite);
        if new_capacity >= flow {
            self.residual_arc_capacity.set(arc, new_capacity - flow);
        } else {
            let overflow = flow - new_capacity;
            self.residual_arc_capacity.set(arc, 0);
            self.residual_arc_capacity.set(opposite, new_capacity);
            self.node_excess[self.graph.tail(arc)] += overflow;
            self.node_excess[self.graph.head(arc)] -= overflow;
        }
        self.status = MinCostFlowStatus::NotSolved;
        self.feasibility_checked = false;
    }

    /// Presets the flow on a direct arc; the flow must not exceed the
    /// capacity of the arc.
    pub fn set_arc_flow(&mut self, arc: ArcIndex, new_flow: FlowQuantity) {
        debug_assert!(self.graph.is_direct(arc));
        let capacity = self.capacity(arc);
        debug_assert!((0..=capacity).contains(&new_flow));
        self.residual_arc_capacity.set(self.graph.opposite(arc), new_flow);
        self.residual_arc_capacity.set(arc, capacity - new_flow);
        self.status = MinCostFlowStatus::NotSolved;
        self.feasibility_checked = false;
    }

    /// Returns the flow on an arc, derived from the residual capacities: the
    /// flow on a direct arc is the residual capacity of its opposite, the flow
    /// on an opposite arc is the negation of its residual capacity.
    pub fn flow(&self, arc: ArcIndex) -> FlowQuantity {
        debug_assert!(self.graph.is_arc_valid(arc));
        if self.graph.is_direct(arc) {
            self.residual_arc_capacity.get(self.graph.opposite(arc))
        } else {
            -self.residual_arc_capacity.get(arc)
        }
    }

    /// Returns the capacity of an arc: residual plus flow for a direct arc,
    /// zero by definition for an opposite arc.
    pub fn capacity(&self, arc: ArcIndex) -> FlowQuantity {
        debug_assert!(self.graph.is_arc_valid(arc));
        if self.graph.is_direct(arc) {
            self.residual_arc_capacity.get(arc) + self.residual_arc_capacity.get(self.graph.opposite(arc))
        } else {
            0
        }
    }

    /// Returns the unit cost of an arc. Only valid outside of a solve, while
    /// costs are unscaled.
    pub fn cost(&self, arc: ArcIndex) -> CostValue {
        debug_assert!(self.graph.is_arc_valid(arc));
        debug_assert_eq!(self.cost_scaling_factor, 1);
        self.scaled_arc_unit_cost.get(arc)
    }

    /// Returns the current excess of a node.
    pub fn supply(&self, node: NodeIndex) -> FlowQuantity {
        debug_assert!(self.graph.is_node_valid(node));
        self.node_excess[node]
    }

    /// Returns the supply of a node as given by the caller.
    pub fn initial_supply(&self, node: NodeIndex) -> FlowQuantity {
        debug_assert!(self.graph.is_node_valid(node));
        self.initial_node_excess[node]
    }

    /// Returns the largest supply (or demand, in absolute value) the network
    /// can absorb at a node, as certified by the last feasibility check.
    pub fn feasible_supply(&self, node: NodeIndex) -> FlowQuantity {
        debug_assert!(self.graph.is_node_valid(node));
        self.feasible_node_excess[node]
    }

    /// Returns the cost of the flow found by the last successful solve.
    pub fn get_optimal_cost(&self) -> CostValue {
        self.total_flow_cost
    }

    /// Checks whether all supplies and demands can be matched without
    /// exceeding the bottlenecks of the network, by solving a max flow from a
    /// virtual source (feeding the supply nodes) to a virtual sink (drained by
    /// the demand nodes). Stores the feasible per-node excesses for
    /// [`MinCostFlow::make_feasible`].
    pub fn check_feasibility(&mut self) -> FeasibilityCheck {
        let num_nodes = self.graph.num_nodes();
        let mut auxiliary = StarGraph::with_capacities(num_nodes + 2, self.graph.num_arcs() + num_nodes);
        auxiliary.add_nodes(num_nodes + 2);
        let source = num_nodes;
        let sink = num_nodes + 1;

        // Direct arcs are copied first so they keep their identifiers.
        let mut capacities = Vec::with_capacity(self.graph.num_arcs());
        for arc in 1..=self.graph.num_arcs() as ArcIndex {
            auxiliary.add_arc(self.graph.tail(arc), self.graph.head(arc));
            capacities.push(self.capacity(arc));
        }
        let mut supply_arcs = Vec::new();
        let mut demand_arcs = Vec::new();
        let mut total_supply = 0;
        for node in 0..num_nodes {
            let supply = self.initial_node_excess[node];
            if supply > 0 {
                supply_arcs.push((node, auxiliary.add_arc(source, node), supply));
                total_supply += supply;
            } else if supply < 0 {
                demand_arcs.push((node, auxiliary.add_arc(node, sink), -supply));
            }
        }

        let mut max_flow = MaxFlow::new(&auxiliary);
        for (arc, capacity) in capacities.iter().enumerate() {
            max_flow.set_arc_capacity(arc as ArcIndex + 1, *capacity);
        }
        for &(_, arc, capacity) in supply_arcs.iter().chain(demand_arcs.iter()) {
            max_flow.set_arc_capacity(arc, capacity);
        }
        max_flow.solve(source, sink);

        let mut check = FeasibilityCheck { feasible: max_flow.get_optimal_flow() == total_supply, ..Default::default() };
        self.feasible_node_excess.iter_mut().for_each(|excess| *excess = 0);
        for &(node, arc, capacity) in &supply_arcs {
            self.feasible_node_excess[node] = max_flow.flow(arc);
            if max_flow.flow(arc) < capacity {
                check.infeasible_supply_nodes.push(node);
            }
        }
        for &(node, arc, capacity) in &demand_arcs {
            self.feasible_node_excess[node] = -max_flow.flow(arc);
            if max_flow.flow(arc) < capacity {
                check.infeasible_demand_nodes.push(node);
            }
        }
        self.feasibility_checked = true;
        check
    }

    /// Truncates supplies and demands to the levels certified by the last
    /// feasibility check. Returns false if [`MinCostFlow::check_feasibility`]
    /// was not called since the input last changed.
    pub fn make_feasible(&mut self) -> bool {
        if !self.feasibility_checked {
            return false;
        }
        for node in 0..self.graph.num_nodes() {
            let feasible = self.feasible_node_excess[node];
            self.node_excess[node] = feasible;
            self.initial_node_excess[node] = feasible;
        }
        self.status = MinCostFlowStatus::NotSolved;
        true
    }

    /// Computes a flow of minimum cost shipping every supply to the demands.
    /// Returns true on success; on failure the status tells the failure kind
    /// and the engine stays usable after the input is corrected.
    pub fn solve(&mut self) -> bool {
        if self.node_excess.iter().sum::<FlowQuantity>() != 0 {
            self.status = MinCostFlowStatus::Unbalanced;
            return false;
        }
        if self.options.check_feasibility && !self.check_feasibility().feasible {
            self.status = MinCostFlowStatus::Infeasible;
            return false;
        }
        if !self.scale_costs() {
            self.status = MinCostFlowStatus::BadCostRange;
            return false;
        }
        self.node_potential.iter_mut().for_each(|potential| *potential = 0);
        let solved = self.optimize() && self.check_result();
        self.unscale_costs();
        if !solved {
            self.status = MinCostFlowStatus::BadResult;
            return false;
        }
        self.total_flow_cost =
            (1..=self.graph.num_arcs() as ArcIndex).map(|arc| self.flow(arc) * self.cost(arc)).sum();
        self.status = MinCostFlowStatus::Optimal;
        true
    }

    /// Multiplies the costs by `num_nodes + 1` and initializes epsilon to the
    /// largest scaled cost magnitude. Returns false when scaling would
    /// overflow the 64-bit range.
    fn scale_costs(&mut self) -> bool {
        self.cost_scaling_factor = self.graph.num_nodes() as CostValue + 1;
        let mut max_scaled_cost = 0;
        for arc in 1..=self.graph.num_arcs() as ArcIndex {
            let unit_cost = self.scaled_arc_unit_cost.get(arc);
            let scaled = match unit_cost.checked_mul(self.cost_scaling_factor) {
                Some(scaled) => scaled,
                None => {
                    self.cost_scaling_factor = 1;
                    return false;
                }
            };
            self.scaled_arc_unit_cost.set(arc, scaled);
            self.scaled_arc_unit_cost.set(-arc, -scaled);
            max_scaled_cost = max_scaled_cost.max(scaled.abs());
        }
        self.epsilon = max_scaled_cost.max(1);
        true
    }

    fn unscale_costs(&mut self) {
        for arc in 1..=self.graph.num_arcs() as ArcIndex {
            let scaled = self.scaled_arc_unit_cost.get(arc) / self.cost_scaling_factor;
            self.scaled_arc_unit_cost.set(arc, scaled);
            self.scaled_arc_unit_cost.set(-arc, -scaled);
        }
        self.cost_scaling_factor = 1;
    }

    /// Runs refine phases with epsilon divided by alpha each round, until a
    /// phase has run with `epsilon == 1`.
    fn optimize(&mut self) -> bool {
        loop {
            self.epsilon = (self.epsilon / self.options.alpha).max(1);
            if !self.refine() {
                return false;
            }
            if self.epsilon == 1 {
                return true;
            }
        }
    }

    /// Performs one epsilon-optimization step: saturates every admissible arc
    /// and discharges active nodes until none is left.
    fn refine(&mut self) -> bool {
        self.first_admissible_arc.iter_mut().for_each(|cursor| *cursor = 0);
        self.saturate_admissible_arcs();
        self.active_nodes.clear();
        for node in 0..self.graph.num_nodes() {
            if self.node_excess[node] > 0 {
                self.active_nodes.push(node);
            }
        }
        while let Some(node) = self.active_nodes.pop() {
            if !self.discharge(node) {
                return false;
            }
        }
        true
    }

    fn saturate_admissible_arcs(&mut self) {
        for node in 0..self.graph.num_nodes() {
            for position in 0..self.graph.incident_arcs(node).len() {
                let arc = self.graph.incident_arcs(node)[position];
                if self.is_admissible(arc) {
                    self.push_flow(self.residual_arc_capacity.get(arc), arc);
                }
            }
        }
    }

    /// Saturates the admissible arcs out of the node; when none is left while
    /// the node still carries an excess, relabels it and restarts the scan of
    /// its incident arcs.
    fn discharge(&mut self, node: NodeIndex) -> bool {
        while self.node_excess[node] > 0 {
            let num_incident = self.graph.incident_arcs(node).len();
            let mut admissible = None;
            while self.first_admissible_arc[node] < num_incident {
                let arc = self.graph.incident_arcs(node)[self.first_admissible_arc[node]];
                if self.is_admissible(arc) {
                    admissible = Some(arc);
                    break;
                }
                self.first_admissible_arc[node] += 1;
            }
            match admissible {
                Some(arc) => {
                    let head = self.graph.head(arc);
                    let flow = self.node_excess[node].min(self.residual_arc_capacity.get(arc));
                    let head_was_active = self.node_excess[head] > 0;
                    self.push_flow(flow, arc);
                    if !head_was_active && self.node_excess[head] > 0 && head != node {
                        self.active_nodes.push(head);
                    }
                }
                None => {
                    if !self.relabel(node) {
                        return false;
                    }
                    self.first_admissible_arc[node] = 0;
                }
            }
        }
        true
    }

    fn push_flow(&mut self, flow: FlowQuantity, arc: ArcIndex) {
        self.residual_arc_capacity.add(arc, -flow);
        self.residual_arc_capacity.add(self.graph.opposite(arc), flow);
        self.node_excess[self.graph.tail(arc)] -= flow;
        self.node_excess[self.graph.head(arc)] += flow;
    }

    /// Decreases the potential of the node by the smallest amount that makes
    /// at least one outgoing residual arc admissible.
    fn relabel(&mut self, node: NodeIndex) -> bool {
        debug_assert!(self.check_relabel_precondition(node));
        let mut new_potential = CostValue::MIN;
        for &arc in self.graph.incident_arcs(node) {
            if self.residual_arc_capacity.get(arc) > 0 {
                new_potential =
                    new_potential.max(self.node_potential[self.graph.head(arc)] - self.scaled_arc_unit_cost.get(arc));
            }
        }
        if new_potential == CostValue::MIN {
            // An active node without residual arcs: the input was infeasible
            // and the feasibility check was skipped.
            debug_assert!(false, "relabel on a node without residual arcs");
            return false;
        }
        self.node_potential[node] = new_potential - self.epsilon;
        true
    }

    fn is_admissible(&self, arc: ArcIndex) -> bool {
        self.residual_arc_capacity.get(arc) > 0 && self.reduced_cost(arc) < 0
    }

    fn reduced_cost(&self, arc: ArcIndex) -> CostValue {
        self.scaled_arc_unit_cost.get(arc) + self.node_potential[self.graph.tail(arc)]
            - self.node_potential[self.graph.head(arc)]
    }

    fn check_relabel_precondition(&self, node: NodeIndex) -> bool {
        self.node_excess[node] > 0 && self.graph.incident_arcs(node).iter().all(|&arc| !self.is_admissible(arc))
    }

    /// Checks the epsilon-optimality post-condition while costs are still
    /// scaled: every arc is either saturated or has a reduced cost of at
    /// least `-epsilon`, and no node kept an excess.
    fn check_result(&self) -> bool {
        self.node_excess.iter().all(|&excess| excess == 0)
            && (0..self.graph.num_nodes()).all(|node| {
                self.graph
                    .incident_arcs(node)
                    .iter()
                    .all(|&arc| self.residual_arc_capacity.get(arc) == 0 || self.reduced_cost(arc) >= -self.epsilon)
            })
    }
}
