use crate::graph::{ArcIndex, FlowQuantity, StarGraph};
use crate::min_cost_flow::MinCostFlow;

/// Creates the four node network used across the flow tests:
/// 0->1 (cap 10, cost 1), 1->2 (cap 5, cost 2), 1->3 (cap 5, cost 3),
/// 0->2 (cap 3, cost 5), 2->3 (cap 8, cost 1).
pub fn create_diamond_graph() -> (StarGraph, Vec<ArcIndex>) {
    let mut graph = StarGraph::with_capacities(4, 5);
    graph.add_nodes(4);
    let arcs = [(0, 1), (1, 2), (1, 3), (0, 2), (2, 3)].iter().map(|&(tail, head)| graph.add_arc(tail, head)).collect();
    (graph, arcs)
}

pub const DIAMOND_CAPACITIES: [FlowQuantity; 5] = [10, 5, 5, 3, 8];
pub const DIAMOND_COSTS: [i64; 5] = [1, 2, 3, 5, 1];

/// Configures a diamond graph engine with the standard capacities, costs and
/// the given supplies.
pub fn create_diamond_flow<'a>(graph: &'a StarGraph, arcs: &[ArcIndex], supplies: &[FlowQuantity]) -> MinCostFlow<'a> {
    let mut min_cost_flow = MinCostFlow::new(graph);
    for (idx, &arc) in arcs.iter().enumerate() {
        min_cost_flow.set_arc_capacity(arc, DIAMOND_CAPACITIES[idx]);
        min_cost_flow.set_arc_unit_cost(arc, DIAMOND_COSTS[idx]);
    }
    for (node, &supply) in supplies.iter().enumerate() {
        min_cost_flow.set_node_supply(node, supply);
    }
    min_cost_flow
}

/// Asserts flow conservation at every node and the antisymmetry of arc flows.
pub fn assert_flow_invariants(min_cost_flow: &MinCostFlow<'_>) {
    let graph = min_cost_flow.graph();
    for arc in 1..=graph.num_arcs() as ArcIndex {
        assert_eq!(min_cost_flow.flow(arc), -min_cost_flow.flow(graph.opposite(arc)));
        assert!(min_cost_flow.flow(arc) >= 0);
        assert!(min_cost_flow.flow(arc) <= min_cost_flow.capacity(arc));
    }
    for node in 0..graph.num_nodes() {
        let outflow: i64 =
            graph.incident_arcs(node).iter().filter(|&&arc| graph.is_direct(arc)).map(|&arc| min_cost_flow.flow(arc)).sum();
        let inflow: i64 = graph
            .incident_arcs(node)
            .iter()
            .filter(|&&arc| !graph.is_direct(arc))
            .map(|&arc| min_cost_flow.flow(graph.opposite(arc)))
            .sum();
        assert_eq!(inflow + min_cost_flow.initial_supply(node), outflow);
    }
}
