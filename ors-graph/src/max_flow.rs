//! A push-relabel maximum flow algorithm with distance labels.

#[cfg(test)]
#[path = "../tests/unit/max_flow_test.rs"]
mod max_flow_test;

use crate::graph::{ArcIndex, FlowQuantity, NodeIndex, SignedArcVec, StarGraph};
use std::collections::VecDeque;

/// Specifies the outcome of the last [`MaxFlow::solve`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MaxFlowStatus {
    /// The problem was not solved yet, or the input changed since the last run.
    NotSolved,
    /// A maximum flow was found.
    Optimal,
    /// Source or sink is not a valid node, or they coincide.
    BadInput,
}

/// A maximum flow engine over a [`StarGraph`].
///
/// Heights (distance labels) are initialized by a reverse breadth-first search
/// from the sink over residual arcs; afterwards the classical discharge loop
/// with the current-arc heuristic and relabel-to-lowest-neighbor runs until no
/// node except source and sink keeps an excess.
pub struct MaxFlow<'a> {
    graph: &'a StarGraph,
    arc_capacity: Vec<FlowQuantity>,
    residual_arc_capacity: SignedArcVec<FlowQuantity>,
    node_excess: Vec<FlowQuantity>,
    node_height: Vec<usize>,
    first_admissible_arc: Vec<usize>,
    active_nodes: Vec<NodeIndex>,
    total_flow: FlowQuantity,
    status: MaxFlowStatus,
}

impl<'a> MaxFlow<'a> {
    /// Creates an engine for the given graph with all capacities at zero.
    pub fn new(graph: &'a StarGraph) -> Self {
        let num_nodes = graph.num_nodes();
        Self {
            graph,
            arc_capacity: vec![0; graph.num_arcs()],
            residual_arc_capacity: SignedArcVec::new(graph.num_arcs(), 0),
            node_excess: vec![0; num_nodes],
            node_height: vec![0; num_nodes],
            first_admissible_arc: vec![0; num_nodes],
            active_nodes: Vec::new(),
            total_flow: 0,
            status: MaxFlowStatus::NotSolved,
        }
    }

    /// Sets the capacity of a direct arc.
    pub fn set_arc_capacity(&mut self, arc: ArcIndex, capacity: FlowQuantity) {
        debug_assert!(self.graph.is_direct(arc));
        debug_assert!(capacity >= 0);
        self.arc_capacity[(arc - 1) as usize] = capacity;
        self.status = MaxFlowStatus::NotSolved;
    }

    /// Returns the capacity of a direct arc.
    pub fn capacity(&self, arc: ArcIndex) -> FlowQuantity {
        debug_assert!(self.graph.is_direct(arc));
        self.arc_capacity[(arc - 1) as usize]
    }

    /// Returns the flow carried by an arc after a successful solve. The flow
    /// on an opposite arc is the negation of the flow on the direct arc.
    pub fn flow(&self, arc: ArcIndex) -> FlowQuantity {
        debug_assert!(self.graph.is_arc_valid(arc));
        if self.graph.is_direct(arc) {
            self.residual_arc_capacity.get(self.graph.opposite(arc))
        } else {
            -self.residual_arc_capacity.get(arc)
        }
    }

    /// Returns the value of the maximum flow found by the last solve.
    pub fn get_optimal_flow(&self) -> FlowQuantity {
        self.total_flow
    }

    /// Returns the status of the last solve.
    pub fn status(&self) -> MaxFlowStatus {
        self.status
    }

    /// Computes a maximum flow from `source` to `sink`. Returns true on
    /// success; any previously computed flow is discarded first.
    pub fn solve(&mut self, source: NodeIndex, sink: NodeIndex) -> bool {
        if !self.graph.is_node_valid(source) || !self.graph.is_node_valid(sink) || source == sink {
            self.status = MaxFlowStatus::BadInput;
            return false;
        }
        self.reset(source);
        self.global_relabel(source, sink);
        self.saturate_source_arcs(source, sink);
        while let Some(node) = self.active_nodes.pop() {
            self.discharge(node, source, sink);
        }
        self.total_flow = self.node_excess[sink];
        self.status = MaxFlowStatus::Optimal;
        true
    }

    fn reset(&mut self, source: NodeIndex) {
        for arc in 1..=self.graph.num_arcs() as ArcIndex {
            self.residual_arc_capacity.set(arc, self.arc_capacity[(arc - 1) as usize]);
            self.residual_arc_capacity.set(-arc, 0);
        }
        self.node_excess.iter_mut().for_each(|excess| *excess = 0);
        self.first_admissible_arc.iter_mut().for_each(|cursor| *cursor = 0);
        self.active_nodes.clear();
        let num_nodes = self.graph.num_nodes();
        self.node_height.iter_mut().for_each(|height| *height = num_nodes);
        self.node_height[source] = num_nodes;
    }

    /// Initializes heights as breadth-first distances to the sink over
    /// residual arcs; unreachable nodes keep the height `num_nodes`.
    fn global_relabel(&mut self, source: NodeIndex, sink: NodeIndex) {
        let mut queue = VecDeque::new();
        self.node_height[sink] = 0;
        queue.push_back(sink);
        while let Some(node) = queue.pop_front() {
            for &arc in self.graph.incident_arcs(node) {
                // Traverse backwards: the opposite arc must carry residual
                // capacity towards `node`.
                let neighbor = self.graph.head(arc);
                if neighbor != source
                    && self.node_height[neighbor] == self.graph.num_nodes()
                    && self.residual_arc_capacity.get(self.graph.opposite(arc)) > 0
                {
                    self.node_height[neighbor] = self.node_height[node] + 1;
                    queue.push_back(neighbor);
                }
            }
        }
        self.node_height[source] = self.graph.num_nodes();
    }

    fn saturate_source_arcs(&mut self, source: NodeIndex, sink: NodeIndex) {
        for &arc in self.graph.incident_arcs(source) {
            let residual = self.residual_arc_capacity.get(arc);
            if residual > 0 {
                self.push_flow(residual, arc);
                let head = self.graph.head(arc);
                if head != sink && head != source && self.node_excess[head] == residual {
                    self.active_nodes.push(head);
                }
            }
        }
    }

    fn push_flow(&mut self, flow: FlowQuantity, arc: ArcIndex) {
        self.residual_arc_capacity.add(arc, -flow);
        self.residual_arc_capacity.add(self.graph.opposite(arc), flow);
        self.node_excess[self.graph.tail(arc)] -= flow;
        self.node_excess[self.graph.head(arc)] += flow;
    }

    fn is_admissible(&self, arc: ArcIndex) -> bool {
        self.residual_arc_capacity.get(arc) > 0
            && self.node_height[self.graph.tail(arc)] == self.node_height[self.graph.head(arc)] + 1
    }

    fn discharge(&mut self, node: NodeIndex, source: NodeIndex, sink: NodeIndex) {
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
                    if !head_was_active && self.node_excess[head] > 0 && head != sink && head != source {
                        self.active_nodes.push(head);
                    }
                }
                None => {
                    self.relabel(node);
                    self.first_admissible_arc[node] = 0;
                }
            }
        }
    }

    /// Lifts the node to one above its lowest neighbor reachable through a
    /// residual arc. An active node always has at least one such arc: the
    /// opposite of an arc that brought its excess in.
    fn relabel(&mut self, node: NodeIndex) {
        let mut min_height = usize::MAX;
        for &arc in self.graph.incident_arcs(node) {
            if self.residual_arc_capacity.get(arc) > 0 {
                min_height = min_height.min(self.node_height[self.graph.head(arc)]);
            }
        }
        debug_assert!(min_height != usize::MAX, "relabel on a node without residual arcs");
        if min_height != usize::MAX {
            self.node_height[node] = min_height + 1;
        }
    }
}
