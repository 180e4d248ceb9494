//! A crate with flow algorithms built on top of a star graph representation.
//!
//! # Key points
//!
//! The crate models directed multigraphs with explicit reverse arcs: every arc
//! added by the user gets an opposite arc so that residual networks of flow
//! algorithms can be represented without any extra bookkeeping. On top of this
//! representation, two engines are provided:
//!
//! - [`MaxFlow`]: a push-relabel maximum flow algorithm with distance labels.
//! - [`MinCostFlow`]: a cost-scaling push-relabel minimum cost flow algorithm
//!   which uses [`MaxFlow`] internally to check problem feasibility.
//!
//! Both engines report the outcome via status enums and stay mutable after a
//! failed run, so the caller can correct the input and retry.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

#[cfg(test)]
#[path = "../tests/helpers/mod.rs"]
#[macro_use]
pub mod helpers;

pub mod graph;
pub mod max_flow;
pub mod min_cost_flow;

pub use crate::graph::{ArcIndex, CostValue, FlowQuantity, NodeIndex, SignedArcVec, StarGraph};
pub use crate::max_flow::{MaxFlow, MaxFlowStatus};
pub use crate::min_cost_flow::{FeasibilityCheck, FlowOptions, MinCostFlow, MinCostFlowStatus};
