//! A vehicle routing layer above the `ors-cp` constraint programming core.
//!
//! # Key points
//!
//! The central type is [`RoutingModel`]: it compiles a vehicle routing
//! problem into the variables and constraints of a CP solver and then
//! orchestrates the search for good routes.
//!
//! Two sets of variables are available once a model is closed:
//!
//! - path variables: `next(i)` holds the successor of the visit slot `i`,
//!   `vehicle(i)` the route the slot belongs to and `active(i)` whether the
//!   slot is visited at all (relevant for nodes under a disjunction);
//! - dimension variables, used when quantities such as load, distance or
//!   time accumulate along the routes: `cumul(i, d)` is the quantity of
//!   dimension `d` when arriving at `i` and `transit(i, d)` the quantity
//!   added after visiting `i`, linked by
//!   `cumul(next(i)) = cumul(i) + transit(i) + slack(i)`.
//!
//! Solving runs a first-solution decision builder, then local search over
//! the routing neighborhoods (2-opt, chain moves, cross exchanges, optional
//! large neighborhood and exact sub-TSP operators) under the configured
//! metaheuristic; see [`SearchParameters`] for the tuning knobs.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

#[cfg(test)]
#[path = "../tests/helpers/mod.rs"]
#[macro_use]
pub mod helpers;

mod cache;
mod constraints;
mod filters;
mod first_solution;
mod model;
mod operators;
mod parameters;

pub use crate::cache::{CostCacheElement, IndexEvaluator, RoutingCache};
pub use crate::first_solution::SegmentEvaluator;
pub use crate::model::{NodeEvaluator, NodeIndex, RoutingModel};
pub use crate::parameters::{FirstSolutionStrategy, RoutingMetaheuristic, RoutingStatus, SearchParameters};
