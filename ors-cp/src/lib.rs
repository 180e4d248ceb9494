//! A core crate with the building blocks of a constraint-programming solver
//! tailored to search over integer variables.
//!
//! # Key points
//!
//! The crate is organized around a [`solver::Solver`] owning a trail of undo
//! records: every domain shrink and every mutation of a reversible primitive
//! is recorded so that the state of a search node can be restored exactly when
//! the tree search backtracks. Reversible memory lives in solver-owned arenas
//! addressed through copyable handles, which keeps the undo records plain
//! `(slot, old value)` pairs.
//!
//! On top of the solver, the [`search`] module provides a depth-first search
//! over decision builders, search monitors (logging and limits), a local
//! search framework operating on successor ("next") variables, and the
//! metaheuristics guiding it out of local minima.
//!
//! The [`state`] module exposes the reversible primitives directly, so that
//! constraints can keep incremental data across backtracks: [`state::Rev`],
//! [`state::SimpleRevFifo`], [`state::RevSwitch`], [`state::RevBitSet`],
//! [`state::RevBitMatrix`] and [`state::RevImmutableMultiMap`].
//!
//! Everything here is single threaded: a solver owns its trail and all data
//! reachable from it, and nothing is shared across threads.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

#[cfg(test)]
#[path = "../tests/helpers/mod.rs"]
#[macro_use]
pub mod helpers;

pub mod prelude;

pub mod search;
pub mod solver;
pub mod state;
pub mod tuples;
pub mod utils;
