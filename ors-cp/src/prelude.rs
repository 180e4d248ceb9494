//! This module reimports the commonly used types.

pub use crate::solver::assignment::Assignment;
pub use crate::solver::{Constraint, CpResult, Demon, Failure, IntVar, Solver};

pub use crate::search::local::{Delta, LocalSearchFilter, LocalSearchOperator, PathState};
pub use crate::search::metaheuristics::Metaheuristic;
pub use crate::search::{Decision, DecisionBuilder, SearchMonitor};

pub use crate::utils::{DefaultRandom, Environment, GenericError, GenericResult, InfoLogger, Random, Timer};
