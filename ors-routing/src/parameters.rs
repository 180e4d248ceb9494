//! Search configuration of the routing model.

/// First solution strategies, used as starting point of local search.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FirstSolutionStrategy {
    /// Chooses the first slot with an unbound successor and assigns it its
    /// smallest feasible value.
    #[default]
    Default,
    /// Iteratively connects the pair of slots producing the cheapest route
    /// segment over all routes.
    GlobalCheapestArc,
    /// Selects the first slot with an unbound successor and connects it to
    /// the slot producing the cheapest route segment.
    LocalCheapestArc,
    /// Starting from a route start, connects it to the slot producing the
    /// cheapest route segment, then extends the route from the slot just
    /// added.
    PathCheapestArc,
    /// Like [`FirstSolutionStrategy::PathCheapestArc`] but ordering segments
    /// by a user supplied evaluator.
    EvaluatorStrategy,
}

/// Metaheuristics, to escape the local minima found by local search.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RoutingMetaheuristic {
    /// Accepts improving neighbors only; stops at the first local optimum.
    #[default]
    GreedyDescent,
    /// Guided local search, generally the most efficient metaheuristic for
    /// vehicle routing.
    GuidedLocalSearch,
    /// Simulated annealing.
    SimulatedAnnealing,
    /// Tabu search.
    TabuSearch,
}

/// Status of the search.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RoutingStatus {
    /// No solve was attempted yet.
    #[default]
    NotSolved,
    /// A solution was found.
    Success,
    /// No solution exists, or none was found before the search completed.
    Fail,
    /// A limit tripped; the best solution found so far was returned, if any.
    FailTimeout,
}

/// Specifies how the routing search is driven.
///
/// A metaheuristic other than greedy descent does not naturally terminate,
/// so a time or solution limit should be set with it; the metaheuristics cap
/// their escape rounds as a safety net when none is given.
#[derive(Clone, Debug)]
pub struct SearchParameters {
    /// The strategy building the first solution.
    pub first_solution: FirstSolutionStrategy,
    /// The metaheuristic driving local search acceptance.
    pub metaheuristic: RoutingMetaheuristic,
    /// Forbids the large neighborhood search operators.
    pub no_lns: bool,
    /// Forbids the exact sub-TSP improvement operator.
    pub no_tsp: bool,
    /// The largest sub-route solved exactly by dynamic programming.
    pub tsp_opt_size: usize,
    /// Stops the search after this many improving solutions.
    pub solution_limit: Option<usize>,
    /// Stops the search after this wall-clock budget, in milliseconds.
    pub time_limit_ms: Option<u64>,
    /// The wall-clock budget of one large neighborhood re-optimization, in
    /// milliseconds.
    pub lns_time_limit_ms: u64,
}

impl Default for SearchParameters {
    fn default() -> Self {
        Self {
            first_solution: FirstSolutionStrategy::default(),
            metaheuristic: RoutingMetaheuristic::default(),
            no_lns: false,
            no_tsp: true,
            tsp_opt_size: 13,
            solution_limit: None,
            time_limit_ms: None,
            lns_time_limit_ms: 100,
        }
    }
}
