use rdf_walk_algebra::optimizer::{
    create_optimizer_passes, OptimizationLevel, OptimizerPassKind, QueryForm,
};
use std::time::Duration;

/// Options that control the evaluation of a single query.
///
/// The options are immutable once the evaluation has started. They are shared by all operators
/// of the evaluation, including those running on other threads.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryOptions {
    /// The maximum duration of the evaluation. `None` means no deadline.
    pub timeout: Option<Duration>,
    /// If set, an evaluation that reaches its deadline returns the solutions produced so far
    /// instead of failing with a timeout.
    pub partial_results_on_timeout: bool,
    /// Selects the optimizer passes if no explicit list is given.
    pub optimization_level: OptimizationLevel,
    /// An explicit list of optimizer passes. Overrides [Self::optimization_level].
    pub optimizer_passes: Option<Vec<OptimizerPassKind>>,
    /// Evaluates the children of independent joins on different threads.
    pub parallel_joins: bool,
}

impl QueryOptions {
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_partial_results_on_timeout(mut self, partial_results: bool) -> Self {
        self.partial_results_on_timeout = partial_results;
        self
    }

    #[must_use]
    pub fn with_optimization_level(mut self, level: OptimizationLevel) -> Self {
        self.optimization_level = level;
        self
    }

    /// Uses exactly the given optimizer passes. An empty list evaluates the tree as it is.
    #[must_use]
    pub fn with_optimizer_passes(mut self, passes: Vec<OptimizerPassKind>) -> Self {
        self.optimizer_passes = Some(passes);
        self
    }

    #[must_use]
    pub fn with_parallel_joins(mut self, parallel_joins: bool) -> Self {
        self.parallel_joins = parallel_joins;
        self
    }

    /// Returns the optimizer passes for a query of the given `form`.
    pub fn optimizer_passes(&self, form: QueryForm) -> Vec<OptimizerPassKind> {
        if let Some(passes) = &self.optimizer_passes {
            return passes.clone();
        }

        let mut passes = create_optimizer_passes(self.optimization_level, form);
        if self.parallel_joins
            && self.optimization_level != OptimizationLevel::None
            && !passes.contains(&OptimizerPassKind::ParallelJoin)
        {
            passes.push(OptimizerPassKind::ParallelJoin);
        }
        passes
    }
}
