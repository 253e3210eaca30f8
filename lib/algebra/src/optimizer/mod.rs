//! Optimizer passes for [Algebra] trees.
//!
//! Every pass is a pure rewrite that must not change the solutions of a tree. They only change how
//! the solutions are computed. If the precondition of a rewrite cannot be established, the pass
//! leaves the sub-tree unchanged.

mod ask;
mod bgp_reordering;
mod canonicalize;
mod filter_placement;
mod filtered_product;
mod implicit_join;
mod lazy;
mod parallel_join;

pub use ask::AskPass;
pub use bgp_reordering::BgpReorderingPass;
pub use canonicalize::CanonicalizePass;
pub use filter_placement::FilterPlacementPass;
pub use filtered_product::FilteredProductPass;
pub use implicit_join::ImplicitJoinPass;
pub use lazy::LazyPass;
pub use parallel_join::ParallelJoinPass;

use crate::tree::Transformed;
use crate::Algebra;
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

/// A rewrite of an [Algebra] tree that preserves its solutions.
pub trait OptimizerPass: Debug + Send + Sync {
    /// A short name used for logging.
    fn name(&self) -> &str;

    /// Rewrites `tree`.
    fn rewrite(&self, tree: Algebra) -> Transformed<Algebra>;
}

/// Identifies an [OptimizerPass].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OptimizerPassKind {
    /// Reverts all specialized nodes to their canonical form.
    Canonicalize,
    /// Replaces equality filters between two variables with a shared variable.
    ImplicitJoin,
    /// Orders the patterns of basic graph patterns by selectivity.
    BgpReordering,
    /// Moves filters towards the patterns that bind their variables.
    FilterPlacement,
    /// Evaluates filters over cross products while the pairs are generated.
    FilteredProduct,
    /// Stops pattern matching once a `LIMIT` is satisfied.
    Lazy,
    /// Stops pattern matching after the first solution. Only valid for `ASK` queries.
    Ask,
    /// Evaluates the children of independent joins on different threads.
    ParallelJoin,
}

impl OptimizerPassKind {
    /// Creates the pass.
    pub fn create(self) -> Arc<dyn OptimizerPass> {
        match self {
            OptimizerPassKind::Canonicalize => Arc::new(CanonicalizePass::new()),
            OptimizerPassKind::ImplicitJoin => Arc::new(ImplicitJoinPass::new()),
            OptimizerPassKind::BgpReordering => Arc::new(BgpReorderingPass::new()),
            OptimizerPassKind::FilterPlacement => Arc::new(FilterPlacementPass::new()),
            OptimizerPassKind::FilteredProduct => Arc::new(FilteredProductPass::new()),
            OptimizerPassKind::Lazy => Arc::new(LazyPass::new()),
            OptimizerPassKind::Ask => Arc::new(AskPass::new()),
            OptimizerPassKind::ParallelJoin => Arc::new(ParallelJoinPass::new()),
        }
    }
}

/// Defines how many optimizations the optimizer applies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum OptimizationLevel {
    /// No optimizations. The tree is evaluated in its canonical form. Useful as a baseline when
    /// debugging an optimizer pass.
    None,
    /// All optimizations that do not require additional threads.
    #[default]
    Default,
    /// All optimizations, including parallel evaluation of independent joins.
    Full,
}

/// The form of the query that is optimized. Some passes depend on how the result is consumed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QueryForm {
    /// All solutions are returned.
    Select,
    /// Only the existence of a solution is returned.
    Ask,
}

impl Display for OptimizationLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            OptimizationLevel::None => f.write_str("none"),
            OptimizationLevel::Default => f.write_str("default"),
            OptimizationLevel::Full => f.write_str("full"),
        }
    }
}

/// Creates the list of optimizer passes for the given `level` and query `form`.
pub fn create_optimizer_passes(level: OptimizationLevel, form: QueryForm) -> Vec<OptimizerPassKind> {
    let mut passes = match level {
        OptimizationLevel::None => return vec![OptimizerPassKind::Canonicalize],
        OptimizationLevel::Default | OptimizationLevel::Full => vec![
            OptimizerPassKind::ImplicitJoin,
            OptimizerPassKind::BgpReordering,
            OptimizerPassKind::FilterPlacement,
            OptimizerPassKind::FilteredProduct,
            OptimizerPassKind::Lazy,
        ],
    };

    if form == QueryForm::Ask {
        passes.push(OptimizerPassKind::Ask);
    }
    if level == OptimizationLevel::Full {
        passes.push(OptimizerPassKind::ParallelJoin);
    }
    passes
}

/// Applies `passes` to `tree` in order.
pub fn optimize(tree: &Algebra, passes: &[Arc<dyn OptimizerPass>]) -> Algebra {
    passes.iter().fold(tree.clone(), |tree, pass| {
        let result = pass.rewrite(tree);
        tracing::debug!(
            pass = pass.name(),
            transformed = result.transformed,
            "Applied optimizer pass"
        );
        result.data
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_mode_only_canonicalizes() {
        assert_eq!(
            create_optimizer_passes(OptimizationLevel::None, QueryForm::Ask),
            [OptimizerPassKind::Canonicalize]
        );
    }

    #[test]
    fn ask_pass_depends_on_form() {
        let select = create_optimizer_passes(OptimizationLevel::Default, QueryForm::Select);
        let ask = create_optimizer_passes(OptimizationLevel::Default, QueryForm::Ask);
        assert!(!select.contains(&OptimizerPassKind::Ask));
        assert!(ask.contains(&OptimizerPassKind::Ask));
        assert!(!ask.contains(&OptimizerPassKind::ParallelJoin));
    }

    #[test]
    fn pass_names_are_unique() {
        let kinds = [
            OptimizerPassKind::Canonicalize,
            OptimizerPassKind::ImplicitJoin,
            OptimizerPassKind::BgpReordering,
            OptimizerPassKind::FilterPlacement,
            OptimizerPassKind::FilteredProduct,
            OptimizerPassKind::Lazy,
            OptimizerPassKind::Ask,
            OptimizerPassKind::ParallelJoin,
        ];
        let names = kinds
            .iter()
            .map(|kind| kind.create().name().to_owned())
            .collect::<rustc_hash::FxHashSet<_>>();
        assert_eq!(names.len(), kinds.len());
    }
}
