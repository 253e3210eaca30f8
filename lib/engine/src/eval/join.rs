use crate::context::EvaluationContext;
use crate::error::{recover, QueryEvaluationError};
use crate::eval::bgp::bind_join;
use crate::eval::evaluate;
use crate::multiset::Multiset;
use rdf_walk_algebra::Algebra;
use rdf_walk_model::{Expression, Solution, Term, Variable};
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Evaluates a join.
///
/// The left child is evaluated first. Its result restricts the right child. If the right child is
/// a basic graph pattern that shares variables with the left result, the pattern is matched once
/// per left solution. Otherwise, both results are combined with a hash join.
pub(super) fn join(
    left: &Algebra,
    right: &Algebra,
    context: &EvaluationContext,
) -> Result<Multiset, QueryEvaluationError> {
    let lhs = evaluate(left, context)?;
    match lhs {
        Multiset::Null => return Ok(Multiset::Null),
        Multiset::Identity => return evaluate(right, context),
        Multiset::Bag(_) => {}
    }

    if let Algebra::Bgp { patterns } = right {
        let shares_variables = patterns
            .iter()
            .flat_map(rdf_walk_algebra::pattern_variables)
            .any(|variable| lhs.variables().contains(variable));
        if shares_variables {
            return bind_join(&lhs, patterns, context);
        }
    }

    let lhs = Arc::new(lhs);
    let rhs = evaluate(right, &context.with_input(Arc::clone(&lhs)))?;
    hash_join(&lhs, &rhs, context)
}

/// Evaluates both children of a join on different threads and combines their results.
pub(super) fn parallel_join(
    left: &Algebra,
    right: &Algebra,
    context: &EvaluationContext,
) -> Result<Multiset, QueryEvaluationError> {
    let (lhs, rhs) = rayon::join(|| evaluate(left, context), || evaluate(right, context));
    hash_join(&lhs?, &rhs?, context)
}

/// Computes the natural join of two multisets.
///
/// Solutions of the right side are indexed by the variables that both sides declare. If there is
/// no such variable, the result is the cross product.
pub(super) fn hash_join(
    lhs: &Multiset,
    rhs: &Multiset,
    context: &EvaluationContext,
) -> Result<Multiset, QueryEvaluationError> {
    match (lhs, rhs) {
        (Multiset::Null, _) | (_, Multiset::Null) => return Ok(Multiset::Null),
        (Multiset::Identity, other) | (other, Multiset::Identity) => return Ok(other.clone()),
        _ => {}
    }

    let index = SolutionIndex::new(rhs, lhs.variables());
    let mut solutions = Vec::new();
    for left in lhs.iter() {
        if context.should_stop()? {
            break;
        }
        for right in index.candidates(left) {
            if left.is_compatible_with(right) {
                solutions.push(left.merge(right));
            }
        }
    }
    Ok(Multiset::new(joined_variables(lhs, rhs), solutions))
}

/// Evaluates an optional pattern.
///
/// Every left solution is extended by each compatible right solution for which `expression`
/// holds. Left solutions without such an extension are kept unchanged.
pub(super) fn left_join(
    left: &Algebra,
    right: &Algebra,
    expression: Option<&Expression>,
    context: &EvaluationContext,
) -> Result<Multiset, QueryEvaluationError> {
    let lhs = Arc::new(evaluate(left, context)?);
    if lhs.is_null() {
        return Ok(Multiset::Null);
    }
    let rhs = evaluate(right, &context.with_input(Arc::clone(&lhs)))?;

    let index = SolutionIndex::new(&rhs, lhs.variables());
    let mut solutions = Vec::new();
    for left in lhs.iter() {
        if context.should_stop()? {
            break;
        }
        let mut extended = false;
        for right in index.candidates(left) {
            if !left.is_compatible_with(right) {
                continue;
            }
            let merged = left.merge(right);
            let accepted = match expression {
                None => true,
                Some(expression) => recover(
                    context
                        .expressions()
                        .evaluate_boolean(expression, &merged, context),
                )?
                .unwrap_or(false),
            };
            if accepted {
                solutions.push(merged);
                extended = true;
            }
        }
        if !extended {
            solutions.push(left.clone());
        }
    }
    Ok(Multiset::new(joined_variables(&lhs, &rhs), solutions))
}

/// Removes the left solutions that are compatible with a right solution and share at least one
/// bound variable with it.
pub(super) fn minus(
    left: &Algebra,
    right: &Algebra,
    context: &EvaluationContext,
) -> Result<Multiset, QueryEvaluationError> {
    let lhs = Arc::new(evaluate(left, context)?);
    if lhs.is_null() {
        return Ok(Multiset::Null);
    }
    let rhs = evaluate(right, &context.with_input(Arc::clone(&lhs)))?;
    let shared = lhs
        .variables()
        .iter()
        .any(|variable| rhs.variables().contains(variable));
    if !shared {
        return Ok(Arc::unwrap_or_clone(lhs));
    }

    let index = SolutionIndex::new(&rhs, lhs.variables());
    let mut solutions = Vec::new();
    for left in lhs.iter() {
        if context.should_stop()? {
            break;
        }
        let removed = index.candidates(left).any(|right| {
            left.shares_variable_with(right) && left.is_compatible_with(right)
        });
        if !removed {
            solutions.push(left.clone());
        }
    }
    Ok(Multiset::new(lhs.variables().to_vec(), solutions))
}

/// Evaluates a filter over the product of two children. The filter is evaluated for each pair
/// while the pairs are generated.
pub(super) fn filtered_product(
    left: &Algebra,
    right: &Algebra,
    expression: &Expression,
    context: &EvaluationContext,
) -> Result<Multiset, QueryEvaluationError> {
    let lhs = evaluate(left, context)?;
    if lhs.is_null() {
        return Ok(Multiset::Null);
    }
    let rhs = evaluate(right, context)?;

    let mut solutions = Vec::new();
    for left in lhs.iter() {
        if context.should_stop()? {
            break;
        }
        for right in rhs.iter() {
            if !left.is_compatible_with(right) {
                continue;
            }
            let merged = left.merge(right);
            let accepted = recover(
                context
                    .expressions()
                    .evaluate_boolean(expression, &merged, context),
            )?;
            if accepted == Some(true) {
                solutions.push(merged);
            }
        }
    }
    Ok(Multiset::new(joined_variables(&lhs, &rhs), solutions))
}

fn joined_variables(lhs: &Multiset, rhs: &Multiset) -> Vec<Variable> {
    lhs.variables()
        .iter()
        .chain(rhs.variables())
        .cloned()
        .collect()
}

/// An index of solutions by the terms bound to a set of key variables.
///
/// Solutions that do not bind every key variable cannot be placed in a bucket. They are kept in a
/// separate list and returned as candidates for every probe.
struct SolutionIndex<'a> {
    keys: Vec<Variable>,
    buckets: FxHashMap<Vec<&'a Term>, Vec<&'a Solution>>,
    partial: Vec<&'a Solution>,
    all: Vec<&'a Solution>,
}

impl<'a> SolutionIndex<'a> {
    /// Indexes `multiset` by the variables it shares with `probe_variables`.
    fn new(multiset: &'a Multiset, probe_variables: &[Variable]) -> Self {
        let keys = multiset
            .variables()
            .iter()
            .filter(|variable| probe_variables.contains(variable))
            .cloned()
            .collect::<Vec<_>>();

        let mut buckets: FxHashMap<_, Vec<_>> = FxHashMap::default();
        let mut partial = Vec::new();
        let mut all = Vec::new();
        for solution in multiset.iter() {
            all.push(solution);
            match key(&keys, solution) {
                Some(key) if !keys.is_empty() => buckets.entry(key).or_default().push(solution),
                _ => partial.push(solution),
            }
        }

        Self {
            keys,
            buckets,
            partial,
            all,
        }
    }

    /// Returns the solutions that may be compatible with `probe`. The caller must still check
    /// compatibility.
    fn candidates<'p>(
        &'p self,
        probe: &'p Solution,
    ) -> Box<dyn Iterator<Item = &'p Solution> + 'p>
    where
        'a: 'p,
    {
        if self.keys.is_empty() {
            return Box::new(self.all.iter().copied());
        }
        match key(&self.keys, probe) {
            Some(key) => Box::new(
                self.buckets
                    .get(&key)
                    .into_iter()
                    .flatten()
                    .chain(&self.partial)
                    .copied(),
            ),
            None => Box::new(self.all.iter().copied()),
        }
    }
}

fn key<'a>(keys: &[Variable], solution: &'a Solution) -> Option<Vec<&'a Term>> {
    keys.iter().map(|variable| solution.get(variable)).collect()
}
