use crate::context::EvaluationContext;
use crate::error::QueryEvaluationError;
use crate::multiset::Multiset;
use rdf_walk_algebra::pattern_variables;
use rdf_walk_common::TriplePatternMatch;
use rdf_walk_model::{NamedNodePattern, Solution, Term, TermPattern, Triple, TriplePattern};
use std::ops::ControlFlow;

/// Matches a basic graph pattern against the active graph.
///
/// The patterns are matched in the given order. Each match of a pattern binds its variables, and
/// the bindings are substituted into the remaining patterns before they are matched. If `limit`
/// is set, matching stops after `limit` solutions.
pub(super) fn evaluate_bgp(
    patterns: &[TriplePattern],
    limit: Option<usize>,
    context: &EvaluationContext,
) -> Result<Multiset, QueryEvaluationError> {
    let mut matcher = BgpMatcher::new(patterns, limit, context);
    if matcher.extend(Solution::new())?.is_break() {
        tracing::trace!(
            solutions = matcher.results.len(),
            "Stopped matching basic graph pattern"
        );
    }
    Ok(matcher.finish())
}

/// Joins `left` with a basic graph pattern by matching the pattern once per solution of `left`,
/// starting from its bindings.
pub(super) fn bind_join(
    left: &Multiset,
    patterns: &[TriplePattern],
    context: &EvaluationContext,
) -> Result<Multiset, QueryEvaluationError> {
    let mut matcher = BgpMatcher::new(patterns, None, context);
    for solution in left.iter() {
        if matcher.extend(solution.clone())?.is_break() {
            break;
        }
    }
    let variables = left.variables().to_vec();
    Ok(Multiset::new(variables, matcher.finish().into_solutions()))
}

struct BgpMatcher<'a> {
    patterns: &'a [TriplePattern],
    limit: Option<usize>,
    context: &'a EvaluationContext,
    results: Vec<Solution>,
}

impl<'a> BgpMatcher<'a> {
    fn new(
        patterns: &'a [TriplePattern],
        limit: Option<usize>,
        context: &'a EvaluationContext,
    ) -> Self {
        Self {
            patterns,
            limit,
            context,
            results: Vec::new(),
        }
    }

    fn is_full(&self) -> bool {
        self.limit.is_some_and(|limit| self.results.len() >= limit)
    }

    /// Adds every extension of `solution` that matches all patterns.
    fn extend(&mut self, solution: Solution) -> Result<ControlFlow<()>, QueryEvaluationError> {
        if self.is_full() {
            return Ok(ControlFlow::Break(()));
        }
        self.match_from(solution, 0)
    }

    fn match_from(
        &mut self,
        solution: Solution,
        index: usize,
    ) -> Result<ControlFlow<()>, QueryEvaluationError> {
        let Some(pattern) = self.patterns.get(index) else {
            self.results.push(solution);
            return Ok(if self.is_full() {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            });
        };

        let context = self.context;
        let query = TriplePatternMatch::new(
            resolve(&pattern.subject, &solution),
            resolve_predicate(&pattern.predicate, &solution),
            resolve(&pattern.object, &solution),
        );
        for triple in context
            .source()
            .match_triples(&query, context.active_graph())?
        {
            if context.should_stop()? {
                return Ok(ControlFlow::Break(()));
            }
            let Some(next) = bind_triple(pattern, triple?, &solution) else {
                continue;
            };
            if self.match_from(next, index + 1)?.is_break() {
                return Ok(ControlFlow::Break(()));
            }
        }
        Ok(ControlFlow::Continue(()))
    }

    fn finish(self) -> Multiset {
        let variables = self
            .patterns
            .iter()
            .flat_map(pattern_variables)
            .cloned()
            .collect::<Vec<_>>();
        Multiset::new(variables, self.results)
    }
}

/// Returns the term at a position of a pattern, if it is fixed by the pattern or by `solution`.
pub(super) fn resolve(pattern: &TermPattern, solution: &Solution) -> Option<Term> {
    match pattern {
        TermPattern::NamedNode(node) => Some(node.clone().into()),
        TermPattern::BlankNode(node) => Some(node.clone().into()),
        TermPattern::Literal(literal) => Some(literal.clone().into()),
        TermPattern::Variable(variable) => solution.get(variable).cloned(),
        #[allow(unreachable_patterns)]
        _ => None,
    }
}

fn resolve_predicate(pattern: &NamedNodePattern, solution: &Solution) -> Option<Term> {
    match pattern {
        NamedNodePattern::NamedNode(node) => Some(node.clone().into()),
        NamedNodePattern::Variable(variable) => solution.get(variable).cloned(),
    }
}

/// Binds the variables of `pattern` to the terms of `triple`. Returns `None` if a variable is
/// already bound to another term (e.g., a variable that occurs twice in the pattern).
fn bind_triple(pattern: &TriplePattern, triple: Triple, solution: &Solution) -> Option<Solution> {
    let Triple {
        subject,
        predicate,
        object,
    } = triple;
    let solution = bind_position(&pattern.subject, subject.into(), solution.clone())?;
    let solution = match &pattern.predicate {
        NamedNodePattern::Variable(variable) => {
            bind_variable(variable, predicate.into(), solution)?
        }
        NamedNodePattern::NamedNode(_) => solution,
    };
    bind_position(&pattern.object, object, solution)
}

pub(super) fn bind_position(
    pattern: &TermPattern,
    term: Term,
    solution: Solution,
) -> Option<Solution> {
    match pattern {
        TermPattern::Variable(variable) => bind_variable(variable, term, solution),
        _ => Some(solution),
    }
}

fn bind_variable(
    variable: &rdf_walk_model::Variable,
    term: Term,
    solution: Solution,
) -> Option<Solution> {
    match solution.get(variable) {
        Some(bound) if *bound == term => Some(solution),
        Some(_) => None,
        None => Some(solution.with(variable.clone(), term)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::QueryOptions;
    use rdf_walk_model::{GraphName, NamedNode, Quad, Variable};
    use rdf_walk_storage::MemoryDataset;
    use std::sync::Arc;

    fn iri(value: &str) -> NamedNode {
        NamedNode::new_unchecked(format!("http://example.com/{value}"))
    }

    #[test]
    fn repeated_variable_must_bind_same_term() {
        let pattern = TriplePattern {
            subject: Variable::new_unchecked("x").into(),
            predicate: iri("p").into(),
            object: Variable::new_unchecked("x").into(),
        };

        let loop_triple = Triple::new(iri("a"), iri("p"), iri("a"));
        let edge = Triple::new(iri("a"), iri("p"), iri("b"));

        assert!(bind_triple(&pattern, loop_triple, &Solution::new()).is_some());
        assert!(bind_triple(&pattern, edge, &Solution::new()).is_none());
    }

    #[test]
    fn limit_stops_matching() -> Result<(), QueryEvaluationError> {
        let dataset = ["a", "b", "c"]
            .into_iter()
            .map(|o| Quad::new(iri("s"), iri("p"), iri(o), GraphName::DefaultGraph))
            .collect::<MemoryDataset>();
        let context = EvaluationContext::new(Arc::new(dataset), QueryOptions::default());
        let patterns = [TriplePattern {
            subject: Variable::new_unchecked("s").into(),
            predicate: iri("p").into(),
            object: Variable::new_unchecked("o").into(),
        }];

        assert_eq!(evaluate_bgp(&patterns, Some(1), &context)?.len(), 1);
        assert_eq!(evaluate_bgp(&patterns, Some(5), &context)?.len(), 3);
        assert_eq!(evaluate_bgp(&patterns, None, &context)?.len(), 3);
        Ok(())
    }
}
