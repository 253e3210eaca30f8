use crate::optimizer::OptimizerPass;
use crate::tree::Transformed;
use crate::variables::{expression_variables, pattern_variables};
use crate::Algebra;
use rdf_walk_model::{vocab::rdf, NamedNodePattern, TermPattern, TriplePattern, Variable};
use rustc_hash::FxHashSet;

/// Reorders the triple patterns of basic graph patterns such that selective patterns are matched
/// first.
///
/// The order is chosen greedily. Each step picks the pattern with the most bound positions, where
/// a position is bound if it holds a term or a variable of an already picked pattern. Subjects
/// weigh more than objects, objects more than predicates, and `rdf:type` does not count. Patterns
/// that bind variables of an enclosing filter are preferred, and patterns that are connected to
/// the already picked ones are always picked before unconnected ones. Ties keep the original
/// order.
///
/// ```text
/// Bgp: ?s ?p ?o . ?s <p> <o>
/// ```
///
/// becomes
///
/// ```text
/// Bgp: ?s <p> <o> . ?s ?p ?o
/// ```
#[derive(Debug, Default)]
pub struct BgpReorderingPass;

impl BgpReorderingPass {
    /// Creates a [BgpReorderingPass].
    pub fn new() -> Self {
        Self
    }

    fn reorder(&self, tree: Algebra, filter_variables: &FxHashSet<Variable>) -> Transformed<Algebra> {
        match tree {
            Algebra::Bgp { patterns } => {
                let reordered = reorder_patterns(&patterns, filter_variables);
                if reordered == patterns {
                    Transformed::no(Algebra::Bgp { patterns })
                } else {
                    Transformed::yes(Algebra::Bgp {
                        patterns: reordered,
                    })
                }
            }
            Algebra::Filter { inner, expression } => {
                let mut filter_variables = filter_variables.clone();
                filter_variables.extend(expression_variables(&expression));
                self.reorder(*inner, &filter_variables)
                    .map_data(|inner| Algebra::filter(inner, expression))
            }
            tree => tree.map_children(&mut |child| self.reorder(child, filter_variables)),
        }
    }
}

impl OptimizerPass for BgpReorderingPass {
    fn name(&self) -> &str {
        "bgp-reordering"
    }

    fn rewrite(&self, tree: Algebra) -> Transformed<Algebra> {
        self.reorder(tree, &FxHashSet::default())
    }
}

fn reorder_patterns(
    patterns: &[TriplePattern],
    filter_variables: &FxHashSet<Variable>,
) -> Vec<TriplePattern> {
    let mut remaining = patterns.iter().collect::<Vec<_>>();
    let mut bound = FxHashSet::default();
    let mut result = Vec::with_capacity(patterns.len());

    while !remaining.is_empty() {
        let any_connected = remaining.iter().any(|p| is_connected(p, &bound));
        let mut best: Option<(usize, usize)> = None;
        for (index, pattern) in remaining.iter().enumerate() {
            if any_connected && !is_connected(pattern, &bound) {
                continue;
            }
            let score = score(pattern, &bound, filter_variables);
            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((index, score));
            }
        }

        let index = best.map_or(0, |(index, _)| index);
        let pattern = remaining.remove(index);
        bound.extend(pattern_variables(pattern).cloned());
        result.push(pattern.clone());
    }

    result
}

fn is_connected(pattern: &TriplePattern, bound: &FxHashSet<Variable>) -> bool {
    pattern_variables(pattern).any(|v| bound.contains(v))
}

fn score(
    pattern: &TriplePattern,
    bound: &FxHashSet<Variable>,
    filter_variables: &FxHashSet<Variable>,
) -> usize {
    let is_bound = |term: &TermPattern| match term {
        TermPattern::Variable(v) => bound.contains(v),
        _ => true,
    };

    let mut score = 0;
    if is_bound(&pattern.subject) {
        score += 4;
    }
    if is_bound(&pattern.object) {
        score += 2;
    }
    match &pattern.predicate {
        NamedNodePattern::NamedNode(p) if p.as_ref() == rdf::TYPE => {}
        NamedNodePattern::NamedNode(_) => score += 1,
        NamedNodePattern::Variable(v) if bound.contains(v) => score += 1,
        NamedNodePattern::Variable(_) => {}
    }

    let mut seen = FxHashSet::default();
    score
        + pattern_variables(pattern)
            .filter(|v| !bound.contains(*v) && filter_variables.contains(*v) && seen.insert(*v))
            .count()
}
