use crate::paths::PropertyPath;
use crate::{Algebra, AlgebraError};
use rdf_walk_model::{
    blank_node_variable, GraphPattern, GroundTerm, Term, TermPattern, TriplePattern,
};

/// Translates a parsed graph pattern into an [Algebra] tree.
///
/// Blank nodes of the pattern act as variables that are not part of the result. They become
/// temporary variables. Property paths are kept as [Algebra::Path] nodes and compiled during
/// evaluation.
pub fn from_sparql(pattern: &GraphPattern) -> Result<Algebra, AlgebraError> {
    GraphPatternRewriter.rewrite(pattern)
}

struct GraphPatternRewriter;

impl GraphPatternRewriter {
    fn rewrite(&self, pattern: &GraphPattern) -> Result<Algebra, AlgebraError> {
        Ok(match pattern {
            GraphPattern::Bgp { patterns } => Algebra::Bgp {
                patterns: patterns.iter().map(rewrite_triple_pattern).collect(),
            },
            GraphPattern::Path {
                subject,
                path,
                object,
            } => Algebra::Path {
                subject: rewrite_term_pattern(subject),
                path: PropertyPath::from(path),
                object: rewrite_term_pattern(object),
            },
            GraphPattern::Join { left, right } => Algebra::Join {
                left: Box::new(self.rewrite(left)?),
                right: Box::new(self.rewrite(right)?),
            },
            GraphPattern::LeftJoin {
                left,
                right,
                expression,
            } => Algebra::LeftJoin {
                left: Box::new(self.rewrite(left)?),
                right: Box::new(self.rewrite(right)?),
                expression: expression.clone(),
            },
            GraphPattern::Filter { expr, inner } => {
                Algebra::filter(self.rewrite(inner)?, expr.clone())
            }
            GraphPattern::Union { left, right } => {
                Algebra::union(self.rewrite(left)?, self.rewrite(right)?)
            }
            GraphPattern::Graph { name, inner } => Algebra::Graph {
                name: name.clone(),
                inner: Box::new(self.rewrite(inner)?),
            },
            GraphPattern::Extend {
                inner,
                variable,
                expression,
            } => Algebra::Extend {
                inner: Box::new(self.rewrite(inner)?),
                variable: variable.clone(),
                expression: expression.clone(),
            },
            GraphPattern::Minus { left, right } => Algebra::Minus {
                left: Box::new(self.rewrite(left)?),
                right: Box::new(self.rewrite(right)?),
            },
            GraphPattern::Values {
                variables,
                bindings,
            } => Algebra::Values {
                variables: variables.clone(),
                bindings: bindings
                    .iter()
                    .map(|row| {
                        row.iter()
                            .map(|term| term.as_ref().map(ground_term_to_term).transpose())
                            .collect::<Result<Vec<_>, _>>()
                    })
                    .collect::<Result<Vec<_>, _>>()?,
            },
            GraphPattern::OrderBy { inner, expression } => Algebra::OrderBy {
                inner: Box::new(self.rewrite(inner)?),
                expression: expression.clone(),
            },
            GraphPattern::Project { inner, variables } => {
                Algebra::project(self.rewrite(inner)?, variables.clone())
            }
            GraphPattern::Distinct { inner } => Algebra::Distinct {
                inner: Box::new(self.rewrite(inner)?),
            },
            GraphPattern::Reduced { inner } => Algebra::Reduced {
                inner: Box::new(self.rewrite(inner)?),
            },
            GraphPattern::Slice {
                inner,
                start,
                length,
            } => Algebra::Slice {
                inner: Box::new(self.rewrite(inner)?),
                start: *start,
                length: *length,
            },
            GraphPattern::Group {
                inner,
                variables,
                aggregates,
            } => Algebra::Group {
                inner: Box::new(self.rewrite(inner)?),
                variables: variables.clone(),
                aggregates: aggregates.clone(),
            },
            GraphPattern::Service {
                name,
                inner,
                silent,
            } => Algebra::Service {
                name: name.clone(),
                inner: Box::new(self.rewrite(inner)?),
                silent: *silent,
            },
            #[allow(unreachable_patterns)]
            pattern => return Err(AlgebraError::UnsupportedPattern(pattern.to_string())),
        })
    }
}

fn rewrite_triple_pattern(pattern: &TriplePattern) -> TriplePattern {
    TriplePattern {
        subject: rewrite_term_pattern(&pattern.subject),
        predicate: pattern.predicate.clone(),
        object: rewrite_term_pattern(&pattern.object),
    }
}

fn rewrite_term_pattern(pattern: &TermPattern) -> TermPattern {
    match pattern {
        TermPattern::BlankNode(blank_node) => blank_node_variable(blank_node).into(),
        other => other.clone(),
    }
}

fn ground_term_to_term(term: &GroundTerm) -> Result<Term, AlgebraError> {
    match term {
        GroundTerm::NamedNode(node) => Ok(node.clone().into()),
        GroundTerm::Literal(literal) => Ok(literal.clone().into()),
        #[allow(unreachable_patterns)]
        other => Err(AlgebraError::UnsupportedPattern(other.to_string())),
    }
}
