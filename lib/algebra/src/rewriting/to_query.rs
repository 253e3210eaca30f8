use crate::paths::{compile_path, PropertyPath};
use crate::{Algebra, AlgebraError};
use rdf_walk_model::{
    is_temporary_variable, temporary_variable_name, BlankNode, Expression, GraphPattern,
    GroundTerm, Literal, NamedNodePattern, PropertyPathExpression, Query, Term, TermPattern,
    TriplePattern, Variable,
};
use rustc_hash::FxHashMap;
use std::cell::RefCell;

/// Translates an [Algebra] tree back into an equivalent `SELECT` query.
///
/// Evaluating the parsed query yields the same solutions as evaluating the tree. The query is not
/// necessarily the one the tree was created from. Specialized nodes are written in their
/// canonical form and temporary variables become blank nodes.
pub fn to_query(tree: &Algebra) -> Result<Query, AlgebraError> {
    let writer = QueryWriter::default();
    Ok(Query::Select {
        dataset: None,
        pattern: writer.write(tree)?,
        base_iri: None,
    })
}

#[derive(Default)]
struct QueryWriter {
    blank_nodes: RefCell<FxHashMap<Variable, BlankNode>>,
}

impl QueryWriter {
    fn write(&self, tree: &Algebra) -> Result<GraphPattern, AlgebraError> {
        Ok(match tree {
            Algebra::Bgp { patterns }
            | Algebra::AskBgp { patterns }
            | Algebra::LazyBgp { patterns, .. } => GraphPattern::Bgp {
                patterns: patterns
                    .iter()
                    .map(|p| self.triple_pattern(p))
                    .collect::<Result<_, _>>()?,
            },
            Algebra::Path {
                subject,
                path,
                object,
            } => match path.to_path_expression(false) {
                Some(path) => self.path(subject, path, object)?,
                None => self.write(&compile_path(path, subject.clone(), object.clone()))?,
            },
            Algebra::ZeroLengthPath { subject, object } => self.zero_length_path(subject, object)?,
            Algebra::ZeroOrOnePath {
                subject,
                path,
                object,
            } => self.closure(subject, path, object, PropertyPathExpression::ZeroOrOne)?,
            Algebra::ZeroOrMorePath {
                subject,
                path,
                object,
            } => self.closure(subject, path, object, PropertyPathExpression::ZeroOrMore)?,
            Algebra::OneOrMorePath {
                subject,
                path,
                object,
            } => self.closure(subject, path, object, PropertyPathExpression::OneOrMore)?,
            Algebra::NegatedPropertySet {
                subject,
                properties,
                object,
            } => self.path(
                subject,
                PropertyPathExpression::NegatedPropertySet(properties.clone()),
                object,
            )?,
            Algebra::Join { left, right } | Algebra::ParallelJoin { left, right } => {
                GraphPattern::Join {
                    left: Box::new(self.write(left)?),
                    right: Box::new(self.write(right)?),
                }
            }
            Algebra::LeftJoin {
                left,
                right,
                expression,
            } => GraphPattern::LeftJoin {
                left: Box::new(self.write(left)?),
                right: Box::new(self.write(right)?),
                expression: expression.clone(),
            },
            Algebra::Union { left, right }
            | Algebra::AskUnion { left, right }
            | Algebra::LazyUnion { left, right, .. } => GraphPattern::Union {
                left: Box::new(self.write(left)?),
                right: Box::new(self.write(right)?),
            },
            Algebra::Minus { left, right } => GraphPattern::Minus {
                left: Box::new(self.write(left)?),
                right: Box::new(self.write(right)?),
            },
            Algebra::Filter { inner, expression } => GraphPattern::Filter {
                expr: expression.clone(),
                inner: Box::new(self.write(inner)?),
            },
            Algebra::FilteredProduct {
                left,
                right,
                expression,
            } => GraphPattern::Filter {
                expr: expression.clone(),
                inner: Box::new(GraphPattern::Join {
                    left: Box::new(self.write(left)?),
                    right: Box::new(self.write(right)?),
                }),
            },
            Algebra::Extend {
                inner,
                variable,
                expression,
            } => GraphPattern::Extend {
                inner: Box::new(self.write(inner)?),
                variable: self.query_variable(variable)?,
                expression: expression.clone(),
            },
            Algebra::Distinct { inner } => GraphPattern::Distinct {
                inner: Box::new(self.write(inner)?),
            },
            Algebra::Reduced { inner } => GraphPattern::Reduced {
                inner: Box::new(self.write(inner)?),
            },
            Algebra::OrderBy { inner, expression } => GraphPattern::OrderBy {
                inner: Box::new(self.write(inner)?),
                expression: expression.clone(),
            },
            Algebra::Group {
                inner,
                variables,
                aggregates,
            } => GraphPattern::Group {
                inner: Box::new(self.write(inner)?),
                variables: variables.clone(),
                aggregates: aggregates.clone(),
            },
            Algebra::Slice {
                inner,
                start,
                length,
            } => GraphPattern::Slice {
                inner: Box::new(self.write(inner)?),
                start: *start,
                length: *length,
            },
            Algebra::Project { inner, variables } => GraphPattern::Project {
                inner: Box::new(self.write(inner)?),
                variables: variables
                    .iter()
                    .filter(|v| !is_temporary_variable(v))
                    .cloned()
                    .collect(),
            },
            Algebra::Values {
                variables,
                bindings,
            } => GraphPattern::Values {
                variables: variables.clone(),
                bindings: bindings
                    .iter()
                    .map(|row| {
                        row.iter()
                            .map(|term| term.clone().map(ground_term).transpose())
                            .collect::<Result<Vec<_>, _>>()
                    })
                    .collect::<Result<_, _>>()?,
            },
            Algebra::Graph { name, inner } => GraphPattern::Graph {
                name: name.clone(),
                inner: Box::new(self.write(inner)?),
            },
            Algebra::Service {
                name,
                inner,
                silent,
            } => GraphPattern::Service {
                name: name.clone(),
                inner: Box::new(self.write(inner)?),
                silent: *silent,
            },
        })
    }

    fn path(
        &self,
        subject: &TermPattern,
        path: PropertyPathExpression,
        object: &TermPattern,
    ) -> Result<GraphPattern, AlgebraError> {
        Ok(GraphPattern::Path {
            subject: self.term_pattern(subject)?,
            path,
            object: self.term_pattern(object)?,
        })
    }

    fn closure(
        &self,
        subject: &TermPattern,
        path: &PropertyPath,
        object: &TermPattern,
        closure: fn(Box<PropertyPathExpression>) -> PropertyPathExpression,
    ) -> Result<GraphPattern, AlgebraError> {
        let step = path.to_path_expression(true).ok_or_else(|| {
            AlgebraError::UnsupportedPattern(format!("The path {path} cannot be written as a query"))
        })?;
        self.path(subject, closure(Box::new(step)), object)
    }

    /// Zero-length paths have no syntax of their own. They are written as a binding of one
    /// endpoint to the other.
    fn zero_length_path(
        &self,
        subject: &TermPattern,
        object: &TermPattern,
    ) -> Result<GraphPattern, AlgebraError> {
        let identity = || GraphPattern::Bgp {
            patterns: Vec::new(),
        };
        Ok(match (subject, object) {
            (TermPattern::Variable(subject), TermPattern::Variable(object)) => {
                let subject = self.query_variable(subject)?;
                let object = self.query_variable(object)?;
                if subject == object {
                    return Ok(self.all_nodes(&subject));
                }
                GraphPattern::Extend {
                    inner: Box::new(self.all_nodes(&subject)),
                    variable: object,
                    expression: Expression::Variable(subject),
                }
            }
            (TermPattern::Variable(variable), term) | (term, TermPattern::Variable(variable)) => {
                GraphPattern::Extend {
                    inner: Box::new(identity()),
                    variable: self.query_variable(variable)?,
                    expression: term_expression(term_of(term)?)?,
                }
            }
            (subject, object) => {
                if term_of(subject)? == term_of(object)? {
                    identity()
                } else {
                    GraphPattern::Filter {
                        expr: Expression::Literal(Literal::from(false)),
                        inner: Box::new(identity()),
                    }
                }
            }
        })
    }

    /// Binds `variable` to every subject and object of the active graph, without duplicates.
    fn all_nodes(&self, variable: &Variable) -> GraphPattern {
        let helper = |suffix: &str| Variable::new_unchecked(format!("{}_{suffix}", variable.as_str()));
        let edge = |subject: TermPattern, object: TermPattern| GraphPattern::Bgp {
            patterns: vec![TriplePattern {
                subject,
                predicate: helper("p").into(),
                object,
            }],
        };
        GraphPattern::Distinct {
            inner: Box::new(GraphPattern::Project {
                inner: Box::new(GraphPattern::Union {
                    left: Box::new(edge(variable.clone().into(), helper("o").into())),
                    right: Box::new(edge(helper("s").into(), variable.clone().into())),
                }),
                variables: vec![variable.clone()],
            }),
        }
    }

    fn triple_pattern(&self, pattern: &TriplePattern) -> Result<TriplePattern, AlgebraError> {
        Ok(TriplePattern {
            subject: self.term_pattern(&pattern.subject)?,
            predicate: match &pattern.predicate {
                NamedNodePattern::Variable(v) => self.query_variable(v)?.into(),
                predicate => predicate.clone(),
            },
            object: self.term_pattern(&pattern.object)?,
        })
    }

    fn term_pattern(&self, pattern: &TermPattern) -> Result<TermPattern, AlgebraError> {
        Ok(match pattern {
            TermPattern::Variable(v) if is_temporary_variable(v) => self.blank_node(v).into(),
            TermPattern::BlankNode(node) => {
                return Err(AlgebraError::NotExpressible(node.clone().into()))
            }
            pattern => pattern.clone(),
        })
    }

    /// Returns the blank node that stands for a temporary variable.
    fn blank_node(&self, variable: &Variable) -> BlankNode {
        self.blank_nodes
            .borrow_mut()
            .entry(variable.clone())
            .or_insert_with(|| {
                temporary_variable_name(variable)
                    .and_then(|name| BlankNode::new(name).ok())
                    .unwrap_or_default()
            })
            .clone()
    }

    /// Temporary variables can only be written in positions that accept blank nodes.
    fn query_variable(&self, variable: &Variable) -> Result<Variable, AlgebraError> {
        if is_temporary_variable(variable) {
            return Err(AlgebraError::UnsupportedPattern(format!(
                "The internal variable {variable} cannot be written as a query variable"
            )));
        }
        Ok(variable.clone())
    }
}

fn term_of(pattern: &TermPattern) -> Result<Term, AlgebraError> {
    match pattern {
        TermPattern::NamedNode(node) => Ok(node.clone().into()),
        TermPattern::Literal(literal) => Ok(literal.clone().into()),
        TermPattern::BlankNode(node) => Err(AlgebraError::NotExpressible(node.clone().into())),
        other => Err(AlgebraError::UnsupportedPattern(other.to_string())),
    }
}

fn term_expression(term: Term) -> Result<Expression, AlgebraError> {
    match term {
        Term::NamedNode(node) => Ok(Expression::NamedNode(node)),
        Term::Literal(literal) => Ok(Expression::Literal(literal)),
        other => Err(AlgebraError::NotExpressible(other)),
    }
}

fn ground_term(term: Term) -> Result<GroundTerm, AlgebraError> {
    match term {
        Term::NamedNode(node) => Ok(GroundTerm::NamedNode(node)),
        Term::Literal(literal) => Ok(GroundTerm::Literal(literal)),
        other => Err(AlgebraError::NotExpressible(other)),
    }
}
