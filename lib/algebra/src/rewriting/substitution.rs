use crate::Algebra;
use rdf_walk_model::{
    Expression, NamedNodePattern, OrderExpression, TermPattern, TriplePattern, Variable,
};

/// Renames a variable throughout an [Algebra] tree.
///
/// The renaming is all or nothing. [VariableSubstitution::apply] returns `None` if the variable
/// occurs inside a sub-tree where renaming it could change the result:
/// - nested projections, groups, inline data, and services (they define their own scope),
/// - property paths of variable cardinality (including closures),
/// - an `Extend` that binds either of the two variables,
/// - expressions that contain `EXISTS`.
///
/// Sub-trees that do not mention the variable are kept as they are.
#[derive(Clone, Debug)]
pub struct VariableSubstitution {
    from: Variable,
    to: Variable,
}

impl VariableSubstitution {
    /// Creates a substitution that replaces `from` with `to`.
    pub fn new(from: Variable, to: Variable) -> Self {
        Self { from, to }
    }

    /// Applies the substitution to `tree`.
    pub fn apply(&self, tree: &Algebra) -> Option<Algebra> {
        if !tree.mentions_variable(&self.from) {
            return Some(tree.clone());
        }

        Some(match tree {
            Algebra::Bgp { patterns } => Algebra::Bgp {
                patterns: self.patterns(patterns),
            },
            Algebra::AskBgp { patterns } => Algebra::AskBgp {
                patterns: self.patterns(patterns),
            },
            Algebra::LazyBgp { patterns, limit } => Algebra::LazyBgp {
                patterns: self.patterns(patterns),
                limit: *limit,
            },
            Algebra::Path {
                subject,
                path,
                object,
            } => {
                if path.has_variable_cardinality() {
                    return None;
                }
                Algebra::Path {
                    subject: self.term_pattern(subject),
                    path: path.clone(),
                    object: self.term_pattern(object),
                }
            }
            Algebra::ZeroLengthPath { subject, object } => Algebra::ZeroLengthPath {
                subject: self.term_pattern(subject),
                object: self.term_pattern(object),
            },
            Algebra::NegatedPropertySet {
                subject,
                properties,
                object,
            } => Algebra::NegatedPropertySet {
                subject: self.term_pattern(subject),
                properties: properties.clone(),
                object: self.term_pattern(object),
            },
            Algebra::ZeroOrOnePath { .. }
            | Algebra::ZeroOrMorePath { .. }
            | Algebra::OneOrMorePath { .. }
            | Algebra::Project { .. }
            | Algebra::Group { .. }
            | Algebra::Values { .. }
            | Algebra::Service { .. } => return None,
            Algebra::Join { left, right } => Algebra::Join {
                left: self.child(left)?,
                right: self.child(right)?,
            },
            Algebra::ParallelJoin { left, right } => Algebra::ParallelJoin {
                left: self.child(left)?,
                right: self.child(right)?,
            },
            Algebra::LeftJoin {
                left,
                right,
                expression,
            } => Algebra::LeftJoin {
                left: self.child(left)?,
                right: self.child(right)?,
                expression: match expression {
                    Some(expression) => Some(self.expression(expression)?),
                    None => None,
                },
            },
            Algebra::Union { left, right } => Algebra::Union {
                left: self.child(left)?,
                right: self.child(right)?,
            },
            Algebra::AskUnion { left, right } => Algebra::AskUnion {
                left: self.child(left)?,
                right: self.child(right)?,
            },
            Algebra::LazyUnion { left, right, limit } => Algebra::LazyUnion {
                left: self.child(left)?,
                right: self.child(right)?,
                limit: *limit,
            },
            Algebra::Minus { left, right } => Algebra::Minus {
                left: self.child(left)?,
                right: self.child(right)?,
            },
            Algebra::Filter { inner, expression } => Algebra::Filter {
                inner: self.child(inner)?,
                expression: self.expression(expression)?,
            },
            Algebra::FilteredProduct {
                left,
                right,
                expression,
            } => Algebra::FilteredProduct {
                left: self.child(left)?,
                right: self.child(right)?,
                expression: self.expression(expression)?,
            },
            Algebra::Extend {
                inner,
                variable,
                expression,
            } => {
                if *variable == self.from || *variable == self.to {
                    return None;
                }
                Algebra::Extend {
                    inner: self.child(inner)?,
                    variable: variable.clone(),
                    expression: self.expression(expression)?,
                }
            }
            Algebra::Distinct { inner } => Algebra::Distinct {
                inner: self.child(inner)?,
            },
            Algebra::Reduced { inner } => Algebra::Reduced {
                inner: self.child(inner)?,
            },
            Algebra::OrderBy { inner, expression } => Algebra::OrderBy {
                inner: self.child(inner)?,
                expression: expression
                    .iter()
                    .map(|e| {
                        Some(match e {
                            OrderExpression::Asc(e) => OrderExpression::Asc(self.expression(e)?),
                            OrderExpression::Desc(e) => OrderExpression::Desc(self.expression(e)?),
                        })
                    })
                    .collect::<Option<Vec<_>>>()?,
            },
            Algebra::Slice {
                inner,
                start,
                length,
            } => Algebra::Slice {
                inner: self.child(inner)?,
                start: *start,
                length: *length,
            },
            Algebra::Graph { name, inner } => Algebra::Graph {
                name: match name {
                    NamedNodePattern::Variable(v) if *v == self.from => self.to.clone().into(),
                    name => name.clone(),
                },
                inner: self.child(inner)?,
            },
        })
    }

    fn child(&self, child: &Algebra) -> Option<Box<Algebra>> {
        self.apply(child).map(Box::new)
    }

    fn patterns(&self, patterns: &[TriplePattern]) -> Vec<TriplePattern> {
        patterns
            .iter()
            .map(|pattern| TriplePattern {
                subject: self.term_pattern(&pattern.subject),
                predicate: match &pattern.predicate {
                    NamedNodePattern::Variable(v) if *v == self.from => self.to.clone().into(),
                    predicate => predicate.clone(),
                },
                object: self.term_pattern(&pattern.object),
            })
            .collect()
    }

    fn term_pattern(&self, pattern: &TermPattern) -> TermPattern {
        match pattern {
            TermPattern::Variable(v) if *v == self.from => self.to.clone().into(),
            pattern => pattern.clone(),
        }
    }

    fn variable(&self, variable: &Variable) -> Variable {
        if *variable == self.from {
            self.to.clone()
        } else {
            variable.clone()
        }
    }

    fn expression(&self, expression: &Expression) -> Option<Expression> {
        let binary = |lhs: &Expression, rhs: &Expression| -> Option<(Box<Expression>, Box<Expression>)> {
            Some((Box::new(self.expression(lhs)?), Box::new(self.expression(rhs)?)))
        };
        let list = |list: &[Expression]| -> Option<Vec<Expression>> {
            list.iter().map(|e| self.expression(e)).collect()
        };

        Some(match expression {
            Expression::NamedNode(_) | Expression::Literal(_) => expression.clone(),
            Expression::Variable(v) => Expression::Variable(self.variable(v)),
            Expression::Bound(v) => Expression::Bound(self.variable(v)),
            Expression::Or(lhs, rhs) => {
                let (lhs, rhs) = binary(lhs, rhs)?;
                Expression::Or(lhs, rhs)
            }
            Expression::And(lhs, rhs) => {
                let (lhs, rhs) = binary(lhs, rhs)?;
                Expression::And(lhs, rhs)
            }
            Expression::Equal(lhs, rhs) => {
                let (lhs, rhs) = binary(lhs, rhs)?;
                Expression::Equal(lhs, rhs)
            }
            Expression::SameTerm(lhs, rhs) => {
                let (lhs, rhs) = binary(lhs, rhs)?;
                Expression::SameTerm(lhs, rhs)
            }
            Expression::Greater(lhs, rhs) => {
                let (lhs, rhs) = binary(lhs, rhs)?;
                Expression::Greater(lhs, rhs)
            }
            Expression::GreaterOrEqual(lhs, rhs) => {
                let (lhs, rhs) = binary(lhs, rhs)?;
                Expression::GreaterOrEqual(lhs, rhs)
            }
            Expression::Less(lhs, rhs) => {
                let (lhs, rhs) = binary(lhs, rhs)?;
                Expression::Less(lhs, rhs)
            }
            Expression::LessOrEqual(lhs, rhs) => {
                let (lhs, rhs) = binary(lhs, rhs)?;
                Expression::LessOrEqual(lhs, rhs)
            }
            Expression::Add(lhs, rhs) => {
                let (lhs, rhs) = binary(lhs, rhs)?;
                Expression::Add(lhs, rhs)
            }
            Expression::Subtract(lhs, rhs) => {
                let (lhs, rhs) = binary(lhs, rhs)?;
                Expression::Subtract(lhs, rhs)
            }
            Expression::Multiply(lhs, rhs) => {
                let (lhs, rhs) = binary(lhs, rhs)?;
                Expression::Multiply(lhs, rhs)
            }
            Expression::Divide(lhs, rhs) => {
                let (lhs, rhs) = binary(lhs, rhs)?;
                Expression::Divide(lhs, rhs)
            }
            Expression::In(inner, items) => {
                Expression::In(Box::new(self.expression(inner)?), list(items)?)
            }
            Expression::UnaryPlus(inner) => Expression::UnaryPlus(Box::new(self.expression(inner)?)),
            Expression::UnaryMinus(inner) => {
                Expression::UnaryMinus(Box::new(self.expression(inner)?))
            }
            Expression::Not(inner) => Expression::Not(Box::new(self.expression(inner)?)),
            Expression::Exists(_) => return None,
            Expression::If(condition, then, otherwise) => Expression::If(
                Box::new(self.expression(condition)?),
                Box::new(self.expression(then)?),
                Box::new(self.expression(otherwise)?),
            ),
            Expression::Coalesce(items) => Expression::Coalesce(list(items)?),
            Expression::FunctionCall(function, args) => {
                Expression::FunctionCall(function.clone(), list(args)?)
            }
        })
    }
}
