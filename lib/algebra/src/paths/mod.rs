mod compiler;

pub use compiler::compile_path;

use rdf_walk_model::{NamedNode, PropertyPathExpression};
use std::fmt::{Display, Formatter};

/// A property path over predicate edges.
///
/// In addition to the operators of the SPARQL grammar, paths may carry explicit cardinalities
/// (`p{n}` and `p{n,m}`).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PropertyPath {
    Predicate(NamedNode),
    Inverse(Box<PropertyPath>),
    Sequence(Box<PropertyPath>, Box<PropertyPath>),
    Alternative(Box<PropertyPath>, Box<PropertyPath>),
    ZeroOrOne(Box<PropertyPath>),
    ZeroOrMore(Box<PropertyPath>),
    OneOrMore(Box<PropertyPath>),
    /// Exactly `count` repetitions of the path.
    FixedCardinality(Box<PropertyPath>, usize),
    /// Between `min` and `max` (inclusive) repetitions of the path. No `max` means unbounded.
    Cardinality {
        path: Box<PropertyPath>,
        min: usize,
        max: Option<usize>,
    },
    /// Any predicate that is not part of the set.
    NegatedPropertySet(Vec<NamedNode>),
}

impl PropertyPath {
    /// Returns whether the number of edges traversed by this path is not fixed. Renaming variables
    /// across such paths is not supported.
    pub fn has_variable_cardinality(&self) -> bool {
        match self {
            PropertyPath::Predicate(_) | PropertyPath::NegatedPropertySet(_) => false,
            PropertyPath::Inverse(inner) | PropertyPath::FixedCardinality(inner, _) => {
                inner.has_variable_cardinality()
            }
            PropertyPath::Sequence(lhs, rhs) | PropertyPath::Alternative(lhs, rhs) => {
                lhs.has_variable_cardinality() || rhs.has_variable_cardinality()
            }
            PropertyPath::ZeroOrOne(_)
            | PropertyPath::ZeroOrMore(_)
            | PropertyPath::OneOrMore(_) => true,
            PropertyPath::Cardinality { path, min, max } => {
                *max != Some(*min) || path.has_variable_cardinality()
            }
        }
    }

    /// Returns an equivalent [PropertyPathExpression], if one exists.
    ///
    /// Some explicit cardinalities cannot be expressed in the SPARQL path grammar. If
    /// `set_semantics` is true, the caller only relies on the set of reachable node pairs (e.g., the
    /// path is the operand of a closure). This allows expressing more paths.
    pub fn to_path_expression(&self, set_semantics: bool) -> Option<PropertyPathExpression> {
        Some(match self {
            PropertyPath::Predicate(p) => PropertyPathExpression::NamedNode(p.clone()),
            PropertyPath::Inverse(inner) => {
                PropertyPathExpression::Reverse(Box::new(inner.to_path_expression(set_semantics)?))
            }
            PropertyPath::Sequence(lhs, rhs) => PropertyPathExpression::Sequence(
                Box::new(lhs.to_path_expression(set_semantics)?),
                Box::new(rhs.to_path_expression(set_semantics)?),
            ),
            PropertyPath::Alternative(lhs, rhs) => PropertyPathExpression::Alternative(
                Box::new(lhs.to_path_expression(set_semantics)?),
                Box::new(rhs.to_path_expression(set_semantics)?),
            ),
            PropertyPath::ZeroOrOne(inner) => {
                PropertyPathExpression::ZeroOrOne(Box::new(inner.to_path_expression(true)?))
            }
            PropertyPath::ZeroOrMore(inner) => {
                PropertyPathExpression::ZeroOrMore(Box::new(inner.to_path_expression(true)?))
            }
            PropertyPath::OneOrMore(inner) => {
                PropertyPathExpression::OneOrMore(Box::new(inner.to_path_expression(true)?))
            }
            PropertyPath::FixedCardinality(inner, count) => {
                repeat(&inner.to_path_expression(set_semantics)?, *count)?
            }
            PropertyPath::Cardinality { path, min, max } => match (*min, *max) {
                (0, None) => {
                    PropertyPathExpression::ZeroOrMore(Box::new(path.to_path_expression(true)?))
                }
                (min, None) => {
                    let plus =
                        PropertyPathExpression::OneOrMore(Box::new(path.to_path_expression(true)?));
                    match repeat(&path.to_path_expression(set_semantics)?, min - 1) {
                        Some(prefix) => {
                            PropertyPathExpression::Sequence(Box::new(prefix), Box::new(plus))
                        }
                        None => plus,
                    }
                }
                (0, Some(max)) if set_semantics && max > 0 => PropertyPathExpression::ZeroOrOne(
                    Box::new(alternatives(&path.to_path_expression(true)?, 1, max)?),
                ),
                (0, Some(_)) => return None,
                (min, Some(max)) => {
                    alternatives(&path.to_path_expression(set_semantics)?, min, max)?
                }
            },
            PropertyPath::NegatedPropertySet(properties) => {
                PropertyPathExpression::NegatedPropertySet(properties.clone())
            }
        })
    }
}

/// A sequence of `count` copies of `path`. Zero copies cannot be expressed.
fn repeat(path: &PropertyPathExpression, count: usize) -> Option<PropertyPathExpression> {
    if count == 0 {
        return None;
    }
    Some((1..count).fold(path.clone(), |acc, _| {
        PropertyPathExpression::Sequence(Box::new(acc), Box::new(path.clone()))
    }))
}

/// An alternative of all repetitions of `path` between `min` and `max`.
fn alternatives(
    path: &PropertyPathExpression,
    min: usize,
    max: usize,
) -> Option<PropertyPathExpression> {
    (min..=max)
        .map(|count| repeat(path, count))
        .collect::<Option<Vec<_>>>()?
        .into_iter()
        .reduce(|lhs, rhs| PropertyPathExpression::Alternative(Box::new(lhs), Box::new(rhs)))
}

impl From<&PropertyPathExpression> for PropertyPath {
    fn from(value: &PropertyPathExpression) -> Self {
        match value {
            PropertyPathExpression::NamedNode(p) => PropertyPath::Predicate(p.clone()),
            PropertyPathExpression::Reverse(inner) => {
                PropertyPath::Inverse(Box::new(inner.as_ref().into()))
            }
            PropertyPathExpression::Sequence(lhs, rhs) => PropertyPath::Sequence(
                Box::new(lhs.as_ref().into()),
                Box::new(rhs.as_ref().into()),
            ),
            PropertyPathExpression::Alternative(lhs, rhs) => PropertyPath::Alternative(
                Box::new(lhs.as_ref().into()),
                Box::new(rhs.as_ref().into()),
            ),
            PropertyPathExpression::ZeroOrOne(inner) => {
                PropertyPath::ZeroOrOne(Box::new(inner.as_ref().into()))
            }
            PropertyPathExpression::ZeroOrMore(inner) => {
                PropertyPath::ZeroOrMore(Box::new(inner.as_ref().into()))
            }
            PropertyPathExpression::OneOrMore(inner) => {
                PropertyPath::OneOrMore(Box::new(inner.as_ref().into()))
            }
            PropertyPathExpression::NegatedPropertySet(properties) => {
                PropertyPath::NegatedPropertySet(properties.clone())
            }
        }
    }
}

impl Display for PropertyPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PropertyPath::Predicate(p) => write!(f, "{p}"),
            PropertyPath::Inverse(inner) => write!(f, "^{inner}"),
            PropertyPath::Sequence(lhs, rhs) => write!(f, "({lhs} / {rhs})"),
            PropertyPath::Alternative(lhs, rhs) => write!(f, "({lhs} | {rhs})"),
            PropertyPath::ZeroOrOne(inner) => write!(f, "{inner}?"),
            PropertyPath::ZeroOrMore(inner) => write!(f, "{inner}*"),
            PropertyPath::OneOrMore(inner) => write!(f, "{inner}+"),
            PropertyPath::FixedCardinality(inner, count) => write!(f, "{inner}{{{count}}}"),
            PropertyPath::Cardinality { path, min, max } => match max {
                Some(max) => write!(f, "{path}{{{min},{max}}}"),
                None => write!(f, "{path}{{{min},}}"),
            },
            PropertyPath::NegatedPropertySet(properties) => {
                f.write_str("!(")?;
                for (i, p) in properties.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" | ")?;
                    }
                    write!(f, "{p}")?;
                }
                f.write_str(")")
            }
        }
    }
}
