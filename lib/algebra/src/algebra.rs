use crate::paths::PropertyPath;
use crate::tree::Transformed;
use itertools::Itertools;
use rdf_walk_model::{
    AggregateExpression, Expression, NamedNode, NamedNodePattern, OrderExpression, Term,
    TermPattern, TriplePattern, Variable,
};
use std::fmt::{Display, Formatter};

/// A node of an algebra tree.
///
/// Trees are immutable. Optimizer passes and other rewrites build new trees instead of changing
/// existing ones. Besides the canonical operators, the tree may contain specialized variants
/// (e.g., [Algebra::AskBgp], [Algebra::FilteredProduct]) that are introduced by the optimizer and
/// evaluate to the same result as their canonical counterparts.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Algebra {
    /// A basic graph pattern. An empty pattern evaluates to the identity multiset.
    Bgp { patterns: Vec<TriplePattern> },
    /// A basic graph pattern that stops after the first solution.
    AskBgp { patterns: Vec<TriplePattern> },
    /// A basic graph pattern that stops after `limit` solutions.
    LazyBgp {
        patterns: Vec<TriplePattern>,
        limit: usize,
    },
    /// A property path that is compiled into an equivalent sub-tree upon evaluation.
    Path {
        subject: TermPattern,
        path: PropertyPath,
        object: TermPattern,
    },
    /// Matches every node with itself.
    ZeroLengthPath {
        subject: TermPattern,
        object: TermPattern,
    },
    /// Matches the zero-length path and a single step of `path`. Pairs are distinct.
    ZeroOrOnePath {
        subject: TermPattern,
        path: PropertyPath,
        object: TermPattern,
    },
    /// The reflexive and transitive closure of `path`. Pairs are distinct.
    ZeroOrMorePath {
        subject: TermPattern,
        path: PropertyPath,
        object: TermPattern,
    },
    /// The transitive closure of `path`. Pairs are distinct.
    OneOrMorePath {
        subject: TermPattern,
        path: PropertyPath,
        object: TermPattern,
    },
    /// A single edge whose predicate is not part of `properties`.
    NegatedPropertySet {
        subject: TermPattern,
        properties: Vec<NamedNode>,
        object: TermPattern,
    },
    Join {
        left: Box<Algebra>,
        right: Box<Algebra>,
    },
    /// A join whose children may be evaluated on different threads.
    ParallelJoin {
        left: Box<Algebra>,
        right: Box<Algebra>,
    },
    LeftJoin {
        left: Box<Algebra>,
        right: Box<Algebra>,
        expression: Option<Expression>,
    },
    Union {
        left: Box<Algebra>,
        right: Box<Algebra>,
    },
    /// A union that skips the right child if the left child has a solution.
    AskUnion {
        left: Box<Algebra>,
        right: Box<Algebra>,
    },
    /// A union that skips the right child if the left child has `limit` solutions.
    LazyUnion {
        left: Box<Algebra>,
        right: Box<Algebra>,
        limit: usize,
    },
    Minus {
        left: Box<Algebra>,
        right: Box<Algebra>,
    },
    Filter {
        inner: Box<Algebra>,
        expression: Expression,
    },
    /// A filter over the cross product of two children that share no variables. The filter is
    /// applied while the pairs are generated.
    FilteredProduct {
        left: Box<Algebra>,
        right: Box<Algebra>,
        expression: Expression,
    },
    Extend {
        inner: Box<Algebra>,
        variable: Variable,
        expression: Expression,
    },
    Distinct {
        inner: Box<Algebra>,
    },
    Reduced {
        inner: Box<Algebra>,
    },
    OrderBy {
        inner: Box<Algebra>,
        expression: Vec<OrderExpression>,
    },
    Group {
        inner: Box<Algebra>,
        variables: Vec<Variable>,
        aggregates: Vec<(Variable, AggregateExpression)>,
    },
    Slice {
        inner: Box<Algebra>,
        start: usize,
        length: Option<usize>,
    },
    Project {
        inner: Box<Algebra>,
        variables: Vec<Variable>,
    },
    /// Inline data. `None` marks an unbound variable.
    Values {
        variables: Vec<Variable>,
        bindings: Vec<Vec<Option<Term>>>,
    },
    Graph {
        name: NamedNodePattern,
        inner: Box<Algebra>,
    },
    /// A pattern that must be dispatched to another endpoint.
    Service {
        name: NamedNodePattern,
        inner: Box<Algebra>,
        silent: bool,
    },
}

impl Algebra {
    /// The pattern that evaluates to the identity multiset (a single empty solution).
    pub fn identity() -> Self {
        Algebra::Bgp {
            patterns: Vec::new(),
        }
    }

    /// Returns whether this node evaluates to the identity multiset.
    pub fn is_identity(&self) -> bool {
        matches!(self, Algebra::Bgp { patterns } if patterns.is_empty())
    }

    /// Creates a join. Joins with the identity pattern are removed.
    pub fn join(left: Algebra, right: Algebra) -> Self {
        if left.is_identity() {
            return right;
        }
        if right.is_identity() {
            return left;
        }
        Algebra::Join {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Creates a union.
    pub fn union(left: Algebra, right: Algebra) -> Self {
        Algebra::Union {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Creates a filter.
    pub fn filter(inner: Algebra, expression: Expression) -> Self {
        Algebra::Filter {
            inner: Box::new(inner),
            expression,
        }
    }

    /// Creates a projection.
    pub fn project(inner: Algebra, variables: Vec<Variable>) -> Self {
        Algebra::Project {
            inner: Box::new(inner),
            variables,
        }
    }

    /// Returns the name of the operator.
    pub fn name(&self) -> &'static str {
        match self {
            Algebra::Bgp { .. } => "Bgp",
            Algebra::AskBgp { .. } => "AskBgp",
            Algebra::LazyBgp { .. } => "LazyBgp",
            Algebra::Path { .. } => "Path",
            Algebra::ZeroLengthPath { .. } => "ZeroLengthPath",
            Algebra::ZeroOrOnePath { .. } => "ZeroOrOnePath",
            Algebra::ZeroOrMorePath { .. } => "ZeroOrMorePath",
            Algebra::OneOrMorePath { .. } => "OneOrMorePath",
            Algebra::NegatedPropertySet { .. } => "NegatedPropertySet",
            Algebra::Join { .. } => "Join",
            Algebra::ParallelJoin { .. } => "ParallelJoin",
            Algebra::LeftJoin { .. } => "LeftJoin",
            Algebra::Union { .. } => "Union",
            Algebra::AskUnion { .. } => "AskUnion",
            Algebra::LazyUnion { .. } => "LazyUnion",
            Algebra::Minus { .. } => "Minus",
            Algebra::Filter { .. } => "Filter",
            Algebra::FilteredProduct { .. } => "FilteredProduct",
            Algebra::Extend { .. } => "Extend",
            Algebra::Distinct { .. } => "Distinct",
            Algebra::Reduced { .. } => "Reduced",
            Algebra::OrderBy { .. } => "OrderBy",
            Algebra::Group { .. } => "Group",
            Algebra::Slice { .. } => "Slice",
            Algebra::Project { .. } => "Project",
            Algebra::Values { .. } => "Values",
            Algebra::Graph { .. } => "Graph",
            Algebra::Service { .. } => "Service",
        }
    }

    /// Returns the direct children of this node.
    pub fn children(&self) -> Vec<&Algebra> {
        match self {
            Algebra::Bgp { .. }
            | Algebra::AskBgp { .. }
            | Algebra::LazyBgp { .. }
            | Algebra::Path { .. }
            | Algebra::ZeroLengthPath { .. }
            | Algebra::ZeroOrOnePath { .. }
            | Algebra::ZeroOrMorePath { .. }
            | Algebra::OneOrMorePath { .. }
            | Algebra::NegatedPropertySet { .. }
            | Algebra::Values { .. } => Vec::new(),
            Algebra::Join { left, right }
            | Algebra::ParallelJoin { left, right }
            | Algebra::LeftJoin { left, right, .. }
            | Algebra::Union { left, right }
            | Algebra::AskUnion { left, right }
            | Algebra::LazyUnion { left, right, .. }
            | Algebra::Minus { left, right }
            | Algebra::FilteredProduct { left, right, .. } => vec![left.as_ref(), right.as_ref()],
            Algebra::Filter { inner, .. }
            | Algebra::Extend { inner, .. }
            | Algebra::Distinct { inner }
            | Algebra::Reduced { inner }
            | Algebra::OrderBy { inner, .. }
            | Algebra::Group { inner, .. }
            | Algebra::Slice { inner, .. }
            | Algebra::Project { inner, .. }
            | Algebra::Graph { inner, .. }
            | Algebra::Service { inner, .. } => vec![inner.as_ref()],
        }
    }

    /// Applies `f` to every direct child and rebuilds this node from the results.
    pub fn map_children(
        self,
        f: &mut dyn FnMut(Algebra) -> Transformed<Algebra>,
    ) -> Transformed<Algebra> {
        let mut transformed = false;
        let mut apply = |child: Box<Algebra>| {
            let result = f(*child);
            transformed |= result.transformed;
            Box::new(result.data)
        };

        let data = match self {
            Algebra::Join { left, right } => Algebra::Join {
                left: apply(left),
                right: apply(right),
            },
            Algebra::ParallelJoin { left, right } => Algebra::ParallelJoin {
                left: apply(left),
                right: apply(right),
            },
            Algebra::LeftJoin {
                left,
                right,
                expression,
            } => Algebra::LeftJoin {
                left: apply(left),
                right: apply(right),
                expression,
            },
            Algebra::Union { left, right } => Algebra::Union {
                left: apply(left),
                right: apply(right),
            },
            Algebra::AskUnion { left, right } => Algebra::AskUnion {
                left: apply(left),
                right: apply(right),
            },
            Algebra::LazyUnion { left, right, limit } => Algebra::LazyUnion {
                left: apply(left),
                right: apply(right),
                limit,
            },
            Algebra::Minus { left, right } => Algebra::Minus {
                left: apply(left),
                right: apply(right),
            },
            Algebra::FilteredProduct {
                left,
                right,
                expression,
            } => Algebra::FilteredProduct {
                left: apply(left),
                right: apply(right),
                expression,
            },
            Algebra::Filter { inner, expression } => Algebra::Filter {
                inner: apply(inner),
                expression,
            },
            Algebra::Extend {
                inner,
                variable,
                expression,
            } => Algebra::Extend {
                inner: apply(inner),
                variable,
                expression,
            },
            Algebra::Distinct { inner } => Algebra::Distinct {
                inner: apply(inner),
            },
            Algebra::Reduced { inner } => Algebra::Reduced {
                inner: apply(inner),
            },
            Algebra::OrderBy { inner, expression } => Algebra::OrderBy {
                inner: apply(inner),
                expression,
            },
            Algebra::Group {
                inner,
                variables,
                aggregates,
            } => Algebra::Group {
                inner: apply(inner),
                variables,
                aggregates,
            },
            Algebra::Slice {
                inner,
                start,
                length,
            } => Algebra::Slice {
                inner: apply(inner),
                start,
                length,
            },
            Algebra::Project { inner, variables } => Algebra::Project {
                inner: apply(inner),
                variables,
            },
            Algebra::Graph { name, inner } => Algebra::Graph {
                name,
                inner: apply(inner),
            },
            Algebra::Service {
                name,
                inner,
                silent,
            } => Algebra::Service {
                name,
                inner: apply(inner),
                silent,
            },
            leaf @ (Algebra::Bgp { .. }
            | Algebra::AskBgp { .. }
            | Algebra::LazyBgp { .. }
            | Algebra::Path { .. }
            | Algebra::ZeroLengthPath { .. }
            | Algebra::ZeroOrOnePath { .. }
            | Algebra::ZeroOrMorePath { .. }
            | Algebra::OneOrMorePath { .. }
            | Algebra::NegatedPropertySet { .. }
            | Algebra::Values { .. }) => leaf,
        };

        Transformed { data, transformed }
    }

    /// Rewrites the tree bottom-up. `f` sees each node after its children have been rewritten.
    pub fn transform_up(
        self,
        f: &mut dyn FnMut(Algebra) -> Transformed<Algebra>,
    ) -> Transformed<Algebra> {
        let children = self.map_children(&mut |child| child.transform_up(&mut *f));
        let result = f(children.data);
        Transformed {
            data: result.data,
            transformed: children.transformed || result.transformed,
        }
    }

    /// Rewrites the tree top-down. `f` sees each node before its children are rewritten.
    pub fn transform_down(
        self,
        f: &mut dyn FnMut(Algebra) -> Transformed<Algebra>,
    ) -> Transformed<Algebra> {
        let result = f(self);
        let children = result.data.map_children(&mut |child| child.transform_down(&mut *f));
        Transformed {
            data: children.data,
            transformed: result.transformed || children.transformed,
        }
    }

    /// Returns whether `predicate` holds for this node or any node below it.
    pub fn any(&self, predicate: &dyn Fn(&Algebra) -> bool) -> bool {
        predicate(self) || self.children().into_iter().any(|child| child.any(predicate))
    }

    fn fmt_indented(&self, f: &mut Formatter<'_>, indent: usize) -> std::fmt::Result {
        write!(f, "{:width$}{}", "", self.name(), width = indent * 2)?;
        match self {
            Algebra::Bgp { patterns } | Algebra::AskBgp { patterns } => {
                write_patterns(f, patterns)?;
            }
            Algebra::LazyBgp { patterns, limit } => {
                write!(f, " (limit={limit})")?;
                write_patterns(f, patterns)?;
            }
            Algebra::Path {
                subject,
                path,
                object,
            }
            | Algebra::ZeroOrOnePath {
                subject,
                path,
                object,
            }
            | Algebra::ZeroOrMorePath {
                subject,
                path,
                object,
            }
            | Algebra::OneOrMorePath {
                subject,
                path,
                object,
            } => write!(f, ": {subject} {path} {object}")?,
            Algebra::ZeroLengthPath { subject, object } => write!(f, ": {subject} {object}")?,
            Algebra::NegatedPropertySet {
                subject,
                properties,
                object,
            } => write!(
                f,
                ": {subject} {} {object}",
                PropertyPath::NegatedPropertySet(properties.clone())
            )?,
            Algebra::LeftJoin {
                expression: Some(expression),
                ..
            }
            | Algebra::Filter { expression, .. }
            | Algebra::FilteredProduct { expression, .. } => write!(f, ": {expression}")?,
            Algebra::LazyUnion { limit, .. } => write!(f, " (limit={limit})")?,
            Algebra::Extend {
                variable,
                expression,
                ..
            } => write!(f, ": {variable} := {expression}")?,
            Algebra::OrderBy { expression, .. } => {
                f.write_str(":")?;
                for expression in expression {
                    write!(f, " {expression}")?;
                }
            }
            Algebra::Group {
                variables,
                aggregates,
                ..
            } => {
                f.write_str(":")?;
                write_variables(f, variables)?;
                for (variable, aggregate) in aggregates {
                    write!(f, " ({aggregate} AS {variable})")?;
                }
            }
            Algebra::Slice { start, length, .. } => match length {
                Some(length) => write!(f, ": start={start}, length={length}")?,
                None => write!(f, ": start={start}")?,
            },
            Algebra::Project { variables, .. } => {
                f.write_str(":")?;
                write_variables(f, variables)?;
            }
            Algebra::Values {
                variables,
                bindings,
            } => {
                f.write_str(":")?;
                write_variables(f, variables)?;
                write!(f, " ({} rows)", bindings.len())?;
            }
            Algebra::Graph { name, .. } => write!(f, ": {name}")?,
            Algebra::Service { name, silent, .. } => {
                write!(f, ": {name}")?;
                if *silent {
                    f.write_str(" (silent)")?;
                }
            }
            Algebra::LeftJoin {
                expression: None, ..
            }
            | Algebra::Join { .. }
            | Algebra::ParallelJoin { .. }
            | Algebra::Union { .. }
            | Algebra::AskUnion { .. }
            | Algebra::Minus { .. }
            | Algebra::Distinct { .. }
            | Algebra::Reduced { .. } => {}
        }

        for child in self.children() {
            writeln!(f)?;
            child.fmt_indented(f, indent + 1)?;
        }
        Ok(())
    }
}

fn write_patterns(f: &mut Formatter<'_>, patterns: &[TriplePattern]) -> std::fmt::Result {
    let patterns = patterns.iter().format_with(" .", |pattern, f| {
        f(&format_args!(
            " {} {} {}",
            pattern.subject, pattern.predicate, pattern.object
        ))
    });
    write!(f, ":{patterns}")
}

fn write_variables(f: &mut Formatter<'_>, variables: &[Variable]) -> std::fmt::Result {
    for variable in variables {
        write!(f, " {variable}")?;
    }
    Ok(())
}

impl Display for Algebra {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.fmt_indented(f, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(s: &str, p: &str, o: &str) -> TriplePattern {
        TriplePattern {
            subject: Variable::new_unchecked(s).into(),
            predicate: NamedNode::new_unchecked(format!("http://example.com/{p}")).into(),
            object: Variable::new_unchecked(o).into(),
        }
    }

    #[test]
    fn join_with_identity_is_removed() {
        let bgp = Algebra::Bgp {
            patterns: vec![pattern("s", "p", "o")],
        };
        assert_eq!(Algebra::join(Algebra::identity(), bgp.clone()), bgp);
        assert_eq!(Algebra::join(bgp.clone(), Algebra::identity()), bgp);
    }

    #[test]
    fn display_tree() {
        let tree = Algebra::project(
            Algebra::union(
                Algebra::Bgp {
                    patterns: vec![pattern("s", "p", "o")],
                },
                Algebra::Bgp {
                    patterns: vec![pattern("s", "q", "o"), pattern("o", "q", "x")],
                },
            ),
            vec![Variable::new_unchecked("s")],
        );

        assert_eq!(
            tree.to_string(),
            "Project: ?s\n  Union\n    Bgp: ?s <http://example.com/p> ?o\n    Bgp: ?s <http://example.com/q> ?o . ?o <http://example.com/q> ?x"
        );
    }

    #[test]
    fn transform_up_visits_children_first() {
        let tree = Algebra::union(Algebra::identity(), Algebra::identity());
        let mut visited = Vec::new();

        let result = tree.transform_up(&mut |node| {
            visited.push(node.name());
            Transformed::no(node)
        });

        assert!(!result.transformed);
        assert_eq!(visited, ["Bgp", "Bgp", "Union"]);
    }
}
