use crate::Algebra;
use rdf_walk_model::{
    AggregateExpression, Expression, Function, NamedNodePattern, OrderExpression, TermPattern,
    TriplePattern, Variable,
};
use rustc_hash::FxHashSet;

impl Algebra {
    /// Returns the variables that may be bound by a solution of this node, including temporary
    /// variables, in order of their first occurrence.
    pub fn in_scope_variables(&self) -> Vec<Variable> {
        let mut variables = Vec::new();
        self.collect_in_scope_variables(&mut variables);
        variables
    }

    fn collect_in_scope_variables(&self, variables: &mut Vec<Variable>) {
        let mut push = |variable: &Variable| {
            if !variables.contains(variable) {
                variables.push(variable.clone());
            }
        };

        match self {
            Algebra::Bgp { patterns }
            | Algebra::AskBgp { patterns }
            | Algebra::LazyBgp { patterns, .. } => {
                patterns.iter().flat_map(pattern_variables).for_each(push);
            }
            Algebra::Path {
                subject, object, ..
            }
            | Algebra::ZeroLengthPath { subject, object }
            | Algebra::ZeroOrOnePath {
                subject, object, ..
            }
            | Algebra::ZeroOrMorePath {
                subject, object, ..
            }
            | Algebra::OneOrMorePath {
                subject, object, ..
            }
            | Algebra::NegatedPropertySet {
                subject, object, ..
            } => {
                term_pattern_variable(subject).into_iter().for_each(&mut push);
                term_pattern_variable(object).into_iter().for_each(push);
            }
            Algebra::Join { left, right }
            | Algebra::ParallelJoin { left, right }
            | Algebra::LeftJoin { left, right, .. }
            | Algebra::Union { left, right }
            | Algebra::AskUnion { left, right }
            | Algebra::LazyUnion { left, right, .. }
            | Algebra::FilteredProduct { left, right, .. } => {
                left.collect_in_scope_variables(variables);
                right.collect_in_scope_variables(variables);
            }
            Algebra::Minus { left: inner, .. }
            | Algebra::Filter { inner, .. }
            | Algebra::Distinct { inner }
            | Algebra::Reduced { inner }
            | Algebra::OrderBy { inner, .. }
            | Algebra::Slice { inner, .. }
            | Algebra::Service { inner, .. } => inner.collect_in_scope_variables(variables),
            Algebra::Extend {
                inner, variable, ..
            } => {
                inner.collect_in_scope_variables(variables);
                if !variables.contains(variable) {
                    variables.push(variable.clone());
                }
            }
            Algebra::Group {
                variables: group_variables,
                aggregates,
                ..
            } => {
                group_variables
                    .iter()
                    .chain(aggregates.iter().map(|(v, _)| v))
                    .for_each(push);
            }
            Algebra::Project {
                variables: projection,
                ..
            }
            | Algebra::Values {
                variables: projection,
                ..
            } => projection.iter().for_each(push),
            Algebra::Graph { name, inner } => {
                if let NamedNodePattern::Variable(variable) = name {
                    push(variable);
                }
                inner.collect_in_scope_variables(variables);
            }
        }
    }

    /// Returns the variables that are bound in *every* solution of this node.
    pub fn fixed_variables(&self) -> FxHashSet<Variable> {
        match self {
            Algebra::Bgp { patterns }
            | Algebra::AskBgp { patterns }
            | Algebra::LazyBgp { patterns, .. } => {
                patterns.iter().flat_map(pattern_variables).cloned().collect()
            }
            Algebra::Path {
                subject, object, ..
            }
            | Algebra::ZeroLengthPath { subject, object }
            | Algebra::ZeroOrOnePath {
                subject, object, ..
            }
            | Algebra::ZeroOrMorePath {
                subject, object, ..
            }
            | Algebra::OneOrMorePath {
                subject, object, ..
            }
            | Algebra::NegatedPropertySet {
                subject, object, ..
            } => term_pattern_variable(subject)
                .into_iter()
                .chain(term_pattern_variable(object))
                .cloned()
                .collect(),
            Algebra::Join { left, right }
            | Algebra::ParallelJoin { left, right }
            | Algebra::FilteredProduct { left, right, .. } => {
                let mut variables = left.fixed_variables();
                variables.extend(right.fixed_variables());
                variables
            }
            Algebra::Union { left, right }
            | Algebra::AskUnion { left, right }
            | Algebra::LazyUnion { left, right, .. } => {
                let right = right.fixed_variables();
                left.fixed_variables()
                    .into_iter()
                    .filter(|v| right.contains(v))
                    .collect()
            }
            Algebra::LeftJoin { left: inner, .. }
            | Algebra::Minus { left: inner, .. }
            | Algebra::Filter { inner, .. }
            | Algebra::Extend { inner, .. }
            | Algebra::Distinct { inner }
            | Algebra::Reduced { inner }
            | Algebra::OrderBy { inner, .. }
            | Algebra::Slice { inner, .. } => inner.fixed_variables(),
            Algebra::Group {
                inner, variables, ..
            }
            | Algebra::Project { inner, variables } => {
                let mut fixed = inner.fixed_variables();
                fixed.retain(|v| variables.contains(v));
                fixed
            }
            Algebra::Values {
                variables,
                bindings,
            } => variables
                .iter()
                .enumerate()
                .filter(|(i, _)| {
                    bindings
                        .iter()
                        .all(|row| row.get(*i).is_some_and(Option::is_some))
                })
                .map(|(_, v)| v.clone())
                .collect(),
            Algebra::Graph { name, inner } => {
                let mut fixed = inner.fixed_variables();
                if let NamedNodePattern::Variable(variable) = name {
                    fixed.insert(variable.clone());
                }
                fixed
            }
            Algebra::Service { .. } => FxHashSet::default(),
        }
    }

    /// Returns the variables that are bound to an IRI or a blank node in *every* solution of this
    /// node. Equality on such a variable coincides with term identity.
    pub fn non_literal_variables(&self) -> FxHashSet<Variable> {
        match self {
            Algebra::Bgp { patterns }
            | Algebra::AskBgp { patterns }
            | Algebra::LazyBgp { patterns, .. } => patterns
                .iter()
                .flat_map(|pattern| {
                    let predicate = match &pattern.predicate {
                        NamedNodePattern::Variable(v) => Some(v),
                        NamedNodePattern::NamedNode(_) => None,
                    };
                    term_pattern_variable(&pattern.subject)
                        .into_iter()
                        .chain(predicate)
                })
                .cloned()
                .collect(),
            Algebra::NegatedPropertySet { subject, .. } => {
                term_pattern_variable(subject).into_iter().cloned().collect()
            }
            Algebra::Join { left, right }
            | Algebra::ParallelJoin { left, right }
            | Algebra::FilteredProduct { left, right, .. } => {
                let mut variables = left.non_literal_variables();
                variables.extend(right.non_literal_variables());
                variables
            }
            Algebra::Union { left, right }
            | Algebra::AskUnion { left, right }
            | Algebra::LazyUnion { left, right, .. } => {
                let right = right.non_literal_variables();
                left.non_literal_variables()
                    .into_iter()
                    .filter(|v| right.contains(v))
                    .collect()
            }
            Algebra::LeftJoin { left: inner, .. }
            | Algebra::Minus { left: inner, .. }
            | Algebra::Filter { inner, .. }
            | Algebra::Extend { inner, .. }
            | Algebra::Distinct { inner }
            | Algebra::Reduced { inner }
            | Algebra::OrderBy { inner, .. }
            | Algebra::Slice { inner, .. } => inner.non_literal_variables(),
            Algebra::Group {
                inner, variables, ..
            }
            | Algebra::Project { inner, variables } => {
                let mut non_literal = inner.non_literal_variables();
                non_literal.retain(|v| variables.contains(v));
                non_literal
            }
            Algebra::Graph { name, inner } => {
                let mut non_literal = inner.non_literal_variables();
                if let NamedNodePattern::Variable(variable) = name {
                    non_literal.insert(variable.clone());
                }
                non_literal
            }
            Algebra::Path { .. }
            | Algebra::ZeroLengthPath { .. }
            | Algebra::ZeroOrOnePath { .. }
            | Algebra::ZeroOrMorePath { .. }
            | Algebra::OneOrMorePath { .. }
            | Algebra::Values { .. }
            | Algebra::Service { .. } => FxHashSet::default(),
        }
    }

    /// Returns whether `variable` occurs anywhere in this tree, including expressions.
    pub fn mentions_variable(&self, variable: &Variable) -> bool {
        self.any(&|node| node.mentions_variable_locally(variable))
    }

    fn mentions_variable_locally(&self, variable: &Variable) -> bool {
        let in_expression = |expression: &Expression| expression_mentions(expression, variable);
        match self {
            Algebra::Bgp { patterns }
            | Algebra::AskBgp { patterns }
            | Algebra::LazyBgp { patterns, .. } => patterns
                .iter()
                .any(|p| pattern_variables(p).any(|v| v == variable)),
            Algebra::Path {
                subject, object, ..
            }
            | Algebra::ZeroLengthPath { subject, object }
            | Algebra::ZeroOrOnePath {
                subject, object, ..
            }
            | Algebra::ZeroOrMorePath {
                subject, object, ..
            }
            | Algebra::OneOrMorePath {
                subject, object, ..
            }
            | Algebra::NegatedPropertySet {
                subject, object, ..
            } => {
                term_pattern_variable(subject) == Some(variable)
                    || term_pattern_variable(object) == Some(variable)
            }
            Algebra::LeftJoin { expression, .. } => expression.as_ref().is_some_and(in_expression),
            Algebra::Filter { expression, .. } | Algebra::FilteredProduct { expression, .. } => {
                in_expression(expression)
            }
            Algebra::Extend {
                variable: target,
                expression,
                ..
            } => target == variable || in_expression(expression),
            Algebra::OrderBy { expression, .. } => expression.iter().any(|e| match e {
                OrderExpression::Asc(e) | OrderExpression::Desc(e) => in_expression(e),
            }),
            Algebra::Group {
                variables,
                aggregates,
                ..
            } => {
                variables.contains(variable)
                    || aggregates.iter().any(|(target, aggregate)| {
                        target == variable || aggregate_mentions(aggregate, variable)
                    })
            }
            Algebra::Project { variables, .. } | Algebra::Values { variables, .. } => {
                variables.contains(variable)
            }
            Algebra::Graph { name, .. } | Algebra::Service { name, .. } => {
                matches!(name, NamedNodePattern::Variable(v) if v == variable)
            }
            Algebra::Join { .. }
            | Algebra::ParallelJoin { .. }
            | Algebra::Union { .. }
            | Algebra::AskUnion { .. }
            | Algebra::LazyUnion { .. }
            | Algebra::Minus { .. }
            | Algebra::Distinct { .. }
            | Algebra::Reduced { .. }
            | Algebra::Slice { .. } => false,
        }
    }
}

/// Returns the variable of a pattern position, if any.
pub fn term_pattern_variable(pattern: &TermPattern) -> Option<&Variable> {
    match pattern {
        TermPattern::Variable(variable) => Some(variable),
        _ => None,
    }
}

/// Iterates over the variables of a triple pattern (with repetitions).
pub fn pattern_variables(pattern: &TriplePattern) -> impl Iterator<Item = &Variable> {
    let predicate = match &pattern.predicate {
        NamedNodePattern::Variable(v) => Some(v),
        NamedNodePattern::NamedNode(_) => None,
    };
    term_pattern_variable(&pattern.subject)
        .into_iter()
        .chain(predicate)
        .chain(term_pattern_variable(&pattern.object))
}

/// Returns the variables referenced by `expression`, in order of their first occurrence.
pub fn expression_variables(expression: &Expression) -> Vec<Variable> {
    let mut variables = Vec::new();
    collect_expression_variables(expression, &mut |v| {
        if !variables.contains(v) {
            variables.push(v.clone());
        }
    });
    variables
}

fn expression_mentions(expression: &Expression, variable: &Variable) -> bool {
    let mut found = false;
    collect_expression_variables(expression, &mut |v| found |= v == variable);
    found
}

fn aggregate_mentions(aggregate: &AggregateExpression, variable: &Variable) -> bool {
    match aggregate {
        AggregateExpression::CountSolutions { .. } => false,
        AggregateExpression::FunctionCall { expr, .. } => expression_mentions(expr, variable),
    }
}

fn collect_expression_variables(expression: &Expression, callback: &mut dyn FnMut(&Variable)) {
    match expression {
        Expression::NamedNode(_) | Expression::Literal(_) => {}
        Expression::Variable(v) | Expression::Bound(v) => callback(v),
        Expression::Or(lhs, rhs)
        | Expression::And(lhs, rhs)
        | Expression::Equal(lhs, rhs)
        | Expression::SameTerm(lhs, rhs)
        | Expression::Greater(lhs, rhs)
        | Expression::GreaterOrEqual(lhs, rhs)
        | Expression::Less(lhs, rhs)
        | Expression::LessOrEqual(lhs, rhs)
        | Expression::Add(lhs, rhs)
        | Expression::Subtract(lhs, rhs)
        | Expression::Multiply(lhs, rhs)
        | Expression::Divide(lhs, rhs) => {
            collect_expression_variables(lhs, callback);
            collect_expression_variables(rhs, callback);
        }
        Expression::UnaryPlus(inner) | Expression::UnaryMinus(inner) | Expression::Not(inner) => {
            collect_expression_variables(inner, callback);
        }
        Expression::In(inner, list) => {
            collect_expression_variables(inner, callback);
            for item in list {
                collect_expression_variables(item, callback);
            }
        }
        Expression::If(condition, then, otherwise) => {
            collect_expression_variables(condition, callback);
            collect_expression_variables(then, callback);
            collect_expression_variables(otherwise, callback);
        }
        Expression::Coalesce(list) | Expression::FunctionCall(_, list) => {
            for item in list {
                collect_expression_variables(item, callback);
            }
        }
        Expression::Exists(pattern) => pattern.on_in_scope_variable(|v| callback(v)),
    }
}

/// Returns whether `expression` may be evaluated on a different set of solutions (e.g., before a
/// join instead of after it) without changing its result for a given solution.
///
/// This excludes `EXISTS` (which depends on all bindings of the solution) and functions that
/// return a fresh value on each call.
pub fn is_movable_expression(expression: &Expression) -> bool {
    match expression {
        Expression::NamedNode(_)
        | Expression::Literal(_)
        | Expression::Variable(_)
        | Expression::Bound(_) => true,
        Expression::Exists(_) => false,
        Expression::Or(lhs, rhs)
        | Expression::And(lhs, rhs)
        | Expression::Equal(lhs, rhs)
        | Expression::SameTerm(lhs, rhs)
        | Expression::Greater(lhs, rhs)
        | Expression::GreaterOrEqual(lhs, rhs)
        | Expression::Less(lhs, rhs)
        | Expression::LessOrEqual(lhs, rhs)
        | Expression::Add(lhs, rhs)
        | Expression::Subtract(lhs, rhs)
        | Expression::Multiply(lhs, rhs)
        | Expression::Divide(lhs, rhs) => {
            is_movable_expression(lhs) && is_movable_expression(rhs)
        }
        Expression::UnaryPlus(inner) | Expression::UnaryMinus(inner) | Expression::Not(inner) => {
            is_movable_expression(inner)
        }
        Expression::In(inner, list) => {
            is_movable_expression(inner) && list.iter().all(is_movable_expression)
        }
        Expression::If(condition, then, otherwise) => {
            is_movable_expression(condition)
                && is_movable_expression(then)
                && is_movable_expression(otherwise)
        }
        Expression::Coalesce(list) => list.iter().all(is_movable_expression),
        Expression::FunctionCall(function, args) => {
            !matches!(
                function,
                Function::Rand | Function::BNode | Function::Uuid | Function::StrUuid
            ) && args.iter().all(is_movable_expression)
        }
    }
}
