//! The recursive evaluation of algebra trees.

mod aggregates;
mod bgp;
mod join;
mod ordering;
mod paths;

use crate::context::EvaluationContext;
use crate::error::{recover, QueryEvaluationError};
use crate::multiset::Multiset;
use rdf_walk_algebra::Algebra;
use rdf_walk_common::ActiveGraph;
use rdf_walk_model::{
    Expression, NamedNodePattern, NamedOrBlankNode, Solution, Term, Variable,
};
use std::time::Instant;

/// Evaluates `tree` within `context`.
///
/// Each operator evaluates its children and combines their results. The result may omit solutions
/// that are not compatible with any solution of the [input](EvaluationContext::input) of the
/// context.
pub fn evaluate(
    tree: &Algebra,
    context: &EvaluationContext,
) -> Result<Multiset, QueryEvaluationError> {
    match tree {
        Algebra::Bgp { patterns } => bgp::evaluate_bgp(patterns, None, context),
        Algebra::AskBgp { patterns } => bgp::evaluate_bgp(patterns, Some(1), context),
        Algebra::LazyBgp { patterns, limit } => {
            bgp::evaluate_bgp(patterns, Some(*limit), context)
        }
        Algebra::Path {
            subject,
            path,
            object,
        } => paths::evaluate_path(subject, path, object, context),
        Algebra::ZeroLengthPath { subject, object } => {
            paths::zero_length(subject, object, context)
        }
        Algebra::ZeroOrOnePath {
            subject,
            path,
            object,
        } => paths::zero_or_one(subject, path, object, context),
        Algebra::ZeroOrMorePath {
            subject,
            path,
            object,
        } => paths::closure(subject, path, object, true, context),
        Algebra::OneOrMorePath {
            subject,
            path,
            object,
        } => paths::closure(subject, path, object, false, context),
        Algebra::NegatedPropertySet {
            subject,
            properties,
            object,
        } => paths::negated_property_set(subject, properties, object, context),
        Algebra::Join { left, right } => join::join(left, right, context),
        Algebra::ParallelJoin { left, right } => join::parallel_join(left, right, context),
        Algebra::LeftJoin {
            left,
            right,
            expression,
        } => join::left_join(left, right, expression.as_ref(), context),
        Algebra::Union { left, right } => {
            let lhs = evaluate(left, context)?;
            Ok(lhs.union(evaluate(right, context)?))
        }
        Algebra::AskUnion { left, right } => {
            let lhs = evaluate(left, context)?;
            if lhs.is_empty() {
                evaluate(right, context)
            } else {
                Ok(lhs)
            }
        }
        Algebra::LazyUnion { left, right, limit } => {
            let lhs = evaluate(left, context)?;
            if lhs.len() >= *limit {
                return Ok(lhs.slice(0, Some(*limit)));
            }
            Ok(lhs.union(evaluate(right, context)?).slice(0, Some(*limit)))
        }
        Algebra::Minus { left, right } => join::minus(left, right, context),
        Algebra::Filter { inner, expression } => {
            filter(evaluate(inner, context)?, expression, context)
        }
        Algebra::FilteredProduct {
            left,
            right,
            expression,
        } => join::filtered_product(left, right, expression, context),
        Algebra::Extend {
            inner,
            variable,
            expression,
        } => extend(evaluate(inner, context)?, variable, expression, context),
        Algebra::Distinct { inner } | Algebra::Reduced { inner } => {
            Ok(evaluate(inner, context)?.distinct())
        }
        Algebra::OrderBy { inner, expression } => {
            ordering::order_by(evaluate(inner, context)?, expression, context)
        }
        Algebra::Group {
            inner,
            variables,
            aggregates,
        } => {
            let inner = evaluate(inner, &context.without_input())?;
            aggregates::group(&inner, variables, aggregates, context)
        }
        Algebra::Slice {
            inner,
            start,
            length,
        } => Ok(evaluate(inner, &context.without_input())?.slice(*start, *length)),
        Algebra::Project { inner, variables } => {
            Ok(evaluate(inner, &context.without_input())?.project(variables))
        }
        Algebra::Values {
            variables,
            bindings,
        } => Ok(values(variables, bindings)),
        Algebra::Graph { name, inner } => graph(name, inner, context),
        Algebra::Service { name, silent, .. } => {
            if *silent {
                return Ok(Multiset::Identity);
            }
            match name {
                NamedNodePattern::NamedNode(name) => {
                    Err(QueryEvaluationError::UnsupportedService(name.clone()))
                }
                NamedNodePattern::Variable(_) => Err(QueryEvaluationError::UnboundService),
            }
        }
    }
}

/// Evaluates the root of a query and logs the duration of the evaluation.
pub fn evaluate_query(
    tree: &Algebra,
    context: &EvaluationContext,
) -> Result<Multiset, QueryEvaluationError> {
    let start = Instant::now();
    let result = evaluate(tree, context);
    match &result {
        Ok(multiset) => tracing::debug!(
            elapsed = ?start.elapsed(),
            solutions = multiset.len(),
            partial = context.timed_out(),
            "Evaluated query"
        ),
        Err(error) => tracing::debug!(elapsed = ?start.elapsed(), %error, "Query evaluation failed"),
    }
    result
}

/// Keeps the solutions for which `expression` is true. Solutions for which the expression fails
/// are dropped.
fn filter(
    multiset: Multiset,
    expression: &Expression,
    context: &EvaluationContext,
) -> Result<Multiset, QueryEvaluationError> {
    let variables = multiset.variables().to_vec();
    let mut solutions = Vec::new();
    for solution in multiset.into_solutions() {
        let accepted = recover(
            context
                .expressions()
                .evaluate_boolean(expression, &solution, context),
        )?;
        if accepted == Some(true) {
            solutions.push(solution);
        }
    }
    Ok(Multiset::new(variables, solutions))
}

/// Binds `variable` to the value of `expression`. Solutions for which the expression fails are
/// kept without the binding. Existing bindings of `variable` are not replaced.
fn extend(
    multiset: Multiset,
    variable: &Variable,
    expression: &Expression,
    context: &EvaluationContext,
) -> Result<Multiset, QueryEvaluationError> {
    let mut variables = multiset.variables().to_vec();
    variables.push(variable.clone());

    let mut solutions = Vec::with_capacity(multiset.len());
    for solution in multiset.into_solutions() {
        if solution.contains(variable) {
            solutions.push(solution);
            continue;
        }
        let value = recover(
            context
                .expressions()
                .evaluate(expression, &solution, context),
        )?;
        solutions.push(match value {
            Some(value) => solution.with(variable.clone(), value),
            None => solution,
        });
    }
    Ok(Multiset::new(variables, solutions))
}

fn values(variables: &[Variable], bindings: &[Vec<Option<Term>>]) -> Multiset {
    let solutions = bindings
        .iter()
        .map(|row| {
            variables
                .iter()
                .zip(row)
                .filter_map(|(variable, term)| Some((variable.clone(), term.clone()?)))
                .collect::<Solution>()
        })
        .collect();
    Multiset::new(variables.to_vec(), solutions)
}

/// Evaluates `inner` against a named graph.
///
/// If the name is a variable, `inner` is evaluated once per visible named graph and the variable
/// is bound to the name of the graph.
fn graph(
    name: &NamedNodePattern,
    inner: &Algebra,
    context: &EvaluationContext,
) -> Result<Multiset, QueryEvaluationError> {
    let variable = match name {
        NamedNodePattern::NamedNode(node) => {
            let graph = NamedOrBlankNode::from(node.clone());
            if !is_visible(&graph, context) {
                return Ok(Multiset::Null);
            }
            return evaluate(
                inner,
                &context.with_active_graph(ActiveGraph::NamedGraph(graph)),
            );
        }
        NamedNodePattern::Variable(variable) => variable,
    };

    let mut result = Multiset::Null;
    for graph in candidate_graphs(variable, context)? {
        if context.should_stop()? {
            break;
        }
        let term = graph_term(&graph);
        let inner = evaluate(
            inner,
            &context.with_active_graph(ActiveGraph::NamedGraph(graph)),
        )?;
        let mut variables = inner.variables().to_vec();
        variables.push(variable.clone());
        let solutions = inner
            .into_solutions()
            .into_iter()
            .filter_map(|solution| match solution.get(variable) {
                Some(bound) if *bound == term => Some(solution),
                Some(_) => None,
                None => Some(solution.with(variable.clone(), term.clone())),
            })
            .collect();
        result = result.union(Multiset::new(variables, solutions));
    }
    Ok(result)
}

fn visible_graphs(context: &EvaluationContext) -> Result<Vec<NamedOrBlankNode>, QueryEvaluationError> {
    Ok(match context.named_graphs() {
        Some(graphs) => graphs.to_vec(),
        None => context.source().named_graphs()?,
    })
}

fn is_visible(graph: &NamedOrBlankNode, context: &EvaluationContext) -> bool {
    context
        .named_graphs()
        .map_or(true, |graphs| graphs.contains(graph))
}

fn graph_term(graph: &NamedOrBlankNode) -> Term {
    match graph {
        NamedOrBlankNode::NamedNode(node) => node.clone().into(),
        NamedOrBlankNode::BlankNode(node) => node.clone().into(),
    }
}

/// The graphs a `GRAPH ?g` pattern iterates over. If every input solution binds `?g`, only the
/// bound graphs are visited.
fn candidate_graphs(
    variable: &Variable,
    context: &EvaluationContext,
) -> Result<Vec<NamedOrBlankNode>, QueryEvaluationError> {
    let graphs = visible_graphs(context)?;
    let input = context.input();
    if !input.all_bind(variable) {
        return Ok(graphs);
    }
    Ok(graphs
        .into_iter()
        .filter(|graph| {
            let term = graph_term(graph);
            input
                .iter()
                .any(|solution| solution.get(variable) == Some(&term))
        })
        .collect())
}
