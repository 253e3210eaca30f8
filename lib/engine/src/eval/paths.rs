use crate::context::EvaluationContext;
use crate::error::QueryEvaluationError;
use crate::eval::bgp::{bind_position, resolve};
use crate::eval::evaluate;
use crate::multiset::Multiset;
use rdf_walk_algebra::paths::{compile_path, PropertyPath};
use rdf_walk_algebra::term_pattern_variable;
use rdf_walk_common::TriplePatternMatch;
use rdf_walk_model::{temporary_variable, NamedNode, Solution, Term, TermPattern, Variable};
use rustc_hash::{FxHashMap, FxHashSet};

/// Evaluates a property path by compiling it into an algebra tree.
pub(super) fn evaluate_path(
    subject: &TermPattern,
    path: &PropertyPath,
    object: &TermPattern,
    context: &EvaluationContext,
) -> Result<Multiset, QueryEvaluationError> {
    let compiled = compile_path(path, subject.clone(), object.clone());
    evaluate(&compiled, context)
}

/// Matches every node with itself.
///
/// A fixed term matches itself, even if it does not occur in the graph. If both ends are
/// variables, only nodes of the active graph match.
pub(super) fn zero_length(
    subject: &TermPattern,
    object: &TermPattern,
    context: &EvaluationContext,
) -> Result<Multiset, QueryEvaluationError> {
    let empty = Solution::new();
    let (start, end) = (resolve(subject, &empty), resolve(object, &empty));
    let nodes = match (start, end) {
        (Some(start), Some(end)) => {
            return Ok(if start == end {
                Multiset::Identity
            } else {
                Multiset::Null
            });
        }
        (Some(term), None) | (None, Some(term)) => vec![term],
        (None, None) => start_nodes([subject, object], context)?,
    };

    let solutions = nodes
        .into_iter()
        .filter_map(|node| bind_ends(subject, object, node.clone(), node))
        .collect();
    Ok(Multiset::new(variables_of(subject, object), solutions))
}

/// Matches the zero-length path and every single step of `path`. Duplicates are removed.
pub(super) fn zero_or_one(
    subject: &TermPattern,
    path: &PropertyPath,
    object: &TermPattern,
    context: &EvaluationContext,
) -> Result<Multiset, QueryEvaluationError> {
    let zero = zero_length(subject, object, context)?;
    let one = evaluate_path(subject, path, object, context)?;

    let variables = zero
        .variables()
        .iter()
        .chain(one.variables())
        .cloned()
        .collect::<Vec<_>>();
    let mut seen = FxHashSet::default();
    let solutions = zero
        .into_solutions()
        .into_iter()
        .chain(one.into_solutions())
        .filter(|solution| seen.insert(solution.clone()))
        .collect();
    Ok(Multiset::new(variables, solutions))
}

/// Evaluates the transitive closure of `path`, including the reflexive pairs if `reflexive` is
/// set.
///
/// The closure is computed per start node by expanding a frontier of reached nodes until no new
/// nodes are reached. Each node is expanded at most once per start node, which guarantees
/// termination on cyclic graphs. The successors of a node are cached across start nodes.
pub(super) fn closure(
    subject: &TermPattern,
    path: &PropertyPath,
    object: &TermPattern,
    reflexive: bool,
    context: &EvaluationContext,
) -> Result<Multiset, QueryEvaluationError> {
    let backward = walks_backward(subject, object, context);
    let (start, end, step) = if backward {
        (object, subject, PropertyPath::Inverse(Box::new(path.clone())))
    } else {
        (subject, object, path.clone())
    };

    let empty = Solution::new();
    let starts = match resolve(start, &empty) {
        Some(term) => vec![term],
        None => start_nodes([start], context)?,
    };
    let fixed_end = resolve(end, &empty);

    let mut closure = Closure::new(step, context);
    let mut solutions = Vec::new();
    for start_node in starts {
        if context.should_stop()? {
            break;
        }
        let Some(reached) = closure.reach(&start_node, reflexive)? else {
            break;
        };
        for end_node in reached {
            if fixed_end.as_ref().is_some_and(|fixed| *fixed != end_node) {
                continue;
            }
            let solution = if backward {
                bind_ends(subject, object, end_node, start_node.clone())
            } else {
                bind_ends(subject, object, start_node.clone(), end_node)
            };
            solutions.extend(solution);
        }
    }
    Ok(Multiset::new(variables_of(subject, object), solutions))
}

/// Matches single edges whose predicate is not one of `properties`.
pub(super) fn negated_property_set(
    subject: &TermPattern,
    properties: &[NamedNode],
    object: &TermPattern,
    context: &EvaluationContext,
) -> Result<Multiset, QueryEvaluationError> {
    let empty = Solution::new();
    let query = TriplePatternMatch::new(resolve(subject, &empty), None, resolve(object, &empty));

    let mut solutions = Vec::new();
    for triple in context
        .source()
        .match_triples(&query, context.active_graph())?
    {
        if context.should_stop()? {
            break;
        }
        let triple = triple?;
        if properties.contains(&triple.predicate) {
            continue;
        }
        solutions.extend(bind_ends(subject, object, triple.subject.into(), triple.object));
    }
    Ok(Multiset::new(variables_of(subject, object), solutions))
}

/// Decides whether a closure is computed from the object to the subject. This is the case if the
/// object is fixed and the subject is not.
fn walks_backward(subject: &TermPattern, object: &TermPattern, context: &EvaluationContext) -> bool {
    let empty = Solution::new();
    if resolve(subject, &empty).is_some() {
        return false;
    }
    if resolve(object, &empty).is_some() {
        return true;
    }
    let bound_by_input = |pattern: &TermPattern| {
        term_pattern_variable(pattern).is_some_and(|variable| context.input().all_bind(variable))
    };
    !bound_by_input(subject) && bound_by_input(object)
}

/// The reachability state of a closure evaluation.
struct Closure<'a> {
    step: PropertyPath,
    target: Variable,
    successors: FxHashMap<Term, Vec<Term>>,
    context: &'a EvaluationContext,
}

impl<'a> Closure<'a> {
    fn new(step: PropertyPath, context: &'a EvaluationContext) -> Self {
        Self {
            step,
            target: temporary_variable("closure"),
            successors: FxHashMap::default(),
            context,
        }
    }

    /// Returns the nodes reachable from `start` with at least one step (or zero steps if
    /// `reflexive` is set). Returns `None` if the deadline has been reached.
    fn reach(&mut self, start: &Term, reflexive: bool) -> Result<Option<Vec<Term>>, QueryEvaluationError> {
        let mut visited = FxHashSet::default();
        let mut reached = Vec::new();
        if reflexive {
            visited.insert(start.clone());
            reached.push(start.clone());
        }

        let mut frontier = vec![start.clone()];
        let mut iteration = 0;
        while !frontier.is_empty() {
            if self.context.should_stop()? {
                return Ok(None);
            }
            iteration += 1;
            tracing::trace!(%start, iteration, frontier = frontier.len(), "Expanding closure");

            let mut next = Vec::new();
            for node in frontier {
                for successor in self.successors(&node)? {
                    if visited.insert(successor.clone()) {
                        reached.push(successor.clone());
                        next.push(successor);
                    }
                }
            }
            frontier = next;
        }
        Ok(Some(reached))
    }

    fn successors(&mut self, node: &Term) -> Result<Vec<Term>, QueryEvaluationError> {
        if let Some(successors) = self.successors.get(node) {
            return Ok(successors.clone());
        }

        let step = compile_path(
            &self.step,
            term_to_pattern(node.clone()),
            self.target.clone().into(),
        );
        let result = evaluate(&step, &self.context.without_input())?;
        let mut seen = FxHashSet::default();
        let successors = result
            .iter()
            .filter_map(|solution| solution.get(&self.target))
            .filter(|successor| seen.insert(*successor))
            .cloned()
            .collect::<Vec<_>>();
        self.successors.insert(node.clone(), successors.clone());
        Ok(successors)
    }
}

fn term_to_pattern(term: Term) -> TermPattern {
    match term {
        Term::NamedNode(node) => node.into(),
        Term::BlankNode(node) => node.into(),
        Term::Literal(literal) => literal.into(),
        #[allow(unreachable_patterns)]
        _ => TermPattern::Variable(temporary_variable("unsupported")),
    }
}

/// Binds the ends of a path. Returns `None` if both ends are the same variable but the nodes
/// differ.
fn bind_ends(subject: &TermPattern, object: &TermPattern, start: Term, end: Term) -> Option<Solution> {
    let solution = bind_position(subject, start, Solution::new())?;
    bind_position(object, end, solution)
}

fn variables_of(subject: &TermPattern, object: &TermPattern) -> Vec<Variable> {
    [subject, object]
        .into_iter()
        .filter_map(term_pattern_variable)
        .cloned()
        .collect()
}

/// Returns the nodes of the active graph a path can start from.
///
/// If the input binds one of the `ends` in every solution, only its values are considered. Values
/// that are not nodes of the active graph are dropped, as a variable end never matches them.
fn start_nodes<'p>(
    ends: impl IntoIterator<Item = &'p TermPattern>,
    context: &EvaluationContext,
) -> Result<Vec<Term>, QueryEvaluationError> {
    let input_nodes = ends
        .into_iter()
        .filter_map(term_pattern_variable)
        .find_map(|variable| input_values(context, variable));
    let Some(candidates) = input_nodes else {
        return graph_nodes(context);
    };

    let mut nodes = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if is_graph_node(&candidate, context)? {
            nodes.push(candidate);
        }
    }
    Ok(nodes)
}

/// Returns the distinct values of `variable` in the input if every input solution binds it.
fn input_values(context: &EvaluationContext, variable: &Variable) -> Option<Vec<Term>> {
    let input = context.input();
    if !input.all_bind(variable) {
        return None;
    }
    let mut seen = FxHashSet::default();
    Some(
        input
            .iter()
            .filter_map(|solution| solution.get(variable))
            .filter(|term| seen.insert(*term))
            .cloned()
            .collect(),
    )
}

/// Returns whether `term` is the subject or the object of a triple in the active graph.
fn is_graph_node(
    term: &Term,
    context: &EvaluationContext,
) -> Result<bool, QueryEvaluationError> {
    let as_subject = TriplePatternMatch::new(Some(term.clone()), None, None);
    let as_object = TriplePatternMatch::new(None, None, Some(term.clone()));
    for pattern in [as_subject, as_object] {
        let mut triples = context
            .source()
            .match_triples(&pattern, context.active_graph())?;
        if triples.next().transpose()?.is_some() {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Returns all subjects and objects of the active graph.
fn graph_nodes(context: &EvaluationContext) -> Result<Vec<Term>, QueryEvaluationError> {
    let mut seen = FxHashSet::default();
    let mut nodes = Vec::new();
    for triple in context
        .source()
        .match_triples(&TriplePatternMatch::default(), context.active_graph())?
    {
        let triple = triple?;
        for node in [triple.subject.into(), triple.object] {
            if seen.insert(node.clone()) {
                nodes.push(node);
            }
        }
    }
    Ok(nodes)
}
