use crate::paths::PropertyPath;
use crate::variables::term_pattern_variable;
use crate::Algebra;
use rdf_walk_model::{temporary_variable, TermPattern, TriplePattern, Variable};

/// Compiles a property path between `subject` and `object` into an equivalent algebra tree.
///
/// Intermediate nodes of sequences are bound to fresh temporary variables that are projected away
/// directly after the sequence. Closures are not unrolled. They become dedicated nodes that are
/// evaluated with a fixpoint iteration.
pub fn compile_path(path: &PropertyPath, subject: TermPattern, object: TermPattern) -> Algebra {
    PathCompiler::default().compile(path, subject, object)
}

#[derive(Debug, Default)]
struct PathCompiler {
    next_variable: usize,
}

impl PathCompiler {
    fn compile(&mut self, path: &PropertyPath, subject: TermPattern, object: TermPattern) -> Algebra {
        match path {
            PropertyPath::Predicate(predicate) => Algebra::Bgp {
                patterns: vec![TriplePattern {
                    subject,
                    predicate: predicate.clone().into(),
                    object,
                }],
            },
            PropertyPath::Inverse(inner) => self.compile(inner, object, subject),
            PropertyPath::Sequence(lhs, rhs) => {
                let middle = self.fresh_variable();
                let left = self.compile(lhs, subject.clone(), middle.clone());
                let right = self.compile(rhs, middle, object.clone());
                project_endpoints(Algebra::join(left, right), &subject, &object)
            }
            PropertyPath::Alternative(lhs, rhs) => Algebra::union(
                self.compile(lhs, subject.clone(), object.clone()),
                self.compile(rhs, subject, object),
            ),
            PropertyPath::ZeroOrOne(inner) => Algebra::ZeroOrOnePath {
                subject,
                path: inner.as_ref().clone(),
                object,
            },
            PropertyPath::ZeroOrMore(inner) => Algebra::ZeroOrMorePath {
                subject,
                path: inner.as_ref().clone(),
                object,
            },
            PropertyPath::OneOrMore(inner) => Algebra::OneOrMorePath {
                subject,
                path: inner.as_ref().clone(),
                object,
            },
            PropertyPath::FixedCardinality(inner, count) => {
                self.repeat(inner, *count, subject, object)
            }
            PropertyPath::Cardinality { path, min, max } => match *max {
                None => self.at_least(path, *min, subject, object),
                Some(max) if max < *min => Algebra::Values {
                    variables: Vec::new(),
                    bindings: Vec::new(),
                },
                Some(max) => (*min..=max)
                    .map(|count| self.repeat(path, count, subject.clone(), object.clone()))
                    .reduce(Algebra::union)
                    .unwrap_or_else(Algebra::identity),
            },
            PropertyPath::NegatedPropertySet(properties) => Algebra::NegatedPropertySet {
                subject,
                properties: properties.clone(),
                object,
            },
        }
    }

    /// `path{count}`
    fn repeat(
        &mut self,
        path: &PropertyPath,
        count: usize,
        subject: TermPattern,
        object: TermPattern,
    ) -> Algebra {
        match count {
            0 => Algebra::ZeroLengthPath { subject, object },
            1 => self.compile(path, subject, object),
            _ => {
                let middle = self.fresh_variable();
                let left = self.compile(path, subject.clone(), middle.clone());
                let right = self.repeat(path, count - 1, middle, object.clone());
                project_endpoints(Algebra::join(left, right), &subject, &object)
            }
        }
    }

    /// `path{min,}`
    fn at_least(
        &mut self,
        path: &PropertyPath,
        min: usize,
        subject: TermPattern,
        object: TermPattern,
    ) -> Algebra {
        match min {
            0 => Algebra::ZeroOrMorePath {
                subject,
                path: path.clone(),
                object,
            },
            1 => Algebra::OneOrMorePath {
                subject,
                path: path.clone(),
                object,
            },
            _ => {
                let middle = self.fresh_variable();
                let left = self.repeat(path, min - 1, subject.clone(), middle.clone());
                let right = Algebra::OneOrMorePath {
                    subject: middle,
                    path: path.clone(),
                    object: object.clone(),
                };
                project_endpoints(Algebra::join(left, right), &subject, &object)
            }
        }
    }

    fn fresh_variable(&mut self) -> TermPattern {
        let variable = path_variable(self.next_variable);
        self.next_variable += 1;
        variable.into()
    }
}

/// The variable of an intermediate path node. The `#` is not allowed in blank node labels, hence
/// these variables never clash with variables created for the blank nodes of a query.
fn path_variable(index: usize) -> Variable {
    temporary_variable(format!("path#{index}"))
}

fn project_endpoints(inner: Algebra, subject: &TermPattern, object: &TermPattern) -> Algebra {
    let mut variables = Vec::new();
    for variable in [subject, object].into_iter().filter_map(term_pattern_variable) {
        if !variables.contains(variable) {
            variables.push(variable.clone());
        }
    }
    Algebra::project(inner, variables)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdf_walk_model::NamedNode;

    fn p(name: &str) -> PropertyPath {
        PropertyPath::Predicate(NamedNode::new_unchecked(format!("http://example.com/{name}")))
    }

    fn var(name: &str) -> TermPattern {
        Variable::new_unchecked(name).into()
    }

    #[test]
    fn inverse_swaps_endpoints() {
        let algebra = compile_path(
            &PropertyPath::Inverse(Box::new(p("p"))),
            var("s"),
            var("o"),
        );
        assert_eq!(algebra.to_string(), "Bgp: ?o <http://example.com/p> ?s");
    }

    #[test]
    fn sequence_projects_intermediate_node() {
        let algebra = compile_path(
            &PropertyPath::Sequence(Box::new(p("p")), Box::new(p("q"))),
            var("s"),
            var("o"),
        );
        insta::assert_snapshot!(algebra, @r"
        Project: ?s ?o
          Join
            Bgp: ?s <http://example.com/p> ?_:path#0
            Bgp: ?_:path#0 <http://example.com/q> ?o
        ");
    }

    #[test]
    fn bounded_cardinality_is_union_of_lengths() {
        let algebra = compile_path(
            &PropertyPath::Cardinality {
                path: Box::new(p("p")),
                min: 0,
                max: Some(1),
            },
            var("s"),
            var("o"),
        );
        insta::assert_snapshot!(algebra, @r"
        Union
          ZeroLengthPath: ?s ?o
          Bgp: ?s <http://example.com/p> ?o
        ");
    }

    #[test]
    fn open_cardinality_ends_in_closure() {
        let algebra = compile_path(
            &PropertyPath::Cardinality {
                path: Box::new(p("p")),
                min: 2,
                max: None,
            },
            var("s"),
            var("o"),
        );
        insta::assert_snapshot!(algebra, @r"
        Project: ?s ?o
          Join
            Bgp: ?s <http://example.com/p> ?_:path#0
            OneOrMorePath: ?_:path#0 <http://example.com/p> ?o
        ");
    }

    #[test]
    fn negated_property_set_is_kept() {
        let algebra = compile_path(
            &PropertyPath::Inverse(Box::new(PropertyPath::NegatedPropertySet(vec![
                NamedNode::new_unchecked("http://example.com/p"),
            ]))),
            var("s"),
            var("o"),
        );
        assert!(matches!(
            algebra,
            Algebra::NegatedPropertySet { subject, .. } if subject == var("o")
        ));
    }

    #[test]
    fn empty_cardinality_range_matches_nothing() {
        let algebra = compile_path(
            &PropertyPath::Cardinality {
                path: Box::new(p("p")),
                min: 2,
                max: Some(1),
            },
            var("s"),
            var("o"),
        );
        assert!(matches!(algebra, Algebra::Values { bindings, .. } if bindings.is_empty()));
    }
}
