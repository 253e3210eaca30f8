use rdf_walk_model::{Solution, Term, Variable};
use std::fmt::{Display, Formatter};

/// The results of a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryResults {
    /// The solutions of a `SELECT` query.
    Solutions(QuerySolutions),
    /// The answer of an `ASK` query.
    ///
    /// A partial answer is only meaningful if it is `true`. A `false` partial answer means that no
    /// solution has been found before the deadline.
    Boolean { value: bool, partial: bool },
}

impl QueryResults {
    /// Returns whether the evaluation stopped at its deadline.
    pub fn is_partial(&self) -> bool {
        match self {
            QueryResults::Solutions(solutions) => solutions.is_partial(),
            QueryResults::Boolean { partial, .. } => *partial,
        }
    }
}

/// The solutions of a `SELECT` query in the order produced by the evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySolutions {
    variables: Vec<Variable>,
    solutions: Vec<Solution>,
    partial: bool,
}

impl QuerySolutions {
    pub(crate) fn new(variables: Vec<Variable>, solutions: Vec<Solution>, partial: bool) -> Self {
        Self {
            variables,
            solutions,
            partial,
        }
    }

    /// The projected variables of the query.
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn len(&self) -> usize {
        self.solutions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.solutions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Solution> {
        self.solutions.iter()
    }

    /// Returns the values of `variable` in all solutions. Unbound values are `None`.
    pub fn column<'a>(&'a self, variable: &'a Variable) -> impl Iterator<Item = Option<&'a Term>> {
        self.solutions.iter().map(move |solution| solution.get(variable))
    }

    /// Returns whether the evaluation stopped at its deadline. A partial result contains a subset
    /// of the solutions of the complete result.
    pub fn is_partial(&self) -> bool {
        self.partial
    }

    pub fn into_solutions(self) -> Vec<Solution> {
        self.solutions
    }
}

impl IntoIterator for QuerySolutions {
    type Item = Solution;
    type IntoIter = std::vec::IntoIter<Solution>;

    fn into_iter(self) -> Self::IntoIter {
        self.solutions.into_iter()
    }
}

impl<'a> IntoIterator for &'a QuerySolutions {
    type Item = &'a Solution;
    type IntoIter = std::slice::Iter<'a, Solution>;

    fn into_iter(self) -> Self::IntoIter {
        self.solutions.iter()
    }
}

impl Display for QuerySolutions {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (i, solution) in self.solutions.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{solution}")?;
        }
        Ok(())
    }
}
