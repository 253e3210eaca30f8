use crate::is_temporary_variable;
use oxrdf::{Term, Variable};
use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

/// A partial mapping from variables to terms.
///
/// A variable that is not part of the mapping is *unbound*. Solutions are immutable; all operations
/// that "change" a solution return a new one. The bindings are kept sorted by variable name, which
/// makes equality, hashing, and merging independent of the order in which variables were bound.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Solution {
    bindings: Vec<(Variable, Term)>,
}

impl Solution {
    /// Creates a solution without any bindings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the term bound to `variable`, if any.
    pub fn get(&self, variable: &Variable) -> Option<&Term> {
        self.position(variable)
            .ok()
            .map(|index| &self.bindings[index].1)
    }

    /// Returns whether `variable` is bound in this solution.
    pub fn contains(&self, variable: &Variable) -> bool {
        self.position(variable).is_ok()
    }

    /// Returns the number of bound variables.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns whether no variable is bound.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Iterates over the bindings in variable name order.
    pub fn iter(&self) -> impl Iterator<Item = (&Variable, &Term)> {
        self.bindings.iter().map(|(v, t)| (v, t))
    }

    /// Iterates over the bound variables in name order.
    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.bindings.iter().map(|(v, _)| v)
    }

    /// Returns a new solution that additionally binds `variable` to `term`. An existing binding of
    /// `variable` is replaced.
    #[must_use]
    pub fn with(&self, variable: Variable, term: Term) -> Self {
        let mut bindings = self.bindings.clone();
        match self.position(&variable) {
            Ok(index) => bindings[index].1 = term,
            Err(index) => bindings.insert(index, (variable, term)),
        }
        Self { bindings }
    }

    /// Returns a new solution without the binding for `variable`.
    #[must_use]
    pub fn without(&self, variable: &Variable) -> Self {
        Self {
            bindings: self
                .bindings
                .iter()
                .filter(|(v, _)| v != variable)
                .cloned()
                .collect(),
        }
    }

    /// Two solutions are compatible if every variable bound in both is bound to the same term.
    pub fn is_compatible_with(&self, other: &Solution) -> bool {
        self.zip_shared(other).all(|(lhs, rhs)| lhs == rhs)
    }

    /// Returns whether at least one variable is bound in both solutions.
    pub fn shares_variable_with(&self, other: &Solution) -> bool {
        self.zip_shared(other).next().is_some()
    }

    /// Merges two compatible solutions. For incompatible solutions, the binding of `self` wins.
    #[must_use]
    pub fn merge(&self, other: &Solution) -> Self {
        let mut bindings = Vec::with_capacity(self.len() + other.len());
        let mut lhs = self.bindings.iter().peekable();
        let mut rhs = other.bindings.iter().peekable();
        loop {
            let next = match (lhs.peek(), rhs.peek()) {
                (Some((l, _)), Some((r, _))) => match l.as_str().cmp(r.as_str()) {
                    Ordering::Less => lhs.next(),
                    Ordering::Greater => rhs.next(),
                    Ordering::Equal => {
                        rhs.next();
                        lhs.next()
                    }
                },
                (Some(_), None) => lhs.next(),
                (None, Some(_)) => rhs.next(),
                (None, None) => break,
            };
            if let Some(binding) = next {
                bindings.push(binding.clone());
            }
        }
        Self { bindings }
    }

    /// Restricts the solution to the given variables.
    #[must_use]
    pub fn project(&self, variables: &[Variable]) -> Self {
        Self {
            bindings: self
                .bindings
                .iter()
                .filter(|(v, _)| variables.contains(v))
                .cloned()
                .collect(),
        }
    }

    /// Removes all bindings of temporary variables.
    #[must_use]
    pub fn without_temporary_variables(&self) -> Self {
        Self {
            bindings: self
                .bindings
                .iter()
                .filter(|(v, _)| !is_temporary_variable(v))
                .cloned()
                .collect(),
        }
    }

    fn position(&self, variable: &Variable) -> Result<usize, usize> {
        self.bindings
            .binary_search_by(|(v, _)| v.as_str().cmp(variable.as_str()))
    }

    /// Iterates over pairs of terms for variables bound in both solutions.
    fn zip_shared<'a>(&'a self, other: &'a Solution) -> impl Iterator<Item = (&'a Term, &'a Term)> {
        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        small
            .bindings
            .iter()
            .filter_map(move |(v, t)| large.get(v).map(|o| (t, o)))
    }
}

impl FromIterator<(Variable, Term)> for Solution {
    /// Later bindings of the same variable replace earlier ones.
    fn from_iter<T: IntoIterator<Item = (Variable, Term)>>(iter: T) -> Self {
        let mut bindings: Vec<(Variable, Term)> = Vec::new();
        for (variable, term) in iter {
            match bindings.binary_search_by(|(v, _)| v.as_str().cmp(variable.as_str())) {
                Ok(index) => bindings[index].1 = term,
                Err(index) => bindings.insert(index, (variable, term)),
            }
        }
        Self { bindings }
    }
}

impl Display for Solution {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("{")?;
        for (i, (variable, term)) in self.bindings.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{variable} -> {term}")?;
        }
        f.write_str("}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{temporary_variable, NamedNode};

    fn var(name: &str) -> Variable {
        Variable::new_unchecked(name)
    }

    fn iri(value: &str) -> Term {
        NamedNode::new_unchecked(format!("http://example.com/{value}")).into()
    }

    #[test]
    fn bindings_are_order_independent() {
        let lhs = Solution::from_iter([(var("b"), iri("2")), (var("a"), iri("1"))]);
        let rhs = Solution::new().with(var("a"), iri("1")).with(var("b"), iri("2"));
        assert_eq!(lhs, rhs);
        assert_eq!(lhs.variables().map(Variable::as_str).collect::<Vec<_>>(), ["a", "b"]);
    }

    #[test]
    fn compatibility_only_considers_shared_variables() {
        let a = Solution::from_iter([(var("x"), iri("1")), (var("y"), iri("2"))]);
        let b = Solution::from_iter([(var("y"), iri("2")), (var("z"), iri("3"))]);
        let c = Solution::from_iter([(var("y"), iri("3"))]);
        let d = Solution::from_iter([(var("w"), iri("3"))]);

        assert!(a.is_compatible_with(&b));
        assert!(!a.is_compatible_with(&c));
        assert!(a.is_compatible_with(&d));
        assert!(a.shares_variable_with(&c));
        assert!(!a.shares_variable_with(&d));
    }

    #[test]
    fn merge_contains_all_bindings() {
        let a = Solution::from_iter([(var("x"), iri("1")), (var("y"), iri("2"))]);
        let b = Solution::from_iter([(var("y"), iri("2")), (var("z"), iri("3"))]);

        let merged = a.merge(&b);

        assert_eq!(merged.len(), 3);
        assert_eq!(merged.get(&var("z")), Some(&iri("3")));
        assert_eq!(merged.to_string(), "{?x -> <http://example.com/1>, ?y -> <http://example.com/2>, ?z -> <http://example.com/3>}");
    }

    #[test]
    fn temporary_variables_are_removed() {
        let solution = Solution::from_iter([(var("x"), iri("1")), (temporary_variable("b0"), iri("2"))]);
        assert_eq!(
            solution.without_temporary_variables(),
            Solution::from_iter([(var("x"), iri("1"))])
        );
    }
}
