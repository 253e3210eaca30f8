use itertools::Itertools;
use rdf_walk_model::{is_temporary_variable, Solution, Variable};
use rustc_hash::{FxHashMap, FxHashSet};
use std::fmt::{Display, Formatter};
use std::sync::LazyLock;

static EMPTY_SOLUTION: LazyLock<Solution> = LazyLock::new(Solution::new);

/// A bag of solutions together with the variables they may bind.
///
/// The two sentinels are distinguished from regular bags because the evaluation dispatches on
/// them. [Multiset::Identity] contains a single empty solution and is neutral for joins.
/// [Multiset::Null] contains no solution and absorbs joins.
///
/// A bag never contains zero solutions. Constructing an empty bag yields [Multiset::Null].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Multiset {
    Identity,
    Null,
    Bag(Bag),
}

/// A non-empty list of solutions. Every solution binds a subset of [Bag::variables].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bag {
    variables: Vec<Variable>,
    solutions: Vec<Solution>,
}

impl Bag {
    /// The variables that the solutions may bind, sorted by name.
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn solutions(&self) -> &[Solution] {
        &self.solutions
    }
}

impl Multiset {
    /// Creates a multiset from `solutions`.
    ///
    /// The declared variables are `variables` plus every variable bound by a solution.
    pub fn new(variables: impl IntoIterator<Item = Variable>, solutions: Vec<Solution>) -> Self {
        if solutions.is_empty() {
            return Multiset::Null;
        }

        let mut known = variables.into_iter().collect::<FxHashSet<_>>();
        for solution in &solutions {
            for variable in solution.variables() {
                if !known.contains(variable) {
                    known.insert(variable.clone());
                }
            }
        }

        if known.is_empty() && solutions.len() == 1 {
            return Multiset::Identity;
        }

        let mut variables = known.into_iter().collect::<Vec<_>>();
        variables.sort_unstable_by(|lhs, rhs| lhs.as_str().cmp(rhs.as_str()));
        Multiset::Bag(Bag {
            variables,
            solutions,
        })
    }

    /// Creates a multiset whose variables are derived from `solutions`.
    pub fn from_solutions(solutions: Vec<Solution>) -> Self {
        Self::new(Vec::new(), solutions)
    }

    /// Creates a multiset with a single solution.
    pub fn single(solution: Solution) -> Self {
        Self::from_solutions(vec![solution])
    }

    pub fn is_identity(&self) -> bool {
        matches!(self, Multiset::Identity)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Multiset::Null)
    }

    /// Returns the number of solutions.
    pub fn len(&self) -> usize {
        match self {
            Multiset::Identity => 1,
            Multiset::Null => 0,
            Multiset::Bag(bag) => bag.solutions.len(),
        }
    }

    /// Returns whether the multiset contains no solution.
    pub fn is_empty(&self) -> bool {
        self.is_null()
    }

    /// The variables that the solutions may bind.
    pub fn variables(&self) -> &[Variable] {
        match self {
            Multiset::Identity | Multiset::Null => &[],
            Multiset::Bag(bag) => &bag.variables,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Solution> {
        let solutions: &[Solution] = match self {
            Multiset::Identity => std::slice::from_ref(&*EMPTY_SOLUTION),
            Multiset::Null => &[],
            Multiset::Bag(bag) => &bag.solutions,
        };
        solutions.iter()
    }

    pub fn into_solutions(self) -> Vec<Solution> {
        match self {
            Multiset::Identity => vec![Solution::new()],
            Multiset::Null => Vec::new(),
            Multiset::Bag(bag) => bag.solutions,
        }
    }

    /// Returns whether every solution binds `variable`. False for an empty multiset.
    pub fn all_bind(&self, variable: &Variable) -> bool {
        !self.is_empty() && self.iter().all(|solution| solution.contains(variable))
    }

    /// Concatenates two multisets. Duplicates are kept.
    #[must_use]
    pub fn union(self, other: Multiset) -> Multiset {
        match (self, other) {
            (Multiset::Null, other) | (other, Multiset::Null) => other,
            (lhs, rhs) => {
                let variables = lhs
                    .variables()
                    .iter()
                    .chain(rhs.variables())
                    .cloned()
                    .collect::<Vec<_>>();
                let mut solutions = lhs.into_solutions();
                solutions.extend(rhs.into_solutions());
                Multiset::new(variables, solutions)
            }
        }
    }

    /// Removes duplicate solutions, keeping the first occurrence. Temporary variables are not
    /// part of the comparison.
    #[must_use]
    pub fn distinct(self) -> Multiset {
        let variables = self.variables().to_vec();
        let mut seen = FxHashSet::default();
        let solutions = self
            .into_solutions()
            .into_iter()
            .filter(|solution| seen.insert(solution.without_temporary_variables()))
            .collect();
        Multiset::new(variables, solutions)
    }

    /// Restricts every solution to `variables`.
    #[must_use]
    pub fn project(self, variables: &[Variable]) -> Multiset {
        let solutions = self
            .into_solutions()
            .into_iter()
            .map(|solution| solution.project(variables))
            .collect();
        Multiset::new(variables.to_vec(), solutions)
    }

    /// Skips `start` solutions and keeps at most `length` of the remaining ones.
    #[must_use]
    pub fn slice(self, start: usize, length: Option<usize>) -> Multiset {
        let variables = self.variables().to_vec();
        let solutions = self
            .into_solutions()
            .into_iter()
            .skip(start)
            .take(length.unwrap_or(usize::MAX))
            .collect();
        Multiset::new(variables, solutions)
    }

    /// Removes all temporary variables from the solutions.
    #[must_use]
    pub fn without_temporary_variables(self) -> Multiset {
        let variables = self
            .variables()
            .iter()
            .filter(|variable| !is_temporary_variable(variable))
            .cloned()
            .collect::<Vec<_>>();
        let solutions = self
            .into_solutions()
            .into_iter()
            .map(|solution| solution.without_temporary_variables())
            .collect();
        Multiset::new(variables, solutions)
    }

    /// Compares two multisets as bags, ignoring the order of the solutions and the declared
    /// variables.
    pub fn bag_eq(&self, other: &Multiset) -> bool {
        self.len() == other.len() && self.counts() == other.counts()
    }

    fn counts(&self) -> FxHashMap<&Solution, usize> {
        let mut counts = FxHashMap::default();
        for solution in self.iter() {
            *counts.entry(solution).or_insert(0) += 1;
        }
        counts
    }
}

impl FromIterator<Solution> for Multiset {
    fn from_iter<T: IntoIterator<Item = Solution>>(iter: T) -> Self {
        Self::from_solutions(iter.into_iter().collect())
    }
}

impl Display for Multiset {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Multiset::Identity => f.write_str("Identity"),
            Multiset::Null => f.write_str("Null"),
            Multiset::Bag(bag) => write!(f, "{}", bag.solutions.iter().join("\n")),
        }
    }
}
