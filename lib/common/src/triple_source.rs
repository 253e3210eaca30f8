use crate::error::StorageError;
use crate::ActiveGraph;
use rdf_walk_model::{NamedOrBlankNode, Term, TermRef, Triple};
use std::fmt::{Debug, Display, Formatter};

/// A lazy sequence of triples returned by a [TripleSource].
pub type TripleIter<'source> = Box<dyn Iterator<Item = Result<Triple, StorageError>> + 'source>;

/// A triple pattern in which every position is either a bound term or a wildcard.
///
/// Unlike a query pattern, a [TriplePatternMatch] contains no variables. Repeated variables and
/// variable bindings are the responsibility of the caller.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct TriplePatternMatch {
    pub subject: Option<Term>,
    pub predicate: Option<Term>,
    pub object: Option<Term>,
}

impl TriplePatternMatch {
    /// Creates a new [TriplePatternMatch].
    pub fn new(subject: Option<Term>, predicate: Option<Term>, object: Option<Term>) -> Self {
        Self {
            subject,
            predicate,
            object,
        }
    }

    /// Returns whether `triple` matches this pattern.
    pub fn matches(&self, triple: &Triple) -> bool {
        fn matches_position(pattern: Option<&Term>, term: TermRef<'_>) -> bool {
            pattern.map_or(true, |p| p.as_ref() == term)
        }

        matches_position(self.subject.as_ref(), triple.subject.as_ref().into())
            && matches_position(self.predicate.as_ref(), triple.predicate.as_ref().into())
            && matches_position(self.object.as_ref(), triple.object.as_ref())
    }

    /// Returns whether no position is bound.
    pub fn is_wildcard(&self) -> bool {
        self.subject.is_none() && self.predicate.is_none() && self.object.is_none()
    }
}

impl Display for TriplePatternMatch {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (i, term) in [&self.subject, &self.predicate, &self.object]
            .into_iter()
            .enumerate()
        {
            if i > 0 {
                f.write_str(" ")?;
            }
            match term {
                Some(term) => write!(f, "{term}")?,
                None => f.write_str("*")?,
            }
        }
        Ok(())
    }
}

/// The dataset contract consumed by the evaluation engine.
///
/// # Consistency
///
/// A query evaluation issues many matches against the same source. It is the responsibility of
/// the implementation to answer all of them from the same snapshot of the data.
///
/// # Concurrency
///
/// Independent branches of a query may be evaluated on different threads. Hence, implementations
/// must support concurrent reads.
pub trait TripleSource: Debug + Send + Sync {
    /// Returns the triples of `active_graph` that match `pattern`.
    ///
    /// If the active graph consists of multiple graphs, each matching triple must only be
    /// returned once.
    fn match_triples(
        &self,
        pattern: &TriplePatternMatch,
        active_graph: &ActiveGraph,
    ) -> Result<TripleIter<'_>, StorageError>;

    /// Returns the list of named graphs of this source.
    fn named_graphs(&self) -> Result<Vec<NamedOrBlankNode>, StorageError>;

    /// Returns whether `pattern` has at least one match in `active_graph`.
    fn contains(
        &self,
        pattern: &TriplePatternMatch,
        active_graph: &ActiveGraph,
    ) -> Result<bool, StorageError> {
        self.match_triples(pattern, active_graph)?
            .next()
            .transpose()
            .map(|triple| triple.is_some())
    }
}
