use rdf_walk_common::TriplePatternMatch;
use rdf_walk_model::{Term, Triple};
use rustc_hash::{FxHashMap, FxHashSet};

/// The triples of a single graph, indexed by each position.
///
/// Triples are kept in insertion order. Matching walks the smallest index list of the bound
/// positions and filters the remaining positions, so results are deterministic.
#[derive(Clone, Debug, Default)]
pub(super) struct GraphIndex {
    triples: Vec<Triple>,
    contained: FxHashSet<Triple>,
    subjects: FxHashMap<Term, Vec<usize>>,
    predicates: FxHashMap<Term, Vec<usize>>,
    objects: FxHashMap<Term, Vec<usize>>,
}

impl GraphIndex {
    pub(super) fn len(&self) -> usize {
        self.triples.len()
    }

    /// Inserts `triple`. Returns `false` if the triple was already part of the graph.
    pub(super) fn insert(&mut self, triple: Triple) -> bool {
        if self.contained.contains(&triple) {
            return false;
        }

        let position = self.triples.len();
        self.subjects
            .entry(triple.subject.clone().into())
            .or_default()
            .push(position);
        self.predicates
            .entry(triple.predicate.clone().into())
            .or_default()
            .push(position);
        self.objects
            .entry(triple.object.clone())
            .or_default()
            .push(position);
        self.contained.insert(triple.clone());
        self.triples.push(triple);
        true
    }

    /// Returns the triples matching `pattern`.
    pub(super) fn matches<'index>(
        &'index self,
        pattern: &TriplePatternMatch,
    ) -> impl Iterator<Item = &'index Triple> + 'index {
        let candidates = self.candidate_positions(pattern);
        let pattern = pattern.clone();
        let positions: Box<dyn Iterator<Item = usize> + 'index> = match candidates {
            Candidates::All => Box::new(0..self.triples.len()),
            Candidates::Some(positions) => Box::new(positions.iter().copied()),
            Candidates::None => Box::new(std::iter::empty()),
        };
        positions
            .map(|position| &self.triples[position])
            .filter(move |triple| pattern.matches(triple))
    }

    fn candidate_positions(&self, pattern: &TriplePatternMatch) -> Candidates<'_> {
        let lookups = [
            (&pattern.subject, &self.subjects),
            (&pattern.predicate, &self.predicates),
            (&pattern.object, &self.objects),
        ];

        let mut result = Candidates::All;
        for (term, index) in lookups {
            let Some(term) = term else {
                continue;
            };
            let Some(positions) = index.get(term) else {
                return Candidates::None;
            };
            result = match result {
                Candidates::Some(current) if current.len() <= positions.len() => {
                    Candidates::Some(current)
                }
                _ => Candidates::Some(positions),
            };
        }
        result
    }
}

enum Candidates<'index> {
    All,
    Some(&'index [usize]),
    None,
}
