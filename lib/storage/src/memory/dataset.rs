use crate::memory::graph_index::GraphIndex;
use rdf_walk_common::error::StorageError;
use rdf_walk_common::{ActiveGraph, TripleIter, TriplePatternMatch, TripleSource};
use rdf_walk_model::{GraphName, NamedOrBlankNode, Quad, Triple};
use rustc_hash::{FxHashMap, FxHashSet};

/// An in-memory RDF dataset.
///
/// A [MemoryDataset] is a plain value. Sharing it behind an `Arc` gives readers a consistent
/// snapshot while writers use copy-on-write (e.g., [Arc::make_mut](std::sync::Arc::make_mut)).
#[derive(Clone, Debug, Default)]
pub struct MemoryDataset {
    graphs: FxHashMap<GraphName, GraphIndex>,
    /// The graphs in the order in which they were created.
    graph_order: Vec<GraphName>,
}

impl MemoryDataset {
    /// Creates an empty dataset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of quads in the dataset.
    pub fn len(&self) -> usize {
        self.graphs.values().map(GraphIndex::len).sum()
    }

    /// Returns whether the dataset contains no quads.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Inserts `quad`. Returns `false` if the quad was already part of the dataset.
    pub fn insert(&mut self, quad: Quad) -> bool {
        let triple = Triple::new(quad.subject, quad.predicate, quad.object);
        self.graph_mut(quad.graph_name).insert(triple)
    }

    /// Inserts all `quads` and returns the number of newly inserted quads.
    pub fn extend(&mut self, quads: impl IntoIterator<Item = Quad>) -> usize {
        quads
            .into_iter()
            .map(|quad| self.insert(quad))
            .filter(|inserted| *inserted)
            .count()
    }

    /// Creates an empty named graph. Returns `false` if the graph already existed.
    pub fn insert_named_graph(&mut self, graph_name: NamedOrBlankNode) -> bool {
        let graph_name = GraphName::from(graph_name);
        if self.graphs.contains_key(&graph_name) {
            return false;
        }
        self.graph_mut(graph_name);
        true
    }

    fn graph_mut(&mut self, graph_name: GraphName) -> &mut GraphIndex {
        if !self.graphs.contains_key(&graph_name) {
            self.graph_order.push(graph_name.clone());
        }
        self.graphs.entry(graph_name).or_default()
    }

    fn graphs_in(&self, active_graph: &ActiveGraph) -> Vec<&GraphIndex> {
        self.graph_order
            .iter()
            .filter(|name| active_graph.contains(name))
            .filter_map(|name| self.graphs.get(name))
            .collect()
    }
}

impl FromIterator<Quad> for MemoryDataset {
    fn from_iter<T: IntoIterator<Item = Quad>>(iter: T) -> Self {
        let mut dataset = Self::new();
        dataset.extend(iter);
        dataset
    }
}

impl TripleSource for MemoryDataset {
    fn match_triples(
        &self,
        pattern: &TriplePatternMatch,
        active_graph: &ActiveGraph,
    ) -> Result<TripleIter<'_>, StorageError> {
        if !active_graph.is_union() {
            let graph = self
                .graph_order
                .iter()
                .find(|name| active_graph.contains(name))
                .and_then(|name| self.graphs.get(name));
            let Some(graph) = graph else {
                return Ok(Box::new(std::iter::empty()));
            };
            return Ok(Box::new(
                graph.matches(pattern).map(|triple| Ok(triple.clone())),
            ));
        }

        // The active graph is the RDF merge of multiple graphs, so each triple is returned once.
        let graphs = self.graphs_in(active_graph);
        let pattern = pattern.clone();
        let mut seen = FxHashSet::default();
        Ok(Box::new(
            graphs
                .into_iter()
                .flat_map(move |graph| graph.matches(&pattern))
                .filter(move |triple| seen.insert(*triple))
                .map(|triple| Ok(triple.clone())),
        ))
    }

    fn named_graphs(&self) -> Result<Vec<NamedOrBlankNode>, StorageError> {
        Ok(self
            .graph_order
            .iter()
            .filter_map(|name| match name {
                GraphName::NamedNode(node) => Some(node.clone().into()),
                GraphName::BlankNode(node) => Some(node.clone().into()),
                GraphName::DefaultGraph => None,
            })
            .collect())
    }
}
