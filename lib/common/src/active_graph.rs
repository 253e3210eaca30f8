use rdf_walk_model::{GraphName, NamedOrBlankNode};
use std::fmt::Display;

/// The active graph defines which graphs can partake in the pattern matching process.
#[derive(Default, Debug, Clone, PartialEq, Eq, Hash)]
pub enum ActiveGraph {
    /// Only the default graph forms the active graph.
    #[default]
    DefaultGraph,
    /// A single named graph forms the active graph. This corresponds to the inner pattern of a
    /// `GRAPH` clause.
    NamedGraph(NamedOrBlankNode),
    /// Any graph, including the default graph, forms the active graph.
    AllGraphs,
    /// A set of graphs forms the active graph. This allows expressing the user-intent of queries
    /// that use the `FROM` clause.
    Union(Vec<GraphName>),
    /// Any named graph is part of the active graph.
    AnyNamedGraph,
}

impl ActiveGraph {
    /// Returns whether `graph` is part of the active graph.
    pub fn contains(&self, graph: &GraphName) -> bool {
        match self {
            ActiveGraph::DefaultGraph => graph.is_default_graph(),
            ActiveGraph::NamedGraph(name) => match (name, graph) {
                (NamedOrBlankNode::NamedNode(lhs), GraphName::NamedNode(rhs)) => lhs == rhs,
                (NamedOrBlankNode::BlankNode(lhs), GraphName::BlankNode(rhs)) => lhs == rhs,
                _ => false,
            },
            ActiveGraph::AllGraphs => true,
            ActiveGraph::Union(graphs) => graphs.contains(graph),
            ActiveGraph::AnyNamedGraph => !graph.is_default_graph(),
        }
    }

    /// Returns whether the active graph may consist of more than one graph. Matches against such
    /// an active graph must not return the same triple twice.
    pub fn is_union(&self) -> bool {
        !matches!(self, ActiveGraph::DefaultGraph | ActiveGraph::NamedGraph(_))
    }
}

impl Display for ActiveGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActiveGraph::DefaultGraph => write!(f, "Default Graph"),
            ActiveGraph::NamedGraph(graph) => write!(f, "Graph {graph}"),
            ActiveGraph::AllGraphs => write!(f, "All Graphs"),
            ActiveGraph::Union(graphs) => write!(f, "Union of {graphs:?}"),
            ActiveGraph::AnyNamedGraph => write!(f, "Any Named Graph"),
        }
    }
}
