mod active_graph;
pub mod error;
mod triple_source;

pub use active_graph::ActiveGraph;
pub use triple_source::{TripleIter, TriplePatternMatch, TripleSource};
