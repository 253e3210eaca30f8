//! Contains dataset implementations for [RDF Walk](https://docs.rs/rdf-walk/).

pub mod memory;

pub use memory::MemoryDataset;
