mod dataset;
mod graph_index;

pub use dataset::MemoryDataset;
