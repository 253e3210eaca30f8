#![doc = include_str!("../README.md")]
#![doc(test(attr(deny(warnings))))]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

mod error;
mod results;
mod store;

pub use error::QueryError;
pub use rdf_walk_engine::QueryOptions;
pub use results::{QueryResults, QuerySolutions};
pub use store::Store;

pub mod model {
    pub use rdf_walk_model::*;
}

pub mod algebra {
    pub use rdf_walk_algebra::*;
}

pub mod engine {
    pub use rdf_walk_engine::*;
}

pub mod storage {
    pub use rdf_walk_common::*;
    pub use rdf_walk_storage::*;
}
