mod from_sparql;
mod substitution;
mod to_query;

pub use from_sparql::from_sparql;
pub use substitution::VariableSubstitution;
pub use to_query::to_query;
