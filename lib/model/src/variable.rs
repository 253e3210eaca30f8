use oxrdf::{BlankNode, Variable};

/// Prefix of variables that are introduced by the engine and never by a user.
///
/// The prefix is not a valid start of a SPARQL variable name. Hence, temporary variables can never
/// clash with variables from a query.
pub const TEMPORARY_VARIABLE_PREFIX: &str = "_:";

/// Returns whether `variable` was introduced by the engine (e.g., for a blank node in a pattern or
/// for an intermediate node of a property path).
pub fn is_temporary_variable(variable: &Variable) -> bool {
    variable.as_str().starts_with(TEMPORARY_VARIABLE_PREFIX)
}

/// Creates a temporary variable with the given `name`.
pub fn temporary_variable(name: impl AsRef<str>) -> Variable {
    Variable::new_unchecked(format!("{TEMPORARY_VARIABLE_PREFIX}{}", name.as_ref()))
}

/// Creates the temporary variable that stands for the blank node of a query pattern.
pub fn blank_node_variable(blank_node: &BlankNode) -> Variable {
    temporary_variable(blank_node.as_str())
}

/// Returns the name of a temporary variable without its prefix.
pub fn temporary_variable_name(variable: &Variable) -> Option<&str> {
    variable.as_str().strip_prefix(TEMPORARY_VARIABLE_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_node_variables_are_temporary() {
        let variable = blank_node_variable(&BlankNode::new_unchecked("b0"));
        assert!(is_temporary_variable(&variable));
        assert_eq!(temporary_variable_name(&variable), Some("b0"));
    }

    #[test]
    fn query_variables_are_not_temporary() {
        let variable = Variable::new_unchecked("b0");
        assert!(!is_temporary_variable(&variable));
        assert_eq!(temporary_variable_name(&variable), None);
    }
}
