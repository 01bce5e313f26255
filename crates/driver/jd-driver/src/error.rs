//! Fatal analysis errors

use jd_scope::{ScopeError, UnbalancedScope};
use jd_span::ProgramPoint;
use miette::Diagnostic;
use thiserror::Error;

/// Errors that abort an analysis run
///
/// Unlike semantic violations, these return immediately with no partial
/// diagnostics: the unit is either structurally unanalyzable or over the
/// configured size guard.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum AnalysisError {
    /// A statement refers to a name with no prior declaration
    #[error("malformed program: statement {point} refers to undeclared place `{name}`")]
    #[diagnostic(
        code(jackdaw::malformed_program),
        help("every place must be declared before it is used")
    )]
    MalformedProgram {
        /// The unresolvable name
        name: String,
        /// Where it was used
        point: ProgramPoint,
    },

    /// Scope markers do not nest
    #[error("unbalanced scopes: {cause}")]
    #[diagnostic(code(jackdaw::unbalanced_scope))]
    UnbalancedScope {
        /// Which way the nesting failed
        cause: UnbalancedScope,
    },

    /// The unit exceeds the configured statement limit
    #[error("unit has {actual} statements, limit is {limit}")]
    #[diagnostic(
        code(jackdaw::unit_too_large),
        help("raise `max_statements` or split the unit")
    )]
    UnitTooLarge {
        /// Statements in the rejected unit
        actual: usize,
        /// The configured limit
        limit: usize,
    },
}

impl From<ScopeError> for AnalysisError {
    fn from(err: ScopeError) -> Self {
        match err {
            ScopeError::MalformedProgram { name, point } => Self::MalformedProgram { name, point },
            ScopeError::UnbalancedScope(cause) => Self::UnbalancedScope { cause },
        }
    }
}
