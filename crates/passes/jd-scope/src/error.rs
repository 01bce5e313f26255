//! Fatal structural errors for scope construction

use jd_span::ProgramPoint;
use thiserror::Error;

/// The two ways scope markers can fail to nest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum UnbalancedScope {
    /// A `ScopeExit` with only the root scope open
    #[error("scope exit at statement {0} with no open scope")]
    ExtraExit(ProgramPoint),

    /// The unit ended before every opened scope was closed
    #[error("unit ended with {0} scope(s) still open")]
    Unclosed(usize),
}

/// Structural defects in the input unit
///
/// These abort the analysis run before any semantic checking; no partial
/// diagnostics are produced alongside them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScopeError {
    /// A statement refers to a name with no prior declaration
    #[error("statement {point} refers to undeclared place `{name}`")]
    MalformedProgram {
        /// The unresolvable name
        name: String,
        /// Where it was used
        point: ProgramPoint,
    },

    /// Scope markers do not nest
    #[error("unbalanced scopes: {0}")]
    UnbalancedScope(#[from] UnbalancedScope),
}
