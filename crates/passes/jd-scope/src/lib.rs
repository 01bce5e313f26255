//! Scope tree construction and name resolution
//!
//! The first pass over a unit. A linear scan maintains a stack of open
//! scopes, assigns every declaration a fresh [`jd_ir::PlaceId`], and rewrites
//! each statement with resolved place identities so the semantic trackers
//! never deal with names. Structural defects (undeclared names, unbalanced
//! scope markers) are fatal here; everything downstream can assume a
//! well-formed unit.
//!
//! # Architecture
//!
//! - [`ScopeTree`]: arena of lexical scopes with parent links
//! - [`ScopeTreeBuilder`]: the linear scan producing a [`ResolvedUnit`]
//! - [`ScopeError`]: fatal structural errors

mod error;
mod resolve;
mod tree;

pub use error::{ScopeError, UnbalancedScope};
pub use resolve::{
    PlaceDecl, PlaceRef, ResolvedInit, ResolvedStmt, ResolvedUnit, ScopeTreeBuilder,
};
pub use tree::{ScopeData, ScopeId, ScopeTree};
