//! Analysis driver for the Jackdaw ownership verifier
//!
//! This crate owns the public surface: it takes a [`jd_ir::Unit`], runs the
//! scope pass, then drives the ownership, borrow, and lifetime trackers
//! through one joint statement-by-statement traversal, and returns every
//! semantic violation found.
//!
//! # Architecture
//!
//! - [`Analyzer`]: configured entry point; one call per unit
//! - [`UnitAnalysis`]: ordered diagnostics plus the computed borrow extents
//! - [`Diagnostic`] / [`DiagnosticCode`]: the closed violation taxonomy
//! - [`AnalysisError`]: fatal structural errors (no partial results)
//!
//! Semantic violations never abort a run: the offending transition is
//! applied to keep tracker state consistent, and checking continues, so one
//! run reports everything it can find.
//!
//! # Examples
//!
//! ```rust
//! use jd_driver::{Analyzer, AnalyzerConfig};
//! use jd_intern::Interner;
//! use jd_ir::UnitBuilder;
//!
//! let interner = Interner::new();
//! let mut unit = UnitBuilder::new(interner.clone());
//! unit.bind("x").bind_move("y", "x").read("x");
//!
//! let analyzer = Analyzer::new(AnalyzerConfig::default());
//! let analysis = analyzer
//!     .analyze(&unit.finish(), &interner)
//!     .expect("unit is well formed");
//! assert!(!analysis.accepted());
//! ```

mod analyzer;
mod config;
mod diagnostics;
mod error;

pub use analyzer::{Analyzer, LoanSummary, UnitAnalysis};
pub use config::AnalyzerConfig;
pub use diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSink};
pub use error::AnalysisError;
pub use jd_scope::UnbalancedScope;
