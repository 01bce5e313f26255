//! Shared helpers for end-to-end analyzer tests
//!
//! Tests describe a unit through [`jd_ir::UnitBuilder`], run the full
//! pipeline through the public driver API, and assert on the resulting
//! diagnostic sequence.

use jd_driver::{AnalysisError, Analyzer, AnalyzerConfig, DiagnosticCode, UnitAnalysis};
use jd_intern::Interner;
use jd_ir::{Unit, UnitBuilder};

/// Builds a unit, returning it with the interner its names live in
pub fn build_unit(make: impl FnOnce(&mut UnitBuilder)) -> (Unit, Interner) {
    let interner = Interner::new();
    let mut builder = UnitBuilder::new(interner.clone());
    make(&mut builder);
    (builder.finish(), interner)
}

/// Analyzes a unit under `config`, propagating fatal errors
pub fn analyze_with(
    config: AnalyzerConfig,
    make: impl FnOnce(&mut UnitBuilder),
) -> Result<UnitAnalysis, AnalysisError> {
    let (unit, interner) = build_unit(make);
    Analyzer::new(config).analyze(&unit, &interner)
}

/// Analyzes a structurally well-formed unit under the default (lexical)
/// configuration
///
/// # Panics
///
/// Panics if the unit fails structurally; tests for fatal errors go through
/// [`analyze_with`] instead.
pub fn analyze(make: impl FnOnce(&mut UnitBuilder)) -> UnitAnalysis {
    analyze_with(AnalyzerConfig::default(), make).expect("unit must be structurally well formed")
}

/// The diagnostic codes of an analysis, in report order
pub fn codes(analysis: &UnitAnalysis) -> Vec<DiagnosticCode> {
    analysis
        .diagnostics
        .iter()
        .map(|diagnostic| diagnostic.code)
        .collect()
}

/// The offending place names of an analysis, in report order
pub fn places(analysis: &UnitAnalysis) -> Vec<String> {
    analysis
        .diagnostics
        .iter()
        .map(|diagnostic| diagnostic.place_name.clone())
        .collect()
}
