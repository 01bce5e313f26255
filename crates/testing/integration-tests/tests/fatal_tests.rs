//! Fatal error paths: structural defects and the size guard
//!
//! These abort the run with a single typed error and no partial
//! diagnostics, in contrast to semantic violations which always come back
//! as a full list.

use integration_tests::analyze_with;
use jd_driver::{AnalysisError, AnalyzerConfig, UnbalancedScope};
use jd_span::ProgramPoint;

#[test]
fn undeclared_name_is_malformed_program() {
    let err = analyze_with(AnalyzerConfig::default(), |unit| {
        unit.bind("x").read("ghost");
    })
    .expect_err("undeclared name must be fatal");
    assert_eq!(
        err,
        AnalysisError::MalformedProgram {
            name: "ghost".to_string(),
            point: ProgramPoint(1),
        }
    );
}

#[test]
fn malformed_program_suppresses_partial_diagnostics() {
    // The unit contains a real semantic violation before the structural
    // defect; the structural defect wins and nothing partial comes back.
    let result = analyze_with(AnalyzerConfig::default(), |unit| {
        unit.bind("x")
            .bind_move("y", "x")
            .read("x")
            .read("ghost");
    });
    assert!(matches!(
        result,
        Err(AnalysisError::MalformedProgram { ref name, .. }) if name == "ghost"
    ));
}

#[test]
fn scope_exit_without_open_scope_is_unbalanced() {
    let err = analyze_with(AnalyzerConfig::default(), |unit| {
        unit.bind("x").scope_exit();
    })
    .expect_err("extra scope exit must be fatal");
    assert_eq!(
        err,
        AnalysisError::UnbalancedScope {
            cause: UnbalancedScope::ExtraExit(ProgramPoint(1)),
        }
    );
}

#[test]
fn unclosed_scopes_at_end_of_unit_are_unbalanced() {
    let err = analyze_with(AnalyzerConfig::default(), |unit| {
        unit.scope_enter().bind("x");
    })
    .expect_err("unclosed scope must be fatal");
    assert_eq!(
        err,
        AnalysisError::UnbalancedScope {
            cause: UnbalancedScope::Unclosed(1),
        }
    );
}

#[test]
fn oversized_unit_is_rejected_before_semantic_analysis() {
    let config = AnalyzerConfig {
        max_statements: Some(2),
        ..AnalyzerConfig::default()
    };
    // The unit is over the limit and also full of violations; the guard
    // fires first.
    let err = analyze_with(config, |unit| {
        unit.bind("x").bind_move("y", "x").read("x");
    })
    .expect_err("oversized unit must be rejected");
    assert_eq!(
        err,
        AnalysisError::UnitTooLarge {
            actual: 3,
            limit: 2,
        }
    );
}

#[test]
fn unit_at_the_limit_is_analyzed() {
    let config = AnalyzerConfig {
        max_statements: Some(3),
        ..AnalyzerConfig::default()
    };
    let analysis = analyze_with(config, |unit| {
        unit.bind("x").read("x").read("x");
    })
    .expect("unit at the limit must pass the guard");
    assert!(analysis.accepted());
}

#[test]
fn fatal_errors_carry_a_readable_message() {
    let err = analyze_with(AnalyzerConfig::default(), |unit| {
        unit.read("ghost");
    })
    .expect_err("undeclared name must be fatal");
    let message = err.to_string();
    assert!(message.contains("undeclared place `ghost`"));
}
