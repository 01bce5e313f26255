//! End-to-end scenarios over the public analyzer API
//!
//! Each test is a small unit exercising one rule: the accepted shapes come
//! first, then each violation category with the exact diagnostic it must
//! produce.

use integration_tests::{analyze, codes, places};
use jd_driver::DiagnosticCode;

// =============================================================================
// Accepted units
// =============================================================================

#[test]
fn binding_and_reading_is_accepted() {
    let analysis = analyze(|unit| {
        unit.bind("x").read("x").read("x");
    });
    assert!(analysis.accepted());
}

#[test]
fn shared_borrows_coexist() {
    let analysis = analyze(|unit| {
        unit.bind("x")
            .borrow_shared("y", "x")
            .borrow_shared("z", "x")
            .read("y")
            .read("z");
    });
    assert!(analysis.accepted());
}

#[test]
fn exclusive_borrow_grants_write_access() {
    let analysis = analyze(|unit| {
        unit.bind_mut("x")
            .borrow_exclusive("y", "x")
            .write_through("y")
            .read("x");
    });
    assert!(analysis.accepted());
}

#[test]
fn exclusive_borrow_retires_at_scope_exit() {
    // The inner-scope mutable borrow pattern: borrow, write, leave the
    // scope, then use the owner again.
    let analysis = analyze(|unit| {
        unit.bind_mut("book")
            .scope_enter()
            .borrow_exclusive("price", "book")
            .write_through("price")
            .scope_exit()
            .read("book");
    });
    assert!(analysis.accepted());
}

#[test]
fn sequential_exclusive_borrows_in_nested_scopes_are_fine() {
    let analysis = analyze(|unit| {
        unit.bind_mut("x")
            .scope_enter()
            .borrow_exclusive("first", "x")
            .write_through("first")
            .scope_exit()
            .scope_enter()
            .borrow_exclusive("second", "x")
            .write_through("second")
            .scope_exit()
            .read("x");
    });
    assert!(analysis.accepted());
}

#[test]
fn rebinding_after_move_is_a_redeclaration() {
    let analysis = analyze(|unit| {
        unit.bind("x").bind_move("y", "x").bind("x").read("x");
    });
    assert!(analysis.accepted());
}

#[test]
fn explicit_shadow_is_accepted() {
    let analysis = analyze(|unit| {
        unit.bind("x").shadow("x").read("x");
    });
    assert!(analysis.accepted());
}

#[test]
fn move_chain_into_a_sink_is_accepted() {
    // Ownership handed along a chain, each link used once.
    let analysis = analyze(|unit| {
        unit.bind("string1")
            .bind_move("string2", "string1")
            .bind_move("sink", "string2")
            .read("sink");
    });
    assert!(analysis.accepted());
}

#[test]
fn borrow_within_referent_scope_is_contained() {
    let analysis = analyze(|unit| {
        unit.bind("x")
            .scope_enter()
            .borrow_shared("y", "x")
            .read("y")
            .scope_exit()
            .read("x");
    });
    assert!(analysis.accepted());
}

// =============================================================================
// Ownership violations
// =============================================================================

#[test]
fn read_after_move_is_use_after_move() {
    let analysis = analyze(|unit| {
        unit.bind("x").bind_move("y", "x").read("x");
    });
    assert_eq!(codes(&analysis), [DiagnosticCode::UseAfterMove]);
    assert_eq!(places(&analysis), ["x"]);
}

#[test]
fn double_move_is_use_after_move() {
    let analysis = analyze(|unit| {
        unit.bind("x")
            .bind_move("y", "x")
            .bind_move("z", "x");
    });
    assert_eq!(codes(&analysis), [DiagnosticCode::UseAfterMove]);
    assert_eq!(places(&analysis), ["x"]);
}

#[test]
fn read_of_uninitialized_place_is_flagged() {
    let analysis = analyze(|unit| {
        unit.bind_uninit("x").read("x");
    });
    assert_eq!(codes(&analysis), [DiagnosticCode::UseOfUninitialized]);
}

#[test]
fn duplicate_binding_without_shadow_is_flagged() {
    let analysis = analyze(|unit| {
        unit.bind("x").bind("x");
    });
    assert_eq!(codes(&analysis), [DiagnosticCode::DuplicateBinding]);
    assert_eq!(places(&analysis), ["x"]);
}

#[test]
fn moved_source_still_transitions_for_recovery() {
    // After the violation the source stays moved, so a later read reports
    // again instead of cascading something stranger.
    let analysis = analyze(|unit| {
        unit.bind("x")
            .bind_move("y", "x")
            .bind_move("z", "x")
            .read("x");
    });
    assert_eq!(
        codes(&analysis),
        [DiagnosticCode::UseAfterMove, DiagnosticCode::UseAfterMove]
    );
}

// =============================================================================
// Borrow violations
// =============================================================================

#[test]
fn exclusive_then_shared_conflicts() {
    let analysis = analyze(|unit| {
        unit.bind_mut("x")
            .borrow_exclusive("y", "x")
            .borrow_shared("z", "x");
    });
    assert_eq!(codes(&analysis), [DiagnosticCode::ConflictingBorrow]);
    assert_eq!(places(&analysis), ["z"]);
}

#[test]
fn shared_then_exclusive_conflicts() {
    let analysis = analyze(|unit| {
        unit.bind_mut("x")
            .borrow_shared("y", "x")
            .borrow_exclusive("z", "x");
    });
    assert_eq!(codes(&analysis), [DiagnosticCode::ConflictingBorrow]);
    assert_eq!(places(&analysis), ["z"]);
}

#[test]
fn move_while_borrowed_is_flagged() {
    let analysis = analyze(|unit| {
        unit.bind("x").borrow_shared("y", "x").bind_move("z", "x");
    });
    assert_eq!(codes(&analysis), [DiagnosticCode::MoveWhileBorrowed]);
    assert_eq!(places(&analysis), ["x"]);
}

#[test]
fn direct_write_while_borrowed_conflicts() {
    let analysis = analyze(|unit| {
        unit.bind_mut("x")
            .borrow_shared("y", "x")
            .write_through("x");
    });
    assert_eq!(codes(&analysis), [DiagnosticCode::ConflictingBorrow]);
    assert_eq!(places(&analysis), ["x"]);
}

#[test]
fn write_through_shared_borrow_conflicts() {
    let analysis = analyze(|unit| {
        unit.bind_mut("x")
            .borrow_shared("y", "x")
            .write_through("y");
    });
    assert_eq!(codes(&analysis), [DiagnosticCode::ConflictingBorrow]);
    assert_eq!(places(&analysis), ["y"]);
}

#[test]
fn borrow_of_moved_place_is_use_after_move() {
    let analysis = analyze(|unit| {
        unit.bind("x").bind_move("y", "x").borrow_shared("z", "x");
    });
    assert_eq!(codes(&analysis), [DiagnosticCode::UseAfterMove]);
}

// =============================================================================
// Lifetime violations
// =============================================================================

#[test]
fn borrow_escaping_its_scope_dangles() {
    let analysis = analyze(|unit| {
        unit.scope_enter()
            .bind("x")
            .borrow_shared("y", "x")
            .scope_exit()
            .read("y");
    });
    assert_eq!(codes(&analysis), [DiagnosticCode::DanglingReference]);
    assert_eq!(places(&analysis), ["y"]);
}

#[test]
fn borrow_moved_to_enclosing_scope_dangles() {
    let analysis = analyze(|unit| {
        unit.bind("holder")
            .scope_enter()
            .bind("x")
            .borrow_shared("y", "x")
            .move_to("holder", "y")
            .scope_exit()
            .read("holder");
    });
    // Reported at the escaping move and again when the dead borrow is used.
    assert_eq!(
        codes(&analysis),
        [
            DiagnosticCode::DanglingReference,
            DiagnosticCode::DanglingReference
        ]
    );
    assert_eq!(places(&analysis), ["holder", "holder"]);
}

#[test]
fn owner_use_after_its_scope_closed_reads_as_moved() {
    let analysis = analyze(|unit| {
        unit.scope_enter().bind("x").scope_exit().read("x");
    });
    assert_eq!(codes(&analysis), [DiagnosticCode::UseAfterMove]);
}

#[test]
fn shadowing_a_borrowed_value_dangles_its_borrows() {
    // The shadowed-out value is dropped at the shadow point, so the borrow
    // created before the shadow has nothing left to refer to.
    let analysis = analyze(|unit| {
        unit.bind("x").borrow_shared("y", "x").shadow("x").read("y");
    });
    assert_eq!(
        codes(&analysis),
        [
            DiagnosticCode::DanglingReference,
            DiagnosticCode::DanglingReference
        ]
    );
}
