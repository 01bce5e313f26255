//! Lifetime containment checks
//!
//! Every loan must satisfy `valid_extent(loan) ⊆ scope_lifetime(referent)`:
//! a borrow may not be used, nor remain held, beyond the scope its referent
//! is declared in. Containment is decided on the scope tree alone, by the
//! ancestor relation: the referent's declaring scope must contain every
//! scope that holds or uses the borrow.
//!
//! Violations surface at the point the borrow would first outlive its
//! referent: the move that propagates it to an enclosing scope, the scope
//! exit that drops the referent out from under it, or the use of a borrow
//! binding whose own scope already closed.

use jd_borrow::{Loan, LoanId};
use jd_ir::PlaceId;
use jd_scope::{ScopeId, ScopeTree};
use jd_span::{PointSpan, ProgramPoint};
use thiserror::Error;

/// Ways a borrow can outlive what it refers to
///
/// Every variant reports as a dangling reference; they are distinct so the
/// message can say which way the borrow escaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LifetimeViolation {
    /// The borrow was moved into a scope that outlives its referent
    #[error("borrow escapes to a scope that outlives its referent")]
    EscapesReferent {
        /// The escaping loan
        loan: LoanId,
        /// Its referent
        referent: PlaceId,
        /// The destination binding in the longer-lived scope
        dest: PlaceId,
    },

    /// The referent was dropped while the borrow lives on elsewhere
    #[error("value dropped while still borrowed")]
    ReferentDropped {
        /// The surviving loan
        loan: LoanId,
        /// The dropped referent
        referent: PlaceId,
        /// The binding still holding the borrow
        holder: PlaceId,
    },

    /// A borrow binding was used after its scope closed
    #[error("borrow used after its scope closed")]
    UseOfDeadBorrow {
        /// The dead binding
        place: PlaceId,
        /// The loan it held
        loan: LoanId,
    },
}

/// Containment checks over a unit's scope tree
pub struct LifetimeResolver<'tree> {
    tree: &'tree ScopeTree,
}

impl<'tree> LifetimeResolver<'tree> {
    /// Creates a resolver deciding containment against `tree`
    pub fn new(tree: &'tree ScopeTree) -> Self {
        Self { tree }
    }

    /// Whether a value in `referent_scope` outlives anything in `holder_scope`
    pub fn outlives(&self, referent_scope: ScopeId, holder_scope: ScopeId) -> bool {
        self.tree.is_ancestor_or_self(referent_scope, holder_scope)
    }

    /// Checks a borrow value moving into a binding in `dest_scope`
    ///
    /// The referent must outlive the destination, i.e. its declaring scope
    /// must contain `dest_scope`.
    pub fn check_transfer(
        &self,
        loan: &Loan,
        referent_scope: ScopeId,
        dest: PlaceId,
        dest_scope: ScopeId,
    ) -> Option<LifetimeViolation> {
        if self.outlives(referent_scope, dest_scope) {
            None
        } else {
            Some(LifetimeViolation::EscapesReferent {
                loan: loan.id,
                referent: loan.referent,
                dest,
            })
        }
    }

    /// Checks a loan at the point its referent dies with `dying_scope`
    ///
    /// A holder inside the dying scope dies with it, which is fine; a holder
    /// outside survives the referent, which is not.
    pub fn check_referent_death(
        &self,
        loan: &Loan,
        dying_scope: ScopeId,
        holder_scope: ScopeId,
    ) -> Option<LifetimeViolation> {
        if self.tree.is_ancestor_or_self(dying_scope, holder_scope) {
            None
        } else {
            Some(LifetimeViolation::ReferentDropped {
                loan: loan.id,
                referent: loan.referent,
                holder: loan.holder,
            })
        }
    }
}

/// The half-open range of points where a loan may be used
///
/// Runs from creation to retirement; a loan never retired during the pass
/// (held at root until the end) extends to the end of the unit.
pub fn valid_extent(loan: &Loan, unit_len: usize) -> PointSpan {
    let end = loan
        .retired_at
        .unwrap_or(ProgramPoint(unit_len as u32));
    PointSpan::new(loan.created_at, end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jd_borrow::{LoanKind, LoanTable};

    fn loan_in(table: &mut LoanTable, referent: PlaceId, scope: ScopeId, holder: PlaceId) -> LoanId {
        table.create(
            referent,
            LoanKind::Shared,
            ProgramPoint(2),
            scope,
            holder,
            None,
        )
    }

    #[test]
    fn transfer_outward_is_an_escape() {
        let mut tree = ScopeTree::new();
        let root = tree.root();
        let inner = tree.create_child(root, ProgramPoint(1));

        let mut table = LoanTable::new();
        let loan = loan_in(&mut table, PlaceId(1), inner, PlaceId(2));
        let resolver = LifetimeResolver::new(&tree);

        // Referent lives in `inner`; moving the borrow to a root binding
        // lets it outlive the referent.
        let violation =
            resolver.check_transfer(table.loan(loan), inner, PlaceId(0), root);
        assert_eq!(
            violation,
            Some(LifetimeViolation::EscapesReferent {
                loan,
                referent: PlaceId(1),
                dest: PlaceId(0),
            })
        );

        // The other direction is contained.
        assert!(resolver
            .check_transfer(table.loan(loan), root, PlaceId(3), inner)
            .is_none());
    }

    #[test]
    fn holder_dying_with_the_referent_is_contained() {
        let mut tree = ScopeTree::new();
        let root = tree.root();
        let inner = tree.create_child(root, ProgramPoint(1));

        let mut table = LoanTable::new();
        let loan = loan_in(&mut table, PlaceId(1), inner, PlaceId(2));
        let resolver = LifetimeResolver::new(&tree);

        assert!(resolver
            .check_referent_death(table.loan(loan), inner, inner)
            .is_none());
        assert!(resolver
            .check_referent_death(table.loan(loan), inner, root)
            .is_some());
    }

    #[test]
    fn extent_of_unretired_loan_reaches_unit_end() {
        let mut table = LoanTable::new();
        let tree = ScopeTree::new();
        let loan = loan_in(&mut table, PlaceId(1), tree.root(), PlaceId(2));
        assert_eq!(
            valid_extent(table.loan(loan), 7),
            PointSpan::new(ProgramPoint(2), ProgramPoint(7))
        );

        table.retire(loan, ProgramPoint(5));
        assert_eq!(
            valid_extent(table.loan(loan), 7),
            PointSpan::new(ProgramPoint(2), ProgramPoint(5))
        );
    }
}
