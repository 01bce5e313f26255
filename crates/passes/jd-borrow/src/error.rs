//! Borrow rule violations

use jd_ir::PlaceId;
use thiserror::Error;

use crate::loans::{LoanId, LoanKind};

/// Violations of the exclusivity rules
///
/// The last two variants are distinct here for message quality, but they are
/// the same category of defect as the first: an access denied by a live loan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BorrowViolation {
    /// A new loan that cannot coexist with a live one
    #[error("conflicting borrow")]
    ConflictingBorrow {
        /// Binding of the rejected new borrow
        dest: PlaceId,
        /// The place both loans refer to
        referent: PlaceId,
        /// Kind of the rejected new borrow
        requested: LoanKind,
        /// The live loan it collides with
        existing: LoanId,
    },

    /// Moving a value out while a loan of it is live
    #[error("cannot move out of a borrowed place")]
    MoveWhileBorrowed {
        /// The place being moved from
        place: PlaceId,
        /// The live loan preventing the move
        loan: LoanId,
    },

    /// Direct write to a place while a loan of it is live
    #[error("cannot write to a borrowed place")]
    WriteWhileBorrowed {
        /// The place being written
        place: PlaceId,
        /// The live loan preventing the write
        loan: LoanId,
    },

    /// Write through a binding that holds a shared loan
    #[error("cannot write through a shared borrow")]
    WriteThroughShared {
        /// The binding holding the shared loan
        place: PlaceId,
        /// That loan
        loan: LoanId,
    },
}
