//! Borrow tracking
//!
//! Maintains the set of live loans per referent place and answers the
//! conflict queries the analyzer asks statement by statement.
//!
//! # Borrow Rules
//!
//! The loan set of a place is always in one of three shapes:
//! 1. Empty
//! 2. Any number of `Shared` loans
//! 3. Exactly one `Exclusive` loan
//!
//! A loan is held by the binding it was created for and follows the borrow
//! value if it is moved to another place. Retirement is lexical by default
//! (the holder's scope exits); precise retirement after the last use is
//! layered on top by the driver via [`LoanTable::sweep_expired`].

mod error;
mod loans;

pub use error::BorrowViolation;
pub use loans::{Loan, LoanId, LoanKind, LoanTable};
