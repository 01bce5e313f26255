//! Ownership tracking
//!
//! Maintains, per place, where its value stands: not yet initialized, owned,
//! or moved out. The tracker is a plain state machine driven statement by
//! statement; it knows nothing about borrows or scopes beyond what the
//! driver feeds it, which keeps every transition independently testable.
//!
//! Violations never halt tracking: the offending transition is applied
//! anyway so later statements are checked against a consistent state.

use jd_ir::PlaceId;
use jd_span::ProgramPoint;
use rustc_hash::FxHashMap;
use thiserror::Error;

/// Where a place's value stands at the current program point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnershipState {
    /// Declared, but holds no value yet
    Uninitialized,
    /// Holds a value it owns
    Owned,
    /// Its value was transferred away
    MovedOut,
}

impl OwnershipState {
    /// Whether the place currently owns a value
    pub fn is_owned(self) -> bool {
        matches!(self, Self::Owned)
    }
}

/// Ownership rule violations
///
/// Payloads carry place identities; the driver resolves names when it turns
/// these into diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum OwnershipViolation {
    /// Same-scope rebinding of a live name without an explicit shadow
    #[error("duplicate binding in the same scope")]
    DuplicateBinding {
        /// The offending fresh binding
        place: PlaceId,
        /// The binding it collides with
        prior: PlaceId,
    },

    /// Use of a place whose value was moved away
    #[error("use of moved place")]
    UseAfterMove {
        /// The moved-out place
        place: PlaceId,
        /// Where the move happened
        moved_at: ProgramPoint,
    },

    /// Use of a declared place that was never given a value
    #[error("use of uninitialized place")]
    UseOfUninitialized {
        /// The uninitialized place
        place: PlaceId,
    },
}

/// Per-place ownership state machine
///
/// Places enter on declaration and leave when their scope exits; a place
/// with no entry is treated as dead.
#[derive(Debug, Default)]
pub struct OwnershipTracker {
    states: FxHashMap<PlaceId, OwnershipState>,
    moved_at: FxHashMap<PlaceId, ProgramPoint>,
}

impl OwnershipTracker {
    /// Creates an empty tracker with no places declared
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state of `place`; dead or undeclared places read as moved
    pub fn state(&self, place: PlaceId) -> OwnershipState {
        self.states
            .get(&place)
            .copied()
            .unwrap_or(OwnershipState::MovedOut)
    }

    /// Declares a fresh place
    ///
    /// `initialized` distinguishes `Bind` with an initializer from a bare
    /// declaration. When the declaration replaces a same-scope `prior`
    /// binding, the prior's value is dropped here; without an explicit
    /// shadow that replacement is a [`OwnershipViolation::DuplicateBinding`]
    /// if the prior still owned its value.
    pub fn declare(
        &mut self,
        place: PlaceId,
        initialized: bool,
        prior: Option<PlaceId>,
        shadow: bool,
    ) -> Option<OwnershipViolation> {
        let violation = prior.and_then(|prior| {
            let collides = !shadow && self.state(prior).is_owned();
            self.discard(prior);
            collides.then_some(OwnershipViolation::DuplicateBinding { place, prior })
        });

        let state = if initialized {
            OwnershipState::Owned
        } else {
            OwnershipState::Uninitialized
        };
        self.states.insert(place, state);
        violation
    }

    /// Checks that `place` owns a value, without changing state
    ///
    /// This is the access check shared by reads, writes, borrow creation,
    /// and the source side of moves.
    pub fn check_use(&self, place: PlaceId) -> Option<OwnershipViolation> {
        match self.state(place) {
            OwnershipState::Owned => None,
            OwnershipState::Uninitialized => {
                Some(OwnershipViolation::UseOfUninitialized { place })
            }
            OwnershipState::MovedOut => Some(OwnershipViolation::UseAfterMove {
                place,
                moved_at: self
                    .moved_at
                    .get(&place)
                    .copied()
                    .unwrap_or(ProgramPoint::START),
            }),
        }
    }

    /// Moves the value out of `place`
    ///
    /// The transition to `MovedOut` is applied even on violation.
    pub fn move_out(&mut self, place: PlaceId, point: ProgramPoint) -> Option<OwnershipViolation> {
        let violation = self.check_use(place);
        self.states.insert(place, OwnershipState::MovedOut);
        self.moved_at.entry(place).or_insert(point);
        violation
    }

    /// Makes `place` own a value (move destination, rebinding after move)
    pub fn assign(&mut self, place: PlaceId) {
        self.states.insert(place, OwnershipState::Owned);
        self.moved_at.remove(&place);
    }

    /// Removes `place` from consideration (scope exit or replacement)
    pub fn discard(&mut self, place: PlaceId) {
        self.states.remove(&place);
        self.moved_at.remove(&place);
    }

    /// Whether `place` is live and owns its value
    pub fn is_owned(&self, place: PlaceId) -> bool {
        self.state(place).is_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const P0: PlaceId = PlaceId(0);
    const P1: PlaceId = PlaceId(1);

    #[test]
    fn bind_then_move_then_use_flags_use_after_move() {
        let mut tracker = OwnershipTracker::new();
        assert!(tracker.declare(P0, true, None, false).is_none());
        assert!(tracker.move_out(P0, ProgramPoint(1)).is_none());

        let violation = tracker.check_use(P0);
        assert_eq!(
            violation,
            Some(OwnershipViolation::UseAfterMove {
                place: P0,
                moved_at: ProgramPoint(1),
            })
        );
    }

    #[test]
    fn double_move_reports_and_stays_moved() {
        let mut tracker = OwnershipTracker::new();
        tracker.declare(P0, true, None, false);
        assert!(tracker.move_out(P0, ProgramPoint(1)).is_none());
        // Second move is a violation but leaves the state consistent.
        assert!(tracker.move_out(P0, ProgramPoint(2)).is_some());
        assert_eq!(tracker.state(P0), OwnershipState::MovedOut);
    }

    #[test]
    fn uninitialized_use_is_distinct_from_moved_use() {
        let mut tracker = OwnershipTracker::new();
        tracker.declare(P0, false, None, false);
        assert_eq!(
            tracker.check_use(P0),
            Some(OwnershipViolation::UseOfUninitialized { place: P0 })
        );
    }

    #[test]
    fn rebinding_live_name_without_shadow_is_duplicate() {
        let mut tracker = OwnershipTracker::new();
        tracker.declare(P0, true, None, false);
        let violation = tracker.declare(P1, true, Some(P0), false);
        assert_eq!(
            violation,
            Some(OwnershipViolation::DuplicateBinding {
                place: P1,
                prior: P0,
            })
        );
        // The prior binding is gone either way.
        assert_eq!(tracker.state(P0), OwnershipState::MovedOut);
        assert!(tracker.is_owned(P1));
    }

    #[test]
    fn explicit_shadow_is_not_a_duplicate() {
        let mut tracker = OwnershipTracker::new();
        tracker.declare(P0, true, None, false);
        assert!(tracker.declare(P1, true, Some(P0), true).is_none());
    }

    #[test]
    fn rebinding_after_move_is_a_plain_redeclaration() {
        let mut tracker = OwnershipTracker::new();
        tracker.declare(P0, true, None, false);
        tracker.move_out(P0, ProgramPoint(1));
        assert!(tracker.declare(P1, true, Some(P0), false).is_none());
        assert!(tracker.is_owned(P1));
    }

    #[test]
    fn assign_revives_a_moved_destination() {
        let mut tracker = OwnershipTracker::new();
        tracker.declare(P0, true, None, false);
        tracker.move_out(P0, ProgramPoint(1));
        tracker.assign(P0);
        assert!(tracker.check_use(P0).is_none());
    }
}
