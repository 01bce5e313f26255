//! The joint traversal over a resolved unit
//!
//! Ownership, borrow, and lifetime rules are checked together, statement by
//! statement, because borrow and lifetime validity depend on the ownership
//! state at each point. The trackers stay separate; this module is the only
//! place that knows the order checks run in and how violations map onto the
//! diagnostic taxonomy.

use jd_borrow::{BorrowViolation, LoanKind, LoanTable};
use jd_intern::Interner;
use jd_ir::{PlaceId, Unit};
use jd_lifetime::{LifetimeResolver, LifetimeViolation, valid_extent};
use jd_ownership::{OwnershipTracker, OwnershipViolation};
use jd_scope::{PlaceRef, ResolvedInit, ResolvedStmt, ResolvedUnit, ScopeId, ScopeTreeBuilder};
use jd_span::{PointSpan, ProgramPoint};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::config::AnalyzerConfig;
use crate::diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSink};
use crate::error::AnalysisError;

/// A borrow and its computed validity extent
///
/// Part of the analysis result so the lexical/precise distinction is
/// observable by hosts and tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanSummary {
    /// The borrowed place
    pub referent: PlaceId,
    /// Its source name
    pub referent_name: String,
    /// Shared or exclusive
    pub kind: LoanKind,
    /// Points where the borrow was valid
    pub extent: PointSpan,
}

/// Result of analyzing one unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitAnalysis {
    /// Every violation found, in program order
    pub diagnostics: Vec<Diagnostic>,
    /// Every borrow created by the unit, in creation order
    pub loans: Vec<LoanSummary>,
}

impl UnitAnalysis {
    /// Whether the unit satisfied every ownership and borrowing rule
    pub fn accepted(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// The configured analyzer
///
/// Holds no per-unit state; one instance can check any number of units,
/// sequentially or in parallel.
#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    config: AnalyzerConfig,
}

impl Analyzer {
    /// Creates an analyzer running under `config`
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    /// The configuration this analyzer runs with
    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Analyzes a single unit
    ///
    /// # Errors
    ///
    /// Fails with [`AnalysisError`] on structural defects (undeclared names,
    /// unbalanced scopes) or when the unit exceeds `max_statements`; semantic
    /// violations are returned inside the [`UnitAnalysis`] instead.
    pub fn analyze(&self, unit: &Unit, interner: &Interner) -> Result<UnitAnalysis, AnalysisError> {
        if let Some(limit) = self.config.max_statements {
            if unit.len() > limit {
                return Err(AnalysisError::UnitTooLarge {
                    actual: unit.len(),
                    limit,
                });
            }
        }

        let resolved = ScopeTreeBuilder::build(unit, interner)?;
        let last_uses = if self.config.precise_borrow_extents {
            compute_last_uses(&resolved)
        } else {
            Vec::new()
        };

        let pass = UnitPass {
            resolved: &resolved,
            interner,
            precise: self.config.precise_borrow_extents,
            last_uses,
            created_loans: 0,
            ownership: OwnershipTracker::new(),
            loans: LoanTable::new(),
            sink: DiagnosticSink::new(),
        };
        Ok(pass.run())
    }

    /// Analyzes independent units in parallel
    ///
    /// Each worker owns its own tracker state; results come back in input
    /// order. Nothing is shared between units beyond the interner, so no
    /// locking is involved.
    pub fn analyze_all(
        &self,
        units: &[Unit],
        interner: &Interner,
    ) -> Vec<Result<UnitAnalysis, AnalysisError>> {
        std::thread::scope(|workers| {
            let handles: Vec<_> = units
                .iter()
                .map(|unit| workers.spawn(move || self.analyze(unit, interner)))
                .collect();
            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|payload| std::panic::resume_unwind(payload))
                })
                .collect()
        })
    }
}

/// Last use per loan, in loan creation order
///
/// Units are straight-line, so one forward simulation of how borrow values
/// flow between bindings is exact. A use is a read or write through the
/// holding binding, or a move of the borrow value itself.
fn compute_last_uses(resolved: &ResolvedUnit) -> Vec<Option<ProgramPoint>> {
    let mut last: Vec<Option<ProgramPoint>> = Vec::new();
    let mut holders: FxHashMap<PlaceId, usize> = FxHashMap::default();

    for (index, stmt) in resolved.statements.iter().enumerate() {
        let point = ProgramPoint(index as u32);
        match *stmt {
            ResolvedStmt::BorrowShared { dest, .. } | ResolvedStmt::BorrowExclusive { dest, .. } => {
                holders.insert(dest, last.len());
                last.push(None);
            }
            ResolvedStmt::Bind {
                place,
                init: Some(ResolvedInit::MoveFrom(src)),
            } => {
                if let Some(ordinal) = holders.remove(&src.place) {
                    last[ordinal] = Some(point);
                    holders.insert(place, ordinal);
                }
            }
            ResolvedStmt::Move { dest, src } => {
                if let Some(ordinal) = holders.remove(&src.place) {
                    last[ordinal] = Some(point);
                    holders.insert(dest.place, ordinal);
                }
            }
            ResolvedStmt::Read { place } | ResolvedStmt::WriteThrough { place } => {
                if let Some(&ordinal) = holders.get(&place.place) {
                    last[ordinal] = Some(point);
                }
            }
            _ => {}
        }
    }
    last
}

/// One unit's worth of traversal state
struct UnitPass<'pass> {
    resolved: &'pass ResolvedUnit,
    interner: &'pass Interner,
    precise: bool,
    last_uses: Vec<Option<ProgramPoint>>,
    created_loans: usize,
    ownership: OwnershipTracker,
    loans: LoanTable,
    sink: DiagnosticSink,
}

impl UnitPass<'_> {
    fn run(mut self) -> UnitAnalysis {
        for (index, stmt) in self.resolved.statements.iter().enumerate() {
            let point = ProgramPoint(index as u32);
            if self.precise {
                self.loans.sweep_expired(point);
            }
            match *stmt {
                ResolvedStmt::Bind { place, init } => self.on_bind(place, init, point),
                ResolvedStmt::Move { dest, src } => self.on_move(dest, src, point),
                ResolvedStmt::BorrowShared { dest, src } => {
                    self.on_borrow(dest, src, LoanKind::Shared, point);
                }
                ResolvedStmt::BorrowExclusive { dest, src } => {
                    self.on_borrow(dest, src, LoanKind::Exclusive, point);
                }
                ResolvedStmt::WriteThrough { place } => self.on_write(place, point),
                ResolvedStmt::Read { place } => self.on_read(place, point),
                ResolvedStmt::ScopeEnter(_) => {}
                ResolvedStmt::ScopeExit(scope) => self.on_scope_exit(scope, point),
            }
        }

        let unit_len = self.resolved.statements.len();
        let loans = self
            .loans
            .loans()
            .iter()
            .map(|loan| LoanSummary {
                referent: loan.referent,
                referent_name: self.name_of(loan.referent),
                kind: loan.kind,
                extent: valid_extent(loan, unit_len),
            })
            .collect();

        UnitAnalysis {
            diagnostics: self.sink.take_diagnostics(),
            loans,
        }
    }

    fn on_bind(&mut self, place: PlaceId, init: Option<ResolvedInit>, point: ProgramPoint) {
        // The initializer is evaluated against the pre-bind state.
        if let Some(ResolvedInit::MoveFrom(src)) = init {
            let decl = self.resolved.place(place);
            self.consume_source(src, Some((place, decl.scope)), point);
        }

        let decl = self.resolved.place(place);
        let (prior, shadow) = (decl.prior, decl.shadow);
        if let Some(prior) = prior {
            self.drop_replaced(prior, point);
        }
        if let Some(violation) = self.ownership.declare(place, init.is_some(), prior, shadow) {
            self.report_ownership(violation, point);
        }
    }

    fn on_move(&mut self, dest: PlaceRef, src: PlaceRef, point: ProgramPoint) {
        if dest.escaped {
            self.report_escaped_use(dest.place, point);
        }
        // The destination's previous contents are dropped by the overwrite.
        if let Some(old) = self.loans.held_by(dest.place) {
            if self.loans.loan(old).is_active() {
                self.loans.retire(old, point);
            }
        }
        let dest_scope = self.resolved.place(dest.place).scope;
        self.consume_source(src, Some((dest.place, dest_scope)), point);
        self.ownership.assign(dest.place);
    }

    /// Source-side checks shared by `Move` and `Bind(MoveFrom)`
    ///
    /// Checks ownership first (a moved-out source is use-after-move), then
    /// live borrows, then propagates a held borrow value into `dest`,
    /// verifying the borrow does not escape its referent's scope.
    fn consume_source(
        &mut self,
        src: PlaceRef,
        dest: Option<(PlaceId, ScopeId)>,
        point: ProgramPoint,
    ) {
        if src.escaped {
            self.report_escaped_use(src.place, point);
            return;
        }

        let had_loans = self.loans.first_active(src.place).map(|loan| loan.id);
        match self.ownership.move_out(src.place, point) {
            Some(violation) => self.report_ownership(violation, point),
            None => {
                if let Some(loan) = had_loans {
                    self.report_borrow(
                        BorrowViolation::MoveWhileBorrowed {
                            place: src.place,
                            loan,
                        },
                        point,
                    );
                }
            }
        }

        let Some((dest_place, dest_scope)) = dest else {
            return;
        };
        let Some(loan_id) = self.loans.held_by(src.place) else {
            return;
        };
        if self.loans.loan(loan_id).is_active() {
            let loan = self.loans.loan(loan_id).clone();
            let referent_scope = self.resolved.place(loan.referent).scope;
            let resolver = LifetimeResolver::new(&self.resolved.tree);
            if let Some(violation) =
                resolver.check_transfer(&loan, referent_scope, dest_place, dest_scope)
            {
                self.report_lifetime(violation, point);
                // The escaping borrow is invalidated so it is not re-reported
                // at the referent's scope exit.
                self.loans.retire(loan_id, point);
            }
        }
        self.loans.transfer(src.place, dest_place);
    }

    fn on_borrow(&mut self, dest: PlaceId, src: PlaceRef, kind: LoanKind, point: ProgramPoint) {
        let decl = self.resolved.place(dest);
        let (prior, shadow, dest_scope) = (decl.prior, decl.shadow, decl.scope);
        if let Some(prior) = prior {
            self.drop_replaced(prior, point);
        }

        if src.escaped {
            self.report_escaped_use(src.place, point);
        } else if let Some(violation) = self.ownership.check_use(src.place) {
            self.report_ownership(violation, point);
        } else if let Some(existing) = self.loans.conflict_for(src.place, kind) {
            let existing = existing.id;
            self.report_borrow(
                BorrowViolation::ConflictingBorrow {
                    dest,
                    referent: src.place,
                    requested: kind,
                    existing,
                },
                point,
            );
        }

        // The loan is recorded even after a violation so later statements
        // are checked against a consistent state.
        let last_use = self.next_last_use();
        self.loans
            .create(src.place, kind, point, dest_scope, dest, last_use);
        if let Some(violation) = self.ownership.declare(dest, true, prior, shadow) {
            self.report_ownership(violation, point);
        }
    }

    fn on_write(&mut self, place: PlaceRef, point: ProgramPoint) {
        if place.escaped {
            self.report_escaped_use(place.place, point);
            return;
        }
        if let Some(violation) = self.ownership.check_use(place.place) {
            self.report_ownership(violation, point);
            return;
        }

        if let Some(loan_id) = self.loans.held_by(place.place) {
            // Write through the held borrow.
            let loan = self.loans.loan(loan_id).clone();
            if !loan.is_active() {
                self.report_lifetime(
                    LifetimeViolation::UseOfDeadBorrow {
                        place: place.place,
                        loan: loan_id,
                    },
                    point,
                );
            } else if loan.kind.is_shared() {
                self.report_borrow(
                    BorrowViolation::WriteThroughShared {
                        place: place.place,
                        loan: loan_id,
                    },
                    point,
                );
            } else if !self.loans.is_sole_active(loan_id) {
                // An exclusive borrow only grants write access while it is
                // the sole live loan of its referent.
                let crowding = self
                    .loans
                    .active_of(loan.referent)
                    .into_iter()
                    .find(|&other| other != loan_id);
                if let Some(existing) = crowding {
                    self.report_borrow(
                        BorrowViolation::ConflictingBorrow {
                            dest: place.place,
                            referent: loan.referent,
                            requested: LoanKind::Exclusive,
                            existing,
                        },
                        point,
                    );
                }
            }
        } else if let Some(loan) = self.loans.first_active(place.place) {
            // Direct write to owned storage with live loans.
            let loan = loan.id;
            self.report_borrow(
                BorrowViolation::WriteWhileBorrowed {
                    place: place.place,
                    loan,
                },
                point,
            );
        }
    }

    fn on_read(&mut self, place: PlaceRef, point: ProgramPoint) {
        if place.escaped {
            self.report_escaped_use(place.place, point);
            return;
        }
        if let Some(violation) = self.ownership.check_use(place.place) {
            self.report_ownership(violation, point);
            return;
        }
        // Reading through a borrow requires the loan to still be valid;
        // reading a borrowed owner directly is always allowed.
        if let Some(loan_id) = self.loans.held_by(place.place) {
            if !self.loans.loan(loan_id).is_active() {
                self.report_lifetime(
                    LifetimeViolation::UseOfDeadBorrow {
                        place: place.place,
                        loan: loan_id,
                    },
                    point,
                );
            }
        }
    }

    fn on_scope_exit(&mut self, scope: ScopeId, point: ProgramPoint) {
        // Reverse declaration order, mirroring stack discipline.
        let declared: Vec<PlaceId> = self.resolved.tree.get(scope).declared.clone();
        for &place in declared.iter().rev() {
            // A borrow held by a dying binding retires with it.
            if let Some(loan_id) = self.loans.held_by(place) {
                if self.loans.loan(loan_id).is_active() {
                    self.loans.retire(loan_id, point);
                }
            }
            // Loans of a dying referent: holders outside the dying scope
            // survive the value they borrow.
            if self.ownership.is_owned(place) {
                for loan_id in self.loans.active_of(place) {
                    let loan = self.loans.loan(loan_id).clone();
                    let holder_scope = self.resolved.place(loan.holder).scope;
                    let resolver = LifetimeResolver::new(&self.resolved.tree);
                    if let Some(violation) =
                        resolver.check_referent_death(&loan, scope, holder_scope)
                    {
                        self.report_lifetime(violation, point);
                    }
                    self.loans.retire(loan_id, point);
                }
            } else {
                for loan_id in self.loans.active_of(place) {
                    self.loans.retire(loan_id, point);
                }
            }
            self.ownership.discard(place);
        }
    }

    /// Drops the value of a binding replaced by a same-scope redeclaration
    ///
    /// Any borrow it still holds dies with it, and any live loan of it now
    /// dangles: the shadowed-out value is dropped at the shadow point.
    fn drop_replaced(&mut self, prior: PlaceId, point: ProgramPoint) {
        if let Some(loan_id) = self.loans.held_by(prior) {
            if self.loans.loan(loan_id).is_active() {
                self.loans.retire(loan_id, point);
            }
        }
        let owned = self.ownership.is_owned(prior);
        for loan_id in self.loans.active_of(prior) {
            if owned {
                let loan = self.loans.loan(loan_id).clone();
                self.report_lifetime(
                    LifetimeViolation::ReferentDropped {
                        loan: loan.id,
                        referent: loan.referent,
                        holder: loan.holder,
                    },
                    point,
                );
            }
            self.loans.retire(loan_id, point);
        }
    }

    /// Reports a use of a binding whose scope already closed
    ///
    /// A dead borrow binding is a dangling reference; dead owned storage
    /// reads as use-after-move (its value was dropped at scope exit).
    fn report_escaped_use(&mut self, place: PlaceId, point: ProgramPoint) {
        if let Some(loan_id) = self.loans.held_by(place) {
            self.report_lifetime(
                LifetimeViolation::UseOfDeadBorrow {
                    place,
                    loan: loan_id,
                },
                point,
            );
        } else {
            let scope = self.resolved.place(place).scope;
            let dropped_at = self
                .resolved
                .tree
                .get(scope)
                .exited_at
                .unwrap_or(ProgramPoint::START);
            self.report_ownership(
                OwnershipViolation::UseAfterMove {
                    place,
                    moved_at: dropped_at,
                },
                point,
            );
        }
    }

    fn next_last_use(&mut self) -> Option<ProgramPoint> {
        let ordinal = self.created_loans;
        self.created_loans += 1;
        if self.precise {
            self.last_uses.get(ordinal).copied().flatten()
        } else {
            None
        }
    }

    fn name_of(&self, place: PlaceId) -> String {
        let name = self.resolved.place(place).name;
        self.interner
            .try_resolve(name)
            .unwrap_or_else(|| format!("{name:?}"))
    }

    fn kind_name(kind: LoanKind) -> &'static str {
        if kind.is_exclusive() { "exclusive" } else { "shared" }
    }

    fn report_ownership(&mut self, violation: OwnershipViolation, point: ProgramPoint) {
        let (code, place, message) = match violation {
            OwnershipViolation::DuplicateBinding { place, .. } => (
                DiagnosticCode::DuplicateBinding,
                place,
                format!(
                    "duplicate binding of `{}` in the same scope",
                    self.name_of(place)
                ),
            ),
            OwnershipViolation::UseAfterMove { place, moved_at } => (
                DiagnosticCode::UseAfterMove,
                place,
                format!(
                    "use of moved place `{}` (moved at statement {moved_at})",
                    self.name_of(place)
                ),
            ),
            OwnershipViolation::UseOfUninitialized { place } => (
                DiagnosticCode::UseOfUninitialized,
                place,
                format!("use of uninitialized place `{}`", self.name_of(place)),
            ),
        };
        self.report(code, place, message, point);
    }

    fn report_borrow(&mut self, violation: BorrowViolation, point: ProgramPoint) {
        let (code, place, message) = match violation {
            BorrowViolation::ConflictingBorrow {
                dest,
                referent,
                requested,
                existing,
            } => {
                let existing_kind = self.loans.loan(existing).kind;
                (
                    DiagnosticCode::ConflictingBorrow,
                    dest,
                    format!(
                        "cannot borrow `{}` as {} while it is already borrowed as {}",
                        self.name_of(referent),
                        Self::kind_name(requested),
                        Self::kind_name(existing_kind),
                    ),
                )
            }
            BorrowViolation::MoveWhileBorrowed { place, .. } => (
                DiagnosticCode::MoveWhileBorrowed,
                place,
                format!(
                    "cannot move out of `{}` while it is borrowed",
                    self.name_of(place)
                ),
            ),
            BorrowViolation::WriteWhileBorrowed { place, .. } => (
                DiagnosticCode::ConflictingBorrow,
                place,
                format!(
                    "cannot write to `{}` while it is borrowed",
                    self.name_of(place)
                ),
            ),
            BorrowViolation::WriteThroughShared { place, loan } => {
                let referent = self.loans.loan(loan).referent;
                (
                    DiagnosticCode::ConflictingBorrow,
                    place,
                    format!(
                        "cannot write through `{}`: it holds a shared borrow of `{}`",
                        self.name_of(place),
                        self.name_of(referent),
                    ),
                )
            }
        };
        self.report(code, place, message, point);
    }

    fn report_lifetime(&mut self, violation: LifetimeViolation, point: ProgramPoint) {
        let (place, message) = match violation {
            LifetimeViolation::EscapesReferent {
                referent, dest, ..
            } => (
                dest,
                format!(
                    "borrow of `{}` moved into `{}`, which outlives it",
                    self.name_of(referent),
                    self.name_of(dest),
                ),
            ),
            LifetimeViolation::ReferentDropped {
                referent, holder, ..
            } => (
                holder,
                format!(
                    "`{}` dropped while still borrowed through `{}`",
                    self.name_of(referent),
                    self.name_of(holder),
                ),
            ),
            LifetimeViolation::UseOfDeadBorrow { place, loan } => {
                let referent = self.loans.loan(loan).referent;
                (
                    place,
                    format!(
                        "borrow of `{}` held by `{}` is no longer valid here",
                        self.name_of(referent),
                        self.name_of(place),
                    ),
                )
            }
        };
        self.report(DiagnosticCode::DanglingReference, place, message, point);
    }

    fn report(&mut self, code: DiagnosticCode, place: PlaceId, message: String, point: ProgramPoint) {
        let place_name = self.name_of(place);
        self.sink.report(Diagnostic {
            code,
            point,
            place,
            place_name,
            message,
        });
    }
}
