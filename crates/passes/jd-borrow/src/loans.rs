//! Loan bookkeeping for borrow checking

use indexmap::IndexMap;
use jd_ir::PlaceId;
use jd_scope::ScopeId;
use jd_span::ProgramPoint;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Identity of a loan, dense in creation order
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct LoanId(pub u32);

impl LoanId {
    /// Raw index into the loan table
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Kind of borrow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoanKind {
    /// Shared borrow; any number may coexist
    Shared,
    /// Exclusive borrow; must be alone
    Exclusive,
}

impl LoanKind {
    /// Returns `true` for a shared loan
    pub fn is_shared(self) -> bool {
        matches!(self, Self::Shared)
    }

    /// Returns `true` for an exclusive loan
    pub fn is_exclusive(self) -> bool {
        matches!(self, Self::Exclusive)
    }
}

/// One borrow, live or retired
#[derive(Debug, Clone)]
pub struct Loan {
    /// Identity
    pub id: LoanId,
    /// The place this loan refers to
    pub referent: PlaceId,
    /// Shared or exclusive
    pub kind: LoanKind,
    /// Point of the borrow statement
    pub created_at: ProgramPoint,
    /// Scope of the binding the borrow was created for
    pub binding_scope: ScopeId,
    /// Binding currently (or last) holding the borrow value
    pub holder: PlaceId,
    /// Last point the borrow is used, when precomputed for precise extents
    pub last_use: Option<ProgramPoint>,
    /// Point the loan was retired, once it is
    pub retired_at: Option<ProgramPoint>,
}

impl Loan {
    /// Whether the loan is still live
    pub fn is_active(&self) -> bool {
        self.retired_at.is_none()
    }
}

/// All loans of a unit plus the live subset per referent
///
/// Loans are never removed; retirement just drops them from the live index.
/// The holder index likewise keeps entries for dead bindings, so the
/// analyzer can tell "this dead binding held a borrow" from "it held a
/// value" when a closed-scope name is used.
#[derive(Debug, Default)]
pub struct LoanTable {
    loans: Vec<Loan>,
    active: IndexMap<PlaceId, Vec<LoanId>>,
    holders: FxHashMap<PlaceId, LoanId>,
}

impl LoanTable {
    /// Creates an empty table with no loans recorded
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a new loan and marks it live
    ///
    /// Recording is unconditional: conflict checks happen first, and on
    /// violation the loan is recorded anyway so later statements see a
    /// consistent state.
    pub fn create(
        &mut self,
        referent: PlaceId,
        kind: LoanKind,
        created_at: ProgramPoint,
        binding_scope: ScopeId,
        holder: PlaceId,
        last_use: Option<ProgramPoint>,
    ) -> LoanId {
        let id = LoanId(self.loans.len() as u32);
        self.loans.push(Loan {
            id,
            referent,
            kind,
            created_at,
            binding_scope,
            holder,
            last_use,
            retired_at: None,
        });
        self.active.entry(referent).or_default().push(id);
        self.holders.insert(holder, id);
        id
    }

    /// First live loan that a new `kind` borrow of `referent` collides with
    ///
    /// A new shared loan collides with a live exclusive one; a new exclusive
    /// loan collides with anything live.
    pub fn conflict_for(&self, referent: PlaceId, kind: LoanKind) -> Option<&Loan> {
        let live = self.active.get(&referent)?;
        live.iter()
            .map(|&id| &self.loans[id.index()])
            .find(|loan| kind.is_exclusive() || loan.kind.is_exclusive())
    }

    /// Whether any live loan refers to `referent`
    pub fn has_active(&self, referent: PlaceId) -> bool {
        self.active
            .get(&referent)
            .is_some_and(|live| !live.is_empty())
    }

    /// First live loan of `referent`, if any
    pub fn first_active(&self, referent: PlaceId) -> Option<&Loan> {
        let live = self.active.get(&referent)?;
        live.first().map(|&id| &self.loans[id.index()])
    }

    /// Live loans of `referent`, in creation order
    pub fn active_of(&self, referent: PlaceId) -> Vec<LoanId> {
        self.active.get(&referent).cloned().unwrap_or_default()
    }

    /// Whether `loan` is live and the only live loan of its referent
    pub fn is_sole_active(&self, loan: LoanId) -> bool {
        let referent = self.loans[loan.index()].referent;
        self.active
            .get(&referent)
            .is_some_and(|live| live.len() == 1 && live[0] == loan)
    }

    /// Retires `loan` at `point`; retiring twice keeps the first point
    pub fn retire(&mut self, loan: LoanId, point: ProgramPoint) {
        let record = &mut self.loans[loan.index()];
        if record.retired_at.is_some() {
            return;
        }
        record.retired_at = Some(point);
        let referent = record.referent;
        if let Some(live) = self.active.get_mut(&referent) {
            live.retain(|&live_id| live_id != loan);
        }
    }

    /// The loan held by `place`, live or not
    pub fn held_by(&self, place: PlaceId) -> Option<LoanId> {
        self.holders.get(&place).copied()
    }

    /// Moves the borrow held by `from` into `to`, returning it
    pub fn transfer(&mut self, from: PlaceId, to: PlaceId) -> Option<LoanId> {
        let loan = self.holders.remove(&from)?;
        self.loans[loan.index()].holder = to;
        self.holders.insert(to, loan);
        Some(loan)
    }

    /// Loan record for `id`
    pub fn loan(&self, id: LoanId) -> &Loan {
        &self.loans[id.index()]
    }

    /// All loans in creation order, live and retired
    pub fn loans(&self) -> &[Loan] {
        &self.loans
    }

    /// Retires every live loan whose last use lies before `point`
    ///
    /// Only called in precise-extent mode, once per statement, before that
    /// statement's checks. A loan with no recorded use expires right after
    /// its creation.
    pub fn sweep_expired(&mut self, point: ProgramPoint) {
        let expired: Vec<LoanId> = self
            .loans
            .iter()
            .filter(|loan| {
                loan.is_active() && {
                    let last = loan.last_use.unwrap_or(loan.created_at);
                    last < point
                }
            })
            .map(|loan| loan.id)
            .collect();
        for id in expired {
            let end = {
                let loan = &self.loans[id.index()];
                loan.last_use.unwrap_or(loan.created_at).next()
            };
            self.retire(id, end);
        }
    }
}
