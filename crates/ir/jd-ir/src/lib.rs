//! Program Model: the analyzer's input representation
//!
//! A unit is an ordered sequence of statements over named storage locations
//! (places). The representation is purely data; all checking lives in the
//! passes. A front end lowers real source into this form, or a host builds
//! it directly with [`UnitBuilder`].

use jd_intern::{Interner, Symbol};
use jd_span::{FileSpan, ProgramPoint};
use serde::{Deserialize, Serialize};

/// Identity of a declared storage location
///
/// Allocated during scope resolution, one per declaration: shadowing or
/// redeclaring a name yields a fresh id, so two ids never alias.
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct PlaceId(pub u32);

impl PlaceId {
    /// Raw index into the declaration table
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// How a `Bind` statement initializes its place
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BindInit {
    /// A fresh value owned by the new place
    Value,
    /// Move the named place's value into the new place
    MoveFrom(Symbol),
}

/// A single statement in an analyzable unit
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stmt {
    /// Declare a place in the current scope
    ///
    /// With `init: None` the place exists but holds no value yet. The
    /// `shadow` flag marks a deliberate same-scope rebinding; without it,
    /// rebinding a live name is a duplicate.
    Bind {
        /// Name being declared
        place: Symbol,
        /// Declared mutability
        mutable: bool,
        /// Explicit shadowing rebinding
        shadow: bool,
        /// Initializer, if any
        init: Option<BindInit>,
    },
    /// Transfer ownership from `src` into the existing place `dest`
    Move {
        /// Destination place
        dest: Symbol,
        /// Source place, invalidated by the transfer
        src: Symbol,
    },
    /// Create a shared borrow of `src`, bound to the fresh place `dest`
    BorrowShared {
        /// Binding that holds the borrow
        dest: Symbol,
        /// Referent place
        src: Symbol,
    },
    /// Create an exclusive borrow of `src`, bound to the fresh place `dest`
    BorrowExclusive {
        /// Binding that holds the borrow
        dest: Symbol,
        /// Referent place
        src: Symbol,
    },
    /// Mutate through `place`: directly if it owns its value, or through
    /// the exclusive borrow it holds
    WriteThrough {
        /// Place being written
        place: Symbol,
    },
    /// Read `place` (directly, or through the borrow it holds)
    Read {
        /// Place being read
        place: Symbol,
    },
    /// Open a nested lexical scope
    ScopeEnter,
    /// Close the innermost open scope, dropping its places
    ScopeExit,
}

/// One analyzable unit: a function-like body with nested scopes
///
/// Statements are addressed by index ([`ProgramPoint`]); an optional source
/// span per statement supports rendering diagnostics against real source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    /// Statements in program order
    pub statements: Vec<Stmt>,
    /// Source attribution, parallel to `statements`
    pub spans: Vec<Option<FileSpan>>,
}

impl Unit {
    /// Number of statements
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    /// Whether the unit has no statements
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Statement at a program point, if in range
    pub fn stmt_at(&self, point: ProgramPoint) -> Option<&Stmt> {
        self.statements.get(point.index())
    }

    /// Source span attached to the statement at `point`, if any
    pub fn span_at(&self, point: ProgramPoint) -> Option<FileSpan> {
        self.spans.get(point.index()).copied().flatten()
    }
}

/// Builder for constructing units
///
/// Interns names on the fly; every method appends one statement.
pub struct UnitBuilder {
    interner: Interner,
    statements: Vec<Stmt>,
    spans: Vec<Option<FileSpan>>,
}

impl UnitBuilder {
    /// Creates a builder that interns names into `interner`
    pub fn new(interner: Interner) -> Self {
        Self {
            interner,
            statements: Vec::new(),
            spans: Vec::new(),
        }
    }

    /// Appends a raw statement
    pub fn push(&mut self, stmt: Stmt) -> &mut Self {
        self.statements.push(stmt);
        self.spans.push(None);
        self
    }

    /// Appends a raw statement with source attribution
    pub fn push_spanned(&mut self, stmt: Stmt, span: FileSpan) -> &mut Self {
        self.statements.push(stmt);
        self.spans.push(Some(span));
        self
    }

    /// `Bind` of an immutable place holding a fresh value
    pub fn bind(&mut self, place: &str) -> &mut Self {
        let place = self.interner.intern(place);
        self.push(Stmt::Bind {
            place,
            mutable: false,
            shadow: false,
            init: Some(BindInit::Value),
        })
    }

    /// `Bind` of a mutable place holding a fresh value
    pub fn bind_mut(&mut self, place: &str) -> &mut Self {
        let place = self.interner.intern(place);
        self.push(Stmt::Bind {
            place,
            mutable: true,
            shadow: false,
            init: Some(BindInit::Value),
        })
    }

    /// `Bind` of a place with no initializer
    pub fn bind_uninit(&mut self, place: &str) -> &mut Self {
        let place = self.interner.intern(place);
        self.push(Stmt::Bind {
            place,
            mutable: false,
            shadow: false,
            init: None,
        })
    }

    /// `Bind` that moves `src` into the fresh place
    pub fn bind_move(&mut self, place: &str, src: &str) -> &mut Self {
        let place = self.interner.intern(place);
        let src = self.interner.intern(src);
        self.push(Stmt::Bind {
            place,
            mutable: false,
            shadow: false,
            init: Some(BindInit::MoveFrom(src)),
        })
    }

    /// Explicit same-scope shadowing rebind with a fresh value
    pub fn shadow(&mut self, place: &str) -> &mut Self {
        let place = self.interner.intern(place);
        self.push(Stmt::Bind {
            place,
            mutable: false,
            shadow: true,
            init: Some(BindInit::Value),
        })
    }

    /// `Move` between two existing places
    pub fn move_to(&mut self, dest: &str, src: &str) -> &mut Self {
        let dest = self.interner.intern(dest);
        let src = self.interner.intern(src);
        self.push(Stmt::Move { dest, src })
    }

    /// `BorrowShared`
    pub fn borrow_shared(&mut self, dest: &str, src: &str) -> &mut Self {
        let dest = self.interner.intern(dest);
        let src = self.interner.intern(src);
        self.push(Stmt::BorrowShared { dest, src })
    }

    /// `BorrowExclusive`
    pub fn borrow_exclusive(&mut self, dest: &str, src: &str) -> &mut Self {
        let dest = self.interner.intern(dest);
        let src = self.interner.intern(src);
        self.push(Stmt::BorrowExclusive { dest, src })
    }

    /// `WriteThrough`
    pub fn write_through(&mut self, place: &str) -> &mut Self {
        let place = self.interner.intern(place);
        self.push(Stmt::WriteThrough { place })
    }

    /// `Read`
    pub fn read(&mut self, place: &str) -> &mut Self {
        let place = self.interner.intern(place);
        self.push(Stmt::Read { place })
    }

    /// `ScopeEnter`
    pub fn scope_enter(&mut self) -> &mut Self {
        self.push(Stmt::ScopeEnter)
    }

    /// `ScopeExit`
    pub fn scope_exit(&mut self) -> &mut Self {
        self.push(Stmt::ScopeExit)
    }

    /// Finishes building and returns the unit
    pub fn finish(self) -> Unit {
        Unit {
            statements: self.statements,
            spans: self.spans,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_preserves_statement_order() {
        let interner = Interner::new();
        let mut builder = UnitBuilder::new(interner.clone());
        builder.bind("x").borrow_shared("y", "x").read("y");
        let unit = builder.finish();

        assert_eq!(unit.len(), 3);
        let x_sym = interner.intern("x");
        assert_eq!(
            unit.stmt_at(ProgramPoint(0)),
            Some(&Stmt::Bind {
                place: x_sym,
                mutable: false,
                shadow: false,
                init: Some(BindInit::Value),
            })
        );
        assert!(matches!(
            unit.stmt_at(ProgramPoint(2)),
            Some(Stmt::Read { .. })
        ));
        assert_eq!(unit.stmt_at(ProgramPoint(3)), None);
    }

    #[test]
    fn spans_align_with_statements() {
        let interner = Interner::new();
        let mut builder = UnitBuilder::new(interner);
        builder.bind("x");
        builder.push_spanned(
            Stmt::ScopeEnter,
            FileSpan::new(jd_span::FileId(0), jd_span::Span::new(4, 5)),
        );
        let unit = builder.finish();

        assert_eq!(unit.span_at(ProgramPoint(0)), None);
        assert!(unit.span_at(ProgramPoint(1)).is_some());
    }
}
