//! Linear resolution pass: names to place identities

use jd_intern::{Interner, Symbol};
use jd_ir::{BindInit, PlaceId, Stmt, Unit};
use jd_span::ProgramPoint;
use rustc_hash::FxHashMap;

use crate::error::{ScopeError, UnbalancedScope};
use crate::tree::{ScopeId, ScopeTree};

/// A resolved reference to a place in operand position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaceRef {
    /// The declaration this name resolved to
    pub place: PlaceId,
    /// The declaration's scope had already closed at the point of use
    ///
    /// Escaped references are structurally valid (the name did exist) but
    /// semantically dead; the trackers turn them into diagnostics.
    pub escaped: bool,
}

/// Resolved form of a `Bind` initializer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedInit {
    /// A fresh owned value
    Value,
    /// Move out of another place
    MoveFrom(PlaceRef),
}

/// A statement with every name replaced by a place identity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedStmt {
    /// Declaration of a fresh place (see its [`PlaceDecl`] for flags)
    Bind {
        /// The freshly declared place
        place: PlaceId,
        /// Initializer, if any
        init: Option<ResolvedInit>,
    },
    /// Ownership transfer between existing places
    Move {
        /// Destination
        dest: PlaceRef,
        /// Source
        src: PlaceRef,
    },
    /// Shared borrow of `src` held by the fresh binding `dest`
    BorrowShared {
        /// The borrow's binding
        dest: PlaceId,
        /// Referent
        src: PlaceRef,
    },
    /// Exclusive borrow of `src` held by the fresh binding `dest`
    BorrowExclusive {
        /// The borrow's binding
        dest: PlaceId,
        /// Referent
        src: PlaceRef,
    },
    /// Mutation through a place
    WriteThrough {
        /// Place being written
        place: PlaceRef,
    },
    /// Read of a place
    Read {
        /// Place being read
        place: PlaceRef,
    },
    /// A nested scope opened
    ScopeEnter(ScopeId),
    /// The named scope closed
    ScopeExit(ScopeId),
}

/// Everything recorded about one declaration
#[derive(Debug, Clone)]
pub struct PlaceDecl {
    /// Declared name
    pub name: Symbol,
    /// Declared mutability
    pub mutable: bool,
    /// Scope the declaration lives in
    pub scope: ScopeId,
    /// Point of the declaring statement
    pub declared_at: ProgramPoint,
    /// Same-scope live binding of the same name this declaration replaces
    pub prior: Option<PlaceId>,
    /// The replacement was an explicit shadow
    pub shadow: bool,
}

/// Output of the scope pass: the tree plus the rewritten unit
#[derive(Debug)]
pub struct ResolvedUnit {
    /// Statements with resolved place identities, same order as the input
    pub statements: Vec<ResolvedStmt>,
    /// Declaration table, indexed by [`PlaceId`]
    pub places: Vec<PlaceDecl>,
    /// The scope tree
    pub tree: ScopeTree,
}

impl ResolvedUnit {
    /// Declaration record for `id`
    pub fn place(&self, id: PlaceId) -> &PlaceDecl {
        &self.places[id.index()]
    }

    /// Number of declarations in the unit
    pub fn place_count(&self) -> usize {
        self.places.len()
    }
}

/// The linear scan over a unit's statements
///
/// Declarations push onto per-name stacks that are never popped: resolution
/// prefers the most recent declaration whose scope is still open, and falls
/// back to the most recent one outright (marked escaped) so the semantic
/// passes can report uses of dead bindings instead of aborting.
pub struct ScopeTreeBuilder<'env> {
    interner: &'env Interner,
    tree: ScopeTree,
    places: Vec<PlaceDecl>,
    names: FxHashMap<Symbol, Vec<PlaceId>>,
    current: ScopeId,
}

impl<'env> ScopeTreeBuilder<'env> {
    /// Builds the scope tree for `unit` and resolves every name
    ///
    /// # Errors
    ///
    /// Returns [`ScopeError::MalformedProgram`] for a name with no prior
    /// declaration at its point of use, and [`ScopeError::UnbalancedScope`]
    /// when scope markers do not nest.
    pub fn build(unit: &Unit, interner: &'env Interner) -> Result<ResolvedUnit, ScopeError> {
        let tree = ScopeTree::new();
        let current = tree.root();
        let mut builder = Self {
            interner,
            tree,
            places: Vec::new(),
            names: FxHashMap::default(),
            current,
        };
        let statements = builder.run(unit)?;
        Ok(ResolvedUnit {
            statements,
            places: builder.places,
            tree: builder.tree,
        })
    }

    fn run(&mut self, unit: &Unit) -> Result<Vec<ResolvedStmt>, ScopeError> {
        let mut statements = Vec::with_capacity(unit.len());

        for (index, stmt) in unit.statements.iter().enumerate() {
            let point = ProgramPoint(index as u32);
            let resolved = match *stmt {
                Stmt::Bind {
                    place,
                    mutable,
                    shadow,
                    init,
                } => {
                    // The initializer sees the environment before the new
                    // binding exists, so `Bind(x, MoveFrom(x))` moves out of
                    // the old `x`.
                    let init = match init {
                        None => None,
                        Some(BindInit::Value) => Some(ResolvedInit::Value),
                        Some(BindInit::MoveFrom(src)) => {
                            Some(ResolvedInit::MoveFrom(self.resolve(src, point)?))
                        }
                    };
                    let place = self.declare(place, mutable, shadow, point);
                    ResolvedStmt::Bind { place, init }
                }
                Stmt::Move { dest, src } => {
                    let src = self.resolve(src, point)?;
                    let dest = self.resolve(dest, point)?;
                    ResolvedStmt::Move { dest, src }
                }
                Stmt::BorrowShared { dest, src } => {
                    let src = self.resolve(src, point)?;
                    let dest = self.declare(dest, false, false, point);
                    ResolvedStmt::BorrowShared { dest, src }
                }
                Stmt::BorrowExclusive { dest, src } => {
                    let src = self.resolve(src, point)?;
                    let dest = self.declare(dest, false, false, point);
                    ResolvedStmt::BorrowExclusive { dest, src }
                }
                Stmt::WriteThrough { place } => ResolvedStmt::WriteThrough {
                    place: self.resolve(place, point)?,
                },
                Stmt::Read { place } => ResolvedStmt::Read {
                    place: self.resolve(place, point)?,
                },
                Stmt::ScopeEnter => {
                    let child = self.tree.create_child(self.current, point);
                    self.current = child;
                    ResolvedStmt::ScopeEnter(child)
                }
                Stmt::ScopeExit => {
                    let closing = self.current;
                    let Some(parent) = self.tree.get(closing).parent else {
                        return Err(UnbalancedScope::ExtraExit(point).into());
                    };
                    self.tree.mark_exited(closing, point);
                    self.current = parent;
                    ResolvedStmt::ScopeExit(closing)
                }
            };
            statements.push(resolved);
        }

        if self.current != self.tree.root() {
            let open = self.tree.get(self.current).depth as usize;
            return Err(UnbalancedScope::Unclosed(open).into());
        }
        let end = ProgramPoint(unit.len() as u32);
        let root = self.tree.root();
        self.tree.mark_exited(root, end);

        Ok(statements)
    }

    /// Resolves a name in operand position
    fn resolve(&self, name: Symbol, point: ProgramPoint) -> Result<PlaceRef, ScopeError> {
        let Some(stack) = self.names.get(&name) else {
            return Err(self.undeclared(name, point));
        };
        // Most recent declaration in a still-open scope wins; scopes close
        // LIFO, so every open scope is on the path to the current one.
        for &place in stack.iter().rev() {
            if self.tree.is_open(self.places[place.index()].scope) {
                return Ok(PlaceRef {
                    place,
                    escaped: false,
                });
            }
        }
        match stack.last() {
            Some(&place) => Ok(PlaceRef {
                place,
                escaped: true,
            }),
            None => Err(self.undeclared(name, point)),
        }
    }

    /// Declares a fresh place in the current scope
    fn declare(
        &mut self,
        name: Symbol,
        mutable: bool,
        shadow: bool,
        point: ProgramPoint,
    ) -> PlaceId {
        let prior = self.names.get(&name).and_then(|stack| {
            stack
                .iter()
                .rev()
                .find(|&&candidate| {
                    let decl = &self.places[candidate.index()];
                    decl.scope == self.current && self.tree.is_open(decl.scope)
                })
                .copied()
        });

        let id = PlaceId(self.places.len() as u32);
        self.places.push(PlaceDecl {
            name,
            mutable,
            scope: self.current,
            declared_at: point,
            prior,
            shadow,
        });
        self.tree.declare(self.current, id);
        self.names.entry(name).or_default().push(id);
        id
    }

    fn undeclared(&self, name: Symbol, point: ProgramPoint) -> ScopeError {
        ScopeError::MalformedProgram {
            name: self
                .interner
                .try_resolve(name)
                .unwrap_or_else(|| format!("{name:?}")),
            point,
        }
    }
}
