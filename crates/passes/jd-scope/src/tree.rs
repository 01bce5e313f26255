//! Arena-backed tree of lexical scopes

use jd_ir::PlaceId;
use jd_span::ProgramPoint;
use la_arena::{Arena, Idx};

/// Unique identifier for a scope
pub type ScopeId = Idx<ScopeData>;

/// A lexical block
#[derive(Debug, Clone)]
pub struct ScopeData {
    /// Parent scope (`None` for the unit's root scope)
    pub parent: Option<ScopeId>,
    /// Nesting depth; the root is 0
    pub depth: u32,
    /// Places declared directly in this scope, in declaration order
    pub declared: Vec<PlaceId>,
    /// Point of the `ScopeEnter` (or 0 for the root)
    pub entered_at: ProgramPoint,
    /// Point of the `ScopeExit`, once closed
    pub exited_at: Option<ProgramPoint>,
}

/// Tree of all scopes in a unit
///
/// Scopes open and close strictly last-in-first-out, so every scope that has
/// not exited yet lies on the path from the root to the innermost open scope.
#[derive(Debug)]
pub struct ScopeTree {
    scopes: Arena<ScopeData>,
    root: ScopeId,
}

impl ScopeTree {
    /// Creates a tree containing only the unit's implicit root scope
    pub fn new() -> Self {
        let mut scopes = Arena::new();
        let root = scopes.alloc(ScopeData {
            parent: None,
            depth: 0,
            declared: Vec::new(),
            entered_at: ProgramPoint::START,
            exited_at: None,
        });
        Self { scopes, root }
    }

    /// The unit's implicit outermost scope
    pub fn root(&self) -> ScopeId {
        self.root
    }

    /// Opens a child of `parent` at `point`
    pub fn create_child(&mut self, parent: ScopeId, point: ProgramPoint) -> ScopeId {
        let depth = self.scopes[parent].depth + 1;
        self.scopes.alloc(ScopeData {
            parent: Some(parent),
            depth,
            declared: Vec::new(),
            entered_at: point,
            exited_at: None,
        })
    }

    /// Scope data for `id`
    pub fn get(&self, id: ScopeId) -> &ScopeData {
        &self.scopes[id]
    }

    /// Records a declaration directly inside `scope`
    pub fn declare(&mut self, scope: ScopeId, place: PlaceId) {
        self.scopes[scope].declared.push(place);
    }

    /// Marks `scope` as exited at `point`
    pub fn mark_exited(&mut self, scope: ScopeId, point: ProgramPoint) {
        self.scopes[scope].exited_at = Some(point);
    }

    /// Whether `scope` has not exited yet
    pub fn is_open(&self, scope: ScopeId) -> bool {
        self.scopes[scope].exited_at.is_none()
    }

    /// Whether `ancestor` contains `descendant` (or is the same scope)
    ///
    /// This is the containment relation the lifetime rules are phrased in:
    /// a referent declared in `ancestor` outlives everything declared in any
    /// `descendant`.
    pub fn is_ancestor_or_self(&self, ancestor: ScopeId, descendant: ScopeId) -> bool {
        let mut current = descendant;
        loop {
            if current == ancestor {
                return true;
            }
            match self.scopes[current].parent {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}
