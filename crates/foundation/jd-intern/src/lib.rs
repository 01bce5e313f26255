//! String interning for place names

pub use lasso::Spur as Symbol;
use lasso::ThreadedRodeo;
use std::sync::Arc;

/// Thread-safe string interner
///
/// Place names in the IR are interned symbols; the analyzer resolves them
/// back to strings only when building diagnostic messages. Cloning is cheap
/// and clones share the same backing store.
#[derive(Clone, Debug)]
pub struct Interner {
    rodeo: Arc<ThreadedRodeo>,
}

impl Interner {
    pub fn new() -> Self {
        Self {
            rodeo: Arc::new(ThreadedRodeo::new()),
        }
    }

    /// Intern a string, returning its symbol
    pub fn intern(&self, name: &str) -> Symbol {
        self.rodeo.get_or_intern(name)
    }

    /// Resolve a symbol back to its string
    pub fn resolve(&self, sym: Symbol) -> String {
        self.rodeo.resolve(&sym).to_string()
    }

    /// Resolve a symbol, returning `None` if it was never interned here
    pub fn try_resolve(&self, sym: Symbol) -> Option<String> {
        self.rodeo.try_resolve(&sym).map(ToString::to_string)
    }
}

impl Default for Interner {
    fn default() -> Self {
        Self::new()
    }
}
