//! Symbols: interned atoms compared by name, generated atoms compared by identity.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::LazyLock;

use crate::{Name, SymbolTable};

/// Process-wide symbol table.
static SYMBOLS: LazyLock<SymbolTable> = LazyLock::new(SymbolTable::new);

/// Next generation index handed out by [`Symbol::generate`].
static NEXT_GENERATED: AtomicU64 = AtomicU64::new(0);

/// A Scheme symbol.
///
/// Interned symbols are equal iff their names are equal. Generated symbols
/// are equal iff they carry the same generation index; the hint is only used
/// for printing.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Symbol {
    Interned(Name),
    Generated { index: u64, hint: Name },
}

impl Symbol {
    /// Intern `name` in the process-wide symbol table.
    pub fn intern(name: &str) -> Self {
        Symbol::Interned(SYMBOLS.intern(name))
    }

    /// Create a fresh symbol distinct from every other symbol in the process.
    pub fn generate(hint: &str) -> Self {
        let index = NEXT_GENERATED.fetch_add(1, Ordering::Relaxed);
        Symbol::Generated {
            index,
            hint: SYMBOLS.intern(hint),
        }
    }

    /// The symbol's printed name, without the generated-symbol decoration.
    pub fn name(self) -> &'static str {
        match self {
            Symbol::Interned(name) | Symbol::Generated { hint: name, .. } => SYMBOLS.lookup(name),
        }
    }

    #[inline]
    pub fn is_generated(self) -> bool {
        matches!(self, Symbol::Generated { .. })
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Interned(_) => f.write_str(self.name()),
            Symbol::Generated { index, .. } => write!(f, "#:{}{index}", self.name()),
        }
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({self})")
    }
}

#[cfg(test)]
mod tests;
