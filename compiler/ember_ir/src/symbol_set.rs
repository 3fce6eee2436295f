//! Free-variable sets.
//!
//! A `SymbolSet` is a sorted, deduplicated run of symbols. Free-variable sets
//! in real programs are small (most lambdas close over a handful of names), so
//! the elements live inline until they outgrow four entries.
//!
//! Iteration order is the symbols' total order, which makes slot numbering
//! derived from a set deterministic within a process.

use std::fmt;

use smallvec::SmallVec;

use crate::Symbol;

#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct SymbolSet {
    items: SmallVec<[Symbol; 4]>,
}

impl SymbolSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn singleton(symbol: Symbol) -> Self {
        let mut items = SmallVec::new();
        items.push(symbol);
        SymbolSet { items }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[inline]
    pub fn contains(&self, symbol: Symbol) -> bool {
        self.items.binary_search(&symbol).is_ok()
    }

    /// Insert `symbol`; returns `false` if it was already present.
    pub fn insert(&mut self, symbol: Symbol) -> bool {
        match self.items.binary_search(&symbol) {
            Ok(_) => false,
            Err(at) => {
                self.items.insert(at, symbol);
                true
            }
        }
    }

    pub fn remove(&mut self, symbol: Symbol) -> bool {
        match self.items.binary_search(&symbol) {
            Ok(at) => {
                self.items.remove(at);
                true
            }
            Err(_) => false,
        }
    }

    /// Set union, merging the two sorted runs.
    #[must_use]
    pub fn union(&self, other: &SymbolSet) -> SymbolSet {
        let mut items = SmallVec::with_capacity(self.len() + other.len());
        let (mut left, mut right) = (self.items.iter().peekable(), other.items.iter().peekable());
        loop {
            match (left.peek(), right.peek()) {
                (Some(a), Some(b)) => match a.cmp(b) {
                    std::cmp::Ordering::Less => items.extend(left.next().copied()),
                    std::cmp::Ordering::Greater => items.extend(right.next().copied()),
                    std::cmp::Ordering::Equal => {
                        items.extend(left.next().copied());
                        right.next();
                    }
                },
                (Some(_), None) => items.extend(left.next().copied()),
                (None, Some(_)) => items.extend(right.next().copied()),
                (None, None) => break,
            }
        }
        SymbolSet { items }
    }

    /// In-place union.
    pub fn extend_with(&mut self, other: &SymbolSet) {
        if other.is_empty() {
            return;
        }
        *self = self.union(other);
    }

    /// Elements of `self` not in `other`.
    #[must_use]
    pub fn difference(&self, other: &SymbolSet) -> SymbolSet {
        SymbolSet {
            items: self
                .items
                .iter()
                .copied()
                .filter(|s| !other.contains(*s))
                .collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Symbol> + '_ {
        self.items.iter().copied()
    }

    pub fn as_slice(&self) -> &[Symbol] {
        &self.items
    }
}

impl FromIterator<Symbol> for SymbolSet {
    fn from_iter<I: IntoIterator<Item = Symbol>>(iter: I) -> Self {
        let mut items: SmallVec<[Symbol; 4]> = iter.into_iter().collect();
        items.sort_unstable();
        items.dedup();
        SymbolSet { items }
    }
}

impl<'a> IntoIterator for &'a SymbolSet {
    type Item = Symbol;
    type IntoIter = std::iter::Copied<std::slice::Iter<'a, Symbol>>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter().copied()
    }
}

impl fmt::Debug for SymbolSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.items.iter()).finish()
    }
}

#[cfg(test)]
mod tests;
