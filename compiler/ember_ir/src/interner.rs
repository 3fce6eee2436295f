//! The process-wide table behind interned symbols.
//!
//! Names are spread over [`Name::SHARDS`] shards by hash, each behind its own
//! `RwLock`, so threads interning unrelated names rarely contend. A name's
//! text is leaked the first time it is seen: interned symbols live as long
//! as the process, and so does their text.

use std::hash::{Hash, Hasher};

use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHasher};

use crate::Name;

#[derive(Default)]
struct Shard {
    positions: FxHashMap<&'static str, u32>,
    names: Vec<&'static str>,
}

impl Shard {
    fn find(&self, text: &str) -> Option<u32> {
        self.positions.get(text).copied()
    }

    /// Store `text` and return its position, or `None` once the shard is full.
    fn insert(&mut self, text: &str) -> Option<u32> {
        let index = u32::try_from(self.names.len())
            .ok()
            .filter(|index| *index <= Name::MAX_INDEX)?;
        let text: &'static str = Box::leak(Box::from(text));
        self.names.push(text);
        self.positions.insert(text, index);
        Some(index)
    }
}

/// Interning failed because a shard ran out of positions.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum InternError {
    #[error("symbol table shard {shard} is full ({count} names)")]
    ShardFull { shard: usize, count: usize },
}

/// Sharded name table mapping text to [`Name`] and back.
pub struct SymbolTable {
    shards: [RwLock<Shard>; Name::SHARDS],
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable {
            shards: std::array::from_fn(|_| RwLock::new(Shard::default())),
        }
    }

    fn shard_of(text: &str) -> u32 {
        let mut hasher = FxHasher::default();
        text.hash(&mut hasher);
        let [low, ..] = hasher.finish().to_le_bytes();
        u32::from(low) % (1 << Name::SHARD_BITS)
    }

    /// The `Name` of `text`, adding it to the table if it is new.
    pub fn try_intern(&self, text: &str) -> Result<Name, InternError> {
        let shard = Self::shard_of(text);
        let lock = &self.shards[shard as usize];

        if let Some(index) = lock.read().find(text) {
            return Ok(Name::pack(shard, index));
        }

        // Another thread may have added `text` between the two locks.
        let mut table = lock.write();
        let index = match table.find(text) {
            Some(index) => index,
            None => table.insert(text).ok_or(InternError::ShardFull {
                shard: shard as usize,
                count: table.names.len(),
            })?,
        };
        Ok(Name::pack(shard, index))
    }

    /// Like [`SymbolTable::try_intern`].
    ///
    /// # Panics
    /// Panics if the shard for `text` already holds `Name::MAX_INDEX + 1` names.
    #[inline]
    pub fn intern(&self, text: &str) -> Name {
        self.try_intern(text).unwrap_or_else(|err| panic!("{err}"))
    }

    /// The text `name` was interned from.
    pub fn lookup(&self, name: Name) -> &'static str {
        self.shards[name.shard()]
            .read()
            .names
            .get(name.index())
            .copied()
            .unwrap_or_default()
    }

    /// Number of distinct names in the table.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.read().names.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests;
