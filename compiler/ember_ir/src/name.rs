//! Handles into the symbol table.

use std::fmt;

/// Handle to one name stored in a [`SymbolTable`](crate::SymbolTable).
///
/// The low [`Name::SHARD_BITS`] bits pick the table shard; the remaining
/// bits are the position of the name inside that shard.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct Name(u32);

impl Name {
    pub(crate) const SHARD_BITS: u32 = 4;
    pub(crate) const SHARDS: usize = 1 << Self::SHARD_BITS;
    /// Largest position a shard can hand out.
    pub(crate) const MAX_INDEX: u32 = u32::MAX >> Self::SHARD_BITS;

    const SHARD_MASK: u32 = (1 << Self::SHARD_BITS) - 1;

    pub(crate) const fn pack(shard: u32, index: u32) -> Self {
        debug_assert!(shard <= Self::SHARD_MASK);
        debug_assert!(index <= Self::MAX_INDEX);
        Name((index << Self::SHARD_BITS) | shard)
    }

    #[inline]
    pub(crate) const fn shard(self) -> usize {
        (self.0 & Self::SHARD_MASK) as usize
    }

    #[inline]
    pub(crate) const fn index(self) -> usize {
        (self.0 >> Self::SHARD_BITS) as usize
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({}:{})", self.shard(), self.index())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_round_trips_shard_and_index() {
        let name = Name::pack(5, 1000);
        assert_eq!((name.shard(), name.index()), (5, 1000));

        let last = Name::pack(15, Name::MAX_INDEX);
        assert_eq!(last.shard(), Name::SHARDS - 1);
        assert_eq!(last.index(), Name::MAX_INDEX as usize);
    }

    #[test]
    fn debug_shows_shard_and_index() {
        assert_eq!(format!("{:?}", Name::pack(3, 17)), "Name(3:17)");
    }
}
