//! Fixed-width set of segment indices.

use std::fmt;

/// Set of segment indices `0..32` backed by one `u32`.
///
/// The receive side keeps the segments still *missing* from a transaction;
/// a cleared bit means the segment has been stored.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct SegmentSet(u32);

impl SegmentSet {
    pub const MAX_SEGMENTS: usize = 32;

    pub const fn empty() -> Self {
        Self(0)
    }

    /// Every index from 0 through `last`.
    pub const fn up_to(last: u8) -> Self {
        if last as usize >= Self::MAX_SEGMENTS - 1 {
            Self(u32::MAX)
        } else {
            Self((1u32 << (last + 1)) - 1)
        }
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, index: u8) -> bool {
        (index as usize) < Self::MAX_SEGMENTS && self.0 & (1 << index) != 0
    }

    /// Add `index`; indices beyond the set width are ignored.
    pub fn insert(&mut self, index: u8) {
        if (index as usize) < Self::MAX_SEGMENTS {
            self.0 |= 1 << index;
        }
    }

    /// Remove `index` from the missing set. Returns `false` if it was
    /// already received.
    pub fn mark_received(&mut self, index: u8) -> bool {
        let was_missing = self.contains(index);
        if was_missing {
            self.0 &= !(1 << index);
        }
        was_missing
    }

    /// Remove every index present in `other`.
    pub fn remove_all(&mut self, other: SegmentSet) {
        self.0 &= !other.0;
    }

    pub const fn all_received(self) -> bool {
        self.0 == 0
    }

    pub const fn highest_missing(self) -> Option<u8> {
        if self.0 == 0 {
            None
        } else {
            Some(31 - self.0.leading_zeros() as u8)
        }
    }

    pub const fn len(self) -> u32 {
        self.0.count_ones()
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = u8> {
        (0..Self::MAX_SEGMENTS as u8).filter(move |&index| self.contains(index))
    }
}

impl fmt::Debug for SegmentSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SegmentSet({:#034b})", self.0)
    }
}
