use std::ptr::NonNull;

use crate::region::Region;

/// Saved allocation position for rewinding.
///
/// Created by [`Arena::mark`](crate::Arena::mark). Rewinding to a mark
/// discards everything allocated after it and keeps everything before. A
/// mark only records a position: it does not borrow the arena and owns
/// nothing, so it can be held across further allocations freely.
///
/// Marks taken on an empty arena record no region; rewinding to one is the
/// same as [`Arena::reset`](crate::Arena::reset).
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Mark {
    /// Id of the arena chain this mark belongs to; 0 for empty marks.
    arena: u64,
    region: Option<NonNull<Region>>,
    offset: usize,
}

impl Mark {
    pub(crate) const fn empty() -> Self {
        Self {
            arena: 0,
            region: None,
            offset: 0,
        }
    }

    pub(crate) fn at(arena: u64, region: &Region) -> Self {
        Self {
            arena,
            region: Some(NonNull::from(region)),
            offset: region.count(),
        }
    }

    pub(crate) const fn arena(&self) -> u64 {
        self.arena
    }

    pub(crate) const fn region(&self) -> Option<NonNull<Region>> {
        self.region
    }

    /// Cursor position, in words, within the marked region.
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Returns `true` if the mark was taken before the arena had any regions.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.region.is_none()
    }
}

impl std::fmt::Debug for Mark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.region {
            Some(region) => write!(f, "Mark(#{} {region:p}+{})", self.arena, self.offset),
            None => f.write_str("Mark(empty)"),
        }
    }
}
