use crate::config::WORD;
use crate::region::Region;

/// Usage snapshot of one region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegionStats {
    /// Storage size in bytes.
    pub capacity: usize,
    /// Bytes handed out, including word rounding.
    pub used: usize,
}

impl RegionStats {
    /// Bytes still available in this region.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.capacity - self.used
    }
}

/// Iterator over the regions of an arena, head first.
///
/// Created by [`Arena::regions`](crate::Arena::regions).
pub struct Regions<'a> {
    next: Option<&'a Region>,
}

impl<'a> Regions<'a> {
    pub(crate) const fn new(head: Option<&'a Region>) -> Self {
        Self { next: head }
    }
}

impl Iterator for Regions<'_> {
    type Item = RegionStats;

    fn next(&mut self) -> Option<Self::Item> {
        let region = self.next?;
        self.next = region.next();
        Some(RegionStats {
            capacity: region.capacity() * WORD,
            used: region.count() * WORD,
        })
    }
}

impl std::iter::FusedIterator for Regions<'_> {}
