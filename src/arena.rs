use std::cell::{Cell, OnceCell};
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, trace, warn};

use crate::config::{ArenaConfig, WORD, words_for};
use crate::error::{ArenaError, Result};
use crate::region::Region;
use crate::{Mark, Regions};

/// Source of chain ids. 0 is reserved for "no chain".
static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Chunked bump-pointer arena.
///
/// Owns a chain of fixed-size regions and hands out word-aligned memory by
/// advancing a cursor through the active region. When the active region is
/// full the arena moves on to the next one, reusing regions left over from a
/// [`reset`](Arena::reset) or [`rewind`](Arena::rewind) before asking the
/// system for a fresh one. Region storage never moves, so every allocation
/// keeps its address until it is discarded.
///
/// Allocation takes `&self` and the returned references borrow the arena;
/// `rewind`, `reset` and `release` take `&mut self`, so nothing allocated
/// can be used after it has been discarded.
///
/// Values placed in the arena are never dropped. Regions are freed on
/// [`release`](Arena::release) or when the arena itself is dropped.
///
/// # Example
///
/// ```
/// use region_bump::Arena;
///
/// let mut arena = Arena::new();
/// let kept = *arena.alloc(7_u64)?;
///
/// let mark = arena.mark();
/// let scratch = arena.alloc_zeroed(500)?.as_ptr();
/// arena.rewind(mark);
///
/// // The scratch space is handed out again.
/// assert_eq!(arena.alloc_zeroed(500)?.as_ptr(), scratch);
/// assert_eq!(kept, 7);
/// # Ok::<(), region_bump::ArenaError>(())
/// ```
pub struct Arena {
    /// Head of the chain. Empty until the first allocation.
    start: OnceCell<Box<Region>>,
    /// Region currently accepting allocations. Always reachable from `start`.
    end: Cell<Option<NonNull<Region>>>,
    /// Sum of all region capacities, in words.
    total_words: Cell<usize>,
    /// Id of the current chain, stamped into every [`Mark`]. Assigned with
    /// the head region, cleared on release; 0 while the arena is empty.
    id: Cell<u64>,
    config: ArenaConfig,
}

// SAFETY: the arena exclusively owns every region and their storage. Moving
// it to another thread requires that no allocation borrows it any more.
unsafe impl Send for Arena {}

impl Arena {
    /// Creates an empty arena with the default configuration.
    ///
    /// No memory is allocated until the first request.
    #[must_use]
    pub const fn new() -> Self {
        Self::with_config(ArenaConfig::new())
    }

    /// Creates an empty arena with the given configuration.
    #[must_use]
    pub const fn with_config(config: ArenaConfig) -> Self {
        Self {
            start: OnceCell::new(),
            end: Cell::new(None),
            total_words: Cell::new(0),
            id: Cell::new(0),
            config,
        }
    }

    /// Creates an arena that never holds more than `capacity` bytes.
    ///
    /// The arena consists of a single region of `capacity` bytes (rounded
    /// up to whole words). Requests that don't fit in what remains fail with
    /// [`ArenaError::CapacityExceeded`] rather than growing the chain.
    #[must_use]
    pub const fn fixed(capacity: usize) -> Self {
        let words = words_for(capacity);
        let bytes = if words == 0 { WORD } else { words.saturating_mul(WORD) };
        Self::with_config(
            ArenaConfig::new()
                .with_region_capacity(bytes)
                .with_max_capacity(bytes),
        )
    }

    /// The configuration this arena was built with.
    #[must_use]
    pub const fn config(&self) -> &ArenaConfig {
        &self.config
    }

    /// Allocates `size` bytes and returns a pointer to the first one.
    ///
    /// The size is rounded up to whole words and the pointer is word
    /// aligned. The memory is uninitialized and stays valid until it is
    /// discarded by [`rewind`](Arena::rewind), [`reset`](Arena::reset) or
    /// [`release`](Arena::release). A zero-byte request returns the current
    /// cursor position without consuming anything.
    ///
    /// This is the primitive the typed helpers such as
    /// [`alloc`](Arena::alloc) and [`alloc_zeroed`](Arena::alloc_zeroed) are
    /// built on.
    ///
    /// # Errors
    ///
    /// - [`ArenaError::SizeOverflow`] if `size` cannot describe an allocation.
    /// - [`ArenaError::CapacityExceeded`] if a configured ceiling would be
    ///   exceeded.
    /// - [`ArenaError::OutOfMemory`] if the system refuses a new region.
    ///
    /// The arena is left untouched when an error is returned.
    pub fn alloc_raw(&self, size: usize) -> Result<NonNull<u8>> {
        let words = words_for(size);
        if words > isize::MAX as usize / WORD {
            return Err(ArenaError::SizeOverflow { size });
        }

        let Some(end) = self.end_region() else {
            let region = self.new_region(words)?;
            let head = self.start.get_or_init(|| region);
            self.id.set(NEXT_ID.fetch_add(1, Ordering::Relaxed));
            self.end.set(Some(NonNull::from(head.as_ref())));
            return Ok(head.bump(words));
        };

        // Walk a local cursor; `end` only moves once the request is certain
        // to succeed.
        let mut target = end;
        while target.remaining() < words {
            match target.next() {
                Some(next) => target = next,
                None => break,
            }
        }
        if target.remaining() < words {
            let region = self.new_region(words)?;
            target = target.link(region);
        }

        self.end.set(Some(NonNull::from(target)));
        Ok(target.bump(words))
    }

    /// Saves the current allocation position.
    ///
    /// Use with [`rewind`](Arena::rewind) to discard allocations made after
    /// this point. O(1).
    #[must_use]
    pub fn mark(&self) -> Mark {
        self.end_region()
            .map_or_else(Mark::empty, |end| Mark::at(self.id.get(), end))
    }

    /// Discards every allocation made after `mark` was taken.
    ///
    /// The marked region's cursor goes back to the saved offset, every
    /// region after it is emptied, and allocation resumes in the marked
    /// region. The next allocation returns the same address as the first
    /// allocation made after [`mark`](Arena::mark). No memory is returned to
    /// the system. O(number of regions).
    ///
    /// A mark taken on an empty arena rewinds to the same state as
    /// [`reset`](Arena::reset).
    ///
    /// # Panics
    ///
    /// Panics if `mark` was taken from a different arena (even one that has
    /// since been dropped), or from this arena before it was
    /// [released](Arena::release).
    pub fn rewind(&mut self, mark: Mark) {
        let Some(target) = mark.region() else {
            self.reset();
            return;
        };

        // Region addresses are recycled by the allocator, so only the chain
        // id tells a stale or foreign mark apart.
        let region = self
            .chain()
            .find(|region| ptr::eq(*region, target.as_ptr()))
            .filter(|_| mark.arena() == self.id.get())
            .unwrap_or_else(|| panic!("{mark:?} does not belong to this arena"));
        assert!(
            mark.offset() <= region.capacity(),
            "{mark:?} is past the end of its region ({} words)",
            region.capacity(),
        );

        region.set_count(mark.offset());
        let mut emptied = 0_usize;
        for later in std::iter::successors(region.next(), |r| r.next()) {
            later.set_count(0);
            emptied += 1;
        }
        self.end.set(Some(NonNull::from(region)));
        trace!(offset = mark.offset(), emptied, "arena rewound");
    }

    /// Runs `f` and then rewinds the arena to where it was before.
    ///
    /// Everything `f` allocates is scratch space: it is discarded once `f`
    /// returns, so the result cannot borrow from the arena.
    ///
    /// ```
    /// use region_bump::Arena;
    ///
    /// let mut arena = Arena::new();
    /// let len = arena.scoped(|scratch| {
    ///     let joined = region_bump::arena_format!(scratch, "{}-{}", "a", "b").unwrap();
    ///     joined.len()
    /// });
    /// assert_eq!(len, 3);
    /// assert_eq!(arena.allocated_bytes(), 0);
    /// ```
    pub fn scoped<R>(&mut self, f: impl FnOnce(&Self) -> R) -> R {
        let mark = self.mark();
        let out = f(self);
        self.rewind(mark);
        out
    }

    /// Discards all allocations.
    ///
    /// Every region is emptied and allocation restarts at the head of the
    /// chain. All region memory is kept for reuse.
    pub fn reset(&mut self) {
        let mut regions = 0_usize;
        for region in self.chain() {
            region.set_count(0);
            regions += 1;
        }
        let head = self.start.get().map(|head| NonNull::from(head.as_ref()));
        self.end.set(head);
        trace!(regions, "arena reset");
    }

    /// Frees every region and returns the arena to its freshly constructed
    /// state.
    ///
    /// Marks taken before the release are no longer valid for this arena.
    pub fn release(&mut self) {
        let bytes = self.capacity_bytes();
        let regions = self.free_chain();
        if regions > 0 {
            debug!(regions, bytes, "arena released");
        }
    }

    /// Number of regions in the chain.
    #[must_use]
    pub fn region_count(&self) -> usize {
        self.chain().count()
    }

    /// Bytes currently handed out, summed over all regions.
    ///
    /// Counts whole words, so it includes rounding.
    #[must_use]
    pub fn allocated_bytes(&self) -> usize {
        self.chain().map(Region::count).sum::<usize>() * WORD
    }

    /// Bytes of region storage owned by the arena.
    #[must_use]
    pub fn capacity_bytes(&self) -> usize {
        self.total_words.get() * WORD
    }

    /// Returns `true` if `ptr` points into storage owned by this arena.
    ///
    /// Pointers discarded by a rewind or reset still count: the storage is
    /// owned, just not in use.
    #[must_use]
    pub fn contains(&self, ptr: *const u8) -> bool {
        self.chain().any(|region| region.contains(ptr))
    }

    /// Returns an iterator over per-region usage, head first.
    #[must_use]
    pub fn regions(&self) -> Regions<'_> {
        Regions::new(self.start.get().map(Box::as_ref))
    }

    fn end_region(&self) -> Option<&Region> {
        // SAFETY: `end` always points at a region owned by `start`'s chain.
        // Regions are boxed and only freed through `&mut self`, so the
        // pointee outlives this borrow.
        self.end.get().map(|end| unsafe { end.as_ref() })
    }

    fn chain(&self) -> impl Iterator<Item = &Region> {
        std::iter::successors(self.start.get().map(Box::as_ref), |region| region.next())
    }

    /// Creates a region able to hold at least `words` words.
    ///
    /// Does not link it: the caller does that once nothing else can fail.
    fn new_region(&self, words: usize) -> Result<Box<Region>> {
        let words = words.max(self.config.region_words());
        let total = self.total_words.get().saturating_add(words);
        if let Some(limit) = self.config.max_words()
            && total > limit
        {
            return Err(ArenaError::CapacityExceeded {
                requested: total.saturating_mul(WORD),
                limit: limit * WORD,
            });
        }

        let region = Region::try_new(words).inspect_err(|err| {
            warn!(words, %err, "region allocation failed");
        })?;
        self.total_words.set(total);
        debug!(
            bytes = words * WORD,
            total_bytes = total * WORD,
            "region created"
        );
        Ok(region)
    }

    /// Drops the whole chain and returns how many regions it held.
    fn free_chain(&mut self) -> usize {
        let mut freed = 0_usize;
        let mut next = self.start.take();
        while let Some(mut region) = next {
            next = region.take_next();
            freed += 1;
        }
        self.end.set(None);
        self.total_words.set(0);
        self.id.set(0);
        freed
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        self.free_chain();
    }
}

impl std::fmt::Debug for Arena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arena")
            .field("regions", &self.region_count())
            .field("allocated_bytes", &self.allocated_bytes())
            .field("capacity_bytes", &self.capacity_bytes())
            .field("config", &self.config)
            .finish()
    }
}
