use std::alloc::{self, Layout};
use std::cell::{Cell, OnceCell};
use std::ptr::NonNull;

use crate::config::WORD;
use crate::error::{ArenaError, Result};

/// A fixed-capacity block of word storage with a bump cursor.
///
/// The storage is allocated once in [`try_new`](Region::try_new) and never
/// moves or resizes, so addresses handed out from it stay valid until the
/// region is dropped. Regions form a singly linked chain: each one owns the
/// region after it.
pub(crate) struct Region {
    /// Start of `capacity` words of storage.
    storage: NonNull<usize>,
    /// Capacity in words.
    capacity: usize,
    /// Words handed out so far. Always `<= capacity`.
    count: Cell<usize>,
    /// Owned link to the next region. Set at most once per chain lifetime.
    next: OnceCell<Box<Region>>,
}

impl Region {
    /// Allocates a region of `words` words.
    ///
    /// Both the header and the storage come from fallible allocation paths;
    /// on failure nothing is leaked and the error carries the storage size.
    pub(crate) fn try_new(words: usize) -> Result<Box<Self>> {
        debug_assert!(words > 0, "regions hold at least one word");
        let bytes = words.saturating_mul(WORD);
        let layout = Layout::array::<usize>(words)
            .map_err(|_| ArenaError::SizeOverflow { size: bytes })?;

        // SAFETY: layout has non-zero size (words > 0).
        let raw = unsafe { alloc::alloc(layout) }.cast::<usize>();
        let storage = NonNull::new(raw).ok_or(ArenaError::OutOfMemory { bytes })?;

        let header = Layout::new::<Self>();
        // SAFETY: `Region` is not zero-sized.
        let slot = unsafe { alloc::alloc(header) }.cast::<Self>();
        let Some(slot) = NonNull::new(slot) else {
            // SAFETY: `storage` was allocated above with `layout` and is not
            // referenced anywhere else.
            unsafe { alloc::dealloc(storage.as_ptr().cast::<u8>(), layout) };
            return Err(ArenaError::OutOfMemory { bytes });
        };

        // SAFETY: `slot` is a fresh allocation with the layout of `Self`,
        // which is exactly what `Box::from_raw` expects from the global
        // allocator.
        unsafe {
            slot.as_ptr().write(Self {
                storage,
                capacity: words,
                count: Cell::new(0),
                next: OnceCell::new(),
            });
            Ok(Box::from_raw(slot.as_ptr()))
        }
    }

    /// Capacity in words.
    pub(crate) const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Words consumed.
    pub(crate) fn count(&self) -> usize {
        self.count.get()
    }

    /// Words still available.
    pub(crate) fn remaining(&self) -> usize {
        self.capacity - self.count.get()
    }

    /// Moves the cursor. Used by reset and rewind.
    pub(crate) fn set_count(&self, count: usize) {
        debug_assert!(count <= self.capacity);
        self.count.set(count);
    }

    /// Address of the cursor, i.e. where the next bump will start.
    ///
    /// Equals one-past-the-end when the region is full.
    pub(crate) fn cursor(&self) -> NonNull<u8> {
        // SAFETY: count <= capacity, so the result is within the allocation
        // or one past its end.
        unsafe { self.storage.add(self.count.get()) }.cast::<u8>()
    }

    /// Hands out `words` words and returns their start.
    ///
    /// The caller must have checked [`remaining`](Region::remaining).
    pub(crate) fn bump(&self, words: usize) -> NonNull<u8> {
        debug_assert!(words <= self.remaining(), "bump past region capacity");
        let ptr = self.cursor();
        self.count.set(self.count.get() + words);
        ptr
    }

    /// Returns `true` if `ptr` points into (or one past the end of) this
    /// region's storage.
    pub(crate) fn contains(&self, ptr: *const u8) -> bool {
        let start = self.storage.as_ptr() as usize;
        let addr = ptr as usize;
        addr >= start && addr <= start + self.capacity * WORD
    }

    /// The region after this one, if any.
    pub(crate) fn next(&self) -> Option<&Self> {
        self.next.get().map(Box::as_ref)
    }

    /// Appends `region` after `self` and returns it.
    ///
    /// Only the tail of a chain may be linked.
    pub(crate) fn link(&self, region: Box<Self>) -> &Self {
        debug_assert!(self.next.get().is_none(), "only the tail region can be linked");
        self.next.get_or_init(|| region)
    }

    /// Detaches and returns the rest of the chain.
    pub(crate) fn take_next(&mut self) -> Option<Box<Self>> {
        self.next.take()
    }
}

impl Drop for Region {
    fn drop(&mut self) {
        // Unlink iteratively so long chains don't recurse once per region.
        let mut next = self.next.take();
        while let Some(mut region) = next {
            next = region.take_next();
        }

        // SAFETY: `storage` was allocated in `try_new` with exactly this
        // layout, which was valid then and is valid now.
        unsafe {
            let layout = Layout::array::<usize>(self.capacity).unwrap_unchecked();
            alloc::dealloc(self.storage.as_ptr().cast::<u8>(), layout);
        }
    }
}

impl std::fmt::Debug for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Region")
            .field("storage", &self.storage)
            .field("capacity", &self.capacity)
            .field("count", &self.count.get())
            .finish_non_exhaustive()
    }
}
