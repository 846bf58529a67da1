/// Size of one allocator word in bytes.
///
/// All requests are rounded up to whole words, so every pointer handed out by
/// an [`Arena`](crate::Arena) is aligned to this value.
pub const WORD: usize = size_of::<usize>();

/// Default capacity of a freshly created region, in bytes.
pub const DEFAULT_REGION_CAPACITY: usize = 1024;

/// Construction parameters for an [`Arena`](crate::Arena).
///
/// # Example
///
/// ```
/// use region_bump::{Arena, ArenaConfig};
///
/// let config = ArenaConfig::new()
///     .with_region_capacity(4096)
///     .with_max_capacity(64 * 1024);
/// let arena = Arena::with_config(config);
/// assert_eq!(arena.config().region_capacity(), 4096);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArenaConfig {
    region_words: usize,
    max_words: Option<usize>,
}

impl ArenaConfig {
    /// Default configuration: [`DEFAULT_REGION_CAPACITY`] regions, no ceiling.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            region_words: words_for(DEFAULT_REGION_CAPACITY),
            max_words: None,
        }
    }

    /// Sets the capacity of regions created on demand, in bytes.
    ///
    /// Rounded up to whole words, with a minimum of one word. Requests
    /// larger than this still succeed: they get a region sized to fit.
    #[must_use]
    pub const fn with_region_capacity(mut self, bytes: usize) -> Self {
        let words = words_for(bytes);
        self.region_words = if words == 0 { 1 } else { words };
        self
    }

    /// Caps the total capacity of the region chain, in bytes.
    ///
    /// Once the chain would have to grow past this ceiling, allocation
    /// fails with [`ArenaError::CapacityExceeded`](crate::ArenaError::CapacityExceeded)
    /// instead of asking the system for more memory.
    #[must_use]
    pub const fn with_max_capacity(mut self, bytes: usize) -> Self {
        // Rounded down: the ceiling is never exceeded.
        self.max_words = Some(bytes / WORD);
        self
    }

    /// Capacity of regions created on demand, in bytes.
    #[must_use]
    pub const fn region_capacity(&self) -> usize {
        self.region_words.saturating_mul(WORD)
    }

    /// Total capacity ceiling in bytes, if any.
    #[must_use]
    pub const fn max_capacity(&self) -> Option<usize> {
        match self.max_words {
            Some(words) => Some(words * WORD),
            None => None,
        }
    }

    pub(crate) const fn region_words(&self) -> usize {
        self.region_words
    }

    pub(crate) const fn max_words(&self) -> Option<usize> {
        self.max_words
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Number of words needed to hold `bytes`, rounded up.
pub(crate) const fn words_for(bytes: usize) -> usize {
    bytes.div_ceil(WORD)
}
