use std::io;
use std::path::PathBuf;

/// Errors returned by fallible [`Arena`](crate::Arena) operations.
///
/// A failed [`Arena::alloc_raw`](crate::Arena::alloc_raw) never mutates the
/// arena: every region's cursor, the chain links and the active region are
/// exactly as before the call. Helpers that allocate before they can fail
/// (such as [`Arena::alloc_fmt`](crate::Arena::alloc_fmt)) document it.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ArenaError {
    /// The global allocator refused to provide a new region.
    #[error("out of memory: failed to allocate a region of {bytes} bytes")]
    OutOfMemory {
        /// Size of the region storage that could not be allocated.
        bytes: usize,
    },

    /// Growing the chain would exceed the configured capacity ceiling.
    #[error("arena capacity exceeded: {requested} bytes requested, limit is {limit} bytes")]
    CapacityExceeded {
        /// Total chain capacity the allocation would have required.
        requested: usize,
        /// Configured ceiling, see [`ArenaConfig::with_max_capacity`](crate::ArenaConfig::with_max_capacity).
        limit: usize,
    },

    /// The request cannot be expressed as a valid memory layout.
    #[error("allocation of {size} bytes overflows the address space")]
    SizeOverflow {
        /// Requested size in bytes (or elements times element size, saturated).
        size: usize,
    },

    /// The value type needs stricter alignment than a machine word.
    #[error("alignment of {align} bytes exceeds word alignment")]
    Unaligned {
        /// Alignment requested by the type.
        align: usize,
    },

    /// A `Display`/`Debug` implementation returned an error while formatting.
    #[error("formatting failed")]
    Format,

    /// A path could not be resolved to its canonical form.
    #[error("could not canonicalize {}: {source}", path.display())]
    Path {
        /// The path as given by the caller.
        path: PathBuf,
        /// Underlying filesystem error.
        #[source]
        source: io::Error,
    },
}

/// Shorthand for results of arena operations.
pub type Result<T, E = ArenaError> = std::result::Result<T, E>;
