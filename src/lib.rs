//! Chunked bump-pointer arena allocator.
//!
//! `region-bump` hands out memory by advancing a cursor through a chain of
//! fixed-size regions. It is meant as a shared allocation substrate for
//! short-lived data: dynamic arrays, string builders, parsed tokens and
//! other values that die together.
//!
//! # Key properties
//!
//! - **Stable pointers**: region storage never moves, so an allocation keeps
//!   its address until it is discarded
//! - **Mark/rewind**: save a position and later discard everything allocated
//!   after it in O(regions), with the next allocation landing at the same
//!   address as before
//! - **Reuse**: [`Arena::reset`] and [`Arena::rewind`] keep every region, so
//!   steady-state workloads stop asking the system for memory
//! - **No aborts**: running out of memory is an [`ArenaError`], and a failed
//!   allocation leaves the arena untouched
//!
//! Every allocation is rounded up to whole machine words ([`WORD`]), which
//! also fixes the alignment guarantee. The arena is single-threaded: it is
//! [`Send`] but not [`Sync`]; use one arena per thread.
//!
//! # Example
//!
//! ```
//! use region_bump::{Arena, arena_format};
//!
//! let mut arena = Arena::new();
//! let greeting = arena.alloc_str("hello")?;
//! assert_eq!(greeting, "hello");
//!
//! let mark = arena.mark();
//! for i in 0..100 {
//!     arena_format!(arena, "temporary {i}")?;
//! }
//! arena.rewind(mark); // the 100 strings are gone, "hello" stays
//!
//! arena.reset(); // everything is gone, but the regions are kept
//! assert_eq!(arena.allocated_bytes(), 0);
//! assert!(arena.capacity_bytes() > 0);
//! # Ok::<(), region_bump::ArenaError>(())
//! ```

#![deny(missing_docs)]

mod arena;
mod config;
mod error;
mod helpers;
mod iter;
mod mark;
mod region;

pub use arena::Arena;
pub use config::{ArenaConfig, DEFAULT_REGION_CAPACITY, WORD};
pub use error::{ArenaError, Result};
pub use iter::{RegionStats, Regions};
pub use mark::Mark;

#[cfg(test)]
mod tests;
