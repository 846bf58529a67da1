//! Typed allocation helpers built on [`Arena::alloc_raw`].

use std::ffi::OsStr;
use std::fmt;
use std::mem::MaybeUninit;
use std::path::Path;
use std::ptr::{self, NonNull};
use std::slice;

use tracing::warn;

use crate::Arena;
use crate::config::WORD;
use crate::error::{ArenaError, Result};

impl Arena {
    /// Allocates `size` uninitialized bytes.
    ///
    /// # Errors
    ///
    /// Same as [`alloc_raw`](Arena::alloc_raw).
    pub fn alloc_uninit(&self, size: usize) -> Result<&mut [MaybeUninit<u8>]> {
        let ptr = self.alloc_raw(size)?;
        // SAFETY: `alloc_raw` handed out at least `size` bytes that no other
        // allocation overlaps. They stay owned by the arena until a `&mut
        // self` method discards them, which the returned borrow prevents.
        Ok(unsafe { slice::from_raw_parts_mut(ptr.as_ptr().cast::<MaybeUninit<u8>>(), size) })
    }

    /// Allocates `size` bytes, all set to zero.
    ///
    /// # Errors
    ///
    /// Same as [`alloc_raw`](Arena::alloc_raw).
    pub fn alloc_zeroed(&self, size: usize) -> Result<&mut [u8]> {
        let ptr = self.alloc_raw(size)?;
        // SAFETY: as in `alloc_uninit`; the bytes are initialized right here.
        unsafe {
            ptr.as_ptr().write_bytes(0, size);
            Ok(slice::from_raw_parts_mut(ptr.as_ptr(), size))
        }
    }

    /// Moves `value` into the arena and returns a reference to it.
    ///
    /// The value is never dropped; its storage is reclaimed wholesale.
    ///
    /// # Errors
    ///
    /// [`ArenaError::Unaligned`] if `T` needs more than word alignment,
    /// otherwise the same as [`alloc_raw`](Arena::alloc_raw).
    pub fn alloc<T>(&self, value: T) -> Result<&mut T> {
        check_align::<T>()?;
        let ptr = self.alloc_raw(size_of::<T>())?.cast::<T>();
        // SAFETY: word-aligned, `size_of::<T>()` bytes, exclusive (see
        // `alloc_uninit`), and `align_of::<T>() <= WORD` was checked.
        unsafe {
            ptr.as_ptr().write(value);
            Ok(&mut *ptr.as_ptr())
        }
    }

    /// Copies `src` into the arena.
    ///
    /// # Errors
    ///
    /// [`ArenaError::Unaligned`] if `T` needs more than word alignment,
    /// otherwise the same as [`alloc_raw`](Arena::alloc_raw).
    pub fn alloc_slice_copy<T: Copy>(&self, src: &[T]) -> Result<&mut [T]> {
        check_align::<T>()?;
        let ptr = self.alloc_raw(size_of_val(src))?.cast::<T>();
        // SAFETY: room for `src.len()` values of `T`, suitably aligned, and
        // a fresh allocation cannot overlap `src`.
        unsafe {
            ptr::copy_nonoverlapping(src.as_ptr(), ptr.as_ptr(), src.len());
            Ok(slice::from_raw_parts_mut(ptr.as_ptr(), src.len()))
        }
    }

    /// Copies a string into the arena.
    ///
    /// # Errors
    ///
    /// Same as [`alloc_raw`](Arena::alloc_raw).
    pub fn alloc_str(&self, src: &str) -> Result<&mut str> {
        let bytes = self.alloc_slice_copy(src.as_bytes())?;
        // SAFETY: byte-for-byte copy of a valid `str`.
        Ok(unsafe { std::str::from_utf8_unchecked_mut(bytes) })
    }

    /// Formats `args` directly into arena memory.
    ///
    /// The output is measured first, so exactly one allocation is made. See
    /// also the [`arena_format!`](crate::arena_format) macro.
    ///
    /// ```
    /// use region_bump::Arena;
    ///
    /// let arena = Arena::new();
    /// let s = arena.alloc_fmt(format_args!("{}+{}={}", 2, 2, 4))?;
    /// assert_eq!(s, "2+2=4");
    /// # Ok::<(), region_bump::ArenaError>(())
    /// ```
    ///
    /// # Errors
    ///
    /// [`ArenaError::Format`] if a formatting implementation fails, or
    /// writes more on the second pass than it did on the first; otherwise
    /// the same as [`alloc_raw`](Arena::alloc_raw).
    ///
    /// A failure on the second pass happens after the buffer was allocated:
    /// those bytes stay consumed until the next rewind or reset.
    pub fn alloc_fmt(&self, args: fmt::Arguments<'_>) -> Result<&mut str> {
        if let Some(literal) = args.as_str() {
            return self.alloc_str(literal);
        }

        let mut counter = Counter(0);
        fmt::write(&mut counter, args).map_err(|_| ArenaError::Format)?;

        let mut writer = SliceWriter {
            buf: self.alloc_uninit(counter.0)?,
            len: 0,
        };
        fmt::write(&mut writer, args).map_err(|_| ArenaError::Format)?;

        let SliceWriter { buf, len } = writer;
        // SAFETY: the first `len` bytes were written from whole `str`
        // fragments, so they are initialized and valid UTF-8.
        Ok(unsafe {
            let bytes = slice::from_raw_parts_mut(buf.as_mut_ptr().cast::<u8>(), len);
            std::str::from_utf8_unchecked_mut(bytes)
        })
    }

    /// Moves a block to a new allocation of `new_size` bytes.
    ///
    /// Allocates, copies `min(old_size, new_size)` bytes, and abandons the
    /// old block; it is never grown in place. The old block is left intact
    /// if the new allocation fails.
    ///
    /// # Errors
    ///
    /// Same as [`alloc_raw`](Arena::alloc_raw).
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for reads of `min(old_size, new_size)` bytes.
    pub unsafe fn realloc(
        &self,
        ptr: NonNull<u8>,
        old_size: usize,
        new_size: usize,
    ) -> Result<NonNull<u8>> {
        let new = self.alloc_raw(new_size)?;
        // SAFETY: the caller guarantees `ptr` is readable for this length,
        // `new` was just allocated with at least `new_size` bytes, and a
        // fresh allocation does not overlap live memory.
        unsafe { ptr::copy_nonoverlapping(ptr.as_ptr(), new.as_ptr(), old_size.min(new_size)) };
        Ok(new)
    }

    /// Resolves `path` to its canonical absolute form and stores the result
    /// in the arena.
    ///
    /// # Errors
    ///
    /// [`ArenaError::Path`] if the path cannot be resolved (for example, it
    /// does not exist); otherwise the same as
    /// [`alloc_raw`](Arena::alloc_raw).
    pub fn alloc_canonical_path(&self, path: impl AsRef<Path>) -> Result<&Path> {
        let path = path.as_ref();
        let real = std::fs::canonicalize(path).map_err(|source| {
            warn!(path = %path.display(), %source, "could not canonicalize path");
            ArenaError::Path {
                path: path.to_path_buf(),
                source,
            }
        })?;

        let bytes = self.alloc_slice_copy(real.as_os_str().as_encoded_bytes())?;
        // SAFETY: the bytes are an unmodified copy of an `OsStr` encoding.
        Ok(Path::new(unsafe { OsStr::from_encoded_bytes_unchecked(bytes) }))
    }
}

/// Formats into an [`Arena`], returning `Result<&mut str, ArenaError>`.
///
/// ```
/// use region_bump::{Arena, arena_format};
///
/// let arena = Arena::new();
/// let name = "region";
/// assert_eq!(arena_format!(arena, "{name}-{}", 7)?, "region-7");
/// # Ok::<(), region_bump::ArenaError>(())
/// ```
#[macro_export]
macro_rules! arena_format {
    ($arena:expr, $($arg:tt)*) => {
        $arena.alloc_fmt(::core::format_args!($($arg)*))
    };
}

const fn check_align<T>() -> Result<()> {
    if align_of::<T>() > WORD {
        return Err(ArenaError::Unaligned {
            align: align_of::<T>(),
        });
    }
    Ok(())
}

/// Counts formatted bytes without storing them.
struct Counter(usize);

impl fmt::Write for Counter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0 = self.0.checked_add(s.len()).ok_or(fmt::Error)?;
        Ok(())
    }
}

/// Writes whole fragments into a preallocated buffer.
struct SliceWriter<'a> {
    buf: &'a mut [MaybeUninit<u8>],
    len: usize,
}

impl fmt::Write for SliceWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let rest = &mut self.buf[self.len..];
        if s.len() > rest.len() {
            return Err(fmt::Error);
        }
        // SAFETY: `rest` has room for `s.len()` bytes and cannot overlap a
        // `&str` the formatter borrows from elsewhere.
        unsafe { ptr::copy_nonoverlapping(s.as_ptr(), rest.as_mut_ptr().cast::<u8>(), s.len()) };
        self.len += s.len();
        Ok(())
    }
}
