use std::fmt;
use std::ptr::NonNull;

use super::*;

#[test]
fn alloc_value() {
    let arena = Arena::new();
    let value = arena.alloc(41_u64).unwrap();
    *value += 1;
    assert_eq!(*value, 42);
}

#[test]
fn alloc_many_values_are_independent() {
    let arena = Arena::new();
    let refs: Vec<&mut u32> = (0..1000).map(|i| arena.alloc(i).unwrap()).collect();
    for (i, value) in refs.into_iter().enumerate() {
        assert_eq!(*value as usize, i);
    }
    assert!(arena.region_count() > 1);
}

#[test]
fn alloc_zero_sized_value() {
    let arena = Arena::new();
    let _unit: &mut () = arena.alloc(()).unwrap();
    assert_eq!(arena.allocated_bytes(), 0);
    assert_eq!(arena.region_count(), 1);
}

#[test]
fn alloc_overaligned_value_fails() {
    #[derive(Debug)]
    #[repr(align(64))]
    struct Overaligned(#[allow(dead_code)] u8);

    let arena = Arena::new();
    let err = arena.alloc(Overaligned(1)).unwrap_err();
    assert!(matches!(err, ArenaError::Unaligned { align: 64 }));
    assert_eq!(arena.region_count(), 0);
}

#[test]
fn alloc_zeroed_clears_reused_memory() {
    let mut arena = Arena::new();
    arena.alloc_slice_copy(&[0xFF_u8; 64]).unwrap();
    arena.reset();

    let zeroed = arena.alloc_zeroed(64).unwrap();
    assert_eq!(zeroed.len(), 64);
    assert!(zeroed.iter().all(|&b| b == 0));
}

#[test]
fn alloc_uninit_has_requested_length() {
    let arena = Arena::new();
    let buf = arena.alloc_uninit(13).unwrap();
    assert_eq!(buf.len(), 13);
    assert_eq!(arena.allocated_bytes(), 13_usize.div_ceil(WORD) * WORD);
}

#[test]
fn alloc_slice_copy_copies() {
    let arena = Arena::new();
    let src = [1_u16, 2, 3, 4, 5];
    let copy = arena.alloc_slice_copy(&src).unwrap();
    copy[0] = 10;

    assert_eq!(copy, &[10_u16, 2, 3, 4, 5]);
    assert_eq!(src[0], 1);
}

#[test]
fn alloc_slice_copy_empty() {
    let arena = Arena::new();
    let copy = arena.alloc_slice_copy::<u64>(&[]).unwrap();
    assert!(copy.is_empty());
}

#[test]
fn alloc_str_copies() {
    let arena = Arena::new();
    let owned = String::from("héllo wörld");
    let copy = arena.alloc_str(&owned).unwrap();
    drop(owned);

    copy.make_ascii_uppercase();
    assert_eq!(copy, "HéLLO WöRLD");
}

#[test]
fn alloc_fmt_formats() {
    let arena = Arena::new();
    let s = arena.alloc_fmt(format_args!("{}-{:04}-{:?}", "id", 7, 'x')).unwrap();
    assert_eq!(s, "id-0007-'x'");
    assert_eq!(arena.allocated_bytes(), s.len().div_ceil(WORD) * WORD);
}

#[test]
fn alloc_fmt_literal() {
    let arena = Arena::new();
    let s = arena.alloc_fmt(format_args!("plain")).unwrap();
    assert_eq!(s, "plain");
}

#[test]
fn arena_format_macro() {
    let arena = Arena::new();
    let name = "region";
    let s = arena_format!(arena, "{name}:{}", 1 + 1).unwrap();
    assert_eq!(s, "region:2");

    let long = arena_format!(arena, "{:>2000}", "x").unwrap();
    assert_eq!(long.len(), 2000);
    assert!(long.ends_with('x'));
}

#[test]
fn alloc_fmt_reports_formatter_errors() {
    struct Failing;

    impl fmt::Display for Failing {
        fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
            Err(fmt::Error)
        }
    }

    let arena = Arena::new();
    let err = arena_format!(arena, "{}", Failing).unwrap_err();
    assert!(matches!(err, ArenaError::Format));
}

#[test]
fn alloc_fmt_rejects_growing_output() {
    use std::cell::Cell;

    struct Growing(Cell<usize>);

    impl fmt::Display for Growing {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let n = self.0.get();
            self.0.set(n + 10);
            write!(f, "{}", "y".repeat(n))
        }
    }

    let arena = Arena::new();
    let err = arena_format!(arena, "{}", Growing(Cell::new(1))).unwrap_err();
    assert!(matches!(err, ArenaError::Format));
    // The measured buffer was already handed out.
    assert_eq!(arena.allocated_bytes(), WORD);
}

#[test]
fn failed_format_is_reclaimed_by_rewind() {
    use std::cell::Cell;

    struct FailsSecondTime(Cell<bool>);

    impl fmt::Display for FailsSecondTime {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            if self.0.replace(true) {
                return Err(fmt::Error);
            }
            f.write_str("first")
        }
    }

    let mut arena = Arena::new();
    let mark = arena.mark();
    let err = arena_format!(arena, "{}", FailsSecondTime(Cell::new(false))).unwrap_err();
    assert!(matches!(err, ArenaError::Format));
    assert_eq!(arena.allocated_bytes(), WORD);

    arena.rewind(mark);
    assert_eq!(arena.allocated_bytes(), 0);
}

#[test]
fn realloc_grows_by_copying() {
    let arena = Arena::new();
    let old = arena.alloc_slice_copy(b"abcdef").unwrap();
    let old_ptr = NonNull::from(&mut *old).cast::<u8>();

    // SAFETY: `old_ptr` points at 6 live bytes.
    let new = unsafe { arena.realloc(old_ptr, 6, 64) }.unwrap();
    assert_ne!(new, old_ptr);

    // SAFETY: the first 6 of the 64 new bytes were copied from `old`.
    let copied = unsafe { std::slice::from_raw_parts(new.as_ptr(), 6) };
    assert_eq!(copied, b"abcdef");
    assert_eq!(old, b"abcdef");
}

#[test]
fn realloc_shrink_copies_prefix() {
    let arena = Arena::new();
    let old = arena.alloc_slice_copy(b"abcdef").unwrap();
    let old_ptr = NonNull::from(&mut *old).cast::<u8>();

    // SAFETY: `old_ptr` points at 6 live bytes.
    let new = unsafe { arena.realloc(old_ptr, 6, 3) }.unwrap();
    // SAFETY: 3 bytes were copied.
    let copied = unsafe { std::slice::from_raw_parts(new.as_ptr(), 3) };
    assert_eq!(copied, b"abc");
}

#[test]
fn realloc_failure_keeps_old_block() {
    let arena = Arena::fixed(16);
    let old = arena.alloc_slice_copy(b"12345678").unwrap();
    let old_ptr = NonNull::from(&mut *old).cast::<u8>();

    // SAFETY: `old_ptr` points at 8 live bytes.
    let err = unsafe { arena.realloc(old_ptr, 8, 32) }.unwrap_err();
    assert!(matches!(err, ArenaError::CapacityExceeded { .. }));
    assert_eq!(old, b"12345678");
}

#[test]
fn canonical_path() {
    let arena = Arena::new();
    let dir = std::env::temp_dir();
    let expected = std::fs::canonicalize(&dir).unwrap();

    let path = arena.alloc_canonical_path(&dir).unwrap();
    assert_eq!(path, expected);
    assert!(path.is_absolute());
    assert!(arena.contains(path.as_os_str().as_encoded_bytes().as_ptr()));
}

#[test]
fn canonical_path_missing() {
    let arena = Arena::new();
    let missing = std::env::temp_dir().join("region-bump-definitely-missing/nested");

    let err = arena.alloc_canonical_path(&missing).unwrap_err();
    match err {
        ArenaError::Path { path, source } => {
            assert_eq!(path, missing);
            assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(arena.region_count(), 0);
}
