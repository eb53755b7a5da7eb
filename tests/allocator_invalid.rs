//! An allocator handing out malformed storage must not corrupt bitset containers

use std::sync::atomic::{AtomicUsize, Ordering};

use rusting_roaring::{register_allocator, BitsetAllocator, RoaringBitmap};

static CALLS: AtomicUsize = AtomicUsize::new(0);

/// Alternates between storage that is too short and storage with every bit set
struct MalformedAllocator;

impl BitsetAllocator for MalformedAllocator {
    fn allocate(&self) -> Vec<u64> {
        match CALLS.fetch_add(1, Ordering::SeqCst) % 2 {
            0 => vec![0; 16],
            _ => vec![u64::MAX; 1024]
        }
    }
}

#[test]
fn malformed_storage() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .try_init();

    register_allocator(MalformedAllocator).unwrap();

    let values: Vec<u32> = (0..200_000).step_by(2).collect();
    let bitmap: RoaringBitmap = values.iter().copied().collect();
    assert_eq!(bitmap.statistics().bitset_containers, 3);
    assert!(CALLS.load(Ordering::SeqCst) >= 3);

    bitmap.validate().unwrap();
    assert_eq!(bitmap.len(), values.len() as u64);
    assert!(bitmap.iter().eq(values.iter().copied()));

    let copy = bitmap.clone();
    copy.validate().unwrap();
    assert_eq!(copy, bitmap);

    let odd: RoaringBitmap = (1..200_000).step_by(2).collect();
    assert!((&bitmap & &odd).is_empty());
    assert_eq!((&bitmap | &odd).len(), 200_000);
}
