//! The allocator is process wide, so registration is exercised from a single test in its own binary

use std::sync::atomic::{AtomicUsize, Ordering};

use rusting_roaring::{register_allocator, BitsetAllocator, ConfigError, Error, HeapAllocator, RoaringBitmap};

static ALLOCATED: AtomicUsize = AtomicUsize::new(0);
static RELEASED: AtomicUsize = AtomicUsize::new(0);

struct CountingAllocator;

impl BitsetAllocator for CountingAllocator {
    fn allocate(&self) -> Vec<u64> {
        ALLOCATED.fetch_add(1, Ordering::SeqCst);
        HeapAllocator.allocate()
    }

    fn release(&self, words: Vec<u64>) {
        RELEASED.fetch_add(1, Ordering::SeqCst);
        drop(words);
    }
}

#[test]
fn registration() {
    register_allocator(CountingAllocator).unwrap();

    let again = register_allocator(HeapAllocator);
    assert!(matches!(again, Err(Error::Configuration(ConfigError::AlreadyRegistered))));

    {
        // Dense enough for a bitset container in each of the first three chunks
        let bitmap: RoaringBitmap = (0..200_000).step_by(3).collect();
        assert_eq!(bitmap.statistics().bitset_containers, 3);
        assert!(ALLOCATED.load(Ordering::SeqCst) >= 3);

        let copy = bitmap.clone();
        assert_eq!(copy, bitmap);
    }

    assert_eq!(ALLOCATED.load(Ordering::SeqCst), RELEASED.load(Ordering::SeqCst));

    let late = register_allocator(HeapAllocator);
    assert!(matches!(late, Err(Error::Configuration(ConfigError::ContainersExist))));
}
