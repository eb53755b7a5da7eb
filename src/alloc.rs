//! Pluggable storage for bitset containers
//!
//! Bitset containers are the only containers with a large fixed size (`1024` words), so their backing
//! storage is obtained through a process wide [`BitsetAllocator`]. The allocator may be registered exactly
//! once, before any bitset container has been created. If no allocator is registered the [`HeapAllocator`]
//! is used.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

use tracing::{debug, warn};

use crate::container::BITSET_SIZE_IN_WORDS;
use crate::error::{ConfigError, Result};

/// A strategy for obtaining the word storage of bitset containers
pub trait BitsetAllocator: Send + Sync + 'static {
    /// Allocate storage for a bitset container.
    ///
    /// The returned vector must contain exactly [`BITSET_SIZE_IN_WORDS`] words, all zero.
    fn allocate(&self) -> Vec<u64>;

    /// Return storage previously obtained from [`allocate`](BitsetAllocator::allocate)
    fn release(&self, words: Vec<u64>) {
        drop(words);
    }
}

/// Allocates bitset storage on the global heap
#[derive(Clone, Copy, Debug, Default)]
pub struct HeapAllocator;

impl BitsetAllocator for HeapAllocator {
    fn allocate(&self) -> Vec<u64> {
        vec![0; BITSET_SIZE_IN_WORDS]
    }
}

static ALLOCATOR: OnceLock<Box<dyn BitsetAllocator>> = OnceLock::new();
static ALLOCATED: AtomicBool = AtomicBool::new(false);

/// Register the allocator used for all bitset containers in the process
///
/// # Errors
/// - [`ConfigError::ContainersExist`] if bitset storage has already been allocated
/// - [`ConfigError::AlreadyRegistered`] if an allocator was registered before
pub fn register_allocator<A: BitsetAllocator>(allocator: A) -> Result<()> {
    if ALLOCATED.load(Ordering::Acquire) {
        return Err(ConfigError::ContainersExist.into());
    }

    ALLOCATOR.set(Box::new(allocator))
        .map_err(|_| ConfigError::AlreadyRegistered)?;

    debug!("registered bitset allocator");

    Ok(())
}

/// Get the active allocator, falling back to the heap allocator.
///
/// Once this has been called the allocator can no longer be registered.
pub(crate) fn allocator() -> &'static dyn BitsetAllocator {
    ALLOCATED.store(true, Ordering::Release);

    ALLOCATOR.get_or_init(|| Box::new(HeapAllocator)).as_ref()
}

/// Obtain zeroed storage for a bitset container.
///
/// Storage of the wrong size is replaced with a heap allocation and leftover bits are cleared.
pub(crate) fn allocate_words() -> Vec<u64> {
    let mut words = allocator().allocate();

    if words.len() != BITSET_SIZE_IN_WORDS {
        warn!(len = words.len(), "bitset allocator returned storage of the wrong size, using the heap");
        return HeapAllocator.allocate();
    }

    if words.iter().any(|w| *w != 0) {
        warn!("bitset allocator returned storage that is not zeroed");
        words.fill(0);
    }

    words
}

/// Return storage for a bitset container to the allocator
pub(crate) fn release_words(words: Vec<u64>) {
    if !words.is_empty() {
        allocator().release(words);
    }
}
