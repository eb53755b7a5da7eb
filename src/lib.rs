#![deny(bare_trait_objects)]

//! Rusting Roaring is a compressed bitmap for sets of 32 bit integers in the style of CRoaring
//!
//! - An idiomatic and safe Rust API
//! - Array, bitset and run containers with automatic selection of the most compact one
//! - Inplace and lazy variants of the set operations
//! - Serialization compatible with the other roaring implementations
//! - Custom allocator support for bitset storage
//!
//! ```
//! use rusting_roaring::RoaringBitmap;
//!
//! let mut a = RoaringBitmap::from_range(0..100_000);
//! let b = RoaringBitmap::from_slice(&[5, 500_000]);
//!
//! assert_eq!((&a & &b).len(), 1);
//!
//! a.run_optimize();
//! let mut bytes = Vec::new();
//! a.serialize(&mut bytes).unwrap();
//!
//! assert_eq!(RoaringBitmap::deserialize(&mut &bytes[..]).unwrap(), a);
//! ```

pub mod aggregation;
pub mod alloc;
pub mod container;
pub mod error;

mod lazy;
mod roaring;
mod serialization;
mod statistics;
mod utils;

mod test;

pub use crate::alloc::{register_allocator, BitsetAllocator, HeapAllocator};
pub use crate::error::{ConfigError, DeserializeError, Error, Result};
pub use crate::lazy::LazyUnion;
pub use crate::roaring::{Iter, RoaringBitmap};
pub use crate::serialization::Format;
pub use crate::statistics::RoaringStatistics;
