//! Containers hold the low 16 bits of the values sharing a key in a [`RoaringBitmap`](crate::RoaringBitmap).
//!
//! There are three representations: sorted arrays for sparse chunks, bitsets for dense chunks and run
//! lists for clustered chunks. [`Container`] wraps all three and dispatches every binary operation to
//! the algorithm specialised for the pair of representations involved.

mod array;
pub(crate) mod array_ops;
mod bitset;
mod bitset_ops;
mod run;
mod run_ops;

use std::io::Write;
use std::mem;
use std::slice;

use crate::error::{Error, Result};

pub use self::array::ArrayContainer;
pub use self::bitset::{BitsetContainer, BITSET_SIZE_IN_WORDS};
pub use self::run::{Rle16, RunContainer};

/// Default maximum size of an array container before it is converted to another type
pub const DEFAULT_MAX_SIZE: usize = 4096;

/// The number of values a container can hold
pub const CONTAINER_CAPACITY: u32 = 1 << 16;

/// The set union operation
pub trait SetOr<T> {
    /// Compute the union of `self` and `other`
    fn or(&self, other: &T) -> Container;

    /// Compute the union, reusing the storage of `self` where possible
    fn inplace_or(self, other: &T) -> Container;
}

/// The set intersection operation
pub trait SetAnd<T> {
    /// Compute the intersection of `self` and `other`
    fn and(&self, other: &T) -> Container;

    /// Compute the intersection, reusing the storage of `self` where possible
    fn inplace_and(self, other: &T) -> Container;

    /// Compute the cardinality of the intersection without materializing it
    fn and_cardinality(&self, other: &T) -> usize;

    /// Check if the intersection is non empty
    fn intersects(&self, other: &T) -> bool;
}

/// The set difference operation
pub trait SetAndNot<T> {
    fn and_not(&self, other: &T) -> Container;

    fn inplace_and_not(self, other: &T) -> Container;
}

/// The set symmetric difference operation
pub trait SetXor<T> {
    fn xor(&self, other: &T) -> Container;

    fn inplace_xor(self, other: &T) -> Container;
}

/// The set subset operation
pub trait Subset<T> {
    fn subset_of(&self, other: &T) -> bool;
}

/// The representation of a container
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    Array,
    Bitset,
    Run
}

/// Enum representing a container of any type
#[derive(Clone, Debug)]
pub enum Container {
    /// Array container
    Array(ArrayContainer),

    /// Bitset container
    Bitset(BitsetContainer),

    /// Run container
    Run(RunContainer)
}

/// Dispatch a binary operation to the implementation for the pair of representations
macro_rules! dispatch {
    ($lhs: expr, $rhs: expr, $op: path) => {
        match ($lhs, $rhs) {
            (Container::Array(a), Container::Array(b)) => $op(a, b),
            (Container::Array(a), Container::Bitset(b)) => $op(a, b),
            (Container::Array(a), Container::Run(b)) => $op(a, b),
            (Container::Bitset(a), Container::Array(b)) => $op(a, b),
            (Container::Bitset(a), Container::Bitset(b)) => $op(a, b),
            (Container::Bitset(a), Container::Run(b)) => $op(a, b),
            (Container::Run(a), Container::Array(b)) => $op(a, b),
            (Container::Run(a), Container::Bitset(b)) => $op(a, b),
            (Container::Run(a), Container::Run(b)) => $op(a, b)
        }
    };
}

impl Container {
    /// Pick the most compact representation for a container with the given cardinality and number of runs.
    ///
    /// Sizes are compared in serialized bytes. A run container is only chosen when it is strictly
    /// smaller than both alternatives, otherwise an array is used up to [`DEFAULT_MAX_SIZE`] values.
    pub fn best_kind(cardinality: usize, num_runs: usize) -> ContainerKind {
        let (kind, size) = if cardinality <= DEFAULT_MAX_SIZE {
            (ContainerKind::Array, ArrayContainer::serialized_size(cardinality))
        }
        else {
            (ContainerKind::Bitset, BitsetContainer::serialized_size())
        };

        if RunContainer::serialized_size(num_runs) < size {
            ContainerKind::Run
        }
        else {
            kind
        }
    }

    /// Create a container with all values in `[min, max)`
    pub fn from_range(min: u32, max: u32) -> Self {
        debug_assert!(min < max && max <= CONTAINER_CAPACITY);

        match Self::best_kind((max - min) as usize, 1) {
            ContainerKind::Run => Container::Run(RunContainer::from_range(min, max)),
            ContainerKind::Array => {
                let mut container = ArrayContainer::with_capacity((max - min) as usize);
                container.add_range(min, max);

                Container::Array(container)
            },
            ContainerKind::Bitset => {
                let mut container = BitsetContainer::new();
                container.set_range(min, max);

                Container::Bitset(container)
            }
        }
    }

    /// Create a container holding every value
    pub fn full() -> Self {
        Container::Run(RunContainer::from_range(0, CONTAINER_CAPACITY))
    }

    /// The representation of the container
    pub fn kind(&self) -> ContainerKind {
        match self {
            Container::Array(_) => ContainerKind::Array,
            Container::Bitset(_) => ContainerKind::Bitset,
            Container::Run(_) => ContainerKind::Run
        }
    }

    /// Shrink the container to fit it's content
    pub fn shrink_to_fit(&mut self) {
        match self {
            Container::Array(c) => c.shrink_to_fit(),
            Container::Bitset(_) => (),            // Bitsets are fixed in size
            Container::Run(c) => c.shrink_to_fit()
        }
    }

    /// Apply `f` to the container by value, replacing it with the result
    pub(crate) fn transform<F: FnOnce(Container) -> Container>(&mut self, f: F) {
        let container = mem::replace(self, Container::Array(ArrayContainer::new()));
        *self = f(container);
    }

    /// Add a value to the underlying container. Returns true if the value was not present
    pub fn add(&mut self, value: u16) -> bool {
        match self {
            Container::Array(c) => {
                if c.cardinality() < DEFAULT_MAX_SIZE {
                    return c.add(value);
                }

                if c.contains(value) {
                    return false;
                }

                // Array is full, promote it to a bitset
                let mut bitset = BitsetContainer::from(&*c);
                bitset.add(value);
                *self = Container::Bitset(bitset);

                true
            },
            Container::Bitset(c) => c.add(value),
            Container::Run(c) => c.add(value)
        }
    }

    /// Remove a value from the underlying container. Returns true if the value was present
    pub fn remove(&mut self, value: u16) -> bool {
        match self {
            Container::Array(c) => c.remove(value),
            Container::Bitset(c) => {
                if !c.remove(value) {
                    return false;
                }

                if c.cardinality() <= DEFAULT_MAX_SIZE {
                    *self = Container::Array(ArrayContainer::from(&*c));
                }

                true
            },
            Container::Run(c) => c.remove(value)
        }
    }

    /// Check if the container contains a value
    pub fn contains(&self, value: u16) -> bool {
        match self {
            Container::Array(c) => c.contains(value),
            Container::Bitset(c) => c.contains(value),
            Container::Run(c) => c.contains(value)
        }
    }

    /// Add every value in `[min, max)`
    pub fn add_range(&mut self, min: u32, max: u32) {
        self.transform(|container| match container {
            Container::Array(mut c) => {
                let cardinality = c.cardinality() + (max - min) as usize - c.cardinality_range(min, max);
                if cardinality <= DEFAULT_MAX_SIZE {
                    c.add_range(min, max);
                    return Container::Array(c);
                }

                let mut bitset = BitsetContainer::from(&c);
                bitset.set_range(min, max);

                Container::Bitset(bitset)
            },
            Container::Bitset(mut c) => {
                c.set_range(min, max);
                Container::Bitset(c)
            },
            Container::Run(mut c) => {
                c.add_range(min, max);
                c.into_efficient_container()
            }
        });
    }

    /// Remove every value in `[min, max)`
    pub fn remove_range(&mut self, min: u32, max: u32) {
        self.transform(|container| match container {
            Container::Array(mut c) => {
                c.remove_range(min, max);
                Container::Array(c)
            },
            Container::Bitset(mut c) => {
                c.unset_range(min, max);
                c.into_efficient_container()
            },
            Container::Run(mut c) => {
                c.remove_range(min, max);
                c.into_efficient_container()
            }
        });
    }

    /// Negate every value in `[min, max)`
    pub fn flip_range(&mut self, min: u32, max: u32) {
        self.transform(|container| match container {
            Container::Array(mut c) => {
                let present = c.cardinality_range(min, max);
                let cardinality = c.cardinality() + (max - min) as usize - 2 * present;
                if cardinality <= DEFAULT_MAX_SIZE {
                    c.flip_range(min, max);
                    return Container::Array(c);
                }

                let mut bitset = BitsetContainer::from(&c);
                bitset.flip_range(min, max);

                Container::Bitset(bitset)
            },
            Container::Bitset(mut c) => {
                c.flip_range(min, max);
                c.into_efficient_container()
            },
            Container::Run(mut c) => {
                c.flip_range(min, max);
                c.into_efficient_container()
            }
        });
    }

    /// Check if the container contains every value in `[min, max)`
    pub fn contains_range(&self, min: u32, max: u32) -> bool {
        match self {
            Container::Array(c) => c.contains_range(min, max),
            Container::Bitset(c) => c.contains_range(min, max),
            Container::Run(c) => c.contains_range(min, max)
        }
    }

    /// Get the cardinality of the container
    pub fn cardinality(&self) -> usize {
        match self {
            Container::Array(c) => c.cardinality(),
            Container::Bitset(c) => c.cardinality(),
            Container::Run(c) => c.cardinality()
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cardinality() == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.cardinality() == CONTAINER_CAPACITY as usize
    }

    /// Get the minimum value in the container
    pub fn min(&self) -> Option<u16> {
        match self {
            Container::Array(c) => c.min(),
            Container::Bitset(c) => c.min(),
            Container::Run(c) => c.min()
        }
    }

    /// Get the maximum value in the container
    pub fn max(&self) -> Option<u16> {
        match self {
            Container::Array(c) => c.max(),
            Container::Bitset(c) => c.max(),
            Container::Run(c) => c.max()
        }
    }

    /// Find the number of values smaller or equal to `value`
    pub fn rank(&self, value: u16) -> usize {
        match self {
            Container::Array(c) => c.rank(value),
            Container::Bitset(c) => c.rank(value),
            Container::Run(c) => c.rank(value)
        }
    }

    /// Find the value with the given rank (0 based)
    ///
    /// # Errors
    /// [`Error::OutOfRange`] if `rank` is not smaller than the cardinality
    pub fn select(&self, rank: u32) -> Result<u16> {
        let found = match self {
            Container::Array(c) => c.select(rank as usize),
            Container::Bitset(c) => c.select(rank as usize),
            Container::Run(c) => c.select(rank as usize)
        };

        found.ok_or(Error::OutOfRange {
            index: u64::from(rank),
            cardinality: self.cardinality() as u64
        })
    }

    /// Get the number of values within `[min, max)`
    pub fn cardinality_range(&self, min: u32, max: u32) -> usize {
        if min >= max {
            return 0;
        }

        let below = match min {
            0 => 0,
            min => self.rank((min - 1) as u16)
        };

        self.rank((max - 1) as u16) - below
    }

    /// Find the smallest value in the container at or above `value`
    pub fn next_value(&self, value: u16) -> Option<u16> {
        let below = match value {
            0 => 0,
            value => self.rank(value - 1)
        };

        self.select(below as u32).ok()
    }

    /// Find the largest value in the container at or below `value`
    pub fn previous_value(&self, value: u16) -> Option<u16> {
        match self.rank(value) {
            0 => None,
            rank => self.select(rank as u32 - 1).ok()
        }
    }

    /// Find the smallest value at or above `value` missing from the container
    pub fn next_absent(&self, value: u16) -> Option<u16> {
        match self {
            Container::Array(c) => c.next_absent(value),
            Container::Bitset(c) => c.next_absent(value),
            Container::Run(c) => c.next_absent(value)
        }
    }

    /// Find the largest value at or below `value` missing from the container
    pub fn previous_absent(&self, value: u16) -> Option<u16> {
        match self {
            Container::Array(c) => c.previous_absent(value),
            Container::Bitset(c) => c.previous_absent(value),
            Container::Run(c) => c.previous_absent(value)
        }
    }

    /// Get the number of runs in the container
    pub fn num_runs(&self) -> usize {
        match self {
            Container::Array(c) => c.num_runs(),
            Container::Bitset(c) => c.num_runs(),
            Container::Run(c) => c.num_runs()
        }
    }

    /// Convert the container into it's most compact representation, considering run encoding
    pub fn run_optimize(self) -> Container {
        match self {
            Container::Array(c) => match Self::best_kind(c.cardinality(), c.num_runs()) {
                ContainerKind::Run => Container::Run(RunContainer::from(&c)),
                _ => Container::Array(c)
            },
            Container::Bitset(c) => match Self::best_kind(c.cardinality(), c.num_runs()) {
                ContainerKind::Run => Container::Run(RunContainer::from(&c)),
                _ => Container::Bitset(c)
            },
            Container::Run(c) => c.into_efficient_container()
        }
    }

    /// Convert a run container into an array or bitset
    pub fn remove_run_compression(self) -> Container {
        match self {
            Container::Run(c) => {
                if c.cardinality() <= DEFAULT_MAX_SIZE {
                    Container::Array(ArrayContainer::from(&c))
                }
                else {
                    Container::Bitset(BitsetContainer::from(&c))
                }
            },
            c => c
        }
    }

    /// Get the size in bytes of the serialized payload of the container
    pub fn serialized_size(&self) -> usize {
        match self {
            Container::Array(c) => ArrayContainer::serialized_size(c.cardinality()),
            Container::Bitset(_) => BitsetContainer::serialized_size(),
            Container::Run(c) => RunContainer::serialized_size(c.num_runs())
        }
    }

    /// Write the payload of the container
    pub fn serialize<W: Write>(&self, buf: &mut W) -> Result<usize> {
        match self {
            Container::Array(c) => c.serialize(buf),
            Container::Bitset(c) => c.serialize(buf),
            Container::Run(c) => c.serialize(buf)
        }
    }

    /// Check the internal invariants of the container
    pub fn validate(&self) -> Result<()> {
        match self {
            Container::Array(c) => c.validate(),
            Container::Bitset(c) => c.validate(),
            Container::Run(c) => c.validate()
        }
    }

    /// Get an iterator over the values of the container
    pub fn iter(&self) -> Iter<'_> {
        match self {
            Container::Array(c) => Iter::Array(c.iter()),
            Container::Bitset(c) => Iter::Bitset(c.iter()),
            Container::Run(c) => Iter::Run(c.iter())
        }
    }
}

impl Container {
    /// Compute the union of two containers
    pub fn or(&self, other: &Container) -> Container {
        dispatch!(self, other, SetOr::or)
    }

    /// Compute the union of two containers, reusing the storage of `self` where possible
    pub fn inplace_or(self, other: &Container) -> Container {
        dispatch!(self, other, SetOr::inplace_or)
    }

    /// Compute the intersection of two containers
    pub fn and(&self, other: &Container) -> Container {
        dispatch!(self, other, SetAnd::and)
    }

    pub fn inplace_and(self, other: &Container) -> Container {
        dispatch!(self, other, SetAnd::inplace_and)
    }

    /// Compute the difference of two containers
    pub fn and_not(&self, other: &Container) -> Container {
        dispatch!(self, other, SetAndNot::and_not)
    }

    pub fn inplace_and_not(self, other: &Container) -> Container {
        dispatch!(self, other, SetAndNot::inplace_and_not)
    }

    /// Compute the symmetric difference of two containers
    pub fn xor(&self, other: &Container) -> Container {
        dispatch!(self, other, SetXor::xor)
    }

    pub fn inplace_xor(self, other: &Container) -> Container {
        dispatch!(self, other, SetXor::inplace_xor)
    }

    /// Compute the cardinality of the intersection of two containers
    pub fn and_cardinality(&self, other: &Container) -> usize {
        dispatch!(self, other, SetAnd::and_cardinality)
    }

    /// Check if two containers share any value
    pub fn intersects(&self, other: &Container) -> bool {
        dispatch!(self, other, SetAnd::intersects)
    }

    /// Check if every value of `self` is in `other`
    pub fn is_subset(&self, other: &Container) -> bool {
        dispatch!(self, other, Subset::subset_of)
    }

    /// Union `other` into the container without maintaining the cardinality of bitsets.
    ///
    /// The result must be passed through [`repair`](Container::repair) before any other use
    pub(crate) fn lazy_or(self, other: &Container) -> Container {
        match (self, other) {
            (Container::Bitset(mut a), Container::Bitset(b)) => {
                a.inplace_or_lazy(b);
                Container::Bitset(a)
            },
            (Container::Bitset(mut a), Container::Array(b)) => {
                a.set_list_lazy(b);
                Container::Bitset(a)
            },
            (Container::Bitset(mut a), Container::Run(b)) => {
                for run in b.iter_runs() {
                    a.set_range(u32::from(run.value), u32::from(run.sum()) + 1);
                }

                Container::Bitset(a)
            },
            (Container::Array(a), Container::Bitset(b)) => {
                let mut result = b.clone();
                result.set_list_lazy(&a);
                Container::Bitset(result)
            },
            (Container::Run(a), Container::Bitset(b)) => {
                if a.is_full() {
                    return Container::Run(a);
                }

                let mut result = b.clone();
                for run in a.iter_runs() {
                    result.set_range(u32::from(run.value), u32::from(run.sum()) + 1);
                }

                Container::Bitset(result)
            },
            (Container::Array(a), Container::Array(b)) if a.cardinality() + b.cardinality() > DEFAULT_MAX_SIZE => {
                let mut result = BitsetContainer::from(&a);
                result.set_list_lazy(b);
                Container::Bitset(result)
            },
            (a, b) => a.inplace_or(b)
        }
    }

    /// Restore the cardinality and representation of a container produced by [`lazy_or`](Container::lazy_or)
    pub(crate) fn repair(self) -> Container {
        match self {
            Container::Bitset(mut c) => {
                c.repair_cardinality();
                c.into_efficient_container()
            },
            c => c
        }
    }
}

impl PartialEq for Container {
    /// Containers are equal when they hold the same values, whatever their representation
    fn eq(&self, other: &Container) -> bool {
        match (self, other) {
            (Container::Array(a), Container::Array(b)) => a == b,
            (Container::Bitset(a), Container::Bitset(b)) => a == b,
            (Container::Run(a), Container::Run(b)) => a == b,
            (a, b) => a.cardinality() == b.cardinality() && a.iter().eq(b.iter())
        }
    }
}

impl Eq for Container { }

impl From<ArrayContainer> for Container {
    fn from(container: ArrayContainer) -> Self {
        Container::Array(container)
    }
}

impl From<BitsetContainer> for Container {
    fn from(container: BitsetContainer) -> Self {
        Container::Bitset(container)
    }
}

impl From<RunContainer> for Container {
    fn from(container: RunContainer) -> Self {
        Container::Run(container)
    }
}

/// An iterator over the values of a container
pub enum Iter<'a> {
    Array(slice::Iter<'a, u16>),
    Bitset(bitset::Iter<'a>),
    Run(run::Iter<'a>)
}

impl<'a> Iterator for Iter<'a> {
    type Item = u16;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Iter::Array(iter) => iter.next().copied(),
            Iter::Bitset(iter) => iter.next(),
            Iter::Run(iter) => iter.next()
        }
    }
}

impl<'a> DoubleEndedIterator for Iter<'a> {
    fn next_back(&mut self) -> Option<Self::Item> {
        match self {
            Iter::Array(iter) => iter.next_back().copied(),
            Iter::Bitset(iter) => iter.next_back(),
            Iter::Run(iter) => iter.next_back()
        }
    }
}

impl<'a> Iter<'a> {
    /// Skip ahead so the next value returned is at least `min`
    pub fn advance_to(&mut self, min: u16) {
        match self {
            Iter::Array(iter) => {
                let rest = iter.as_slice();
                *iter = rest[rest.partition_point(|v| *v < min)..].iter();
            },
            Iter::Bitset(iter) => iter.advance_to(min),
            Iter::Run(iter) => iter.advance_to(min)
        }
    }
}
