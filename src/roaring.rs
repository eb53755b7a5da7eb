use std::fmt;
use std::mem;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, BitXorAssign, RangeBounds, Sub, SubAssign};

use tracing::{debug, trace};

use crate::container::{self, array_ops, ArrayContainer, Container, ContainerKind, CONTAINER_CAPACITY};
use crate::error::{Error, Result};
use crate::utils::{self, IntoBound};

/// A Roaring Bitmap
///
/// Roaring bitmaps are an optimized bitmap implementation for 32 bit integer sets
/// that support high performance queries and a compact memory representation.
///
/// # How it works
/// Internally data is split into a 16 bit key consisting of the upper 16 bits of the value, and a 16 bit
/// value that contains the lower 16 bits. Only the lower 16 bits are stored and the value is reconstructed
/// from the key on demand. The storage method used changes dynamically based on the number of values
/// contained within each container.
///
/// Generally the representation selected is as follows
///  - Up to 4096 elements   : Array
///  - More than 4096 elements : Bitset
///  - Long runs of values   : RLE encoded, only after [`run_optimize`](RoaringBitmap::run_optimize)
///
/// # Performance Remarks
/// Frequent modification of a bitmap may result in high memory churn due to transitions between
/// in memory representations of the bitmap contents. As such, if the bitmap is to be modified frequently
/// it is best to aggregate operations and apply them at once.
///
/// Once a bitmap is built queries done via the `inplace_<op>` variants reuse the storage of `self`.
/// Queries using the normal ops will create a new bitmap for every operation.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct RoaringBitmap {
    /// List of containers in this roaring bitmap. Never holds an empty container
    pub(crate) containers: Vec<Container>,

    /// List of keys corresponding to the containers in the bitmap, strictly increasing
    pub(crate) keys: Vec<u16>
}

impl RoaringBitmap {
    /// Create a new empty roaring bitmap
    #[inline]
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create a new roaring bitmap with the specified capacity for storing containers
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            containers: Vec::with_capacity(capacity),
            keys: Vec::with_capacity(capacity)
        }
    }

    /// Create a new roaring bitmap holding every value in `range`
    pub fn from_range<R: RangeBounds<u32>>(range: R) -> Self {
        let mut bitmap = Self::new();
        bitmap.add_range(range);

        bitmap
    }

    /// Create a new roaring bitmap from a set of elements
    pub fn from_slice(slice: &[u32]) -> Self {
        slice.iter().copied().collect()
    }

    /// Create a bitmap holding every `u32`
    pub fn full() -> Self {
        Self::from_range(..)
    }

    /// Append a container with a key greater than any other in the bitmap, dropping it if it's empty
    #[inline]
    pub(crate) fn push_container(&mut self, key: u16, container: Container) {
        debug_assert!(self.keys.last().map_or(true, |last| *last < key));

        if !container.is_empty() {
            self.keys.push(key);
            self.containers.push(container);
        }
    }

    /// Find the index of the container for `key`, inserting an empty array container if there is none
    fn container_index(&mut self, key: u16) -> usize {
        match self.keys.binary_search(&key) {
            Ok(i) => i,
            Err(i) => {
                self.keys.insert(i, key);
                self.containers.insert(i, Container::Array(ArrayContainer::new()));

                i
            }
        }
    }

    /// Add a value to the bitmap. Returns true if the value was not already present
    pub fn add(&mut self, value: u32) -> bool {
        let (key, low) = utils::split(value);
        let i = self.container_index(key);

        self.containers[i].add(low)
    }

    /// Add a list of values to the bitmap
    pub fn add_slice(&mut self, slice: &[u32]) {
        self.extend(slice.iter().copied());
    }

    /// Remove a value from the bitmap. Returns true if the value was present
    pub fn remove(&mut self, value: u32) -> bool {
        let (key, low) = utils::split(value);

        match self.keys.binary_search(&key) {
            Ok(i) => {
                let removed = self.containers[i].remove(low);

                if self.containers[i].is_empty() {
                    self.containers.remove(i);
                    self.keys.remove(i);
                }

                removed
            },
            Err(_) => false
        }
    }

    /// Check if the bitmap contains a value
    pub fn contains(&self, value: u32) -> bool {
        let (key, low) = utils::split(value);

        match self.keys.binary_search(&key) {
            Ok(i) => self.containers[i].contains(low),
            Err(_) => false
        }
    }

    /// Replace the containers with keys in `[min_key, max_key]` by the output of `f`.
    ///
    /// `f` is called once per key in the span with the existing container for that key, if any,
    /// and the bounds of the span within that container. Empty results are dropped.
    fn rewrite_span<F>(&mut self, start: u32, last: u32, mut f: F)
        where F: FnMut(Option<Container>, u32, u32) -> Option<Container>
    {
        let (min_key, min_low) = utils::split(start);
        let (max_key, max_low) = utils::split(last);

        let lo = self.keys.partition_point(|k| *k < min_key);
        let hi = lo + self.keys[lo..].partition_point(|k| *k <= max_key);

        let mut existing = self.keys.drain(lo..hi)
            .zip(self.containers.drain(lo..hi))
            .collect::<Vec<_>>()
            .into_iter()
            .peekable();

        let mut keys = Vec::with_capacity(hi - lo);
        let mut containers = Vec::with_capacity(hi - lo);

        for key in min_key..=max_key {
            let container_min = if key == min_key { u32::from(min_low) } else { 0 };
            let container_max = if key == max_key { u32::from(max_low) + 1 } else { CONTAINER_CAPACITY };

            let current = match existing.peek() {
                Some((k, _)) if *k == key => existing.next().map(|(_, c)| c),
                _ => None
            };

            if let Some(container) = f(current, container_min, container_max) {
                if !container.is_empty() {
                    keys.push(key);
                    containers.push(container);
                }
            }
        }

        self.keys.splice(lo..lo, keys);
        self.containers.splice(lo..lo, containers);
    }

    /// Add every value in `range` to the bitmap. Returns the number of values added
    pub fn add_range<R: RangeBounds<u32>>(&mut self, range: R) -> u64 {
        let (start, end) = match range.into_bound() {
            Some(bounds) => bounds,
            None => return 0
        };

        let mut added = 0;
        self.rewrite_span(start, (end - 1) as u32, |current, min, max| {
            match current {
                Some(mut container) => {
                    let before = container.cardinality();
                    container.add_range(min, max);
                    added += (container.cardinality() - before) as u64;

                    Some(container)
                },
                None => {
                    added += u64::from(max - min);
                    Some(Container::from_range(min, max))
                }
            }
        });

        added
    }

    /// Remove every value in `range` from the bitmap. Returns the number of values removed
    pub fn remove_range<R: RangeBounds<u32>>(&mut self, range: R) -> u64 {
        let (start, end) = match range.into_bound() {
            Some(bounds) => bounds,
            None => return 0
        };

        let mut removed = 0;
        self.rewrite_span(start, (end - 1) as u32, |current, min, max| {
            let mut container = current?;
            let before = container.cardinality();

            // The whole container is covered, just drop it
            if min == 0 && max == CONTAINER_CAPACITY {
                removed += before as u64;
                return None;
            }

            container.remove_range(min, max);
            removed += (before - container.cardinality()) as u64;

            Some(container)
        });

        removed
    }

    /// Negate every value within `range`, returning the result as a new bitmap
    pub fn flip<R: RangeBounds<u32>>(&self, range: R) -> Self {
        let mut result = self.clone();
        result.inplace_flip(range);

        result
    }

    /// Same as [`flip`] but operates in place on `self`
    ///
    /// [`flip`]: RoaringBitmap::flip
    pub fn inplace_flip<R: RangeBounds<u32>>(&mut self, range: R) {
        let (start, end) = match range.into_bound() {
            Some(bounds) => bounds,
            None => return
        };

        self.rewrite_span(start, (end - 1) as u32, |current, min, max| {
            match current {
                Some(mut container) => {
                    container.flip_range(min, max);
                    Some(container)
                },
                None => Some(Container::from_range(min, max))
            }
        });
    }

    /// Check if the bitmap contains every value in `range`. The empty range is always contained
    pub fn contains_range<R: RangeBounds<u32>>(&self, range: R) -> bool {
        let (start, end) = match range.into_bound() {
            Some(bounds) => bounds,
            None => return true
        };

        let (min_key, min_low) = utils::split(start);
        let (max_key, max_low) = utils::split((end - 1) as u32);

        let first = match self.keys.binary_search(&min_key) {
            Ok(i) => i,
            Err(_) => return false
        };

        // Every key in the span must be present, and keys are unique so they must be consecutive
        let span = (max_key - min_key) as usize;
        if first + span >= self.keys.len() || self.keys[first + span] != max_key {
            return false;
        }

        self.containers[first..=(first + span)].iter()
            .zip(min_key..=max_key)
            .all(|(container, key)| {
                let container_min = if key == min_key { u32::from(min_low) } else { 0 };
                let container_max = if key == max_key { u32::from(max_low) + 1 } else { CONTAINER_CAPACITY };

                container.contains_range(container_min, container_max)
            })
    }

    /// Locate the containers overlapping `[start, end)` along with the bounds of the range within each one
    fn span_bounds(&self, start: u32, end: u64) -> impl Iterator<Item = (u16, &Container, u32, u32)> + '_ {
        let (min_key, min_low) = utils::split(start);
        let (max_key, max_low) = utils::split((end - 1) as u32);

        let lo = self.keys.partition_point(|k| *k < min_key);
        let hi = lo + self.keys[lo..].partition_point(|k| *k <= max_key);

        self.keys[lo..hi].iter()
            .zip(self.containers[lo..hi].iter())
            .map(move |(key, container)| {
                let container_min = if *key == min_key { u32::from(min_low) } else { 0 };
                let container_max = if *key == max_key { u32::from(max_low) + 1 } else { CONTAINER_CAPACITY };

                (*key, container, container_min, container_max)
            })
    }

    /// Count the values of the bitmap within `range`
    pub fn range_cardinality<R: RangeBounds<u32>>(&self, range: R) -> u64 {
        let (start, end) = match range.into_bound() {
            Some(bounds) => bounds,
            None => return 0
        };

        self.span_bounds(start, end)
            .map(|(_, container, min, max)| {
                if min == 0 && max == CONTAINER_CAPACITY {
                    container.cardinality() as u64
                }
                else {
                    container.cardinality_range(min, max) as u64
                }
            })
            .sum()
    }

    /// Get the values of the bitmap within `range` as a new bitmap
    pub fn select_range<R: RangeBounds<u32>>(&self, range: R) -> Self {
        let mut result = Self::new();
        let (start, end) = match range.into_bound() {
            Some(bounds) => bounds,
            None => return result
        };

        for (key, container, min, max) in self.span_bounds(start, end) {
            let mut container = container.clone();
            if max < CONTAINER_CAPACITY {
                container.remove_range(max, CONTAINER_CAPACITY);
            }

            if min > 0 && !container.is_empty() {
                container.remove_range(0, min);
            }

            result.push_container(key, container);
        }

        result
    }

    /// The number of values in the bitmap
    #[inline]
    pub fn len(&self) -> u64 {
        self.cardinality()
    }

    /// The number of values in the bitmap
    pub fn cardinality(&self) -> u64 {
        self.containers.iter()
            .map(|c| c.cardinality() as u64)
            .sum()
    }

    /// Check if the bitmap is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    /// The number of containers in the bitmap
    #[inline]
    pub fn container_count(&self) -> usize {
        self.containers.len()
    }

    /// Remove all values from the bitmap
    pub fn clear(&mut self) {
        self.containers.clear();
        self.keys.clear();
    }

    /// Shrink the memory used by the bitmap to fit it's contents
    pub fn shrink_to_fit(&mut self) {
        self.containers.shrink_to_fit();
        self.keys.shrink_to_fit();

        for container in self.containers.iter_mut() {
            container.shrink_to_fit();
        }
    }

    /// Get the smallest value in the bitmap
    pub fn min(&self) -> Option<u32> {
        let key = *self.keys.first()?;
        let low = self.containers.first()?.min()?;

        Some(utils::join(key, low))
    }

    /// Get the largest value in the bitmap
    pub fn max(&self) -> Option<u32> {
        let key = *self.keys.last()?;
        let low = self.containers.last()?.max()?;

        Some(utils::join(key, low))
    }

    /// Find the number of values smaller or equal to `value`
    pub fn rank(&self, value: u32) -> u64 {
        let (key, low) = utils::split(value);

        let index = self.keys.partition_point(|k| *k < key);
        let preceding: u64 = self.containers[..index].iter()
            .map(|c| c.cardinality() as u64)
            .sum();

        match self.keys.get(index) {
            Some(k) if *k == key => preceding + self.containers[index].rank(low) as u64,
            _ => preceding
        }
    }

    /// Find the value with the given rank (0 based)
    ///
    /// # Errors
    /// [`Error::OutOfRange`] if `rank` is not smaller than the cardinality of the bitmap
    pub fn select(&self, rank: u64) -> Result<u32> {
        let mut remaining = rank;
        for (key, container) in self.keys.iter().zip(self.containers.iter()) {
            let cardinality = container.cardinality() as u64;

            if remaining < cardinality {
                let low = container.select(remaining as u32)?;
                return Ok(utils::join(*key, low));
            }

            remaining -= cardinality;
        }

        Err(Error::OutOfRange {
            index: rank,
            cardinality: self.cardinality()
        })
    }

    /// Get a bitmap holding the `limit` smallest values of `self`
    pub fn limit(&self, limit: u64) -> Self {
        let mut result = Self::new();
        let mut remaining = limit;

        for (key, container) in self.keys.iter().zip(self.containers.iter()) {
            if remaining == 0 {
                break;
            }

            let cardinality = container.cardinality() as u64;
            if cardinality <= remaining {
                result.push_container(*key, container.clone());
                remaining -= cardinality;
                continue;
            }

            // Cut the container at the first value past the limit
            if let Ok(cut) = container.select(remaining as u32) {
                let mut container = container.clone();
                container.remove_range(u32::from(cut), CONTAINER_CAPACITY);
                result.push_container(*key, container);
            }

            break;
        }

        result
    }

    /// Find the smallest value in the bitmap greater or equal to `value`
    pub fn next_value(&self, value: u32) -> Option<u32> {
        let (key, low) = utils::split(value);

        let mut index = self.keys.partition_point(|k| *k < key);
        if self.keys.get(index) == Some(&key) {
            if let Some(found) = self.containers[index].next_value(low) {
                return Some(utils::join(key, found));
            }

            index += 1;
        }

        let container = self.containers.get(index)?;
        Some(utils::join(self.keys[index], container.min()?))
    }

    /// Find the largest value in the bitmap smaller or equal to `value`
    pub fn previous_value(&self, value: u32) -> Option<u32> {
        let (key, low) = utils::split(value);

        let mut index = self.keys.partition_point(|k| *k <= key);
        if index > 0 && self.keys[index - 1] == key {
            if let Some(found) = self.containers[index - 1].previous_value(low) {
                return Some(utils::join(key, found));
            }

            index -= 1;
        }

        let index = index.checked_sub(1)?;
        Some(utils::join(self.keys[index], self.containers[index].max()?))
    }

    /// Find the smallest value greater or equal to `value` that is not in the bitmap
    pub fn next_absent_value(&self, value: u32) -> Option<u32> {
        let (mut key, mut low) = utils::split(value);
        let mut index = self.keys.partition_point(|k| *k < key);

        loop {
            if self.keys.get(index) != Some(&key) {
                return Some(utils::join(key, low));
            }

            if let Some(found) = self.containers[index].next_absent(low) {
                return Some(utils::join(key, found));
            }

            // Everything from `low` up is present, continue with the following key
            key = key.checked_add(1)?;
            low = 0;
            index += 1;
        }
    }

    /// Find the largest value smaller or equal to `value` that is not in the bitmap
    pub fn previous_absent_value(&self, value: u32) -> Option<u32> {
        let (mut key, mut low) = utils::split(value);
        let mut index = self.keys.partition_point(|k| *k <= key);

        loop {
            if index == 0 || self.keys[index - 1] != key {
                return Some(utils::join(key, low));
            }

            if let Some(found) = self.containers[index - 1].previous_absent(low) {
                return Some(utils::join(key, found));
            }

            key = key.checked_sub(1)?;
            low = u16::MAX;
            index -= 1;
        }
    }

    /// Check if every value in `self` is also in `other`
    pub fn is_subset(&self, other: &Self) -> bool {
        if self.keys.len() > other.keys.len() {
            return false;
        }

        let mut i1 = 0;
        for (key, container) in self.keys.iter().zip(self.containers.iter()) {
            i1 = array_ops::advance_until(&other.keys, i1, *key);

            if i1 == other.keys.len() || other.keys[i1] != *key {
                return false;
            }

            if !container.is_subset(&other.containers[i1]) {
                return false;
            }

            i1 += 1;
        }

        true
    }

    /// Check if `self` and `other` share any value
    pub fn intersects(&self, other: &Self) -> bool {
        let mut i0 = 0;
        let mut i1 = 0;

        while i0 < self.keys.len() && i1 < other.keys.len() {
            let k0 = self.keys[i0];
            let k1 = other.keys[i1];

            if k0 == k1 {
                if self.containers[i0].intersects(&other.containers[i1]) {
                    return true;
                }

                i0 += 1;
                i1 += 1;
            }
            else if k0 < k1 {
                i0 = array_ops::advance_until(&self.keys, i0, k1);
            }
            else {
                i1 = array_ops::advance_until(&other.keys, i1, k0);
            }
        }

        false
    }

    /// Compute the Jaccard index between `self` and `other`.
    /// (Also known as the Tanimoto distance or Jaccard similarity coefficient)
    ///
    /// Returns `None` if both bitmaps are empty
    pub fn jaccard_index(&self, other: &Self) -> Option<f64> {
        if self.is_empty() && other.is_empty() {
            return None;
        }

        let c0 = self.cardinality();
        let c1 = other.cardinality();
        let shared = self.and_cardinality(other);

        Some((shared as f64) / ((c0 + c1 - shared) as f64))
    }

    /// Or this bitmap with `other` (union)
    pub fn or(&self, other: &Self) -> Self {
        if self.is_empty() {
            return other.clone();
        }

        if other.is_empty() {
            return self.clone();
        }

        let len0 = self.keys.len();
        let len1 = other.keys.len();

        let mut result = Self::with_capacity(len0 + len1);
        let mut i0 = 0;
        let mut i1 = 0;

        while i0 < len0 && i1 < len1 {
            let k0 = self.keys[i0];
            let k1 = other.keys[i1];

            if k0 == k1 {
                result.push_container(k0, self.containers[i0].or(&other.containers[i1]));

                i0 += 1;
                i1 += 1;
            }
            else if k0 < k1 {
                result.push_container(k0, self.containers[i0].clone());
                i0 += 1;
            }
            else {
                result.push_container(k1, other.containers[i1].clone());
                i1 += 1;
            }
        }

        // At most one of these has values remaining
        result.containers.extend_from_slice(&self.containers[i0..]);
        result.keys.extend_from_slice(&self.keys[i0..]);
        result.containers.extend_from_slice(&other.containers[i1..]);
        result.keys.extend_from_slice(&other.keys[i1..]);

        result
    }

    /// And this bitmap with `other` (intersect)
    pub fn and(&self, other: &Self) -> Self {
        let len0 = self.keys.len();
        let len1 = other.keys.len();

        let mut result = Self::with_capacity(len0.min(len1));
        let mut i0 = 0;
        let mut i1 = 0;

        while i0 < len0 && i1 < len1 {
            let k0 = self.keys[i0];
            let k1 = other.keys[i1];

            if k0 == k1 {
                result.push_container(k0, self.containers[i0].and(&other.containers[i1]));

                i0 += 1;
                i1 += 1;
            }
            else if k0 < k1 {
                i0 = array_ops::advance_until(&self.keys, i0, k1);
            }
            else {
                i1 = array_ops::advance_until(&other.keys, i1, k0);
            }
        }

        result
    }

    /// And not this bitmap with `other` (difference)
    pub fn and_not(&self, other: &Self) -> Self {
        if self.is_empty() || other.is_empty() {
            return self.clone();
        }

        let len0 = self.keys.len();
        let len1 = other.keys.len();

        let mut result = Self::with_capacity(len0);
        let mut i0 = 0;
        let mut i1 = 0;

        while i0 < len0 && i1 < len1 {
            let k0 = self.keys[i0];
            let k1 = other.keys[i1];

            if k0 == k1 {
                result.push_container(k0, self.containers[i0].and_not(&other.containers[i1]));

                i0 += 1;
                i1 += 1;
            }
            else if k0 < k1 {
                let i0_next = array_ops::advance_until(&self.keys, i0, k1);

                result.containers.extend_from_slice(&self.containers[i0..i0_next]);
                result.keys.extend_from_slice(&self.keys[i0..i0_next]);

                i0 = i0_next;
            }
            else {
                i1 = array_ops::advance_until(&other.keys, i1, k0);
            }
        }

        result.containers.extend_from_slice(&self.containers[i0..]);
        result.keys.extend_from_slice(&self.keys[i0..]);

        result
    }

    /// Xor this bitmap with `other` (symmetric difference)
    pub fn xor(&self, other: &Self) -> Self {
        if self.is_empty() {
            return other.clone();
        }

        if other.is_empty() {
            return self.clone();
        }

        let len0 = self.keys.len();
        let len1 = other.keys.len();

        let mut result = Self::with_capacity(len0 + len1);
        let mut i0 = 0;
        let mut i1 = 0;

        while i0 < len0 && i1 < len1 {
            let k0 = self.keys[i0];
            let k1 = other.keys[i1];

            if k0 == k1 {
                result.push_container(k0, self.containers[i0].xor(&other.containers[i1]));

                i0 += 1;
                i1 += 1;
            }
            else if k0 < k1 {
                result.push_container(k0, self.containers[i0].clone());
                i0 += 1;
            }
            else {
                result.push_container(k1, other.containers[i1].clone());
                i1 += 1;
            }
        }

        result.containers.extend_from_slice(&self.containers[i0..]);
        result.keys.extend_from_slice(&self.keys[i0..]);
        result.containers.extend_from_slice(&other.containers[i1..]);
        result.keys.extend_from_slice(&other.keys[i1..]);

        result
    }

    /// Take the contents of the bitmap, leaving it empty
    fn take_containers(&mut self) -> impl Iterator<Item = (u16, Container)> {
        let keys = mem::take(&mut self.keys);
        let containers = mem::take(&mut self.containers);

        self.keys.reserve(keys.len());
        self.containers.reserve(containers.len());

        keys.into_iter().zip(containers)
    }

    /// Same as [`or`] but operates in place on `self`
    ///
    /// [`or`]: RoaringBitmap::or
    pub fn inplace_or(&mut self, other: &Self) {
        // Other is the empty set, self is unchanged
        if other.is_empty() {
            return;
        }

        // Self is the empty set, copy all of other
        if self.is_empty() {
            self.clone_from(other);
            return;
        }

        let mut i1 = 0;
        for (key, container) in self.take_containers() {
            // Copy the containers only present in other
            while i1 < other.keys.len() && other.keys[i1] < key {
                self.push_container(other.keys[i1], other.containers[i1].clone());
                i1 += 1;
            }

            if i1 < other.keys.len() && other.keys[i1] == key {
                let container = if container.is_full() {
                    container
                }
                else {
                    container.inplace_or(&other.containers[i1])
                };

                self.push_container(key, container);
                i1 += 1;
            }
            else {
                self.push_container(key, container);
            }
        }

        self.containers.extend_from_slice(&other.containers[i1..]);
        self.keys.extend_from_slice(&other.keys[i1..]);
    }

    /// Same as [`and`] but operates in place on `self`
    ///
    /// [`and`]: RoaringBitmap::and
    pub fn inplace_and(&mut self, other: &Self) {
        let mut i1 = 0;
        for (key, container) in self.take_containers() {
            i1 = array_ops::advance_until(&other.keys, i1, key);

            // Other ran out of elements, the remainder of self doesn't intersect
            if i1 == other.keys.len() {
                break;
            }

            if other.keys[i1] == key {
                self.push_container(key, container.inplace_and(&other.containers[i1]));
                i1 += 1;
            }
        }
    }

    /// Same as [`and_not`] but operates in place on `self`
    ///
    /// [`and_not`]: RoaringBitmap::and_not
    pub fn inplace_and_not(&mut self, other: &Self) {
        // If either is the empty set then there are no changes to be made
        if self.is_empty() || other.is_empty() {
            return;
        }

        let mut i1 = 0;
        for (key, container) in self.take_containers() {
            i1 = array_ops::advance_until(&other.keys, i1, key);

            if i1 < other.keys.len() && other.keys[i1] == key {
                self.push_container(key, container.inplace_and_not(&other.containers[i1]));
                i1 += 1;
            }
            else {
                self.push_container(key, container);
            }
        }
    }

    /// Same as [`xor`] but operates in place on `self`
    ///
    /// [`xor`]: RoaringBitmap::xor
    pub fn inplace_xor(&mut self, other: &Self) {
        if other.is_empty() {
            return;
        }

        if self.is_empty() {
            self.clone_from(other);
            return;
        }

        let mut i1 = 0;
        for (key, container) in self.take_containers() {
            while i1 < other.keys.len() && other.keys[i1] < key {
                self.push_container(other.keys[i1], other.containers[i1].clone());
                i1 += 1;
            }

            if i1 < other.keys.len() && other.keys[i1] == key {
                self.push_container(key, container.inplace_xor(&other.containers[i1]));
                i1 += 1;
            }
            else {
                self.push_container(key, container);
            }
        }

        self.containers.extend_from_slice(&other.containers[i1..]);
        self.keys.extend_from_slice(&other.keys[i1..]);
    }

    /// Compute the union of `self` with the values in `[0, range_end)` missing from `other`
    pub fn or_not(&self, other: &Self, range_end: u64) -> Self {
        let mut result = self.clone();
        result.inplace_or_not(other, range_end);

        result
    }

    /// Same as [`or_not`] but operates in place on `self`
    ///
    /// [`or_not`]: RoaringBitmap::or_not
    pub fn inplace_or_not(&mut self, other: &Self, range_end: u64) {
        if range_end == 0 {
            return;
        }

        // Ends past the last representable value cover the whole domain
        let mut complement = match u32::try_from(range_end) {
            Ok(end) => Self::from_range(..end),
            Err(_) => Self::full()
        };

        complement.inplace_and_not(other);
        self.inplace_or(&complement);
    }

    /// Compute the cardinality of `or` on `self` and `other` without storing the result
    pub fn or_cardinality(&self, other: &Self) -> u64 {
        self.cardinality() + other.cardinality() - self.and_cardinality(other)
    }

    /// Compute the cardinality of `and` on `self` and `other` without storing the result
    ///
    /// # Remarks
    /// This computes cardinality in place, no allocations are made
    pub fn and_cardinality(&self, other: &Self) -> u64 {
        let len0 = self.keys.len();
        let len1 = other.keys.len();

        let mut result = 0;
        let mut i0 = 0;
        let mut i1 = 0;

        while i0 < len0 && i1 < len1 {
            let k0 = self.keys[i0];
            let k1 = other.keys[i1];

            if k0 == k1 {
                result += self.containers[i0].and_cardinality(&other.containers[i1]) as u64;

                i0 += 1;
                i1 += 1;
            }
            else if k0 < k1 {
                i0 = array_ops::advance_until(&self.keys, i0, k1);
            }
            else {
                i1 = array_ops::advance_until(&other.keys, i1, k0);
            }
        }

        result
    }

    /// Compute the cardinality of `and_not` on `self` and `other` without storing the result
    pub fn and_not_cardinality(&self, other: &Self) -> u64 {
        self.cardinality() - self.and_cardinality(other)
    }

    /// Compute the cardinality of `xor` on `self` and `other` without storing the result
    pub fn xor_cardinality(&self, other: &Self) -> u64 {
        self.cardinality() + other.cardinality() - 2 * self.and_cardinality(other)
    }

    /// Convert every container to it's most compact representation, run encoding where it is smaller.
    ///
    /// Returns true if the bitmap holds any run container afterwards
    pub fn run_optimize(&mut self) -> bool {
        let mut converted = 0;
        for (key, container) in self.keys.iter().zip(self.containers.iter_mut()) {
            let before = container.kind();
            container.transform(Container::run_optimize);

            let after = container.kind();
            if before != after {
                trace!(key, ?before, ?after, "changed container representation");
                converted += 1;
            }
        }

        let runs = self.containers.iter()
            .filter(|c| c.kind() == ContainerKind::Run)
            .count();

        debug!(containers = self.containers.len(), converted, runs, "run optimized bitmap");

        runs > 0
    }

    /// Convert every run container into an array or bitset.
    ///
    /// Returns true if any container was converted
    pub fn remove_run_compression(&mut self) -> bool {
        let mut converted = false;
        for container in self.containers.iter_mut() {
            if container.kind() == ContainerKind::Run {
                container.transform(Container::remove_run_compression);
                converted = true;
            }
        }

        converted
    }

    /// Check if the bitmap holds any run container
    pub(crate) fn has_run(&self) -> bool {
        self.containers.iter()
            .any(|c| c.kind() == ContainerKind::Run)
    }

    /// Check the internal invariants of the bitmap and all of it's containers
    pub fn validate(&self) -> Result<()> {
        if self.keys.len() != self.containers.len() {
            return Err(Error::InvariantViolation(format!("{} keys for {} containers", self.keys.len(), self.containers.len())));
        }

        if let Some(w) = self.keys.windows(2).find(|w| w[0] >= w[1]) {
            return Err(Error::InvariantViolation(format!("key {} does not follow {}", w[1], w[0])));
        }

        for (key, container) in self.keys.iter().zip(self.containers.iter()) {
            if container.is_empty() {
                return Err(Error::InvariantViolation(format!("container {} is empty", key)));
            }

            container.validate()?;
        }

        Ok(())
    }

    /// Get an iterator over the values of the bitmap
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            containers: &self.containers,
            keys: &self.keys,
            front: None,
            back: None,
            next_index: 0,
            end_index: self.containers.len()
        }
    }
}

impl fmt::Debug for RoaringBitmap {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.len() < 16 {
            write!(f, "RoaringBitmap<{:?}>", self.iter().collect::<Vec<u32>>())
        }
        else {
            write!(
                f,
                "RoaringBitmap<{} values between {:?} and {:?} in {} containers>",
                self.len(),
                self.min(),
                self.max(),
                self.containers.len()
            )
        }
    }
}

impl FromIterator<u32> for RoaringBitmap {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        let mut bitmap = Self::new();
        bitmap.extend(iter);

        bitmap
    }
}

impl Extend<u32> for RoaringBitmap {
    fn extend<I: IntoIterator<Item = u32>>(&mut self, iter: I) {
        // Values sharing the upper 16 bits with the previous one go into the same container
        let mut cached: Option<(u16, usize)> = None;

        for value in iter {
            let (key, low) = utils::split(value);
            let index = match cached {
                Some((k, i)) if k == key => i,
                _ => self.container_index(key)
            };

            self.containers[index].add(low);
            cached = Some((key, index));
        }
    }
}

impl<'a> IntoIterator for &'a RoaringBitmap {
    type Item = u32;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

macro_rules! bitmap_op {
    ($op_trait: ident, $op_fn: ident, $assign_trait: ident, $assign_fn: ident, $op: ident, $inplace: ident) => {
        impl<'a> $op_trait<&'a RoaringBitmap> for &'a RoaringBitmap {
            type Output = RoaringBitmap;

            fn $op_fn(self, other: &'a RoaringBitmap) -> RoaringBitmap {
                self.$op(other)
            }
        }

        impl<'a> $op_trait<&'a RoaringBitmap> for RoaringBitmap {
            type Output = RoaringBitmap;

            fn $op_fn(mut self, other: &'a RoaringBitmap) -> RoaringBitmap {
                self.$inplace(other);
                self
            }
        }

        impl $op_trait<RoaringBitmap> for RoaringBitmap {
            type Output = RoaringBitmap;

            fn $op_fn(mut self, other: RoaringBitmap) -> RoaringBitmap {
                self.$inplace(&other);
                self
            }
        }

        impl<'a> $assign_trait<&'a RoaringBitmap> for RoaringBitmap {
            fn $assign_fn(&mut self, other: &'a RoaringBitmap) {
                self.$inplace(other);
            }
        }

        impl $assign_trait<RoaringBitmap> for RoaringBitmap {
            fn $assign_fn(&mut self, other: RoaringBitmap) {
                self.$inplace(&other);
            }
        }
    };
}

bitmap_op!(BitOr, bitor, BitOrAssign, bitor_assign, or, inplace_or);

bitmap_op!(BitAnd, bitand, BitAndAssign, bitand_assign, and, inplace_and);

bitmap_op!(BitXor, bitxor, BitXorAssign, bitxor_assign, xor, inplace_xor);

bitmap_op!(Sub, sub, SubAssign, sub_assign, and_not, inplace_and_not);

/// An iterator over a roaring bitmap
pub struct Iter<'a> {
    /// The containers we're iterating
    containers: &'a [Container],

    /// The keys we're iterating
    keys: &'a [u16],

    /// The container being iterated from the front and its key
    front: Option<(u16, container::Iter<'a>)>,

    /// The container being iterated from the back and its key
    back: Option<(u16, container::Iter<'a>)>,

    /// The first container not yet claimed by either end
    next_index: usize,

    /// One past the last container not yet claimed by either end
    end_index: usize
}

impl<'a> Iter<'a> {
    /// Skip ahead so the next value returned is at least `value`.
    ///
    /// Containers are skipped with a galloping search over the keys before seeking within the target container.
    /// Does nothing if the iterator is already past `value`
    pub fn advance_to(&mut self, value: u32) {
        let (key, low) = utils::split(value);

        if let Some(front_key) = self.front.as_ref().map(|(k, _)| *k) {
            if front_key > key {
                return;
            }

            if front_key == key {
                if let Some((_, iter)) = self.front.as_mut() {
                    iter.advance_to(low);
                }

                return;
            }

            self.front = None;
        }

        let index = array_ops::advance_until(&self.keys[..self.end_index], self.next_index, key);
        if index < self.end_index {
            let mut iter = self.containers[index].iter();
            if self.keys[index] == key {
                iter.advance_to(low);
            }

            self.front = Some((self.keys[index], iter));
            self.next_index = index + 1;
            return;
        }

        // Only the container claimed by the back end can still hold values
        self.next_index = self.end_index;
        match self.back.as_ref().map(|(k, _)| *k) {
            Some(back_key) if back_key < key => self.back = None,
            Some(back_key) if back_key == key => {
                if let Some((_, iter)) = self.back.as_mut() {
                    iter.advance_to(low);
                }
            },
            _ => ()
        }
    }
}

impl<'a> Iterator for Iter<'a> {
    type Item = u32;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((key, iter)) = self.front.as_mut() {
                if let Some(low) = iter.next() {
                    return Some(utils::join(*key, low));
                }
            }

            if self.next_index < self.end_index {
                // Container exhausted, advance to the next one
                let index = self.next_index;
                self.front = Some((self.keys[index], self.containers[index].iter()));
                self.next_index += 1;
            }
            else {
                let (key, iter) = self.back.as_mut()?;
                return iter.next().map(|low| utils::join(*key, low));
            }
        }
    }
}

impl<'a> DoubleEndedIterator for Iter<'a> {
    fn next_back(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((key, iter)) = self.back.as_mut() {
                if let Some(low) = iter.next_back() {
                    return Some(utils::join(*key, low));
                }
            }

            if self.next_index < self.end_index {
                self.end_index -= 1;
                let index = self.end_index;
                self.back = Some((self.keys[index], self.containers[index].iter()));
            }
            else {
                let (key, iter) = self.front.as_mut()?;
                return iter.next_back().map(|low| utils::join(*key, low));
            }
        }
    }
}

#[cfg(test)]
mod test {
    use crate::RoaringBitmap;
    use crate::container::ContainerKind;
    use crate::error::Error;
    use crate::test::*;

    /// Sparse, dense and clustered inputs so every container representation takes part
    fn fixtures() -> Vec<Vec<u32>> {
        let sparse = generate_data(0..5_000_000u32, 60_000);
        let dense = generate_data(100_000..500_000u32, 150_000);

        let mut clustered: Vec<u32> = (0..50_000)
            .chain(300_000..420_000)
            .chain(1_000_000..1_000_100)
            .collect();
        clustered.extend(generate_data(2_000_000..4_000_000u32, 5_000));
        clustered.sort_unstable();
        clustered.dedup();

        vec![sparse, dense, clustered]
    }

    fn make_bitmap(data: &[u32]) -> RoaringBitmap {
        let mut bitmap = RoaringBitmap::from_slice(data);
        bitmap.run_optimize();

        bitmap
    }

    fn op_test<F>(op: OpType, f: F)
        where F: Fn(RoaringBitmap, &RoaringBitmap) -> RoaringBitmap
    {
        let fixtures = fixtures();

        for data_a in fixtures.iter() {
            for data_b in fixtures.iter() {
                let expected = compute_result(data_a, data_b, op);
                let found = f(make_bitmap(data_a), &make_bitmap(data_b));

                assert_eq!(found.len(), expected.len() as u64);
                assert!(found.iter().eq(expected.iter().copied()));
                found.validate().unwrap();
            }
        }
    }

    fn op_card_test<F>(op: OpType, f: F)
        where F: Fn(&RoaringBitmap, &RoaringBitmap) -> u64
    {
        let fixtures = fixtures();

        for data_a in fixtures.iter() {
            for data_b in fixtures.iter() {
                let expected = compute_result(data_a, data_b, op);

                assert_eq!(f(&make_bitmap(data_a), &make_bitmap(data_b)), expected.len() as u64);
            }
        }
    }

    #[test]
    fn from_range() {
        let bitmap = RoaringBitmap::from_range(0..u32::MAX);
        assert_eq!(bitmap.cardinality(), u32::MAX as u64);
        assert!(!bitmap.contains(u32::MAX));

        let bitmap = RoaringBitmap::from_range(10..=20);
        assert_eq!(bitmap.iter().collect::<Vec<_>>(), (10..=20).collect::<Vec<_>>());

        assert!(RoaringBitmap::from_range(5..5).is_empty());
        assert_eq!(RoaringBitmap::full().len(), 1 << 32);
    }

    #[test]
    fn from_slice() {
        let input = generate_data(0..20_000_000, 200_000);
        let bitmap = RoaringBitmap::from_slice(&input);

        assert_eq!(bitmap.len(), input.len() as u64);
        assert!(bitmap.iter().eq(input.iter().copied()));
        bitmap.validate().unwrap();
    }

    #[test]
    fn add() {
        let mut bitmap = RoaringBitmap::new();

        assert!(bitmap.add(7));
        assert!(!bitmap.add(7));
        assert!(bitmap.add(u32::MAX));
        assert!(bitmap.add(1 << 16));

        assert_eq!(bitmap.container_count(), 3);
        assert_eq!(bitmap.iter().collect::<Vec<_>>(), vec![7, 1 << 16, u32::MAX]);
    }

    #[test]
    fn add_range() {
        let mut bitmap = RoaringBitmap::from_slice(&[5, 70_000, 200_000]);

        assert_eq!(bitmap.add_range(0..140_000), 140_000 - 2);
        assert_eq!(bitmap.len(), 140_001);
        assert!(bitmap.contains_range(0..140_000));
        assert!(bitmap.contains(200_000));
        bitmap.validate().unwrap();

        assert_eq!(bitmap.add_range(10..20), 0);
    }

    #[test]
    fn remove() {
        let input = generate_data(0..2_000_000, 20_000);
        let mut bitmap = RoaringBitmap::from_slice(&input);

        for value in input.iter().step_by(2) {
            assert!(bitmap.remove(*value));
            assert!(!bitmap.remove(*value));
        }

        let expected: Vec<u32> = input.iter().copied().skip(1).step_by(2).collect();
        assert!(bitmap.iter().eq(expected.iter().copied()));
        bitmap.validate().unwrap();

        // Removing the only value of a container drops the container
        let mut bitmap = RoaringBitmap::from_slice(&[1, 1 << 16, 2 << 16]);
        assert!(bitmap.remove(1 << 16));
        assert_eq!(bitmap.container_count(), 2);
        assert_eq!(bitmap.iter().collect::<Vec<_>>(), vec![1, 2 << 16]);
    }

    #[test]
    fn remove_range() {
        let mut bitmap = RoaringBitmap::from_range(0..1_000_000);

        assert_eq!(bitmap.remove_range(100..900_000), 899_900);
        assert_eq!(bitmap.len(), 100_100);
        assert!(bitmap.contains_range(0..100));
        assert!(!bitmap.contains(100));
        assert!(bitmap.contains_range(900_000..1_000_000));
        bitmap.validate().unwrap();

        assert_eq!(bitmap.remove_range(..), 100_100);
        assert!(bitmap.is_empty());
    }

    #[test]
    fn contains_range() {
        let mut bitmap = RoaringBitmap::from_range(60_000..200_000);
        bitmap.add(300_000);

        assert!(bitmap.contains_range(60_000..200_000));
        assert!(bitmap.contains_range(70_000..=70_000));
        assert!(!bitmap.contains_range(59_999..200_000));
        assert!(!bitmap.contains_range(60_000..=200_000));
        assert!(!bitmap.contains_range(100_000..300_001));
        assert!(bitmap.contains_range(5..5));
    }

    #[test]
    fn rank_select() {
        let input = generate_data(0..20_000_000, 100_000);
        let bitmap = RoaringBitmap::from_slice(&input);

        for (i, value) in input.iter().enumerate().step_by(1_013) {
            assert_eq!(bitmap.rank(*value), i as u64 + 1);
            assert_eq!(bitmap.select(i as u64).unwrap(), *value);
        }

        assert_eq!(bitmap.rank(u32::MAX), input.len() as u64);
        assert!(matches!(bitmap.select(input.len() as u64), Err(Error::OutOfRange { .. })));
    }

    #[test]
    fn min_max() {
        let bitmap = RoaringBitmap::from_slice(&[70_000, 3, 1 << 31]);

        assert_eq!(bitmap.min(), Some(3));
        assert_eq!(bitmap.max(), Some(1 << 31));
        assert_eq!(RoaringBitmap::new().min(), None);
        assert_eq!(RoaringBitmap::new().max(), None);
    }

    #[test]
    fn subset_of() {
        let input = generate_data(0..20_000_000, 100_000);
        let a = RoaringBitmap::from_slice(&input);
        let b = RoaringBitmap::from_slice(&input[0..(input.len() / 2)]);

        assert!(b.is_subset(&a));
        assert!(!a.is_subset(&b));
        assert!(RoaringBitmap::new().is_subset(&b));
        assert!(a.intersects(&b));
        assert!(!a.intersects(&RoaringBitmap::new()));
    }

    #[test]
    fn run_optimize() {
        let mut bitmap = RoaringBitmap::from_slice(&(0..100_000).collect::<Vec<u32>>());
        let before = bitmap.clone();

        assert!(bitmap.run_optimize());
        assert!(bitmap.containers.iter().all(|c| c.kind() == ContainerKind::Run));
        assert_eq!(bitmap, before);

        // Idempotent
        let optimized = bitmap.clone();
        assert!(bitmap.run_optimize());
        assert_eq!(bitmap.containers, optimized.containers);

        assert!(bitmap.remove_run_compression());
        assert!(!bitmap.containers.iter().any(|c| c.kind() == ContainerKind::Run));
        assert_eq!(bitmap, before);
        bitmap.validate().unwrap();
    }

    #[test]
    fn or() {
        op_test(OpType::Or, |a, b| a.or(b));
    }

    #[test]
    fn and() {
        op_test(OpType::And, |a, b| a.and(b));
    }

    #[test]
    fn and_not() {
        op_test(OpType::AndNot, |a, b| a.and_not(b));
    }

    #[test]
    fn xor() {
        op_test(OpType::Xor, |a, b| a.xor(b));
    }

    #[test]
    fn inplace_or() {
        op_test(OpType::Or, |mut a, b| { a.inplace_or(b); a });
    }

    #[test]
    fn inplace_and() {
        op_test(OpType::And, |mut a, b| { a.inplace_and(b); a });
    }

    #[test]
    fn inplace_and_not() {
        op_test(OpType::AndNot, |mut a, b| { a.inplace_and_not(b); a });
    }

    #[test]
    fn inplace_xor() {
        op_test(OpType::Xor, |mut a, b| { a.inplace_xor(b); a });
    }

    #[test]
    fn operators() {
        op_test(OpType::Or, |a, b| &a | b);
        op_test(OpType::And, |a, b| a & b);
        op_test(OpType::AndNot, |a, b| a - b);
        op_test(OpType::Xor, |mut a, b| { a ^= b; a });
    }

    #[test]
    fn flip() {
        let input = generate_data(0..20_000_000, 100_000);
        let bitmap = RoaringBitmap::from_slice(&input);
        let flipped = bitmap.flip(..);

        assert_eq!(flipped.cardinality(), (1 << 32) - bitmap.cardinality());
        assert!(!flipped.intersects(&bitmap));

        let mut partial = bitmap.clone();
        partial.inplace_flip(1_000..100_000);
        let in_range = input.iter().filter(|v| (1_000..100_000).contains(*v)).count() as u64;
        assert_eq!(partial.len(), bitmap.len() + 99_000 - 2 * in_range);

        partial.inplace_flip(1_000..100_000);
        assert_eq!(partial, bitmap);
    }

    #[test]
    fn or_cardinality() {
        op_card_test(OpType::Or, |a, b| a.or_cardinality(b));
    }

    #[test]
    fn and_cardinality() {
        op_card_test(OpType::And, |a, b| a.and_cardinality(b));
    }

    #[test]
    fn and_not_cardinality() {
        op_card_test(OpType::AndNot, |a, b| a.and_not_cardinality(b));
    }

    #[test]
    fn xor_cardinality() {
        op_card_test(OpType::Xor, |a, b| a.xor_cardinality(b));
    }

    #[test]
    fn jaccard_index() {
        let a = RoaringBitmap::from_range(0..100);
        let b = RoaringBitmap::from_range(50..150);

        assert_eq!(a.jaccard_index(&b), Some(50.0 / 150.0));
        assert_eq!(RoaringBitmap::new().jaccard_index(&RoaringBitmap::new()), None);
    }

    #[test]
    fn reverse_iteration() {
        for data in fixtures() {
            let bitmap = make_bitmap(&data);
            assert!(bitmap.iter().rev().eq(data.iter().rev().copied()));

            // Alternate between both ends until they meet
            let mut iter = bitmap.iter();
            let mut front = Vec::new();
            let mut back = Vec::new();
            while let Some(value) = iter.next() {
                front.push(value);
                back.extend(iter.next_back());
            }

            front.extend(back.into_iter().rev());
            assert_eq!(front, data);
        }
    }

    #[test]
    fn advance_to() {
        for data in fixtures() {
            let bitmap = make_bitmap(&data);

            for target in [0, 1, 49_999, 65_536, 299_999, 1_000_050, 3_000_000, 4_999_999, u32::MAX] {
                let mut iter = bitmap.iter();
                iter.advance_to(target);

                assert!(iter.eq(data.iter().copied().filter(|v| *v >= target)));
            }

            // Seeking backwards leaves the iterator in place
            let mut iter = bitmap.iter();
            iter.advance_to(400_000);
            let first = iter.next();
            iter.advance_to(10);
            assert_eq!(iter.next(), data.iter().copied().find(|v| Some(*v) > first));

            // The container claimed by the back end is seeked as well
            let mut iter = bitmap.iter();
            let last = iter.next_back();
            let max = data[data.len() - 1];
            iter.advance_to(max - 1);
            let rest: Vec<u32> = iter.collect();
            assert_eq!(last, Some(max));
            assert!(rest.iter().all(|v| *v == max - 1));
        }
    }

    #[test]
    fn next_previous_value() {
        let bitmap = RoaringBitmap::from_slice(&[10, 65_535, 65_536, 300_000, u32::MAX]);

        assert_eq!(bitmap.next_value(0), Some(10));
        assert_eq!(bitmap.next_value(11), Some(65_535));
        assert_eq!(bitmap.next_value(65_536), Some(65_536));
        assert_eq!(bitmap.next_value(65_537), Some(300_000));
        assert_eq!(bitmap.next_value(300_001), Some(u32::MAX));

        assert_eq!(bitmap.previous_value(9), None);
        assert_eq!(bitmap.previous_value(65_535), Some(65_535));
        assert_eq!(bitmap.previous_value(299_999), Some(65_536));
        assert_eq!(bitmap.previous_value(u32::MAX - 1), Some(300_000));

        assert_eq!(RoaringBitmap::new().next_value(0), None);
        assert_eq!(RoaringBitmap::new().previous_value(u32::MAX), None);

        for data in fixtures() {
            let bitmap = make_bitmap(&data);
            for value in data.iter().step_by(997) {
                assert_eq!(bitmap.next_value(*value), Some(*value));
                assert_eq!(bitmap.next_value(value + 1), data.iter().copied().find(|v| *v > *value));
                if let Some(below) = value.checked_sub(1) {
                    assert_eq!(bitmap.previous_value(below), data.iter().rev().copied().find(|v| *v < *value));
                }
            }
        }
    }

    #[test]
    fn next_previous_absent_value() {
        let mut bitmap = RoaringBitmap::from_range(0..200_000);
        bitmap.add(200_001);
        bitmap.run_optimize();

        assert_eq!(bitmap.next_absent_value(5), Some(200_000));
        assert_eq!(bitmap.next_absent_value(200_001), Some(200_002));
        assert_eq!(bitmap.next_absent_value(1 << 20), Some(1 << 20));
        assert_eq!(bitmap.previous_absent_value(199_999), None);
        assert_eq!(bitmap.previous_absent_value(200_001), Some(200_000));
        assert_eq!(bitmap.previous_absent_value(300_000), Some(300_000));

        let full = RoaringBitmap::full();
        assert_eq!(full.next_absent_value(0), None);
        assert_eq!(full.previous_absent_value(u32::MAX), None);

        let mut tail = RoaringBitmap::from_range((u32::MAX - 70_000)..=u32::MAX);
        tail.remove_run_compression();
        assert_eq!(tail.next_absent_value(u32::MAX - 100), None);
        assert_eq!(tail.previous_absent_value(u32::MAX), Some(u32::MAX - 70_001));
    }

    #[test]
    fn range_cardinality() {
        for data in fixtures() {
            let bitmap = make_bitmap(&data);

            for (start, end) in [(0, 1), (10, 70_000), (65_536, 131_072), (299_999, 1_000_050), (0, u32::MAX)] {
                let expected = data.iter().filter(|v| (start..end).contains(*v)).count() as u64;
                assert_eq!(bitmap.range_cardinality(start..end), expected);
            }

            assert_eq!(bitmap.range_cardinality(..), bitmap.len());
            assert_eq!(bitmap.range_cardinality(5..5), 0);
        }
    }

    #[test]
    fn select_range() {
        for data in fixtures() {
            let bitmap = make_bitmap(&data);

            for (start, end) in [(10, 70_000), (65_536, 131_072), (299_999, 1_000_050), (4_000_000, u32::MAX)] {
                let selected = bitmap.select_range(start..end);
                selected.validate().unwrap();

                assert!(selected.iter().eq(data.iter().copied().filter(|v| (start..end).contains(v))));
                assert_eq!(selected.len(), bitmap.range_cardinality(start..end));
            }

            assert_eq!(bitmap.select_range(..), bitmap);
            assert!(bitmap.select_range(7..7).is_empty());
        }
    }

    #[test]
    fn limit() {
        for data in fixtures() {
            let bitmap = make_bitmap(&data);

            for count in [0, 1, 4_096, 65_536, 100_001] {
                let limited = bitmap.limit(count as u64);
                limited.validate().unwrap();

                assert!(limited.iter().eq(data.iter().copied().take(count)));
            }

            assert_eq!(bitmap.limit(u64::MAX), bitmap);
        }
    }

    #[test]
    fn or_not() {
        let a = RoaringBitmap::from_slice(&[1, 100_000, 5_000_000]);
        let b = RoaringBitmap::from_range(10..200_000);

        let result = a.or_not(&b, 300_000);
        result.validate().unwrap();

        let expected: Vec<u32> = (0..10)
            .chain(200_000..300_000)
            .chain([100_000, 5_000_000])
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect();
        assert!(result.iter().eq(expected));

        assert_eq!(a.or_not(&b, 0), a);
        assert_eq!(a.or_not(&b, 1 << 32).len(), (1 << 32) - b.len() + 1);

        let mut inplace = a.clone();
        inplace.inplace_or_not(&b, 300_000);
        assert_eq!(inplace, result);
    }
}
