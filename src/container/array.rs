use std::io::{Read, Write};
use std::ops::Deref;
use std::slice::Iter;

use crate::container::*;
use crate::container::array_ops;
use crate::error::{Error, Result};

/// An array container. Elements are sorted numerically and represented as individual values in the array
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ArrayContainer {
    array: Vec<u16>
}

impl ArrayContainer {
    /// Create a new array container
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new array container with a specified capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            array: Vec::with_capacity(capacity)
        }
    }

    /// Create an array container from values that are already sorted and free of duplicates
    pub(crate) fn from_sorted(array: Vec<u16>) -> Self {
        debug_assert!(array.windows(2).all(|w| w[0] < w[1]));

        Self {
            array
        }
    }

    /// Convert the array container into it's raw representation
    pub fn into_raw(self) -> Vec<u16> {
        self.array
    }

    /// The cardinality of the array container
    #[inline]
    pub fn cardinality(&self) -> usize {
        // Len is the same as the cardinality for raw sets of integers
        self.array.len()
    }

    /// Shrink the capacity of the array container to match the cardinality
    #[inline]
    pub fn shrink_to_fit(&mut self) {
        self.array.shrink_to_fit();
    }

    /// Push a value onto the end of the array
    ///
    /// # Notes
    /// Assumes that the value is greater than all other elements in the array
    #[inline]
    pub fn push(&mut self, value: u16) {
        debug_assert!(self.array.last().map_or(true, |max| *max < value));

        self.array.push(value);
    }

    /// Add a value to the array. Returns true if the value was not present
    pub fn add(&mut self, value: u16) -> bool {
        // Appending is the common case when values arrive in order
        match self.array.last() {
            Some(max) if *max < value => {
                self.array.push(value);
                return true;
            },
            None => {
                self.array.push(value);
                return true;
            },
            _ => ()
        }

        match self.array.binary_search(&value) {
            Ok(_index) => false,
            Err(index) => {
                self.array.insert(index, value);
                true
            }
        }
    }

    /// Remove a specified value from the array. Returns true if the value was present
    pub fn remove(&mut self, value: u16) -> bool {
        match self.array.binary_search(&value) {
            Ok(index) => {
                self.array.remove(index);
                true
            },
            Err(_index) => false
        }
    }

    /// Check if the array contains a specified value
    #[inline]
    pub fn contains(&self, value: u16) -> bool {
        self.array.binary_search(&value).is_ok()
    }

    /// Find the positions in the array bounding the values within `[min, max)`
    #[inline]
    fn range_bounds(&self, min: u32, max: u32) -> (usize, usize) {
        let lo = self.array.partition_point(|v| u32::from(*v) < min);
        let hi = lo + self.array[lo..].partition_point(|v| u32::from(*v) < max);

        (lo, hi)
    }

    /// Check if the array contains all values within `[min, max)`
    pub fn contains_range(&self, min: u32, max: u32) -> bool {
        let (lo, hi) = self.range_bounds(min, max);

        // Values are unique so the range is present iff it's entirely populated
        (hi - lo) as u32 == max - min
    }

    /// Get the number of values within `[min, max)`
    pub fn cardinality_range(&self, min: u32, max: u32) -> usize {
        let (lo, hi) = self.range_bounds(min, max);

        hi - lo
    }

    /// Add all values within `[min, max)`
    ///
    /// # Notes
    /// The result may hold more than [`DEFAULT_MAX_SIZE`] values, callers are expected to convert it
    pub fn add_range(&mut self, min: u32, max: u32) {
        debug_assert!(min < max && max <= 1 << 16);

        let (lo, hi) = self.range_bounds(min, max);
        self.array.splice(lo..hi, (min as u16)..=((max - 1) as u16));
    }

    /// Remove all values within `[min, max)`
    pub fn remove_range(&mut self, min: u32, max: u32) {
        let (lo, hi) = self.range_bounds(min, max);
        self.array.drain(lo..hi);
    }

    /// Negate all values within `[min, max)`
    ///
    /// # Notes
    /// The result may hold more than [`DEFAULT_MAX_SIZE`] values, callers are expected to convert it
    pub fn flip_range(&mut self, min: u32, max: u32) {
        debug_assert!(min < max && max <= 1 << 16);

        let (lo, hi) = self.range_bounds(min, max);

        let mut present = self.array[lo..hi].iter().peekable();
        let mut flipped = Vec::with_capacity((max - min) as usize - (hi - lo));
        for value in min..max {
            if present.peek().map_or(false, |v| u32::from(**v) == value) {
                present.next();
            }
            else {
                flipped.push(value as u16);
            }
        }

        self.array.splice(lo..hi, flipped);
    }

    /// Get the minimum value in the array
    #[inline]
    pub fn min(&self) -> Option<u16> {
        self.array.first().copied()
    }

    /// Get the maximum value in the array
    #[inline]
    pub fn max(&self) -> Option<u16> {
        self.array.last().copied()
    }

    /// Find the number of values smaller or equal to `value`
    #[inline]
    pub fn rank(&self, value: u16) -> usize {
        self.array.partition_point(|v| *v <= value)
    }

    /// Find the value with the given rank (0 based)
    #[inline]
    pub fn select(&self, rank: usize) -> Option<u16> {
        self.array.get(rank).copied()
    }

    /// Find the smallest value at or above `value` missing from the array
    pub fn next_absent(&self, value: u16) -> Option<u16> {
        let start = self.array.partition_point(|v| *v < value);
        let present = self.array[start..].iter()
            .zip(u32::from(value)..)
            .take_while(|(v, expected)| u32::from(**v) == *expected)
            .count();

        u16::try_from(u32::from(value) + present as u32).ok()
    }

    /// Find the largest value at or below `value` missing from the array
    pub fn previous_absent(&self, value: u16) -> Option<u16> {
        let end = self.rank(value);
        let present = self.array[..end].iter()
            .rev()
            .zip((0..=i32::from(value)).rev())
            .take_while(|(v, expected)| i32::from(**v) == *expected)
            .count();

        u16::try_from(i32::from(value) - present as i32).ok()
    }

    /// Get the number of runs in the array
    pub fn num_runs(&self) -> usize {
        if self.array.is_empty() {
            return 0;
        }

        let breaks = self.array.windows(2)
            .filter(|w| u32::from(w[0]) + 1 != u32::from(w[1]))
            .count();

        breaks + 1
    }

    /// Get an iterator over the values of the array
    #[inline]
    pub fn iter(&self) -> Iter<'_, u16> {
        self.array.iter()
    }

    /// Convert self into the most efficient representation by cardinality
    pub fn into_efficient_container(self) -> Container {
        if self.cardinality() <= DEFAULT_MAX_SIZE {
            Container::Array(self)
        }
        else {
            Container::Bitset((&self).into())
        }
    }

    /// Check the internal invariants of the container
    pub fn validate(&self) -> Result<()> {
        if self.array.len() > DEFAULT_MAX_SIZE {
            return Err(Error::InvariantViolation(format!("array container with cardinality {} should be a bitset", self.array.len())));
        }

        if let Some(w) = self.array.windows(2).find(|w| w[0] >= w[1]) {
            return Err(Error::InvariantViolation(format!("array container is not strictly increasing at {}", w[1])));
        }

        Ok(())
    }
}

impl ArrayContainer {
    /// Get the size in bytes of a serialized array container with `cardinality` values
    #[inline]
    pub fn serialized_size(cardinality: usize) -> usize {
        cardinality * 2
    }

    /// Write the values of the array, little endian
    pub fn serialize<W: Write>(&self, buf: &mut W) -> Result<usize> {
        let mut bytes = Vec::with_capacity(Self::serialized_size(self.array.len()));
        for value in self.array.iter() {
            bytes.extend_from_slice(&value.to_le_bytes());
        }

        buf.write_all(&bytes)?;

        Ok(bytes.len())
    }

    /// Read `cardinality` values written by [`serialize`](ArrayContainer::serialize).
    ///
    /// The values are not validated, see [`validate`](ArrayContainer::validate)
    pub fn deserialize<R: Read>(buf: &mut R, cardinality: usize) -> Result<Self> {
        let mut bytes = vec![0; Self::serialized_size(cardinality)];
        buf.read_exact(&mut bytes)?;

        let array = bytes.chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect();

        Ok(Self {
            array
        })
    }
}

impl Deref for ArrayContainer {
    type Target = [u16];

    fn deref(&self) -> &[u16] {
        &self.array
    }
}

impl<'a> From<&'a BitsetContainer> for ArrayContainer {
    fn from(container: &'a BitsetContainer) -> Self {
        let mut array = Vec::with_capacity(container.cardinality());
        array.extend(container.iter());

        Self {
            array
        }
    }
}

impl<'a> From<&'a RunContainer> for ArrayContainer {
    fn from(container: &'a RunContainer) -> Self {
        let mut array = Vec::with_capacity(container.cardinality());
        array.extend(container.iter());

        Self {
            array
        }
    }
}

// Array ∘ Array

impl SetOr<Self> for ArrayContainer {
    fn or(&self, other: &Self) -> Container {
        // Result may be too large for an array, build a bitset instead
        if self.cardinality() + other.cardinality() > DEFAULT_MAX_SIZE {
            let mut bitset = BitsetContainer::from(self);
            bitset.set_list(other);

            return bitset.into_efficient_container();
        }

        let mut array = Vec::with_capacity(self.cardinality() + other.cardinality());
        array_ops::or(self, other, &mut array);

        Container::Array(ArrayContainer::from_sorted(array))
    }

    fn inplace_or(mut self, other: &Self) -> Container {
        // Few values to merge, insert them directly
        if other.cardinality() <= 16 && self.cardinality() + other.cardinality() <= DEFAULT_MAX_SIZE {
            for value in other.iter() {
                self.add(*value);
            }

            return Container::Array(self);
        }

        SetOr::or(&self, other)
    }
}

impl SetAnd<Self> for ArrayContainer {
    fn and(&self, other: &Self) -> Container {
        let mut array = Vec::new();
        array_ops::and(self, other, &mut array);

        Container::Array(ArrayContainer::from_sorted(array))
    }

    fn inplace_and(mut self, other: &Self) -> Container {
        let mut pos = 0;
        self.array.retain(|value| {
            pos = array_ops::advance_until(other, pos, *value);
            pos < other.len() && other[pos] == *value
        });

        Container::Array(self)
    }

    fn and_cardinality(&self, other: &Self) -> usize {
        array_ops::and_cardinality(self, other)
    }

    fn intersects(&self, other: &Self) -> bool {
        array_ops::intersects(self, other)
    }
}

impl SetAndNot<Self> for ArrayContainer {
    fn and_not(&self, other: &Self) -> Container {
        let mut array = Vec::new();
        array_ops::and_not(self, other, &mut array);

        Container::Array(ArrayContainer::from_sorted(array))
    }

    fn inplace_and_not(mut self, other: &Self) -> Container {
        let mut pos = 0;
        self.array.retain(|value| {
            pos = array_ops::advance_until(other, pos, *value);
            pos == other.len() || other[pos] != *value
        });

        Container::Array(self)
    }
}

impl SetXor<Self> for ArrayContainer {
    fn xor(&self, other: &Self) -> Container {
        if self.cardinality() + other.cardinality() > DEFAULT_MAX_SIZE {
            let mut bitset = BitsetContainer::from(self);
            bitset.flip_list(other);

            return bitset.into_efficient_container();
        }

        let mut array = Vec::with_capacity(self.cardinality() + other.cardinality());
        array_ops::xor(self, other, &mut array);

        Container::Array(ArrayContainer::from_sorted(array))
    }

    fn inplace_xor(self, other: &Self) -> Container {
        SetXor::xor(&self, other)
    }
}

impl Subset<Self> for ArrayContainer {
    fn subset_of(&self, other: &Self) -> bool {
        array_ops::is_subset(self, other)
    }
}

// Array ∘ Bitset

impl SetOr<BitsetContainer> for ArrayContainer {
    fn or(&self, other: &BitsetContainer) -> Container {
        SetOr::or(other, self)
    }

    fn inplace_or(self, other: &BitsetContainer) -> Container {
        SetOr::or(other, &self)
    }
}

impl SetAnd<BitsetContainer> for ArrayContainer {
    fn and(&self, other: &BitsetContainer) -> Container {
        let mut array = Vec::with_capacity(self.cardinality());
        array.extend(self.iter().filter(|v| other.contains(**v)));

        Container::Array(ArrayContainer::from_sorted(array))
    }

    fn inplace_and(mut self, other: &BitsetContainer) -> Container {
        self.array.retain(|v| other.contains(*v));

        Container::Array(self)
    }

    fn and_cardinality(&self, other: &BitsetContainer) -> usize {
        self.iter()
            .filter(|v| other.contains(**v))
            .count()
    }

    fn intersects(&self, other: &BitsetContainer) -> bool {
        self.iter()
            .any(|v| other.contains(*v))
    }
}

impl SetAndNot<BitsetContainer> for ArrayContainer {
    fn and_not(&self, other: &BitsetContainer) -> Container {
        let mut array = Vec::with_capacity(self.cardinality());
        array.extend(self.iter().filter(|v| !other.contains(**v)));

        Container::Array(ArrayContainer::from_sorted(array))
    }

    fn inplace_and_not(mut self, other: &BitsetContainer) -> Container {
        self.array.retain(|v| !other.contains(*v));

        Container::Array(self)
    }
}

impl SetXor<BitsetContainer> for ArrayContainer {
    fn xor(&self, other: &BitsetContainer) -> Container {
        let mut bitset = other.clone();
        bitset.flip_list(self);

        bitset.into_efficient_container()
    }

    fn inplace_xor(self, other: &BitsetContainer) -> Container {
        SetXor::xor(&self, other)
    }
}

impl Subset<BitsetContainer> for ArrayContainer {
    fn subset_of(&self, other: &BitsetContainer) -> bool {
        self.cardinality() <= other.cardinality() && self.iter().all(|v| other.contains(*v))
    }
}

// Array ∘ Run

impl SetOr<RunContainer> for ArrayContainer {
    fn or(&self, other: &RunContainer) -> Container {
        SetOr::or(other, self)
    }

    fn inplace_or(self, other: &RunContainer) -> Container {
        SetOr::or(other, &self)
    }
}

impl SetAnd<RunContainer> for ArrayContainer {
    fn and(&self, other: &RunContainer) -> Container {
        SetAnd::and(other, self)
    }

    fn inplace_and(mut self, other: &RunContainer) -> Container {
        self.array.retain(|v| other.contains(*v));

        Container::Array(self)
    }

    fn and_cardinality(&self, other: &RunContainer) -> usize {
        SetAnd::and_cardinality(other, self)
    }

    fn intersects(&self, other: &RunContainer) -> bool {
        SetAnd::intersects(other, self)
    }
}

impl SetAndNot<RunContainer> for ArrayContainer {
    fn and_not(&self, other: &RunContainer) -> Container {
        let mut array = Vec::with_capacity(self.cardinality());
        for_each_uncovered(self, other, |value| array.push(value));

        Container::Array(ArrayContainer::from_sorted(array))
    }

    fn inplace_and_not(self, other: &RunContainer) -> Container {
        SetAndNot::and_not(&self, other)
    }
}

impl SetXor<RunContainer> for ArrayContainer {
    fn xor(&self, other: &RunContainer) -> Container {
        SetXor::xor(other, self)
    }

    fn inplace_xor(self, other: &RunContainer) -> Container {
        SetXor::xor(other, &self)
    }
}

impl Subset<RunContainer> for ArrayContainer {
    fn subset_of(&self, other: &RunContainer) -> bool {
        if self.cardinality() > other.cardinality() {
            return false;
        }

        let mut uncovered = false;
        for_each_uncovered(self, other, |_| uncovered = true);

        !uncovered
    }
}

/// Call `f` with every value of `array` that is not covered by `runs`, in ascending order
fn for_each_uncovered<F: FnMut(u16)>(array: &ArrayContainer, runs: &RunContainer, mut f: F) {
    let runs = runs.runs();

    let mut i_run = 0;
    for value in array.iter() {
        while i_run < runs.len() && runs[i_run].sum() < *value {
            i_run += 1;
        }

        match runs.get(i_run) {
            Some(run) if run.value <= *value => continue,
            _ => f(*value)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test::*;

    fn make_container(values: &[u16]) -> ArrayContainer {
        ArrayContainer::from_sorted(values.to_vec())
    }

    #[test]
    fn add_remove() {
        let mut container = ArrayContainer::new();

        assert!(container.add(10));
        assert!(container.add(5));
        assert!(container.add(20));
        assert!(!container.add(10));
        assert_eq!(&*container, &[5, 10, 20]);

        assert!(container.remove(10));
        assert!(!container.remove(10));
        assert_eq!(&*container, &[5, 20]);
    }

    #[test]
    fn ranges() {
        let mut container = make_container(&[1, 5, 10, 50]);

        container.add_range(4, 12);
        assert_eq!(&*container, &[1, 4, 5, 6, 7, 8, 9, 10, 11, 50]);
        assert!(container.contains_range(4, 12));
        assert!(!container.contains_range(3, 12));
        assert_eq!(container.cardinality_range(0, 8), 5);

        container.remove_range(5, 11);
        assert_eq!(&*container, &[1, 4, 11, 50]);

        container.flip_range(0, 5);
        assert_eq!(&*container, &[0, 2, 3, 11, 50]);

        container.add_range(65_530, 1 << 16);
        assert_eq!(container.max(), Some(u16::MAX));
        assert_eq!(container.num_runs(), 5);
    }

    #[test]
    fn rank_select() {
        let container = make_container(&[3, 7, 9]);

        assert_eq!(container.rank(2), 0);
        assert_eq!(container.rank(7), 2);
        assert_eq!(container.rank(u16::MAX), 3);
        assert_eq!(container.select(1), Some(7));
        assert_eq!(container.select(3), None);
    }

    fn check(found: Container, expected: &[u16]) {
        assert_eq!(found.cardinality(), expected.len());
        assert_eq!(found.iter().collect::<Vec<_>>(), expected);
        found.validate().unwrap();
    }

    #[test]
    fn array_array() {
        let data_a = generate_data(0..u16::MAX, 3_000);
        let data_b = generate_data(0..u16::MAX, 2_000);
        let a = make_container(&data_a);
        let b = make_container(&data_b);

        // The union and symmetric difference exceed an array and become bitsets
        check(SetOr::or(&a, &b), &compute_result(&data_a, &data_b, OpType::Or));
        check(SetAnd::and(&a, &b), &compute_result(&data_a, &data_b, OpType::And));
        check(SetAndNot::and_not(&a, &b), &compute_result(&data_a, &data_b, OpType::AndNot));
        check(SetXor::xor(&a, &b), &compute_result(&data_a, &data_b, OpType::Xor));

        check(a.clone().inplace_and(&b), &compute_result(&data_a, &data_b, OpType::And));
        check(a.clone().inplace_and_not(&b), &compute_result(&data_a, &data_b, OpType::AndNot));

        assert_eq!(a.and_cardinality(&b), compute_result(&data_a, &data_b, OpType::And).len());
    }

    #[test]
    fn array_bitset() {
        let data_a = generate_data(0..u16::MAX, 3_000);
        let data_b = generate_data(0..u16::MAX, 10_000);
        let a = make_container(&data_a);

        let mut b = BitsetContainer::new();
        b.set_list(&data_b);

        check(SetOr::or(&a, &b), &compute_result(&data_a, &data_b, OpType::Or));
        check(SetAnd::and(&a, &b), &compute_result(&data_a, &data_b, OpType::And));
        check(SetAndNot::and_not(&a, &b), &compute_result(&data_a, &data_b, OpType::AndNot));
        check(SetXor::xor(&a, &b), &compute_result(&data_a, &data_b, OpType::Xor));
        check(SetAndNot::and_not(&b, &a), &compute_result(&data_b, &data_a, OpType::AndNot));
    }

    #[test]
    fn array_run() {
        let data_a = generate_data(0..u16::MAX, 3_000);
        let data_b: Vec<u16> = (1_000..9_000).chain(40_000..41_000).collect();
        let a = make_container(&data_a);
        let b = RunContainer::from(&make_container(&data_b[..4_000]));
        let data_b = &data_b[..4_000];

        check(SetOr::or(&a, &b), &compute_result(&data_a, data_b, OpType::Or));
        check(SetAnd::and(&a, &b), &compute_result(&data_a, data_b, OpType::And));
        check(SetAndNot::and_not(&a, &b), &compute_result(&data_a, data_b, OpType::AndNot));
        check(SetXor::xor(&a, &b), &compute_result(&data_a, data_b, OpType::Xor));
        check(SetAndNot::and_not(&b, &a), &compute_result(data_b, &data_a, OpType::AndNot));

        let inner = make_container(&[1_000, 2_500, 4_999]);
        assert!(inner.subset_of(&b));
        assert!(!a.subset_of(&b));
    }

    #[test]
    fn round_trip_serialize() {
        let data = generate_data(0..u16::MAX, 1_000);
        let container = make_container(&data);

        let mut bytes = Vec::new();
        assert_eq!(container.serialize(&mut bytes).unwrap(), 2_000);

        let found = ArrayContainer::deserialize(&mut &bytes[..], data.len()).unwrap();
        assert_eq!(found, container);
    }
}
