use std::io::{Read, Write};
use std::slice;

use crate::container::*;
use crate::container::array_ops;
use crate::container::run_ops;
use crate::error::{Error, Result};

/// A run of consecutive values starting at `value` and covering `length + 1` values
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rle16 {
    /// The first value of the run
    pub value: u16,

    /// The number of values in the run minus one
    pub length: u16
}

impl Rle16 {
    pub fn new(value: u16, length: u16) -> Self {
        Self {
            value,
            length
        }
    }

    /// The last value of the run (inclusive)
    #[inline]
    pub fn sum(&self) -> u16 {
        self.value + self.length
    }

    /// Half open bounds of the run
    #[inline]
    fn bounds(&self) -> (u32, u32) {
        (u32::from(self.value), u32::from(self.sum()) + 1)
    }
}

/// A run length encoded container.
///
/// Runs are sorted, never overlap and never touch. The cardinality is tracked alongside the runs.
#[derive(Clone, Debug, Default)]
pub struct RunContainer {
    runs: Vec<Rle16>,
    cardinality: usize
}

impl RunContainer {
    /// Create an empty run container
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty run container with space for `capacity` runs
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            runs: Vec::with_capacity(capacity),
            cardinality: 0
        }
    }

    /// Create a container holding every value in `[min, max)`
    pub fn from_range(min: u32, max: u32) -> Self {
        debug_assert!(min < max && max <= 1 << 16);

        Self {
            runs: vec![Rle16::new(min as u16, (max - min - 1) as u16)],
            cardinality: (max - min) as usize
        }
    }

    /// Create a container from runs which are already in canonical form
    pub(crate) fn from_runs(runs: Vec<Rle16>) -> Self {
        let cardinality = run_ops::cardinality(&runs);

        Self {
            runs,
            cardinality
        }
    }

    /// The runs of the container
    #[inline]
    pub fn runs(&self) -> &[Rle16] {
        &self.runs
    }

    /// Shrink the capacity of the container to fit its runs
    pub fn shrink_to_fit(&mut self) {
        self.runs.shrink_to_fit()
    }

    /// Find the index of the run that could contain `value`, being the last run starting at or before it
    #[inline]
    fn run_index(&self, value: u16) -> Option<usize> {
        match self.runs.partition_point(|run| run.value <= value) {
            0 => None,
            i => Some(i - 1)
        }
    }

    /// Add a value to the container. Returns true if the value was not present
    pub fn add(&mut self, value: u16) -> bool {
        let index = self.runs.partition_point(|run| run.value <= value);

        // Already covered by the preceding run
        if index > 0 && value <= self.runs[index - 1].sum() {
            return false;
        }

        let extends_prev = index > 0 && u32::from(self.runs[index - 1].sum()) + 1 == u32::from(value);
        let extends_next = index < self.runs.len() && u32::from(value) + 1 == u32::from(self.runs[index].value);

        match (extends_prev, extends_next) {
            // Value bridges two runs, fuse them
            (true, true) => {
                let next = self.runs.remove(index);
                let prev = &mut self.runs[index - 1];
                prev.length = next.sum() - prev.value;
            },
            (true, false) => {
                self.runs[index - 1].length += 1;
            },
            (false, true) => {
                let next = &mut self.runs[index];
                next.value -= 1;
                next.length += 1;
            },
            (false, false) => {
                self.runs.insert(index, Rle16::new(value, 0));
            }
        }

        self.cardinality += 1;
        true
    }

    /// Remove a value from the container. Returns true if the value was present
    pub fn remove(&mut self, value: u16) -> bool {
        let index = match self.run_index(value) {
            Some(index) if value <= self.runs[index].sum() => index,
            _ => return false
        };

        let run = self.runs[index];
        if run.length == 0 {
            self.runs.remove(index);
        }
        else if value == run.value {
            self.runs[index] = Rle16::new(value + 1, run.length - 1);
        }
        else if value == run.sum() {
            self.runs[index].length -= 1;
        }
        else {
            // Split the run around the value
            self.runs[index].length = value - run.value - 1;
            self.runs.insert(index + 1, Rle16::new(value + 1, run.sum() - value - 1));
        }

        self.cardinality -= 1;
        true
    }

    /// Check if the container contains a value
    pub fn contains(&self, value: u16) -> bool {
        match self.run_index(value) {
            Some(index) => value <= self.runs[index].sum(),
            None => false
        }
    }

    /// Check if the container contains every value in `[min, max)`
    pub fn contains_range(&self, min: u32, max: u32) -> bool {
        debug_assert!(min < max && max <= 1 << 16);

        match self.run_index(min as u16) {
            Some(index) => self.runs[index].bounds().1 >= max,
            None => false
        }
    }

    /// Add every value in `[min, max)`
    pub fn add_range(&mut self, min: u32, max: u32) {
        let mut runs = Vec::with_capacity(self.runs.len() + 1);
        run_ops::union(&self.runs, &[Rle16::new(min as u16, (max - min - 1) as u16)], &mut runs);

        *self = Self::from_runs(runs);
    }

    /// Remove every value in `[min, max)`
    pub fn remove_range(&mut self, min: u32, max: u32) {
        let mut runs = Vec::with_capacity(self.runs.len() + 1);
        run_ops::difference(&self.runs, &[Rle16::new(min as u16, (max - min - 1) as u16)], &mut runs);

        *self = Self::from_runs(runs);
    }

    /// Negate every value in `[min, max)`
    pub fn flip_range(&mut self, min: u32, max: u32) {
        let mut runs = Vec::with_capacity(self.runs.len() + 1);
        run_ops::xor(&self.runs, &[Rle16::new(min as u16, (max - min - 1) as u16)], &mut runs);

        *self = Self::from_runs(runs);
    }

    /// The number of values in the container
    #[inline]
    pub fn cardinality(&self) -> usize {
        self.cardinality
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        run_ops::is_full(&self.runs)
    }

    /// The number of runs in the container
    #[inline]
    pub fn num_runs(&self) -> usize {
        self.runs.len()
    }

    /// The smallest value in the container
    pub fn min(&self) -> Option<u16> {
        self.runs.first().map(|run| run.value)
    }

    /// The largest value in the container
    pub fn max(&self) -> Option<u16> {
        self.runs.last().map(|run| run.sum())
    }

    /// Find the number of values smaller or equal to `value`
    pub fn rank(&self, value: u16) -> usize {
        let mut sum = 0;
        for run in self.runs.iter() {
            if value < run.value {
                break;
            }

            if value <= run.sum() {
                return sum + (value - run.value) as usize + 1;
            }

            sum += run.length as usize + 1;
        }

        sum
    }

    /// Find the value with the given rank (0 based)
    pub fn select(&self, rank: usize) -> Option<u16> {
        let mut start_rank = 0;
        for run in self.runs.iter() {
            let length = run.length as usize;

            if rank <= start_rank + length {
                return Some(run.value + (rank - start_rank) as u16);
            }

            start_rank += length + 1;
        }

        None
    }

    /// Find the smallest value at or above `value` not covered by a run
    pub fn next_absent(&self, value: u16) -> Option<u16> {
        let index = match self.run_index(value) {
            Some(index) => index,
            None => return Some(value)
        };

        let mut next = u32::from(value);
        for run in self.runs[index..].iter() {
            if u32::from(run.value) > next {
                break;
            }

            next = next.max(u32::from(run.sum()) + 1);
        }

        u16::try_from(next).ok()
    }

    /// Find the largest value at or below `value` not covered by a run
    pub fn previous_absent(&self, value: u16) -> Option<u16> {
        let index = match self.run_index(value) {
            Some(index) => index,
            None => return Some(value)
        };

        let mut previous = i32::from(value);
        for run in self.runs[..=index].iter().rev() {
            if i32::from(run.sum()) < previous {
                break;
            }

            previous = previous.min(i32::from(run.value) - 1);
        }

        u16::try_from(previous).ok()
    }

    /// Get an iterator over the runs of the container
    pub fn iter_runs(&self) -> slice::Iter<'_, Rle16> {
        self.runs.iter()
    }

    /// Get an iterator over the values of the container
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            runs: self.runs.iter(),
            front: None,
            back: None
        }
    }

    /// Convert into the most compact representation for the values held
    pub fn into_efficient_container(self) -> Container {
        match Container::best_kind(self.cardinality, self.runs.len()) {
            ContainerKind::Run => Container::Run(self),
            ContainerKind::Array => Container::Array((&self).into()),
            ContainerKind::Bitset => Container::Bitset((&self).into())
        }
    }

    /// Check the internal invariants of the container
    pub fn validate(&self) -> Result<()> {
        let mut prev_end: Option<u32> = None;
        for run in self.runs.iter() {
            if u32::from(run.value) + u32::from(run.length) > u32::from(u16::MAX) {
                return Err(Error::InvariantViolation(format!("run at {} overflows the container", run.value)));
            }

            if let Some(end) = prev_end {
                if u32::from(run.value) <= end + 1 {
                    return Err(Error::InvariantViolation(format!("run at {} overlaps or touches its predecessor", run.value)));
                }
            }

            prev_end = Some(u32::from(run.sum()));
        }

        if run_ops::cardinality(&self.runs) != self.cardinality {
            return Err(Error::InvariantViolation("run container cardinality is out of date".to_string()));
        }

        Ok(())
    }
}

impl RunContainer {
    /// Get the size in bytes of a serialized run container with `num_runs` runs
    #[inline]
    pub fn serialized_size(num_runs: usize) -> usize {
        2 + 4 * num_runs
    }

    /// Write the run count followed by `(start, length - 1)` pairs, little endian
    pub fn serialize<W: Write>(&self, buf: &mut W) -> Result<usize> {
        let mut bytes = Vec::with_capacity(Self::serialized_size(self.runs.len()));
        bytes.extend_from_slice(&(self.runs.len() as u16).to_le_bytes());

        for run in self.runs.iter() {
            bytes.extend_from_slice(&run.value.to_le_bytes());
            bytes.extend_from_slice(&run.length.to_le_bytes());
        }

        buf.write_all(&bytes)?;

        Ok(bytes.len())
    }

    /// Read a run container written by [`serialize`](RunContainer::serialize).
    ///
    /// The runs are not validated, see [`validate`](RunContainer::validate)
    pub fn deserialize<R: Read>(buf: &mut R) -> Result<Self> {
        let mut count = [0; 2];
        buf.read_exact(&mut count)?;

        let num_runs = u16::from_le_bytes(count) as usize;
        let mut bytes = vec![0; num_runs * 4];
        buf.read_exact(&mut bytes)?;

        let runs: Vec<Rle16> = bytes.chunks_exact(4)
            .map(|c| Rle16::new(u16::from_le_bytes([c[0], c[1]]), u16::from_le_bytes([c[2], c[3]])))
            .collect();

        // Sum in u64 so malformed lengths can't overflow before validation
        let cardinality = runs.iter()
            .map(|run| u64::from(run.length) + 1)
            .sum::<u64>() as usize;

        Ok(Self {
            runs,
            cardinality
        })
    }
}

impl PartialEq for RunContainer {
    fn eq(&self, other: &Self) -> bool {
        self.runs == other.runs
    }
}

impl Eq for RunContainer { }

impl<'a> From<&'a ArrayContainer> for RunContainer {
    fn from(container: &'a ArrayContainer) -> Self {
        let mut runs = Vec::with_capacity(container.num_runs());
        for value in container.iter() {
            run_ops::append(&mut runs, u32::from(*value), u32::from(*value) + 1);
        }

        Self {
            runs,
            cardinality: container.cardinality()
        }
    }
}

impl<'a> From<&'a BitsetContainer> for RunContainer {
    fn from(container: &'a BitsetContainer) -> Self {
        let mut runs = Vec::with_capacity(container.num_runs());
        for (start, end) in container.iter_ranges() {
            runs.push(Rle16::new(start as u16, (end - start - 1) as u16));
        }

        Self {
            runs,
            cardinality: container.cardinality()
        }
    }
}

// Run ∘ Run

impl SetOr<Self> for RunContainer {
    fn or(&self, other: &Self) -> Container {
        if self.is_full() {
            return Container::Run(self.clone());
        }

        if other.is_full() {
            return Container::Run(other.clone());
        }

        let mut runs = Vec::new();
        run_ops::union(&self.runs, &other.runs, &mut runs);

        RunContainer::from_runs(runs).into_efficient_container()
    }

    fn inplace_or(self, other: &Self) -> Container {
        if self.is_full() {
            return Container::Run(self);
        }

        SetOr::or(&self, other)
    }
}

impl SetAnd<Self> for RunContainer {
    fn and(&self, other: &Self) -> Container {
        if self.is_full() {
            return Container::Run(other.clone());
        }

        if other.is_full() {
            return Container::Run(self.clone());
        }

        let mut runs = Vec::new();
        run_ops::intersect(&self.runs, &other.runs, &mut runs);

        RunContainer::from_runs(runs).into_efficient_container()
    }

    fn inplace_and(self, other: &Self) -> Container {
        if other.is_full() {
            return Container::Run(self);
        }

        SetAnd::and(&self, other)
    }

    fn and_cardinality(&self, other: &Self) -> usize {
        run_ops::and_cardinality(&self.runs, &other.runs)
    }

    fn intersects(&self, other: &Self) -> bool {
        run_ops::intersects(&self.runs, &other.runs)
    }
}

impl SetAndNot<Self> for RunContainer {
    fn and_not(&self, other: &Self) -> Container {
        let mut runs = Vec::new();
        run_ops::difference(&self.runs, &other.runs, &mut runs);

        RunContainer::from_runs(runs).into_efficient_container()
    }

    fn inplace_and_not(self, other: &Self) -> Container {
        SetAndNot::and_not(&self, other)
    }
}

impl SetXor<Self> for RunContainer {
    fn xor(&self, other: &Self) -> Container {
        let mut runs = Vec::new();
        run_ops::xor(&self.runs, &other.runs, &mut runs);

        RunContainer::from_runs(runs).into_efficient_container()
    }

    fn inplace_xor(self, other: &Self) -> Container {
        SetXor::xor(&self, other)
    }
}

impl Subset<Self> for RunContainer {
    fn subset_of(&self, other: &Self) -> bool {
        self.cardinality <= other.cardinality && run_ops::is_subset(&self.runs, &other.runs)
    }
}

// Run ∘ Array

impl SetOr<ArrayContainer> for RunContainer {
    fn or(&self, other: &ArrayContainer) -> Container {
        if self.is_full() {
            return Container::Run(self.clone());
        }

        let other = RunContainer::from(other);
        let mut runs = Vec::new();
        run_ops::union(&self.runs, &other.runs, &mut runs);

        RunContainer::from_runs(runs).into_efficient_container()
    }

    fn inplace_or(self, other: &ArrayContainer) -> Container {
        if self.is_full() {
            return Container::Run(self);
        }

        SetOr::or(&self, other)
    }
}

impl SetAnd<ArrayContainer> for RunContainer {
    fn and(&self, other: &ArrayContainer) -> Container {
        let mut result = ArrayContainer::with_capacity(other.cardinality());
        for_each_shared(self, other, |value| result.push(value));

        Container::Array(result)
    }

    fn inplace_and(self, other: &ArrayContainer) -> Container {
        SetAnd::and(&self, other)
    }

    fn and_cardinality(&self, other: &ArrayContainer) -> usize {
        let mut count = 0;
        for_each_shared(self, other, |_| count += 1);

        count
    }

    fn intersects(&self, other: &ArrayContainer) -> bool {
        let mut i_run = 0;
        for value in other.iter() {
            while i_run < self.runs.len() && self.runs[i_run].sum() < *value {
                i_run += 1;
            }

            match self.runs.get(i_run) {
                Some(run) if run.value <= *value => return true,
                Some(_) => continue,
                None => return false
            }
        }

        false
    }
}

impl SetAndNot<ArrayContainer> for RunContainer {
    fn and_not(&self, other: &ArrayContainer) -> Container {
        let other = RunContainer::from(other);
        let mut runs = Vec::new();
        run_ops::difference(&self.runs, &other.runs, &mut runs);

        RunContainer::from_runs(runs).into_efficient_container()
    }

    fn inplace_and_not(self, other: &ArrayContainer) -> Container {
        SetAndNot::and_not(&self, other)
    }
}

impl SetXor<ArrayContainer> for RunContainer {
    fn xor(&self, other: &ArrayContainer) -> Container {
        let other = RunContainer::from(other);
        let mut runs = Vec::new();
        run_ops::xor(&self.runs, &other.runs, &mut runs);

        RunContainer::from_runs(runs).into_efficient_container()
    }

    fn inplace_xor(self, other: &ArrayContainer) -> Container {
        SetXor::xor(&self, other)
    }
}

impl Subset<ArrayContainer> for RunContainer {
    fn subset_of(&self, other: &ArrayContainer) -> bool {
        if self.cardinality > other.cardinality() {
            return false;
        }

        // Each run must appear as a block of consecutive values in the array
        let mut pos = 0;
        for run in self.runs.iter() {
            pos = array_ops::advance_until(other, pos, run.value);

            let end = pos + run.length as usize;
            if end >= other.len() || other[pos] != run.value || other[end] != run.sum() {
                return false;
            }

            pos = end + 1;
        }

        true
    }
}

// Run ∘ Bitset

impl SetOr<BitsetContainer> for RunContainer {
    fn or(&self, other: &BitsetContainer) -> Container {
        if self.is_full() {
            return Container::Run(self.clone());
        }

        let mut result = other.clone();
        for run in self.runs.iter() {
            let (min, max) = run.bounds();
            result.set_range(min, max);
        }

        result.into_efficient_container()
    }

    fn inplace_or(self, other: &BitsetContainer) -> Container {
        if self.is_full() {
            return Container::Run(self);
        }

        SetOr::or(&self, other)
    }
}

impl SetAnd<BitsetContainer> for RunContainer {
    fn and(&self, other: &BitsetContainer) -> Container {
        if self.is_full() {
            return Container::Bitset(other.clone());
        }

        // Small result, gather the shared values directly into an array
        if self.cardinality <= DEFAULT_MAX_SIZE {
            let mut result = ArrayContainer::with_capacity(self.cardinality);
            for value in self.iter() {
                if other.contains(value) {
                    result.push(value);
                }
            }

            return Container::Array(result);
        }

        let mut result = other.clone();
        result.retain_runs(&self.runs);
        result.into_efficient_container()
    }

    fn inplace_and(self, other: &BitsetContainer) -> Container {
        SetAnd::and(&self, other)
    }

    fn and_cardinality(&self, other: &BitsetContainer) -> usize {
        self.runs.iter()
            .map(|run| {
                let (min, max) = run.bounds();
                other.cardinality_range(min, max)
            })
            .sum()
    }

    fn intersects(&self, other: &BitsetContainer) -> bool {
        self.runs.iter()
            .any(|run| {
                let (min, max) = run.bounds();
                other.intersects_range(min, max)
            })
    }
}

impl SetAndNot<BitsetContainer> for RunContainer {
    fn and_not(&self, other: &BitsetContainer) -> Container {
        if self.cardinality <= DEFAULT_MAX_SIZE {
            let mut result = ArrayContainer::with_capacity(self.cardinality);
            for value in self.iter() {
                if !other.contains(value) {
                    result.push(value);
                }
            }

            return Container::Array(result);
        }

        let mut result = BitsetContainer::from(self);
        result.inplace_and_not_words(other);
        result.into_efficient_container()
    }

    fn inplace_and_not(self, other: &BitsetContainer) -> Container {
        SetAndNot::and_not(&self, other)
    }
}

impl SetXor<BitsetContainer> for RunContainer {
    fn xor(&self, other: &BitsetContainer) -> Container {
        let mut result = other.clone();
        for run in self.runs.iter() {
            let (min, max) = run.bounds();
            result.flip_range(min, max);
        }

        result.into_efficient_container()
    }

    fn inplace_xor(self, other: &BitsetContainer) -> Container {
        SetXor::xor(&self, other)
    }
}

impl Subset<BitsetContainer> for RunContainer {
    fn subset_of(&self, other: &BitsetContainer) -> bool {
        if self.cardinality > other.cardinality() {
            return false;
        }

        self.runs.iter()
            .all(|run| {
                let (min, max) = run.bounds();
                other.contains_range(min, max)
            })
    }
}

/// Call `f` with every value of `array` that is covered by `runs`, in ascending order
fn for_each_shared<F: FnMut(u16)>(runs: &RunContainer, array: &ArrayContainer, mut f: F) {
    let mut pos = 0;
    for run in runs.runs.iter() {
        pos = array_ops::advance_until(array, pos, run.value);

        while pos < array.len() && array[pos] <= run.sum() {
            f(array[pos]);
            pos += 1;
        }

        if pos == array.len() {
            break;
        }
    }
}

/// An iterator over the values of a run container. Runs are expanded lazily
pub struct Iter<'a> {
    /// The runs left to visit
    runs: slice::Iter<'a, Rle16>,

    /// The `[next, end)` span of the run being expanded from the front
    front: Option<(u32, u32)>,

    /// The `[start, next_back)` span of the run being expanded from the back
    back: Option<(u32, u32)>
}

impl<'a> Iter<'a> {
    /// Skip ahead so the next value returned is at least `min`
    pub fn advance_to(&mut self, min: u16) {
        let min = u32::from(min);

        if let Some((next, end)) = self.front.as_mut() {
            if min < *end {
                *next = (*next).max(min);
                return;
            }

            self.front = None;
        }

        let rest = self.runs.as_slice();
        let skip = rest.partition_point(|run| u32::from(run.sum()) < min);
        self.runs = rest[skip..].iter();

        if let Some(run) = self.runs.next() {
            let (start, end) = run.bounds();
            self.front = Some((start.max(min), end));
            return;
        }

        // Only the partially consumed run at the back is left
        if let Some((start, _)) = self.back.as_mut() {
            *start = (*start).max(min);
        }
    }
}

impl<'a> Iterator for Iter<'a> {
    type Item = u16;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((next, end)) = self.front.as_mut() {
                if *next < *end {
                    *next += 1;
                    return Some((*next - 1) as u16);
                }
            }

            match self.runs.next() {
                Some(run) => self.front = Some(run.bounds()),
                None => {
                    // Drain the run the back half started on
                    let (start, end) = self.back.as_mut()?;
                    if *start < *end {
                        *start += 1;
                        return Some((*start - 1) as u16);
                    }

                    return None;
                }
            }
        }
    }
}

impl<'a> DoubleEndedIterator for Iter<'a> {
    fn next_back(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((start, end)) = self.back.as_mut() {
                if *start < *end {
                    *end -= 1;
                    return Some(*end as u16);
                }
            }

            match self.runs.next_back() {
                Some(run) => self.back = Some(run.bounds()),
                None => {
                    let (next, end) = self.front.as_mut()?;
                    if *next < *end {
                        *end -= 1;
                        return Some(*end as u16);
                    }

                    return None;
                }
            }
        }
    }
}
