use std::fmt;
use std::io::{Read, Write};
use std::mem;
use std::ops::Deref;

use crate::alloc;
use crate::container::*;
use crate::container::array_ops;
use crate::container::run::Rle16;
use crate::error::{Error, Result};

use super::bitset_ops;

/// The size of the bitset in 64bit words
pub const BITSET_SIZE_IN_WORDS: usize = 1024;

/// The number of values a bitset can hold
const BITSET_SIZE_IN_BITS: u32 = (BITSET_SIZE_IN_WORDS * 64) as u32;

/// A bitset container used in a roaring bitmap.
///
/// # Structure
/// Values are stored as bits in `1024` 64bit words obtained from the registered [`BitsetAllocator`](crate::alloc::BitsetAllocator).
/// The cardinality is kept up to date by every mutating operation.
pub struct BitsetContainer {
    bitset: Vec<u64>,
    cardinality: usize
}

impl BitsetContainer {
    /// Create a new empty bitset
    pub fn new() -> Self {
        Self {
            bitset: alloc::allocate_words(),
            cardinality: 0
        }
    }

    /// Create a bitset with every bit set
    pub fn full() -> Self {
        let mut bitset = Self::new();
        bitset.set_all();

        bitset
    }

    /// Set every bit in the bitset
    pub fn set_all(&mut self) {
        for word in self.bitset.iter_mut() {
            *word = u64::MAX;
        }

        self.cardinality = BITSET_SIZE_IN_BITS as usize;
    }

    /// Clear every bit in the bitset
    pub fn clear(&mut self) {
        for word in self.bitset.iter_mut() {
            *word = 0;
        }

        self.cardinality = 0;
    }

    /// Add `value` to the set and return true if it was not already present
    pub fn add(&mut self, value: u16) -> bool {
        let word_index = (value >> 6) as usize;
        let word = self.bitset[word_index];
        let new_word = word | (1 << (value & 0x3F));

        self.bitset[word_index] = new_word;

        let added = word != new_word;
        self.cardinality += added as usize;

        added
    }

    /// Remove `value` from the set and return true if it was present
    pub fn remove(&mut self, value: u16) -> bool {
        let word_index = (value >> 6) as usize;
        let word = self.bitset[word_index];
        let new_word = word & !(1 << (value & 0x3F));

        self.bitset[word_index] = new_word;

        let removed = word != new_word;
        self.cardinality -= removed as usize;

        removed
    }

    /// Check if the bitset contains a specific value
    #[inline]
    pub fn contains(&self, value: u16) -> bool {
        let word = self.bitset[(value >> 6) as usize];

        (word >> (value & 0x3F)) & 1 == 1
    }

    /// Set all the bits within the range `[min, max)`
    pub fn set_range(&mut self, min: u32, max: u32) {
        self.update_range(min, max, |word, mask| word | mask);
    }

    /// Unset all the bits within the range `[min, max)`
    pub fn unset_range(&mut self, min: u32, max: u32) {
        self.update_range(min, max, |word, mask| word & !mask);
    }

    /// Flip all the bits within the range `[min, max)`
    pub fn flip_range(&mut self, min: u32, max: u32) {
        self.update_range(min, max, |word, mask| word ^ mask);
    }

    /// Apply `f` to every word overlapping `[min, max)` with the mask of bits in range, tracking the cardinality
    fn update_range<F>(&mut self, min: u32, max: u32, f: F)
        where F: Fn(u64, u64) -> u64
    {
        debug_assert!(min < max && max <= BITSET_SIZE_IN_BITS);

        let first = (min >> 6) as usize;
        let last = ((max - 1) >> 6) as usize;

        let mut delta = 0isize;
        for i in first..=last {
            let word = self.bitset[i];
            let new_word = f(word, word_mask(i, min, max));

            delta += new_word.count_ones() as isize - word.count_ones() as isize;
            self.bitset[i] = new_word;
        }

        self.cardinality = self.cardinality.wrapping_add_signed(delta);
    }

    /// Iterate over the words overlapping `[min, max)` paired with the mask of bits in range
    fn masked_words(&self, min: u32, max: u32) -> impl Iterator<Item = (u64, u64)> + '_ {
        debug_assert!(min < max && max <= BITSET_SIZE_IN_BITS);

        let first = (min >> 6) as usize;
        let last = ((max - 1) >> 6) as usize;

        (first..=last).map(move |i| (self.bitset[i], word_mask(i, min, max)))
    }

    /// Check if all bits within `[min, max)` are set
    pub fn contains_range(&self, min: u32, max: u32) -> bool {
        self.masked_words(min, max)
            .all(|(word, mask)| word & mask == mask)
    }

    /// Check if any bit within `[min, max)` is set
    pub fn intersects_range(&self, min: u32, max: u32) -> bool {
        self.masked_words(min, max)
            .any(|(word, mask)| word & mask != 0)
    }

    /// Get the number of set bits within `[min, max)`
    pub fn cardinality_range(&self, min: u32, max: u32) -> usize {
        self.masked_words(min, max)
            .map(|(word, mask)| (word & mask).count_ones() as usize)
            .sum()
    }

    /// Set bits for the elements in `list`
    pub fn set_list(&mut self, list: &[u16]) {
        for value in list {
            self.add(*value);
        }
    }

    /// Clear the elements specified in the list from the bitset
    pub fn clear_list(&mut self, list: &[u16]) {
        for value in list {
            self.remove(*value);
        }
    }

    /// Flip all bits contained in `list`
    pub fn flip_list(&mut self, list: &[u16]) {
        for value in list {
            let word_index = (*value >> 6) as usize;
            let mask = 1 << (*value & 0x3F);
            let word = self.bitset[word_index];

            // Update with -1 or +1
            if word & mask == 0 {
                self.cardinality += 1;
            }
            else {
                self.cardinality -= 1;
            }

            self.bitset[word_index] = word ^ mask;
        }
    }

    /// Clear every bit not covered by `runs`
    pub(crate) fn retain_runs(&mut self, runs: &[Rle16]) {
        let mut start = 0;
        for run in runs.iter() {
            let value = u32::from(run.value);
            if start < value {
                self.unset_range(start, value);
            }

            start = u32::from(run.sum()) + 1;
        }

        if start < BITSET_SIZE_IN_BITS {
            self.unset_range(start, BITSET_SIZE_IN_BITS);
        }
    }

    /// Remove every value of `other` from the bitset
    pub(crate) fn inplace_and_not_words(&mut self, other: &BitsetContainer) {
        self.cardinality = bitset_ops::inplace_and_not(&mut self.bitset, &other.bitset);
    }

    /// Union `other` into the bitset without maintaining the cardinality.
    ///
    /// The cardinality must be restored with [`repair_cardinality`](BitsetContainer::repair_cardinality) before use
    pub(crate) fn inplace_or_lazy(&mut self, other: &BitsetContainer) {
        bitset_ops::inplace_or_lazy(&mut self.bitset, &other.bitset);
    }

    /// Set bits for the elements in `list` without maintaining the cardinality
    pub(crate) fn set_list_lazy(&mut self, list: &[u16]) {
        for value in list {
            self.bitset[(*value >> 6) as usize] |= 1 << (*value & 0x3F);
        }
    }

    /// Recount the cardinality after lazy operations
    pub(crate) fn repair_cardinality(&mut self) {
        self.cardinality = bitset_ops::cardinality(&self.bitset);
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.cardinality == BITSET_SIZE_IN_BITS as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cardinality == 0
    }

    /// The cardinality of the bitset
    #[inline]
    pub fn cardinality(&self) -> usize {
        self.cardinality
    }

    /// Get the smallest value in the bitset
    pub fn min(&self) -> Option<u16> {
        self.bitset.iter()
            .enumerate()
            .find(|(_, word)| **word != 0)
            .map(|(i, word)| (i * 64) as u16 + word.trailing_zeros() as u16)
    }

    /// Get the largest value in the bitset
    pub fn max(&self) -> Option<u16> {
        self.bitset.iter()
            .enumerate()
            .rev()
            .find(|(_, word)| **word != 0)
            .map(|(i, word)| (i * 64) as u16 + 63 - word.leading_zeros() as u16)
    }

    /// Find the number of values equal to or smaller than `value`
    pub fn rank(&self, value: u16) -> usize {
        let end = (value >> 6) as usize;
        let sum = bitset_ops::cardinality(&self.bitset[..end]);

        // Shift out the bits above `value` in its word
        let rem_word = self.bitset[end] << (63 - (value & 0x3F));

        sum + rem_word.count_ones() as usize
    }

    /// Find the value with the given rank (0 based)
    pub fn select(&self, rank: usize) -> Option<u16> {
        if rank >= self.cardinality {
            return None;
        }

        let mut start_rank = 0;
        for (i, word) in self.bitset.iter().enumerate() {
            let size = word.count_ones() as usize;

            if rank < start_rank + size {
                let mut w = *word;
                for _ in start_rank..rank {
                    w &= w - 1;
                }

                return Some((i * 64) as u16 + w.trailing_zeros() as u16);
            }

            start_rank += size;
        }

        None
    }

    /// Find the smallest unset bit at or above `value`
    pub fn next_absent(&self, value: u16) -> Option<u16> {
        let mut index = (value >> 6) as usize;
        let mut word = !self.bitset[index] & (u64::MAX << (value & 63));

        loop {
            if word != 0 {
                return Some((index * 64) as u16 + word.trailing_zeros() as u16);
            }

            index += 1;
            word = !*self.bitset.get(index)?;
        }
    }

    /// Find the largest unset bit at or below `value`
    pub fn previous_absent(&self, value: u16) -> Option<u16> {
        let mut index = (value >> 6) as usize;
        let mut word = !self.bitset[index] & (u64::MAX >> (63 - (value & 63)));

        loop {
            if word != 0 {
                return Some((index * 64) as u16 + 63 - word.leading_zeros() as u16);
            }

            index = index.checked_sub(1)?;
            word = !self.bitset[index];
        }
    }

    /// Get the number of runs in the bitset
    pub fn num_runs(&self) -> usize {
        let mut num_runs = 0;

        for (i, word) in self.bitset.iter().enumerate() {
            let next_word = self.bitset.get(i + 1).copied().unwrap_or(0);

            // Count the set bits whose successor is unset, each one ends a run
            let successors = (word >> 1) | (next_word << 63);
            num_runs += (word & !successors).count_ones() as usize;
        }

        num_runs
    }

    /// Get an iterator over the values of the bitset
    pub fn iter(&self) -> Iter<'_> {
        Iter::new(&self.bitset)
    }

    /// Get an iterator over the runs of set bits as half open `[start, end)` ranges
    pub fn iter_ranges(&self) -> Ranges<'_> {
        Ranges {
            words: &self.bitset,
            word_index: 0,
            word: self.bitset[0]
        }
    }

    /// Convert self into the most efficient representation
    ///
    /// # Remarks
    /// Only the cardinality is considered, runs are introduced by `run_optimize`
    pub fn into_efficient_container(self) -> Container {
        if self.cardinality <= DEFAULT_MAX_SIZE {
            Container::Array((&self).into())
        }
        else {
            Container::Bitset(self)
        }
    }

    /// Check the internal invariants of the container
    pub fn validate(&self) -> Result<()> {
        if self.bitset.len() != BITSET_SIZE_IN_WORDS {
            return Err(Error::InvariantViolation(format!("bitset container holds {} words", self.bitset.len())));
        }

        let found = bitset_ops::cardinality(&self.bitset);
        if found != self.cardinality {
            return Err(Error::InvariantViolation(format!("bitset cardinality is {} but {} bits are set", self.cardinality, found)));
        }

        if self.cardinality <= DEFAULT_MAX_SIZE {
            return Err(Error::InvariantViolation(format!("bitset container with cardinality {} should be an array", self.cardinality)));
        }

        Ok(())
    }
}

impl BitsetContainer {
    /// Get the size in bytes of a bitset container
    #[inline]
    pub fn serialized_size() -> usize {
        BITSET_SIZE_IN_WORDS * mem::size_of::<u64>()
    }

    /// Write the words of the bitset, little endian
    pub fn serialize<W: Write>(&self, buf: &mut W) -> Result<usize> {
        let mut bytes = Vec::with_capacity(Self::serialized_size());
        for word in self.bitset.iter() {
            bytes.extend_from_slice(&word.to_le_bytes());
        }

        buf.write_all(&bytes)?;

        Ok(bytes.len())
    }

    /// Read a bitset written by [`serialize`](BitsetContainer::serialize)
    pub fn deserialize<R: Read>(buf: &mut R) -> Result<Self> {
        let mut bytes = vec![0; Self::serialized_size()];
        buf.read_exact(&mut bytes)?;

        let mut bitset = Self::new();
        for (word, chunk) in bitset.bitset.iter_mut().zip(bytes.chunks_exact(8)) {
            let mut le = [0; 8];
            le.copy_from_slice(chunk);

            *word = u64::from_le_bytes(le);
        }

        bitset.repair_cardinality();

        Ok(bitset)
    }
}

/// Mask of the bits of word `index` which fall within `[min, max)`
#[inline]
fn word_mask(index: usize, min: u32, max: u32) -> u64 {
    let mut mask = !0u64;

    if index == (min >> 6) as usize {
        mask &= !0u64 << (min & 0x3F);
    }

    if index == ((max - 1) >> 6) as usize {
        mask &= !0u64 >> (63 - ((max - 1) & 0x3F));
    }

    mask
}

impl Default for BitsetContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for BitsetContainer {
    fn clone(&self) -> Self {
        let mut bitset = alloc::allocate_words();
        bitset.copy_from_slice(&self.bitset);

        Self {
            bitset,
            cardinality: self.cardinality
        }
    }
}

impl Drop for BitsetContainer {
    fn drop(&mut self) {
        alloc::release_words(mem::take(&mut self.bitset));
    }
}

impl fmt::Debug for BitsetContainer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("BitsetContainer")
            .field("cardinality", &self.cardinality)
            .field("min", &self.min())
            .field("max", &self.max())
            .finish()
    }
}

impl PartialEq for BitsetContainer {
    fn eq(&self, other: &BitsetContainer) -> bool {
        self.cardinality == other.cardinality && self.bitset == other.bitset
    }
}

impl Eq for BitsetContainer { }

impl Deref for BitsetContainer {
    type Target = [u64];

    fn deref(&self) -> &Self::Target {
        &self.bitset
    }
}

impl<'a> From<&'a ArrayContainer> for BitsetContainer {
    fn from(container: &'a ArrayContainer) -> Self {
        let mut bitset = BitsetContainer::new();
        bitset.set_list(container);

        bitset
    }
}

impl<'a> From<&'a RunContainer> for BitsetContainer {
    fn from(container: &'a RunContainer) -> Self {
        let mut bitset = BitsetContainer::new();
        for run in container.iter_runs() {
            bitset.set_range(u32::from(run.value), u32::from(run.sum()) + 1);
        }

        bitset
    }
}

// Bitset ∘ Bitset

impl SetOr<Self> for BitsetContainer {
    fn or(&self, other: &Self) -> Container {
        let mut result = BitsetContainer::new();
        result.cardinality = bitset_ops::or(&self.bitset, &other.bitset, &mut result.bitset);

        result.into_efficient_container()
    }

    fn inplace_or(mut self, other: &Self) -> Container {
        self.cardinality = bitset_ops::inplace_or(&mut self.bitset, &other.bitset);

        self.into_efficient_container()
    }
}

impl SetAnd<Self> for BitsetContainer {
    fn and(&self, other: &Self) -> Container {
        // Small results are gathered straight into an array
        let cardinality = bitset_ops::and_cardinality(&self.bitset, &other.bitset);
        if cardinality <= DEFAULT_MAX_SIZE {
            let mut array = ArrayContainer::with_capacity(cardinality);
            for (i, (a, b)) in self.bitset.iter().zip(other.bitset.iter()).enumerate() {
                let mut w = a & b;
                while w != 0 {
                    array.push((i * 64) as u16 + w.trailing_zeros() as u16);
                    w &= w - 1;
                }
            }

            return Container::Array(array);
        }

        let mut result = BitsetContainer::new();
        result.cardinality = bitset_ops::and(&self.bitset, &other.bitset, &mut result.bitset);

        Container::Bitset(result)
    }

    fn inplace_and(mut self, other: &Self) -> Container {
        self.cardinality = bitset_ops::inplace_and(&mut self.bitset, &other.bitset);

        self.into_efficient_container()
    }

    fn and_cardinality(&self, other: &Self) -> usize {
        bitset_ops::and_cardinality(&self.bitset, &other.bitset)
    }

    fn intersects(&self, other: &Self) -> bool {
        bitset_ops::intersects(&self.bitset, &other.bitset)
    }
}

impl SetAndNot<Self> for BitsetContainer {
    fn and_not(&self, other: &Self) -> Container {
        let mut result = BitsetContainer::new();
        result.cardinality = bitset_ops::and_not(&self.bitset, &other.bitset, &mut result.bitset);

        result.into_efficient_container()
    }

    fn inplace_and_not(mut self, other: &Self) -> Container {
        self.cardinality = bitset_ops::inplace_and_not(&mut self.bitset, &other.bitset);

        self.into_efficient_container()
    }
}

impl SetXor<Self> for BitsetContainer {
    fn xor(&self, other: &Self) -> Container {
        let mut result = BitsetContainer::new();
        result.cardinality = bitset_ops::xor(&self.bitset, &other.bitset, &mut result.bitset);

        result.into_efficient_container()
    }

    fn inplace_xor(mut self, other: &Self) -> Container {
        self.cardinality = bitset_ops::inplace_xor(&mut self.bitset, &other.bitset);

        self.into_efficient_container()
    }
}

impl Subset<Self> for BitsetContainer {
    fn subset_of(&self, other: &Self) -> bool {
        if self.cardinality > other.cardinality {
            return false;
        }

        self.bitset.iter()
            .zip(other.bitset.iter())
            .all(|(a, b)| a & b == *a)
    }
}

// Bitset ∘ Array

impl SetOr<ArrayContainer> for BitsetContainer {
    fn or(&self, other: &ArrayContainer) -> Container {
        let mut result = self.clone();
        result.set_list(other);

        result.into_efficient_container()
    }

    fn inplace_or(mut self, other: &ArrayContainer) -> Container {
        self.set_list(other);

        self.into_efficient_container()
    }
}

impl SetAnd<ArrayContainer> for BitsetContainer {
    fn and(&self, other: &ArrayContainer) -> Container {
        SetAnd::and(other, self)
    }

    fn inplace_and(self, other: &ArrayContainer) -> Container {
        SetAnd::and(other, &self)
    }

    fn and_cardinality(&self, other: &ArrayContainer) -> usize {
        SetAnd::and_cardinality(other, self)
    }

    fn intersects(&self, other: &ArrayContainer) -> bool {
        SetAnd::intersects(other, self)
    }
}

impl SetAndNot<ArrayContainer> for BitsetContainer {
    fn and_not(&self, other: &ArrayContainer) -> Container {
        let mut bitset = self.clone();
        bitset.clear_list(other);
        bitset.into_efficient_container()
    }

    fn inplace_and_not(mut self, other: &ArrayContainer) -> Container {
        self.clear_list(other);
        self.into_efficient_container()
    }
}

impl SetXor<ArrayContainer> for BitsetContainer {
    fn xor(&self, other: &ArrayContainer) -> Container {
        SetXor::xor(other, self)
    }

    fn inplace_xor(mut self, other: &ArrayContainer) -> Container {
        self.flip_list(other);
        self.into_efficient_container()
    }
}

impl Subset<ArrayContainer> for BitsetContainer {
    fn subset_of(&self, other: &ArrayContainer) -> bool {
        if self.cardinality > other.cardinality() {
            return false;
        }

        let mut pos = 0;
        for value in self.iter() {
            pos = array_ops::advance_until(other, pos, value);
            if pos == other.len() || other[pos] != value {
                return false;
            }
        }

        true
    }
}

// Bitset ∘ Run

impl SetOr<RunContainer> for BitsetContainer {
    fn or(&self, other: &RunContainer) -> Container {
        SetOr::or(other, self)
    }

    fn inplace_or(mut self, other: &RunContainer) -> Container {
        if other.is_full() {
            return Container::Run(other.clone());
        }

        for run in other.iter_runs() {
            self.set_range(u32::from(run.value), u32::from(run.sum()) + 1);
        }

        self.into_efficient_container()
    }
}

impl SetAnd<RunContainer> for BitsetContainer {
    fn and(&self, other: &RunContainer) -> Container {
        SetAnd::and(other, self)
    }

    fn inplace_and(mut self, other: &RunContainer) -> Container {
        if other.cardinality() <= DEFAULT_MAX_SIZE {
            return SetAnd::and(other, &self);
        }

        self.retain_runs(other.runs());
        self.into_efficient_container()
    }

    fn and_cardinality(&self, other: &RunContainer) -> usize {
        SetAnd::and_cardinality(other, self)
    }

    fn intersects(&self, other: &RunContainer) -> bool {
        SetAnd::intersects(other, self)
    }
}

impl SetAndNot<RunContainer> for BitsetContainer {
    fn and_not(&self, other: &RunContainer) -> Container {
        self.clone().inplace_and_not(other)
    }

    fn inplace_and_not(mut self, other: &RunContainer) -> Container {
        for run in other.iter_runs() {
            self.unset_range(u32::from(run.value), u32::from(run.sum()) + 1);
        }

        self.into_efficient_container()
    }
}

impl SetXor<RunContainer> for BitsetContainer {
    fn xor(&self, other: &RunContainer) -> Container {
        SetXor::xor(other, self)
    }

    fn inplace_xor(mut self, other: &RunContainer) -> Container {
        for run in other.iter_runs() {
            self.flip_range(u32::from(run.value), u32::from(run.sum()) + 1);
        }

        self.into_efficient_container()
    }
}

impl Subset<RunContainer> for BitsetContainer {
    fn subset_of(&self, other: &RunContainer) -> bool {
        if self.cardinality > other.cardinality() {
            return false;
        }

        // Every set bit must fall inside one of the runs
        let covered: usize = other.iter_runs()
            .map(|run| self.cardinality_range(u32::from(run.value), u32::from(run.sum()) + 1))
            .sum();

        covered == self.cardinality
    }
}

/// An iterator over the values of a bitset
pub struct Iter<'a> {
    /// The list of words in the bitset
    words: &'a [u64],

    /// The index of the word consumed from the front
    front: usize,

    /// The front word with the visited bits cleared
    front_word: u64,

    /// The index of the word consumed from the back
    back: usize,

    /// The back word with the visited bits cleared
    back_word: u64
}

impl<'a> Iter<'a> {
    fn new(words: &'a [u64]) -> Self {
        let back = words.len() - 1;

        Self {
            words,
            front: 0,
            front_word: words[0],
            back,
            back_word: words[back]
        }
    }

    /// Skip ahead so the next value returned is at least `min`
    pub fn advance_to(&mut self, min: u16) {
        let index = (min >> 6) as usize;

        if index < self.front {
            return;
        }

        if index > self.back {
            self.front = self.back;
            self.front_word = 0;
            self.back_word = 0;
            return;
        }

        if index > self.front {
            self.front = index;
            self.front_word = if index == self.back { self.back_word } else { self.words[index] };
        }

        self.front_word &= u64::MAX << (min & 63);
        if self.front == self.back {
            self.back_word = self.front_word;
        }
    }
}

impl<'a> Iterator for Iter<'a> {
    type Item = u16;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.front_word != 0 {
                let bit = self.front_word.trailing_zeros() as usize;
                self.front_word &= self.front_word - 1;

                // Both ends share the word once they meet
                if self.front == self.back {
                    self.back_word = self.front_word;
                }

                // Guaranteed to not truncate due to how containers work
                return Some((self.front * 64 + bit) as u16);
            }

            if self.front >= self.back {
                return None;
            }

            self.front += 1;
            self.front_word = if self.front == self.back { self.back_word } else { self.words[self.front] };
        }
    }
}

impl<'a> DoubleEndedIterator for Iter<'a> {
    fn next_back(&mut self) -> Option<Self::Item> {
        loop {
            if self.back_word != 0 {
                let bit = 63 - self.back_word.leading_zeros() as usize;
                self.back_word &= !(1u64 << bit);

                if self.front == self.back {
                    self.front_word = self.back_word;
                }

                return Some((self.back * 64 + bit) as u16);
            }

            if self.back <= self.front {
                return None;
            }

            self.back -= 1;
            self.back_word = if self.back == self.front { self.front_word } else { self.words[self.back] };
        }
    }
}

/// An iterator over the runs of set bits in a bitset as `[start, end)` ranges
pub struct Ranges<'a> {
    words: &'a [u64],
    word_index: usize,
    word: u64
}

impl<'a> Iterator for Ranges<'a> {
    type Item = (u32, u32);

    fn next(&mut self) -> Option<Self::Item> {
        while self.word == 0 {
            self.word_index += 1;
            self.word = *self.words.get(self.word_index)?;
        }

        let start = (self.word_index * 64) as u32 + self.word.trailing_zeros();

        // Fill the bits below the run so only its end remains to be found
        let mut w = self.word | (self.word - 1);
        while w == u64::MAX {
            self.word_index += 1;

            match self.words.get(self.word_index) {
                Some(word) => w = *word,
                None => {
                    self.word = 0;
                    return Some((start, BITSET_SIZE_IN_BITS));
                }
            }
        }

        let end = (self.word_index * 64) as u32 + (!w).trailing_zeros();

        // Clear the run from the current word
        self.word = w & (w + 1);

        Some((start, end))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test::*;

    fn make_container(values: &[u16]) -> BitsetContainer {
        let mut container = BitsetContainer::new();
        container.set_list(values);

        container
    }

    #[test]
    fn add_remove() {
        let mut container = BitsetContainer::new();

        assert!(container.add(0));
        assert!(container.add(u16::MAX));
        assert!(!container.add(0));
        assert_eq!(container.cardinality(), 2);

        assert!(container.remove(0));
        assert!(!container.remove(0));
        assert!(!container.contains(0));
        assert!(container.contains(u16::MAX));
        assert_eq!(container.cardinality(), 1);
    }

    #[test]
    fn ranges() {
        let mut container = BitsetContainer::new();

        container.set_range(10, 200);
        assert_eq!(container.cardinality(), 190);
        assert!(container.contains_range(10, 200));
        assert!(!container.contains_range(9, 200));
        assert_eq!(container.cardinality_range(0, 64), 54);

        container.unset_range(64, 128);
        assert_eq!(container.cardinality(), 126);
        assert!(!container.intersects_range(64, 128));

        container.flip_range(0, 1 << 16);
        assert_eq!(container.cardinality(), (1 << 16) - 126);
        assert!(container.contains_range(64, 128));
        assert_eq!(container.min(), Some(0));
        assert_eq!(container.max(), Some(u16::MAX));

        // Single word range
        let mut container = BitsetContainer::new();
        container.set_range(3, 5);
        assert_eq!(container.iter().collect::<Vec<_>>(), vec![3, 4]);
    }

    #[test]
    fn iter() {
        let data = generate_data(0..u16::MAX, 5_000);
        let container = make_container(&data);

        assert_eq!(container.iter().collect::<Vec<_>>(), data);
        assert_eq!(container.cardinality(), data.len());
    }

    #[test]
    fn iter_ranges() {
        let mut container = BitsetContainer::new();
        container.set_range(0, 3);
        container.set_range(60, 130);
        container.set_range(65_000, 1 << 16);

        let found: Vec<(u32, u32)> = container.iter_ranges().collect();
        assert_eq!(found, vec![(0, 3), (60, 130), (65_000, 1 << 16)]);
        assert_eq!(container.num_runs(), 3);

        let full = BitsetContainer::full();
        assert_eq!(full.iter_ranges().collect::<Vec<_>>(), vec![(0, 1 << 16)]);
        assert_eq!(full.num_runs(), 1);
    }

    #[test]
    fn rank_select() {
        let data = generate_data(0..u16::MAX, 5_000);
        let container = make_container(&data);

        for (i, value) in data.iter().enumerate().step_by(97) {
            assert_eq!(container.rank(*value), i + 1);
            assert_eq!(container.select(i), Some(*value));
        }

        assert_eq!(container.rank(u16::MAX), data.len());
        assert_eq!(container.select(data.len()), None);
    }

    #[test]
    fn binary_ops() {
        let data_a = generate_data(0..u16::MAX, 20_000);
        let data_b = generate_data(0..u16::MAX, 10_000);
        let a = make_container(&data_a);
        let b = make_container(&data_b);

        let check = |found: Container, op: OpType| {
            let expected = compute_result(&data_a, &data_b, op);
            assert_eq!(found.cardinality(), expected.len());
            assert_eq!(found.iter().collect::<Vec<_>>(), expected);
        };

        check(SetOr::or(&a, &b), OpType::Or);
        check(SetAnd::and(&a, &b), OpType::And);
        check(SetAndNot::and_not(&a, &b), OpType::AndNot);
        check(SetXor::xor(&a, &b), OpType::Xor);

        check(a.clone().inplace_or(&b), OpType::Or);
        check(a.clone().inplace_and(&b), OpType::And);
        check(a.clone().inplace_and_not(&b), OpType::AndNot);
        check(a.clone().inplace_xor(&b), OpType::Xor);
    }

    #[test]
    fn subset() {
        let data = generate_data(0..u16::MAX, 10_000);
        let a = make_container(&data);
        let mut b = a.clone();
        b.set_range(100, 5_000);

        assert!(a.subset_of(&b));
        assert!(!b.subset_of(&a));
    }

    #[test]
    fn round_trip_serialize() {
        let data = generate_data(0..u16::MAX, 5_000);
        let container = make_container(&data);

        let mut bytes = Vec::new();
        assert_eq!(container.serialize(&mut bytes).unwrap(), 8192);

        let found = BitsetContainer::deserialize(&mut &bytes[..]).unwrap();
        assert_eq!(found, container);
        found.validate().unwrap();
    }
}
