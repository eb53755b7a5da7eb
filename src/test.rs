#![cfg(test)]

use std::ops::Range;

use rand::prelude::*;
use rand::distributions::uniform::SampleUniform;
use rand::rngs::SmallRng;

/// The type of operation to perform
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum OpType {
    /// Performs a union of the two input sets
    Or,

    /// Performs an intersection of the two input sets
    And,

    /// Peforms a difference between the two input sets
    AndNot,

    /// Performs a symmetric difference between the two input sets
    Xor
}

const SEED: u64 = 0x0304_0106_0308_0600;

/// Generates `count` random values in `[min, max)`. Values are then deduplicated and sorted
/// so the result may hold fewer than `count` elements
pub(crate) fn generate_data<T>(range: Range<T>, count: usize) -> Vec<T>
    where T: Copy + Ord + SampleUniform
{
    let mut rng = SmallRng::seed_from_u64(SEED);

    let mut result: Vec<T> = Vec::with_capacity(count);
    while result.len() < count {
        result.push(rng.gen_range(range.start..range.end));
    }

    result.sort_unstable();
    result.dedup();

    result
}

/// Compute the result of an operation on two input sets using a known correct algorithm
///
/// # Remarks
/// Assumes the inputs are sorted
pub(crate) fn compute_result<T>(a: &[T], b: &[T], op: OpType) -> Vec<T>
    where T: Ord + Copy
{
    match op {
        OpType::Or => {
            // Compute A + B - Duplicates and maintain sorting
            let mut result = Vec::with_capacity(a.len() + b.len());
            result.extend_from_slice(a);
            result.extend_from_slice(b);
            result.sort_unstable();
            result.dedup();

            result
        },
        OpType::And => {
            a.iter()
                .copied()
                .filter(|v| b.binary_search(v).is_ok())
                .collect()
        },
        OpType::AndNot => {
            a.iter()
                .copied()
                .filter(|v| b.binary_search(v).is_err())
                .collect()
        },
        OpType::Xor => {
            let mut result: Vec<T> = a.iter()
                .copied()
                .filter(|v| b.binary_search(v).is_err())
                .chain(b.iter().copied().filter(|v| a.binary_search(v).is_err()))
                .collect();

            result.sort_unstable();
            result
        }
    }
}
