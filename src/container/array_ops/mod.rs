//! Set operations over sorted `u16` slices used by array containers.
//!
//! The merge kernels live in `scalar`. This module picks between a linear merge and a galloping
//! search depending on how skewed the operand sizes are.

mod scalar;

pub use self::scalar::xor;

/// When the larger operand is more than `GALLOP_RATIO` times the size of the smaller one,
/// intersections gallop through the larger operand instead of merging linearly
pub const GALLOP_RATIO: usize = 64;

#[inline]
fn is_skewed(a: &[u16], b: &[u16]) -> bool {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };

    small.len() * GALLOP_RATIO < large.len()
}

/// Perform the set union operation between `a` and `b` appending the result to `out`
#[inline]
pub fn or(a: &[u16], b: &[u16], out: &mut Vec<u16>) {
    scalar::or(a, b, out)
}

/// Perform the set intersection operation between `a` and `b` appending the result to `out`
pub fn and(a: &[u16], b: &[u16], out: &mut Vec<u16>) {
    if is_skewed(a, b) {
        if a.len() < b.len() {
            and_galloping(a, b, out);
        }
        else {
            and_galloping(b, a, out);
        }
    }
    else {
        scalar::and(a, b, out);
    }
}

/// Find the cardinality of the intersection between `a` and `b`
pub fn and_cardinality(a: &[u16], b: &[u16]) -> usize {
    if is_skewed(a, b) {
        let (small, large) = if a.len() < b.len() { (a, b) } else { (b, a) };

        let mut count = 0;
        let mut pos = 0;
        for value in small.iter() {
            pos = advance_until(large, pos, *value);
            if pos == large.len() {
                break;
            }

            if large[pos] == *value {
                count += 1;
                pos += 1;
            }
        }

        count
    }
    else {
        scalar::and_cardinality(a, b)
    }
}

/// Perform the set difference operation between `a` and `b` appending the result to `out`
pub fn and_not(a: &[u16], b: &[u16], out: &mut Vec<u16>) {
    // Few values to remove from a large array, skip ahead to each one
    if b.len() * GALLOP_RATIO < a.len() {
        out.reserve(a.len());

        let mut pos = 0;
        for value in b.iter() {
            let next = advance_until(a, pos, *value);
            out.extend_from_slice(&a[pos..next]);

            pos = next;
            if pos == a.len() {
                break;
            }

            if a[pos] == *value {
                pos += 1;
            }
        }

        out.extend_from_slice(&a[pos..]);
    }
    else {
        scalar::and_not(a, b, out);
    }
}

/// Check if `a` and `b` share at least one value
pub fn intersects(a: &[u16], b: &[u16]) -> bool {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };

    let mut pos = 0;
    for value in small.iter() {
        pos = advance_until(large, pos, *value);
        if pos == large.len() {
            return false;
        }

        if large[pos] == *value {
            return true;
        }
    }

    false
}

/// Check if every value of `a` is present in `b`
pub fn is_subset(a: &[u16], b: &[u16]) -> bool {
    if a.len() > b.len() {
        return false;
    }

    let mut pos = 0;
    for value in a.iter() {
        pos = advance_until(b, pos, *value);
        if pos == b.len() || b[pos] != *value {
            return false;
        }

        pos += 1;
    }

    true
}

/// Intersect a small slice with a much larger one by galloping through the larger one
fn and_galloping(small: &[u16], large: &[u16], out: &mut Vec<u16>) {
    out.reserve(small.len());

    let mut pos = 0;
    for value in small.iter() {
        pos = advance_until(large, pos, *value);
        if pos == large.len() {
            return;
        }

        if large[pos] == *value {
            out.push(*value);
            pos += 1;
        }
    }
}

/// Count the number of elements which are less than the key
///
/// # Remarks
/// Assumes that the array is sorted and all elements are unique
pub fn count_less(slice: &[u16], key: u16) -> usize {
    slice.partition_point(|v| *v < key)
}

/// Count the number of elements which are greater than the key
///
/// # Remarks
/// Assumes that the array is sorted and all elements are unique
pub fn count_greater(slice: &[u16], key: u16) -> usize {
    slice.len() - slice.partition_point(|v| *v <= key)
}

/// Find the smallest index `i >= index` such that `slice[i] >= min` using an exponential (galloping) search.
/// Returns `slice.len()` if no such index exists.
pub fn advance_until(slice: &[u16], index: usize, min: u16) -> usize {
    let lower = index;
    if lower >= slice.len() || slice[lower] >= min {
        return lower;
    }

    // Double the span until it overshoots `min` or runs off the end
    let mut span = 1;
    while lower + span < slice.len() && slice[lower + span] < min {
        span <<= 1;
    }

    // `slice[start]` is known to be less than `min` and the answer lies in `(start, upper]`
    let start = lower + (span >> 1);
    let upper = (lower + span).min(slice.len());

    start + 1 + slice[(start + 1)..upper].partition_point(|v| *v < min)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test::*;

    #[test]
    fn galloping_and() {
        let small = generate_data(0..u16::MAX, 20);
        let large = generate_data(0..u16::MAX, 30_000);
        let expected = compute_result(&small, &large, OpType::And);

        let mut found = Vec::new();
        and(&small, &large, &mut found);
        assert_eq!(found, expected);

        let mut found = Vec::new();
        and(&large, &small, &mut found);
        assert_eq!(found, expected);

        assert_eq!(and_cardinality(&small, &large), expected.len());
        assert_eq!(intersects(&small, &large), !expected.is_empty());
    }

    #[test]
    fn galloping_and_not() {
        let small = generate_data(0..u16::MAX, 20);
        let large = generate_data(0..u16::MAX, 30_000);

        let mut found = Vec::new();
        and_not(&large, &small, &mut found);
        assert_eq!(found, compute_result(&large, &small, OpType::AndNot));
    }

    #[test]
    fn advance() {
        let data: Vec<u16> = (0..1000).map(|i| i * 3).collect();

        assert_eq!(advance_until(&data, 0, 0), 0);
        assert_eq!(advance_until(&data, 0, 1), 1);
        assert_eq!(advance_until(&data, 0, 3), 1);
        assert_eq!(advance_until(&data, 10, 2997), 999);
        assert_eq!(advance_until(&data, 10, 2998), 1000);
        assert_eq!(advance_until(&data, 500, 0), 500);
        assert_eq!(advance_until(&data, 1000, 0), 1000);

        for target in 0..3000u16 {
            let expected = data.partition_point(|v| *v < target);
            assert_eq!(advance_until(&data, 0, target), expected);
        }
    }

    #[test]
    fn counts() {
        let data = [1, 3, 5, 7];

        assert_eq!(count_less(&data, 5), 2);
        assert_eq!(count_less(&data, 6), 3);
        assert_eq!(count_greater(&data, 5), 1);
        assert_eq!(count_greater(&data, 0), 4);
    }

    #[test]
    fn subset() {
        assert!(is_subset(&[2, 4], &[1, 2, 3, 4]));
        assert!(!is_subset(&[2, 5], &[1, 2, 3, 4]));
        assert!(is_subset(&[], &[1]));
    }
}
