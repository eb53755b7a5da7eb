//! Operations over many bitmaps at once

use crate::lazy::LazyUnion;
use crate::roaring::RoaringBitmap;

/// Compute the union of all `bitmaps`
pub fn or_all<'a, I>(bitmaps: I) -> RoaringBitmap
    where I: IntoIterator<Item = &'a RoaringBitmap>
{
    let mut union = LazyUnion::new();
    for bitmap in bitmaps {
        union.or_with(bitmap);
    }

    union.repair()
}

/// Compute the intersection of all `bitmaps`. The intersection of no bitmaps is empty
pub fn and_all<'a, I>(bitmaps: I) -> RoaringBitmap
    where I: IntoIterator<Item = &'a RoaringBitmap>
{
    let mut bitmaps: Vec<&RoaringBitmap> = bitmaps.into_iter().collect();

    // Start from the smallest so the intermediate result shrinks quickly
    bitmaps.sort_unstable_by_key(|b| b.container_count());

    let (first, rest) = match bitmaps.split_first() {
        Some(split) => split,
        None => return RoaringBitmap::new()
    };

    let mut result = (*first).clone();
    for bitmap in rest {
        if result.is_empty() {
            break;
        }

        result.inplace_and(bitmap);
    }

    result
}

/// Compute the symmetric difference of all `bitmaps`, the values present in an odd number of them
pub fn xor_all<'a, I>(bitmaps: I) -> RoaringBitmap
    where I: IntoIterator<Item = &'a RoaringBitmap>
{
    let mut result = RoaringBitmap::new();
    for bitmap in bitmaps {
        result.inplace_xor(bitmap);
    }

    result
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test::*;

    fn inputs() -> Vec<RoaringBitmap> {
        (0..6u32)
            .map(|i| {
                let mut bitmap = RoaringBitmap::from_slice(&generate_data(0..500_000, 20_000 * (i as usize + 1)));
                bitmap.add_range(100_000..(150_000 + i * 10_000));

                bitmap
            })
            .collect()
    }

    #[test]
    fn or() {
        let inputs = inputs();
        let expected = inputs.iter().fold(RoaringBitmap::new(), |acc, b| &acc | b);

        assert_eq!(or_all(&inputs), expected);
        assert!(or_all(std::iter::empty()).is_empty());
    }

    #[test]
    fn and() {
        let inputs = inputs();
        let expected = inputs[1..].iter().fold(inputs[0].clone(), |acc, b| acc & b);

        let result = and_all(&inputs);
        assert!(result.contains_range(100_000..150_000));
        assert_eq!(result, expected);
        assert!(and_all(std::iter::empty()).is_empty());
    }

    #[test]
    fn xor() {
        let inputs = inputs();
        let expected = inputs.iter().fold(RoaringBitmap::new(), |acc, b| acc ^ b);

        let result = xor_all(&inputs);
        result.validate().unwrap();
        assert_eq!(result, expected);

        // A value in an even number of inputs is dropped
        assert!(!xor_all(&[inputs[0].clone(), inputs[0].clone()]).contains(100_000));
    }
}
