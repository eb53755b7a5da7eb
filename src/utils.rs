use std::ops::{Bound, RangeBounds};

/// Split a value into its container key (upper 16 bits) and the value stored in the container (lower 16 bits)
#[inline]
pub fn split(value: u32) -> (u16, u16) {
    ((value >> 16) as u16, value as u16)
}

/// Reconstruct a value from a container key and the low bits stored in the container
#[inline]
pub fn join(key: u16, low: u16) -> u32 {
    (u32::from(key) << 16) | u32::from(low)
}

/// Normalize range bounds over `u32` into an exclusive `[start, end)` pair.
///
/// The end is widened to `u64` so that ranges reaching `u32::MAX` inclusive can be represented.
/// Returns `None` if the range is empty.
pub trait IntoBound {
    fn into_bound(self) -> Option<(u32, u64)>;
}

impl<R: RangeBounds<u32>> IntoBound for R {
    fn into_bound(self) -> Option<(u32, u64)> {
        let start = match self.start_bound() {
            Bound::Included(s) => u64::from(*s),
            Bound::Excluded(s) => u64::from(*s) + 1,
            Bound::Unbounded => 0
        };

        let end = match self.end_bound() {
            Bound::Included(e) => u64::from(*e) + 1,
            Bound::Excluded(e) => u64::from(*e),
            Bound::Unbounded => 1 << 32
        };

        if start >= end {
            None
        }
        else {
            Some((start as u32, end))
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn split_join() {
        let (key, low) = split(0x0005_000A);

        assert_eq!(key, 5);
        assert_eq!(low, 10);
        assert_eq!(join(key, low), 0x0005_000A);
    }

    #[test]
    fn bounds() {
        assert_eq!((10..20).into_bound(), Some((10, 20)));
        assert_eq!((10..=20).into_bound(), Some((10, 21)));
        assert_eq!((..).into_bound(), Some((0, 1 << 32)));
        assert_eq!((0..=u32::MAX).into_bound(), Some((0, 1 << 32)));
        assert_eq!((5..5).into_bound(), None);
    }
}
