use std::mem;

use tracing::debug;

use crate::container::Container;
use crate::roaring::RoaringBitmap;

/// An accumulator for unions of many bitmaps.
///
/// Bitset containers touched by the union do not maintain their cardinality until [`repair`] is called,
/// which makes each union cheaper. The partial result can't be queried, [`repair`] must be called to
/// obtain the union as a [`RoaringBitmap`].
///
/// # Examples
/// ```
/// use rusting_roaring::{LazyUnion, RoaringBitmap};
///
/// let a = RoaringBitmap::from_range(0..10_000);
/// let b = RoaringBitmap::from_range(5_000..20_000);
///
/// let mut union = LazyUnion::new();
/// union.or_with(&a).or_with(&b);
///
/// assert_eq!(union.repair(), &a | &b);
/// ```
///
/// [`repair`]: LazyUnion::repair
#[derive(Clone, Debug, Default)]
pub struct LazyUnion {
    bitmap: RoaringBitmap
}

impl LazyUnion {
    /// Create an empty union
    pub fn new() -> Self {
        Self::default()
    }

    /// Union `other` into the accumulator
    pub fn or_with(&mut self, other: &RoaringBitmap) -> &mut Self {
        if other.is_empty() {
            return self;
        }

        if self.bitmap.is_empty() {
            self.bitmap.clone_from(other);
            return self;
        }

        let keys = mem::take(&mut self.bitmap.keys);
        let containers = mem::take(&mut self.bitmap.containers);

        let bitmap = &mut self.bitmap;
        bitmap.keys.reserve(keys.len() + other.keys.len());
        bitmap.containers.reserve(containers.len() + other.containers.len());

        let mut i1 = 0;
        for (key, container) in keys.into_iter().zip(containers) {
            // Copy the containers only present in other
            while i1 < other.keys.len() && other.keys[i1] < key {
                bitmap.keys.push(other.keys[i1]);
                bitmap.containers.push(other.containers[i1].clone());
                i1 += 1;
            }

            let container = if i1 < other.keys.len() && other.keys[i1] == key {
                i1 += 1;
                container.lazy_or(&other.containers[i1 - 1])
            }
            else {
                container
            };

            bitmap.keys.push(key);
            bitmap.containers.push(container);
        }

        bitmap.keys.extend_from_slice(&other.keys[i1..]);
        bitmap.containers.extend_from_slice(&other.containers[i1..]);

        self
    }

    /// Restore the cardinality and representation of every container, producing the union
    pub fn repair(mut self) -> RoaringBitmap {
        for container in self.bitmap.containers.iter_mut() {
            container.transform(Container::repair);
        }

        debug!(containers = self.bitmap.containers.len(), "repaired lazy union");

        self.bitmap
    }
}

impl From<RoaringBitmap> for LazyUnion {
    fn from(bitmap: RoaringBitmap) -> Self {
        Self {
            bitmap
        }
    }
}

impl RoaringBitmap {
    /// Start a lazy union of `self` and `other`. See [`LazyUnion`]
    pub fn lazy_or(&self, other: &RoaringBitmap) -> LazyUnion {
        let mut union = LazyUnion::from(self.clone());
        union.or_with(other);

        union
    }
}

#[cfg(test)]
mod test {
    use crate::{LazyUnion, RoaringBitmap};
    use crate::test::*;

    #[test]
    fn union_of_many() {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();

        let inputs: Vec<RoaringBitmap> = (0..8u32)
            .map(|i| {
                let mut bitmap = RoaringBitmap::from_slice(&generate_data(0..2_000_000, 10_000 * (i as usize + 1)));
                bitmap.add_range((i * 100_000)..(i * 100_000 + 50_000));
                bitmap.run_optimize();

                bitmap
            })
            .collect();

        let mut union = LazyUnion::new();
        let mut expected = RoaringBitmap::new();

        for bitmap in inputs.iter() {
            union.or_with(bitmap);
            expected.inplace_or(bitmap);
        }

        let result = union.repair();
        result.validate().unwrap();
        assert_eq!(result, expected);
        assert_eq!(result.len(), expected.len());
    }

    #[test]
    fn lazy_or() {
        let a = RoaringBitmap::from_slice(&generate_data(0..1_000_000, 100_000));
        let b = RoaringBitmap::from_slice(&[5, 3_000_000]);

        let result = a.lazy_or(&b).repair();
        result.validate().unwrap();

        assert_eq!(result, a.or(&b));
    }
}
