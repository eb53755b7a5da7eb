//! Word at a time kernels over the `1024` word vectors of bitset containers

macro_rules! bitset_op {
    ($name: ident, $inplace: ident, $($op:tt)*) => {
        /// Perform the operation between `a` and `b`, write the result into `out` and return its cardinality
        pub fn $name(a: &[u64], b: &[u64], out: &mut [u64]) -> usize {
            debug_assert!(a.len() == b.len() && a.len() == out.len());

            let mut count = 0;
            let pass = a.iter()
                .zip(b.iter())
                .zip(out.iter_mut());

            for ((wa, wb), wo) in pass {
                *wo = *wa $($op)* *wb;
                count += wo.count_ones();
            }

            count as usize
        }

        /// Perform the operation between `a` and `b`, store the result in `a` and return its cardinality
        pub fn $inplace(a: &mut [u64], b: &[u64]) -> usize {
            debug_assert!(a.len() == b.len());

            let mut count = 0;
            for (wa, wb) in a.iter_mut().zip(b.iter()) {
                *wa = *wa $($op)* *wb;
                count += wa.count_ones();
            }

            count as usize
        }
    };
}

bitset_op!(or, inplace_or, |);

bitset_op!(and, inplace_and, &);

bitset_op!(and_not, inplace_and_not, & !);

bitset_op!(xor, inplace_xor, ^);

/// Union `b` into `a` without maintaining a cardinality
pub fn inplace_or_lazy(a: &mut [u64], b: &[u64]) {
    debug_assert!(a.len() == b.len());

    for (wa, wb) in a.iter_mut().zip(b.iter()) {
        *wa |= *wb;
    }
}

/// Compute the cardinality of the bitset
pub fn cardinality(bitset: &[u64]) -> usize {
    bitset.iter()
        .map(|w| w.count_ones() as usize)
        .sum()
}

/// Compute the cardinality of the intersection of two bitsets
pub fn and_cardinality(a: &[u64], b: &[u64]) -> usize {
    a.iter()
        .zip(b.iter())
        .map(|(a, b)| (a & b).count_ones() as usize)
        .sum()
}

/// Check if two bitsets share any set bit
pub fn intersects(a: &[u64], b: &[u64]) -> bool {
    a.iter()
        .zip(b.iter())
        .any(|(a, b)| a & b != 0)
}
