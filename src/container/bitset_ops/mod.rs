//! Operations over the raw words of bitset containers.
//!
//! Every kernel processes the full word vector, the compiler is free to vectorize the loops.

mod scalar;

pub use self::scalar::*;

#[cfg(test)]
mod test {
    use crate::test::*;
    use crate::container::BITSET_SIZE_IN_WORDS;

    /// Build the words of a bitset holding `data`
    fn make_words(data: &[u16]) -> Vec<u64> {
        let mut words = vec![0; BITSET_SIZE_IN_WORDS];
        for value in data {
            words[(*value >> 6) as usize] |= 1 << (*value & 0x3F);
        }

        words
    }

    /// Expand the words of a bitset into its values
    fn values(words: &[u64]) -> Vec<u16> {
        (0..=u16::MAX)
            .filter(|v| words[(*v >> 6) as usize] & (1 << (*v & 0x3F)) != 0)
            .collect()
    }

    fn run_test<F, G>(op: OpType, f: F, g: G)
        where F: Fn(&[u64], &[u64], &mut [u64]) -> usize,
              G: Fn(&mut [u64], &[u64]) -> usize
    {
        let data_a = generate_data(0..u16::MAX, 20_000);
        let data_b = generate_data(0..u16::MAX, 30_000);
        let expected = compute_result(&data_a, &data_b, op);

        let a = make_words(&data_a);
        let b = make_words(&data_b);

        let mut out = vec![0; BITSET_SIZE_IN_WORDS];
        let card = (f)(&a, &b, &mut out);

        assert_eq!(card, expected.len());
        assert_eq!(values(&out), expected);

        let mut a = a;
        let card = (g)(&mut a, &b);

        assert_eq!(card, expected.len());
        assert_eq!(a, out);
    }

    #[test]
    fn or() {
        run_test(OpType::Or, super::or, super::inplace_or);
    }

    #[test]
    fn and() {
        run_test(OpType::And, super::and, super::inplace_and);
    }

    #[test]
    fn and_not() {
        run_test(OpType::AndNot, super::and_not, super::inplace_and_not);
    }

    #[test]
    fn xor() {
        run_test(OpType::Xor, super::xor, super::inplace_xor);
    }

    #[test]
    fn cardinality() {
        let data_a = generate_data(0..u16::MAX, 20_000);
        let data_b = generate_data(0..u16::MAX, 30_000);
        let a = make_words(&data_a);
        let b = make_words(&data_b);

        assert_eq!(super::cardinality(&a), data_a.len());
        assert_eq!(super::and_cardinality(&a, &b), compute_result(&data_a, &data_b, OpType::And).len());
        assert!(super::intersects(&a, &b));
        assert!(!super::intersects(&a, &make_words(&[])));
    }
}
