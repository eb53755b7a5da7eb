//! Linear merge algorithms over sorted, duplicate free `u16` slices.
//!
//! All functions append their result to `out` and assume both inputs are sorted.
//! The result is undefined if that is violated.

/// Calculate the union of two slices
pub fn or(a: &[u16], b: &[u16], out: &mut Vec<u16>) {
    // One operand is empty, just copy the other
    if b.is_empty() {
        out.extend_from_slice(a);
        return;
    }

    if a.is_empty() {
        out.extend_from_slice(b);
        return;
    }

    out.reserve(a.len() + b.len());

    let mut i_a = 0;
    let mut i_b = 0;

    while i_a < a.len() && i_b < b.len() {
        let v_a = a[i_a];
        let v_b = b[i_b];

        // B is greater; append A and advance
        if v_a < v_b {
            out.push(v_a);
            i_a += 1;
        }
        // A is greater; append B and advance
        else if v_b < v_a {
            out.push(v_b);
            i_b += 1;
        }
        // Equal; append one and advance both
        else {
            out.push(v_a);
            i_a += 1;
            i_b += 1;
        }
    }

    out.extend_from_slice(&a[i_a..]);
    out.extend_from_slice(&b[i_b..]);
}

/// Calculate the intersection of two slices
pub fn and(a: &[u16], b: &[u16], out: &mut Vec<u16>) {
    if a.is_empty() || b.is_empty() {
        return;
    }

    out.reserve(a.len().min(b.len()));

    let mut i_a = 0;
    let mut i_b = 0;

    while i_a < a.len() && i_b < b.len() {
        let v_a = a[i_a];
        let v_b = b[i_b];

        if v_a < v_b {
            i_a += 1;
        }
        else if v_b < v_a {
            i_b += 1;
        }
        else {
            out.push(v_a);
            i_a += 1;
            i_b += 1;
        }
    }
}

/// Find the cardinality of the intersection of two slices
pub fn and_cardinality(a: &[u16], b: &[u16]) -> usize {
    let mut count = 0;
    let mut i_a = 0;
    let mut i_b = 0;

    while i_a < a.len() && i_b < b.len() {
        let v_a = a[i_a];
        let v_b = b[i_b];

        if v_a < v_b {
            i_a += 1;
        }
        else if v_b < v_a {
            i_b += 1;
        }
        else {
            count += 1;
            i_a += 1;
            i_b += 1;
        }
    }

    count
}

/// Calculate the difference `a \ b`
pub fn and_not(a: &[u16], b: &[u16], out: &mut Vec<u16>) {
    if a.is_empty() {
        return;
    }

    if b.is_empty() {
        out.extend_from_slice(a);
        return;
    }

    out.reserve(a.len());

    let mut i_a = 0;
    let mut i_b = 0;

    while i_a < a.len() && i_b < b.len() {
        let v_a = a[i_a];
        let v_b = b[i_b];

        if v_a < v_b {
            out.push(v_a);
            i_a += 1;
        }
        else if v_a == v_b {
            i_a += 1;
            i_b += 1;
        }
        else {
            i_b += 1;
        }
    }

    // B finished first, append the remainder of A
    out.extend_from_slice(&a[i_a..]);
}

/// Calculate the symmetric difference `(a \ b) ∪ (b \ a)`
pub fn xor(a: &[u16], b: &[u16], out: &mut Vec<u16>) {
    out.reserve(a.len() + b.len());

    let mut i_a = 0;
    let mut i_b = 0;

    while i_a < a.len() && i_b < b.len() {
        let v_a = a[i_a];
        let v_b = b[i_b];

        if v_a == v_b {
            i_a += 1;
            i_b += 1;
        }
        else if v_a < v_b {
            out.push(v_a);
            i_a += 1;
        }
        else {
            out.push(v_b);
            i_b += 1;
        }
    }

    out.extend_from_slice(&a[i_a..]);
    out.extend_from_slice(&b[i_b..]);
}

#[cfg(test)]
mod test {
    use crate::test::*;

    fn run_test<F>(op: OpType, f: F)
        where F: Fn(&[u16], &[u16], &mut Vec<u16>)
    {
        let a = generate_data(0..u16::MAX, 3_000);
        let b = generate_data(0..u16::MAX, 2_000);
        let expected = compute_result(&a, &b, op);

        let mut found = Vec::new();
        (f)(&a, &b, &mut found);

        assert_eq!(found, expected);

        // Empty operands on either side
        let mut found = Vec::new();
        (f)(&a, &[], &mut found);
        assert_eq!(found, compute_result(&a, &[], op));

        let mut found = Vec::new();
        (f)(&[], &b, &mut found);
        assert_eq!(found, compute_result(&[], &b, op));
    }

    #[test]
    fn or() {
        run_test(OpType::Or, super::or);
    }

    #[test]
    fn and() {
        run_test(OpType::And, super::and);
    }

    #[test]
    fn and_not() {
        run_test(OpType::AndNot, super::and_not);
    }

    #[test]
    fn xor() {
        run_test(OpType::Xor, super::xor);
    }

    #[test]
    fn and_cardinality() {
        let a = generate_data(0..u16::MAX, 3_000);
        let b = generate_data(0..u16::MAX, 2_000);
        let expected = compute_result(&a, &b, OpType::And);

        assert_eq!(super::and_cardinality(&a, &b), expected.len());
    }
}
