//! Merge algorithms over sorted lists of runs.
//!
//! Runs are converted to half open `[start, end)` intervals in `u32` while merging so that a run
//! ending at `u16::MAX` doesn't overflow. Every output is appended through [`append`], which coalesces
//! overlapping and adjacent intervals so the result never holds two touching runs.

use crate::container::run::Rle16;

/// A half open interval `[start, end)` in the 17 bit container space
type Span = (u32, u32);

#[inline]
fn span(run: &Rle16) -> Span {
    (u32::from(run.value), u32::from(run.value) + u32::from(run.length) + 1)
}

#[inline]
fn next(runs: &[Rle16], index: &mut usize) -> Option<Span> {
    *index += 1;
    runs.get(*index).map(span)
}

/// Append the interval `[start, end)` to `out`, fusing it with the last run if they overlap or touch
///
/// # Remarks
/// Assumes `start` is not smaller than the start of the last run in `out`
pub fn append(out: &mut Vec<Rle16>, start: u32, end: u32) {
    debug_assert!(start < end && end <= 1 << 16);

    if let Some(last) = out.last_mut() {
        let last_end = u32::from(last.value) + u32::from(last.length) + 1;

        if start <= last_end {
            if end > last_end {
                last.length = (end - 1 - u32::from(last.value)) as u16;
            }

            return;
        }
    }

    out.push(Rle16::new(start as u16, (end - 1 - start) as u16));
}

/// Calculate the union (`A ∪ B`) of two run lists and append the result to `out`
pub fn union(a: &[Rle16], b: &[Rle16], out: &mut Vec<Rle16>) {
    out.reserve(a.len() + b.len());

    let mut i_a = 0;
    let mut i_b = 0;

    while i_a < a.len() && i_b < b.len() {
        let (start, end) = if a[i_a].value <= b[i_b].value {
            i_a += 1;
            span(&a[i_a - 1])
        }
        else {
            i_b += 1;
            span(&b[i_b - 1])
        };

        append(out, start, end);
    }

    for run in a[i_a..].iter().chain(b[i_b..].iter()) {
        let (start, end) = span(run);
        append(out, start, end);
    }
}

/// Calculate the intersection (`A ∩ B`) of two run lists and append the result to `out`
pub fn intersect(a: &[Rle16], b: &[Rle16], out: &mut Vec<Rle16>) {
    let mut i_a = 0;
    let mut i_b = 0;
    let mut c_a = a.first().map(span);
    let mut c_b = b.first().map(span);

    while let (Some((s_a, e_a)), Some((s_b, e_b))) = (c_a, c_b) {
        if e_a <= s_b {
            c_a = next(a, &mut i_a);
        }
        else if e_b <= s_a {
            c_b = next(b, &mut i_b);
        }
        else {
            append(out, s_a.max(s_b), e_a.min(e_b));

            if e_a < e_b {
                c_a = next(a, &mut i_a);
            }
            else if e_b < e_a {
                c_b = next(b, &mut i_b);
            }
            else {
                c_a = next(a, &mut i_a);
                c_b = next(b, &mut i_b);
            }
        }
    }
}

/// Calculate the difference (`A \ B`) of two run lists and append the result to `out`
pub fn difference(a: &[Rle16], b: &[Rle16], out: &mut Vec<Rle16>) {
    let mut i_a = 0;
    let mut i_b = 0;
    let mut c_a = a.first().map(span);
    let mut c_b = b.first().map(span);

    while let Some((s_a, e_a)) = c_a {
        match c_b {
            None => {
                append(out, s_a, e_a);
                c_a = next(a, &mut i_a);
            },
            Some((s_b, e_b)) => {
                if e_b <= s_a {
                    c_b = next(b, &mut i_b);
                }
                else if e_a <= s_b {
                    append(out, s_a, e_a);
                    c_a = next(a, &mut i_a);
                }
                else {
                    // Keep the part of A in front of B
                    if s_a < s_b {
                        append(out, s_a, s_b);
                    }

                    // The tail of A past B may still be cut by the following runs of B
                    if e_a > e_b {
                        c_a = Some((e_b, e_a));
                        c_b = next(b, &mut i_b);
                    }
                    else {
                        c_a = next(a, &mut i_a);
                    }
                }
            }
        }
    }
}

/// Calculate the symmetric difference (`(A \ B) ∪ (B \ A)`) of two run lists and append the result to `out`
pub fn xor(a: &[Rle16], b: &[Rle16], out: &mut Vec<Rle16>) {
    out.reserve(a.len() + b.len());

    let mut i_a = 0;
    let mut i_b = 0;
    let mut c_a = a.first().map(span);
    let mut c_b = b.first().map(span);

    loop {
        match (c_a, c_b) {
            (None, None) => break,
            (Some((s_a, e_a)), None) => {
                append(out, s_a, e_a);
                c_a = next(a, &mut i_a);
            },
            (None, Some((s_b, e_b))) => {
                append(out, s_b, e_b);
                c_b = next(b, &mut i_b);
            },
            (Some((s_a, e_a)), Some((s_b, e_b))) => {
                if e_a <= s_b {
                    append(out, s_a, e_a);
                    c_a = next(a, &mut i_a);
                }
                else if e_b <= s_a {
                    append(out, s_b, e_b);
                    c_b = next(b, &mut i_b);
                }
                else {
                    // Emit the part covered by only one side before the overlap begins
                    let (low, high) = (s_a.min(s_b), s_a.max(s_b));
                    if low < high {
                        append(out, low, high);
                    }

                    // The overlap cancels out, carry the longer tail forward
                    let end = e_a.min(e_b);
                    if e_a < e_b {
                        c_a = next(a, &mut i_a);
                        c_b = Some((end, e_b));
                    }
                    else if e_b < e_a {
                        c_a = Some((end, e_a));
                        c_b = next(b, &mut i_b);
                    }
                    else {
                        c_a = next(a, &mut i_a);
                        c_b = next(b, &mut i_b);
                    }
                }
            }
        }
    }
}

/// Compute the number of values covered by the runs
pub fn cardinality(runs: &[Rle16]) -> usize {
    runs.iter()
        .map(|run| run.length as usize + 1)
        .sum()
}

/// Compute the cardinality of the intersection of two run lists
pub fn and_cardinality(a: &[Rle16], b: &[Rle16]) -> usize {
    let mut count = 0;
    let mut i_a = 0;
    let mut i_b = 0;

    while i_a < a.len() && i_b < b.len() {
        let (s_a, e_a) = span(&a[i_a]);
        let (s_b, e_b) = span(&b[i_b]);

        let start = s_a.max(s_b);
        let end = e_a.min(e_b);
        if start < end {
            count += (end - start) as usize;
        }

        if e_a <= e_b {
            i_a += 1;
        }

        if e_b <= e_a {
            i_b += 1;
        }
    }

    count
}

/// Check if two run lists share at least one value
pub fn intersects(a: &[Rle16], b: &[Rle16]) -> bool {
    let mut i_a = 0;
    let mut i_b = 0;

    while i_a < a.len() && i_b < b.len() {
        let (s_a, e_a) = span(&a[i_a]);
        let (s_b, e_b) = span(&b[i_b]);

        if s_a.max(s_b) < e_a.min(e_b) {
            return true;
        }

        if e_a <= e_b {
            i_a += 1;
        }
        else {
            i_b += 1;
        }
    }

    false
}

/// Check if every run of `a` is covered by the runs of `b`
pub fn is_subset(a: &[Rle16], b: &[Rle16]) -> bool {
    let mut i_b = 0;

    for run in a.iter() {
        let (s_a, e_a) = span(run);

        // Skip runs of B that end before this run starts
        while i_b < b.len() && span(&b[i_b]).1 <= s_a {
            i_b += 1;
        }

        // Runs never touch, so a covering run must hold the whole run of A
        match b.get(i_b).map(span) {
            Some((s_b, e_b)) if s_b <= s_a && e_a <= e_b => continue,
            _ => return false
        }
    }

    true
}

/// Check if the runs cover the full container
#[inline]
pub fn is_full(runs: &[Rle16]) -> bool {
    runs.len() == 1 && runs[0].value == 0 && runs[0].length == u16::MAX
}
