//! Square SGEMM kernels: `C := C + A * B` for n×n `f32` matrices.
//!
//! All matrices are flat row-major slices of length `n * n`. Every public
//! kernel validates the slice lengths against `n` before touching C and
//! accumulates into C rather than overwriting it; callers that want
//! `C = A * B` must zero C first.
//!
//! [`sgemm_naive`] is the numeric reference: for each output element the
//! products are added in ascending k order, and repeated calls with the same
//! inputs are bit-identical. The optimized kernels keep that per-element
//! order but hoist `C[i][j]` into a register for the duration of the k loop
//! ([`sgemm_blocked`], [`par_sgemm`]) or fuse the multiply-add rounding step
//! ([`sgemm`] and [`par_sgemm`] on AVX2 builds), so their results can differ from the
//! reference in the low-order bits. Relative error stays within ~1e-4 for
//! inputs in [-1, 1].

#[cfg(not(avx2))]
use rayon::{
    iter::{IndexedParallelIterator, ParallelIterator},
    slice::ParallelSliceMut,
};
use std::cmp::min;

use crate::error::{invalid_dimension, Result};
use crate::BLOCK;

/// Calculates the flat index of element (i, j) in a row-major matrix with
/// leading dimension `ld`.
#[inline(always)]
pub(crate) fn at(i: usize, j: usize, ld: usize) -> usize {
    (i * ld) + j
}

/// Checks that A, B and C all hold exactly `n * n` elements.
///
/// Runs before any kernel writes to C, so a dimension error never leaves C
/// partially accumulated.
pub(crate) fn validate(a: &[f32], b: &[f32], c: &[f32], n: usize) -> Result<()> {
    let expected = n * n;
    if a.len() != expected || b.len() != expected || c.len() != expected {
        return Err(invalid_dimension(
            n,
            a.len(),
            b.len(),
            c.len(),
            "A, B and C must all be n x n",
        ));
    }
    Ok(())
}

/// Naive triple-loop reference kernel.
///
/// Iterates i-major, j-next, k-innermost with k ascending, accumulating each
/// product into `C[i][j]` as encountered. This is the fixed reference
/// summation order; the function is deterministic down to the bit.
///
/// O(n³) multiply-adds with no blocking or vectorization. Use it as a
/// correctness oracle, not for performance.
pub fn sgemm_naive(a: &[f32], b: &[f32], c: &mut [f32], n: usize) -> Result<()> {
    validate(a, b, c, n)?;

    for i in 0..n {
        for j in 0..n {
            for k in 0..n {
                c[at(i, j, n)] += a[at(i, k, n)] * b[at(k, j, n)];
            }
        }
    }

    Ok(())
}

/// Cache-blocked kernel.
///
/// Walks C in [`BLOCK`]-sized tiles so the working set of each tile stays in
/// cache, and keeps `C[i][j]` in a register across the k loop instead of
/// re-reading it per iteration. Tiles at the right and bottom edges shrink
/// to fit, so any `n` is handled.
pub fn sgemm_blocked(a: &[f32], b: &[f32], c: &mut [f32], n: usize) -> Result<()> {
    validate(a, b, c, n)?;

    for si in (0..n).step_by(BLOCK) {
        let imax = min(si + BLOCK, n);
        for sk in (0..n).step_by(BLOCK) {
            let kmax = min(sk + BLOCK, n);
            for sj in (0..n).step_by(BLOCK) {
                let jmax = min(sj + BLOCK, n);

                for i in si..imax {
                    for j in sj..jmax {
                        let mut cij = c[at(i, j, n)];
                        for k in sk..kmax {
                            cij += a[at(i, k, n)] * b[at(k, j, n)];
                        }
                        c[at(i, j, n)] = cij;
                    }
                }
            }
        }
    }

    Ok(())
}

/// Row-parallel kernel using rayon.
///
/// Splits C into disjoint row bands with `par_chunks_mut`, so every output
/// element is produced by exactly one task's uninterrupted k loop and no two
/// tasks ever write the same element. On AVX2 builds each band runs the
/// packed SIMD row kernel, combining threads and vectorization; otherwise
/// the bands are scalar. Per-element summation order matches the reference
/// (k ascending into a register accumulator), with the AVX2 path's FMA
/// fusion as the only numeric difference.
pub fn par_sgemm(a: &[f32], b: &[f32], c: &mut [f32], n: usize) -> Result<()> {
    validate(a, b, c, n)?;
    if n == 0 {
        return Ok(());
    }

    #[cfg(avx2)]
    {
        crate::simd::avx2::gemm::par_gemm(a, b, c, n)
    }

    #[cfg(not(avx2))]
    {
        c.par_chunks_mut(n).enumerate().for_each(|(i, c_row)| {
            for j in 0..n {
                let mut cij = c_row[j];
                for k in 0..n {
                    cij += a[at(i, k, n)] * b[at(k, j, n)];
                }
                c_row[j] = cij;
            }
        });

        Ok(())
    }
}

/// Single-call entry point that picks the fastest kernel this build carries.
///
/// On hosts where the build script detected AVX2+FMA this runs the packed
/// SIMD kernel; otherwise it falls back to [`sgemm_blocked`]. The choice is
/// made at compile time, so there is no dispatch cost per call.
pub fn sgemm(a: &[f32], b: &[f32], c: &mut [f32], n: usize) -> Result<()> {
    validate(a, b, c, n)?;

    #[cfg(avx2)]
    {
        crate::simd::avx2::gemm::gemm(a, b, c, n)
    }

    #[cfg(not(avx2))]
    {
        sgemm_blocked(a, b, c, n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Dot-product oracle computed in f64 to keep the expected values tighter
    // than the f32 kernels under test.
    fn oracle(a: &[f32], b: &[f32], n: usize) -> Vec<f32> {
        let mut c = vec![0.0f32; n * n];
        for i in 0..n {
            for j in 0..n {
                let mut acc = 0.0f64;
                for k in 0..n {
                    acc += a[at(i, k, n)] as f64 * b[at(k, j, n)] as f64;
                }
                c[at(i, j, n)] = acc as f32;
            }
        }
        c
    }

    fn fill(n: usize, offset: usize) -> Vec<f32> {
        (0..n * n)
            .map(|x| ((x + offset) % 100) as f32 / 10.0 - 5.0)
            .collect()
    }

    fn assert_close(actual: &[f32], expected: &[f32], n: usize, name: &str) {
        for (idx, (&got, &want)) in actual.iter().zip(expected.iter()).enumerate() {
            // Floor the scale at n: cancellation can leave a tiny result even
            // though n products of magnitude ~25 were accumulated.
            let scale = want.abs().max(n as f32);
            assert!(
                (got - want).abs() / scale < 1e-4 * (n as f32).sqrt().max(1.0),
                "{}: C[{}] mismatch: got {}, expected {} (n = {})",
                name,
                idx,
                got,
                want,
                n
            );
        }
    }

    #[test]
    fn test_at() {
        // 2x3 row-major:
        // 0 1 2
        // 3 4 5
        assert_eq!(at(0, 0, 3), 0);
        assert_eq!(at(0, 2, 3), 2);
        assert_eq!(at(1, 0, 3), 3);
        assert_eq!(at(1, 2, 3), 5);
    }

    #[test]
    fn test_naive_concrete_2x2() {
        let a = vec![1.0, 2.0, 3.0, 4.0];
        let b = vec![5.0, 6.0, 7.0, 8.0];
        let mut c = vec![0.0; 4];

        sgemm_naive(&a, &b, &mut c, 2).unwrap();

        assert_eq!(c, vec![19.0, 22.0, 43.0, 50.0]);
    }

    #[test]
    fn test_naive_matches_oracle_exhaustive_small() {
        for n in 0..=8 {
            let a = fill(n, 0);
            let b = fill(n, 37);
            let mut c = vec![0.0; n * n];

            sgemm_naive(&a, &b, &mut c, n).unwrap();
            assert_close(&c, &oracle(&a, &b, n), n, &format!("naive n={}", n));
        }
    }

    #[test]
    fn test_naive_accumulates_instead_of_assigning() {
        let n = 16;
        let a = fill(n, 3);
        let b = fill(n, 11);

        let mut c_once = vec![0.0; n * n];
        sgemm_naive(&a, &b, &mut c_once, n).unwrap();

        let mut c_twice = vec![0.0; n * n];
        sgemm_naive(&a, &b, &mut c_twice, n).unwrap();
        sgemm_naive(&a, &b, &mut c_twice, n).unwrap();

        let doubled: Vec<f32> = c_once.iter().map(|x| x * 2.0).collect();
        assert_close(&c_twice, &doubled, n, "additivity");
    }

    #[test]
    fn test_naive_zero_dimension_is_noop() {
        let mut c: Vec<f32> = vec![];
        sgemm_naive(&[], &[], &mut c, 0).unwrap();
        assert!(c.is_empty());
    }

    #[test]
    fn test_naive_identity_times_b_is_b() {
        let n = 7;
        let mut a = vec![0.0; n * n];
        for i in 0..n {
            a[at(i, i, n)] = 1.0;
        }
        let b = fill(n, 5);
        let mut c = vec![0.0; n * n];

        sgemm_naive(&a, &b, &mut c, n).unwrap();

        assert_eq!(c, b);
    }

    #[test]
    fn test_naive_is_bit_deterministic() {
        let n = 33;
        let a = fill(n, 1);
        let b = fill(n, 2);

        let mut c1 = vec![0.25; n * n];
        let mut c2 = vec![0.25; n * n];
        sgemm_naive(&a, &b, &mut c1, n).unwrap();
        sgemm_naive(&a, &b, &mut c2, n).unwrap();

        // Bitwise, not approximate.
        for (x, y) in c1.iter().zip(c2.iter()) {
            assert_eq!(x.to_bits(), y.to_bits());
        }
    }

    #[test]
    fn test_dimension_mismatch_leaves_c_untouched() {
        let a = vec![1.0; 9]; // 3x3
        let b = vec![1.0; 16]; // 4x4
        let mut c = vec![7.0; 9];

        let err = sgemm_naive(&a, &b, &mut c, 3).unwrap_err();
        assert!(matches!(
            err,
            crate::error::SgemmError::InvalidDimension { n: 3, b_len: 16, .. }
        ));
        assert!(c.iter().all(|&x| x == 7.0));

        // All kernels share the same fail-fast validation.
        assert!(sgemm_blocked(&a, &b, &mut c, 3).is_err());
        assert!(par_sgemm(&a, &b, &mut c, 3).is_err());
        assert!(sgemm(&a, &b, &mut c, 3).is_err());
        assert!(c.iter().all(|&x| x == 7.0));
    }

    #[test]
    fn test_blocked_matches_naive_across_block_boundaries() {
        // Sizes straddling the BLOCK edge, plus primes.
        for n in [1, 2, 7, BLOCK - 1, BLOCK, BLOCK + 1, 2 * BLOCK + 5, 97] {
            let a = fill(n, 13);
            let b = fill(n, 29);

            let mut c_ref = vec![1.5; n * n];
            let mut c_blk = vec![1.5; n * n];
            sgemm_naive(&a, &b, &mut c_ref, n).unwrap();
            sgemm_blocked(&a, &b, &mut c_blk, n).unwrap();

            assert_close(&c_blk, &c_ref, n, &format!("blocked n={}", n));
        }
    }

    #[test]
    fn test_parallel_matches_naive() {
        for n in [1, 8, 64, 130] {
            let a = fill(n, 17);
            let b = fill(n, 23);

            let mut c_ref = vec![0.0; n * n];
            let mut c_par = vec![0.0; n * n];
            sgemm_naive(&a, &b, &mut c_ref, n).unwrap();
            par_sgemm(&a, &b, &mut c_par, n).unwrap();

            assert_close(&c_par, &c_ref, n, &format!("parallel n={}", n));
        }
    }

    #[test]
    fn test_dispatch_matches_naive() {
        for n in [1, 5, 16, 100] {
            let a = fill(n, 41);
            let b = fill(n, 7);

            let mut c_ref = vec![0.0; n * n];
            let mut c_auto = vec![0.0; n * n];
            sgemm_naive(&a, &b, &mut c_ref, n).unwrap();
            sgemm(&a, &b, &mut c_auto, n).unwrap();

            assert_close(&c_auto, &c_ref, n, &format!("dispatch n={}", n));
        }
    }
}
