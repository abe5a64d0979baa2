//! Packed AVX2 FMA kernels for square SGEMM.
//!
//! B is copied once into aligned scratch with every row padded to a multiple
//! of [`LANE_COUNT`]; the pad lanes are zero, so they contribute nothing to
//! the accumulation and the inner loop never needs a partial-vector tail.
//! Each row of C is then computed by broadcasting `A[i][k]` across a vector
//! and fusing it into 8-wide chunks of the packed B row. [`par_gemm`] runs
//! the same row kernel with the rows distributed across rayon tasks, each
//! task owning its band of C and its own accumulator.
//!
//! Per output element the products are still added in ascending k order,
//! starting from the incoming `C[i][j]`, matching the reference kernel's
//! order; the only numeric difference is the fused rounding of `fmadd`.

use rayon::{
    iter::{IndexedParallelIterator, ParallelIterator},
    slice::ParallelSliceMut,
};

use crate::error::Result;
use crate::gemm::validate;
use crate::simd::avx2::f32x8::{F32x8, LANE_COUNT};
use crate::utils::AlignedBuffer;

/// Rounds `n` up to the next multiple of [`LANE_COUNT`].
#[inline(always)]
fn padded(n: usize) -> usize {
    n.div_ceil(LANE_COUNT) * LANE_COUNT
}

/// Copies B into aligned scratch, row by row, zero-padding each row to
/// `n_pad` elements.
fn pack_b(b: &[f32], n: usize, n_pad: usize) -> Result<AlignedBuffer> {
    let mut packed = AlignedBuffer::zeroed(n * n_pad)?;
    for k in 0..n {
        packed[k * n_pad..k * n_pad + n].copy_from_slice(&b[k * n..(k + 1) * n]);
    }
    Ok(packed)
}

/// Accumulates one row of A times packed B into `acc`, 8 lanes at a time.
///
/// `acc` holds the padded row of C; its pad lanes start at zero and only
/// ever accumulate zeros from padded B.
fn row_kernel(a_row: &[f32], packed_b: &AlignedBuffer, acc: &mut AlignedBuffer, n_pad: usize) {
    let acc_ptr = acc.as_mut_ptr();

    for (k, &a_ik) in a_row.iter().enumerate() {
        unsafe {
            let a_v = F32x8::splat(a_ik);
            let b_row = packed_b.as_ptr().add(k * n_pad);

            for j in (0..n_pad).step_by(LANE_COUNT) {
                let acc_v = F32x8::load_aligned(acc_ptr.add(j));
                let b_v = F32x8::load_aligned(b_row.add(j));
                acc_v.fmadd(a_v, b_v).store_aligned_at(acc_ptr.add(j));
            }
        }
    }
}

/// `C := C + A * B` for n×n row-major matrices.
///
/// Validates dimensions before touching C, like every kernel in the crate.
/// After that it fails only if the packing scratch cannot be allocated, in
/// which case C is also untouched.
pub fn gemm(a: &[f32], b: &[f32], c: &mut [f32], n: usize) -> Result<()> {
    validate(a, b, c, n)?;
    if n == 0 {
        return Ok(());
    }

    let n_pad = padded(n);
    let packed_b = pack_b(b, n, n_pad)?;

    // One padded row accumulator, reused for every row of C.
    let mut acc = AlignedBuffer::zeroed(n_pad)?;

    for i in 0..n {
        acc[..n].copy_from_slice(&c[i * n..(i + 1) * n]);
        row_kernel(&a[i * n..(i + 1) * n], &packed_b, &mut acc, n_pad);
        c[i * n..(i + 1) * n].copy_from_slice(&acc[..n]);
    }

    Ok(())
}

/// Row-parallel variant of [`gemm`]: B is packed once and shared, then the
/// rows of C are distributed across rayon tasks, each with its own padded
/// accumulator. No two tasks touch the same C element.
pub fn par_gemm(a: &[f32], b: &[f32], c: &mut [f32], n: usize) -> Result<()> {
    validate(a, b, c, n)?;
    if n == 0 {
        return Ok(());
    }

    let n_pad = padded(n);
    let packed_b = pack_b(b, n, n_pad)?;

    c.par_chunks_mut(n)
        .enumerate()
        .try_for_each(|(i, c_row)| -> Result<()> {
            let mut acc = AlignedBuffer::zeroed(n_pad)?;
            acc[..n].copy_from_slice(c_row);
            row_kernel(&a[i * n..(i + 1) * n], &packed_b, &mut acc, n_pad);
            c_row.copy_from_slice(&acc[..n]);
            Ok(())
        })
}
