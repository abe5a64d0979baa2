//! AVX2 8-lane f32 vector wrapper.
//!
//! Thin wrapper over the `__m256` intrinsic carrying just the operations the
//! SGEMM kernel needs: broadcast, aligned load/store and fused multiply-add.
//! The kernel pads its buffers to full lane multiples, so there are no
//! partial-vector paths here.
//!
//! # Requirements
//!
//! Compiled only when the build script detected AVX2 and FMA on the host and
//! enabled them via `-C target-feature`; every method assumes those
//! instructions are available, which is why they are `unsafe`.

#[cfg(target_arch = "x86")]
use std::arch::x86::*;

#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

/// AVX2 memory alignment requirement in bytes.
pub const AVX_ALIGNMENT: usize = 32;

/// Number of f32 elements in a 256-bit AVX2 vector.
pub const LANE_COUNT: usize = 8;

/// AVX2 SIMD vector of 8 packed f32 values.
#[derive(Copy, Clone, Debug)]
pub struct F32x8 {
    elements: __m256,
}

impl F32x8 {
    /// Broadcasts a single value into all 8 lanes.
    ///
    /// # Safety
    ///
    /// Requires AVX2 support at runtime.
    #[inline(always)]
    pub unsafe fn splat(value: f32) -> Self {
        F32x8 {
            elements: _mm256_set1_ps(value),
        }
    }

    /// Loads 8 floats from a 32-byte-aligned pointer.
    ///
    /// # Safety
    ///
    /// `ptr` must be aligned to [`AVX_ALIGNMENT`] and valid for reading
    /// [`LANE_COUNT`] floats.
    #[inline(always)]
    pub unsafe fn load_aligned(ptr: *const f32) -> Self {
        debug_assert!(
            ptr as usize % AVX_ALIGNMENT == 0,
            "pointer must be 32-byte aligned"
        );
        F32x8 {
            elements: _mm256_load_ps(ptr),
        }
    }

    /// Stores the 8 lanes to a 32-byte-aligned pointer.
    ///
    /// # Safety
    ///
    /// `ptr` must be aligned to [`AVX_ALIGNMENT`] and valid for writing
    /// [`LANE_COUNT`] floats.
    #[inline(always)]
    pub unsafe fn store_aligned_at(self, ptr: *mut f32) {
        debug_assert!(
            ptr as usize % AVX_ALIGNMENT == 0,
            "pointer must be 32-byte aligned"
        );
        _mm256_store_ps(ptr, self.elements);
    }

    /// Fused multiply-add: returns `self + a * b` per lane.
    ///
    /// The multiply and add round once, not twice, so results can differ
    /// from separate mul/add in the last bit.
    ///
    /// # Safety
    ///
    /// Requires FMA support at runtime.
    #[inline(always)]
    pub unsafe fn fmadd(self, a: Self, b: Self) -> Self {
        F32x8 {
            elements: _mm256_fmadd_ps(a.elements, b.elements, self.elements),
        }
    }
}
