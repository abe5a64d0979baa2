//! Aligned scratch allocation for the packing kernels.
//!
//! SIMD loads and stores are fastest on 32-byte boundaries, so packed copies
//! of matrix panels live in an [`AlignedBuffer`] rather than a plain `Vec`,
//! which only guarantees the natural alignment of `f32`. Allocation is
//! fallible: a failed request surfaces as
//! [`SgemmError::AllocationError`](crate::error::SgemmError) instead of
//! aborting the process.

use std::alloc::{alloc_zeroed, dealloc, Layout};
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;

use crate::error::{allocation_error, Result};

/// Alignment used for all packing scratch, matching the AVX 256-bit width.
pub const SCRATCH_ALIGNMENT: usize = 32;

/// A heap buffer of `f32` zeros with [`SCRATCH_ALIGNMENT`]-byte alignment.
///
/// Behaves like a fixed-length slice through `Deref`/`DerefMut` and frees the
/// allocation on drop with the layout it was allocated with.
pub struct AlignedBuffer {
    ptr: NonNull<f32>,
    len: usize,
    layout: Layout,
}

impl AlignedBuffer {
    /// Allocates a zero-initialized buffer of `len` floats.
    ///
    /// A zero-length request allocates nothing and yields an empty slice.
    pub fn zeroed(len: usize) -> Result<Self> {
        let size = len * std::mem::size_of::<f32>();
        let layout = Layout::from_size_align(size, SCRATCH_ALIGNMENT)
            .map_err(|e| allocation_error(size, SCRATCH_ALIGNMENT, e.to_string()))?;

        if len == 0 {
            return Ok(AlignedBuffer {
                ptr: NonNull::dangling(),
                len: 0,
                layout,
            });
        }

        let ptr = unsafe { alloc_zeroed(layout) };
        let ptr = NonNull::new(ptr as *mut f32)
            .ok_or_else(|| allocation_error(size, SCRATCH_ALIGNMENT, "allocator returned null"))?;

        Ok(AlignedBuffer { ptr, len, layout })
    }
}

impl Deref for AlignedBuffer {
    type Target = [f32];

    fn deref(&self) -> &[f32] {
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl DerefMut for AlignedBuffer {
    fn deref_mut(&mut self) -> &mut [f32] {
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl Drop for AlignedBuffer {
    fn drop(&mut self) {
        if self.len != 0 {
            unsafe { dealloc(self.ptr.as_ptr() as *mut u8, self.layout) };
        }
    }
}

// The buffer owns its allocation; sending it across threads is sound.
unsafe impl Send for AlignedBuffer {}
unsafe impl Sync for AlignedBuffer {}
