//! Square single-precision matrix multiplication: `C := C + A * B`.
//!
//! All matrices are n×n, row-major, flat `f32` slices. The crate carries a
//! ladder of kernels over the same contract:
//!
//! - [`sgemm_naive`]: the triple-loop reference with a fixed summation
//!   order, bit-deterministic and used as the correctness oracle
//! - [`sgemm_blocked`]: cache-blocked scalar kernel
//! - [`par_sgemm`]: row-parallel kernel on rayon
//! - [`sgemm`]: dispatch entry point; uses the packed AVX2 FMA kernel when
//!   the build detected it, the blocked kernel otherwise
//!
//! Every kernel accumulates into C (zero it first for a plain product) and
//! validates dimensions before writing anything.
//!
//! ```
//! use sgemm::sgemm;
//!
//! let n = 4;
//! let a = vec![1.0f32; n * n];
//! let b = vec![2.0f32; n * n];
//! let mut c = vec![0.0f32; n * n];
//!
//! sgemm(&a, &b, &mut c, n).unwrap();
//! assert_eq!(c[0], 8.0);
//! ```

pub mod error;
pub mod gemm;
pub mod simd;
pub mod utils;

pub use error::{Result, SgemmError};
pub use gemm::{par_sgemm, sgemm, sgemm_blocked, sgemm_naive};

/// Tile edge for the cache-blocked kernel. 32×32 f32 tiles keep the three
/// working tiles (A, B, C) comfortably inside a typical L1 data cache.
pub const BLOCK: usize = 32;
