//! AVX2 + FMA implementation of the packed SGEMM kernel.

pub mod f32x8;
pub mod gemm;
