//! SIMD kernel implementations, gated on the CPU features the build script
//! detected. Builds without a detected feature compile none of these and the
//! dispatcher falls back to the scalar blocked kernel.

#[cfg(avx2)]
pub mod avx2;
