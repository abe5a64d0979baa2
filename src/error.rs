//! Error types for sgemm kernels.
//!
//! Dimension problems are reported before any element of C is written, so a
//! failed call never leaves the output matrix partially updated.

use std::fmt;

/// Errors that can occur during an sgemm call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SgemmError {
    /// The matrix slices do not all hold `n * n` elements.
    InvalidDimension {
        /// The dimension `n` the caller passed.
        n: usize,
        /// Actual length of the A slice.
        a_len: usize,
        /// Actual length of the B slice.
        b_len: usize,
        /// Actual length of the C slice.
        c_len: usize,
        /// Human-readable error message.
        message: String,
    },
    /// Allocating packing scratch for an optimized kernel failed.
    AllocationError {
        /// The size that was requested to be allocated, in bytes.
        requested_size: usize,
        /// The alignment that was requested.
        requested_alignment: usize,
        /// Human-readable error message.
        message: String,
    },
}

impl fmt::Display for SgemmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SgemmError::InvalidDimension {
                n,
                a_len,
                b_len,
                c_len,
                message,
            } => write!(
                f,
                "Invalid matrix dimensions: {} (n = {}, |A| = {}, |B| = {}, |C| = {}, expected {} each)",
                message,
                n,
                a_len,
                b_len,
                c_len,
                n * n
            ),
            SgemmError::AllocationError {
                requested_size,
                requested_alignment,
                message,
            } => write!(
                f,
                "Scratch allocation failed: {} (requested {} bytes with {} byte alignment)",
                message, requested_size, requested_alignment
            ),
        }
    }
}

impl std::error::Error for SgemmError {}

/// Result type alias for sgemm operations.
pub type Result<T> = std::result::Result<T, SgemmError>;

/// Creates a dimension error.
pub fn invalid_dimension(
    n: usize,
    a_len: usize,
    b_len: usize,
    c_len: usize,
    message: impl Into<String>,
) -> SgemmError {
    SgemmError::InvalidDimension {
        n,
        a_len,
        b_len,
        c_len,
        message: message.into(),
    }
}

/// Creates an allocation error.
pub fn allocation_error(size: usize, alignment: usize, message: impl Into<String>) -> SgemmError {
    SgemmError::AllocationError {
        requested_size: size,
        requested_alignment: alignment,
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_dimension_display() {
        let error = invalid_dimension(3, 9, 16, 9, "B is not 3x3");
        let display = format!("{}", error);
        assert!(display.contains("Invalid matrix dimensions"));
        assert!(display.contains("n = 3"));
        assert!(display.contains("|B| = 16"));
        assert!(display.contains("expected 9 each"));
        assert!(display.contains("B is not 3x3"));
    }

    #[test]
    fn test_allocation_error_display() {
        let error = allocation_error(2048, 32, "out of memory");
        let display = format!("{}", error);
        assert!(display.contains("Scratch allocation failed"));
        assert!(display.contains("2048 bytes"));
        assert!(display.contains("32 byte alignment"));
        assert!(display.contains("out of memory"));
    }

    #[test]
    fn test_error_equality() {
        let error1 = invalid_dimension(4, 16, 16, 15, "C too short");
        let error2 = invalid_dimension(4, 16, 16, 15, "C too short");
        let error3 = invalid_dimension(4, 16, 16, 12, "C too short");

        assert_eq!(error1, error2);
        assert_ne!(error1, error3);
    }

    #[test]
    fn test_error_trait_implementation() {
        let error = allocation_error(1024, 32, "test error");

        let _: &dyn std::error::Error = &error;
        assert!(std::error::Error::source(&error).is_none());
    }
}
