//! Error types for signature and log-signature computation.
//!
//! Every failure is detected before any numeric work starts and is reported
//! synchronously; no operation returns a partial result.

use thiserror::Error;

/// Errors reported by the signature engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    /// Alphabet size or depth below one, or a channel count that disagrees
    /// with the path.
    #[error("invalid specification: {0}")]
    InvalidSpec(String),

    /// Unrecognised log-signature mode.
    #[error("invalid log-signature mode: {0}")]
    InvalidMode(String),

    /// Cached Lyndon info built for a different mode or alphabet/depth pair.
    #[error("lyndon info mismatch: {0}")]
    ModeMismatch(String),

    /// A buffer does not have the shape its forward counterpart implies.
    #[error("shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// The path (with its basepoint, if any) has no increments.
    #[error("path has no increments: need at least two points, or one point and a basepoint")]
    EmptyPath,
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SignatureError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_mismatch_message() {
        let err = SignatureError::ShapeMismatch {
            expected: vec![2, 6],
            actual: vec![2, 5],
        };
        assert_eq!(
            err.to_string(),
            "shape mismatch: expected [2, 6], got [2, 5]"
        );
    }

    #[test]
    fn test_errors_compare() {
        assert_eq!(SignatureError::EmptyPath, SignatureError::EmptyPath);
        assert_ne!(
            SignatureError::InvalidMode("x".into()),
            SignatureError::ModeMismatch("x".into())
        );
    }
}
