//! # Signatory - Path Signatures and Log-Signatures
//!
//! Computes truncated signatures and log-signatures of discretised paths,
//! together with their gradients.
//!
//! The signature of a path in `ℝ^c` is the sequence of its iterated
//! integrals, an element of the truncated tensor algebra indexed by words
//! over `c` letters. The log-signature is its tensor logarithm, a Lie
//! element, which is stored compactly against the Lyndon words:
//! 1. **Lyndon words** are generated with Duval's algorithm
//! 2. **Standard bracketing** splits each one into two shorter Lyndon words
//! 3. **Basis transform** maps word coordinates onto the Lyndon bracket basis
//!
//! ## Example
//!
//! ```
//! use signatory_rs::{logsignature_forward, signature_forward, Basepoint, LogSignatureMode, Tensor};
//!
//! // One path, two points, two channels: a straight line from (0,0) to (1,1)
//! let path = Tensor::new(vec![1, 2, 2], vec![0.0, 0.0, 1.0, 1.0]).unwrap();
//!
//! let (sig, _) = signature_forward(&path, 2, false, &Basepoint::None).unwrap();
//! assert_eq!(sig.data(), &[1.0, 1.0, 0.5, 0.5, 0.5, 0.5]);
//!
//! let (logsig, _) =
//!     logsignature_forward(&path, 2, false, &Basepoint::None, LogSignatureMode::Words, None).unwrap();
//! assert_eq!(logsig.shape(), &[1, 3]);
//! ```
//!
//! ## Performance
//!
//! - Lyndon data depends only on (channels, depth, mode); build it once with
//!   [`make_lyndon_info`] or [`LyndonInfoCache`] and pass it back in
//! - Each batch element is an independent unit of work; enable the `rayon`
//!   feature to process them in parallel

mod algebra;
mod basis;
mod batch;
mod brackets;
mod cache;
mod compress;
mod dims;
mod error;
mod logsignature;
mod signature;
mod tensor;
mod utilities;
mod words;

#[cfg(test)]
mod tests;

pub use basis::BasisTransformEntry;
pub use brackets::LyndonBracket;
pub use cache::LyndonInfoCache;
pub use compress::Compressor;
pub use dims::{signature_channels, LyndonSpec};
pub use error::{Result, SignatureError};
pub use logsignature::{
    logsignature_backward, logsignature_forward, make_lyndon_info, LogSignatureBackwardInfo,
    LogSignatureMode, LyndonInfo,
};
pub use signature::{
    signature_backward, signature_backward_owned, signature_combine, signature_forward, Basepoint,
    PathGradient, SignatureBackwardInfo,
};
pub use tensor::Tensor;
pub use utilities::{
    logsignature_channels, lyndon_brackets, lyndon_words, lyndon_words_to_basis_transform,
};
pub use words::{AnagramKey, ExtraInfo, LyndonWord, LyndonWords};
