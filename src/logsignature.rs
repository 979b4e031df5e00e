//! Log-signatures: the tensor logarithm of the signature, optionally
//! compressed onto Lyndon coordinates.

use crate::algebra::{log, log_backward};
use crate::batch::for_each_batch;
use crate::compress::Compressor;
use crate::dims::{Levels, LyndonSpec};
use crate::error::{Result, SignatureError};
use crate::signature::{
    path_dims, signature_backward, signature_forward, Basepoint, PathGradient,
    SignatureBackwardInfo,
};
use crate::tensor::Tensor;
use crate::words::LyndonWords;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// How the log-signature is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LogSignatureMode {
    /// Every word coordinate of the tensor logarithm.
    Expand,
    /// Coefficients in the Lyndon bracket basis of the free Lie algebra.
    Brackets,
    /// Coefficients of the Lyndon words in the tensor logarithm.
    #[default]
    Words,
}

impl fmt::Display for LogSignatureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogSignatureMode::Expand => "expand",
            LogSignatureMode::Brackets => "brackets",
            LogSignatureMode::Words => "words",
        };
        f.write_str(name)
    }
}

impl FromStr for LogSignatureMode {
    type Err = SignatureError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "expand" => Ok(LogSignatureMode::Expand),
            "brackets" => Ok(LogSignatureMode::Brackets),
            "words" => Ok(LogSignatureMode::Words),
            _ => Err(SignatureError::InvalidMode(s.to_string())),
        }
    }
}

/// Precomputed Lyndon data for one (alphabet, depth, mode) triple.
///
/// Immutable once built; share it behind an [`Arc`] across calls.
#[derive(Debug, Clone)]
pub struct LyndonInfo {
    spec: LyndonSpec,
    mode: LogSignatureMode,
    compressor: Option<Compressor>,
}

impl LyndonInfo {
    pub fn spec(&self) -> LyndonSpec {
        self.spec
    }

    pub fn mode(&self) -> LogSignatureMode {
        self.mode
    }

    /// Size of the last axis of a log-signature in this mode.
    pub fn output_channels(&self) -> usize {
        match &self.compressor {
            Some(compressor) => compressor.amount(),
            None => self.spec.signature_channels(),
        }
    }

    /// The compressor, absent in [`LogSignatureMode::Expand`].
    pub fn compressor(&self) -> Option<&Compressor> {
        self.compressor.as_ref()
    }

    fn check(&self, spec: LyndonSpec, mode: LogSignatureMode) -> Result<()> {
        if self.mode != mode || self.spec != spec {
            return Err(SignatureError::ModeMismatch(format!(
                "lyndon info built for mode {} with {} channels at depth {}, \
                 called with mode {} with {} channels at depth {}",
                self.mode,
                self.spec.alphabet_size(),
                self.spec.depth(),
                mode,
                spec.alphabet_size(),
                spec.depth()
            )));
        }
        Ok(())
    }
}

/// Builds the Lyndon data a log-signature in `mode` needs.
///
/// `Words` needs only the words; `Brackets` also brackets them, extracts the
/// basis transform and then drops the per-word extra info.
pub fn make_lyndon_info(
    channels: usize,
    depth: usize,
    mode: LogSignatureMode,
) -> Result<LyndonInfo> {
    let spec = LyndonSpec::new(channels, depth)?;
    let compressor = match mode {
        LogSignatureMode::Expand => None,
        LogSignatureMode::Words => {
            let words = LyndonWords::word_init(spec);
            Some(Compressor::new(&words, &words.word_selection())?)
        }
        LogSignatureMode::Brackets => {
            let mut words = LyndonWords::bracket_init(spec);
            let transforms = words.to_lyndon_basis()?;
            words.delete_extra();
            Some(Compressor::new(&words, &transforms)?)
        }
    };

    let info = LyndonInfo {
        spec,
        mode,
        compressor,
    };
    tracing::debug!(
        channels,
        depth,
        mode = %mode,
        output_channels = info.output_channels(),
        "built lyndon info"
    );
    Ok(info)
}

/// Everything [`logsignature_backward`] needs from a forward call.
#[derive(Debug, Clone)]
pub struct LogSignatureBackwardInfo {
    signature: SignatureBackwardInfo,
    lyndon_info: Arc<LyndonInfo>,
}

impl LogSignatureBackwardInfo {
    pub fn mode(&self) -> LogSignatureMode {
        self.lyndon_info.mode()
    }

    pub fn lyndon_info(&self) -> &Arc<LyndonInfo> {
        &self.lyndon_info
    }
}

/// Computes the log-signature of a batch of paths `(batch, stream, channels)`.
///
/// Pass a cached `lyndon_info` to skip rebuilding the Lyndon data; it must
/// have been made for the same channels, depth and mode.
pub fn logsignature_forward(
    path: &Tensor,
    depth: usize,
    stream: bool,
    basepoint: &Basepoint,
    mode: LogSignatureMode,
    lyndon_info: Option<Arc<LyndonInfo>>,
) -> Result<(Tensor, LogSignatureBackwardInfo)> {
    let (_, _, channels) = path_dims(path)?;
    let spec = LyndonSpec::new(channels, depth)?;
    let lyndon_info = match lyndon_info {
        Some(info) => {
            info.check(spec, mode)?;
            info
        }
        None => Arc::new(make_lyndon_info(channels, depth, mode)?),
    };

    let (signature, signature_info) = signature_forward(path, depth, stream, basepoint)?;
    tracing::trace!(mode = %mode, stream, "logsignature forward");

    let levels = Levels::new(&spec);
    let total = levels.total();
    let mut expanded = Tensor::zeros(signature.shape().to_vec());
    let sig = signature.data();
    for_each_batch(expanded.data_mut(), total, |row, chunk| {
        log(&levels, &sig[row * total..(row + 1) * total], chunk);
    });

    let out = match lyndon_info.compressor() {
        Some(compressor) => compressor.compress(&expanded)?,
        None => expanded,
    };

    let info = LogSignatureBackwardInfo {
        signature: signature_info,
        lyndon_info,
    };
    Ok((out, info))
}

/// Gradient of [`logsignature_forward`] with respect to its path (and
/// basepoint value, if one was given).
pub fn logsignature_backward(
    grad: &Tensor,
    info: &LogSignatureBackwardInfo,
) -> Result<PathGradient> {
    let signature = info.signature.signature();
    let mut expected = signature.shape().to_vec();
    if let Some(last) = expected.last_mut() {
        *last = info.lyndon_info.output_channels();
    }
    grad.expect_shape(&expected)?;

    let grad_expanded = match info.lyndon_info.compressor() {
        Some(compressor) => compressor.compress_backward(grad)?,
        None => grad.clone(),
    };

    let levels = Levels::new(&info.signature.spec());
    let total = levels.total();
    let sig = signature.data();
    let upstream = grad_expanded.data();
    let mut grad_signature = Tensor::zeros(signature.shape().to_vec());
    for_each_batch(grad_signature.data_mut(), total, |row, chunk| {
        let range = row * total..(row + 1) * total;
        log_backward(&levels, &sig[range.clone()], &upstream[range], chunk);
    });

    tracing::trace!(
        mode = %info.mode(),
        batch = info.signature.batch(),
        n_increments = info.signature.n_increments(),
        "logsignature backward"
    );
    signature_backward(&grad_signature, &info.signature)
}
