//! Truncated path signatures and their gradients.
//!
//! The signature of a piecewise linear path is the truncated tensor product
//! of the exponentials of its increments (Chen's identity), folded strictly
//! left to right. The backward pass walks the fold in reverse, recovering
//! each earlier prefix either from the stored stream or, when only the final
//! signature was kept, by multiplying with `exp(-Δ)`.

use crate::algebra::{group_mult, group_mult_backward, restricted_exp, restricted_exp_backward};
use crate::batch::{for_each_batch, for_each_batch_pair};
use crate::dims::{Levels, LyndonSpec};
use crate::error::{Result, SignatureError};
use crate::tensor::Tensor;

/// Optional point prepended to every path before taking increments.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Basepoint {
    /// Use the path as given.
    #[default]
    None,
    /// Prepend the origin.
    Zero,
    /// Prepend a per-batch point of shape `(batch, channels)`.
    Value(Tensor),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BasepointKind {
    None,
    Zero,
    Value,
}

/// Everything the backward pass needs to replay a forward call.
///
/// Hand it back unchanged to [`signature_backward`].
#[derive(Debug, Clone)]
pub struct SignatureBackwardInfo {
    spec: LyndonSpec,
    stream: bool,
    basepoint: BasepointKind,
    batch: usize,
    stream_len: usize,
    n_increments: usize,
    /// `(batch, n_increments, channels)`
    increments: Vec<f64>,
    signature: Tensor,
}

impl SignatureBackwardInfo {
    pub fn spec(&self) -> LyndonSpec {
        self.spec
    }

    pub fn stream(&self) -> bool {
        self.stream
    }

    /// The forward output.
    pub fn signature(&self) -> &Tensor {
        &self.signature
    }

    pub(crate) fn n_increments(&self) -> usize {
        self.n_increments
    }

    pub(crate) fn batch(&self) -> usize {
        self.batch
    }
}

/// Gradients with respect to the inputs of a forward call.
#[derive(Debug, Clone, PartialEq)]
pub struct PathGradient {
    /// Same shape as the path.
    pub path: Tensor,
    /// Present only when a [`Basepoint::Value`] was supplied.
    pub basepoint: Option<Tensor>,
}

/// Output shape of a signature-like tensor with `channels` per position.
pub(crate) fn output_shape(batch: usize, n_increments: usize, stream: bool, channels: usize) -> Vec<usize> {
    if stream {
        vec![batch, n_increments, channels]
    } else {
        vec![batch, channels]
    }
}

/// Computes the signature of a batch of paths of shape
/// `(batch, stream, channels)`.
///
/// Returns `(batch, C)`, or `(batch, n_increments, C)` with every prefix
/// signature when `stream` is set, where `C = signature_channels(channels,
/// depth)`.
pub fn signature_forward(
    path: &Tensor,
    depth: usize,
    stream: bool,
    basepoint: &Basepoint,
) -> Result<(Tensor, SignatureBackwardInfo)> {
    let (batch, stream_len, channels) = path_dims(path)?;
    let spec = LyndonSpec::new(channels, depth)?;
    let kind = check_basepoint(basepoint, batch, channels)?;
    let (increments, n) = increments(path, basepoint, batch, stream_len, channels)?;

    tracing::trace!(batch, stream_len, channels, depth, stream, "signature forward");
    if channels == 1 {
        tracing::debug!("single channel path: signature reduces to moments of the increment sum");
    }

    let levels = Levels::new(&spec);
    let total = levels.total();
    let shape = output_shape(batch, n, stream, total);
    let mut out = Tensor::zeros(shape);

    let per_batch = if stream { n * total } else { total };
    for_each_batch(out.data_mut(), per_batch, |b, chunk| {
        let inc = &increments[b * n * channels..(b + 1) * n * channels];
        signature_single(&levels, inc, stream, chunk);
    });

    let info = SignatureBackwardInfo {
        spec,
        stream,
        basepoint: kind,
        batch,
        stream_len,
        n_increments: n,
        increments,
        signature: out.clone(),
    };
    Ok((out, info))
}

/// Gradient of [`signature_forward`] given the gradient of its output.
///
/// Leaves `info` untouched; use [`signature_backward_owned`] to replay in
/// the stored buffer instead of a copy.
pub fn signature_backward(grad: &Tensor, info: &SignatureBackwardInfo) -> Result<PathGradient> {
    grad.expect_shape(info.signature.shape())?;
    let mut workspace = info.signature.data().to_vec();
    backward(grad, info, &mut workspace)
}

/// Consuming variant of [`signature_backward`] that reuses the stored
/// signature as its workspace.
pub fn signature_backward_owned(
    grad: &Tensor,
    mut info: SignatureBackwardInfo,
) -> Result<PathGradient> {
    grad.expect_shape(info.signature.shape())?;
    let mut workspace = std::mem::replace(&mut info.signature, Tensor::zeros(vec![0])).into_data();
    backward(grad, &info, &mut workspace)
}

/// Chen's identity for two batches of signatures of shape `(batch, C)`:
/// the signature of the concatenated paths.
pub fn signature_combine(
    first: &Tensor,
    second: &Tensor,
    channels: usize,
    depth: usize,
) -> Result<Tensor> {
    let spec = LyndonSpec::new(channels, depth)?;
    let levels = Levels::new(&spec);
    let total = levels.total();
    let batch = first.shape().first().copied().unwrap_or(0);
    first.expect_shape(&[batch, total])?;
    second.expect_shape(&[batch, total])?;

    let mut out = first.clone();
    for_each_batch(out.data_mut(), total, |b, chunk| {
        group_mult(&levels, chunk, &second.data()[b * total..(b + 1) * total]);
    });
    Ok(out)
}

pub(crate) fn path_dims(path: &Tensor) -> Result<(usize, usize, usize)> {
    match path.shape() {
        &[batch, stream_len, channels] => Ok((batch, stream_len, channels)),
        _ => Err(SignatureError::InvalidSpec(format!(
            "path must have shape (batch, stream, channels), got {:?}",
            path.shape()
        ))),
    }
}

fn check_basepoint(basepoint: &Basepoint, batch: usize, channels: usize) -> Result<BasepointKind> {
    match basepoint {
        Basepoint::None => Ok(BasepointKind::None),
        Basepoint::Zero => Ok(BasepointKind::Zero),
        Basepoint::Value(value) => {
            value.expect_shape(&[batch, channels])?;
            Ok(BasepointKind::Value)
        }
    }
}

/// Increments of every path, `(batch, n_increments, channels)` flattened,
/// together with `n_increments`.
fn increments(
    path: &Tensor,
    basepoint: &Basepoint,
    batch: usize,
    stream_len: usize,
    channels: usize,
) -> Result<(Vec<f64>, usize)> {
    let has_basepoint = !matches!(basepoint, Basepoint::None);
    let points = stream_len + usize::from(has_basepoint);
    if points < 2 {
        return Err(SignatureError::EmptyPath);
    }
    let n = points - 1;

    let data = path.data();
    let mut out = Vec::with_capacity(batch * n * channels);
    for b in 0..batch {
        let rows = &data[b * stream_len * channels..(b + 1) * stream_len * channels];
        let start = match basepoint {
            Basepoint::None => None,
            Basepoint::Zero => Some(vec![0.0; channels]),
            Basepoint::Value(value) => {
                Some(value.data()[b * channels..(b + 1) * channels].to_vec())
            }
        };
        if let Some(start) = start {
            out.extend(rows[..channels].iter().zip(&start).map(|(p, s)| p - s));
        }
        for t in 1..stream_len {
            let (prev, next) = (&rows[(t - 1) * channels..t * channels], &rows[t * channels..(t + 1) * channels]);
            out.extend(next.iter().zip(prev).map(|(x, y)| x - y));
        }
    }
    Ok((out, n))
}

/// Folds the increment exponentials of one path into `out`.
fn signature_single(levels: &Levels, increments: &[f64], stream: bool, out: &mut [f64]) {
    let c = levels.channels;
    let total = levels.total();
    let n = increments.len() / c;

    let mut current = vec![0.0; total];
    let mut exp = vec![0.0; total];
    restricted_exp(levels, &increments[..c], &mut current);
    if stream {
        out[..total].copy_from_slice(&current);
    }

    for i in 1..n {
        restricted_exp(levels, &increments[i * c..(i + 1) * c], &mut exp);
        group_mult(levels, &mut current, &exp);
        if stream {
            out[i * total..(i + 1) * total].copy_from_slice(&current);
        }
    }

    if !stream {
        out.copy_from_slice(&current);
    }
}

fn backward(grad: &Tensor, info: &SignatureBackwardInfo, workspace: &mut [f64]) -> Result<PathGradient> {
    let spec = info.spec;
    let levels = Levels::new(&spec);
    let c = spec.alphabet_size();
    let total = levels.total();
    let n = info.n_increments();
    let batch = info.batch;

    tracing::trace!(batch, n_increments = n, channels = c, stream = info.stream, "signature backward");

    let per_batch = if info.stream { n * total } else { total };
    let mut grad_increments = vec![0.0; batch * n * c];
    for_each_batch_pair(workspace, per_batch, &mut grad_increments, n * c, |b, sig, grad_inc| {
        let inc = &info.increments[b * n * c..(b + 1) * n * c];
        let g = &grad.data()[b * per_batch..(b + 1) * per_batch];
        signature_backward_single(&levels, inc, sig, g, info.stream, grad_inc);
    });

    Ok(scatter_increments(info, &grad_increments))
}

/// Reverses the fold of one path, writing the gradient of each increment.
///
/// `sig` holds every prefix signature when `stream` is set, otherwise just
/// the final one, which is overwritten while replaying.
fn signature_backward_single(
    levels: &Levels,
    increments: &[f64],
    sig: &mut [f64],
    grad: &[f64],
    stream: bool,
    grad_increments: &mut [f64],
) {
    let c = levels.channels;
    let total = levels.total();
    let n = increments.len() / c;

    let mut exp = vec![0.0; total];
    let mut inverse = vec![0.0; total];
    let mut negated = vec![0.0; c];
    let mut grad_current = grad[grad.len() - total..].to_vec();
    let mut grad_prev = vec![0.0; total];
    let mut grad_exp = vec![0.0; total];

    for i in (1..n).rev() {
        let dx = &increments[i * c..(i + 1) * c];
        restricted_exp(levels, dx, &mut exp);
        if !stream {
            for (neg, &d) in negated.iter_mut().zip(dx) {
                *neg = -d;
            }
            restricted_exp(levels, &negated, &mut inverse);
            group_mult(levels, &mut sig[..total], &inverse);
        }
        let prev = if stream {
            &sig[(i - 1) * total..i * total]
        } else {
            &sig[..total]
        };

        grad_prev.fill(0.0);
        grad_exp.fill(0.0);
        group_mult_backward(levels, prev, &exp, &grad_current, &mut grad_prev, &mut grad_exp);
        restricted_exp_backward(levels, dx, &exp, &mut grad_exp, &mut grad_increments[i * c..(i + 1) * c]);

        std::mem::swap(&mut grad_current, &mut grad_prev);
        if stream {
            for (gc, &g) in grad_current.iter_mut().zip(&grad[(i - 1) * total..i * total]) {
                *gc += g;
            }
        }
    }

    let dx = &increments[..c];
    restricted_exp(levels, dx, &mut exp);
    restricted_exp_backward(levels, dx, &exp, &mut grad_current, &mut grad_increments[..c]);
}

/// Turns increment gradients into point gradients.
fn scatter_increments(info: &SignatureBackwardInfo, grad_increments: &[f64]) -> PathGradient {
    let c = info.spec.alphabet_size();
    let n = info.n_increments();
    let (batch, stream_len) = (info.batch, info.stream_len);
    let has_basepoint = info.basepoint != BasepointKind::None;
    let points = stream_len + usize::from(has_basepoint);

    let mut path = Tensor::zeros(vec![batch, stream_len, c]);
    let mut basepoint = (info.basepoint == BasepointKind::Value).then(|| Tensor::zeros(vec![batch, c]));

    let mut grad_points = vec![0.0; points * c];
    for b in 0..batch {
        grad_points.fill(0.0);
        let g = &grad_increments[b * n * c..(b + 1) * n * c];
        for i in 0..n {
            for j in 0..c {
                grad_points[(i + 1) * c + j] += g[i * c + j];
                grad_points[i * c + j] -= g[i * c + j];
            }
        }

        let skip = if has_basepoint { c } else { 0 };
        path.data_mut()[b * stream_len * c..(b + 1) * stream_len * c]
            .copy_from_slice(&grad_points[skip..]);
        if let Some(bp) = basepoint.as_mut() {
            bp.data_mut()[b * c..(b + 1) * c].copy_from_slice(&grad_points[..c]);
        }
    }

    PathGradient { path, basepoint }
}
