use crate::basis::BasisTransformEntry;
use crate::batch::for_each_batch;
use crate::dims::{Levels, LyndonSpec};
use crate::error::{Result, SignatureError};
use crate::tensor::Tensor;
use crate::words::LyndonWords;

/// A word-to-Lyndon transform resolved against flattened signature offsets.
///
/// Applies a sparse `amount × signature_channels` matrix to the last axis
/// of a tensor, and its transpose for gradients.
#[derive(Debug, Clone)]
pub struct Compressor {
    spec: LyndonSpec,
    amount: usize,
    /// `(lyndon_index, flat word index, coefficient)`, grouped by Lyndon word.
    entries: Vec<(usize, usize, f64)>,
}

impl Compressor {
    /// Resolves `transforms` using the depth of each referenced Lyndon word.
    pub fn new(lyndon_words: &LyndonWords, transforms: &[BasisTransformEntry]) -> Result<Self> {
        let spec = lyndon_words.spec();
        let levels = Levels::new(&spec);
        let entries = transforms
            .iter()
            .map(|t| {
                let word = lyndon_words.get(t.lyndon_index).ok_or_else(|| {
                    SignatureError::ModeMismatch(format!(
                        "transform references lyndon word {} of {}",
                        t.lyndon_index,
                        lyndon_words.amount()
                    ))
                })?;
                Ok((
                    t.lyndon_index,
                    levels.offset(word.depth()) + t.word_index,
                    t.coefficient as f64,
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            spec,
            amount: lyndon_words.amount(),
            entries,
        })
    }

    pub fn spec(&self) -> LyndonSpec {
        self.spec
    }

    /// Number of Lyndon coordinates produced.
    pub fn amount(&self) -> usize {
        self.amount
    }

    /// Word coordinates `(..., C)` to Lyndon coordinates `(..., amount)`.
    pub fn compress(&self, input: &Tensor) -> Result<Tensor> {
        let channels = self.spec.signature_channels();
        let rows = leading_rows(input, channels)?;

        let mut shape = input.shape().to_vec();
        if let Some(last) = shape.last_mut() {
            *last = self.amount;
        }
        let mut out = Tensor::zeros(shape);

        let data = input.data();
        for_each_batch(out.data_mut(), self.amount, |row, chunk| {
            let words = &data[row * channels..(row + 1) * channels];
            for &(lyndon, word, coefficient) in &self.entries {
                chunk[lyndon] += coefficient * words[word];
            }
        });
        debug_assert_eq!(out.len(), rows * self.amount);
        Ok(out)
    }

    /// Transpose of [`Compressor::compress`]: `(..., amount)` to `(..., C)`.
    pub fn compress_backward(&self, grad: &Tensor) -> Result<Tensor> {
        let channels = self.spec.signature_channels();
        let rows = leading_rows(grad, self.amount)?;

        let mut shape = grad.shape().to_vec();
        if let Some(last) = shape.last_mut() {
            *last = channels;
        }
        let mut out = Tensor::zeros(shape);

        let data = grad.data();
        for_each_batch(out.data_mut(), channels, |row, chunk| {
            let upstream = &data[row * self.amount..(row + 1) * self.amount];
            for &(lyndon, word, coefficient) in &self.entries {
                chunk[word] += coefficient * upstream[lyndon];
            }
        });
        debug_assert_eq!(out.len(), rows * channels);
        Ok(out)
    }
}

/// Number of rows when `tensor`'s last axis must have size `last`.
fn leading_rows(tensor: &Tensor, last: usize) -> Result<usize> {
    match tensor.shape().split_last() {
        Some((&actual, leading)) if actual == last => Ok(leading.iter().product()),
        _ => {
            let mut expected = tensor.shape().to_vec();
            match expected.last_mut() {
                Some(slot) => *slot = last,
                None => expected.push(last),
            }
            Err(SignatureError::ShapeMismatch {
                expected,
                actual: tensor.shape().to_vec(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{assert_close, pseudo_random};

    fn bracket_compressor(alphabet: usize, depth: usize) -> Compressor {
        let mut words = LyndonWords::bracket_init(LyndonSpec::new(alphabet, depth).unwrap());
        let transforms = words.to_lyndon_basis().unwrap();
        Compressor::new(&words, &transforms).unwrap()
    }

    #[test]
    fn test_word_selection_picks_lyndon_coordinates() {
        let words = LyndonWords::word_init(LyndonSpec::new(2, 2).unwrap());
        let compressor = Compressor::new(&words, &words.word_selection()).unwrap();
        let input = Tensor::new(vec![1, 6], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let out = compressor.compress(&input).unwrap();
        // [0], [1], [0,1] -> positions 0, 1, 2 + 1
        assert_eq!(out.data(), &[1.0, 2.0, 4.0]);
        assert_eq!(out.shape(), &[1, 3]);
    }

    #[test]
    fn test_backward_of_ones_gives_column_sums() {
        let compressor = bracket_compressor(3, 4);
        let channels = compressor.spec().signature_channels();
        let ones = Tensor::new(vec![1, compressor.amount()], vec![1.0; compressor.amount()]).unwrap();
        let grad = compressor.compress_backward(&ones).unwrap();

        let mut expected = vec![0.0; channels];
        for &(_, word, coefficient) in &compressor.entries {
            expected[word] += coefficient;
        }
        assert_eq!(grad.data(), expected.as_slice());
    }

    #[test]
    fn test_adjoint_identity() {
        // <compress(x), y> == <x, compress_backward(y)>
        let compressor = bracket_compressor(3, 3);
        let channels = compressor.spec().signature_channels();
        let x = Tensor::new(vec![2, channels], pseudo_random(1, 2 * channels)).unwrap();
        let y = Tensor::new(vec![2, compressor.amount()], pseudo_random(2, 2 * compressor.amount())).unwrap();

        let cx = compressor.compress(&x).unwrap();
        let by = compressor.compress_backward(&y).unwrap();
        let lhs: f64 = cx.data().iter().zip(y.data()).map(|(a, b)| a * b).sum();
        let rhs: f64 = x.data().iter().zip(by.data()).map(|(a, b)| a * b).sum();
        assert_close(lhs, rhs, 1e-12);
    }

    #[test]
    fn test_stream_shaped_input() {
        let compressor = bracket_compressor(2, 3);
        let input = Tensor::zeros(vec![2, 5, 14]);
        let out = compressor.compress(&input).unwrap();
        assert_eq!(out.shape(), &[2, 5, 5]);
    }

    #[test]
    fn test_shape_checked() {
        let compressor = bracket_compressor(2, 2);
        assert!(matches!(
            compressor.compress(&Tensor::zeros(vec![1, 5])),
            Err(SignatureError::ShapeMismatch { .. })
        ));
        assert!(matches!(
            compressor.compress_backward(&Tensor::zeros(vec![1, 6])),
            Err(SignatureError::ShapeMismatch { .. })
        ));
    }
}
