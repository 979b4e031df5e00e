use crate::compress::Compressor;
use crate::dims::{word_index, Levels, LyndonSpec};
use crate::logsignature::{logsignature_forward, LogSignatureMode};
use crate::signature::Basepoint;
use crate::tensor::Tensor;
use crate::utilities::lyndon_words_to_basis_transform;
use crate::words::LyndonWords;
use proptest::prelude::*;

/// (channels, depth, path with five points)
fn path_strategy() -> impl Strategy<Value = (usize, usize, Vec<f64>)> {
    (2usize..=3, 1usize..=4).prop_flat_map(|(channels, depth)| {
        (
            Just(channels),
            Just(depth),
            prop::collection::vec(-1.0f64..1.0, 5 * channels),
        )
    })
}

fn logsignature(channels: usize, depth: usize, points: &[f64], mode: LogSignatureMode) -> Vec<f64> {
    let path = Tensor::new(vec![1, points.len() / channels, channels], points.to_vec()).unwrap();
    let (out, _) = logsignature_forward(&path, depth, false, &Basepoint::None, mode, None).unwrap();
    out.into_data()
}

proptest! {
    /// Bracket coefficients, re-expanded through each bracket's word
    /// expansion, rebuild the full tensor logarithm.
    #[test]
    fn prop_brackets_rebuild_expanded_log((channels, depth, points) in path_strategy()) {
        let expanded = logsignature(channels, depth, &points, LogSignatureMode::Expand);
        let brackets = logsignature(channels, depth, &points, LogSignatureMode::Brackets);

        let spec = LyndonSpec::new(channels, depth).unwrap();
        let levels = Levels::new(&spec);
        let mut forest = LyndonWords::bracket_init(spec);
        forest.to_lyndon_basis().unwrap();

        let mut rebuilt = vec![0.0; levels.total()];
        for word in &forest {
            let coefficient = brackets[word.compressed_index];
            for (letters, &c) in forest.expansion(word.compressed_index).unwrap() {
                let at = levels.offset(letters.len()) + word_index(letters, channels);
                rebuilt[at] += coefficient * c as f64;
            }
        }

        for (r, e) in rebuilt.iter().zip(&expanded) {
            prop_assert!((r - e).abs() < 1e-9, "rebuilt {} vs expanded {}", r, e);
        }
    }

    /// Word mode reads the tensor logarithm at the Lyndon words.
    #[test]
    fn prop_words_select_from_expanded((channels, depth, points) in path_strategy()) {
        let expanded = logsignature(channels, depth, &points, LogSignatureMode::Expand);
        let words = logsignature(channels, depth, &points, LogSignatureMode::Words);

        let spec = LyndonSpec::new(channels, depth).unwrap();
        let levels = Levels::new(&spec);
        let forest = LyndonWords::word_init(spec);
        for word in &forest {
            let at = levels.offset(word.depth()) + word.tensor_algebra_index;
            prop_assert_eq!(words[word.compressed_index], expanded[at]);
        }
    }

    /// Both compressed modes agree on the first two levels, where the
    /// bracket basis and the word coordinates coincide.
    #[test]
    fn prop_low_levels_agree((channels, depth, points) in path_strategy()) {
        let words = logsignature(channels, depth, &points, LogSignatureMode::Words);
        let brackets = logsignature(channels, depth, &points, LogSignatureMode::Brackets);
        let low = channels + if depth >= 2 { channels * (channels - 1) / 2 } else { 0 };
        for i in 0..low {
            prop_assert!((words[i] - brackets[i]).abs() < 1e-12);
        }
    }
}

#[test]
fn test_compress_backward_of_ones_sums_transform() {
    for (channels, depth) in [(2, 4), (3, 3), (3, 4)] {
        let spec = LyndonSpec::new(channels, depth).unwrap();
        let levels = Levels::new(&spec);
        let transforms = lyndon_words_to_basis_transform(channels, depth).unwrap();
        let forest = LyndonWords::word_init(spec);
        let compressor = Compressor::new(&forest, &transforms).unwrap();

        let ones = Tensor::new(vec![1, forest.amount()], vec![1.0; forest.amount()]).unwrap();
        let grad = compressor.compress_backward(&ones).unwrap();

        let mut expected = vec![0.0; levels.total()];
        for t in &transforms {
            let depth = forest.get(t.lyndon_index).unwrap().depth();
            expected[levels.offset(depth) + t.word_index] += t.coefficient as f64;
        }
        assert_eq!(grad.data(), expected.as_slice());
    }
}
