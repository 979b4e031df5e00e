//! Introspection of the Lyndon machinery, independent of any path.

use crate::basis::BasisTransformEntry;
use crate::brackets::LyndonBracket;
use crate::dims::LyndonSpec;
use crate::error::Result;
use crate::words::LyndonWords;

/// All Lyndon words up to `depth` over `channels` letters, by depth then
/// lexicographically.
pub fn lyndon_words(channels: usize, depth: usize) -> Result<Vec<Vec<usize>>> {
    let spec = LyndonSpec::new(channels, depth)?;
    let words = LyndonWords::word_init(spec);
    Ok(words.iter().map(|w| w.letters(channels)).collect())
}

/// Standard bracketing of every Lyndon word, in the order of [`lyndon_words`].
pub fn lyndon_brackets(channels: usize, depth: usize) -> Result<Vec<LyndonBracket>> {
    let spec = LyndonSpec::new(channels, depth)?;
    let words = LyndonWords::bracket_init(spec);
    Ok((0..words.amount())
        .map(|i| words.bracket(i).expect("bracketed forest has every bracket"))
        .collect())
}

/// The sparse word-to-Lyndon-bracket transform.
pub fn lyndon_words_to_basis_transform(
    channels: usize,
    depth: usize,
) -> Result<Vec<BasisTransformEntry>> {
    let spec = LyndonSpec::new(channels, depth)?;
    let mut words = LyndonWords::bracket_init(spec);
    words.to_lyndon_basis()
}

/// Dimension of a compressed log-signature: the number of Lyndon words of
/// length `1..=depth`, by Witt's necklace formula.
pub fn logsignature_channels(channels: usize, depth: usize) -> Result<usize> {
    let spec = LyndonSpec::new(channels, depth)?;
    let total = (1..=spec.depth())
        .map(|k| {
            let signed: i128 = (1..=k)
                .filter(|m| k % m == 0)
                .map(|m| mobius(m) * (spec.level_size(k / m) as i128))
                .sum();
            (signed / k as i128) as usize
        })
        .sum();
    Ok(total)
}

fn mobius(n: usize) -> i128 {
    let mut n = n;
    let mut sign = 1;
    let mut p = 2;
    while p * p <= n {
        if n % p == 0 {
            n /= p;
            if n % p == 0 {
                return 0;
            }
            sign = -sign;
        }
        p += 1;
    }
    if n > 1 {
        sign = -sign;
    }
    sign
}
