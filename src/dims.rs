use crate::error::{Result, SignatureError};

/// Alphabet size and truncation depth.
///
/// Everything about the Lyndon words and the truncated tensor algebra is a
/// deterministic function of this pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LyndonSpec {
    alphabet_size: usize,
    depth: usize,
}

impl LyndonSpec {
    /// Creates a new spec, rejecting an empty alphabet or zero depth.
    ///
    /// Also rejects pairs whose word count `alphabet_size^depth` does not
    /// fit in a `usize`.
    pub fn new(alphabet_size: usize, depth: usize) -> Result<Self> {
        if alphabet_size < 1 {
            return Err(SignatureError::InvalidSpec(format!(
                "alphabet size must be at least 1, got {alphabet_size}"
            )));
        }
        if depth < 1 {
            return Err(SignatureError::InvalidSpec(format!(
                "depth must be at least 1, got {depth}"
            )));
        }
        let spec = Self {
            alphabet_size,
            depth,
        };
        if spec.checked_total().is_none() {
            return Err(SignatureError::InvalidSpec(format!(
                "alphabet size {alphabet_size} at depth {depth} overflows the word count"
            )));
        }
        Ok(spec)
    }

    pub fn alphabet_size(&self) -> usize {
        self.alphabet_size
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Number of words of exactly length `k`.
    pub fn level_size(&self, k: usize) -> usize {
        self.alphabet_size.pow(k as u32)
    }

    /// Total number of words of length `1..=depth`.
    pub fn signature_channels(&self) -> usize {
        // Validated in `new`.
        self.checked_total().unwrap_or(usize::MAX)
    }

    fn checked_total(&self) -> Option<usize> {
        let mut total = 0usize;
        let mut level = 1usize;
        for _ in 0..self.depth {
            level = level.checked_mul(self.alphabet_size)?;
            total = total.checked_add(level)?;
        }
        Some(total)
    }
}

/// Level layout of a flattened truncated tensor-algebra element.
///
/// Level `k` (1-based) occupies `offsets[k-1]..offsets[k]`, with words in
/// row-major base-`channels` order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Levels {
    pub channels: usize,
    pub depth: usize,
    offsets: Vec<usize>,
}

impl Levels {
    pub(crate) fn new(spec: &LyndonSpec) -> Self {
        let mut offsets = Vec::with_capacity(spec.depth() + 1);
        offsets.push(0);
        let mut acc = 0;
        for k in 1..=spec.depth() {
            acc += spec.level_size(k);
            offsets.push(acc);
        }
        Self {
            channels: spec.alphabet_size(),
            depth: spec.depth(),
            offsets,
        }
    }

    #[inline]
    pub(crate) fn total(&self) -> usize {
        self.offsets[self.depth]
    }

    #[inline]
    pub(crate) fn offset(&self, k: usize) -> usize {
        self.offsets[k - 1]
    }

    #[inline]
    pub(crate) fn size(&self, k: usize) -> usize {
        self.offsets[k] - self.offsets[k - 1]
    }

    #[inline]
    pub(crate) fn range(&self, k: usize) -> std::ops::Range<usize> {
        self.offsets[k - 1]..self.offsets[k]
    }
}

/// Position of `word` among all words of its length, in lexicographic order.
pub(crate) fn word_index(word: &[usize], alphabet_size: usize) -> usize {
    word.iter().fold(0, |acc, &letter| acc * alphabet_size + letter)
}

/// Inverse of [`word_index`] for a word of length `depth`.
pub(crate) fn word_letters(index: usize, depth: usize, alphabet_size: usize) -> Vec<usize> {
    let mut letters = vec![0; depth];
    let mut rest = index;
    for slot in letters.iter_mut().rev() {
        *slot = rest % alphabet_size;
        rest /= alphabet_size;
    }
    letters
}

/// Dimension of the truncated signature for `channels` and `depth`.
pub fn signature_channels(channels: usize, depth: usize) -> Result<usize> {
    Ok(LyndonSpec::new(channels, depth)?.signature_channels())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_invalid() {
        assert!(matches!(
            LyndonSpec::new(0, 2),
            Err(SignatureError::InvalidSpec(_))
        ));
        assert!(matches!(
            LyndonSpec::new(2, 0),
            Err(SignatureError::InvalidSpec(_))
        ));
        assert!(LyndonSpec::new(usize::MAX, 3).is_err());
    }

    #[test]
    fn test_signature_channels() {
        assert_eq!(signature_channels(2, 2).unwrap(), 6);
        assert_eq!(signature_channels(3, 3).unwrap(), 3 + 9 + 27);
        assert_eq!(signature_channels(1, 4).unwrap(), 4);
    }

    #[test]
    fn test_levels_layout() {
        let levels = Levels::new(&LyndonSpec::new(3, 3).unwrap());
        assert_eq!(levels.offset(1), 0);
        assert_eq!(levels.offset(2), 3);
        assert_eq!(levels.offset(3), 12);
        assert_eq!(levels.size(3), 27);
        assert_eq!(levels.total(), 39);
        assert_eq!(levels.range(2), 3..12);
    }

    #[test]
    fn test_word_index_roundtrip() {
        assert_eq!(word_index(&[0, 1], 2), 1);
        assert_eq!(word_index(&[1, 0, 1], 2), 5);
        assert_eq!(word_letters(5, 3, 2), vec![1, 0, 1]);
        assert_eq!(word_letters(0, 2, 4), vec![0, 0]);
    }
}
