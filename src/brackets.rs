use crate::dims::LyndonSpec;
use crate::words::{duval, LyndonWords};
use ahash::AHashMap as HashMap;
use std::fmt;

/// A Lyndon word written as its standard bracketing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LyndonBracket {
    /// A single letter.
    Letter(usize),
    /// The Lie bracket `[first, second]`.
    Bracket(Box<LyndonBracket>, Box<LyndonBracket>),
}

impl LyndonBracket {
    /// Letters of the bracketed word, left to right.
    pub fn letters(&self) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            match node {
                LyndonBracket::Letter(letter) => out.push(*letter),
                LyndonBracket::Bracket(first, second) => {
                    stack.push(second);
                    stack.push(first);
                }
            }
        }
        out
    }
}

impl fmt::Display for LyndonBracket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LyndonBracket::Letter(letter) => write!(f, "{letter}"),
            LyndonBracket::Bracket(first, second) => write!(f, "[{first},{second}]"),
        }
    }
}

impl LyndonWords {
    /// Generates Lyndon words together with their standard bracketing.
    ///
    /// Every word carries [`ExtraInfo`](crate::ExtraInfo) with its letters and,
    /// above depth one, the compressed indices of the two children of its
    /// standard factorization. Call [`LyndonWords::delete_extra`] once the
    /// brackets are no longer needed.
    pub fn bracket_init(spec: LyndonSpec) -> Self {
        let mut forest = Self::from_depth_groups(spec, duval(&spec), true);

        let mut known: HashMap<Vec<usize>, usize> = HashMap::default();
        for word in &forest.words {
            if word.depth == 1 {
                known.insert(word.letters(spec.alphabet_size()), word.compressed_index);
            }
        }

        // Depth ascending, so both halves of any split are already known
        for depth in 2..=spec.depth() {
            let range = forest.depth_starts[depth - 1]..forest.depth_starts[depth];
            for index in range {
                let letters = forest.words[index].letters(spec.alphabet_size());
                let children = standard_factorization(&letters, &known);
                if let Some(extra) = forest.words[index].extra.as_mut() {
                    extra.children = Some(children);
                }
                known.insert(letters, index);
            }
        }

        forest
    }

    /// Builds the bracket tree of the word at `compressed_index`.
    ///
    /// Returns `None` if the index is out of range or the forest was not
    /// bracketed (or its extra info has been released).
    pub fn bracket(&self, compressed_index: usize) -> Option<LyndonBracket> {
        let extra = self.words.get(compressed_index)?.extra.as_ref()?;
        match extra.children {
            None => Some(LyndonBracket::Letter(*extra.word.first()?)),
            Some((first, second)) => Some(LyndonBracket::Bracket(
                Box::new(self.bracket(first)?),
                Box::new(self.bracket(second)?),
            )),
        }
    }
}

/// Splits a Lyndon word `w = uv` where `v` is its longest proper Lyndon
/// suffix; `u` is then Lyndon as well.
///
/// `known` maps every shorter Lyndon word to its compressed index.
fn standard_factorization(
    letters: &[usize],
    known: &HashMap<Vec<usize>, usize>,
) -> (usize, usize) {
    (1..letters.len())
        .find_map(|split| {
            let second = known.get(&letters[split..])?;
            let first = known.get(&letters[..split])?;
            Some((*first, *second))
        })
        .expect("Lyndon word of depth > 1 must have a standard factorization")
}
