//! Lyndon words and the arena that owns them.
//!
//! A [`LyndonWords`] forest stores every Lyndon word up to the truncation
//! depth in one contiguous vector, ordered first by depth and then
//! lexicographically. Bracketing links between words are plain indices into
//! that vector, so the forest is freely shareable once built.

use crate::dims::{word_index, word_letters, LyndonSpec};
use ahash::AHashMap as HashMap;
use slotmap::SlotMap;

slotmap::new_key_type! {
    /// Handle to an anagram class stored in a [`LyndonWords`] forest.
    pub struct AnagramKey;
}

/// Data attached to a word by bracket initialisation.
///
/// Released as a group by [`LyndonWords::delete_extra`].
#[derive(Debug, Clone)]
pub struct ExtraInfo {
    /// The literal letters of the word.
    pub(crate) word: Vec<usize>,
    /// Compressed indices of the standard factorization `[u, v]`; `None`
    /// for single letters.
    pub(crate) children: Option<(usize, usize)>,
    /// Anagram class this word belongs to, once assigned.
    pub(crate) anagram_class: Option<AnagramKey>,
    /// Position of this word inside its anagram class.
    pub(crate) anagram_limit: usize,
    /// Signed expansion of the bracket over words of the same length.
    pub(crate) expansion: HashMap<Vec<usize>, i64>,
}

impl ExtraInfo {
    pub(crate) fn new(word: Vec<usize>, children: Option<(usize, usize)>) -> Self {
        Self {
            word,
            children,
            anagram_class: None,
            anagram_limit: 0,
            expansion: HashMap::default(),
        }
    }

    /// Letters of the word.
    pub fn word(&self) -> &[usize] {
        &self.word
    }

    /// Compressed index of the first child, if the word has depth > 1.
    pub fn first_child(&self) -> Option<usize> {
        self.children.map(|(first, _)| first)
    }

    /// Compressed index of the second child, if the word has depth > 1.
    pub fn second_child(&self) -> Option<usize> {
        self.children.map(|(_, second)| second)
    }

    pub fn anagram_class(&self) -> Option<AnagramKey> {
        self.anagram_class
    }

    /// Bracket expansion as `letters -> coefficient`. Empty until
    /// [`LyndonWords::to_lyndon_basis`] has run.
    pub fn expansion(&self) -> &HashMap<Vec<usize>, i64> {
        &self.expansion
    }
}

/// A single Lyndon word, identified by its two indices.
#[derive(Debug, Clone)]
pub struct LyndonWord {
    /// Position among all Lyndon words, by depth then lexicographically.
    pub compressed_index: usize,
    /// Position among all words of the same depth, lexicographically.
    pub tensor_algebra_index: usize,
    pub(crate) depth: usize,
    pub(crate) extra: Option<ExtraInfo>,
}

impl LyndonWord {
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn extra(&self) -> Option<&ExtraInfo> {
        self.extra.as_ref()
    }

    /// Letters of the word, recovered from its tensor algebra index.
    pub fn letters(&self, alphabet_size: usize) -> Vec<usize> {
        match &self.extra {
            Some(extra) => extra.word.clone(),
            None => word_letters(self.tensor_algebra_index, self.depth, alphabet_size),
        }
    }
}

/// All Lyndon words up to some depth over some alphabet.
#[derive(Debug, Clone)]
pub struct LyndonWords {
    pub(crate) spec: LyndonSpec,
    pub(crate) words: Vec<LyndonWord>,
    /// `depth_starts[k-1]..depth_starts[k]` holds the words of depth `k`.
    pub(crate) depth_starts: Vec<usize>,
    pub(crate) anagram_classes: SlotMap<AnagramKey, Vec<usize>>,
}

impl LyndonWords {
    /// Generates all Lyndon words with Duval's algorithm.
    ///
    /// J.-P. Duval, Theor. Comput. Sci. 1988, doi:10.1016/0304-3975(88)90113-2.
    /// The words carry no [`ExtraInfo`].
    pub fn word_init(spec: LyndonSpec) -> Self {
        Self::from_depth_groups(spec, duval(&spec), false)
    }

    /// Packs words grouped by depth into the arena, assigning both indices.
    pub(crate) fn from_depth_groups(
        spec: LyndonSpec,
        groups: Vec<Vec<Vec<usize>>>,
        keep_letters: bool,
    ) -> Self {
        let mut words = Vec::with_capacity(groups.iter().map(Vec::len).sum());
        let mut depth_starts = Vec::with_capacity(spec.depth() + 1);
        depth_starts.push(0);

        for (depth_minus_one, group) in groups.into_iter().enumerate() {
            for letters in group {
                let compressed_index = words.len();
                let tensor_algebra_index = word_index(&letters, spec.alphabet_size());
                let extra = keep_letters.then(|| ExtraInfo::new(letters, None));
                words.push(LyndonWord {
                    compressed_index,
                    tensor_algebra_index,
                    depth: depth_minus_one + 1,
                    extra,
                });
            }
            depth_starts.push(words.len());
        }

        Self {
            spec,
            words,
            depth_starts,
            anagram_classes: SlotMap::with_key(),
        }
    }

    /// Total number of Lyndon words across all depths.
    pub fn amount(&self) -> usize {
        self.words.len()
    }

    pub fn spec(&self) -> LyndonSpec {
        self.spec
    }

    pub fn get(&self, compressed_index: usize) -> Option<&LyndonWord> {
        self.words.get(compressed_index)
    }

    /// The Lyndon words of exactly length `depth`, in lexicographic order.
    pub fn depth_class(&self, depth: usize) -> &[LyndonWord] {
        if depth == 0 || depth > self.spec.depth() {
            return &[];
        }
        &self.words[self.depth_starts[depth - 1]..self.depth_starts[depth]]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LyndonWord> {
        self.words.iter()
    }

    /// Whether every word still carries its [`ExtraInfo`].
    pub fn has_extra(&self) -> bool {
        self.words.iter().all(|w| w.extra.is_some())
    }

    /// Lyndon members of an anagram class, as compressed indices in
    /// lexicographic order.
    pub fn anagram_class(&self, key: AnagramKey) -> Option<&[usize]> {
        self.anagram_classes.get(key).map(Vec::as_slice)
    }

    /// Releases every word's [`ExtraInfo`] and the anagram classes.
    ///
    /// Only the owner may call this, and only once no other holder still
    /// needs brackets or expansions. The compressed and tensor algebra
    /// indices are kept.
    pub fn delete_extra(&mut self) {
        for word in &mut self.words {
            word.extra = None;
        }
        self.anagram_classes.clear();
        tracing::debug!(
            alphabet = self.spec.alphabet_size(),
            depth = self.spec.depth(),
            "released lyndon extra info"
        );
    }
}

impl<'a> IntoIterator for &'a LyndonWords {
    type Item = &'a LyndonWord;
    type IntoIter = std::slice::Iter<'a, LyndonWord>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Duval's generation of all Lyndon words of length `1..=depth`.
///
/// The generator emits words in global lexicographic order; bucketing by
/// length keeps each bucket lexicographically ordered.
pub(crate) fn duval(spec: &LyndonSpec) -> Vec<Vec<Vec<usize>>> {
    let alphabet_size = spec.alphabet_size();
    let depth = spec.depth();
    let max_letter = alphabet_size - 1;

    let mut groups: Vec<Vec<Vec<usize>>> = vec![Vec::new(); depth];
    let mut word: Vec<usize> = vec![0];

    while !word.is_empty() {
        groups[word.len() - 1].push(word.clone());

        // Extend periodically to full length
        let period = word.len();
        while word.len() < depth {
            word.push(word[word.len() - period]);
        }

        // Drop trailing maximal letters, then bump the last letter
        while word.last() == Some(&max_letter) {
            word.pop();
        }
        if let Some(last) = word.last_mut() {
            *last += 1;
        }
    }

    groups
}
