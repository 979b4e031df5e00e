//! Change of basis from word coordinates to the Lyndon bracket basis.
//!
//! Each Lyndon word `w` has a bracket polynomial `P_w`, obtained by
//! expanding its standard bracketing with `[u, v] = uv - vu`. `P_w` is `w`
//! plus a signed sum of lexicographically larger anagrams of `w`, so within
//! one anagram class the matrix `M[p][q] = <P_p, q>` (restricted to Lyndon
//! words) is unitriangular. A Lie element `x = sum_w c_w P_w` therefore has
//! bracket coefficients `c = (M^T)^-1 x|_Lyndon`, and that inverse has
//! integer entries. The transform emitted here is exactly that inverse,
//! written as sparse triples against word coordinates.

use crate::error::{Result, SignatureError};
use crate::words::{AnagramKey, LyndonWords};
use ahash::AHashMap as HashMap;

/// One nonzero entry of the word-to-Lyndon transform.
///
/// The Lyndon coefficient at `lyndon_index` receives `coefficient` times the
/// word coefficient at `word_index` (a position among words of the Lyndon
/// word's own depth).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BasisTransformEntry {
    pub lyndon_index: usize,
    pub word_index: usize,
    pub coefficient: i64,
}

impl LyndonWords {
    /// Computes the bracket expansion of every word, groups words into
    /// anagram classes, and returns the sparse word-to-Lyndon transform.
    ///
    /// Entries are sorted by Lyndon index, then word index. The forest must
    /// come from [`LyndonWords::bracket_init`] and still carry its extra info.
    pub fn to_lyndon_basis(&mut self) -> Result<Vec<BasisTransformEntry>> {
        if !self.has_extra() {
            return Err(SignatureError::ModeMismatch(
                "basis transform requires bracketed lyndon words".to_string(),
            ));
        }

        self.build_expansions();
        self.build_anagram_classes();

        let mut transforms = Vec::new();
        let keys: Vec<AnagramKey> = self
            .words
            .iter()
            .filter_map(|w| {
                let extra = w.extra.as_ref()?;
                (extra.anagram_limit == 0).then_some(extra.anagram_class?)
            })
            .collect();
        for key in keys {
            self.invert_anagram_class(key, &mut transforms);
        }
        transforms.sort_unstable();

        tracing::debug!(
            alphabet = self.spec.alphabet_size(),
            depth = self.spec.depth(),
            classes = self.anagram_classes.len(),
            entries = transforms.len(),
            "computed lyndon basis transform"
        );
        Ok(transforms)
    }

    /// Transform that keeps only the coefficients at Lyndon words.
    ///
    /// Needs no bracketing; used for the word-coordinate log-signature.
    pub fn word_selection(&self) -> Vec<BasisTransformEntry> {
        self.words
            .iter()
            .map(|w| BasisTransformEntry {
                lyndon_index: w.compressed_index,
                word_index: w.tensor_algebra_index,
                coefficient: 1,
            })
            .collect()
    }

    /// Bracket expansion of `compressed_index`, if still available.
    pub fn expansion(&self, compressed_index: usize) -> Option<&HashMap<Vec<usize>, i64>> {
        let extra = self.words.get(compressed_index)?.extra.as_ref()?;
        Some(&extra.expansion)
    }

    /// Children always precede parents in compressed order, so one forward
    /// pass is a post-order traversal of every bracket tree.
    fn build_expansions(&mut self) {
        for index in 0..self.words.len() {
            let expansion = {
                let Some(extra) = self.words[index].extra.as_ref() else {
                    continue;
                };
                match extra.children {
                    None => {
                        let mut leaf = HashMap::default();
                        leaf.insert(extra.word.clone(), 1);
                        leaf
                    }
                    Some((first, second)) => {
                        let first = &self.words[first].extra.as_ref().expect("child has extra").expansion;
                        let second = &self.words[second].extra.as_ref().expect("child has extra").expansion;
                        commutator(first, second)
                    }
                }
            };
            if let Some(extra) = self.words[index].extra.as_mut() {
                extra.expansion = expansion;
            }
        }
    }

    fn build_anagram_classes(&mut self) {
        self.anagram_classes.clear();
        let mut by_letters: HashMap<Vec<usize>, AnagramKey> = HashMap::default();

        for index in 0..self.words.len() {
            let Some(extra) = self.words[index].extra.as_mut() else {
                continue;
            };
            let mut sorted = extra.word.clone();
            sorted.sort_unstable();

            let classes = &mut self.anagram_classes;
            let key = *by_letters
                .entry(sorted)
                .or_insert_with(|| classes.insert(Vec::new()));
            let members = &mut self.anagram_classes[key];
            extra.anagram_class = Some(key);
            extra.anagram_limit = members.len();
            members.push(index);
        }
    }

    /// Forward substitution through one unitriangular class block.
    ///
    /// Row `q` of the inverse is `e_q - sum_{p<q} M[p][q] row_p`; only the
    /// members before a word's `anagram_limit` contribute to it.
    fn invert_anagram_class(&self, key: AnagramKey, transforms: &mut Vec<BasisTransformEntry>) {
        let members = &self.anagram_classes[key];
        let extra_of = |index: usize| self.words[index].extra.as_ref().expect("bracketed word");

        let mut rows: Vec<Vec<i64>> = Vec::with_capacity(members.len());
        for (q, &target) in members.iter().enumerate() {
            let target_extra = extra_of(target);
            debug_assert_eq!(target_extra.anagram_limit, q);

            let mut row = vec![0i64; members.len()];
            row[q] = 1;
            for (p, &source) in members[..target_extra.anagram_limit].iter().enumerate() {
                let m = extra_of(source)
                    .expansion
                    .get(&target_extra.word)
                    .copied()
                    .unwrap_or(0);
                if m != 0 {
                    for (slot, prev) in row.iter_mut().zip(&rows[p]) {
                        *slot -= m * prev;
                    }
                }
            }

            for (p, &coefficient) in row.iter().enumerate() {
                if coefficient != 0 {
                    transforms.push(BasisTransformEntry {
                        lyndon_index: self.words[target].compressed_index,
                        word_index: self.words[members[p]].tensor_algebra_index,
                        coefficient,
                    });
                }
            }
            rows.push(row);
        }
    }
}

/// `uv - vu` for polynomials given as `letters -> coefficient`.
fn commutator(
    first: &HashMap<Vec<usize>, i64>,
    second: &HashMap<Vec<usize>, i64>,
) -> HashMap<Vec<usize>, i64> {
    let mut out: HashMap<Vec<usize>, i64> = HashMap::default();
    for (u, cu) in first {
        for (v, cv) in second {
            let product = cu * cv;

            let mut uv = Vec::with_capacity(u.len() + v.len());
            uv.extend_from_slice(u);
            uv.extend_from_slice(v);
            *out.entry(uv).or_insert(0) += product;

            let mut vu = Vec::with_capacity(u.len() + v.len());
            vu.extend_from_slice(v);
            vu.extend_from_slice(u);
            *out.entry(vu).or_insert(0) -= product;
        }
    }
    out.retain(|_, c| *c != 0);
    out
}
