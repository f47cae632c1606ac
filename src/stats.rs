use itertools::Itertools;

use crate::merges::MergeTable;
use crate::vocab::VocabIndex;

/// A snapshot of vocabulary/merge table shape, computed on demand (never
/// cached, since every mutation would have to invalidate it).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TokenizerStats {
    pub vocab_size: usize,
    pub merges_count: usize,
    pub single_char_count: usize,
    pub special_token_count: usize,
    pub min_token_id: Option<u32>,
    pub max_token_id: Option<u32>,
    /// `(length, count)` pairs, one per distinct token character-length
    /// present in the vocabulary, sorted by count descending (ties broken by
    /// length ascending for a deterministic order).
    pub length_distribution: Vec<(usize, usize)>,
}

pub fn compute_stats(vocab: &VocabIndex, merges: &MergeTable) -> TokenizerStats {
    let mut length_distribution: Vec<(usize, usize)> = vocab
        .iter()
        .map(|(token, _)| token.chars().count())
        .sorted()
        .dedup_with_count()
        .map(|(count, length)| (length, count))
        .collect();
    length_distribution.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    TokenizerStats {
        vocab_size: vocab.len(),
        merges_count: merges.len(),
        single_char_count: vocab.single_char_tokens().count(),
        special_token_count: vocab.special_tokens().count(),
        min_token_id: vocab.min_id(),
        max_token_id: vocab.max_id(),
        length_distribution,
    }
}
