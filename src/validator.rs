use crate::merges::MergeTable;
use crate::vocab::{Token, VocabIndex};

/// An invalid merge: one whose `left`, `right` or concatenated result is
/// missing from the vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidMerge {
    pub position: usize,
    pub left: Token,
    pub right: Token,
}

/// The result of checking every merge's three endpoints against the
/// vocabulary. Does not mutate either structure.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationResult {
    pub valid_count: usize,
    pub invalid_count: usize,
    pub invalid_merges: Vec<InvalidMerge>,
}

/// Checks that every merge's `left`, `right` and `left++right` are present
/// in `vocab`. Pure read: never mutates `vocab` or `merges`.
pub fn validate_merges(vocab: &VocabIndex, merges: &MergeTable) -> ValidationResult {
    let mut result = ValidationResult::default();
    for (position, merge) in merges.iter() {
        let ok = vocab.has(&merge.left) && vocab.has(&merge.right) && vocab.has(&merge.result());
        if ok {
            result.valid_count += 1;
        } else {
            result.invalid_count += 1;
            result.invalid_merges.push(InvalidMerge {
                position,
                left: merge.left.clone(),
                right: merge.right.clone(),
            });
        }
    }
    result
}
