use std::collections::{HashSet, VecDeque};

use priority_queue::PriorityQueue;

use crate::error::{Error, Result};
use crate::merges::MergeTable;
use crate::vocab::{is_single_char, is_special, Token, VocabIndex};

/// The outcome of removing a token and everything that transitively depends
/// on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovalResult {
    pub requested: Token,
    /// Every token actually removed, in discovery order. Always starts with
    /// `requested` itself.
    pub removed_tokens: Vec<Token>,
    pub removed_merges: usize,
}

/// The outcome of a shrink pass.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ShrinkResult {
    pub initial_vocab_size: usize,
    pub final_vocab_size: usize,
    /// The roots actually chosen and cascade-removed, in the order they were
    /// processed. Re-derived after each removal, so this is not simply the
    /// top `count` candidates by rank: a candidate already swept away by an
    /// earlier root's cascade is never selected as its own root.
    pub roots: Vec<Token>,
    /// The union of every token removed across all roots' cascades, in
    /// discovery order. Never contains duplicates.
    pub removed_tokens: Vec<Token>,
    pub removed_merges: usize,
}

/// Breadth-first traversal of the merge dependency DAG: starting from
/// `token`, follows every merge that uses the current frontier as an operand
/// to its result, accumulating every token reachable this way. `token` is
/// always the first element.
fn cascade_reach(token: &str, merges: &MergeTable) -> Vec<Token> {
    let mut order = Vec::new();
    let mut seen = HashSet::new();
    let mut queue = VecDeque::new();

    queue.push_back(token.to_string());
    seen.insert(token.to_string());

    while let Some(current) = queue.pop_front() {
        order.push(current.clone());
        let positions = merges
            .where_left(&current)
            .iter()
            .chain(merges.where_right(&current))
            .copied()
            .collect::<Vec<_>>();
        for position in positions {
            let result = merges
                .get(position)
                .expect("adjacency index only references live positions")
                .result();
            if seen.insert(result.clone()) {
                queue.push_back(result);
            }
        }
    }

    order
}

/// Removes `token` and every token that transitively depends on it via a
/// merge rule (direct or indirect), along with every merge mentioning any of
/// them.
///
/// Fails with [`Error::InvalidArgument`] if `token` is not in the
/// vocabulary. Cascading into a special or single-character token is
/// allowed: callers that want to protect those categories should check
/// before calling, as [`super::removal::find_tokens_to_shrink`] does for the
/// automatic shrink path.
pub fn remove_token(vocab: &mut VocabIndex, merges: &mut MergeTable, token: &str) -> Result<RemovalResult> {
    if !vocab.has(token) {
        return Err(Error::InvalidArgument(format!(
            "token not in vocabulary: {token:?}"
        )));
    }

    let removed_tokens = cascade_reach(token, merges);
    let removed_set: HashSet<Token> = removed_tokens.iter().cloned().collect();
    let removed_merges = merges.remove_referencing(&removed_set);
    for t in &removed_tokens {
        vocab.remove(t);
    }

    Ok(RemovalResult {
        requested: token.to_string(),
        removed_tokens,
        removed_merges,
    })
}

/// Removes every token in `tokens` in order, each via [`remove_token`]. Each
/// element's cascade is atomic with respect to itself, but the batch as a
/// whole is not: a failure partway through (e.g. a later name no longer
/// present because an earlier cascade already swept it away) leaves every
/// prior element's removal applied.
///
/// A requested token not present in the vocabulary (whether it never was, or
/// an earlier element's cascade already removed it) is a silent no-op and
/// produces no entry in the result, rather than an error slot — the result
/// vector can therefore be shorter than `tokens`.
pub fn remove_tokens(vocab: &mut VocabIndex, merges: &mut MergeTable, tokens: &[String]) -> Vec<RemovalResult> {
    tokens
        .iter()
        .filter_map(|token| remove_token(vocab, merges, token).ok())
        .collect()
}

/// Selects up to `count` tokens as shrink candidates: every vocabulary entry
/// except special tokens and single-character atoms (the irreducible,
/// protected categories), restricted to ids `>= min_id`, ranked by character
/// length descending and then id descending so the longest, most recently
/// derived tokens are offered up first.
pub fn find_tokens_to_shrink(vocab: &VocabIndex, count: usize, min_id: u32) -> Vec<Token> {
    let mut queue: PriorityQueue<Token, (usize, u32)> = PriorityQueue::new();
    for (token, id) in vocab.iter() {
        if is_special(token) || is_single_char(token) || id < min_id {
            continue;
        }
        queue.push(token.to_string(), (token.chars().count(), id));
    }

    let mut selected = Vec::with_capacity(count.min(queue.len()));
    for _ in 0..count {
        match queue.pop() {
            Some((token, _)) => selected.push(token),
            None => break,
        }
    }
    selected
}

/// Shrinks the vocabulary by repeatedly cascade-removing the single
/// top-ranked candidate (see [`find_tokens_to_shrink`]) and re-deriving the
/// ranking from scratch, until either the vocabulary has shrunk by at least
/// `count` tokens or no eligible candidate remains. Recomputing after every
/// removal is necessary because a cascade can already sweep away a token
/// that would otherwise have ranked as a later candidate.
pub fn shrink(vocab: &mut VocabIndex, merges: &mut MergeTable, count: usize, min_id: u32) -> Result<ShrinkResult> {
    let initial_vocab_size = vocab.len();

    let mut roots = Vec::new();
    let mut removed_tokens = Vec::new();
    let mut removed_set = HashSet::new();
    let mut removed_merges = 0;

    while initial_vocab_size - vocab.len() < count {
        let Some(root) = find_tokens_to_shrink(vocab, 1, min_id).into_iter().next() else {
            break;
        };
        let result = remove_token(vocab, merges, &root)?;
        roots.push(root);
        removed_merges += result.removed_merges;
        for t in result.removed_tokens {
            if removed_set.insert(t.clone()) {
                removed_tokens.push(t);
            }
        }
    }

    Ok(ShrinkResult {
        initial_vocab_size,
        final_vocab_size: vocab.len(),
        roots,
        removed_tokens,
        removed_merges,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (VocabIndex, MergeTable) {
        let mut vocab = VocabIndex::new();
        for (t, id) in [("a", 0), ("b", 1), ("c", 2), ("ab", 3), ("abc", 4)] {
            vocab.insert(t.into(), id).unwrap();
        }
        let mut merges = MergeTable::new();
        merges.append("a", "b"); // -> ab
        merges.append("ab", "c"); // -> abc
        (vocab, merges)
    }

    #[test]
    fn removing_a_leaf_cascades_to_dependents() {
        let (mut vocab, mut merges) = sample();
        let result = remove_token(&mut vocab, &mut merges, "a").unwrap();
        assert_eq!(result.removed_tokens, vec!["a", "ab", "abc"]);
        assert_eq!(result.removed_merges, 2);
        assert!(!vocab.has("a"));
        assert!(!vocab.has("ab"));
        assert!(!vocab.has("abc"));
        assert!(vocab.has("b"));
        assert!(vocab.has("c"));
        assert!(merges.is_empty());
    }

    #[test]
    fn removing_top_level_token_has_no_cascade() {
        let (mut vocab, mut merges) = sample();
        let result = remove_token(&mut vocab, &mut merges, "abc").unwrap();
        assert_eq!(result.removed_tokens, vec!["abc"]);
        assert_eq!(result.removed_merges, 1); // the ab+c -> abc merge
        assert!(vocab.has("a"));
        assert!(vocab.has("ab"));
        assert_eq!(merges.len(), 1); // a+b -> ab survives
    }

    #[test]
    fn rejects_nonexistent_token() {
        let (mut vocab, mut merges) = sample();
        assert!(matches!(
            remove_token(&mut vocab, &mut merges, "zzz"),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn batch_remove_skips_nonexistent_tokens_without_an_entry() {
        let (mut vocab, mut merges) = sample();
        let results = remove_tokens(&mut vocab, &mut merges, &["zzz".to_string()]);
        assert!(results.is_empty());
    }

    #[test]
    fn batch_remove_skips_a_token_already_swept_by_an_earlier_cascade() {
        let (mut vocab, mut merges) = sample();
        // "a" cascades away "ab" and "abc" too, so the later "abc" request
        // has nothing left to remove and must not appear in the results.
        let results = remove_tokens(&mut vocab, &mut merges, &["a".to_string(), "abc".to_string()]);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].requested, "a");
    }

    #[test]
    fn shrink_candidates_exclude_single_char_and_special() {
        let mut vocab = VocabIndex::new();
        vocab.insert("<pad>".into(), 0).unwrap();
        vocab.insert("a".into(), 1).unwrap();
        vocab.insert("ab".into(), 2).unwrap();
        vocab.insert("abc".into(), 3).unwrap();
        let candidates = find_tokens_to_shrink(&vocab, 10, 0);
        assert_eq!(candidates, vec!["abc", "ab"]);
    }

    #[test]
    fn shrink_respects_min_id() {
        let mut vocab = VocabIndex::new();
        vocab.insert("ab".into(), 2).unwrap();
        vocab.insert("cd".into(), 100).unwrap();
        let candidates = find_tokens_to_shrink(&vocab, 10, 50);
        assert_eq!(candidates, vec!["cd"]);
    }

    #[test]
    fn shrink_skips_candidates_already_swept_by_an_earlier_cascade() {
        let (mut vocab, mut merges) = sample();
        // "ab" and "abc" both qualify as candidates (length > 1, id >= 0),
        // ranked abc (len 3) before ab (len 2). Removing "abc" first does
        // not remove "ab"; removing "ab" second cascades and removes "abc"
        // too, which is already gone, so the loop must not error.
        let result = shrink(&mut vocab, &mut merges, 2, 0).unwrap();
        assert_eq!(result.roots, vec!["abc", "ab"]);
        assert_eq!(result.initial_vocab_size, 5);
        assert_eq!(result.final_vocab_size, 3);
        assert!(result.removed_tokens.contains(&"abc".to_string()));
        assert!(result.removed_tokens.contains(&"ab".to_string()));
        assert!(vocab.has("a"));
        assert!(vocab.has("b"));
        assert!(vocab.has("c"));
    }

    #[test]
    fn shrink_stops_as_soon_as_threshold_is_met_even_with_extra_eligible_candidates() {
        // Three independent, non-overlapping 2-char candidates; count=1
        // must stop after removing only the top-ranked one.
        let mut vocab = VocabIndex::new();
        for (t, id) in [("a", 0), ("b", 1), ("c", 2), ("d", 3), ("ab", 10), ("cd", 11)] {
            vocab.insert(t.into(), id).unwrap();
        }
        let mut merges = MergeTable::new();
        merges.append("a", "b");
        merges.append("c", "d");
        let result = shrink(&mut vocab, &mut merges, 1, 0).unwrap();
        assert_eq!(result.roots, vec!["cd"]); // tie on length, higher id wins
        assert_eq!(result.final_vocab_size, 5);
        assert!(vocab.has("ab"));
    }

    #[test]
    fn shrink_stops_when_no_eligible_candidate_remains() {
        let mut vocab = VocabIndex::new();
        vocab.insert("a".into(), 0).unwrap();
        vocab.insert("<pad>".into(), 1).unwrap();
        let mut merges = MergeTable::new();
        let result = shrink(&mut vocab, &mut merges, 5, 0).unwrap();
        assert!(result.roots.is_empty());
        assert_eq!(result.initial_vocab_size, 2);
        assert_eq!(result.final_vocab_size, 2);
    }
}
