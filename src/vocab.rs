use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use crate::error::{Error, Result};

/// A vocabulary token: an opaque, byte-exact string. No normalization is
/// ever applied to it by this crate.
pub type Token = String;

/// A vocabulary token id. Ids need not be contiguous.
pub type TokenId = u32;

/// Returns true iff `token` has the special-token shape `<...>` used for
/// sentinels such as `<pad>`, `<eos>`, `<unk>`. Requires at least one
/// character of content between the angle brackets, so the degenerate
/// `"<>"` is not special.
pub fn is_special(token: &str) -> bool {
    token.len() >= 3 && token.starts_with('<') && token.ends_with('>')
}

/// Returns true iff `token` is a single-character atom: the irreducible
/// leaves of the merge DAG, which can never be produced by any merge.
/// Measured in Unicode scalars, not bytes, so a multi-byte UTF-8 atom (e.g.
/// `"é"`, or a GPT-2 byte-to-unicode token like `"Ġ"`) is still single-char.
pub fn is_single_char(token: &str) -> bool {
    token.chars().count() == 1
}

/// Bidirectional map between token strings and numeric ids, with id
/// allocation by smallest-free-integer and derived single-char/special
/// views.
///
/// The forward (`token -> id`) and reverse (`id -> token`) maps are kept in
/// lockstep by construction: every mutating method updates both, so there is
/// no code path that can observe one without the other.
#[derive(Debug, Clone, Default)]
pub struct VocabIndex {
    token_to_id: HashMap<Token, TokenId>,
    id_to_token: HashMap<TokenId, Token>,
    free_ids: BinaryHeap<Reverse<TokenId>>,
    next_id: TokenId,
}

impl VocabIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.token_to_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.token_to_id.is_empty()
    }

    pub fn has(&self, token: &str) -> bool {
        self.token_to_id.contains_key(token)
    }

    pub fn id_of(&self, token: &str) -> Option<TokenId> {
        self.token_to_id.get(token).copied()
    }

    pub fn token_of(&self, id: TokenId) -> Option<&str> {
        self.id_to_token.get(&id).map(String::as_str)
    }

    /// Inserts `token` with the specific `id` given. Used when populating the
    /// index from a parsed document, where ids are already assigned.
    ///
    /// Fails with [`Error::TokenExists`] if the token string is already
    /// present, or [`Error::IdTaken`] if the id is already assigned to a
    /// different token.
    pub fn insert(&mut self, token: Token, id: TokenId) -> Result<()> {
        if self.token_to_id.contains_key(&token) {
            return Err(Error::TokenExists(token));
        }
        if self.id_to_token.contains_key(&id) {
            return Err(Error::IdTaken(id));
        }
        self.id_to_token.insert(id, token.clone());
        self.token_to_id.insert(token, id);
        if id >= self.next_id {
            self.next_id = id + 1;
        }
        Ok(())
    }

    /// Inserts `token` under the smallest id not currently assigned to any
    /// token, and returns that id. Precondition: `token` is not already
    /// present (callers are expected to check `has` first; this method does
    /// not re-check to keep the addition engine's hot path allocation-free
    /// of redundant lookups).
    pub fn insert_new(&mut self, token: Token) -> TokenId {
        let id = loop {
            match self.free_ids.pop() {
                Some(Reverse(id)) if !self.id_to_token.contains_key(&id) => break id,
                Some(_) => continue,
                None => {
                    let id = self.next_id;
                    self.next_id += 1;
                    break id;
                }
            }
        };
        self.id_to_token.insert(id, token.clone());
        self.token_to_id.insert(token, id);
        id
    }

    /// Removes `token` if present, freeing its id for future reuse by
    /// [`insert_new`](Self::insert_new). Returns the freed id, if any.
    pub fn remove(&mut self, token: &str) -> Option<TokenId> {
        let id = self.token_to_id.remove(token)?;
        self.id_to_token.remove(&id);
        self.free_ids.push(Reverse(id));
        Some(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, TokenId)> {
        self.token_to_id.iter().map(|(t, &id)| (t.as_str(), id))
    }

    pub fn single_char_tokens(&self) -> impl Iterator<Item = (&str, TokenId)> {
        self.iter().filter(|(t, _)| is_single_char(t))
    }

    pub fn special_tokens(&self) -> impl Iterator<Item = (&str, TokenId)> {
        self.iter().filter(|(t, _)| is_special(t))
    }

    pub fn min_id(&self) -> Option<TokenId> {
        self.id_to_token.keys().copied().min()
    }

    pub fn max_id(&self) -> Option<TokenId> {
        self.id_to_token.keys().copied().max()
    }

    pub fn to_map(&self) -> HashMap<Token, TokenId> {
        self.token_to_id.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_special_shape() {
        assert!(is_special("<pad>"));
        assert!(is_special("<eos>"));
        assert!(!is_special("<p"));
        assert!(!is_special("pad>"));
        assert!(!is_special("<>"));
        assert!(is_special("<x>"));
    }

    #[test]
    fn is_single_char_counts_unicode_scalars_not_bytes() {
        assert!(is_single_char("a"));
        assert!(!is_single_char("ab"));
        assert!(!is_single_char(""));
        // Multi-byte UTF-8 but a single Unicode scalar: still single-char.
        assert!(is_single_char("é"));
        assert!(is_single_char("Ġ"));
    }

    #[test]
    fn insert_and_lookup_round_trip() {
        let mut v = VocabIndex::new();
        v.insert("a".into(), 0).unwrap();
        v.insert("b".into(), 1).unwrap();
        assert_eq!(v.id_of("a"), Some(0));
        assert_eq!(v.token_of(1), Some("b"));
        assert!(v.has("a"));
        assert!(!v.has("z"));
    }

    #[test]
    fn insert_rejects_conflicts() {
        let mut v = VocabIndex::new();
        v.insert("a".into(), 0).unwrap();
        assert!(matches!(
            v.insert("a".into(), 5),
            Err(Error::TokenExists(_))
        ));
        assert!(matches!(v.insert("b".into(), 0), Err(Error::IdTaken(0))));
    }

    #[test]
    fn insert_new_picks_smallest_free_id() {
        let mut v = VocabIndex::new();
        v.insert("a".into(), 0).unwrap();
        v.insert("b".into(), 2).unwrap();
        // next_id tracks max+1 = 3, so the first fresh id is 3 (0 and 2 are
        // taken, 1 was never freed so it is not a candidate yet).
        let id = v.insert_new("c".into());
        assert_eq!(id, 3);
    }

    #[test]
    fn remove_frees_id_for_reuse() {
        let mut v = VocabIndex::new();
        v.insert("a".into(), 0).unwrap();
        v.insert("b".into(), 1).unwrap();
        assert_eq!(v.remove("a"), Some(0));
        assert!(!v.has("a"));
        let id = v.insert_new("c".into());
        assert_eq!(id, 0, "freed id 0 should be reused before allocating new");
    }

    #[test]
    fn single_char_and_special_views() {
        let mut v = VocabIndex::new();
        v.insert("<pad>".into(), 0).unwrap();
        v.insert("a".into(), 1).unwrap();
        v.insert("ab".into(), 2).unwrap();
        let singles: Vec<_> = v.single_char_tokens().map(|(t, _)| t).collect();
        assert_eq!(singles, vec!["a"]);
        let specials: Vec<_> = v.special_tokens().map(|(t, _)| t).collect();
        assert_eq!(specials, vec!["<pad>"]);
    }
}
