use crate::error::{Error, Result};
use crate::merges::MergeTable;
use crate::vocab::{is_single_char, Token, VocabIndex};

/// Which of the four strategies produced a successful addition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdditionMethod {
    /// `token` was a single byte not yet in the vocabulary; inserted directly,
    /// no merge rule needed.
    SingleChar,
    /// `token` split as `prefix ++ suffix` with both operands already in the
    /// vocabulary; one merge rule added.
    LongestPrefix,
    /// No two-piece split existed; `token` was built up one character at a
    /// time, inserting any missing character leaves and chaining a merge per
    /// step.
    CharChain,
    /// `token` was already present; nothing was mutated.
    AlreadyExists,
}

impl AdditionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdditionMethod::SingleChar => "single_char",
            AdditionMethod::LongestPrefix => "longest_prefix",
            AdditionMethod::CharChain => "char_chain",
            AdditionMethod::AlreadyExists => "already_exists",
        }
    }
}

impl std::fmt::Display for AdditionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outcome of adding a single token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdditionResult {
    pub token: Token,
    /// The id assigned to `token`. For [`AdditionMethod::AlreadyExists`] this
    /// is the id it already held.
    pub id: u32,
    pub added: bool,
    pub method: AdditionMethod,
    /// Every vocabulary entry created as a side effect — character leaves
    /// created by the `char_chain` strategy, or the single missing
    /// single-character suffix the `longest_prefix` strategy may insert
    /// before it can add its merge — in creation order. Does not include
    /// `token` itself.
    pub added_leaves: Vec<Token>,
    /// Every merge rule created as a side effect, in the order they were
    /// appended, as `(left, right)` pairs.
    pub added_merges: Vec<(Token, Token)>,
}

/// Adds `token` to `vocab`/`merges` using the first applicable strategy, in
/// the order `already_exists`, `single_char`, `longest_prefix`, `char_chain`.
///
/// Fails with [`Error::InvalidArgument`] if `token` is empty. Never fails
/// otherwise: `char_chain` is always applicable as a last resort, since every
/// non-empty string can be built one character at a time.
pub fn add_token(vocab: &mut VocabIndex, merges: &mut MergeTable, token: &str) -> Result<AdditionResult> {
    if token.is_empty() {
        return Err(Error::InvalidArgument("token must not be empty".into()));
    }

    if let Some(id) = vocab.id_of(token) {
        return Ok(AdditionResult {
            token: token.to_string(),
            id,
            added: false,
            method: AdditionMethod::AlreadyExists,
            added_leaves: Vec::new(),
            added_merges: Vec::new(),
        });
    }

    if is_single_char(token) {
        let id = vocab.insert_new(token.to_string());
        return Ok(AdditionResult {
            token: token.to_string(),
            id,
            added: true,
            method: AdditionMethod::SingleChar,
            added_leaves: Vec::new(),
            added_merges: Vec::new(),
        });
    }

    if let Some((prefix, suffix, inserted_suffix)) = longest_prefix_split(vocab, token) {
        let id = vocab.insert_new(token.to_string());
        merges.append(prefix.clone(), suffix.clone());
        let added_leaves = if inserted_suffix { vec![suffix.clone()] } else { Vec::new() };
        return Ok(AdditionResult {
            token: token.to_string(),
            id,
            added: true,
            method: AdditionMethod::LongestPrefix,
            added_leaves,
            added_merges: vec![(prefix, suffix)],
        });
    }

    Ok(char_chain(vocab, merges, token))
}

/// Finds the longest proper prefix `p` of `token` already in `vocab`, and
/// pairs it with the remaining suffix `s`. If `s` is already in `vocab`, the
/// pair is returned directly (`inserted_suffix = false`). If `s` is absent
/// but is itself a single character, it is inserted as a fresh leaf first
/// and the pair is still returned (`inserted_suffix = true`). Otherwise
/// there is no usable split and `None` is returned (the caller falls back to
/// `char_chain`). Only prefixes ending on a character boundary are
/// considered, since a vocabulary entry is always a valid string and so can
/// never equal a prefix that splits a character.
fn longest_prefix_split(vocab: &mut VocabIndex, token: &str) -> Option<(Token, Token, bool)> {
    let boundaries: Vec<usize> = token.char_indices().map(|(i, _)| i).skip(1).collect();
    let split = boundaries.into_iter().rev().find(|&i| vocab.has(&token[..i]))?;
    let (prefix, suffix) = token.split_at(split);

    if vocab.has(suffix) {
        return Some((prefix.to_string(), suffix.to_string(), false));
    }
    if is_single_char(suffix) {
        vocab.insert_new(suffix.to_string());
        return Some((prefix.to_string(), suffix.to_string(), true));
    }
    None
}

/// Builds `token` one character at a time: any character not yet in `vocab`
/// is inserted as a fresh leaf, then a left-to-right chain of merges folds
/// the characters together until the running prefix equals `token`.
fn char_chain(vocab: &mut VocabIndex, merges: &mut MergeTable, token: &str) -> AdditionResult {
    let chars: Vec<Token> = token.chars().map(|c| c.to_string()).collect();

    let mut added_leaves = Vec::new();
    for ch in &chars {
        if !vocab.has(ch) {
            vocab.insert_new(ch.clone());
            added_leaves.push(ch.clone());
        }
    }

    let mut added_merges = Vec::new();
    let mut running = chars[0].clone();
    for ch in &chars[1..] {
        let next = format!("{running}{ch}");
        if !vocab.has(&next) {
            vocab.insert_new(next.clone());
        }
        // A merge with this exact (running, ch) pair may already exist if
        // running/ch happened to already be linked by an earlier edit;
        // appending it again would create a forbidden duplicate.
        if !merges.contains(&running, ch) {
            merges.append(running.clone(), ch.clone());
            added_merges.push((running.clone(), ch.clone()));
        }
        running = next;
    }
    debug_assert_eq!(running, token);

    let id = vocab.id_of(token).expect("char_chain always materializes token");
    AdditionResult {
        token: token.to_string(),
        id,
        added: true,
        method: AdditionMethod::CharChain,
        added_leaves,
        added_merges,
    }
}

/// Inserts `token` as an opaque atom: no merges are ever synthesized,
/// regardless of length. This is the appropriate primitive for special
/// tokens (`<pad>`, `<eos>`, ...) and any other externally supplied string
/// that must not be decomposable into a merge chain.
///
/// Returns `true` if `token` was inserted, `false` if it was already present
/// (or empty — an empty token is never inserted). Never fails: there is no
/// strategy to choose between, so there is nothing for this primitive to get
/// wrong.
pub fn add_token_atomic(vocab: &mut VocabIndex, token: &str) -> bool {
    if token.is_empty() || vocab.has(token) {
        return false;
    }
    vocab.insert_new(token.to_string());
    true
}

/// Adds every token in `tokens` in order, each via [`add_token`]. Each
/// element's addition is atomic with respect to itself, but the batch as a
/// whole is not: a failure partway through (an empty string) leaves every
/// prior element's addition applied.
pub fn add_tokens(vocab: &mut VocabIndex, merges: &mut MergeTable, tokens: &[String]) -> Vec<Result<AdditionResult>> {
    tokens.iter().map(|token| add_token(vocab, merges, token)).collect()
}
