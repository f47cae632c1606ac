use std::fs;
use std::path::Path;

use log::{debug, info};

use crate::addition::{self, AdditionResult};
use crate::document::TokenizerDocument;
use crate::error::Result;
use crate::merges::MergeTable;
use crate::removal::{self, RemovalResult, ShrinkResult};
use crate::stats::{self, TokenizerStats};
use crate::validator::{self, ValidationResult};
use crate::vocab::{Token, TokenId, VocabIndex};

/// An in-memory, editable BPE tokenizer file: a vocabulary, its merge rules,
/// and every other field of the source document, kept consistent with each
/// other across every mutation.
#[derive(Debug, Clone)]
pub struct BpeTokenizerEditor {
    vocab: VocabIndex,
    merges: MergeTable,
    document: TokenizerDocument,
}

impl BpeTokenizerEditor {
    /// Loads a tokenizer document from `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("loading tokenizer document from {}", path.display());
        let content = fs::read_to_string(path)?;
        let editor = Self::from_json(&content)?;
        info!(
            "loaded tokenizer from {}: {} vocab entries, {} merges",
            path.display(),
            editor.vocab_size(),
            editor.merges_count()
        );
        Ok(editor)
    }

    /// Parses a tokenizer document from a JSON string.
    pub fn from_json(input: &str) -> Result<Self> {
        let document = TokenizerDocument::parse(input)?;

        let mut vocab = VocabIndex::new();
        for (token, id) in &document.vocab {
            vocab.insert(token.clone(), *id)?;
        }

        let mut merges = MergeTable::new();
        for (left, right) in &document.merges {
            merges.append(left.clone(), right.clone());
        }

        Ok(Self {
            vocab,
            merges,
            document,
        })
    }

    /// Serializes the current state back to a JSON string, pretty-printed.
    pub fn to_json(&self) -> Result<String> {
        let value = self.document.to_json_value(&self.vocab.to_map(), &self.merges.to_vec());
        Ok(serde_json::to_string_pretty(&value)?)
    }

    /// Writes the current state to `path`, overwriting it.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = self.to_json()?;
        fs::write(path, json)?;
        info!("saved tokenizer to {}", path.display());
        Ok(())
    }

    pub fn vocab_size(&self) -> usize {
        self.vocab.len()
    }

    pub fn merges_count(&self) -> usize {
        self.merges.len()
    }

    pub fn has_token(&self, token: &str) -> bool {
        self.vocab.has(token)
    }

    pub fn get_token_id(&self, token: &str) -> Option<TokenId> {
        self.vocab.id_of(token)
    }

    pub fn get_token_by_id(&self, id: TokenId) -> Option<&str> {
        self.vocab.token_of(id)
    }

    pub fn get_vocab(&self) -> std::collections::HashMap<Token, TokenId> {
        self.vocab.to_map()
    }

    pub fn get_merges(&self) -> Vec<(Token, Token)> {
        self.merges.to_vec()
    }

    pub fn get_single_char_tokens(&self) -> Vec<Token> {
        self.vocab.single_char_tokens().map(|(t, _)| t.to_string()).collect()
    }

    pub fn get_stats(&self) -> TokenizerStats {
        stats::compute_stats(&self.vocab, &self.merges)
    }

    pub fn validate_merges(&self) -> ValidationResult {
        validator::validate_merges(&self.vocab, &self.merges)
    }

    /// Adds `token` via the first applicable strategy (already-exists,
    /// single-char, longest-prefix, char-chain).
    pub fn add_token(&mut self, token: &str) -> Result<AdditionResult> {
        let result = addition::add_token(&mut self.vocab, &mut self.merges, token)?;
        debug!(
            "add_token({token:?}) -> method={}, added={}, new_merges={}",
            result.method,
            result.added,
            result.added_merges.len()
        );
        Ok(result)
    }

    /// Inserts `token` as an opaque atom (no merges synthesized), the
    /// primitive used for adding special tokens. `true` if inserted, `false`
    /// if already present.
    pub fn add_token_atomic(&mut self, token: &str) -> bool {
        addition::add_token_atomic(&mut self.vocab, token)
    }

    /// Adds every token in `tokens`, each independently atomic; the batch as
    /// a whole is not.
    pub fn add_tokens(&mut self, tokens: &[String]) -> Vec<Result<AdditionResult>> {
        let results = addition::add_tokens(&mut self.vocab, &mut self.merges, tokens);
        let added = results.iter().filter(|r| matches!(r, Ok(r) if r.added)).count();
        info!("add_tokens: {added}/{} requested tokens added", tokens.len());
        results
    }

    /// Removes `token` and every token that transitively depends on it.
    pub fn remove_token(&mut self, token: &str) -> Result<RemovalResult> {
        let result = removal::remove_token(&mut self.vocab, &mut self.merges, token)?;
        info!(
            "remove_token({token:?}) cascaded to {} tokens, dropped {} merges",
            result.removed_tokens.len(),
            result.removed_merges
        );
        Ok(result)
    }

    /// Removes every token in `tokens` in order, each independently atomic.
    /// A token not present in the vocabulary is a silent no-op: it produces
    /// no entry in the returned list, which can therefore be shorter than
    /// `tokens`.
    pub fn remove_tokens(&mut self, tokens: &[String]) -> Vec<RemovalResult> {
        removal::remove_tokens(&mut self.vocab, &mut self.merges, tokens)
    }

    /// Selects up to `count` shrink candidates (ids `>= min_id`, excluding
    /// special and single-character tokens) without mutating anything.
    pub fn find_tokens_to_shrink(&self, count: usize, min_id: TokenId) -> Vec<Token> {
        removal::find_tokens_to_shrink(&self.vocab, count, min_id)
    }

    /// Cascade-removes up to `count` shrink candidates.
    pub fn shrink(&mut self, count: usize, min_id: TokenId) -> Result<ShrinkResult> {
        let result = removal::shrink(&mut self.vocab, &mut self.merges, count, min_id)?;
        info!(
            "shrink(count={count}, min_id={min_id}): removed {} tokens, {} merges",
            result.removed_tokens.len(),
            result.removed_merges
        );
        Ok(result)
    }
}
