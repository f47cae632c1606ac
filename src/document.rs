use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::vocab::TokenId;

/// In-memory representation of a parsed tokenizer document.
///
/// Only `model.vocab` and `model.merges` are interpreted; every other
/// top-level field (`normalizer`, `pre_tokenizer`, `post_processor`,
/// `decoder`, `added_tokens`, `version`, `truncation`, `padding`, ...) and
/// every other `model` field (`unk_token`, `dropout`,
/// `continuing_subword_prefix`, `end_of_word_suffix`, `fuse_unk`,
/// `byte_fallback`, `ignore_merges`, ...) is captured verbatim and re-emitted
/// unchanged on save.
#[derive(Debug, Clone)]
pub struct TokenizerDocument {
    /// Top-level fields other than `model`.
    extra_fields: Map<String, Value>,
    /// `model` fields other than `type`, `vocab` and `merges`.
    model_extra_fields: Map<String, Value>,
    pub vocab: HashMap<String, TokenId>,
    pub merges: Vec<(String, String)>,
}

impl TokenizerDocument {
    /// Parses a tokenizer document from a JSON string.
    ///
    /// Fails with [`Error::ParseError`] if the input is not valid JSON or is
    /// not structurally a tokenizer document (missing `model`, missing
    /// `model.vocab`, a malformed `model.merges` entry), and with
    /// [`Error::UnsupportedModel`] if `model.type` is present and is not
    /// exactly `"BPE"`.
    pub fn parse(input: &str) -> Result<Self> {
        let root: Value = serde_json::from_str(input)?;
        let mut root = match root {
            Value::Object(map) => map,
            _ => return Err(Error::ParseError("top-level document is not a JSON object".into())),
        };

        let model = root
            .remove("model")
            .ok_or_else(|| Error::ParseError("document is missing a \"model\" field".into()))?;
        let mut model = match model {
            Value::Object(map) => map,
            _ => return Err(Error::ParseError("\"model\" field is not a JSON object".into())),
        };

        if let Some(model_type) = model.get("type") {
            let model_type = model_type
                .as_str()
                .ok_or_else(|| Error::ParseError("\"model.type\" is not a string".into()))?;
            if model_type != "BPE" {
                return Err(Error::UnsupportedModel(model_type.to_string()));
            }
        }
        model.remove("type");

        let vocab_value = model
            .remove("vocab")
            .ok_or_else(|| Error::ParseError("\"model.vocab\" is missing".into()))?;
        let vocab: HashMap<String, TokenId> = serde_json::from_value(vocab_value)
            .map_err(|e| Error::ParseError(format!("\"model.vocab\" is malformed: {e}")))?;

        let merges_value = model
            .remove("merges")
            .ok_or_else(|| Error::ParseError("\"model.merges\" is missing".into()))?;
        let merges = parse_merges(&merges_value)?;

        Ok(Self {
            extra_fields: root,
            model_extra_fields: model,
            vocab,
            merges,
        })
    }

    /// Reassembles the document as a JSON [`Value`], substituting the given
    /// (possibly mutated) vocab and merges, and interleaving back every
    /// field preserved at parse time.
    pub fn to_json_value(&self, vocab: &HashMap<String, TokenId>, merges: &[(String, String)]) -> Value {
        let mut model = self.model_extra_fields.clone();
        model.insert("type".to_string(), Value::String("BPE".to_string()));
        model.insert(
            "vocab".to_string(),
            serde_json::to_value(vocab).expect("vocab map is always serializable"),
        );
        model.insert(
            "merges".to_string(),
            Value::Array(
                merges
                    .iter()
                    .map(|(l, r)| Value::Array(vec![Value::String(l.clone()), Value::String(r.clone())]))
                    .collect(),
            ),
        );

        let mut root = self.extra_fields.clone();
        root.insert("model".to_string(), Value::Object(model));
        Value::Object(root)
    }
}

/// Accepts either `["left", "right"]` pairs or a single space-joined
/// `"left right"` string per merge entry, per the two shapes the format
/// allows.
fn parse_merges(value: &Value) -> Result<Vec<(String, String)>> {
    let entries = value
        .as_array()
        .ok_or_else(|| Error::ParseError("\"model.merges\" is not an array".into()))?;

    entries
        .iter()
        .map(|entry| match entry {
            Value::Array(pair) => {
                let [left, right] = <&[Value; 2]>::try_from(pair.as_slice()).map_err(|_| {
                    Error::ParseError("merge entry array must have exactly 2 elements".into())
                })?;
                let left = left
                    .as_str()
                    .ok_or_else(|| Error::ParseError("merge entry element is not a string".into()))?;
                let right = right
                    .as_str()
                    .ok_or_else(|| Error::ParseError("merge entry element is not a string".into()))?;
                Ok((left.to_string(), right.to_string()))
            }
            Value::String(s) => {
                let mut parts = s.splitn(2, ' ');
                let left = parts
                    .next()
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| Error::ParseError(format!("malformed merge string: {s:?}")))?;
                let right = parts
                    .next()
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| Error::ParseError(format!("malformed merge string: {s:?}")))?;
                Ok((left.to_string(), right.to_string()))
            }
            _ => Err(Error::ParseError("merge entry is neither an array nor a string".into())),
        })
        .collect()
}
