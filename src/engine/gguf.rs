//! GGUF-backed embedding engine.
//!
//! Reads the GGUF container with candle and serves embeddings from the
//! model's token-embedding table: WordPiece tokenization over the
//! embedded vocabulary, a row lookup per token, pooling, then
//! normalization. No transformer forward pass runs, so vectors are
//! static rather than contextual, as in model2vec-style static
//! embedding models. Heavier backends plug in through [`EngineLoader`].

use crate::config::{EngineOptions, Normalization, Pooling};
use crate::engine::{EmbeddingEngine, EngineLoader, ModelMetadata};
use crate::error::{EmbedderError, Result};
use async_trait::async_trait;
use candle_core::quantized::gguf_file::{self, Value};
use candle_core::Device;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::path::Path;
use tokenizers::models::wordpiece::WordPiece;
use tokenizers::normalizers::bert::BertNormalizer;
use tokenizers::pre_tokenizers::bert::BertPreTokenizer;
use tokenizers::Tokenizer;

const TOKEN_EMBEDDING_TENSOR: &str = "token_embd.weight";

/// Embedding engine over a GGUF model's token-embedding table.
pub struct GgufEngine {
    /// Row-major `(vocab, dim)` embedding table.
    table: Vec<f32>,
    dim: usize,
    tokenizer: Tokenizer,
    cls_id: Option<u32>,
    sep_id: Option<u32>,
    pooling: Pooling,
    metadata: ModelMetadata,
}

impl GgufEngine {
    /// Loads a GGUF file and prepares the lookup table and tokenizer.
    pub fn load(path: &Path, options: &EngineOptions) -> Result<Self> {
        let mut file = File::open(path).map_err(|err| {
            EmbedderError::Construction(format!("cannot open {}: {err}", path.display()))
        })?;
        let content = gguf_file::Content::read(&mut file).map_err(|err| {
            EmbedderError::Construction(format!(
                "{} is not a readable GGUF file: {err}",
                path.display()
            ))
        })?;

        let vocab = vocabulary(&content.metadata)?;
        let vocab_ids: HashMap<&str, u32> = vocab
            .iter()
            .enumerate()
            .map(|(id, token)| (token.as_str(), id as u32))
            .collect();

        let unk = special_token(
            &content.metadata,
            &["tokenizer.ggml.unknown_token_id"],
            &vocab_ids,
            "[UNK]",
            vocab.len(),
        )
        .ok_or_else(|| {
            EmbedderError::Construction("vocabulary defines no unknown token".to_string())
        })?;
        let cls_id = special_token(
            &content.metadata,
            &["tokenizer.ggml.cls_token_id", "tokenizer.ggml.bos_token_id"],
            &vocab_ids,
            "[CLS]",
            vocab.len(),
        );
        // llama.cpp spells the separator key without the second "a".
        let sep_id = special_token(
            &content.metadata,
            &[
                "tokenizer.ggml.seperator_token_id",
                "tokenizer.ggml.eos_token_id",
            ],
            &vocab_ids,
            "[SEP]",
            vocab.len(),
        );

        let qtensor = content
            .tensor(&mut file, TOKEN_EMBEDDING_TENSOR, &Device::Cpu)
            .map_err(|err| {
                EmbedderError::Construction(format!(
                    "model has no {TOKEN_EMBEDDING_TENSOR} tensor: {err}"
                ))
            })?;
        let dequantized = qtensor.dequantize(&Device::Cpu).map_err(|err| {
            EmbedderError::Construction(format!("cannot dequantize token embeddings: {err}"))
        })?;
        let (rows, dim) = dequantized.dims2().map_err(|err| {
            EmbedderError::Construction(format!("token embedding table is not 2-dimensional: {err}"))
        })?;
        if rows != vocab.len() {
            return Err(EmbedderError::Construction(format!(
                "token table has {rows} rows for a vocabulary of {} tokens",
                vocab.len()
            )));
        }
        let table: Vec<f32> = dequantized
            .to_vec2::<f32>()
            .map_err(|err| {
                EmbedderError::Construction(format!("cannot read token embeddings: {err}"))
            })?
            .into_iter()
            .flatten()
            .collect();

        let architecture = string_value(&content.metadata, "general.architecture");
        let embedding_dim = architecture
            .as_deref()
            .and_then(|arch| u32_value(&content.metadata, &format!("{arch}.embedding_length")))
            .map(|value| value as usize)
            .unwrap_or(dim);
        let metadata = ModelMetadata {
            architecture,
            model_name: string_value(&content.metadata, "general.name"),
            embedding_dim: Some(embedding_dim),
            vocab_size: Some(vocab.len()),
            pooling: options.pooling,
            entries: content
                .metadata
                .iter()
                .map(|(key, value)| (key.clone(), value_display(value)))
                .collect::<BTreeMap<_, _>>(),
        };

        let unk_token = vocab[unk as usize].clone();
        let tokenizer = build_tokenizer(&vocab, unk_token)?;

        Ok(Self {
            table,
            dim,
            tokenizer,
            cls_id,
            sep_id,
            pooling: options.pooling,
            metadata,
        })
    }

    fn embed_one(&self, text: &str, normalization: Normalization) -> Result<Vec<f32>> {
        let encoding = self
            .tokenizer
            .encode(text, false)
            .map_err(|err| EmbedderError::Engine(format!("tokenization failed: {err}")))?;

        let mut ids = Vec::with_capacity(encoding.get_ids().len() + 2);
        if let Some(cls) = self.cls_id {
            ids.push(cls);
        }
        ids.extend_from_slice(encoding.get_ids());
        if let Some(sep) = self.sep_id {
            ids.push(sep);
        }

        let mut vector = self.pool(&ids)?;
        normalize(&mut vector, normalization);
        Ok(vector)
    }

    fn row(&self, id: u32) -> &[f32] {
        let start = id as usize * self.dim;
        &self.table[start..start + self.dim]
    }

    fn pool(&self, ids: &[u32]) -> Result<Vec<f32>> {
        if ids.is_empty() {
            return Ok(vec![0.0; self.dim]);
        }
        match self.pooling {
            Pooling::None => Err(EmbedderError::Engine(
                "pooling 'none' yields per-token output and is not supported by this backend"
                    .to_string(),
            )),
            Pooling::Mean => {
                let mut acc = vec![0.0f32; self.dim];
                for &id in ids {
                    for (slot, value) in acc.iter_mut().zip(self.row(id)) {
                        *slot += value;
                    }
                }
                let count = ids.len() as f32;
                for slot in &mut acc {
                    *slot /= count;
                }
                Ok(acc)
            }
            Pooling::Cls => Ok(self.row(ids[0]).to_vec()),
            Pooling::Last => Ok(self.row(ids[ids.len() - 1]).to_vec()),
        }
    }
}

impl EmbeddingEngine for GgufEngine {
    fn embed(&self, texts: &[String], normalization: Normalization) -> Result<Vec<Vec<f32>>> {
        texts
            .iter()
            .map(|text| self.embed_one(text, normalization))
            .collect()
    }

    fn metadata(&self) -> ModelMetadata {
        self.metadata.clone()
    }
}

/// Default loader: constructs a [`GgufEngine`] on the blocking pool,
/// since reading and dequantizing the table touches the whole file.
#[derive(Debug, Clone, Copy, Default)]
pub struct GgufLoader;

#[async_trait]
impl EngineLoader for GgufLoader {
    async fn load(
        &self,
        artifact: &Path,
        options: &EngineOptions,
    ) -> Result<Box<dyn EmbeddingEngine>> {
        let path = artifact.to_path_buf();
        let options = *options;
        let engine = tokio::task::spawn_blocking(move || GgufEngine::load(&path, &options))
            .await
            .map_err(|err| {
                EmbedderError::Construction(format!("engine construction task failed: {err}"))
            })??;
        Ok(Box::new(engine))
    }
}

fn build_tokenizer(vocab: &[String], unk_token: String) -> Result<Tokenizer> {
    let ids: tokenizers::models::bpe::Vocab = vocab
        .iter()
        .enumerate()
        .map(|(id, token)| (token.clone(), id as u32))
        .collect();
    let model = WordPiece::builder()
        .vocab(ids)
        .unk_token(unk_token)
        .build()
        .map_err(|err| {
            EmbedderError::Construction(format!("cannot build tokenizer from vocabulary: {err}"))
        })?;

    let mut tokenizer = Tokenizer::new(model);
    tokenizer.with_normalizer(Some(BertNormalizer::new(true, true, None, true)));
    tokenizer.with_pre_tokenizer(Some(BertPreTokenizer));
    Ok(tokenizer)
}

/// Scales a vector in place per the requested mode. Zero vectors are
/// returned unchanged rather than divided by zero.
fn normalize(vector: &mut [f32], mode: Normalization) {
    let scale = match mode {
        Normalization::None => return,
        Normalization::MaxAbsInt16 => {
            let max = vector.iter().fold(0.0f32, |acc, v| acc.max(v.abs()));
            if max > 0.0 {
                32760.0 / max
            } else {
                return;
            }
        }
        Normalization::Taxicab => {
            let sum: f32 = vector.iter().map(|v| v.abs()).sum();
            if sum > 0.0 {
                1.0 / sum
            } else {
                return;
            }
        }
        Normalization::Euclidean => {
            let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
            if norm > 0.0 {
                1.0 / norm
            } else {
                return;
            }
        }
    };
    for value in vector {
        *value *= scale;
    }
}

fn vocabulary(metadata: &HashMap<String, Value>) -> Result<Vec<String>> {
    let raw = metadata.get("tokenizer.ggml.tokens").ok_or_else(|| {
        EmbedderError::Construction("model embeds no tokenizer vocabulary".to_string())
    })?;
    let Value::Array(items) = raw else {
        return Err(EmbedderError::Construction(
            "tokenizer vocabulary is not an array".to_string(),
        ));
    };
    items
        .iter()
        .map(|item| match item {
            Value::String(token) => Ok(token.clone()),
            other => Err(EmbedderError::Construction(format!(
                "tokenizer vocabulary holds a non-string entry: {}",
                value_display(other)
            ))),
        })
        .collect()
}

/// Looks up a special token id from container metadata, falling back to
/// a literal vocabulary entry. Out-of-range ids are discarded.
fn special_token(
    metadata: &HashMap<String, Value>,
    keys: &[&str],
    vocab_ids: &HashMap<&str, u32>,
    literal: &str,
    vocab_len: usize,
) -> Option<u32> {
    keys.iter()
        .find_map(|key| u32_value(metadata, key))
        .or_else(|| vocab_ids.get(literal).copied())
        .filter(|&id| (id as usize) < vocab_len)
}

fn string_value(metadata: &HashMap<String, Value>, key: &str) -> Option<String> {
    match metadata.get(key) {
        Some(Value::String(value)) => Some(value.clone()),
        _ => None,
    }
}

fn u32_value(metadata: &HashMap<String, Value>, key: &str) -> Option<u32> {
    match metadata.get(key) {
        Some(Value::U32(value)) => Some(*value),
        Some(Value::U64(value)) => u32::try_from(*value).ok(),
        Some(Value::I32(value)) => u32::try_from(*value).ok(),
        _ => None,
    }
}

fn value_display(value: &Value) -> String {
    match value {
        Value::U8(v) => v.to_string(),
        Value::I8(v) => v.to_string(),
        Value::U16(v) => v.to_string(),
        Value::I16(v) => v.to_string(),
        Value::U32(v) => v.to_string(),
        Value::I32(v) => v.to_string(),
        Value::U64(v) => v.to_string(),
        Value::I64(v) => v.to_string(),
        Value::F32(v) => v.to_string(),
        Value::F64(v) => v.to_string(),
        Value::Bool(v) => v.to_string(),
        Value::String(v) => v.clone(),
        Value::Array(items) => format!("[{} items]", items.len()),
    }
}
