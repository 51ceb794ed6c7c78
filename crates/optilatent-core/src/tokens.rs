//! Prompt token counting with a caller-owned tokenizer cache.
//!
//! Encoders are selected by display name and mapped to a model id. Each
//! model's tokenizer is loaded at most once per [`TokenizerCache`]; the cache
//! belongs to whoever creates it, so separate sessions never share state.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::PathBuf;

use tokenizers::Tokenizer;
use tracing::info;

use crate::error::{OptiError, Result};

/// Encoder selected when the caller does not pick one.
pub const DEFAULT_ENCODER: &str = "CLIP BigG-14 (LAION, Patch 14)";

/// Encoder display name to model id, in listing order.
pub const ENCODER_MODELS: &[(&str, &str)] = &[
    (
        "CLIP Base (LAION, Patch 16)",
        "laion/CLIP-ViT-H-14-laion2B-s32B-b79K",
    ),
    (
        "CLIP Base (OpenAI, Patch 16)",
        "openai/clip-vit-base-patch16",
    ),
    (
        "CLIP Base (OpenAI, Patch 32)",
        "openai/clip-vit-base-patch32",
    ),
    (
        "CLIP Large (OpenAI, Patch 14)",
        "openai/clip-vit-large-patch14",
    ),
    (
        "CLIP Large HQ (OpenAI, 336px)",
        "openai/clip-vit-large-patch14-336",
    ),
    (
        "CLIP BigG-14 (LAION, Patch 14)",
        "laion/CLIP-ViT-bigG-14-laion2B-39B-b160k",
    ),
    ("T5 Small (Google)", "google-t5/t5-small"),
    ("T5 XXL v1.1 (Google)", "google/t5-v1_1-xxl"),
];

/// Model id for an encoder display name.
pub fn encoder_model(name: &str) -> Option<&'static str> {
    ENCODER_MODELS
        .iter()
        .find(|(display, _)| *display == name)
        .map(|(_, model)| *model)
}

/// Anything that can count the tokens in a piece of text.
pub trait TokenCount {
    fn count_tokens(&self, text: &str) -> Result<usize>;
}

impl TokenCount for Tokenizer {
    /// Counts tokens without special tokens (no BOS/EOS).
    fn count_tokens(&self, text: &str) -> Result<usize> {
        self.encode(text, false)
            .map(|encoding| encoding.len())
            .map_err(|e| OptiError::Tokenizer(e.to_string()))
    }
}

/// Source of tokenizers by model id.
pub trait TokenizerLoader {
    type Tokenizer: TokenCount;

    fn load(&self, model_id: &str) -> Result<Self::Tokenizer>;
}

/// Loads `<root>/<model_id>/tokenizer.json` from disk.
#[derive(Clone, Debug)]
pub struct FileTokenizerLoader {
    root: PathBuf,
}

impl FileTokenizerLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn tokenizer_path(&self, model_id: &str) -> PathBuf {
        self.root.join(model_id).join("tokenizer.json")
    }
}

impl TokenizerLoader for FileTokenizerLoader {
    type Tokenizer = Tokenizer;

    fn load(&self, model_id: &str) -> Result<Tokenizer> {
        let path = self.tokenizer_path(model_id);
        Tokenizer::from_file(&path)
            .map_err(|e| OptiError::Tokenizer(format!("{}: {e}", path.display())))
    }
}

/// Memoizing tokenizer cache keyed by model id.
///
/// Failed loads are not cached.
pub struct TokenizerCache<L: TokenizerLoader> {
    loader: L,
    loaded: HashMap<String, L::Tokenizer>,
}

impl<L: TokenizerLoader> TokenizerCache<L> {
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            loaded: HashMap::new(),
        }
    }

    /// Return the cached tokenizer for `model_id`, loading it on first use.
    pub fn get_or_load(&mut self, model_id: &str) -> Result<&L::Tokenizer> {
        match self.loaded.entry(model_id.to_string()) {
            Entry::Occupied(entry) => Ok(&*entry.into_mut()),
            Entry::Vacant(entry) => {
                let tokenizer = self.loader.load(model_id)?;
                info!(model = model_id, "Tokenizer loaded");
                Ok(&*entry.insert(tokenizer))
            }
        }
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub fn contains(&self, model_id: &str) -> bool {
        self.loaded.contains_key(model_id)
    }

    pub fn len(&self) -> usize {
        self.loaded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty()
    }

    pub fn clear(&mut self) {
        self.loaded.clear();
    }
}

/// Count the tokens in `text` using the encoder named `encoder`.
///
/// Blank text counts as zero without touching the cache.
pub fn count_prompt_tokens<L: TokenizerLoader>(
    cache: &mut TokenizerCache<L>,
    encoder: &str,
    text: &str,
) -> Result<usize> {
    if text.trim().is_empty() {
        return Ok(0);
    }
    let model_id =
        encoder_model(encoder).ok_or_else(|| OptiError::UnknownEncoder(encoder.to_string()))?;
    cache.get_or_load(model_id)?.count_tokens(text)
}
