use std::cell::RefCell;
use std::fs;
use std::path::Path;

use optilatent_core::error::{OptiError, Result};
use optilatent_core::nodes::TokenCounterNode;
use optilatent_core::tokens::{
    count_prompt_tokens, encoder_model, FileTokenizerLoader, TokenCount, TokenizerCache,
    TokenizerLoader, DEFAULT_ENCODER, ENCODER_MODELS,
};

/// Splits on whitespace.
struct WordCounter;

impl TokenCount for WordCounter {
    fn count_tokens(&self, text: &str) -> Result<usize> {
        Ok(text.split_whitespace().count())
    }
}

/// Records every load; fails for model ids containing "t5".
#[derive(Default)]
struct RecordingLoader {
    loads: RefCell<Vec<String>>,
}

impl TokenizerLoader for RecordingLoader {
    type Tokenizer = WordCounter;

    fn load(&self, model_id: &str) -> Result<WordCounter> {
        self.loads.borrow_mut().push(model_id.to_string());
        if model_id.contains("t5") {
            return Err(OptiError::Tokenizer(format!("no files for {model_id}")));
        }
        Ok(WordCounter)
    }
}

/// Word-level tokenizer with a whitespace/punctuation pre-tokenizer.
const WORD_LEVEL_TOKENIZER: &str = r#"{
  "version": "1.0",
  "truncation": null,
  "padding": null,
  "added_tokens": [],
  "normalizer": null,
  "pre_tokenizer": { "type": "Whitespace" },
  "post_processor": null,
  "decoder": null,
  "model": {
    "type": "WordLevel",
    "vocab": { "[UNK]": 0, "a": 1, "red": 2, "fox": 3, ",": 4 },
    "unk_token": "[UNK]"
  }
}"#;

fn write_tokenizer(root: &Path, model_id: &str) {
    let dir = root.join(model_id);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("tokenizer.json"), WORD_LEVEL_TOKENIZER).unwrap();
}

// ---------------------------------------------------------------------------
// Encoder table
// ---------------------------------------------------------------------------

#[test]
fn test_default_encoder_is_listed() {
    assert_eq!(
        encoder_model(DEFAULT_ENCODER),
        Some("laion/CLIP-ViT-bigG-14-laion2B-39B-b160k")
    );
}

#[test]
fn test_encoder_lookup() {
    assert_eq!(encoder_model("T5 Small (Google)"), Some("google-t5/t5-small"));
    assert_eq!(encoder_model("clip"), None);
    assert_eq!(ENCODER_MODELS.len(), 8);
}

// ---------------------------------------------------------------------------
// Cache behaviour
// ---------------------------------------------------------------------------

#[test]
fn test_cache_loads_each_model_once() {
    let mut cache = TokenizerCache::new(RecordingLoader::default());
    let first = count_prompt_tokens(&mut cache, DEFAULT_ENCODER, "a red fox").unwrap();
    let second = count_prompt_tokens(&mut cache, DEFAULT_ENCODER, "two words").unwrap();
    assert_eq!((first, second), (3, 2));
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.loader().loads.borrow().len(), 1);
    assert!(cache.contains("laion/CLIP-ViT-bigG-14-laion2B-39B-b160k"));
}

#[test]
fn test_cache_keys_by_model() {
    let mut cache = TokenizerCache::new(RecordingLoader::default());
    count_prompt_tokens(&mut cache, "CLIP Base (OpenAI, Patch 16)", "x").unwrap();
    count_prompt_tokens(&mut cache, "CLIP Large (OpenAI, Patch 14)", "x").unwrap();
    assert_eq!(cache.len(), 2);

    cache.clear();
    assert!(cache.is_empty());
}

#[test]
fn test_blank_text_skips_loading() {
    let mut cache = TokenizerCache::new(RecordingLoader::default());
    assert_eq!(count_prompt_tokens(&mut cache, DEFAULT_ENCODER, "").unwrap(), 0);
    assert_eq!(count_prompt_tokens(&mut cache, DEFAULT_ENCODER, " \t ").unwrap(), 0);
    assert!(cache.is_empty());
}

#[test]
fn test_unknown_encoder_error() {
    let mut cache = TokenizerCache::new(RecordingLoader::default());
    let err = count_prompt_tokens(&mut cache, "GPT-2", "hello").unwrap_err();
    assert!(matches!(err, OptiError::UnknownEncoder(ref n) if n == "GPT-2"));
}

#[test]
fn test_failed_load_is_retried() {
    let mut cache = TokenizerCache::new(RecordingLoader::default());
    assert!(count_prompt_tokens(&mut cache, "T5 Small (Google)", "hi").is_err());
    assert!(count_prompt_tokens(&mut cache, "T5 Small (Google)", "hi").is_err());
    assert!(cache.is_empty());
    assert_eq!(cache.loader().loads.borrow().len(), 2);
}

#[test]
fn test_node_counts_with_injected_cache() {
    let mut node = TokenCounterNode::new(TokenizerCache::new(RecordingLoader::default()));
    let out = node.execute(DEFAULT_ENCODER, Some("a photo of a cat"));
    assert_eq!(out.total_tokens, 5);
    assert_eq!(out.text, "a photo of a cat");
    assert_eq!(node.cache().len(), 1);
}

// ---------------------------------------------------------------------------
// HuggingFace tokenizer files
// ---------------------------------------------------------------------------

#[test]
fn test_file_loader_path_layout() {
    let loader = FileTokenizerLoader::new("/models");
    assert_eq!(
        loader.tokenizer_path("openai/clip-vit-base-patch32"),
        Path::new("/models/openai/clip-vit-base-patch32/tokenizer.json")
    );
}

#[test]
fn test_file_loader_counts_word_level_tokens() {
    let dir = tempfile::tempdir().unwrap();
    let model_id = encoder_model(DEFAULT_ENCODER).unwrap();
    write_tokenizer(dir.path(), model_id);

    let mut cache = TokenizerCache::new(FileTokenizerLoader::new(dir.path()));
    // "a", "red", "fox", ",", "a", "[UNK]"
    let count = count_prompt_tokens(&mut cache, DEFAULT_ENCODER, "a red fox, a wolf").unwrap();
    assert_eq!(count, 6);
    assert!(cache.contains(model_id));
}

#[test]
fn test_file_loader_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let loader = FileTokenizerLoader::new(dir.path());
    match loader.load("google-t5/t5-small") {
        Err(OptiError::Tokenizer(msg)) => assert!(msg.contains("tokenizer.json"), "got: {msg}"),
        Err(other) => panic!("expected Tokenizer error, got {other:?}"),
        Ok(_) => panic!("loading a missing file should fail"),
    }
}
