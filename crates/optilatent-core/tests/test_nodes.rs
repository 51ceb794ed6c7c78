use optilatent_core::nodes::{LatentInputs, OptimalLatentNode, TokenCounterNode};
use optilatent_core::preset::{CustomPreset, PresetChoice, PresetTable};
use optilatent_core::tokens::{FileTokenizerLoader, TokenizerCache, DEFAULT_ENCODER};

fn inputs(dimensions: &str) -> LatentInputs {
    LatentInputs {
        dimensions: dimensions.into(),
        ..LatentInputs::default()
    }
}

#[test]
fn test_default_inputs_give_sdxl_square() {
    let out = OptimalLatentNode::builtin().execute(&LatentInputs::default());
    assert_eq!((out.width, out.height, out.block_size), (1024, 1024, 64));
    let latent = out.latent.expect("latent buffer");
    assert_eq!(latent.shape(), &[1, 4, 128, 128]);
    assert!(latent.iter().all(|&v| v == 0.0));
    assert!(!out.details.is_empty());
}

#[test]
fn test_batch_size_sets_leading_dimension() {
    let out = OptimalLatentNode::builtin().execute(&LatentInputs {
        batch_size: 3,
        ..inputs("16:9")
    });
    assert_eq!(out.latent.unwrap().shape(), &[3, 4, 96, 168]);
}

#[test]
fn test_invalid_ratio_returns_sentinel() {
    let out = OptimalLatentNode::builtin().execute(&inputs("abc"));
    assert!(out.is_error());
    assert_eq!((out.width, out.height), (0, 0));
    assert_eq!(out.block_size, 64);
    assert!(out.details.starts_with("Invalid dimensions"), "got: {}", out.details);
}

#[test]
fn test_exact_mode_error_is_labelled() {
    let out = OptimalLatentNode::builtin().execute(&LatentInputs {
        optimization: false,
        ..inputs("16")
    });
    assert!(out.is_error());
    assert!(
        out.details.starts_with("Exact resolution error"),
        "got: {}",
        out.details
    );
}

#[test]
fn test_exact_mode_huge_dimensions_return_sentinel() {
    let out = OptimalLatentNode::builtin().execute(&LatentInputs {
        optimization: false,
        ..inputs("4000000000x4000000000")
    });
    assert!(out.is_error());
    assert_eq!((out.width, out.height), (0, 0));
    assert!(
        out.details.starts_with("Exact resolution error"),
        "got: {}",
        out.details
    );
}

#[test]
fn test_custom_target_above_limit_returns_sentinel() {
    let out = OptimalLatentNode::builtin().execute(&LatentInputs {
        preset: PresetChoice::Custom(CustomPreset {
            block: 64,
            vae_scale_factor: 8,
            target_mp: 1.0e9,
            search_range: None,
        }),
        ..inputs("1:1")
    });
    assert!(out.is_error());
    assert!(out.details.starts_with("Preset error"), "got: {}", out.details);
}

#[test]
fn test_exact_mode_success() {
    let out = OptimalLatentNode::builtin().execute(&LatentInputs {
        optimization: false,
        invert: true,
        preset: PresetChoice::named("SD1 (512px)"),
        ..inputs("1280x720")
    });
    assert_eq!((out.width, out.height, out.block_size), (720, 1280, 8));
    assert_eq!(out.latent.unwrap().shape(), &[1, 4, 160, 90]);
}

#[test]
fn test_unknown_preset_returns_sentinel() {
    let out = OptimalLatentNode::builtin().execute(&LatentInputs {
        preset: PresetChoice::named("SD9"),
        ..LatentInputs::default()
    });
    assert!(out.is_error());
    assert_eq!(out.block_size, 0);
    assert!(out.details.contains("SD9"), "got: {}", out.details);
}

#[test]
fn test_custom_preset() {
    let out = OptimalLatentNode::builtin().execute(&LatentInputs {
        preset: PresetChoice::Custom(CustomPreset {
            block: 8,
            vae_scale_factor: 8,
            target_mp: 0.262144,
            search_range: None,
        }),
        ..inputs("1:1")
    });
    assert_eq!((out.width, out.height, out.block_size), (512, 512, 8));
    assert_eq!(out.latent.unwrap().shape(), &[1, 4, 64, 64]);
    assert!(out.details.contains("Custom (Block: 8"), "got: {}", out.details);
}

#[test]
fn test_unreachable_target_reports_resolution_error() {
    let out = OptimalLatentNode::builtin().execute(&LatentInputs {
        preset: PresetChoice::Custom(CustomPreset {
            block: 64,
            vae_scale_factor: 8,
            target_mp: 0.001,
            search_range: None,
        }),
        ..inputs("1:1")
    });
    assert!(out.is_error());
    assert_eq!(out.block_size, 64);
    assert!(out.details.starts_with("Resolution error"), "got: {}", out.details);
}

#[test]
fn test_node_with_loaded_table() {
    let table = PresetTable::from_toml_str(
        "[[preset]]\nname = \"Flux\"\nblock = 16\ntarget_mp = 1.048576\nmin_ar = 0.25\nmax_ar = 4.0",
    )
    .unwrap();
    let node = OptimalLatentNode::new(&table);
    let out = node.execute(&LatentInputs {
        preset: PresetChoice::named("Flux"),
        ..inputs("1:1")
    });
    assert_eq!((out.width, out.height, out.block_size), (1024, 1024, 16));
    assert_eq!(node.presets().len(), 1);
}

#[test]
fn test_token_counter_blank_and_missing_text() {
    let dir = tempfile::tempdir().unwrap();
    let mut node = TokenCounterNode::new(TokenizerCache::new(FileTokenizerLoader::new(dir.path())));

    let out = node.execute(DEFAULT_ENCODER, None);
    assert_eq!(out.total_tokens, 0);
    assert_eq!(out.text, "");

    let out = node.execute(DEFAULT_ENCODER, Some("   \n"));
    assert_eq!(out.total_tokens, 0);
    assert_eq!(out.text, "   \n");
    assert!(node.cache().is_empty());
}

#[test]
fn test_token_counter_failures_count_zero() {
    let dir = tempfile::tempdir().unwrap();
    let mut node = TokenCounterNode::new(TokenizerCache::new(FileTokenizerLoader::new(dir.path())));

    // No tokenizer.json on disk.
    let out = node.execute(DEFAULT_ENCODER, Some("a red fox"));
    assert_eq!(out.total_tokens, 0);
    assert_eq!(out.text, "a red fox");

    let out = node.execute("Not an encoder", Some("a red fox"));
    assert_eq!(out.total_tokens, 0);
}
