//! Host-facing node adapters.
//!
//! Nodes never return errors. A failed call yields a sentinel output
//! (zero width and height, no buffer or zero tokens) with the reason in the
//! details text, and the failure is logged.

use ndarray::Array4;
use tracing::warn;

use crate::error::OptiError;
use crate::preset::{PresetChoice, PresetTable};
use crate::sizing::{plan_sizing, SizingRequest};
use crate::tokens::{count_prompt_tokens, TokenizerCache, TokenizerLoader};

/// Inputs of the optimal-latent node.
#[derive(Clone, Debug)]
pub struct LatentInputs {
    pub dimensions: String,
    pub invert: bool,
    pub optimization: bool,
    pub preset: PresetChoice,
    pub batch_size: u32,
}

impl Default for LatentInputs {
    fn default() -> Self {
        Self {
            dimensions: "1:1".into(),
            invert: false,
            optimization: true,
            preset: PresetChoice::named("SDXL (1024px)"),
            batch_size: 1,
        }
    }
}

/// Outputs of the optimal-latent node.
#[derive(Clone, Debug)]
pub struct LatentOutput {
    /// Zero-filled latent buffer; `None` when the call failed.
    pub latent: Option<Array4<f32>>,
    pub width: u32,
    pub height: u32,
    pub block_size: u32,
    pub details: String,
}

impl LatentOutput {
    fn failed(block_size: u32, details: String) -> Self {
        warn!(%details, "Optimal latent node failed");
        Self {
            latent: None,
            width: 0,
            height: 0,
            block_size,
            details,
        }
    }

    pub fn is_error(&self) -> bool {
        self.latent.is_none()
    }
}

/// Picks an aligned resolution for a ratio and preset and allocates an
/// empty latent batch for it.
#[derive(Clone, Copy, Debug)]
pub struct OptimalLatentNode<'a> {
    presets: &'a PresetTable,
}

impl OptimalLatentNode<'static> {
    /// Node backed by the built-in preset table.
    pub fn builtin() -> Self {
        Self::new(PresetTable::builtin())
    }
}

impl<'a> OptimalLatentNode<'a> {
    pub fn new(presets: &'a PresetTable) -> Self {
        Self { presets }
    }

    pub fn presets(&self) -> &'a PresetTable {
        self.presets
    }

    pub fn execute(&self, inputs: &LatentInputs) -> LatentOutput {
        let preset = match self.presets.resolve(&inputs.preset) {
            Ok(preset) => preset,
            Err(e) => return LatentOutput::failed(0, format!("Preset error: {e}")),
        };
        let block = preset.block;

        let request = SizingRequest {
            dimensions: inputs.dimensions.clone(),
            invert: inputs.invert,
            optimize: inputs.optimization,
            preset,
            batch_size: inputs.batch_size,
        };

        let sized = plan_sizing(&request)
            .and_then(|plan| plan.latent.zeros().map(|latent| (plan, latent)));
        match sized {
            Ok((plan, latent)) => LatentOutput {
                latent: Some(latent),
                width: plan.resolution.width,
                height: plan.resolution.height,
                block_size: plan.block,
                details: plan.details,
            },
            Err(e) => {
                let prefix = match &e {
                    OptiError::InvalidFormat(_) if inputs.optimization => "Invalid dimensions",
                    OptiError::InvalidFormat(_)
                    | OptiError::ResolutionTooLarge { .. }
                    | OptiError::LatentTooLarge { .. }
                    | OptiError::Allocation(_)
                        if !inputs.optimization =>
                    {
                        "Exact resolution error"
                    }
                    OptiError::NoResolutionFound { .. }
                    | OptiError::ResolutionTooLarge { .. }
                    | OptiError::LatentTooLarge { .. }
                    | OptiError::Allocation(_) => "Resolution error",
                    _ => "Error",
                };
                LatentOutput::failed(block, format!("{prefix}: {e}"))
            }
        }
    }
}

/// Outputs of the token counter node: the count and the prompt passed through.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenCountOutput {
    pub total_tokens: usize,
    pub text: String,
}

/// Counts prompt tokens with the selected encoder.
pub struct TokenCounterNode<L: TokenizerLoader> {
    cache: TokenizerCache<L>,
}

impl<L: TokenizerLoader> TokenCounterNode<L> {
    pub fn new(cache: TokenizerCache<L>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &TokenizerCache<L> {
        &self.cache
    }

    pub fn execute(&mut self, encoder: &str, text: Option<&str>) -> TokenCountOutput {
        let text = text.unwrap_or_default();
        let total_tokens = match count_prompt_tokens(&mut self.cache, encoder, text) {
            Ok(count) => count,
            Err(e) => {
                warn!(encoder, error = %e, "Token count failed");
                0
            }
        };
        TokenCountOutput {
            total_tokens,
            text: text.to_string(),
        }
    }
}
