//! Alignment presets: named bundles of block size, pixel budget and
//! aspect-ratio bounds for one model family.
//!
//! Presets are read-only once built. The built-in table is initialized on
//! first use and shared for the life of the process; other tables come from
//! a TOML document of `[[preset]]` entries.

use std::collections::HashSet;
use std::path::Path;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::consts::{
    CUSTOM_MAX_AR, CUSTOM_MIN_AR, CUSTOM_PRESET_NAME, DEFAULT_LATENT_CHANNELS,
    DEFAULT_REL_AR_TOL, DEFAULT_SEARCH_RANGE, DEFAULT_VAE_SCALE_FACTOR, FALLBACK_MAX_AR,
    FALLBACK_MIN_AR, MAX_SEARCH_RANGE, MAX_TARGET_MP,
};
use crate::error::{OptiError, Result};
use crate::resolution::SearchParams;

/// One named alignment configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AlignmentPreset {
    pub name: String,
    /// Width and height must be multiples of this.
    pub block: u32,
    /// Pixel-space to latent-space downsampling factor.
    #[serde(default = "default_vae_scale_factor")]
    pub vae_scale_factor: u32,
    /// Target area in megapixels (`width * height / 1e6`).
    pub target_mp: f64,
    #[serde(default = "default_channels")]
    pub channels: u32,
    #[serde(default = "default_min_ar")]
    pub min_ar: f64,
    #[serde(default = "default_max_ar")]
    pub max_ar: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_range: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rel_ar_tol: Option<f64>,
    #[serde(default, rename = "desc", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn default_vae_scale_factor() -> u32 {
    DEFAULT_VAE_SCALE_FACTOR
}
fn default_channels() -> u32 {
    DEFAULT_LATENT_CHANNELS
}
fn default_min_ar() -> f64 {
    FALLBACK_MIN_AR
}
fn default_max_ar() -> f64 {
    FALLBACK_MAX_AR
}

impl AlignmentPreset {
    fn builtin(name: &str, block: u32, target_mp: f64, description: &str) -> Self {
        Self {
            name: name.to_string(),
            block,
            vae_scale_factor: DEFAULT_VAE_SCALE_FACTOR,
            target_mp,
            channels: DEFAULT_LATENT_CHANNELS,
            min_ar: 0.5,
            max_ar: 3.5,
            search_range: None,
            rel_ar_tol: None,
            description: Some(description.to_string()),
        }
    }

    /// Description for display, falling back to the preset name.
    pub fn description(&self) -> &str {
        self.description.as_deref().unwrap_or(&self.name)
    }

    /// Search tuning derived from this preset.
    pub fn search_params(&self) -> SearchParams {
        SearchParams::default()
            .with_search_range(self.search_range.unwrap_or(DEFAULT_SEARCH_RANGE))
            .with_rel_ar_tol(self.rel_ar_tol.unwrap_or(DEFAULT_REL_AR_TOL))
            .with_bounds(self.min_ar, self.max_ar)
    }

    /// Check the invariants every preset must hold.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| {
            Err(OptiError::InvalidPreset {
                name: self.name.clone(),
                reason: reason.to_string(),
            })
        };

        if self.block == 0 {
            return invalid("block must be positive");
        }
        if self.vae_scale_factor == 0 {
            return invalid("vae_scale_factor must be positive");
        }
        if self.channels == 0 {
            return invalid("channels must be positive");
        }
        if !self.target_mp.is_finite() || self.target_mp <= 0.0 {
            return invalid("target_mp must be a positive number");
        }
        if self.target_mp > MAX_TARGET_MP {
            return invalid(&format!("target_mp exceeds the {MAX_TARGET_MP} MP limit"));
        }
        if !(self.min_ar.is_finite() && self.max_ar.is_finite()) || self.min_ar <= 0.0 {
            return invalid("min_ar and max_ar must be positive numbers");
        }
        if self.min_ar > self.max_ar {
            return invalid("min_ar must not exceed max_ar");
        }
        if self.search_range.is_some_and(|r| r > MAX_SEARCH_RANGE) {
            return invalid("search_range is too large");
        }
        if let Some(tol) = self.rel_ar_tol {
            if !tol.is_finite() || tol < 0.0 {
                return invalid("rel_ar_tol must be a non-negative number");
            }
        }
        Ok(())
    }
}

/// Caller-supplied parameters for the "Custom" preset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CustomPreset {
    pub block: u32,
    pub vae_scale_factor: u32,
    pub target_mp: f64,
    #[serde(default)]
    pub search_range: Option<u32>,
}

impl Default for CustomPreset {
    fn default() -> Self {
        Self {
            block: 64,
            vae_scale_factor: DEFAULT_VAE_SCALE_FACTOR,
            target_mp: 1.048576,
            search_range: None,
        }
    }
}

impl CustomPreset {
    /// Build the full preset, filling the fixed custom bounds and channels.
    pub fn to_preset(&self) -> Result<AlignmentPreset> {
        let preset = AlignmentPreset {
            name: CUSTOM_PRESET_NAME.to_string(),
            block: self.block,
            vae_scale_factor: self.vae_scale_factor,
            target_mp: self.target_mp,
            channels: DEFAULT_LATENT_CHANNELS,
            min_ar: CUSTOM_MIN_AR,
            max_ar: CUSTOM_MAX_AR,
            search_range: self.search_range,
            rel_ar_tol: None,
            description: Some(format!(
                "Custom (Block: {}, VAE Scale: {}, Target: {}MP)",
                self.block, self.vae_scale_factor, self.target_mp
            )),
        };
        preset.validate()?;
        Ok(preset)
    }
}

/// Either a named preset from a table or caller-supplied custom values.
#[derive(Clone, Debug, PartialEq)]
pub enum PresetChoice {
    Named(String),
    Custom(CustomPreset),
}

impl PresetChoice {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }
}

#[derive(Deserialize, Serialize)]
struct PresetDocument {
    #[serde(default)]
    preset: Vec<AlignmentPreset>,
}

/// Ordered, immutable collection of presets with lookup by name.
#[derive(Clone, Debug, PartialEq)]
pub struct PresetTable {
    presets: Vec<AlignmentPreset>,
}

impl PresetTable {
    /// Build a table, validating every preset and rejecting duplicate or
    /// reserved names.
    pub fn new(presets: Vec<AlignmentPreset>) -> Result<Self> {
        let mut seen = HashSet::new();
        for preset in &presets {
            preset.validate()?;
            if preset.name == CUSTOM_PRESET_NAME {
                return Err(OptiError::InvalidPreset {
                    name: preset.name.clone(),
                    reason: format!("'{CUSTOM_PRESET_NAME}' is reserved"),
                });
            }
            if !seen.insert(preset.name.as_str()) {
                return Err(OptiError::InvalidPreset {
                    name: preset.name.clone(),
                    reason: "duplicate preset name".into(),
                });
            }
        }
        Ok(Self { presets })
    }

    /// The bundled presets, shared for the life of the process.
    pub fn builtin() -> &'static PresetTable {
        static BUILTIN: OnceLock<PresetTable> = OnceLock::new();
        BUILTIN.get_or_init(|| PresetTable {
            presets: builtin_presets(),
        })
    }

    /// Parse a TOML document of `[[preset]]` tables.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let doc: PresetDocument = toml::from_str(contents)?;
        Self::new(doc.preset)
    }

    /// Read and parse a preset file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let table = Self::from_toml_str(&contents)?;
        info!(
            path = %path.display(),
            count = table.presets.len(),
            "Loaded alignment presets"
        );
        Ok(table)
    }

    /// Serialize back to the TOML document format.
    pub fn to_toml_string(&self) -> std::result::Result<String, toml::ser::Error> {
        toml::to_string_pretty(&PresetDocument {
            preset: self.presets.clone(),
        })
    }

    pub fn get(&self, name: &str) -> Option<&AlignmentPreset> {
        self.presets.iter().find(|p| p.name == name)
    }

    /// Preset names in table order, followed by the custom option.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.presets
            .iter()
            .map(|p| p.name.as_str())
            .chain(std::iter::once(CUSTOM_PRESET_NAME))
    }

    pub fn iter(&self) -> impl Iterator<Item = &AlignmentPreset> {
        self.presets.iter()
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }

    /// Resolve a choice into an owned preset.
    pub fn resolve(&self, choice: &PresetChoice) -> Result<AlignmentPreset> {
        match choice {
            PresetChoice::Named(name) => self
                .get(name)
                .cloned()
                .ok_or_else(|| OptiError::UnknownPreset(name.clone())),
            PresetChoice::Custom(custom) => custom.to_preset(),
        }
    }
}

fn builtin_presets() -> Vec<AlignmentPreset> {
    vec![
        AlignmentPreset::builtin(
            "SD1 (512px)",
            8,
            0.262144,
            "SD1.x, 512x512, 4-channel latent, block 8",
        ),
        AlignmentPreset::builtin(
            "SD2 (768px)",
            8,
            0.589824,
            "SD2.x, 768x768, 4-channel latent, block 8",
        ),
        AlignmentPreset::builtin(
            "SDXL (1024px)",
            64,
            1.048576,
            "SDXL, 1024x1024, 4-channel latent, block 64",
        ),
        AlignmentPreset::builtin(
            "SDXL (Div-32)",
            32,
            1.048576,
            "SDXL experimental, block 32",
        ),
        AlignmentPreset::builtin(
            "SDXL (Div-16)",
            16,
            1.048576,
            "SDXL experimental, block 16",
        ),
        AlignmentPreset::builtin(
            "SDXL (Div-8)",
            8,
            1.048576,
            "SDXL experimental, block 8",
        ),
    ]
}
