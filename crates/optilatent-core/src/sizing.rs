//! One sizing call: ratio text + preset in, resolution + latent shape out.
//!
//! Optimized mode parses an aspect ratio, clamps it into the preset's
//! recommended range and runs the resolution search. Exact mode takes the
//! caller's `WxH` as-is and only aligns it to the block size.

use tracing::warn;

use crate::consts::DETAILS_AR_DECIMALS;
use crate::error::Result;
use crate::latent::LatentShape;
use crate::preset::AlignmentPreset;
use crate::ratio::{parse_exact_dimensions, parse_ratio};
use crate::resolution::{align, find_resolution, Resolution};

/// Input to [`plan_sizing`]. Built per call and not retained.
#[derive(Clone, Debug)]
pub struct SizingRequest {
    /// Ratio (`16:9`, `1280x720`, `1.777`) or, in exact mode, `WxH`/`W:H`.
    pub dimensions: String,
    /// Swap orientation (16:9 becomes 9:16).
    pub invert: bool,
    /// Search for the best resolution; `false` selects exact mode.
    pub optimize: bool,
    pub preset: AlignmentPreset,
    pub batch_size: u32,
}

/// Result of a successful sizing call.
#[derive(Clone, Debug, PartialEq)]
pub struct SizingPlan {
    pub resolution: Resolution,
    /// Block size the resolution is aligned to.
    pub block: u32,
    pub latent: LatentShape,
    /// Set when the requested ratio was pulled into the preset's range.
    pub clamp_warning: Option<String>,
    /// Human-readable summary for display.
    pub details: String,
}

/// A ratio after orientation and range clamping.
#[derive(Clone, Debug, PartialEq)]
pub struct ClampedRatio {
    pub ratio: f64,
    pub min_ar: f64,
    pub max_ar: f64,
    pub warning: Option<String>,
}

/// Apply `invert` and clamp `ar` into the preset's `[min_ar, max_ar]`.
///
/// Inverting flips both the ratio and the bounds, so a preset allowing
/// `0.5..=3.5` accepts `1/3.5..=2.0` for inverted requests.
pub fn clamp_ratio(ar: f64, invert: bool, preset: &AlignmentPreset) -> ClampedRatio {
    let (ratio, min_ar, max_ar) = if invert {
        (1.0 / ar, 1.0 / preset.max_ar, 1.0 / preset.min_ar)
    } else {
        (ar, preset.min_ar, preset.max_ar)
    };

    if (min_ar..=max_ar).contains(&ratio) {
        return ClampedRatio {
            ratio,
            min_ar,
            max_ar,
            warning: None,
        };
    }

    let warning = format!(
        "Warning: ratio {ratio:.3} is outside recommended range for {} ({min_ar:.2}-{max_ar:.2}). Clamping for best results.",
        preset.name
    );
    warn!(preset = %preset.name, ratio, min_ar, max_ar, "Aspect ratio clamped");
    ClampedRatio {
        ratio: ratio.clamp(min_ar, max_ar),
        min_ar,
        max_ar,
        warning: Some(warning),
    }
}

/// Compute the resolution and latent shape for one request.
pub fn plan_sizing(request: &SizingRequest) -> Result<SizingPlan> {
    request.preset.validate()?;
    if request.optimize {
        plan_optimized(request)
    } else {
        plan_exact(request)
    }
}

fn plan_optimized(request: &SizingRequest) -> Result<SizingPlan> {
    let preset = &request.preset;
    let ar = parse_ratio(&request.dimensions)?;
    let clamped = clamp_ratio(ar, request.invert, preset);

    let params = preset
        .search_params()
        .with_bounds(clamped.min_ar, clamped.max_ar);
    let resolution = find_resolution(clamped.ratio, preset.target_mp, preset.block, &params)?;
    let latent = LatentShape::new(
        resolution,
        request.batch_size,
        preset.channels,
        preset.vae_scale_factor,
    )?;

    let mut lines = Vec::new();
    if let Some(ref warning) = clamped.warning {
        lines.push(warning.clone());
    }
    lines.push(format!("Optimized Resolution: {resolution} px"));
    lines.push(format!(
        "Aspect Ratio: {} (requested: {})",
        rounded_ratio(resolution),
        request.dimensions
    ));
    lines.push(format!(
        "Target MP: {}, Actual MP: {:.3}",
        preset.target_mp,
        resolution.megapixels()
    ));
    push_preset_lines(&mut lines, preset);

    Ok(SizingPlan {
        resolution,
        block: preset.block,
        latent,
        clamp_warning: clamped.warning,
        details: lines.join("\n"),
    })
}

fn plan_exact(request: &SizingRequest) -> Result<SizingPlan> {
    let preset = &request.preset;
    let (mut w, mut h) = parse_exact_dimensions(&request.dimensions)?;
    if request.invert {
        std::mem::swap(&mut w, &mut h);
    }

    let resolution = Resolution::new(align(w as f64, preset.block), align(h as f64, preset.block));
    let latent = LatentShape::new(
        resolution,
        request.batch_size,
        preset.channels,
        preset.vae_scale_factor,
    )?;

    let mut lines = vec![format!("Exact Resolution: {resolution} px")];
    if i64::from(resolution.width) != w || i64::from(resolution.height) != h {
        lines.push(format!(
            "Adjusted from {w}x{h} to multiples of {}",
            preset.block
        ));
    }
    lines.push(format!("Aspect Ratio: {}", rounded_ratio(resolution)));
    push_preset_lines(&mut lines, preset);

    Ok(SizingPlan {
        resolution,
        block: preset.block,
        latent,
        clamp_warning: None,
        details: lines.join("\n"),
    })
}

fn push_preset_lines(lines: &mut Vec<String>, preset: &AlignmentPreset) {
    lines.push(format!(
        "Block Size: {}, VAE Scale: {}",
        preset.block, preset.vae_scale_factor
    ));
    lines.push(format!("Model: {}", preset.description()));
}

fn rounded_ratio(resolution: Resolution) -> f64 {
    let scale = 10f64.powi(DETAILS_AR_DECIMALS);
    (resolution.aspect_ratio() * scale).round() / scale
}
