/// Pixels in one megapixel; `target_mp` values are multiplied by this.
pub const PIXELS_PER_MEGAPIXEL: f64 = 1e6;

/// Lower aspect-ratio bound used when a preset omits `min_ar`.
pub const FALLBACK_MIN_AR: f64 = 0.4;

/// Upper aspect-ratio bound used when a preset omits `max_ar`.
pub const FALLBACK_MAX_AR: f64 = 2.5;

/// Aspect-ratio bounds applied to the "Custom" preset.
pub const CUSTOM_MIN_AR: f64 = 0.5;
pub const CUSTOM_MAX_AR: f64 = 3.75;

/// Name reserved for caller-supplied presets.
pub const CUSTOM_PRESET_NAME: &str = "Custom";

/// Block-steps examined on each side of the ideal height when a preset
/// does not set `search_range`.
pub const DEFAULT_SEARCH_RANGE: u32 = 2;

/// Largest `search_range` a preset may request.
pub const MAX_SEARCH_RANGE: u32 = 256;

/// Relative aspect-ratio error accepted by the exact-match pass.
pub const DEFAULT_REL_AR_TOL: f64 = 0.0;

/// Weight of the relative pixel-area error in the fallback score.
pub const DEFAULT_MP_WEIGHT: f64 = 10.0;

/// Weight of the relative aspect-ratio error in the fallback score.
pub const DEFAULT_AR_WEIGHT: f64 = 1.0;

/// Latent channel count for Stable Diffusion style models.
pub const DEFAULT_LATENT_CHANNELS: u32 = 4;

/// Spatial downsampling factor between pixel space and latent space.
pub const DEFAULT_VAE_SCALE_FACTOR: u32 = 8;

/// Largest width or height, in pixels, the crate will size a latent for.
pub const MAX_RESOLUTION: u32 = 16384;

/// Largest `target_mp` a preset may request.
pub const MAX_TARGET_MP: f64 = 16.0;

/// Upper bound on `batch * channels * height * width` of a latent buffer.
pub const MAX_LATENT_ELEMENTS: usize = 1 << 30;

/// Largest accepted batch size.
pub const MAX_BATCH_SIZE: u32 = 4096;

/// Decimal places shown for aspect ratios in the details text.
pub const DETAILS_AR_DECIMALS: i32 = 4;
