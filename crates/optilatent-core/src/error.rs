use thiserror::Error;

#[derive(Error, Debug)]
pub enum OptiError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("No valid resolution found for ratio {ar:.4} at {target_mp} MP (block {block})")]
    NoResolutionFound { ar: f64, target_mp: f64, block: u32 },

    #[error("Resolution {width}x{height} exceeds the {max}px limit")]
    ResolutionTooLarge { width: u32, height: u32, max: u32 },

    #[error("Latent buffer {shape} exceeds {max} elements")]
    LatentTooLarge { shape: String, max: usize },

    #[error("Latent allocation failed: {0}")]
    Allocation(#[from] std::collections::TryReserveError),

    #[error("Unknown preset: {0}")]
    UnknownPreset(String),

    #[error("Invalid preset '{name}': {reason}")]
    InvalidPreset { name: String, reason: String },

    #[error("Batch size {value} out of range (1..={max})")]
    InvalidBatchSize { value: u32, max: u32 },

    #[error("Unknown encoder: {0}")]
    UnknownEncoder(String),

    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    #[error("Preset config error: {0}")]
    Config(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, OptiError>;
