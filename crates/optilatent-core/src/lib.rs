pub mod consts;
pub mod error;
pub mod latent;
pub mod nodes;
pub mod preset;
pub mod ratio;
pub mod resolution;
pub mod sizing;
pub mod tokens;
