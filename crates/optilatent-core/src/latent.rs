use ndarray::Array4;

use crate::consts::{MAX_BATCH_SIZE, MAX_LATENT_ELEMENTS, MAX_RESOLUTION};
use crate::error::{OptiError, Result};
use crate::resolution::Resolution;

/// Shape of a latent buffer: `(batch, channels, height, width)` in latent
/// units, i.e. pixel dimensions divided by the VAE scale factor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LatentShape {
    pub batch: usize,
    pub channels: usize,
    pub height: usize,
    pub width: usize,
}

impl LatentShape {
    /// Compute the latent shape for an image of `resolution` pixels.
    ///
    /// Dimensions not divisible by `vae_scale_factor` are truncated. Sides
    /// above [`MAX_RESOLUTION`] and buffers above [`MAX_LATENT_ELEMENTS`]
    /// are rejected.
    pub fn new(
        resolution: Resolution,
        batch_size: u32,
        channels: u32,
        vae_scale_factor: u32,
    ) -> Result<Self> {
        if batch_size == 0 || batch_size > MAX_BATCH_SIZE {
            return Err(OptiError::InvalidBatchSize {
                value: batch_size,
                max: MAX_BATCH_SIZE,
            });
        }
        if vae_scale_factor == 0 {
            return Err(OptiError::InvalidFormat(
                "VAE scale factor must be positive".into(),
            ));
        }
        check_resolution(resolution)?;

        let shape = Self {
            batch: batch_size as usize,
            channels: channels as usize,
            height: (resolution.height / vae_scale_factor) as usize,
            width: (resolution.width / vae_scale_factor) as usize,
        };
        shape.checked_len()?;
        Ok(shape)
    }

    pub fn dims(&self) -> (usize, usize, usize, usize) {
        (self.batch, self.channels, self.height, self.width)
    }

    /// Total element count, `None` on overflow.
    pub fn element_count(&self) -> Option<usize> {
        self.batch
            .checked_mul(self.channels)?
            .checked_mul(self.height)?
            .checked_mul(self.width)
    }

    fn checked_len(&self) -> Result<usize> {
        match self.element_count() {
            Some(len) if len <= MAX_LATENT_ELEMENTS => Ok(len),
            _ => Err(OptiError::LatentTooLarge {
                shape: self.to_string(),
                max: MAX_LATENT_ELEMENTS,
            }),
        }
    }

    /// Allocate a zero-filled buffer of this shape.
    ///
    /// Allocation failure is reported as an error instead of aborting.
    pub fn zeros(&self) -> Result<Array4<f32>> {
        let len = self.checked_len()?;
        let mut data = Vec::new();
        data.try_reserve_exact(len)?;
        data.resize(len, 0.0f32);
        Array4::from_shape_vec(self.dims(), data)
            .map_err(|e| OptiError::InvalidFormat(format!("latent shape {self}: {e}")))
    }
}

/// Reject resolutions with a side above [`MAX_RESOLUTION`].
fn check_resolution(resolution: Resolution) -> Result<()> {
    if resolution.width > MAX_RESOLUTION || resolution.height > MAX_RESOLUTION {
        return Err(OptiError::ResolutionTooLarge {
            width: resolution.width,
            height: resolution.height,
            max: MAX_RESOLUTION,
        });
    }
    Ok(())
}

impl std::fmt::Display for LatentShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}, {}, {}, {}]",
            self.batch, self.channels, self.height, self.width
        )
    }
}
