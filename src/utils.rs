//! Small numeric helpers for the trainer
use rand::Rng;
use statrs::distribution::{ChiSquared, ContinuousCDF};

use crate::error::{AlnError, Result};

/// Draws from the triangular distribution on `[-half_width, half_width]` peaking at `0`
pub(crate) fn triangular<R: Rng>(rng: &mut R, half_width: f64) -> f64 {
    half_width * (rng.gen::<f64>() + rng.gen::<f64>() - 1.0)
}

/// Critical value of `chi²(dof) / dof` at the one-sided `confidence` level
pub(crate) fn chi_square_ratio_critical(dof: u64, confidence: f64) -> Result<f64> {
    let dof = dof.max(1) as f64;
    let distribution = ChiSquared::new(dof).map_err(|e| {
        AlnError::InvalidArgument(format!(
            "chi-square distribution with {} degrees of freedom: {}",
            dof, e
        ))
    })?;
    Ok(distribution.inverse_cdf(confidence) / dof)
}
