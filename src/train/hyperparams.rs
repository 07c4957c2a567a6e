use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;

use crate::error::AlnError;
use crate::param_guard::ParamGuard;

/// The set of hyperparameters that can be specified for a training run of an
/// [`Aln`](crate::Aln).
///
/// ### Example
///
/// ```rust
/// use linfa_aln::{ParamGuard, TrainParams};
///
/// let params = TrainParams::default()
///     .max_epochs(200)
///     .learn_rate(0.3)
///     .jitter(true)
///     .max_leaves(Some(64));
///
/// assert!(params.check_ref().is_ok());
/// assert!(TrainParams::default().learn_rate(1.5).check().is_err());
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct TrainParams<R: Rng>(pub(crate) TrainValidParams<R>);

/// A verified hyper-parameter set ready for training
///
/// See [`TrainParams`] for more information.
#[derive(Clone, Debug, PartialEq)]
pub struct TrainValidParams<R: Rng> {
    pub(crate) max_epochs: usize,
    pub(crate) min_rmse: f64,
    pub(crate) learn_rate: f64,
    pub(crate) jitter: bool,
    pub(crate) split_interval: usize,
    pub(crate) split_confidence: f64,
    pub(crate) noise_variance: Option<f64>,
    pub(crate) max_leaves: Option<usize>,
    pub(crate) starvation_ratio: f64,
    pub(crate) rng: R,
}

impl<R: Rng> TrainValidParams<R> {
    pub fn max_epochs(&self) -> usize {
        self.max_epochs
    }

    pub fn min_rmse(&self) -> f64 {
        self.min_rmse
    }

    pub fn learn_rate(&self) -> f64 {
        self.learn_rate
    }

    pub fn jitter(&self) -> bool {
        self.jitter
    }

    pub fn split_interval(&self) -> usize {
        self.split_interval
    }

    pub fn split_confidence(&self) -> f64 {
        self.split_confidence
    }

    pub fn noise_variance(&self) -> Option<f64> {
        self.noise_variance
    }

    pub fn max_leaves(&self) -> Option<usize> {
        self.max_leaves
    }

    pub fn starvation_ratio(&self) -> f64 {
        self.starvation_ratio
    }

    pub fn rng(&self) -> &R {
        &self.rng
    }
}

impl Default for TrainParams<Xoshiro256Plus> {
    fn default() -> Self {
        Self::default_with_rng(Xoshiro256Plus::seed_from_u64(42))
    }
}

impl TrainParams<Xoshiro256Plus> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<R: Rng> TrainParams<R> {
    /// Create new hyperparameters with a pre-defined random number generator
    pub fn default_with_rng(rng: R) -> Self {
        Self(TrainValidParams {
            max_epochs: 100,
            min_rmse: 0.0,
            learn_rate: 0.2,
            jitter: false,
            split_interval: 10,
            split_confidence: 0.99,
            noise_variance: None,
            max_leaves: None,
            starvation_ratio: 4.0,
            rng,
        })
    }

    /// Sets the maximum number of epochs.
    ///
    /// Defaults to `100`, must be at least `1`.
    pub fn max_epochs(mut self, max_epochs: usize) -> Self {
        self.0.max_epochs = max_epochs;
        self
    }

    /// Sets the RMSE below which training stops after an epoch.
    ///
    /// Defaults to `0.0`, which never triggers.
    pub fn min_rmse(mut self, min_rmse: f64) -> Self {
        self.0.min_rmse = min_rmse;
        self
    }

    /// Sets the learning rate, in `(0, 1]`.
    ///
    /// Defaults to `0.2`
    pub fn learn_rate(mut self, learn_rate: f64) -> Self {
        self.0.learn_rate = learn_rate;
        self
    }

    /// Enables triangular jitter of each input by up to its epsilon.
    pub fn jitter(mut self, jitter: bool) -> Self {
        self.0.jitter = jitter;
        self
    }

    /// Sets the number of epochs between two split checks.
    ///
    /// Defaults to `10`
    pub fn split_interval(mut self, split_interval: usize) -> Self {
        self.0.split_interval = split_interval;
        self
    }

    /// Sets the confidence level of the chi-square test deciding whether a leaf fits its
    /// samples. Levels closer to one split less eagerly.
    ///
    /// Defaults to `0.99`
    pub fn split_confidence(mut self, split_confidence: f64) -> Self {
        self.0.split_confidence = split_confidence;
        self
    }

    /// Sets the variance of the noise on the output.
    ///
    /// When unset, the squared epsilon of the output is used as the acceptable error.
    pub fn noise_variance(mut self, noise_variance: Option<f64>) -> Self {
        self.0.noise_variance = noise_variance;
        self
    }

    /// Caps the number of leaves growable splits may create.
    pub fn max_leaves(mut self, max_leaves: Option<usize>) -> Self {
        self.0.max_leaves = max_leaves;
        self
    }

    /// Sets how many times fewer hits an inactive child may see before it gets forced
    /// responsibility.
    ///
    /// Defaults to `4.0`
    pub fn starvation_ratio(mut self, starvation_ratio: f64) -> Self {
        self.0.starvation_ratio = starvation_ratio;
        self
    }

    /// Set the random number generator used for shuffling, initialization and jitter.
    ///
    /// Defaults to `Xoshiro256Plus` seeded with `42`
    pub fn with_rng<R2: Rng>(self, rng: R2) -> TrainParams<R2> {
        let p = self.0;
        TrainParams(TrainValidParams {
            max_epochs: p.max_epochs,
            min_rmse: p.min_rmse,
            learn_rate: p.learn_rate,
            jitter: p.jitter,
            split_interval: p.split_interval,
            split_confidence: p.split_confidence,
            noise_variance: p.noise_variance,
            max_leaves: p.max_leaves,
            starvation_ratio: p.starvation_ratio,
            rng,
        })
    }
}

impl<R: Rng> ParamGuard for TrainParams<R> {
    type Checked = TrainValidParams<R>;
    type Error = AlnError;

    fn check_ref(&self) -> Result<&Self::Checked, Self::Error> {
        let p = &self.0;
        if p.max_epochs == 0 {
            Err(AlnError::Parameters(
                "max_epochs must be at least 1".to_string(),
            ))
        } else if !(p.min_rmse.is_finite() && p.min_rmse >= 0.0) {
            Err(AlnError::Parameters(format!(
                "min_rmse must be non-negative and finite, but is {}",
                p.min_rmse
            )))
        } else if !(p.learn_rate > 0.0 && p.learn_rate <= 1.0) {
            Err(AlnError::Parameters(format!(
                "learn_rate must be in (0, 1], but is {}",
                p.learn_rate
            )))
        } else if p.split_interval == 0 {
            Err(AlnError::Parameters(
                "split_interval must be at least 1".to_string(),
            ))
        } else if !(p.split_confidence > 0.0 && p.split_confidence < 1.0) {
            Err(AlnError::Parameters(format!(
                "split_confidence must be in (0, 1), but is {}",
                p.split_confidence
            )))
        } else if matches!(p.noise_variance, Some(v) if !(v.is_finite() && v > 0.0)) {
            Err(AlnError::Parameters(format!(
                "noise_variance must be positive and finite, but is {:?}",
                p.noise_variance
            )))
        } else if p.max_leaves == Some(0) {
            Err(AlnError::Parameters(
                "max_leaves must be at least 1".to_string(),
            ))
        } else if !(p.starvation_ratio.is_finite() && p.starvation_ratio >= 1.0) {
            Err(AlnError::Parameters(format!(
                "starvation_ratio must be at least 1, but is {}",
                p.starvation_ratio
            )))
        } else {
            Ok(&self.0)
        }
    }

    fn check(self) -> Result<Self::Checked, Self::Error> {
        self.check_ref()?;
        Ok(self.0)
    }
}
