use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;

use super::DecisionTree;
use crate::error::AlnError;
use crate::param_guard::ParamGuard;

/// The set of hyperparameters that can be specified for compiling a network into a
/// [`DecisionTree`].
///
/// ### Example
///
/// ```rust
/// use linfa_aln::{DecisionTree, ParamGuard};
///
/// let params = DecisionTree::params().max_depth(4).probe_count(512);
/// assert!(params.check_ref().is_ok());
/// assert!(DecisionTree::params().max_depth(0).check().is_err());
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct DtreeParams<R: Rng>(pub(crate) DtreeValidParams<R>);

/// A verified hyper-parameter set ready for compilation
///
/// See [`DtreeParams`] for more information.
#[derive(Clone, Debug, PartialEq)]
pub struct DtreeValidParams<R: Rng> {
    pub(crate) max_depth: usize,
    pub(crate) probe_count: usize,
    pub(crate) fallback_leaf_factor: f64,
    pub(crate) rng: R,
}

impl<R: Rng> DtreeValidParams<R> {
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn probe_count(&self) -> usize {
        self.probe_count
    }

    pub fn fallback_leaf_factor(&self) -> f64 {
        self.fallback_leaf_factor
    }

    pub fn rng(&self) -> &R {
        &self.rng
    }
}

impl Default for DtreeParams<Xoshiro256Plus> {
    fn default() -> Self {
        Self::default_with_rng(Xoshiro256Plus::seed_from_u64(42))
    }
}

impl DecisionTree {
    /// Defaults are provided if the optional parameters are not specified:
    /// * `max_depth = 8`
    /// * `probe_count = 256`
    /// * `fallback_leaf_factor = 2.0`
    // Violates the convention that new should return a value of type `Self`
    #[allow(clippy::new_ret_no_self)]
    pub fn params() -> DtreeParams<Xoshiro256Plus> {
        DtreeParams::default()
    }
}

impl<R: Rng> DtreeParams<R> {
    /// Create new hyperparameters with a pre-defined random number generator
    pub fn default_with_rng(rng: R) -> Self {
        Self(DtreeValidParams {
            max_depth: 8,
            probe_count: 256,
            fallback_leaf_factor: 2.0,
            rng,
        })
    }

    /// Sets the maximum depth of the partition, `1` compiling the whole network into a
    /// single block.
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.0.max_depth = max_depth;
        self
    }

    /// Sets the number of random points probed in a box to locate the responsible pieces.
    pub fn probe_count(mut self, probe_count: usize) -> Self {
        self.0.probe_count = probe_count;
        self
    }

    /// Blocks with at least `fallback_leaf_factor` times as many pieces as variables are
    /// halved on a random axis when no cut separates their pieces.
    pub fn fallback_leaf_factor(mut self, fallback_leaf_factor: f64) -> Self {
        self.0.fallback_leaf_factor = fallback_leaf_factor;
        self
    }

    /// Set the random number generator used for probing and fallback cuts.
    ///
    /// Defaults to `Xoshiro256Plus` seeded with `42`
    pub fn with_rng<R2: Rng>(self, rng: R2) -> DtreeParams<R2> {
        DtreeParams(DtreeValidParams {
            max_depth: self.0.max_depth,
            probe_count: self.0.probe_count,
            fallback_leaf_factor: self.0.fallback_leaf_factor,
            rng,
        })
    }
}

impl<R: Rng> ParamGuard for DtreeParams<R> {
    type Checked = DtreeValidParams<R>;
    type Error = AlnError;

    fn check_ref(&self) -> Result<&Self::Checked, Self::Error> {
        if self.0.max_depth == 0 {
            Err(AlnError::Parameters(
                "max_depth must be at least 1".to_string(),
            ))
        } else if self.0.probe_count == 0 {
            Err(AlnError::Parameters(
                "probe_count must be at least 1".to_string(),
            ))
        } else if !(self.0.fallback_leaf_factor.is_finite() && self.0.fallback_leaf_factor >= 1.0)
        {
            Err(AlnError::Parameters(format!(
                "fallback_leaf_factor must be at least 1, but is {}",
                self.0.fallback_leaf_factor
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
