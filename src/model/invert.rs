use tracing::info;

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use super::{Aln, NodeKind};
use crate::error::{AlnError, Result};

/// Sign pattern of the weights on one variable over all pieces of a network
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Monotonicity {
    /// Every weight is positive
    StrongIncreasing,
    /// Every weight is non-negative, some are zero
    WeakIncreasing,
    /// Every weight is negative
    StrongDecreasing,
    /// Every weight is non-positive, some are zero
    WeakDecreasing,
    /// Every weight is zero
    Constant,
    /// Weights of both signs
    Free,
}

impl Monotonicity {
    pub fn is_strong(self) -> bool {
        matches!(
            self,
            Monotonicity::StrongIncreasing | Monotonicity::StrongDecreasing
        )
    }
}

impl Aln {
    /// Classifies the monotonicity of the network in variable `var`
    pub fn monotonicity(&self, var: usize) -> Result<Monotonicity> {
        if var >= self.n_dim {
            return Err(AlnError::InvalidArgument(format!(
                "variable index {} out of range for dimension {}",
                var, self.n_dim
            )));
        }

        let (mut positive, mut negative, mut zero) = (false, false, false);
        for (_, lfn) in self.leaves() {
            let w = lfn.weight(var);
            if w > 0.0 {
                positive = true;
            } else if w < 0.0 {
                negative = true;
            } else {
                zero = true;
            }
        }

        Ok(match (positive, negative, zero) {
            (true, true, _) => Monotonicity::Free,
            (true, false, false) => Monotonicity::StrongIncreasing,
            (true, false, true) => Monotonicity::WeakIncreasing,
            (false, true, false) => Monotonicity::StrongDecreasing,
            (false, true, true) => Monotonicity::WeakDecreasing,
            (false, false, _) => Monotonicity::Constant,
        })
    }

    /// Makes `new_output` the output variable of the network.
    ///
    /// The network must be strictly monotonic in `new_output`. Every piece is rescaled so that
    /// its weight on `new_output` becomes `-1`; when the network was increasing in that
    /// variable the rescaling flips the sign of all distances, and every MIN becomes a MAX and
    /// vice versa. Weight bounds no longer apply to the rescaled weights and are reset to the
    /// default range.
    pub fn invert(&mut self, new_output: usize) -> Result<()> {
        let found = self.monotonicity(new_output)?;
        if new_output == self.output {
            return Ok(());
        }
        if !found.is_strong() {
            return Err(AlnError::NotMonotonic {
                var: new_output,
                found,
            });
        }
        let flip = found == Monotonicity::StrongIncreasing;

        for node in self.nodes.iter_mut() {
            match &mut node.kind {
                NodeKind::Leaf(lfn) => {
                    let scale = -1.0 / lfn.w[new_output + 1];
                    lfn.w.mapv_inplace(|w| w * scale);
                    lfn.w[new_output + 1] = -1.0;
                }
                NodeKind::MinMax(mm) => {
                    if flip {
                        mm.op = mm.op.flip();
                    }
                }
            }
            node.distance = 0.0;
        }

        for var in 0..self.n_dim {
            self.region.constraint_mut(var)?.reset_weight_bound();
        }
        info!(
            old_output = self.output,
            new_output, flip, "inverted network"
        );
        self.output = new_output;

        Ok(())
    }
}
