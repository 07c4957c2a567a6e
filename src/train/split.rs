use rand::Rng;
use tracing::{debug, info};

use super::adapt::Pass;
use super::algorithm::Trainer;
use crate::dataset::SampleSource;
use crate::error::Result;
use crate::model::{MinMaxOp, NodeId, NodeKind};
use crate::utils::chi_square_ratio_critical;

impl<'a, R: Rng + Clone, S: SampleSource> Trainer<'a, R, S> {
    /// Decides the fate of every growable leaf.
    ///
    /// The statistics are gathered in a clean pass over the samples without adaptation or
    /// jitter. A leaf whose mean squared error exceeds the acceptable level by more than the
    /// chi-square critical ratio at its number of hits is split, any other leaf with enough
    /// hits is frozen. Returns the number of splits and of frozen leaves.
    pub(super) fn split_control(&mut self) -> Result<(usize, usize)> {
        for node in self.aln.nodes.iter_mut() {
            if let NodeKind::Leaf(lfn) = &mut node.kind {
                if let Some(stats) = &mut lfn.split {
                    stats.reset();
                }
            }
        }
        for k in 0..self.rows.len() {
            let row = self.rows[k];
            self.sample(row, Pass::Measure)?;
        }

        let candidates: Vec<NodeId> = self
            .aln
            .leaves()
            .filter(|(_, lfn)| lfn.is_growable() && !lfn.is_frozen())
            .map(|(id, _)| id)
            .collect();
        let output_epsilon = self.aln.region.constraint(self.aln.output).epsilon();
        let acceptable = self
            .params
            .noise_variance
            .unwrap_or(output_epsilon * output_epsilon);
        let min_hits = (self.aln.n_dim + 1) as u64;

        let mut n_leaves = self.aln.num_leaves();
        let (mut splits, mut frozen) = (0, 0);
        for id in candidates {
            let stats = match self.aln.leaf(id).and_then(|lfn| lfn.split_stats()) {
                Some(stats) => stats.clone(),
                None => continue,
            };
            if self.params.max_leaves.map_or(false, |max| n_leaves >= max) {
                // the leaf cannot grow anymore
                self.freeze(id);
                frozen += 1;
                debug!(leaf = id.index(), "froze leaf at the leaf limit");
                continue;
            }
            if stats.hits < min_hits {
                debug!(leaf = id.index(), hits = stats.hits, "too few hits to decide");
                continue;
            }

            let ratio = stats.mean_sq_error() / acceptable;
            let critical = chi_square_ratio_critical(stats.hits, self.params.split_confidence)?;
            if ratio > critical {
                let op = if stats.convexity >= 0.0 {
                    MinMaxOp::Max
                } else {
                    MinMaxOp::Min
                };
                self.aln.split_growable(id, op)?;
                n_leaves += 1;
                splits += 1;
                info!(
                    leaf = id.index(),
                    ?op,
                    ratio,
                    critical,
                    hits = stats.hits,
                    "split leaf"
                );
            } else {
                self.freeze(id);
                frozen += 1;
                info!(leaf = id.index(), ratio, critical, "froze leaf");
            }
        }

        self.trace.reset(self.aln.nodes.len())?;
        Ok((splits, frozen))
    }

    fn freeze(&mut self, id: NodeId) {
        if let Some(lfn) = self.aln.leaf_mut(id) {
            lfn.split = None;
            lfn.frozen = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::dataset::SampleTable;
    use crate::model::{Aln, MinMaxOp, NodeKind};
    use crate::train::{Signal, StopReason, TrainParams};
    use ndarray::Array2;

    fn samples(n: usize, f: impl Fn(f64) -> f64) -> Array2<f64> {
        Array2::from_shape_fn((n, 2), |(i, j)| {
            let x = -1.0 + 2.0 * i as f64 / (n - 1) as f64;
            if j == 0 {
                x
            } else {
                f(x)
            }
        })
    }

    fn growable(epsilon: f64) -> Aln {
        let mut aln = Aln::new(2, 1).unwrap();
        aln.region_mut()
            .constraint_mut(1)
            .unwrap()
            .set_epsilon(epsilon)
            .unwrap();
        aln.set_all_growable(true).unwrap();
        aln
    }

    #[test]
    fn linear_data_freezes_the_root() {
        let records = samples(100, |x| 0.3 * x - 0.2);
        let mut aln = growable(0.01);
        let params = TrainParams::default().max_epochs(100).learn_rate(0.3);
        let report = aln
            .train(&params, &mut SampleTable::new(records.view()), |_| {
                Signal::Continue
            })
            .unwrap();

        assert_eq!(report.stop, StopReason::AllFrozen);
        assert_eq!(report.splits, 0);
        assert_eq!(report.frozen, 1);
        assert_eq!(aln.num_leaves(), 1);
        assert!(aln.leaf(aln.root()).unwrap().is_frozen());
    }

    #[test]
    fn concave_data_splits_into_a_min() {
        let records = samples(200, |x| -x.abs());
        let mut aln = growable(0.02);
        let params = TrainParams::default()
            .max_epochs(30)
            .split_interval(20)
            .learn_rate(0.3);
        let report = aln
            .train(&params, &mut SampleTable::new(records.view()), |_| {
                Signal::Continue
            })
            .unwrap();

        assert_eq!(report.splits, 1);
        match aln.node(aln.root()).kind() {
            NodeKind::MinMax(mm) => assert_eq!(mm.op(), MinMaxOp::Min),
            NodeKind::Leaf(_) => panic!("root was not split"),
        }
    }

    #[test]
    fn leaf_limit_stops_growth() {
        let records = samples(200, |x| x * x);
        let mut aln = growable(0.001);
        let params = TrainParams::default()
            .max_epochs(200)
            .split_interval(10)
            .max_leaves(Some(3));
        let report = aln
            .train(&params, &mut SampleTable::new(records.view()), |_| {
                Signal::Continue
            })
            .unwrap();

        assert!(aln.num_leaves() <= 3);
        assert_eq!(report.stop, StopReason::AllFrozen);
    }
}
