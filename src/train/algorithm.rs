use ndarray::Array1;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, info};

use super::adapt::{Pass, Step};
use super::hyperparams::{TrainParams, TrainValidParams};
use super::observer::{Event, Signal, StopReason, TrainReport};
use crate::dataset::SampleSource;
use crate::error::{AlnError, Result};
use crate::eval::EvalTrace;
use crate::model::{Aln, NodeKind};
use crate::param_guard::ParamGuard;
use crate::utils::triangular;

/// Half width of the uniform distribution of the initial input weights
const INITIAL_WEIGHT: f64 = 0.01;

impl Aln {
    /// Trains the network on the vectors of `source`.
    ///
    /// Every epoch visits the usable rows of `source` in random order and adapts the pieces
    /// responsible for each sample. Every `split_interval` epochs the growable leaves are
    /// checked: a leaf whose error is significantly above the acceptable level is split into
    /// two copies of itself, any other growable leaf is frozen.
    ///
    /// The observer is notified at every step of the loop and may abort the run; the report
    /// then carries [`StopReason::Aborted`].
    ///
    /// ### Example
    ///
    /// ```rust
    /// use linfa_aln::{Aln, Signal, TrainParams};
    /// use linfa_aln::dataset::SampleTable;
    /// use ndarray::Array2;
    ///
    /// // samples of y = 2x - 1
    /// let records = Array2::from_shape_fn((50, 2), |(i, j)| {
    ///     let x = i as f64 / 49.0;
    ///     if j == 0 { x } else { 2.0 * x - 1.0 }
    /// });
    /// let mut aln = Aln::new(2, 1).unwrap();
    /// let params = TrainParams::default().max_epochs(50).learn_rate(0.5);
    ///
    /// let report = aln
    ///     .train(&params, &mut SampleTable::new(records.view()), |_| Signal::Continue)
    ///     .unwrap();
    /// assert_eq!(report.epochs, 50);
    /// assert!(report.rmse < 0.05);
    /// ```
    pub fn train<R, S, O>(
        &mut self,
        params: &TrainParams<R>,
        source: &mut S,
        mut observer: O,
    ) -> Result<TrainReport>
    where
        R: Rng + Clone,
        S: SampleSource,
        O: FnMut(Event) -> Signal,
    {
        let params = params.check_ref()?;
        Trainer::new(self, params, source)?.run(&mut observer)
    }
}

/// State of one training run
pub(super) struct Trainer<'a, R: Rng, S> {
    pub(super) aln: &'a mut Aln,
    pub(super) params: &'a TrainValidParams<R>,
    pub(super) source: &'a mut S,
    pub(super) rng: R,
    pub(super) rows: Vec<usize>,
    pub(super) trace: EvalTrace,
    x: Array1<f64>,
    seen_first_sample: bool,
}

impl<'a, R: Rng + Clone, S: SampleSource> Trainer<'a, R, S> {
    fn new(aln: &'a mut Aln, params: &'a TrainValidParams<R>, source: &'a mut S) -> Result<Self> {
        if let Some(n_vars) = source.n_vars() {
            if n_vars != aln.n_dim {
                return Err(AlnError::InvalidArgument(format!(
                    "source provides {} variables, network has {}",
                    n_vars, aln.n_dim
                )));
            }
        }
        if source.n_samples() == 0 {
            return Err(AlnError::InvalidArgument(
                "source yields no training samples".to_string(),
            ));
        }

        let mut rows = Vec::new();
        rows.try_reserve_exact(source.n_samples())?;
        rows.extend(source.first_row()..source.n_rows());
        let trace = EvalTrace::with_len(aln.nodes.len())?;
        let x = Array1::zeros(aln.n_dim);

        Ok(Trainer {
            aln,
            params,
            source,
            rng: params.rng.clone(),
            rows,
            trace,
            x,
            seen_first_sample: false,
        })
    }

    fn run<O>(mut self, observer: &mut O) -> Result<TrainReport>
    where
        O: FnMut(Event) -> Signal,
    {
        let params = self.params;
        let started_growable = self.has_growable();
        let mut report = TrainReport {
            epochs: 0,
            rmse: f64::NAN,
            stop: StopReason::MaxEpochs,
            splits: 0,
            frozen: 0,
        };

        info!(
            samples = self.rows.len(),
            max_epochs = params.max_epochs,
            leaves = self.aln.num_leaves(),
            "start training"
        );
        let start = Event::RunStart {
            max_epochs: params.max_epochs,
            n_samples: self.rows.len(),
        };
        if observer(start) == Signal::Abort {
            report.stop = StopReason::Aborted;
            return Ok(self.finish(report, observer));
        }

        for epoch in 1..=params.max_epochs {
            let rmse = match self.epoch(epoch, observer)? {
                Some(rmse) => rmse,
                None => {
                    report.stop = StopReason::Aborted;
                    break;
                }
            };
            report.epochs = epoch;
            report.rmse = rmse;
            debug!(epoch, rmse, leaves = self.aln.num_leaves(), "finished epoch");

            if observer(Event::EpochEnd { epoch, rmse }) == Signal::Abort {
                report.stop = StopReason::Aborted;
                break;
            }
            if rmse < params.min_rmse {
                report.stop = StopReason::RmseReached;
                break;
            }
            // pieces created after the last epoch would never be trained
            if epoch % params.split_interval == 0
                && epoch < params.max_epochs
                && self.has_growable()
            {
                let (splits, frozen) = self.split_control()?;
                report.splits += splits;
                report.frozen += frozen;
                if started_growable && !self.has_growable() {
                    report.stop = StopReason::AllFrozen;
                    break;
                }
            }
        }

        Ok(self.finish(report, observer))
    }

    fn finish<O>(self, report: TrainReport, observer: &mut O) -> TrainReport
    where
        O: FnMut(Event) -> Signal,
    {
        info!(
            epochs = report.epochs,
            rmse = report.rmse,
            stop = ?report.stop,
            leaves = self.aln.num_leaves(),
            "training finished"
        );
        // nothing is left to abort
        let _ = observer(Event::RunEnd {
            epochs: report.epochs,
            stop: report.stop,
        });
        report
    }

    /// Runs one learning epoch, returning its RMSE or `None` when the observer aborted
    fn epoch<O>(&mut self, epoch: usize, observer: &mut O) -> Result<Option<f64>>
    where
        O: FnMut(Event) -> Signal,
    {
        for node in self.aln.nodes.iter_mut() {
            node.prev_hits = node.hits;
            node.hits = 0;
        }
        if observer(Event::EpochStart { epoch }) == Signal::Abort {
            return Ok(None);
        }

        self.rows.shuffle(&mut self.rng);
        let mut sum_sq = 0.0;
        for k in 0..self.rows.len() {
            let row = self.rows[k];
            if observer(Event::AdaptStart { epoch, row }) == Signal::Abort {
                return Ok(None);
            }
            let distance = self.sample(row, Pass::Learn)?;
            sum_sq += distance * distance;
            if observer(Event::AdaptEnd {
                epoch,
                row,
                distance,
            }) == Signal::Abort
            {
                return Ok(None);
            }
        }

        Ok(Some((sum_sq / self.rows.len() as f64).sqrt()))
    }

    /// Fetches the vector of `row` and adapts the network to it, returning the distance of
    /// the sample from the surface before the adaptation
    pub(super) fn sample(&mut self, row: usize, pass: Pass) -> Result<f64> {
        self.source.fill(row, self.x.view_mut())?;
        if let Some(var) = self.x.iter().position(|v| !v.is_finite()) {
            return Err(AlnError::InvalidArgument(format!(
                "row {} has a non-finite value in variable {}",
                row, var
            )));
        }
        if !self.seen_first_sample {
            self.initialize_leaves();
            self.seen_first_sample = true;
        }

        let output = self.aln.output;
        if pass == Pass::Learn && self.params.jitter {
            for (i, constraint) in self.aln.region.constraints().iter().enumerate() {
                if i != output {
                    self.x[i] += triangular(&mut self.rng, constraint.epsilon());
                }
            }
        }

        let (distance, _) = self.aln.adapt_eval(self.x.view(), &mut self.trace);
        let step = Step {
            x: self.x.view(),
            learn_rate: self.params.learn_rate,
            starvation_ratio: self.params.starvation_ratio,
            pass,
        };
        let root = self.aln.root;
        self.aln.adapt(root, 1.0, distance, &step, &self.trace);

        Ok(distance)
    }

    /// Places every uninitialized piece on the current sample with small random slopes
    fn initialize_leaves(&mut self) {
        let output = self.aln.output;
        let Aln { region, nodes, .. } = &mut *self.aln;

        for node in nodes.iter_mut() {
            let lfn = match &mut node.kind {
                NodeKind::Leaf(lfn) if !lfn.initialized => lfn,
                _ => continue,
            };
            for (i, constraint) in region.constraints().iter().enumerate() {
                if i != output {
                    let w = self.rng.gen_range(-INITIAL_WEIGHT..INITIAL_WEIGHT);
                    lfn.w[i + 1] = constraint.clamp_weight(w);
                }
                lfn.d[i] = constraint.epsilon_sq();
            }
            lfn.c.assign(&self.x);
            lfn.initialized = true;
            lfn.update_bias(output);
        }
    }

    pub(super) fn has_growable(&self) -> bool {
        self.aln.leaves().any(|(_, lfn)| lfn.is_growable())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{FnSource, SampleTable};
    use crate::model::MinMaxOp;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array2, ArrayViewMut1};

    fn line_samples(n: usize) -> Array2<f64> {
        Array2::from_shape_fn((n, 2), |(i, j)| {
            let x = -1.0 + 2.0 * i as f64 / (n - 1) as f64;
            if j == 0 {
                x
            } else {
                0.5 * x + 0.25
            }
        })
    }

    #[test]
    fn learns_a_line() {
        let records = line_samples(40);
        let mut aln = Aln::new(2, 1).unwrap();
        let params = TrainParams::default().max_epochs(60).learn_rate(0.5);
        let report = aln
            .train(&params, &mut SampleTable::new(records.view()), |_| {
                Signal::Continue
            })
            .unwrap();

        assert_eq!(report.stop, StopReason::MaxEpochs);
        assert!(report.rmse < 1e-3);
        let lfn = aln.leaf(aln.root()).unwrap();
        assert_abs_diff_eq!(lfn.weight(0), 0.5, epsilon = 1e-3);
        assert_abs_diff_eq!(
            aln.quick_eval(array![0.0, 0.0].view()).0,
            0.25,
            epsilon = 1e-3
        );
    }

    #[test]
    fn leaves_are_initialized_on_the_first_sample() {
        let records = array![[3.0, 4.0]];
        let mut aln = Aln::new(2, 1).unwrap();
        aln.split_leaf(aln.root(), MinMaxOp::Min).unwrap();
        let params = TrainParams::default().max_epochs(1);
        aln.train(&params, &mut SampleTable::new(records.view()), |_| {
            Signal::Continue
        })
        .unwrap();

        for (_, lfn) in aln.leaves() {
            assert!(lfn.is_initialized());
            assert!(lfn.weight(0).abs() <= INITIAL_WEIGHT);
            // the piece passes through the only sample
            assert_abs_diff_eq!(lfn.distance(records.row(0)), 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn events_arrive_in_order_and_abort_stops() {
        let records = line_samples(5);
        let mut aln = Aln::new(2, 1).unwrap();
        let params = TrainParams::default().max_epochs(3);

        let mut events = Vec::new();
        let report = aln
            .train(&params, &mut SampleTable::new(records.view()), |event| {
                events.push(event);
                match event {
                    Event::EpochEnd { epoch: 2, .. } => Signal::Abort,
                    _ => Signal::Continue,
                }
            })
            .unwrap();

        assert_eq!(report.stop, StopReason::Aborted);
        assert_eq!(report.epochs, 2);
        assert!(matches!(events[0], Event::RunStart { n_samples: 5, .. }));
        assert!(matches!(events[1], Event::EpochStart { epoch: 1 }));
        assert!(matches!(events[2], Event::AdaptStart { epoch: 1, .. }));
        assert!(matches!(events[3], Event::AdaptEnd { epoch: 1, .. }));
        assert!(matches!(
            events.last(),
            Some(Event::RunEnd {
                epochs: 2,
                stop: StopReason::Aborted
            })
        ));
        // one start, per epoch a start, five samples with two events, an end, then the run end
        assert_eq!(events.len(), 1 + 2 * (1 + 5 * 2 + 1) + 1);
    }

    #[test]
    fn aborting_mid_epoch_keeps_the_network_usable() {
        let records = line_samples(10);
        let mut aln = Aln::new(2, 1).unwrap();
        let params = TrainParams::default().max_epochs(5);
        let report = aln
            .train(&params, &mut SampleTable::new(records.view()), |event| {
                match event {
                    Event::AdaptStart { epoch: 1, .. } => Signal::Abort,
                    _ => Signal::Continue,
                }
            })
            .unwrap();

        assert_eq!(report.stop, StopReason::Aborted);
        assert_eq!(report.epochs, 0);
        assert!(report.rmse.is_nan());
        assert!(aln.validate().is_ok());
    }

    #[test]
    fn low_rmse_stops_training() {
        let records = line_samples(20);
        let mut aln = Aln::new(2, 1).unwrap();
        let params = TrainParams::default()
            .max_epochs(1000)
            .learn_rate(0.5)
            .min_rmse(0.01);
        let report = aln
            .train(&params, &mut SampleTable::new(records.view()), |_| {
                Signal::Continue
            })
            .unwrap();

        assert_eq!(report.stop, StopReason::RmseReached);
        assert!(report.epochs < 1000);
        assert!(report.rmse < 0.01);
    }

    #[test]
    fn source_errors_are_propagated() {
        let mut aln = Aln::new(2, 1).unwrap();
        let mut source = FnSource::new(4, |row, mut x: ArrayViewMut1<f64>| {
            if row == 2 {
                return Err(AlnError::InvalidArgument("broken row".to_string()));
            }
            x.fill(row as f64);
            Ok(())
        });
        let params = TrainParams::default().max_epochs(2);
        assert!(aln.train(&params, &mut source, |_| Signal::Continue).is_err());

        let mut nan = FnSource::new(1, |_, mut x: ArrayViewMut1<f64>| {
            x.fill(f64::NAN);
            Ok(())
        });
        assert!(matches!(
            aln.train(&params, &mut nan, |_| Signal::Continue),
            Err(AlnError::InvalidArgument(_))
        ));
    }

    #[test]
    fn rejects_mismatched_sources() {
        let records = Array2::zeros((4, 3));
        let mut aln = Aln::new(2, 1).unwrap();
        let params = TrainParams::default();
        assert!(aln
            .train(&params, &mut SampleTable::new(records.view()), |_| {
                Signal::Continue
            })
            .is_err());

        let empty = Array2::zeros((0, 2));
        assert!(aln
            .train(&params, &mut SampleTable::new(empty.view()), |_| {
                Signal::Continue
            })
            .is_err());
        assert!(aln
            .train(&params.learn_rate(2.0), &mut SampleTable::new(records.view()), |_| {
                Signal::Continue
            })
            .is_err());
    }
}
