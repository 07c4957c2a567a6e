//! `linfa-aln` learns continuous piecewise-linear approximations of functions from sampled
//! data with Adaptive Logic Networks.
//!
//! ## The model
//!
//! An [`Aln`] is a binary tree: every leaf holds an affine piece over the input variables,
//! every internal node takes the MIN or the MAX of its two children. The output of the tree is
//! therefore a continuous piecewise-linear function; an optional smoothing epsilon rounds the
//! corners with quadratic fillets.
//!
//! ## Training
//!
//! [`Aln::train`] runs epochs of online adaptation over a [`SampleSource`](dataset::SampleSource).
//! Every sample moves the pieces responsible for the output at that point. Growable leaves
//! whose error stays significantly above the tolerance of the output are split in two; all
//! others are frozen, and training stops once nothing can grow anymore. Training is
//! configured with [`TrainParams`] and observed through a closure receiving [`Event`]s.
//!
//! ## Deployment
//!
//! [`Aln::compile`] turns a trained network into a [`DecisionTree`]: the input domain is
//! partitioned into boxes, and inside each box only the pieces that can determine the output
//! are kept. Networks can be saved and restored as JSON with the `serde` feature.
//!
//! ```rust
//! use linfa_aln::dataset::SampleTable;
//! use linfa_aln::{Aln, DecisionTree, Signal, TrainParams};
//! use ndarray::{array, Array2};
//!
//! // samples of y = |x| on [-1, 1]
//! let records = Array2::from_shape_fn((101, 2), |(i, j)| {
//!     let x = -1.0 + 0.02 * i as f64;
//!     if j == 0 { x } else { x.abs() }
//! });
//!
//! let mut aln = Aln::new(2, 1).unwrap();
//! aln.region_mut().constraint_mut(0).unwrap().set_domain(-1.0, 1.0).unwrap();
//! aln.region_mut().constraint_mut(1).unwrap().set_epsilon(0.02).unwrap();
//! aln.set_growable(aln.root(), true).unwrap();
//!
//! let params = TrainParams::default().max_epochs(200).learn_rate(0.3).split_interval(20);
//! aln.train(&params, &mut SampleTable::new(records.view()), |_| Signal::Continue)
//!     .unwrap();
//!
//! let dtree = aln.compile(&DecisionTree::params()).unwrap();
//! let x = array![0.5, 0.0];
//! assert!((dtree.evaluate(x.view()) - aln.quick_eval(x.view()).0).abs() < 1e-9);
//! ```

pub mod benchmarks;
pub mod dataset;
pub mod dtree;
pub mod error;
mod eval;
pub mod model;
pub mod param_guard;
#[cfg(feature = "serde")]
mod persist;
pub mod prelude;
pub mod train;
pub mod traits;
mod utils;

pub use dtree::{DecisionTree, DtreeParams, DtreeValidParams};
pub use error::{AlnError, Result};
pub use model::{Aln, MinMaxOp, Monotonicity, NodeId};
pub use param_guard::ParamGuard;
pub use train::{Event, Signal, StopReason, TrainParams, TrainReport, TrainValidParams};
