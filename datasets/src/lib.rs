//! `aln-datasets` provides synthetic sampled functions ready to be used in tests and benchmarks
//! of `linfa-aln`.
//!
//! ## Current State
//!
//! Every generator returns a row-major `Array2<f64>` whose last column is the output and whose
//! other columns are the inputs. Currently the following functions are provided:
//!
//! * [`abs_1d`](generate::abs_1d): `y = |x|` on `[-1, 1]`
//! * [`plane`](generate::plane): an affine function of any number of inputs
//! * [`pyramid_2d`](generate::pyramid_2d): `y = 1 - max(|x0|, |x1|)` on `[-1, 1]²`
//!
//! along with [`grid_1d`](generate::grid_1d) for evenly spaced samples of any function of one
//! input and [`with_noise`](generate::with_noise) to disturb the outputs.
//!
//! ## Using a dataset
//!
//! ```
//! use aln_datasets::generate;
//! use rand::SeedableRng;
//! use rand::rngs::SmallRng;
//!
//! let mut rng = SmallRng::seed_from_u64(42);
//! let records = generate::abs_1d(100, &mut rng);
//! assert_eq!(records.dim(), (100, 2));
//! ```

pub mod generate;
