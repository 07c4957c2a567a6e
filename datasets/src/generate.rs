//! Utility functions for randomly sampling functions

use ndarray::{s, Array, Array1, Array2, ArrayView1, Axis};
use ndarray_rand::{
    rand::Rng,
    rand_distr::{Normal, NormalError, Uniform},
    RandomExt,
};

/// Samples `f` at `n_samples` points drawn uniformly from the box `domain`, one `(lo, hi)`
/// pair per input.
///
/// The inputs fill the first columns of the result, the value of `f` the last one.
pub fn sample_function<F>(
    n_samples: usize,
    domain: &[(f64, f64)],
    f: F,
    rng: &mut impl Rng,
) -> Array2<f64>
where
    F: Fn(ArrayView1<f64>) -> f64,
{
    let n_inputs = domain.len();
    let mut records = Array2::zeros((n_samples, n_inputs + 1));

    for (col, &(lo, hi)) in domain.iter().enumerate() {
        let column: Array1<f64> =
            Array::random_using(n_samples, Uniform::new_inclusive(lo, hi), rng);
        records.column_mut(col).assign(&column);
    }
    for mut row in records.rows_mut() {
        let y = f(row.slice(s![..n_inputs]));
        row[n_inputs] = y;
    }
    records
}

/// Samples of `y = |x|` on `[-1, 1]`
pub fn abs_1d(n_samples: usize, rng: &mut impl Rng) -> Array2<f64> {
    sample_function(n_samples, &[(-1.0, 1.0)], |x| x[0].abs(), rng)
}

/// Samples of `y = bias + weights · x` with every input in `[-1, 1]`
pub fn plane(n_samples: usize, weights: &[f64], bias: f64, rng: &mut impl Rng) -> Array2<f64> {
    let domain = vec![(-1.0, 1.0); weights.len()];
    sample_function(
        n_samples,
        &domain,
        |x| bias + x.iter().zip(weights).map(|(x, w)| x * w).sum::<f64>(),
        rng,
    )
}

/// Samples of the pyramid `y = 1 - max(|x0|, |x1|)` on `[-1, 1]²`
pub fn pyramid_2d(n_samples: usize, rng: &mut impl Rng) -> Array2<f64> {
    sample_function(
        n_samples,
        &[(-1.0, 1.0), (-1.0, 1.0)],
        |x| 1.0 - x[0].abs().max(x[1].abs()),
        rng,
    )
}

/// `n_samples` evenly spaced samples of `f` on `[lo, hi]`, both ends included
pub fn grid_1d<F: Fn(f64) -> f64>(n_samples: usize, lo: f64, hi: f64, f: F) -> Array2<f64> {
    let step = if n_samples > 1 {
        (hi - lo) / (n_samples - 1) as f64
    } else {
        0.0
    };
    Array2::from_shape_fn((n_samples, 2), |(i, j)| {
        let x = lo + step * i as f64;
        if j == 0 {
            x
        } else {
            f(x)
        }
    })
}

/// Adds normal noise with standard deviation `std_dev` to the output column
pub fn with_noise(
    mut records: Array2<f64>,
    std_dev: f64,
    rng: &mut impl Rng,
) -> Result<Array2<f64>, NormalError> {
    let distribution = Normal::new(0.0, std_dev)?;
    let noise: Array1<f64> = Array::random_using(records.nrows(), distribution, rng);
    let last = records.ncols() - 1;
    let mut output = records.index_axis_mut(Axis(1), last);
    output += &noise;
    Ok(records)
}
