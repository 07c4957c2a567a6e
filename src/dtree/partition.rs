//! Choice of the cut dividing a box
//!
//! Random probe points tell which forms of a block are responsible for the output where. A
//! cut on an axis sends every form to the side(s) where it was seen responsible; forms never
//! seen go to both sides. The cost of a cut is the number of forms on its heavier side.
use ndarray::Array1;
use ndarray_rand::rand_distr::{Distribution, Uniform};
use rand::Rng;
use tracing::trace;

use super::bounds::Domain;
use super::{BlockExpr, LinearForm};
use crate::error::{AlnError, Result};

/// A chosen cut: `x[var] < threshold` is the lower part
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Cut {
    pub(crate) var: usize,
    pub(crate) threshold: f64,
}

/// Extent along every axis of the probes for which each form was responsible
struct Extents {
    /// Row per form of the block, column per variable; `(min, max)` of the coordinates
    ranges: Vec<(f64, f64)>,
    n_dim: usize,
}

impl Extents {
    fn probe<R: Rng>(
        expr: &BlockExpr,
        members: &[usize],
        forms: &[LinearForm],
        domain: &Domain,
        probe_count: usize,
        rng: &mut R,
    ) -> Result<Self> {
        let n_dim = domain.n_dim();
        let mut ranges = Vec::new();
        ranges
            .try_reserve_exact(members.len() * n_dim)
            .map_err(|_| AlnError::OutOfMemory("probe extents"))?;
        ranges.resize(members.len() * n_dim, (f64::INFINITY, f64::NEG_INFINITY));

        let axes: Vec<Option<Uniform<f64>>> = (0..n_dim)
            .map(|i| {
                if i == domain.output {
                    None
                } else {
                    Some(Uniform::new_inclusive(domain.lo[i], domain.hi[i]))
                }
            })
            .collect();

        let mut point = Array1::zeros(n_dim);
        for _ in 0..probe_count {
            for (x, axis) in point.iter_mut().zip(&axes) {
                if let Some(axis) = axis {
                    *x = axis.sample(rng);
                }
            }
            let (_, form) = expr.evaluate(forms, point.view(), domain.output, domain.fillet);
            if let Ok(row) = members.binary_search(&form) {
                for (i, &x) in point.iter().enumerate() {
                    let range = &mut ranges[row * n_dim + i];
                    range.0 = range.0.min(x);
                    range.1 = range.1.max(x);
                }
            }
        }

        // forms never seen straddle every cut
        for row in ranges.chunks_mut(n_dim) {
            if row[0].0 > row[0].1 {
                row.fill((f64::NEG_INFINITY, f64::INFINITY));
            }
        }

        Ok(Extents { ranges, n_dim })
    }

    fn axis(&self, var: usize) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.ranges.iter().skip(var).step_by(self.n_dim).copied()
    }

    /// Forms below the cut (including straddling ones) and forms above it
    fn counts(&self, var: usize, threshold: f64) -> (usize, usize) {
        self.axis(var).fold((0, 0), |(below, above), (lo, hi)| {
            (
                below + (lo < threshold) as usize,
                above + (hi > threshold) as usize,
            )
        })
    }

    /// Threshold on `var` strictly inside `(lo, hi)` minimizing the heavier side
    ///
    /// The lower count never decreases with the threshold and the upper count never
    /// increases, so the optimum is where they cross.
    fn best_threshold(&self, var: usize, lo: f64, hi: f64) -> Option<(f64, usize)> {
        let mut stops: Vec<f64> = self
            .axis(var)
            .flat_map(|(a, b)| [a, b])
            .filter(|v| *v > lo && *v < hi)
            .collect();
        stops.push(lo);
        stops.push(hi);
        stops.sort_by(|a, b| a.total_cmp(b));
        stops.dedup();
        let thresholds: Vec<f64> = stops.windows(2).map(|w| 0.5 * (w[0] + w[1])).collect();
        if thresholds.is_empty() {
            return None;
        }

        let crossing = thresholds.partition_point(|&t| {
            let (below, above) = self.counts(var, t);
            below < above
        });
        [crossing.checked_sub(1), Some(crossing)]
            .iter()
            .flatten()
            .filter_map(|&k| thresholds.get(k))
            .map(|&t| {
                let (below, above) = self.counts(var, t);
                (t, below.max(above))
            })
            .min_by_key(|&(_, cost)| cost)
    }
}

/// Picks the cut of `domain` for a block, `None` when the block should stay whole
pub(crate) fn choose_cut<R: Rng>(
    expr: &BlockExpr,
    forms: &[LinearForm],
    domain: &Domain,
    probe_count: usize,
    fallback_leaf_factor: f64,
    rng: &mut R,
) -> Result<Option<Cut>> {
    let members = expr.form_indices();
    let extents = Extents::probe(expr, &members, forms, domain, probe_count, rng)?;

    let mut best: Option<(Cut, usize)> = None;
    for var in domain.inputs() {
        let (lo, hi) = (domain.lo[var], domain.hi[var]);
        if let Some((threshold, cost)) = extents.best_threshold(var, lo, hi) {
            if best.map_or(true, |(_, c)| cost < c) {
                best = Some((Cut { var, threshold }, cost));
            }
        }
    }

    match best {
        Some((cut, cost)) if cost < members.len() => {
            trace!(
                var = cut.var,
                threshold = cut.threshold,
                cost,
                forms = members.len(),
                "cutting box"
            );
            Ok(Some(cut))
        }
        _ if members.len() as f64 >= fallback_leaf_factor * domain.n_dim() as f64 => {
            let inputs: Vec<usize> = domain.inputs().collect();
            let var = inputs[rng.gen_range(0..inputs.len())];
            let threshold = 0.5 * (domain.lo[var] + domain.hi[var]);
            trace!(var, threshold, forms = members.len(), "halving box");
            Ok(Some(Cut { var, threshold }))
        }
        _ => Ok(None),
    }
}
