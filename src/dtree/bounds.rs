//! Bounds of MIN/MAX expressions over a box
//!
//! Every expression gets two kinds of bounds on the box: an interval `[lo, hi]` containing
//! all its values, and a cylinder, an affine function `g` with half width `h` such that the
//! expression stays within `g ± h`. Intervals are cheap and prove dominance between far
//! apart pieces; cylinders follow the slope and prove dominance between pieces that are
//! close in value but never cross inside the box.
//!
//! Under smoothing an operator may lift (or lower) its result by up to `se`, and an operand
//! only stops mattering once it is `4·se` away from its sibling everywhere in the box.
use crate::model::MinMaxOp;

use super::{Fillet, LinearForm};

/// Axis-aligned box over all variables. The output axis is carried along but never bounds
/// anything.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Domain {
    pub(crate) lo: Vec<f64>,
    pub(crate) hi: Vec<f64>,
    pub(crate) output: usize,
    /// Blend applied by every operator inside the box
    pub(crate) fillet: Fillet,
}

impl Domain {
    pub(crate) fn n_dim(&self) -> usize {
        self.lo.len()
    }

    /// Indices of the input variables
    pub(crate) fn inputs(&self) -> impl Iterator<Item = usize> + '_ {
        let output = self.output;
        (0..self.n_dim()).filter(move |&i| i != output)
    }

    /// Range of an affine function over the box
    pub(crate) fn range(&self, affine: &Affine) -> (f64, f64) {
        let (mut lo, mut hi) = (affine.bias, affine.bias);
        for i in self.inputs() {
            let w = affine.weights[i];
            let (a, b) = (w * self.lo[i], w * self.hi[i]);
            lo += a.min(b);
            hi += a.max(b);
        }
        (lo, hi)
    }

    /// Cuts the box at `threshold` on `var` into the lower and the upper part
    pub(crate) fn split(&self, var: usize, threshold: f64) -> (Domain, Domain) {
        let mut lower = self.clone();
        let mut upper = self.clone();
        lower.hi[var] = threshold;
        upper.lo[var] = threshold;
        (lower, upper)
    }
}

/// Affine function of the inputs, weights indexed by variable with a zero on the output
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Affine {
    pub(crate) bias: f64,
    pub(crate) weights: Vec<f64>,
}

impl Affine {
    pub(crate) fn from_form(form: &LinearForm, output: usize) -> Self {
        let mut weights = form.weights.to_vec();
        weights[output] = 0.0;
        Affine {
            bias: form.bias,
            weights,
        }
    }

    /// `a * self + b * other`
    fn blend(&self, a: f64, other: &Affine, b: f64) -> Affine {
        Affine {
            bias: a * self.bias + b * other.bias,
            weights: self
                .weights
                .iter()
                .zip(&other.weights)
                .map(|(x, y)| a * x + b * y)
                .collect(),
        }
    }

    fn negated(&self) -> Affine {
        Affine {
            bias: -self.bias,
            weights: self.weights.iter().map(|w| -w).collect(),
        }
    }
}

/// Interval and cylinder bounds of an expression over a box
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Bounds {
    pub(crate) lo: f64,
    pub(crate) hi: f64,
    pub(crate) center: Affine,
    pub(crate) half_width: f64,
}

impl Bounds {
    /// Exact bounds of a single form: the cylinder has zero width
    pub(crate) fn of_form(form: &LinearForm, domain: &Domain) -> Self {
        let center = Affine::from_form(form, domain.output);
        let (lo, hi) = domain.range(&center);
        Bounds {
            lo,
            hi,
            center,
            half_width: 0.0,
        }
    }

    /// Whether an expression with bounds `self` makes one with bounds `other` irrelevant as
    /// an operand of `op`: never below it for a MAX, never above it for a MIN, and at least
    /// the fillet width away.
    pub(crate) fn dominates(&self, other: &Bounds, op: MinMaxOp, domain: &Domain) -> bool {
        let difference = self.center.blend(1.0, &other.center, -1.0);
        let (dlo, dhi) = domain.range(&difference);
        let width = self.half_width + other.half_width;
        let margin = domain.fillet.width();
        match op {
            MinMaxOp::Max => self.lo - other.hi >= margin || dlo - width >= margin,
            MinMaxOp::Min => other.lo - self.hi >= margin || -dhi - width >= margin,
        }
    }

    /// Bounds of `op(a, b)`
    pub(crate) fn combine(op: MinMaxOp, a: &Bounds, b: &Bounds, domain: &Domain) -> Bounds {
        let (mut center, mut half_width) = match op {
            MinMaxOp::Max => max_cylinder(a, b, domain),
            MinMaxOp::Min => {
                let (center, half_width) = max_cylinder(&a.flipped(), &b.flipped(), domain);
                (center.negated(), half_width)
            }
        };
        let (mut lo, mut hi) = match op {
            MinMaxOp::Max => (a.lo.max(b.lo), a.hi.max(b.hi)),
            MinMaxOp::Min => (a.lo.min(b.lo), a.hi.min(b.hi)),
        };

        // the fillet moves the sharp result towards the operator's side by at most its peak
        let peak = domain.fillet.peak();
        if peak > 0.0 {
            match op {
                MinMaxOp::Max => hi += peak,
                MinMaxOp::Min => lo -= peak,
            }
            center.bias += op.sign() * 0.5 * peak;
            half_width += 0.5 * peak;
        }
        let (glo, ghi) = domain.range(&center);

        Bounds {
            lo: lo.max(glo - half_width),
            hi: hi.min(ghi + half_width),
            center,
            half_width,
        }
    }

    /// Bounds of the negated expression
    fn flipped(&self) -> Bounds {
        Bounds {
            lo: -self.hi,
            hi: -self.lo,
            center: self.center.negated(),
            half_width: self.half_width,
        }
    }
}

/// Narrowest cylinder around `max(f1, f2)` centered on a blend `λ g1 + (1 - λ) g2`.
///
/// With `D = g1 - g2` ranging over `[dlo, dhi]` on the box, `max(f1, f2) - G` lies within
/// `[-L(λ), U(λ)]` where
///
/// * `U(λ) = max((1 - λ) dhi + h1, -λ dlo + h2)`
/// * `L(λ) = min(-(1 - λ) dlo + h1, λ dhi + h2)`
///
/// `U + L` is piecewise linear in `λ`, so its minimum over `[0, 1]` is attained at an end
/// point or where the two arguments of the max or of the min cross.
fn max_cylinder(a: &Bounds, b: &Bounds, domain: &Domain) -> (Affine, f64) {
    let (h1, h2) = (a.half_width, b.half_width);
    let difference = a.center.blend(1.0, &b.center, -1.0);
    let (dlo, dhi) = domain.range(&difference);

    let upper = |l: f64| f64::max((1.0 - l) * dhi + h1, -l * dlo + h2);
    let lower = |l: f64| f64::min(-(1.0 - l) * dlo + h1, l * dhi + h2);

    let mut candidates = vec![0.0, 1.0];
    let span = dhi - dlo;
    if span > 0.0 {
        candidates.push(((dhi + h1 - h2) / span).max(0.0).min(1.0));
        candidates.push(((h1 - h2 - dlo) / span).max(0.0).min(1.0));
    }

    let mut best = (f64::INFINITY, 0.0);
    for &l in &candidates {
        let width = upper(l) + lower(l);
        if width < best.0 {
            best = (width, l);
        }
    }
    let l = best.1;

    let (u, low) = (upper(l), lower(l));
    let mut center = a.center.blend(l, &b.center, 1.0 - l);
    center.bias += 0.5 * (u - low);
    (center, (0.5 * (u + low)).max(0.0))
}
