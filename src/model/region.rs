use crate::error::{AlnError, Result};

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

/// Default precision tolerance of a variable
pub const DEFAULT_EPSILON: f64 = 1e-3;
/// Default absolute bound of the domain of a variable
pub const DEFAULT_DOMAIN: f64 = 1e10;
/// Default absolute bound of the weight on a variable
pub const DEFAULT_WEIGHT_BOUND: f64 = 1e10;

/// Constraints on one variable of the network
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug, PartialEq)]
pub struct Constraint {
    name: String,
    epsilon: f64,
    #[cfg_attr(feature = "serde", serde(skip))]
    epsilon_sq: f64,
    min: f64,
    max: f64,
    w_min: f64,
    w_max: f64,
}

impl Constraint {
    fn new(var: usize) -> Self {
        Constraint {
            name: format!("x{}", var),
            epsilon: DEFAULT_EPSILON,
            epsilon_sq: DEFAULT_EPSILON * DEFAULT_EPSILON,
            min: -DEFAULT_DOMAIN,
            max: DEFAULT_DOMAIN,
            w_min: -DEFAULT_WEIGHT_BOUND,
            w_max: DEFAULT_WEIGHT_BOUND,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn epsilon_sq(&self) -> f64 {
        self.epsilon_sq
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn w_min(&self) -> f64 {
        self.w_min
    }

    pub fn w_max(&self) -> f64 {
        self.w_max
    }

    /// Clamps `weight` into the weight bound of this variable
    #[inline]
    pub fn clamp_weight(&self, weight: f64) -> f64 {
        weight.max(self.w_min).min(self.w_max)
    }

    pub fn set_name<S: Into<String>>(&mut self, name: S) {
        self.name = name.into();
    }

    /// Sets the precision tolerance, must be positive and finite
    pub fn set_epsilon(&mut self, epsilon: f64) -> Result<()> {
        if !(epsilon.is_finite() && epsilon > 0.0) {
            return Err(AlnError::InvalidArgument(format!(
                "epsilon of {} must be positive and finite, but is {}",
                self.name, epsilon
            )));
        }
        self.epsilon = epsilon;
        self.epsilon_sq = epsilon * epsilon;
        Ok(())
    }

    /// Sets the domain `[min, max]` of the variable
    pub fn set_domain(&mut self, min: f64, max: f64) -> Result<()> {
        if !(min < max) {
            return Err(AlnError::InvalidArgument(format!(
                "domain of {} must satisfy min < max, but is [{}, {}]",
                self.name, min, max
            )));
        }
        self.min = min;
        self.max = max;
        Ok(())
    }

    /// Sets the bound `[w_min, w_max]` on the weight of the variable
    pub fn set_weight_bound(&mut self, w_min: f64, w_max: f64) -> Result<()> {
        if !(w_min <= w_max) {
            return Err(AlnError::InvalidArgument(format!(
                "weight bound of {} must satisfy w_min <= w_max, but is [{}, {}]",
                self.name, w_min, w_max
            )));
        }
        self.w_min = w_min;
        self.w_max = w_max;
        Ok(())
    }

    pub(crate) fn reset_weight_bound(&mut self) {
        self.w_min = -DEFAULT_WEIGHT_BOUND;
        self.w_max = DEFAULT_WEIGHT_BOUND;
    }

    pub(crate) fn refresh(&mut self) {
        self.epsilon_sq = self.epsilon * self.epsilon;
    }
}

/// Per-variable constraints and the smoothing setting shared by every node
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug, PartialEq)]
pub struct Region {
    constraints: Vec<Constraint>,
    smoothing_epsilon: f64,
    #[cfg_attr(feature = "serde", serde(skip))]
    four_se: f64,
    #[cfg_attr(feature = "serde", serde(skip))]
    inv_16_se: f64,
    learn_factor: f64,
}

impl Region {
    pub(crate) fn new(n_vars: usize) -> Result<Self> {
        let mut constraints = Vec::new();
        constraints
            .try_reserve_exact(n_vars)
            .map_err(|_| AlnError::OutOfMemory("region constraints"))?;
        constraints.extend((0..n_vars).map(Constraint::new));

        Ok(Region {
            constraints,
            smoothing_epsilon: 0.0,
            four_se: 0.0,
            inv_16_se: 0.0,
            learn_factor: 1.0,
        })
    }

    pub fn n_vars(&self) -> usize {
        self.constraints.len()
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn constraint(&self, var: usize) -> &Constraint {
        &self.constraints[var]
    }

    /// Mutable access to the constraint of variable `var`
    pub fn constraint_mut(&mut self, var: usize) -> Result<&mut Constraint> {
        let n_vars = self.n_vars();
        self.constraints.get_mut(var).ok_or_else(|| {
            AlnError::InvalidArgument(format!(
                "variable index {} out of range for {} variables",
                var, n_vars
            ))
        })
    }

    pub fn smoothing_epsilon(&self) -> f64 {
        self.smoothing_epsilon
    }

    pub fn is_smoothing(&self) -> bool {
        self.smoothing_epsilon > 0.0
    }

    /// Width of the band around a MIN/MAX tie in which the fillet is active
    pub fn fillet_width(&self) -> f64 {
        self.four_se
    }

    /// Sets the fillet width parameter, `0` disables smoothing
    pub fn set_smoothing_epsilon(&mut self, smoothing_epsilon: f64) -> Result<()> {
        if !(smoothing_epsilon.is_finite() && smoothing_epsilon >= 0.0) {
            return Err(AlnError::InvalidArgument(format!(
                "smoothing epsilon must be non-negative and finite, but is {}",
                smoothing_epsilon
            )));
        }
        self.smoothing_epsilon = smoothing_epsilon;
        self.refresh();
        Ok(())
    }

    pub fn learn_factor(&self) -> f64 {
        self.learn_factor
    }

    /// Sets the multiplier applied to the learning rate of every piece
    pub fn set_learn_factor(&mut self, learn_factor: f64) -> Result<()> {
        if !(learn_factor.is_finite() && learn_factor > 0.0) {
            return Err(AlnError::InvalidArgument(format!(
                "learn factor must be positive and finite, but is {}",
                learn_factor
            )));
        }
        self.learn_factor = learn_factor;
        Ok(())
    }

    /// Amount by which the fillet lifts a MAX (or lowers a MIN) of two values `gap` apart
    #[inline]
    pub fn fillet(&self, gap: f64) -> f64 {
        if self.smoothing_epsilon > 0.0 && gap < self.four_se {
            let r = self.four_se - gap;
            r * r * self.inv_16_se
        } else {
            0.0
        }
    }

    /// Share of the response taken by the more active child of a smoothed node
    #[inline]
    pub fn active_response(&self, gap: f64) -> f64 {
        if self.smoothing_epsilon > 0.0 && gap < self.four_se {
            0.5 + 0.125 * gap / self.smoothing_epsilon
        } else {
            1.0
        }
    }

    /// Recomputes the cached derived quantities, used after deserialization
    pub(crate) fn refresh(&mut self) {
        self.four_se = 4.0 * self.smoothing_epsilon;
        self.inv_16_se = if self.smoothing_epsilon > 0.0 {
            1.0 / (16.0 * self.smoothing_epsilon)
        } else {
            0.0
        };
        self.constraints.iter_mut().for_each(Constraint::refresh);
    }

    /// Checks the invariants of a region restored from outside
    pub(crate) fn validate(&self) -> Result<()> {
        for c in &self.constraints {
            if !(c.epsilon.is_finite() && c.epsilon > 0.0)
                || !(c.min < c.max)
                || !(c.w_min <= c.w_max)
            {
                return Err(AlnError::MalformedModel(format!(
                    "inconsistent constraint on {}",
                    c.name
                )));
            }
        }
        if !(self.smoothing_epsilon.is_finite() && self.smoothing_epsilon >= 0.0)
            || !(self.learn_factor.is_finite() && self.learn_factor > 0.0)
        {
            return Err(AlnError::MalformedModel(
                "inconsistent region settings".to_string(),
            ));
        }
        Ok(())
    }
}
