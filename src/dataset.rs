//! Sample sources
//!
//! The trainer and the batch evaluator pull one vector at a time from a [`SampleSource`].
//! [`SampleTable`] reads rows of a row-major matrix, optionally assembling each variable from
//! an arbitrary column of an earlier row (time-lagged features). [`FnSource`] fabricates the
//! vectors with a closure.
use ndarray::{ArrayView2, ArrayViewMut1};

use crate::error::{AlnError, Result};

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

/// Source of the vectors used for training and evaluation
pub trait SampleSource {
    /// Total number of rows
    fn n_rows(&self) -> usize;

    /// First row from which a complete vector can be formed
    fn first_row(&self) -> usize {
        0
    }

    /// Number of variables of the vectors, if known in advance
    fn n_vars(&self) -> Option<usize> {
        None
    }

    /// Writes the vector of row `row` into `x`
    fn fill(&mut self, row: usize, x: ArrayViewMut1<f64>) -> Result<()>;

    /// Number of rows yielding a vector
    fn n_samples(&self) -> usize {
        self.n_rows().saturating_sub(self.first_row())
    }
}

/// Where a variable is read from: a column of the table, `lag` rows back
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VarRef {
    pub column: usize,
    pub lag: usize,
}

impl VarRef {
    pub fn new(column: usize, lag: usize) -> Self {
        VarRef { column, lag }
    }
}

/// A flat row-major table of samples
///
/// Without a variable map, variable `i` of a vector is column `i` of the row. With a map,
/// variable `i` is `records[row - map[i].lag, map[i].column]`, and rows before the largest
/// lag are skipped.
///
/// ```rust
/// use linfa_aln::dataset::{SampleSource, SampleTable, VarRef};
/// use ndarray::{array, Array1};
///
/// let records = array![[1.0, 10.0], [2.0, 20.0], [3.0, 30.0]];
/// // predict column 1 from column 0 and its value one row earlier
/// let mut table = SampleTable::new(records.view())
///     .with_var_map(vec![VarRef::new(0, 1), VarRef::new(0, 0), VarRef::new(1, 0)])
///     .unwrap();
///
/// let mut x = Array1::zeros(3);
/// table.fill(2, x.view_mut()).unwrap();
/// assert_eq!(x, array![2.0, 3.0, 30.0]);
/// assert_eq!(table.first_row(), 1);
/// ```
#[derive(Clone, Debug)]
pub struct SampleTable<'a> {
    records: ArrayView2<'a, f64>,
    var_map: Option<Vec<VarRef>>,
    first_row: usize,
}

impl<'a> SampleTable<'a> {
    pub fn new(records: ArrayView2<'a, f64>) -> Self {
        SampleTable {
            records,
            var_map: None,
            first_row: 0,
        }
    }

    /// Attaches a variable map; every referenced column must exist
    pub fn with_var_map(mut self, var_map: Vec<VarRef>) -> Result<Self> {
        if let Some(bad) = var_map.iter().find(|v| v.column >= self.records.ncols()) {
            return Err(AlnError::InvalidArgument(format!(
                "column {} out of range for a table with {} columns",
                bad.column,
                self.records.ncols()
            )));
        }
        self.first_row = var_map.iter().map(|v| v.lag).max().unwrap_or(0);
        self.var_map = Some(var_map);
        Ok(self)
    }

    pub fn records(&self) -> ArrayView2<'a, f64> {
        self.records
    }

    pub fn var_map(&self) -> Option<&[VarRef]> {
        self.var_map.as_deref()
    }
}

impl<'a> SampleSource for SampleTable<'a> {
    fn n_rows(&self) -> usize {
        self.records.nrows()
    }

    fn first_row(&self) -> usize {
        self.first_row
    }

    fn n_vars(&self) -> Option<usize> {
        Some(
            self.var_map
                .as_ref()
                .map_or(self.records.ncols(), |map| map.len()),
        )
    }

    fn fill(&mut self, row: usize, mut x: ArrayViewMut1<f64>) -> Result<()> {
        if row < self.first_row || row >= self.records.nrows() {
            return Err(AlnError::InvalidArgument(format!(
                "row {} does not form a vector, valid rows are {}..{}",
                row,
                self.first_row,
                self.records.nrows()
            )));
        }

        match &self.var_map {
            None => x.assign(&self.records.row(row)),
            Some(map) => {
                for (value, var) in x.iter_mut().zip(map) {
                    *value = self.records[[row - var.lag, var.column]];
                }
            }
        }
        Ok(())
    }
}

/// A source that asks a closure for every vector
pub struct FnSource<F> {
    n_rows: usize,
    n_vars: Option<usize>,
    f: F,
}

impl<F> FnSource<F>
where
    F: FnMut(usize, ArrayViewMut1<f64>) -> Result<()>,
{
    pub fn new(n_rows: usize, f: F) -> Self {
        FnSource {
            n_rows,
            n_vars: None,
            f,
        }
    }

    /// Declares the number of variables written by the closure
    pub fn with_n_vars(mut self, n_vars: usize) -> Self {
        self.n_vars = Some(n_vars);
        self
    }
}

impl<F> SampleSource for FnSource<F>
where
    F: FnMut(usize, ArrayViewMut1<f64>) -> Result<()>,
{
    fn n_rows(&self) -> usize {
        self.n_rows
    }

    fn n_vars(&self) -> Option<usize> {
        self.n_vars
    }

    fn fill(&mut self, row: usize, x: ArrayViewMut1<f64>) -> Result<()> {
        (self.f)(row, x)
    }
}
