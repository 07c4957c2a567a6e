//! Evaluation of a network
//!
//! Without smoothing, evaluation descends the tree with an alpha-beta window: once a MAX node
//! knows a value at least as large as anything its MIN ancestors will accept, its second child
//! cannot change the result and is skipped. Ties are always resolved towards the first child,
//! so the pruned result equals the exhaustive one, including the responsible leaf.
//!
//! With smoothing, both children of every node are evaluated and blended with a quadratic
//! fillet when they are closer than the fillet width.
use ndarray::{Array1, ArrayBase, ArrayView1, Data, Ix2};

use crate::dataset::SampleSource;
use crate::error::{AlnError, Result};
use crate::model::{Aln, MinMaxOp, NodeId, NodeKind};
use crate::traits::PredictInplace;

/// What an evaluation recorded about one node
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct NodeTrace {
    pub(crate) value: f64,
    /// Index of the more active child of an internal node
    pub(crate) active: usize,
    /// Response weight of the more active child, in `[0.5, 1]`
    pub(crate) response: f64,
}

/// Per-node evaluation state, indexed by node id
#[derive(Clone, Debug, Default)]
pub(crate) struct EvalTrace {
    nodes: Vec<NodeTrace>,
}

impl EvalTrace {
    pub(crate) fn with_len(len: usize) -> Result<Self> {
        let mut trace = EvalTrace::default();
        trace.reset(len)?;
        Ok(trace)
    }

    /// Clears the trace and sizes it for an arena of `len` nodes
    pub(crate) fn reset(&mut self, len: usize) -> Result<()> {
        self.nodes.clear();
        self.nodes
            .try_reserve(len)
            .map_err(|_| AlnError::OutOfMemory("evaluation trace"))?;
        self.nodes.resize(len, NodeTrace::default());
        Ok(())
    }

    pub(crate) fn get(&self, id: NodeId) -> &NodeTrace {
        &self.nodes[id.index()]
    }
}

impl Aln {
    /// Signed distance of `x` from the surface along the output axis, with the leaf
    /// responsible for it. Uses pruning when smoothing is off.
    ///
    /// ### Panics
    ///
    /// If `x` does not have `n_dim` entries
    pub fn evaluate(&self, x: ArrayView1<f64>) -> (f64, NodeId) {
        assert_eq!(x.len(), self.n_dim, "vector length must match dimension");
        if self.region.is_smoothing() {
            eval_full(self, self.root, &x, None)
        } else {
            eval_pruned(self, self.root, &x, f64::NEG_INFINITY, f64::INFINITY)
        }
    }

    /// Same as [`evaluate`](Aln::evaluate) but always evaluates both children of every node
    pub fn evaluate_exhaustive(&self, x: ArrayView1<f64>) -> (f64, NodeId) {
        assert_eq!(x.len(), self.n_dim, "vector length must match dimension");
        eval_full(self, self.root, &x, None)
    }

    /// Value of the approximated function at `x`, the output entry of `x` being ignored, with
    /// the responsible leaf
    pub fn quick_eval(&self, x: ArrayView1<f64>) -> (f64, NodeId) {
        let (distance, leaf) = self.evaluate(x);
        (x[self.output] + distance, leaf)
    }

    /// Evaluates every vector of `source`, returning one prediction and one responsible leaf
    /// per usable row
    pub fn predict_source<S: SampleSource>(
        &self,
        source: &mut S,
    ) -> Result<(Array1<f64>, Vec<NodeId>)> {
        if let Some(n_vars) = source.n_vars() {
            if n_vars != self.n_dim {
                return Err(AlnError::InvalidArgument(format!(
                    "source provides {} variables, network has {}",
                    n_vars, self.n_dim
                )));
            }
        }

        let n_samples = source.n_samples();
        let mut predictions = Array1::zeros(n_samples);
        let mut leaves = Vec::new();
        leaves
            .try_reserve_exact(n_samples)
            .map_err(|_| AlnError::OutOfMemory("responsible leaves"))?;

        let mut x = Array1::zeros(self.n_dim);
        for (i, row) in (source.first_row()..source.n_rows()).enumerate() {
            source.fill(row, x.view_mut())?;
            let (value, leaf) = self.quick_eval(x.view());
            predictions[i] = value;
            leaves.push(leaf);
        }

        Ok((predictions, leaves))
    }

    /// Exhaustive evaluation recording value, active child and response of every node
    pub(crate) fn adapt_eval(&self, x: ArrayView1<f64>, trace: &mut EvalTrace) -> (f64, NodeId) {
        eval_full(self, self.root, &x, Some(trace))
    }
}

fn eval_pruned(aln: &Aln, id: NodeId, x: &ArrayView1<f64>, lo: f64, hi: f64) -> (f64, NodeId) {
    match &aln.node(id).kind {
        NodeKind::Leaf(lfn) => (lfn.distance(x.view()), id),
        NodeKind::MinMax(mm) => {
            let [first, second] = mm.children;
            match mm.op {
                MinMaxOp::Max => {
                    let a = eval_pruned(aln, first, x, lo, hi);
                    if a.0 >= hi {
                        return a;
                    }
                    let b = eval_pruned(aln, second, x, lo.max(a.0), hi);
                    if a.0 >= b.0 {
                        a
                    } else {
                        b
                    }
                }
                MinMaxOp::Min => {
                    let a = eval_pruned(aln, first, x, lo, hi);
                    if a.0 <= lo {
                        return a;
                    }
                    let b = eval_pruned(aln, second, x, lo, hi.min(a.0));
                    if a.0 <= b.0 {
                        a
                    } else {
                        b
                    }
                }
            }
        }
    }
}

fn eval_full(
    aln: &Aln,
    id: NodeId,
    x: &ArrayView1<f64>,
    mut trace: Option<&mut EvalTrace>,
) -> (f64, NodeId) {
    let (value, leaf, active, response) = match &aln.node(id).kind {
        NodeKind::Leaf(lfn) => (lfn.distance(x.view()), id, 0, 1.0),
        NodeKind::MinMax(mm) => {
            let [first, second] = mm.children;
            let a = eval_full(aln, first, x, trace.as_deref_mut());
            let b = eval_full(aln, second, x, trace.as_deref_mut());

            let gap = (a.0 - b.0).abs();
            let (active, winner) = if mm.op.prefers(a.0, b.0) {
                (0, a)
            } else {
                (1, b)
            };
            let value = winner.0 + mm.op.sign() * aln.region.fillet(gap);

            (
                value,
                winner.1,
                active,
                aln.region.active_response(gap),
            )
        }
    };

    if let Some(trace) = trace {
        trace.nodes[id.index()] = NodeTrace {
            value,
            active,
            response,
        };
    }
    (value, leaf)
}

impl<D: Data<Elem = f64>> PredictInplace<ArrayBase<D, Ix2>, Array1<f64>> for Aln {
    /// Predicts the output for every row of `x`; rows have `n_dim` entries and the output entry
    /// is ignored.
    fn predict_inplace(&self, x: &ArrayBase<D, Ix2>, y: &mut Array1<f64>) {
        assert_eq!(
            x.nrows(),
            y.len(),
            "The number of data points must match the number of output targets."
        );
        assert_eq!(
            x.ncols(),
            self.n_dim,
            "Number of data features must match the dimension of the network."
        );

        for (row, target) in x.rows().into_iter().zip(y.iter_mut()) {
            *target = self.quick_eval(row).0;
        }
    }

    fn default_target(&self, x: &ArrayBase<D, Ix2>) -> Array1<f64> {
        Array1::zeros(x.nrows())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::SampleTable;
    use crate::traits::Predict;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array2};
    use ndarray_rand::rand_distr::Uniform;
    use ndarray_rand::RandomExt;
    use rand::{Rng, SeedableRng};
    use rand_xoshiro::Xoshiro256Plus;

    /// Grows a random tree over (x0, x1, y) with random pieces
    fn random_network(rng: &mut Xoshiro256Plus, splits: usize) -> Aln {
        let mut aln = Aln::new(3, 2).unwrap();
        for _ in 0..splits {
            let leaves: Vec<_> = aln.leaves().map(|(id, _)| id).collect();
            let id = leaves[rng.gen_range(0..leaves.len())];
            let op = if rng.gen::<bool>() {
                MinMaxOp::Max
            } else {
                MinMaxOp::Min
            };
            aln.split_leaf(id, op).unwrap();
        }
        let leaves: Vec<_> = aln.leaves().map(|(id, _)| id).collect();
        for id in leaves {
            let lfn = aln.leaf_mut(id).unwrap();
            lfn.w[0] = rng.gen_range(-1.0..1.0);
            lfn.w[1] = rng.gen_range(-2.0..2.0);
            lfn.w[2] = rng.gen_range(-2.0..2.0);
        }
        aln
    }

    #[test]
    fn pruned_equals_exhaustive() {
        let mut rng = Xoshiro256Plus::seed_from_u64(7);
        for _ in 0..20 {
            let aln = random_network(&mut rng, 12);
            let points = Array2::random_using((200, 3), Uniform::new(-2.0, 2.0), &mut rng);
            for x in points.rows() {
                let pruned = aln.evaluate(x);
                let full = aln.evaluate_exhaustive(x);
                assert_eq!(pruned.0, full.0);
                assert_eq!(pruned.1, full.1);
            }
        }
    }

    #[test]
    fn ties_resolve_to_the_first_child() {
        let mut aln = Aln::new(2, 1).unwrap();
        let [a, _] = aln.split_leaf(aln.root(), MinMaxOp::Max).unwrap();
        // both leaves are identical after a zero split
        let x = array![0.5, 0.0];
        assert_eq!(aln.evaluate(x.view()).1, a);
        assert_eq!(aln.evaluate_exhaustive(x.view()).1, a);
    }

    #[test]
    fn smoothing_converges_to_the_sharp_surface() {
        let mut rng = Xoshiro256Plus::seed_from_u64(3);
        let mut aln = random_network(&mut rng, 8);
        let points = Array2::random_using((100, 3), Uniform::new(-2.0, 2.0), &mut rng);
        let sharp: Vec<f64> = points.rows().into_iter().map(|x| aln.evaluate(x).0).collect();

        for &se in &[0.1, 0.01, 0.001, 1e-6] {
            aln.region_mut().set_smoothing_epsilon(se).unwrap();
            let worst = points
                .rows()
                .into_iter()
                .zip(&sharp)
                .map(|(x, s)| (aln.evaluate(x).0 - s).abs())
                .fold(0.0, f64::max);
            // the fillet never moves a node by more than se, and the depth bounds the total
            assert!(worst <= se * aln.depth() as f64 + 1e-12);
        }
    }

    #[test]
    fn smoothed_surface_is_continuous_across_the_switch() {
        // max(x, -x) smoothed around x = 0
        let mut aln = Aln::new(2, 1).unwrap();
        let [a, b] = aln.split_leaf(aln.root(), MinMaxOp::Max).unwrap();
        aln.leaf_mut(a).unwrap().w[1] = 1.0;
        aln.leaf_mut(b).unwrap().w[1] = -1.0;
        aln.region_mut().set_smoothing_epsilon(0.05).unwrap();

        let h = 1e-7;
        let left = aln.quick_eval(array![-h, 0.0].view());
        let right = aln.quick_eval(array![h, 0.0].view());
        assert_ne!(left.1, right.1);
        assert_abs_diff_eq!(left.0, right.0, epsilon = 1e-6);
        // the fillet lifts the corner by exactly se
        assert_abs_diff_eq!(aln.quick_eval(array![0.0, 0.0].view()).0, 0.05, epsilon = 1e-12);
        // outside the band the pieces are untouched
        assert_abs_diff_eq!(aln.quick_eval(array![0.5, 0.0].view()).0, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn trace_records_active_children() {
        let mut aln = Aln::new(2, 1).unwrap();
        let [a, b] = aln.split_leaf(aln.root(), MinMaxOp::Min).unwrap();
        aln.leaf_mut(a).unwrap().w[1] = 1.0;
        aln.leaf_mut(b).unwrap().w[1] = -1.0;

        let mut trace = EvalTrace::with_len(aln.nodes.len()).unwrap();
        let (value, leaf) = aln.adapt_eval(array![0.5, 0.0].view(), &mut trace);
        assert_eq!(leaf, b);
        assert_abs_diff_eq!(value, -0.5);
        let root = trace.get(aln.root());
        assert_eq!(root.active, 1);
        assert_eq!(root.response, 1.0);
    }

    #[test]
    fn batch_prediction_matches_single_evaluation() {
        let mut rng = Xoshiro256Plus::seed_from_u64(11);
        let aln = random_network(&mut rng, 5);
        let records = Array2::random_using((30, 3), Uniform::new(-1.0, 1.0), &mut rng);

        let mut table = SampleTable::new(records.view());
        let (predictions, leaves) = aln.predict_source(&mut table).unwrap();
        let direct: Array1<f64> = aln.predict(&records);

        for (i, x) in records.rows().into_iter().enumerate() {
            let (value, leaf) = aln.quick_eval(x);
            assert_eq!(predictions[i], value);
            assert_eq!(direct[i], value);
            assert_eq!(leaves[i], leaf);
        }
    }
}
