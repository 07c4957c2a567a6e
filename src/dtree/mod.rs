//! Compiled networks
//!
//! A [`DecisionTree`] partitions the input domain into axis-aligned boxes. Each box owns a
//! block: a small MIN/MAX expression over the linear forms that can be responsible for the
//! output inside it. Evaluation descends the splits to the box containing the input and
//! evaluates only that block.
mod bounds;
mod compile;
mod hyperparams;
mod partition;
mod simplify;

pub use hyperparams::{DtreeParams, DtreeValidParams};

use ndarray::{Array1, ArrayBase, ArrayView1, Data, Ix2};

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use crate::model::MinMaxOp;
use crate::traits::PredictInplace;

/// Name and domain of a variable of a compiled network
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug, PartialEq)]
pub struct VarDef {
    pub name: String,
    pub min: f64,
    pub max: f64,
}

/// An affine piece copied from a leaf of the network
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug, PartialEq)]
pub struct LinearForm {
    pub(crate) bias: f64,
    /// One weight per variable, `-1` on the output
    pub(crate) weights: Array1<f64>,
    pub(crate) centroid: Array1<f64>,
}

impl LinearForm {
    pub fn bias(&self) -> f64 {
        self.bias
    }

    pub fn weights(&self) -> ArrayView1<f64> {
        self.weights.view()
    }

    pub fn centroid(&self) -> ArrayView1<f64> {
        self.centroid.view()
    }

    /// Value of the form at `x`, the entry of the output variable being ignored
    #[inline]
    pub fn value(&self, x: ArrayView1<f64>, output: usize) -> f64 {
        let mut value = self.bias;
        for (i, (w, x)) in self.weights.iter().zip(x.iter()).enumerate() {
            if i != output {
                value += w * x;
            }
        }
        value
    }
}

/// Quadratic blend of two operands closer than `4·se`, the same one the network applies
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Fillet {
    four_se: f64,
    inv_16_se: f64,
}

impl Fillet {
    pub(crate) fn new(smoothing_epsilon: f64) -> Self {
        if smoothing_epsilon > 0.0 {
            Fillet {
                four_se: 4.0 * smoothing_epsilon,
                inv_16_se: 1.0 / (16.0 * smoothing_epsilon),
            }
        } else {
            Fillet::sharp()
        }
    }

    pub(crate) fn sharp() -> Self {
        Fillet {
            four_se: 0.0,
            inv_16_se: 0.0,
        }
    }

    pub(crate) fn is_sharp(&self) -> bool {
        self.four_se == 0.0
    }

    /// Gap beyond which the blend vanishes
    pub(crate) fn width(&self) -> f64 {
        self.four_se
    }

    /// Largest lift, reached at a tie
    pub(crate) fn peak(&self) -> f64 {
        self.lift(0.0)
    }

    /// Amount by which a MAX is lifted (or a MIN lowered) for operands `gap` apart
    #[inline]
    pub(crate) fn lift(&self, gap: f64) -> f64 {
        if gap < self.four_se {
            let r = self.four_se - gap;
            r * r * self.inv_16_se
        } else {
            0.0
        }
    }
}

/// MIN/MAX expression over linear forms, forms being addressed by index
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug, PartialEq)]
pub enum BlockExpr {
    Form(usize),
    Min(Vec<BlockExpr>),
    Max(Vec<BlockExpr>),
}

impl BlockExpr {
    pub(crate) fn from_op(op: MinMaxOp, children: Vec<BlockExpr>) -> Self {
        match op {
            MinMaxOp::Min => BlockExpr::Min(children),
            MinMaxOp::Max => BlockExpr::Max(children),
        }
    }

    /// Operator and children of an internal expression
    pub fn op(&self) -> Option<(MinMaxOp, &[BlockExpr])> {
        match self {
            BlockExpr::Form(_) => None,
            BlockExpr::Min(children) => Some((MinMaxOp::Min, children)),
            BlockExpr::Max(children) => Some((MinMaxOp::Max, children)),
        }
    }

    /// Number of form occurrences in the expression
    pub fn num_forms(&self) -> usize {
        match self.op() {
            None => 1,
            Some((_, children)) => children.iter().map(BlockExpr::num_forms).sum(),
        }
    }

    /// Sorted indices of the forms referenced by the expression
    pub fn form_indices(&self) -> Vec<usize> {
        let mut indices = Vec::new();
        self.collect_forms(&mut indices);
        indices.sort_unstable();
        indices.dedup();
        indices
    }

    fn collect_forms(&self, indices: &mut Vec<usize>) {
        match self {
            BlockExpr::Form(i) => indices.push(*i),
            BlockExpr::Min(children) | BlockExpr::Max(children) => {
                children.iter().for_each(|c| c.collect_forms(indices))
            }
        }
    }

    /// Value of the expression with the responsible form. Ties go to the earlier child.
    ///
    /// Operands are combined from left to right, each step blended with `fillet`.
    pub(crate) fn evaluate(
        &self,
        forms: &[LinearForm],
        x: ArrayView1<f64>,
        output: usize,
        fillet: Fillet,
    ) -> (f64, usize) {
        let (op, children) = match self {
            BlockExpr::Form(i) => return (forms[*i].value(x, output), *i),
            BlockExpr::Min(children) => (MinMaxOp::Min, children),
            BlockExpr::Max(children) => (MinMaxOp::Max, children),
        };

        let mut best = (f64::NAN, usize::MAX);
        for (k, child) in children.iter().enumerate() {
            let candidate = child.evaluate(forms, x, output, fillet);
            if k == 0 {
                best = candidate;
                continue;
            }
            let gap = (best.0 - candidate.0).abs();
            let winner = if op.prefers(best.0, candidate.0) {
                best
            } else {
                candidate
            };
            best = (winner.0 + op.sign() * fillet.lift(gap), winner.1);
        }
        best
    }

    pub(crate) fn remap_forms(&mut self, map: &[usize]) {
        match self {
            BlockExpr::Form(i) => *i = map[*i],
            BlockExpr::Min(children) | BlockExpr::Max(children) => {
                children.iter_mut().for_each(|c| c.remap_forms(map))
            }
        }
    }
}

/// The expression evaluated inside one box of the partition
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    pub(crate) expr: BlockExpr,
}

impl Block {
    pub fn expr(&self) -> &BlockExpr {
        &self.expr
    }
}

/// Node of the partition: a threshold on one variable or a block
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug, PartialEq)]
pub enum SplitNode {
    Block(usize),
    /// `x[var] < threshold` goes left
    Split {
        var: usize,
        threshold: f64,
        left: Box<SplitNode>,
        right: Box<SplitNode>,
    },
}

impl SplitNode {
    /// Depth of the partition, a single block having depth `1`
    pub fn depth(&self) -> usize {
        match self {
            SplitNode::Block(_) => 1,
            SplitNode::Split { left, right, .. } => 1 + usize::max(left.depth(), right.depth()),
        }
    }
}

/// A network compiled into a box partition with one block per box
///
/// ### Example
///
/// ```rust
/// use linfa_aln::{Aln, DecisionTree, MinMaxOp};
/// use ndarray::array;
///
/// let mut aln = Aln::new(2, 1).unwrap();
/// aln.region_mut().constraint_mut(0).unwrap().set_domain(-1.0, 1.0).unwrap();
///
/// let dtree = aln.compile(&DecisionTree::params()).unwrap();
/// let x = array![0.5, 0.0];
/// assert_eq!(dtree.evaluate(x.view()), aln.quick_eval(x.view()).0);
/// ```
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug, PartialEq)]
pub struct DecisionTree {
    pub(crate) vars: Vec<VarDef>,
    pub(crate) output: usize,
    /// Fillet setting of the compiled network, `0` for sharp corners
    #[cfg_attr(feature = "serde", serde(default))]
    pub(crate) smoothing_epsilon: f64,
    pub(crate) forms: Vec<LinearForm>,
    pub(crate) blocks: Vec<Block>,
    pub(crate) root: SplitNode,
}

impl DecisionTree {
    pub fn vars(&self) -> &[VarDef] {
        &self.vars
    }

    /// Index of the output variable
    pub fn output(&self) -> usize {
        self.output
    }

    pub fn smoothing_epsilon(&self) -> f64 {
        self.smoothing_epsilon
    }

    pub fn forms(&self) -> &[LinearForm] {
        &self.forms
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn root(&self) -> &SplitNode {
        &self.root
    }

    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Depth of the partition, a single block having depth `1`
    pub fn depth(&self) -> usize {
        self.root.depth()
    }

    /// Index of the block responsible for `x`
    pub fn block_index(&self, x: ArrayView1<f64>) -> usize {
        let mut node = &self.root;
        loop {
            match node {
                SplitNode::Block(block) => return *block,
                SplitNode::Split {
                    var,
                    threshold,
                    left,
                    right,
                } => {
                    node = if x[*var] < *threshold { left } else { right };
                }
            }
        }
    }

    /// Predicted output at `x`, the output entry of `x` being ignored
    ///
    /// ### Panics
    ///
    /// If `x` does not have one entry per variable
    pub fn evaluate(&self, x: ArrayView1<f64>) -> f64 {
        assert_eq!(x.len(), self.vars.len(), "vector length must match dimension");
        let block = &self.blocks[self.block_index(x)];
        let fillet = Fillet::new(self.smoothing_epsilon);
        block.expr.evaluate(&self.forms, x, self.output, fillet).0
    }
}

impl<D: Data<Elem = f64>> PredictInplace<ArrayBase<D, Ix2>, Array1<f64>> for DecisionTree {
    fn predict_inplace(&self, x: &ArrayBase<D, Ix2>, y: &mut Array1<f64>) {
        assert_eq!(
            x.nrows(),
            y.len(),
            "The number of data points must match the number of output targets."
        );

        for (row, target) in x.rows().into_iter().zip(y.iter_mut()) {
            *target = self.evaluate(row);
        }
    }

    fn default_target(&self, x: &ArrayBase<D, Ix2>) -> Array1<f64> {
        Array1::zeros(x.nrows())
    }
}
