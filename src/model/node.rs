use ndarray::{Array1, ArrayView1};

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use super::Region;

/// Index of a node inside the arena of an [`Aln`](crate::Aln)
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Position of the node in the arena
    pub fn index(self) -> usize {
        self.0
    }
}

/// Operator of an internal node
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MinMaxOp {
    Min,
    Max,
}

impl MinMaxOp {
    pub fn flip(self) -> Self {
        match self {
            MinMaxOp::Min => MinMaxOp::Max,
            MinMaxOp::Max => MinMaxOp::Min,
        }
    }

    /// Whether the value `a` of the first child wins against `b`. Ties go to the first child.
    #[inline]
    pub fn prefers(self, a: f64, b: f64) -> bool {
        match self {
            MinMaxOp::Max => a >= b,
            MinMaxOp::Min => a <= b,
        }
    }

    /// Sign that turns this operator into a MAX: `+1` for MAX, `-1` for MIN
    #[inline]
    pub fn sign(self) -> f64 {
        match self {
            MinMaxOp::Max => 1.0,
            MinMaxOp::Min => -1.0,
        }
    }
}

/// Statistics gathered by a growable leaf between two split checks
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SplitStats {
    /// Number of samples the leaf was responsible for
    pub hits: u64,
    /// Responsibility weighted sum of squared errors
    pub sq_error: f64,
    /// Sum of responsibilities
    pub response: f64,
    /// Accumulated convexity evidence; non-negative means the leaf should split into a MAX
    pub convexity: f64,
}

impl SplitStats {
    pub fn reset(&mut self) {
        *self = SplitStats::default();
    }

    pub fn mean_sq_error(&self) -> f64 {
        if self.response > 0.0 {
            self.sq_error / self.response
        } else {
            0.0
        }
    }
}

/// A linear function node: one affine piece of the approximation
///
/// The weight vector holds the bias at position `0` followed by one weight per variable. The
/// weight of the output variable is `-1`, so that [`distance`](Lfn::distance) is the signed
/// distance of a point from the piece along the output axis.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug, PartialEq)]
pub struct Lfn {
    pub(crate) w: Array1<f64>,
    pub(crate) c: Array1<f64>,
    pub(crate) d: Array1<f64>,
    pub(crate) split: Option<SplitStats>,
    pub(crate) initialized: bool,
    pub(crate) frozen: bool,
}

impl Lfn {
    /// Zero-initialized piece, waiting for lazy initialization by the trainer
    pub(crate) fn zeroed(region: &Region, output: usize) -> Self {
        let n_dim = region.n_vars();
        let mut w = Array1::zeros(n_dim + 1);
        w[output + 1] = -1.0;
        let d = Array1::from_iter(region.constraints().iter().map(|c| c.epsilon_sq()));

        Lfn {
            w,
            c: Array1::zeros(n_dim),
            d,
            split: None,
            initialized: false,
            frozen: false,
        }
    }

    /// Weight vector, bias first
    pub fn weights(&self) -> ArrayView1<f64> {
        self.w.view()
    }

    pub fn bias(&self) -> f64 {
        self.w[0]
    }

    /// Weight of variable `var`
    pub fn weight(&self, var: usize) -> f64 {
        self.w[var + 1]
    }

    pub fn centroid(&self) -> ArrayView1<f64> {
        self.c.view()
    }

    /// Smoothed squared deviation of the samples from the centroid, per axis
    pub fn deviation(&self) -> ArrayView1<f64> {
        self.d.view()
    }

    pub fn is_growable(&self) -> bool {
        self.split.is_some()
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn split_stats(&self) -> Option<&SplitStats> {
        self.split.as_ref()
    }

    /// Signed distance of `x` from the piece along the output axis
    #[inline]
    pub fn distance(&self, x: ArrayView1<f64>) -> f64 {
        self.w[0]
            + self
                .w
                .iter()
                .skip(1)
                .zip(x.iter())
                .map(|(w, x)| w * x)
                .sum::<f64>()
    }

    /// Recomputes the bias so that the piece passes through the centroid
    pub(crate) fn update_bias(&mut self, output: usize) {
        let mut bias = self.c[output];
        for (i, c) in self.c.iter().enumerate() {
            if i != output {
                bias -= self.w[i + 1] * c;
            }
        }
        self.w[0] = bias;
    }

    /// Moves the piece along the output axis by `shift`
    pub(crate) fn shift_output(&mut self, output: usize, shift: f64) {
        self.c[output] += shift;
        self.w[0] += shift;
    }
}

/// Internal node combining two children with a MIN or a MAX
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug, PartialEq)]
pub struct MinMax {
    pub(crate) op: MinMaxOp,
    pub(crate) children: [NodeId; 2],
}

impl MinMax {
    pub fn op(&self) -> MinMaxOp {
        self.op
    }

    pub fn children(&self) -> [NodeId; 2] {
        self.children
    }
}

#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    Leaf(Lfn),
    MinMax(MinMax),
}

/// A node of the network
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub(crate) parent: Option<NodeId>,
    pub(crate) kind: NodeKind,
    pub(crate) hits: u64,
    pub(crate) prev_hits: u64,
    pub(crate) distance: f64,
}

impl Node {
    pub(crate) fn leaf(parent: Option<NodeId>, lfn: Lfn) -> Self {
        Node {
            parent,
            kind: NodeKind::Leaf(lfn),
            hits: 0,
            prev_hits: 0,
            distance: 0.0,
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf(_))
    }

    /// Returns `Some(piece)` for leaves and `None` for internal nodes
    pub fn as_leaf(&self) -> Option<&Lfn> {
        match &self.kind {
            NodeKind::Leaf(lfn) => Some(lfn),
            NodeKind::MinMax(_) => None,
        }
    }

    pub(crate) fn as_leaf_mut(&mut self) -> Option<&mut Lfn> {
        match &mut self.kind {
            NodeKind::Leaf(lfn) => Some(lfn),
            NodeKind::MinMax(_) => None,
        }
    }

    /// Returns `Some(node)` for internal nodes and `None` for leaves
    pub fn as_minmax(&self) -> Option<&MinMax> {
        match &self.kind {
            NodeKind::MinMax(mm) => Some(mm),
            NodeKind::Leaf(_) => None,
        }
    }

    /// Training hits in the current epoch
    pub fn hits(&self) -> u64 {
        self.hits
    }

    /// Training hits in the previous epoch
    pub fn prev_hits(&self) -> u64 {
        self.prev_hits
    }

    /// Distance to the surface computed for the last training sample
    pub fn last_distance(&self) -> f64 {
        self.distance
    }
}
