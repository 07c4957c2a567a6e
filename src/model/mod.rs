//! The network: an arena of MIN/MAX nodes over affine pieces
//!
//! An [`Aln`] approximates a function of `n_dim - 1` inputs. Every leaf is an affine piece
//! ([`Lfn`]); every internal node takes the MIN or the MAX of its two children. Nodes live in
//! an arena owned by the network and refer to each other through [`NodeId`]s. Parent links
//! are plain indices used for traversal only.
mod invert;
mod iter;
mod node;
mod region;

pub use invert::Monotonicity;
pub use iter::{LeafIter, NodeIter};
pub use node::{Lfn, MinMax, MinMaxOp, Node, NodeId, NodeKind, SplitStats};
pub use region::{Constraint, Region, DEFAULT_DOMAIN, DEFAULT_EPSILON, DEFAULT_WEIGHT_BOUND};

use crate::error::{AlnError, Result};

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

/// An adaptive logic network
///
/// ### Structure
///
/// The network is a binary tree. Leaves hold affine pieces, internal nodes combine the values
/// of their two children with a MIN or a MAX. The resulting function is continuous and
/// piecewise linear; with a positive smoothing epsilon the corners are replaced by quadratic
/// fillets.
///
/// ### Example
///
/// ```rust
/// use linfa_aln::{Aln, MinMaxOp};
///
/// // one input, output in slot 1
/// let mut aln = Aln::new(2, 1).unwrap();
/// let [left, right] = aln.split_leaf(aln.root(), MinMaxOp::Max).unwrap();
/// assert_eq!(aln.num_leaves(), 2);
/// assert!(aln.node(left).is_leaf() && aln.node(right).is_leaf());
/// ```
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug, PartialEq)]
pub struct Aln {
    pub(crate) n_dim: usize,
    pub(crate) output: usize,
    pub(crate) region: Region,
    pub(crate) nodes: Vec<Node>,
    pub(crate) root: NodeId,
}

impl Aln {
    /// Creates a network over `n_dim` variables, `output` being the index of the output
    /// variable. The network starts as a single uninitialized leaf.
    pub fn new(n_dim: usize, output: usize) -> Result<Self> {
        if n_dim < 2 {
            return Err(AlnError::InvalidArgument(format!(
                "a network needs at least one input and one output, got dimension {}",
                n_dim
            )));
        }
        if output >= n_dim {
            return Err(AlnError::InvalidArgument(format!(
                "output index {} out of range for dimension {}",
                output, n_dim
            )));
        }

        let region = Region::new(n_dim)?;
        let root = Node::leaf(None, Lfn::zeroed(&region, output));

        Ok(Aln {
            n_dim,
            output,
            region,
            nodes: vec![root],
            root: NodeId(0),
        })
    }

    /// Number of variables, inputs and output included
    pub fn n_dim(&self) -> usize {
        self.n_dim
    }

    /// Index of the output variable
    pub fn output(&self) -> usize {
        self.output
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    pub fn region_mut(&mut self) -> &mut Region {
        &mut self.region
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Returns the node with the given id
    ///
    /// ### Panics
    ///
    /// If `id` does not belong to this network
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    /// Returns the piece of a leaf, `None` for internal nodes or foreign ids
    pub fn leaf(&self, id: NodeId) -> Option<&Lfn> {
        self.nodes.get(id.0).and_then(Node::as_leaf)
    }

    pub(crate) fn leaf_mut(&mut self, id: NodeId) -> Option<&mut Lfn> {
        self.nodes.get_mut(id.0).and_then(Node::as_leaf_mut)
    }

    /// Create a node iterator in depth-first order
    pub fn iter_nodes(&self) -> NodeIter<'_> {
        NodeIter::new(self, self.root)
    }

    /// Iterate over all leaves together with their ids
    pub fn leaves(&self) -> LeafIter<'_> {
        LeafIter::new(self, self.root)
    }

    /// Return the number of leaves in this network
    pub fn num_leaves(&self) -> usize {
        self.leaves().count()
    }

    /// Return the number of nodes in this network
    pub fn num_nodes(&self) -> usize {
        self.iter_nodes().count()
    }

    /// Return the depth of the deepest leaf, the root being at depth `0`
    pub fn depth(&self) -> usize {
        let mut max = 0;
        let mut stack = vec![(self.root, 0)];
        while let Some((id, depth)) = stack.pop() {
            max = usize::max(max, depth);
            if let NodeKind::MinMax(mm) = &self.node(id).kind {
                stack.extend(mm.children.iter().map(|&c| (c, depth + 1)));
            }
        }
        max
    }

    /// Marks a leaf as growable (it may be split by the trainer) or not
    pub fn set_growable(&mut self, id: NodeId, growable: bool) -> Result<()> {
        let lfn = self.leaf_mut(id).ok_or_else(|| not_a_leaf(id))?;
        if growable {
            if lfn.split.is_none() {
                lfn.split = Some(SplitStats::default());
            }
            lfn.frozen = false;
        } else {
            lfn.split = None;
        }
        Ok(())
    }

    /// Marks every leaf as growable or not
    pub fn set_all_growable(&mut self, growable: bool) -> Result<()> {
        let ids: Vec<_> = self.leaves().map(|(id, _)| id).collect();
        ids.into_iter()
            .try_for_each(|id| self.set_growable(id, growable))
    }

    /// Replaces a leaf by an internal node with operator `op` over two zero-initialized leaves.
    ///
    /// The new leaves are initialized by the trainer on the first sample of the next run.
    pub fn split_leaf(&mut self, id: NodeId, op: MinMaxOp) -> Result<[NodeId; 2]> {
        if self.leaf(id).is_none() {
            return Err(not_a_leaf(id));
        }
        let left = Lfn::zeroed(&self.region, self.output);
        let right = left.clone();
        self.replace_leaf(id, op, left, right)
    }

    /// Splits a growable leaf into two growable copies of itself.
    ///
    /// The copies are shifted along the output axis, one up and one down by the same amount
    /// around a common offset, such that the value of the new node equals the value of the
    /// old leaf everywhere. The common offset compensates the fillet when smoothing is on.
    pub(crate) fn split_growable(&mut self, id: NodeId, op: MinMaxOp) -> Result<[NodeId; 2]> {
        let parent = self.leaf(id).ok_or_else(|| not_a_leaf(id))?.clone();

        let delta = 0.5 * self.region.constraint(self.output).epsilon();
        let offset = delta + self.region.fillet(2.0 * delta);
        let (shift_first, shift_second) = match op {
            MinMaxOp::Max => (delta - offset, -delta - offset),
            MinMaxOp::Min => (offset - delta, offset + delta),
        };

        let mut first = parent;
        first.split = Some(SplitStats::default());
        first.frozen = false;
        let mut second = first.clone();
        first.shift_output(self.output, shift_first);
        second.shift_output(self.output, shift_second);

        self.replace_leaf(id, op, first, second)
    }

    fn replace_leaf(
        &mut self,
        id: NodeId,
        op: MinMaxOp,
        first: Lfn,
        second: Lfn,
    ) -> Result<[NodeId; 2]> {
        self.nodes
            .try_reserve(2)
            .map_err(|_| AlnError::OutOfMemory("network nodes"))?;

        let children = [NodeId(self.nodes.len()), NodeId(self.nodes.len() + 1)];
        self.nodes.push(Node::leaf(Some(id), first));
        self.nodes.push(Node::leaf(Some(id), second));
        self.node_mut(id).kind = NodeKind::MinMax(MinMax { op, children });

        Ok(children)
    }

    /// Checks the structural invariants of a network restored from outside
    pub(crate) fn validate(&self) -> Result<()> {
        let malformed = |msg: String| Err(AlnError::MalformedModel(msg));

        if self.n_dim < 2 || self.output >= self.n_dim {
            return malformed(format!(
                "dimension {} with output {}",
                self.n_dim, self.output
            ));
        }
        if self.region.n_vars() != self.n_dim {
            return malformed(format!(
                "{} constraints for dimension {}",
                self.region.n_vars(),
                self.n_dim
            ));
        }
        self.region.validate()?;
        if self.root.0 >= self.nodes.len() || self.node(self.root).parent.is_some() {
            return malformed("invalid root".to_string());
        }

        let mut seen = vec![false; self.nodes.len()];
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            if std::mem::replace(&mut seen[id.0], true) {
                return malformed(format!("node {} reached twice", id.0));
            }
            match &self.node(id).kind {
                NodeKind::MinMax(mm) => {
                    for &child in &mm.children {
                        if child.0 >= self.nodes.len() || self.node(child).parent != Some(id) {
                            return malformed(format!("broken link below node {}", id.0));
                        }
                        stack.push(child);
                    }
                }
                NodeKind::Leaf(lfn) => {
                    if lfn.w.len() != self.n_dim + 1
                        || lfn.c.len() != self.n_dim
                        || lfn.d.len() != self.n_dim
                    {
                        return malformed(format!("leaf {} has wrong vector sizes", id.0));
                    }
                    if lfn.w[self.output + 1] != -1.0 {
                        return malformed(format!("leaf {} has no unit output weight", id.0));
                    }
                    if !lfn.w.iter().chain(lfn.c.iter()).all(|v| v.is_finite()) {
                        return malformed(format!("leaf {} has non-finite parameters", id.0));
                    }
                    // deviations divide every update
                    if !lfn.d.iter().all(|&d| d.is_finite() && d > 0.0) {
                        return malformed(format!("leaf {} has degenerate deviations", id.0));
                    }
                }
            }
        }
        if seen.iter().any(|s| !s) {
            return malformed("unreachable nodes in arena".to_string());
        }
        Ok(())
    }
}

fn not_a_leaf(id: NodeId) -> AlnError {
    AlnError::InvalidArgument(format!("node {} is not a leaf", id.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array1};

    #[test]
    fn rejects_bad_dimensions() {
        assert!(Aln::new(1, 0).is_err());
        assert!(Aln::new(3, 3).is_err());
        assert!(Aln::new(3, 2).is_ok());
    }

    #[test]
    fn fresh_network_is_one_leaf() {
        let aln = Aln::new(3, 0).unwrap();
        assert_eq!(aln.num_leaves(), 1);
        assert_eq!(aln.depth(), 0);
        let lfn = aln.leaf(aln.root()).unwrap();
        assert!(!lfn.is_initialized());
        assert_eq!(lfn.weight(0), -1.0);
        assert!(aln.validate().is_ok());
    }

    #[test]
    fn growable_flag_controls_split_stats() {
        let mut aln = Aln::new(2, 1).unwrap();
        let root = aln.root();
        aln.set_growable(root, true).unwrap();
        assert!(aln.leaf(root).unwrap().split_stats().is_some());
        aln.set_growable(root, false).unwrap();
        assert!(aln.leaf(root).unwrap().split_stats().is_none());

        aln.split_leaf(root, MinMaxOp::Min).unwrap();
        assert!(aln.set_growable(root, true).is_err());
    }

    #[test]
    fn split_links_children_to_parent() {
        let mut aln = Aln::new(2, 1).unwrap();
        let root = aln.root();
        let [a, b] = aln.split_leaf(root, MinMaxOp::Max).unwrap();
        let [c, _] = aln.split_leaf(b, MinMaxOp::Min).unwrap();

        assert_eq!(aln.node(a).parent(), Some(root));
        assert_eq!(aln.node(c).parent(), Some(b));
        assert_eq!(aln.num_leaves(), 3);
        assert_eq!(aln.num_nodes(), 5);
        assert_eq!(aln.depth(), 2);
        assert!(aln.validate().is_ok());
    }

    fn sloped(aln: &mut Aln, slope: f64) {
        let output = aln.output();
        let root = aln.root();
        let lfn = aln.leaf_mut(root).unwrap();
        lfn.w[1] = slope;
        lfn.c = array![0.2, 0.7];
        lfn.initialized = true;
        lfn.update_bias(output);
    }

    #[test]
    fn growable_split_keeps_the_value() {
        for &se in &[0.0, 0.01, 0.5] {
            for &op in &[MinMaxOp::Max, MinMaxOp::Min] {
                let mut aln = Aln::new(2, 1).unwrap();
                aln.region_mut().set_smoothing_epsilon(se).unwrap();
                aln.region_mut()
                    .constraint_mut(1)
                    .unwrap()
                    .set_epsilon(0.05)
                    .unwrap();
                sloped(&mut aln, 1.5);

                let centroid: Array1<f64> = aln.leaf(aln.root()).unwrap().c.clone();
                let (before, _) = aln.quick_eval(centroid.view());
                aln.split_growable(aln.root(), op).unwrap();
                let (after, _) = aln.quick_eval(centroid.view());

                assert_abs_diff_eq!(before, after, epsilon = 1e-12);
            }
        }
    }
}
