use std::iter::Iterator;

use super::{Aln, Lfn, NodeId, NodeKind};

/// Depth-first iterator over the nodes reachable from a root, first child first
pub struct NodeIter<'a> {
    aln: &'a Aln,
    stack: Vec<NodeId>,
}

impl<'a> NodeIter<'a> {
    pub fn new(aln: &'a Aln, root: NodeId) -> Self {
        NodeIter {
            aln,
            stack: vec![root],
        }
    }
}

impl<'a> Iterator for NodeIter<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        self.stack.pop().map(|id| {
            if let NodeKind::MinMax(mm) = &self.aln.node(id).kind {
                self.stack.push(mm.children[1]);
                self.stack.push(mm.children[0]);
            }
            id
        })
    }
}

/// Iterator over the leaves reachable from a root
pub struct LeafIter<'a> {
    nodes: NodeIter<'a>,
}

impl<'a> LeafIter<'a> {
    pub fn new(aln: &'a Aln, root: NodeId) -> Self {
        LeafIter {
            nodes: NodeIter::new(aln, root),
        }
    }
}

impl<'a> Iterator for LeafIter<'a> {
    type Item = (NodeId, &'a Lfn);

    fn next(&mut self) -> Option<Self::Item> {
        let aln = self.nodes.aln;
        self.nodes
            .by_ref()
            .find_map(|id| aln.node(id).as_leaf().map(|lfn| (id, lfn)))
    }
}
