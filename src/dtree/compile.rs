use ndarray::s;
use rand::Rng;
use tracing::{info, trace};

use super::bounds::Domain;
use super::hyperparams::{DtreeParams, DtreeValidParams};
use super::partition::choose_cut;
use super::simplify::simplify;
use super::{Block, BlockExpr, DecisionTree, Fillet, LinearForm, SplitNode, VarDef};
use crate::error::{AlnError, Result};
use crate::model::{Aln, Monotonicity, NodeId, NodeKind};
use crate::param_guard::ParamGuard;

impl Aln {
    /// Compiles the network into a [`DecisionTree`].
    ///
    /// The declared domains of the variables form the initial box. Inside a box the network
    /// is simplified by dropping every piece that provably never determines the output
    /// there; boxes whose expression is still large are cut in two and compiled recursively.
    ///
    /// Every piece must have a negative weight on the output variable and every domain bound
    /// must be finite. A smoothed network compiles into a tree applying the same fillets.
    pub fn compile<R: Rng + Clone>(&self, params: &DtreeParams<R>) -> Result<DecisionTree> {
        let params = params.check_ref()?;

        let found = self.monotonicity(self.output)?;
        if found != Monotonicity::StrongDecreasing {
            return Err(AlnError::NotMonotonic {
                var: self.output,
                found,
            });
        }
        let domain = self.declared_domain()?;

        let mut forms = Vec::new();
        forms.try_reserve_exact(self.num_leaves())?;
        let expr = self.block_expr(self.root, &mut forms);

        let mut compiler = Compiler {
            forms: &forms,
            params,
            rng: params.rng.clone(),
            blocks: Vec::new(),
        };
        let root = compiler.partition(&expr, domain, 1)?;
        let blocks = compiler.blocks;

        let (forms, blocks) = compact(&forms, blocks)?;
        let vars = self
            .region
            .constraints()
            .iter()
            .map(|c| VarDef {
                name: c.name().to_string(),
                min: c.min(),
                max: c.max(),
            })
            .collect();

        let dtree = DecisionTree {
            vars,
            output: self.output,
            smoothing_epsilon: self.region.smoothing_epsilon(),
            forms,
            blocks,
            root,
        };
        info!(
            leaves = self.num_leaves(),
            forms = dtree.forms.len(),
            blocks = dtree.num_blocks(),
            depth = dtree.depth(),
            "compiled network"
        );
        Ok(dtree)
    }

    fn declared_domain(&self) -> Result<Domain> {
        let constraints = self.region.constraints();
        if let Some((var, c)) = constraints
            .iter()
            .enumerate()
            .find(|(_, c)| !(c.min().is_finite() && c.max().is_finite() && c.min() < c.max()))
        {
            return Err(AlnError::InvalidArgument(format!(
                "domain of variable {} must be finite and non-empty, but is [{}, {}]",
                var,
                c.min(),
                c.max()
            )));
        }

        Ok(Domain {
            lo: constraints.iter().map(|c| c.min()).collect(),
            hi: constraints.iter().map(|c| c.max()).collect(),
            output: self.output,
            fillet: Fillet::new(self.region.smoothing_epsilon()),
        })
    }

    /// Expression of the subtree at `id`, pushing its pieces onto `forms`
    fn block_expr(&self, id: NodeId, forms: &mut Vec<LinearForm>) -> BlockExpr {
        match &self.node(id).kind {
            NodeKind::Leaf(lfn) => {
                forms.push(LinearForm {
                    bias: lfn.w[0],
                    weights: lfn.w.slice(s![1..]).to_owned(),
                    centroid: lfn.c.clone(),
                });
                BlockExpr::Form(forms.len() - 1)
            }
            NodeKind::MinMax(mm) => {
                let children = mm
                    .children
                    .iter()
                    .map(|&child| self.block_expr(child, forms))
                    .collect();
                BlockExpr::from_op(mm.op, children)
            }
        }
    }
}

struct Compiler<'a, R: Rng> {
    forms: &'a [LinearForm],
    params: &'a DtreeValidParams<R>,
    rng: R,
    blocks: Vec<Block>,
}

impl<'a, R: Rng> Compiler<'a, R> {
    /// Compiles `expr` restricted to `domain`, returning the subtree of the partition
    fn partition(&mut self, expr: &BlockExpr, domain: Domain, depth: usize) -> Result<SplitNode> {
        let expr = simplify(expr, self.forms, &domain)?;

        let cut = if expr.num_forms() <= domain.n_dim() || depth >= self.params.max_depth {
            None
        } else {
            choose_cut(
                &expr,
                self.forms,
                &domain,
                self.params.probe_count,
                self.params.fallback_leaf_factor,
                &mut self.rng,
            )?
        };

        match cut {
            None => {
                trace!(depth, forms = expr.num_forms(), "closing block");
                self.blocks.try_reserve(1)?;
                self.blocks.push(Block { expr });
                Ok(SplitNode::Block(self.blocks.len() - 1))
            }
            Some(cut) => {
                let (lower, upper) = domain.split(cut.var, cut.threshold);
                let left = self.partition(&expr, lower, depth + 1)?;
                let right = self.partition(&expr, upper, depth + 1)?;
                Ok(SplitNode::Split {
                    var: cut.var,
                    threshold: cut.threshold,
                    left: Box::new(left),
                    right: Box::new(right),
                })
            }
        }
    }
}

/// Keeps the forms referenced by some block, renumbered in their original order
fn compact(
    forms: &[LinearForm],
    mut blocks: Vec<Block>,
) -> Result<(Vec<LinearForm>, Vec<Block>)> {
    let mut used = vec![false; forms.len()];
    for block in &blocks {
        for i in block.expr.form_indices() {
            used[i] = true;
        }
    }

    let mut map = vec![usize::MAX; forms.len()];
    let mut kept = Vec::new();
    kept.try_reserve_exact(used.iter().filter(|u| **u).count())?;
    for (i, form) in forms.iter().enumerate() {
        if used[i] {
            map[i] = kept.len();
            kept.push(form.clone());
        }
    }

    for block in &mut blocks {
        block.expr.remap_forms(&map);
    }
    Ok((kept, blocks))
}
