//! Simplification of a block expression inside a box
//!
//! Each pass rebuilds the expression bottom-up: nested operators of the same kind are merged,
//! operands dominated by a sibling are dropped, and operators left with a single operand are
//! replaced by it. Passes repeat until nothing is dropped.
//!
//! Under smoothing the blend of nested pairs differs from the blend of a merged operator, so
//! operators are only merged when the box is sharp.
use super::bounds::{Bounds, Domain};
use super::{BlockExpr, LinearForm};
use crate::error::{AlnError, Result};
use crate::model::MinMaxOp;

/// Simplified copy of `expr`, valid inside `domain`
pub(crate) fn simplify(
    expr: &BlockExpr,
    forms: &[LinearForm],
    domain: &Domain,
) -> Result<BlockExpr> {
    let merge = |expr: BlockExpr| {
        if domain.fillet.is_sharp() {
            flatten(expr)
        } else {
            expr
        }
    };

    let mut expr = merge(expr.clone());
    loop {
        let (pruned, _, removed) = prune(&expr, forms, domain)?;
        expr = merge(pruned);
        if removed == 0 {
            return Ok(expr);
        }
    }
}

/// Merges nested operators of the same kind and unwraps single operands
fn flatten(expr: BlockExpr) -> BlockExpr {
    let (op, children) = match expr {
        BlockExpr::Form(i) => return BlockExpr::Form(i),
        BlockExpr::Min(children) => (MinMaxOp::Min, children),
        BlockExpr::Max(children) => (MinMaxOp::Max, children),
    };

    let mut merged = Vec::with_capacity(children.len());
    for child in children {
        match flatten(child) {
            BlockExpr::Min(grand) if op == MinMaxOp::Min => merged.extend(grand),
            BlockExpr::Max(grand) if op == MinMaxOp::Max => merged.extend(grand),
            other => merged.push(other),
        }
    }

    if merged.len() == 1 {
        merged.remove(0)
    } else {
        BlockExpr::from_op(op, merged)
    }
}

/// Drops dominated operands, returning the new expression, its bounds and the number of
/// operands dropped
fn prune(
    expr: &BlockExpr,
    forms: &[LinearForm],
    domain: &Domain,
) -> Result<(BlockExpr, Bounds, usize)> {
    let (op, children) = match expr {
        BlockExpr::Form(i) => {
            return Ok((BlockExpr::Form(*i), Bounds::of_form(&forms[*i], domain), 0));
        }
        BlockExpr::Min(children) => (MinMaxOp::Min, children),
        BlockExpr::Max(children) => (MinMaxOp::Max, children),
    };

    let mut operands = Vec::new();
    operands
        .try_reserve_exact(children.len())
        .map_err(|_| AlnError::OutOfMemory("expression bounds"))?;
    let mut removed = 0;
    for child in children {
        let (child, bounds, dropped) = prune(child, forms, domain)?;
        removed += dropped;
        operands.push((child, bounds));
    }

    let mut alive = vec![true; operands.len()];
    for j in 0..operands.len() {
        let dominated = (0..operands.len())
            .any(|k| k != j && alive[k] && operands[k].1.dominates(&operands[j].1, op, domain));
        if dominated {
            alive[j] = false;
            removed += 1;
        }
    }

    let mut survivors = operands
        .into_iter()
        .zip(alive)
        .filter_map(|(operand, alive)| if alive { Some(operand) } else { None });
    // the last operand standing is never dominated by a dropped one
    let (first, mut bounds) = survivors.next().ok_or_else(|| {
        AlnError::MalformedModel("min/max expression without operands".to_string())
    })?;
    let mut exprs = vec![first];
    for (child, child_bounds) in survivors {
        bounds = Bounds::combine(op, &bounds, &child_bounds, domain);
        exprs.push(child);
    }

    let expr = if exprs.len() == 1 {
        exprs.remove(0)
    } else {
        BlockExpr::from_op(op, exprs)
    };
    Ok((expr, bounds, removed))
}
