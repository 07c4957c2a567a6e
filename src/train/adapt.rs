//! Credit assignment and the update of a single piece
use ndarray::ArrayView1;

use crate::eval::EvalTrace;
use crate::model::{Aln, MinMaxOp, NodeId, NodeKind};

/// Whether a pass over the samples changes the pieces or only measures them
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Pass {
    Learn,
    Measure,
}

/// Settings of one adaptation step
#[derive(Clone, Copy, Debug)]
pub(crate) struct Step<'a> {
    pub(crate) x: ArrayView1<'a, f64>,
    pub(crate) learn_rate: f64,
    pub(crate) starvation_ratio: f64,
    pub(crate) pass: Pass,
}

impl Aln {
    /// Distributes `responsibility` for the error of the sample in `step` over the subtree
    /// rooted at `id`, using the active children recorded in `trace`.
    pub(crate) fn adapt(
        &mut self,
        id: NodeId,
        responsibility: f64,
        error: f64,
        step: &Step,
        trace: &EvalTrace,
    ) {
        let recorded = *trace.get(id);
        {
            let node = self.node_mut(id);
            node.distance = recorded.value;
            if step.pass == Pass::Learn {
                node.hits += 1;
            }
        }

        let (op, children) = match &self.node(id).kind {
            NodeKind::Leaf(_) => return self.adapt_leaf(id, responsibility, error, step),
            NodeKind::MinMax(mm) => (mm.op, mm.children),
        };

        let active = recorded.active;
        let inactive = 1 - active;
        let mut shares = [0.0; 2];
        shares[active] = recorded.response;
        shares[inactive] = 1.0 - recorded.response;
        let mut errors = [error; 2];

        if step.pass == Pass::Learn
            && shares[inactive] == 0.0
            && self.inactive_can_fix(op, error)
            && self.is_starving(children[inactive], children[active], step.starvation_ratio)
        {
            shares[inactive] = 1.0;
            errors[inactive] = trace.get(children[inactive]).value;
        }

        for k in 0..2 {
            if shares[k] > 0.0 {
                self.adapt(children[k], responsibility * shares[k], errors[k], step, trace);
            }
        }
    }

    /// A MAX can only lift the surface through its inactive child, a MIN only lower it
    fn inactive_can_fix(&self, op: MinMaxOp, error: f64) -> bool {
        let epsilon = self.region.constraint(self.output).epsilon();
        match op {
            MinMaxOp::Max => error < -epsilon,
            MinMaxOp::Min => error > epsilon,
        }
    }

    fn is_starving(&self, inactive: NodeId, active: NodeId, ratio: f64) -> bool {
        let seen = |id: NodeId| {
            let node = self.node(id);
            (node.hits + node.prev_hits) as f64
        };
        seen(inactive) * ratio < seen(active)
    }

    /// Moves a piece towards the sample.
    ///
    /// The update is normalized such that the value of the piece at the sample moves by
    /// `rate * error` before weight clamping, `rate` being the responsibility weighted
    /// learning rate. Afterwards the centroid follows the sample along the plane.
    ///
    /// Centroid and deviations are running means over the samples the piece saw during the
    /// current and the previous epoch, never moving faster than `rate`.
    fn adapt_leaf(&mut self, id: NodeId, responsibility: f64, error: f64, step: &Step) {
        let output = self.output;
        let n_inputs = (self.n_dim - 1) as f64;
        let Aln { region, nodes, .. } = self;
        let rate = (step.learn_rate * region.learn_factor() * responsibility).min(1.0);

        let node = &mut nodes[id.index()];
        let seen = (node.hits + node.prev_hits).max(1) as f64;
        let mean_rate = rate.min(responsibility / seen);

        let lfn = match &mut node.kind {
            NodeKind::Leaf(lfn) if lfn.initialized => lfn,
            _ => return,
        };
        let x = &step.x;

        let mut spread = 0.0;
        for (i, (&c, &d)) in lfn.c.iter().zip(lfn.d.iter()).enumerate() {
            if i != output {
                let dx = x[i] - c;
                spread += dx * dx / d;
            }
        }

        if let Some(stats) = &mut lfn.split {
            stats.hits += 1;
            stats.sq_error += responsibility * error * error;
            stats.response += responsibility;
            // far from the centroid a convex shape leaves samples above the piece, near it below
            let evidence = if spread / n_inputs > 1.0 { -error } else { error };
            stats.convexity += responsibility * evidence;
        }

        if step.pass == Pass::Measure || lfn.frozen {
            return;
        }

        let step_size = rate * error / (1.0 + spread);
        lfn.c[output] -= step_size;
        for i in (0..lfn.c.len()).filter(|&i| i != output) {
            let dx = x[i] - lfn.c[i];
            let w = lfn.w[i + 1] - step_size * dx / lfn.d[i];
            lfn.w[i + 1] = region.constraint(i).clamp_weight(w);

            let shift = mean_rate * dx;
            lfn.c[i] += shift;
            lfn.c[output] += lfn.w[i + 1] * shift;
            lfn.d[i] = f64::max(
                region.constraint(i).epsilon_sq(),
                lfn.d[i] + mean_rate * (dx * dx - lfn.d[i]),
            );
        }
        lfn.d[output] = f64::max(
            region.constraint(output).epsilon_sq(),
            lfn.d[output] + mean_rate * (error * error - lfn.d[output]),
        );
        lfn.update_bias(output);
    }
}
