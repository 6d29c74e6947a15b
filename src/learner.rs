//! Online coupling-weight learning between a value parent and one of its
//! children (spec.md §4.6).
//!
//! Grounded on `original_source/.../updates/learning.py`'s
//! `learning_weights_fixed`/`learning_weights_dynamic`: both derive a
//! *prospective* posterior for the parent — as if the learner's pass ran
//! before the ordinary posterior pass, via the same precision/mean formulas
//! as [`crate::kernels::continuous::posterior_value_level`] — then propose a
//! new coupling weight `ψ* = μ_c / g(μ_p*)` (falling back to the current
//! weight when that ratio is non-finite) and blend the current weight
//! toward `ψ*` at a rate scaled by `1/|value_parents(c)|`. The two variants
//! differ only in that rate: a fixed learning rate, or (dynamic)
//! `π̂_c / (π̂_c + π̂_p)` using both endpoints' *expected* (pre-observation)
//! precision, so the blend doesn't depend on whether the parent or the
//! child happened to be processed first this step in
//! `compiler::children_before_parents_order`. A final non-finite guard
//! reverts to the previous weight before it's written.

use crate::errors::FilterResult;
use crate::graph::Edges;
use crate::kernels::{self, continuous};
use crate::store::{self, AttributeStore};
use crate::types::NodeId;

/// Selects the learning-rate policy for [`update_value_coupling`].
#[derive(Debug, Clone, Copy)]
pub enum LearningRate {
    /// A fixed step size, applied uniformly regardless of either endpoint's
    /// current certainty.
    Fixed(f64),
    /// `π̂_c / (π̂_c + π̂_p)`: larger steps when the child is relatively more
    /// certain of its own prediction than the parent, smaller steps once the
    /// parent dominates (spec.md §4.6, grounded on `learning.py`'s
    /// precision-weighted variant).
    Dynamic,
}

/// Nudges the `parent -> child` value-coupling weight toward the ratio that
/// would have explained this step's child observation exactly, then writes
/// the new weight symmetrically to both endpoints via
/// [`store::set_value_coupling`].
pub fn update_value_coupling(
    store: &mut AttributeStore,
    edges: &Edges,
    parent: NodeId,
    child: NodeId,
    rate: LearningRate,
) -> FilterResult<()> {
    let weighting = 1.0 / (edges.of(child).value_parents.len().max(1) as f64);

    let (_prospective_precision, prospective_mean) = continuous::posterior_value_level(store, edges, parent);
    let g = kernels::coupling_fn_of(edges, parent, child);
    let g_value = g.apply(prospective_mean);

    let child_mean = store.get(child).as_continuous().expect("continuous-like child").mean();
    let current_weight = current_value_coupling(store, edges, parent, child);

    let mut proposed_weight = child_mean / g_value;
    if !proposed_weight.is_finite() {
        proposed_weight = current_weight;
    }

    let blend = match rate {
        LearningRate::Fixed(lr) => lr,
        LearningRate::Dynamic => {
            let pihat_child = store.get(child).as_continuous().expect("continuous-like child").expected_precision();
            let pihat_parent = store.get(parent).as_continuous().expect("continuous-like parent").expected_precision();
            dynamic_weighting(pihat_child, pihat_parent)
        }
    };

    let mut new_weight = current_weight + (proposed_weight - current_weight) * blend * weighting;
    if !new_weight.is_finite() {
        new_weight = current_weight;
    }

    store::set_value_coupling(store, edges, parent, child, new_weight)
}

/// `π̂_c / (π̂_c + π̂_p)`.
fn dynamic_weighting(pihat_child: f64, pihat_parent: f64) -> f64 {
    pihat_child / (pihat_child + pihat_parent)
}

fn current_value_coupling(store: &AttributeStore, edges: &Edges, parent: NodeId, child: NodeId) -> f64 {
    let pos = edges
        .of(parent)
        .value_children
        .iter()
        .position(|&c| c == child)
        .expect("parent/child not linked by a value-coupling edge");
    store.coupling(parent).value_coupling_children[pos]
}
