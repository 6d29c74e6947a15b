//! Pure functions implementing prediction, prediction-error and
//! posterior-update per node kind (spec.md §2 component 4, §4.3-§4.5).
//!
//! Every kernel takes `&mut AttributeStore` plus the frozen [`Edges`] and one
//! [`NodeId`], and touches only that node's own record and (for posterior
//! kernels) reads its already-processed children's records. None of them
//! returns a `Result`: numerical pathologies propagate as `NaN` in the
//! affected fields (spec.md §4.4 "Failure policy"), never as an error.

pub mod binary;
pub mod categorical;
pub mod continuous;
pub mod ef;
pub mod volatility;

use crate::graph::Edges;
use crate::store::{AttributeStore, NodeAttributes};
use crate::types::NodeId;

/// `g_v(μ_v)` for every value parent of `node`, weighted by `ψ_v` and summed
/// — the term common to continuous-style prediction (spec.md §4.3) and to
/// binary-state's pre-squash prediction.
///
/// Link functions are attached to the *parent's* `value_children` list
/// (spec.md §3); `coupling_fn_of` resolves the function for one specific
/// parent→node edge.
pub(crate) fn value_parent_contribution(store: &AttributeStore, edges: &Edges, node: NodeId) -> f64 {
    let parents = &edges.of(node).value_parents;
    let weights = &store.coupling(node).value_coupling_parents;
    parents
        .iter()
        .zip(weights.iter())
        .map(|(&parent, &psi)| {
            let g = coupling_fn_of(edges, parent, node);
            let parent_mean = mean_of(store.get(parent));
            psi * g.apply(parent_mean)
        })
        .sum()
}

/// `Σ κ · μ_κ` over `node`'s volatility parents — the general (external)
/// volatility-coupling contribution to log-variance (spec.md §4.3).
pub(crate) fn volatility_parent_contribution(store: &AttributeStore, edges: &Edges, node: NodeId) -> f64 {
    let parents = &edges.of(node).volatility_parents;
    let weights = &store.coupling(node).volatility_coupling_parents;
    parents
        .iter()
        .zip(weights.iter())
        .map(|(&parent, &kappa)| kappa * mean_of(store.get(parent)))
        .sum()
}

pub(crate) fn coupling_fn_of(edges: &Edges, parent: NodeId, child: NodeId) -> crate::types::CouplingFn {
    let siblings = &edges.of(parent).value_children;
    let pos = siblings.iter().position(|&c| c == child);
    match pos {
        Some(i) => edges.of(parent).coupling_fn[i],
        None => crate::types::CouplingFn::Identity,
    }
}

fn mean_of(attrs: &NodeAttributes) -> f64 {
    attrs
        .as_continuous()
        .map(|b| b.mean())
        .unwrap_or(0.0)
}

/// `ν = Δt · exp(ω)`, guarded so a near-zero variance (`ν <= 1e-128`)
/// propagates as `NaN` (spec.md §4.3, grounded on
/// `prediction_error_precision_value_parent`'s `jnp.where(nu > 1e-128, nu, nan)`).
pub(crate) fn guarded_variance(time_step: f64, log_volatility: f64) -> f64 {
    let nu = time_step * log_volatility.exp();
    if nu > 1e-128 {
        nu
    } else {
        f64::NAN
    }
}
