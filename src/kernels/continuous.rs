//! Continuous-node prediction and the generic value-parent posterior
//! (spec.md §4.3, §4.4). Shared by `ContinuousState`, the value level of
//! `VolatileState` (via [`crate::kernels::volatility`]), and, for the
//! posterior side, any node with a Gaussian-like child.
//!
//! Grounded on `prediction_error/precision_value_parent` /
//! `prediction_error_mean_value_parent` (`original_source/.../binary.py`)
//! for the per-child-kind branching, and on spec.md §4.4's generic formula
//! for non-binary children.

use crate::graph::Edges;
use crate::kernels::{guarded_variance, value_parent_contribution, volatility_parent_contribution};
use crate::store::{AttributeStore, NodeAttributes};
use crate::types::NodeId;

/// Sets `expected_mean`, `expected_precision` and `current_variance` from
/// the node's own prior state and its parents' previous posterior
/// (spec.md §4.3, first two bullets).
pub fn predict(store: &mut AttributeStore, edges: &Edges, node: NodeId, dt: f64) {
    let (mean, precision) = {
        let belief = store.get(node).as_continuous().expect("continuous-like node");
        (belief.mean(), belief.precision())
    };
    let tonic_drift = tonic_drift_of(store.get(node));
    let tonic_volatility = tonic_volatility_of(store.get(node));

    let expected_mean = mean + dt * (tonic_drift + value_parent_contribution(store, edges, node));
    let log_vol = tonic_volatility + volatility_parent_contribution(store, edges, node);
    let nu = guarded_variance(dt, log_vol);
    let expected_precision = 1.0 / (1.0 / precision + nu);

    let belief = store.get_mut(node).as_continuous_mut().expect("continuous-like node");
    belief.set_expected_mean(expected_mean);
    belief.set_expected_precision(expected_precision);
    set_current_variance(store.get_mut(node), nu);
}

fn tonic_drift_of(attrs: &NodeAttributes) -> f64 {
    match attrs {
        NodeAttributes::ContinuousState(s) => s.tonic_drift,
        NodeAttributes::VolatileState(s) => s.tonic_drift,
        _ => 0.0,
    }
}

fn tonic_volatility_of(attrs: &NodeAttributes) -> f64 {
    match attrs {
        NodeAttributes::ContinuousState(s) => s.tonic_volatility,
        NodeAttributes::VolatileState(s) => s.tonic_volatility,
        _ => 0.0,
    }
}

fn set_current_variance(attrs: &mut NodeAttributes, nu: f64) {
    match attrs {
        NodeAttributes::ContinuousState(s) => s.current_variance = nu,
        NodeAttributes::VolatileState(s) => s.current_variance = nu,
        _ => {}
    }
}

/// The generic value-parent posterior (spec.md §4.4): aggregates each
/// child's prediction error, branching on the child's kind since binary
/// children contribute through a different weighting
/// (`prediction_error_precision_value_parent`/`_mean_value_parent`, which
/// use `ψ/π̂_c` and unweighted `vape` rather than `ψ²π̂_c` and `ψ·π̂_c·vape`).
///
/// Returns `(precision, mean)` rather than writing them directly so
/// [`crate::kernels::volatility`] can call it as the first half of a
/// volatile node's own posterior before touching the implicit volatility
/// level.
pub fn posterior_value_level(store: &AttributeStore, edges: &Edges, node: NodeId) -> (f64, f64) {
    let belief = store.get(node).as_continuous().expect("continuous-like node");
    let expected_mean = belief.expected_mean();
    let expected_precision = belief.expected_precision();

    let children = &edges.of(node).value_children;
    let weights = &store.coupling(node).value_coupling_children;

    let mut precision_sum = 0.0;
    let mut mean_sum = 0.0;

    for (&child, &psi) in children.iter().zip(weights.iter()) {
        let child_attrs = store.get(child);
        let is_binary = matches!(child_attrs, NodeAttributes::BinaryState(_));
        let child_belief = child_attrs.as_continuous();
        let Some(child_belief) = child_belief else {
            continue;
        };
        let vape = child_belief.mean() - child_belief.expected_mean();
        let pihat_c = child_belief.expected_precision();

        if is_binary {
            precision_sum += psi * (1.0 / pihat_c);
            mean_sum += psi * vape;
        } else {
            precision_sum += psi * psi * pihat_c;
            mean_sum += psi * pihat_c * vape;
        }
    }

    let precision = expected_precision + precision_sum;
    let mean = expected_mean + (1.0 / precision) * mean_sum;
    (precision, mean)
}

/// Posterior update for a plain `ContinuousState` node (no implicit
/// volatility level): writes [`posterior_value_level`]'s result, then, if
/// this node is itself a volatility parent of other nodes, folds each
/// volatility child's prediction error back in via
/// [`crate::kernels::volatility::posterior_from_volatility_children`] —
/// symmetric to how a `VolatileState` node's own implicit volatility level
/// absorbs its value level's prediction error.
pub fn posterior(store: &mut AttributeStore, edges: &Edges, node: NodeId, variant: crate::types::UpdateVariant) {
    let (mut precision, mut mean) = posterior_value_level(store, edges, node);
    if !edges.of(node).volatility_children.is_empty() {
        (precision, mean) = crate::kernels::volatility::posterior_from_volatility_children(
            store, edges, node, precision, mean, variant,
        );
    }
    let belief = store.get_mut(node).as_continuous_mut().expect("continuous-like node");
    belief.set_precision(precision);
    belief.set_mean(mean);
}

/// Observes a `ContinuousInput` leaf: records the externally supplied value
/// against its value parent's prediction and computes Gaussian surprise
/// (spec.md §4.5).
pub fn observe(store: &mut AttributeStore, edges: &Edges, node: NodeId, value: f64, time_step: f64) {
    let parent = edges.of(node).value_parents.first().copied();
    let (parent_mean, parent_precision) = parent
        .map(|p| {
            let belief = store.get(p).as_continuous().expect("continuous-like value parent");
            (belief.expected_mean(), belief.expected_precision())
        })
        .unwrap_or((0.0, 1.0));

    let NodeAttributes::ContinuousInput(i) = store.get_mut(node) else {
        panic!("continuous::observe called on non-continuous-input node");
    };
    let total_precision = 1.0 / (1.0 / parent_precision + 1.0 / i.input_precision);
    i.observed_value = value;
    i.observed = true;
    i.time_step = time_step;
    i.surprise = -crate::math::gaussian_density(value, parent_mean, total_precision).ln();
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::graph::{EdgeList, Edges};
    use crate::store::{ContinuousState, NodeRecord};

    fn single_node_store(mean: f64, precision: f64, drift: f64, omega: f64) -> (AttributeStore, Edges) {
        let attrs = NodeAttributes::ContinuousState(ContinuousState {
            mean,
            precision,
            tonic_drift: drift,
            tonic_volatility: omega,
            ..Default::default()
        });
        let store = AttributeStore::new(vec![NodeRecord {
            attributes: attrs,
            coupling: Default::default(),
        }]);
        let edges = Edges::from_vec(vec![EdgeList::default()]);
        (store, edges)
    }

    #[test]
    fn predict_with_no_parents_uses_own_drift_and_volatility() {
        let (mut store, edges) = single_node_store(1.0, 2.0, 0.5, 0.0);
        predict(&mut store, &edges, NodeId(0), 1.0);
        let belief = store.get(NodeId(0)).as_continuous().unwrap();
        assert_relative_eq!(belief.expected_mean(), 1.5, epsilon = 1e-12);
        assert!(belief.expected_precision() > 0.0);
    }

    #[test]
    fn predict_guards_degenerate_variance() {
        let (mut store, edges) = single_node_store(0.0, 1.0, 0.0, -1000.0);
        predict(&mut store, &edges, NodeId(0), 1.0);
        let belief = store.get(NodeId(0)).as_continuous().unwrap();
        assert!(belief.expected_precision().is_nan());
    }
}
