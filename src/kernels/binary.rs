//! Prediction and posterior update for `BinaryState` and `BinaryInput`
//! nodes (spec.md §4.3-§4.4), grounded on `original_source/pyhgf/binary.py`:
//! `binary_node_update`'s sigmoid squash for the prediction, and
//! `binary_input_update`/`input_surprise_reg`/`input_surprise_inf` for the
//! posterior's likelihood-ratio fusion of the two observation categories
//! `eta0`/`eta1`, which collapses to a Dirac passthrough when the input
//! carries infinite precision.

use crate::graph::Edges;
use crate::kernels::value_parent_contribution;
use crate::math::{binary_surprise, gaussian_density, sigmoid};
use crate::store::{AttributeStore, NodeAttributes};
use crate::types::NodeId;

/// `μ̂ = sigmoid(Σ ψ_v · g_v(μ_v))`, `π̂ = 1 / (μ̂·(1-μ̂))` (spec.md §4.3).
/// A binary-state node carries no drift or volatility of its own — only its
/// value parents shape the prediction.
pub fn predict(store: &mut AttributeStore, edges: &Edges, node: NodeId) {
    let raw = value_parent_contribution(store, edges, node);
    let expected_mean = sigmoid(raw);
    let expected_precision = 1.0 / (expected_mean * (1.0 - expected_mean));

    let NodeAttributes::BinaryState(s) = store.get_mut(node) else {
        panic!("binary::predict called on non-binary-state node");
    };
    s.expected_mean = expected_mean;
    s.expected_precision = expected_precision;
}

/// Posterior update for a `BinaryState` node with a single `BinaryInput`
/// child: fuses the prediction with the observation via the `eta0`/`eta1`
/// likelihood ratio when the input carries finite precision, otherwise (an
/// infinite-precision, noiseless channel) passes the observed value through
/// directly — the Dirac passthrough case (spec.md §4.4).
pub fn posterior_from_input(store: &mut AttributeStore, node: NodeId, input: NodeId) {
    let (observed_value, input_precision, eta0, eta1) = {
        let NodeAttributes::BinaryInput(i) = store.get(input) else {
            panic!("binary::posterior_from_input needs a BinaryInput child");
        };
        (i.observed_value, i.input_precision, i.eta0, i.eta1)
    };

    let NodeAttributes::BinaryState(s) = store.get_mut(node) else {
        panic!("binary::posterior_from_input called on non-binary-state node");
    };

    if input_precision.is_finite() {
        let (mean, precision) = fuse(s.expected_mean, input_precision, observed_value, eta0, eta1);
        s.mean = mean;
        s.precision = precision;
    } else {
        s.mean = observed_value;
        s.precision = f64::INFINITY;
    }
}

/// Generic Gaussian-style posterior for a binary-state node driven by
/// ordinary (non-input) children instead: falls back to the same
/// precision-weighted aggregation used by continuous-state value parents,
/// restricted to binary-valued children (spec.md §4.4 bullet 1), for
/// composability with deeper binary stacks.
pub fn posterior_from_children(store: &mut AttributeStore, edges: &Edges, node: NodeId) {
    let (precision, mean) = crate::kernels::continuous::posterior_value_level(store, edges, node);
    let NodeAttributes::BinaryState(s) = store.get_mut(node) else {
        panic!("binary::posterior_from_children called on non-binary-state node");
    };
    s.mean = mean.clamp(0.0, 1.0);
    s.precision = precision;
}

/// Bayes fusion of the binary state's predicted probability `muhat` with a
/// finite-precision observation drawn from one of two Gaussians centred on
/// `eta0`/`eta1` (the two observation categories), per `input_surprise_reg`.
fn fuse(muhat: f64, pihat: f64, value: f64, eta0: f64, eta1: f64) -> (f64, f64) {
    let under1 = (-pihat / 2.0 * (value - eta1).powi(2)).exp();
    let under0 = (-pihat / 2.0 * (value - eta0).powi(2)).exp();
    let mean = muhat * under1 / (muhat * under1 + (1.0 - muhat) * under0);
    let precision = 1.0 / (mean * (1.0 - mean));
    (mean, precision)
}

/// Observes a `BinaryInput` leaf: copies the externally supplied value and
/// computes surprise against its value parent's prediction, either as plain
/// binary surprise (infinite-precision channel) or as the likelihood-ratio
/// surprise of observing `value` under the `eta0`/`eta1` mixture
/// (`input_surprise_inf`/`input_surprise_reg`, spec.md §4.5).
pub fn observe(store: &mut AttributeStore, edges: &Edges, node: NodeId, value: f64, time_step: f64) {
    let parent_expected_mean = edges
        .of(node)
        .value_parents
        .first()
        .map(|&p| match store.get(p) {
            NodeAttributes::BinaryState(s) => s.expected_mean,
            _ => 0.5,
        })
        .unwrap_or(0.5);

    let NodeAttributes::BinaryInput(i) = store.get_mut(node) else {
        panic!("binary::observe called on non-binary-input node");
    };
    let muhat = parent_expected_mean;
    i.surprise = if i.input_precision.is_infinite() {
        binary_surprise(value, muhat)
    } else {
        -(muhat * gaussian_density(value, i.eta1, i.input_precision)
            + (1.0 - muhat) * gaussian_density(value, i.eta0, i.input_precision))
        .ln()
    };
    i.observed_value = value;
    i.observed = true;
    i.time_step = time_step;
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::graph::{EdgeList, Edges};
    use crate::store::{BinaryState, CouplingVectors, NodeRecord};

    #[test]
    fn predict_squashes_weighted_parent_sum() {
        let parent_attrs = NodeAttributes::BinaryState(BinaryState::default());
        let mut node_edges = EdgeList::default();
        node_edges.value_parents.push(NodeId(1));
        let edges = Edges::from_vec(vec![node_edges, EdgeList::default()]);
        let mut coupling = CouplingVectors::default();
        coupling.value_coupling_parents.push(2.0);
        let mut store = AttributeStore::new(vec![
            NodeRecord { attributes: NodeAttributes::BinaryState(BinaryState::default()), coupling },
            NodeRecord { attributes: parent_attrs, coupling: CouplingVectors::default() },
        ]);
        predict(&mut store, &edges, NodeId(0));
        let NodeAttributes::BinaryState(s) = store.get(NodeId(0)) else { unreachable!() };
        assert_relative_eq!(s.expected_mean, sigmoid(0.0), epsilon = 1e-12);
    }

    #[test]
    fn finite_precision_observation_fuses_toward_observed_value() {
        let (mean, precision) = fuse(0.5, 2.0, 1.0, 0.0, 1.0);
        assert!(mean > 0.5, "mean should lean toward eta1 since value == eta1, got {mean}");
        assert!(precision.is_finite() && precision > 4.0);
    }

    #[test]
    fn infinite_precision_observation_is_a_dirac_passthrough() {
        let mut store = AttributeStore::new(vec![NodeRecord {
            attributes: NodeAttributes::BinaryState(BinaryState { expected_mean: 0.5, expected_precision: 4.0, ..Default::default() }),
            coupling: CouplingVectors::default(),
        }, NodeRecord {
            attributes: NodeAttributes::BinaryInput(crate::store::BinaryInput {
                observed_value: 1.0,
                input_precision: f64::INFINITY,
                ..Default::default()
            }),
            coupling: CouplingVectors::default(),
        }]);
        posterior_from_input(&mut store, NodeId(0), NodeId(1));
        let NodeAttributes::BinaryState(s) = store.get(NodeId(0)) else { unreachable!() };
        assert_eq!(s.mean, 1.0);
        assert!(s.precision.is_infinite());
    }
}
