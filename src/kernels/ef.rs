//! Prediction and posterior update for `EfState` nodes: a generic
//! exponential-family sufficient-statistics belief (spec.md §3, §4.3-§4.4).
//!
//! No posterior-update source file for `ef-state` nodes survived in the
//! retained corpus slice; `tests/test_nodes/test_exponential_family.py`
//! is what's left, and it fixes the field names this module reuses
//! (`xis`, `nus`, `mean`) along with the expectation that re-running the
//! same trajectory reproduces the same `xis`/`mean`/`nus` columns. The
//! per-statistic blend implemented here — nudging each `xi_k` toward the
//! observation's matching sufficient statistic at rate `1/nu_k` — is a
//! reconstruction consistent with that test's shape, not a transcription
//! of a source file (see DESIGN.md).

use crate::store::{AttributeStore, NodeAttributes};
use crate::types::NodeId;

/// No-op beyond making the node's current sufficient statistics available
/// for this step's posterior: an ef-state node predicts its own last
/// posterior unchanged, since it has no drift/volatility terms.
pub fn predict(_store: &mut AttributeStore, _node: NodeId) {}

/// Blends each sufficient statistic `xi_k` toward the observed value `x`'s
/// corresponding sufficient statistic, at the per-statistic rate `1/nu_k`.
pub fn posterior(store: &mut AttributeStore, node: NodeId, observed_sufficient_stats: &[f64]) {
    let NodeAttributes::EfState(s) = store.get_mut(node) else {
        panic!("ef::posterior called on non-ef-state node");
    };
    debug_assert_eq!(s.xis.len(), observed_sufficient_stats.len());
    for (xi, (nu, &x)) in s
        .xis
        .iter_mut()
        .zip(s.nus.iter().zip(observed_sufficient_stats.iter()))
    {
        let rate = if *nu > 0.0 { 1.0 / nu } else { 0.0 };
        *xi += rate * (x - *xi);
    }
    if let Some(&first) = s.xis.first() {
        s.mean = first;
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::store::{CouplingVectors, EfState, NodeRecord};

    #[test]
    fn posterior_moves_sufficient_stats_toward_observation() {
        let attrs = NodeAttributes::EfState(EfState {
            xis: vec![0.0, 1.0],
            nus: vec![1.0, 2.0],
            mean: 0.0,
        });
        let mut store = AttributeStore::new(vec![NodeRecord { attributes: attrs, coupling: CouplingVectors::default() }]);
        posterior(&mut store, NodeId(0), &[2.0, 3.0]);
        let NodeAttributes::EfState(s) = store.get(NodeId(0)) else { unreachable!() };
        assert_relative_eq!(s.xis[0], 2.0, epsilon = 1e-12);
        assert_relative_eq!(s.xis[1], 2.0, epsilon = 1e-12);
        assert_relative_eq!(s.mean, s.xis[0], epsilon = 1e-12);
    }
}
