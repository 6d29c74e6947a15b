//! Aggregation kernel for `CategoricalInput` nodes: a Dirichlet surprise
//! aggregator over a bank of `BinaryState` value parents, one per category
//! (spec.md §3, §4.4).
//!
//! Grounded on `original_source/src/pyhgf/updates/categorical.py`'s
//! `categorical_input_update`, with one simplification recorded in
//! DESIGN.md: the predicted category probabilities are read from each value
//! parent's `expected_mean` directly, one level up from
//! `categorical_input_update`'s own two-level indirection through a
//! continuous grandparent's squashed `muhat`. The concentration-update rule
//! itself — `ν = pe/Δξ − 1`, `α = ν·ξ + 1` (NaN → 1), re-derived every step
//! from the previous step's prediction error and the change in predicted
//! probability — is implemented as specified, not approximated by counting.

use crate::graph::Edges;
use crate::math::{binary_surprise, dirichlet_kullback_leibler};
use crate::store::{AttributeStore, NodeAttributes};
use crate::types::NodeId;

/// Aggregates this step's categorical observation: reads each value
/// parent's predicted probability, re-derives the Dirichlet concentration
/// parameters from the previous step's prediction error, and records the
/// new prediction error, Dirichlet KL-divergence surprise, and summed
/// binary surprise of the observed categories.
pub fn aggregate(store: &mut AttributeStore, edges: &Edges, node: NodeId, observed_category: Option<&[f64]>) {
    let parents = edges.of(node).value_parents.clone();
    let new_xi: Vec<f64> = parents
        .iter()
        .map(|&p| match store.get(p) {
            NodeAttributes::BinaryState(s) => s.expected_mean,
            _ => 0.0,
        })
        .collect();

    let NodeAttributes::CategoricalInput(c) = store.get_mut(node) else {
        panic!("categorical::aggregate called on non-categorical node");
    };

    if let Some(value) = observed_category {
        debug_assert_eq!(value.len(), new_xi.len());

        let prior_alpha = c.alpha.clone();
        let mut alpha: Vec<f64> = new_xi
            .iter()
            .zip(c.xi.iter())
            .zip(c.pe.iter())
            .map(|((&xi_k, &prev_xi_k), &prev_pe_k)| {
                let delta_xi = xi_k - prev_xi_k;
                let nu = prev_pe_k / delta_xi - 1.0;
                let a = nu * xi_k + 1.0;
                if a.is_nan() {
                    1.0
                } else {
                    a
                }
            })
            .collect();

        c.value = value.to_vec();
        c.pe = value.iter().zip(new_xi.iter()).map(|(&x, &xi_k)| x - xi_k).collect();
        c.xi = new_xi;

        c.kl_divergence = dirichlet_kullback_leibler(&prior_alpha, &alpha);
        c.binary_surprise = value.iter().zip(c.xi.iter()).map(|(&x, &mu_hat)| binary_surprise(x, mu_hat)).sum();

        std::mem::swap(&mut c.alpha, &mut alpha);
    }

    let sum_alpha: f64 = c.alpha.iter().sum();
    c.mean = c.alpha.iter().map(|&a| a / sum_alpha).collect();
}
