//! Prediction and posterior update for `VolatileState` nodes: a value level
//! (delegated to [`crate::kernels::continuous`]) plus an implicit,
//! zero-drift volatility level (spec.md §3, §4.3-§4.4).
//!
//! The three posterior variants ([`UpdateVariant`]) differ only in how a
//! volatility-parent's mean and precision are resolved from a volatility
//! child's prediction error — used both for a `VolatileState` node's own
//! implicit volatility level (its value level is always its own volatility
//! child) and, via [`posterior_from_volatility_children`], for any
//! continuous-like node that is an explicit volatility parent of other
//! nodes. The value-level posterior itself is identical across variants and
//! reuses `continuous::posterior_value_level`.

use crate::kernels::continuous;
use crate::kernels::{guarded_variance, volatility_parent_contribution};
use crate::graph::Edges;
use crate::math::{clip_exp_arg, sigmoid, smoothed_rectangular, TWO_PLUS_SQRT3};
use crate::store::{AttributeStore, NodeAttributes};
use crate::types::NodeId;

/// Value level prediction (shared with `ContinuousState`) plus the implicit
/// volatility level's own zero-drift prediction.
pub fn predict(store: &mut AttributeStore, edges: &Edges, node: NodeId, dt: f64) {
    continuous::predict(store, edges, node, dt);

    let (mean_vol, precision_vol, tonic_volatility_vol) = {
        let NodeAttributes::VolatileState(s) = store.get(node) else {
            panic!("volatility::predict called on non-volatile node");
        };
        (s.mean_vol, s.precision_vol, s.tonic_volatility_vol)
    };

    let log_vol = tonic_volatility_vol + volatility_parent_contribution(store, edges, node);
    let nu_vol = guarded_variance(dt, log_vol);
    let expected_precision_vol = 1.0 / (1.0 / precision_vol + nu_vol);

    let NodeAttributes::VolatileState(s) = store.get_mut(node) else {
        unreachable!();
    };
    s.expected_mean_vol = mean_vol;
    s.expected_precision_vol = expected_precision_vol;
}

struct VolatilityInputs {
    vape: f64,
    pihat: f64,
    nu: f64,
    kappa: f64,
    pihat_vol: f64,
    muhat_vol: f64,
    tonic_volatility: f64,
}

/// `(1/π̂) · (π̂·vape² - 1)`, the normalised (chi-square-1-like) volatility
/// prediction error common to all three variants.
fn vope(i: &VolatilityInputs) -> f64 {
    (1.0 / i.pihat) * (i.pihat * i.vape * i.vape - 1.0)
}

fn precision_second_order_term(i: &VolatilityInputs) -> f64 {
    let w = i.kappa * i.nu * i.pihat;
    0.5 * w * w * (1.0 + (1.0 - 1.0 / (i.nu * i.pihat)) * (i.pihat * i.vape * i.vape - 1.0))
}

fn standard(i: &VolatilityInputs) -> (f64, f64) {
    let precision_vol = i.pihat_vol + precision_second_order_term(i);
    let w = i.kappa * i.nu * i.pihat;
    let mean_vol = i.muhat_vol + 0.5 * (w / precision_vol) * vope(i);
    (mean_vol, precision_vol)
}

fn ehgf(i: &VolatilityInputs) -> (f64, f64) {
    let w = i.kappa * i.nu * i.pihat;
    let mean_vol = i.muhat_vol + 0.5 * (w / i.pihat_vol) * vope(i);
    let precision_vol = i.pihat_vol + precision_second_order_term(i);
    (mean_vol, precision_vol)
}

/// Blends two quadratic approximations of the volatility level's posterior,
/// L1 (around the current linearisation) and L2 (around
/// `φ = log(σ²_c·(2+√3))`), by a smoothed-rectangular weight over the
/// volatility level's own expected mean `m̂_v` (spec.md §4.4).
fn unbounded(i: &VolatilityInputs) -> (f64, f64) {
    let nu = i.nu.max(1e-128);
    let vape_sq = i.vape * i.vape;

    // L1: quadratic approximation around the current linearisation.
    let x = i.kappa * i.muhat_vol + i.tonic_volatility;
    let w_child = sigmoid(x - nu.ln());
    let delta_child = (1.0 / i.pihat + vape_sq) / (nu + clip_exp_arg(x).exp()) - 1.0;
    let pi_l1 = i.pihat_vol + 0.5 * i.kappa * i.kappa * w_child * (1.0 - w_child);
    let mu_l1 = i.muhat_vol + (i.kappa * w_child / (2.0 * pi_l1)) * delta_child;

    // L2: quadratic approximation around `φ = log(σ²_c·(2+√3))`.
    let phi = (nu * TWO_PLUS_SQRT3).ln();
    let exp_term = clip_exp_arg(i.kappa * phi + i.tonic_volatility).exp();
    let w_phi = exp_term / (nu + exp_term);
    let delta_phi = (1.0 / i.pihat + vape_sq) / (nu + exp_term) - 1.0;
    let pi_l2 = i.pihat_vol + 0.5 * i.kappa * i.kappa * w_phi * (w_phi + (2.0 * w_phi - 1.0) * delta_phi);
    let mu_hat_phi = ((2.0 * pi_l2 - 1.0) * phi + i.muhat_vol) / (2.0 * pi_l2);
    let mu_l2 = mu_hat_phi + (i.kappa * w_phi / (2.0 * pi_l2)) * delta_phi;

    let theta_l = (1.2 * (1.0 / i.pihat + vape_sq) / (nu * pi_l1)).sqrt();
    let weighting = smoothed_rectangular(i.muhat_vol, theta_l, 8.0, 0.0, 1.0);

    let precision_vol = (1.0 - weighting) * pi_l1 + weighting * pi_l2;
    let mean_vol = (1.0 - weighting) * mu_l1 + weighting * mu_l2;
    (mean_vol, precision_vol)
}

/// Folds each of `node`'s volatility children's prediction error back into
/// `node`'s own `(precision, mean)`, symmetric to how
/// `continuous::posterior_value_level` folds value children: every child
/// contributes through the same `standard`/`ehgf`/`unbounded` quadratic
/// approximation used for a node's own implicit volatility level, since the
/// parent's mean here plays the role of a log-variance rather than a
/// location parameter (spec.md §4.4). Multiple children fold sequentially,
/// each one's resulting `(precision, mean)` becoming the next child's
/// baseline — this crate's documented choice for a topology the retained
/// corpus slice does not cover with more than one volatility child (see
/// DESIGN.md).
pub(crate) fn posterior_from_volatility_children(
    store: &AttributeStore,
    edges: &Edges,
    node: NodeId,
    precision: f64,
    mean: f64,
    variant: Variant,
) -> (f64, f64) {
    let tonic_volatility = tonic_volatility_of(store.get(node));
    let children = &edges.of(node).volatility_children;
    let weights = &store.coupling(node).volatility_coupling_children;

    let mut precision = precision;
    let mut mean = mean;
    for (&child, &kappa) in children.iter().zip(weights.iter()) {
        let Some(child_belief) = store.get(child).as_continuous() else {
            continue;
        };
        let inputs = VolatilityInputs {
            vape: child_belief.mean() - child_belief.expected_mean(),
            pihat: child_belief.expected_precision(),
            nu: current_variance_of(store.get(child)),
            kappa,
            pihat_vol: precision,
            muhat_vol: mean,
            tonic_volatility,
        };
        let (mean_i, precision_i) = match variant {
            Variant::Standard => standard(&inputs),
            Variant::EHgf => ehgf(&inputs),
            Variant::Unbounded => unbounded(&inputs),
        };
        precision = precision_i;
        mean = mean_i;
    }
    (precision, mean)
}

fn tonic_volatility_of(attrs: &NodeAttributes) -> f64 {
    match attrs {
        NodeAttributes::ContinuousState(s) => s.tonic_volatility,
        NodeAttributes::VolatileState(s) => s.tonic_volatility,
        _ => 0.0,
    }
}

fn current_variance_of(attrs: &NodeAttributes) -> f64 {
    match attrs {
        NodeAttributes::ContinuousState(s) => s.current_variance,
        NodeAttributes::VolatileState(s) => s.current_variance,
        _ => 0.0,
    }
}

/// Posterior update for a `VolatileState` node: updates the value level via
/// [`continuous::posterior_value_level`] (plus any external volatility
/// children of the value level itself), then resolves the implicit
/// volatility level using the variant-specific blend
/// (`standard`/`ehgf`/`unbounded`).
pub fn posterior(store: &mut AttributeStore, edges: &Edges, node: NodeId, variant: Variant) {
    let (mut precision, mut mean) = continuous::posterior_value_level(store, edges, node);
    if !edges.of(node).volatility_children.is_empty() {
        (precision, mean) = posterior_from_volatility_children(store, edges, node, precision, mean, variant);
    }

    let NodeAttributes::VolatileState(s) = store.get_mut(node) else {
        panic!("volatility::posterior called on non-volatile node");
    };
    s.precision = precision;
    s.mean = mean;
    let vape = mean - s.expected_mean;

    let inputs = VolatilityInputs {
        vape,
        pihat: precision,
        nu: s.current_variance,
        kappa: s.volatility_coupling_internal,
        pihat_vol: s.expected_precision_vol,
        muhat_vol: s.expected_mean_vol,
        tonic_volatility: s.tonic_volatility,
    };

    let (mean_vol, precision_vol) = match variant {
        Variant::Standard => standard(&inputs),
        Variant::EHgf => ehgf(&inputs),
        Variant::Unbounded => unbounded(&inputs),
    };

    let NodeAttributes::VolatileState(s) = store.get_mut(node) else {
        unreachable!();
    };
    s.mean_vol = mean_vol;
    s.precision_vol = precision_vol;
}

/// Re-exported locally to avoid a dependency cycle on `crate::types` at the
/// call sites in `driver.rs`, which already imports `UpdateVariant` anyway —
/// kept as a type alias so the posterior function signature reads naturally.
pub type Variant = crate::types::UpdateVariant;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{EdgeList, Edges};
    use crate::store::{NodeRecord, VolatileState};

    fn node(mean: f64, precision: f64, mean_vol: f64, precision_vol: f64, kappa: f64) -> (AttributeStore, Edges) {
        let attrs = NodeAttributes::VolatileState(VolatileState {
            mean,
            precision,
            mean_vol,
            precision_vol,
            volatility_coupling_internal: kappa,
            tonic_volatility_vol: 0.0,
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
    fn predict_then_posterior_keeps_precisions_finite_with_no_surprise() {
        let (mut store, edges) = node(0.0, 1.0, 0.0, 1.0, 1.0);
        predict(&mut store, &edges, NodeId(0), 1.0);
        posterior(&mut store, &edges, NodeId(0), Variant::Standard);
        let NodeAttributes::VolatileState(s) = store.get(NodeId(0)) else { unreachable!() };
        assert!(s.precision.is_finite());
        assert!(s.precision_vol.is_finite());
    }

    #[test]
    fn all_three_variants_run_without_panicking() {
        for variant in [Variant::Standard, Variant::EHgf, Variant::Unbounded] {
            let (mut store, edges) = node(0.2, 1.0, 0.0, 1.0, 1.0);
            predict(&mut store, &edges, NodeId(0), 1.0);
            posterior(&mut store, &edges, NodeId(0), variant);
        }
    }
}
