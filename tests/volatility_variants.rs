//! Exercises all three posterior-update variants over the same volatile
//! hierarchy and checks they each remain numerically well-behaved under a
//! stream of ordinary observations, and that a `VolatileState` node's
//! implicit volatility level agrees with an explicit construction of the
//! same topology out of two plain `ContinuousState` nodes.

use predictive_filter::driver::{step, StepInputs};
use predictive_filter::graph::{Graph, InitialAttrs, ValueLink, VolatilityLink};
use predictive_filter::store::NodeAttributes;
use predictive_filter::types::{NodeKind, UpdateVariant};

const OBSERVATIONS: [f64; 10] = [0.0, 0.2, -0.1, 0.4, 0.1, -0.3, 0.5, 0.0, 0.2, -0.2];

fn run_variant(variant: UpdateVariant) -> (f64, f64, f64, f64) {
    let mut g = Graph::new().with_update_variant(variant);

    let volatility_parent = g.add_nodes(
        NodeKind::VolatileState,
        1,
        &[],
        &[],
        &[],
        &[],
        InitialAttrs {
            precision: 1.0,
            tonic_volatility: -2.0,
            ..Default::default()
        },
    )[0];

    let value_node = g.add_nodes(
        NodeKind::VolatileState,
        1,
        &[],
        &[],
        &[],
        &[VolatilityLink::new(volatility_parent, 1.0)],
        InitialAttrs {
            precision: 1.0,
            tonic_volatility: -3.0,
            volatility_coupling_internal: 1.0,
            ..Default::default()
        },
    )[0];

    let input = g.add_nodes(
        NodeKind::ContinuousInput,
        1,
        &[],
        &[],
        &[ValueLink::new(value_node, 1.0)],
        &[],
        InitialAttrs {
            input_precision: 5.0,
            ..Default::default()
        },
    )[0];

    let mut graph = g.freeze().expect("valid topology");
    for (t, &value) in OBSERVATIONS.iter().enumerate() {
        let inputs = StepInputs::new().with_value(input, value);
        step(&mut graph, &inputs, 1.0, t as u64, 11).expect("step succeeds");
    }

    assert!(!graph.store().has_any_nan(), "{variant:?} diverged to NaN");

    let belief = graph.store().get(value_node).as_continuous().unwrap();
    let (mean_vol, precision_vol) = match graph.store().get(value_node) {
        NodeAttributes::VolatileState(s) => (s.mean_vol, s.precision_vol),
        _ => unreachable!(),
    };
    (belief.mean(), belief.precision(), mean_vol, precision_vol)
}

/// The same topology as [`run_variant`] but with the volatility parent built
/// as a separate, plain `ContinuousState` node rather than folded into the
/// value node's implicit volatility level — mirrors
/// `original_source/tests/test_nodes/test_volatile.py`'s
/// `_assert_vol_level_match` construction.
fn run_explicit(variant: UpdateVariant) -> (f64, f64, f64, f64) {
    let mut g = Graph::new().with_update_variant(variant);

    let volatility_parent = g.add_nodes(
        NodeKind::ContinuousState,
        1,
        &[],
        &[],
        &[],
        &[],
        InitialAttrs {
            precision: 1.0,
            tonic_volatility: -2.0,
            ..Default::default()
        },
    )[0];

    let value_node = g.add_nodes(
        NodeKind::ContinuousState,
        1,
        &[],
        &[],
        &[],
        &[VolatilityLink::new(volatility_parent, 1.0)],
        InitialAttrs {
            precision: 1.0,
            tonic_volatility: -3.0,
            ..Default::default()
        },
    )[0];

    let input = g.add_nodes(
        NodeKind::ContinuousInput,
        1,
        &[],
        &[],
        &[ValueLink::new(value_node, 1.0)],
        &[],
        InitialAttrs {
            input_precision: 5.0,
            ..Default::default()
        },
    )[0];

    let mut graph = g.freeze().expect("valid topology");
    for (t, &value) in OBSERVATIONS.iter().enumerate() {
        let inputs = StepInputs::new().with_value(input, value);
        step(&mut graph, &inputs, 1.0, t as u64, 11).expect("step succeeds");
    }

    assert!(!graph.store().has_any_nan(), "{variant:?} explicit construction diverged to NaN");

    let value_belief = graph.store().get(value_node).as_continuous().unwrap();
    let vol_belief = graph.store().get(volatility_parent).as_continuous().unwrap();
    (value_belief.mean(), value_belief.precision(), vol_belief.mean(), vol_belief.precision())
}

#[test]
fn standard_variant_stays_finite() {
    run_variant(UpdateVariant::Standard);
}

#[test]
fn ehgf_variant_stays_finite() {
    run_variant(UpdateVariant::EHgf);
}

#[test]
fn unbounded_variant_stays_finite() {
    run_variant(UpdateVariant::Unbounded);
}

/// spec.md §8: "the trajectories at V's value level match those of the
/// explicit 2-node construction... for each update_type", within 1e-3
/// absolute tolerance.
#[test]
fn volatile_node_matches_explicit_volatility_parent_construction() {
    for variant in [UpdateVariant::Standard, UpdateVariant::EHgf, UpdateVariant::Unbounded] {
        let (v_mean, v_precision, v_mean_vol, v_precision_vol) = run_variant(variant);
        let (e_mean, e_precision, e_vol_mean, e_vol_precision) = run_explicit(variant);

        assert!((v_mean - e_mean).abs() < 1e-3, "{variant:?} value mean: {v_mean} vs {e_mean}");
        assert!(
            (v_precision - e_precision).abs() < 1e-3,
            "{variant:?} value precision: {v_precision} vs {e_precision}"
        );
        assert!(
            (v_mean_vol - e_vol_mean).abs() < 1e-3,
            "{variant:?} volatility mean: {v_mean_vol} vs {e_vol_mean}"
        );
        assert!(
            (v_precision_vol - e_vol_precision).abs() < 1e-3,
            "{variant:?} volatility precision: {v_precision_vol} vs {e_vol_precision}"
        );
    }
}
