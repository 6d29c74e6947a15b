//! A binary-state node driven by a noisy binary input, verifying the
//! posterior tracks the true underlying probability over many trials.

use predictive_filter::driver::{step, StepInputs};
use predictive_filter::graph::{Graph, InitialAttrs, ValueLink};
use predictive_filter::types::NodeKind;

#[test]
fn binary_belief_moves_toward_frequently_observed_outcome() {
    let mut g = Graph::new();

    let belief_node = g.add_nodes(NodeKind::BinaryState, 1, &[], &[], &[], &[], InitialAttrs::default())[0];

    let input = g.add_nodes(
        NodeKind::BinaryInput,
        1,
        &[],
        &[],
        &[ValueLink::new(belief_node, 1.0)],
        &[],
        InitialAttrs {
            input_precision: f64::INFINITY,
            ..Default::default()
        },
    )[0];

    let mut graph = g.freeze().expect("valid topology");

    // A deterministic, noiseless run of mostly-1 observations.
    let observations = [1.0, 1.0, 1.0, 0.0, 1.0, 1.0, 1.0, 1.0, 0.0, 1.0];
    for (t, &value) in observations.iter().enumerate() {
        let inputs = StepInputs::new().with_value(input, value);
        step(&mut graph, &inputs, 1.0, t as u64, 3).expect("step succeeds");
    }

    let belief = graph.store().get(belief_node).as_continuous().unwrap();
    assert!(belief.mean() > 0.5, "posterior mean should lean toward the majority outcome, got {}", belief.mean());
    assert!(!graph.store().has_any_nan());
}

#[test]
fn dirac_passthrough_on_infinite_precision_matches_observed_value_exactly() {
    let mut g = Graph::new();
    let belief_node = g.add_nodes(NodeKind::BinaryState, 1, &[], &[], &[], &[], InitialAttrs::default())[0];
    let input = g.add_nodes(
        NodeKind::BinaryInput,
        1,
        &[],
        &[],
        &[ValueLink::new(belief_node, 1.0)],
        &[],
        InitialAttrs {
            input_precision: f64::INFINITY,
            ..Default::default()
        },
    )[0];

    let mut graph = g.freeze().expect("valid topology");
    let inputs = StepInputs::new().with_value(input, 1.0);
    step(&mut graph, &inputs, 1.0, 0, 1).unwrap();

    let belief = graph.store().get(belief_node).as_continuous().unwrap();
    assert_eq!(belief.mean(), 1.0);
    assert!(belief.precision().is_infinite());
}
