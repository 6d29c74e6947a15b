//! The recorder's field order is fixed by the first step it sees, and every
//! column ends up the same length as the number of steps recorded.

use predictive_filter::driver::{step, StepInputs};
use predictive_filter::graph::{Graph, InitialAttrs, ValueLink};
use predictive_filter::recorder::Recorder;
use predictive_filter::types::NodeKind;

#[test]
fn recorded_columns_match_step_count_and_preserve_field_order() {
    let mut g = Graph::new();
    let value_node = g.add_nodes(NodeKind::ContinuousState, 1, &[], &[], &[], &[], InitialAttrs {
        precision: 1.0,
        ..Default::default()
    })[0];
    let input = g.add_nodes(
        NodeKind::ContinuousInput,
        1,
        &[],
        &[],
        &[ValueLink::new(value_node, 1.0)],
        &[],
        InitialAttrs { input_precision: 4.0, ..Default::default() },
    )[0];

    let mut graph = g.freeze().expect("valid topology");
    let mut recorder = Recorder::new();

    let observations = [0.1, 0.2, 0.15, 0.3, 0.25];
    for (t, &value) in observations.iter().enumerate() {
        let inputs = StepInputs::new().with_value(input, value);
        step(&mut graph, &inputs, 1.0, t as u64, 5).unwrap();
        recorder.snapshot(graph.store(), value_node, "mean");
        recorder.snapshot(graph.store(), value_node, "precision");
    }

    let trajectories = recorder.into_trajectories();
    let fields: Vec<_> = trajectories.fields().iter().map(|k| k.field).collect();
    assert_eq!(fields, vec!["mean", "precision"]);
    assert_eq!(trajectories.steps(), observations.len());
    assert_eq!(trajectories.column(value_node, "mean").unwrap().len(), observations.len());
    assert_eq!(trajectories.column(value_node, "precision").unwrap().len(), observations.len());
}
