//! Fixed-rate and precision-weighted dynamic-rate coupling learners should
//! agree on the *direction* of a weight update for the same prediction
//! errors, differing only in step size.

use predictive_filter::graph::{Graph, InitialAttrs, ValueLink};
use predictive_filter::learner::{update_value_coupling, LearningRate};
use predictive_filter::types::NodeKind;

#[test]
fn fixed_and_dynamic_learners_agree_on_update_direction() {
    let mut g = Graph::new();
    let parent = g.add_nodes(
        NodeKind::ContinuousState,
        1,
        &[],
        &[],
        &[],
        &[],
        InitialAttrs { mean: 1.0, precision: 1.0, ..Default::default() },
    )[0];
    let child = g.add_nodes(
        NodeKind::ContinuousState,
        1,
        &[],
        &[],
        &[ValueLink::new(parent, 0.5)],
        &[],
        InitialAttrs { mean: 1.0, precision: 1.0, ..Default::default() },
    )[0];

    let mut graph_fixed = g.clone().freeze().expect("valid topology");
    let mut graph_dynamic = g.freeze().expect("valid topology");

    for graph in [&mut graph_fixed, &mut graph_dynamic] {
        let store = graph.store_mut();
        if let predictive_filter::store::NodeAttributes::ContinuousState(s) = store.get_mut(parent) {
            s.expected_mean = 0.0;
            s.expected_precision = 1.0;
        }
        if let predictive_filter::store::NodeAttributes::ContinuousState(s) = store.get_mut(child) {
            s.expected_mean = 0.0;
            s.expected_precision = 1.0;
        }
    }

    let edges_fixed = graph_fixed.edges().clone();
    update_value_coupling(graph_fixed.store_mut(), &edges_fixed, parent, child, LearningRate::Fixed(0.1)).unwrap();

    let edges_dynamic = graph_dynamic.edges().clone();
    update_value_coupling(graph_dynamic.store_mut(), &edges_dynamic, parent, child, LearningRate::Dynamic).unwrap();

    let fixed_weight = graph_fixed.store().coupling(child).value_coupling_parents[0];
    let dynamic_weight = graph_dynamic.store().coupling(child).value_coupling_parents[0];

    assert!(fixed_weight > 0.5, "fixed-rate update should increase the weight, got {fixed_weight}");
    assert!(dynamic_weight > 0.5, "dynamic-rate update should increase the weight, got {dynamic_weight}");
}
