//! The belief-propagation step function: predict, inject this step's
//! observations, update (spec.md §2 component 5, §4.2, §4.5).
//!
//! Grounded on `original_source/.../utils/beliefs_propagation.py`'s three-
//! phase `belief_propagation` loop, rebuilt here over the pre-compiled
//! [`CompiledSequence`] instead of re-deriving an order every call.

use std::collections::HashMap;

use rand::rngs::StdRng;
use tracing::trace;

use crate::compiler::KernelId;
use crate::errors::{FilterError, FilterResult};
use crate::graph::{Edges, FrozenGraph};
use crate::kernels::{binary, categorical, continuous, ef, volatility};
use crate::rng;
use crate::store::{AttributeStore, NodeAttributes};
use crate::types::{InputMode, NodeId};

/// This step's externally supplied observations and per-node input policy
/// (spec.md §4.5). A node absent from `modes` defaults to [`InputMode::External`].
#[derive(Debug, Clone, Default)]
pub struct StepInputs {
    pub scalar_values: HashMap<NodeId, f64>,
    pub categorical_values: HashMap<NodeId, Vec<f64>>,
    pub ef_values: HashMap<NodeId, Vec<f64>>,
    pub modes: HashMap<NodeId, InputMode>,
}

impl StepInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, node: NodeId, value: f64) -> Self {
        self.scalar_values.insert(node, value);
        self
    }

    pub fn with_mode(mut self, node: NodeId, mode: InputMode) -> Self {
        self.modes.insert(node, mode);
        self
    }

    fn mode_of(&self, node: NodeId) -> InputMode {
        self.modes.get(&node).copied().unwrap_or_default()
    }
}

/// Runs one step of belief propagation in place: prediction phase, then
/// observation injection, then the posterior/aggregation phase — in that
/// order, over the graph's pre-compiled sequence (spec.md §4.2).
///
/// `step_t` and `rng_seed` only matter for nodes in [`InputMode::Generative`]
/// — they seed that node's deterministic sample for this step
/// ([`rng::node_step_rng`]).
pub fn step(
    graph: &mut FrozenGraph,
    inputs: &StepInputs,
    time_step: f64,
    step_t: u64,
    rng_seed: u64,
) -> FilterResult<()> {
    let sequence = graph.sequence().clone();
    let edges = graph.edges().clone();
    let store = graph.store_mut();

    for &(node, kernel) in &sequence.prediction_steps {
        run_prediction(store, &edges, node, kernel, time_step);
    }

    for &(node, kernel) in &sequence.update_steps {
        run_update(store, &edges, node, kernel, inputs, time_step, step_t, rng_seed)?;
    }

    trace!(step = step_t, "belief propagation step complete");
    Ok(())
}

/// Runs one step across many independent filters in parallel (spec.md §9:
/// "a batch of independent filters may be stepped concurrently since steps
/// never share mutable state across graphs"). Each `(graph, inputs)` pair
/// gets its own `step_t`-derived generative RNG stream via `rng_seed`, so
/// results are identical to calling [`step`] on each graph sequentially.
#[cfg(feature = "rayon")]
pub fn step_batch(
    graphs: &mut [FrozenGraph],
    inputs: &[StepInputs],
    time_step: f64,
    step_t: u64,
    rng_seed: u64,
) -> FilterResult<()> {
    use rayon::prelude::*;

    graphs
        .par_iter_mut()
        .zip(inputs.par_iter())
        .try_for_each(|(graph, input)| step(graph, input, time_step, step_t, rng_seed))
}

fn run_prediction(store: &mut AttributeStore, edges: &Edges, node: NodeId, kernel: KernelId, dt: f64) {
    match kernel {
        KernelId::ContinuousPredict => continuous::predict(store, edges, node, dt),
        KernelId::VolatilePredict => volatility::predict(store, edges, node, dt),
        KernelId::BinaryPredict => binary::predict(store, edges, node),
        KernelId::EfPredict => ef::predict(store, node),
        other => unreachable!("{other:?} has no place in the prediction phase"),
    }
}

fn run_update(
    store: &mut AttributeStore,
    edges: &Edges,
    node: NodeId,
    kernel: KernelId,
    inputs: &StepInputs,
    dt: f64,
    step_t: u64,
    rng_seed: u64,
) -> FilterResult<()> {
    match kernel {
        KernelId::ContinuousPosterior(variant) => continuous::posterior(store, edges, node, variant),
        KernelId::VolatilePosterior(variant) => volatility::posterior(store, edges, node, variant),
        KernelId::BinaryPosterior => update_binary_posterior(store, edges, node),
        KernelId::EfPosterior => {
            if let Some(stats) = inputs.ef_values.get(&node) {
                ef::posterior(store, node, stats);
            }
        }
        KernelId::ContinuousInputObserve => {
            observe_continuous(store, edges, node, inputs, dt, step_t, rng_seed)?
        }
        KernelId::BinaryInputObserve => observe_binary(store, edges, node, inputs, dt, step_t, rng_seed)?,
        KernelId::CategoricalAggregate => {
            let observed = inputs.categorical_values.get(&node).map(|v| v.as_slice());
            categorical::aggregate(store, edges, node, observed);
        }
        other => unreachable!("{other:?} has no place in the update phase"),
    }
    Ok(())
}

/// A `BinaryState` node updates from its `BinaryInput` child when it has
/// one (the common leaf case); otherwise it aggregates ordinary children
/// the same way a continuous value parent would (spec.md §4.4 bullet 1).
fn update_binary_posterior(store: &mut AttributeStore, edges: &Edges, node: NodeId) {
    let input_child = edges
        .of(node)
        .value_children
        .iter()
        .find(|&&c| matches!(store.get(c), NodeAttributes::BinaryInput(_)))
        .copied();

    match input_child {
        Some(input) => binary::posterior_from_input(store, node, input),
        None => binary::posterior_from_children(store, edges, node),
    }
}

fn observe_continuous(
    store: &mut AttributeStore,
    edges: &Edges,
    node: NodeId,
    inputs: &StepInputs,
    dt: f64,
    step_t: u64,
    rng_seed: u64,
) -> FilterResult<()> {
    let value = match inputs.mode_of(node) {
        InputMode::External => resolve_external(inputs, store, node)?,
        InputMode::Generative => sample_continuous(store, edges, node, step_t, rng_seed),
        InputMode::Deprived => return Ok(()),
    };
    continuous::observe(store, edges, node, value, dt);
    Ok(())
}

fn observe_binary(
    store: &mut AttributeStore,
    edges: &Edges,
    node: NodeId,
    inputs: &StepInputs,
    dt: f64,
    step_t: u64,
    rng_seed: u64,
) -> FilterResult<()> {
    let value = match inputs.mode_of(node) {
        InputMode::External => resolve_external(inputs, store, node)?,
        InputMode::Generative => sample_binary(store, edges, node, step_t, rng_seed),
        InputMode::Deprived => return Ok(()),
    };
    binary::observe(store, edges, node, value, dt);
    Ok(())
}

fn resolve_external(inputs: &StepInputs, store: &AttributeStore, node: NodeId) -> FilterResult<f64> {
    inputs
        .scalar_values
        .get(&node)
        .copied()
        .ok_or(FilterError::MissingField {
            node: node.index(),
            kind: store.get(node).kind(),
            field: "observed_value",
        })
}

fn sample_continuous(store: &AttributeStore, edges: &Edges, node: NodeId, step_t: u64, rng_seed: u64) -> f64 {
    let parent = edges.of(node).value_parents.first().copied();
    let (mean, precision) = parent
        .map(|p| {
            let belief = store.get(p).as_continuous().expect("continuous-like value parent");
            (belief.expected_mean(), belief.expected_precision())
        })
        .unwrap_or((0.0, 1.0));
    let mut sub_rng: StdRng = rng::node_step_rng(rng_seed, node, step_t);
    rng::sample_gaussian(&mut sub_rng, mean, precision)
}

fn sample_binary(store: &AttributeStore, edges: &Edges, node: NodeId, step_t: u64, rng_seed: u64) -> f64 {
    let parent = edges.of(node).value_parents.first().copied();
    let p = parent
        .map(|p| match store.get(p) {
            NodeAttributes::BinaryState(s) => s.expected_mean,
            _ => 0.5,
        })
        .unwrap_or(0.5);
    let mut sub_rng: StdRng = rng::node_step_rng(rng_seed, node, step_t);
    rng::sample_bernoulli(&mut sub_rng, p)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Graph, InitialAttrs, ValueLink};
    use crate::types::{CouplingFn, NodeKind};

    fn simple_chain() -> FrozenGraph {
        let mut g = Graph::new();
        let parent = g.add_nodes(NodeKind::ContinuousState, 1, &[], &[], &[], &[], InitialAttrs {
            mean: 0.0,
            precision: 1.0,
            ..Default::default()
        })[0];
        let input = g.add_nodes(
            NodeKind::ContinuousInput,
            1,
            &[],
            &[],
            &[ValueLink::with_fn(parent, 1.0, CouplingFn::Identity)],
            &[],
            InitialAttrs {
                input_precision: 1.0,
                ..Default::default()
            },
        )[0];
        let _ = input;
        g.freeze().unwrap()
    }

    #[test]
    fn a_single_step_runs_without_error_and_updates_the_parent() {
        let mut graph = simple_chain();
        let input_node = graph.input_nodes()[0];
        let inputs = StepInputs::new().with_value(input_node, 1.0);
        step(&mut graph, &inputs, 1.0, 0, 42).unwrap();
        let parent = NodeId(0);
        let belief = graph.store().get(parent).as_continuous().unwrap();
        assert!(belief.mean() > 0.0);
    }

    #[test]
    fn missing_external_observation_is_an_error() {
        let mut graph = simple_chain();
        let inputs = StepInputs::new();
        let result = step(&mut graph, &inputs, 1.0, 0, 42);
        assert!(result.is_err());
    }

    #[test]
    fn generative_mode_samples_instead_of_requiring_a_value() {
        let mut graph = simple_chain();
        let input_node = graph.input_nodes()[0];
        let inputs = StepInputs::new().with_mode(input_node, InputMode::Generative);
        step(&mut graph, &inputs, 1.0, 0, 42).unwrap();
    }
}
