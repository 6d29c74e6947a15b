//! Update-sequence compiler (spec.md §4.2): turns a frozen topology into two
//! ordered `(NodeId, KernelId)` lists, with the posterior-update variant
//! baked in per node so the driver never dispatches on it at runtime
//! (spec.md §9).
//!
//! Grounded on `pyhgf.utils.beliefs_propagation`: prediction runs once per
//! step before observations are assigned, update runs once after. Node
//! ordering within each phase is resolved here via a topological sort
//! (Kahn's algorithm) rather than at every step.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::graph::{EdgeList, Edges};
use crate::types::{NodeId, NodeKind, UpdateVariant};

/// Which kernel function runs for a node, with the posterior variant already
/// resolved for every node kind whose posterior can fold in a volatility
/// child's prediction error (continuous-state and volatile-state nodes can
/// both act as a volatility parent).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KernelId {
    ContinuousPredict,
    VolatilePredict,
    BinaryPredict,
    EfPredict,
    ContinuousPosterior(UpdateVariant),
    VolatilePosterior(UpdateVariant),
    BinaryPosterior,
    EfPosterior,
    ContinuousInputObserve,
    BinaryInputObserve,
    CategoricalAggregate,
}

/// The compiled step lists (spec.md §4.2). Immutable once produced; reused
/// for every step of the graph's lifetime.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompiledSequence {
    pub prediction_steps: Vec<(NodeId, KernelId)>,
    pub update_steps: Vec<(NodeId, KernelId)>,
}

/// Topological order with every node preceded by all of its value and
/// volatility children (children — nodes that name this one as a parent —
/// come first), ties broken by ascending index. This is the order prediction
/// runs in: a node's own prediction only reads its parents' previous
/// posterior (stable all step), so the sort exists to give every node's
/// *descendants* a well-defined position for the squash and aggregation
/// kernels that do read a same-step upstream value (binary-state's sigmoid
/// squash of its continuous parent's `expected_mean`).
fn children_before_parents_order(edges: &Edges) -> Vec<NodeId> {
    let n = edges.len();
    let mut remaining_children: Vec<usize> = (0..n)
        .map(|i| {
            let e = edges.of(NodeId(i));
            dedup_count(&e.value_children, &e.volatility_children)
        })
        .collect();

    let mut ready: VecDeque<usize> = remaining_children
        .iter()
        .enumerate()
        .filter(|(_, &c)| c == 0)
        .map(|(i, _)| i)
        .collect();
    // VecDeque from a filtered range is already ascending; keep it that way
    // as we pop in order and insert newly-ready nodes at the back, then
    // re-sort the frontier before each pop to respect the ascending tie-break
    // even as nodes become ready out of order.
    let mut order = Vec::with_capacity(n);
    let mut frontier: Vec<usize> = ready.drain(..).collect();

    while !frontier.is_empty() {
        frontier.sort_unstable();
        let node = frontier.remove(0);
        order.push(NodeId(node));

        for &parent in edges.of(NodeId(node))
            .value_parents
            .iter()
            .chain(edges.of(NodeId(node)).volatility_parents.iter())
        {
            remaining_children[parent.index()] -= 1;
            if remaining_children[parent.index()] == 0 {
                frontier.push(parent.index());
            }
        }
    }

    order
}

fn dedup_count(a: &[NodeId], b: &[NodeId]) -> usize {
    use std::collections::HashSet;
    let set: HashSet<NodeId> = a.iter().chain(b.iter()).copied().collect();
    set.len()
}

fn predict_kernel(kind: NodeKind) -> Option<KernelId> {
    match kind {
        NodeKind::ContinuousState => Some(KernelId::ContinuousPredict),
        NodeKind::VolatileState => Some(KernelId::VolatilePredict),
        NodeKind::BinaryState => Some(KernelId::BinaryPredict),
        NodeKind::EfState { .. } => Some(KernelId::EfPredict),
        NodeKind::CategoricalInput { .. } | NodeKind::ContinuousInput | NodeKind::BinaryInput => None,
    }
}

fn update_kernel(kind: NodeKind, variant: UpdateVariant) -> KernelId {
    match kind {
        NodeKind::ContinuousState => KernelId::ContinuousPosterior(variant),
        NodeKind::VolatileState => KernelId::VolatilePosterior(variant),
        NodeKind::BinaryState => KernelId::BinaryPosterior,
        NodeKind::EfState { .. } => KernelId::EfPosterior,
        NodeKind::CategoricalInput { .. } => KernelId::CategoricalAggregate,
        NodeKind::ContinuousInput => KernelId::ContinuousInputObserve,
        NodeKind::BinaryInput => KernelId::BinaryInputObserve,
    }
}

/// Compiles `prediction_steps` and `update_steps` (spec.md §4.2).
///
/// `prediction_steps` visits non-input nodes children-before-parents; input
/// nodes carry no prediction kernel of their own (prediction of their value
/// parent covers the work, spec.md §4.3). `update_steps` reuses the same
/// order: a value-parent's posterior formula sums prediction errors
/// contributed by its already-updated children (continuous-state/
/// volatile-state/binary-state posterior kernels, and input-observation
/// kernels for leaves), so children must run first in both phases — see
/// DESIGN.md for why this departs from a literal top-down reading of the
/// reference's "roots to leaves" phrasing.
pub fn compile(kinds: &[NodeKind], edges: &Edges, variant: UpdateVariant) -> CompiledSequence {
    let order = children_before_parents_order(edges);

    let prediction_steps = order
        .iter()
        .filter_map(|&id| predict_kernel(kinds[id.index()]).map(|k| (id, k)))
        .collect();

    let update_steps = order
        .iter()
        .map(|&id| (id, update_kernel(kinds[id.index()], variant)))
        .collect();

    CompiledSequence {
        prediction_steps,
        update_steps,
    }
}

#[allow(dead_code)]
fn empty_edge_list() -> EdgeList {
    EdgeList::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::EdgeList;

    fn chain_edges() -> Edges {
        // node 0 (leaf) -> node 1 -> node 2 (root)
        let mut e0 = EdgeList::default();
        let mut e1 = EdgeList::default();
        let mut e2 = EdgeList::default();
        e0.value_parents.push(NodeId(1));
        e1.value_children.push(NodeId(0));
        e1.value_parents.push(NodeId(2));
        e2.value_children.push(NodeId(1));
        Edges::from_vec(vec![e0, e1, e2])
    }

    #[test]
    fn order_places_children_before_parents() {
        let edges = chain_edges();
        let order = children_before_parents_order(&edges);
        let pos = |id: usize| order.iter().position(|n| n.index() == id).unwrap();
        assert!(pos(0) < pos(1));
        assert!(pos(1) < pos(2));
    }

    #[test]
    fn prediction_and_update_share_order() {
        let edges = chain_edges();
        let kinds = vec![
            NodeKind::ContinuousInput,
            NodeKind::ContinuousState,
            NodeKind::ContinuousState,
        ];
        let seq = compile(&kinds, &edges, UpdateVariant::Standard);
        assert_eq!(seq.prediction_steps.len(), 2);
        assert_eq!(seq.update_steps.len(), 3);
        let pred_order: Vec<usize> = seq.prediction_steps.iter().map(|(id, _)| id.index()).collect();
        assert_eq!(pred_order, vec![1, 2]);
    }
}
