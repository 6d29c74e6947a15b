//! Fluent construction helpers, mirroring `felipe-santos-gran-prix`'s
//! `graph::dsl::GraphBuilder` (a thin `&mut Graph` wrapper offering named
//! shorthands over the same `Graph` methods).

use crate::graph::{Graph, InitialAttrs, ValueLink};
use crate::types::{CouplingFn, NodeId, NodeKind};

pub struct GraphBuilder<'a> {
    graph: &'a mut Graph,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(graph: &'a mut Graph) -> Self {
        Self { graph }
    }

    /// A single continuous-state node with no edges yet — typically the top
    /// of a hierarchy, wired to children afterwards via [`Self::parent_of`].
    pub fn continuous_node(&mut self, initial: InitialAttrs) -> NodeId {
        self.graph.add_nodes(NodeKind::ContinuousState, 1, &[], &[], &[], &[], initial)[0]
    }

    /// A single volatile-state node (value level plus implicit volatility
    /// level), with no edges yet.
    pub fn volatile_node(&mut self, initial: InitialAttrs) -> NodeId {
        self.graph.add_nodes(NodeKind::VolatileState, 1, &[], &[], &[], &[], initial)[0]
    }

    /// Builds a fresh value-parent of `kind` above `child`, using `weight`
    /// and `coupling_fn` for the new value-coupling edge.
    pub fn parent_of(
        &mut self,
        child: NodeId,
        weight: f64,
        coupling_fn: CouplingFn,
        kind: NodeKind,
        initial: InitialAttrs,
    ) -> NodeId {
        let link = ValueLink::with_fn(child, weight, coupling_fn);
        self.graph.add_nodes(kind, 1, &[link], &[], &[], &[], initial)[0]
    }

    pub fn add_layer(
        &mut self,
        size: usize,
        value_children: &[NodeId],
        autoconnection_strength: f64,
        kind: NodeKind,
        initial: InitialAttrs,
    ) -> Vec<NodeId> {
        self.graph
            .add_layer(size, value_children, autoconnection_strength, kind, initial)
    }

    pub fn add_layer_stack(
        &mut self,
        value_children: &[NodeId],
        layer_sizes: &[usize],
        autoconnection_strength: f64,
        kind: NodeKind,
        initial: InitialAttrs,
    ) -> Vec<Vec<NodeId>> {
        self.graph
            .add_layer_stack(value_children, layer_sizes, autoconnection_strength, kind, initial)
    }
}
