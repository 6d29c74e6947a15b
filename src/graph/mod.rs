//! Graph topology: the immutable edge structure a step is driven against,
//! and the builder that assembles it (spec.md §2 component 1, §6).
//!
//! Mirrors `felipe-santos-gran-prix`'s split between a mutable builder
//! (`Graph`) and a frozen, execution-ready form — there the split was
//! implicit in `Graph` plus `graph::verifier::Verifier`; here freezing is a
//! first-class step (`Graph::freeze`) because the compiled update sequence
//! genuinely cannot change afterwards (spec.md §4.2, §9).

pub mod dsl;
pub mod verifier;

use serde::{Deserialize, Serialize};

use crate::compiler::{self, CompiledSequence};
use crate::errors::FilterResult;
use crate::store::{
    AttributeStore, BinaryInput, BinaryState, CategoricalInput, ContinuousInput, ContinuousState,
    CouplingVectors, NodeAttributes, NodeRecord, VolatileState,
};
use crate::types::{CouplingFn, NodeId, NodeKind, UpdateVariant};

/// The four edge lists a node carries, plus the link function attached to
/// each value-child edge (spec.md §3: "a parallel tuple `coupling_fn`").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EdgeList {
    pub value_parents: Vec<NodeId>,
    pub value_children: Vec<NodeId>,
    pub volatility_parents: Vec<NodeId>,
    pub volatility_children: Vec<NodeId>,
    /// Parallel to `value_children`.
    pub coupling_fn: Vec<CouplingFn>,
}

/// The frozen topology: one [`EdgeList`] per node, indexed by [`NodeId`].
/// Never mutated after [`Graph::freeze`] (spec.md §9: "bake the variant into
/// the compiled step list at freeze time").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Edges(Vec<EdgeList>);

impl Edges {
    pub fn from_vec(edges: Vec<EdgeList>) -> Self {
        Self(edges)
    }

    pub fn of(&self, node: NodeId) -> &EdgeList {
        &self.0[node.0]
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &EdgeList)> {
        self.0.iter().enumerate().map(|(i, e)| (NodeId(i), e))
    }
}

/// Per-node initial belief overrides passed to [`Graph::add_nodes`]. Only the
/// fields relevant to the node kind being built are read; the rest are
/// ignored (spec.md §6: `**initial_attrs`).
#[derive(Debug, Clone, Default)]
pub struct InitialAttrs {
    pub mean: f64,
    pub precision: f64,
    pub tonic_volatility: f64,
    pub tonic_drift: f64,
    pub tonic_volatility_vol: f64,
    pub volatility_coupling_internal: f64,
    pub input_precision: f64,
    pub eta0: f64,
    pub eta1: f64,
}

fn new_attributes(kind: NodeKind, initial: &InitialAttrs) -> NodeAttributes {
    match kind {
        NodeKind::ContinuousState => NodeAttributes::ContinuousState(ContinuousState {
            mean: initial.mean,
            precision: initial.precision,
            tonic_volatility: initial.tonic_volatility,
            tonic_drift: initial.tonic_drift,
            ..Default::default()
        }),
        NodeKind::VolatileState => NodeAttributes::VolatileState(VolatileState {
            mean: initial.mean,
            precision: initial.precision,
            tonic_volatility: initial.tonic_volatility,
            tonic_drift: initial.tonic_drift,
            tonic_volatility_vol: initial.tonic_volatility_vol,
            volatility_coupling_internal: initial.volatility_coupling_internal,
            precision_vol: 1.0,
            ..Default::default()
        }),
        NodeKind::BinaryState => NodeAttributes::BinaryState(BinaryState {
            mean: initial.mean,
            precision: initial.precision,
            ..Default::default()
        }),
        NodeKind::EfState { dimension } => NodeAttributes::EfState(crate::store::EfState {
            xis: vec![0.0; dimension],
            nus: vec![0.1; dimension],
            mean: initial.mean,
        }),
        NodeKind::CategoricalInput { n_categories } => {
            NodeAttributes::CategoricalInput(CategoricalInput {
                alpha: vec![1.0; n_categories],
                xi: vec![1.0 / n_categories as f64; n_categories],
                pe: vec![0.0; n_categories],
                value: vec![0.0; n_categories],
                mean: vec![1.0 / n_categories as f64; n_categories],
                ..Default::default()
            })
        }
        NodeKind::ContinuousInput => NodeAttributes::ContinuousInput(ContinuousInput {
            input_precision: initial.input_precision,
            ..Default::default()
        }),
        NodeKind::BinaryInput => NodeAttributes::BinaryInput(BinaryInput {
            eta0: initial.eta0,
            eta1: if initial.eta1 == 0.0 { 1.0 } else { initial.eta1 },
            input_precision: initial.input_precision,
            ..Default::default()
        }),
    }
}

/// One node reference to connect as a value link, carrying the coupling
/// weight and link function (spec.md §3).
#[derive(Debug, Clone, Copy)]
pub struct ValueLink {
    pub node: NodeId,
    pub weight: f64,
    pub coupling_fn: CouplingFn,
}

impl ValueLink {
    pub fn new(node: NodeId, weight: f64) -> Self {
        Self {
            node,
            weight,
            coupling_fn: CouplingFn::Identity,
        }
    }

    pub fn with_fn(node: NodeId, weight: f64, coupling_fn: CouplingFn) -> Self {
        Self {
            node,
            weight,
            coupling_fn,
        }
    }
}

/// A volatility-coupling reference, carrying only a weight (link functions
/// apply to value coupling only; spec.md §3).
#[derive(Debug, Clone, Copy)]
pub struct VolatilityLink {
    pub node: NodeId,
    pub weight: f64,
}

impl VolatilityLink {
    pub fn new(node: NodeId, weight: f64) -> Self {
        Self { node, weight }
    }
}

/// The pre-freeze, mutable graph under construction. Nodes and edges accrete
/// via [`Graph::add_nodes`]/[`Graph::add_layer`]/[`Graph::add_layer_stack`];
/// nothing here is executable until [`Graph::freeze`] succeeds.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    kinds: Vec<NodeKind>,
    edges: Vec<EdgeList>,
    initial: Vec<NodeAttributes>,
    coupling: Vec<CouplingVectors>,
    update_variant: UpdateVariant,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_update_variant(mut self, variant: UpdateVariant) -> Self {
        self.update_variant = variant;
        self
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Adds `n` freshly indexed nodes of `kind`, wiring the given parent and
    /// child links symmetrically at both endpoints and recording the
    /// declared coupling weights at each endpoint, then seeding each new
    /// node with `initial` (spec.md §6: `add_nodes`).
    ///
    /// `value_children`/`volatility_children` declare existing, already-built
    /// nodes below the new ones; `value_parents`/`volatility_parents` declare
    /// existing nodes above. Either direction may be empty — most graphs are
    /// built bottom-up, wiring new parents onto already-built children.
    pub fn add_nodes(
        &mut self,
        kind: NodeKind,
        n: usize,
        value_children: &[ValueLink],
        volatility_children: &[VolatilityLink],
        value_parents: &[ValueLink],
        volatility_parents: &[VolatilityLink],
        initial: InitialAttrs,
    ) -> Vec<NodeId> {
        let mut created = Vec::with_capacity(n);
        for _ in 0..n {
            let id = NodeId(self.kinds.len());
            self.kinds.push(kind);
            self.initial.push(new_attributes(kind, &initial));
            self.edges.push(EdgeList::default());
            self.coupling.push(CouplingVectors::default());

            for link in value_children {
                self.edges[id.0].value_children.push(link.node);
                self.edges[id.0].coupling_fn.push(link.coupling_fn);
                self.coupling[id.0].value_coupling_children.push(link.weight);
                self.edges[link.node.0].value_parents.push(id);
                self.coupling[link.node.0].value_coupling_parents.push(link.weight);
            }
            for link in volatility_children {
                self.edges[id.0].volatility_children.push(link.node);
                self.coupling[id.0].volatility_coupling_children.push(link.weight);
                self.edges[link.node.0].volatility_parents.push(id);
                self.coupling[link.node.0].volatility_coupling_parents.push(link.weight);
            }
            for link in value_parents {
                self.edges[link.node.0].value_children.push(id);
                self.edges[link.node.0].coupling_fn.push(link.coupling_fn);
                self.coupling[link.node.0].value_coupling_children.push(link.weight);
                self.edges[id.0].value_parents.push(link.node);
                self.coupling[id.0].value_coupling_parents.push(link.weight);
            }
            for link in volatility_parents {
                self.edges[link.node.0].volatility_children.push(id);
                self.coupling[link.node.0].volatility_coupling_children.push(link.weight);
                self.edges[id.0].volatility_parents.push(link.node);
                self.coupling[id.0].volatility_coupling_parents.push(link.weight);
            }

            created.push(id);
        }
        created
    }

    /// Adds `size` fully-connected value parents above `value_children`, each
    /// with coupling weight `autoconnection_strength` and identity link
    /// function (spec.md §6: `add_layer`).
    pub fn add_layer(
        &mut self,
        size: usize,
        value_children: &[NodeId],
        autoconnection_strength: f64,
        kind: NodeKind,
        initial: InitialAttrs,
    ) -> Vec<NodeId> {
        let links: Vec<ValueLink> = value_children
            .iter()
            .map(|&c| ValueLink::new(c, autoconnection_strength))
            .collect();
        self.add_nodes(kind, size, &links, &[], &[], &[], initial)
    }

    /// Repeated [`Graph::add_layer`]: each successive layer's children are
    /// the previous layer's nodes (spec.md §6: `add_layer_stack`).
    pub fn add_layer_stack(
        &mut self,
        value_children: &[NodeId],
        layer_sizes: &[usize],
        autoconnection_strength: f64,
        kind: NodeKind,
        initial: InitialAttrs,
    ) -> Vec<Vec<NodeId>> {
        let mut layers = Vec::with_capacity(layer_sizes.len());
        let mut previous: Vec<NodeId> = value_children.to_vec();
        for &size in layer_sizes {
            let layer = self.add_layer(size, &previous, autoconnection_strength, kind, initial.clone());
            previous = layer.clone();
            layers.push(layer);
        }
        layers
    }

    /// Validates and compiles the graph into an executable [`FrozenGraph`]
    /// (spec.md §4.2, §6). No further topology changes are possible
    /// afterwards.
    pub fn freeze(self) -> FilterResult<FrozenGraph> {
        verifier::verify(&self.kinds, &self.edges, &self.coupling)?;

        let edges = Edges(self.edges);
        let nodes = self
            .initial
            .into_iter()
            .zip(self.coupling)
            .map(|(attributes, coupling)| NodeRecord { attributes, coupling })
            .collect();
        let store = AttributeStore::new(nodes);
        let sequence = compiler::compile(&self.kinds, &edges, self.update_variant);

        Ok(FrozenGraph {
            kinds: self.kinds,
            edges,
            store,
            sequence,
        })
    }
}

/// An executable, topology-frozen graph: edge structure, initial attribute
/// store and compiled update sequence, all fixed (spec.md §2, §9).
#[derive(Debug, Clone)]
pub struct FrozenGraph {
    kinds: Vec<NodeKind>,
    edges: Edges,
    store: AttributeStore,
    sequence: CompiledSequence,
}

impl FrozenGraph {
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    pub fn kind(&self, node: NodeId) -> NodeKind {
        self.kinds[node.0]
    }

    pub fn kinds(&self) -> &[NodeKind] {
        &self.kinds
    }

    pub fn edges(&self) -> &Edges {
        &self.edges
    }

    pub fn store(&self) -> &AttributeStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut AttributeStore {
        &mut self.store
    }

    pub fn sequence(&self) -> &CompiledSequence {
        &self.sequence
    }

    pub fn input_nodes(&self) -> Vec<NodeId> {
        self.kinds
            .iter()
            .enumerate()
            .filter(|(_, k)| k.is_input())
            .map(|(i, _)| NodeId(i))
            .collect()
    }

    pub fn into_store(self) -> AttributeStore {
        self.store
    }
}
