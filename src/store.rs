//! The attribute store: a dense, per-node mapping of named scalar/vector
//! fields holding live beliefs (spec.md §3, §4.1).
//!
//! Mirrors `felipe-santos-gran-prix`'s `Graph` node table (`src/graph/mod.rs`)
//! in spirit — a flat `Vec` indexed by [`NodeId`] that is the single mutable
//! state carried through a step — but stores typed per-kind belief records
//! instead of tensors, since every node here holds a handful of scalars
//! rather than an N-dimensional array.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::errors::{FilterError, FilterResult};
use crate::graph::Edges;
use crate::types::{NodeId, NodeKind};

/// Small-vector optimised coupling weights; node degrees are typically < 8
/// (spec.md §9).
pub type CouplingVec = SmallVec<[f64; 8]>;

/// The four coupling-weight vectors every node carries "where applicable"
/// (spec.md §3). Lengths must track the corresponding edge list at all times
/// — this is enforced by [`set_coupling`] and checked by
/// `graph::verifier::verify_coupling_lengths`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CouplingVectors {
    pub value_coupling_parents: CouplingVec,
    pub value_coupling_children: CouplingVec,
    pub volatility_coupling_parents: CouplingVec,
    pub volatility_coupling_children: CouplingVec,
}

/// Shared accessors for nodes that carry a Gaussian value-level belief
/// (continuous-state, the value level of a volatile-state, binary-state).
/// Lets kernels in `kernels::continuous` operate generically over all three
/// without a 3-way match at every call site.
pub trait ContinuousBelief {
    fn mean(&self) -> f64;
    fn set_mean(&mut self, v: f64);
    fn precision(&self) -> f64;
    fn set_precision(&mut self, v: f64);
    fn expected_mean(&self) -> f64;
    fn set_expected_mean(&mut self, v: f64);
    fn expected_precision(&self) -> f64;
    fn set_expected_precision(&mut self, v: f64);
}

macro_rules! impl_continuous_belief {
    ($t:ty) => {
        impl ContinuousBelief for $t {
            fn mean(&self) -> f64 {
                self.mean
            }
            fn set_mean(&mut self, v: f64) {
                self.mean = v;
            }
            fn precision(&self) -> f64 {
                self.precision
            }
            fn set_precision(&mut self, v: f64) {
                self.precision = v;
            }
            fn expected_mean(&self) -> f64 {
                self.expected_mean
            }
            fn set_expected_mean(&mut self, v: f64) {
                self.expected_mean = v;
            }
            fn expected_precision(&self) -> f64 {
                self.expected_precision
            }
            fn set_expected_precision(&mut self, v: f64) {
                self.expected_precision = v;
            }
        }
    };
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContinuousState {
    pub mean: f64,
    pub precision: f64,
    pub expected_mean: f64,
    pub expected_precision: f64,
    pub tonic_volatility: f64,
    pub tonic_drift: f64,
    pub current_variance: f64,
}
impl_continuous_belief!(ContinuousState);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VolatileState {
    pub mean: f64,
    pub precision: f64,
    pub expected_mean: f64,
    pub expected_precision: f64,
    pub tonic_volatility: f64,
    pub tonic_drift: f64,
    pub current_variance: f64,
    pub mean_vol: f64,
    pub precision_vol: f64,
    pub expected_mean_vol: f64,
    pub expected_precision_vol: f64,
    pub tonic_volatility_vol: f64,
    pub volatility_coupling_internal: f64,
}
impl_continuous_belief!(VolatileState);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BinaryState {
    pub mean: f64,
    pub precision: f64,
    pub expected_mean: f64,
    pub expected_precision: f64,
}
impl_continuous_belief!(BinaryState);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EfState {
    pub xis: Vec<f64>,
    pub nus: Vec<f64>,
    pub mean: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoricalInput {
    pub alpha: Vec<f64>,
    pub xi: Vec<f64>,
    pub pe: Vec<f64>,
    pub kl_divergence: f64,
    pub binary_surprise: f64,
    pub value: Vec<f64>,
    pub mean: Vec<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContinuousInput {
    pub observed_value: f64,
    pub observed: bool,
    pub time_step: f64,
    pub surprise: f64,
    pub input_precision: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BinaryInput {
    pub observed_value: f64,
    pub observed: bool,
    pub time_step: f64,
    pub surprise: f64,
    pub eta0: f64,
    pub eta1: f64,
    pub input_precision: f64,
}

/// The live belief of one node. The variant is fixed at build time and never
/// changes after that (spec.md §3: "Attributes are mutated only by kernels
/// during a step").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NodeAttributes {
    ContinuousState(ContinuousState),
    VolatileState(VolatileState),
    BinaryState(BinaryState),
    EfState(EfState),
    CategoricalInput(CategoricalInput),
    ContinuousInput(ContinuousInput),
    BinaryInput(BinaryInput),
}

impl NodeAttributes {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeAttributes::ContinuousState(_) => NodeKind::ContinuousState,
            NodeAttributes::VolatileState(_) => NodeKind::VolatileState,
            NodeAttributes::BinaryState(_) => NodeKind::BinaryState,
            NodeAttributes::EfState(s) => NodeKind::EfState {
                dimension: s.xis.len(),
            },
            NodeAttributes::CategoricalInput(c) => NodeKind::CategoricalInput {
                n_categories: c.alpha.len(),
            },
            NodeAttributes::ContinuousInput(_) => NodeKind::ContinuousInput,
            NodeAttributes::BinaryInput(_) => NodeKind::BinaryInput,
        }
    }

    /// Generic access to the Gaussian value-level belief, when this node
    /// kind has one.
    pub fn as_continuous(&self) -> Option<&dyn ContinuousBelief> {
        match self {
            NodeAttributes::ContinuousState(s) => Some(s),
            NodeAttributes::VolatileState(s) => Some(s),
            NodeAttributes::BinaryState(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_continuous_mut(&mut self) -> Option<&mut dyn ContinuousBelief> {
        match self {
            NodeAttributes::ContinuousState(s) => Some(s),
            NodeAttributes::VolatileState(s) => Some(s),
            NodeAttributes::BinaryState(s) => Some(s),
            _ => None,
        }
    }
}

/// One node's full live record: its belief plus its coupling weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRecord {
    pub attributes: NodeAttributes,
    pub coupling: CouplingVectors,
}

/// The flat, per-node attribute table carried through a step. This is the
/// single mutable state of the engine (spec.md §2 component 2).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttributeStore {
    nodes: Vec<NodeRecord>,
}

impl AttributeStore {
    pub fn new(nodes: Vec<NodeRecord>) -> Self {
        Self { nodes }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, node: NodeId) -> &NodeAttributes {
        &self.nodes[node.0].attributes
    }

    pub fn get_mut(&mut self, node: NodeId) -> &mut NodeAttributes {
        &mut self.nodes[node.0].attributes
    }

    pub fn coupling(&self, node: NodeId) -> &CouplingVectors {
        &self.nodes[node.0].coupling
    }

    pub fn coupling_mut(&mut self, node: NodeId) -> &mut CouplingVectors {
        &mut self.nodes[node.0].coupling
    }

    pub fn record(&self, node: NodeId) -> &NodeRecord {
        &self.nodes[node.0]
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &NodeRecord)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, r)| (NodeId(i), r))
    }

    /// The whole-store functional update primitive (spec.md §4.1): takes the
    /// store by value and returns a new logical store. Implementations are
    /// free to mutate in place internally, as the caller cannot observe
    /// partial state (spec.md §5).
    pub fn transform(self, f: impl FnOnce(Self) -> Self) -> Self {
        f(self)
    }

    /// Returns true if any finite-valued belief field in the store is now
    /// NaN — used by callers (not the engine itself) to break a stream on
    /// divergence (spec.md §5, §7).
    pub fn has_any_nan(&self) -> bool {
        self.nodes.iter().any(|r| match &r.attributes {
            NodeAttributes::ContinuousState(s) => {
                s.mean.is_nan() || s.precision.is_nan()
            }
            NodeAttributes::VolatileState(s) => {
                s.mean.is_nan()
                    || s.precision.is_nan()
                    || s.mean_vol.is_nan()
                    || s.precision_vol.is_nan()
            }
            NodeAttributes::BinaryState(s) => s.mean.is_nan() || s.precision.is_nan(),
            NodeAttributes::EfState(s) => s.xis.iter().any(|x| x.is_nan()),
            NodeAttributes::CategoricalInput(c) => c.alpha.iter().any(|x| x.is_nan()),
            NodeAttributes::ContinuousInput(i) => i.surprise.is_nan(),
            NodeAttributes::BinaryInput(i) => i.surprise.is_nan(),
        })
    }
}

enum CouplingKind {
    Value,
    Volatility,
}

/// Atomically writes a coupling weight to both endpoints of an edge,
/// preserving the dual-sided invariant from spec.md §3 ("a parent's
/// coupling-weight vector is indexed positionally by the child's position in
/// that parent's children tuple... `set_coupling` must update both").
///
/// Grounded on `pyhgf.utils.set_coupling`, used by both `learner::fixed` and
/// `learner::dynamic` (`pyhgf/updates/learning.py`).
fn set_coupling(
    store: &mut AttributeStore,
    edges: &Edges,
    parent: NodeId,
    child: NodeId,
    weight: f64,
    kind: CouplingKind,
) -> FilterResult<()> {
    let (parent_children, child_parents) = match kind {
        CouplingKind::Value => (
            &edges.of(parent).value_children,
            &edges.of(child).value_parents,
        ),
        CouplingKind::Volatility => (
            &edges.of(parent).volatility_children,
            &edges.of(child).volatility_parents,
        ),
    };

    let child_pos = parent_children
        .iter()
        .position(|&c| c == child)
        .ok_or(FilterError::UnknownNode {
            node: parent.0,
            other: child.0,
        })?;
    let parent_pos = child_parents
        .iter()
        .position(|&p| p == parent)
        .ok_or(FilterError::UnknownNode {
            node: child.0,
            other: parent.0,
        })?;

    match kind {
        CouplingKind::Value => {
            store.coupling_mut(parent).value_coupling_children[child_pos] = weight;
            store.coupling_mut(child).value_coupling_parents[parent_pos] = weight;
        }
        CouplingKind::Volatility => {
            store.coupling_mut(parent).volatility_coupling_children[child_pos] = weight;
            store.coupling_mut(child).volatility_coupling_parents[parent_pos] = weight;
        }
    }
    Ok(())
}

pub fn set_value_coupling(
    store: &mut AttributeStore,
    edges: &Edges,
    parent: NodeId,
    child: NodeId,
    weight: f64,
) -> FilterResult<()> {
    set_coupling(store, edges, parent, child, weight, CouplingKind::Value)
}

pub fn set_volatility_coupling(
    store: &mut AttributeStore,
    edges: &Edges,
    parent: NodeId,
    child: NodeId,
    weight: f64,
) -> FilterResult<()> {
    set_coupling(store, edges, parent, child, weight, CouplingKind::Volatility)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn continuous_belief_accessors_roundtrip() {
        let mut s = ContinuousState::default();
        s.set_mean(1.5);
        s.set_precision(2.0);
        assert_eq!(s.mean(), 1.5);
        assert_eq!(s.precision(), 2.0);
    }
}
