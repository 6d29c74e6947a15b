//! Trajectory recording: captures named scalar fields across steps into
//! dense columns, preserving first-seen field order (spec.md §4.8).
//!
//! `felipe-santos-gran-prix` builds everything on `ndarray` arrays
//! (`tensor::Tensor` wraps `ArrayD`); this module keeps `ndarray` as the
//! on-disk/in-memory representation but generalises it from a single
//! N-dimensional tensor to a growing set of named 1-D time series, one per
//! `(node, field)` pair recorded, with insertion order tracked explicitly
//! since pairs are added dynamically rather than declared up front.

use ndarray::Array1;
use std::collections::HashMap;

use crate::store::{AttributeStore, NodeAttributes};
use crate::types::NodeId;

/// Reads one named scalar belief field off a node's current attributes.
/// Unknown field names, or fields that don't apply to this node's kind,
/// return `None` rather than panicking — a recorder watching a field across
/// a mixed-kind graph simply skips nodes where it doesn't apply.
pub fn field_value(attrs: &NodeAttributes, field: &str) -> Option<f64> {
    use NodeAttributes::*;
    match (attrs, field) {
        (ContinuousState(s), "mean") => Some(s.mean),
        (ContinuousState(s), "precision") => Some(s.precision),
        (ContinuousState(s), "expected_mean") => Some(s.expected_mean),
        (ContinuousState(s), "expected_precision") => Some(s.expected_precision),
        (VolatileState(s), "mean") => Some(s.mean),
        (VolatileState(s), "precision") => Some(s.precision),
        (VolatileState(s), "expected_mean") => Some(s.expected_mean),
        (VolatileState(s), "expected_precision") => Some(s.expected_precision),
        (VolatileState(s), "mean_vol") => Some(s.mean_vol),
        (VolatileState(s), "precision_vol") => Some(s.precision_vol),
        (BinaryState(s), "mean") => Some(s.mean),
        (BinaryState(s), "precision") => Some(s.precision),
        (BinaryState(s), "expected_mean") => Some(s.expected_mean),
        (BinaryState(s), "expected_precision") => Some(s.expected_precision),
        (EfState(s), "mean") => Some(s.mean),
        (ContinuousInput(i), "surprise") => Some(i.surprise),
        (ContinuousInput(i), "observed_value") => Some(i.observed_value),
        (BinaryInput(i), "surprise") => Some(i.surprise),
        (BinaryInput(i), "observed_value") => Some(i.observed_value),
        (CategoricalInput(c), "kl_divergence") => Some(c.kl_divergence),
        (CategoricalInput(c), "binary_surprise") => Some(c.binary_surprise),
        _ => None,
    }
}

/// One `(node, field)` column key, in the order it was first recorded.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnKey {
    pub node: NodeId,
    pub field: &'static str,
}

/// Accumulates scalar belief fields across steps. Call [`Recorder::snapshot`]
/// once per step with the fields you want tracked; the first step's field
/// list fixes the recorded set (spec.md §4.8: "the field order observed on
/// the first recorded step is authoritative").
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    order: Vec<ColumnKey>,
    columns: HashMap<ColumnKey, Vec<f64>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `field` for `node` this step, appending to its column (or
    /// `NaN` if the field doesn't apply to the node's current kind).
    pub fn snapshot(&mut self, store: &AttributeStore, node: NodeId, field: &'static str) {
        let key = ColumnKey { node, field };
        if !self.columns.contains_key(&key) {
            self.order.push(key.clone());
            self.columns.insert(key.clone(), Vec::new());
        }
        let value = field_value(store.get(node), field).unwrap_or(f64::NAN);
        self.columns.get_mut(&key).unwrap().push(value);
    }

    /// Records the same set of `fields` for every node in `nodes`, in the
    /// order given — a convenience for whole-graph trajectory capture.
    pub fn snapshot_all(&mut self, store: &AttributeStore, nodes: &[NodeId], fields: &[&'static str]) {
        for &node in nodes {
            for &field in fields {
                self.snapshot(store, node, field);
            }
        }
    }

    pub fn into_trajectories(self) -> Trajectories {
        let data = self
            .order
            .iter()
            .map(|key| (key.clone(), Array1::from_vec(self.columns[key].clone())))
            .collect();
        Trajectories {
            order: self.order,
            data,
        }
    }
}

/// The finished, columnar recording: one [`Array1<f64>`] per `(node, field)`
/// pair, in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct Trajectories {
    order: Vec<ColumnKey>,
    data: HashMap<ColumnKey, Array1<f64>>,
}

impl Trajectories {
    pub fn fields(&self) -> &[ColumnKey] {
        &self.order
    }

    pub fn column(&self, node: NodeId, field: &'static str) -> Option<&Array1<f64>> {
        self.data.get(&ColumnKey { node, field })
    }

    pub fn steps(&self) -> usize {
        self.order
            .first()
            .and_then(|key| self.data.get(key))
            .map(|col| col.len())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ContinuousState, CouplingVectors, NodeRecord};

    #[test]
    fn snapshot_preserves_first_seen_field_order() {
        let store = AttributeStore::new(vec![
            NodeRecord {
                attributes: NodeAttributes::ContinuousState(ContinuousState { mean: 1.0, precision: 2.0, ..Default::default() }),
                coupling: CouplingVectors::default(),
            },
            NodeRecord {
                attributes: NodeAttributes::ContinuousState(ContinuousState { mean: 3.0, precision: 4.0, ..Default::default() }),
                coupling: CouplingVectors::default(),
            },
        ]);

        let mut recorder = Recorder::new();
        recorder.snapshot(&store, NodeId(1), "mean");
        recorder.snapshot(&store, NodeId(0), "precision");
        recorder.snapshot(&store, NodeId(1), "mean");

        let trajectories = recorder.into_trajectories();
        let fields: Vec<_> = trajectories.fields().iter().map(|k| (k.node, k.field)).collect();
        assert_eq!(fields, vec![(NodeId(1), "mean"), (NodeId(0), "precision")]);
        assert_eq!(trajectories.column(NodeId(1), "mean").unwrap().to_vec(), vec![3.0, 3.0]);
        assert_eq!(trajectories.steps(), 2);
    }

    #[test]
    fn unknown_field_records_as_nan_instead_of_panicking() {
        let store = AttributeStore::new(vec![NodeRecord {
            attributes: NodeAttributes::ContinuousState(ContinuousState::default()),
            coupling: CouplingVectors::default(),
        }]);
        let mut recorder = Recorder::new();
        recorder.snapshot(&store, NodeId(0), "mean_vol");
        let trajectories = recorder.into_trajectories();
        assert!(trajectories.column(NodeId(0), "mean_vol").unwrap()[0].is_nan());
    }
}
